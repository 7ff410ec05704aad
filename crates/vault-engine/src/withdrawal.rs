use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};
use vault_chain::{PayoutError, PayoutWallet};
use vault_core::{Address, Balance, Timestamp, Token, TxHash, VaultError, WithdrawalStatus};
use vault_state::{ContributionFilter, ContributionLedger};

use crate::notify::{Notification, Notifier};

/// Result of an accepted unstake. Both arms are success: a queued
/// withdrawal is owed and will be paid by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnstakeOutcome {
    Instant { amount: Balance, payout_tx: TxHash },
    Queued { amount: Balance, reason: String },
}

impl UnstakeOutcome {
    pub fn amount(&self) -> Balance {
        match self {
            UnstakeOutcome::Instant { amount, .. } | UnstakeOutcome::Queued { amount, .. } => *amount,
        }
    }

    pub fn is_instant(&self) -> bool {
        matches!(self, UnstakeOutcome::Instant { .. })
    }
}

pub struct WithdrawalEngine {
    ledger: Arc<ContributionLedger>,
    payout: Option<Arc<dyn PayoutWallet>>,
    payout_timeout: Duration,
    notifier: Arc<dyn Notifier>,
}

impl WithdrawalEngine {
    pub fn new(
        ledger: Arc<ContributionLedger>,
        payout: Option<Arc<dyn PayoutWallet>>,
        payout_timeout: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { ledger, payout, payout_timeout, notifier }
    }

    /// Withdraw every active `token` stake of `wallet`.
    ///
    /// The stakes are claimed first: closed as `requested` with the treasury
    /// debited in one transaction. Only then is an instant payout attempted,
    /// so two concurrent unstakes can never both pay. A confirmed payout
    /// upgrades the rows to `completed`; any payout failure leaves them
    /// queued.
    pub async fn unstake(&self, wallet: Address, token: Token, now: Timestamp) -> Result<UnstakeOutcome, VaultError> {
        let stakes = self
            .ledger
            .list_active(ContributionFilter::new(Some(wallet), Some(token)))?;
        if stakes.is_empty() {
            return Err(VaultError::NoActiveStake { wallet: wallet.to_hex(), token });
        }
        let ids: Vec<u64> = stakes.iter().map(|c| c.id).collect();
        let amount: Balance = stakes.iter().fold(0u128, |acc, c| acc.saturating_add(c.amount));

        match self.ledger.close_stakes(&ids, WithdrawalStatus::Requested, None, now) {
            Ok(_) => {}
            // Another unstake claimed these rows between our read and the close.
            Err(VaultError::StakeNotActive(_)) => {
                return Err(VaultError::NoActiveStake { wallet: wallet.to_hex(), token });
            }
            Err(e) => return Err(e),
        }
        info!(%wallet, %token, amount, stakes = ids.len(), "unstake accepted");

        let outcome = match self.pay(token, wallet, amount).await {
            Ok(payout_tx) => {
                if let Err(e) = self.ledger.complete_withdrawals(&ids, Some(payout_tx)) {
                    // Funds are out; the rows stay `requested` until marked returned.
                    error!(%wallet, %token, %payout_tx, error = %e, "payout sent but completion not recorded");
                }
                info!(%wallet, %token, amount, %payout_tx, "instant unstake paid");
                UnstakeOutcome::Instant { amount, payout_tx }
            }
            Err(e) => {
                warn!(%wallet, %token, amount, reason = %e, "instant payout unavailable; withdrawal queued");
                UnstakeOutcome::Queued { amount, reason: e.to_string() }
            }
        };

        let notice = match &outcome {
            UnstakeOutcome::Instant { payout_tx, .. } => Notification::sent(wallet, token, amount, *payout_tx),
            UnstakeOutcome::Queued { reason, .. } => Notification::needs_funding(wallet, token, amount, reason.clone()),
        };
        self.notifier.notify(&notice).await;
        Ok(outcome)
    }

    async fn pay(&self, token: Token, to: Address, amount: Balance) -> Result<TxHash, PayoutError> {
        let wallet = self.payout.as_ref().ok_or(PayoutError::NotConfigured)?;
        let have = wallet.balance(token).await?;
        if have < amount {
            return Err(PayoutError::InsufficientBalance { need: amount, have });
        }
        match tokio::time::timeout(self.payout_timeout, wallet.transfer(token, to, amount)).await {
            Ok(result) => result,
            Err(_) => Err(PayoutError::Timeout(self.payout_timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vault_state::StateDb;

    const PAYOUT_TX: TxHash = TxHash([0x77; 32]);

    enum Mode {
        Pays,
        Empty,
        Rejects,
        Hangs,
    }

    struct FakeWallet {
        mode: Mode,
        transfers: AtomicUsize,
    }

    impl FakeWallet {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self { mode, transfers: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl PayoutWallet for FakeWallet {
        fn address(&self) -> Address {
            Address::from_bytes([0xfe; 20])
        }

        async fn balance(&self, _token: Token) -> Result<Balance, PayoutError> {
            Ok(match self.mode {
                Mode::Empty => 0,
                _ => u128::MAX,
            })
        }

        async fn transfer(&self, _token: Token, _to: Address, _amount: Balance) -> Result<TxHash, PayoutError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            match self.mode {
                Mode::Rejects => Err(PayoutError::Submission("nonce too low".into())),
                Mode::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(PAYOUT_TX)
                }
                _ => Ok(PAYOUT_TX),
            }
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, n: &Notification) {
            self.0.lock().unwrap().push(n.clone());
        }
    }

    struct Fixture {
        db: Arc<StateDb>,
        ledger: Arc<ContributionLedger>,
        engine: WithdrawalEngine,
        notes: Arc<Recorder>,
    }

    fn fixture(name: &str, payout: Option<Arc<FakeWallet>>) -> Fixture {
        let dir = std::env::temp_dir().join(format!("stakevault_withdrawal_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        let db = Arc::new(StateDb::open(&dir).unwrap());
        let ledger = Arc::new(ContributionLedger::new(Arc::clone(&db)));
        let notes = Arc::new(Recorder::default());
        let engine = WithdrawalEngine::new(
            Arc::clone(&ledger),
            payout.map(|w| w as Arc<dyn PayoutWallet>),
            Duration::from_millis(100),
            notes.clone(),
        );
        Fixture { db, ledger, engine, notes }
    }

    fn staker() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn seed(f: &Fixture, token: Token, amounts: &[u128]) {
        for (i, a) in amounts.iter().enumerate() {
            let mut h = [0u8; 32];
            h[0] = token as u8;
            h[1] = i as u8;
            f.ledger.record_deposit(staker(), token, TxHash(h), *a, 0).unwrap();
        }
    }

    fn staked(f: &Fixture, token: Token) -> Balance {
        f.db.get_treasury().unwrap().map(|t| t.total_staked.get(token)).unwrap_or(0)
    }

    fn rows(f: &Fixture) -> Vec<vault_core::Contribution> {
        f.db.iter_contributions().map(|r| r.unwrap()).collect()
    }

    #[tokio::test]
    async fn instant_payout_completes_rows() {
        let wallet = FakeWallet::new(Mode::Pays);
        let f = fixture("instant", Some(wallet.clone()));
        seed(&f, Token::Primary, &[10, 15]);

        let out = f.engine.unstake(staker(), Token::Primary, 50).await.unwrap();
        assert_eq!(out, UnstakeOutcome::Instant { amount: 25, payout_tx: PAYOUT_TX });
        assert_eq!(staked(&f, Token::Primary), 0);
        for row in rows(&f) {
            assert!(!row.active);
            assert_eq!(row.withdrawal_status, WithdrawalStatus::Completed);
            assert_eq!(row.withdrawal_tx, Some(PAYOUT_TX));
            assert_eq!(row.unstaked_at, Some(50));
        }
        let notes = f.notes.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, crate::notify::NotificationKind::Sent);
    }

    #[tokio::test]
    async fn empty_payout_wallet_queues() {
        let wallet = FakeWallet::new(Mode::Empty);
        let f = fixture("empty", Some(wallet.clone()));
        seed(&f, Token::Secondary, &[40]);

        let out = f.engine.unstake(staker(), Token::Secondary, 5).await.unwrap();
        assert!(!out.is_instant());
        assert_eq!(out.amount(), 40);
        assert_eq!(wallet.transfers.load(Ordering::SeqCst), 0);
        assert_eq!(staked(&f, Token::Secondary), 0);
        let row = &rows(&f)[0];
        assert_eq!(row.withdrawal_status, WithdrawalStatus::Requested);
        assert_eq!(row.withdrawal_tx, None);
        assert_eq!(f.notes.0.lock().unwrap()[0].kind, crate::notify::NotificationKind::NeedsFunding);
    }

    #[tokio::test]
    async fn submission_failure_queues() {
        let f = fixture("rejects", Some(FakeWallet::new(Mode::Rejects)));
        seed(&f, Token::Primary, &[1]);
        let out = f.engine.unstake(staker(), Token::Primary, 5).await.unwrap();
        match out {
            UnstakeOutcome::Queued { reason, .. } => assert!(reason.contains("nonce too low")),
            other => panic!("expected queued, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hung_payout_times_out_to_queue() {
        let f = fixture("hangs", Some(FakeWallet::new(Mode::Hangs)));
        seed(&f, Token::Primary, &[1]);
        let out = f.engine.unstake(staker(), Token::Primary, 5).await.unwrap();
        assert!(matches!(out, UnstakeOutcome::Queued { .. }));
        assert_eq!(rows(&f)[0].withdrawal_status, WithdrawalStatus::Requested);
    }

    #[tokio::test]
    async fn no_payout_wallet_queues() {
        let f = fixture("no_wallet", None);
        seed(&f, Token::Primary, &[3]);
        let out = f.engine.unstake(staker(), Token::Primary, 5).await.unwrap();
        assert!(matches!(out, UnstakeOutcome::Queued { amount: 3, .. }));
    }

    #[tokio::test]
    async fn nothing_to_unstake() {
        let f = fixture("nothing", None);
        seed(&f, Token::Primary, &[3]);
        let err = f.engine.unstake(staker(), Token::Secondary, 5).await.unwrap_err();
        assert!(matches!(err, VaultError::NoActiveStake { token: Token::Secondary, .. }));

        f.engine.unstake(staker(), Token::Primary, 5).await.unwrap();
        let again = f.engine.unstake(staker(), Token::Primary, 6).await.unwrap_err();
        assert!(matches!(again, VaultError::NoActiveStake { .. }));
    }

    #[tokio::test]
    async fn unstake_leaves_other_token_alone() {
        let f = fixture("other_token", None);
        seed(&f, Token::Primary, &[3]);
        seed(&f, Token::Secondary, &[9]);
        f.engine.unstake(staker(), Token::Primary, 5).await.unwrap();
        assert_eq!(staked(&f, Token::Secondary), 9);
        assert_eq!(
            f.ledger
                .list_active(ContributionFilter::new(Some(staker()), Some(Token::Secondary)))
                .unwrap()
                .len(),
            1
        );
    }
}
