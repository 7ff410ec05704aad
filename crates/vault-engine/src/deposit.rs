use std::sync::Arc;

use tracing::{debug, info, warn};
use vault_chain::{verify_transfer, ReceiptSource, TokenContracts, Verification};
use vault_core::{Address, Contribution, Timestamp, Token, TxHash, VaultError};
use vault_state::ContributionLedger;

/// Where deposits must go and which contracts count as stakeable tokens.
#[derive(Debug, Clone, Copy)]
pub struct DepositTarget {
    pub protocol_wallet: Address,
    pub tokens: TokenContracts,
}

/// Credits verified on-chain transfers to the ledger.
pub struct DepositFlow {
    ledger: Arc<ContributionLedger>,
    chain: Arc<dyn ReceiptSource>,
    target: DepositTarget,
}

impl DepositFlow {
    pub fn new(ledger: Arc<ContributionLedger>, chain: Arc<dyn ReceiptSource>, target: DepositTarget) -> Self {
        Self { ledger, chain, target }
    }

    /// Verify `tx_hash` as a transfer of `token` to the protocol wallet and
    /// credit it to `wallet`.
    ///
    /// Nothing is written unless verification succeeds. A chain outage is
    /// `Unverifiable` and the call can simply be repeated; a hash that was
    /// already credited is `DuplicateTransaction` and the original credit
    /// stands.
    pub async fn fund(
        &self,
        wallet: Address,
        token: Token,
        tx_hash: TxHash,
        now: Timestamp,
    ) -> Result<Contribution, VaultError> {
        if wallet.is_zero() {
            return Err(VaultError::InvalidInput("wallet must not be the zero address".into()));
        }
        if self.ledger.contains_tx(&tx_hash)? {
            debug!(%tx_hash, "deposit already recorded");
            return Err(VaultError::DuplicateTransaction(tx_hash.to_hex()));
        }

        let receipt = self.chain.get_receipt(&tx_hash).await?;
        let contract = self.target.tokens.for_token(token);
        let (amount, sender) = match verify_transfer(receipt.as_ref(), &contract, &self.target.protocol_wallet) {
            Verification::Accepted { amount, sender } => (amount, sender),
            Verification::Rejected(reason) => {
                warn!(%tx_hash, %wallet, %token, reason = reason.code(), "deposit rejected");
                return Err(VaultError::Rejected(reason));
            }
        };
        if sender != wallet {
            debug!(%tx_hash, %sender, %wallet, "deposit credited to a wallet other than the sender");
        }

        let row = self.ledger.record_deposit(wallet, token, tx_hash, amount, now)?;
        info!(%tx_hash, %wallet, %token, amount, "deposit accepted");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vault_chain::{Log, Receipt};
    use vault_core::constants::ERC20_TRANSFER_TOPIC;
    use vault_core::RejectReason;
    use vault_state::{StateDb, TreasuryStore};

    const PRIMARY: [u8; 20] = [0xa1; 20];
    const SECONDARY: [u8; 20] = [0xb2; 20];
    const PROTOCOL: [u8; 20] = [0x91; 20];

    #[derive(Default)]
    struct FakeChain {
        receipts: Mutex<HashMap<TxHash, Receipt>>,
        down: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReceiptSource for FakeChain {
        async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, VaultError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(VaultError::Unverifiable("all 3 rpc endpoints failed".into()));
            }
            Ok(self.receipts.lock().unwrap().get(tx_hash).cloned())
        }
    }

    fn word(a: [u8; 20]) -> String {
        format!("0x{}", Address::from_bytes(a).to_abi_word())
    }

    fn transfer(hash: TxHash, status: &str, contract: [u8; 20], to: [u8; 20], amount: u128) -> Receipt {
        Receipt {
            transaction_hash: hash.to_hex(),
            status: Some(status.into()),
            from: None,
            to: None,
            block_number: Some("0x10".into()),
            logs: vec![Log {
                address: Address::from_bytes(contract).to_hex(),
                topics: vec![ERC20_TRANSFER_TOPIC.into(), word([0xaa; 20]), word(to)],
                data: format!("0x{:064x}", amount),
            }],
        }
    }

    struct Fixture {
        db: Arc<StateDb>,
        chain: Arc<FakeChain>,
        flow: DepositFlow,
    }

    fn fixture(name: &str, chain: FakeChain) -> Fixture {
        let dir = std::env::temp_dir().join(format!("stakevault_deposit_test_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        let db = Arc::new(StateDb::open(&dir).unwrap());
        let chain = Arc::new(chain);
        let flow = DepositFlow::new(
            Arc::new(ContributionLedger::new(Arc::clone(&db))),
            chain.clone(),
            DepositTarget {
                protocol_wallet: Address::from_bytes(PROTOCOL),
                tokens: TokenContracts {
                    primary: Address::from_bytes(PRIMARY),
                    secondary: Address::from_bytes(SECONDARY),
                },
            },
        );
        Fixture { db, chain, flow }
    }

    fn staked(db: &Arc<StateDb>, token: Token) -> u128 {
        TreasuryStore::new(Arc::clone(db)).get(0).unwrap().total_staked.get(token)
    }

    fn hash(b: u8) -> TxHash {
        TxHash::from_bytes([b; 32])
    }

    fn staker() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    #[tokio::test]
    async fn accepted_transfer_is_credited() {
        let f = fixture("accept", FakeChain::default());
        f.chain.receipts.lock().unwrap().insert(hash(1), transfer(hash(1), "0x1", SECONDARY, PROTOCOL, 500));
        let row = f.flow.fund(staker(), Token::Secondary, hash(1), 100).await.unwrap();
        assert_eq!(row.amount, 500);
        assert_eq!(row.created_at, 100);
        assert_eq!(staked(&f.db, Token::Secondary), 500);
    }

    #[tokio::test]
    async fn second_fund_is_duplicate_without_rpc() {
        let f = fixture("dup", FakeChain::default());
        f.chain.receipts.lock().unwrap().insert(hash(1), transfer(hash(1), "0x1", PRIMARY, PROTOCOL, 500));
        f.flow.fund(staker(), Token::Primary, hash(1), 1).await.unwrap();
        let err = f.flow.fund(staker(), Token::Primary, hash(1), 2).await.unwrap_err();
        assert!(matches!(err, VaultError::DuplicateTransaction(_)));
        assert_eq!(f.chain.calls.load(Ordering::SeqCst), 1);
        assert_eq!(staked(&f.db, Token::Primary), 500);
    }

    #[tokio::test]
    async fn failed_receipt_is_rejected_and_nothing_written() {
        let f = fixture("failed", FakeChain::default());
        f.chain.receipts.lock().unwrap().insert(hash(2), transfer(hash(2), "0x0", PRIMARY, PROTOCOL, 500));
        let err = f.flow.fund(staker(), Token::Primary, hash(2), 1).await.unwrap_err();
        assert!(matches!(err, VaultError::Rejected(RejectReason::TxFailedOrMissing)));
        assert_eq!(err.to_string(), "transaction failed or not found");
        assert!(f.db.contribution_by_tx(&hash(2)).unwrap().is_none());
        assert_eq!(staked(&f.db, Token::Primary), 0);
    }

    #[tokio::test]
    async fn wrong_token_for_declared_kind_is_rejected() {
        let f = fixture("wrong_token", FakeChain::default());
        f.chain.receipts.lock().unwrap().insert(hash(3), transfer(hash(3), "0x1", PRIMARY, PROTOCOL, 500));
        let err = f.flow.fund(staker(), Token::Secondary, hash(3), 1).await.unwrap_err();
        assert!(matches!(err, VaultError::Rejected(RejectReason::NoMatchingTransfer)));
    }

    #[tokio::test]
    async fn chain_outage_is_unverifiable_and_retryable() {
        let f = fixture("outage", FakeChain { down: true, ..Default::default() });
        let err = f.flow.fund(staker(), Token::Primary, hash(4), 1).await.unwrap_err();
        assert!(matches!(err, VaultError::Unverifiable(_)));
        assert!(err.is_transient());
        assert!(!f.db.tx_recorded(&hash(4)).unwrap());
    }

    #[tokio::test]
    async fn zero_wallet_is_invalid_input() {
        let f = fixture("zero_wallet", FakeChain::default());
        let err = f.flow.fund(Address::ZERO, Token::Primary, hash(5), 1).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
        assert_eq!(f.chain.calls.load(Ordering::SeqCst), 0);
    }
}
