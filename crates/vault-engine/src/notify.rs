use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use vault_core::{format_units, Address, Balance, Token, TxHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Instant payout confirmed on chain.
    Sent,
    /// Withdrawal queued; the payout wallet needs manual funding.
    NeedsFunding,
}

/// Admin-facing unstake notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub wallet: Address,
    pub token: Token,
    /// Whole tokens, exact decimal.
    pub amount: String,
    pub payout_tx: Option<TxHash>,
    pub reason: Option<String>,
}

impl Notification {
    pub fn sent(wallet: Address, token: Token, amount: Balance, payout_tx: TxHash) -> Self {
        Self {
            kind: NotificationKind::Sent,
            wallet,
            token,
            amount: format_units(amount),
            payout_tx: Some(payout_tx),
            reason: None,
        }
    }

    pub fn needs_funding(wallet: Address, token: Token, amount: Balance, reason: String) -> Self {
        Self {
            kind: NotificationKind::NeedsFunding,
            wallet,
            token,
            amount: format_units(amount),
            payout_tx: None,
            reason: Some(reason),
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match (self.kind, &self.payout_tx) {
            (NotificationKind::Sent, Some(tx)) => {
                format!("unstake sent: {} {} to {} (tx {})", self.amount, self.token, self.wallet, tx)
            }
            _ => format!(
                "unstake needs manual funding: {} {} owed to {}{}",
                self.amount,
                self.token,
                self.wallet,
                self.reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default()
            ),
        }
    }
}

/// Fire-and-forget notification sink. Implementations must not fail the
/// caller; delivery problems are logged and dropped.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// Emits notifications as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, n: &Notification) {
        info!(
            kind = ?n.kind,
            wallet = %n.wallet,
            token = %n.token,
            amount = %n.amount,
            payout_tx = ?n.payout_tx.map(|t| t.to_hex()),
            "{}",
            n.summary()
        );
    }
}

/// POSTs each notification as JSON to a webhook, and also logs it.
///
/// Delivery runs on its own task, so `notify` returns without waiting for
/// the hook to answer.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }
}

async fn deliver(client: reqwest::Client, url: String, body: serde_json::Value) {
    match client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {}
        Ok(resp) => warn!(url = %url, status = %resp.status(), "notification webhook rejected message"),
        Err(e) => warn!(url = %url, error = %e, "notification webhook unreachable"),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, n: &Notification) {
        LogNotifier.notify(n).await;
        let body = serde_json::json!({
            "text": n.summary(),
            "notification": n,
        });
        tokio::spawn(deliver(self.client.clone(), self.url.clone(), body));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn wallet() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    #[test]
    fn summaries_distinguish_sent_and_queued() {
        let tx = TxHash::from_bytes([0x11; 32]);
        let sent = Notification::sent(wallet(), Token::Primary, 1_500_000_000_000_000_000, tx);
        assert!(sent.summary().starts_with("unstake sent: 1.5 primary"));
        assert!(sent.summary().contains(&tx.to_hex()));

        let queued = Notification::needs_funding(wallet(), Token::Secondary, 2, "empty".into());
        assert!(queued.summary().contains("needs manual funding"));
        assert!(queued.summary().ends_with("(empty)"));
    }

    #[tokio::test]
    async fn webhook_posts_json() {
        let server = MockServer::start_async().await;
        let hook = server
            .mock_async(|when, then| {
                when.method(POST).path("/hook").body_contains("needs_funding");
                then.status(204);
            })
            .await;
        let n = WebhookNotifier::new(server.url("/hook"), Duration::from_secs(2)).unwrap();
        n.notify(&Notification::needs_funding(wallet(), Token::Primary, 1, "x".into())).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn slow_webhook_does_not_hold_the_caller() {
        let server = MockServer::start_async().await;
        let hook = server
            .mock_async(|when, then| {
                when.method(POST).path("/slow");
                then.status(200).delay(Duration::from_secs(2));
            })
            .await;
        let n = WebhookNotifier::new(server.url("/slow"), Duration::from_secs(5)).unwrap();
        let started = std::time::Instant::now();
        n.notify(&Notification::needs_funding(wallet(), Token::Primary, 1, "x".into())).await;
        assert!(started.elapsed() < Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(500)).await;
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_failure_is_swallowed() {
        let n = WebhookNotifier::new("http://127.0.0.1:1/hook", Duration::from_millis(200)).unwrap();
        n.notify(&Notification::needs_funding(wallet(), Token::Primary, 1, "x".into())).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}
