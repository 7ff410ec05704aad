//! vault-engine
//!
//! The treasury's user-facing operations, composed from the chain reader,
//! the sled store and the distribution calculator.
//!
//!   deposit    verify an on-chain transfer and credit it exactly once
//!   withdrawal unstake with instant payout or queued fallback
//!   notify     admin notification sinks
//!   service    `TreasuryService`, the facade every caller goes through

pub mod deposit;
pub mod notify;
pub mod service;
pub mod withdrawal;

pub use deposit::{DepositFlow, DepositTarget};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier, WebhookNotifier};
pub use service::{Clock, TreasuryService, TreasuryStats};
pub use withdrawal::{UnstakeOutcome, WithdrawalEngine};
