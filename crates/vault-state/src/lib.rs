//! vault-state
//!
//! Persistent contribution ledger and treasury aggregate over sled.
//! Every mutation that touches both runs inside one multi-tree sled
//! transaction, so a contribution row and the running totals can never be
//! observed out of step.

pub mod db;
pub mod ledger;
pub mod treasury;

pub use db::StateDb;
pub use ledger::{ContributionFilter, ContributionLedger};
pub use treasury::{ReconcileReport, TreasuryStore};
