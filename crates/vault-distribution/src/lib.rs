//! vault-distribution
//!
//! Weighted reward shares over a snapshot of active contributions.
//! Pure computation: callers read the ledger, this crate only does arithmetic.

pub mod shares;

pub use shares::{compute_shares, DistributionPreview, WalletShare};
