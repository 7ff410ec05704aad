//! vault-chain
//!
//! Read access to the public EVM ledger the treasury settles on, and the
//! custodial payout wallet used for instant unstakes.
//!
//!   reader   JSON-RPC client with ordered endpoint failover
//!   receipt  transaction receipt / log model
//!   abi      the three ERC-20 encodings the treasury needs
//!   verifier deposit acceptance rules (pure)
//!   payout   `PayoutWallet` trait and the remote-signer implementation

pub mod abi;
pub mod config;
pub mod payout;
pub mod reader;
pub mod receipt;
pub mod verifier;

pub use config::{ChainConfig, PayoutConfig, TokenContracts};
pub use payout::{PayoutError, PayoutWallet, RemoteSignerWallet};
pub use reader::{ChainReader, ReceiptSource};
pub use receipt::{Log, Receipt};
pub use verifier::{verify_transfer, Verification};
