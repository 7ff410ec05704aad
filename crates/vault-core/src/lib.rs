pub mod constants;
pub mod contribution;
pub mod error;
pub mod treasury;
pub mod types;

pub use constants::*;
pub use contribution::*;
pub use error::{RejectReason, VaultError};
pub use treasury::*;
pub use types::*;
