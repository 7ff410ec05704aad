use vault_core::constants::ERC20_TRANSFER_TOPIC;
use vault_core::{Address, Balance, RejectReason};

use crate::abi::decode_uint;
use crate::receipt::{Log, Receipt};

/// Outcome of checking a deposit receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Accepted { amount: Balance, sender: Address },
    Rejected(RejectReason),
}

impl Verification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verification::Accepted { .. })
    }
}

/// Apply the deposit acceptance rules in order, stopping at the first that
/// fails:
///
/// 1. the receipt exists and succeeded;
/// 2. it carries a `Transfer` log emitted by `token_contract`;
/// 3. that transfer went to `recipient`;
/// 4. the amount is positive (and fits a `Balance`).
///
/// Only the first matching `Transfer` log is considered.
pub fn verify_transfer(
    receipt: Option<&Receipt>,
    token_contract: &Address,
    recipient: &Address,
) -> Verification {
    let receipt = match receipt {
        Some(r) if r.succeeded() => r,
        _ => return Verification::Rejected(RejectReason::TxFailedOrMissing),
    };

    let Some(log) = receipt.logs.iter().find(|l| is_token_transfer(l, token_contract)) else {
        return Verification::Rejected(RejectReason::NoMatchingTransfer);
    };

    // is_token_transfer guarantees three decodable topics.
    let (Some(sender), Some(to)) = (
        Address::from_topic(&log.topics[1]),
        Address::from_topic(&log.topics[2]),
    ) else {
        return Verification::Rejected(RejectReason::NoMatchingTransfer);
    };

    if to != *recipient {
        return Verification::Rejected(RejectReason::WrongRecipient);
    }

    match decode_uint(&log.data) {
        None => Verification::Rejected(RejectReason::AmountOutOfRange),
        Some(0) => Verification::Rejected(RejectReason::ZeroAmount),
        Some(amount) => Verification::Accepted { amount, sender },
    }
}

fn is_token_transfer(log: &Log, token_contract: &Address) -> bool {
    let emitted_by_token = Address::parse(&log.address)
        .map(|a| a == *token_contract)
        .unwrap_or(false);
    emitted_by_token
        && log.topics.len() >= 3
        && log.topics[0].eq_ignore_ascii_case(ERC20_TRANSFER_TOPIC)
        && Address::from_topic(&log.topics[1]).is_some()
        && Address::from_topic(&log.topics[2]).is_some()
}
