//! Minimal ABI helpers: the treasury only ever encodes `balanceOf` and
//! `transfer`, and decodes a single `uint256` word.

use vault_core::constants::{ERC20_BALANCE_OF_SELECTOR, ERC20_TRANSFER_SELECTOR};
use vault_core::{Address, Balance};

/// Calldata for `balanceOf(holder)`.
pub fn encode_balance_of(holder: &Address) -> String {
    format!("0x{}{}", ERC20_BALANCE_OF_SELECTOR, holder.to_abi_word())
}

/// Calldata for `transfer(to, amount)`.
pub fn encode_transfer(to: &Address, amount: Balance) -> String {
    format!("0x{}{}{:064x}", ERC20_TRANSFER_SELECTOR, to.to_abi_word(), amount)
}

/// Decode a hex `uint256`. `None` if it is not hex or does not fit in u128.
/// An empty payload (`0x`) decodes as zero.
pub fn decode_uint(data: &str) -> Option<Balance> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return if digits.chars().all(|c| c == '0') { Some(0) } else { None };
    }
    if significant.len() > 32 {
        return None;
    }
    u128::from_str_radix(significant, 16).ok()
}

/// Render a base-unit amount as a JSON-RPC quantity (`0x`-prefixed, no padding).
pub fn to_quantity(amount: Balance) -> String {
    format!("{:#x}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_of_calldata_layout() {
        let holder = Address::from_bytes([0x11; 20]);
        let data = encode_balance_of(&holder);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231000000000000000000000000"));
        assert!(data.ends_with(&"11".repeat(20)));
    }

    #[test]
    fn transfer_calldata_layout() {
        let to = Address::from_bytes([0x22; 20]);
        let data = encode_transfer(&to, 255);
        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert!(data.starts_with("0xa9059cbb"));
        assert!(data.ends_with("00ff"));
    }

    #[test]
    fn decode_uint_bounds() {
        assert_eq!(decode_uint("0x"), Some(0));
        assert_eq!(decode_uint(&format!("0x{}", "0".repeat(64))), Some(0));
        assert_eq!(decode_uint("0x0de0b6b3a7640000"), Some(1_000_000_000_000_000_000));
        let max = format!("0x{}{}", "0".repeat(32), "f".repeat(32));
        assert_eq!(decode_uint(&max), Some(u128::MAX));
        let over = format!("0x{}{}", "0".repeat(31), "1".repeat(33));
        assert_eq!(decode_uint(&over), None);
        assert_eq!(decode_uint("0xzz"), None);
    }

    #[test]
    fn quantity_has_no_padding() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(4096), "0x1000");
    }
}
