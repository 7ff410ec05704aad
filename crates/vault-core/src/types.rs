use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    PRIMARY_REWARD_MULTIPLIER, SECONDARY_REWARD_MULTIPLIER, TOKEN_DECIMALS, UNITS_PER_TOKEN,
};
use crate::error::VaultError;

/// Token amount in base units (18-decimal fixed point). u128 holds every
/// realistic supply; on-chain values above it are rejected at decode time.
pub type Balance = u128;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Opaque contribution identifier, allocated by the store on insert.
pub type ContributionId = u64;

/// Current wall-clock time as a `Timestamp`.
pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte EVM account or contract address. Always rendered lowercase.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parse `0x` followed by exactly 40 hex digits, any case.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        let bytes = decode_prefixed_hex(s, 20)
            .ok_or_else(|| VaultError::InvalidInput(format!("invalid address: {s}")))?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Extract the address from a 32-byte indexed event topic (right-aligned).
    pub fn from_topic(topic: &str) -> Option<Self> {
        let bytes = decode_prefixed_hex(topic, 32)?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes[12..]);
        Some(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// ABI encoding as a left-padded 32-byte word, without `0x`.
    pub fn to_abi_word(&self) -> String {
        format!("{:0>64}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = VaultError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..10])
    }
}

// ── TxHash ───────────────────────────────────────────────────────────────────

/// 32-byte EVM transaction hash. The deposit hash is the idempotence key of
/// the contribution ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse `0x` followed by exactly 64 hex digits, any case.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        let bytes = decode_prefixed_hex(s, 32)
            .ok_or_else(|| VaultError::InvalidInput(format!("invalid tx hash: {s}")))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = VaultError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({}…)", &self.to_hex()[..18])
    }
}

// Hex strings in JSON and config files, raw bytes in bincode.
macro_rules! hex_serde {
    ($ty:ident, $len:expr) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                if s.is_human_readable() {
                    s.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(s)
                }
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                if d.is_human_readable() {
                    let s = String::deserialize(d)?;
                    $ty::parse(&s).map_err(serde::de::Error::custom)
                } else {
                    <[u8; $len]>::deserialize(d).map($ty)
                }
            }
        }
    };
}

hex_serde!(Address, 20);
hex_serde!(TxHash, 32);

fn decode_prefixed_hex(s: &str, len: usize) -> Option<Vec<u8>> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.len() != len * 2 {
        return None;
    }
    hex::decode(digits).ok()
}

// ── Token ────────────────────────────────────────────────────────────────────

/// The two stakeable tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Primary,
    Secondary,
}

impl Token {
    pub const ALL: [Token; 2] = [Token::Primary, Token::Secondary];

    /// Reward weight multiplier applied to every staker-day of this token.
    pub fn reward_multiplier(&self) -> f64 {
        match self {
            Token::Primary => PRIMARY_REWARD_MULTIPLIER,
            Token::Secondary => SECONDARY_REWARD_MULTIPLIER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Primary => "primary",
            Token::Secondary => "secondary",
        }
    }
}

impl FromStr for Token {
    type Err = VaultError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Token::Primary),
            "secondary" => Ok(Token::Secondary),
            other => Err(VaultError::InvalidInput(format!("unknown token: {other}"))),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Unit conversion ──────────────────────────────────────────────────────────

/// Base units → whole tokens as `f64`. Lossy; only for weighting and display.
pub fn to_token_units(amount: Balance) -> f64 {
    let whole = amount / UNITS_PER_TOKEN;
    let frac = amount % UNITS_PER_TOKEN;
    whole as f64 + frac as f64 / UNITS_PER_TOKEN as f64
}

/// Exact decimal rendering of a base-unit amount, trailing zeros trimmed.
pub fn format_units(amount: Balance) -> String {
    let whole = amount / UNITS_PER_TOKEN;
    let frac = amount % UNITS_PER_TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0width$}", frac, width = TOKEN_DECIMALS as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}
