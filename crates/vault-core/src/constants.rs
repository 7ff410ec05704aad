/// ─── StakeVault Constants ───────────────────────────────────────────────────
///
/// Two fungible ERC-20 tokens can be staked against the protocol wallet.
/// Both use 18-decimal fixed point on chain; internally every amount is kept
/// in base units (`Balance`) and only converted to token units for display
/// and for the weighted share arithmetic.

// ── Token units ──────────────────────────────────────────────────────────────

/// Decimals assumed for both staking tokens.
pub const TOKEN_DECIMALS: u32 = 18;

/// 1 whole token expressed in base units.
pub const UNITS_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

// ── Reward weighting ─────────────────────────────────────────────────────────

/// Weight multiplier for stakes of the primary token.
pub const PRIMARY_REWARD_MULTIPLIER: f64 = 1.0;

/// Weight multiplier for stakes of the secondary token (incentivised 2x).
pub const SECONDARY_REWARD_MULTIPLIER: f64 = 2.0;

/// Staking age cap in days. Rewards are paid weekly, so a stake never
/// accrues more than one period's worth of weight.
pub const DISTRIBUTION_PERIOD_DAYS: f64 = 7.0;

pub const SECS_PER_DAY: i64 = 86_400;

// ── Treasury configuration bounds ────────────────────────────────────────────

pub const REWARD_SPLIT_PCT_MIN: f64 = 0.0;
pub const REWARD_SPLIT_PCT_MAX: f64 = 100.0;

/// Number of contributions returned by the public stats view.
pub const RECENT_CONTRIBUTIONS_LIMIT: usize = 20;

// ── ERC-20 ───────────────────────────────────────────────────────────────────

/// keccak256("Transfer(address,address,uint256)")
pub const ERC20_TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Function selector for `balanceOf(address)`.
pub const ERC20_BALANCE_OF_SELECTOR: &str = "70a08231";

/// Function selector for `transfer(address,uint256)`.
pub const ERC20_TRANSFER_SELECTOR: &str = "a9059cbb";
