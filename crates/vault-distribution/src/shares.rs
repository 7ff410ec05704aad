//! Staker-day weighting.
//!
//! weight_row   = tokens(amount) × multiplier(token) × min(7, age_days)
//! weight_group = Σ weight_row            grouped by (wallet, token)
//! share_pct    = weight_group / Σ weight_group × 100
//! share_amount = share_pct / 100 × weekly_rate
//!
//! Only display fields are rounded (2 dp); every intermediate stays full
//! precision.

use std::collections::BTreeMap;

use serde::Serialize;
use vault_core::constants::DISTRIBUTION_PERIOD_DAYS;
use vault_core::{to_token_units, Address, Balance, Contribution, Timestamp, Token};

/// One `(wallet, token)` row of the preview table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletShare {
    pub wallet: Address,
    pub token: Token,
    /// Sum of grouped amounts in base units.
    pub staked: Balance,
    /// Age of the longest-running grouped stake, capped at 7 days. Display
    /// only: the weight already counts each row at its own age.
    pub staked_days: f64,
    pub weight: f64,
    pub share_pct: f64,
    pub share_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionPreview {
    /// Sorted by weight, heaviest first; ties by wallet then token.
    pub per_wallet: Vec<WalletShare>,
    pub total_weighted_days: f64,
    pub weekly_rate: f64,
}

#[derive(Default)]
struct Group {
    staked: Balance,
    max_days: f64,
    weight: f64,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Capped staking age of `c` at `now`, in days.
pub fn capped_days(c: &Contribution, now: Timestamp) -> f64 {
    c.age_days(now).min(DISTRIBUTION_PERIOD_DAYS)
}

/// Compute each `(wallet, token)` group's share of `weekly_rate`.
///
/// Inactive rows in `contributions` are ignored. An empty or zero-weight
/// snapshot yields zero shares rather than dividing by zero.
pub fn compute_shares(contributions: &[Contribution], weekly_rate: f64, now: Timestamp) -> DistributionPreview {
    let mut groups: BTreeMap<(Address, Token), Group> = BTreeMap::new();
    for c in contributions.iter().filter(|c| c.active) {
        let days = capped_days(c, now);
        let g = groups.entry((c.wallet, c.token)).or_default();
        g.staked = g.staked.saturating_add(c.amount);
        g.max_days = g.max_days.max(days);
        g.weight += to_token_units(c.amount) * c.token.reward_multiplier() * days;
    }

    let total: f64 = groups.values().map(|g| g.weight).sum();

    // Ordered on full-precision weight; stable, so equal weights keep the
    // BTreeMap's (wallet, token) order.
    let mut ordered: Vec<((Address, Token), Group)> = groups.into_iter().collect();
    ordered.sort_by(|(_, a), (_, b)| b.weight.total_cmp(&a.weight));

    let per_wallet: Vec<WalletShare> = ordered
        .into_iter()
        .map(|((wallet, token), g)| {
            let share = if total > 0.0 { g.weight / total } else { 0.0 };
            WalletShare {
                wallet,
                token,
                staked: g.staked,
                staked_days: round2(g.max_days),
                weight: round2(g.weight),
                share_pct: round2(share * 100.0),
                share_amount: round2(share * weekly_rate),
            }
        })
        .collect();

    DistributionPreview {
        per_wallet,
        total_weighted_days: round2(total),
        weekly_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_core::constants::{SECS_PER_DAY, UNITS_PER_TOKEN};
    use vault_core::TxHash;

    const DAY: Timestamp = SECS_PER_DAY;

    fn stake(id: u64, wallet: u8, token: Token, tokens: u128, created_at: Timestamp) -> Contribution {
        Contribution::new(
            id,
            Address::from_bytes([wallet; 20]),
            token,
            tokens * UNITS_PER_TOKEN,
            TxHash::from_bytes([id as u8; 32]),
            created_at,
        )
    }

    fn find(p: &DistributionPreview, wallet: u8, token: Token) -> &WalletShare {
        p.per_wallet
            .iter()
            .find(|s| s.wallet == Address::from_bytes([wallet; 20]) && s.token == token)
            .expect("group present")
    }

    #[test]
    fn equal_weights_split_evenly() {
        let rows = vec![
            stake(1, 0xaa, Token::Primary, 100, 0),
            stake(2, 0xbb, Token::Secondary, 50, 0),
        ];
        let p = compute_shares(&rows, 700.0, 7 * DAY);

        let aa = find(&p, 0xaa, Token::Primary);
        let bb = find(&p, 0xbb, Token::Secondary);
        assert_eq!(aa.weight, 700.0);
        assert_eq!(bb.weight, 700.0);
        assert_eq!(aa.share_pct, 50.0);
        assert_eq!(bb.share_pct, 50.0);
        assert_eq!(aa.share_amount, 350.0);
        assert_eq!(bb.share_amount, 350.0);
        assert_eq!(p.total_weighted_days, 1_400.0);
    }

    #[test]
    fn empty_snapshot_has_no_shares() {
        let p = compute_shares(&[], 1_000.0, 10 * DAY);
        assert!(p.per_wallet.is_empty());
        assert_eq!(p.total_weighted_days, 0.0);
    }

    #[test]
    fn brand_new_stakes_have_zero_share_not_nan() {
        let rows = vec![stake(1, 0xaa, Token::Primary, 100, 5 * DAY)];
        let p = compute_shares(&rows, 1_000.0, 5 * DAY);
        assert_eq!(p.per_wallet.len(), 1);
        assert_eq!(p.per_wallet[0].share_pct, 0.0);
        assert_eq!(p.per_wallet[0].share_amount, 0.0);
    }

    #[test]
    fn secondary_weighs_double() {
        let rows = vec![
            stake(1, 0xaa, Token::Primary, 30, 0),
            stake(2, 0xbb, Token::Secondary, 30, 0),
        ];
        let p = compute_shares(&rows, 0.0, 3 * DAY);
        let primary = find(&p, 0xaa, Token::Primary).weight;
        let secondary = find(&p, 0xbb, Token::Secondary).weight;
        assert_eq!(secondary, 2.0 * primary);
    }

    #[test]
    fn age_is_capped_at_one_period() {
        let old = vec![stake(1, 0xaa, Token::Primary, 10, 0)];
        let at_cap = compute_shares(&old, 0.0, 7 * DAY);
        let way_past = compute_shares(&old, 0.0, 90 * DAY);
        assert_eq!(at_cap.per_wallet[0].weight, 70.0);
        assert_eq!(way_past.per_wallet[0].weight, 70.0);
        assert_eq!(way_past.per_wallet[0].staked_days, 7.0);
    }

    #[test]
    fn wallet_with_both_tokens_gets_two_rows() {
        let rows = vec![
            stake(1, 0xaa, Token::Primary, 10, 0),
            stake(2, 0xaa, Token::Secondary, 10, 0),
        ];
        let p = compute_shares(&rows, 300.0, 7 * DAY);
        assert_eq!(p.per_wallet.len(), 2);
        assert_eq!(find(&p, 0xaa, Token::Secondary).share_amount, 200.0);
        assert_eq!(find(&p, 0xaa, Token::Primary).share_amount, 100.0);
    }

    #[test]
    fn displayed_days_are_the_oldest_row_but_weight_is_per_row() {
        // 10 tokens staked 6 days ago and 10 more staked 1 day ago.
        let rows = vec![
            stake(1, 0xaa, Token::Primary, 10, 0),
            stake(2, 0xaa, Token::Primary, 10, 5 * DAY),
        ];
        let p = compute_shares(&rows, 0.0, 6 * DAY);
        let g = &p.per_wallet[0];
        assert_eq!(g.staked, 20 * UNITS_PER_TOKEN);
        assert_eq!(g.staked_days, 6.0);
        // 10×6 + 10×1, not 20×6.
        assert_eq!(g.weight, 70.0);
    }

    #[test]
    fn shares_sum_to_whole() {
        let rows = vec![
            stake(1, 0x01, Token::Primary, 13, 0),
            stake(2, 0x02, Token::Secondary, 7, 2 * DAY),
            stake(3, 0x03, Token::Primary, 101, 4 * DAY + 3_600),
            stake(4, 0x04, Token::Secondary, 3, 6 * DAY),
        ];
        let rate = 1_234.56;
        let p = compute_shares(&rows, rate, 7 * DAY);
        let pct: f64 = p.per_wallet.iter().map(|s| s.share_pct).sum();
        let amount: f64 = p.per_wallet.iter().map(|s| s.share_amount).sum();
        assert!((pct - 100.0).abs() < 0.05, "pct sum {pct}");
        assert!((amount - rate).abs() < 0.05, "amount sum {amount}");
    }

    #[test]
    fn inactive_rows_are_ignored_and_order_is_by_weight() {
        let mut closed = stake(1, 0x01, Token::Primary, 1_000, 0);
        closed.active = false;
        let rows = vec![
            closed,
            stake(2, 0x02, Token::Primary, 5, 0),
            stake(3, 0x03, Token::Primary, 50, 0),
        ];
        let p = compute_shares(&rows, 100.0, 7 * DAY);
        assert_eq!(p.per_wallet.len(), 2);
        assert_eq!(p.per_wallet[0].wallet, Address::from_bytes([0x03; 20]));
    }

    #[test]
    fn order_uses_unrounded_weight() {
        let mut rows = vec![stake(1, 0xaa, Token::Primary, 100, 0)];
        rows.push(Contribution::new(
            2,
            Address::from_bytes([0xbb; 20]),
            Token::Primary,
            100 * UNITS_PER_TOKEN + 1_000_000_000_000,
            TxHash::from_bytes([2; 32]),
            0,
        ));
        let p = compute_shares(&rows, 700.0, 7 * DAY);
        assert_eq!(p.per_wallet[0].weight, p.per_wallet[1].weight);
        assert_eq!(p.per_wallet[0].wallet, Address::from_bytes([0xbb; 20]));
    }
}
