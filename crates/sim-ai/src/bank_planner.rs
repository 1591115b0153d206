//! Forward capital allocation: the Bank corp lends against expected
//! deliveries rather than backward-chaining contracts (spec.md §4.H).

use rust_decimal::Decimal;
use sim_core::bank::{CapitalAllocation, InvestmentContract};

/// `rate = max(supplyCost * 1.1, min(mintValue * (1 - targetROI), mintValue
/// * 0.8))` (spec.md §4.H "Suggested rate").
pub fn suggest_investment_rate(supply_cost: f64, mint_value: f64, target_roi: f64) -> f64 {
    let floor = supply_cost * 1.1;
    let ceiling = (mint_value * (1.0 - target_roi)).min(mint_value * 0.8);
    floor.max(ceiling)
}

/// A recipient corp's outstanding capital position: the sum of its still-
/// open investment contracts' remaining budgets (spec.md §4.H
/// "availableCapital").
pub fn available_capital(contracts: &[InvestmentContract]) -> Decimal {
    contracts.iter().filter(|c| !c.is_repaid()).map(|c| c.outstanding()).sum()
}

/// A corp may commit at most its `available_capital` across all
/// sub-contracts with suppliers (spec.md §4.H invariant 1).
pub fn can_commit(already_committed: Decimal, additional: Decimal, available: Decimal) -> bool {
    already_committed + additional <= available
}

/// Decide how much of the bank's free capital to allocate to one chain
/// segment this cycle, capped at both the segment's own budget need and
/// the bank's free capital (spec.md §4.H "CapitalAllocation").
pub fn allocate(
    chain_id: impl Into<String>,
    segment_index: usize,
    requested: Decimal,
    free_capital: Decimal,
    suggested_rate: f64,
) -> CapitalAllocation {
    CapitalAllocation {
        chain_id: chain_id.into(),
        segment_index,
        amount: requested.max(Decimal::ZERO).min(free_capital.max(Decimal::ZERO)),
        suggested_rate,
    }
}

/// Payment triggered by a delivery against an investment contract: `units
/// * ratePerUnit` capped by the contract's remaining budget (spec.md §4.H
/// invariant 2).
pub fn payment_for_delivery(units: f64, rate_per_unit: f64, remaining_budget: Decimal) -> Decimal {
    let raw = Decimal::try_from(units * rate_per_unit).unwrap_or(Decimal::ZERO);
    raw.max(Decimal::ZERO).min(remaining_budget.max(Decimal::ZERO))
}

/// Rank recipients by observed ROI across consecutive cycles, most
/// rewarding first (spec.md §4.H "prioritising by observed ROI").
pub fn rank_by_observed_roi(rois: &[(String, f64)]) -> Vec<String> {
    let mut ranked = rois.to_vec();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(id, _)| id).collect()
}
