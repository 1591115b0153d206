//! Capital allocation: the Bank corp lends balance surplus to chains that
//! cannot self-fund their next segment (spec.md §3.7, §4.H).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A loan from the Bank corp against a specific chain segment (spec.md
/// §4.H "InvestmentContract").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvestmentContract {
    pub id: String,
    pub chain_id: String,
    pub segment_index: usize,
    pub principal: Decimal,
    pub rate: f64,
    pub issued_at: u64,
    pub term: u64,
    pub repaid: Decimal,
}

impl InvestmentContract {
    /// `principal * (1 + rate)` (spec.md §4.H "amount owed").
    pub fn amount_owed(&self) -> Decimal {
        let rate = Decimal::try_from(self.rate).unwrap_or(Decimal::ZERO);
        self.principal * (Decimal::ONE + rate)
    }

    pub fn outstanding(&self) -> Decimal {
        (self.amount_owed() - self.repaid).max(Decimal::ZERO)
    }

    pub fn is_repaid(&self) -> bool {
        self.outstanding() <= Decimal::ZERO
    }

    pub fn is_overdue(&self, now: u64) -> bool {
        !self.is_repaid() && now >= self.issued_at + self.term
    }

    /// Record a repayment, clamping at the amount owed.
    pub fn record_repayment(&mut self, amount: Decimal) {
        self.repaid = (self.repaid + amount.max(Decimal::ZERO)).min(self.amount_owed());
    }
}

/// A single tick's decision: how much of the bank's available balance to
/// commit to which chain segment (spec.md §4.H "CapitalAllocation").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapitalAllocation {
    pub chain_id: String,
    pub segment_index: usize,
    pub amount: Decimal,
    pub suggested_rate: f64,
}

/// Minimum and maximum lending rate the bank ever quotes (spec.md §4.H
/// "rate suggestion").
pub const MIN_LENDING_RATE: f64 = 0.01;
pub const MAX_LENDING_RATE: f64 = 0.25;

/// Scales the base rate up with bank utilisation so a nearly fully lent-out
/// bank charges close to `MAX_LENDING_RATE` while an idle one charges close
/// to `MIN_LENDING_RATE` (spec.md §4.H).
pub fn suggest_rate(outstanding: Decimal, available_capital: Decimal) -> f64 {
    if available_capital <= Decimal::ZERO {
        return MAX_LENDING_RATE;
    }
    let utilisation: f64 = (outstanding / available_capital).try_into().unwrap_or(1.0);
    let utilisation = utilisation.clamp(0.0, 1.0);
    MIN_LENDING_RATE + (MAX_LENDING_RATE - MIN_LENDING_RATE) * utilisation
}

/// Caps a requested loan amount at the bank's free capital (spec.md §4.H
/// "payment capping").
pub fn cap_payment(requested: Decimal, free_capital: Decimal) -> Decimal {
    requested.max(Decimal::ZERO).min(free_capital.max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(principal: i64, rate: f64) -> InvestmentContract {
        InvestmentContract {
            id: "loan-1".into(),
            chain_id: "chain-1".into(),
            segment_index: 0,
            principal: Decimal::new(principal, 0),
            rate,
            issued_at: 0,
            term: 1000,
            repaid: Decimal::ZERO,
        }
    }

    #[test]
    fn amount_owed_includes_interest() {
        let l = loan(1000, 0.1);
        assert_eq!(l.amount_owed(), Decimal::new(1100, 0));
    }

    #[test]
    fn repayment_clamps_at_amount_owed() {
        let mut l = loan(1000, 0.1);
        l.record_repayment(Decimal::new(5000, 0));
        assert_eq!(l.repaid, Decimal::new(1100, 0));
        assert!(l.is_repaid());
    }

    #[test]
    fn overdue_when_term_elapses_without_repayment() {
        let l = loan(1000, 0.1);
        assert!(!l.is_overdue(999));
        assert!(l.is_overdue(1000));
    }

    #[test]
    fn suggest_rate_scales_with_utilisation() {
        let low = suggest_rate(Decimal::new(0, 0), Decimal::new(1000, 0));
        let high = suggest_rate(Decimal::new(950, 0), Decimal::new(1000, 0));
        assert_eq!(low, MIN_LENDING_RATE);
        assert!(high > low && high <= MAX_LENDING_RATE);
    }

    #[test]
    fn cap_payment_never_exceeds_free_capital_or_goes_negative() {
        assert_eq!(cap_payment(Decimal::new(500, 0), Decimal::new(200, 0)), Decimal::new(200, 0));
        assert_eq!(cap_payment(Decimal::new(-50, 0), Decimal::new(200, 0)), Decimal::ZERO);
    }
}
