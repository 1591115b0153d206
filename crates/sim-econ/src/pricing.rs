//! Cost-plus pricing with a wealth discount (spec.md §4.E "Pricing").

use rust_decimal::Decimal;

pub const BASE_MARGIN: f64 = 0.10;
pub const MAX_WEALTH_DISCOUNT: f64 = 0.05;
pub const WEALTH_THRESHOLD: f64 = 10_000.0;

/// `baseMargin − min(balance, threshold)/threshold × maxDiscount`: richer
/// corps shave up to `MAX_WEALTH_DISCOUNT` off their margin, capped once
/// balance reaches `WEALTH_THRESHOLD`.
pub fn margin(balance: Decimal) -> f64 {
    let balance: f64 = balance.try_into().unwrap_or(0.0);
    let balance = balance.max(0.0);
    BASE_MARGIN - (balance.min(WEALTH_THRESHOLD) / WEALTH_THRESHOLD) * MAX_WEALTH_DISCOUNT
}

/// `inputCost × (1 + margin(balance))` (spec.md §4.E "price").
pub fn price(input_cost: Decimal, balance: Decimal) -> Decimal {
    let margin = Decimal::try_from(margin(balance)).unwrap_or(Decimal::ZERO);
    input_cost * (Decimal::ONE + margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poor_corp_charges_full_base_margin() {
        let m = margin(Decimal::ZERO);
        assert!((m - BASE_MARGIN).abs() < 1e-9);
    }

    #[test]
    fn wealthy_corp_gets_maximum_discount() {
        let m = margin(Decimal::new(50_000, 0));
        assert!((m - (BASE_MARGIN - MAX_WEALTH_DISCOUNT)).abs() < 1e-9);
    }

    #[test]
    fn discount_scales_linearly_below_threshold() {
        let m = margin(Decimal::new(5_000, 0));
        let expected = BASE_MARGIN - 0.5 * MAX_WEALTH_DISCOUNT;
        assert!((m - expected).abs() < 1e-9);
    }

    #[test]
    fn price_applies_margin_to_input_cost() {
        let p = price(Decimal::new(100, 0), Decimal::ZERO);
        let expected = Decimal::new(100, 0) * Decimal::try_from(1.0 + BASE_MARGIN).unwrap();
        assert_eq!(p, expected);
    }
}
