//! Corp taxonomy and economic bookkeeping (spec.md §3.4, §4.E).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The seven corp kinds (spec.md §3.4, §4.E).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CorpKind {
    Mining,
    Hauling,
    Spawning,
    Upgrading,
    Building,
    Bootstrap,
    Scout,
}

/// Fungible labour and economy resources traded on the internal market
/// (spec.md §3.5, GLOSSARY).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Energy,
    DeliveredEnergy,
    Power,
    WorkTicks,
    CarryTicks,
    MoveTicks,
    SpawningCapacity,
    RclProgress,
    Mineral(String),
}

/// A creep body spec expressed as part counts, used by spawn contracts
/// (spec.md §3.5 `creepSpec`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreepSpec {
    pub work: u32,
    pub carry: u32,
    pub move_parts: u32,
}

impl CreepSpec {
    /// Energy cost of this body at host-facing part costs (spec.md §6.2).
    pub fn energy_cost(&self) -> u32 {
        self.work * 100 + self.carry * 50 + self.move_parts * 50
    }

    pub fn total_parts(&self) -> u32 {
        self.work + self.carry + self.move_parts
    }
}

/// Type-specific state, one variant per [`CorpKind`] (spec.md §9 "tagged
/// variant types" instead of runtime type probes).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CorpDetail {
    Mining {
        source_id: String,
        miner_creep_ids: Vec<String>,
    },
    Hauling {
        route_from: String,
        route_to: Vec<String>,
        hauler_creep_ids: Vec<String>,
    },
    Spawning {
        spawn_id: String,
    },
    Upgrading {
        controller_id: String,
        upgrader_creep_ids: Vec<String>,
    },
    Building {
        construction_site_ids: Vec<String>,
        builder_creep_ids: Vec<String>,
        last_extension_tick: Option<u64>,
    },
    Bootstrap {
        jack_creep_ids: Vec<String>,
    },
    Scout {
        scout_creep_id: Option<String>,
        blocked_rooms: Vec<String>,
    },
}

impl CorpDetail {
    pub fn kind(&self) -> CorpKind {
        match self {
            CorpDetail::Mining { .. } => CorpKind::Mining,
            CorpDetail::Hauling { .. } => CorpKind::Hauling,
            CorpDetail::Spawning { .. } => CorpKind::Spawning,
            CorpDetail::Upgrading { .. } => CorpKind::Upgrading,
            CorpDetail::Building { .. } => CorpKind::Building,
            CorpDetail::Bootstrap { .. } => CorpKind::Bootstrap,
            CorpDetail::Scout { .. } => CorpKind::Scout,
        }
    }
}

/// Bankruptcy / dormancy pruning thresholds (spec.md §3.4, §4.E).
pub const BANKRUPTCY_BALANCE: i64 = -100;
pub const DORMANCY_TICKS: u64 = 1_500;

/// An economic actor owning workers and a balance (spec.md §3.4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpState {
    pub id: String,
    pub node_id: String,
    pub balance: Decimal,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub acquisition_cost: Decimal,
    pub units_produced: f64,
    pub units_consumed: f64,
    pub expected_units_produced: f64,
    pub created_at: u64,
    pub last_activity_tick: u64,
    pub is_active: bool,
    pub contracts: Vec<String>,
    pub detail: CorpDetail,
}

impl CorpState {
    pub fn new(id: impl Into<String>, node_id: impl Into<String>, detail: CorpDetail, now: u64) -> Self {
        CorpState {
            id: id.into(),
            node_id: node_id.into(),
            balance: Decimal::ZERO,
            total_revenue: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            acquisition_cost: Decimal::ZERO,
            units_produced: 0.0,
            units_consumed: 0.0,
            expected_units_produced: 0.0,
            created_at: now,
            last_activity_tick: now,
            is_active: true,
            contracts: Vec::new(),
            detail,
        }
    }

    pub fn kind(&self) -> CorpKind {
        self.detail.kind()
    }

    /// Record revenue; clamps the amount at zero (spec.md §4.E bookkeeping).
    pub fn record_revenue(&mut self, amount: Decimal) {
        let amount = amount.max(Decimal::ZERO);
        self.total_revenue += amount;
        self.balance += amount;
    }

    pub fn record_cost(&mut self, amount: Decimal) {
        let amount = amount.max(Decimal::ZERO);
        self.total_cost += amount;
        self.balance -= amount;
    }

    pub fn record_production(&mut self, units: f64) {
        self.units_produced += units.max(0.0);
    }

    pub fn record_consumption(&mut self, units: f64) {
        self.units_consumed += units.max(0.0);
    }

    pub fn record_expected_production(&mut self, units: f64) {
        self.expected_units_produced += units.max(0.0);
    }

    /// Apply a tax at `rate` (0..=1) of current balance if positive; returns
    /// the amount taxed, which the caller logs as a separate tax-credit or
    /// tax-debit entry against the corp's balance identity (spec.md §8.1
    /// item 4).
    pub fn apply_tax(&mut self, rate: f64) -> Decimal {
        if self.balance <= Decimal::ZERO || rate <= 0.0 {
            return Decimal::ZERO;
        }
        let rate = Decimal::try_from(rate.clamp(0.0, 1.0)).unwrap_or(Decimal::ZERO);
        let amount = self.balance * rate;
        self.balance -= amount;
        amount
    }

    pub fn mark_active(&mut self, now: u64) {
        self.last_activity_tick = now;
    }

    /// `(totalRevenue - totalCost) / totalCost`, 0 if totalCost is zero
    /// (spec.md §4.E "ROI / lifecycle").
    pub fn actual_roi(&self) -> f64 {
        if self.total_cost.is_zero() {
            return 0.0;
        }
        ((self.total_revenue - self.total_cost) / self.total_cost)
            .try_into()
            .unwrap_or(0.0)
    }

    pub fn is_bankrupt(&self) -> bool {
        self.balance < Decimal::from(BANKRUPTCY_BALANCE)
    }

    pub fn is_dormant(&self, now: u64) -> bool {
        now.saturating_sub(self.last_activity_tick) > DORMANCY_TICKS
    }

    /// True iff this corp should be pruned this tick (spec.md §4.E).
    pub fn should_prune(&self, now: u64) -> bool {
        self.is_bankrupt() || self.is_dormant(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corp() -> CorpState {
        CorpState::new(
            "c1",
            "n1",
            CorpDetail::Mining {
                source_id: "s1".into(),
                miner_creep_ids: vec![],
            },
            0,
        )
    }

    #[test]
    fn balance_equals_revenue_minus_cost() {
        let mut c = corp();
        c.record_revenue(Decimal::new(500, 2));
        c.record_cost(Decimal::new(120, 2));
        assert_eq!(c.balance, c.total_revenue - c.total_cost);
    }

    #[test]
    fn negative_amounts_clamp_at_zero() {
        let mut c = corp();
        c.record_revenue(Decimal::new(-50, 0));
        c.record_cost(Decimal::new(-50, 0));
        assert_eq!(c.total_revenue, Decimal::ZERO);
        assert_eq!(c.total_cost, Decimal::ZERO);
    }

    #[test]
    fn bankruptcy_threshold() {
        let mut c = corp();
        c.balance = Decimal::new(-100, 0);
        assert!(!c.is_bankrupt());
        c.balance = Decimal::new(-101, 0);
        assert!(c.is_bankrupt());
    }

    #[test]
    fn dormancy_threshold() {
        let mut c = corp();
        c.last_activity_tick = 0;
        assert!(!c.is_dormant(1_500));
        assert!(c.is_dormant(1_501));
    }

    #[test]
    fn roi_zero_when_no_cost() {
        let c = corp();
        assert_eq!(c.actual_roi(), 0.0);
    }

    #[test]
    fn tax_reduces_balance_and_returns_amount() {
        let mut c = corp();
        c.record_revenue(Decimal::new(1000, 0));
        let taxed = c.apply_tax(0.1);
        assert_eq!(taxed, Decimal::new(100, 0));
        assert_eq!(c.balance, Decimal::new(900, 0));
    }

    #[test]
    fn serde_roundtrip_corp_state() {
        let mut c = corp();
        c.record_revenue(Decimal::new(250, 1));
        let s = serde_json::to_string(&c).unwrap();
        let back: CorpState = serde_json::from_str(&s).unwrap();
        assert_eq!(back.id, c.id);
        assert_eq!(back.total_revenue, c.total_revenue);
    }
}
