//! Backward chain construction from a terminal goal corp to its raw root
//! (spec.md §4.G).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sim_core::chain::{Chain, ChainSegment};
use sim_core::corp::ResourceKind;
use sim_core::geometry::Position;
use sim_econ::pricing::price;

/// Baseline cost charged by a root (no-material-input) corp, standing in
/// for the labor/spawn cost of extraction that the material chain itself
/// does not otherwise price in (spec.md §4.G, open question on `totalCost`).
pub fn root_extraction_cost() -> Decimal {
    Decimal::new(5, 0)
}

/// A corp's material supply profile, as seen by the chain planner: what it
/// sells, and the single material resource (not labor) it consumes to
/// produce it (spec.md §4.E corp grammar table).
#[derive(Clone, Debug)]
pub struct CorpProfile {
    pub corp_id: String,
    pub output: ResourceKind,
    pub material_input: Option<ResourceKind>,
    pub location: Position,
    pub balance: Decimal,
}

/// Construct a chain backward from `terminal`, picking the cheapest
/// available supplier for each material requirement, breaking ties by
/// distance (spec.md §4.G "Chain construction"). Returns `None` if no
/// supplier exists for some required resource, or `max_depth` is
/// exceeded (a malformed/cyclic supply graph).
pub fn build_chain(
    chain_id: impl Into<String>,
    terminal: &CorpProfile,
    corps_by_output: &BTreeMap<ResourceKind, Vec<CorpProfile>>,
    desired_rate: f64,
    max_depth: usize,
    now: u64,
) -> Option<Chain> {
    let mut corps = vec![terminal.clone()];
    let mut depth = 0;
    loop {
        let current = corps.last().unwrap();
        let Some(required) = current.material_input.clone() else {
            break;
        };
        if depth >= max_depth {
            return None;
        }
        let candidates = corps_by_output.get(&required)?;
        let supplier = candidates
            .iter()
            .filter(|c| c.corp_id != current.corp_id)
            .min_by(|a, b| {
                let pa = price(Decimal::ZERO, a.balance);
                let pb = price(Decimal::ZERO, b.balance);
                pa.cmp(&pb).then_with(|| {
                    current
                        .location
                        .chebyshev(&a.location)
                        .cmp(&current.location.chebyshev(&b.location))
                })
            })?;
        corps.push(supplier.clone());
        depth += 1;
    }

    // Propagate cost forward from the root (last pushed) back to the terminal.
    let mut unit_costs = vec![Decimal::ZERO; corps.len()];
    for i in (0..corps.len()).rev() {
        let input_cost = if i == corps.len() - 1 {
            root_extraction_cost()
        } else {
            unit_costs[i + 1]
        };
        unit_costs[i] = price(input_cost, corps[i].balance);
    }

    let segments: Vec<ChainSegment> = corps
        .iter()
        .enumerate()
        .map(|(i, c)| ChainSegment {
            corp_id: c.corp_id.clone(),
            input: c.material_input.clone(),
            output: c.output.clone(),
            rate: desired_rate,
            unit_cost: unit_costs[i],
        })
        .collect();

    Some(Chain {
        id: chain_id.into(),
        goal: terminal.output.clone(),
        segments,
        funded_through: 0,
        created_at: now,
    })
}

/// `quantity * mintValue(terminal.resource)` (spec.md §4.G "Chain value").
pub fn mint_value(chain: &Chain, mint_value_per_unit: f64) -> Decimal {
    let terminal_rate = chain.segments.first().map(|s| s.rate).unwrap_or(0.0);
    Decimal::try_from(terminal_rate * mint_value_per_unit).unwrap_or(Decimal::ZERO)
}

/// Working capital required to front the whole chain before the first
/// delivery, used as the treasury-affordability gate (spec.md §4.G
/// "leafCost"; fixed here to the chain's full upfront cost since a root
/// corp's own material input cost is by definition zero).
pub fn leaf_cost(chain: &Chain) -> Decimal {
    chain.total_cost()
}

pub fn profit(chain: &Chain, mint_value_per_unit: f64) -> Decimal {
    mint_value(chain, mint_value_per_unit) - chain.total_cost()
}

/// A chain is funded iff profit > 0, it is structurally viable, and the
/// hosting treasury can front `leafCost` (spec.md §4.G "Funding").
pub fn is_fundable(chain: &Chain, mint_value_per_unit: f64, treasury: Decimal) -> bool {
    chain.is_viable() && profit(chain, mint_value_per_unit) > Decimal::ZERO && treasury >= leaf_cost(chain)
}

/// Among chains sharing a root resource, fund in descending profit order;
/// chains beyond the first to touch a saturated root corp are deferred
/// (spec.md §4.G "Competition").
pub fn rank_competing_chains(chains: &[Chain], mint_value_per_unit: f64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..chains.len()).collect();
    idx.sort_by(|&a, &b| profit(&chains[b], mint_value_per_unit).cmp(&profit(&chains[a], mint_value_per_unit)));
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::geometry::RoomName;

    fn pos(x: u8) -> Position {
        Position::new(x, 0, RoomName::parse("W1N1").unwrap())
    }

    fn corp(id: &str, output: ResourceKind, input: Option<ResourceKind>, x: u8) -> CorpProfile {
        CorpProfile {
            corp_id: id.into(),
            output,
            material_input: input,
            location: pos(x),
            balance: Decimal::ZERO,
        }
    }

    fn sample_corps() -> BTreeMap<ResourceKind, Vec<CorpProfile>> {
        let mut map: BTreeMap<ResourceKind, Vec<CorpProfile>> = BTreeMap::new();
        map.entry(ResourceKind::Energy).or_default().push(corp("mining-1", ResourceKind::Energy, None, 0));
        map.entry(ResourceKind::DeliveredEnergy)
            .or_default()
            .push(corp("hauling-1", ResourceKind::DeliveredEnergy, Some(ResourceKind::Energy), 1));
        map
    }

    #[test]
    fn scenario_expected_mining_hauling_upgrading_chain() {
        let corps = sample_corps();
        let terminal = corp("upgrading-1", ResourceKind::RclProgress, Some(ResourceKind::DeliveredEnergy), 2);
        let chain = build_chain("chain-1", &terminal, &corps, 10.0, 8, 0).unwrap();
        assert_eq!(chain.segments.len(), 3);
        assert_eq!(chain.segments[0].corp_id, "upgrading-1");
        assert_eq!(chain.segments.last().unwrap().corp_id, "mining-1");
        assert!(chain.is_viable());
        assert_eq!(leaf_cost(&chain), chain.total_cost());
        assert!(leaf_cost(&chain) > Decimal::ZERO);
    }

    #[test]
    fn missing_supplier_yields_no_chain() {
        let corps: BTreeMap<ResourceKind, Vec<CorpProfile>> = BTreeMap::new();
        let terminal = corp("upgrading-1", ResourceKind::RclProgress, Some(ResourceKind::DeliveredEnergy), 0);
        assert!(build_chain("chain-1", &terminal, &corps, 10.0, 8, 0).is_none());
    }

    #[test]
    fn fundable_chain_requires_positive_profit_and_treasury() {
        let corps = sample_corps();
        let terminal = corp("upgrading-1", ResourceKind::RclProgress, Some(ResourceKind::DeliveredEnergy), 2);
        let chain = build_chain("chain-1", &terminal, &corps, 10.0, 8, 0).unwrap();
        assert!(is_fundable(&chain, 1.0, Decimal::new(1_000_000, 0)));
        assert!(!is_fundable(&chain, 1.0, Decimal::ZERO));
    }

    #[test]
    fn competing_chains_rank_by_descending_profit() {
        let corps = sample_corps();
        let terminal = corp("upgrading-1", ResourceKind::RclProgress, Some(ResourceKind::DeliveredEnergy), 2);
        let low = build_chain("chain-low", &terminal, &corps, 1.0, 8, 0).unwrap();
        let high = build_chain("chain-high", &terminal, &corps, 100.0, 8, 0).unwrap();
        let ranked = rank_competing_chains(&[low, high], 1.0);
        assert_eq!(ranked[0], 1);
    }
}
