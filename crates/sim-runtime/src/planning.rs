//! Bridges corp registry state to the `sim-ai` planners: maps each corp's
//! [`CorpDetail`] to the resource it produces/consumes so chain
//! construction and bank allocation can run over whatever corps
//! currently exist, without the planners needing to know about ECS or
//! the host at all.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sim_ai::chain_planner::{build_chain, CorpProfile};
use sim_ai::config::AiConfig;
use sim_core::corp::{CorpDetail, CorpState, ResourceKind};
use sim_core::geometry::Position;
use sim_core::Chain;

/// What a corp kind produces, by its detail variant (spec.md §3.4/§3.5
/// resource taxonomy).
pub fn output_resource(detail: &CorpDetail) -> ResourceKind {
    match detail {
        CorpDetail::Mining { .. } => ResourceKind::Energy,
        CorpDetail::Hauling { .. } => ResourceKind::DeliveredEnergy,
        CorpDetail::Upgrading { .. } => ResourceKind::RclProgress,
        CorpDetail::Spawning { .. } => ResourceKind::SpawningCapacity,
        CorpDetail::Building { .. } => ResourceKind::WorkTicks,
        CorpDetail::Bootstrap { .. } => ResourceKind::Energy,
        CorpDetail::Scout { .. } => ResourceKind::WorkTicks,
    }
}

/// What a corp kind consumes as its material input, if any.
pub fn material_input(detail: &CorpDetail) -> Option<ResourceKind> {
    match detail {
        CorpDetail::Mining { .. } => None,
        CorpDetail::Hauling { .. } => Some(ResourceKind::Energy),
        CorpDetail::Upgrading { .. } => Some(ResourceKind::DeliveredEnergy),
        CorpDetail::Spawning { .. } => Some(ResourceKind::DeliveredEnergy),
        CorpDetail::Building { .. } => Some(ResourceKind::DeliveredEnergy),
        CorpDetail::Bootstrap { .. } => None,
        CorpDetail::Scout { .. } => Some(ResourceKind::SpawningCapacity),
    }
}

fn corps_by_output(corps: &BTreeMap<String, CorpState>, locations: &BTreeMap<String, Position>) -> BTreeMap<ResourceKind, Vec<CorpProfile>> {
    let mut map: BTreeMap<ResourceKind, Vec<CorpProfile>> = BTreeMap::new();
    for state in corps.values() {
        let Some(location) = locations.get(&state.id).copied() else { continue };
        map.entry(output_resource(&state.detail)).or_default().push(CorpProfile {
            corp_id: state.id.clone(),
            output: output_resource(&state.detail),
            material_input: material_input(&state.detail),
            location,
            balance: state.balance,
        });
    }
    map
}

/// Builds a backward chain for every corp, rooted at its own output, up
/// to `config.chain_planner.max_depth`.
pub fn plan_chains(
    corps: &BTreeMap<String, CorpState>,
    locations: &BTreeMap<String, Position>,
    config: &AiConfig,
    desired_rate: f64,
    now: u64,
) -> Vec<Chain> {
    let by_output = corps_by_output(corps, locations);
    let mut chains = Vec::new();
    for state in corps.values() {
        let Some(location) = locations.get(&state.id).copied() else { continue };
        let profile = CorpProfile {
            corp_id: state.id.clone(),
            output: output_resource(&state.detail),
            material_input: material_input(&state.detail),
            location,
            balance: state.balance,
        };
        if let Some(chain) = build_chain(
            format!("chain-{}", state.id),
            &profile,
            &by_output,
            desired_rate,
            config.chain_planner.max_depth,
            now,
        ) {
            chains.push(chain);
        }
    }
    chains
}

/// The configured mint value for a resource, or 0.0 if unconfigured
/// (treated as "this corp kind doesn't mint value directly").
pub fn mint_value_per_unit(config: &AiConfig, resource: &ResourceKind) -> f64 {
    let key = match resource {
        ResourceKind::RclProgress => "rcl_progress",
        ResourceKind::DeliveredEnergy => "delivered_energy",
        ResourceKind::Power => "power",
        _ => return 0.0,
    };
    config.chain_planner.mint_values.get(key).copied().unwrap_or(0.0)
}

/// Sums a chain's profit at today's mint values, for display or
/// funding-decision purposes; zero if the chain's goal has no
/// configured mint value.
pub fn chain_profit(chain: &Chain, config: &AiConfig) -> Decimal {
    let rate = mint_value_per_unit(config, &chain.goal);
    sim_ai::chain_planner::profit(chain, rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::geometry::RoomName;

    #[test]
    fn output_and_input_resources_are_internally_consistent() {
        let mining = CorpDetail::Mining { source_id: "s1".into(), miner_creep_ids: vec![] };
        assert_eq!(output_resource(&mining), ResourceKind::Energy);
        assert_eq!(material_input(&mining), None);

        let hauling = CorpDetail::Hauling { route_from: "a".into(), route_to: vec!["b".into()], hauler_creep_ids: vec![] };
        assert_eq!(material_input(&hauling), Some(ResourceKind::Energy));
    }

    #[test]
    fn plan_chains_builds_one_chain_per_reachable_corp() {
        let room = RoomName::parse("W1N1").unwrap();
        let mut corps = BTreeMap::new();
        let mining = CorpState::new("mining-1", "n1", CorpDetail::Mining { source_id: "s1".into(), miner_creep_ids: vec![] }, 0);
        corps.insert("mining-1".to_string(), mining);
        let hauling = CorpState::new(
            "hauling-1",
            "n1",
            CorpDetail::Hauling { route_from: "a".into(), route_to: vec!["b".into()], hauler_creep_ids: vec![] },
            0,
        );
        corps.insert("hauling-1".to_string(), hauling);

        let mut locations = BTreeMap::new();
        locations.insert("mining-1".to_string(), Position::new(5, 5, room));
        locations.insert("hauling-1".to_string(), Position::new(6, 6, room));

        let config = AiConfig::from_default_yaml().unwrap();
        let chains = plan_chains(&corps, &locations, &config, 5.0, 0);
        assert_eq!(chains.len(), 2);
    }
}
