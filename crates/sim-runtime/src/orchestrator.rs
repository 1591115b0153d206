//! Tick scheduling: which phases run this tick, and what gets skipped
//! under CPU pressure (spec.md §4.K).
//!
//! Execution (`execute()` drivers) always runs every tick — it is the
//! only phase that touches creeps, and skipping it for more than a tick
//! or two starves the colony. Everything else runs on a fixed interval
//! and additionally degrades, in a fixed order, when CPU is tight:
//! chain planning drops first (it's the most speculative and expensive
//! phase), then metrics, then the graph rebuild (the least urgent since
//! the graph changes slowly). Within a planning pass, a [`CpuBudget`]
//! keeps later steps (market clearing, flow planning, bank allocation)
//! from running once the earlier ones have already eaten the tick's
//! spare CPU.

use std::collections::BTreeMap;

use persistence::RoomIntel;
use rust_decimal::Decimal;
use sim_ai::config::AiConfig;
use sim_core::bank::CapitalAllocation;
use sim_core::corp::{CorpDetail, CorpState};
use sim_core::geometry::{Position, Terrain};
use sim_core::{Chain, Contract, Offer, Transaction};
use sim_econ::{equilibrium_status, plan_flow, EquilibriumStatus, FlowSolution, GraphMetrics, SinkInput, SinkKind, SourceInput};
use sim_core::graph::WorldGraph;

use crate::execute::{self, scout, spawning};
use crate::host::Host;
use crate::planning;

pub const REBUILD_INTERVAL: u64 = 50;
pub const PLANNING_INTERVAL: u64 = 50;
pub const SCOUT_PLANNING_INTERVAL: u64 = 5_000;

/// CPU-bucket thresholds below which a phase is skipped this tick.
/// Chain planning is the cheapest to give up and the first to go;
/// skipping the graph rebuild needs much more pressure since it runs
/// rarely already.
pub const CHAIN_PLANNING_CPU_FLOOR: f64 = 500.0;
pub const METRICS_CPU_FLOOR: f64 = 200.0;
pub const GRAPH_REBUILD_CPU_FLOOR: f64 = 50.0;

/// Per-step CPU costs charged against a tick's [`CpuBudget`]; rough
/// estimates in the same units as `Host::cpu_budget_remaining`, not
/// measured, since a mock host never actually burns CPU.
pub const MARKET_CLEARING_CPU_COST: f64 = 40.0;
pub const CHAIN_FUNDING_CPU_COST: f64 = 15.0;
pub const FLOW_PLANNING_CPU_COST: f64 = 60.0;
pub const BANK_ALLOCATION_CPU_COST: f64 = 10.0;

/// Tracks CPU spent against this tick's bucket so optional planning
/// steps can bail out before overrunning, the way a Screeps bot budgets
/// its own CPU limit across a list of candidate jobs rather than
/// discovering the overrun after the fact.
#[derive(Clone, Copy, Debug)]
pub struct CpuBudget {
    limit: f64,
    spent: f64,
}

impl CpuBudget {
    pub fn new(limit: f64) -> Self {
        CpuBudget { limit: limit.max(0.0), spent: 0.0 }
    }

    pub fn remaining(&self) -> f64 {
        (self.limit - self.spent).max(0.0)
    }

    pub fn charge(&mut self, cost: f64) {
        self.spent += cost.max(0.0);
    }

    /// Whether a step costing `cost` can still run without exceeding the
    /// budget.
    pub fn should_continue(&self, cost: f64) -> bool {
        self.remaining() >= cost
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhasePlan {
    pub rebuild_graph: bool,
    pub plan_chains: bool,
    pub compute_metrics: bool,
    pub plan_scouts: bool,
}

/// Everything a completed [`Orchestrator::tick`] produced, so a caller
/// (the CLI runner, telemetry) can report on real computed state instead
/// of re-deriving it.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub phase_plan: PhasePlan,
    pub pruned: Vec<String>,
    pub chains: Vec<Chain>,
    pub funded_contracts: Vec<Contract>,
    pub transactions: Vec<Transaction>,
    pub cleared_contracts: Vec<Contract>,
    pub bank_allocations: Vec<CapitalAllocation>,
    pub flow: Option<FlowSolution>,
    pub graph_metrics: Option<GraphMetrics>,
    pub equilibrium: EquilibriumStatus,
    pub supply: f64,
    pub demand: f64,
}

impl Default for TickReport {
    fn default() -> Self {
        TickReport {
            phase_plan: PhasePlan::default(),
            pruned: Vec::new(),
            chains: Vec::new(),
            funded_contracts: Vec::new(),
            transactions: Vec::new(),
            cleared_contracts: Vec::new(),
            bank_allocations: Vec::new(),
            flow: None,
            graph_metrics: None,
            equilibrium: EquilibriumStatus::Balanced,
            supply: 0.0,
            demand: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Orchestrator {
    last_rebuild: Option<u64>,
    last_planning: Option<u64>,
    last_scout_planning: Option<u64>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Orchestrator { last_rebuild: None, last_planning: None, last_scout_planning: None }
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides which non-execution phases run this tick, given elapsed
    /// ticks since each phase last ran and the host's CPU bucket.
    pub fn phase_plan(&mut self, tick: u64, cpu_bucket: f64) -> PhasePlan {
        let due_rebuild = self.last_rebuild.map_or(true, |t| tick.saturating_sub(t) >= REBUILD_INTERVAL);
        let due_planning = self.last_planning.map_or(true, |t| tick.saturating_sub(t) >= PLANNING_INTERVAL);
        let due_scout = self.last_scout_planning.map_or(true, |t| tick.saturating_sub(t) >= SCOUT_PLANNING_INTERVAL);

        let plan_chains = due_planning && cpu_bucket >= CHAIN_PLANNING_CPU_FLOOR;
        let compute_metrics = due_planning && cpu_bucket >= METRICS_CPU_FLOOR;
        let rebuild_graph = due_rebuild && cpu_bucket >= GRAPH_REBUILD_CPU_FLOOR;

        if plan_chains {
            self.last_planning = Some(tick);
        }
        if rebuild_graph {
            self.last_rebuild = Some(tick);
        }
        if due_scout {
            self.last_scout_planning = Some(tick);
        }

        PhasePlan { rebuild_graph, plan_chains, compute_metrics, plan_scouts: due_scout }
    }

    /// Runs one full tick: every corp's `execute()` driver, spawning and
    /// scouting (which need state beyond a single corp), and — on the
    /// cadence `phase_plan` decides, budget permitting — chain funding,
    /// market clearing, flow planning, and bank allocation.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        host: &mut dyn Host,
        corps: &mut BTreeMap<String, CorpState>,
        locations: &BTreeMap<String, Position>,
        config: &AiConfig,
        room_intel: &mut BTreeMap<String, RoomIntel>,
        offers: &[Offer],
        graph: Option<&WorldGraph>,
        now: u64,
    ) -> TickReport {
        let plan = self.phase_plan(now, host.cpu_budget_remaining());
        execute_all(host, corps, room_intel, now);

        let pruned = prune_corps(corps, now);

        let mut budget = CpuBudget::new(host.cpu_budget_remaining());
        let mut chains = Vec::new();
        let mut funded_contracts = Vec::new();
        let mut transactions = Vec::new();
        let mut cleared_contracts = Vec::new();
        let mut bank_allocations = Vec::new();
        let mut flow = None;
        let mut graph_metrics = None;

        if plan.plan_chains {
            chains = planning::plan_chains(corps, locations, config, 5.0, now);
            for chain in chains.iter_mut() {
                if !budget.should_continue(CHAIN_FUNDING_CPU_COST) {
                    break;
                }
                budget.charge(CHAIN_FUNDING_CPU_COST);
                if chain.is_fully_funded() {
                    continue;
                }
                if let Some(contract) = chain.fund_next(now) {
                    let mint_rate = planning::mint_value_per_unit(config, &chain.goal);
                    let supply_cost: f64 = contract.unit_price.try_into().unwrap_or(0.0);
                    let suggested_rate = sim_ai::suggest_investment_rate(supply_cost, mint_rate, config.bank.target_roi);
                    let free_capital: Decimal = corps.values().map(|c| c.balance).filter(|b| *b > Decimal::ZERO).sum();
                    bank_allocations.push(sim_ai::allocate(chain.id.clone(), chain.funded_through.saturating_sub(1), contract.price(), free_capital, suggested_rate));
                    if let Some(seller) = corps.get_mut(&contract.seller_id) {
                        seller.contracts.push(contract.id.clone());
                    }
                    if let Some(buyer) = corps.get_mut(&contract.buyer_id) {
                        buyer.contracts.push(contract.id.clone());
                    }
                    funded_contracts.push(contract);
                }
            }

            if budget.should_continue(MARKET_CLEARING_CPU_COST) && !offers.is_empty() {
                budget.charge(MARKET_CLEARING_CPU_COST);
                let (cleared_transactions, contracts) = sim_core::clear_offers(offers, now);
                for txn in &cleared_transactions {
                    let amount = txn.clearing_price * Decimal::try_from(txn.quantity).unwrap_or(Decimal::ZERO);
                    if let Some(seller) = corps.get_mut(&txn.seller_corp) {
                        seller.record_revenue(amount);
                        seller.mark_active(now);
                    }
                    if let Some(buyer) = corps.get_mut(&txn.buyer_corp) {
                        buyer.record_cost(amount);
                        buyer.mark_active(now);
                    }
                }
                transactions = cleared_transactions;
                cleared_contracts = contracts;
            }

            if budget.should_continue(FLOW_PLANNING_CPU_COST) {
                budget.charge(FLOW_PLANNING_CPU_COST);
                let (sources, sinks) = build_flow_inputs(host, corps, locations);
                if !sources.is_empty() && !sinks.is_empty() {
                    flow = Some(plan_flow(&sources, &sinks, |a, b| node_distance(locations, a, b)));
                }
            }
        }

        if plan.compute_metrics {
            if let Some(graph) = graph {
                graph_metrics = Some(sim_econ::compute_graph_metrics(graph));
            }
        }

        let supply: f64 = corps.values().map(|c| c.units_produced).sum();
        let demand: f64 = corps.values().map(|c| c.units_consumed).sum();
        let equilibrium = equilibrium_status(supply, demand);

        TickReport {
            phase_plan: plan,
            pruned,
            chains,
            funded_contracts,
            transactions,
            cleared_contracts,
            bank_allocations,
            flow,
            graph_metrics,
            equilibrium,
            supply,
            demand,
        }
    }
}

/// Chebyshev distance between two corps' registered locations, falling
/// back to 1 tile when either side is unknown (e.g. a corp not yet
/// placed on the map) rather than refusing to plan at all.
fn node_distance(locations: &BTreeMap<String, Position>, a: &str, b: &str) -> u32 {
    match (locations.get(a), locations.get(b)) {
        (Some(a), Some(b)) => a.chebyshev(b),
        _ => 1,
    }
}

/// Builds the flow planner's inputs from whatever mining/spawning/
/// upgrading/building corps currently exist, so `plan_flow` runs against
/// the live colony instead of only its own unit-test fixtures.
fn build_flow_inputs(host: &dyn Host, corps: &BTreeMap<String, CorpState>, locations: &BTreeMap<String, Position>) -> (Vec<SourceInput>, Vec<SinkInput>) {
    let mut sources = Vec::new();
    let mut sinks = Vec::new();

    for state in corps.values() {
        match &state.detail {
            CorpDetail::Mining { source_id, .. } => {
                let Some(source) = host.source(source_id) else { continue };
                let spawn_distance = host
                    .structures_in_room(source.position.room)
                    .into_iter()
                    .filter(|s| s.kind == crate::host::StructureKind::Spawn)
                    .map(|s| s.position.chebyshev(&source.position))
                    .min()
                    .unwrap_or(0);
                sources.push(SourceInput {
                    id: source_id.clone(),
                    node_id: state.node_id.clone(),
                    capacity: source.energy_capacity,
                    mining_spots: source_mining_spots(host, &source.position),
                    spawn_distance,
                });
            }
            CorpDetail::Spawning { spawn_id } => {
                if let Some(structure) = host.structure(spawn_id) {
                    let demand = (structure.energy_capacity.saturating_sub(structure.energy)) as f64;
                    if demand > 0.0 {
                        sinks.push(SinkInput { id: state.id.clone(), kind: SinkKind::Spawn, demand });
                    }
                }
            }
            CorpDetail::Upgrading { upgrader_creep_ids, .. } => {
                let demand = upgrader_creep_ids.len() as f64 * 5.0;
                if demand > 0.0 {
                    sinks.push(SinkInput { id: state.id.clone(), kind: SinkKind::Controller, demand });
                }
            }
            CorpDetail::Building { construction_site_ids, .. } => {
                let demand: u32 = construction_site_ids.iter().filter_map(|id| host.construction_site(id)).map(|s| s.progress_total.saturating_sub(s.progress)).sum();
                if demand > 0 {
                    sinks.push(SinkInput { id: state.id.clone(), kind: SinkKind::Construction, demand: demand as f64 });
                }
            }
            _ => {}
        }
    }

    let _ = locations;
    (sources, sinks)
}

fn source_mining_spots(host: &dyn Host, source_position: &Position) -> u32 {
    let neighbours: Vec<(i32, i32)> = source_position.neighbours8().iter().map(|p| (p.x as i32, p.y as i32)).collect();
    sim_econ::count_mining_spots(&neighbours, |x, y| {
        if x < 0 || y < 0 || x > 49 || y > 49 {
            return false;
        }
        host.terrain_at(Position::new(x as u8, y as u8, source_position.room)) != Terrain::Wall
    })
}

/// Runs every corp's `execute()` driver once, including the corp kinds
/// that need state beyond their own (`Spawning` needs a live request
/// queue, `Scout` needs the shared room-intel map). This is the part of
/// the tick that never skips (spec.md §4.K "execute always runs").
pub fn execute_all(host: &mut dyn Host, corps: &mut BTreeMap<String, CorpState>, room_intel: &mut BTreeMap<String, RoomIntel>, now: u64) {
    let energy_capacity = corps
        .values()
        .find_map(|state| match &state.detail {
            CorpDetail::Spawning { spawn_id } => host.structure(spawn_id).map(|s| s.energy_capacity),
            _ => None,
        })
        .unwrap_or(300);
    let mut requests = spawning::collect_requests(corps, energy_capacity, now);
    let pending: BTreeMap<String, String> = requests.iter().filter_map(|r| r.memory.corp_id.clone().map(|corp_id| (r.name.clone(), corp_id))).collect();

    for state in corps.values_mut() {
        match &state.detail {
            CorpDetail::Scout { .. } => scout::execute(host, state, now, room_intel),
            CorpDetail::Spawning { .. } => spawning::execute(host, state, now, &mut requests),
            _ => execute::execute(host, state, now),
        }
    }

    let still_pending: std::collections::HashSet<&String> = requests.iter().map(|r| &r.name).collect();
    for (name, corp_id) in pending {
        if !still_pending.contains(&name) {
            spawning::assign_spawned_creep(corps, &corp_id, name);
        }
    }
}

/// Drops corps that have gone bankrupt or dormant, returning their ids
/// so callers can unwind any contracts/chains referencing them (spec.md
/// §4.E "pruning").
pub fn prune_corps(corps: &mut BTreeMap<String, CorpState>, now: u64) -> Vec<String> {
    let dead: Vec<String> = corps.iter().filter(|(_, c)| c.should_prune(now)).map(|(id, _)| id.clone()).collect();
    for id in &dead {
        corps.remove(id);
    }
    dead
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_runs_every_phase_with_ample_cpu() {
        let mut orch = Orchestrator::new();
        let plan = orch.phase_plan(0, 10_000.0);
        assert!(plan.rebuild_graph && plan.plan_chains && plan.compute_metrics && plan.plan_scouts);
    }

    #[test]
    fn phases_stay_off_cooldown_until_their_interval_elapses() {
        let mut orch = Orchestrator::new();
        orch.phase_plan(0, 10_000.0);
        let plan = orch.phase_plan(10, 10_000.0);
        assert!(!plan.rebuild_graph && !plan.plan_chains && !plan.compute_metrics && !plan.plan_scouts);
        let plan = orch.phase_plan(50, 10_000.0);
        assert!(plan.rebuild_graph && plan.plan_chains && plan.compute_metrics);
    }

    #[test]
    fn low_cpu_drops_chain_planning_before_metrics_before_rebuild() {
        let mut orch = Orchestrator::new();
        let plan = orch.phase_plan(0, 100.0);
        assert!(!plan.plan_chains);
        assert!(!plan.compute_metrics);
        assert!(plan.rebuild_graph);
    }

    #[test]
    fn severe_cpu_pressure_drops_the_graph_rebuild_too() {
        let mut orch = Orchestrator::new();
        let plan = orch.phase_plan(0, 10.0);
        assert!(!plan.plan_chains && !plan.compute_metrics && !plan.rebuild_graph);
    }

    #[test]
    fn pruning_removes_bankrupt_corps_and_returns_their_ids() {
        use sim_core::corp::CorpDetail;
        let mut corps = BTreeMap::new();
        let mut bankrupt = CorpState::new("c1", "n1", CorpDetail::Bootstrap { jack_creep_ids: vec![] }, 0);
        bankrupt.balance = rust_decimal::Decimal::new(-200, 0);
        corps.insert("c1".to_string(), bankrupt);
        corps.insert("c2".to_string(), CorpState::new("c2", "n1", CorpDetail::Bootstrap { jack_creep_ids: vec![] }, 0));
        let dead = prune_corps(&mut corps, 1);
        assert_eq!(dead, vec!["c1".to_string()]);
        assert_eq!(corps.len(), 1);
    }

    #[test]
    fn cpu_budget_stops_admitting_steps_once_exhausted() {
        let mut budget = CpuBudget::new(50.0);
        assert!(budget.should_continue(40.0));
        budget.charge(40.0);
        assert!(!budget.should_continue(40.0));
        assert!(budget.should_continue(10.0));
    }

    #[test]
    fn tick_runs_spawning_and_scout_drivers_through_execute_all() {
        use crate::host::{BodyPartKind, Creep, CreepMemory, MockHost, Structure, StructureKind};
        use sim_core::corp::CorpDetail;
        use sim_core::geometry::RoomName;

        let room = RoomName::parse("W1N1").unwrap();
        let mut host = MockHost::new(1_000.0);
        host.structures.insert(
            "spawn1".into(),
            Structure { id: "spawn1".into(), kind: StructureKind::Spawn, position: Position::new(5, 5, room), energy: 300, energy_capacity: 300, rcl: 1 },
        );
        host.creeps.insert(
            "scout1".into(),
            Creep {
                id: "scout1".into(),
                position: Position::new(0, 25, room),
                body: vec![BodyPartKind::Move],
                store: BTreeMap::new(),
                store_capacity: 0,
                ticks_to_live: 1500,
                memory: CreepMemory::default(),
            },
        );

        let mut corps = BTreeMap::new();
        corps.insert("spawning-1".to_string(), CorpState::new("spawning-1", "n1", CorpDetail::Spawning { spawn_id: "spawn1".into() }, 0));
        corps.insert(
            "scout-1".to_string(),
            CorpState::new("scout-1", "n1", CorpDetail::Scout { scout_creep_id: Some("scout1".into()), blocked_rooms: vec![] }, 0),
        );
        corps.insert("mining-1".to_string(), CorpState::new("mining-1", "n1", CorpDetail::Mining { source_id: "s1".into(), miner_creep_ids: vec![] }, 0));

        let mut room_intel = BTreeMap::new();
        execute_all(&mut host, &mut corps, &mut room_intel, 3);

        assert!(room_intel.contains_key(&room.to_string()));
        assert_eq!(corps["scout-1"].last_activity_tick, 3);
    }
}
