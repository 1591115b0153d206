//! The flow planner: assigns sources to sinks by descending sink priority,
//! then sizes miner and hauler bodies for the resulting assignments
//! (spec.md §4.D).

use std::collections::BTreeMap;

use crate::constants::{CARRY_COST, CREEP_LIFETIME_TICKS, HAUL_PER_CARRY, MOVE_COST, ROUND_TRIP_OVERHEAD};

/// Fixed sink priorities; higher is allocated first (spec.md §4.D "sink
/// priority").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SinkKind {
    Spawn,
    Extension,
    Tower,
    Controller,
    Construction,
    Storage,
}

impl SinkKind {
    pub fn priority(self) -> u32 {
        match self {
            SinkKind::Spawn => 100,
            SinkKind::Extension => 90,
            SinkKind::Tower => 80,
            SinkKind::Controller => 60,
            SinkKind::Construction => 40,
            SinkKind::Storage => 10,
        }
    }
}

/// Maximum WORK parts a single creep body can carry, bounding miner sizing
/// independent of mining-spot count.
pub const MAX_WORK_PER_BODY: u32 = 16;

#[derive(Clone, Debug)]
pub struct SourceInput {
    pub id: String,
    pub node_id: String,
    pub capacity: f64,
    pub mining_spots: u32,
    pub spawn_distance: u32,
}

#[derive(Clone, Debug)]
pub struct SinkInput {
    pub id: String,
    pub kind: SinkKind,
    pub demand: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinerAssignment {
    pub source_id: String,
    pub node_id: String,
    pub harvest_rate: f64,
    pub work_parts: u32,
    pub efficiency: f64,
    pub spawn_distance: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaulerAssignment {
    pub from_id: String,
    pub to_id: String,
    pub flow_rate: f64,
    pub distance: u32,
    pub carry_parts: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SinkAllocation {
    pub sink_id: String,
    pub sink_type: SinkKind,
    pub demand: f64,
    pub allocated: f64,
    pub unmet: f64,
    pub priority: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowAggregates {
    pub total_harvest: f64,
    pub total_overhead: f64,
    pub net_energy: f64,
    pub efficiency: f64,
    pub is_sustainable: bool,
    pub miner_count: u32,
    pub hauler_count: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlowSolution {
    pub miners: Vec<MinerAssignment>,
    pub haulers: Vec<HaulerAssignment>,
    pub sinks: Vec<SinkAllocation>,
    pub aggregates: FlowAggregates,
    pub warnings: Vec<String>,
}

/// CARRY parts needed to sustain `rate` over a round trip of `distance`
/// one-way tiles (spec.md §4.D "Compute the CARRY parts").
pub fn carry_parts_for(rate: f64, distance: u32) -> u32 {
    let round_trip = (ROUND_TRIP_OVERHEAD * distance) as f64 + ROUND_TRIP_OVERHEAD as f64;
    ((rate * round_trip) / HAUL_PER_CARRY as f64).ceil().max(0.0) as u32
}

/// WORK parts needed to harvest `rate`, capped by `mining_spots *
/// MAX_WORK_PER_BODY` (spec.md §4.D "miner sizing").
pub fn work_parts_for(rate: f64, mining_spots: u32) -> u32 {
    let needed = (rate / 2.0).ceil().max(0.0) as u32;
    needed.min(mining_spots.saturating_mul(MAX_WORK_PER_BODY))
}

/// Greedily allocate sources to sinks in descending priority order,
/// nearest source first (spec.md §4.D "Allocation algorithm"). Never
/// fails: an unsatisfiable demand is recorded as `unmet` plus a warning.
pub fn plan_flow(
    sources: &[SourceInput],
    sinks: &[SinkInput],
    distance: impl Fn(&str, &str) -> u32,
) -> FlowSolution {
    let mut remaining: BTreeMap<String, f64> = sources.iter().map(|s| (s.id.clone(), s.capacity)).collect();
    let mut harvested: BTreeMap<String, f64> = sources.iter().map(|s| (s.id.clone(), 0.0)).collect();
    let mut hauler_totals: BTreeMap<(String, String), (f64, u32)> = BTreeMap::new();
    let mut sink_allocations = Vec::new();
    let mut warnings = Vec::new();

    let mut ordered_sinks: Vec<&SinkInput> = sinks.iter().collect();
    ordered_sinks.sort_by(|a, b| b.kind.priority().cmp(&a.kind.priority()).then_with(|| a.id.cmp(&b.id)));

    for sink in ordered_sinks {
        let mut remaining_demand = sink.demand;
        let mut ordered_sources: Vec<&SourceInput> = sources.iter().collect();
        ordered_sources.sort_by_key(|s| (distance(&s.id, &sink.id), s.id.clone()));

        for source in ordered_sources {
            if remaining_demand <= 0.0 {
                break;
            }
            let cap = remaining.get(&source.id).copied().unwrap_or(0.0);
            if cap <= 0.0 {
                continue;
            }
            let allocated = cap.min(remaining_demand);
            if allocated <= 0.0 {
                continue;
            }
            *remaining.get_mut(&source.id).unwrap() -= allocated;
            *harvested.get_mut(&source.id).unwrap() += allocated;
            remaining_demand -= allocated;

            let dist = distance(&source.id, &sink.id);
            let entry = hauler_totals.entry((source.id.clone(), sink.id.clone())).or_insert((0.0, dist));
            entry.0 += allocated;
        }

        let allocated = sink.demand - remaining_demand;
        if remaining_demand > 0.0 {
            let message = format!(
                "sink {} unmet demand {:.2} (wanted {:.2}, got {:.2})",
                sink.id, remaining_demand, sink.demand, allocated
            );
            tracing::warn!(sink_id = %sink.id, unmet = remaining_demand, "{message}");
            warnings.push(message);
        }
        sink_allocations.push(SinkAllocation {
            sink_id: sink.id.clone(),
            sink_type: sink.kind,
            demand: sink.demand,
            allocated,
            unmet: remaining_demand.max(0.0),
            priority: sink.kind.priority(),
        });
    }

    let miners: Vec<MinerAssignment> = sources
        .iter()
        .map(|s| {
            let rate = harvested.get(&s.id).copied().unwrap_or(0.0);
            let work_parts = work_parts_for(rate, s.mining_spots);
            let max_rate = s.mining_spots as f64 * (MAX_WORK_PER_BODY as f64) * 2.0;
            let efficiency = if max_rate > 0.0 { (rate / max_rate).min(1.0) } else { 0.0 };
            MinerAssignment {
                source_id: s.id.clone(),
                node_id: s.node_id.clone(),
                harvest_rate: rate,
                work_parts,
                efficiency,
                spawn_distance: s.spawn_distance,
            }
        })
        .filter(|m| m.harvest_rate > 0.0)
        .collect();

    let haulers: Vec<HaulerAssignment> = hauler_totals
        .into_iter()
        .map(|((from, to), (rate, dist))| HaulerAssignment {
            from_id: from,
            to_id: to,
            flow_rate: rate,
            distance: dist,
            carry_parts: carry_parts_for(rate, dist),
        })
        .collect();

    let total_harvest: f64 = miners.iter().map(|m| m.harvest_rate).sum();
    // 1 MOVE part per CARRY part keeps haulers at full speed on plain terrain;
    // amortise the body's build cost over its lifetime to get an energy/tick overhead.
    let total_overhead: f64 = haulers
        .iter()
        .map(|h| (h.carry_parts * (CARRY_COST + MOVE_COST)) as f64 / CREEP_LIFETIME_TICKS as f64)
        .sum();
    let total_demand: f64 = sinks.iter().map(|s| s.demand).sum();
    let net_energy = total_harvest - total_overhead;
    let is_sustainable = sink_allocations.iter().all(|s| s.unmet <= f64::EPSILON);
    let efficiency = if total_demand > 0.0 { (total_harvest / total_demand).min(1.0) } else { 1.0 };

    FlowSolution {
        miners: miners.clone(),
        haulers: haulers.clone(),
        sinks: sink_allocations,
        aggregates: FlowAggregates {
            total_harvest,
            total_overhead,
            net_energy,
            efficiency,
            is_sustainable,
            miner_count: miners.len() as u32,
            hauler_count: haulers.len() as u32,
        },
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(id: &str, capacity: f64, spots: u32, spawn_distance: u32) -> SourceInput {
        SourceInput {
            id: id.into(),
            node_id: format!("node-{id}"),
            capacity,
            mining_spots: spots,
            spawn_distance,
        }
    }

    fn sink(id: &str, kind: SinkKind, demand: f64) -> SinkInput {
        SinkInput { id: id.into(), kind, demand }
    }

    #[test]
    fn single_source_single_sink_saturates_at_ten() {
        let sources = vec![src("s1", 10.0, 3, 5)];
        let sinks = vec![sink("spawn1", SinkKind::Spawn, 10.0)];
        let solution = plan_flow(&sources, &sinks, |_, _| 5);
        assert!(solution.aggregates.is_sustainable);
        assert_eq!(solution.aggregates.total_harvest, 10.0);
        assert_eq!(solution.miners.len(), 1);
        assert_eq!(solution.miners[0].work_parts, 5);
        assert_eq!(solution.haulers.len(), 1);
        assert!(solution.warnings.is_empty());
    }

    #[test]
    fn insufficient_capacity_reports_unmet_and_unsustainable() {
        let sources = vec![src("s1", 5.0, 1, 5)];
        let sinks = vec![sink("spawn1", SinkKind::Spawn, 10.0)];
        let solution = plan_flow(&sources, &sinks, |_, _| 5);
        assert!(!solution.aggregates.is_sustainable);
        assert_eq!(solution.sinks[0].unmet, 5.0);
        assert!(!solution.warnings.is_empty());
    }

    #[test]
    fn higher_priority_sinks_allocate_first() {
        let sources = vec![src("s1", 10.0, 3, 5)];
        let sinks = vec![
            sink("storage1", SinkKind::Storage, 10.0),
            sink("spawn1", SinkKind::Spawn, 10.0),
        ];
        let solution = plan_flow(&sources, &sinks, |_, _| 5);
        let spawn_alloc = solution.sinks.iter().find(|s| s.sink_id == "spawn1").unwrap();
        let storage_alloc = solution.sinks.iter().find(|s| s.sink_id == "storage1").unwrap();
        assert_eq!(spawn_alloc.allocated, 10.0);
        assert_eq!(storage_alloc.allocated, 0.0);
    }

    #[test]
    fn nearer_source_serves_sink_before_farther_one() {
        let sources = vec![src("far", 10.0, 3, 20), src("near", 10.0, 3, 2)];
        let sinks = vec![sink("spawn1", SinkKind::Spawn, 5.0)];
        let dist = |source: &str, _sink: &str| if source == "near" { 2 } else { 20 };
        let solution = plan_flow(&sources, &sinks, dist);
        let near_miner = solution.miners.iter().find(|m| m.source_id == "near").unwrap();
        assert_eq!(near_miner.harvest_rate, 5.0);
        assert!(solution.miners.iter().find(|m| m.source_id == "far").is_none());
    }

    #[test]
    fn carry_parts_round_up() {
        assert_eq!(carry_parts_for(10.0, 10), ((10.0 * 22.0) / 50.0).ceil() as u32);
    }

    #[test]
    fn work_parts_capped_by_mining_spots() {
        assert_eq!(work_parts_for(1000.0, 1), MAX_WORK_PER_BODY);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn carry_parts_never_decrease_with_distance(rate in 0.1f64..50.0, d1 in 0u32..40, extra in 0u32..40) {
            let d2 = d1 + extra;
            prop_assert!(carry_parts_for(rate, d2) >= carry_parts_for(rate, d1));
        }

        #[test]
        fn work_parts_stay_within_the_mining_spot_cap(rate in 0.0f64..5000.0, spots in 1u32..10) {
            prop_assert!(work_parts_for(rate, spots) <= spots * MAX_WORK_PER_BODY);
        }
    }
}
