//! SpawningCorp driver: turns a priority-ordered queue of creep requests
//! (produced by the flow/chain planners) into `spawn_creep` calls,
//! skipping any request the spawn can't afford yet rather than blocking
//! the whole queue behind it (spec.md §4.I "SpawningCorp").

use std::collections::BTreeMap;

use sim_core::corp::CorpDetail;
use sim_core::corp::CorpState;

use crate::host::{CreepMemory, Host};

/// One pending creep request, already body-fitted by the caller.
pub struct SpawnRequest {
    pub name: String,
    pub body: Vec<crate::host::BodyPartKind>,
    pub memory: CreepMemory,
    pub priority: u32,
}

/// Scans every corp for an empty assigned-creep roster and emits one
/// [`SpawnRequest`] per gap, so a corp that just lost its only creep gets
/// back in the queue without the orchestrator needing per-kind logic
/// (spec.md §4.I "SpawningCorp" feeds every other corp's creep
/// population). Priority favours the corps the colony's energy pipeline
/// depends on most directly: mining and hauling first, scouting last.
pub fn collect_requests(corps: &BTreeMap<String, CorpState>, energy_capacity: u32, now: u64) -> Vec<SpawnRequest> {
    let mut requests = Vec::new();
    for state in corps.values() {
        let (body, priority) = match &state.detail {
            CorpDetail::Mining { miner_creep_ids, .. } if miner_creep_ids.is_empty() => (fit_body(energy_capacity, 2, 1, 1), 100),
            CorpDetail::Hauling { hauler_creep_ids, .. } if hauler_creep_ids.is_empty() => (fit_body(energy_capacity, 0, 2, 2), 90),
            CorpDetail::Bootstrap { jack_creep_ids } if jack_creep_ids.is_empty() => (fit_body(energy_capacity, 1, 1, 1), 80),
            CorpDetail::Upgrading { upgrader_creep_ids, .. } if upgrader_creep_ids.is_empty() => (fit_body(energy_capacity, 1, 1, 1), 70),
            CorpDetail::Building { builder_creep_ids, .. } if builder_creep_ids.is_empty() => (fit_body(energy_capacity, 1, 1, 1), 60),
            CorpDetail::Scout { scout_creep_id: None, .. } => (fit_body(energy_capacity, 0, 0, 1), 20),
            _ => continue,
        };
        if body.is_empty() {
            continue;
        }
        requests.push(SpawnRequest {
            name: format!("{}-{now}", state.id),
            body,
            memory: CreepMemory { corp_id: Some(state.id.clone()), ..CreepMemory::default() },
            priority,
        });
    }
    requests
}

/// Assigns a just-spawned creep's name onto its requesting corp's roster,
/// by `memory.corp_id` (spec.md §4.I "SpawningCorp" hands creeps back to
/// the corp that asked for them).
pub fn assign_spawned_creep(corps: &mut BTreeMap<String, CorpState>, corp_id: &str, creep_name: String) {
    let Some(state) = corps.get_mut(corp_id) else { return };
    match &mut state.detail {
        CorpDetail::Mining { miner_creep_ids, .. } => miner_creep_ids.push(creep_name),
        CorpDetail::Hauling { hauler_creep_ids, .. } => hauler_creep_ids.push(creep_name),
        CorpDetail::Bootstrap { jack_creep_ids } => jack_creep_ids.push(creep_name),
        CorpDetail::Upgrading { upgrader_creep_ids, .. } => upgrader_creep_ids.push(creep_name),
        CorpDetail::Building { builder_creep_ids, .. } => builder_creep_ids.push(creep_name),
        CorpDetail::Scout { scout_creep_id, .. } => *scout_creep_id = Some(creep_name),
        CorpDetail::Spawning { .. } => {}
    }
}

/// Attempts each request against its spawn's current energy, highest
/// priority first; deterministic creep naming is the caller's
/// responsibility via `request.name` (spec.md §4.I "deterministic
/// naming").
pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64, requests: &mut Vec<SpawnRequest>) {
    let CorpDetail::Spawning { spawn_id } = &state.detail else {
        return;
    };
    let spawn_id = spawn_id.clone();
    requests.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut spawned_any = false;
    let mut remaining = Vec::new();
    for request in requests.drain(..) {
        if host.spawn_creep(&spawn_id, &request.body, &request.name, request.memory.clone()) == crate::host::ReturnCode::Ok {
            spawned_any = true;
        } else {
            remaining.push(request);
        }
    }
    *requests = remaining;

    if spawned_any {
        state.mark_active(now);
    }
}

/// Fits a creep body to an energy budget at a fixed WORK:CARRY:MOVE
/// ratio, rounding down to whole body sets (spec.md §4.I "body fitting").
pub fn fit_body(energy_budget: u32, work: u32, carry: u32, move_parts: u32) -> Vec<crate::host::BodyPartKind> {
    use crate::host::BodyPartKind;
    let unit_cost = work * 100 + carry * 50 + move_parts * 50;
    if unit_cost == 0 {
        return Vec::new();
    }
    let units = (energy_budget / unit_cost).max(1);
    let mut body = Vec::new();
    for _ in 0..units {
        for _ in 0..work {
            body.push(BodyPartKind::Work);
        }
        for _ in 0..carry {
            body.push(BodyPartKind::Carry);
        }
        for _ in 0..move_parts {
            body.push(BodyPartKind::Move);
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use sim_core::geometry::{Position, RoomName};

    use super::*;
    use crate::host::{MockHost, Structure, StructureKind};

    #[test]
    fn higher_priority_request_spawns_first_when_energy_is_scarce() {
        let room = RoomName::parse("W1N1").unwrap();
        let mut host = MockHost::new(100.0);
        host.structures.insert(
            "spawn1".into(),
            Structure { id: "spawn1".into(), kind: StructureKind::Spawn, position: Position::new(5, 5, room), energy: 200, energy_capacity: 300, rcl: 1 },
        );
        let mut state = CorpState::new("spawning-1", "n1", CorpDetail::Spawning { spawn_id: "spawn1".into() }, 0);
        let mut requests = vec![
            SpawnRequest { name: "low".into(), body: fit_body(200, 1, 1, 1), memory: CreepMemory::default(), priority: 1 },
            SpawnRequest { name: "high".into(), body: fit_body(200, 1, 1, 1), memory: CreepMemory::default(), priority: 10 },
        ];
        execute(&mut host, &mut state, 4, &mut requests);
        assert!(host.creeps.contains_key("high"));
        assert!(!host.creeps.contains_key("low"));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "low");
    }

    #[test]
    fn fit_body_rounds_down_to_whole_sets() {
        let body = fit_body(450, 1, 1, 1);
        assert_eq!(body.len(), 6); // 200 energy/unit, 450/200 = 2 sets of 3 parts
    }

    #[test]
    fn collect_requests_skips_corps_with_an_assigned_creep() {
        let mut corps = BTreeMap::new();
        corps.insert(
            "mining-1".to_string(),
            CorpState::new("mining-1", "n1", CorpDetail::Mining { source_id: "s1".into(), miner_creep_ids: vec![] }, 0),
        );
        corps.insert(
            "mining-2".to_string(),
            CorpState::new("mining-2", "n1", CorpDetail::Mining { source_id: "s2".into(), miner_creep_ids: vec!["miner-x".into()] }, 0),
        );
        let requests = collect_requests(&corps, 300, 10);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].memory.corp_id.as_deref(), Some("mining-1"));
        assert_eq!(requests[0].priority, 100);
    }

    #[test]
    fn assign_spawned_creep_pushes_onto_the_matching_roster() {
        let mut corps = BTreeMap::new();
        corps.insert(
            "hauling-1".to_string(),
            CorpState::new("hauling-1", "n1", CorpDetail::Hauling { route_from: "a".into(), route_to: vec!["b".into()], hauler_creep_ids: vec![] }, 0),
        );
        assign_spawned_creep(&mut corps, "hauling-1", "hauler-9".into());
        match &corps["hauling-1"].detail {
            CorpDetail::Hauling { hauler_creep_ids, .. } => assert_eq!(hauler_creep_ids, &vec!["hauler-9".to_string()]),
            _ => panic!("expected Hauling detail"),
        }
    }
}
