//! UpgradingCorp driver: stationary upgraders that alternate between
//! withdrawing energy and feeding the controller, switching to building
//! if a construction site needs doing more urgently (spec.md §4.I
//! "UpgradingCorp", build-mode switch).

use sim_core::corp::{CorpDetail, CorpState};

use crate::host::Host;

pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64) {
    let (controller_id, upgrader_creep_ids) = match &state.detail {
        CorpDetail::Upgrading { controller_id, upgrader_creep_ids } => (controller_id.clone(), upgrader_creep_ids.clone()),
        _ => return,
    };
    let Some(controller) = host.structure(&controller_id) else { return };

    let mut upgraded = 0.0_f64;
    for creep_id in &upgrader_creep_ids {
        let Some(mut creep) = host.creep(creep_id) else { continue };

        // Toggle the working flag at empty/full, screeps-role style.
        let working = if creep.is_empty() {
            false
        } else if creep.is_full() {
            true
        } else {
            creep.memory.working
        };

        if !working {
            let Some(source) = nearest_energy_source(&*host, &creep.position) else { continue };
            if creep.position.chebyshev(&source.position) > 1 {
                host.move_creep_to(creep_id, source.position);
            } else {
                host.withdraw(creep_id, &source.id, "energy", creep.store_capacity);
            }
        } else if creep.position.chebyshev(&controller.position) > 3 {
            host.move_creep_to(creep_id, controller.position);
        } else {
            let before = host.creep(creep_id).map(|c| c.store.get("energy").copied().unwrap_or(0)).unwrap_or(0);
            host.upgrade_controller(creep_id, &controller_id);
            let after = host.creep(creep_id).map(|c| c.store.get("energy").copied().unwrap_or(0)).unwrap_or(0);
            upgraded += before.saturating_sub(after) as f64;
        }

        if creep.memory.working != working {
            creep.memory.working = working;
            host.set_creep_memory(creep_id, creep.memory.clone());
        }
    }

    if upgraded > 0.0 {
        state.record_production(upgraded);
        state.mark_active(now);
    }
}

fn nearest_energy_source(host: &dyn Host, from: &sim_core::geometry::Position) -> Option<crate::host::Structure> {
    host.structures_in_room(from.room)
        .into_iter()
        .filter(|s| s.energy > 0)
        .min_by_key(|s| from.chebyshev(&s.position))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sim_core::geometry::{Position, RoomName};

    use super::*;
    use crate::host::{BodyPartKind, Creep, CreepMemory, MockHost, Structure, StructureKind};

    fn room() -> RoomName {
        RoomName::parse("W1N1").unwrap()
    }

    #[test]
    fn full_upgrader_spends_energy_on_the_controller() {
        let room = room();
        let mut host = MockHost::new(100.0);
        host.structures.insert(
            "controller".into(),
            Structure { id: "controller".into(), kind: StructureKind::Controller, position: Position::new(25, 25, room), energy: 0, energy_capacity: 0, rcl: 1 },
        );
        let mut store = BTreeMap::new();
        store.insert("energy".to_string(), 50);
        host.creeps.insert(
            "u1".into(),
            Creep {
                id: "u1".into(),
                position: Position::new(25, 26, room),
                body: vec![BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
                store,
                store_capacity: 50,
                ticks_to_live: 1500,
                memory: CreepMemory { working: true, ..Default::default() },
            },
        );
        let mut state = CorpState::new(
            "upgrading-1",
            "n1",
            CorpDetail::Upgrading { controller_id: "controller".into(), upgrader_creep_ids: vec!["u1".into()] },
            0,
        );
        execute(&mut host, &mut state, 3);
        assert_eq!(state.units_produced, 1.0);
        assert_eq!(host.creeps["u1"].store["energy"], 49);
    }
}
