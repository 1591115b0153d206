//! BootstrapCorp driver: a jack-of-all-trades fallback run before any
//! specialised corp exists in a colony. Each creep harvests, then
//! delivers to a spawn/extension if one needs energy, falling back to
//! upgrading the controller otherwise (spec.md §4.I "BootstrapCorp").

use sim_core::corp::{CorpDetail, CorpState};

use crate::host::{Host, StructureKind};

pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64) {
    let CorpDetail::Bootstrap { jack_creep_ids } = &state.detail else {
        return;
    };
    let jack_creep_ids = jack_creep_ids.clone();

    let mut produced = 0.0_f64;
    for creep_id in &jack_creep_ids {
        let Some(creep) = host.creep(creep_id) else { continue };
        if creep.is_empty() {
            let Some(source) = host.sources_in_room(creep.position.room).into_iter().max_by(|a, b| a.energy.partial_cmp(&b.energy).unwrap()) else {
                continue;
            };
            if creep.position.chebyshev(&source.position) > 1 {
                host.move_creep_to(creep_id, source.position);
            } else {
                let before = creep.stored_total();
                host.harvest(creep_id, &source.id);
                let after = host.creep(creep_id).map(|c| c.stored_total()).unwrap_or(before);
                produced += after.saturating_sub(before) as f64;
            }
            continue;
        }

        let needy_structure = host
            .structures_in_room(creep.position.room)
            .into_iter()
            .filter(|s| matches!(s.kind, StructureKind::Spawn | StructureKind::Extension) && s.energy < s.energy_capacity)
            .min_by_key(|s| creep.position.chebyshev(&s.position));

        if let Some(target) = needy_structure {
            if creep.position.chebyshev(&target.position) > 1 {
                host.move_creep_to(creep_id, target.position);
            } else {
                let held = creep.store.get("energy").copied().unwrap_or(0);
                host.transfer(creep_id, &target.id, "energy", held);
            }
            continue;
        }

        let Some(controller) = host
            .structures_in_room(creep.position.room)
            .into_iter()
            .find(|s| s.kind == StructureKind::Controller)
        else {
            continue;
        };
        if creep.position.chebyshev(&controller.position) > 3 {
            host.move_creep_to(creep_id, controller.position);
        } else {
            host.upgrade_controller(creep_id, &controller.id);
        }
    }

    if produced > 0.0 {
        state.record_production(produced);
        state.mark_active(now);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sim_core::geometry::{Position, RoomName};

    use super::*;
    use crate::host::{BodyPartKind, Creep, CreepMemory, MockHost, Source};

    #[test]
    fn empty_jack_harvests_the_richest_source_in_room() {
        let room = RoomName::parse("W1N1").unwrap();
        let mut host = MockHost::new(100.0);
        host.sources.insert(
            "s1".into(),
            Source { id: "s1".into(), position: Position::new(10, 10, room), energy: 10.0, energy_capacity: 3000.0 },
        );
        host.sources.insert(
            "s2".into(),
            Source { id: "s2".into(), position: Position::new(30, 30, room), energy: 100.0, energy_capacity: 3000.0 },
        );
        host.creeps.insert(
            "j1".into(),
            Creep {
                id: "j1".into(),
                position: Position::new(30, 31, room),
                body: vec![BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
                store: BTreeMap::new(),
                store_capacity: 50,
                ticks_to_live: 1500,
                memory: CreepMemory::default(),
            },
        );
        let mut state = CorpState::new("bootstrap-1", "n1", CorpDetail::Bootstrap { jack_creep_ids: vec!["j1".into()] }, 0);
        execute(&mut host, &mut state, 2);
        assert!(state.units_produced > 0.0);
        assert_eq!(host.sources["s2"].energy, 98.0);
    }
}
