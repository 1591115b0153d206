//! MiningCorp driver: stationary harvesters that sit on a source's
//! territory and harvest until full (spec.md §4.I "MiningCorp").

use rust_decimal::Decimal;
use sim_core::corp::{CorpDetail, CorpState};

use crate::host::Host;

pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64) {
    let CorpDetail::Mining { source_id, miner_creep_ids } = &state.detail else {
        return;
    };
    let source_id = source_id.clone();
    let Some(source) = host.source(&source_id) else {
        return;
    };

    let mut produced = 0.0_f64;
    for creep_id in miner_creep_ids.clone() {
        let Some(creep) = host.creep(&creep_id) else { continue };
        if creep.is_full() {
            continue;
        }
        if creep.position.chebyshev(&source.position) > 1 {
            host.move_creep_to(&creep_id, source.position);
            continue;
        }
        let before = host.creep(&creep_id).map(|c| c.stored_total()).unwrap_or(0);
        host.harvest(&creep_id, &source_id);
        let after = host.creep(&creep_id).map(|c| c.stored_total()).unwrap_or(0);
        produced += (after.saturating_sub(before)) as f64;
    }

    if produced > 0.0 {
        state.record_production(produced);
        state.mark_active(now);
    }
    // No per-unit cash cost: mining has no material input, only the
    // amortised body cost rolled up at spawn time.
    let _ = Decimal::ZERO;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sim_core::corp::CorpState;
    use sim_core::geometry::{Position, RoomName};

    use super::*;
    use crate::host::{BodyPartKind, Creep, CreepMemory, MockHost, Source};

    fn room() -> RoomName {
        RoomName::parse("W1N1").unwrap()
    }

    #[test]
    fn idle_miner_in_range_harvests_and_records_production() {
        let room = room();
        let mut host = MockHost::new(100.0);
        host.sources.insert(
            "s1".into(),
            Source { id: "s1".into(), position: Position::new(10, 10, room), energy: 100.0, energy_capacity: 3000.0 },
        );
        host.creeps.insert(
            "m1".into(),
            Creep {
                id: "m1".into(),
                position: Position::new(10, 11, room),
                body: vec![BodyPartKind::Work, BodyPartKind::Work, BodyPartKind::Move],
                store: BTreeMap::new(),
                store_capacity: 50,
                ticks_to_live: 1500,
                memory: CreepMemory::default(),
            },
        );
        let mut state = CorpState::new(
            "mining-1",
            "n1",
            CorpDetail::Mining { source_id: "s1".into(), miner_creep_ids: vec!["m1".into()] },
            0,
        );
        execute(&mut host, &mut state, 5);
        assert!(state.units_produced > 0.0);
        assert_eq!(state.last_activity_tick, 5);
    }
}
