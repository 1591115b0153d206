//! HaulingCorp driver: haulers shuttle energy from a pickup point to one
//! of several delivery sinks, rotating deliveries across sinks so no
//! single sink starves (spec.md §4.I "HaulingCorp").
//!
//! Empty haulers cascade through pickup sources in priority order: a
//! dropped resource pile within range, then a nearby container, then the
//! corp's designated `route_from` structure. Each hauler tracks its own
//! rotation cursor and slot index in `CreepMemory` so concurrent haulers
//! don't trample each other's delivery target.

use sim_core::corp::{CorpDetail, CorpState};

use crate::host::{Host, StructureKind};

/// Maximum range to a dropped resource pile before falling back to the
/// next pickup option (spec.md §4.I "pickup priority").
pub const DROPPED_PICKUP_RANGE: u32 = 5;
/// Maximum range to a container before falling back to `route_from`.
pub const CONTAINER_PICKUP_RANGE: u32 = 3;

pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64) {
    let (route_from, route_to, hauler_creep_ids) = match &state.detail {
        CorpDetail::Hauling { route_from, route_to, hauler_creep_ids } => {
            (route_from.clone(), route_to.clone(), hauler_creep_ids.clone())
        }
        _ => return,
    };
    if route_to.is_empty() {
        return;
    }

    let mut delivered = 0.0_f64;
    for (slot, creep_id) in hauler_creep_ids.iter().enumerate() {
        let Some(creep) = host.creep(creep_id) else { continue };
        if creep.is_empty() {
            pick_up(host, creep_id, &route_from);
            continue;
        }

        let index = creep.memory.delivery_rotation.unwrap_or(slot as u32) as usize % route_to.len();
        let Some(sink) = host.structure(&route_to[index]) else { continue };
        if creep.position.chebyshev(&sink.position) > 1 {
            host.move_creep_to(creep_id, sink.position);
            continue;
        }
        let held = creep.store.get("energy").copied().unwrap_or(0);
        host.transfer(creep_id, &sink.id, "energy", held);
        delivered += held as f64;

        let mut memory = creep.memory.clone();
        memory.hauler_slot = Some(slot as u32);
        memory.delivery_rotation = Some(((index + 1) % route_to.len()) as u32);
        host.set_creep_memory(creep_id, memory);
    }

    if delivered > 0.0 {
        state.record_production(delivered);
        state.mark_active(now);
    }
}

/// Cascades through pickup sources in priority order rather than by pure
/// distance: a dropped pile within range first, then a container within
/// range, falling back to the corp's designated pickup structure (spec.md
/// §4.I "pickup priority").
fn pick_up(host: &mut dyn Host, creep_id: &str, route_from: &str) {
    let Some(creep) = host.creep(creep_id) else { return };
    let room = creep.position.room;

    if let Some(pile) = host
        .dropped_resources_in_room(room)
        .into_iter()
        .filter(|d| creep.position.chebyshev(&d.position) <= DROPPED_PICKUP_RANGE)
        .min_by_key(|d| creep.position.chebyshev(&d.position))
    {
        if creep.position.chebyshev(&pile.position) > 1 {
            host.move_creep_to(creep_id, pile.position);
        } else {
            host.pickup(creep_id, &pile.id);
        }
        return;
    }

    if let Some(container) = host
        .structures_in_room(room)
        .into_iter()
        .filter(|s| s.kind == StructureKind::Container && s.energy > 0)
        .filter(|s| creep.position.chebyshev(&s.position) <= CONTAINER_PICKUP_RANGE)
        .min_by_key(|s| creep.position.chebyshev(&s.position))
    {
        if creep.position.chebyshev(&container.position) > 1 {
            host.move_creep_to(creep_id, container.position);
        } else {
            host.withdraw(creep_id, &container.id, "energy", creep.store_capacity);
        }
        return;
    }

    let Some(pickup) = host.structure(route_from) else { return };
    if creep.position.chebyshev(&pickup.position) > 1 {
        host.move_creep_to(creep_id, pickup.position);
    } else {
        host.withdraw(creep_id, route_from, "energy", creep.store_capacity);
    }
}
