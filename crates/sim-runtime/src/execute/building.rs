//! BuildingCorp driver: builders spend stored energy on whichever
//! assigned construction site has the least work remaining, so sites
//! finish (and extensions start adding capacity) one at a time instead
//! of several half-built structures stalling together (spec.md §4.I
//! "BuildingCorp"). Between finished sites, the corp proposes where to
//! place the next extension itself rather than waiting on pre-existing
//! construction sites (spec.md §4.I "extension placement").

use std::collections::HashSet;

use sim_core::corp::{CorpDetail, CorpState};
use sim_core::geometry::{Position, RoomName};

use crate::host::{Host, StructureKind, Terrain};

/// Extensions sit no closer than this to the spawn they feed, so builders
/// and haulers passing through don't jam the spawn's own tile ring.
pub const EXTENSION_MIN_RADIUS: u32 = 2;
/// Extensions sit no farther than this from the spawn, bounding hauler
/// travel distance.
pub const EXTENSION_MAX_RADIUS: u32 = 8;
/// Minimum clearance from any source, so miners/haulers keep a clear path.
pub const EXTENSION_MIN_SOURCE_DISTANCE: u32 = 2;
/// Minimum clearance from the controller, for the same reason.
pub const EXTENSION_MIN_CONTROLLER_DISTANCE: u32 = 3;
/// A candidate tile needs at least this many open (non-wall, unoccupied)
/// neighbours so it doesn't choke off the surrounding tiles.
pub const EXTENSION_MIN_OPEN_NEIGHBOURS: usize = 3;
/// Ticks to wait between proposing new extension sites, so the corp
/// doesn't flood the room with sites faster than builders can finish them.
pub const EXTENSION_PLACEMENT_COOLDOWN: u64 = 100;

pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64) {
    let (mut construction_site_ids, builder_creep_ids, last_extension_tick) = match &state.detail {
        CorpDetail::Building { construction_site_ids, builder_creep_ids, last_extension_tick } => {
            (construction_site_ids.clone(), builder_creep_ids.clone(), *last_extension_tick)
        }
        _ => return,
    };

    if let Some(room) = builder_creep_ids.iter().find_map(|id| host.creep(id)).map(|c| c.position.room) {
        let cooldown_elapsed = last_extension_tick.map_or(true, |t| now.saturating_sub(t) >= EXTENSION_PLACEMENT_COOLDOWN);
        if cooldown_elapsed {
            if let Some(site_pos) = propose_extension_site(host, room) {
                host.create_construction_site(room, site_pos);
                if let Some(new_site) = host
                    .construction_sites_in_room(room)
                    .into_iter()
                    .find(|s| s.position == site_pos && !construction_site_ids.contains(&s.id))
                {
                    construction_site_ids.push(new_site.id);
                }
                if let CorpDetail::Building { construction_site_ids: ids, last_extension_tick: last, .. } = &mut state.detail {
                    *ids = construction_site_ids.clone();
                    *last = Some(now);
                }
            }
        }
    }

    let Some(target_site) = construction_site_ids
        .iter()
        .filter_map(|id| host.construction_site(id))
        .min_by_key(|s| s.progress_total - s.progress)
    else {
        return;
    };

    let mut spent = 0.0_f64;
    for creep_id in &builder_creep_ids {
        let Some(creep) = host.creep(creep_id) else { continue };
        if creep.is_empty() {
            let Some(source) = host
                .structures_in_room(creep.position.room)
                .into_iter()
                .filter(|s| s.energy > 0)
                .min_by_key(|s| creep.position.chebyshev(&s.position))
            else {
                continue;
            };
            if creep.position.chebyshev(&source.position) > 1 {
                host.move_creep_to(creep_id, source.position);
            } else {
                host.withdraw(creep_id, &source.id, "energy", creep.store_capacity);
            }
        } else if creep.position.chebyshev(&target_site.position) > 3 {
            host.move_creep_to(creep_id, target_site.position);
        } else {
            let before = host.creep(creep_id).map(|c| c.store.get("energy").copied().unwrap_or(0)).unwrap_or(0);
            host.build(creep_id, &target_site.id);
            let after = host.creep(creep_id).map(|c| c.store.get("energy").copied().unwrap_or(0)).unwrap_or(0);
            spent += before.saturating_sub(after) as f64;
        }
    }

    if spent > 0.0 {
        state.record_production(spent);
        state.mark_active(now);
    }
}

fn first_spawn(host: &dyn Host, room: RoomName) -> Option<Position> {
    host.structures_in_room(room)
        .into_iter()
        .filter(|s| s.kind == StructureKind::Spawn)
        .min_by_key(|s| s.id.clone())
        .map(|s| s.position)
}

fn occupied_positions(host: &dyn Host, room: RoomName) -> HashSet<Position> {
    let mut occupied: HashSet<Position> = HashSet::new();
    occupied.extend(host.structures_in_room(room).into_iter().map(|s| s.position));
    occupied.extend(host.construction_sites_in_room(room).into_iter().map(|s| s.position));
    occupied.extend(host.sources_in_room(room).into_iter().map(|s| s.position));
    occupied
}

/// Scans the room for the closest-to-spawn tile satisfying every spacing
/// rule, nearest first, so extensions fill in a tight ring rather than
/// scattering (spec.md §4.I "extension placement").
fn propose_extension_site(host: &dyn Host, room: RoomName) -> Option<Position> {
    let spawn = first_spawn(host, room)?;
    let occupied = occupied_positions(host, room);
    let sources: Vec<Position> = host.sources_in_room(room).into_iter().map(|s| s.position).collect();
    let controller = host
        .structures_in_room(room)
        .into_iter()
        .find(|s| s.kind == StructureKind::Controller)
        .map(|s| s.position);

    let mut candidates: Vec<Position> = Vec::new();
    for x in 0..=49u8 {
        for y in 0..=49u8 {
            let pos = Position::new(x, y, room);
            let distance = spawn.chebyshev(&pos);
            if distance >= EXTENSION_MIN_RADIUS && distance <= EXTENSION_MAX_RADIUS {
                candidates.push(pos);
            }
        }
    }
    candidates.sort_by_key(|pos| spawn.chebyshev(pos));

    candidates.into_iter().find(|pos| {
        if occupied.contains(pos) || host.terrain_at(*pos) == Terrain::Wall {
            return false;
        }
        if sources.iter().any(|s| s.chebyshev(pos) < EXTENSION_MIN_SOURCE_DISTANCE) {
            return false;
        }
        if controller.is_some_and(|c| c.chebyshev(pos) < EXTENSION_MIN_CONTROLLER_DISTANCE) {
            return false;
        }
        let open_neighbours = pos
            .neighbours8()
            .iter()
            .filter(|n| !occupied.contains(n) && host.terrain_at(**n) != Terrain::Wall)
            .count();
        open_neighbours >= EXTENSION_MIN_OPEN_NEIGHBOURS
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sim_core::geometry::{Position, RoomName};

    use super::*;
    use crate::host::{BodyPartKind, ConstructionSite, Creep, CreepMemory, MockHost, Source};

    fn room() -> RoomName {
        RoomName::parse("W1N1").unwrap()
    }

    #[test]
    fn builder_with_energy_progresses_the_nearest_incomplete_site() {
        let room = room();
        let mut host = MockHost::new(100.0);
        host.construction_sites.insert(
            "site1".into(),
            ConstructionSite { id: "site1".into(), position: Position::new(15, 15, room), progress: 0, progress_total: 1000 },
        );
        let mut store = BTreeMap::new();
        store.insert("energy".to_string(), 50);
        host.creeps.insert(
            "b1".into(),
            Creep {
                id: "b1".into(),
                position: Position::new(15, 16, room),
                body: vec![BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
                store,
                store_capacity: 50,
                ticks_to_live: 1500,
                memory: CreepMemory::default(),
            },
        );
        let mut state = CorpState::new(
            "building-1",
            "n1",
            CorpDetail::Building { construction_site_ids: vec!["site1".into()], builder_creep_ids: vec!["b1".into()], last_extension_tick: None },
            0,
        );
        execute(&mut host, &mut state, 1);
        assert_eq!(host.construction_sites["site1"].progress, 5);
        assert_eq!(state.units_produced, 5.0);
    }

    #[test]
    fn proposes_a_site_within_radius_and_clear_of_sources_and_controller() {
        let room = room();
        let mut host = MockHost::new(100.0);
        host.structures.insert(
            "spawn1".into(),
            crate::host::Structure { id: "spawn1".into(), kind: StructureKind::Spawn, position: Position::new(25, 25, room), energy: 300, energy_capacity: 300, rcl: 1 },
        );
        host.sources.insert(
            "source1".into(),
            Source { id: "source1".into(), position: Position::new(10, 10, room), energy: 0.0, energy_capacity: 3000.0 },
        );
        let site = propose_extension_site(&host, room).expect("a valid site exists");
        let spawn_pos = Position::new(25, 25, room);
        let distance = spawn_pos.chebyshev(&site);
        assert!(distance >= EXTENSION_MIN_RADIUS && distance <= EXTENSION_MAX_RADIUS);
    }

    #[test]
    fn building_execute_places_a_new_extension_site_after_cooldown() {
        let room = room();
        let mut host = MockHost::new(100.0);
        host.structures.insert(
            "spawn1".into(),
            crate::host::Structure { id: "spawn1".into(), kind: StructureKind::Spawn, position: Position::new(25, 25, room), energy: 300, energy_capacity: 300, rcl: 1 },
        );
        host.creeps.insert(
            "b1".into(),
            Creep {
                id: "b1".into(),
                position: Position::new(25, 27, room),
                body: vec![BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
                store: BTreeMap::new(),
                store_capacity: 50,
                ticks_to_live: 1500,
                memory: CreepMemory::default(),
            },
        );
        let mut state = CorpState::new(
            "building-1",
            "n1",
            CorpDetail::Building { construction_site_ids: vec![], builder_creep_ids: vec!["b1".into()], last_extension_tick: None },
            0,
        );
        execute(&mut host, &mut state, 50);
        match &state.detail {
            CorpDetail::Building { construction_site_ids, last_extension_tick, .. } => {
                assert_eq!(construction_site_ids.len(), 1);
                assert_eq!(*last_extension_tick, Some(50));
            }
            _ => panic!("expected Building detail"),
        }
        assert_eq!(host.construction_sites.len(), 1);
    }
}
