//! ScoutCorp driver: a single creep walks the room-adjacency graph
//! outward from the colony, recording any room it cannot reach as
//! blocked (spec.md §4.I "ScoutCorp"). Each visited room's intel is
//! persisted to `persistence::RoomIntel` immediately; the next room to
//! visit is chosen by a bounded BFS that prefers unexplored rooms, then
//! falls back to re-scouting the stalest already-known room in range.

use std::collections::{BTreeMap, VecDeque};

use persistence::RoomIntel;
use sim_core::corp::{CorpDetail, CorpState};
use sim_core::geometry::{Position, RoomName};

use crate::host::{Host, ReturnCode};

/// Intel older than this many ticks is eligible for a re-scout (spec.md
/// §4.I "ScoutCorp" staleness tracking).
pub const STALE_THRESHOLD: u64 = 5_000;
/// How many room-hops out a scout plans at once; beyond this it commits
/// to the current destination before looking farther.
pub const MAX_SCOUT_DISTANCE: u32 = 5;
/// Weight applied per source when scoring a room's remote-mining appeal.
pub const REMOTE_MINING_SOURCE_WEIGHT: f64 = 10.0;

pub fn execute(host: &mut dyn Host, state: &mut CorpState, now: u64, room_intel: &mut BTreeMap<String, RoomIntel>) {
    let (scout_creep_id, mut blocked_rooms) = match &state.detail {
        CorpDetail::Scout { scout_creep_id, blocked_rooms } => (scout_creep_id.clone(), blocked_rooms.clone()),
        _ => return,
    };
    let Some(creep_id) = scout_creep_id else { return };
    let Some(creep) = host.creep(&creep_id) else { return };

    let current_room = creep.position.room;
    record_intel(host, room_intel, current_room, now, &blocked_rooms);

    let next_room = select_next_room(host, room_intel, current_room, &blocked_rooms, now);
    let Some(next_room) = next_room else {
        state.mark_active(now);
        return;
    };

    let edge_target = Position::new(25, 25, next_room);
    let result = host.move_creep_to(&creep_id, edge_target);
    if result == ReturnCode::NoPath {
        blocked_rooms.push(next_room.to_string());
    }
    state.mark_active(now);

    if let CorpDetail::Scout { blocked_rooms: stored, .. } = &mut state.detail {
        *stored = blocked_rooms;
    }
}

fn record_intel(host: &dyn Host, room_intel: &mut BTreeMap<String, RoomIntel>, room: RoomName, now: u64, blocked_rooms: &[String]) {
    let source_count = host.sources_in_room(room).len() as u32;
    room_intel.insert(
        room.to_string(),
        RoomIntel {
            room: room.to_string(),
            last_scouted_tick: now,
            blocked: blocked_rooms.contains(&room.to_string()),
            source_count,
            remote_mining_score: source_count as f64 * REMOTE_MINING_SOURCE_WEIGHT,
        },
    );
}

/// Every room reachable from `start` within `max_distance` hops, paired
/// with its hop distance, via the exit graph (blocked rooms pruned).
fn bfs_rooms_within(host: &dyn Host, start: RoomName, max_distance: u32, blocked: &[String]) -> Vec<(RoomName, u32)> {
    let mut visited: BTreeMap<RoomName, u32> = BTreeMap::new();
    visited.insert(start, 0);
    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(room) = queue.pop_front() {
        let distance = visited[&room];
        if distance >= max_distance {
            continue;
        }
        for next in host.describe_exits(room) {
            if blocked.contains(&next.to_string()) || visited.contains_key(&next) {
                continue;
            }
            visited.insert(next, distance + 1);
            queue.push_back(next);
        }
    }

    visited.into_iter().filter(|(room, _)| *room != start).collect()
}

/// Picks the nearest unexplored room in range; if everything in range has
/// already been scouted, re-visits whichever is the most stale.
fn select_next_room(
    host: &dyn Host,
    room_intel: &BTreeMap<String, RoomIntel>,
    current: RoomName,
    blocked: &[String],
    now: u64,
) -> Option<RoomName> {
    let reachable = bfs_rooms_within(host, current, MAX_SCOUT_DISTANCE, blocked);

    if let Some((room, _)) = reachable.iter().filter(|(room, _)| !room_intel.contains_key(&room.to_string())).min_by_key(|(_, d)| *d) {
        return Some(*room);
    }

    reachable
        .iter()
        .filter_map(|(room, _)| room_intel.get(&room.to_string()).map(|intel| (*room, intel)))
        .filter(|(_, intel)| intel.is_stale(now, STALE_THRESHOLD))
        .min_by_key(|(_, intel)| intel.last_scouted_tick)
        .map(|(room, _)| room)
}
