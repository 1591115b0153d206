//! The host boundary: every side effect `execute()` drivers perform goes
//! through this trait, so the whole runtime can run against a mock inside
//! a test harness exactly as it would against the real simulated game
//! (spec.md §6.1).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sim_core::geometry::{Position, RoomName};

/// Monotonic return codes for mutating host calls (spec.md §6.1
/// "Mutating primitives"). Positive-ish success, negative-ish failure,
/// mirroring the simulated game's own code conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnCode {
    Ok,
    NotOwner,
    NoPath,
    NameExists,
    Busy,
    NotEnoughResources,
    InvalidTarget,
    Full,
    NotInRange,
    InvalidArgs,
    Tired,
    NoBodypart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyPartKind {
    Move,
    Work,
    Carry,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreepMemory {
    pub corp_id: Option<String>,
    pub work_type: Option<String>,
    pub working: bool,
    pub target_room: Option<RoomName>,
    pub hauler_slot: Option<u32>,
    pub delivery_rotation: Option<u32>,
    pub assigned_source_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Creep {
    pub id: String,
    pub position: Position,
    pub body: Vec<BodyPartKind>,
    pub store: BTreeMap<String, u32>,
    pub store_capacity: u32,
    pub ticks_to_live: u64,
    pub memory: CreepMemory,
}

impl Creep {
    pub fn work_parts(&self) -> u32 {
        self.body.iter().filter(|p| **p == BodyPartKind::Work).count() as u32
    }

    pub fn carry_parts(&self) -> u32 {
        self.body.iter().filter(|p| **p == BodyPartKind::Carry).count() as u32
    }

    pub fn stored_total(&self) -> u32 {
        self.store.values().sum()
    }

    pub fn is_full(&self) -> bool {
        self.stored_total() >= self.store_capacity
    }

    pub fn is_empty(&self) -> bool {
        self.stored_total() == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub position: Position,
    pub energy: f64,
    pub energy_capacity: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureKind {
    Spawn,
    Extension,
    Tower,
    Controller,
    Storage,
    Container,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Structure {
    pub id: String,
    pub kind: StructureKind,
    pub position: Position,
    pub energy: u32,
    pub energy_capacity: u32,
    /// Only meaningful for `Controller`.
    pub rcl: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConstructionSite {
    pub id: String,
    pub position: Position,
    pub progress: u32,
    pub progress_total: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DroppedResource {
    pub id: String,
    pub position: Position,
    pub resource: String,
    pub amount: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Plain,
    Swamp,
    Wall,
}

/// The opaque simulated-game surface `execute()` drivers depend on
/// (spec.md §6.1). A production implementation wraps the real game API;
/// [`MockHost`] wraps an in-memory fixture for tests and the CLI demo.
pub trait Host {
    fn now(&self) -> u64;
    fn cpu_used(&self) -> f64;
    fn cpu_budget_remaining(&self) -> f64;
    fn cpu_bucket(&self) -> f64;

    fn creep(&self, id: &str) -> Option<Creep>;
    fn all_creeps(&self) -> Vec<Creep>;
    fn source(&self, id: &str) -> Option<Source>;
    fn structure(&self, id: &str) -> Option<Structure>;
    fn construction_site(&self, id: &str) -> Option<ConstructionSite>;
    fn sources_in_room(&self, room: RoomName) -> Vec<Source>;
    fn structures_in_room(&self, room: RoomName) -> Vec<Structure>;
    fn construction_sites_in_room(&self, room: RoomName) -> Vec<ConstructionSite>;
    fn dropped_resources_in_room(&self, room: RoomName) -> Vec<DroppedResource>;

    fn terrain_at(&self, pos: Position) -> Terrain;
    fn describe_exits(&self, room: RoomName) -> Vec<RoomName>;

    fn move_creep_to(&mut self, creep_id: &str, target: Position) -> ReturnCode;
    fn harvest(&mut self, creep_id: &str, source_id: &str) -> ReturnCode;
    fn transfer(&mut self, creep_id: &str, target_id: &str, resource: &str, amount: u32) -> ReturnCode;
    fn withdraw(&mut self, creep_id: &str, target_id: &str, resource: &str, amount: u32) -> ReturnCode;
    fn pickup(&mut self, creep_id: &str, dropped_id: &str) -> ReturnCode;
    fn drop(&mut self, creep_id: &str, resource: &str, amount: u32) -> ReturnCode;
    fn build(&mut self, creep_id: &str, site_id: &str) -> ReturnCode;
    fn upgrade_controller(&mut self, creep_id: &str, controller_id: &str) -> ReturnCode;
    fn create_construction_site(&mut self, room: RoomName, position: Position) -> ReturnCode;
    fn spawn_creep(&mut self, spawn_id: &str, body: &[BodyPartKind], name: &str, memory: CreepMemory) -> ReturnCode;
    fn set_creep_memory(&mut self, creep_id: &str, memory: CreepMemory);

    fn memory_get(&self, key: &str) -> Option<String>;
    fn memory_set(&mut self, key: &str, value: String);

    /// Raw segments store bytes rather than strings: this is where a
    /// bincode-packed [`persistence::PersistedState`] blob lives between
    /// ticks (spec.md §6.1 "persistent memory").
    fn segment(&self, index: u8) -> Option<Vec<u8>>;
    fn set_segment(&mut self, index: u8, value: Vec<u8>);
}

/// In-memory fixture implementing [`Host`], identical in observable
/// behaviour to the real game surface (spec.md §6.1 "a test harness mocks
/// them identically").
#[derive(Clone, Debug, Default)]
pub struct MockHost {
    pub tick: u64,
    pub cpu_used: f64,
    pub cpu_limit: f64,
    pub cpu_bucket: f64,
    pub creeps: BTreeMap<String, Creep>,
    pub sources: BTreeMap<String, Source>,
    pub structures: BTreeMap<String, Structure>,
    pub construction_sites: BTreeMap<String, ConstructionSite>,
    pub dropped: BTreeMap<String, DroppedResource>,
    pub terrain: BTreeMap<(RoomName, u8, u8), Terrain>,
    pub exits: BTreeMap<RoomName, Vec<RoomName>>,
    pub memory: BTreeMap<String, String>,
    pub segments: BTreeMap<u8, Vec<u8>>,
    next_dropped_id: u64,
    next_site_id: u64,
}

impl MockHost {
    pub fn new(cpu_limit: f64) -> Self {
        MockHost {
            cpu_limit,
            cpu_bucket: 10_000.0,
            ..Default::default()
        }
    }

    fn room_of(&self, id: &str) -> Option<RoomName> {
        self.creeps
            .get(id)
            .map(|c| c.position.room)
            .or_else(|| self.sources.get(id).map(|s| s.position.room))
            .or_else(|| self.structures.get(id).map(|s| s.position.room))
    }
}

impl Host for MockHost {
    fn now(&self) -> u64 {
        self.tick
    }

    fn cpu_used(&self) -> f64 {
        self.cpu_used
    }

    fn cpu_budget_remaining(&self) -> f64 {
        (self.cpu_limit - self.cpu_used).max(0.0)
    }

    fn cpu_bucket(&self) -> f64 {
        self.cpu_bucket
    }

    fn creep(&self, id: &str) -> Option<Creep> {
        self.creeps.get(id).cloned()
    }

    fn all_creeps(&self) -> Vec<Creep> {
        self.creeps.values().cloned().collect()
    }

    fn source(&self, id: &str) -> Option<Source> {
        self.sources.get(id).cloned()
    }

    fn structure(&self, id: &str) -> Option<Structure> {
        self.structures.get(id).cloned()
    }

    fn construction_site(&self, id: &str) -> Option<ConstructionSite> {
        self.construction_sites.get(id).cloned()
    }

    fn sources_in_room(&self, room: RoomName) -> Vec<Source> {
        self.sources.values().filter(|s| s.position.room == room).cloned().collect()
    }

    fn structures_in_room(&self, room: RoomName) -> Vec<Structure> {
        self.structures.values().filter(|s| s.position.room == room).cloned().collect()
    }

    fn construction_sites_in_room(&self, room: RoomName) -> Vec<ConstructionSite> {
        self.construction_sites.values().filter(|s| s.position.room == room).cloned().collect()
    }

    fn dropped_resources_in_room(&self, room: RoomName) -> Vec<DroppedResource> {
        self.dropped.values().filter(|d| d.position.room == room).cloned().collect()
    }

    fn terrain_at(&self, pos: Position) -> Terrain {
        self.terrain.get(&(pos.room, pos.x, pos.y)).copied().unwrap_or(Terrain::Plain)
    }

    fn describe_exits(&self, room: RoomName) -> Vec<RoomName> {
        self.exits.get(&room).cloned().unwrap_or_default()
    }

    fn move_creep_to(&mut self, creep_id: &str, target: Position) -> ReturnCode {
        let Some(creep) = self.creeps.get_mut(creep_id) else {
            return ReturnCode::InvalidTarget;
        };
        if creep.position == target {
            return ReturnCode::Ok;
        }
        let dx = (target.x as i16 - creep.position.x as i16).signum();
        let dy = (target.y as i16 - creep.position.y as i16).signum();
        let nx = (creep.position.x as i16 + dx).clamp(0, 49) as u8;
        let ny = (creep.position.y as i16 + dy).clamp(0, 49) as u8;
        creep.position = Position::new(nx, ny, creep.position.room);
        ReturnCode::Ok
    }

    fn harvest(&mut self, creep_id: &str, source_id: &str) -> ReturnCode {
        let Some(source) = self.sources.get(source_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        let Some(creep) = self.creeps.get(creep_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        if creep.position.chebyshev(&source.position) > 1 {
            return ReturnCode::NotInRange;
        }
        if source.energy <= 0.0 {
            return ReturnCode::NotEnoughResources;
        }
        let amount = (creep.work_parts() as f64 * 2.0).min(source.energy);
        if let Some(s) = self.sources.get_mut(source_id) {
            s.energy -= amount;
        }
        if let Some(c) = self.creeps.get_mut(creep_id) {
            let entry = c.store.entry("energy".to_string()).or_insert(0);
            *entry = (*entry + amount as u32).min(c.store_capacity);
        }
        ReturnCode::Ok
    }

    fn transfer(&mut self, creep_id: &str, target_id: &str, resource: &str, amount: u32) -> ReturnCode {
        let Some(creep) = self.creeps.get(creep_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        let available = creep.store.get(resource).copied().unwrap_or(0);
        if available < amount {
            return ReturnCode::NotEnoughResources;
        }
        if let Some(structure) = self.structures.get_mut(target_id) {
            if creep.position.chebyshev(&structure.position) > 1 {
                return ReturnCode::NotInRange;
            }
            let room = structure.energy_capacity.saturating_sub(structure.energy);
            let moved = amount.min(room);
            structure.energy += moved;
            if let Some(c) = self.creeps.get_mut(creep_id) {
                *c.store.get_mut(resource).unwrap() -= moved;
            }
            return if moved < amount { ReturnCode::Full } else { ReturnCode::Ok };
        }
        ReturnCode::InvalidTarget
    }

    fn withdraw(&mut self, creep_id: &str, target_id: &str, resource: &str, amount: u32) -> ReturnCode {
        let Some(structure) = self.structures.get(target_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        if resource != "energy" || structure.energy == 0 {
            return ReturnCode::NotEnoughResources;
        }
        let Some(creep) = self.creeps.get(creep_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        if creep.position.chebyshev(&structure.position) > 1 {
            return ReturnCode::NotInRange;
        }
        let free = creep.store_capacity.saturating_sub(creep.stored_total());
        let moved = amount.min(free).min(structure.energy);
        if let Some(s) = self.structures.get_mut(target_id) {
            s.energy -= moved;
        }
        if let Some(c) = self.creeps.get_mut(creep_id) {
            *c.store.entry(resource.to_string()).or_insert(0) += moved;
        }
        ReturnCode::Ok
    }

    fn pickup(&mut self, creep_id: &str, dropped_id: &str) -> ReturnCode {
        let Some(dropped) = self.dropped.get(dropped_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        let Some(creep) = self.creeps.get(creep_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        if creep.position.chebyshev(&dropped.position) > 1 {
            return ReturnCode::NotInRange;
        }
        let free = creep.store_capacity.saturating_sub(creep.stored_total());
        let moved = dropped.amount.min(free);
        if let Some(c) = self.creeps.get_mut(creep_id) {
            *c.store.entry(dropped.resource.clone()).or_insert(0) += moved;
        }
        if moved >= dropped.amount {
            self.dropped.remove(dropped_id);
        } else if let Some(d) = self.dropped.get_mut(dropped_id) {
            d.amount -= moved;
        }
        ReturnCode::Ok
    }

    fn drop(&mut self, creep_id: &str, resource: &str, amount: u32) -> ReturnCode {
        let Some(creep) = self.creeps.get_mut(creep_id) else {
            return ReturnCode::InvalidTarget;
        };
        let held = creep.store.get(resource).copied().unwrap_or(0);
        let moved = amount.min(held);
        if moved == 0 {
            return ReturnCode::NotEnoughResources;
        }
        *creep.store.get_mut(resource).unwrap() -= moved;
        let position = creep.position;
        let id = format!("dropped-{}", self.next_dropped_id);
        self.next_dropped_id += 1;
        self.dropped.insert(
            id.clone(),
            DroppedResource { id, position, resource: resource.to_string(), amount: moved },
        );
        ReturnCode::Ok
    }

    fn build(&mut self, creep_id: &str, site_id: &str) -> ReturnCode {
        let Some(site) = self.construction_sites.get(site_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        let Some(creep) = self.creeps.get(creep_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        if creep.position.chebyshev(&site.position) > 3 {
            return ReturnCode::NotInRange;
        }
        let energy = creep.store.get("energy").copied().unwrap_or(0);
        if energy == 0 {
            return ReturnCode::NotEnoughResources;
        }
        let progress = (creep.work_parts() * 5).min(energy).min(site.progress_total - site.progress);
        if let Some(s) = self.construction_sites.get_mut(site_id) {
            s.progress += progress;
        }
        if let Some(c) = self.creeps.get_mut(creep_id) {
            *c.store.get_mut("energy").unwrap() -= progress;
        }
        ReturnCode::Ok
    }

    fn upgrade_controller(&mut self, creep_id: &str, controller_id: &str) -> ReturnCode {
        let Some(controller) = self.structures.get(controller_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        let Some(creep) = self.creeps.get(creep_id).cloned() else {
            return ReturnCode::InvalidTarget;
        };
        if creep.position.chebyshev(&controller.position) > 3 {
            return ReturnCode::NotInRange;
        }
        let energy = creep.store.get("energy").copied().unwrap_or(0);
        if energy == 0 {
            return ReturnCode::NotEnoughResources;
        }
        let consumed = creep.work_parts().min(energy);
        if let Some(c) = self.creeps.get_mut(creep_id) {
            *c.store.get_mut("energy").unwrap() -= consumed;
        }
        ReturnCode::Ok
    }

    fn create_construction_site(&mut self, room: RoomName, position: Position) -> ReturnCode {
        let id = format!("site-{}", self.next_site_id);
        self.next_site_id += 1;
        self.construction_sites.insert(
            id.clone(),
            ConstructionSite { id, position: Position::new(position.x, position.y, room), progress: 0, progress_total: 5_000 },
        );
        ReturnCode::Ok
    }

    fn spawn_creep(&mut self, spawn_id: &str, body: &[BodyPartKind], name: &str, memory: CreepMemory) -> ReturnCode {
        let Some(room) = self.room_of(spawn_id) else {
            return ReturnCode::InvalidTarget;
        };
        let cost: u32 = body
            .iter()
            .map(|p| match p {
                BodyPartKind::Move => 50,
                BodyPartKind::Work => 100,
                BodyPartKind::Carry => 50,
            })
            .sum();
        let Some(spawn) = self.structures.get_mut(spawn_id) else {
            return ReturnCode::InvalidTarget;
        };
        if spawn.energy < cost {
            return ReturnCode::NotEnoughResources;
        }
        if self.creeps.contains_key(name) {
            return ReturnCode::NameExists;
        }
        spawn.energy -= cost;
        let position = spawn.position;
        self.creeps.insert(
            name.to_string(),
            Creep {
                id: name.to_string(),
                position,
                body: body.to_vec(),
                store: BTreeMap::new(),
                store_capacity: body.iter().filter(|p| **p == BodyPartKind::Carry).count() as u32 * 50,
                ticks_to_live: 1_500,
                memory,
            },
        );
        let _ = room;
        ReturnCode::Ok
    }

    fn set_creep_memory(&mut self, creep_id: &str, memory: CreepMemory) {
        if let Some(c) = self.creeps.get_mut(creep_id) {
            c.memory = memory;
        }
    }

    fn memory_get(&self, key: &str) -> Option<String> {
        self.memory.get(key).cloned()
    }

    fn memory_set(&mut self, key: &str, value: String) {
        self.memory.insert(key.to_string(), value);
    }

    fn segment(&self, index: u8) -> Option<Vec<u8>> {
        self.segments.get(&index).cloned()
    }

    fn set_segment(&mut self, index: u8, value: Vec<u8>) {
        self.segments.insert(index, value);
    }
}
