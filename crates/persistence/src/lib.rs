#![deny(warnings)]

//! Persistence: the opaque blob a host's persistent-memory primitive
//! stores between ticks (spec.md §6.1 "Persistent memory", §6.3). The
//! host gives us one string/byte slot; everything the planner needs to
//! survive a restart gets bincode-packed into it.

use std::collections::BTreeMap;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::colony::World;
use sim_core::corp::CorpState;
use sim_core::{Chain, Contract};

/// What a scout corp has learned about one room (spec.md §4.I
/// "ScoutCorp" staleness tracking).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoomIntel {
    pub room: String,
    pub last_scouted_tick: u64,
    pub blocked: bool,
    pub source_count: u32,
    pub remote_mining_score: f64,
}

impl RoomIntel {
    pub fn is_stale(&self, now: u64, staleness_threshold: u64) -> bool {
        now.saturating_sub(self.last_scouted_tick) > staleness_threshold
    }
}

/// A historical sample of flow between two graph nodes, kept for trend
/// analysis in the economic metrics projection (spec.md §4.J).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EconomicEdge {
    pub from_node: String,
    pub to_node: String,
    pub resource: String,
    pub rate: f64,
    pub tick: u64,
}

/// One tick's worth of world-health summary, appended to a bounded
/// history so a dashboard can chart trends without replaying every tick
/// (spec.md §4.J, §6.4).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorldHealthSample {
    pub tick: u64,
    pub total_balance: Decimal,
    pub active_corp_count: usize,
    pub is_graph_connected: bool,
}

/// Everything the planning/coordination layer needs to survive a
/// restart, keyed the way the host exposes it back to us (spec.md
/// §6.1, §6.3): the world/colony graph, corps, contracts, chains, scout
/// intel, a rolling edge-flow history, and a bounded health history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub saved_at_tick: u64,
    pub world: World,
    pub corps: BTreeMap<String, CorpState>,
    pub contracts: BTreeMap<String, Contract>,
    pub chains: BTreeMap<String, Chain>,
    pub room_intel: BTreeMap<String, RoomIntel>,
    pub economic_edges: Vec<EconomicEdge>,
    pub world_health_history: Vec<WorldHealthSample>,
}

/// Caps on unbounded history so a long-running colony's persisted blob
/// doesn't grow forever (spec.md §6.3 "bounded history").
pub const MAX_WORLD_HEALTH_HISTORY: usize = 500;
pub const MAX_ECONOMIC_EDGE_HISTORY: usize = 2_000;

impl PersistedState {
    pub fn new(world: World, saved_at_tick: u64) -> Self {
        PersistedState {
            saved_at_tick,
            world,
            corps: BTreeMap::new(),
            contracts: BTreeMap::new(),
            chains: BTreeMap::new(),
            room_intel: BTreeMap::new(),
            economic_edges: Vec::new(),
            world_health_history: Vec::new(),
        }
    }

    pub fn push_health_sample(&mut self, sample: WorldHealthSample) {
        self.world_health_history.push(sample);
        if self.world_health_history.len() > MAX_WORLD_HEALTH_HISTORY {
            let overflow = self.world_health_history.len() - MAX_WORLD_HEALTH_HISTORY;
            self.world_health_history.drain(0..overflow);
        }
    }

    pub fn push_economic_edge(&mut self, edge: EconomicEdge) {
        self.economic_edges.push(edge);
        if self.economic_edges.len() > MAX_ECONOMIC_EDGE_HISTORY {
            let overflow = self.economic_edges.len() - MAX_ECONOMIC_EDGE_HISTORY;
            self.economic_edges.drain(0..overflow);
        }
    }
}

/// Packs state into the bytes a host's persistent-memory slot stores.
pub fn to_bytes(state: &PersistedState) -> Result<Vec<u8>> {
    Ok(bincode::serialize(state)?)
}

/// Unpacks state from a host's persistent-memory slot. A missing or
/// corrupt slot is the caller's decision to handle (typically: start a
/// fresh colony), so this returns the bincode error rather than hiding
/// it behind a default.
pub fn from_bytes(bytes: &[u8]) -> Result<PersistedState> {
    Ok(bincode::deserialize(bytes)?)
}
