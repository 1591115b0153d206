#![deny(warnings)]

//! Headless runner: spins up a mock host with a single source/spawn/
//! controller, seeds a handful of corps, and ticks the orchestrator for
//! a configurable number of ticks, printing a KPI summary, persisting
//! colony state to the host's raw segment, and writing a telemetry
//! snapshot to disk.

use std::collections::BTreeMap;

use anyhow::Result;
use persistence::PersistedState;
use sim_core::colony::World;
use sim_core::corp::{CorpDetail, CorpState};
use sim_core::geometry::{Position, RoomName};
use sim_runtime::host::{BodyPartKind, Creep, CreepMemory, Host, MockHost, Source, Structure, StructureKind};
use sim_runtime::{telemetry, Orchestrator};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const PERSISTENCE_SEGMENT: u8 = 0;

fn empty_world() -> World {
    World {
        colonies: BTreeMap::new(),
        node_to_colony: BTreeMap::new(),
        timestamp: 0,
        version: 1,
        total_nodes: 0,
        total_edges: 0,
        total_energy: 0.0,
    }
}

fn parse_args() -> (u64, String) {
    let mut ticks: u64 = 1_000;
    let mut out_dir = "telemetry".to_string();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--ticks" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    ticks = v;
                }
            }
            "--out-dir" => {
                if let Some(v) = it.next() {
                    out_dir = v;
                }
            }
            _ => {}
        }
    }
    (ticks, out_dir)
}

/// A single room with one source, one spawn, and one controller, plus
/// one starter creep per corp: enough to exercise every `execute()`
/// driver without needing a real simulated-game connection.
fn seed_fixture() -> (MockHost, BTreeMap<String, CorpState>, BTreeMap<String, Position>) {
    let room = RoomName::parse("W1N1").unwrap();
    let mut host = MockHost::new(300.0);

    let source_pos = Position::new(10, 10, room);
    let spawn_pos = Position::new(25, 25, room);
    let controller_pos = Position::new(40, 40, room);

    host.sources.insert(
        "source-1".into(),
        Source { id: "source-1".into(), position: source_pos, energy: 3000.0, energy_capacity: 3000.0 },
    );
    host.structures.insert(
        "spawn-1".into(),
        Structure { id: "spawn-1".into(), kind: StructureKind::Spawn, position: spawn_pos, energy: 0, energy_capacity: 300, rcl: 1 },
    );
    host.structures.insert(
        "controller-1".into(),
        Structure { id: "controller-1".into(), kind: StructureKind::Controller, position: controller_pos, energy: 0, energy_capacity: 0, rcl: 1 },
    );
    host.structures.insert(
        "storage-1".into(),
        Structure { id: "storage-1".into(), kind: StructureKind::Storage, position: Position::new(10, 9, room), energy: 10_000, energy_capacity: 100_000, rcl: 1 },
    );

    let miner = Creep {
        id: "miner-1".into(),
        position: Position::new(10, 11, room),
        body: vec![BodyPartKind::Work, BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
        store: BTreeMap::new(),
        store_capacity: 50,
        ticks_to_live: 1_500,
        memory: CreepMemory::default(),
    };
    let mut hauler_store = BTreeMap::new();
    hauler_store.insert("energy".to_string(), 0);
    let hauler = Creep {
        id: "hauler-1".into(),
        position: Position::new(10, 12, room),
        body: vec![BodyPartKind::Carry, BodyPartKind::Carry, BodyPartKind::Move, BodyPartKind::Move],
        store: hauler_store,
        store_capacity: 100,
        ticks_to_live: 1_500,
        memory: CreepMemory::default(),
    };
    let upgrader = Creep {
        id: "upgrader-1".into(),
        position: Position::new(40, 41, room),
        body: vec![BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
        store: BTreeMap::new(),
        store_capacity: 50,
        ticks_to_live: 1_500,
        memory: CreepMemory::default(),
    };
    host.creeps.insert(miner.id.clone(), miner);
    host.creeps.insert(hauler.id.clone(), hauler);
    host.creeps.insert(upgrader.id.clone(), upgrader);

    let mut corps = BTreeMap::new();
    corps.insert(
        "mining-1".to_string(),
        CorpState::new("mining-1", "node-1", CorpDetail::Mining { source_id: "source-1".into(), miner_creep_ids: vec!["miner-1".into()] }, 0),
    );
    corps.insert(
        "hauling-1".to_string(),
        CorpState::new(
            "hauling-1",
            "node-1",
            CorpDetail::Hauling { route_from: "storage-1".into(), route_to: vec!["spawn-1".into()], hauler_creep_ids: vec!["hauler-1".into()] },
            0,
        ),
    );
    corps.insert(
        "upgrading-1".to_string(),
        CorpState::new(
            "upgrading-1",
            "node-1",
            CorpDetail::Upgrading { controller_id: "controller-1".into(), upgrader_creep_ids: vec!["upgrader-1".into()] },
            0,
        ),
    );

    let mut locations = BTreeMap::new();
    locations.insert("mining-1".to_string(), source_pos);
    locations.insert("hauling-1".to_string(), spawn_pos);
    locations.insert("upgrading-1".to_string(), controller_pos);

    (host, corps, locations)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_max_level(Level::INFO).init();

    let (ticks, out_dir) = parse_args();
    info!(ticks, out_dir = %out_dir, "starting colony runner");

    let (mut host, mut corps, locations) = seed_fixture();
    let config = sim_ai::config::AiConfig::from_default_yaml()?;
    let mut orch = Orchestrator::new();
    let mut pruned_total = 0usize;
    let mut room_intel: BTreeMap<String, persistence::RoomIntel> = BTreeMap::new();
    let offers: Vec<sim_core::Offer> = Vec::new();

    match host.segment(PERSISTENCE_SEGMENT) {
        Some(bytes) => {
            let restored = persistence::from_bytes(&bytes)?;
            info!(saved_at_tick = restored.saved_at_tick, "found prior persisted state (fixture still reseeds fresh)");
            room_intel = restored.room_intel;
        }
        None => info!("no prior persisted state; starting a fresh colony"),
    }

    let mut last_report = sim_runtime::TickReport::default();
    for tick in 0..ticks {
        host.tick = tick;
        let report = orch.tick(&mut host, &mut corps, &locations, &config, &mut room_intel, &offers, None, tick);
        if report.phase_plan.plan_chains {
            info!(tick, chain_count = report.chains.len(), funded = report.funded_contracts.len(), "chain planning pass");
        }
        pruned_total += report.pruned.len();
        last_report = report;
    }

    let mut state = PersistedState::new(empty_world(), ticks);
    state.corps = corps.clone();
    state.room_intel = room_intel.clone();
    for contract in last_report.funded_contracts.iter().chain(last_report.cleared_contracts.iter()) {
        state.contracts.insert(contract.id.clone(), contract.clone());
    }
    let blob = persistence::to_bytes(&state)?;
    info!(bytes = blob.len(), "persisting colony state to segment {PERSISTENCE_SEGMENT}");
    host.set_segment(PERSISTENCE_SEGMENT, blob);

    let ledger = telemetry::corp_ledger(&corps);
    let summary = telemetry::colony_summary("colony-1", ticks, &corps);

    println!(
        "Ran {ticks} ticks | corps remaining: {} | pruned: {pruned_total} | total balance: {}",
        corps.len(),
        summary.total_balance,
    );
    for entry in &ledger.corps {
        println!("  {:<14} {:?}  balance={}  roi={:.3}", entry.id, entry.kind, entry.balance, entry.roi);
    }

    let open_contract_count = corps.values().map(|c| c.contracts.len()).sum();
    let fully_funded_count = last_report.chains.iter().filter(|c| c.is_fully_funded()).count();
    let snapshot = telemetry::TelemetrySnapshot {
        colony_summary: summary,
        corp_ledger: ledger,
        market: telemetry::MarketSegment { open_offer_count: offers.len(), open_contract_count },
        chains: telemetry::ChainSegment { active_chain_count: last_report.chains.len(), fully_funded_count },
        graph: telemetry::GraphSegment { metrics: last_report.graph_metrics.clone() },
        equilibrium: telemetry::EquilibriumSegment { status: last_report.equilibrium, supply: last_report.supply, demand: last_report.demand },
        cpu: telemetry::CpuSegment {
            cpu_used: host.cpu_used,
            cpu_bucket: host.cpu_bucket,
            skipped_chain_planning: !last_report.phase_plan.plan_chains,
            skipped_metrics: !last_report.phase_plan.compute_metrics,
            skipped_graph_rebuild: !last_report.phase_plan.rebuild_graph,
        },
    };

    std::fs::create_dir_all(&out_dir)?;
    for (name, body) in snapshot.to_segments()? {
        let path = format!("{out_dir}/{name}.json");
        std::fs::write(&path, body)?;
    }
    println!("Telemetry segments written under {out_dir}/");

    Ok(())
}
