use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::corp::{CorpDetail, CorpState};
use sim_core::geometry::{Position, RoomName};
use sim_runtime::host::{BodyPartKind, Creep, CreepMemory, MockHost, Source};
use sim_runtime::{execute_all, Orchestrator};

fn fixture() -> (MockHost, BTreeMap<String, CorpState>) {
    let room = RoomName::parse("W1N1").unwrap();
    let mut host = MockHost::new(300.0);
    host.sources.insert(
        "source-1".into(),
        Source { id: "source-1".into(), position: Position::new(10, 10, room), energy: 3000.0, energy_capacity: 3000.0 },
    );
    host.creeps.insert(
        "miner-1".into(),
        Creep {
            id: "miner-1".into(),
            position: Position::new(10, 11, room),
            body: vec![BodyPartKind::Work, BodyPartKind::Work, BodyPartKind::Carry, BodyPartKind::Move],
            store: BTreeMap::new(),
            store_capacity: 50,
            ticks_to_live: 1_500,
            memory: CreepMemory::default(),
        },
    );
    let mut corps = BTreeMap::new();
    corps.insert(
        "mining-1".to_string(),
        CorpState::new("mining-1", "node-1", CorpDetail::Mining { source_id: "source-1".into(), miner_creep_ids: vec!["miner-1".into()] }, 0),
    );
    (host, corps)
}

fn bench_tick(c: &mut Criterion) {
    let (mut host, mut corps) = fixture();
    let mut orch = Orchestrator::new();
    let mut room_intel = BTreeMap::new();
    let mut tick = 0u64;
    c.bench_function("execute_all over one mining corp", |b| {
        b.iter(|| {
            host.tick = tick;
            let _plan = orch.phase_plan(tick, host.cpu_bucket());
            execute_all(&mut host, &mut corps, &mut room_intel, tick);
            tick += 1;
            black_box(&corps);
        })
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
