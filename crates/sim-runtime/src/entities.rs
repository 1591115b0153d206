//! ECS components wrapping the domain types from `sim-core`, so the
//! orchestrator can query "all corps of kind X" or "all colonies" without
//! threading explicit collections through every system.

use bevy_ecs::prelude::*;
use sim_core::colony::Colony;
use sim_core::corp::{CorpDetail, CorpKind, CorpState};
use sim_core::geometry::Position;

#[derive(Component, Clone, Debug)]
pub struct CorpId(pub String);

#[derive(Component, Clone, Debug)]
pub struct ColonyId(pub String);

#[derive(Component, Clone, Debug)]
pub struct CorpLocation(pub Position);

#[derive(Component, Clone, Debug)]
pub struct CorpStateComponent(pub CorpState);

#[derive(Component, Clone, Debug)]
pub struct CorpDetailComponent(pub CorpDetail);

#[derive(Component, Clone, Debug)]
pub struct ColonyComponent(pub Colony);

/// Spawns one ECS entity per corp, tagged with its owning colony.
pub fn spawn_corp(world: &mut World, colony_id: &str, detail: CorpDetail, state: CorpState, location: Position) -> Entity {
    let corp_id = state.id.clone();
    world
        .spawn((
            CorpId(corp_id),
            ColonyId(colony_id.to_string()),
            CorpLocation(location),
            CorpStateComponent(state),
            CorpDetailComponent(detail),
        ))
        .id()
}

pub fn spawn_colony(world: &mut World, colony: Colony) -> Entity {
    world.spawn((ColonyId(colony.id.clone()), ColonyComponent(colony))).id()
}

/// Collects every corp entity of a given kind, e.g. for a per-kind
/// execution pass.
pub fn corps_of_kind(world: &mut World, kind: CorpKind) -> Vec<Entity> {
    let mut query = world.query::<(Entity, &CorpDetailComponent)>();
    query
        .iter(world)
        .filter(|(_, detail)| detail.0.kind() == kind)
        .map(|(entity, _)| entity)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::corp::CorpDetail;
    use sim_core::geometry::RoomName;

    #[test]
    fn spawning_corps_and_filtering_by_kind_round_trips() {
        let mut world = World::new();
        let room = RoomName::parse("W1N1").unwrap();
        let pos = Position::new(10, 10, room);
        let mining = CorpDetail::Mining { source_id: "s1".into(), miner_creep_ids: vec![] };
        let state = CorpState::new("corp-1", "n1", mining.clone(), 0);
        spawn_corp(&mut world, "colony-1", mining, state, pos);

        let scout = CorpDetail::Scout { scout_creep_id: None, blocked_rooms: vec![] };
        let state2 = CorpState::new("corp-2", "n1", scout.clone(), 0);
        spawn_corp(&mut world, "colony-1", scout, state2, pos);

        assert_eq!(corps_of_kind(&mut world, CorpKind::Mining).len(), 1);
        assert_eq!(corps_of_kind(&mut world, CorpKind::Scout).len(), 1);
        assert_eq!(corps_of_kind(&mut world, CorpKind::Hauling).len(), 0);
    }
}
