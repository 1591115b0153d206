//! Connected components of the node graph, with aggregated economy
//! (spec.md §4.B).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::graph::WorldGraph;
use crate::geometry::RoomName;

/// Colony health, driven off aggregated energy (spec.md §4.B "Status
/// transitions").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColonyStatus {
    Thriving,
    Established,
    Nascent,
    Declining,
    Dormant,
}

impl ColonyStatus {
    /// Ordering used by `merge`: higher is "stronger".
    fn strength(self) -> u8 {
        match self {
            ColonyStatus::Thriving => 4,
            ColonyStatus::Established => 3,
            ColonyStatus::Nascent => 2,
            ColonyStatus::Declining => 1,
            ColonyStatus::Dormant => 0,
        }
    }

    pub fn stronger(self, other: ColonyStatus) -> ColonyStatus {
        if self.strength() >= other.strength() {
            self
        } else {
            other
        }
    }
}

/// Status from aggregated energy, per the four thresholds in spec.md §4.B.
pub fn status_for_energy(energy: f64) -> ColonyStatus {
    if energy < 5_000.0 {
        ColonyStatus::Declining
    } else if energy < 20_000.0 {
        ColonyStatus::Nascent
    } else if energy < 100_000.0 {
        ColonyStatus::Established
    } else {
        ColonyStatus::Thriving
    }
}

/// Aggregated resources for a colony (spec.md §3.3).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Resources {
    pub energy: f64,
    pub power: f64,
    pub minerals: BTreeMap<String, f64>,
}

impl Resources {
    pub fn merge(&self, other: &Resources) -> Resources {
        let mut minerals = self.minerals.clone();
        for (k, v) in &other.minerals {
            *minerals.entry(k.clone()).or_insert(0.0) += v;
        }
        Resources {
            energy: self.energy + other.energy,
            power: self.power + other.power,
            minerals,
        }
    }
}

/// A connected component of the world graph with aggregated economy
/// (spec.md §3.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Colony {
    pub id: String,
    pub name: String,
    pub graph: WorldGraph,
    pub status: ColonyStatus,
    pub primary_room: RoomName,
    pub controlled_rooms: BTreeSet<RoomName>,
    pub resources: Resources,
    pub operations: BTreeSet<String>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Colony {
    /// True iff the colony's own graph is connected under its own adjacency
    /// (spec.md §8.1 item 2).
    pub fn is_connected(&self) -> bool {
        connected_components(&self.graph).len() <= 1
    }
}

/// Top-level registry: colonies plus the canonical node->colony index
/// (spec.md §3.3, §9 "single canonical store").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    pub colonies: BTreeMap<String, Colony>,
    pub node_to_colony: BTreeMap<String, String>,
    pub timestamp: u64,
    pub version: u64,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_energy: f64,
}

impl World {
    pub fn recompute_aggregates(&mut self) {
        self.total_nodes = self.colonies.values().map(|c| c.graph.nodes.len()).sum();
        self.total_edges = self.colonies.values().map(|c| c.graph.edges.len()).sum();
        self.total_energy = self.colonies.values().map(|c| c.resources.energy).sum();
    }

    /// Validate the §8.1 item 2 invariants across every colony.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for colony in self.colonies.values() {
            colony.graph.validate()?;
            if !colony.is_connected() {
                return Err(ValidationError::DisconnectedColony(colony.id.clone()));
            }
            for node_id in colony.graph.nodes.keys() {
                match self.node_to_colony.get(node_id) {
                    Some(cid) if cid == &colony.id => {}
                    _ => {
                        return Err(ValidationError::DanglingNodeToColony(
                            node_id.clone(),
                            colony.id.clone(),
                        ))
                    }
                }
            }
        }
        Ok(())
    }
}

/// BFS connected components of `graph`, returned as lists of node ids.
pub fn connected_components(graph: &WorldGraph) -> Vec<Vec<String>> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut components = Vec::new();
    for start in graph.nodes.keys() {
        if seen.contains(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        seen.insert(start.clone());
        while let Some(cur) = queue.pop_front() {
            component.push(cur.clone());
            for next in graph.neighbours(&cur) {
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

fn subgraph(graph: &WorldGraph, node_ids: &[String]) -> WorldGraph {
    let mut sub = WorldGraph::empty(graph.timestamp);
    sub.version = graph.version;
    let id_set: BTreeSet<&String> = node_ids.iter().collect();
    for id in node_ids {
        sub.nodes.insert(id.clone(), graph.nodes[id].clone());
    }
    for edges in node_ids.iter().filter_map(|id| graph.node_edges.get(id)) {
        for eid in edges {
            let edge = &graph.edges[eid];
            if id_set.contains(&edge.a) && id_set.contains(&edge.b) && !sub.edges.contains_key(eid)
            {
                sub.edges.insert(eid.clone(), edge.clone());
                sub.node_edges
                    .entry(edge.a.clone())
                    .or_default()
                    .push(eid.clone());
                sub.node_edges
                    .entry(edge.b.clone())
                    .or_default()
                    .push(eid.clone());
            }
        }
    }
    sub
}

fn primary_room_of(graph: &WorldGraph) -> Option<RoomName> {
    let mut counts: BTreeMap<RoomName, usize> = BTreeMap::new();
    for n in graph.nodes.values() {
        *counts.entry(n.room).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, c)| *c)
        .map(|(room, _)| room)
}

/// Rebuild the whole [`World`] from a freshly-built [`WorldGraph`]: one
/// colony per connected component (spec.md §4.B "Connected components").
pub fn build_colonies(graph: &WorldGraph, now: u64) -> World {
    let components = connected_components(graph);
    let mut colonies = BTreeMap::new();
    let mut node_to_colony = BTreeMap::new();
    for (i, component) in components.iter().enumerate() {
        let id = format!("colony-{i}");
        let sub = subgraph(graph, component);
        let primary_room = primary_room_of(&sub).unwrap_or_else(|| sub.nodes.values().next().unwrap().room);
        for node_id in component {
            node_to_colony.insert(node_id.clone(), id.clone());
        }
        colonies.insert(
            id.clone(),
            Colony {
                id: id.clone(),
                name: format!("Colony {i}"),
                graph: sub,
                status: ColonyStatus::Nascent,
                primary_room,
                controlled_rooms: BTreeSet::from([primary_room]),
                resources: Resources::default(),
                operations: BTreeSet::new(),
                metadata: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            },
        );
    }
    let mut world = World {
        colonies,
        node_to_colony,
        timestamp: now,
        version: graph.version,
        total_nodes: 0,
        total_edges: 0,
        total_energy: 0.0,
    };
    world.recompute_aggregates();
    world
}

/// Merge two colonies into one (spec.md §4.B "Merge"): union of nodes,
/// edges, controlled rooms, and summed resources; status is the stronger of
/// the two; primary room is preserved from `a`.
pub fn merge(a: &Colony, b: &Colony, now: u64) -> Colony {
    let mut graph = a.graph.clone();
    for (id, node) in &b.graph.nodes {
        graph.nodes.entry(id.clone()).or_insert_with(|| node.clone());
    }
    for (id, edge) in &b.graph.edges {
        if !graph.edges.contains_key(id) {
            graph.edges.insert(id.clone(), edge.clone());
            graph.node_edges.entry(edge.a.clone()).or_default().push(id.clone());
            graph.node_edges.entry(edge.b.clone()).or_default().push(id.clone());
        }
    }
    graph.version = a.graph.version.max(b.graph.version) + 1;
    graph.timestamp = now;

    Colony {
        id: a.id.clone(),
        name: a.name.clone(),
        graph,
        status: a.status.stronger(b.status),
        primary_room: a.primary_room,
        controlled_rooms: a.controlled_rooms.union(&b.controlled_rooms).copied().collect(),
        resources: a.resources.merge(&b.resources),
        operations: a.operations.union(&b.operations).cloned().collect(),
        metadata: {
            let mut m = a.metadata.clone();
            m.extend(b.metadata.clone());
            m
        },
        created_at: a.created_at.min(b.created_at),
        updated_at: now,
    }
}

/// If `colony`'s internal adjacency has more than one connected component,
/// split it into one colony per component, each inheriting the parent's
/// status and metadata (spec.md §4.B "Split", §8.1 item "disconnected
/// colony"). Resources are copied unchanged to every piece (open question,
/// see DESIGN.md).
pub fn split_colony_if_needed(colony: &Colony, now: u64) -> Vec<Colony> {
    let components = connected_components(&colony.graph);
    if components.len() <= 1 {
        return vec![colony.clone()];
    }
    components
        .iter()
        .enumerate()
        .map(|(i, component)| {
            let sub = subgraph(&colony.graph, component);
            let primary_room =
                primary_room_of(&sub).unwrap_or_else(|| sub.nodes.values().next().unwrap().room);
            Colony {
                id: format!("{}-split-{i}", colony.id),
                name: format!("{} (split {i})", colony.name),
                graph: sub,
                status: colony.status,
                primary_room,
                controlled_rooms: BTreeSet::from([primary_room]),
                resources: colony.resources.clone(),
                operations: colony.operations.clone(),
                metadata: colony.metadata.clone(),
                created_at: colony.created_at,
                updated_at: now,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::graph::WorldNode;

    fn room() -> RoomName {
        RoomName::parse("W1N1").unwrap()
    }

    fn line_graph(n: usize) -> WorldGraph {
        let mut g = WorldGraph::empty(0);
        for i in 0..n {
            let id = format!("n{i}");
            g.nodes.insert(
                id.clone(),
                WorldNode {
                    id: id.clone(),
                    room: room(),
                    center: Position::new(i as u8, 0, room()),
                    territory: vec![Position::new(i as u8, 0, room())],
                    adjacency: Vec::new(),
                    priority: 1,
                    absorbed_peaks: vec![],
                },
            );
        }
        for i in 0..n - 1 {
            g.add_edge(&format!("n{i}"), &format!("n{}", i + 1), 1, 10);
        }
        g
    }

    #[test]
    fn status_ladder_thresholds() {
        assert_eq!(status_for_energy(0.0), ColonyStatus::Declining);
        assert_eq!(status_for_energy(4_999.0), ColonyStatus::Declining);
        assert_eq!(status_for_energy(5_000.0), ColonyStatus::Nascent);
        assert_eq!(status_for_energy(19_999.0), ColonyStatus::Nascent);
        assert_eq!(status_for_energy(20_000.0), ColonyStatus::Established);
        assert_eq!(status_for_energy(99_999.0), ColonyStatus::Established);
        assert_eq!(status_for_energy(100_000.0), ColonyStatus::Thriving);
    }

    #[test]
    fn build_colonies_one_component_one_colony() {
        let g = line_graph(4);
        let world = build_colonies(&g, 0);
        assert_eq!(world.colonies.len(), 1);
        assert_eq!(world.total_nodes, 4);
        world.validate().unwrap();
    }

    #[test]
    fn disconnected_colony_splits_into_matching_components() {
        // Scenario 5: 6-node line, remove node 3, expect 2 components of 3 and 2.
        let mut g = line_graph(6);
        let removed_edges: Vec<String> = g
            .node_edges
            .get("n3")
            .cloned()
            .unwrap_or_default();
        for eid in &removed_edges {
            g.edges.remove(eid);
        }
        for (_, edges) in g.node_edges.iter_mut() {
            edges.retain(|e| !removed_edges.contains(e));
        }
        g.nodes.remove("n3");
        for n in g.nodes.values_mut() {
            n.adjacency.retain(|a| a != "n3");
        }

        let world = build_colonies(&g, 0);
        // With node 3 gone: {n0,n1,n2} and {n4,n5}.
        let colony = world.colonies.values().next().unwrap();
        let merged = {
            let mut all = colony.clone();
            for other in world.colonies.values().skip(1) {
                all = merge(&all, other, 10);
            }
            all
        };
        let pieces = split_colony_if_needed(&merged, 20);
        assert_eq!(pieces.len(), 2);
        let mut sizes: Vec<usize> = pieces.iter().map(|c| c.graph.nodes.len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 3]);
        for p in &pieces {
            assert_eq!(p.status, merged.status);
        }
    }

    #[test]
    fn merge_takes_stronger_status_and_sums_resources() {
        let g1 = line_graph(2);
        let mut g2 = WorldGraph::empty(0);
        g2.nodes.insert(
            "m0".into(),
            WorldNode {
                id: "m0".into(),
                room: RoomName::parse("W2N1").unwrap(),
                center: Position::new(0, 0, RoomName::parse("W2N1").unwrap()),
                territory: vec![Position::new(0, 0, RoomName::parse("W2N1").unwrap())],
                adjacency: vec![],
                priority: 1,
                absorbed_peaks: vec![],
            },
        );
        let w1 = build_colonies(&g1, 0);
        let w2 = build_colonies(&g2, 0);
        let mut c1 = w1.colonies.values().next().unwrap().clone();
        let mut c2 = w2.colonies.values().next().unwrap().clone();
        c1.status = ColonyStatus::Declining;
        c1.resources.energy = 100.0;
        c2.status = ColonyStatus::Thriving;
        c2.resources.energy = 50.0;
        let merged = merge(&c1, &c2, 5);
        assert_eq!(merged.status, ColonyStatus::Thriving);
        assert_eq!(merged.resources.energy, 150.0);
        assert_eq!(merged.graph.nodes.len(), 3);
    }
}
