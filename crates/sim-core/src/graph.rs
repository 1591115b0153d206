//! World graph primitives: peak clustering, nodes, edges (spec.md §4.A).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geometry::{territories_touch, Peak, Position, RoomName};

/// Default Chebyshev-distance merge threshold for peak clustering.
pub const MERGE_THRESHOLD: u32 = 12;
/// Fixed abstract capacity assigned to every constructed edge.
pub const EDGE_CAPACITY: u32 = 10;
/// Maximum Chebyshev distance for a cross-room edge.
pub const CROSS_ROOM_MAX_DISTANCE: u32 = 15;

/// A territorial node in the world graph: a cluster of peaks treated as one
/// unit (spec.md §3.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldNode {
    pub id: String,
    pub room: RoomName,
    pub center: Position,
    pub territory: Vec<Position>,
    pub adjacency: Vec<String>,
    pub priority: usize,
    pub absorbed_peaks: Vec<usize>,
}

/// An adjacency between two nodes whose territories touch, or which lie
/// across adjacent rooms within [`CROSS_ROOM_MAX_DISTANCE`] (spec.md §3.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldEdge {
    pub id: String,
    pub a: String,
    pub b: String,
    pub distance: u32,
    pub capacity: u32,
}

/// Canonical edge id: lexicographic concatenation of endpoint ids, so the id
/// is uniquely determined by the unordered endpoint pair (spec.md §3.2).
pub fn edge_id(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

fn canonical_endpoints<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The world graph: nodes, edges, and a node->edge-id index, version-stamped
/// so readers can detect wholesale rebuilds (spec.md §3.2, §5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldGraph {
    pub nodes: BTreeMap<String, WorldNode>,
    pub edges: BTreeMap<String, WorldEdge>,
    pub node_edges: BTreeMap<String, Vec<String>>,
    pub timestamp: u64,
    pub version: u64,
}

impl WorldGraph {
    pub fn empty(timestamp: u64) -> Self {
        WorldGraph {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            node_edges: BTreeMap::new(),
            timestamp,
            version: 0,
        }
    }

    /// Insert an edge, maintaining the `node_edges` adjacency index and each
    /// node's `adjacency` list symmetrically.
    pub fn add_edge(&mut self, a: &str, b: &str, distance: u32, capacity: u32) -> String {
        let (lo, hi) = canonical_endpoints(a, b);
        let id = edge_id(lo, hi);
        if self.edges.contains_key(&id) {
            return id;
        }
        self.edges.insert(
            id.clone(),
            WorldEdge {
                id: id.clone(),
                a: lo.to_string(),
                b: hi.to_string(),
                distance,
                capacity,
            },
        );
        self.node_edges
            .entry(lo.to_string())
            .or_default()
            .push(id.clone());
        self.node_edges
            .entry(hi.to_string())
            .or_default()
            .push(id.clone());
        if let Some(n) = self.nodes.get_mut(lo) {
            if !n.adjacency.contains(&hi.to_string()) {
                n.adjacency.push(hi.to_string());
            }
        }
        if let Some(n) = self.nodes.get_mut(hi) {
            if !n.adjacency.contains(&lo.to_string()) {
                n.adjacency.push(lo.to_string());
            }
        }
        id
    }

    /// BFS adjacency lookup: ids of nodes directly reachable from `id`.
    pub fn neighbours(&self, id: &str) -> Vec<String> {
        self.nodes
            .get(id)
            .map(|n| n.adjacency.clone())
            .unwrap_or_default()
    }

    /// Validate the structural invariants of spec.md §3.2 / §8.1 item 1.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for edge in self.edges.values() {
            let a = self
                .nodes
                .get(&edge.a)
                .ok_or_else(|| ValidationError::DanglingEdgeEndpoint(edge.id.clone(), edge.a.clone()))?;
            let b = self
                .nodes
                .get(&edge.b)
                .ok_or_else(|| ValidationError::DanglingEdgeEndpoint(edge.id.clone(), edge.b.clone()))?;
            if !a.adjacency.contains(&edge.b) {
                return Err(ValidationError::AsymmetricAdjacency(
                    edge.a.clone(),
                    edge.b.clone(),
                ));
            }
            if !b.adjacency.contains(&edge.a) {
                return Err(ValidationError::AsymmetricAdjacency(
                    edge.b.clone(),
                    edge.a.clone(),
                ));
            }
        }
        let ids: Vec<&String> = self.nodes.keys().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let na = &self.nodes[ids[i]];
                let nb = &self.nodes[ids[j]];
                if na.territory.iter().any(|p| nb.territory.contains(p)) {
                    return Err(ValidationError::OverlappingTerritory(
                        ids[i].clone(),
                        ids[j].clone(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Disjoint-set union over peak indices, with path compression and
/// union-by-rank (spec.md §4.A algorithm).
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// A merged group of one or more peaks: combined territory, a deterministic
/// representative center, and a priority equal to territory size.
#[derive(Clone, Debug)]
pub struct PeakCluster {
    pub territory: Vec<Position>,
    pub center: Position,
    pub priority: usize,
    pub member_peaks: Vec<usize>,
}

/// Merge peaks in a single room into clusters (spec.md §4.A "Peak
/// clustering"). Two peaks merge iff their centers are within
/// `merge_threshold` Chebyshev distance, or their territories share an
/// 8-neighbour boundary.
pub fn cluster_peaks(peaks: &[Peak], merge_threshold: u32) -> Vec<PeakCluster> {
    let n = peaks.len();
    let mut dsu = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            let close = peaks[i].center.chebyshev(&peaks[j].center) < merge_threshold;
            let touching = territories_touch(&peaks[i].territory, &peaks[j].territory);
            if close || touching {
                dsu.union(i, j);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        let root = dsu.find(i);
        groups.entry(root).or_default().push(i);
    }

    let mut clusters: Vec<PeakCluster> = groups
        .into_values()
        .map(|members| {
            let mut territory: Vec<Position> = Vec::new();
            for &m in &members {
                territory.extend(peaks[m].territory.iter().copied());
            }
            let mean = mean_center(members.iter().map(|&m| peaks[m].center));
            let center = representative_center(&territory, mean);
            PeakCluster {
                priority: territory.len(),
                territory,
                center,
                member_peaks: members,
            }
        })
        .collect();
    // Deterministic ordering: by representative center's world coords, then id.
    clusters.sort_by_key(|c| c.center.world_coords());
    clusters
}

fn mean_center(centers: impl Iterator<Item = Position>) -> (i64, i64) {
    let mut sx = 0i64;
    let mut sy = 0i64;
    let mut n = 0i64;
    for c in centers {
        let (x, y) = c.world_coords();
        sx += x;
        sy += y;
        n += 1;
    }
    if n == 0 {
        (0, 0)
    } else {
        (sx / n, sy / n)
    }
}

/// The position in `territory` minimising L1 distance to `mean`, breaking
/// ties by lexicographically-smallest position for determinism (SPEC_FULL §2).
fn representative_center(territory: &[Position], mean: (i64, i64)) -> Position {
    territory
        .iter()
        .copied()
        .min_by_key(|p| {
            let (x, y) = p.world_coords();
            let l1 = (x - mean.0).abs() + (y - mean.1).abs();
            (l1, *p)
        })
        .expect("cluster territory is never empty")
}

/// Build one [`WorldNode`] per cluster (spec.md §4.A "Node construction").
pub fn nodes_from_clusters(room: RoomName, clusters: &[PeakCluster]) -> Vec<WorldNode> {
    clusters
        .iter()
        .enumerate()
        .map(|(i, c)| WorldNode {
            id: format!("{room}-cluster-{i}"),
            room,
            center: c.center,
            territory: c.territory.clone(),
            adjacency: Vec::new(),
            priority: c.priority,
            absorbed_peaks: c.member_peaks.clone(),
        })
        .collect()
}

/// Connect every pair of nodes in `graph` whose territories share an
/// 8-neighbour boundary (spec.md §4.A "Edge construction").
pub fn connect_within_room_edges(graph: &mut WorldGraph, node_ids: &[String]) {
    for i in 0..node_ids.len() {
        for j in (i + 1)..node_ids.len() {
            let a = &graph.nodes[&node_ids[i]];
            let b = &graph.nodes[&node_ids[j]];
            if territories_touch(&a.territory, &b.territory) {
                let distance = a.center.chebyshev(&b.center);
                graph.add_edge(&node_ids[i], &node_ids[j], distance, EDGE_CAPACITY);
            }
        }
    }
}

/// Connect nodes across adjacent rooms: every node in room A gets an edge to
/// its nearest node in room B, provided that distance is within
/// [`CROSS_ROOM_MAX_DISTANCE`] (spec.md §4.A "Cross-room edges").
pub fn connect_cross_room_edges(
    graph: &mut WorldGraph,
    room_a_nodes: &[String],
    room_b_nodes: &[String],
) {
    for a_id in room_a_nodes {
        let a_center = graph.nodes[a_id].center;
        let nearest = room_b_nodes
            .iter()
            .map(|b_id| (b_id, a_center.chebyshev(&graph.nodes[b_id].center)))
            .min_by_key(|(_, d)| *d);
        if let Some((b_id, dist)) = nearest {
            if dist <= CROSS_ROOM_MAX_DISTANCE {
                graph.add_edge(a_id, b_id, dist, EDGE_CAPACITY);
            }
        }
    }
}
