//! Read-only structural and economic metrics (spec.md §4.J). None of these
//! mutate core state.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::graph::WorldGraph;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub degree_distribution: BTreeMap<usize, usize>,
    pub is_connected: bool,
    pub isolated_node_count: usize,
    /// `1 / (1 + coefficient of variation)` of territory sizes; 1.0 when
    /// all territories are equal, tending to 0 as they diverge.
    pub territory_balance: f64,
    pub mean_edge_length: f64,
    pub edge_length_stddev: f64,
    pub articulation_points: BTreeSet<String>,
    /// Closeness centrality per node: `(reachable - 1) / sum(distances)`,
    /// 0.0 for isolated or unreachable nodes.
    pub closeness_centrality: BTreeMap<String, f64>,
}

fn degree_map(graph: &WorldGraph) -> BTreeMap<String, usize> {
    graph.nodes.keys().map(|id| (id.clone(), graph.neighbours(id).len())).collect()
}

fn bfs_reachable(graph: &WorldGraph, start: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start.to_string());
    queue.push_back(start.to_string());
    while let Some(cur) = queue.pop_front() {
        for next in graph.neighbours(&cur) {
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }
    seen
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / mean
}

/// Tarjan's bridge/articulation-point algorithm restricted to cut
/// vertices, used to flag single points of failure in a colony's graph.
fn articulation_points(graph: &WorldGraph) -> BTreeSet<String> {
    let ids: Vec<String> = graph.nodes.keys().cloned().collect();
    let index_of: BTreeMap<String, usize> = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
    let n = ids.len();
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![usize::MAX; n];
    let mut visited = vec![false; n];
    let mut result = BTreeSet::new();
    let mut timer = 0usize;

    fn dfs(
        u: usize,
        parent: Option<usize>,
        graph: &WorldGraph,
        ids: &[String],
        index_of: &BTreeMap<String, usize>,
        disc: &mut [usize],
        low: &mut [usize],
        visited: &mut [bool],
        timer: &mut usize,
        result: &mut BTreeSet<String>,
    ) {
        visited[u] = true;
        disc[u] = *timer;
        low[u] = *timer;
        *timer += 1;
        let mut children = 0;
        for neighbour in graph.neighbours(&ids[u]) {
            let v = match index_of.get(&neighbour) {
                Some(v) => *v,
                None => continue,
            };
            if Some(v) == parent {
                continue;
            }
            if visited[v] {
                low[u] = low[u].min(disc[v]);
            } else {
                children += 1;
                dfs(v, Some(u), graph, ids, index_of, disc, low, visited, timer, result);
                low[u] = low[u].min(low[v]);
                let is_cut = match parent {
                    None => children > 1,
                    Some(_) => low[v] >= disc[u],
                };
                if is_cut {
                    result.insert(ids[u].clone());
                }
            }
        }
    }

    for (i, id) in ids.iter().enumerate() {
        if !visited[i] {
            dfs(i, None, graph, &ids, &index_of, &mut disc, &mut low, &mut visited, &mut timer, &mut result);
        }
        let _ = id;
    }
    result
}

/// Shortest-path distances from `start` to every node reachable through
/// `graph.edges`, weighted by each edge's `distance` (Dijkstra over a
/// binary heap, since edge distances are non-negative tile counts).
fn dijkstra_distances(graph: &WorldGraph, start: &str) -> BTreeMap<String, u64> {
    let mut dist: BTreeMap<String, u64> = BTreeMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(start.to_string(), 0);
    heap.push(Reverse((0u64, start.to_string())));

    while let Some(Reverse((d, node))) = heap.pop() {
        if dist.get(&node).map_or(false, |&best| d > best) {
            continue;
        }
        for edge_id in graph.node_edges.get(&node).into_iter().flatten() {
            let Some(edge) = graph.edges.get(edge_id) else { continue };
            let next = if edge.a == node { &edge.b } else { &edge.a };
            let candidate = d + edge.distance as u64;
            if dist.get(next).map_or(true, |&best| candidate < best) {
                dist.insert(next.clone(), candidate);
                heap.push(Reverse((candidate, next.clone())));
            }
        }
    }
    dist
}

/// Closeness centrality per node (spec.md §4.J, "Dijkstra-based
/// closeness"): well-connected hub nodes score near 1.0, peripheral nodes
/// trend toward 0.
fn closeness_centrality(graph: &WorldGraph) -> BTreeMap<String, f64> {
    graph
        .nodes
        .keys()
        .map(|id| {
            let distances = dijkstra_distances(graph, id);
            let reachable = distances.len().saturating_sub(1);
            let total: u64 = distances.values().sum();
            let score = if reachable == 0 || total == 0 { 0.0 } else { reachable as f64 / total as f64 };
            (id.clone(), score)
        })
        .collect()
}

pub fn compute_graph_metrics(graph: &WorldGraph) -> GraphMetrics {
    let degrees = degree_map(graph);
    let mut degree_distribution: BTreeMap<usize, usize> = BTreeMap::new();
    for d in degrees.values() {
        *degree_distribution.entry(*d).or_insert(0) += 1;
    }

    let is_connected = match graph.nodes.keys().next() {
        Some(start) => bfs_reachable(graph, start).len() == graph.nodes.len(),
        None => true,
    };
    let isolated_node_count = degrees.values().filter(|d| **d == 0).count();

    let territory_sizes: Vec<f64> = graph.nodes.values().map(|n| n.territory.len() as f64).collect();
    let territory_balance = 1.0 / (1.0 + coefficient_of_variation(&territory_sizes));

    let edge_lengths: Vec<f64> = graph
        .edges
        .values()
        .map(|e| {
            let a = &graph.nodes[&e.a];
            let b = &graph.nodes[&e.b];
            a.center.chebyshev(&b.center) as f64
        })
        .collect();
    let mean_edge_length = if edge_lengths.is_empty() {
        0.0
    } else {
        edge_lengths.iter().sum::<f64>() / edge_lengths.len() as f64
    };
    let edge_length_stddev = if edge_lengths.is_empty() {
        0.0
    } else {
        let variance = edge_lengths.iter().map(|l| (l - mean_edge_length).powi(2)).sum::<f64>() / edge_lengths.len() as f64;
        variance.sqrt()
    };

    GraphMetrics {
        node_count: graph.nodes.len(),
        edge_count: graph.edges.len(),
        degree_distribution,
        is_connected,
        isolated_node_count,
        territory_balance,
        mean_edge_length,
        edge_length_stddev,
        articulation_points: articulation_points(graph),
        closeness_centrality: closeness_centrality(graph),
    }
}

/// Market balance status for one resource (spec.md §4.J "market
/// equilibrium").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquilibriumStatus {
    Balanced,
    Shortage,
    Surplus,
}

/// Within this fraction of demand, supply and demand are considered
/// balanced rather than a shortage/surplus.
pub const EQUILIBRIUM_TOLERANCE: f64 = 0.05;

pub fn equilibrium_status(supply: f64, demand: f64) -> EquilibriumStatus {
    if demand <= 0.0 {
        return if supply <= 0.0 { EquilibriumStatus::Balanced } else { EquilibriumStatus::Surplus };
    }
    let ratio = supply / demand;
    if (ratio - 1.0).abs() <= EQUILIBRIUM_TOLERANCE {
        EquilibriumStatus::Balanced
    } else if ratio < 1.0 {
        EquilibriumStatus::Shortage
    } else {
        EquilibriumStatus::Surplus
    }
}

/// Per-chain economic report (spec.md §4.J "Per-chain report").
#[derive(Clone, Debug, PartialEq)]
pub struct ChainReport {
    pub chain_id: String,
    pub profit: Decimal,
    pub profit_margin: f64,
    pub roi: f64,
    pub segment_breakdown: Vec<Decimal>,
}

pub fn chain_report(chain_id: impl Into<String>, mint_value: Decimal, total_cost: Decimal, segment_costs: Vec<Decimal>) -> ChainReport {
    let profit = mint_value - total_cost;
    let profit_margin: f64 = if mint_value.is_zero() {
        0.0
    } else {
        (profit / mint_value).try_into().unwrap_or(0.0)
    };
    let roi: f64 = if total_cost.is_zero() {
        0.0
    } else {
        (profit / total_cost).try_into().unwrap_or(0.0)
    };
    ChainReport {
        chain_id: chain_id.into(),
        profit,
        profit_margin,
        roi,
        segment_breakdown: segment_costs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::geometry::{Position, RoomName};
    use sim_core::graph::{WorldGraph, WorldNode};

    fn node(id: &str, x: u8, y: u8, territory_size: usize) -> WorldNode {
        let room = RoomName::parse("W1N1").unwrap();
        WorldNode {
            id: id.into(),
            room,
            center: Position::new(x, y, room),
            territory: (0..territory_size).map(|i| Position::new(i as u8, 0, room)).collect(),
            adjacency: Vec::new(),
            priority: territory_size,
            absorbed_peaks: Vec::new(),
        }
    }

    #[test]
    fn equilibrium_classifies_shortage_balance_surplus() {
        assert_eq!(equilibrium_status(50.0, 100.0), EquilibriumStatus::Shortage);
        assert_eq!(equilibrium_status(100.0, 100.0), EquilibriumStatus::Balanced);
        assert_eq!(equilibrium_status(200.0, 100.0), EquilibriumStatus::Surplus);
    }

    #[test]
    fn equilibrium_zero_demand_zero_supply_is_balanced() {
        assert_eq!(equilibrium_status(0.0, 0.0), EquilibriumStatus::Balanced);
    }

    #[test]
    fn middle_of_a_three_node_line_is_the_only_articulation_point() {
        let mut graph = WorldGraph::empty(0);
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            graph.nodes.insert(id.to_string(), node(id, i as u8, 0, 2));
        }
        graph.add_edge("a", "b", 1, 10);
        graph.add_edge("b", "c", 1, 10);
        let metrics = compute_graph_metrics(&graph);
        assert!(metrics.is_connected);
        assert_eq!(metrics.node_count, 3);
        assert_eq!(metrics.edge_count, 2);
        assert!(metrics.articulation_points.contains("b"));
        assert!(!metrics.articulation_points.contains("a"));
    }

    #[test]
    fn middle_of_a_three_node_line_has_higher_closeness() {
        let mut graph = WorldGraph::empty(0);
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            graph.nodes.insert(id.to_string(), node(id, i as u8, 0, 2));
        }
        graph.add_edge("a", "b", 1, 10);
        graph.add_edge("b", "c", 1, 10);
        let metrics = compute_graph_metrics(&graph);
        let closeness = &metrics.closeness_centrality;
        assert!(closeness["b"] > closeness["a"]);
        assert!(closeness["b"] > closeness["c"]);
        assert_eq!(closeness["a"], closeness["c"]);
    }

    #[test]
    fn isolated_node_has_zero_closeness() {
        let mut graph = WorldGraph::empty(0);
        graph.nodes.insert("lonely".to_string(), node("lonely", 0, 0, 1));
        let metrics = compute_graph_metrics(&graph);
        assert_eq!(metrics.closeness_centrality["lonely"], 0.0);
    }

    #[test]
    fn chain_report_computes_profit_and_roi() {
        let report = chain_report("c1", Decimal::new(100, 0), Decimal::new(60, 0), vec![Decimal::new(60, 0)]);
        assert_eq!(report.profit, Decimal::new(40, 0));
        assert!((report.roi - (40.0 / 60.0)).abs() < 1e-9);
    }
}
