//! Per-source mining and spawn-distance analysis, cached and invalidated
//! wholesale on graph rebuild (spec.md §4.C).

use std::collections::BTreeMap;

use crate::constants::SOURCE_REGEN_PER_TICK;

/// Static facts about a single energy source, recomputed once per graph
/// rebuild (spec.md §4.C).
#[derive(Clone, Debug, PartialEq)]
pub struct SourceAnalysis {
    pub source_id: String,
    pub mining_spots: u32,
    pub distance_to_spawn: Option<u32>,
    pub flow_rate: f64,
}

impl SourceAnalysis {
    pub fn new(source_id: impl Into<String>, mining_spots: u32, distance_to_spawn: Option<u32>) -> Self {
        SourceAnalysis {
            source_id: source_id.into(),
            mining_spots,
            distance_to_spawn,
            flow_rate: SOURCE_REGEN_PER_TICK,
        }
    }
}

/// Count of a source's walkable 8-neighbours, given a terrain predicate
/// (spec.md §4.C "mining spots").
pub fn count_mining_spots(neighbours: &[(i32, i32)], is_walkable: impl Fn(i32, i32) -> bool) -> u32 {
    neighbours.iter().filter(|(x, y)| is_walkable(*x, *y)).count() as u32
}

/// Caches [`SourceAnalysis`] by source id, rebuilt wholesale whenever the
/// world graph is rebuilt (spec.md §4.C "invalidated on graph rebuild").
#[derive(Clone, Debug, Default)]
pub struct SourceAnalysisCache {
    entries: BTreeMap<String, SourceAnalysis>,
    generation: u64,
}

impl SourceAnalysisCache {
    pub fn new() -> Self {
        SourceAnalysisCache::default()
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceAnalysis> {
        self.entries.get(source_id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace every entry and bump the generation counter; there is no
    /// partial invalidation.
    pub fn rebuild(&mut self, analyses: impl IntoIterator<Item = SourceAnalysis>) {
        self.entries = analyses.into_iter().map(|a| (a.source_id.clone(), a)).collect();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mining_spots_counts_only_walkable_neighbours() {
        let neighbours: Vec<(i32, i32)> = vec![(0, 0), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1)];
        let walls = [(1, 0), (1, 1)];
        let spots = count_mining_spots(&neighbours, |x, y| !walls.contains(&(x, y)));
        assert_eq!(spots, 6);
    }

    #[test]
    fn rebuild_replaces_entries_and_bumps_generation() {
        let mut cache = SourceAnalysisCache::new();
        cache.rebuild(vec![SourceAnalysis::new("s1", 5, Some(20))]);
        assert_eq!(cache.generation(), 1);
        assert!(cache.get("s1").is_some());
        cache.rebuild(vec![SourceAnalysis::new("s2", 3, None)]);
        assert_eq!(cache.generation(), 2);
        assert!(cache.get("s1").is_none());
        assert!(cache.get("s2").is_some());
    }
}
