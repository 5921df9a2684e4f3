//! # Adjacency Graph
//!
//! Undirected tile adjacency, stored as `TileId -> {TileId}`.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering.
//! Every insertion writes both directions, so the relation is symmetric by
//! construction, and self-loops are refused.

use crate::{EdgeKey, TileId};
use std::collections::{BTreeMap, BTreeSet};

/// Symmetric adjacency relation over tiles.
///
/// Only tiles with at least one neighbor are present as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyGraph {
    neighbors: BTreeMap<TileId, BTreeSet<TileId>>,
}

impl AdjacencyGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from index pairs into an ordered tile list.
    ///
    /// Pairs referring to an index outside `tiles` are ignored.
    #[must_use]
    pub fn from_index_pairs<'a, I>(tiles: &[TileId], pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a (usize, usize)>,
    {
        let mut graph = Self::new();
        for &(i, j) in pairs {
            if let (Some(a), Some(b)) = (tiles.get(i), tiles.get(j)) {
                graph.insert_edge(a.clone(), b.clone());
            }
        }
        graph
    }

    /// Insert the undirected edge `a`-`b`.
    ///
    /// Returns `false` for a self pair or an edge that was already present.
    pub fn insert_edge(&mut self, a: TileId, b: TileId) -> bool {
        if a == b {
            return false;
        }
        let added = self.neighbors.entry(a.clone()).or_default().insert(b.clone());
        self.neighbors.entry(b).or_default().insert(a);
        added
    }

    /// Neighbors of `tile` in deterministic order (empty if unknown).
    pub fn neighbors(&self, tile: &TileId) -> impl Iterator<Item = &TileId> {
        self.neighbors.get(tile).into_iter().flatten()
    }

    /// Check whether `a` and `b` are adjacent.
    #[must_use]
    pub fn contains_edge(&self, a: &TileId, b: &TileId) -> bool {
        self.neighbors.get(a).is_some_and(|set| set.contains(b))
    }

    /// Tiles with at least one neighbor, in order.
    pub fn tiles(&self) -> impl Iterator<Item = &TileId> {
        self.neighbors.keys()
    }

    /// Every undirected edge exactly once, as `(low, high)` in lexicographic order.
    pub fn edges(&self) -> impl Iterator<Item = (&TileId, &TileId)> + '_ {
        self.neighbors.iter().flat_map(|(a, set)| {
            set.iter()
                .filter(move |b| a < *b)
                .map(move |b| (a, b))
        })
    }

    /// Every undirected edge as an [`EdgeKey`].
    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges()
            .filter_map(|(a, b)| EdgeKey::new(a.clone(), b.clone()))
    }

    /// Number of tiles with at least one neighbor.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.neighbors.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// True when there are no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Borrow the underlying mapping.
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<TileId, BTreeSet<TileId>> {
        &self.neighbors
    }
}

impl<'a> FromIterator<(&'a TileId, &'a TileId)> for AdjacencyGraph {
    fn from_iter<T: IntoIterator<Item = (&'a TileId, &'a TileId)>>(iter: T) -> Self {
        let mut graph = Self::new();
        for (a, b) in iter {
            graph.insert_edge(a.clone(), b.clone());
        }
        graph
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TileId {
        TileId::from(s)
    }

    #[test]
    fn insert_is_symmetric() {
        let mut graph = AdjacencyGraph::new();
        assert!(graph.insert_edge(t("a"), t("b")));
        assert!(graph.contains_edge(&t("a"), &t("b")));
        assert!(graph.contains_edge(&t("b"), &t("a")));
    }

    #[test]
    fn self_loop_refused() {
        let mut graph = AdjacencyGraph::new();
        assert!(!graph.insert_edge(t("a"), t("a")));
        assert!(graph.is_empty());
    }

    #[test]
    fn duplicate_edge_counted_once() {
        let mut graph = AdjacencyGraph::new();
        graph.insert_edge(t("a"), t("b"));
        assert!(!graph.insert_edge(t("b"), t("a")));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edges_are_canonical_and_unique() {
        let mut graph = AdjacencyGraph::new();
        graph.insert_edge(t("c"), t("a"));
        graph.insert_edge(t("b"), t("a"));
        graph.insert_edge(t("c"), t("b"));

        let edges: Vec<_> = graph
            .edges()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        assert_eq!(edges, vec![("a", "b"), ("a", "c"), ("b", "c")]);
    }

    #[test]
    fn from_index_pairs_ignores_out_of_range() {
        let tiles = vec![t("x"), t("y")];
        let graph = AdjacencyGraph::from_index_pairs(&tiles, &[(0, 1), (1, 5)]);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge(&t("y"), &t("x")));
    }

    #[test]
    fn unknown_tile_has_no_neighbors() {
        let graph = AdjacencyGraph::new();
        assert_eq!(graph.neighbors(&t("nowhere")).count(), 0);
    }
}
