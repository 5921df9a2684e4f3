//! # Adjacency Engine
//!
//! Two tiles are adjacent when their buffered geometries overlap with
//! strictly positive area. A shared boundary alone does not count.
//!
//! The exact test runs only on candidate pairs from a coarse spatial index
//! ([`candidate_pairs`]). Each pair is independent; a pair whose test fails
//! for any reason is treated as not adjacent and the batch carries on.

use crate::TileGraphError;
use crate::pool::WorkerPool;
use geo::{Area, BooleanOps, BoundingRect, CoordsIter, MultiPolygon};
use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a pair could not be tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The pair refers to a geometry index that does not exist.
    #[error("no geometry at index {0}")]
    MissingGeometry(usize),

    /// A geometry contains NaN or infinite coordinates.
    #[error("geometry {0} has non-finite coordinates")]
    NonFiniteCoordinate(usize),

    /// The boolean-operations engine aborted on this pair.
    #[error("intersection failed")]
    IntersectionFailed,

    /// The intersection area is NaN or infinite.
    #[error("intersection area is not finite")]
    NonFiniteArea,
}

fn finite(index: usize, geometry: &MultiPolygon<f64>) -> Result<(), GeometryError> {
    if geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
    {
        Ok(())
    } else {
        Err(GeometryError::NonFiniteCoordinate(index))
    }
}

/// Area of the intersection of geometries `i` and `j`.
pub fn overlap_area(
    geometries: &[MultiPolygon<f64>],
    (i, j): (usize, usize),
) -> Result<f64, GeometryError> {
    let a = geometries.get(i).ok_or(GeometryError::MissingGeometry(i))?;
    let b = geometries.get(j).ok_or(GeometryError::MissingGeometry(j))?;
    finite(i, a)?;
    finite(j, b)?;

    let intersection = std::panic::catch_unwind(|| a.intersection(b))
        .map_err(|_| GeometryError::IntersectionFailed)?;
    let area = intersection.unsigned_area();
    if area.is_finite() {
        Ok(area)
    } else {
        Err(GeometryError::NonFiniteArea)
    }
}

/// The normalized pair `(min, max)` if adjacent, `None` otherwise.
fn test_pair(geometries: &[MultiPolygon<f64>], &(i, j): &(usize, usize)) -> Option<(usize, usize)> {
    if i == j {
        return None;
    }
    match overlap_area(geometries, (i, j)) {
        Ok(area) if area > 0.0 => Some((i.min(j), i.max(j))),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(i, j, error = %e, "overlap test failed; pair not adjacent");
            None
        }
    }
}

/// Every pair `(i, j)`, `i < j`, whose bounding boxes intersect.
///
/// Geometries that are empty or have non-finite bounds are never candidates.
pub fn candidate_pairs(geometries: &[MultiPolygon<f64>]) -> Vec<(usize, usize)> {
    let boxes: Vec<GeomWithData<Rectangle<[f64; 2]>, usize>> = geometries
        .iter()
        .enumerate()
        .filter_map(|(i, geometry)| {
            let rect = geometry.bounding_rect()?;
            let (min, max) = (rect.min(), rect.max());
            [min.x, min.y, max.x, max.y]
                .iter()
                .all(|v| v.is_finite())
                .then(|| GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), i))
        })
        .collect();
    let tree = RTree::bulk_load(boxes);

    let mut pairs: Vec<(usize, usize)> = tree
        .intersection_candidates_with_other_tree(&tree)
        .filter(|(a, b)| a.data < b.data)
        .map(|(a, b)| (a.data, b.data))
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

// =============================================================================
// ENGINE
// =============================================================================

/// Overlap tester bound to a worker pool holding the buffered geometries.
#[derive(Debug)]
pub struct AdjacencyEngine {
    pool: WorkerPool<Vec<MultiPolygon<f64>>>,
}

impl AdjacencyEngine {
    /// Install `geometries` in a pool of `workers` threads.
    pub fn new(
        geometries: Vec<MultiPolygon<f64>>,
        workers: Option<usize>,
    ) -> Result<Self, TileGraphError> {
        Ok(Self {
            pool: WorkerPool::new(geometries, workers)?,
        })
    }

    /// Candidate pairs over the installed geometries.
    #[must_use]
    pub fn candidates(&self) -> Vec<(usize, usize)> {
        candidate_pairs(self.pool.context())
    }

    /// Adjacent pairs among `candidates`, each as `(min, max)`.
    ///
    /// The result does not depend on the worker count or on the order or
    /// orientation of the candidates.
    #[must_use]
    pub fn compute(&self, candidates: &[(usize, usize)]) -> BTreeSet<(usize, usize)> {
        let adjacent: BTreeSet<_> = self
            .pool
            .filter_map(candidates, |geometries, pair| test_pair(geometries, pair))
            .into_iter()
            .collect();
        tracing::debug!(
            candidates = candidates.len(),
            adjacent = adjacent.len(),
            workers = self.pool.workers(),
            "adjacency batch complete"
        );
        adjacent
    }
}

/// One-shot adjacency over `geometries` for the given candidate pairs.
pub fn compute_adjacency(
    geometries: Vec<MultiPolygon<f64>>,
    candidates: &[(usize, usize)],
    workers: Option<usize>,
) -> Result<BTreeSet<(usize, usize)>, TileGraphError> {
    Ok(AdjacencyEngine::new(geometries, workers)?.compute(candidates))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon(),
        ])
    }

    #[test]
    fn overlapping_squares_are_adjacent() {
        let geometries = vec![square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)];
        let area = overlap_area(&geometries, (0, 1)).expect("area");
        assert!((area - 1.0).abs() < 1e-9);

        let adjacent = compute_adjacency(geometries, &[(0, 1)], Some(1)).expect("engine");
        assert_eq!(adjacent, BTreeSet::from([(0, 1)]));
    }

    #[test]
    fn shared_boundary_is_not_adjacent() {
        let geometries = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)];
        let adjacent = compute_adjacency(geometries, &[(0, 1)], Some(2)).expect("engine");
        assert!(adjacent.is_empty());
    }

    #[test]
    fn reversed_candidate_is_normalized() {
        let geometries = vec![square(0.0, 0.0, 2.0), square(1.0, 0.0, 2.0)];
        let adjacent =
            compute_adjacency(geometries, &[(1, 0), (0, 1), (0, 0)], Some(2)).expect("engine");
        assert_eq!(adjacent, BTreeSet::from([(0, 1)]));
    }

    #[test]
    fn bad_geometry_is_excluded_not_fatal() {
        let mut broken = square(0.0, 0.0, 2.0);
        broken.0[0].exterior_mut(|ring| ring.0[1].x = f64::NAN);
        let geometries = vec![broken, square(1.0, 1.0, 2.0), square(1.5, 1.5, 2.0)];

        assert_eq!(
            overlap_area(&geometries, (0, 1)),
            Err(GeometryError::NonFiniteCoordinate(0))
        );
        assert_eq!(
            overlap_area(&geometries, (1, 9)),
            Err(GeometryError::MissingGeometry(9))
        );

        let adjacent =
            compute_adjacency(geometries, &[(0, 1), (1, 2), (1, 9)], Some(2)).expect("engine");
        assert_eq!(adjacent, BTreeSet::from([(1, 2)]));
    }

    #[test]
    fn candidates_from_bounding_boxes() {
        let geometries = vec![
            square(0.0, 0.0, 1.0),
            square(0.5, 0.5, 1.0),
            square(10.0, 10.0, 1.0),
            MultiPolygon::new(Vec::new()),
            square(1.0, 0.0, 1.0),
        ];
        let candidates = candidate_pairs(&geometries);
        assert_eq!(candidates, vec![(0, 1), (0, 4), (1, 4)]);
    }

    #[test]
    fn engine_candidates_match_free_function() {
        let geometries = vec![square(0.0, 0.0, 1.0), square(0.5, 0.0, 1.0)];
        let engine = AdjacencyEngine::new(geometries.clone(), Some(1)).expect("engine");
        assert_eq!(engine.candidates(), candidate_pairs(&geometries));
    }
}
