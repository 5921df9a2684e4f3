//! # Edge Scoring Engine
//!
//! Scores each adjacent tile pair by how well one linear model explains the
//! market value of the parcels in both tiles:
//!
//! ```text
//! market_value_proxy ~ 1 + built_area_sqft + land_area_sqft
//! ```
//!
//! A pair with fewer than three sales, a missing regression column, or
//! fewer than three complete rows gets `r2 = 0.0` and no fit is attempted.
//! A pair whose scoring fails outright gets the zero score; it never aborts
//! the batch.

use crate::parcels::{ParcelIndex, SlimParcels};
use crate::pool::WorkerPool;
use crate::primitives::MIN_SALES_FOR_REGRESSION;
use crate::regression::ols_r2;
use crate::{EdgeKey, EdgeScore, ScoredEdge, TileGraphError, TileId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Why a pair could not be scored at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// The tile index points past the end of the parcel table.
    #[error("parcel row {row} out of range for {len} parcels")]
    RowOutOfRange { row: usize, len: usize },
}

/// Read-only payload shared with scoring workers.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    pub parcels: SlimParcels,
    pub index: ParcelIndex,
}

impl ScoringContext {
    #[must_use]
    pub fn new(parcels: SlimParcels, index: ParcelIndex) -> Self {
        Self { parcels, index }
    }

    fn rows_of(&self, a: &TileId, b: &TileId) -> BTreeSet<usize> {
        let empty = BTreeSet::new();
        let rows_a = self.index.get(a).unwrap_or(&empty);
        let rows_b = self.index.get(b).unwrap_or(&empty);
        rows_a | rows_b
    }
}

/// Score one pair.
pub fn score_pair(
    context: &ScoringContext,
    a: &TileId,
    b: &TileId,
) -> Result<EdgeScore, ScoringError> {
    let rows = context.rows_of(a, b);
    if rows.is_empty() {
        return Ok(EdgeScore::zero());
    }
    let len = context.parcels.len();
    if let Some(&row) = rows.iter().next_back().filter(|&&row| row >= len) {
        return Err(ScoringError::RowOutOfRange { row, len });
    }

    let gathered = rows.len() as u64;
    let n_sales = context
        .parcels
        .sale_price()
        .map(|sales| rows.iter().filter(|&&r| sales[r].is_some()).count())
        .unwrap_or(0);
    let low_confidence = EdgeScore::new(0.0, gathered, n_sales as u64);
    if n_sales < MIN_SALES_FOR_REGRESSION {
        return Ok(low_confidence);
    }

    let Some((value, built, land)) = context.parcels.regression_columns() else {
        return Ok(low_confidence);
    };

    let mut y = Vec::with_capacity(rows.len());
    let mut x1 = Vec::with_capacity(rows.len());
    let mut x2 = Vec::with_capacity(rows.len());
    for &r in &rows {
        if let (Some(v), Some(b), Some(l)) = (value[r], built[r], land[r]) {
            y.push(v);
            x1.push(b);
            x2.push(l);
        }
    }
    if y.len() < MIN_SALES_FOR_REGRESSION {
        return Ok(low_confidence);
    }

    let r2 = ols_r2(&y, &x1, &x2).unwrap_or_else(|e| {
        tracing::trace!(tile_a = %a, tile_b = %b, error = %e, "regression failed; r2 = 0");
        0.0
    });
    Ok(EdgeScore::new(r2, y.len() as u64, n_sales as u64))
}

fn score_worker(context: &ScoringContext, (a, b): &(TileId, TileId)) -> ScoredEdge {
    match score_pair(context, a, b) {
        Ok(score) => ScoredEdge {
            tile_a: a.clone(),
            tile_b: b.clone(),
            score,
        },
        Err(e) => {
            tracing::debug!(tile_a = %a, tile_b = %b, error = %e, "pair scoring failed; zero score");
            ScoredEdge::zero(a.clone(), b.clone())
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Pair scorer bound to a worker pool holding the parcel table and index.
#[derive(Debug)]
pub struct EdgeScoringEngine {
    pool: WorkerPool<ScoringContext>,
}

impl EdgeScoringEngine {
    /// Install `context` in a pool of `workers` threads.
    pub fn new(context: ScoringContext, workers: Option<usize>) -> Result<Self, TileGraphError> {
        Ok(Self {
            pool: WorkerPool::new(context, workers)?,
        })
    }

    /// Score every pair. One result per input pair.
    #[must_use]
    pub fn score(&self, pairs: &[(TileId, TileId)]) -> Vec<ScoredEdge> {
        let scored = self.pool.map(pairs, score_worker);
        tracing::debug!(
            pairs = pairs.len(),
            workers = self.pool.workers(),
            "scoring batch complete"
        );
        scored
    }
}

/// One-shot scoring of `pairs`.
pub fn score_edges(
    pairs: &[(TileId, TileId)],
    context: ScoringContext,
    workers: Option<usize>,
) -> Result<Vec<ScoredEdge>, TileGraphError> {
    Ok(EdgeScoringEngine::new(context, workers)?.score(pairs))
}

/// Key scored edges by their canonical pair. Self pairs are dropped.
#[must_use]
pub fn score_table<I>(scored: I) -> BTreeMap<EdgeKey, EdgeScore>
where
    I: IntoIterator<Item = ScoredEdge>,
{
    scored
        .into_iter()
        .filter_map(|edge| Some((edge.key()?, edge.score)))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn t(s: &str) -> TileId {
        TileId::from(s)
    }

    fn context(
        sales: Vec<Option<f64>>,
        value: Vec<Option<f64>>,
        built: Vec<Option<f64>>,
        land: Option<Vec<Option<f64>>>,
        index: &[(&str, &[usize])],
    ) -> ScoringContext {
        let parcels =
            SlimParcels::from_columns(sales.len(), Some(sales), Some(value), Some(built), land)
                .expect("parcels");
        let index = index
            .iter()
            .map(|(tile, rows)| (t(tile), rows.iter().copied().collect()))
            .collect();
        ScoringContext::new(parcels, index)
    }

    #[test]
    fn empty_union_scores_zero() {
        let ctx = ScoringContext::default();
        let score = score_pair(&ctx, &t("a"), &t("b")).expect("score");
        assert_eq!(score, EdgeScore::zero());
    }

    #[test]
    fn too_few_sales_skips_regression() {
        let ctx = context(
            vec![Some(1.0), Some(2.0)],
            vec![Some(1.0), Some(2.0)],
            vec![Some(1.0), Some(2.0)],
            Some(vec![Some(1.0), Some(3.0)]),
            &[("a", &[0]), ("b", &[1])],
        );
        let score = score_pair(&ctx, &t("a"), &t("b")).expect("score");
        assert_eq!(score, EdgeScore::new(0.0, 2, 2));
    }

    #[test]
    fn missing_column_is_low_confidence() {
        let ctx = context(
            vec![Some(1.0); 4],
            vec![Some(1.0), Some(2.0), Some(3.0), Some(5.0)],
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            None,
            &[("a", &[0, 1]), ("b", &[2, 3])],
        );
        let score = score_pair(&ctx, &t("a"), &t("b")).expect("score");
        assert_eq!(score, EdgeScore::new(0.0, 4, 4));
    }

    #[test]
    fn incomplete_rows_dropped_before_fit() {
        let ctx = context(
            vec![Some(1.0); 4],
            vec![Some(1.0), None, Some(3.0), Some(5.0)],
            vec![Some(1.0), Some(2.0), None, Some(4.0)],
            Some(vec![Some(1.0); 4]),
            &[("a", &[0, 1]), ("b", &[2, 3])],
        );
        let score = score_pair(&ctx, &t("a"), &t("b")).expect("score");
        assert_eq!(score, EdgeScore::new(0.0, 4, 4));
    }

    #[test]
    fn perfect_fit_counts_complete_rows() {
        let built = [1.0, 2.0, 3.0, 5.0, 8.0];
        let land = [2.0, 1.0, 4.0, 3.0, 1.0];
        let value: Vec<Option<f64>> = built
            .iter()
            .zip(&land)
            .map(|(b, l)| Some(100.0 + 2.0 * b + 5.0 * l))
            .collect();
        let mut sales = vec![Some(1.0); 5];
        sales[4] = None;
        let mut land: Vec<Option<f64>> = land.iter().copied().map(Some).collect();
        land[4] = None;

        let ctx = context(
            sales,
            value,
            built.iter().copied().map(Some).collect(),
            Some(land),
            &[("a", &[0, 1, 2]), ("b", &[2, 3, 4])],
        );
        let score = score_pair(&ctx, &t("a"), &t("b")).expect("score");
        assert_eq!(score.n_sales, 4);
        assert_eq!(score.n_obs, 4);
        assert_abs_diff_eq!(score.r2, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn out_of_range_row_is_error_then_zero() {
        let ctx = context(
            vec![Some(1.0)],
            vec![Some(1.0)],
            vec![Some(1.0)],
            Some(vec![Some(1.0)]),
            &[("a", &[0, 7])],
        );
        assert_eq!(
            score_pair(&ctx, &t("a"), &t("b")),
            Err(ScoringError::RowOutOfRange { row: 7, len: 1 })
        );

        let scored = score_edges(&[(t("a"), t("b"))], ctx, Some(1)).expect("engine");
        assert_eq!(scored, vec![ScoredEdge::zero(t("a"), t("b"))]);
    }

    #[test]
    fn score_table_is_keyed_canonically() {
        let table = score_table(vec![
            ScoredEdge {
                tile_a: t("b"),
                tile_b: t("a"),
                score: EdgeScore::new(0.5, 3, 3),
            },
            ScoredEdge::zero(t("c"), t("c")),
        ]);
        assert_eq!(table.len(), 1);
        let key = EdgeKey::new(t("a"), t("b")).expect("distinct");
        assert_eq!(table[&key], EdgeScore::new(0.5, 3, 3));
    }
}
