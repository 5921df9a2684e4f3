//! # Pipeline
//!
//! Orchestrates one run:
//!
//! ```text
//! fingerprint ─► cache load ─► valid? ──yes──► cached graph + scores
//!                                 │
//!                                 no
//!                                 ▼
//!         candidates ─► Adjacency Engine ─► load parcels ─► Edge Scoring Engine
//!                                                                   │
//!                                                                   ▼
//!                                                               cache save
//! ```
//!
//! Cache I/O and fingerprinting run on the calling thread. Only the two
//! engine batches use the worker pool, and the caller blocks on each.

use crate::adjacency::AdjacencyEngine;
use crate::config::PipelineConfig;
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::formats::{TileLayer, read_record_batch};
use crate::parcels::{SlimParcels, parcel_index_by_tile};
use crate::scoring::{EdgeScoringEngine, ScoringContext, score_table};
use crate::{AdjacencyGraph, EdgeKey, EdgeScore, TileGraphError, TileId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// The two source files a run reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub parcels: PathBuf,
    pub tiles: PathBuf,
}

impl SourcePaths {
    #[must_use]
    pub fn new(parcels: impl Into<PathBuf>, tiles: impl Into<PathBuf>) -> Self {
        Self {
            parcels: parcels.into(),
            tiles: tiles.into(),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub fingerprint: Fingerprint,
    pub adjacency: AdjacencyGraph,
    pub edge_scores: BTreeMap<EdgeKey, EdgeScore>,
    /// True when the results came from the cache and neither engine ran.
    pub cache_hit: bool,
}

impl PipelineOutput {
    /// Mean R² over scored edges, `None` when there are none.
    #[must_use]
    pub fn mean_r2(&self) -> Option<f64> {
        if self.edge_scores.is_empty() {
            return None;
        }
        let total: f64 = self.edge_scores.values().map(|s| s.r2).sum();
        Some(total / self.edge_scores.len() as f64)
    }
}

/// Read a parcel Parquet file into a scoring context, assigning rows to
/// tiles by `tile_field`.
pub fn load_parcels(path: &Path, tile_field: &str) -> Result<ScoringContext, TileGraphError> {
    let batch = read_record_batch(path)?;
    let parcels = SlimParcels::from_batch(&batch)?;
    let index = parcel_index_by_tile(&batch, tile_field)?;
    tracing::debug!(
        parcels = parcels.len(),
        tiles = index.len(),
        "parcels loaded"
    );
    Ok(ScoringContext::new(parcels, index))
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Adjacency and scoring pipeline with an optional result cache.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline. Fails if the configuration is unusable.
    pub fn new(config: PipelineConfig) -> Result<Self, TileGraphError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fingerprint of a run over `sources` and `tiles`.
    #[must_use]
    pub fn fingerprint(&self, sources: &SourcePaths, tiles: &TileLayer) -> Fingerprint {
        fingerprint(
            &sources.parcels,
            &sources.tiles,
            self.config.cache_params(),
            tiles,
        )
    }

    /// Run the pipeline.
    ///
    /// `load_parcels` is only called on a cache miss.
    pub fn run<F>(
        &self,
        sources: &SourcePaths,
        tiles: &TileLayer,
        load_parcels: F,
    ) -> Result<PipelineOutput, TileGraphError>
    where
        F: FnOnce() -> Result<ScoringContext, TileGraphError>,
    {
        let current = self.fingerprint(sources, tiles);
        let store = self.config.cache.store();

        if self.config.cache.enabled {
            if let Some((adjacency, edge_scores)) = store.load().reusable_for(&current) {
                tracing::info!(
                    tiles = adjacency.tile_count(),
                    edges = adjacency.edge_count(),
                    "cache hit; adjacency and scoring skipped"
                );
                return Ok(PipelineOutput {
                    fingerprint: current,
                    adjacency,
                    edge_scores,
                    cache_hit: true,
                });
            }
            tracing::info!("cache miss; recomputing");
        }

        let adjacency = self.compute_adjacency(tiles)?;
        let edge_scores = self.compute_scores(&adjacency, load_parcels()?)?;

        if self.config.cache.enabled {
            store.save(&adjacency, &edge_scores, &current)?;
        }

        Ok(PipelineOutput {
            fingerprint: current,
            adjacency,
            edge_scores,
            cache_hit: false,
        })
    }

    fn compute_adjacency(&self, tiles: &TileLayer) -> Result<AdjacencyGraph, TileGraphError> {
        let started = Instant::now();
        let (ids, geometries) = tiles.tiles()?;
        let engine = AdjacencyEngine::new(geometries, self.config.worker_count())?;
        let candidates = engine.candidates();
        let adjacent = engine.compute(&candidates);
        let graph = AdjacencyGraph::from_index_pairs(&ids, &adjacent);
        tracing::info!(
            tiles = ids.len(),
            candidates = candidates.len(),
            edges = graph.edge_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "adjacency computed"
        );
        Ok(graph)
    }

    fn compute_scores(
        &self,
        adjacency: &AdjacencyGraph,
        context: ScoringContext,
    ) -> Result<BTreeMap<EdgeKey, EdgeScore>, TileGraphError> {
        let started = Instant::now();
        let pairs: Vec<(TileId, TileId)> = adjacency
            .edges()
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect();
        let engine = EdgeScoringEngine::new(context, self.config.worker_count())?;
        let table = score_table(engine.score(&pairs));
        tracing::info!(
            edges = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "edges scored"
        );
        Ok(table)
    }
}

// =============================================================================
// TESTS
// =============================================================================
