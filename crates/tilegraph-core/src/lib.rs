//! # tilegraph-core
//!
//! Spatial adjacency graph over geographic tiles, with a regression
//! goodness-of-fit score on every adjacent pair.
//!
//! ## Stages
//!
//! - `adjacency`: buffered tiles whose geometries overlap with positive area
//! - `scoring`: OLS R² of market value on built and land area, per edge
//! - `storage`: Parquet + JSON cache bundle, reused while the
//!   `fingerprint` of the inputs is unchanged
//! - `pool`: rayon worker pool that lends one read-only context to every task
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no network dependencies (pure Rust)
//! - Deterministic: results are keyed in `BTreeMap`/`BTreeSet` and do not
//!   depend on worker count
//! - Per-pair failures never abort a batch; they become documented defaults

// =============================================================================
// MODULES
// =============================================================================

pub mod adjacency;
pub mod config;
pub mod fingerprint;
pub mod formats;
pub mod graph;
pub mod parcels;
pub mod pipeline;
pub mod pool;
pub mod primitives;
pub mod regression;
pub mod scoring;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EdgeKey, EdgeScore, ScoreFields, ScoredEdge, TileGraphError, TileId};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use adjacency::{AdjacencyEngine, GeometryError, candidate_pairs, compute_adjacency};
pub use graph::AdjacencyGraph;
pub use pool::WorkerPool;
pub use regression::{RegressionError, ols_r2};
pub use scoring::{EdgeScoringEngine, ScoringContext, ScoringError, score_edges, score_table};

// =============================================================================
// RE-EXPORTS: Cache
// =============================================================================

pub use fingerprint::{CacheParams, FileIdentity, Fingerprint, TileSignature, fingerprint};
pub use storage::{CachePaths, CacheStore, CachedBundle, cache_paths, is_valid};

// =============================================================================
// RE-EXPORTS: Inputs and orchestration
// =============================================================================

pub use config::{CacheConfig, PipelineConfig};
pub use formats::{KeyColumns, TileLayer};
pub use parcels::{ParcelIndex, SlimParcels};
pub use pipeline::{Pipeline, PipelineOutput, SourcePaths, load_parcels};
