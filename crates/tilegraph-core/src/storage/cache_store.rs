//! # Cache Store
//!
//! A cache bundle is three files sharing a prefix:
//!
//! ```text
//! {prefix}_meta.json       fingerprint the bundle was computed under
//! {prefix}_adj.parquet     tile_a, tile_b          (one row per edge, tile_a < tile_b)
//! {prefix}_scores.parquet  tile_a, tile_b, r2, n_obs, n_sales
//! ```
//!
//! Loading never fails: a missing, unreadable or corrupt bundle comes back
//! as all `None` and the caller recomputes. Saving does fail loudly, since a
//! write error means the cache directory is unusable.
//!
//! The bundle is all-or-nothing. There is no partial invalidation; one
//! mismatching fingerprint field discards everything.

use crate::formats::{
    EdgeRow, ScoreRow, read_edge_rows, read_score_rows, write_edge_rows, write_score_rows,
};
use crate::primitives::{
    ADJACENCY_SUFFIX, DEFAULT_CACHE_DIR, DEFAULT_CACHE_PREFIX, META_SUFFIX, SCORES_SUFFIX,
};
use crate::{AdjacencyGraph, EdgeKey, EdgeScore, Fingerprint, ScoreFields, TileGraphError, TileId};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// PATHS
// =============================================================================

/// Locations of the three bundle files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub meta: PathBuf,
    pub adjacency: PathBuf,
    pub scores: PathBuf,
}

impl CachePaths {
    fn all(&self) -> [&Path; 3] {
        [&self.meta, &self.adjacency, &self.scores]
    }
}

/// Bundle paths for `prefix` in `cache_dir`, creating the directory if needed.
pub fn cache_paths(cache_dir: &Path, prefix: &str) -> Result<CachePaths, TileGraphError> {
    std::fs::create_dir_all(cache_dir)?;
    Ok(bundle_paths(cache_dir, prefix))
}

fn bundle_paths(cache_dir: &Path, prefix: &str) -> CachePaths {
    CachePaths {
        meta: cache_dir.join(format!("{prefix}{META_SUFFIX}")),
        adjacency: cache_dir.join(format!("{prefix}{ADJACENCY_SUFFIX}")),
        scores: cache_dir.join(format!("{prefix}{SCORES_SUFFIX}")),
    }
}

// =============================================================================
// BUNDLE
// =============================================================================

/// What a load found. Each part is `None` when its file is absent; all parts
/// are `None` when anything went wrong.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedBundle {
    pub fingerprint: Option<Fingerprint>,
    pub adjacency_rows: Option<Vec<EdgeRow>>,
    pub score_rows: Option<Vec<ScoreRow>>,
}

impl CachedBundle {
    /// The graph and scores if the bundle is complete and was computed
    /// under a fingerprint compatible with `current`.
    #[must_use]
    pub fn reusable_for(
        &self,
        current: &Fingerprint,
    ) -> Option<(AdjacencyGraph, BTreeMap<EdgeKey, EdgeScore>)> {
        let cached = self.fingerprint.as_ref()?;
        if !is_valid(cached, current) {
            return None;
        }
        let adjacency = rows_to_adjacency(Some(self.adjacency_rows.as_deref()?));
        let scores = rows_to_edge_scores(Some(self.score_rows.as_deref()?));
        Some((adjacency, scores))
    }
}

/// Whether a bundle computed under `cached` may be reused for `current`.
///
/// See [`Fingerprint::is_compatible_with`]: the source paths are ignored,
/// everything else must match exactly, and unknown values never match.
#[must_use]
pub fn is_valid(cached: &Fingerprint, current: &Fingerprint) -> bool {
    cached.is_compatible_with(current)
}

// =============================================================================
// ROW CONVERSION
// =============================================================================

/// One row per undirected edge, endpoints sorted.
#[must_use]
pub fn adjacency_to_rows(adjacency: &AdjacencyGraph) -> Vec<EdgeRow> {
    adjacency
        .edges()
        .map(|(a, b)| EdgeRow::new(a.as_str(), b.as_str()))
        .collect()
}

/// One row per scored edge, endpoints sorted, values coerced to `EdgeScore`.
#[must_use]
pub fn edge_scores_to_rows<S>(edge_scores: &BTreeMap<EdgeKey, S>) -> Vec<ScoreRow>
where
    S: Clone + Into<EdgeScore>,
{
    edge_scores
        .iter()
        .map(|(key, score)| {
            let score: EdgeScore = score.clone().into();
            ScoreRow {
                tile_a: key.low().as_str().to_string(),
                tile_b: key.high().as_str().to_string(),
                fields: ScoreFields::from(score),
            }
        })
        .collect()
}

/// Symmetric graph from edge rows. `None` or empty input gives an empty graph.
#[must_use]
pub fn rows_to_adjacency(rows: Option<&[EdgeRow]>) -> AdjacencyGraph {
    let mut graph = AdjacencyGraph::new();
    for row in rows.unwrap_or_default() {
        if row.tile_a.is_empty() || row.tile_b.is_empty() {
            continue;
        }
        graph.insert_edge(TileId::new(&row.tile_a), TileId::new(&row.tile_b));
    }
    graph
}

/// Score table from rows. Rows with an empty endpoint (or a self pair) are
/// skipped; absent values default to `0.0` / `0` / `0`.
#[must_use]
pub fn rows_to_edge_scores(rows: Option<&[ScoreRow]>) -> BTreeMap<EdgeKey, EdgeScore> {
    rows.unwrap_or_default()
        .iter()
        .filter(|row| !row.tile_a.is_empty() && !row.tile_b.is_empty())
        .filter_map(|row| {
            let key = EdgeKey::new(TileId::new(&row.tile_a), TileId::new(&row.tile_b))?;
            Some((key, EdgeScore::from(row.fields)))
        })
        .collect()
}

// =============================================================================
// STORE
// =============================================================================

/// A cache bundle location: directory plus file prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStore {
    dir: PathBuf,
    prefix: String,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR, DEFAULT_CACHE_PREFIX)
    }
}

impl CacheStore {
    /// Create a store handle. Nothing touches the disk until used.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bundle paths, creating the directory if needed.
    pub fn paths(&self) -> Result<CachePaths, TileGraphError> {
        cache_paths(&self.dir, &self.prefix)
    }

    // Read and delete paths never create the directory.
    fn locate(&self) -> CachePaths {
        bundle_paths(&self.dir, &self.prefix)
    }

    /// Persist a bundle.
    ///
    /// Data files are written before the fingerprint, so an interrupted save
    /// leaves either the previous fingerprint (which no longer matches the
    /// new data's inputs) or no fingerprint at all.
    pub fn save<S>(
        &self,
        adjacency: &AdjacencyGraph,
        edge_scores: &BTreeMap<EdgeKey, S>,
        fingerprint: &Fingerprint,
    ) -> Result<(), TileGraphError>
    where
        S: Clone + Into<EdgeScore>,
    {
        let paths = self.paths()?;
        if paths.meta.exists() {
            std::fs::remove_file(&paths.meta)?;
        }

        let edge_rows = adjacency_to_rows(adjacency);
        write_edge_rows(&paths.adjacency, &edge_rows)?;
        let score_rows = edge_scores_to_rows(edge_scores);
        write_score_rows(&paths.scores, &score_rows)?;

        let mut writer = BufWriter::new(File::create(&paths.meta)?);
        serde_json::to_writer_pretty(&mut writer, fingerprint)?;
        writer.flush()?;

        tracing::info!(
            dir = %self.dir.display(),
            prefix = %self.prefix,
            edges = edge_rows.len(),
            scores = score_rows.len(),
            "cache saved"
        );
        Ok(())
    }

    /// Load whatever bundle exists. Never fails; see [`CachedBundle`].
    #[must_use]
    pub fn load(&self) -> CachedBundle {
        match Self::try_load(&self.locate()) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(
                    dir = %self.dir.display(),
                    prefix = %self.prefix,
                    error = %e,
                    "cache unreadable; ignoring it"
                );
                CachedBundle::default()
            }
        }
    }

    fn try_load(paths: &CachePaths) -> Result<CachedBundle, TileGraphError> {
        let fingerprint = if paths.meta.exists() {
            let reader = BufReader::new(File::open(&paths.meta)?);
            Some(serde_json::from_reader(reader)?)
        } else {
            None
        };
        let adjacency_rows = if paths.adjacency.exists() {
            Some(read_edge_rows(&paths.adjacency)?)
        } else {
            None
        };
        let score_rows = if paths.scores.exists() {
            Some(read_score_rows(&paths.scores)?)
        } else {
            None
        };
        Ok(CachedBundle {
            fingerprint,
            adjacency_rows,
            score_rows,
        })
    }

    /// Delete the bundle files. Returns how many existed.
    pub fn clear(&self) -> Result<usize, TileGraphError> {
        let paths = self.locate();
        let mut removed = 0;
        for path in paths.all() {
            if path.exists() {
                std::fs::remove_file(path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
