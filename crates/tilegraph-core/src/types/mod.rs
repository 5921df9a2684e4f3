//! # Core Type Definitions
//!
//! This module contains the shared types of the tile graph:
//! - Tile and edge identifiers (`TileId`, `EdgeKey`)
//! - Edge statistics (`EdgeScore`, `ScoreFields`, `ScoredEdge`)
//! - Error types (`TileGraphError`)
//!
//! ## Determinism Guarantees
//!
//! Identifiers implement `Ord` so every keyed result lives in a
//! `BTreeMap`/`BTreeSet` and iterates in the same order on every run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// TILE IDENTIFIER
// =============================================================================

/// Identifier of a tile, unique within a run.
/// Used as the vertex key of the adjacency graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub String);

impl TileId {
    /// Create a new tile identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for TileId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// EDGE KEY
// =============================================================================

/// Unordered pair of two distinct tiles.
///
/// The endpoints are stored sorted, so `EdgeKey::new(a, b)` and
/// `EdgeKey::new(b, a)` are the same key and serialize the same way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    low: TileId,
    high: TileId,
}

impl EdgeKey {
    /// Build the key for `a`-`b`. Returns `None` for a self pair.
    #[must_use]
    pub fn new(a: TileId, b: TileId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The lexicographically smaller endpoint.
    #[must_use]
    pub fn low(&self) -> &TileId {
        &self.low
    }

    /// The lexicographically larger endpoint.
    #[must_use]
    pub fn high(&self) -> &TileId {
        &self.high
    }

    /// Check whether `tile` is one of the endpoints.
    #[must_use]
    pub fn contains(&self, tile: &TileId) -> bool {
        &self.low == tile || &self.high == tile
    }

    /// Consume the key, returning `(low, high)`.
    #[must_use]
    pub fn into_pair(self) -> (TileId, TileId) {
        (self.low, self.high)
    }
}

// =============================================================================
// EDGE SCORE
// =============================================================================

/// Regression goodness of fit for one adjacent tile pair.
///
/// Defaults to `(0.0, 0, 0)`, the zero-confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EdgeScore {
    /// Coefficient of determination, within `[-1.0, 1.0]`.
    pub r2: f64,
    /// Parcels considered (complete rows when a fit was made).
    pub n_obs: u64,
    /// Parcels with a sale price.
    pub n_sales: u64,
}

impl EdgeScore {
    /// Create a new score.
    #[must_use]
    pub const fn new(r2: f64, n_obs: u64, n_sales: u64) -> Self {
        Self { r2, n_obs, n_sales }
    }

    /// The zero-confidence score.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0, 0)
    }
}

/// Loosely-typed score fields, as found in older cache rows or JSON mappings.
///
/// Every field is optional. Converting into [`EdgeScore`] substitutes
/// `0.0` / `0` / `0` for absent values and clamps negative counts to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreFields {
    #[serde(default)]
    pub r2: Option<f64>,
    #[serde(default)]
    pub n_obs: Option<i64>,
    #[serde(default)]
    pub n_sales: Option<i64>,
}

impl From<ScoreFields> for EdgeScore {
    fn from(fields: ScoreFields) -> Self {
        let count = |v: Option<i64>| v.and_then(|n| u64::try_from(n).ok()).unwrap_or(0);
        Self {
            r2: fields.r2.unwrap_or(0.0),
            n_obs: count(fields.n_obs),
            n_sales: count(fields.n_sales),
        }
    }
}

impl From<EdgeScore> for ScoreFields {
    fn from(score: EdgeScore) -> Self {
        Self {
            r2: Some(score.r2),
            n_obs: i64::try_from(score.n_obs).ok(),
            n_sales: i64::try_from(score.n_sales).ok(),
        }
    }
}

impl TryFrom<&serde_json::Value> for EdgeScore {
    type Error = TileGraphError;

    /// Accept a `{"r2": .., "n_obs": .., "n_sales": ..}` mapping.
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let fields = ScoreFields::deserialize(value)
            .map_err(|e| TileGraphError::InvalidInput(format!("edge score mapping: {e}")))?;
        Ok(fields.into())
    }
}

/// One scored edge as produced by a scoring worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEdge {
    pub tile_a: TileId,
    pub tile_b: TileId,
    pub score: EdgeScore,
}

impl ScoredEdge {
    /// The zero-confidence result for a pair.
    #[must_use]
    pub fn zero(tile_a: TileId, tile_b: TileId) -> Self {
        Self {
            tile_a,
            tile_b,
            score: EdgeScore::zero(),
        }
    }

    /// The canonical key of this edge, `None` for a self pair.
    #[must_use]
    pub fn key(&self) -> Option<EdgeKey> {
        EdgeKey::new(self.tile_a.clone(), self.tile_b.clone())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can surface from the tile graph.
///
/// Per-pair failures inside the engines never reach this type; they are
/// replaced by defaults at the worker boundary.
#[derive(Debug, Error)]
pub enum TileGraphError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An Arrow array or record batch error occurred.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A Parquet read or write error occurred.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The worker pool could not be started.
    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Input data has the wrong shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required column is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Configuration could not be used.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_order_independent() {
        let ab = EdgeKey::new(TileId::from("a"), TileId::from("b")).expect("distinct");
        let ba = EdgeKey::new(TileId::from("b"), TileId::from("a")).expect("distinct");
        assert_eq!(ab, ba);
        assert_eq!(ab.low().as_str(), "a");
        assert_eq!(ab.high().as_str(), "b");
    }

    #[test]
    fn edge_key_rejects_self_pair() {
        assert!(EdgeKey::new(TileId::from("x"), TileId::from("x")).is_none());
    }

    #[test]
    fn score_fields_apply_defaults() {
        let score: EdgeScore = ScoreFields {
            r2: None,
            n_obs: Some(-4),
            n_sales: Some(7),
        }
        .into();
        assert_eq!(score, EdgeScore::new(0.0, 0, 7));
    }

    #[test]
    fn score_from_json_mapping() {
        let value = serde_json::json!({ "r2": 0.5, "n_sales": 3 });
        let score = EdgeScore::try_from(&value).expect("mapping");
        assert_eq!(score, EdgeScore::new(0.5, 0, 3));

        let bad = serde_json::json!({ "r2": "high" });
        assert!(EdgeScore::try_from(&bad).is_err());
    }

    #[test]
    fn scored_edge_key_canonical() {
        let edge = ScoredEdge::zero(TileId::from("z"), TileId::from("m"));
        let key = edge.key().expect("distinct");
        assert_eq!(key.into_pair(), (TileId::from("m"), TileId::from("z")));
    }
}
