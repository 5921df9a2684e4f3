//! # Pipeline Configuration
//!
//! Every field has a default, so an empty table deserializes to a usable
//! configuration.

use crate::TileGraphError;
use crate::fingerprint::CacheParams;
use crate::primitives::{DEFAULT_CACHE_DIR, DEFAULT_CACHE_PREFIX};
use crate::storage::CacheStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default buffer distance, in feet.
pub const DEFAULT_BUFFER_FEET: f64 = 50.0;

/// Default neighbor count.
pub const DEFAULT_K_NEIGHBORS: u64 = 8;

// =============================================================================
// CACHE
// =============================================================================

/// Where and whether to cache results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
        }
    }
}

impl CacheConfig {
    /// Store handle for this location.
    #[must_use]
    pub fn store(&self) -> CacheStore {
        CacheStore::new(self.dir.clone(), self.prefix.clone())
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Distance the tiles were buffered by upstream.
    pub buffer_feet: f64,
    /// EPSG code of the projected CRS the tiles are in, if known.
    pub crs_epsg_feet: Option<i64>,
    pub k_neighbors: u64,
    /// Worker threads. `None` or `0` uses every available CPU.
    pub workers: Option<usize>,
    pub cache: CacheConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_feet: DEFAULT_BUFFER_FEET,
            crs_epsg_feet: None,
            k_neighbors: DEFAULT_K_NEIGHBORS,
            workers: None,
            cache: CacheConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// The parameters recorded in the fingerprint.
    #[must_use]
    pub fn cache_params(&self) -> CacheParams {
        CacheParams::new(self.buffer_feet, self.crs_epsg_feet, self.k_neighbors)
    }

    /// Worker count to hand to the pool; `0` is folded into `None`.
    #[must_use]
    pub fn worker_count(&self) -> Option<usize> {
        self.workers.filter(|&n| n > 0)
    }

    /// Reject values no run can use.
    pub fn validate(&self) -> Result<(), TileGraphError> {
        if !self.buffer_feet.is_finite() || self.buffer_feet < 0.0 {
            return Err(TileGraphError::Config(format!(
                "buffer_feet must be a non-negative number, got {}",
                self.buffer_feet
            )));
        }
        if self.cache.prefix.is_empty() {
            return Err(TileGraphError::Config("cache prefix must not be empty".into()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, PipelineConfig::default());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from(".cache"));
        assert_eq!(config.cache.prefix, "init");
    }

    #[test]
    fn partial_cache_table_keeps_other_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"buffer_feet": 25.0, "cache": {"prefix": "nyc"}}"#)
                .expect("parse");
        assert_eq!(config.cache_params(), CacheParams::new(25.0, None, 8));
        assert_eq!(config.cache.prefix, "nyc");
        assert!(config.cache.enabled);
    }

    #[test]
    fn zero_workers_means_all_cpus() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.worker_count(), None);
        config.workers = Some(0);
        assert_eq!(config.worker_count(), None);
        config.workers = Some(3);
        assert_eq!(config.worker_count(), Some(3));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        assert!(config.validate().is_ok());

        config.buffer_feet = f64::NAN;
        assert!(matches!(config.validate(), Err(TileGraphError::Config(_))));

        config.buffer_feet = 10.0;
        config.cache.prefix.clear();
        assert!(matches!(config.validate(), Err(TileGraphError::Config(_))));
    }

    #[test]
    fn store_uses_configured_location() {
        let config = CacheConfig {
            enabled: true,
            dir: PathBuf::from("/tmp/tg"),
            prefix: "run".into(),
        };
        let store = config.store();
        assert_eq!(store.dir(), PathBuf::from("/tmp/tg").as_path());
        assert_eq!(store.prefix(), "run");
    }
}
