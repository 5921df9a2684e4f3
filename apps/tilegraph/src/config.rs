//! # Application Configuration
//!
//! `tilegraph.toml` names the input files and carries the pipeline
//! parameters. Every key is optional:
//!
//! ```toml
//! [inputs]
//! tiles = "tiles.geojson"
//! parcels = "parcels.parquet"
//! parcel_tile_field = "tile_key"
//!
//! [pipeline]
//! buffer_feet = 50.0
//! k_neighbors = 8
//! workers = 0
//!
//! [pipeline.cache]
//! enabled = true
//! dir = ".cache"
//! prefix = "init"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tilegraph_core::primitives::TILE_KEY_FIELD;
use tilegraph_core::{PipelineConfig, SourcePaths, TileGraphError};

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tilegraph.toml";

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    /// GeoJSON FeatureCollection of buffered tiles.
    pub tiles: PathBuf,
    /// Parquet parcel table.
    pub parcels: PathBuf,
    /// Parcel column naming the tile each parcel belongs to.
    pub parcel_tile_field: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            tiles: PathBuf::from("tiles.geojson"),
            parcels: PathBuf::from("parcels.parquet"),
            parcel_tile_field: TILE_KEY_FIELD.to_string(),
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inputs: InputsConfig,
    pub pipeline: PipelineConfig,
}

/// Values given on the command line, applied over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub tiles: Option<PathBuf>,
    pub parcels: Option<PathBuf>,
    pub workers: Option<usize>,
    pub no_cache: bool,
}

impl AppConfig {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, TileGraphError> {
        toml::from_str(text).map_err(|e| TileGraphError::Config(e.to_string()))
    }

    /// Render as TOML text.
    pub fn to_toml_string(&self) -> Result<String, TileGraphError> {
        toml::to_string_pretty(self).map_err(|e| TileGraphError::Config(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, TileGraphError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Read `path` if given (it must exist), otherwise `tilegraph.toml` if
    /// present, otherwise the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, TileGraphError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    tracing::debug!("no {} found; using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Write to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), TileGraphError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Apply command-line values.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(tiles) = overrides.tiles {
            self.inputs.tiles = tiles;
        }
        if let Some(parcels) = overrides.parcels {
            self.inputs.parcels = parcels;
        }
        if overrides.workers.is_some() {
            self.pipeline.workers = overrides.workers;
        }
        if overrides.no_cache {
            self.pipeline.cache.enabled = false;
        }
    }

    /// The two source paths the pipeline fingerprints.
    #[must_use]
    pub fn sources(&self) -> SourcePaths {
        SourcePaths::new(self.inputs.parcels.clone(), self.inputs.tiles.clone())
    }
}
