//! # Primitives
//!
//! Compiled-in constants for the tile graph: the algorithm version tag,
//! statistical thresholds, and the column and file names shared with
//! upstream producers and cache readers.

/// Algorithm version tag recorded in every fingerprint.
///
/// Bump whenever the adjacency test or the scoring logic changes. A cached
/// bundle written under a different tag is never reused.
pub const ALGO_VERSION: &str = "2025-11-14a";

/// Minimum number of sales (and complete rows) before a regression is fitted.
pub const MIN_SALES_FOR_REGRESSION: usize = 3;

/// Relative tolerance below which a design column is treated as linearly
/// dependent on the previous ones.
pub const RANK_TOLERANCE: f64 = 1e-10;

// =============================================================================
// COLUMN NAMES
// =============================================================================

/// Primary tile identifier field.
pub const TILE_KEY_FIELD: &str = "tile_key";

/// Fallback tile identifier field.
pub const TILE_KEY_FALLBACK_FIELD: &str = "key";

/// Nullable sale price of a parcel.
pub const SALE_PRICE_FIELD: &str = "adj_sale_price";

/// Regression target.
pub const MARKET_VALUE_FIELD: &str = "market_value_proxy";

/// First regression predictor.
pub const BUILT_AREA_FIELD: &str = "built_area_sqft";

/// Second regression predictor.
pub const LAND_AREA_FIELD: &str = "land_area_sqft";

/// Assessed value, used to derive the market value proxy when absent.
pub const ASSESSED_VALUE_FIELD: &str = "assessed_value";

/// Edge list / score table endpoint columns.
pub const TILE_A_FIELD: &str = "tile_a";
pub const TILE_B_FIELD: &str = "tile_b";

/// Score table value columns.
pub const R2_FIELD: &str = "r2";
pub const N_OBS_FIELD: &str = "n_obs";
pub const N_SALES_FIELD: &str = "n_sales";

// =============================================================================
// CACHE FILES
// =============================================================================

/// Default cache directory.
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Default cache file prefix.
pub const DEFAULT_CACHE_PREFIX: &str = "init";

/// `{prefix}_meta.json`
pub const META_SUFFIX: &str = "_meta.json";

/// `{prefix}_adj.parquet`
pub const ADJACENCY_SUFFIX: &str = "_adj.parquet";

/// `{prefix}_scores.parquet`
pub const SCORES_SUFFIX: &str = "_scores.parquet";
