//! # Fingerprint Service
//!
//! A [`Fingerprint`] identifies everything a cached bundle was computed from:
//! both source files, the parameter set, the filtered tile set and the
//! algorithm version.
//!
//! Capturing a fingerprint never fails. Anything that cannot be observed is
//! recorded as `null`, and a `null` field never matches, so the worst case is
//! a cache miss.

use crate::formats::KeyColumns;
use crate::primitives::{ALGO_VERSION, TILE_KEY_FALLBACK_FIELD, TILE_KEY_FIELD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::UNIX_EPOCH;

// =============================================================================
// FILE IDENTITY
// =============================================================================

/// Identity of a source file: resolved path, byte size and modification time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub path: String,
    pub size: Option<u64>,
    /// Seconds since the Unix epoch.
    pub mtime: Option<f64>,
}

impl FileIdentity {
    /// Stat `path`. On failure only the path is recorded.
    #[must_use]
    pub fn capture(path: &Path) -> Self {
        match Self::try_capture(path) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot stat source file");
                Self::unknown(path)
            }
        }
    }

    /// Identity with null size and modification time.
    #[must_use]
    pub fn unknown(path: &Path) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            size: None,
            mtime: None,
        }
    }

    fn try_capture(path: &Path) -> std::io::Result<Self> {
        let resolved = std::fs::canonicalize(path)?;
        let metadata = std::fs::metadata(&resolved)?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64());
        Ok(Self {
            path: resolved.to_string_lossy().into_owned(),
            size: Some(metadata.len()),
            mtime,
        })
    }

    /// Same size and same modification time, both known. The path is ignored,
    /// so a relocated but unchanged file still matches.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        matches!((self.size, other.size), (Some(a), Some(b)) if a == b)
            && matches!((self.mtime, other.mtime), (Some(a), Some(b)) if a == b)
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Parameters that change adjacency or scoring results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheParams {
    pub buffer_feet: f64,
    pub crs_epsg_feet: Option<i64>,
    pub k_neighbors: u64,
}

impl CacheParams {
    #[must_use]
    pub const fn new(buffer_feet: f64, crs_epsg_feet: Option<i64>, k_neighbors: u64) -> Self {
        Self {
            buffer_feet,
            crs_epsg_feet,
            k_neighbors,
        }
    }
}

// =============================================================================
// TILE SIGNATURE
// =============================================================================

/// Count and SHA-256 of the sorted tile identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSignature {
    pub n_tiles: Option<u64>,
    pub keys_hash: Option<String>,
}

impl TileSignature {
    /// Signature of a set of identifiers, independent of their order.
    #[must_use]
    pub fn from_keys(mut keys: Vec<String>) -> Self {
        keys.sort();
        let digest = Sha256::digest(keys.join("\n").as_bytes());
        Self {
            n_tiles: Some(keys.len() as u64),
            keys_hash: Some(format!("{:x}", digest)),
        }
    }

    /// Signature used when no identifier column exists.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            n_tiles: None,
            keys_hash: None,
        }
    }

    /// Both fields known.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.n_tiles.is_some() && self.keys_hash.is_some()
    }
}

/// Signature of the tile identifier column (`tile_key`, falling back to `key`).
pub fn tile_signature<T: KeyColumns + ?Sized>(tiles: &T) -> TileSignature {
    match tiles
        .string_column(TILE_KEY_FIELD)
        .or_else(|| tiles.string_column(TILE_KEY_FALLBACK_FIELD))
    {
        Some(keys) => TileSignature::from_keys(keys),
        None => {
            tracing::debug!("no tile identifier column; tile signature unavailable");
            TileSignature::unavailable()
        }
    }
}

// =============================================================================
// FINGERPRINT
// =============================================================================

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub parcels: FileIdentity,
    pub tiles: FileIdentity,
    pub params: CacheParams,
    pub tiles_sig: TileSignature,
    pub algo_version: String,
}

impl Fingerprint {
    /// Whether a bundle computed under `self` may be reused for `current`.
    ///
    /// Exact comparison of the algorithm version, parameters and tile
    /// signature, plus size and modification time of both files. Unknown
    /// values never match.
    #[must_use]
    pub fn is_compatible_with(&self, current: &Self) -> bool {
        self.algo_version == current.algo_version
            && self.params == current.params
            && self.tiles_sig.is_available()
            && self.tiles_sig == current.tiles_sig
            && self.parcels.same_content(&current.parcels)
            && self.tiles.same_content(&current.tiles)
    }
}

/// Capture the fingerprint of the current run.
pub fn fingerprint<T: KeyColumns + ?Sized>(
    parcels_source: &Path,
    tiles_source: &Path,
    params: CacheParams,
    filtered_tiles: &T,
) -> Fingerprint {
    Fingerprint {
        parcels: FileIdentity::capture(parcels_source),
        tiles: FileIdentity::capture(tiles_source),
        params,
        tiles_sig: tile_signature(filtered_tiles),
        algo_version: ALGO_VERSION.to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    struct Columns(BTreeMap<&'static str, Vec<String>>);

    impl KeyColumns for Columns {
        fn string_column(&self, name: &str) -> Option<Vec<String>> {
            self.0.get(name).cloned()
        }
    }

    fn keys(field: &'static str, values: &[&str]) -> Columns {
        Columns(BTreeMap::from([(
            field,
            values.iter().map(|s| s.to_string()).collect(),
        )]))
    }

    #[test]
    fn missing_file_records_nulls() {
        let identity = FileIdentity::capture(Path::new("/definitely/not/here.parquet"));
        assert_eq!(identity.path, "/definitely/not/here.parquet");
        assert_eq!(identity.size, None);
        assert_eq!(identity.mtime, None);
        assert!(!identity.same_content(&identity.clone()));
    }

    #[test]
    fn existing_file_records_size() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"12345").expect("write");
        let identity = FileIdentity::capture(file.path());
        assert_eq!(identity.size, Some(5));
        assert!(identity.mtime.is_some());
        assert!(identity.same_content(&identity.clone()));
    }

    #[test]
    fn relocated_file_still_matches() {
        let a = FileIdentity {
            path: "/a/parcels.parquet".into(),
            size: Some(10),
            mtime: Some(1.5),
        };
        let b = FileIdentity {
            path: "/b/parcels.parquet".into(),
            ..a.clone()
        };
        assert!(a.same_content(&b));
    }

    #[test]
    fn sub_second_mtimes_survive_meta_json() {
        for i in 0..2_000_u32 {
            let identity = FileIdentity {
                path: "/data/parcels.parquet".into(),
                size: Some(4096),
                mtime: Some(1_760_000_000.123_456_789 + f64::from(i) * 0.000_123_457),
            };
            let fp = Fingerprint {
                parcels: identity.clone(),
                tiles: identity,
                params: CacheParams::new(50.0, Some(2263), 8),
                tiles_sig: TileSignature::from_keys(vec!["a".into(), "b".into()]),
                algo_version: ALGO_VERSION.to_string(),
            };
            let text = serde_json::to_string_pretty(&fp).expect("serialize");
            let back: Fingerprint = serde_json::from_str(&text).expect("parse");
            assert!(back.is_compatible_with(&fp), "mtime changed: {text}");
        }
    }

    #[test]
    fn signature_is_order_independent() {
        let first = tile_signature(&keys("tile_key", &["b", "a", "c"]));
        let second = tile_signature(&keys("tile_key", &["c", "b", "a"]));
        assert_eq!(first, second);
        assert_eq!(first.n_tiles, Some(3));
    }

    #[test]
    fn signature_matches_sha256_of_joined_keys() {
        let sig = TileSignature::from_keys(vec!["b".into(), "a".into()]);
        let expected = format!("{:x}", Sha256::digest(b"a\nb"));
        assert_eq!(sig.keys_hash, Some(expected));
    }

    #[test]
    fn signature_uses_fallback_field() {
        let primary = tile_signature(&keys("tile_key", &["t1", "t2"]));
        let fallback = tile_signature(&keys("key", &["t1", "t2"]));
        assert_eq!(primary, fallback);
    }

    #[test]
    fn signature_unavailable_without_column() {
        let sig = tile_signature(&keys("name", &["t1"]));
        assert_eq!(sig, TileSignature::unavailable());
        assert!(!sig.is_available());
    }

    #[test]
    fn fingerprint_carries_algo_version() {
        let fp = fingerprint(
            Path::new("missing-parcels"),
            Path::new("missing-tiles"),
            CacheParams::new(50.0, Some(2263), 8),
            &keys("tile_key", &["a"]),
        );
        assert_eq!(fp.algo_version, ALGO_VERSION);
        assert_eq!(fp.params.crs_epsg_feet, Some(2263));
    }
}
