//! # Formats
//!
//! File formats at the edges of the tile graph:
//! - `tables`: Parquet edge lists, score tables and parcel tables
//! - `geojson`: pre-buffered tile geometries
//!
//! Also the [`KeyColumns`] abstraction used by the fingerprint to read a
//! tile identifier column from whatever tabular input it is given.

pub mod geojson;
pub mod tables;

pub use geojson::{TileFeature, TileLayer};
pub use tables::{
    EdgeRow, ScoreRow, read_edge_rows, read_record_batch, read_score_rows, write_edge_rows,
    write_score_rows,
};

use arrow::array::{ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

// =============================================================================
// KEY COLUMNS
// =============================================================================

/// Tabular input exposing named columns as strings.
pub trait KeyColumns {
    /// All values of column `name` rendered as strings, or `None` when the
    /// column does not exist. Null cells render as the empty string.
    fn string_column(&self, name: &str) -> Option<Vec<String>>;
}

impl KeyColumns for RecordBatch {
    fn string_column(&self, name: &str) -> Option<Vec<String>> {
        match string_values(self, name) {
            Ok(values) => values.map(|v| v.into_iter().map(Option::unwrap_or_default).collect()),
            Err(e) => {
                tracing::debug!(column = name, error = %e, "column not readable as strings");
                None
            }
        }
    }
}

// =============================================================================
// TYPED COLUMN ACCESS
// =============================================================================

fn cast_column(
    batch: &RecordBatch,
    name: &str,
    to: &DataType,
) -> Result<Option<ArrayRef>, ArrowError> {
    batch
        .column_by_name(name)
        .map(|column| arrow::compute::cast(column, to))
        .transpose()
}

/// Column `name` cast to Utf8; `Ok(None)` when absent.
pub(crate) fn string_values(
    batch: &RecordBatch,
    name: &str,
) -> Result<Option<Vec<Option<String>>>, ArrowError> {
    Ok(cast_column(batch, name, &DataType::Utf8)?.map(|array| {
        array
            .as_string::<i32>()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }))
}

/// Column `name` cast to Float64; `Ok(None)` when absent.
pub(crate) fn f64_values(
    batch: &RecordBatch,
    name: &str,
) -> Result<Option<Vec<Option<f64>>>, ArrowError> {
    Ok(cast_column(batch, name, &DataType::Float64)?
        .map(|array| array.as_primitive::<Float64Type>().iter().collect()))
}

/// Column `name` cast to Int64; `Ok(None)` when absent.
pub(crate) fn i64_values(
    batch: &RecordBatch,
    name: &str,
) -> Result<Option<Vec<Option<i64>>>, ArrowError> {
    Ok(cast_column(batch, name, &DataType::Int64)?
        .map(|array| array.as_primitive::<Int64Type>().iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("tile_key", DataType::Utf8, true),
            Field::new("count", DataType::Int32, true),
            Field::new("price", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
                Arc::new(Int32Array::from(vec![Some(1), Some(2), None])),
                Arc::new(Float64Array::from(vec![Some(1.5), None, Some(3.0)])),
            ],
        )
        .expect("batch")
    }

    #[test]
    fn record_batch_key_column() {
        let keys = batch().string_column("tile_key").expect("column");
        assert_eq!(keys, vec!["a".to_string(), String::new(), "c".to_string()]);
        assert!(batch().string_column("missing").is_none());
    }

    #[test]
    fn numeric_columns_render_as_strings() {
        let counts = batch().string_column("count").expect("column");
        assert_eq!(counts, vec!["1".to_string(), "2".to_string(), String::new()]);
    }

    #[test]
    fn typed_access_casts() {
        let b = batch();
        assert_eq!(
            f64_values(&b, "count").expect("cast"),
            Some(vec![Some(1.0), Some(2.0), None])
        );
        assert_eq!(
            i64_values(&b, "count").expect("cast"),
            Some(vec![Some(1), Some(2), None])
        );
        assert_eq!(f64_values(&b, "nope").expect("cast"), None);
    }
}
