//! # Parquet Tables
//!
//! Columnar files of the cache bundle and the parcel input.
//!
//! - Edge list: `tile_a: utf8, tile_b: utf8`
//! - Score table: `tile_a: utf8, tile_b: utf8, r2: f64, n_obs: i64, n_sales: i64`
//!
//! Readers look columns up by name and cast them, so files written by other
//! tools (int32 counts, large strings, dictionary columns) still load. A
//! missing value column reads as nulls and is defaulted later.

use super::{f64_values, i64_values, string_values};
use crate::primitives::{
    N_OBS_FIELD, N_SALES_FIELD, R2_FIELD, TILE_A_FIELD, TILE_B_FIELD,
};
use crate::{ScoreFields, TileGraphError};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// ROWS
// =============================================================================

/// One undirected edge, endpoints in canonical order when written by us.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EdgeRow {
    pub tile_a: String,
    pub tile_b: String,
}

impl EdgeRow {
    #[must_use]
    pub fn new(tile_a: impl Into<String>, tile_b: impl Into<String>) -> Self {
        Self {
            tile_a: tile_a.into(),
            tile_b: tile_b.into(),
        }
    }
}

/// One score-table row. Endpoints read as empty strings when null.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub tile_a: String,
    pub tile_b: String,
    pub fields: ScoreFields,
}

// =============================================================================
// WRITING
// =============================================================================

fn write_batch(path: &Path, schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<(), TileGraphError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
    let batch = RecordBatch::try_new(schema, columns)?;
    if batch.num_rows() > 0 {
        writer.write(&batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Write an edge list.
pub fn write_edge_rows(path: &Path, rows: &[EdgeRow]) -> Result<(), TileGraphError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(TILE_A_FIELD, DataType::Utf8, false),
        Field::new(TILE_B_FIELD, DataType::Utf8, false),
    ]));
    let a: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.tile_a)));
    let b: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.tile_b)));
    write_batch(path, schema, vec![a, b])
}

/// Write a score table.
pub fn write_score_rows(path: &Path, rows: &[ScoreRow]) -> Result<(), TileGraphError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(TILE_A_FIELD, DataType::Utf8, false),
        Field::new(TILE_B_FIELD, DataType::Utf8, false),
        Field::new(R2_FIELD, DataType::Float64, true),
        Field::new(N_OBS_FIELD, DataType::Int64, true),
        Field::new(N_SALES_FIELD, DataType::Int64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.tile_a))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.tile_b))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.fields.r2))),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.fields.n_obs))),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.fields.n_sales))),
    ];
    write_batch(path, schema, columns)
}

// =============================================================================
// READING
// =============================================================================

/// Read every record batch of a Parquet file.
fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, TileGraphError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// Read a whole Parquet file into a single record batch.
pub fn read_record_batch(path: &Path) -> Result<RecordBatch, TileGraphError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let mut batches = Vec::new();
    for batch in builder.build()? {
        batches.push(batch?);
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

fn endpoints(batch: &RecordBatch) -> Result<(Vec<String>, Vec<String>), TileGraphError> {
    let column = |name: &str| -> Result<Vec<String>, TileGraphError> {
        string_values(batch, name)?
            .map(|values| values.into_iter().map(Option::unwrap_or_default).collect())
            .ok_or_else(|| TileGraphError::MissingColumn(name.to_string()))
    };
    Ok((column(TILE_A_FIELD)?, column(TILE_B_FIELD)?))
}

/// Read an edge list.
pub fn read_edge_rows(path: &Path) -> Result<Vec<EdgeRow>, TileGraphError> {
    let mut rows = Vec::new();
    for batch in read_batches(path)? {
        let (a, b) = endpoints(&batch)?;
        rows.extend(a.into_iter().zip(b).map(|(a, b)| EdgeRow::new(a, b)));
    }
    Ok(rows)
}

/// Read a score table.
pub fn read_score_rows(path: &Path) -> Result<Vec<ScoreRow>, TileGraphError> {
    let mut rows = Vec::new();
    for batch in read_batches(path)? {
        let n = batch.num_rows();
        let (a, b) = endpoints(&batch)?;
        let r2 = f64_values(&batch, R2_FIELD)?.unwrap_or_else(|| vec![None; n]);
        let n_obs = i64_values(&batch, N_OBS_FIELD)?.unwrap_or_else(|| vec![None; n]);
        let n_sales = i64_values(&batch, N_SALES_FIELD)?.unwrap_or_else(|| vec![None; n]);

        for (i, (tile_a, tile_b)) in a.into_iter().zip(b).enumerate() {
            rows.push(ScoreRow {
                tile_a,
                tile_b,
                fields: ScoreFields {
                    r2: r2[i],
                    n_obs: n_obs[i],
                    n_sales: n_sales[i],
                },
            });
        }
    }
    Ok(rows)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;

    #[test]
    fn edge_rows_survive_parquet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("adj.parquet");
        let rows = vec![EdgeRow::new("a", "b"), EdgeRow::new("b", "c")];

        write_edge_rows(&path, &rows).expect("write");
        assert_eq!(read_edge_rows(&path).expect("read"), rows);
    }

    #[test]
    fn empty_edge_list_is_readable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("adj.parquet");

        write_edge_rows(&path, &[]).expect("write");
        assert!(read_edge_rows(&path).expect("read").is_empty());
    }

    #[test]
    fn score_rows_keep_nulls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scores.parquet");
        let rows = vec![ScoreRow {
            tile_a: "a".into(),
            tile_b: "b".into(),
            fields: ScoreFields {
                r2: Some(0.25),
                n_obs: None,
                n_sales: Some(4),
            },
        }];

        write_score_rows(&path, &rows).expect("write");
        assert_eq!(read_score_rows(&path).expect("read"), rows);
    }

    #[test]
    fn foreign_score_table_casts_counts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scores.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new(TILE_A_FIELD, DataType::Utf8, true),
            Field::new(TILE_B_FIELD, DataType::Utf8, true),
            Field::new(N_SALES_FIELD, DataType::Int32, true),
        ]));
        write_batch(
            &path,
            schema,
            vec![
                Arc::new(StringArray::from(vec![Some("x"), None])),
                Arc::new(StringArray::from(vec![Some("y"), Some("z")])),
                Arc::new(Int32Array::from(vec![Some(5), Some(1)])),
            ],
        )
        .expect("write");

        let rows = read_score_rows(&path).expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields.n_sales, Some(5));
        assert_eq!(rows[0].fields.r2, None);
        assert_eq!(rows[1].tile_a, "");
    }

    #[test]
    fn edge_list_without_endpoint_column_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("adj.parquet");
        let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Utf8, false)]));
        write_batch(
            &path,
            schema,
            vec![Arc::new(StringArray::from(vec!["x"]))],
        )
        .expect("write");

        assert!(matches!(
            read_edge_rows(&path),
            Err(TileGraphError::MissingColumn(_))
        ));
    }

    #[test]
    fn record_batch_concatenates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("adj.parquet");
        write_edge_rows(&path, &[EdgeRow::new("a", "b")]).expect("write");

        let batch = read_record_batch(&path).expect("read");
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 2);
    }
}
