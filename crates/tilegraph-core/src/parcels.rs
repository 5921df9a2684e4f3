//! # Parcel Table
//!
//! The slim, read-only parcel columns the scoring workers need, and the
//! tile → parcel row-index mapping.
//!
//! Values are `Option<f64>`; nulls and NaN are both "missing". A column that
//! does not exist (or cannot be read as numbers) is `None` as a whole, which
//! the scorer treats as a schema gap rather than an error.

use crate::formats::{f64_values, string_values};
use crate::primitives::{
    ASSESSED_VALUE_FIELD, BUILT_AREA_FIELD, LAND_AREA_FIELD, MARKET_VALUE_FIELD,
    SALE_PRICE_FIELD,
};
use crate::{TileGraphError, TileId};
use arrow::record_batch::RecordBatch;
use std::collections::{BTreeMap, BTreeSet};

/// Row indices of the parcels belonging to each tile.
pub type ParcelIndex = BTreeMap<TileId, BTreeSet<usize>>;

/// A nullable numeric column.
pub type Column = Vec<Option<f64>>;

/// Parcel columns used by edge scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlimParcels {
    len: usize,
    sale_price: Option<Column>,
    market_value: Option<Column>,
    built_area: Option<Column>,
    land_area: Option<Column>,
}

fn clean(column: Column) -> Column {
    column
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect()
}

fn numeric_column(batch: &RecordBatch, name: &str) -> Option<Column> {
    match f64_values(batch, name) {
        Ok(column) => column.map(clean),
        Err(e) => {
            tracing::warn!(column = name, error = %e, "parcel column is not numeric; ignoring it");
            None
        }
    }
}

impl SlimParcels {
    /// Build from explicit columns. Every present column must have `len` rows.
    pub fn from_columns(
        len: usize,
        sale_price: Option<Column>,
        market_value: Option<Column>,
        built_area: Option<Column>,
        land_area: Option<Column>,
    ) -> Result<Self, TileGraphError> {
        for (name, column) in [
            (SALE_PRICE_FIELD, &sale_price),
            (MARKET_VALUE_FIELD, &market_value),
            (BUILT_AREA_FIELD, &built_area),
            (LAND_AREA_FIELD, &land_area),
        ] {
            if let Some(column) = column
                && column.len() != len
            {
                return Err(TileGraphError::InvalidInput(format!(
                    "column {} has {} rows, expected {}",
                    name,
                    column.len(),
                    len
                )));
            }
        }
        Ok(Self {
            len,
            sale_price: sale_price.map(clean),
            market_value: market_value.map(clean),
            built_area: built_area.map(clean),
            land_area: land_area.map(clean),
        })
    }

    /// Project a full parcel table down to the scoring columns.
    ///
    /// When `market_value_proxy` is absent but `assessed_value` is present,
    /// the proxy is derived with [`market_value_proxy`].
    pub fn from_batch(batch: &RecordBatch) -> Result<Self, TileGraphError> {
        let sale_price = numeric_column(batch, SALE_PRICE_FIELD);
        let market_value = numeric_column(batch, MARKET_VALUE_FIELD).or_else(|| {
            numeric_column(batch, ASSESSED_VALUE_FIELD).map(|assessed| {
                tracing::debug!("deriving market value proxy from assessed value");
                market_value_proxy(sale_price.as_deref(), &assessed)
            })
        });
        Self::from_columns(
            batch.num_rows(),
            sale_price,
            market_value,
            numeric_column(batch, BUILT_AREA_FIELD),
            numeric_column(batch, LAND_AREA_FIELD),
        )
    }

    /// Number of parcels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there are no parcels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn sale_price(&self) -> Option<&[Option<f64>]> {
        self.sale_price.as_deref()
    }

    /// Target and predictors, only when all three columns exist.
    pub(crate) fn regression_columns(
        &self,
    ) -> Option<(&[Option<f64>], &[Option<f64>], &[Option<f64>])> {
        Some((
            self.market_value.as_deref()?,
            self.built_area.as_deref()?,
            self.land_area.as_deref()?,
        ))
    }
}

/// Market value proxy per parcel: the mean of sale price and assessed value
/// where both exist, otherwise whichever one exists.
#[must_use]
pub fn market_value_proxy(sale_price: Option<&[Option<f64>]>, assessed: &[Option<f64>]) -> Column {
    assessed
        .iter()
        .enumerate()
        .map(|(i, &assessed)| {
            let sale = sale_price.and_then(|s| s.get(i).copied().flatten());
            match (sale, assessed) {
                (Some(s), Some(a)) => Some((s + a) / 2.0),
                (Some(s), None) => Some(s),
                (None, a) => a,
            }
        })
        .collect()
}

/// Group parcel rows by the tile named in `field`. Null or empty cells are skipped.
pub fn parcel_index_by_tile(batch: &RecordBatch, field: &str) -> Result<ParcelIndex, TileGraphError> {
    let keys = string_values(batch, field)?
        .ok_or_else(|| TileGraphError::MissingColumn(field.to_string()))?;
    let mut index = ParcelIndex::new();
    for (row, key) in keys.into_iter().enumerate() {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            index.entry(TileId(key)).or_default().insert(row);
        }
    }
    Ok(index)
}

// =============================================================================
// TESTS
// =============================================================================
