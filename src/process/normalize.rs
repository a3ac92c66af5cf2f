use crate::error::{EtlError, Result};
use crate::process::load::Dataset;
use arrow::array::{Array, ArrayRef, AsArray, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const AGE_COLUMN: &str = "Age";

/// Outcome of [`normalize_age`].
#[derive(Debug, Clone)]
pub struct Normalized {
    pub dataset: Dataset,
    /// False when the table had no `Age` column and was passed through.
    pub age_normalized: bool,
}

/// Round every `Age` value up to a whole number and store the column as a
/// nullable 64-bit integer. Values that are missing, non-numeric or out of
/// range become null. A table without `Age` is returned unchanged.
pub fn normalize_age(dataset: Dataset) -> Result<Normalized> {
    let schema = dataset.schema();
    let Ok(idx) = schema.index_of(AGE_COLUMN) else {
        warn!(column = AGE_COLUMN, "column not found; leaving table unchanged");
        return Ok(Normalized {
            dataset,
            age_normalized: false,
        });
    };

    let source = dataset.batch().column(idx);
    let ages = ceil_to_int(source).map_err(|source| EtlError::Normalize {
        column: AGE_COLUMN.to_string(),
        source,
    })?;
    let nulled = ages.null_count().saturating_sub(source.null_count());
    debug!(from = ?source.data_type(), nulled, "cast column to Int64");

    let batch = replace_column(dataset.into_batch(), idx, Arc::new(ages)).map_err(|source| {
        EtlError::Normalize {
            column: AGE_COLUMN.to_string(),
            source,
        }
    })?;
    info!(column = AGE_COLUMN, "normalized column");

    Ok(Normalized {
        dataset: Dataset::new(batch),
        age_normalized: true,
    })
}

/// Ceiling of each value as `Int64`, null where that is not possible.
pub fn ceil_to_int(array: &ArrayRef) -> std::result::Result<Int64Array, ArrowError> {
    let ints: Int64Array = match array.data_type() {
        DataType::Int64 => array.as_primitive::<Int64Type>().clone(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => cast(array, &DataType::Int64)?
            .as_primitive::<Int64Type>()
            .clone(),
        DataType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .map(|v| v.and_then(parse_number).and_then(ceil_f64))
            .collect(),
        DataType::LargeUtf8 => array
            .as_string::<i64>()
            .iter()
            .map(|v| v.and_then(parse_number).and_then(ceil_f64))
            .collect(),
        DataType::Null => Int64Array::new_null(array.len()),
        other => match cast(array, &DataType::Float64) {
            Ok(floats) => floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.and_then(ceil_f64))
                .collect(),
            Err(e) => {
                warn!(data_type = ?other, error = %e, "column is not numeric; all values become null");
                Int64Array::new_null(array.len())
            }
        },
    };
    Ok(ints)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn ceil_f64(v: f64) -> Option<i64> {
    let c = v.ceil();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if c.is_finite() && c >= i64::MIN as f64 && c < i64::MAX as f64 {
        Some(c as i64)
    } else {
        None
    }
}

fn replace_column(
    batch: RecordBatch,
    idx: usize,
    column: ArrayRef,
) -> std::result::Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == idx {
                Field::new(f.name(), DataType::Int64, true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    let mut columns = batch.columns().to_vec();
    columns[idx] = column;
    RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
    )
}
