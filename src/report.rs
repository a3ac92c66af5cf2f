//! Human-readable summary printed after a run: shape, a preview and per-column info.

use crate::process::load::Dataset;
use arrow::array::Array;
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use arrow::util::pretty::pretty_format_batches;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
    pub non_null: usize,
}

pub fn column_info(dataset: &Dataset) -> Vec<ColumnInfo> {
    let batch = dataset.batch();
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| ColumnInfo {
            name: field.name().clone(),
            data_type: field.data_type().clone(),
            non_null: array.len() - array.null_count(),
        })
        .collect()
}

pub fn render_summary(dataset: &Dataset, preview_rows: usize) -> Result<String, ArrowError> {
    let (rows, cols) = dataset.shape();
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "Final shape: ({}, {})", rows, cols);

    let _ = writeln!(out, "\nFirst {} rows:", preview_rows.min(rows));
    let _ = writeln!(out, "{}", pretty_format_batches(&[dataset.head(preview_rows)])?);

    let _ = writeln!(out, "\nColumns:");
    let width = dataset
        .column_names()
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0);
    for (i, col) in column_info(dataset).iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<width$}  {:>10} non-null  {}",
            i,
            col.name,
            col.non_null,
            col.data_type,
            width = width
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn lifters() -> Dataset {
        let name: ArrayRef = Arc::new(StringArray::from(vec!["Ann", "Bo", "Cy"]));
        let age: ArrayRef = Arc::new(Int64Array::from(vec![Some(24), None, Some(40)]));
        Dataset::new(RecordBatch::try_from_iter(vec![("Name", name), ("Age", age)]).unwrap())
    }

    #[test]
    fn counts_non_null_values() {
        let info = column_info(&lifters());
        assert_eq!(info[0].name, "Name");
        assert_eq!(info[0].non_null, 3);
        assert_eq!(info[1].data_type, DataType::Int64);
        assert_eq!(info[1].non_null, 2);
    }

    #[test]
    fn summary_mentions_shape_and_preview() {
        let text = render_summary(&lifters(), 2).unwrap();
        assert!(text.contains("Final shape: (3, 2)"));
        assert!(text.contains("First 2 rows:"));
        assert!(text.contains("Ann"));
        assert!(!text.contains("Cy"));
        assert!(text.contains("Int64"));
    }
}
