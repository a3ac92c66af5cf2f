//! Output artifacts. Both sinks fully replace what a previous run wrote.

pub mod csv;
pub mod sqlite;

use arrow::record_batch::RecordBatch;

/// Split `batch` into consecutive zero-copy slices of at most `size` rows.
pub(crate) fn row_groups(batch: &RecordBatch, size: usize) -> impl Iterator<Item = RecordBatch> + '_ {
    let size = size.max(1);
    (0..batch.num_rows())
        .step_by(size)
        .map(move |offset| batch.slice(offset, size.min(batch.num_rows() - offset)))
}
