use crate::error::{EtlError, Result, SinkError};
use crate::process::load::Dataset;
use crate::sink::row_groups;
use arrow::csv::WriterBuilder;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Write `dataset` to `path` with a header row and no index column.
///
/// Rows go to a sibling `.tmp` file first, which then replaces `path`.
#[instrument(level = "info", skip(dataset, path), fields(path = %path.as_ref().display()))]
pub fn write_csv<P: AsRef<Path>>(dataset: &Dataset, path: P, batch_size: usize) -> Result<()> {
    let path = path.as_ref();
    write_inner(dataset, path, batch_size).map_err(|source| EtlError::CsvSink {
        path: path.to_path_buf(),
        source,
    })?;
    info!(rows = dataset.num_rows(), path = %path.display(), "exported CSV");
    Ok(())
}

fn write_inner(
    dataset: &Dataset,
    path: &Path,
    batch_size: usize,
) -> std::result::Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("csv.tmp");
    let file = File::create(&temp_path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);

    if dataset.num_rows() == 0 {
        // still emits the header
        writer.write(dataset.batch())?;
    }
    for (idx, group) in row_groups(dataset.batch(), batch_size).enumerate() {
        writer.write(&group)?;
        debug!(chunk = idx, rows = group.num_rows(), "wrote rows");
    }
    writer.into_inner().sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}
