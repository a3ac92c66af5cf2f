use crate::error::{EtlError, Result};
use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// A fully materialized table: the CSV header as columns, rows in file order.
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// The first `n` rows (fewer if the table is shorter).
    pub fn head(&self, n: usize) -> RecordBatch {
        self.batch.slice(0, n.min(self.num_rows()))
    }
}

/// Read `path` in batches of `batch_size` rows and concatenate them.
///
/// Column types are inferred over the whole file; a column whose values do
/// not agree on a type falls back to text. Rows shorter than the header are
/// padded with nulls.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_csv<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Dataset> {
    let path = path.as_ref();
    let start = Instant::now();
    let batch = read_batches(path, batch_size).map_err(|source| EtlError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        elapsed = ?start.elapsed(),
        "loaded dataset"
    );
    Ok(Dataset::new(batch))
}

fn read_batches(path: &Path, batch_size: usize) -> std::result::Result<RecordBatch, ArrowError> {
    let mut file = File::open(path)?;
    let format = Format::default()
        .with_header(true)
        .with_truncated_rows(true);

    let (schema, records) = format.infer_schema(&mut file, None)?;
    debug!(records, fields = schema.fields().len(), "inferred schema");
    file.seek(SeekFrom::Start(0))?;

    let schema = Arc::new(dedupe_header(&schema));
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(batch_size)
        .build(file)?;

    let mut batches = Vec::new();
    for (idx, batch) in reader.enumerate() {
        let batch = batch?;
        debug!(chunk = idx, rows = batch.num_rows(), "read batch");
        batches.push(batch);
    }

    concat_batches(&schema, &batches)
}

/// Rename repeated header names to `name.1`, `name.2`, ... so every column
/// can be addressed by name downstream.
fn dedupe_header(schema: &Schema) -> Schema {
    let mut seen: HashSet<String> = HashSet::with_capacity(schema.fields().len());
    let mut counts: HashMap<String, usize> = HashMap::new();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let base = f.name();
            let mut name = base.clone();
            if seen.contains(&name) {
                let n = counts.entry(base.clone()).or_insert(0);
                while seen.contains(&name) {
                    *n += 1;
                    name = format!("{}.{}", base, n);
                }
                warn!(column = %base, renamed = %name, "duplicate header name");
            }
            seen.insert(name.clone());
            f.as_ref().clone().with_name(name)
        })
        .collect();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}
