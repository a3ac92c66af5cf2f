//! The end-to-end run: resolve → download → extract → locate → load →
//! normalize → CSV → SQLite. Each step consumes the previous step's output
//! and the first failure ends the run.

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::fetch::{urls, zips};
use crate::process::{load, locate, normalize, unzip};
use crate::sink;
use reqwest::Client;
use std::fs;
use std::path::PathBuf;
use tracing::{info, instrument};
use url::Url;

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub download_link: Url,
    pub extracted_files: usize,
    pub source_csv: PathBuf,
    /// (rows, columns) as loaded, before normalization.
    pub loaded_shape: (usize, usize),
    pub age_normalized: bool,
    pub output_csv: PathBuf,
    pub output_db: PathBuf,
    pub table_name: String,
    pub dataset: load::Dataset,
}

#[instrument(level = "info", skip_all, fields(index = %config.index_url))]
pub async fn run(client: &Client, config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;
    let index = config.index_url()?;
    fs::create_dir_all(&config.data_dir).map_err(|e| EtlError::Extraction {
        dest: config.data_dir.clone(),
        source: e.into(),
    })?;

    let download_link = urls::resolve_download_link(client, &index, &config.link_suffix).await?;
    info!("Download link: {}", download_link);

    let archive = zips::download_archive(client, &download_link).await?;
    let extracted = unzip::extract_archive(&archive, &config.data_dir)?;
    drop(archive);

    let output_csv = config.output_csv_path();
    let output_db = config.output_db_path();
    let source_csv = locate::locate_csv(&config.data_dir, &[output_csv.clone()])?;
    info!("Reading CSV file: {}", source_csv.display());

    let dataset = load::load_csv(&source_csv, config.batch_size)?;
    let loaded_shape = dataset.shape();
    info!("Loaded shape: {:?}", loaded_shape);

    let normalized = normalize::normalize_age(dataset)?;

    sink::csv::write_csv(&normalized.dataset, &output_csv, config.batch_size)?;
    info!(
        "Exported {} rows to {}",
        normalized.dataset.num_rows(),
        output_csv.display()
    );

    sink::sqlite::write_table(
        &normalized.dataset,
        &output_db,
        &config.table_name,
        config.batch_size,
    )?;
    info!("Exported data to SQLite database: {}", output_db.display());
    info!("Table name in the database: {}", config.table_name);

    Ok(RunReport {
        download_link,
        extracted_files: extracted.len(),
        source_csv,
        loaded_shape,
        age_normalized: normalized.age_normalized,
        output_csv,
        output_db,
        table_name: config.table_name.clone(),
        dataset: normalized.dataset,
    })
}
