//! Run configuration: defaults, an optional YAML file, then env overrides.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub const DEFAULT_INDEX_URL: &str = "https://openpowerlifting.gitlab.io/opl-csv/bulk-csv.html";
pub const DEFAULT_LINK_SUFFIX: &str = "openpowerlifting-latest.zip";
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// HTML page listing the bulk downloads.
    pub index_url: String,
    /// The download link is the first anchor whose href ends with this.
    pub link_suffix: String,
    /// Extraction target; the outputs are written here too.
    pub data_dir: PathBuf,
    pub output_csv: String,
    pub output_db: String,
    pub table_name: String,
    /// Rows per CSV read batch and per SQL insert transaction.
    pub batch_size: usize,
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            link_suffix: DEFAULT_LINK_SUFFIX.to_string(),
            data_dir: PathBuf::from("data"),
            output_csv: "powerlifting_data.csv".to_string(),
            output_db: "powerlifting_data.sqlite".to_string(),
            table_name: "powerlifting".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            preview_rows: 5,
        }
    }
}

impl PipelineConfig {
    /// Build the config for a run: `OPL_CONFIG` (YAML) if set, then the
    /// `OPL_*` per-field variables.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match env::var("OPL_CONFIG") {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
            .map_err(|e| EtlError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OPL_INDEX_URL") {
            self.index_url = v;
        }
        if let Some(v) = lookup("OPL_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("OPL_OUTPUT_CSV") {
            self.output_csv = v;
        }
        if let Some(v) = lookup("OPL_OUTPUT_DB") {
            self.output_db = v;
        }
        if let Some(v) = lookup("OPL_TABLE_NAME") {
            self.table_name = v;
        }
        if let Some(v) = lookup("OPL_BATCH_SIZE") {
            self.batch_size = v
                .trim()
                .parse()
                .map_err(|_| EtlError::Config(format!("OPL_BATCH_SIZE `{}` is not a count", v)))?;
        }
        debug!(config = ?self, "config overrides applied");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.index_url).map_err(|e| {
            EtlError::Config(format!("index_url `{}` is not a valid URL: {}", self.index_url, e))
        })?;
        for (name, value) in [
            ("link_suffix", &self.link_suffix),
            ("output_csv", &self.output_csv),
            ("output_db", &self.output_db),
            ("table_name", &self.table_name),
        ] {
            if value.trim().is_empty() {
                return Err(EtlError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.batch_size == 0 {
            return Err(EtlError::Config("batch_size must be positive".into()));
        }
        Ok(())
    }

    pub fn index_url(&self) -> Result<Url> {
        Url::parse(&self.index_url).map_err(|source| EtlError::InvalidUrl {
            url: self.index_url.clone(),
            source,
        })
    }

    pub fn output_csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_csv)
    }

    pub fn output_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_db)
    }
}
