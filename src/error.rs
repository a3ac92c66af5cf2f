//! Tagged failures for each pipeline stage.
//!
//! Every stage returns `Result<T, EtlError>`; [`EtlError::stage`] lets a caller
//! tell resolution, transport, extraction, locator, load and sink failures
//! apart without inspecting messages.

use arrow::error::ArrowError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

/// The pipeline stage an [`EtlError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Resolution,
    Transport,
    Extraction,
    Locator,
    Load,
    Normalize,
    Sink,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no link ending in `{suffix}` found on {page}")]
    LinkNotFound { page: String, suffix: String },

    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("extracting archive into {}: {source}", .dest.display())]
    Extraction {
        dest: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("no CSV file found under {}", .root.display())]
    NoCsvFound { root: PathBuf },

    #[error("scanning {} for CSV files: {source}", .root.display())]
    Locate {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("loading {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    #[error("normalizing column `{column}`: {source}")]
    Normalize {
        column: String,
        #[source]
        source: ArrowError,
    },

    #[error("writing CSV {}: {source}", .path.display())]
    CsvSink {
        path: PathBuf,
        #[source]
        source: SinkError,
    },

    #[error("writing table `{table}` in {}: {source}", .path.display())]
    SqlSink {
        path: PathBuf,
        table: String,
        #[source]
        source: SinkError,
    },
}

impl EtlError {
    pub fn stage(&self) -> Stage {
        match self {
            EtlError::Config(_) => Stage::Config,
            EtlError::LinkNotFound { .. } | EtlError::InvalidUrl { .. } => Stage::Resolution,
            EtlError::Transport { .. } => Stage::Transport,
            EtlError::Extraction { .. } => Stage::Extraction,
            EtlError::NoCsvFound { .. } | EtlError::Locate { .. } => Stage::Locator,
            EtlError::Load { .. } => Stage::Load,
            EtlError::Normalize { .. } => Stage::Normalize,
            EtlError::CsvSink { .. } | EtlError::SqlSink { .. } => Stage::Sink,
        }
    }
}

/// Underlying cause of a sink failure.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
