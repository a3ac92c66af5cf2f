pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod sink;

pub use config::PipelineConfig;
pub use error::{EtlError, Result, Stage};
pub use pipeline::{run, RunReport};
