//! Network side of the pipeline: find the bulk archive link on the index
//! page, then pull the archive into memory.

pub mod urls;
pub mod zips;
