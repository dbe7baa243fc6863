//! Chart and video record reconciliation - shared modules for all binaries.

pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fields;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod safety;
pub mod similarity;
pub mod storage;

pub use config::CleaningConfig;
pub use error::{Error, Result};
pub use pipeline::{UnificationPipeline, UnifiedDataset};
