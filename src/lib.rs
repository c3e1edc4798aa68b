pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod table;

pub use config::Config;
pub use error::{LakehouseError, Result};
pub use pipeline::{Pipeline, PipelineContext, PipelineResult, SnapshotKind};
