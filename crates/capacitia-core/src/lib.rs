pub mod aggregation;
pub mod canonical;
pub mod config;
pub mod error;
pub mod frames;
pub mod normalizer;
pub mod outputs;
pub mod pipelines;
pub mod records;
pub mod unification;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipelines::{run_pipeline, PipelineOutput, RunOptions, RunSummary};
