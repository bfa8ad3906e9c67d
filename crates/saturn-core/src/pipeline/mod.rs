mod backfill;
pub mod config;
mod context;
mod orchestrator;
mod types;

pub use config::{RunConfig, StageToggles};
pub use context::RunContext;
pub use orchestrator::{is_terminally_processed, run_pipeline, run_pipeline_reported};
pub use types::{NoOpReporter, Pass, ProgressReporter, RunSummary, StageCounts};
