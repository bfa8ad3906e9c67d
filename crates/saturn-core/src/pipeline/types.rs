use std::collections::BTreeMap;
use std::time::Duration;

use crate::stage::{FrameSignature, PipelineStage};

/// Pass of a pipeline run, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Discovery,
    Backfill,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "Processing frames"),
            Self::Backfill => write!(f, "Filling gaps"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A pass has started. `total_items` is the number of frames it will
    /// visit, if known.
    fn begin_pass(&self, _pass: Pass, _total_items: Option<usize>) {}

    /// One frame of the current pass has been handled.
    fn advance(&self, _items_done: usize) {}

    /// The current pass is finished.
    fn finish_pass(&self) {}
}

/// Progress reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Per-stage outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageCounts {
    /// Outputs written by the engine.
    pub processed: usize,
    /// Outputs reused from disk, or stages that had nothing to do.
    pub skipped: usize,
    pub failed: usize,
}

/// What happened during a run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Frame files found by the discovery scan.
    pub discovered: usize,
    /// Raw frames whose chain was started.
    pub raw_frames: usize,
    /// Raw frames already processed to the last stage.
    pub already_complete: usize,
    /// Raw frames skipped for incomplete metadata.
    pub metadata_missing: usize,
    pub stages: BTreeMap<PipelineStage, StageCounts>,
    pub debayer: StageCounts,
    pub backfilled: usize,
    pub backfill_failed: usize,
    /// Frames with a stage gap left after the run.
    pub incomplete: Vec<(FrameSignature, PipelineStage)>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn counts(&self, stage: PipelineStage) -> StageCounts {
        self.stages.get(&stage).copied().unwrap_or_default()
    }

    pub(crate) fn stage_mut(&mut self, stage: PipelineStage) -> &mut StageCounts {
        self.stages.entry(stage).or_default()
    }

    pub fn total_failed(&self) -> usize {
        self.stages.values().map(|c| c.failed).sum::<usize>() + self.debayer.failed
    }

    pub fn is_clean(&self) -> bool {
        self.total_failed() == 0 && self.incomplete.is_empty() && self.metadata_missing == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files, {} raw frames ({} complete, {} without metadata)",
            self.discovered, self.raw_frames, self.already_complete, self.metadata_missing
        )?;
        for (stage, c) in &self.stages {
            write!(
                f,
                "; {stage}: {} done, {} skipped, {} failed",
                c.processed, c.skipped, c.failed
            )?;
        }
        write!(
            f,
            "; backfilled {}, {} incomplete, {:.1}s",
            self.backfilled,
            self.incomplete.len(),
            self.elapsed.as_secs_f64()
        )
    }
}
