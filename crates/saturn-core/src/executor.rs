//! Runs one stage of one frame: decides whether work is needed, resolves
//! masters or references, calls the engine and records the result.
//!
//! Every function takes the previous stage's output as `Option`; `None`
//! means an earlier stage produced nothing and is passed straight through.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::consts::COLOR_CHANNEL_COUNT;
use crate::error::{Result, SaturnError};
use crate::frame::Channel;
use crate::metadata::FrameMetadata;
use crate::output::OutputPlan;
use crate::pipeline::{RunConfig, RunContext};
use crate::stage::{classify, extension_of, stage_file_name, FrameSignature, PipelineStage};

/// What to do about outputs that may already be on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputDecision {
    /// Nothing there yet, or regenerate it.
    Write,
    /// Use the existing files as this stage's result.
    Reuse,
    /// Files exist but neither reuse nor overwrite is allowed.
    Blocked,
}

pub fn decide_output(config: &RunConfig, outputs: &[PathBuf]) -> OutputDecision {
    let existing = outputs.iter().filter(|p| p.exists()).count();
    if existing == 0 {
        OutputDecision::Write
    } else if config.skip_existing && existing == outputs.len() {
        OutputDecision::Reuse
    } else if config.overwrite || config.skip_existing {
        OutputDecision::Write
    } else {
        OutputDecision::Blocked
    }
}

/// Run `stage` on `input`, returning the stage output or `None` when the
/// stage produced nothing. Failures are logged and counted, never returned.
pub fn execute_stage(
    ctx: &mut RunContext<'_>,
    stage: PipelineStage,
    input: Option<&Path>,
    plan: &OutputPlan,
    meta: &FrameMetadata,
) -> Option<PathBuf> {
    let input = input?;
    if matches!(stage, PipelineStage::Raw | PipelineStage::Approved) {
        ctx.summary.stage_mut(stage).skipped += 1;
        return None;
    }

    let output = plan.output_path(stage, input);
    match decide_output(ctx.config, std::slice::from_ref(&output)) {
        OutputDecision::Reuse => {
            debug!(output = %output.display(), %stage, "Output exists; reusing");
            ctx.summary.stage_mut(stage).skipped += 1;
            ctx.registry.upsert(stage, &output);
            return Some(output);
        }
        OutputDecision::Blocked => {
            fail(ctx, stage, input, &SaturnError::OutputExists(output));
            return None;
        }
        OutputDecision::Write => {}
    }

    match run_engine(ctx, stage, input, &output, meta) {
        Ok(written) => {
            info!(frame = %file_label(input), %stage, output = %written.display(), "Stage complete");
            ctx.summary.stage_mut(stage).processed += 1;
            ctx.registry.upsert(stage, &written);
            Some(written)
        }
        Err(err) => {
            fail(ctx, stage, input, &err);
            None
        }
    }
}

fn run_engine(
    ctx: &RunContext<'_>,
    stage: PipelineStage,
    input: &Path,
    output: &Path,
    meta: &FrameMetadata,
) -> Result<PathBuf> {
    let engine = ctx.engine;
    match stage {
        PipelineStage::Calibrated => {
            let masters = ctx.master_resolver()?.resolve(meta)?;
            ensure_parent(output)?;
            engine.calibrate(input, &masters, meta.exposure, output)
        }
        PipelineStage::Cosmetized => {
            ensure_parent(output)?;
            engine.cosmetic_correct(input, &ctx.config.cosmetic, output)
        }
        PipelineStage::Registered => {
            let reference = ctx.reference_resolver()?.registration(&meta.object)?;
            ensure_parent(output)?;
            engine.register(input, &reference, output)
        }
        PipelineStage::Normalized => {
            let reference = ctx.reference_resolver()?.normalization(
                &meta.object,
                &meta.filter,
                meta.exposure,
            )?;
            ensure_parent(output)?;
            engine.normalize(input, &reference, output)
        }
        PipelineStage::Raw | PipelineStage::Approved => Err(SaturnError::Engine(format!(
            "{stage} is not an executable stage"
        ))),
    }
}

/// Split a colour-filter-array frame into channel frames.
///
/// Returns the channel outputs, or `None` when the frame is not CFA or the
/// split failed.
pub fn execute_debayer(
    ctx: &mut RunContext<'_>,
    input: Option<&Path>,
    plan: &OutputPlan,
    meta: &FrameMetadata,
) -> Option<Vec<(Channel, PathBuf)>> {
    let input = input?;
    let pattern = meta.cfa?;
    let outputs = channel_outputs(plan, input);
    let paths: Vec<PathBuf> = outputs.iter().map(|(_, p)| p.clone()).collect();

    match decide_output(ctx.config, &paths) {
        OutputDecision::Reuse => {
            debug!(frame = %file_label(input), "Channel frames exist; reusing");
            ctx.debayer_done(&paths, false);
            return Some(outputs);
        }
        OutputDecision::Blocked => {
            let existing = paths.iter().find(|p| p.exists()).cloned().unwrap_or_default();
            warn!(frame = %file_label(input), error = %SaturnError::OutputExists(existing), "Debayer failed");
            ctx.summary.debayer.failed += 1;
            return None;
        }
        OutputDecision::Write => {}
    }

    let result = ensure_parent(&paths[0]).and_then(|_| ctx.engine.debayer(input, pattern, &outputs));
    match result {
        Ok(written) if written.len() == COLOR_CHANNEL_COUNT => {
            info!(frame = %file_label(input), %pattern, "Debayered into channels");
            ctx.debayer_done(&written, true);
            Some(outputs)
        }
        Ok(written) => {
            warn!(
                frame = %file_label(input),
                written = written.len(),
                "Engine wrote an incomplete channel set"
            );
            ctx.summary.debayer.failed += 1;
            None
        }
        Err(err) => {
            warn!(frame = %file_label(input), error = %err, "Debayer failed");
            ctx.summary.debayer.failed += 1;
            None
        }
    }
}

/// Channel frame paths for `input`: `<signature>_<tag><suffix>.<ext>` in the
/// plan's debayer directory.
pub fn channel_outputs(plan: &OutputPlan, input: &Path) -> Vec<(Channel, PathBuf)> {
    let (signature, stage) = classify(input);
    let ext = extension_of(input);
    Channel::ALL
        .into_iter()
        .map(|channel| {
            let channel_sig = channel_signature(&signature, channel);
            let name = stage_file_name(&channel_sig, stage, &ext);
            (channel, plan.debayer_dir().join(name))
        })
        .collect()
}

pub fn channel_signature(signature: &FrameSignature, channel: Channel) -> FrameSignature {
    FrameSignature::new(format!("{}_{}", signature, channel.tag()))
}

impl RunContext<'_> {
    fn debayer_done(&mut self, paths: &[PathBuf], processed: bool) {
        for path in paths {
            self.registry.upsert_path(path);
        }
        if processed {
            self.summary.debayer.processed += 1;
        } else {
            self.summary.debayer.skipped += 1;
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn fail(ctx: &mut RunContext<'_>, stage: PipelineStage, input: &Path, err: &SaturnError) {
    match err {
        SaturnError::MasterNotFound { .. } | SaturnError::DirectoryMissing(_) => {
            warn!(frame = %file_label(input), error = %err, "No calibration masters; frame left uncalibrated");
        }
        SaturnError::ReferenceNotFound { .. } => {
            warn!(frame = %file_label(input), %stage, error = %err, "Stage skipped");
        }
        _ => warn!(frame = %file_label(input), %stage, error = %err, "Stage failed"),
    }
    ctx.summary.stage_mut(stage).failed += 1;
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
