use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::consts::DEBAYERED_DIR;
use crate::engine::ImageEngine;
use crate::error::Result;
use crate::executor::{channel_outputs, execute_debayer, execute_stage};
use crate::metadata::{FrameMetadata, MetadataSource};
use crate::output::OutputPlan;
use crate::registry::Registry;
use crate::scan::scan_frames;
use crate::stage::{classify, extension_of, stage_file_name, PipelineStage};

use super::backfill::{is_split_parent, run_backfill};
use super::config::RunConfig;
use super::context::RunContext;
use super::types::{NoOpReporter, Pass, ProgressReporter, RunSummary};

/// Run both passes with a thread-safe progress reporter.
///
/// Returns the registry built during the run with the summary. Only
/// configuration and input-root errors abort the run; everything else is
/// handled per frame.
pub fn run_pipeline_reported(
    config: &RunConfig,
    engine: &dyn ImageEngine,
    metadata: &dyn MetadataSource,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<(Registry, RunSummary)> {
    config.validate()?;
    if config.stages.approve {
        warn!("Approval is enabled but produces no files; it only counts as skipped");
    }
    let started = Instant::now();
    let mut ctx = RunContext::new(config, engine, metadata, reporter);
    info!(
        input = %config.input_root.display(),
        mode = %config.path_mode,
        engine = engine.name(),
        "Starting pipeline"
    );

    discovery_pass(&mut ctx)?;
    if config.backfill {
        run_backfill(&mut ctx)?;
    }

    let enabled = config.stages.producing();
    let incomplete: Vec<_> = ctx
        .registry
        .gaps(&enabled)
        .into_iter()
        .filter(|(sig, _)| {
            ctx.registry
                .get(sig)
                .map_or(true, |r| !is_split_parent(&ctx, r))
        })
        .collect();
    ctx.summary.incomplete = incomplete;
    ctx.summary.elapsed = started.elapsed();

    for (signature, stage) in &ctx.summary.incomplete {
        warn!(frame = %signature, missing = %stage, "Frame left incomplete");
    }
    info!(summary = %ctx.summary, "Pipeline finished");

    Ok((ctx.registry, ctx.summary))
}

/// Run both passes without progress reporting.
pub fn run_pipeline(
    config: &RunConfig,
    engine: &dyn ImageEngine,
    metadata: &dyn MetadataSource,
) -> Result<(Registry, RunSummary)> {
    run_pipeline_reported(config, engine, metadata, Arc::new(NoOpReporter))
}

/// Pass 1: register everything on disk, then drive each raw frame through
/// the enabled chain.
fn discovery_pass(ctx: &mut RunContext<'_>) -> Result<()> {
    let files = scan_frames(&ctx.config.input_root, &ctx.config.scan)?;
    ctx.summary.discovered = files.len();
    info!(files = files.len(), "Scanned input root");

    let mut raw = Vec::new();
    for path in &files {
        let (_, stage) = ctx.registry.upsert_path(path);
        if stage == PipelineStage::Raw && !in_debayer_dir(path) {
            raw.push(path.clone());
        }
    }

    register_output_root(ctx)?;

    let reporter = ctx.reporter.clone();
    reporter.begin_pass(Pass::Discovery, Some(raw.len()));
    for (i, path) in raw.iter().enumerate() {
        process_raw(ctx, path);
        reporter.advance(i + 1);
    }
    reporter.finish_pass();
    Ok(())
}

/// Register outputs of earlier runs kept outside the input tree, so
/// finished frames are not reported as gaps.
fn register_output_root(ctx: &mut RunContext<'_>) -> Result<()> {
    let Some(out) = ctx.config.separate_output_root() else {
        return Ok(());
    };
    if !out.is_dir() {
        return Ok(());
    }
    let files = scan_frames(out, &ctx.config.scan)?;
    debug!(root = %out.display(), files = files.len(), "Registered existing outputs");
    for path in &files {
        ctx.registry.upsert_path(path);
    }
    Ok(())
}

fn process_raw(ctx: &mut RunContext<'_>, path: &Path) {
    let meta = match ctx.metadata.read_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            warn!(frame = %path.display(), error = %err, "Skipping frame");
            ctx.summary.metadata_missing += 1;
            return;
        }
    };
    let terminal = ctx.config.stages.terminal();
    let plan = match OutputPlan::new(
        ctx.config.path_mode,
        path,
        &meta.object,
        ctx.config.output_roots(),
        terminal,
    ) {
        Ok(plan) => plan,
        Err(err) => {
            warn!(frame = %path.display(), error = %err, "Cannot plan outputs");
            return;
        }
    };

    if ctx.config.skip_existing && is_terminally_processed(&plan, path, terminal) {
        debug!(frame = %path.display(), "Already processed; skipping");
        ctx.summary.already_complete += 1;
        return;
    }
    ctx.summary.raw_frames += 1;
    run_chain(ctx, Some(path.to_path_buf()), &plan, &meta);
}

/// Calibrate → Cosmetic → Debayer → Register → Normalize → Approve.
/// Disabled stages pass their input through unchanged.
fn run_chain(ctx: &mut RunContext<'_>, input: Option<PathBuf>, plan: &OutputPlan, meta: &FrameMetadata) {
    let mut current = input;
    for stage in [PipelineStage::Calibrated, PipelineStage::Cosmetized] {
        if ctx.config.stages.is_enabled(stage) {
            current = execute_stage(ctx, stage, current.as_deref(), plan, meta);
        }
    }

    if ctx.config.stages.debayer && meta.is_cfa() {
        let Some(channels) = execute_debayer(ctx, current.as_deref(), plan, meta) else {
            return;
        };
        for (channel, path) in channels {
            let channel_meta = FrameMetadata {
                filter: channel.tag().to_string(),
                cfa: None,
                ..meta.clone()
            };
            run_tail(ctx, Some(path), plan, &channel_meta);
        }
    } else {
        run_tail(ctx, current, plan, meta);
    }
}

fn run_tail(ctx: &mut RunContext<'_>, input: Option<PathBuf>, plan: &OutputPlan, meta: &FrameMetadata) {
    let mut current = input;
    for stage in [
        PipelineStage::Registered,
        PipelineStage::Normalized,
        PipelineStage::Approved,
    ] {
        if ctx.config.stages.is_enabled(stage) {
            current = execute_stage(ctx, stage, current.as_deref(), plan, meta);
        }
    }
}

/// Whether the final artifact of `raw`, or any of its channel variants,
/// is already on disk.
pub fn is_terminally_processed(
    plan: &OutputPlan,
    raw: &Path,
    terminal: Option<PipelineStage>,
) -> bool {
    let Some(terminal) = terminal else {
        return false;
    };
    if plan.output_path(terminal, raw).exists() {
        return true;
    }
    let dir = plan.dir_for(terminal);
    let ext = extension_of(raw);
    channel_outputs(plan, raw).iter().any(|(_, channel_path)| {
        let (signature, _) = classify(channel_path);
        dir.join(stage_file_name(&signature, terminal, &ext)).exists()
    })
}

fn in_debayer_dir(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .is_some_and(|n| n == DEBAYERED_DIR)
}
