use tracing::{debug, info, warn};

use crate::error::{Result, SaturnError};
use crate::executor::{channel_signature, execute_debayer, execute_stage};
use crate::frame::Channel;
use crate::output::OutputPlan;
use crate::registry::FrameRecord;
use crate::stage::{FrameSignature, PipelineStage};

use super::context::RunContext;
use super::types::Pass;

/// Pass 2: fill the first missing stage of every incomplete record, once.
/// Outputs under a separate output root are already registered by pass 1.
pub(super) fn run_backfill(ctx: &mut RunContext<'_>) -> Result<()> {
    let enabled = ctx.config.stages.producing();
    let gaps = ctx.registry.gaps(&enabled);
    info!(gaps = gaps.len(), "Backfilling stage gaps");

    let reporter = ctx.reporter.clone();
    reporter.begin_pass(Pass::Backfill, Some(gaps.len()));
    for (i, (signature, stage)) in gaps.iter().enumerate() {
        match backfill_one(ctx, signature, *stage) {
            Ok(Some(true)) => ctx.summary.backfilled += 1,
            Ok(Some(false)) => ctx.summary.backfill_failed += 1,
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "Backfill failed");
                ctx.summary.backfill_failed += 1;
            }
        }
        reporter.advance(i + 1);
    }
    reporter.finish_pass();
    Ok(())
}

/// `None` when the record needs no work, otherwise whether the stage
/// produced an output.
fn backfill_one(
    ctx: &mut RunContext<'_>,
    signature: &FrameSignature,
    stage: PipelineStage,
) -> Result<Option<bool>> {
    let unclassifiable = |reason: String| SaturnError::Unclassifiable {
        signature: signature.to_string(),
        stage,
        reason,
    };
    let record = ctx
        .registry
        .get(signature)
        .cloned()
        .ok_or_else(|| unclassifiable("record vanished".into()))?;
    if is_split_parent(ctx, &record) {
        return Ok(None);
    }
    let (prev_stage, prev_path) = record
        .preceding(stage)
        .ok_or_else(|| unclassifiable("no earlier stage on disk".into()))?;
    let meta = ctx
        .metadata
        .read_metadata(prev_path)
        .map_err(|e| unclassifiable(e.to_string()))?;

    let config = ctx.config;
    let terminal = config.stages.terminal();
    let plan = match record.get(PipelineStage::Raw) {
        Some(raw) => OutputPlan::new(
            config.path_mode,
            raw,
            &meta.object,
            config.output_roots(),
            terminal,
        ),
        None => OutputPlan::from_stage_output(
            config.path_mode,
            prev_path,
            prev_stage,
            &meta.object,
            config.output_roots(),
            terminal,
        ),
    }
    .map_err(|e| unclassifiable(e.to_string()))?;

    debug!(frame = %signature, %stage, from = %prev_stage, "Backfilling");
    if config.stages.debayer && meta.is_cfa() && stage > PipelineStage::Cosmetized {
        return Ok(Some(
            execute_debayer(ctx, Some(prev_path), &plan, &meta).is_some(),
        ));
    }
    Ok(Some(
        execute_stage(ctx, stage, Some(prev_path), &plan, &meta).is_some(),
    ))
}

/// Whether `record` is a colour frame already split into channel frames,
/// which carry on in its place.
pub(super) fn is_split_parent(ctx: &RunContext<'_>, record: &FrameRecord) -> bool {
    ctx.config.stages.debayer
        && Channel::ALL.into_iter().any(|channel| {
            ctx.registry
                .get(&channel_signature(&record.signature, channel))
                .is_some()
        })
}
