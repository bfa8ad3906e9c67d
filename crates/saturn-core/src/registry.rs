use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::stage::{classify, FrameSignature, PipelineStage};

/// Known files of one logical frame, one slot per stage.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    pub signature: FrameSignature,
    paths: [Option<PathBuf>; 6],
}

impl FrameRecord {
    pub fn new(signature: FrameSignature) -> Self {
        Self {
            signature,
            paths: Default::default(),
        }
    }

    pub fn get(&self, stage: PipelineStage) -> Option<&Path> {
        self.paths[stage.index()].as_deref()
    }

    /// Record `path` for `stage`. Entries are overwritten, never cleared.
    pub fn set(&mut self, stage: PipelineStage, path: PathBuf) {
        self.paths[stage.index()] = Some(path);
    }

    /// Stages with a known file, in canonical order.
    pub fn populated(&self) -> impl Iterator<Item = (PipelineStage, &Path)> {
        PipelineStage::ALL
            .into_iter()
            .filter_map(|s| self.get(s).map(|p| (s, p)))
    }

    /// Nearest stage before `stage` that has a file.
    pub fn preceding(&self, stage: PipelineStage) -> Option<(PipelineStage, &Path)> {
        PipelineStage::ALL[..stage.index()]
            .iter()
            .rev()
            .find_map(|&s| self.get(s).map(|p| (s, p)))
    }
}

/// Outcome of a gap query on one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageGap {
    /// Earliest enabled stage without a file although an earlier one has one.
    Missing(PipelineStage),
    Complete,
    /// No file known for any considered stage.
    NoInput,
}

/// Find the first hole in a record's stage chain.
///
/// Raw is always considered as the chain input; `enabled` lists the
/// processing stages of the run.
pub fn find_missing_stage(record: &FrameRecord, enabled: &[PipelineStage]) -> StageGap {
    let mut seen_input = false;
    for stage in PipelineStage::ALL {
        if stage != PipelineStage::Raw && !enabled.contains(&stage) {
            continue;
        }
        match record.get(stage) {
            Some(_) => seen_input = true,
            None if seen_input => return StageGap::Missing(stage),
            None => {}
        }
    }
    if seen_input {
        StageGap::Complete
    } else {
        StageGap::NoInput
    }
}

/// Signature → stage files for every frame seen during a run.
///
/// Lives for one run only. Iteration follows first-sighting order.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<FrameRecord>,
    index: HashMap<FrameSignature, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` as the `stage` file of the frame it belongs to,
    /// creating the record on first sighting. Returns the signature.
    pub fn upsert(&mut self, stage: PipelineStage, path: &Path) -> FrameSignature {
        let (signature, _) = classify(path);
        let idx = match self.index.get(&signature) {
            Some(&idx) => idx,
            None => {
                self.records.push(FrameRecord::new(signature.clone()));
                self.index.insert(signature.clone(), self.records.len() - 1);
                self.records.len() - 1
            }
        };
        self.records[idx].set(stage, path.to_path_buf());
        signature
    }

    /// Classify `path` and record it under its own stage.
    pub fn upsert_path(&mut self, path: &Path) -> (FrameSignature, PipelineStage) {
        let (_, stage) = classify(path);
        (self.upsert(stage, path), stage)
    }

    pub fn get(&self, signature: &FrameSignature) -> Option<&FrameRecord> {
        self.index.get(signature).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> impl Iterator<Item = &FrameRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record with a concrete missing stage.
    pub fn gaps(&self, enabled: &[PipelineStage]) -> Vec<(FrameSignature, PipelineStage)> {
        self.records
            .iter()
            .filter_map(|r| match find_missing_stage(r, enabled) {
                StageGap::Missing(stage) => Some((r.signature.clone(), stage)),
                _ => None,
            })
            .collect()
    }

    /// Records whose chain has a hole.
    pub fn incomplete(&self, enabled: &[PipelineStage]) -> Vec<&FrameRecord> {
        self.records
            .iter()
            .filter(|r| matches!(find_missing_stage(r, enabled), StageGap::Missing(_)))
            .collect()
    }

    /// Number of records holding a file for `stage`.
    pub fn count_at(&self, stage: PipelineStage) -> usize {
        self.records.iter().filter(|r| r.get(stage).is_some()).count()
    }
}
