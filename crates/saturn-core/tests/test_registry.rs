use std::path::{Path, PathBuf};

use saturn_core::registry::{find_missing_stage, FrameRecord, Registry, StageGap};
use saturn_core::stage::{FrameSignature, PipelineStage};

const PROCESSING: [PipelineStage; 4] = [
    PipelineStage::Calibrated,
    PipelineStage::Cosmetized,
    PipelineStage::Registered,
    PipelineStage::Normalized,
];

fn record(stages: &[PipelineStage]) -> FrameRecord {
    let mut r = FrameRecord::new(FrameSignature::new("X"));
    for &s in stages {
        r.set(s, PathBuf::from(format!("X{}.fit", s.suffix())));
    }
    r
}

// ---------------------------------------------------------------------------
// find_missing_stage
// ---------------------------------------------------------------------------

#[test]
fn test_gap_after_calibrated() {
    let r = record(&[PipelineStage::Raw, PipelineStage::Calibrated]);
    assert_eq!(
        find_missing_stage(&r, &PROCESSING),
        StageGap::Missing(PipelineStage::Cosmetized)
    );
}

#[test]
fn test_gap_in_the_middle() {
    let r = record(&[
        PipelineStage::Raw,
        PipelineStage::Calibrated,
        PipelineStage::Normalized,
    ]);
    assert_eq!(
        find_missing_stage(&r, &PROCESSING),
        StageGap::Missing(PipelineStage::Cosmetized)
    );
}

#[test]
fn test_complete_chain() {
    let r = record(&[
        PipelineStage::Raw,
        PipelineStage::Calibrated,
        PipelineStage::Cosmetized,
        PipelineStage::Registered,
        PipelineStage::Normalized,
    ]);
    assert_eq!(find_missing_stage(&r, &PROCESSING), StageGap::Complete);
}

#[test]
fn test_disabled_stages_are_not_gaps() {
    let r = record(&[PipelineStage::Raw, PipelineStage::Cosmetized]);
    let enabled = [PipelineStage::Cosmetized, PipelineStage::Registered];
    assert_eq!(
        find_missing_stage(&r, &enabled),
        StageGap::Missing(PipelineStage::Registered)
    );
}

#[test]
fn test_raw_only_needs_first_enabled_stage() {
    let r = record(&[PipelineStage::Raw]);
    assert_eq!(
        find_missing_stage(&r, &PROCESSING),
        StageGap::Missing(PipelineStage::Calibrated)
    );
}

#[test]
fn test_empty_record_has_no_input() {
    let r = record(&[]);
    assert_eq!(find_missing_stage(&r, &PROCESSING), StageGap::NoInput);
}

#[test]
fn test_output_only_record_without_raw() {
    let r = record(&[PipelineStage::Registered]);
    assert_eq!(
        find_missing_stage(&r, &PROCESSING),
        StageGap::Missing(PipelineStage::Normalized)
    );
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn test_upsert_merges_stage_files_by_signature() {
    let mut reg = Registry::new();
    reg.upsert_path(Path::new("/in/M51_001.fit"));
    reg.upsert_path(Path::new("/out/calibrated/M51_001_c.fit"));
    reg.upsert_path(Path::new("/in/M51_002.fit"));
    assert_eq!(reg.len(), 2);

    let r = reg.get(&FrameSignature::new("M51_001")).unwrap();
    assert_eq!(r.get(PipelineStage::Raw), Some(Path::new("/in/M51_001.fit")));
    assert_eq!(
        r.get(PipelineStage::Calibrated),
        Some(Path::new("/out/calibrated/M51_001_c.fit"))
    );
}

#[test]
fn test_upsert_last_write_wins() {
    let mut reg = Registry::new();
    reg.upsert(PipelineStage::Calibrated, Path::new("/a/M51_001_c.fit"));
    reg.upsert(PipelineStage::Calibrated, Path::new("/b/M51_001_c.fit"));
    let r = reg.get(&FrameSignature::new("M51_001")).unwrap();
    assert_eq!(
        r.get(PipelineStage::Calibrated),
        Some(Path::new("/b/M51_001_c.fit"))
    );
}

#[test]
fn test_records_keep_first_sighting_order() {
    let mut reg = Registry::new();
    for name in ["b.fit", "a.fit", "b_c.fit", "c.fit"] {
        reg.upsert_path(Path::new(name));
    }
    let order: Vec<&str> = reg.records().map(|r| r.signature.as_str()).collect();
    assert_eq!(order, ["b", "a", "c"]);
}

#[test]
fn test_gaps_and_incomplete() {
    let mut reg = Registry::new();
    reg.upsert_path(Path::new("A.fit"));
    reg.upsert_path(Path::new("A_c.fit"));
    reg.upsert_path(Path::new("B.fit"));
    reg.upsert_path(Path::new("B_c.fit"));
    reg.upsert_path(Path::new("B_c_cc.fit"));
    let enabled = [PipelineStage::Calibrated, PipelineStage::Cosmetized];
    assert_eq!(
        reg.gaps(&enabled),
        vec![(FrameSignature::new("A"), PipelineStage::Cosmetized)]
    );
    assert_eq!(reg.incomplete(&enabled).len(), 1);
    assert_eq!(reg.count_at(PipelineStage::Calibrated), 2);
}

#[test]
fn test_preceding_finds_nearest_earlier_file() {
    let r = record(&[PipelineStage::Raw, PipelineStage::Calibrated]);
    let (stage, path) = r.preceding(PipelineStage::Registered).unwrap();
    assert_eq!(stage, PipelineStage::Calibrated);
    assert_eq!(path, Path::new("X_c.fit"));
    assert!(r.preceding(PipelineStage::Raw).is_none());
}
