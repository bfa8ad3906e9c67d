use saturn_core::engine::CosmeticParams;
use saturn_core::error::SaturnError;
use saturn_core::output::PathMode;
use saturn_core::pipeline::{RunConfig, StageToggles};
use saturn_core::resolve::{DateMatch, FilterAliases, MatchTolerances};
use saturn_core::stage::PipelineStage;

fn valid() -> RunConfig {
    RunConfig {
        master_library: Some("/lib/masters".into()),
        reference_library: Some("/lib/refs".into()),
        ..RunConfig::new("/data/lights")
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_path_mode_display() {
    assert_eq!(format!("{}", PathMode::Auto), "Auto");
    assert_eq!(format!("{}", PathMode::PutInObjectSubfolder), "Object Subfolder");
    assert_eq!(
        format!("{}", PathMode::RelativeWithObjectFolder),
        "Relative + Object Folder"
    );
}

#[test]
fn test_path_mode_default_is_auto() {
    assert_eq!(PathMode::default(), PathMode::Auto);
}

#[test]
fn test_date_match_display() {
    assert_eq!(format!("{}", DateMatch::NotLater), "Not Later");
    assert_eq!(format!("{}", DateMatch::Nearest), "Nearest");
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_run_config_defaults() {
    let c = RunConfig::default();
    assert!(c.skip_existing);
    assert!(!c.overwrite);
    assert!(c.backfill);
    assert_eq!(c.root_subfolder, "processed");
    assert_eq!(c.scan.skip_prefixes, vec!["_".to_string()]);
    assert_eq!(c.tolerances, MatchTolerances::default());
    assert_eq!(c.cosmetic, CosmeticParams::default());
}

#[test]
fn test_default_stages() {
    let s = StageToggles::default();
    assert_eq!(
        s.producing(),
        vec![
            PipelineStage::Calibrated,
            PipelineStage::Cosmetized,
            PipelineStage::Registered,
            PipelineStage::Normalized,
        ]
    );
    assert_eq!(s.terminal(), Some(PipelineStage::Normalized));
    assert!(!s.is_enabled(PipelineStage::Approved));
}

#[test]
fn test_no_stages_has_no_terminal() {
    let s = StageToggles {
        calibrate: false,
        cosmetic: false,
        debayer: false,
        register: false,
        normalize: false,
        approve: true,
    };
    assert_eq!(s.terminal(), None);
}

#[test]
fn test_filter_aliases_normalize() {
    let a = FilterAliases::default();
    assert_eq!(a.normalize("Luminance"), "L");
    assert_eq!(a.normalize("o3"), "OIII");
    assert_eq!(a.normalize("Custom"), "Custom");
    assert!(a.same_filter("Red", "r"));
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_valid_config_passes() {
    assert!(valid().validate().is_ok());
}

#[test]
fn test_calibration_needs_master_library() {
    let c = RunConfig {
        master_library: None,
        ..valid()
    };
    assert!(matches!(c.validate(), Err(SaturnError::Config(_))));

    let c = RunConfig {
        master_library: None,
        stages: StageToggles {
            calibrate: false,
            ..StageToggles::default()
        },
        ..valid()
    };
    assert!(c.validate().is_ok());
}

#[test]
fn test_registration_needs_reference_library() {
    let c = RunConfig {
        reference_library: None,
        ..valid()
    };
    assert!(c.validate().is_err());
}

#[test]
fn test_non_positive_cosmetic_sigma_rejected() {
    let c = RunConfig {
        cosmetic: CosmeticParams {
            sigma: 0.0,
            ..CosmeticParams::default()
        },
        ..valid()
    };
    assert!(c.validate().is_err());
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_toml_round_trip() {
    let c = RunConfig {
        output_root: Some("/out".into()),
        path_mode: PathMode::PutFinalsInObjectSubfolder,
        ..valid()
    };
    let text = toml::to_string_pretty(&c).unwrap();
    let back: RunConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, c);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let text = r#"
        input_root = "/data/lights"
        master_library = "/lib/masters"
        reference_library = "/lib/refs"
        path_mode = "PutInObjectSubfolder"

        [stages]
        debayer = false

        [tolerances]
        exposure = 10.0
        date_match = "Nearest"
    "#;
    let c: RunConfig = toml::from_str(text).unwrap();
    assert_eq!(c.path_mode, PathMode::PutInObjectSubfolder);
    assert!(!c.stages.debayer);
    assert!(c.stages.calibrate);
    assert_eq!(c.tolerances.exposure, 10.0);
    assert_eq!(c.tolerances.date_match, DateMatch::Nearest);
    assert_eq!(c.tolerances.max_temperature_delta, None);
    assert!(c.skip_existing);
    assert!(c.validate().is_ok());
}
