mod common;

use std::path::{Path, PathBuf};

use saturn_core::error::SaturnError;
use saturn_core::resolve::{
    find_normalization_reference, find_registration_reference, FilterAliases, ReferenceLayout,
    ReferenceResolver,
};

use common::touch;

fn exts() -> Vec<String> {
    vec!["fit".into(), "fits".into()]
}

fn registration_for_m51(
    library: &Path,
    layout: &ReferenceLayout,
) -> saturn_core::error::Result<PathBuf> {
    find_registration_reference(library, layout, &FilterAliases::default(), "M51", &exts())
}

#[test]
fn test_registration_reference_by_object_prefix() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("registration/M51_best.fit"));
    touch(&dir.path().join("registration/M101_best.fit"));
    let found = registration_for_m51(dir.path(), &ReferenceLayout::default()).unwrap();
    assert!(found.ends_with("M51_best.fit"));
}

#[test]
fn test_object_prefix_needs_separator() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("registration/M510_best.fit"));
    let err = registration_for_m51(dir.path(), &ReferenceLayout::default()).unwrap_err();
    match err {
        SaturnError::ReferenceNotFound { purpose, object } => {
            assert_eq!(purpose, "registration");
            assert_eq!(object, "M51");
        }
        other => panic!("expected ReferenceNotFound, got {other:?}"),
    }
}

#[test]
fn test_non_image_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("registration/M51_notes.txt"));
    assert!(registration_for_m51(dir.path(), &ReferenceLayout::default()).is_err());
}

#[test]
fn test_single_match_is_returned_whatever_the_order() {
    // several matches resolve to the last enumerated one, which is
    // platform-defined; with one match the result is fixed
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("registration/M51_a.fit"));
    touch(&dir.path().join("registration/M52_b.fit"));
    let layout = ReferenceLayout::default();
    let aliases = FilterAliases::default();
    let extensions = exts();
    let resolver = ReferenceResolver {
        library: dir.path(),
        layout: &layout,
        aliases: &aliases,
        extensions: &extensions,
    };
    assert!(resolver.registration("M51").unwrap().ends_with("M51_a.fit"));
}

#[test]
fn test_normalization_reference_needs_filter_token() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("normalization/M51_Ha_600s.fit"));
    touch(&dir.path().join("normalization/M51_Lum_300s.fit"));
    let found = find_normalization_reference(
        dir.path(),
        &ReferenceLayout::default(),
        &FilterAliases::default(),
        "M51",
        "L",
        300.0,
        &exts(),
    )
    .unwrap();
    assert!(found.ends_with("M51_Lum_300s.fit"));
}

#[test]
fn test_strict_exposure_requires_exposure_token() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("normalization/M51_L_600s.fit"));
    let layout = ReferenceLayout {
        strict_exposure: true,
        ..ReferenceLayout::default()
    };
    let lookup = |exposure: f64| {
        find_normalization_reference(
            dir.path(),
            &layout,
            &FilterAliases::default(),
            "M51",
            "L",
            exposure,
            &exts(),
        )
    };
    assert!(lookup(300.0).is_err());
    assert!(lookup(600.0).is_ok());
}

#[test]
fn test_flat_layout_searches_library_root() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("M51_ref.fit"));
    let layout = ReferenceLayout {
        registration_dir: None,
        normalization_dir: None,
        ..ReferenceLayout::default()
    };
    assert!(registration_for_m51(dir.path(), &layout).is_ok());
}

#[test]
fn test_missing_reference_dir_is_directory_missing() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        registration_for_m51(dir.path(), &ReferenceLayout::default()),
        Err(SaturnError::DirectoryMissing(_))
    ));
}
