#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use saturn_core::io::fits::{write_fits, FitsHeader, HeaderValue};

/// Acquisition values written into synthetic light frames.
#[derive(Clone, Debug)]
pub struct LightSpec {
    pub instrument: &'static str,
    pub object: &'static str,
    pub filter: &'static str,
    pub date_obs: &'static str,
    pub exposure: f64,
    pub temperature: f64,
    pub binning: i64,
    pub bayer: Option<&'static str>,
}

impl Default for LightSpec {
    fn default() -> Self {
        Self {
            instrument: "ASI2600MM",
            object: "M51",
            filter: "L",
            date_obs: "2023-01-01T22:00:00",
            exposure: 300.0,
            temperature: -10.0,
            binning: 1,
            bayer: None,
        }
    }
}

impl LightSpec {
    pub fn header(&self) -> FitsHeader {
        let mut h = FitsHeader::new();
        h.set("INSTRUME", HeaderValue::String(self.instrument.into()));
        h.set("OBSERVER", HeaderValue::String("tester".into()));
        h.set("DATE-OBS", HeaderValue::String(self.date_obs.into()));
        h.set("EXPTIME", HeaderValue::Float(self.exposure));
        h.set("CCD-TEMP", HeaderValue::Float(self.temperature));
        h.set("FILTER", HeaderValue::String(self.filter.into()));
        h.set("OBJECT", HeaderValue::String(self.object.into()));
        h.set("XBINNING", HeaderValue::Integer(self.binning));
        if let Some(pattern) = self.bayer {
            h.set("BAYERPAT", HeaderValue::String(pattern.into()));
        }
        h
    }
}

/// Star field with a single Gaussian blob, plus a small gradient so the
/// frame has a non-zero spread.
pub fn star_field(h: usize, w: usize, cy: f64, cx: f64) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(r, c)| {
        let d2 = (r as f64 - cy).powi(2) + (c as f64 - cx).powi(2);
        (100.0 + r as f64 * 2.0 + 800.0 * (-d2 / 18.0).exp()) as f32
    })
}

/// Write a FITS frame, creating parent directories.
pub fn write_frame(path: &Path, data: &Array2<f32>, header: &FitsHeader) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    write_fits(path, data, header).unwrap();
    path.to_path_buf()
}

/// Write a 32x32 light frame described by `spec`.
pub fn write_light(path: &Path, spec: &LightSpec) -> PathBuf {
    write_frame(path, &star_field(32, 32, 16.0, 16.0), &spec.header())
}

/// Create an empty file; resolvers only look at names.
pub fn touch(path: &Path) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
    path.to_path_buf()
}

/// Master library for `instrument` with one temperature/date pack, holding
/// usable 32x32 masters: zero bias and dark, unit flat for filter `L`.
pub fn build_master_library(root: &Path, instrument: &str) {
    let bias = Array2::<f32>::zeros((32, 32));
    let flat = Array2::<f32>::from_elem((32, 32), 1.0);
    let header = FitsHeader::new();
    write_frame(
        &root.join(format!("Bias/{instrument}/-10degC/2022-12-01/bias_bin1.fit")),
        &bias,
        &header,
    );
    write_frame(
        &root.join(format!("Darks/{instrument}/-10degC/2022-12-01/dark_300s_bin1.fit")),
        &bias,
        &header,
    );
    write_frame(
        &root.join(format!("Flats/{instrument}/2022-12-15/flat_L_bin1.fit")),
        &flat,
        &header,
    );
}

/// Reference library with registration and normalization references for
/// `object` in filter `L`.
pub fn build_reference_library(root: &Path, object: &str) {
    let reference = star_field(32, 32, 16.0, 16.0);
    let header = FitsHeader::new();
    write_frame(
        &root.join(format!("registration/{object}_ref.fit")),
        &reference,
        &header,
    );
    write_frame(
        &root.join(format!("normalization/{object}_L_300s.fit")),
        &reference,
        &header,
    );
}

/// Every file below `root`, relative and sorted.
pub fn list_tree(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root).unwrap();
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    out
}
