//! Built-in engine working directly on FITS files with `ndarray`.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::debug;

use crate::consts::EPSILON;
use crate::error::{Result, SaturnError};
use crate::frame::{BayerPattern, Channel, Frame};
use crate::io::fits::HeaderValue;
use crate::resolve::MasterFrameSet;

use super::align::{compute_offset, shift_array};
use super::cosmetic::correct_defects;
use super::debayer::superpixel_split;
use super::stats::median_sigma;
use super::{CosmeticParams, ImageEngine};

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeEngine;

impl ImageEngine for NativeEngine {
    fn name(&self) -> &str {
        "native"
    }

    fn calibrate(
        &self,
        target: &Path,
        masters: &MasterFrameSet,
        frame_exposure: f64,
        output: &Path,
    ) -> Result<PathBuf> {
        let mut light = Frame::load(target)?;
        let bias = load_matching(&masters.bias, &light.data)?;
        let dark = load_matching(&masters.dark, &light.data)?;
        let flat = load_matching(&masters.flat, &light.data)?;

        let dark_scale = if masters.dark_exposure > f64::from(EPSILON) {
            (frame_exposure / masters.dark_exposure) as f32
        } else {
            1.0
        };
        let flat_mean = flat.mean().unwrap_or(0.0);
        if flat_mean.abs() <= EPSILON {
            return Err(SaturnError::Engine(format!(
                "Flat master has zero mean: {}",
                masters.flat.display()
            )));
        }

        ndarray::Zip::from(&mut light.data)
            .and(&bias)
            .and(&dark)
            .and(&flat)
            .for_each(|l, &b, &d, &f| {
                let signal = *l - b - d * dark_scale;
                let gain = f / flat_mean;
                *l = if gain.abs() > EPSILON {
                    signal / gain
                } else {
                    signal
                };
            });

        debug!(dark_scale, flat_mean, "Calibrated frame");
        light.header.push_history(&format!(
            "Calibrated: bias={} dark={} flat={}",
            file_name(&masters.bias),
            file_name(&masters.dark),
            file_name(&masters.flat)
        ));
        light.save(output)?;
        Ok(output.to_path_buf())
    }

    fn cosmetic_correct(
        &self,
        target: &Path,
        params: &CosmeticParams,
        output: &Path,
    ) -> Result<PathBuf> {
        let mut frame = Frame::load(target)?;
        let (data, fixed) = correct_defects(&frame.data, params);
        debug!(fixed, "Replaced defective pixels");
        frame.data = data;
        frame
            .header
            .push_history(&format!("Cosmetic correction: {fixed} pixels replaced"));
        frame.save(output)?;
        Ok(output.to_path_buf())
    }

    fn debayer(
        &self,
        target: &Path,
        pattern: BayerPattern,
        outputs: &[(Channel, PathBuf)],
    ) -> Result<Vec<PathBuf>> {
        let frame = Frame::load(target)?;
        if frame.width() < 2 || frame.height() < 2 {
            return Err(SaturnError::Engine(format!(
                "Frame too small to debayer: {}",
                target.display()
            )));
        }
        let mut written = Vec::with_capacity(outputs.len());
        for (channel, plane) in superpixel_split(&frame.data, pattern) {
            let Some((_, path)) = outputs.iter().find(|(c, _)| *c == channel) else {
                continue;
            };
            let mut header = frame.header.clone();
            header.remove("BAYERPAT");
            header.set("FILTER", HeaderValue::String(channel.tag().into()));
            header.push_history(&format!("Debayered ({pattern} superpixel)"));
            Frame::new(plane, header).save(path)?;
            written.push(path.clone());
        }
        Ok(written)
    }

    fn register(&self, target: &Path, reference: &Path, output: &Path) -> Result<PathBuf> {
        let mut frame = Frame::load(target)?;
        let reference = load_matching(reference, &frame.data)?;
        let offset = compute_offset(&reference, &frame.data)?;
        debug!(dx = offset.dx, dy = offset.dy, "Registration offset");
        frame.data = shift_array(&frame.data, offset);
        frame.header.push_history(&format!(
            "Registered: dx={:.2} dy={:.2}",
            offset.dx, offset.dy
        ));
        frame.save(output)?;
        Ok(output.to_path_buf())
    }

    fn normalize(&self, target: &Path, reference: &Path, output: &Path) -> Result<PathBuf> {
        let mut frame = Frame::load(target)?;
        let reference = Frame::load(reference)?;
        let (ref_median, ref_sigma) = median_sigma(&reference.data);
        let (median, sigma) = median_sigma(&frame.data);
        let scale = if sigma > EPSILON {
            ref_sigma / sigma
        } else {
            1.0
        };
        frame
            .data
            .mapv_inplace(|v| (v - median) * scale + ref_median);
        frame.header.push_history(&format!(
            "Normalized: scale={scale:.4} offset={:.2}",
            ref_median - median * scale
        ));
        frame.save(output)?;
        Ok(output.to_path_buf())
    }
}

/// Load a frame that must have the same size as `like`.
fn load_matching(path: &Path, like: &Array2<f32>) -> Result<Array2<f32>> {
    let frame = Frame::load(path)?;
    let (h, w) = like.dim();
    if frame.data.dim() != (h, w) {
        return Err(SaturnError::DimensionMismatch {
            expected_w: w,
            expected_h: h,
            actual_w: frame.width(),
            actual_h: frame.height(),
        });
    }
    Ok(frame.data)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
