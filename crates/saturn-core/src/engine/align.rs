//! Translation-only registration by FFT phase correlation.

use ndarray::Array2;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::error::{Result, SaturnError};

/// Shift that maps a target frame onto its reference, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

/// Offset to apply to `target` (via [`shift_array`]) so it lines up with
/// `reference`.
pub fn compute_offset(reference: &Array2<f32>, target: &Array2<f32>) -> Result<Offset> {
    let (h, w) = reference.dim();
    let (th, tw) = target.dim();
    if h != th || w != tw {
        return Err(SaturnError::DimensionMismatch {
            expected_w: w,
            expected_h: h,
            actual_w: tw,
            actual_h: th,
        });
    }
    if h < 3 || w < 3 {
        return Ok(Offset::default());
    }

    let mut planner = FftPlanner::new();
    let ref_fft = fft2d(&windowed(reference), &mut planner, false);
    let tgt_fft = fft2d(&windowed(target), &mut planner, false);

    let cross = Array2::from_shape_fn((h, w), |idx| {
        let c = ref_fft[idx] * tgt_fft[idx].conj();
        let mag = c.norm();
        if mag > 1e-12 {
            c / mag
        } else {
            Complex::new(0.0, 0.0)
        }
    });
    let correlation = fft2d(&cross, &mut planner, true).mapv(|c| c.re);

    let (peak_row, peak_col) = argmax(&correlation);
    let wrap = |peak: usize, n: usize| {
        if peak > n / 2 {
            peak as f64 - n as f64
        } else {
            peak as f64
        }
    };
    let (sub_dy, sub_dx) = refine_peak(&correlation, peak_row, peak_col);

    Ok(Offset {
        dx: wrap(peak_col, w) + sub_dx,
        dy: wrap(peak_row, h) + sub_dy,
    })
}

/// Shift an image by `offset` with bilinear interpolation. Pixels shifted in
/// from outside the frame are zero.
pub fn shift_array(data: &Array2<f32>, offset: Offset) -> Array2<f32> {
    Array2::from_shape_fn(data.dim(), |(row, col)| {
        bilinear_sample(data, row as f64 - offset.dy, col as f64 - offset.dx)
    })
}

/// Hann-windowed complex copy of `data`, reducing edge leakage.
fn windowed(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let hann = |i: usize, n: usize| 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / n as f64).cos());
    Array2::from_shape_fn((h, w), |(r, c)| {
        Complex::new(data[[r, c]] as f64 * hann(r, h) * hann(c, w), 0.0)
    })
}

/// Separable 2D FFT; the inverse transform is normalised by `1/(h*w)`.
fn fft2d(
    data: &Array2<Complex<f64>>,
    planner: &mut FftPlanner<f64>,
    inverse: bool,
) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let plan = |planner: &mut FftPlanner<f64>, n: usize| -> Arc<dyn Fft<f64>> {
        if inverse {
            planner.plan_fft_inverse(n)
        } else {
            planner.plan_fft_forward(n)
        }
    };
    let row_fft = plan(planner, w);
    let col_fft = plan(planner, h);

    let mut work = data.clone();
    for mut row in work.rows_mut() {
        let mut buf: Vec<Complex<f64>> = row.to_vec();
        row_fft.process(&mut buf);
        row.assign(&ndarray::ArrayView1::from(&buf[..]));
    }
    for mut col in work.columns_mut() {
        let mut buf: Vec<Complex<f64>> = col.to_vec();
        col_fft.process(&mut buf);
        col.assign(&ndarray::ArrayView1::from(&buf[..]));
    }
    if inverse {
        let scale = 1.0 / (h * w) as f64;
        work.mapv_inplace(|c| c * scale);
    }
    work
}

fn argmax(data: &Array2<f64>) -> (usize, usize) {
    let mut best = ((0, 0), f64::NEG_INFINITY);
    for ((r, c), &v) in data.indexed_iter() {
        if v > best.1 {
            best = ((r, c), v);
        }
    }
    best.0
}

/// Sub-pixel peak position from a 1D parabola through each axis' neighbours.
fn refine_peak(corr: &Array2<f64>, row: usize, col: usize) -> (f64, f64) {
    let (h, w) = corr.dim();
    if row == 0 || row + 1 >= h || col == 0 || col + 1 >= w {
        return (0.0, 0.0);
    }
    let vertex = |prev: f64, curr: f64, next: f64| {
        let denom = prev - 2.0 * curr + next;
        if denom.abs() > 1e-12 {
            ((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };
    (
        vertex(corr[[row - 1, col]], corr[[row, col]], corr[[row + 1, col]]),
        vertex(corr[[row, col - 1]], corr[[row, col]], corr[[row, col + 1]]),
    )
}

fn bilinear_sample(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    sample(y0, x0) * (1.0 - fx) * (1.0 - fy)
        + sample(y0, x0 + 1) * fx * (1.0 - fy)
        + sample(y0 + 1, x0) * (1.0 - fx) * fy
        + sample(y0 + 1, x0 + 1) * fx * fy
}
