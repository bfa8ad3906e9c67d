use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

use super::stats::{median_in_place, median_sigma};
use super::CosmeticParams;

/// Replace hot and cold pixels by the median of their 3x3 neighbourhood.
///
/// A pixel is a defect when it deviates from that median by more than
/// `params.sigma` times the global robust sigma. Returns the corrected image
/// and the number of replaced pixels.
pub fn correct_defects(data: &Array2<f32>, params: &CosmeticParams) -> (Array2<f32>, usize) {
    let (h, w) = data.dim();
    if h == 0 || w == 0 || !(params.hot || params.cold) {
        return (data.clone(), 0);
    }
    let (_, sigma) = median_sigma(data);
    let threshold = params.sigma * sigma;

    let fix_row = |row: usize| -> (Vec<f32>, usize) {
        let mut out = Vec::with_capacity(w);
        let mut fixed = 0;
        let mut window = Vec::with_capacity(8);
        for col in 0..w {
            let value = data[[row, col]];
            window.clear();
            for r in row.saturating_sub(1)..(row + 2).min(h) {
                for c in col.saturating_sub(1)..(col + 2).min(w) {
                    if r != row || c != col {
                        window.push(data[[r, c]]);
                    }
                }
            }
            let Some(local) = median_in_place(&mut window) else {
                out.push(value);
                continue;
            };
            let hot = params.hot && value - local > threshold;
            let cold = params.cold && local - value > threshold;
            if hot || cold {
                out.push(local);
                fixed += 1;
            } else {
                out.push(value);
            }
        }
        (out, fixed)
    };

    let rows: Vec<(Vec<f32>, usize)> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(fix_row).collect()
    } else {
        (0..h).map(fix_row).collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    let mut total = 0;
    for (row, (values, fixed)) in rows.into_iter().enumerate() {
        for (col, v) in values.into_iter().enumerate() {
            result[[row, col]] = v;
        }
        total += fixed;
    }
    (result, total)
}
