use ndarray::Array2;

use crate::consts::MAD_TO_SIGMA;

/// Median of `values`, reordering the slice. `None` when empty.
pub fn median_in_place(values: &mut [f32]) -> Option<f32> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if len % 2 == 0 {
        let lower_max = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Some((lower_max + upper) * 0.5)
    } else {
        Some(upper)
    }
}

/// Robust location and scale of an image: `(median, sigma)` with sigma
/// estimated from the median absolute deviation.
pub fn median_sigma(data: &Array2<f32>) -> (f32, f32) {
    let mut values: Vec<f32> = data.iter().copied().filter(|v| v.is_finite()).collect();
    let Some(median) = median_in_place(&mut values) else {
        return (0.0, 0.0);
    };
    for v in values.iter_mut() {
        *v = (*v - median).abs();
    }
    let mad = median_in_place(&mut values).unwrap_or(0.0);
    (median, mad * MAD_TO_SIGMA)
}
