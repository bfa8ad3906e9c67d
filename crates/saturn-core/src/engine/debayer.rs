use ndarray::Array2;

use crate::frame::{BayerPattern, Channel};

/// Split a Bayer mosaic into half-resolution channel planes.
///
/// Each 2x2 cell becomes one pixel per channel; green is the mean of the two
/// green photosites. A trailing odd row or column is dropped.
pub fn superpixel_split(raw: &Array2<f32>, pattern: BayerPattern) -> [(Channel, Array2<f32>); 3] {
    let (h, w) = raw.dim();
    let (oh, ow) = (h / 2, w / 2);
    let (ry, rx) = pattern.red_offset();
    let (by, bx) = (1 - ry, 1 - rx);

    let red = Array2::from_shape_fn((oh, ow), |(r, c)| raw[[2 * r + ry, 2 * c + rx]]);
    let blue = Array2::from_shape_fn((oh, ow), |(r, c)| raw[[2 * r + by, 2 * c + bx]]);
    let green = Array2::from_shape_fn((oh, ow), |(r, c)| {
        0.5 * (raw[[2 * r + ry, 2 * c + bx]] + raw[[2 * r + by, 2 * c + rx]])
    });

    [
        (Channel::Red, red),
        (Channel::Green, green),
        (Channel::Blue, blue),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mosaic(pattern: BayerPattern) -> Array2<f32> {
        let (ry, rx) = pattern.red_offset();
        Array2::from_shape_fn((4, 6), |(r, c)| {
            let (cy, cx) = (r % 2, c % 2);
            if (cy, cx) == (ry, rx) {
                10.0
            } else if (cy, cx) == (1 - ry, 1 - rx) {
                30.0
            } else if cy == ry {
                18.0
            } else {
                22.0
            }
        })
    }

    #[test]
    fn every_pattern_separates_channels() {
        for pattern in [
            BayerPattern::RGGB,
            BayerPattern::GRBG,
            BayerPattern::GBRG,
            BayerPattern::BGGR,
        ] {
            let planes = superpixel_split(&mosaic(pattern), pattern);
            for (channel, plane) in &planes {
                assert_eq!(plane.dim(), (2, 3));
                let expected = match channel {
                    Channel::Red => 10.0,
                    Channel::Green => 20.0,
                    Channel::Blue => 30.0,
                };
                assert!(plane.iter().all(|&v| v == expected), "{pattern} {channel:?}");
            }
        }
    }
}
