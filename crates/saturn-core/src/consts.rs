/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// FITS logical record size in bytes. Headers and data are padded to it.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card length in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Scale factor turning a median absolute deviation into a Gaussian sigma.
pub const MAD_TO_SIGMA: f32 = 1.4826;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;

/// Default sigma threshold for hot/cold pixel rejection.
pub const DEFAULT_COSMETIC_SIGMA: f32 = 5.0;

/// Default dark exposure tolerance in seconds.
pub const DEFAULT_EXPOSURE_TOLERANCE: f64 = 5.0;

/// File extensions recognised as frames when no list is configured.
pub const DEFAULT_FRAME_EXTENSIONS: [&str; 3] = ["fit", "fits", "fts"];

/// Subfolder collecting outputs for `PathMode::PutInRootSubfolder`.
pub const DEFAULT_ROOT_SUBFOLDER: &str = "processed";

/// Subfolder holding debayered channel frames.
pub const DEBAYERED_DIR: &str = "debayered";

/// Number of channel frames a CFA frame fans out into.
pub const COLOR_CHANNEL_COUNT: usize = 3;
