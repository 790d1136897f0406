/// Default JPEG quality for recompressed images
pub const DEFAULT_QUALITY: u8 = 80;

/// Images are only re-encoded when lossless is off
pub const DEFAULT_LOSSLESS: bool = false;

pub const DEFAULT_REMOVE_IMAGES: bool = false;

/// Lossless rasters are converted to JPEG unless told otherwise
pub const DEFAULT_CONVERT_PNG: bool = true;

/// Appended to the input file stem when no output path is given
pub const OUTPUT_SUFFIX: &str = "_compressed";

pub const OUTPUT_EXTENSION: &str = "pdf";

/// Side length in pixels of the image that replaces removed images
pub const PLACEHOLDER_SIZE: u32 = 1;

/// RGB colour of the placeholder pixel
pub const PLACEHOLDER_COLOR: [u8; 3] = [255, 255, 255];

/// Bytes per MiB, used for the summary line
pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
