//! Locating and decoding the raster images of a page.

pub mod colorspace;
mod extractor;
pub mod fallback;
pub mod filters;
mod primary;
pub mod resources;
pub mod samples;

pub use extractor::page_images;
pub use fallback::{FallbackRenderer, LopdfRenderer, RasterEntry};
pub use primary::{decode_primary, PrimaryDecode};
pub use resources::RasterInfo;
