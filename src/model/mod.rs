pub mod image_ref;
pub mod pixels;
pub mod report;
pub mod selection;

pub use image_ref::ImageRef;
pub use pixels::{ColorMode, PixelBuffer, SourceFormat};
pub use report::{CompressionReport, ImageStats};
pub use selection::PageSelection;
