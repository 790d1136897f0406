use image::imageops;
use image::{DynamicImage, Rgba, RgbaImage};

/// Sample layout of a decoded image as it came out of the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgba,
    Rgb,
    Luma,
    LumaAlpha,
    /// Indexed colour whose transparency came from a soft mask
    PaletteAlpha,
}

impl ColorMode {
    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            ColorMode::Rgba | ColorMode::LumaAlpha | ColorMode::PaletteAlpha
        )
    }
}

/// What kind of encoding the image had inside the PDF.
///
/// `Jpeg` is DCT-encoded data, `Png` any lossless raster (Flate, LZW, raw
/// samples, or a bitmap rendered by the fallback path) and `Other` everything
/// the recompressor leaves alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Other,
}

/// A decoded image held in memory
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub mode: ColorMode,
    pub format: SourceFormat,
    pub image: DynamicImage,
}

impl PixelBuffer {
    pub fn new(image: DynamicImage, format: SourceFormat) -> Self {
        let mode = mode_of(&image);
        Self {
            mode,
            format,
            image,
        }
    }

    /// Buffer for an indexed image; carries `PaletteAlpha` when a soft mask was applied.
    pub fn from_palette(image: DynamicImage, format: SourceFormat) -> Self {
        let mut buffer = Self::new(image, format);
        if buffer.mode.has_alpha() {
            buffer.mode = ColorMode::PaletteAlpha;
        }
        buffer
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Composite onto an opaque white background.
    ///
    /// The result is 3-channel RGB and the original transparency is gone for
    /// good. Buffers without alpha are returned unchanged.
    pub fn flatten_onto_white(self) -> PixelBuffer {
        if !self.mode.has_alpha() {
            return self;
        }

        let rgba = self.image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, &rgba, 0, 0);
        let rgb = DynamicImage::ImageRgba8(canvas).into_rgb8();

        PixelBuffer {
            mode: ColorMode::Rgb,
            format: self.format,
            image: DynamicImage::ImageRgb8(rgb),
        }
    }
}

fn mode_of(image: &DynamicImage) -> ColorMode {
    let color = image.color();
    match (color.channel_count(), color.has_alpha()) {
        (1, _) => ColorMode::Luma,
        (2, _) => ColorMode::LumaAlpha,
        (_, true) => ColorMode::Rgba,
        _ => ColorMode::Rgb,
    }
}
