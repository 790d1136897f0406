use jpeg_encoder::{ColorType, Encoder};
use lopdf::{dictionary, Stream};

use crate::error::RecompressError;
use crate::model::{ColorMode, PixelBuffer, SourceFormat};

/// What the recompressor does with a given source format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEncoding {
    Jpeg,
    PassThrough,
}

pub fn target_encoding(format: SourceFormat, convert_png: bool) -> TargetEncoding {
    match format {
        SourceFormat::Jpeg => TargetEncoding::Jpeg,
        SourceFormat::Png if convert_png => TargetEncoding::Jpeg,
        _ => TargetEncoding::PassThrough,
    }
}

/// A JPEG ready to replace an image XObject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// `DeviceGray` or `DeviceRGB`
    pub color_space: &'static str,
}

impl EncodedImage {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Image XObject stream holding this JPEG
    pub fn into_stream(self) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(self.width),
                "Height" => i64::from(self.height),
                "ColorSpace" => self.color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            self.bytes,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recompressed {
    Candidate(EncodedImage),
    PassThrough,
}

/// Re-encode a decoded image as JPEG at `quality`.
///
/// Buffers with an alpha channel are first composited onto opaque white; the
/// transparency does not survive. Luma buffers produce a one-component JPEG,
/// all others RGB. Formats that `target_encoding` passes through are returned
/// as [`Recompressed::PassThrough`] without encoding.
pub fn recompress(
    buffer: &PixelBuffer,
    quality: u8,
    convert_png: bool,
) -> Result<Recompressed, RecompressError> {
    if target_encoding(buffer.format, convert_png) == TargetEncoding::PassThrough {
        return Ok(Recompressed::PassThrough);
    }

    let (width, height) = (buffer.width(), buffer.height());
    let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(RecompressError::TooLarge { width, height });
    };

    let flattened;
    let buffer = if buffer.mode.has_alpha() {
        flattened = buffer.clone().flatten_onto_white();
        &flattened
    } else {
        buffer
    };

    let mut bytes = Vec::new();
    // Standard Huffman tables: optimized ones built from flat blocks come
    // back with shifted colours through the `image` decoder.
    let encoder = Encoder::new(&mut bytes, quality.clamp(1, 100));

    let color_space = if buffer.mode == ColorMode::Luma {
        encoder.encode(buffer.image.to_luma8().as_raw(), w, h, ColorType::Luma)?;
        "DeviceGray"
    } else {
        encoder.encode(buffer.image.to_rgb8().as_raw(), w, h, ColorType::Rgb)?;
        "DeviceRGB"
    };

    log::debug!(
        "Encoded {}x{} {} JPEG at quality {}: {} bytes",
        width,
        height,
        color_space,
        quality,
        bytes.len()
    );

    Ok(Recompressed::Candidate(EncodedImage {
        bytes,
        width,
        height,
        color_space,
    }))
}
