use image::{DynamicImage, GrayImage, ImageFormat};
use lopdf::{Dictionary, Document, Stream};

use super::colorspace::ColorSpace;
use super::filters::{decode_transport, FilterSpec};
use super::resources::{self, resolve};
use super::samples::{self, SampleLayout};
use crate::error::DecodeError;
use crate::model::{ImageRef, PixelBuffer, SourceFormat};

/// Outcome of the primary decoder.
///
/// `Unsupported` is not a failure: it routes the image to the fallback renderer.
#[derive(Debug, Clone)]
pub enum PrimaryDecode {
    Decoded(PixelBuffer),
    Unsupported(String),
}

enum SoftMask {
    Absent,
    Alpha(GrayImage),
    Unsupported(String),
}

/// Decode an image with the common cases only.
///
/// JPEG data (optionally behind Flate) and 8-bit gray or RGB samples that are
/// Flate-compressed or unfiltered are handled here. Everything else comes back
/// as [`PrimaryDecode::Unsupported`]. Errors mean the data claims a supported
/// format but is damaged.
pub fn decode_primary(doc: &Document, image: &ImageRef) -> Result<PrimaryDecode, DecodeError> {
    let stream = doc.get_object(image.id)?.as_stream()?;
    let dict = &stream.dict;

    if image.width == 0 || image.height == 0 {
        return Ok(unsupported("missing dimensions"));
    }
    if resources::boolean(doc, dict, b"ImageMask") == Some(true) {
        return Ok(unsupported("stencil mask"));
    }
    if dict.has(b"Decode") {
        return Ok(unsupported("/Decode array"));
    }

    let color_space = match dict.get(b"ColorSpace") {
        Ok(object) => ColorSpace::from_object(doc, object),
        Err(_) => return Ok(unsupported("no colour space")),
    };
    if !matches!(color_space, ColorSpace::Gray | ColorSpace::Rgb)
        || !matches!(
            image.color_space.as_deref(),
            Some("DeviceGray" | "DeviceRGB" | "ICCBased")
        )
    {
        return Ok(unsupported(&format!(
            "colour space {}",
            image.color_space.as_deref().unwrap_or("?")
        )));
    }

    let chain = FilterSpec::chain(doc, dict);
    let (format, decoded) = match chain.split_last() {
        Some((last, transport)) if last.name == "DCTDecode" && only_flate(transport) => {
            let jpeg = decode_transport(&stream.content, transport)?;
            let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)?;
            (SourceFormat::Jpeg, decoded)
        }
        _ if only_flate(&chain) && chain.len() <= 1 => {
            if image.bits_per_component != Some(8) {
                return Ok(unsupported(&format!(
                    "{} bits per component",
                    image.bits_per_component.unwrap_or(0)
                )));
            }
            (SourceFormat::Png, raw_samples(stream, &chain, image, &color_space)?)
        }
        _ => return Ok(unsupported(&format!("filters {:?}", image.filters))),
    };

    let decoded = match soft_mask(doc, dict)? {
        SoftMask::Absent => decoded,
        SoftMask::Alpha(alpha) => samples::with_alpha(decoded, &alpha),
        SoftMask::Unsupported(reason) => return Ok(PrimaryDecode::Unsupported(reason)),
    };

    Ok(PrimaryDecode::Decoded(PixelBuffer::new(decoded, format)))
}

fn unsupported(reason: &str) -> PrimaryDecode {
    PrimaryDecode::Unsupported(reason.to_string())
}

fn only_flate(chain: &[FilterSpec]) -> bool {
    chain.iter().all(|f| f.name == "FlateDecode")
}

fn raw_samples(
    stream: &Stream,
    chain: &[FilterSpec],
    image: &ImageRef,
    color_space: &ColorSpace,
) -> Result<DynamicImage, DecodeError> {
    let data = decode_transport(&stream.content, chain)?;
    let layout = SampleLayout {
        width: image.width,
        height: image.height,
        bits_per_component: 8,
        color_space,
        decode: None,
        image_mask: false,
    };
    samples::unpack(&data, &layout).map_err(DecodeError::Samples)
}

/// An 8-bit gray soft mask, Flate-compressed or unfiltered
fn soft_mask(doc: &Document, dict: &Dictionary) -> Result<SoftMask, DecodeError> {
    let Ok(reference) = dict.get(b"SMask") else {
        return Ok(SoftMask::Absent);
    };
    let Ok(mask) = resolve(doc, reference)?.as_stream() else {
        return Ok(SoftMask::Unsupported("soft mask is not a stream".to_string()));
    };

    let mask_dict = &mask.dict;
    let chain = FilterSpec::chain(doc, mask_dict);
    let width = resources::integer(doc, mask_dict, b"Width").and_then(|w| u32::try_from(w).ok());
    let height = resources::integer(doc, mask_dict, b"Height").and_then(|h| u32::try_from(h).ok());
    let gray = resources::name(doc, mask_dict, b"ColorSpace").map_or(true, |cs| cs == b"DeviceGray");

    let (Some(width), Some(height)) = (width, height) else {
        return Ok(SoftMask::Unsupported("soft mask without dimensions".to_string()));
    };
    if chain.len() > 1
        || !only_flate(&chain)
        || !gray
        || mask_dict.has(b"Decode")
        || resources::integer(doc, mask_dict, b"BitsPerComponent") != Some(8)
    {
        return Ok(SoftMask::Unsupported("soft mask format".to_string()));
    }

    let data = decode_transport(&mask.content, &chain)?;
    let layout = SampleLayout {
        width,
        height,
        bits_per_component: 8,
        color_space: &ColorSpace::Gray,
        decode: None,
        image_mask: false,
    };
    let alpha = samples::unpack(&data, &layout).map_err(DecodeError::Samples)?;
    Ok(SoftMask::Alpha(alpha.to_luma8()))
}
