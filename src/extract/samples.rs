//! Unpacking of raw image samples into pixel buffers.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

use super::colorspace::ColorSpace;

/// How the sample bytes of an image are laid out
#[derive(Debug, Clone)]
pub struct SampleLayout<'a> {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: &'a ColorSpace,
    /// `/Decode` array, two values per component
    pub decode: Option<&'a [f32]>,
    /// Stencil mask: 1 bit per pixel, 0 paints unless `/Decode` is `[1 0]`
    pub image_mask: bool,
}

impl SampleLayout<'_> {
    fn components(&self) -> usize {
        if self.image_mask {
            1
        } else {
            self.color_space.components()
        }
    }

    fn bytes_per_row(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.components())?
            .checked_mul(usize::from(self.bits_per_component))
            .map(|bits| bits.div_ceil(8))
    }

    fn max_value(&self) -> u32 {
        (1u32 << self.bits_per_component.min(16)) - 1
    }
}

/// Convert sample bytes into an 8-bit image.
///
/// Gray and image masks become `Luma8`. Everything else becomes `Rgb8`,
/// CMYK through a plain subtractive conversion.
pub fn unpack(data: &[u8], layout: &SampleLayout) -> Result<DynamicImage, String> {
    let bpc = layout.bits_per_component;
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return Err(format!("unsupported bit depth {bpc}"));
    }
    if layout.image_mask && bpc != 1 {
        return Err("image masks must have 1 bit per component".to_string());
    }
    if !layout.image_mask && !layout.color_space.is_supported() {
        return Err(format!("unsupported colour space {:?}", layout.color_space));
    }
    if layout.width == 0 || layout.height == 0 {
        return Err("image has no pixels".to_string());
    }

    let components = layout.components();
    let too_large = || format!("image of {}x{} is too large", layout.width, layout.height);
    let row_len = layout.bytes_per_row().ok_or_else(too_large)?;
    let needed = row_len
        .checked_mul(layout.height as usize)
        .ok_or_else(too_large)?;
    if data.len() < needed {
        return Err(format!(
            "expected {needed} bytes of samples, found {}",
            data.len()
        ));
    }

    let mut values = Vec::with_capacity(layout.width as usize * layout.height as usize * components);
    for row in data[..needed].chunks(row_len) {
        let mut reader = BitReader::new(row, bpc);
        for _ in 0..layout.width as usize * components {
            values.push(reader.read());
        }
    }

    if layout.image_mask {
        let inverted = layout.decode.is_some_and(|d| d.first() == Some(&1.0));
        let luma = values
            .into_iter()
            .map(|v| if (v == 0) != inverted { 0 } else { 255 })
            .collect();
        return gray(layout, luma);
    }

    match layout.color_space {
        ColorSpace::Indexed { base, hival, lookup } => {
            let indices = values
                .into_iter()
                .map(|v| index_value(v, layout, *hival))
                .collect::<Vec<_>>();
            expand_palette(layout, &indices, base, lookup)
        }
        space => {
            let scaled = scale_components(&values, layout, components);
            match space {
                ColorSpace::Gray => gray(layout, scaled),
                ColorSpace::Rgb => rgb(layout, scaled),
                ColorSpace::Cmyk => rgb(layout, cmyk_to_rgb(&scaled)),
                _ => Err(format!("unsupported colour space {space:?}")),
            }
        }
    }
}

/// Map raw component values to 0-255 through `/Decode`
fn scale_components(values: &[u32], layout: &SampleLayout, components: usize) -> Vec<u8> {
    let max = layout.max_value() as f32;
    let ranges: Vec<(f32, f32)> = (0..components)
        .map(|c| match layout.decode {
            Some(decode) if decode.len() >= 2 * components => (decode[2 * c], decode[2 * c + 1]),
            _ => (0.0, 1.0),
        })
        .collect();
    let identity = ranges.iter().all(|&r| r == (0.0, 1.0));

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if identity && layout.bits_per_component == 8 {
                return v as u8;
            }
            let (dmin, dmax) = ranges[i % components];
            let normalized = dmin + v as f32 * (dmax - dmin) / max;
            (normalized.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}

fn index_value(value: u32, layout: &SampleLayout, hival: u8) -> u8 {
    let index = match layout.decode {
        Some(&[dmin, dmax, ..]) => {
            let max = layout.max_value() as f32;
            (dmin + value as f32 * (dmax - dmin) / max).round()
        }
        _ => value as f32,
    };
    index.clamp(0.0, f32::from(hival)) as u8
}

fn expand_palette(
    layout: &SampleLayout,
    indices: &[u8],
    base: &ColorSpace,
    lookup: &[u8],
) -> Result<DynamicImage, String> {
    let stride = base.components();
    let entry = |index: u8| {
        let start = usize::from(index) * stride;
        lookup.get(start..start + stride)
    };

    let mut samples = Vec::with_capacity(indices.len() * stride);
    for &index in indices {
        match entry(index) {
            Some(color) => samples.extend_from_slice(color),
            // short lookup tables are padded with black
            None => samples.extend(std::iter::repeat(0).take(stride)),
        }
    }

    match base {
        ColorSpace::Gray => gray(layout, samples),
        ColorSpace::Rgb => rgb(layout, samples),
        ColorSpace::Cmyk => rgb(layout, cmyk_to_rgb(&samples)),
        other => Err(format!("unsupported palette base {other:?}")),
    }
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for pixel in cmyk.chunks_exact(4) {
        let k = 1.0 - f32::from(pixel[3]) / 255.0;
        for &ink in &pixel[..3] {
            rgb.push(((1.0 - f32::from(ink) / 255.0) * k * 255.0).round() as u8);
        }
    }
    rgb
}

fn gray(layout: &SampleLayout, samples: Vec<u8>) -> Result<DynamicImage, String> {
    GrayImage::from_raw(layout.width, layout.height, samples)
        .map(DynamicImage::ImageLuma8)
        .ok_or_else(|| "gray sample buffer has the wrong size".to_string())
}

fn rgb(layout: &SampleLayout, samples: Vec<u8>) -> Result<DynamicImage, String> {
    RgbImage::from_raw(layout.width, layout.height, samples)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| "RGB sample buffer has the wrong size".to_string())
}

/// Attach a soft mask as alpha channel, scaling it to the image when sizes differ.
pub fn with_alpha(image: DynamicImage, alpha: &GrayImage) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let scaled;
    let alpha = if alpha.dimensions() == (width, height) {
        alpha
    } else {
        scaled = imageops::resize(alpha, width, height, FilterType::Triangle);
        &scaled
    };

    if image.color().channel_count() <= 2 {
        let luma = image.to_luma8();
        let mut out = GrayAlphaImage::new(width, height);
        for ((dst, src), a) in out.pixels_mut().zip(luma.pixels()).zip(alpha.pixels()) {
            dst.0 = [src.0[0], a.0[0]];
        }
        DynamicImage::ImageLumaA8(out)
    } else {
        let rgb = image.to_rgb8();
        let mut out = RgbaImage::new(width, height);
        for ((dst, src), a) in out.pixels_mut().zip(rgb.pixels()).zip(alpha.pixels()) {
            dst.0 = [src.0[0], src.0[1], src.0[2], a.0[0]];
        }
        DynamicImage::ImageRgba8(out)
    }
}

/// Reads big-endian samples of 1 to 16 bits; 16-bit samples are returned whole
struct BitReader<'a> {
    data: &'a [u8],
    bits: u8,
    position: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8], bits: u8) -> Self {
        Self {
            data,
            bits,
            position: 0,
        }
    }

    fn read(&mut self) -> u32 {
        let value = match self.bits {
            8 => u32::from(self.data.get(self.position / 8).copied().unwrap_or(0)),
            16 => {
                let at = self.position / 8;
                let high = self.data.get(at).copied().unwrap_or(0);
                let low = self.data.get(at + 1).copied().unwrap_or(0);
                u32::from(u16::from_be_bytes([high, low]))
            }
            bits => {
                let byte = self.data.get(self.position / 8).copied().unwrap_or(0);
                let shift = 8 - bits as usize - self.position % 8;
                u32::from(byte >> shift) & ((1 << bits) - 1)
            }
        };
        self.position += usize::from(self.bits);
        value
    }
}
