//! Stream filter decoding for image data.
//!
//! Transport filters (`FlateDecode`, `LZWDecode`, `ASCIIHexDecode`,
//! `ASCII85Decode`, `RunLengthDecode`) are undone here together with PNG and
//! TIFF predictors. `CCITTFaxDecode` is expanded to packed 1-bit rows. The
//! remaining image codecs end the chain and are handed back undecoded.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object};

use super::resources::{decode_params, filter_names};
use crate::error::FilterError;

/// One entry of a `/Filter` chain
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub name: String,
    pub params: Option<Dictionary>,
}

impl FilterSpec {
    #[cfg(test)]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
        }
    }

    #[cfg(test)]
    pub fn with_params(mut self, params: Dictionary) -> Self {
        self.params = Some(params);
        self
    }

    /// Filter chain of a stream dictionary in decoding order
    pub fn chain(doc: &Document, dict: &Dictionary) -> Vec<FilterSpec> {
        let names = filter_names(doc, dict);
        let params = decode_params(doc, dict, names.len());
        names
            .into_iter()
            .zip(params)
            .map(|(name, params)| FilterSpec { name, params })
            .collect()
    }

    fn param(&self, key: &[u8]) -> Option<i64> {
        self.params.as_ref()?.get(key).ok()?.as_i64().ok()
    }

    fn flag(&self, key: &[u8]) -> bool {
        matches!(
            self.params.as_ref().and_then(|p| p.get(key).ok()),
            Some(Object::Boolean(true))
        )
    }
}

/// Result of running a filter chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Unfiltered sample bytes
    Samples(Vec<u8>),
    /// A complete JPEG stream
    Dct(Vec<u8>),
    Jbig2,
    Jpx,
}

/// Run the whole chain, stopping at the first image codec.
pub fn decode_chain(data: &[u8], chain: &[FilterSpec]) -> Result<Payload, FilterError> {
    let mut current = data.to_vec();

    for (position, filter) in chain.iter().enumerate() {
        let last = position + 1 == chain.len();
        match filter.name.as_str() {
            "DCTDecode" if last => return Ok(Payload::Dct(current)),
            "CCITTFaxDecode" if last => {
                return ccitt(&current, &CcittParams::from_filter(filter)).map(Payload::Samples)
            }
            "JBIG2Decode" => return Ok(Payload::Jbig2),
            "JPXDecode" => return Ok(Payload::Jpx),
            "DCTDecode" | "CCITTFaxDecode" => {
                return Err(FilterError::Unsupported(format!(
                    "{} followed by further filters",
                    filter.name
                )))
            }
            _ => current = transport(&current, filter)?,
        }
    }

    Ok(Payload::Samples(current))
}

/// Undo transport filters only; image codecs are an error here.
pub fn decode_transport(data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>, FilterError> {
    chain
        .iter()
        .try_fold(data.to_vec(), |current, filter| transport(&current, filter))
}

fn transport(data: &[u8], filter: &FilterSpec) -> Result<Vec<u8>, FilterError> {
    match filter.name.as_str() {
        "FlateDecode" => predict(flate(data)?, filter),
        "LZWDecode" => predict(lzw(data, filter.param(b"EarlyChange").unwrap_or(1) != 0)?, filter),
        "ASCIIHexDecode" => ascii_hex(data),
        "ASCII85Decode" => ascii85(data),
        "RunLengthDecode" => run_length(data),
        "Crypt" => Ok(data.to_vec()),
        other => Err(FilterError::Unsupported(other.to_string())),
    }
}

pub fn flate(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut output = Vec::with_capacity(data.len() * 2);
    let mut decoder = ZlibDecoder::new(data);

    if let Err(err) = decoder.read_to_end(&mut output) {
        if output.is_empty() {
            return Err(FilterError::Corrupt {
                filter: "FlateDecode",
                message: err.to_string(),
            });
        }
        log::warn!("Truncated FlateDecode data, keeping {} bytes: {}", output.len(), err);
    }

    Ok(output)
}

fn lzw(data: &[u8], early_change: bool) -> Result<Vec<u8>, FilterError> {
    use weezl::{decode::Decoder, BitOrder};

    let mut decoder = if early_change {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };

    let mut output = Vec::with_capacity(data.len() * 2);
    let result = decoder.into_vec(&mut output).decode_all(data);
    if let Err(err) = result.status {
        if output.is_empty() {
            return Err(FilterError::Corrupt {
                filter: "LZWDecode",
                message: format!("{err:?}"),
            });
        }
        log::warn!("Damaged LZWDecode data, keeping {} bytes: {:?}", output.len(), err);
    }

    Ok(output)
}

fn ascii_hex(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = (byte as char).to_digit(16).ok_or_else(|| FilterError::Corrupt {
            filter: "ASCIIHexDecode",
            message: format!("invalid character {:?}", byte as char),
        })? as u8;
        match high.take() {
            Some(h) => output.push(h << 4 | nibble),
            None => high = Some(nibble),
        }
    }

    if let Some(h) = high {
        output.push(h << 4);
    }

    Ok(output)
}

fn ascii85(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let corrupt = |message: &str| FilterError::Corrupt {
        filter: "ASCII85Decode",
        message: message.to_string(),
    };

    let mut output = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut count = 0;

    let body = data.strip_prefix(b"<~").unwrap_or(data);
    for &byte in body {
        match byte {
            b'~' => break,
            b'z' if count == 0 => output.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[count] = byte - b'!';
                count += 1;
                if count == 5 {
                    output.extend_from_slice(&group_value(&group).ok_or_else(|| corrupt("group overflows"))?);
                    count = 0;
                }
            }
            _ if byte.is_ascii_whitespace() => {}
            _ => return Err(corrupt(&format!("invalid character {:?}", byte as char))),
        }
    }

    if count == 1 {
        return Err(corrupt("dangling final character"));
    }
    if count > 1 {
        group[count..].fill(84);
        let bytes = group_value(&group).ok_or_else(|| corrupt("final group overflows"))?;
        output.extend_from_slice(&bytes[..count - 1]);
    }

    Ok(output)
}

fn group_value(group: &[u8; 5]) -> Option<[u8; 4]> {
    group
        .iter()
        .try_fold(0u32, |acc, &digit| acc.checked_mul(85)?.checked_add(u32::from(digit)))
        .map(u32::to_be_bytes)
}

fn run_length(data: &[u8]) -> Result<Vec<u8>, FilterError> {
    let mut output = Vec::with_capacity(data.len() * 2);
    let mut pos = 0;

    while pos < data.len() {
        let length = data[pos] as usize;
        pos += 1;
        match length {
            128 => break,
            0..=127 => {
                let end = (pos + length + 1).min(data.len());
                output.extend_from_slice(&data[pos..end]);
                pos = end;
            }
            _ => {
                let Some(&byte) = data.get(pos) else {
                    return Err(FilterError::Corrupt {
                        filter: "RunLengthDecode",
                        message: "run without a byte to repeat".to_string(),
                    });
                };
                output.extend(std::iter::repeat(byte).take(257 - length));
                pos += 1;
            }
        }
    }

    Ok(output)
}

/// Apply `/Predictor` from the filter's parameters
fn predict(data: Vec<u8>, filter: &FilterSpec) -> Result<Vec<u8>, FilterError> {
    let predictor = filter.param(b"Predictor").unwrap_or(1);
    if predictor < 2 {
        return Ok(data);
    }

    let colors = filter.param(b"Colors").unwrap_or(1).max(1) as usize;
    let bits = filter.param(b"BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = filter.param(b"Columns").unwrap_or(1).max(1) as usize;
    let bytes_per_pixel = (colors * bits).div_ceil(8).max(1);
    let bytes_per_row = (colors * bits * columns).div_ceil(8);

    match predictor {
        2 => tiff_predictor(data, bits, bytes_per_pixel, bytes_per_row),
        10..=15 => Ok(png_predictor(&data, bytes_per_pixel, bytes_per_row)),
        other => Err(FilterError::Unsupported(format!("predictor {other}"))),
    }
}

fn png_predictor(data: &[u8], bytes_per_pixel: usize, bytes_per_row: usize) -> Vec<u8> {
    let mut previous = vec![0u8; bytes_per_row];
    let mut output = Vec::with_capacity(data.len());

    for chunk in data.chunks(bytes_per_row + 1) {
        if chunk.len() < bytes_per_row + 1 {
            log::debug!("Dropping incomplete predictor row of {} bytes", chunk.len());
            break;
        }
        let mut current = chunk[1..].to_vec();
        unfilter_row(chunk[0], bytes_per_pixel, &previous, &mut current);
        output.extend_from_slice(&current);
        previous = current;
    }

    output
}

fn unfilter_row(filter: u8, bpp: usize, previous: &[u8], current: &mut [u8]) {
    let len = current.len();
    let bpp = bpp.min(len);

    match filter {
        1 => {
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        2 => {
            for i in 0..len {
                current[i] = current[i].wrapping_add(previous[i]);
            }
        }
        3 => {
            for i in 0..len {
                let left = if i >= bpp { u16::from(current[i - bpp]) } else { 0 };
                let average = (left + u16::from(previous[i])) / 2;
                current[i] = current[i].wrapping_add(average as u8);
            }
        }
        4 => {
            for i in 0..len {
                let (left, upper_left) = if i >= bpp {
                    (current[i - bpp], previous[i - bpp])
                } else {
                    (0, 0)
                };
                current[i] = current[i].wrapping_add(paeth(left, previous[i], upper_left));
            }
        }
        _ => {}
    }
}

fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let estimate = i16::from(left) + i16::from(above) - i16::from(upper_left);
    let to_left = (estimate - i16::from(left)).abs();
    let to_above = (estimate - i16::from(above)).abs();
    let to_upper_left = (estimate - i16::from(upper_left)).abs();

    if to_left <= to_above && to_left <= to_upper_left {
        left
    } else if to_above <= to_upper_left {
        above
    } else {
        upper_left
    }
}

fn tiff_predictor(
    mut data: Vec<u8>,
    bits: usize,
    bytes_per_pixel: usize,
    bytes_per_row: usize,
) -> Result<Vec<u8>, FilterError> {
    match bits {
        8 => {
            for row in data.chunks_mut(bytes_per_row) {
                for i in bytes_per_pixel..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
                }
            }
        }
        16 => {
            for row in data.chunks_mut(bytes_per_row) {
                let mut i = bytes_per_pixel;
                while i + 1 < row.len() {
                    let left = u16::from_be_bytes([row[i - bytes_per_pixel], row[i + 1 - bytes_per_pixel]]);
                    let value = u16::from_be_bytes([row[i], row[i + 1]]).wrapping_add(left);
                    row[i..i + 2].copy_from_slice(&value.to_be_bytes());
                    i += 2;
                }
            }
        }
        other => {
            return Err(FilterError::Unsupported(format!(
                "TIFF predictor with {other} bits per component"
            )))
        }
    }
    Ok(data)
}

/// `/DecodeParms` of a `CCITTFaxDecode` filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcittParams {
    /// < 0: Group 4, >= 0: Group 3
    pub k: i64,
    pub columns: u32,
    pub rows: Option<u32>,
    pub black_is_1: bool,
}

impl Default for CcittParams {
    fn default() -> Self {
        Self {
            k: 0,
            columns: 1728,
            rows: None,
            black_is_1: false,
        }
    }
}

impl CcittParams {
    fn from_filter(filter: &FilterSpec) -> Self {
        let defaults = Self::default();
        Self {
            k: filter.param(b"K").unwrap_or(defaults.k),
            columns: filter
                .param(b"Columns")
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(defaults.columns),
            rows: filter.param(b"Rows").and_then(|r| u32::try_from(r).ok()),
            black_is_1: filter.flag(b"BlackIs1"),
        }
    }
}

/// Expand CCITT fax data into packed 1-bit rows.
///
/// Bits follow `/BlackIs1`: black pixels are 0 unless it is set.
pub fn ccitt(data: &[u8], params: &CcittParams) -> Result<Vec<u8>, FilterError> {
    let corrupt = |message: String| FilterError::Corrupt {
        filter: "CCITTFaxDecode",
        message,
    };

    let width = u16::try_from(params.columns)
        .map_err(|_| corrupt(format!("{} columns exceed the decoder limit", params.columns)))?;
    let height = params.rows.and_then(|r| u16::try_from(r).ok());
    let columns = usize::from(width);

    let mut output = Vec::new();
    let mut emit = |transitions: &[u16]| {
        output.extend(pack_row(transitions, columns, params.black_is_1));
    };

    let bytes = data.iter().copied();
    let finished = if params.k < 0 {
        fax::decoder::decode_g4(bytes, width, height, &mut emit)
    } else {
        fax::decoder::decode_g3(bytes, &mut emit)
    };

    if finished.is_none() && output.is_empty() {
        return Err(corrupt("decoder produced no rows".to_string()));
    }
    Ok(output)
}

/// Turn colour-change positions (starting on white) into one packed row
fn pack_row(transitions: &[u16], width: usize, black_is_1: bool) -> Vec<u8> {
    let mut row = vec![0u8; width.div_ceil(8)];
    let mut black = false;
    let mut start = 0usize;

    let ends = transitions
        .iter()
        .map(|&t| usize::from(t).min(width))
        .chain(std::iter::once(width));
    for end in ends {
        if black == black_is_1 {
            for pixel in start..end.max(start) {
                row[pixel / 8] |= 0x80 >> (pixel % 8);
            }
        }
        black = !black;
        start = end;
    }

    row
}
