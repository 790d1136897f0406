//! Helpers for walking page resource graphs.

use lopdf::{Dictionary, Document, Object, ObjectId};

/// `/Parent` hops tolerated while looking for inherited resources
const MAX_PARENT_DEPTH: usize = 64;

/// Follow references until a direct object is reached
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    doc.dereference(object).map(|(_, object)| object)
}

/// Integer or real value as `f32`
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Integer entry of `dict`, following a reference if needed
pub fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    let object = dict.get(key).ok()?;
    resolve(doc, object).ok()?.as_i64().ok()
}

pub fn boolean(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<bool> {
    let object = dict.get(key).ok()?;
    match resolve(doc, object).ok()? {
        Object::Boolean(value) => Some(*value),
        _ => None,
    }
}

pub fn name<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    let object = dict.get(key).ok()?;
    resolve(doc, object).ok()?.as_name().ok()
}

/// Numeric array entry such as `/Decode`
pub fn numbers(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<f32>> {
    let object = dict.get(key).ok()?;
    let array = resolve(doc, object).ok()?.as_array().ok()?;
    array
        .iter()
        .map(|item| resolve(doc, item).ok().and_then(number))
        .collect()
}

/// Resource dictionary of a page, inherited through `/Parent` when the page has none.
pub fn inherited_resources(doc: &Document, page_id: ObjectId) -> lopdf::Result<Option<&Dictionary>> {
    let mut node = doc.get_dictionary(page_id)?;

    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve(doc, resources)?.as_dict().map(Some);
        }
        match node.get(b"Parent") {
            Ok(parent) => node = resolve(doc, parent)?.as_dict()?,
            Err(_) => return Ok(None),
        }
    }

    Ok(None)
}

/// The `/XObject` subdictionary of a resource dictionary
pub fn xobjects<'a>(doc: &'a Document, resources: &'a Dictionary) -> lopdf::Result<Option<&'a Dictionary>> {
    match resources.get(b"XObject") {
        Ok(object) => resolve(doc, object)?.as_dict().map(Some),
        Err(_) => Ok(None),
    }
}

pub fn is_image(dict: &Dictionary) -> bool {
    subtype(dict) == Some(b"Image".as_slice())
}

pub fn is_form(dict: &Dictionary) -> bool {
    subtype(dict) == Some(b"Form".as_slice())
}

fn subtype(dict: &Dictionary) -> Option<&[u8]> {
    dict.get(b"Subtype").and_then(Object::as_name).ok()
}

/// Declared colour space family: `DeviceRGB`, `ICCBased`, `Indexed`, ...
pub fn color_space_family(doc: &Document, dict: &Dictionary) -> Option<String> {
    let object = resolve(doc, dict.get(b"ColorSpace").ok()?).ok()?;
    let family = match object {
        Object::Name(name) => name.as_slice(),
        Object::Array(items) => resolve(doc, items.first()?).ok()?.as_name().ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(family).into_owned())
}

/// Filter names in decoding order, abbreviations expanded
pub fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let Some(object) = dict.get(b"Filter").ok().and_then(|f| resolve(doc, f).ok()) else {
        return Vec::new();
    };
    let names: Vec<&Object> = match object {
        Object::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    names
        .into_iter()
        .filter_map(|item| resolve(doc, item).ok()?.as_name().ok())
        .map(|name| expand_filter_abbreviation(name).to_string())
        .collect()
}

/// `/DecodeParms` for each filter, `None` where absent or null
pub fn decode_params(doc: &Document, dict: &Dictionary, count: usize) -> Vec<Option<Dictionary>> {
    let parms = dict
        .get(b"DecodeParms")
        .or_else(|_| dict.get(b"DP"))
        .ok()
        .and_then(|p| resolve(doc, p).ok());

    let as_dict = |object: &Object| -> Option<Dictionary> {
        resolve(doc, object).ok()?.as_dict().ok().cloned()
    };

    match parms {
        Some(Object::Array(items)) => (0..count)
            .map(|i| items.get(i).and_then(|item| as_dict(item)))
            .collect(),
        Some(Object::Dictionary(params)) => {
            let mut all = vec![None; count];
            if let Some(first) = all.first_mut() {
                *first = Some(params.clone());
            }
            all
        }
        _ => vec![None; count],
    }
}

fn expand_filter_abbreviation(name: &[u8]) -> &str {
    match name {
        b"AHx" => "ASCIIHexDecode",
        b"A85" => "ASCII85Decode",
        b"LZW" => "LZWDecode",
        b"Fl" => "FlateDecode",
        b"RL" => "RunLengthDecode",
        b"CCF" => "CCITTFaxDecode",
        b"DCT" => "DCTDecode",
        other => std::str::from_utf8(other).unwrap_or("Unknown"),
    }
}

/// Bytes an image occupies in the file: its stream plus its soft mask
pub fn encoded_len(doc: &Document, dict: &Dictionary, content_len: usize) -> u64 {
    let smask_len = dict
        .get(b"SMask")
        .ok()
        .and_then(|smask| resolve(doc, smask).ok())
        .and_then(|smask| smask.as_stream().ok())
        .map_or(0, |smask| smask.content.len());
    (content_len + smask_len) as u64
}

/// Shape of an image XObject as declared in its dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub color_space: Option<String>,
    pub bits_per_component: Option<u8>,
    pub filters: Vec<String>,
    pub image_mask: bool,
}

impl RasterInfo {
    pub fn of(doc: &Document, dict: &Dictionary) -> Self {
        let dimension = |key: &[u8]| {
            integer(doc, dict, key)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        };
        let image_mask = boolean(doc, dict, b"ImageMask").unwrap_or(false);
        Self {
            width: dimension(b"Width"),
            height: dimension(b"Height"),
            color_space: color_space_family(doc, dict),
            bits_per_component: integer(doc, dict, b"BitsPerComponent")
                .and_then(|v| u8::try_from(v).ok())
                .or(if image_mask { Some(1) } else { None }),
            filters: filter_names(doc, dict),
            image_mask,
        }
    }
}
