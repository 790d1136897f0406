use lopdf::{Document, Object};

use super::filters::{decode_transport, FilterSpec};
use super::resources::resolve;

/// Colour spaces the sample unpacker understands
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    Unsupported(String),
}

impl ColorSpace {
    /// Components per sample in the image data
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Unsupported(_) => 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        match self {
            ColorSpace::Unsupported(_) => false,
            ColorSpace::Indexed { base, .. } => base.is_supported(),
            _ => true,
        }
    }

    /// Interpret a `/ColorSpace` value
    pub fn from_object(doc: &Document, object: &Object) -> ColorSpace {
        let object = match resolve(doc, object) {
            Ok(object) => object,
            Err(err) => return ColorSpace::Unsupported(format!("unresolvable colour space: {err}")),
        };

        match object {
            Object::Name(name) => from_name(name),
            Object::Array(items) => from_array(doc, items),
            _ => ColorSpace::Unsupported("colour space is neither a name nor an array".to_string()),
        }
    }
}

fn from_name(name: &[u8]) -> ColorSpace {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => ColorSpace::Gray,
        b"DeviceRGB" | b"RGB" | b"CalRGB" => ColorSpace::Rgb,
        b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
        other => ColorSpace::Unsupported(String::from_utf8_lossy(other).into_owned()),
    }
}

fn from_array(doc: &Document, items: &[Object]) -> ColorSpace {
    let Some(family) = items
        .first()
        .and_then(|f| resolve(doc, f).ok())
        .and_then(|f| f.as_name().ok())
    else {
        return ColorSpace::Unsupported("empty colour space array".to_string());
    };

    match family {
        b"CalGray" => ColorSpace::Gray,
        b"CalRGB" => ColorSpace::Rgb,
        b"ICCBased" => icc_based(doc, items.get(1)),
        b"Indexed" | b"I" => indexed(doc, items),
        other => from_name(other),
    }
}

/// ICC profiles are approximated by the device space with the same component count
fn icc_based(doc: &Document, profile: Option<&Object>) -> ColorSpace {
    let Some(stream) = profile
        .and_then(|p| resolve(doc, p).ok())
        .and_then(|p| p.as_stream().ok())
    else {
        return ColorSpace::Unsupported("ICCBased without profile stream".to_string());
    };

    match stream.dict.get(b"N").and_then(Object::as_i64) {
        Ok(1) => ColorSpace::Gray,
        Ok(3) => ColorSpace::Rgb,
        Ok(4) => ColorSpace::Cmyk,
        _ => match stream.dict.get(b"Alternate") {
            Ok(alternate) => ColorSpace::from_object(doc, alternate),
            Err(_) => ColorSpace::Unsupported("ICCBased with unknown component count".to_string()),
        },
    }
}

fn indexed(doc: &Document, items: &[Object]) -> ColorSpace {
    if items.len() < 4 {
        return ColorSpace::Unsupported("Indexed colour space is too short".to_string());
    }

    let base = ColorSpace::from_object(doc, &items[1]);
    if matches!(base, ColorSpace::Indexed { .. }) || !base.is_supported() {
        return ColorSpace::Unsupported(format!("Indexed over {base:?}"));
    }

    let hival = match resolve(doc, &items[2]).and_then(Object::as_i64) {
        Ok(value) => value.clamp(0, 255) as u8,
        Err(_) => return ColorSpace::Unsupported("Indexed hival is not an integer".to_string()),
    };

    let lookup = match resolve(doc, &items[3]) {
        Ok(Object::String(bytes, _)) => bytes.clone(),
        Ok(Object::Stream(stream)) => {
            let chain = FilterSpec::chain(doc, &stream.dict);
            match decode_transport(&stream.content, &chain) {
                Ok(bytes) => bytes,
                Err(err) => return ColorSpace::Unsupported(format!("Indexed lookup: {err}")),
            }
        }
        _ => return ColorSpace::Unsupported("Indexed lookup is missing".to_string()),
    };

    ColorSpace::Indexed {
        base: Box::new(base),
        hival,
        lookup,
    }
}
