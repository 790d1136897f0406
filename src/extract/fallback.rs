//! Filter-agnostic image renderer over an independently opened document.
//!
//! Used when the primary decoder reports an image as unsupported. Lookups are
//! confined to the inventory of the page being processed.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::colorspace::ColorSpace;
use super::filters::{decode_chain, FilterSpec, Payload};
use super::resources::{self, resolve, RasterInfo};
use super::samples::{self, SampleLayout};
use crate::error::FallbackError;
use crate::model::{PixelBuffer, SourceFormat};

/// One raster image reachable from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterEntry {
    pub id: ObjectId,
    pub info: RasterInfo,
}

/// Renders images the primary decoder cannot handle.
pub trait FallbackRenderer {
    /// Every raster image reachable from the page at `page_index` (0-based),
    /// including images nested in form XObjects.
    fn inventory(&mut self, page_index: usize) -> Result<&[RasterEntry], FallbackError>;

    /// Decode image `id` at native resolution.
    ///
    /// Fails with [`FallbackError::NotFound`] unless `id` is in the page's inventory.
    fn render(&mut self, page_index: usize, id: ObjectId) -> Result<PixelBuffer, FallbackError>;
}

/// [`FallbackRenderer`] backed by a second `lopdf` view of the input file.
///
/// The file is parsed on first use.
pub struct LopdfRenderer {
    path: Option<PathBuf>,
    doc: Option<Document>,
    inventories: HashMap<usize, Vec<RasterEntry>>,
}

impl LopdfRenderer {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            doc: None,
            inventories: HashMap::new(),
        }
    }

    pub fn from_document(doc: Document) -> Self {
        Self {
            path: None,
            doc: Some(doc),
            inventories: HashMap::new(),
        }
    }

    fn document(&mut self) -> Result<&Document, FallbackError> {
        if self.doc.is_none() {
            if let Some(path) = &self.path {
                let doc = Document::load(path).map_err(|source| FallbackError::Open {
                    path: path.clone(),
                    source,
                })?;
                log::debug!("Opened {} for fallback rendering", path.display());
                self.doc = Some(doc);
            }
        }
        self.doc
            .as_ref()
            .ok_or_else(|| FallbackError::NotRenderable("no document to render from".to_string()))
    }
}

impl FallbackRenderer for LopdfRenderer {
    fn inventory(&mut self, page_index: usize) -> Result<&[RasterEntry], FallbackError> {
        if !self.inventories.contains_key(&page_index) {
            let entries = collect_inventory(self.document()?, page_index)?;
            log::debug!(
                "Page index {}: {} raster(s) in fallback inventory",
                page_index,
                entries.len()
            );
            self.inventories.insert(page_index, entries);
        }
        Ok(self
            .inventories
            .get(&page_index)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    fn render(&mut self, page_index: usize, id: ObjectId) -> Result<PixelBuffer, FallbackError> {
        if !self.inventory(page_index)?.iter().any(|entry| entry.id == id) {
            return Err(FallbackError::NotFound {
                page: page_index,
                id,
            });
        }
        render_image(self.document()?, id)
    }
}

fn collect_inventory(doc: &Document, page_index: usize) -> Result<Vec<RasterEntry>, FallbackError> {
    let ordinal = u32::try_from(page_index + 1).map_err(|_| FallbackError::PageOutOfRange(page_index))?;
    let pages = doc.get_pages();
    let page_id = *pages
        .get(&ordinal)
        .ok_or(FallbackError::PageOutOfRange(page_index))?;

    let mut entries = Vec::new();
    if let Some(page_resources) = resources::inherited_resources(doc, page_id)? {
        let mut visited = HashSet::new();
        walk_resources(doc, page_resources, &mut visited, &mut entries);
    }
    Ok(entries)
}

fn walk_resources(
    doc: &Document,
    resource_dict: &Dictionary,
    visited: &mut HashSet<ObjectId>,
    entries: &mut Vec<RasterEntry>,
) {
    let xobjects = match resources::xobjects(doc, resource_dict) {
        Ok(Some(xobjects)) => xobjects,
        Ok(None) => return,
        Err(err) => {
            log::debug!("Skipping unreadable XObject dictionary: {}", err);
            return;
        }
    };

    for (_, entry) in xobjects.iter() {
        let Object::Reference(id) = entry else {
            continue;
        };
        if !visited.insert(*id) {
            continue;
        }
        let Ok(stream) = doc.get_object(*id).and_then(Object::as_stream) else {
            continue;
        };

        if resources::is_image(&stream.dict) {
            entries.push(RasterEntry {
                id: *id,
                info: RasterInfo::of(doc, &stream.dict),
            });
        } else if resources::is_form(&stream.dict) {
            let nested = stream
                .dict
                .get(b"Resources")
                .and_then(|r| resolve(doc, r))
                .and_then(Object::as_dict);
            if let Ok(nested) = nested {
                walk_resources(doc, nested, visited, entries);
            }
        }
    }
}

/// Decode an image stream and apply its soft mask when one can be decoded
fn render_image(doc: &Document, id: ObjectId) -> Result<PixelBuffer, FallbackError> {
    let stream = doc.get_object(id)?.as_stream()?;
    let Raster { mut image, indexed, format } = rasterize(doc, stream)?;

    if let Ok(mask) = stream.dict.get(b"SMask") {
        match resolve(doc, mask)
            .and_then(Object::as_stream)
            .map_err(FallbackError::from)
            .and_then(|mask| rasterize(doc, mask))
        {
            Ok(mask) => image = samples::with_alpha(image, &mask.image.to_luma8()),
            Err(err) => log::warn!("Ignoring soft mask of image {} {}: {}", id.0, id.1, err),
        }
    }

    Ok(if indexed {
        PixelBuffer::from_palette(image, format)
    } else {
        PixelBuffer::new(image, format)
    })
}

/// One decoded image stream, soft mask not applied
struct Raster {
    image: DynamicImage,
    /// Samples were palette indices
    indexed: bool,
    /// `Jpeg` when the samples came out of a DCT stream
    format: SourceFormat,
}

fn rasterize(doc: &Document, stream: &Stream) -> Result<Raster, FallbackError> {
    let dict = &stream.dict;
    let info = RasterInfo::of(doc, dict);
    if info.width == 0 || info.height == 0 {
        return Err(FallbackError::NotRenderable("missing dimensions".to_string()));
    }

    let chain = FilterSpec::chain(doc, dict);
    let payload = decode_chain(&stream.content, &chain)?;

    let color_space = if info.image_mask {
        ColorSpace::Gray
    } else {
        match dict.get(b"ColorSpace") {
            Ok(object) => ColorSpace::from_object(doc, object),
            Err(_) if matches!(payload, Payload::Dct(_)) => ColorSpace::Rgb,
            Err(_) => return Err(FallbackError::NotRenderable("no colour space".to_string())),
        }
    };
    let decode = resources::numbers(doc, dict, b"Decode");
    let indexed = matches!(color_space, ColorSpace::Indexed { .. });
    let format = match payload {
        Payload::Dct(_) => SourceFormat::Jpeg,
        _ => SourceFormat::Png,
    };

    let image = match payload {
        Payload::Samples(data) => {
            let bits_per_component = info
                .bits_per_component
                .ok_or_else(|| FallbackError::Samples("missing /BitsPerComponent".to_string()))?;
            let layout = SampleLayout {
                width: info.width,
                height: info.height,
                bits_per_component,
                color_space: &color_space,
                decode: decode.as_deref(),
                image_mask: info.image_mask,
            };
            samples::unpack(&data, &layout).map_err(FallbackError::Samples)?
        }
        Payload::Dct(data) => {
            let mut image = image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?;
            if decode.as_deref().is_some_and(|d| d.first() == Some(&1.0)) {
                image.invert();
            }
            image
        }
        Payload::Jbig2 => return Err(FallbackError::NotRenderable("JBIG2Decode".to_string())),
        Payload::Jpx => return Err(FallbackError::NotRenderable("JPXDecode".to_string())),
    };

    Ok(Raster { image, indexed, format })
}
