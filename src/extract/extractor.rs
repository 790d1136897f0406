use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::resources::{self, RasterInfo};
use crate::error::ExtractError;
use crate::model::ImageRef;

/// Image XObjects of a page's effective resources.
///
/// Entries are visited in resource-name order and Form XObjects are
/// descended into where they appear, so the images of `Fm0` are listed
/// before `Im0`. A form already on the current path is not entered again.
pub fn page_images(doc: &Document, page_id: ObjectId, page: u32) -> Result<Vec<ImageRef>, ExtractError> {
    let resources = resources::inherited_resources(doc, page_id)
        .map_err(|source| ExtractError::Unresolvable { page, source })?;

    let mut walk = Walk {
        doc,
        page,
        page_id,
        forms: Vec::new(),
        open_forms: HashSet::new(),
        images: Vec::new(),
    };
    if let Some(resources) = resources {
        walk.visit(resources)?;
    }

    log::debug!("Page {}: {} image(s)", page, walk.images.len());
    Ok(walk.images)
}

struct Walk<'a> {
    doc: &'a Document,
    page: u32,
    page_id: ObjectId,
    /// Form names from the page down to the resources being visited
    forms: Vec<Vec<u8>>,
    /// Form ids on the current path
    open_forms: HashSet<ObjectId>,
    images: Vec<ImageRef>,
}

impl Walk<'_> {
    fn visit(&mut self, resources: &Dictionary) -> Result<(), ExtractError> {
        let page = self.page;
        let doc = self.doc;
        let unresolvable = |source| ExtractError::Unresolvable { page, source };

        let Some(xobjects) = resources::xobjects(doc, resources).map_err(unresolvable)? else {
            return Ok(());
        };
        let mut entries: Vec<(&Vec<u8>, &Object)> = xobjects.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (name, entry) in entries {
            let id = match entry {
                Object::Reference(id) => *id,
                Object::Null => continue,
                _ => {
                    return Err(self.malformed(format!(
                        "XObject /{} is not an indirect reference",
                        String::from_utf8_lossy(name)
                    )))
                }
            };

            let object = doc.get_object(id).map_err(unresolvable)?;
            let Ok(stream) = object.as_stream() else {
                return Err(self.malformed(format!(
                    "XObject /{} ({} {}) is not a stream",
                    String::from_utf8_lossy(name),
                    id.0,
                    id.1
                )));
            };

            if resources::is_image(&stream.dict) {
                self.push(name, id, &stream.dict, stream.content.len());
            } else if resources::is_form(&stream.dict) {
                self.descend(name, id, &stream.dict)?;
            }
        }
        Ok(())
    }

    fn descend(&mut self, name: &[u8], id: ObjectId, dict: &Dictionary) -> Result<(), ExtractError> {
        let page = self.page;
        let Ok(resources) = dict.get(b"Resources") else {
            return Ok(());
        };
        let resources = resources::resolve(self.doc, resources)
            .and_then(Object::as_dict)
            .map_err(|source| ExtractError::Unresolvable { page, source })?;

        if !self.open_forms.insert(id) {
            log::debug!(
                "Page {}: form /{} draws itself, skipping",
                page,
                String::from_utf8_lossy(name)
            );
            return Ok(());
        }
        self.forms.push(name.to_vec());
        let visited = self.visit(resources);
        self.forms.pop();
        self.open_forms.remove(&id);
        visited
    }

    fn push(&mut self, name: &[u8], id: ObjectId, dict: &Dictionary, content_len: usize) {
        let info = RasterInfo::of(self.doc, dict);
        self.images.push(ImageRef {
            page: self.page,
            page_id: self.page_id,
            forms: self.forms.clone(),
            name: name.to_vec(),
            id,
            width: info.width,
            height: info.height,
            color_space: info.color_space,
            bits_per_component: info.bits_per_component,
            filters: info.filters,
            encoded_len: resources::encoded_len(self.doc, dict, content_len),
        });
    }

    fn malformed(&self, message: String) -> ExtractError {
        ExtractError::Malformed { page: self.page, message }
    }
}
