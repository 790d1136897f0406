use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::extract::resources::{inherited_resources, resolve, xobjects};

/// Point the `/XObject` entry `name` reached from a page through `forms` at
/// `image_id`.
///
/// The page gets a direct copy of its effective resources and of their
/// `/XObject` dictionary first, so other pages sharing or inheriting the same
/// dictionaries keep their entries. Every form on the path is replaced by a
/// private copy the first time it is written to; `private` records those
/// copies so later substitutions on the same page reuse them.
pub fn substitute_image(
    doc: &mut Document,
    page_id: ObjectId,
    forms: &[Vec<u8>],
    name: &[u8],
    image_id: ObjectId,
    private: &mut HashSet<ObjectId>,
) -> lopdf::Result<()> {
    let Some((first, deeper)) = forms.split_first() else {
        return set_page_entry(doc, page_id, name, image_id);
    };

    let shared = entry_id(doc, inherited_resources(doc, page_id)?, first)?;
    let mut form = private_copy(doc, shared, private)?;
    if form != shared {
        set_page_entry(doc, page_id, first, form)?;
    }

    for inner in deeper {
        let shared = entry_id(doc, form_resources(doc, form)?, inner)?;
        let copy = private_copy(doc, shared, private)?;
        if copy != shared {
            set_form_entry(doc, form, inner, copy)?;
        }
        form = copy;
    }

    set_form_entry(doc, form, name, image_id)
}

fn set_page_entry(doc: &mut Document, page_id: ObjectId, name: &[u8], target: ObjectId) -> lopdf::Result<()> {
    let resources = with_entry(doc, inherited_resources(doc, page_id)?, name, target)?;
    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn set_form_entry(doc: &mut Document, form_id: ObjectId, name: &[u8], target: ObjectId) -> lopdf::Result<()> {
    let resources = with_entry(doc, form_resources(doc, form_id)?, name, target)?;
    doc.get_object_mut(form_id)?
        .as_stream_mut()?
        .dict
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Direct copy of `resources` with `/XObject /name` pointing at `target`
fn with_entry(
    doc: &Document,
    resources: Option<&Dictionary>,
    name: &[u8],
    target: ObjectId,
) -> lopdf::Result<Dictionary> {
    let mut resources = resources.cloned().unwrap_or_else(Dictionary::new);
    let mut xobject_dict = xobjects(doc, &resources)?.cloned().unwrap_or_else(Dictionary::new);

    xobject_dict.set(name.to_vec(), Object::Reference(target));
    resources.set("XObject", Object::Dictionary(xobject_dict));
    Ok(resources)
}

fn form_resources(doc: &Document, form_id: ObjectId) -> lopdf::Result<Option<&Dictionary>> {
    let form = doc.get_object(form_id)?.as_stream()?;
    match form.dict.get(b"Resources") {
        Ok(resources) => resolve(doc, resources)?.as_dict().map(Some),
        Err(_) => Ok(None),
    }
}

fn entry_id(doc: &Document, resources: Option<&Dictionary>, name: &[u8]) -> lopdf::Result<ObjectId> {
    let empty = Dictionary::new();
    let xobject_dict = match resources {
        Some(resources) => xobjects(doc, resources)?,
        None => None,
    };
    xobject_dict.unwrap_or(&empty).get(name)?.as_reference()
}

fn private_copy(doc: &mut Document, id: ObjectId, private: &mut HashSet<ObjectId>) -> lopdf::Result<ObjectId> {
    if private.contains(&id) {
        return Ok(id);
    }
    let copy = doc.get_object(id)?.clone();
    let copy_id = doc.add_object(copy);
    private.insert(copy_id);
    Ok(copy_id)
}
