//! Building the output document from the retained pages.

mod images;
mod lossless;
mod resources;

use lopdf::{Document, ObjectId};

use crate::config::Policy;
use crate::error::CompressError;
use crate::extract::FallbackRenderer;
use crate::model::{ImageStats, PageSelection};

pub use images::ImagePass;
pub use lossless::{compress_plain_streams, normalize_content};
pub use resources::substitute_image;

/// The output document before it is written
#[derive(Debug)]
pub struct Assembled {
    pub doc: Document,
    /// (input ordinal, page id) of every retained page, in order
    pub pages: Vec<(u32, ObjectId)>,
    pub images: ImageStats,
}

/// Build the output document.
///
/// Pages outside the selection are deleted together with the objects only
/// they used. A lossless policy then normalizes content streams and leaves
/// images alone; otherwise every image goes through the image pass.
pub fn assemble(
    input: &Document,
    policy: &Policy,
    fallback: &mut dyn FallbackRenderer,
) -> Result<Assembled, CompressError> {
    let mut doc = input.clone();
    let pages = retain_pages(&mut doc, &policy.selection)?;
    log::info!("Retained {} page(s)", pages.len());

    let images = if policy.lossless {
        for &(ordinal, page_id) in &pages {
            normalize_content(&mut doc, page_id).map_err(|source| {
                CompressError::LosslessNormalization {
                    page: ordinal,
                    source,
                }
            })?;
        }
        ImageStats::default()
    } else {
        ImagePass::new(policy, fallback).run(&mut doc, &pages)
    };

    let pruned = doc.prune_objects();
    if !pruned.is_empty() {
        log::debug!("Pruned {} orphaned object(s)", pruned.len());
    }
    compress_plain_streams(&mut doc);

    Ok(Assembled { doc, pages, images })
}

/// Delete pages outside `selection` and return the survivors in document order
fn retain_pages(doc: &mut Document, selection: &PageSelection) -> Result<Vec<(u32, ObjectId)>, CompressError> {
    let all_pages = doc.get_pages();
    let page_count = all_pages.len();

    for ordinal in selection.out_of_range(page_count as u32) {
        log::warn!(
            "Page {} is beyond the end of the document ({} pages), ignoring it",
            ordinal,
            page_count
        );
    }

    let (kept, dropped): (Vec<_>, Vec<_>) = all_pages
        .into_iter()
        .partition(|&(ordinal, _)| selection.contains(ordinal));

    if kept.is_empty() {
        return Err(CompressError::EmptySelection { page_count });
    }

    if !dropped.is_empty() {
        let ordinals: Vec<u32> = dropped.iter().map(|&(ordinal, _)| ordinal).collect();
        log::info!("Dropping {} page(s)", ordinals.len());
        doc.delete_pages(&ordinals);
        doc.prune_objects();
    }

    Ok(kept)
}
