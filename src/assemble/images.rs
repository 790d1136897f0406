use std::collections::{HashMap, HashSet};

use lopdf::{dictionary, Document, ObjectId, Stream};

use super::resources::substitute_image;
use crate::config::defaults::{PLACEHOLDER_COLOR, PLACEHOLDER_SIZE};
use crate::config::Policy;
use crate::error::ImageError;
use crate::extract::{decode_primary, page_images, FallbackRenderer, PrimaryDecode};
use crate::model::{ImageRef, ImageStats, PixelBuffer};
use crate::recompress::{recompress, Gate, GateDecision, Recompressed};

/// What happened to one source image object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Replaced(ObjectId),
    Declined,
    PassedThrough,
    Failed,
}

/// Walks the retained pages and swaps images for smaller encodings.
///
/// Outcomes are cached by source object id, so an image shared by several
/// pages is decoded and encoded once and every page points at the same new
/// object.
pub struct ImagePass<'a> {
    policy: &'a Policy,
    fallback: &'a mut dyn FallbackRenderer,
    outcomes: HashMap<ObjectId, Outcome>,
    placeholder: Option<ObjectId>,
    /// Form copies made for substitutions inside forms
    private_forms: HashSet<ObjectId>,
    stats: ImageStats,
}

impl<'a> ImagePass<'a> {
    pub fn new(policy: &'a Policy, fallback: &'a mut dyn FallbackRenderer) -> Self {
        Self {
            policy,
            fallback,
            outcomes: HashMap::new(),
            placeholder: None,
            private_forms: HashSet::new(),
            stats: ImageStats::default(),
        }
    }

    /// Process pages given as (input ordinal, page id), in order
    pub fn run(mut self, doc: &mut Document, pages: &[(u32, ObjectId)]) -> ImageStats {
        for &(ordinal, page_id) in pages {
            let images = match page_images(doc, page_id, ordinal) {
                Ok(images) => images,
                Err(err) => {
                    log::warn!("Skipping images of page {}: {}", ordinal, err);
                    self.stats.pages_skipped += 1;
                    continue;
                }
            };

            for image in images {
                self.stats.seen += 1;
                if self.policy.remove_images {
                    self.remove(doc, &image);
                } else {
                    self.replace(doc, &image);
                }
            }
        }

        log::info!(
            "Images: {} seen, {} replaced, {} removed, {} declined, {} passed through, {} failed",
            self.stats.seen,
            self.stats.replaced,
            self.stats.removed,
            self.stats.declined,
            self.stats.passed_through,
            self.stats.failed
        );
        self.stats
    }

    fn remove(&mut self, doc: &mut Document, image: &ImageRef) {
        let placeholder = *self
            .placeholder
            .get_or_insert_with(|| doc.add_object(placeholder_stream()));

        match self.substitute(doc, image, placeholder) {
            Ok(()) => self.stats.removed += 1,
            Err(err) => {
                log::warn!(
                    "Cannot remove image /{} on page {}: {}",
                    image.name_str(),
                    image.page,
                    err
                );
                self.stats.failed += 1;
            }
        }
    }

    fn substitute(&mut self, doc: &mut Document, image: &ImageRef, target: ObjectId) -> lopdf::Result<()> {
        substitute_image(
            doc,
            image.page_id,
            &image.forms,
            &image.name,
            target,
            &mut self.private_forms,
        )
    }

    fn replace(&mut self, doc: &mut Document, image: &ImageRef) {
        let outcome = match self.outcomes.get(&image.id) {
            Some(outcome) => *outcome,
            None => {
                let outcome = self.evaluate(doc, image);
                self.outcomes.insert(image.id, outcome);
                outcome
            }
        };

        match outcome {
            Outcome::Replaced(new_id) => match self.substitute(doc, image, new_id) {
                Ok(()) => self.stats.replaced += 1,
                Err(err) => {
                    log::warn!(
                        "Cannot substitute image /{} on page {}: {}",
                        image.name_str(),
                        image.page,
                        err
                    );
                    self.stats.failed += 1;
                }
            },
            Outcome::Declined => self.stats.declined += 1,
            Outcome::PassedThrough => self.stats.passed_through += 1,
            Outcome::Failed => self.stats.failed += 1,
        }
    }

    /// Decode, re-encode and gate one image; a committed candidate is added to `doc`
    fn evaluate(&mut self, doc: &mut Document, image: &ImageRef) -> Outcome {
        let buffer = match self.decode(doc, image) {
            Ok(buffer) => buffer,
            Err(err) => {
                log::warn!(
                    "Leaving image /{} ({} {}) on page {} unchanged: {}",
                    image.name_str(),
                    image.id.0,
                    image.id.1,
                    image.page,
                    err
                );
                return Outcome::Failed;
            }
        };

        let candidate = match recompress(&buffer, self.policy.quality, self.policy.convert_png) {
            Ok(Recompressed::Candidate(candidate)) => candidate,
            Ok(Recompressed::PassThrough) => {
                log::debug!("Image /{} on page {} passed through", image.name_str(), image.page);
                return Outcome::PassedThrough;
            }
            Err(err) => {
                log::warn!(
                    "Cannot re-encode image /{} on page {}: {}",
                    image.name_str(),
                    image.page,
                    ImageError::from(err)
                );
                return Outcome::Failed;
            }
        };

        match Gate::decide(image.encoded_len, candidate.len()) {
            GateDecision::Commit => {
                log::debug!(
                    "Image /{} on page {}: {} -> {} bytes",
                    image.name_str(),
                    image.page,
                    image.encoded_len,
                    candidate.len()
                );
                Outcome::Replaced(doc.add_object(candidate.into_stream()))
            }
            GateDecision::Decline => {
                log::debug!(
                    "Image /{} on page {}: keeping {} bytes over {} byte candidate",
                    image.name_str(),
                    image.page,
                    image.encoded_len,
                    candidate.len()
                );
                Outcome::Declined
            }
        }
    }

    fn decode(&mut self, doc: &Document, image: &ImageRef) -> Result<PixelBuffer, ImageError> {
        match decode_primary(doc, image)? {
            PrimaryDecode::Decoded(buffer) => Ok(buffer),
            PrimaryDecode::Unsupported(reason) => {
                log::debug!(
                    "Image /{} on page {} goes to the fallback renderer: {}",
                    image.name_str(),
                    image.page,
                    reason
                );
                let buffer = self.fallback.render(image.page_index(), image.id)?;
                self.stats.via_fallback += 1;
                Ok(buffer)
            }
        }
    }
}

/// 1x1 opaque white DeviceRGB image
fn placeholder_stream() -> Stream {
    let pixels = (PLACEHOLDER_SIZE * PLACEHOLDER_SIZE) as usize;
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(PLACEHOLDER_SIZE),
            "Height" => i64::from(PLACEHOLDER_SIZE),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        PLACEHOLDER_COLOR.repeat(pixels),
    )
}
