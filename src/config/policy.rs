use crate::cli::Args;
use crate::error::SelectionError;
use crate::model::PageSelection;
use crate::parser::parse_page_selection;

use super::defaults::*;

/// How a run treats the document. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// JPEG quality, 1-100
    pub quality: u8,
    /// Normalize content streams only; images are never touched
    pub lossless: bool,
    /// Swap every image for the white placeholder
    pub remove_images: bool,
    /// Re-encode lossless rasters as JPEG
    pub convert_png: bool,
    pub selection: PageSelection,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            lossless: DEFAULT_LOSSLESS,
            remove_images: DEFAULT_REMOVE_IMAGES,
            convert_png: DEFAULT_CONVERT_PNG,
            selection: PageSelection::All,
        }
    }
}

impl Policy {
    /// Build the policy from parsed command-line arguments.
    ///
    /// Fails only when the page selection does not parse. A lossless run
    /// ignores `remove_images`.
    pub fn from_args(args: &Args) -> Result<Self, SelectionError> {
        let selection = parse_page_selection(args.select_pages.as_deref())?;

        let remove_images = if args.lossless && args.remove_images {
            log::warn!("Lossless compression keeps every image; ignoring removeImages");
            false
        } else {
            args.remove_images
        };

        Ok(Self {
            quality: args.quality.clamp(1, 100),
            lossless: args.lossless,
            remove_images,
            convert_png: args.convert_png,
            selection,
        })
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        if lossless {
            self.remove_images = false;
        }
        self
    }

    pub fn with_remove_images(mut self, remove_images: bool) -> Self {
        self.remove_images = remove_images && !self.lossless;
        self
    }

    pub fn with_convert_png(mut self, convert_png: bool) -> Self {
        self.convert_png = convert_png;
        self
    }

    pub fn with_selection(mut self, selection: PageSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Short description for the banner line
    pub fn mode_name(&self) -> &'static str {
        if self.lossless {
            "lossless"
        } else {
            "lossy"
        }
    }
}
