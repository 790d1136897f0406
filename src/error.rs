use std::path::PathBuf;

use lopdf::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid page number: {0}")]
    InvalidNumber(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Invalid page range: {start} > {end}")]
    Reversed { start: u32, end: u32 },

    #[error("Page numbers start at 1")]
    ZeroPage,
}

/// Failure to walk a page's resource graph. Recoverable: the page keeps its images.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Cannot resolve resources of page {page}: {source}")]
    Unresolvable {
        page: u32,
        #[source]
        source: lopdf::Error,
    },

    #[error("Malformed resources on page {page}: {message}")]
    Malformed { page: u32, message: String },
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Unsupported filter: {0}")]
    Unsupported(String),

    #[error("{filter} data is corrupt: {message}")]
    Corrupt { filter: &'static str, message: String },
}

/// Primary decoder failure on data it claims to understand.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Sample data error: {0}")]
    Samples(String),
}

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("Cannot open {path} for rendering: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Page index {0} is out of range")]
    PageOutOfRange(usize),

    #[error("Image {id:?} is not in the raster inventory of page index {page}")]
    NotFound { page: usize, id: ObjectId },

    #[error("Image cannot be rendered: {0}")]
    NotRenderable(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Sample data error: {0}")]
    Samples(String),
}

#[derive(Error, Debug)]
pub enum RecompressError {
    #[error("Image of {width}x{height} exceeds JPEG dimensions")]
    TooLarge { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] jpeg_encoder::EncodingError),
}

/// Anything that stops a single image from being substituted.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Fallback(#[from] FallbackError),

    #[error(transparent)]
    Recompress(#[from] RecompressError),
}

/// Errors that abort the whole run.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("The file '{}' was not found", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to load PDF {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Page selection retains none of the document's {page_count} pages")]
    EmptySelection { page_count: usize },

    #[error("Unable to compress content streams of page {page}: {source}")]
    LosslessNormalization {
        page: u32,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
