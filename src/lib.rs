pub mod assemble;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod output;
pub mod parser;
pub mod recompress;

use std::fs;
use std::path::Path;

use lopdf::Document;

pub use config::Policy;
pub use error::CompressError;
pub use extract::{FallbackRenderer, LopdfRenderer};
pub use model::{CompressionReport, ImageStats, PageSelection};
pub use output::CommitOutcome;
pub use parser::parse_page_selection;

/// Shrink the PDF at `input` and write the result to `output`.
///
/// Images the primary decoder cannot handle are rendered through a second,
/// independently parsed view of the input file.
///
/// # Example
///
/// ```no_run
/// use pdf_shrink::{compress_pdf, Policy};
///
/// let policy = Policy::default().with_quality(60);
/// let report = compress_pdf("scan.pdf".as_ref(), "scan_small.pdf".as_ref(), &policy).unwrap();
/// println!("{:.2}% smaller", report.size_reduction_percent());
/// ```
pub fn compress_pdf(input: &Path, output: &Path, policy: &Policy) -> Result<CompressionReport, CompressError> {
    let mut fallback = LopdfRenderer::open(input);
    compress_pdf_with(input, output, policy, &mut fallback)
}

/// [`compress_pdf`] with a caller-supplied fallback renderer.
pub fn compress_pdf_with(
    input: &Path,
    output: &Path,
    policy: &Policy,
    fallback: &mut dyn FallbackRenderer,
) -> Result<CompressionReport, CompressError> {
    if !input.is_file() {
        return Err(CompressError::InputNotFound(input.to_path_buf()));
    }
    let input_size = fs::metadata(input)?.len();

    let source = Document::load(input).map_err(|source| CompressError::Load {
        path: input.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded {} ({} pages, {} bytes)",
        input.display(),
        source.get_pages().len(),
        input_size
    );

    let mut assembled = assemble::assemble(&source, policy, fallback)?;
    drop(source);

    let outcome = output::commit(&mut assembled.doc, input, output)?;
    let assembled_size = match &outcome {
        CommitOutcome::Written { size, .. } => *size,
        CommitOutcome::KeptOriginal { staged_size, .. } => *staged_size,
    };

    Ok(CompressionReport {
        input_path: input.to_path_buf(),
        input_size,
        result_path: outcome.path().to_path_buf(),
        result_size: outcome.size(),
        assembled_size,
        output_written: matches!(outcome, CommitOutcome::Written { .. }),
        pages_retained: assembled.pages.len(),
        images: assembled.images,
    })
}
