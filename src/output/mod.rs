//! Staging the output and deciding whether it replaces the input.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lopdf::Document;
use tempfile::NamedTempFile;

use crate::error::CompressError;
use crate::recompress::{Gate, GateDecision};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The output file was created or replaced
    Written { path: PathBuf, size: u64 },
    /// The staged document was not smaller; the output path was left alone
    KeptOriginal {
        path: PathBuf,
        size: u64,
        staged_size: u64,
    },
}

impl CommitOutcome {
    /// File holding the result
    pub fn path(&self) -> &Path {
        match self {
            CommitOutcome::Written { path, .. } | CommitOutcome::KeptOriginal { path, .. } => path,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            CommitOutcome::Written { size, .. } | CommitOutcome::KeptOriginal { size, .. } => *size,
        }
    }
}

/// Serialize `doc` next to `output_path` and promote it only if it beats the input.
///
/// The staging file lives in the output directory so the final rename is
/// atomic. When the staged document is not strictly smaller than the input
/// it is discarded and the output path is never created.
pub fn commit(doc: &mut Document, input_path: &Path, output_path: &Path) -> Result<CommitOutcome, CompressError> {
    let input_size = fs::metadata(input_path)?.len();
    let write_error = |source| CompressError::Write {
        path: output_path.to_path_buf(),
        source,
    };

    let directory = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staging = NamedTempFile::new_in(directory).map_err(write_error)?;

    {
        let mut writer = BufWriter::new(staging.as_file_mut());
        doc.save_to(&mut writer).map_err(write_error)?;
        writer.flush().map_err(write_error)?;
    }
    let staged_size = staging.as_file().metadata().map_err(write_error)?.len();

    match Gate::decide(input_size, staged_size) {
        GateDecision::Commit => {
            staging
                .persist(output_path)
                .map_err(|err| write_error(err.error))?;
            log::info!(
                "Wrote {} ({} -> {} bytes)",
                output_path.display(),
                input_size,
                staged_size
            );
            Ok(CommitOutcome::Written {
                path: output_path.to_path_buf(),
                size: staged_size,
            })
        }
        GateDecision::Decline => {
            log::warn!(
                "Result would not be smaller ({} >= {} bytes), keeping {}",
                staged_size,
                input_size,
                input_path.display()
            );
            Ok(CommitOutcome::KeptOriginal {
                path: input_path.to_path_buf(),
                size: input_size,
                staged_size,
            })
        }
    }
}
