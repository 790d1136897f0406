use std::path::PathBuf;

use crate::config::defaults::BYTES_PER_MIB;

/// Per-run counters for the image pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStats {
    /// Image references visited, one per page occurrence
    pub seen: usize,
    pub replaced: usize,
    /// Re-encoded but not smaller than the original
    pub declined: usize,
    /// Format left alone by policy
    pub passed_through: usize,
    pub failed: usize,
    /// Decoded through the fallback renderer
    pub via_fallback: usize,
    /// Swapped for the white placeholder
    pub removed: usize,
    /// Pages whose images could not be enumerated
    pub pages_skipped: usize,
}

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub input_path: PathBuf,
    pub input_size: u64,
    /// Where the result lives: the output path, or the input when it was kept
    pub result_path: PathBuf,
    pub result_size: u64,
    /// Size of the assembled document, whether or not it was kept
    pub assembled_size: u64,
    pub output_written: bool,
    pub pages_retained: usize,
    pub images: ImageStats,
}

impl CompressionReport {
    /// Reduction relative to the input, in percent. Zero when the original was kept.
    pub fn size_reduction_percent(&self) -> f64 {
        if self.input_size == 0 {
            return 0.0;
        }
        (self.input_size as f64 - self.result_size as f64) / self.input_size as f64 * 100.0
    }

    pub fn result_size_mib(&self) -> f64 {
        self.result_size as f64 / BYTES_PER_MIB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(input_size: u64, result_size: u64) -> CompressionReport {
        CompressionReport {
            input_path: PathBuf::from("in.pdf"),
            input_size,
            result_path: PathBuf::from("out.pdf"),
            result_size,
            assembled_size: result_size,
            output_written: true,
            pages_retained: 1,
            images: ImageStats::default(),
        }
    }

    #[test]
    fn test_size_reduction() {
        assert!((report(1000, 400).size_reduction_percent() - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_size_reduction_kept_original() {
        assert_eq!(report(1000, 1000).size_reduction_percent(), 0.0);
    }

    #[test]
    fn test_size_reduction_empty_input() {
        assert_eq!(report(0, 0).size_reduction_percent(), 0.0);
    }

    #[test]
    fn test_result_size_mib() {
        assert!((report(0, 3 * 1024 * 1024).result_size_mib() - 3.0).abs() < 1e-9);
    }
}
