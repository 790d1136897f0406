use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::defaults::{DEFAULT_QUALITY, OUTPUT_EXTENSION, OUTPUT_SUFFIX};

#[derive(Parser, Debug)]
#[command(name = "pdf-shrink")]
#[command(
    author,
    version,
    about = "Reduce the size of a PDF by recompressing or removing its embedded images"
)]
pub struct Args {
    /// Input PDF file path
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// Output PDF file path (defaults to <input>_compressed.pdf)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JPEG quality for recompressed images (1-100)
    #[arg(short, long, default_value_t = DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Only compress content streams, leave images untouched
    #[arg(
        short,
        long,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub lossless: bool,

    /// Replace every image with a 1x1 white placeholder
    #[arg(
        short = 'r',
        long = "removeImages",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub remove_images: bool,

    /// Pages to keep (e.g., "1,3-5,7"); all pages when omitted
    #[arg(short = 's', long = "selectPages")]
    pub select_pages: Option<String>,

    /// Convert lossless rasters (PNG-like images) to JPEG
    #[arg(
        short = 'c',
        long = "convertPNG",
        num_args = 0..=1,
        default_value = "true",
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub convert_png: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Get the output path, defaulting to `<stem>_compressed.pdf` beside the input
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// `<dir>/<stem>_compressed.pdf` for a given input path
pub fn default_output_path(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.{OUTPUT_EXTENSION}"))
}
