use anyhow::{Context, Result};
use clap::Parser;

use pdf_shrink::cli::Args;
use pdf_shrink::{compress_pdf, Policy};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let policy = Policy::from_args(&args).with_context(|| "Invalid page selection")?;
    let output_path = args.output_path();

    println!("Performs a {} compression...", policy.mode_name());
    if !policy.lossless {
        println!("Processing pages...");
    }

    let report = compress_pdf(&args.input, &output_path, &policy)
        .with_context(|| format!("Failed to compress {}", args.input.display()))?;

    log::info!(
        "{} page(s), {} image(s) replaced, {} removed, {} via fallback",
        report.pages_retained,
        report.images.replaced,
        report.images.removed,
        report.images.via_fallback
    );

    println!("Done. The result is saved at {}", report.result_path.display());
    println!(
        "The output file size is {:.2} MiB which gave us a size reduction of {:.2}%.",
        report.result_size_mib(),
        report.size_reduction_percent()
    );

    Ok(())
}
