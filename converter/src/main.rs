mod naming;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sheetpix_core::pipeline::{build_document, decode_image, prepare_image};
use sheetpix_core::format::MAX_CELL_FORMATS;
use sheetpix_core::{encode, ConversionConfig, ResampleKernel};

/// Most colors a workbook can hold; the default cell format takes one slot.
const DEFAULT_STYLE_LIMIT: usize = MAX_CELL_FORMATS - 1;

#[derive(Parser)]
#[command(name = "sheetpix-convert", about = "Convert an image to spreadsheet pixel art (.xlsx)")]
struct Cli {
    /// Input image (PNG, JPEG, BMP, GIF, ...)
    input: PathBuf,

    /// Output .xlsx path (default: derived from the input name and settings)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Process the image at its original size. Can be very slow.
    #[arg(long)]
    no_resize: bool,

    /// Largest width or height after resizing
    #[arg(long, default_value = "128", value_parser = clap::value_parser!(u32).range(1..))]
    max_size: u32,

    /// Resizing quality: nearest (blocky, keeps hard edges) or lanczos (smoother)
    #[arg(long, default_value = "nearest")]
    kernel: ResampleKernel,

    /// Reduce the image to this many colors (1-256)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
    colors: Option<u16>,

    /// Refuse images with more distinct colors than this (0 disables the check)
    #[arg(long, default_value_t = DEFAULT_STYLE_LIMIT)]
    style_limit: usize,
}

impl Cli {
    fn config(&self) -> ConversionConfig {
        ConversionConfig {
            should_resize: !self.no_resize,
            max_dimension: self.max_size,
            kernel: self.kernel,
            color_count: self.colors,
            style_limit: (self.style_limit > 0).then_some(self.style_limit),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config();

    if config.should_resize && !(32..=512).contains(&config.max_dimension) {
        log::warn!("Max size {} is outside the recommended 32-512 range", config.max_dimension);
    }
    if let Some(n) = config.color_count.filter(|n| *n < 8) {
        log::warn!("{n} colors is below the recommended minimum of 8");
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| naming::default_output_path(&cli.input, &config));

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    eprintln!("Decoding image: {}", cli.input.display());
    let image = decode_image(&bytes).context("unsupported or corrupt image")?;
    let (width, height) = image.dimensions();
    eprintln!("Source: {width}x{height} pixels");

    let image = prepare_image(image, &config).map_err(|e| {
        anyhow::anyhow!(e).context(
            "try enabling resizing, lowering --max-size, or setting --colors",
        )
    })?;
    let (width, height) = image.dimensions();
    if config.should_resize {
        eprintln!("Target: {width}x{height} cells ({} resampling)", config.kernel);
    } else {
        eprintln!("Target: {width}x{height} cells");
    }
    encode::check_dimensions(width, height)?;

    let mut report = |fraction: f64| {
        eprint!("\rProcessing pixels... {:3.0}%", fraction * 100.0);
        let _ = std::io::stderr().flush();
    };
    let doc = build_document(&image, Some(&mut report));
    eprintln!("\rProcessed {} rows total.      ", doc.height());

    eprintln!("Finalizing workbook ({} fill styles)...", doc.fills().len());
    let workbook = encode::to_bytes(&doc).context("failed to serialize workbook")?;

    fs::write(&output_path, &workbook)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    eprintln!("Wrote {}", output_path.display());

    Ok(())
}
