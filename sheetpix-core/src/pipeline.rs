use image::RgbImage;

use crate::config::ConversionConfig;
use crate::encode;
use crate::error::{ConversionError, Result};
use crate::format::GridDocument;
use crate::grid::PixelGridEncoder;
use crate::quantize::{count_colors, quantize};
use crate::resize::ImageResizer;

/// Decode any format the `image` crate understands and force opaque RGB.
/// Animated formats yield their first frame.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let decoded = image::load_from_memory(bytes)?;
    Ok(decoded.to_rgb8())
}

/// Resize and quantize according to `config`; the image the grid is built from.
pub fn prepare_image(image: RgbImage, config: &ConversionConfig) -> Result<RgbImage> {
    config.validate()?;
    prepare_validated(image, config)
}

fn prepare_validated(image: RgbImage, config: &ConversionConfig) -> Result<RgbImage> {
    let image = if config.should_resize {
        ImageResizer::new(config.max_dimension, config.kernel).resize(image)?
    } else {
        let (w, h) = image.dimensions();
        log::warn!(
            "Processing image at original size {w}x{h} ({} cells). This may be very slow.",
            w as u64 * h as u64
        );
        image
    };

    let image = match config.color_count {
        Some(n) => quantize(&image, n as usize),
        None => image,
    };

    if let Some(limit) = config.style_limit {
        let found = count_colors(&image);
        if found > limit {
            return Err(ConversionError::StyleLimit { found, limit });
        }
    }

    Ok(image)
}

/// Walk the prepared image into a fresh grid document.
pub fn build_document(image: &RgbImage, on_progress: Option<&mut dyn FnMut(f64)>) -> GridDocument {
    let (width, height) = image.dimensions();
    let mut doc = GridDocument::new(width, height);
    PixelGridEncoder::new(&mut doc).encode(image, on_progress);
    doc
}

/// Convert encoded image bytes into an XLSX workbook held in memory.
///
/// Stages run in a fixed order: decode, resize (when enabled), quantize
/// (when a color count is set), encode, serialize. The first failing stage
/// aborts the conversion; nothing partial is returned.
pub fn convert(
    image_bytes: &[u8],
    config: &ConversionConfig,
    on_progress: Option<&mut dyn FnMut(f64)>,
) -> Result<Vec<u8>> {
    config.validate()?;

    let image = decode_image(image_bytes)?;
    let image = prepare_validated(image, config)?;
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("Prepared image has {} distinct colors", count_colors(&image));
    }

    let (width, height) = image.dimensions();
    encode::check_dimensions(width, height)?;

    let doc = build_document(&image, on_progress);
    let bytes = encode::to_bytes(&doc)?;

    log::info!(
        "Conversion complete: {}x{} cells, {} fill styles",
        doc.width(),
        doc.height(),
        doc.fills().len()
    );
    Ok(bytes)
}
