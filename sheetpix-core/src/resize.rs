use fast_image_resize as fr;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions};
use image::RgbImage;

use crate::config::ResampleKernel;
use crate::error::{ConversionError, Result};

/// Dimensions that fit `width × height` inside a `bound × bound` box while
/// keeping the aspect ratio. Never upscales. The larger side lands exactly on
/// `bound`; the other is floored, but kept at least 1.
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width <= bound && height <= bound {
        return (width, height);
    }
    let (w, h, b) = (width as u64, height as u64, bound as u64);
    let (new_w, new_h) = if w >= h {
        (b, h * b / w)
    } else {
        (w * b / h, b)
    };
    (new_w.max(1) as u32, new_h.max(1) as u32)
}

/// Shrinks RGB images to fit a maximum dimension.
pub struct ImageResizer {
    max_dimension: u32,
    resizer: fr::Resizer,
    options: ResizeOptions,
}

impl ImageResizer {
    pub fn new(max_dimension: u32, kernel: ResampleKernel) -> Self {
        let alg = match kernel {
            ResampleKernel::Nearest => ResizeAlg::Nearest,
            ResampleKernel::Lanczos => ResizeAlg::Convolution(FilterType::Lanczos3),
        };
        Self {
            max_dimension,
            resizer: fr::Resizer::new(),
            options: ResizeOptions::new().resize_alg(alg),
        }
    }

    /// Returns the image unchanged when it already fits.
    pub fn resize(&mut self, image: RgbImage) -> Result<RgbImage> {
        let (src_width, src_height) = image.dimensions();
        let (dst_width, dst_height) = fit_within(src_width, src_height, self.max_dimension);
        if (dst_width, dst_height) == (src_width, src_height) {
            return Ok(image);
        }

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            image.into_raw(),
            PixelType::U8x3,
        )
        .map_err(|e| ConversionError::Resize(format!("failed to create source image: {e}")))?;

        let mut dst_image = fr::images::Image::new(dst_width, dst_height, PixelType::U8x3);

        self.resizer
            .resize(&src_image, &mut dst_image, &self.options)
            .map_err(|e| ConversionError::Resize(e.to_string()))?;

        log::info!(
            "Resized image from {src_width}x{src_height} to {dst_width}x{dst_height}"
        );

        RgbImage::from_raw(dst_width, dst_height, dst_image.into_vec()).ok_or_else(|| {
            ConversionError::Resize("resized buffer has the wrong length".into())
        })
    }
}
