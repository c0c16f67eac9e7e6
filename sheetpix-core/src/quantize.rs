use std::collections::HashMap;

use image::{Rgb, RgbImage};

use crate::dither::dither_image;

/// Distinct colors with their pixel counts, sorted by color so that the
/// result does not depend on hash iteration order.
pub fn histogram(image: &RgbImage) -> Vec<([u8; 3], u32)> {
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for p in image.pixels() {
        *counts.entry(p.0).or_insert(0) += 1;
    }
    let mut entries: Vec<_> = counts.into_iter().collect();
    entries.sort_unstable_by_key(|(color, _)| *color);
    entries
}

pub fn count_colors(image: &RgbImage) -> usize {
    histogram(image).len()
}

/// A box of histogram entries for median cut subdivision.
#[derive(Debug, Clone)]
struct ColorBox {
    entries: Vec<([u8; 3], u32)>,
}

impl ColorBox {
    fn new(entries: Vec<([u8; 3], u32)>) -> Self {
        Self { entries }
    }

    fn total_weight(&self) -> u64 {
        self.entries.iter().map(|(_, w)| *w as u64).sum()
    }

    /// Range (max - min) of each channel.
    fn ranges(&self) -> [u8; 3] {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        for (color, _) in &self.entries {
            for c in 0..3 {
                min[c] = min[c].min(color[c]);
                max[c] = max[c].max(color[c]);
            }
        }
        [
            max[0].saturating_sub(min[0]),
            max[1].saturating_sub(min[1]),
            max[2].saturating_sub(min[2]),
        ]
    }

    /// Heavier boxes with more spread split first.
    fn priority(&self) -> u64 {
        let spread = *self.ranges().iter().max().unwrap_or(&0) as u64;
        self.total_weight() * spread
    }

    /// Weighted mean color, rounded.
    fn centroid(&self) -> [u8; 3] {
        let mut sums = [0u64; 3];
        let mut total = 0u64;
        for (color, w) in &self.entries {
            let w = *w as u64;
            for c in 0..3 {
                sums[c] += color[c] as u64 * w;
            }
            total += w;
        }
        if total == 0 {
            return [0, 0, 0];
        }
        sums.map(|s| ((s + total / 2) / total) as u8)
    }

    /// Split along the widest channel at the weighted median.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let [rr, rg, rb] = self.ranges();
        let axis = if rr >= rg && rr >= rb {
            0
        } else if rg >= rb {
            1
        } else {
            2
        };

        // Stable sort keeps the split deterministic for equal channel values.
        self.entries.sort_by_key(|(color, _)| color[axis]);

        let half_weight = self.total_weight().div_ceil(2);
        let mut accumulated = 0u64;
        let mut split_idx = 1;
        for (i, (_, w)) in self.entries.iter().enumerate() {
            accumulated += *w as u64;
            if accumulated >= half_weight {
                split_idx = i + 1;
                break;
            }
        }

        // At least one entry per side.
        split_idx = split_idx.clamp(1, self.entries.len() - 1);

        let right = self.entries.split_off(split_idx);
        (ColorBox::new(self.entries), ColorBox::new(right))
    }
}

/// Weighted median cut: up to `max_colors` palette entries covering the
/// histogram. When the histogram already fits, its colors are the palette.
pub fn median_cut(histogram: Vec<([u8; 3], u32)>, max_colors: usize) -> Vec<[u8; 3]> {
    if histogram.is_empty() || max_colors == 0 {
        return Vec::new();
    }
    if histogram.len() <= max_colors {
        return histogram.into_iter().map(|(color, _)| color).collect();
    }

    let mut boxes = Vec::with_capacity(max_colors);
    boxes.push(ColorBox::new(histogram));

    while boxes.len() < max_colors {
        let best_idx = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.entries.len() >= 2)
            .max_by_key(|(_, b)| b.priority())
            .map(|(i, _)| i);

        let Some(idx) = best_idx else {
            break;
        };

        let to_split = boxes.remove(idx);
        let (left, right) = to_split.split();
        boxes.push(left);
        boxes.push(right);
    }

    let mut palette: Vec<[u8; 3]> = Vec::with_capacity(boxes.len());
    for color in boxes.iter().map(ColorBox::centroid) {
        if !palette.contains(&color) {
            palette.push(color);
        }
    }
    palette
}

/// Reduce `image` to at most `max_colors` distinct colors with a median cut
/// palette and Floyd-Steinberg dithering. The result is plain RGB.
pub fn quantize(image: &RgbImage, max_colors: usize) -> RgbImage {
    let hist = histogram(image);
    let distinct = hist.len();
    if distinct <= max_colors {
        log::debug!("Image already has {distinct} colors, skipping quantization");
        return image.clone();
    }

    let palette = median_cut(hist, max_colors);
    log::debug!(
        "Quantizing {distinct} colors down to a palette of {}",
        palette.len()
    );

    let (width, height) = image.dimensions();
    let indices = dither_image(image, &palette);
    RgbImage::from_fn(width, height, |x, y| {
        Rgb(palette[indices[(y * width + x) as usize] as usize])
    })
}
