use std::collections::HashMap;

use image::RgbImage;

fn distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// Nearest palette entry by squared RGB distance; ties go to the lower index.
pub fn nearest(palette: &[[u8; 3]], color: [u8; 3]) -> u8 {
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| distance_sq(**p, color))
        .map(|(i, _)| i as u8)
        .unwrap_or(0)
}

/// Map every pixel to a palette index with Floyd-Steinberg error diffusion.
/// `palette` holds at most 256 entries.
pub fn dither_image(image: &RgbImage, palette: &[[u8; 3]]) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let (width, height) = (width as usize, height as usize);

    // Working buffer; error is accumulated here.
    let mut buf: Vec<[f32; 3]> = image
        .pixels()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();

    let mut indices = vec![0u8; width * height];
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let current = buf[idx];
            let rounded = current.map(|v| v.round().clamp(0.0, 255.0) as u8);
            let chosen = *lookup
                .entry(rounded)
                .or_insert_with(|| nearest(palette, rounded));
            indices[idx] = chosen;

            let target = palette[chosen as usize];
            let err = [
                current[0] - target[0] as f32,
                current[1] - target[1] as f32,
                current[2] - target[2] as f32,
            ];

            let mut diffuse = |ti: usize, fraction: f32| {
                for c in 0..3 {
                    buf[ti][c] += err[c] * fraction;
                }
            };

            // Floyd-Steinberg kernel: right 7/16, bottom-left 3/16, bottom 5/16, bottom-right 1/16
            if x + 1 < width {
                diffuse(idx + 1, 7.0 / 16.0);
            }
            if y + 1 < height {
                let below = idx + width;
                if x > 0 {
                    diffuse(below - 1, 3.0 / 16.0);
                }
                diffuse(below, 5.0 / 16.0);
                if x + 1 < width {
                    diffuse(below + 1, 1.0 / 16.0);
                }
            }
        }
    }

    indices
}
