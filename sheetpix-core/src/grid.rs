use std::collections::HashMap;

use image::RgbImage;

use crate::format::{ColorKey, GridDocument, StyleId, COLUMN_WIDTH, ROW_HEIGHT};

/// Write side of the pixel walk. [`GridDocument`] is the built-in target;
/// another spreadsheet dialect only needs to implement this.
pub trait GridSink {
    type Style: Copy;

    fn set_column_width(&mut self, col: u32, width: f64);
    fn set_row_height(&mut self, row: u32, height: f64);
    /// Create a new solid fill. Called once per distinct color.
    fn add_fill(&mut self, color: ColorKey) -> Self::Style;
    fn set_cell(&mut self, row: u32, col: u32, style: Self::Style);
    fn hide_gridlines(&mut self);
}

impl GridSink for GridDocument {
    type Style = StyleId;

    fn set_column_width(&mut self, col: u32, width: f64) {
        GridDocument::set_column_width(self, col, width);
    }

    fn set_row_height(&mut self, row: u32, height: f64) {
        GridDocument::set_row_height(self, row, height);
    }

    fn add_fill(&mut self, color: ColorKey) -> StyleId {
        GridDocument::add_fill(self, color)
    }

    fn set_cell(&mut self, row: u32, col: u32, style: StyleId) {
        GridDocument::set_cell(self, row, col, style);
    }

    fn hide_gridlines(&mut self) {
        self.set_show_gridlines(false);
    }
}

/// One pixel as it lands in the sheet: one-indexed row and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelCell {
    pub row: u32,
    pub col: u32,
    pub color: ColorKey,
}

/// Row-major walk over an image, yielding [`PixelCell`]s.
pub struct PixelWalk<'a> {
    image: &'a RgbImage,
    x: u32,
    y: u32,
}

impl<'a> PixelWalk<'a> {
    pub fn new(image: &'a RgbImage) -> Self {
        Self { image, x: 0, y: 0 }
    }
}

impl Iterator for PixelWalk<'_> {
    type Item = PixelCell;

    fn next(&mut self) -> Option<PixelCell> {
        let (width, height) = self.image.dimensions();
        if width == 0 || self.y >= height {
            return None;
        }
        let (x, y) = (self.x, self.y);
        let cell = PixelCell {
            row: y + 1,
            col: x + 1,
            color: ColorKey::from_rgb(self.image.get_pixel(x, y).0),
        };
        self.x += 1;
        if self.x == width {
            self.x = 0;
            self.y += 1;
        }
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (width, height) = self.image.dimensions();
        let total = width as usize * height as usize;
        let done = (self.y as usize * width as usize + self.x as usize).min(total);
        (total - done, Some(total - done))
    }
}

impl ExactSizeIterator for PixelWalk<'_> {}

/// Color key → fill handle, lazily populated, scoped to one conversion.
pub struct StyleCache<S> {
    styles: HashMap<ColorKey, S>,
}

impl<S: Copy> StyleCache<S> {
    pub fn new() -> Self {
        Self { styles: HashMap::new() }
    }

    pub fn get_or_insert_with(&mut self, key: ColorKey, create: impl FnOnce() -> S) -> S {
        *self.styles.entry(key).or_insert_with(create)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl<S: Copy> Default for StyleCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes an image into a [`GridSink`], one fill per distinct color.
pub struct PixelGridEncoder<'s, K: GridSink> {
    sink: &'s mut K,
    cache: StyleCache<K::Style>,
}

impl<'s, K: GridSink> PixelGridEncoder<'s, K> {
    pub fn new(sink: &'s mut K) -> Self {
        Self { sink, cache: StyleCache::new() }
    }

    /// Fix the sheet geometry, write every pixel, then hide gridlines.
    /// `on_progress` receives `row / height` after each finished row.
    pub fn encode(
        &mut self,
        image: &RgbImage,
        mut on_progress: Option<&mut dyn FnMut(f64)>,
    ) -> &StyleCache<K::Style> {
        let (width, height) = image.dimensions();

        for col in 1..=width {
            self.sink.set_column_width(col, COLUMN_WIDTH);
        }
        for row in 1..=height {
            self.sink.set_row_height(row, ROW_HEIGHT);
        }

        for cell in PixelWalk::new(image) {
            let sink = &mut *self.sink;
            let style = self
                .cache
                .get_or_insert_with(cell.color, || sink.add_fill(cell.color));
            self.sink.set_cell(cell.row, cell.col, style);

            if cell.col == width {
                if let Some(cb) = on_progress.as_deref_mut() {
                    cb(cell.row as f64 / height as f64);
                }
            }
        }

        self.sink.hide_gridlines();
        log::debug!(
            "Encoded {width}x{height} cells with {} fill styles",
            self.cache.len()
        );
        &self.cache
    }

    pub fn cache(&self) -> &StyleCache<K::Style> {
        &self.cache
    }
}
