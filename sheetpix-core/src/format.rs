use std::fmt;

/// Column width in character units. Together with [`ROW_HEIGHT`] this renders a
/// cell roughly square in common spreadsheet applications.
pub const COLUMN_WIDTH: f64 = 2.0;
/// Row height in points.
pub const ROW_HEIGHT: f64 = 12.0;
pub const SHEET_NAME: &str = "Pixel Art";

pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const FILE_EXTENSION: &str = "xlsx";

/// Largest sheet the format can address.
pub const MAX_COLUMNS: u32 = 16_384;
pub const MAX_ROWS: u32 = 1_048_576;
/// Cell formats (including the default one) spreadsheet applications accept.
pub const MAX_CELL_FORMATS: usize = 64_000;

/// A 24-bit RGB color, the deduplication key for fill styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorKey(u32);

impl ColorKey {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    pub fn to_rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Lowercase six-digit hex, e.g. `ff0000`.
    pub fn hex(self) -> String {
        format!("{:06x}", self.0)
    }

    /// Parse six hex digits, optionally prefixed with an alpha byte (`FFff0000`).
    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = match s.len() {
            6 => s,
            8 => s.get(2..)?,
            _ => return None,
        };
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self)
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)
    }
}

/// Handle to a solid fill registered with a [`GridDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StyleId(u32);

impl StyleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A solid cell background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillStyle {
    pub color: ColorKey,
}

/// In-memory sheet: one fill handle per cell, row-major, plus the geometry
/// and view settings the serializer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct GridDocument {
    pub sheet_name: String,
    width: u32,
    height: u32,
    fills: Vec<FillStyle>,
    cells: Vec<Option<StyleId>>,
    column_widths: Vec<Option<f64>>,
    row_heights: Vec<Option<f64>>,
    show_gridlines: bool,
}

impl GridDocument {
    pub fn new(width: u32, height: u32) -> Self {
        let cell_count = width as usize * height as usize;
        Self {
            sheet_name: SHEET_NAME.to_string(),
            width,
            height,
            fills: Vec::new(),
            cells: vec![None; cell_count],
            column_widths: vec![None; width as usize],
            row_heights: vec![None; height as usize],
            show_gridlines: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Register a new fill. No deduplication happens here; callers cache.
    pub fn add_fill(&mut self, color: ColorKey) -> StyleId {
        let id = StyleId(self.fills.len() as u32);
        self.fills.push(FillStyle { color });
        id
    }

    pub fn fills(&self) -> &[FillStyle] {
        &self.fills
    }

    pub fn fill(&self, id: StyleId) -> Option<&FillStyle> {
        self.fills.get(id.index())
    }

    fn cell_index(&self, row: u32, col: u32) -> Option<usize> {
        if row == 0 || col == 0 || row > self.height || col > self.width {
            return None;
        }
        Some((row as usize - 1) * self.width as usize + (col as usize - 1))
    }

    /// Assign a fill to the one-indexed cell. Out-of-range coordinates are ignored.
    pub fn set_cell(&mut self, row: u32, col: u32, style: StyleId) {
        if let Some(i) = self.cell_index(row, col) {
            self.cells[i] = Some(style);
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<StyleId> {
        self.cell_index(row, col).and_then(|i| self.cells[i])
    }

    /// Fill color of the one-indexed cell, if it has one.
    pub fn cell_color(&self, row: u32, col: u32) -> Option<ColorKey> {
        self.cell(row, col)
            .and_then(|id| self.fill(id))
            .map(|f| f.color)
    }

    /// Row-major cells, `width` per row.
    pub fn cells(&self) -> &[Option<StyleId>] {
        &self.cells
    }

    pub fn set_column_width(&mut self, col: u32, width: f64) {
        if col >= 1 && col <= self.width {
            self.column_widths[col as usize - 1] = Some(width);
        }
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get((col as usize).wrapping_sub(1)).copied().flatten()
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        if row >= 1 && row <= self.height {
            self.row_heights[row as usize - 1] = Some(height);
        }
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get((row as usize).wrapping_sub(1)).copied().flatten()
    }

    pub fn show_gridlines(&self) -> bool {
        self.show_gridlines
    }

    pub fn set_show_gridlines(&mut self, show: bool) {
        self.show_gridlines = show;
    }
}

/// Spreadsheet column name for a one-indexed column: 1 → `A`, 27 → `AA`.
pub fn column_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_letter`]. Returns `None` for anything but uppercase letters.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0u32, |acc, b| {
        if b.is_ascii_uppercase() {
            acc.checked_mul(26)?.checked_add((b - b'A') as u32 + 1)
        } else {
            None
        }
    })
}

/// Split an `A1`-style reference into one-indexed (row, column).
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_index(letters)?;
    let row = digits.parse::<u32>().ok()?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_key_hex() {
        let key = ColorKey::new(255, 0, 16);
        assert_eq!(key.hex(), "ff0010");
        assert_eq!(key.to_rgb(), [255, 0, 16]);
        assert_eq!(ColorKey::parse_hex("FFff0010"), Some(key));
        assert_eq!(ColorKey::parse_hex("ff0010"), Some(key));
        assert_eq!(ColorKey::parse_hex("xyz"), None);
    }

    #[test]
    fn parse_hex_rejects_non_hex_digits() {
        assert_eq!(ColorKey::parse_hex("€12345"), None);
        assert_eq!(ColorKey::parse_hex("+fffff"), None);
        assert_eq!(ColorKey::parse_hex("FF+fffff"), None);
        assert_eq!(ColorKey::parse_hex("ab€1234"), None);
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(512), "SR");
        assert_eq!(column_letter(16384), "XFD");
        for col in [1, 26, 27, 52, 53, 702, 703, 16384] {
            assert_eq!(column_index(&column_letter(col)), Some(col));
        }
        assert_eq!(parse_cell_ref("AB12"), Some((12, 28)));
        assert_eq!(parse_cell_ref("12"), None);
    }

    #[test]
    fn cells_are_one_indexed() {
        let mut doc = GridDocument::new(3, 2);
        let red = doc.add_fill(ColorKey::new(255, 0, 0));
        doc.set_cell(2, 3, red);
        doc.set_cell(0, 1, red);
        doc.set_cell(3, 1, red);

        assert_eq!(doc.cell(2, 3), Some(red));
        assert_eq!(doc.cell(1, 1), None);
        assert_eq!(doc.cell_color(2, 3), Some(ColorKey::new(255, 0, 0)));
        assert_eq!(doc.cells().iter().flatten().count(), 1);
    }
}
