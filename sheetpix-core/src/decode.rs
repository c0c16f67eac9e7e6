use std::collections::HashMap;
use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::encode::{SHEET_PART, STYLES_PART, WORKBOOK_PART};
use crate::error::{ConversionError, Result};
use crate::format::{parse_cell_ref, ColorKey, GridDocument, StyleId, MAX_COLUMNS, MAX_ROWS};
use crate::xml::{self, TagKind};

/// Reads back workbooks produced by [`XlsxWriter`](crate::encode::XlsxWriter).
pub struct XlsxReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

fn malformed(msg: impl Into<String>) -> ConversionError {
    ConversionError::Malformed(msg.into())
}

fn check_column(col: u32) -> Result<u32> {
    if col == 0 || col > MAX_COLUMNS {
        return Err(malformed(format!("column {col} outside 1..={MAX_COLUMNS}")));
    }
    Ok(col)
}

fn check_row(row: u32) -> Result<u32> {
    if row == 0 || row > MAX_ROWS {
        return Err(malformed(format!("row {row} outside 1..={MAX_ROWS}")));
    }
    Ok(row)
}

fn parse_attr<T: std::str::FromStr>(tag: &xml::Tag<'_>, key: &str) -> Result<T> {
    let raw = tag
        .attr(key)
        .ok_or_else(|| malformed(format!("<{}> without {key}", tag.name)))?;
    raw.parse()
        .map_err(|_| malformed(format!("bad {key}=\"{raw}\" on <{}>", tag.name)))
}

impl<R: Read + Seek> XlsxReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    /// Raw text of one package part.
    pub fn read_part(&mut self, name: &str) -> Result<String> {
        let mut part = self.archive.by_name(name)?;
        let mut text = String::new();
        part.read_to_string(&mut text)?;
        Ok(text)
    }

    pub fn sheet_name(&mut self) -> Result<String> {
        let workbook = self.read_part(WORKBOOK_PART)?;
        xml::tags(&workbook)
            .find(|t| t.name == "sheet" && t.is_start())
            .and_then(|t| t.attr("name"))
            .map(xml::unescape)
            .ok_or_else(|| malformed("workbook has no sheet"))
    }

    /// Fill color for each cell format index; `None` where the format has no
    /// solid fill.
    pub fn cell_format_colors(&mut self) -> Result<Vec<Option<ColorKey>>> {
        let styles = self.read_part(STYLES_PART)?;

        let mut fills: Vec<Option<ColorKey>> = Vec::new();
        let mut fill_ids: Vec<usize> = Vec::new();
        let mut section = "";

        for tag in xml::tags(&styles) {
            match (tag.name, tag.kind) {
                ("fills" | "cellXfs" | "cellStyleXfs", TagKind::Open) => section = tag.name,
                ("fills" | "cellXfs" | "cellStyleXfs", TagKind::Close) => section = "",
                ("fill", TagKind::Open | TagKind::Empty) if section == "fills" => fills.push(None),
                ("fgColor", _) if section == "fills" => {
                    if let (Some(slot), Some(rgb)) = (fills.last_mut(), tag.attr("rgb")) {
                        *slot = ColorKey::parse_hex(rgb);
                    }
                }
                ("xf", TagKind::Open | TagKind::Empty) if section == "cellXfs" => {
                    fill_ids.push(parse_attr(&tag, "fillId")?);
                }
                _ => {}
            }
        }

        Ok(fill_ids
            .into_iter()
            .map(|id| fills.get(id).copied().flatten())
            .collect())
    }

    /// Rebuild the grid document: geometry, gridline flag, and one fill per
    /// cell format actually used.
    pub fn read_document(&mut self) -> Result<GridDocument> {
        let sheet_name = self.sheet_name()?;
        let formats = self.cell_format_colors()?;
        let sheet = self.read_part(SHEET_PART)?;

        let mut show_gridlines = true;
        let mut columns: Vec<(u32, u32, f64)> = Vec::new();
        let mut rows: Vec<(u32, f64)> = Vec::new();
        let mut cells: Vec<(u32, u32, usize)> = Vec::new();
        let (mut width, mut height) = (0u32, 0u32);

        for tag in xml::tags(&sheet).filter(|t| t.is_start()) {
            match tag.name {
                "sheetView" => {
                    show_gridlines = tag.attr("showGridLines") != Some("0");
                }
                "col" => {
                    let min = check_column(parse_attr(&tag, "min")?)?;
                    let max = check_column(parse_attr(&tag, "max")?)?;
                    if min > max {
                        return Err(malformed(format!("column range {min}..{max} is reversed")));
                    }
                    let w: f64 = parse_attr(&tag, "width")?;
                    width = width.max(max);
                    columns.push((min, max, w));
                }
                "row" => {
                    let r = check_row(parse_attr(&tag, "r")?)?;
                    height = height.max(r);
                    if let Some(ht) = tag.attr("ht") {
                        let ht = ht
                            .parse()
                            .map_err(|_| malformed(format!("bad row height {ht:?}")))?;
                        rows.push((r, ht));
                    }
                }
                "c" => {
                    let reference = tag.attr("r").ok_or_else(|| malformed("cell without r"))?;
                    let (row, col) = parse_cell_ref(reference)
                        .ok_or_else(|| malformed(format!("bad cell reference {reference:?}")))?;
                    let (row, col) = (check_row(row)?, check_column(col)?);
                    width = width.max(col);
                    height = height.max(row);
                    if let Some(s) = tag.attr("s") {
                        let s = s
                            .parse()
                            .map_err(|_| malformed(format!("bad style index {s:?}")))?;
                        cells.push((row, col, s));
                    }
                }
                _ => {}
            }
        }

        let mut doc = GridDocument::new(width, height);
        doc.sheet_name = sheet_name;
        doc.set_show_gridlines(show_gridlines);
        for (min, max, w) in columns {
            for col in min..=max {
                doc.set_column_width(col, w);
            }
        }
        for (r, ht) in rows {
            doc.set_row_height(r, ht);
        }

        let mut styles: HashMap<usize, StyleId> = HashMap::new();
        for (row, col, format) in cells {
            let color = formats
                .get(format)
                .ok_or_else(|| malformed(format!("cell format {format} out of range")))?;
            if let Some(color) = *color {
                let style = *styles.entry(format).or_insert_with(|| doc.add_fill(color));
                doc.set_cell(row, col, style);
            }
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::encode::to_bytes;

    /// Write `doc`, then repack the archive with one part's text rewritten.
    fn rewrite_part(doc: &GridDocument, target: &str, edit: impl Fn(&str) -> String) -> Vec<u8> {
        let mut source = ZipArchive::new(Cursor::new(to_bytes(doc).unwrap())).unwrap();
        let mut out = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for i in 0..source.len() {
            let mut part = source.by_index(i).unwrap();
            let name = part.name().to_string();
            let mut text = String::new();
            part.read_to_string(&mut text).unwrap();
            if name == target {
                text = edit(&text);
            }
            out.start_file(name, options).unwrap();
            std::io::Write::write_all(&mut out, text.as_bytes()).unwrap();
        }
        out.finish().unwrap().into_inner()
    }

    fn read_sheet(sheet_data: &str) -> Result<GridDocument> {
        let bytes = rewrite_part(&GridDocument::new(1, 1), SHEET_PART, |_| {
            format!("<worksheet><sheetData>{sheet_data}</sheetData></worksheet>")
        });
        XlsxReader::new(Cursor::new(bytes))?.read_document()
    }

    #[test]
    fn rejects_huge_column_ranges() {
        let err = read_sheet(r#"<col min="1" max="4294967295" width="2"/>"#).unwrap_err();
        assert!(matches!(err, ConversionError::Malformed(_)));
        assert!(read_sheet(r#"<col min="0" max="2" width="2"/>"#).is_err());
        assert!(read_sheet(r#"<col min="3" max="2" width="2"/>"#).is_err());
        assert_eq!(
            read_sheet(r#"<col min="1" max="16384" width="2"/>"#).unwrap().width(),
            MAX_COLUMNS
        );
    }

    #[test]
    fn rejects_out_of_range_rows_and_cells() {
        assert!(read_sheet(r#"<row r="4294967295"></row>"#).is_err());
        assert!(read_sheet(r#"<row r="0"></row>"#).is_err());
        assert!(read_sheet(r#"<row r="1"><c r="XFE1"/></row>"#).is_err());
        assert!(read_sheet(r#"<row r="1"><c r="A1048577"/></row>"#).is_err());
        assert!(read_sheet(r#"<row r="1"><c r="XFD1"/></row>"#).is_ok());
    }

    #[test]
    fn multibyte_fill_colors_are_ignored() {
        let mut doc = GridDocument::new(1, 1);
        doc.add_fill(ColorKey::new(1, 1, 1));
        let bytes = rewrite_part(&doc, STYLES_PART, |xml| xml.replace("FF010101", "€12345"));

        let mut reader = XlsxReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.cell_format_colors().unwrap(), vec![None, None]);
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(XlsxReader::new(Cursor::new(b"not a workbook".to_vec())).is_err());
    }

    #[test]
    fn reads_sheet_name_with_escapes() {
        let mut doc = GridDocument::new(1, 1);
        doc.sheet_name = "R&D <art>".into();
        let bytes = to_bytes(&doc).unwrap();
        let mut reader = XlsxReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.sheet_name().unwrap(), "R&D <art>");
    }

    #[test]
    fn unstyled_formats_have_no_color() {
        let mut doc = GridDocument::new(1, 1);
        doc.add_fill(ColorKey::new(9, 8, 7));
        let bytes = to_bytes(&doc).unwrap();
        let mut reader = XlsxReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            reader.cell_format_colors().unwrap(),
            vec![None, Some(ColorKey::new(9, 8, 7))]
        );
    }
}
