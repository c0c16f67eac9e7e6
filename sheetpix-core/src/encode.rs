use std::io::{Cursor, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{ConversionError, Result};
use crate::format::{column_letter, GridDocument, MAX_CELL_FORMATS, MAX_COLUMNS, MAX_ROWS};
use crate::xml::{self, DECLARATION};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const STYLES_PART: &str = "xl/styles.xml";
pub const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

/// Fill ids 0 and 1 are reserved by the format (none, gray125).
pub const FIRST_FILL_ID: usize = 2;
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Replace characters spreadsheet applications reject in sheet names and
/// cap the length.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let trimmed = cleaned.trim_matches('\'');
    if trimmed.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Fail when a `width × height` sheet is larger than the format can address.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_COLUMNS {
        return Err(ConversionError::SheetLimit(format!(
            "{width} columns, the maximum is {MAX_COLUMNS}; enable resizing"
        )));
    }
    if height > MAX_ROWS {
        return Err(ConversionError::SheetLimit(format!(
            "{height} rows, the maximum is {MAX_ROWS}; enable resizing"
        )));
    }
    Ok(())
}

/// Fail when `doc` cannot be written as a valid workbook.
pub fn check_limits(doc: &GridDocument) -> Result<()> {
    check_dimensions(doc.width(), doc.height())?;
    // One cell format per fill, plus the default format.
    let formats = doc.fills().len() + 1;
    if formats > MAX_CELL_FORMATS {
        return Err(ConversionError::SheetLimit(format!(
            "{} distinct colors need {formats} cell formats, the maximum is {MAX_CELL_FORMATS}; \
             set a color count to quantize the image",
            doc.fills().len()
        )));
    }
    Ok(())
}

/// Format a width or height the way the XML expects: `2`, `12`, `8.43`.
fn fmt_num(v: f64) -> String {
    format!("{v}")
}

/// Writes a [`GridDocument`] as an XLSX package.
pub struct XlsxWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> XlsxWriter<W> {
    pub fn new(writer: W) -> Self {
        // Fixed timestamp keeps output byte-identical between runs.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        Self {
            zip: ZipWriter::new(writer),
            options,
        }
    }

    fn start_part(&mut self, name: &str) -> Result<()> {
        self.zip.start_file(name, self.options)?;
        Ok(())
    }

    fn write_part(&mut self, name: &str, contents: &str) -> Result<()> {
        self.start_part(name)?;
        self.zip.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Write every part of the package for `doc`. Nothing is written when
    /// the sheet exceeds the format's limits.
    pub fn write_document(&mut self, doc: &GridDocument) -> Result<()> {
        check_limits(doc)?;
        self.write_part("[Content_Types].xml", &content_types())?;
        self.write_part("_rels/.rels", &root_rels())?;
        self.write_part("docProps/app.xml", &app_props())?;
        self.write_part(WORKBOOK_PART, &workbook(&doc.sheet_name))?;
        self.write_part("xl/_rels/workbook.xml.rels", &workbook_rels())?;
        self.write_part(STYLES_PART, &styles(doc))?;
        self.write_sheet(doc)
    }

    fn write_sheet(&mut self, doc: &GridDocument) -> Result<()> {
        let (width, height) = (doc.width(), doc.height());
        self.start_part(SHEET_PART)?;

        let dimension = if width == 0 || height == 0 {
            "A1".to_string()
        } else {
            format!("A1:{}{}", column_letter(width), height)
        };
        let show_gridlines = if doc.show_gridlines() { "" } else { r#" showGridLines="0""# };
        write!(
            self.zip,
            r#"{DECLARATION}<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><dimension ref="{dimension}"/><sheetViews><sheetView{show_gridlines} workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/>"#
        )?;

        // Runs of equal width share one <col> element.
        let mut cols = String::new();
        let mut col = 1;
        while col <= width {
            let Some(w) = doc.column_width(col) else {
                col += 1;
                continue;
            };
            let mut end = col;
            while end < width && doc.column_width(end + 1) == Some(w) {
                end += 1;
            }
            cols.push_str(&format!(
                r#"<col min="{col}" max="{end}" width="{}" customWidth="1"/>"#,
                fmt_num(w)
            ));
            col = end + 1;
        }
        if !cols.is_empty() {
            write!(self.zip, "<cols>{cols}</cols>")?;
        }

        self.zip.write_all(b"<sheetData>")?;
        let letters: Vec<String> = (1..=width).map(column_letter).collect();
        let mut line = String::new();
        for row in 1..=height {
            let start = (row as usize - 1) * width as usize;
            let cells = &doc.cells()[start..start + width as usize];
            let height_attr = doc.row_height(row);
            if height_attr.is_none() && cells.iter().all(Option::is_none) {
                continue;
            }

            line.clear();
            line.push_str(&format!(r#"<row r="{row}""#));
            if let Some(h) = height_attr {
                line.push_str(&format!(r#" ht="{}" customHeight="1""#, fmt_num(h)));
            }
            line.push('>');
            for (letter, style) in letters.iter().zip(cells) {
                if let Some(style) = style {
                    // Cell format 0 is the default; fills start at 1.
                    line.push_str(&format!(r#"<c r="{letter}{row}" s="{}"/>"#, style.index() + 1));
                }
            }
            line.push_str("</row>");
            self.zip.write_all(line.as_bytes())?;
        }
        self.zip.write_all(b"</sheetData></worksheet>")?;
        Ok(())
    }

    /// Finalize the package and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

/// Serialize `doc` into an in-memory XLSX file.
pub fn to_bytes(doc: &GridDocument) -> Result<Vec<u8>> {
    let mut writer = XlsxWriter::new(Cursor::new(Vec::new()));
    writer.write_document(doc)?;
    Ok(writer.finish()?.into_inner())
}

fn content_types() -> String {
    format!(
        concat!(
            "{}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
            "</Types>"
        ),
        DECLARATION
    )
}

fn root_rels() -> String {
    format!(
        r#"{DECLARATION}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{NS_REL}/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="{NS_REL}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

fn app_props() -> String {
    format!(
        r#"{DECLARATION}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>sheetpix</Application></Properties>"#
    )
}

fn workbook(sheet_name: &str) -> String {
    let name = xml::escape(&sanitize_sheet_name(sheet_name));
    format!(
        r#"{DECLARATION}<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}"><bookViews><workbookView/></bookViews><sheets><sheet name="{name}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

fn workbook_rels() -> String {
    format!(
        r#"{DECLARATION}<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{NS_REL}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{NS_REL}/styles" Target="styles.xml"/></Relationships>"#
    )
}

/// One solid fill and one cell format per registered fill style.
fn styles(doc: &GridDocument) -> String {
    let fills = doc.fills();
    let mut out = String::with_capacity(512 + fills.len() * 160);

    out.push_str(DECLARATION);
    out.push_str(&format!(r#"<styleSheet xmlns="{NS_MAIN}">"#));
    out.push_str(r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#);

    out.push_str(&format!(r#"<fills count="{}">"#, fills.len() + FIRST_FILL_ID));
    out.push_str(r#"<fill><patternFill patternType="none"/></fill>"#);
    out.push_str(r#"<fill><patternFill patternType="gray125"/></fill>"#);
    for fill in fills {
        let argb = format!("FF{:06X}", fill.color.value());
        out.push_str(&format!(
            r#"<fill><patternFill patternType="solid"><fgColor rgb="{argb}"/><bgColor rgb="{argb}"/></patternFill></fill>"#
        ));
    }
    out.push_str("</fills>");

    out.push_str(r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#);
    out.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

    out.push_str(&format!(r#"<cellXfs count="{}">"#, fills.len() + 1));
    out.push_str(r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#);
    for i in 0..fills.len() {
        out.push_str(&format!(
            r#"<xf numFmtId="0" fontId="0" fillId="{}" borderId="0" xfId="0" applyFill="1"/>"#,
            i + FIRST_FILL_ID
        ));
    }
    out.push_str("</cellXfs>");

    out.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);
    out.push_str("</styleSheet>");
    out
}
