use sheetpix_core::format::GridDocument;

const LOWER_HALF: &str = "▄";
const UPPER_HALF: &str = "▀";

/// Unfilled cells show as the spreadsheet's default white.
const BLANK: (u8, u8, u8) = (255, 255, 255);

fn color_at(doc: &GridDocument, row: u32, col: u32) -> (u8, u8, u8) {
    doc.cell_color(row, col)
        .map(|c| {
            let [r, g, b] = c.to_rgb();
            (r, g, b)
        })
        .unwrap_or(BLANK)
}

/// Render the sheet to an ANSI byte buffer, two sheet rows per terminal line:
/// background = upper row, foreground = lower row. Escapes are skipped when
/// the color did not change. Only the top-left `max_cols × max_lines` part is drawn.
pub fn render_grid(doc: &GridDocument, max_cols: u16, max_lines: u16, buf: &mut Vec<u8>) {
    buf.clear();

    // Move cursor to top-left
    buf.extend_from_slice(b"\x1b[H");

    let cols = doc.width().min(max_cols as u32);
    let lines = doc.height().div_ceil(2).min(max_lines as u32);

    let mut prev_bg = None;
    let mut prev_fg = None;

    for line in 0..lines {
        if line > 0 {
            buf.extend_from_slice(b"\x1b[0m\r\n");
            prev_bg = None;
            prev_fg = None;
        }
        let top_row = line * 2 + 1;
        let bottom_row = top_row + 1;

        for col in 1..=cols {
            let top = color_at(doc, top_row, col);

            if bottom_row > doc.height() {
                // Odd height: draw only the upper half on the default background.
                if prev_fg != Some(top) {
                    write_fg(buf, top.0, top.1, top.2);
                    prev_fg = Some(top);
                }
                if prev_bg.is_some() {
                    buf.extend_from_slice(b"\x1b[49m");
                    prev_bg = None;
                }
                buf.extend_from_slice(UPPER_HALF.as_bytes());
                continue;
            }

            let bottom = color_at(doc, bottom_row, col);
            if prev_bg != Some(top) {
                write_bg(buf, top.0, top.1, top.2);
                prev_bg = Some(top);
            }
            if prev_fg != Some(bottom) {
                write_fg(buf, bottom.0, bottom.1, bottom.2);
                prev_fg = Some(bottom);
            }
            buf.extend_from_slice(LOWER_HALF.as_bytes());
        }
    }

    // Reset colors
    buf.extend_from_slice(b"\x1b[0m");
}

fn write_bg(buf: &mut Vec<u8>, r: u8, g: u8, b: u8) {
    buf.extend_from_slice(b"\x1b[48;2;");
    write_u8(buf, r);
    buf.push(b';');
    write_u8(buf, g);
    buf.push(b';');
    write_u8(buf, b);
    buf.push(b'm');
}

fn write_fg(buf: &mut Vec<u8>, r: u8, g: u8, b: u8) {
    buf.extend_from_slice(b"\x1b[38;2;");
    write_u8(buf, r);
    buf.push(b';');
    write_u8(buf, g);
    buf.push(b';');
    write_u8(buf, b);
    buf.push(b'm');
}

/// Integer-to-ASCII for u8 values (0-255), no allocation.
fn write_u8(buf: &mut Vec<u8>, v: u8) {
    if v >= 100 {
        buf.push(b'0' + v / 100);
        buf.push(b'0' + (v / 10) % 10);
        buf.push(b'0' + v % 10);
    } else if v >= 10 {
        buf.push(b'0' + v / 10);
        buf.push(b'0' + v % 10);
    } else {
        buf.push(b'0' + v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetpix_core::format::ColorKey;

    #[test]
    fn two_rows_share_a_line() {
        let mut doc = GridDocument::new(1, 2);
        let red = doc.add_fill(ColorKey::new(255, 0, 0));
        let blue = doc.add_fill(ColorKey::new(0, 0, 255));
        doc.set_cell(1, 1, red);
        doc.set_cell(2, 1, blue);

        let mut buf = Vec::new();
        render_grid(&doc, 80, 24, &mut buf);
        let out = String::from_utf8(buf).unwrap();

        assert!(out.contains("\x1b[48;2;255;0;0m"));
        assert!(out.contains("\x1b[38;2;0;0;255m"));
        assert_eq!(out.matches(LOWER_HALF).count(), 1);
    }

    #[test]
    fn odd_height_uses_upper_half() {
        let doc = GridDocument::new(3, 3);
        let mut buf = Vec::new();
        render_grid(&doc, 80, 24, &mut buf);
        let out = String::from_utf8(buf).unwrap();

        assert_eq!(out.matches(LOWER_HALF).count(), 3);
        assert_eq!(out.matches(UPPER_HALF).count(), 3);
    }

    #[test]
    fn clips_to_terminal() {
        let doc = GridDocument::new(10, 10);
        let mut buf = Vec::new();
        render_grid(&doc, 4, 2, &mut buf);
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.matches(LOWER_HALF).count(), 8);
    }
}
