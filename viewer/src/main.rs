mod render;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyEvent};
use crossterm::terminal;

use sheetpix_core::decode::XlsxReader;

#[derive(Parser)]
#[command(name = "sheetpix-view", about = "Preview a pixel-art workbook in the terminal")]
struct Cli {
    /// Path to .xlsx file
    input: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file = File::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?;
    let doc = XlsxReader::new(BufReader::new(file))?
        .read_document()
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let cols = doc.width();
    let lines = doc.height().div_ceil(2);

    // Check terminal size
    let (term_cols, term_rows) = terminal::size()?;
    if (term_cols as u32) < cols || (term_rows as u32) < lines {
        eprintln!(
            "Warning: terminal is {}x{} but the sheet needs {}x{}. Only the top-left part will be shown.",
            term_cols, term_rows, cols, lines
        );
    }

    // Set up panic hook for terminal cleanup
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = cleanup_terminal();
        original_hook(info);
    }));

    // Enter alternate screen, raw mode, hide cursor
    terminal::enable_raw_mode()?;
    let stdout = std::io::stdout();
    let mut stdout = BufWriter::with_capacity(256 * 1024, stdout.lock());
    stdout.write_all(b"\x1b[?1049h")?; // enter alternate screen
    stdout.write_all(b"\x1b[?25l")?; // hide cursor

    let result = show_until_key(&doc, &mut stdout, term_cols, term_rows);

    // Cleanup
    stdout.write_all(b"\x1b[0m")?; // reset colors
    stdout.write_all(b"\x1b[?25h")?; // show cursor
    stdout.write_all(b"\x1b[?1049l")?; // leave alternate screen
    stdout.flush()?;
    terminal::disable_raw_mode()?;

    result
}

fn show_until_key(
    doc: &sheetpix_core::format::GridDocument,
    stdout: &mut impl Write,
    term_cols: u16,
    term_rows: u16,
) -> anyhow::Result<()> {
    let mut render_buf = Vec::with_capacity(256 * 1024);
    // Keep the last line free for the footer.
    render::render_grid(doc, term_cols, term_rows.saturating_sub(1), &mut render_buf);
    stdout.write_all(b"\x1b[2J")?;
    stdout.write_all(&render_buf)?;
    write!(
        stdout,
        "\x1b[{};1H{} ({}x{} cells, {} fills) - press any key",
        term_rows,
        doc.sheet_name,
        doc.width(),
        doc.height(),
        doc.fills().len()
    )?;
    stdout.flush()?;

    loop {
        if let Event::Key(KeyEvent { .. }) = event::read()? {
            return Ok(());
        }
    }
}

fn cleanup_terminal() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(b"\x1b[0m\x1b[?25h\x1b[?1049l")?;
    stdout.flush()?;
    terminal::disable_raw_mode()
}
