use std::path::{Path, PathBuf};

use sheetpix_core::format::FILE_EXTENSION;
use sheetpix_core::ConversionConfig;

/// `{stem}_{size}_{colors}_art.xlsx`, e.g. `cat_128px_16colors_art.xlsx`.
pub fn output_file_name(stem: &str, config: &ConversionConfig) -> String {
    let size = if config.should_resize {
        format!("{}px", config.max_dimension)
    } else {
        "original".to_string()
    };
    let colors = match config.color_count {
        Some(n) => format!("{n}colors"),
        None => "fullcolor".to_string(),
    };
    format!("{stem}_{size}_{colors}_art.{FILE_EXTENSION}")
}

/// Derived output path next to the input file.
pub fn default_output_path(input: &Path, config: &ConversionConfig) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(output_file_name(&stem, config))
}
