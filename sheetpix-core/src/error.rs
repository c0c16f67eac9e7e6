/// Everything that can abort a conversion. Each variant carries a message fit
/// for showing to the person who asked for the conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("resize failed: {0}")]
    Resize(String),

    #[error("image has {found} distinct colors, more than the limit of {limit}")]
    StyleLimit { found: usize, limit: usize },

    #[error("spreadsheet serialization failed: {0}")]
    Serialize(#[from] zip::result::ZipError),

    #[error("sheet cannot be saved as XLSX: {0}")]
    SheetLimit(String),

    #[error("malformed workbook: {0}")]
    Malformed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
