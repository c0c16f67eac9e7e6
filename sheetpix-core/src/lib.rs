pub mod config;
pub mod decode;
pub mod dither;
pub mod encode;
pub mod error;
pub mod format;
pub mod grid;
pub mod pipeline;
pub mod quantize;
pub mod resize;
mod xml;

pub use config::{ConversionConfig, ResampleKernel};
pub use error::{ConversionError, Result};
pub use pipeline::convert;
