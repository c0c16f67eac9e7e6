use std::fmt;
use std::str::FromStr;

use crate::error::{ConversionError, Result};

pub const DEFAULT_MAX_DIMENSION: u32 = 128;
pub const MAX_COLOR_COUNT: u16 = 256;

/// Interpolation kernel used when shrinking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResampleKernel {
    /// Hard edges, no new colors.
    #[default]
    Nearest,
    /// Lanczos3. Smoother, but blends colors along edges.
    Lanczos,
}

impl ResampleKernel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for ResampleKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResampleKernel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "lanczos" => Ok(Self::Lanczos),
            other => Err(ConversionError::InvalidConfig(format!(
                "unknown resampling kernel {other:?} (expected nearest or lanczos)"
            ))),
        }
    }
}

/// Settings for one conversion. `max_dimension` and `kernel` only matter
/// when `should_resize` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionConfig {
    pub should_resize: bool,
    pub max_dimension: u32,
    pub kernel: ResampleKernel,
    /// Palette size for quantization; `None` keeps every color.
    pub color_count: Option<u16>,
    /// Refuse to encode images with more distinct colors than this.
    pub style_limit: Option<usize>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            should_resize: true,
            max_dimension: DEFAULT_MAX_DIMENSION,
            kernel: ResampleKernel::Nearest,
            color_count: None,
            style_limit: None,
        }
    }
}

impl ConversionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.should_resize && self.max_dimension == 0 {
            return Err(ConversionError::InvalidConfig(
                "max dimension must be at least 1".into(),
            ));
        }
        if let Some(n) = self.color_count {
            if n == 0 || n > MAX_COLOR_COUNT {
                return Err(ConversionError::InvalidConfig(format!(
                    "color count must be between 1 and {MAX_COLOR_COUNT}, got {n}"
                )));
            }
        }
        if self.style_limit == Some(0) {
            return Err(ConversionError::InvalidConfig(
                "style limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_parses_case_insensitively() {
        assert_eq!("Lanczos".parse::<ResampleKernel>().unwrap(), ResampleKernel::Lanczos);
        assert_eq!(" nearest ".parse::<ResampleKernel>().unwrap(), ResampleKernel::Nearest);
        assert!("bicubic".parse::<ResampleKernel>().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        assert!(ConversionConfig::default().validate().is_ok());

        let zero_size = ConversionConfig { max_dimension: 0, ..Default::default() };
        assert!(zero_size.validate().is_err());

        // Ignored when resizing is off.
        let unresized = ConversionConfig { should_resize: false, max_dimension: 0, ..Default::default() };
        assert!(unresized.validate().is_ok());

        for bad in [0, 257] {
            let cfg = ConversionConfig { color_count: Some(bad), ..Default::default() };
            assert!(matches!(cfg.validate(), Err(ConversionError::InvalidConfig(_))));
        }
    }
}
