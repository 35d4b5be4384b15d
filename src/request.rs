//! Watermark parameters: what to write, in which color, at which size.

use std::path::PathBuf;

use image::Rgba;

use crate::error::{Error, Result};

/// Brand used when none is supplied.
pub const DEFAULT_BRAND: &str = "Mionjo";
/// Semi-transparent white.
pub const DEFAULT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 128]);
/// Font size in points.
pub const DEFAULT_FONT_SIZE: u32 = 40;
/// Largest accepted font size in points.
///
/// Outline glyphs are rasterized whole before clipping, so the glyph
/// bitmap grows with the square of the size.
pub const MAX_FONT_SIZE: u32 = 2048;

/// Styling shared by every image of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkStyle {
    /// Text following the `© <year>` prefix.
    pub brand: String,
    /// Text color; the alpha channel controls translucency.
    pub color: Rgba<u8>,
    /// Font size in points, `1..=MAX_FONT_SIZE`.
    pub font_size: u32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            brand: DEFAULT_BRAND.to_string(),
            color: DEFAULT_COLOR,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl WatermarkStyle {
    /// Check the style can be rendered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFontSize`] for a size outside `1..=MAX_FONT_SIZE`.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FONT_SIZE).contains(&self.font_size) {
            return Err(Error::InvalidFontSize(self.font_size));
        }
        Ok(())
    }

    /// The notice drawn on the image for the given `year`.
    #[must_use]
    pub fn copyright_text(&self, year: i32) -> String {
        copyright_text(&self.brand, year)
    }
}

/// One image to stamp: where it comes from, where it goes, how it looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkRequest {
    /// Image to read.
    pub source: PathBuf,
    /// JPEG file to write.
    pub destination: PathBuf,
    /// Text styling.
    pub style: WatermarkStyle,
}

impl WatermarkRequest {
    /// Build a request with an explicit style.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        style: WatermarkStyle,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            style,
        }
    }
}

/// Format `© <year> <brand>`.
///
/// The year is written as a plain integer, with no locale grouping.
#[must_use]
pub fn copyright_text(brand: &str, year: i32) -> String {
    format!("\u{a9} {year} {brand}")
}

/// Parse a color from `#RRGGBB`, `#RRGGBBAA`, `r,g,b` or `r,g,b,a`.
///
/// A missing alpha component means fully opaque.
///
/// # Errors
///
/// Returns [`Error::InvalidColor`] when the string matches none of the forms.
pub fn parse_color(s: &str) -> Result<Rgba<u8>> {
    let invalid = || Error::InvalidColor(s.to_string());
    let trimmed = s.trim();

    let channels: Vec<u8> = if let Some(hex) = trimmed.strip_prefix('#') {
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid())?
    } else {
        trimmed
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid())?
    };

    match channels[..] {
        [r, g, b] => Ok(Rgba([r, g, b, 255])),
        [r, g, b, a] => Ok(Rgba([r, g, b, a])),
        _ => Err(invalid()),
    }
}
