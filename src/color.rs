//! Color parsing for map and tileset color attributes
//!
//! Supports the following formats:
//! - Hex: `#RGB`, `#RRGGBB`, and `#AARRGGBB` (alpha first, as tile map files store it)
//! - Anything else CSS understands: `rgb()`, `hsl()`, named colors, etc.

use image::Rgba;
use lightningcss::traits::Parse;
use lightningcss::values::color::CssColor;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// CSS parsing error from lightningcss
    #[error("CSS parse error: {0}")]
    CssParse(String),
}

/// Parse a color string into an RGBA color.
///
/// Eight-digit hex colors are read as `#AARRGGBB`, which is how tile map
/// editors write background and object group colors. A `#` prefix is
/// optional for hex input, matching the `transparentcolor` attribute of
/// older tileset files.
///
/// # Examples
///
/// ```
/// use tilecache::color::parse_color;
///
/// assert_eq!(parse_color("#ff00ff").unwrap(), image::Rgba([255, 0, 255, 255]));
/// assert_eq!(parse_color("#80ff0000").unwrap(), image::Rgba([255, 0, 0, 128]));
/// assert_eq!(parse_color("blue").unwrap(), image::Rgba([0, 0, 255, 255]));
/// ```
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }

    if matches!(s.len(), 6 | 8) && s.chars().all(|c| c.is_ascii_hexdigit()) {
        return parse_hex_color(s);
    }

    parse_css_color(s)
}

/// Whether two colors have the same red, green and blue channels.
///
/// Alpha is ignored; this is the comparison used for color-keyed
/// transparency.
pub fn same_rgb(a: Rgba<u8>, b: Rgba<u8>) -> bool {
    a.0[..3] == b.0[..3]
}

fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, ColorError> {
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(c));
    }

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => {
            let r = hex_digit(bytes[0]) * 17;
            let g = hex_digit(bytes[1]) * 17;
            let b = hex_digit(bytes[2]) * 17;
            Ok(Rgba([r, g, b, 255]))
        }
        6 => Ok(Rgba([hex_pair(&bytes[0..2]), hex_pair(&bytes[2..4]), hex_pair(&bytes[4..6]), 255])),
        8 => {
            let a = hex_pair(&bytes[0..2]);
            Ok(Rgba([hex_pair(&bytes[2..4]), hex_pair(&bytes[4..6]), hex_pair(&bytes[6..8]), a]))
        }
        len => Err(ColorError::InvalidLength(len)),
    }
}

/// Parse a CSS color using lightningcss (rgb, hsl, hwb, oklch, named colors)
fn parse_css_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let css_color = CssColor::parse_string(s).map_err(|e| ColorError::CssParse(e.to_string()))?;
    css_color_to_rgba(css_color)
}

fn css_color_to_rgba(color: CssColor) -> Result<Rgba<u8>, ColorError> {
    use lightningcss::values::color::FloatColor;

    let rgb_color = color
        .to_rgb()
        .map_err(|_| ColorError::CssParse("cannot convert color to RGB".to_string()))?;

    match rgb_color {
        CssColor::RGBA(rgba) => Ok(Rgba([rgba.red, rgba.green, rgba.blue, rgba.alpha])),
        CssColor::Float(float_color) => match float_color.as_ref() {
            FloatColor::RGB(rgb) => {
                let r = (rgb.r * 255.0).round() as u8;
                let g = (rgb.g * 255.0).round() as u8;
                let b = (rgb.b * 255.0).round() as u8;
                let a = (rgb.alpha * 255.0).round() as u8;
                Ok(Rgba([r, g, b, a]))
            }
            _ => Err(ColorError::CssParse("unexpected float color format".to_string())),
        },
        _ => Err(ColorError::CssParse("color conversion did not produce RGB".to_string())),
    }
}

// Callers validate with is_ascii_hexdigit first.
fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

fn hex_pair(pair: &[u8]) -> u8 {
    hex_digit(pair[0]) * 16 + hex_digit(pair[1])
}
