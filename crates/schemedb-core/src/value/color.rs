//! RGBA color values normalized to canonical hex form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An RGBA color.
///
/// The canonical textual form is uppercase `#RRGGBB` or `#RRGGBBAA`; the
/// alpha channel is kept only when the input carried one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, if the source form had one.
    pub a: Option<u8>,
}

impl Color {
    /// Opaque black, the conversion result for blank input.
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: None,
    };

    /// Build an opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: None }
    }

    /// Build a color with an explicit alpha channel.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a: Some(a) }
    }

    /// Parse a hex color string.
    ///
    /// Accepts 6- or 8-digit hex with or without a leading `#`, in any
    /// letter case. Blank or whitespace-only input normalizes to
    /// [`Color::BLACK`]; anything else malformed is a conversion error.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Color::BLACK);
        }

        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|_| Error::conversion("Color", format!("malformed hex color '{}'", input)))?;

        match bytes.as_slice() {
            [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
            [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
            _ => Err(Error::conversion(
                "Color",
                format!("expected 6 or 8 hex digits, got '{}'", input),
            )),
        }
    }

    /// The canonical uppercase hex form.
    pub fn to_hex(&self) -> String {
        match self.a {
            Some(a) => format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, a),
            None => format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_six_digits() {
        let color = Color::parse("#ff8000").unwrap();
        assert_eq!(color, Color::rgb(255, 128, 0));
        assert_eq!(color.to_hex(), "#FF8000");
    }

    #[test]
    fn test_parse_eight_digits() {
        let color = Color::parse("80FF0040").unwrap();
        assert_eq!(color, Color::rgba(128, 255, 0, 64));
        assert_eq!(color.to_hex(), "#80FF0040");
    }

    #[test]
    fn test_blank_is_black() {
        assert_eq!(Color::parse("").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("   ").unwrap(), Color::BLACK);
        assert_eq!(Color::BLACK.to_hex(), "#000000");
    }

    #[test]
    fn test_malformed_fails() {
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#GGHHII").is_err());
        assert!(Color::parse("not a color").is_err());
    }
}
