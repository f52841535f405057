//! RGBA colors serialized as CSS color strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Color parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color: {0:?}")]
pub struct ColorParseError(pub String);

/// An RGBA8 color.
///
/// Serialized as `#rrggbb` when opaque, `#rrggbbaa` otherwise, and
/// `"transparent"` for fully transparent black. Parsing also accepts
/// `#rgb`, `rgb(..)` and `rgba(..)` forms found in older payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Accent used by the shape presets.
    pub const INDIGO: Color = Color::rgb(0x63, 0x66, 0xf1);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Returns this color with its alpha multiplied by `opacity` (0..=1).
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }

    /// CSS hex form.
    pub fn to_hex(&self) -> String {
        if *self == Color::TRANSPARENT {
            "transparent".to_string()
        } else if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let err = || ColorParseError(s.to_string());

        if input.is_empty() || input.eq_ignore_ascii_case("transparent") || input == "none" {
            return Ok(Color::TRANSPARENT);
        }

        if let Some(hex) = input.strip_prefix('#') {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            if !hex.is_ascii() {
                return Err(err());
            }
            return match hex.len() {
                3 => Ok(Color::rgb(
                    nibble(0).map_err(|_| err())?,
                    nibble(1).map_err(|_| err())?,
                    nibble(2).map_err(|_| err())?,
                )),
                6 | 8 => {
                    let a = if hex.len() == 8 { byte(6).map_err(|_| err())? } else { 255 };
                    Ok(Color::rgba(
                        byte(0).map_err(|_| err())?,
                        byte(2).map_err(|_| err())?,
                        byte(4).map_err(|_| err())?,
                        a,
                    ))
                }
                _ => Err(err()),
            };
        }

        let lower = input.to_ascii_lowercase();
        let args = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(err());
        }
        let channel = |p: &str| p.parse::<f64>().map(|v| v.clamp(0.0, 255.0).round() as u8);
        let r = channel(parts[0]).map_err(|_| err())?;
        let g = channel(parts[1]).map_err(|_| err())?;
        let b = channel(parts[2]).map_err(|_| err())?;
        let a = match parts.get(3) {
            Some(p) => {
                let alpha: f64 = p.parse().map_err(|_| err())?;
                (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        Ok(Color::rgba(r, g, b, a))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!("#6366f1".parse::<Color>().unwrap(), Color::INDIGO);
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!(
            "#00000080".parse::<Color>().unwrap(),
            Color::rgba(0, 0, 0, 0x80)
        );
        assert!("#12345".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_parse_css_functions() {
        assert_eq!("rgb(99, 102, 241)".parse::<Color>().unwrap(), Color::INDIGO);
        assert_eq!(
            "rgba(255,0,0,0.5)".parse::<Color>().unwrap(),
            Color::rgba(255, 0, 0, 128)
        );
        assert_eq!("transparent".parse::<Color>().unwrap(), Color::TRANSPARENT);
        assert!("hsl(0, 0%, 0%)".parse::<Color>().is_err());
    }

    #[test]
    fn test_serialize_forms() {
        assert_eq!(serde_json::to_string(&Color::INDIGO).unwrap(), "\"#6366f1\"");
        assert_eq!(
            serde_json::to_string(&Color::TRANSPARENT).unwrap(),
            "\"transparent\""
        );
        let translucent = Color::rgba(10, 20, 30, 40);
        let json = serde_json::to_string(&translucent).unwrap();
        assert_eq!(serde_json::from_str::<Color>(&json).unwrap(), translucent);
    }

    #[test]
    fn test_with_opacity() {
        assert_eq!(Color::WHITE.with_opacity(0.5).a, 128);
        assert_eq!(Color::WHITE.with_opacity(2.0).a, 255);
    }
}
