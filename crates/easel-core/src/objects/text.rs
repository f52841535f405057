//! Text objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use kurbo::{BezPath, Rect, Shape as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default line height multiplier.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.16;

/// Average glyph advance as a fraction of the font size, used to size the
/// text box before real font metrics are known.
const AVERAGE_ADVANCE: f64 = 0.6;

/// CSS-style numeric font weight (100..=900).
///
/// Serialized as `"normal"`, `"bold"` or the number as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const SEMI_BOLD: FontWeight = FontWeight(600);
    pub const BOLD: FontWeight = FontWeight(700);

    pub fn is_bold(&self) -> bool {
        self.0 >= 600
    }

    /// Toggle between normal and bold, as the property panel does.
    pub fn toggled(self) -> Self {
        if self.is_bold() { Self::NORMAL } else { Self::BOLD }
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl Serialize for FontWeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            400 => serializer.serialize_str("normal"),
            700 => serializer.serialize_str("bold"),
            n => serializer.serialize_str(&n.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FontWeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u16),
            Text(String),
        }

        let weight = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "normal" | "regular" => 400,
                "bold" => 700,
                "lighter" => 300,
                "bolder" => 800,
                other => other
                    .parse()
                    .map_err(|_| serde::de::Error::custom(format!("invalid font weight {s:?}")))?,
            },
        };
        Ok(FontWeight(weight.clamp(100, 900)))
    }
}

/// Horizontal alignment of text lines within the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// A block of text. Lines are separated by `\n`; the box does not wrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(rename = "text", default)]
    pub content: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
}

fn default_font_family() -> String {
    "Georgia, serif".to_string()
}

fn default_font_size() -> f64 {
    18.0
}

fn default_line_height() -> f64 {
    DEFAULT_LINE_HEIGHT
}

impl TextObject {
    pub fn new(content: impl Into<String>, font_size: f64) -> Self {
        let mut text = Self {
            base: ObjectBase {
                name: "Text".to_string(),
                ..ObjectBase::default()
            },
            content: content.into(),
            font_family: default_font_family(),
            font_size,
            font_weight: FontWeight::NORMAL,
            italic: false,
            underline: false,
            strikethrough: false,
            text_align: TextAlign::Left,
            line_height: DEFAULT_LINE_HEIGHT,
        };
        text.fit_box();
        text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// Height of one line in intrinsic units.
    pub fn line_advance(&self) -> f64 {
        self.font_size * self.line_height
    }

    /// Resize the intrinsic box to the content. Width is estimated from the
    /// longest line since the core has no font metrics; the renderer
    /// aligns real glyphs inside this box.
    pub fn fit_box(&mut self) {
        let longest = self.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let line_count = self.lines().count().max(1);
        self.base.width = (longest as f64 * self.font_size * AVERAGE_ADVANCE).max(self.font_size);
        self.base.height = line_count as f64 * self.line_advance();
    }
}

impl ObjectShape for TextObject {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn local_path(&self) -> BezPath {
        Rect::new(0.0, 0.0, self.base.width, self.base.height).to_path(0.1)
    }

    fn apply_specific(&mut self, patch: &AttributePatch) {
        let mut reflow = false;
        if let Some(content) = &patch.text {
            self.content = content.clone();
            reflow = true;
        }
        if let Some(family) = &patch.font_family {
            self.font_family = family.clone();
        }
        if let Some(size) = patch.font_size.filter(|s| s.is_finite() && *s > 0.0) {
            self.font_size = size;
            reflow = true;
        }
        if let Some(weight) = patch.font_weight {
            self.font_weight = weight;
        }
        if let Some(italic) = patch.italic {
            self.italic = italic;
        }
        if let Some(underline) = patch.underline {
            self.underline = underline;
        }
        if let Some(strike) = patch.strikethrough {
            self.strikethrough = strike;
        }
        if let Some(align) = patch.text_align {
            self.text_align = align;
        }
        if let Some(lh) = patch.line_height.filter(|v| v.is_finite() && *v > 0.0) {
            self.line_height = lh;
            reflow = true;
        }
        if reflow {
            self.fit_box();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_weight_serde() {
        assert_eq!(serde_json::to_string(&FontWeight::BOLD).unwrap(), "\"bold\"");
        assert_eq!(serde_json::to_string(&FontWeight::SEMI_BOLD).unwrap(), "\"600\"");
        let w: FontWeight = serde_json::from_str("\"600\"").unwrap();
        assert_eq!(w, FontWeight::SEMI_BOLD);
        let w: FontWeight = serde_json::from_str("700").unwrap();
        assert!(w.is_bold());
        assert!(serde_json::from_str::<FontWeight>("\"heavy-ish\"").is_err());
    }

    #[test]
    fn test_box_follows_content() {
        let mut text = TextObject::new("Hello", 20.0);
        assert!((text.base.height - 20.0 * DEFAULT_LINE_HEIGHT).abs() < 1e-9);

        text.apply_specific(&AttributePatch::new().with_text("one\ntwo\nthree"));
        assert!((text.base.height - 3.0 * 20.0 * DEFAULT_LINE_HEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_font_size_patch_ignores_nonpositive() {
        let mut text = TextObject::new("Hi", 18.0);
        text.apply_specific(&AttributePatch::new().with_font_size(0.0));
        assert_eq!(text.font_size, 18.0);
    }
}
