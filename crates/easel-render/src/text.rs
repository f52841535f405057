//! Text outlines from system fonts.
//!
//! Faces are resolved through a `fontdb` database by CSS family list,
//! weight and style, then laid out with `ab_glyph` metrics. Glyphs become
//! plain paths in the text object's local box, so the rasterizer treats
//! text like any other filled shape.

use ab_glyph::{Font, FontArc, FontVec, OutlineCurve};
use easel_core::objects::{TextAlign, TextObject};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use kurbo::{BezPath, Point, Rect, Shape as _};
use std::collections::HashMap;

#[derive(Clone, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    weight: u16,
    italic: bool,
}

/// Glyph and decoration paths for one text object, in its local box.
#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    pub glyphs: BezPath,
    /// Underline and strikethrough bars.
    pub decorations: BezPath,
    /// Widest line, in local units.
    pub width: f64,
}

/// Font lookup with a per-face cache.
pub struct FontBook {
    db: Database,
    cache: HashMap<FontKey, Option<FontArc>>,
}

impl FontBook {
    /// Load the fonts installed on this machine.
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} system font faces", db.len());
        Self::from_database(db)
    }

    /// No fonts at all; every text object is skipped.
    pub fn empty() -> Self {
        Self::from_database(Database::new())
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    /// Register font data (TTF/OTF/TTC).
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
        self.cache.clear();
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Best face for a CSS family list such as `"Georgia, serif"`.
    pub fn resolve(&mut self, family: &str, weight: u16, italic: bool) -> Option<FontArc> {
        let key = FontKey {
            family: family.to_string(),
            weight,
            italic,
        };
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let font = self.load(family, weight, italic);
        if font.is_none() {
            log::warn!("No font available for {family:?} (weight {weight}), skipping text");
        }
        self.cache.insert(key, font.clone());
        font
    }

    fn load(&self, family: &str, weight: u16, italic: bool) -> Option<FontArc> {
        let names: Vec<String> = family
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" => Family::SansSerif,
                "monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name),
            })
            .collect();
        families.push(Family::SansSerif);

        let query = Query {
            families: &families,
            weight: Weight(weight),
            stretch: Stretch::Normal,
            style: if italic { Style::Italic } else { Style::Normal },
        };

        let id = self.db.query(&query).or_else(|| self.db.faces().next().map(|face| face.id))?;
        self.db
            .with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index).ok())
            .flatten()
            .map(FontArc::new)
    }

    /// Lay out a text object. `None` when no font can be found.
    pub fn layout(&mut self, text: &TextObject) -> Option<TextLayout> {
        let font = self.resolve(&text.font_family, text.font_weight.0, text.italic)?;
        Some(layout_text(&font, text))
    }
}

fn layout_text(font: &FontArc, text: &TextObject) -> TextLayout {
    let units_per_em = f64::from(font.units_per_em().unwrap_or(1000.0));
    let factor = text.font_size / units_per_em;
    let ascent = f64::from(font.ascent_unscaled()) * factor;
    let descent = f64::from(font.descent_unscaled()) * factor;
    let line_advance = text.line_advance();
    // Center the glyph extent inside each line box.
    let baseline_offset = (line_advance - (ascent - descent)) / 2.0 + ascent;
    let bar_height = (text.font_size / 15.0).max(1.0);

    let mut layout = TextLayout::default();
    for (row, line) in text.lines().enumerate() {
        let ids: Vec<_> = line.chars().map(|c| font.glyph_id(c)).collect();
        let mut advances = Vec::with_capacity(ids.len());
        let mut pen = 0.0;
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                pen += f64::from(font.kern_unscaled(ids[i - 1], *id)) * factor;
            }
            advances.push(pen);
            pen += f64::from(font.h_advance_unscaled(*id)) * factor;
        }
        let line_width = pen;
        layout.width = layout.width.max(line_width);

        let x0 = match text.text_align {
            TextAlign::Left | TextAlign::Justify => 0.0,
            TextAlign::Center => (text.base.width - line_width) / 2.0,
            TextAlign::Right => text.base.width - line_width,
        };
        let baseline = row as f64 * line_advance + baseline_offset;

        for (id, x) in ids.iter().zip(&advances) {
            if let Some(outline) = font.outline(*id) {
                append_outline(&mut layout.glyphs, &outline.curves, Point::new(x0 + x, baseline), factor);
            }
        }

        if line_width > 0.0 {
            if text.underline {
                let y = baseline + text.font_size * 0.1;
                append_rect(&mut layout.decorations, Rect::new(x0, y, x0 + line_width, y + bar_height));
            }
            if text.strikethrough {
                let y = baseline - ascent * 0.3;
                append_rect(&mut layout.decorations, Rect::new(x0, y, x0 + line_width, y + bar_height));
            }
        }
    }
    layout
}

/// Font units are y-up; the local box is y-down.
fn append_outline(path: &mut BezPath, curves: &[OutlineCurve], origin: Point, factor: f64) {
    let map = |p: ab_glyph::Point| {
        Point::new(origin.x + f64::from(p.x) * factor, origin.y - f64::from(p.y) * factor)
    };
    let mut last: Option<Point> = None;
    for curve in curves {
        let (start, end) = match curve {
            OutlineCurve::Line(a, b) => (map(*a), map(*b)),
            OutlineCurve::Quad(a, _, c) => (map(*a), map(*c)),
            OutlineCurve::Cubic(a, _, _, d) => (map(*a), map(*d)),
        };
        if last != Some(start) {
            if last.is_some() {
                path.close_path();
            }
            path.move_to(start);
        }
        match curve {
            OutlineCurve::Line(_, _) => path.line_to(end),
            OutlineCurve::Quad(_, b, _) => path.quad_to(map(*b), end),
            OutlineCurve::Cubic(_, b, c, _) => path.curve_to(map(*b), map(*c), end),
        }
        last = Some(end);
    }
    if last.is_some() {
        path.close_path();
    }
}

fn append_rect(path: &mut BezPath, rect: Rect) {
    path.extend(rect.path_elements(0.1));
}
