//! Default objects inserted by the tools and element panels.

use crate::assets::AssetRef;
use crate::color::Color;
use crate::objects::{
    AttributePatch, EllipseObject, FontWeight, ImageObject, LineObject, PolygonObject, RectObject,
    SceneObject, TextObject, TriangleObject,
};
use kurbo::Point;

/// Where text presets land when inserted without a pointer position.
pub const TEXT_DEFAULT_POSITION: Point = Point::new(100.0, 100.0);
/// Where shape presets land when inserted without a pointer position.
pub const SHAPE_DEFAULT_POSITION: Point = Point::new(150.0, 150.0);
/// Where the line preset lands when inserted without a pointer position.
pub const LINE_DEFAULT_POSITION: Point = Point::new(150.0, 200.0);
/// Widest an inserted image may be, before the half-canvas rule.
pub const IMAGE_MAX_WIDTH: f64 = 300.0;

/// Text styles offered by the text panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextPreset {
    Heading,
    Subheading,
    Body,
    Caption,
}

impl TextPreset {
    pub const ALL: [TextPreset; 4] = [
        TextPreset::Heading,
        TextPreset::Subheading,
        TextPreset::Body,
        TextPreset::Caption,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextPreset::Heading => "Heading",
            TextPreset::Subheading => "Subheading",
            TextPreset::Body => "Body",
            TextPreset::Caption => "Caption",
        }
    }

    fn spec(&self) -> (&'static str, f64, FontWeight) {
        match self {
            TextPreset::Heading => ("Add a heading", 48.0, FontWeight::BOLD),
            TextPreset::Subheading => ("Add a subheading", 32.0, FontWeight::SEMI_BOLD),
            TextPreset::Body => ("Add body text", 18.0, FontWeight::NORMAL),
            TextPreset::Caption => ("Add a caption", 13.0, FontWeight::NORMAL),
        }
    }

    pub fn build(&self) -> SceneObject {
        let (content, size, weight) = self.spec();
        let mut text = TextObject::new(content, size);
        text.font_weight = weight;
        text.base.fill = Color::BLACK;
        SceneObject::Text(text)
    }
}

/// Shapes offered by the shape panel and the shape tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapePreset {
    Rect,
    Circle,
    Triangle,
    Line,
    Star,
}

impl ShapePreset {
    pub const ALL: [ShapePreset; 5] = [
        ShapePreset::Rect,
        ShapePreset::Circle,
        ShapePreset::Triangle,
        ShapePreset::Line,
        ShapePreset::Star,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShapePreset::Rect => "Rectangle",
            ShapePreset::Circle => "Circle",
            ShapePreset::Triangle => "Triangle",
            ShapePreset::Line => "Line",
            ShapePreset::Star => "Star",
        }
    }

    pub fn default_position(&self) -> Point {
        match self {
            ShapePreset::Line => LINE_DEFAULT_POSITION,
            _ => SHAPE_DEFAULT_POSITION,
        }
    }

    pub fn build(&self) -> SceneObject {
        let filled = AttributePatch::new()
            .with_fill(Color::INDIGO)
            .with_stroke(Color::TRANSPARENT, 0.0);
        let mut object = match self {
            ShapePreset::Rect => SceneObject::Rect(RectObject::new(200.0, 150.0)),
            ShapePreset::Circle => SceneObject::Ellipse(EllipseObject::new(200.0, 200.0)),
            ShapePreset::Triangle => SceneObject::Triangle(TriangleObject::new(200.0, 180.0)),
            ShapePreset::Star => SceneObject::Polygon(PolygonObject::star(5, 80.0, 40.0)),
            ShapePreset::Line => {
                let mut line = LineObject::new(Point::ZERO, Point::new(300.0, 0.0));
                line.base.stroke = Color::INDIGO;
                line.base.stroke_width = 3.0;
                return SceneObject::Line(line);
            }
        };
        object.apply(&filled);
        object
    }
}

/// Anything the element panels can insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Text(TextPreset),
    Shape(ShapePreset),
}

impl Preset {
    pub fn build(&self) -> SceneObject {
        match self {
            Preset::Text(p) => p.build(),
            Preset::Shape(p) => p.build(),
        }
    }

    pub fn default_position(&self) -> Point {
        match self {
            Preset::Text(_) => TEXT_DEFAULT_POSITION,
            Preset::Shape(p) => p.default_position(),
        }
    }

    /// The preset built with its top-left at `at`.
    pub fn build_at(&self, at: Point) -> SceneObject {
        let mut object = self.build();
        object.apply(&AttributePatch::new().with_position(at.x, at.y));
        object
    }
}

/// An image object for an uploaded asset, scaled uniformly so its width is
/// `min(300, canvas_width / 2)`, with its top-left at `at`.
pub fn image_from_asset(asset: &AssetRef, canvas_width: f64, at: Point) -> SceneObject {
    let mut image = ImageObject::new(asset.url.clone(), asset.width.max(1.0), asset.height.max(1.0));
    image.scale_to_width(IMAGE_MAX_WIDTH.min(canvas_width / 2.0));
    image.base.left = at.x;
    image.base.top = at.y;
    SceneObject::Image(image)
}
