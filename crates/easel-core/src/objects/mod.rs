//! Scene object definitions.

mod base;
mod ellipse;
mod image;
mod line;
mod patch;
mod polygon;
mod rectangle;
mod text;
mod triangle;

pub use base::{MIN_SCALE, ObjectBase, normalize_angle, rotate_vec};
pub use ellipse::EllipseObject;
pub use image::ImageObject;
pub use line::LineObject;
pub use patch::AttributePatch;
pub use polygon::PolygonObject;
pub use rectangle::RectObject;
pub use text::{DEFAULT_LINE_HEIGHT, FontWeight, TextAlign, TextObject};
pub use triangle::TriangleObject;

use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a scene object, unique within a design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// A fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The kind of a scene object, as named in serialized payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Text,
    Rect,
    Ellipse,
    Triangle,
    Line,
    Polygon,
    Image,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 7] = [
        ObjectKind::Text,
        ObjectKind::Rect,
        ObjectKind::Ellipse,
        ObjectKind::Triangle,
        ObjectKind::Line,
        ObjectKind::Polygon,
        ObjectKind::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Text => "text",
            ObjectKind::Rect => "rect",
            ObjectKind::Ellipse => "ellipse",
            ObjectKind::Triangle => "triangle",
            ObjectKind::Line => "line",
            ObjectKind::Polygon => "polygon",
            ObjectKind::Image => "image",
        }
    }

    /// Resolve a kind name, accepting the legacy aliases `i-text`,
    /// `textbox` and `circle`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "i-text" | "itext" | "textbox" => Some(ObjectKind::Text),
            "rect" | "rectangle" => Some(ObjectKind::Rect),
            "ellipse" | "circle" => Some(ObjectKind::Ellipse),
            "triangle" => Some(ObjectKind::Triangle),
            "line" => Some(ObjectKind::Line),
            "polygon" => Some(ObjectKind::Polygon),
            "image" => Some(ObjectKind::Image),
            _ => None,
        }
    }

    /// Display name given to new objects of this kind.
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Text => "Text",
            ObjectKind::Rect => "Rect",
            ObjectKind::Ellipse => "Circle",
            ObjectKind::Triangle => "Triangle",
            ObjectKind::Line => "Line",
            ObjectKind::Polygon => "Polygon",
            ObjectKind::Image => "Image",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour shared by every object kind.
pub trait ObjectShape {
    fn base(&self) -> &ObjectBase;

    fn base_mut(&mut self) -> &mut ObjectBase;

    /// Outline in intrinsic local coordinates (origin at the box's top-left).
    fn local_path(&self) -> BezPath;

    /// Apply the kind-specific fields of a patch; other fields are ignored.
    fn apply_specific(&mut self, patch: &AttributePatch);
}

/// Distance from a point to the segment a→b.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (point - (a + seg * t)).hypot()
}

/// A visual object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SceneObject {
    Text(TextObject),
    Rect(RectObject),
    Ellipse(EllipseObject),
    Triangle(TriangleObject),
    Line(LineObject),
    Polygon(PolygonObject),
    Image(ImageObject),
}

impl SceneObject {
    /// A default object of the given kind at the origin.
    pub fn with_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Text => SceneObject::Text(TextObject::new("Add body text", 18.0)),
            ObjectKind::Rect => SceneObject::Rect(RectObject::new(200.0, 150.0)),
            ObjectKind::Ellipse => SceneObject::Ellipse(EllipseObject::new(200.0, 200.0)),
            ObjectKind::Triangle => SceneObject::Triangle(TriangleObject::new(200.0, 180.0)),
            ObjectKind::Line => {
                SceneObject::Line(LineObject::new(Point::ZERO, Point::new(300.0, 0.0)))
            }
            ObjectKind::Polygon => SceneObject::Polygon(PolygonObject::star(5, 80.0, 40.0)),
            ObjectKind::Image => SceneObject::Image(ImageObject::new("", 100.0, 100.0)),
        }
    }

    fn shape(&self) -> &dyn ObjectShape {
        match self {
            SceneObject::Text(o) => o,
            SceneObject::Rect(o) => o,
            SceneObject::Ellipse(o) => o,
            SceneObject::Triangle(o) => o,
            SceneObject::Line(o) => o,
            SceneObject::Polygon(o) => o,
            SceneObject::Image(o) => o,
        }
    }

    fn shape_mut(&mut self) -> &mut dyn ObjectShape {
        match self {
            SceneObject::Text(o) => o,
            SceneObject::Rect(o) => o,
            SceneObject::Ellipse(o) => o,
            SceneObject::Triangle(o) => o,
            SceneObject::Line(o) => o,
            SceneObject::Polygon(o) => o,
            SceneObject::Image(o) => o,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            SceneObject::Text(_) => ObjectKind::Text,
            SceneObject::Rect(_) => ObjectKind::Rect,
            SceneObject::Ellipse(_) => ObjectKind::Ellipse,
            SceneObject::Triangle(_) => ObjectKind::Triangle,
            SceneObject::Line(_) => ObjectKind::Line,
            SceneObject::Polygon(_) => ObjectKind::Polygon,
            SceneObject::Image(_) => ObjectKind::Image,
        }
    }

    pub fn base(&self) -> &ObjectBase {
        self.shape().base()
    }

    pub fn base_mut(&mut self) -> &mut ObjectBase {
        self.shape_mut().base_mut()
    }

    pub fn id(&self) -> &ObjectId {
        &self.base().id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn is_visible(&self) -> bool {
        self.base().visible
    }

    pub fn is_locked(&self) -> bool {
        self.base().locked
    }

    /// Outline in intrinsic local coordinates; map with `base().transform()`.
    pub fn local_path(&self) -> BezPath {
        self.shape().local_path()
    }

    /// Merge a patch into this object. Returns `true` if anything changed.
    pub fn apply(&mut self, patch: &AttributePatch) -> bool {
        let before = self.clone();
        // Identity is assigned once; a patch can never change it.
        let id = self.base().id.clone();
        self.base_mut().apply(patch);
        self.shape_mut().apply_specific(patch);
        self.base_mut().id = id;
        *self != before
    }

    /// Axis-aligned bounds of the rotated box in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        if let SceneObject::Line(line) = self {
            let (a, b) = line.endpoints();
            return Rect::from_points(a, b);
        }
        let corners = self.base().corners();
        corners
            .iter()
            .skip(1)
            .fold(Rect::from_points(corners[0], corners[0]), |r, p| {
                r.union_pt(*p)
            })
    }

    /// Check if a canvas point hits this object. Boxes are hit anywhere
    /// inside their rotated rectangle; lines within `tolerance` of the
    /// segment.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let base = self.base();
        match self {
            SceneObject::Line(line) => {
                let (a, b) = line.endpoints();
                point_to_segment_dist(point, a, b) <= tolerance + base.stroke_width / 2.0
            }
            SceneObject::Ellipse(_) => {
                let local = base.to_box_frame(point);
                let size = base.rendered_size();
                let rx = size.width / 2.0 + tolerance;
                let ry = size.height / 2.0 + tolerance;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                (local.x / rx).powi(2) + (local.y / ry).powi(2) <= 1.0
            }
            _ => {
                let local = base.to_box_frame(point);
                let size = base.rendered_size();
                local.x.abs() <= size.width / 2.0 + tolerance
                    && local.y.abs() <= size.height / 2.0 + tolerance
            }
        }
    }

    /// Test whether this object's bounds intersect a selection rectangle.
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        rect.intersect(self.bounds().inflate(1.0, 1.0)).area() > 0.0
    }

    /// Translate by a canvas-space delta.
    pub fn translate(&mut self, delta: Vec2) {
        let base = self.base_mut();
        base.left += delta.x;
        base.top += delta.y;
    }

    pub fn as_text(&self) -> Option<&TextObject> {
        match self {
            SceneObject::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageObject> {
        match self {
            SceneObject::Image(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineObject> {
        match self {
            SceneObject::Line(l) => Some(l),
            _ => None,
        }
    }
}
