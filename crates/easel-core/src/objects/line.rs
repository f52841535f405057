//! Straight line objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use crate::color::Color;
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};

/// A single segment. Endpoints are in intrinsic box coordinates and the
/// box always tightly encloses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub x1: f64,
    #[serde(default)]
    pub y1: f64,
    #[serde(default)]
    pub x2: f64,
    #[serde(default)]
    pub y2: f64,
}

impl LineObject {
    /// A segment from `start` to `end`, both relative to the box origin.
    pub fn new(start: Point, end: Point) -> Self {
        let mut line = Self {
            base: ObjectBase {
                name: "Line".to_string(),
                fill: Color::TRANSPARENT,
                stroke: Color::BLACK,
                stroke_width: 1.0,
                ..ObjectBase::default()
            },
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
        };
        line.normalize();
        line
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    /// Endpoints in canvas coordinates.
    pub fn endpoints(&self) -> (Point, Point) {
        let t = self.base.transform();
        (t * self.start(), t * self.end())
    }

    /// Shift endpoints so the box starts at the origin and resize the box
    /// to fit them. The left/top offset keeps the segment in place.
    fn normalize(&mut self) {
        let min_x = self.x1.min(self.x2);
        let min_y = self.y1.min(self.y2);
        if min_x != 0.0 || min_y != 0.0 {
            self.x1 -= min_x;
            self.x2 -= min_x;
            self.y1 -= min_y;
            self.y2 -= min_y;
            self.base.left += min_x * self.base.scale_x;
            self.base.top += min_y * self.base.scale_y;
        }
        self.base.width = (self.x2 - self.x1).abs();
        self.base.height = (self.y2 - self.y1).abs();
    }
}

impl ObjectShape for LineObject {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn local_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start());
        path.line_to(self.end());
        path
    }

    fn apply_specific(&mut self, patch: &AttributePatch) {
        let mut moved = false;
        for (target, value) in [
            (&mut self.x1, patch.x1),
            (&mut self.y1, patch.y1),
            (&mut self.x2, patch.x2),
            (&mut self.y2, patch.y2),
        ] {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                *target = v;
                moved = true;
            }
        }
        if moved || patch.width.is_some() || patch.height.is_some() {
            self.normalize();
        }
    }
}
