//! Attributes shared by every scene object.

use super::{AttributePatch, ObjectId};
use crate::color::Color;
use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest scale factor an object may carry.
pub const MIN_SCALE: f64 = 0.001;

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f64) -> f64 {
    let a = degrees.rem_euclid(360.0);
    if (a - 360.0).abs() < 1e-9 { 0.0 } else { a }
}

/// Identity, flags, geometry and paint common to all object kinds.
///
/// `left`/`top` locate the top-left corner of the unrotated box, whose
/// rendered size is `width * scale_x` by `height * scale_y`. `angle` is in
/// degrees, clockwise, about the box center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectBase {
    pub id: ObjectId,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
    /// Fraction in `0.0..=1.0`.
    pub opacity: f64,
}

impl Default for ObjectBase {
    fn default() -> Self {
        Self {
            id: ObjectId::new(),
            name: String::new(),
            visible: true,
            locked: false,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            fill: Color::BLACK,
            stroke: Color::TRANSPARENT,
            stroke_width: 0.0,
            opacity: 1.0,
        }
    }
}

impl ObjectBase {
    /// Size of the box after scaling.
    pub fn rendered_size(&self) -> Size {
        Size::new(self.width * self.scale_x, self.height * self.scale_y)
    }

    /// Center of the box in canvas coordinates.
    pub fn center(&self) -> Point {
        let size = self.rendered_size();
        Point::new(self.left + size.width / 2.0, self.top + size.height / 2.0)
    }

    /// Maps intrinsic local coordinates (origin at the box's top-left,
    /// unscaled) to canvas coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.center().to_vec2())
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
            * Affine::translate(Vec2::new(-self.width / 2.0, -self.height / 2.0))
    }

    /// Box corners in canvas coordinates: top-left, top-right,
    /// bottom-right, bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let t = self.transform();
        [
            t * Point::new(0.0, 0.0),
            t * Point::new(self.width, 0.0),
            t * Point::new(self.width, self.height),
            t * Point::new(0.0, self.height),
        ]
    }

    /// Expresses a canvas point in the unrotated frame centered on the box.
    pub fn to_box_frame(&self, point: Point) -> Vec2 {
        rotate_vec(point - self.center(), -self.angle.to_radians())
    }

    /// Applies the shared fields of a patch. Returns nothing; callers
    /// detect changes by comparison.
    pub(crate) fn apply(&mut self, patch: &AttributePatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(left) = patch.left.filter(|v| v.is_finite()) {
            self.left = left;
        }
        if let Some(top) = patch.top.filter(|v| v.is_finite()) {
            self.top = top;
        }
        if let Some(width) = patch.width.filter(|v| v.is_finite()) {
            self.width = width.max(0.0);
        }
        if let Some(height) = patch.height.filter(|v| v.is_finite()) {
            self.height = height.max(0.0);
        }
        if let Some(angle) = patch.angle.filter(|v| v.is_finite()) {
            self.angle = normalize_angle(angle);
        }
        if let Some(sx) = patch.scale_x.filter(|v| v.is_finite()) {
            self.scale_x = sx.max(MIN_SCALE);
        }
        if let Some(sy) = patch.scale_y.filter(|v| v.is_finite()) {
            self.scale_y = sy.max(MIN_SCALE);
        }
        if let Some(fill) = patch.fill {
            self.fill = fill;
        }
        if let Some(stroke) = patch.stroke {
            self.stroke = stroke;
        }
        if let Some(width) = patch.stroke_width.filter(|v| v.is_finite()) {
            self.stroke_width = width.max(0.0);
        }
        if let Some(opacity) = patch.opacity.filter(|v| v.is_finite()) {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }
}

/// Rotates a vector by `radians` (clockwise on a y-down canvas).
pub fn rotate_vec(v: Vec2, radians: f64) -> Vec2 {
    let (sin, cos) = radians.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(left: f64, top: f64, w: f64, h: f64) -> ObjectBase {
        ObjectBase {
            left,
            top,
            width: w,
            height: h,
            ..ObjectBase::default()
        }
    }

    #[test]
    fn test_center_uses_scaled_size() {
        let mut base = boxed(100.0, 100.0, 200.0, 150.0);
        base.scale_x = 2.0;
        assert_eq!(base.center(), Point::new(300.0, 175.0));
    }

    #[test]
    fn test_corners_unrotated() {
        let base = boxed(10.0, 20.0, 30.0, 40.0);
        let [tl, tr, br, bl] = base.corners();
        assert!((tl - Point::new(10.0, 20.0)).hypot() < 1e-9);
        assert!((tr - Point::new(40.0, 20.0)).hypot() < 1e-9);
        assert!((br - Point::new(40.0, 60.0)).hypot() < 1e-9);
        assert!((bl - Point::new(10.0, 60.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_rotation_about_center() {
        let mut base = boxed(0.0, 0.0, 100.0, 100.0);
        base.angle = 90.0;
        let [tl, ..] = base.corners();
        // Top-left swings to the top-right under a clockwise quarter turn.
        assert!((tl - Point::new(100.0, 0.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_apply_clamps() {
        let mut base = ObjectBase::default();
        base.apply(&AttributePatch {
            opacity: Some(3.0),
            angle: Some(-90.0),
            scale_x: Some(0.0),
            stroke_width: Some(-1.0),
            ..AttributePatch::default()
        });
        assert_eq!(base.opacity, 1.0);
        assert_eq!(base.angle, 270.0);
        assert_eq!(base.scale_x, MIN_SCALE);
        assert_eq!(base.stroke_width, 0.0);
    }
}
