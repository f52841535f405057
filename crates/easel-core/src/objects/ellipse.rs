//! Ellipse objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use kurbo::{BezPath, Ellipse, Point, Shape as _};
use serde::{Deserialize, Serialize};

/// An ellipse inscribed in the object box. The circle tool creates these
/// with equal width and height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EllipseObject {
    #[serde(flatten)]
    pub base: ObjectBase,
}

impl EllipseObject {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            base: ObjectBase {
                name: "Circle".to_string(),
                width,
                height,
                ..ObjectBase::default()
            },
        }
    }

    /// Radii in intrinsic units.
    pub fn radii(&self) -> (f64, f64) {
        (self.base.width / 2.0, self.base.height / 2.0)
    }
}

impl ObjectShape for EllipseObject {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn local_path(&self) -> BezPath {
        let (rx, ry) = self.radii();
        Ellipse::new(Point::new(rx, ry), (rx, ry), 0.0).to_path(0.1)
    }

    fn apply_specific(&mut self, _patch: &AttributePatch) {}
}
