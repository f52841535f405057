//! Triangle objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};

/// An isosceles triangle with its apex at the top-center of the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriangleObject {
    #[serde(flatten)]
    pub base: ObjectBase,
}

impl TriangleObject {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            base: ObjectBase {
                name: "Triangle".to_string(),
                width,
                height,
                ..ObjectBase::default()
            },
        }
    }
}

impl ObjectShape for TriangleObject {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn local_path(&self) -> BezPath {
        let (w, h) = (self.base.width, self.base.height);
        let mut path = BezPath::new();
        path.move_to(Point::new(w / 2.0, 0.0));
        path.line_to(Point::new(w, h));
        path.line_to(Point::new(0.0, h));
        path.close_path();
        path
    }

    fn apply_specific(&mut self, _patch: &AttributePatch) {}
}
