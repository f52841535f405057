//! Rectangle objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use kurbo::{BezPath, Rect, RoundedRect, Shape as _};
use serde::{Deserialize, Serialize};

/// An axis-aligned box (before rotation) with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    /// Corner radius in intrinsic units (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
}

impl RectObject {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            base: ObjectBase {
                name: "Rect".to_string(),
                width,
                height,
                ..ObjectBase::default()
            },
            corner_radius: 0.0,
        }
    }
}

impl ObjectShape for RectObject {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn local_path(&self) -> BezPath {
        let rect = Rect::new(0.0, 0.0, self.base.width, self.base.height);
        if self.corner_radius > 0.0 {
            let radius = self
                .corner_radius
                .min(self.base.width / 2.0)
                .min(self.base.height / 2.0);
            RoundedRect::from_rect(rect, radius).to_path(0.1)
        } else {
            rect.to_path(0.1)
        }
    }

    fn apply_specific(&mut self, patch: &AttributePatch) {
        if let Some(radius) = patch.corner_radius.filter(|r| r.is_finite()) {
            self.corner_radius = radius.max(0.0);
        }
    }
}
