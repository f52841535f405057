//! Raster image objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use kurbo::{BezPath, Rect, Shape as _};
use serde::{Deserialize, Serialize};

/// A bitmap placed from an uploaded asset. The intrinsic box is the
/// natural pixel size; placement scales it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    /// Opaque source reference (public URL, data URL or path).
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub natural_width: f64,
    #[serde(default)]
    pub natural_height: f64,
}

impl ImageObject {
    pub fn new(src: impl Into<String>, natural_width: f64, natural_height: f64) -> Self {
        Self {
            base: ObjectBase {
                name: "Image".to_string(),
                width: natural_width,
                height: natural_height,
                ..ObjectBase::default()
            },
            src: src.into(),
            natural_width,
            natural_height,
        }
    }

    /// Uniform scale so the rendered width equals `target_width`.
    pub fn scale_to_width(&mut self, target_width: f64) {
        if self.base.width > f64::EPSILON {
            let scale = target_width / self.base.width;
            self.base.scale_x = scale;
            self.base.scale_y = scale;
        }
    }
}

impl ObjectShape for ImageObject {
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
        if let Some(src) = &patch.src {
            self.src = src.clone();
        }
        if let Some(w) = patch.natural_width.filter(|v| v.is_finite() && *v > 0.0) {
            self.natural_width = w;
        }
        if let Some(h) = patch.natural_height.filter(|v| v.is_finite() && *v > 0.0) {
            self.natural_height = h;
        }
    }
}
