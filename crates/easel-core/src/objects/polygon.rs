//! Closed polygon objects.

use super::{AttributePatch, ObjectBase, ObjectShape};
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A closed polygon whose vertices are in intrinsic box coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonObject {
    #[serde(flatten)]
    pub base: ObjectBase,
    #[serde(default)]
    pub points: Vec<Point>,
}

impl PolygonObject {
    pub fn new(points: Vec<Point>) -> Self {
        let mut polygon = Self {
            base: ObjectBase {
                name: "Polygon".to_string(),
                ..ObjectBase::default()
            },
            points,
        };
        polygon.normalize();
        polygon
    }

    /// A star with `spikes` outer vertices alternating between the two radii.
    pub fn star(spikes: usize, outer: f64, inner: f64) -> Self {
        let count = spikes.max(2) * 2;
        let points = (0..count)
            .map(|i| {
                let radius = if i % 2 == 0 { outer } else { inner };
                let angle = i as f64 * PI / spikes.max(2) as f64 - PI / 2.0;
                Point::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        let mut star = Self::new(points);
        star.base.name = "Star".to_string();
        star
    }

    fn normalize(&mut self) {
        if self.points.is_empty() {
            self.base.width = 0.0;
            self.base.height = 0.0;
            return;
        }
        let min_x = self.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = self.points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = self.points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = self.points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        for p in &mut self.points {
            p.x -= min_x;
            p.y -= min_y;
        }
        self.base.width = max_x - min_x;
        self.base.height = max_y - min_y;
    }
}

impl ObjectShape for PolygonObject {
    fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn local_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for p in iter {
                path.line_to(*p);
            }
            path.close_path();
        }
        path
    }

    fn apply_specific(&mut self, patch: &AttributePatch) {
        if let Some(points) = &patch.points {
            self.points = points.clone();
            self.normalize();
        } else if patch.width.is_some() || patch.height.is_some() {
            self.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_has_ten_vertices() {
        let star = PolygonObject::star(5, 80.0, 40.0);
        assert_eq!(star.points.len(), 10);
        assert!((star.base.width - 2.0 * 80.0 * (0.4 * PI).sin()).abs() < 1e-9);
        assert!(star.points.iter().all(|p| p.x >= 0.0 && p.y >= 0.0));
    }
}
