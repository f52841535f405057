//! Viewport pan/zoom over the fixed-size canvas.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom step used by the zoom in/out commands.
pub const ZOOM_STEP: f64 = 0.1;

/// The view transform between screen pixels and canvas units.
///
/// Only zoom and pan change here; the design's dimensions are fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Screen-space translation of the canvas origin.
    pub offset: Vec2,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
        }
    }
}

impl Viewport {
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom: max_zoom.max(min_zoom),
            ..Self::default()
        }
    }

    /// Canvas to screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen to canvas.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Set the zoom level, clamped to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Zoom by `factor`, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let anchor = self.screen_to_canvas(screen_point);
        self.set_zoom(self.zoom * factor);
        let moved = self.canvas_to_screen(anchor);
        self.offset += screen_point - moved;
    }

    /// Zoom level as a whole percentage, for display.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    /// Fit the whole canvas inside a screen area with padding, centered.
    pub fn fit_canvas(&mut self, canvas: Size, screen: Size, padding: f64) {
        if canvas.width <= 0.0 || canvas.height <= 0.0 {
            self.reset();
            return;
        }
        let avail = Size::new(
            (screen.width - padding * 2.0).max(1.0),
            (screen.height - padding * 2.0).max(1.0),
        );
        self.set_zoom((avail.width / canvas.width).min(avail.height / canvas.height));
        self.offset = Vec2::new(
            (screen.width - canvas.width * self.zoom) / 2.0,
            (screen.height - canvas.height * self.zoom) / 2.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(20.0);
        assert_eq!(viewport.zoom, 5.0);
        viewport.set_zoom(0.0);
        assert_eq!(viewport.zoom, 0.1);
        viewport.set_zoom(f64::NAN);
        assert_eq!(viewport.zoom, 0.1);
    }

    #[test]
    fn test_screen_canvas_round_trip() {
        let mut viewport = Viewport::default();
        viewport.pan(Vec2::new(40.0, -10.0));
        viewport.set_zoom(2.0);
        let canvas = viewport.screen_to_canvas(Point::new(140.0, 90.0));
        assert_eq!(canvas, Point::new(50.0, 50.0));
        assert_eq!(viewport.canvas_to_screen(canvas), Point::new(140.0, 90.0));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut viewport = Viewport::default();
        let anchor = Point::new(300.0, 200.0);
        let before = viewport.screen_to_canvas(anchor);
        viewport.zoom_at(anchor, 1.5);
        let after = viewport.screen_to_canvas(anchor);
        assert!((after - before).hypot() < 1e-9);
    }

    #[test]
    fn test_fit_canvas_centers() {
        let mut viewport = Viewport::default();
        viewport.fit_canvas(Size::new(1080.0, 1080.0), Size::new(1200.0, 800.0), 40.0);
        assert!((viewport.zoom - 720.0 / 1080.0).abs() < 1e-9);
        let center = viewport.canvas_to_screen(Point::new(540.0, 540.0));
        assert!((center - Point::new(600.0, 400.0)).hypot() < 1e-9);
    }
}
