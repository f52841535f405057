//! CPU rasterizer for scene graphs.

use crate::images::{AssetImageSource, ImageSource};
use crate::text::FontBook;
use easel_core::color::Color;
use easel_core::design::Dimensions;
use easel_core::objects::{ImageObject, SceneObject, TextObject};
use easel_core::scene::SceneGraph;
use easel_core::selection::{HANDLE_SIZE, HandleKind, SelectionController, get_handles};
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape as _};
use thiserror::Error;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Output size {width}x{height} exceeds the limit of {} pixels", MAX_PIXELS)]
    TooLarge { width: u32, height: u32 },
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Largest raster, in pixels, a single render may allocate (1 GiB of RGBA).
pub const MAX_PIXELS: u64 = 1 << 28;

/// Default selection outline color.
pub const SELECTION_COLOR: Color = Color::rgb(59, 130, 246);

const PLACEHOLDER_FILL: Color = Color::rgb(200, 200, 200);
const PLACEHOLDER_CROSS: Color = Color::rgb(150, 150, 150);
const PLACEHOLDER_BORDER: Color = Color::rgb(100, 100, 100);

/// Context for a single render.
pub struct RenderContext<'a> {
    pub scene: &'a SceneGraph,
    /// Canvas size in canvas units; the output is this times `scale`.
    pub dimensions: Dimensions,
    pub scale: f64,
    /// Selection to decorate. Exports leave this unset.
    pub selection: Option<&'a SelectionController>,
    /// Marquee rectangle in canvas coordinates.
    pub marquee: Option<Rect>,
    pub selection_color: Color,
}

impl<'a> RenderContext<'a> {
    pub fn new(scene: &'a SceneGraph, dimensions: Dimensions) -> Self {
        Self {
            scene,
            dimensions,
            scale: 1.0,
            selection: None,
            marquee: None,
            selection_color: SELECTION_COLOR,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Draw outlines and handles for this selection.
    pub fn with_selection(mut self, selection: &'a SelectionController) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_marquee(mut self, rect: Option<Rect>) -> Self {
        self.marquee = rect;
        self
    }

    /// Output size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |v: u32| (f64::from(v) * self.scale).round().max(0.0) as u32;
        (px(self.dimensions.width), px(self.dimensions.height))
    }
}

/// Draws scenes into pixmaps with tiny-skia.
///
/// Output is deterministic for a given scene, size, font set and image
/// source, so repeated exports produce identical bytes.
pub struct Rasterizer {
    fonts: FontBook,
    images: Box<dyn ImageSource>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    /// System fonts and data-URL images only.
    pub fn new() -> Self {
        Self {
            fonts: FontBook::system(),
            images: Box::new(AssetImageSource::new()),
        }
    }

    pub fn with_fonts(mut self, fonts: FontBook) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_image_source(mut self, images: impl ImageSource + 'static) -> Self {
        self.images = Box::new(images);
        self
    }

    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// Render the whole canvas. Objects are painted back to front over the
    /// background; anything outside the canvas is clipped by the pixmap.
    pub fn render(&mut self, ctx: &RenderContext) -> RenderResult<Pixmap> {
        let (width, height) = ctx.pixel_size();
        if u64::from(width) * u64::from(height) > MAX_PIXELS {
            return Err(RendererError::TooLarge { width, height });
        }
        let mut pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?;
        pixmap.fill(skia_color(ctx.scene.background()));

        let view = Affine::scale(ctx.scale);
        for object in ctx.scene.objects().filter(|o| o.is_visible()) {
            self.render_object(&mut pixmap, object, view);
        }

        if let Some(selection) = ctx.selection {
            for object in selection.ids().iter().filter_map(|id| ctx.scene.get(id)) {
                render_selection_outline(&mut pixmap, object, view, ctx.scale, ctx.selection_color);
            }
        }
        if let Some(rect) = ctx.marquee {
            render_marquee(&mut pixmap, rect, view, ctx.scale, ctx.selection_color);
        }

        log::debug!("Rendered {} objects at {width}x{height}", ctx.scene.len());
        Ok(pixmap)
    }

    fn render_object(&mut self, pixmap: &mut Pixmap, object: &SceneObject, view: Affine) {
        let base = object.base();
        let transform = view * base.transform();
        match object {
            SceneObject::Text(text) => self.render_text(pixmap, text, transform),
            SceneObject::Image(image) => self.render_image(pixmap, image, transform),
            SceneObject::Line(_) => {
                stroke_path(pixmap, &object.local_path(), base.stroke.with_opacity(base.opacity), base.stroke_width, transform);
            }
            _ => {
                let path = object.local_path();
                fill_path(pixmap, &path, base.fill.with_opacity(base.opacity), transform);
                stroke_path(pixmap, &path, base.stroke.with_opacity(base.opacity), base.stroke_width, transform);
            }
        }
    }

    fn render_text(&mut self, pixmap: &mut Pixmap, text: &TextObject, transform: Affine) {
        let Some(layout) = self.fonts.layout(text) else {
            return;
        };
        let base = &text.base;
        fill_path(pixmap, &layout.glyphs, base.fill.with_opacity(base.opacity), transform);
        stroke_path(pixmap, &layout.glyphs, base.stroke.with_opacity(base.opacity), base.stroke_width, transform);
        fill_path(pixmap, &layout.decorations, base.fill.with_opacity(base.opacity), transform);
    }

    fn render_image(&mut self, pixmap: &mut Pixmap, image: &ImageObject, transform: Affine) {
        let Some(source) = self.images.load(&image.src) else {
            render_image_placeholder(pixmap, image, transform);
            return;
        };
        let base = &image.base;
        let fit = Affine::scale_non_uniform(
            base.width / f64::from(source.width()),
            base.height / f64::from(source.height()),
        );
        let paint = PixmapPaint {
            opacity: base.opacity.clamp(0.0, 1.0) as f32,
            quality: tiny_skia::FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, (*source).as_ref(), &paint, skia_transform(transform * fit), None);
    }
}

/// Draw a gray box with a cross for images that couldn't be loaded.
fn render_image_placeholder(pixmap: &mut Pixmap, image: &ImageObject, transform: Affine) {
    let bounds = Rect::new(0.0, 0.0, image.base.width, image.base.height);
    let opacity = image.base.opacity;
    let rect_path = bounds.to_path(0.1);
    fill_path(pixmap, &rect_path, PLACEHOLDER_FILL.with_opacity(opacity), transform);

    let mut cross = BezPath::new();
    cross.move_to(Point::new(bounds.x0, bounds.y0));
    cross.line_to(Point::new(bounds.x1, bounds.y1));
    cross.move_to(Point::new(bounds.x1, bounds.y0));
    cross.line_to(Point::new(bounds.x0, bounds.y1));
    stroke_path(pixmap, &cross, PLACEHOLDER_CROSS.with_opacity(opacity), 2.0, transform);
    stroke_path(pixmap, &rect_path, PLACEHOLDER_BORDER.with_opacity(opacity), 2.0, transform);
}

/// Rotated bounding box plus corner and rotation handles, at constant
/// screen size regardless of `scale`.
fn render_selection_outline(pixmap: &mut Pixmap, object: &SceneObject, view: Affine, scale: f64, color: Color) {
    let corners = object.base().corners();
    let mut outline = BezPath::new();
    outline.move_to(corners[0]);
    for corner in &corners[1..] {
        outline.line_to(*corner);
    }
    outline.close_path();
    stroke_path(pixmap, &outline, color, 1.0 / scale, view);

    let half = HANDLE_SIZE / 2.0 / scale;
    for handle in get_handles(object) {
        let path = match handle.kind {
            HandleKind::Corner(_) => Rect::from_center_size(handle.position, (half * 2.0, half * 2.0)).to_path(0.1),
            HandleKind::Rotate => kurbo::Circle::new(handle.position, half).to_path(0.1),
        };
        fill_path(pixmap, &path, Color::WHITE, view);
        stroke_path(pixmap, &path, color, 1.5 / scale, view);
    }
}

fn render_marquee(pixmap: &mut Pixmap, rect: Rect, view: Affine, scale: f64, color: Color) {
    let path = rect.abs().to_path(0.1);
    fill_path(pixmap, &path, color.with_opacity(0.1), view);
    stroke_path(pixmap, &path, color, 1.0 / scale, view);
}

pub(crate) fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

pub(crate) fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Convert a kurbo path to a tiny-skia path. `None` for empty paths.
pub(crate) fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    paint
}

pub(crate) fn fill_path(pixmap: &mut Pixmap, path: &BezPath, color: Color, transform: Affine) {
    if color.is_transparent() {
        return;
    }
    if let Some(path) = skia_path(path) {
        pixmap.fill_path(&path, &paint_for(color), FillRule::Winding, skia_transform(transform), None);
    }
}

pub(crate) fn stroke_path(pixmap: &mut Pixmap, path: &BezPath, color: Color, width: f64, transform: Affine) {
    if color.is_transparent() || width <= 0.0 || !width.is_finite() {
        return;
    }
    if let Some(path) = skia_path(path) {
        let stroke = Stroke {
            width: width as f32,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint_for(color), &stroke, skia_transform(transform), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::objects::{AttributePatch, ObjectKind};

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> (u8, u8, u8, u8) {
        let p = pixmap.pixel(x, y).unwrap();
        (p.red(), p.green(), p.blue(), p.alpha())
    }

    fn rasterizer() -> Rasterizer {
        Rasterizer::new().with_fonts(FontBook::empty())
    }

    fn red_rect(scene: &mut SceneGraph, left: f64, top: f64) -> easel_core::objects::ObjectId {
        scene
            .add_object(
                ObjectKind::Rect,
                &AttributePatch {
                    left: Some(left),
                    top: Some(top),
                    width: Some(50.0),
                    height: Some(50.0),
                    fill: Some(Color::rgb(255, 0, 0)),
                    ..AttributePatch::default()
                },
            )
            .id()
            .clone()
    }

    #[test]
    fn test_output_size_follows_scale() {
        let scene = SceneGraph::new();
        let ctx = RenderContext::new(&scene, Dimensions::new(200, 100)).with_scale(2.0);
        let pixmap = rasterizer().render(&ctx).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (400, 200));
        assert_eq!(pixel(&pixmap, 10, 10), (255, 255, 255, 255));
    }

    #[test]
    fn test_oversized_output_is_refused() {
        let scene = SceneGraph::new();
        let ctx = RenderContext::new(&scene, Dimensions::new(10_000, 10_000)).with_scale(4.0);
        assert!(matches!(
            rasterizer().render(&ctx),
            Err(RendererError::TooLarge { width: 40_000, height: 40_000 })
        ));
    }

    #[test]
    fn test_fill_and_hidden_objects() {
        let mut scene = SceneGraph::new();
        red_rect(&mut scene, 10.0, 10.0);
        let hidden = red_rect(&mut scene, 100.0, 10.0);
        scene.set_attributes(&hidden, &AttributePatch {
            visible: Some(false),
            ..AttributePatch::default()
        });

        let ctx = RenderContext::new(&scene, Dimensions::new(200, 100));
        let pixmap = rasterizer().render(&ctx).unwrap();
        assert_eq!(pixel(&pixmap, 35, 35), (255, 0, 0, 255));
        assert_eq!(pixel(&pixmap, 125, 35), (255, 255, 255, 255));
    }

    #[test]
    fn test_background_and_opacity() {
        let mut scene = SceneGraph::new();
        scene.set_background(Color::rgb(0, 0, 0));
        let id = red_rect(&mut scene, 0.0, 0.0);
        scene.set_attributes(&id, &AttributePatch {
            opacity: Some(0.0),
            ..AttributePatch::default()
        });

        let ctx = RenderContext::new(&scene, Dimensions::new(100, 100));
        let pixmap = rasterizer().render(&ctx).unwrap();
        assert_eq!(pixel(&pixmap, 25, 25), (0, 0, 0, 255));
    }

    #[test]
    fn test_selection_drawn_only_when_requested() {
        let mut scene = SceneGraph::new();
        let id = red_rect(&mut scene, 20.0, 20.0);
        let mut selection = SelectionController::new();
        selection.select(&scene, &[id]);

        let plain = rasterizer().render(&RenderContext::new(&scene, Dimensions::new(100, 100))).unwrap();
        let decorated = rasterizer()
            .render(&RenderContext::new(&scene, Dimensions::new(100, 100)).with_selection(&selection))
            .unwrap();
        assert_ne!(plain.data(), decorated.data());
    }

    #[test]
    fn test_unresolved_image_draws_placeholder() {
        let mut scene = SceneGraph::new();
        scene.add_object(
            ObjectKind::Image,
            &AttributePatch {
                left: Some(0.0),
                top: Some(0.0),
                ..AttributePatch::default()
            },
        );
        let pixmap = rasterizer().render(&RenderContext::new(&scene, Dimensions::new(100, 100))).unwrap();
        let (r, g, b, _) = pixel(&pixmap, 30, 60);
        assert_eq!((r, g, b), (200, 200, 200));
    }
}
