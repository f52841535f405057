//! JPEG thumbnails for the persistence bridge.

use crate::encode::encode_jpeg;
use crate::renderer::{Rasterizer, RenderContext};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use easel_core::session::EditorSession;
use easel_core::storage::{ThumbnailError, ThumbnailRenderer};
use std::cell::RefCell;

/// Renders the design small and returns it as a `data:image/jpeg` URL.
pub struct JpegThumbnailer {
    rasterizer: RefCell<Rasterizer>,
}

impl JpegThumbnailer {
    pub fn new(rasterizer: Rasterizer) -> Self {
        Self {
            rasterizer: RefCell::new(rasterizer),
        }
    }
}

impl Default for JpegThumbnailer {
    fn default() -> Self {
        Self::new(Rasterizer::new())
    }
}

impl ThumbnailRenderer for JpegThumbnailer {
    fn render_thumbnail(&self, session: &EditorSession, multiplier: f64, quality: f64) -> Result<String, ThumbnailError> {
        let mut rasterizer = self
            .rasterizer
            .try_borrow_mut()
            .map_err(|e| ThumbnailError(e.to_string()))?;
        let ctx = RenderContext::new(session.scene(), session.dimensions()).with_scale(multiplier);
        let pixmap = rasterizer.render(&ctx).map_err(|e| ThumbnailError(e.to_string()))?;
        let jpeg = encode_jpeg(&pixmap, quality).map_err(|e| ThumbnailError(e.to_string()))?;
        Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)))
    }
}
