//! Image sources for image objects.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_skia::{IntSize, Pixmap};

/// Resolves an image object's `src` to pixels.
pub trait ImageSource {
    /// Decoded, premultiplied pixels, or `None` to draw a placeholder.
    fn load(&mut self, src: &str) -> Option<Arc<Pixmap>>;
}

/// Decodes `data:` URLs and files under a local asset root.
///
/// Sources like `/uploads/images/<file>` are looked up relative to the
/// asset root; remote URLs are not fetched.
#[derive(Default)]
pub struct AssetImageSource {
    root: Option<PathBuf>,
    cache: HashMap<String, Option<Arc<Pixmap>>>,
}

impl AssetImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative sources against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            cache: HashMap::new(),
        }
    }

    fn read(&self, src: &str) -> Option<Vec<u8>> {
        if let Some(rest) = src.strip_prefix("data:") {
            let (meta, payload) = rest.split_once(',')?;
            if !meta.ends_with(";base64") {
                log::warn!("Unsupported data URL encoding: {meta}");
                return None;
            }
            return STANDARD
                .decode(payload.trim())
                .map_err(|e| log::warn!("Invalid base64 image data: {e}"))
                .ok();
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            log::warn!("Remote image {src} not fetched, drawing placeholder");
            return None;
        }

        let relative = src.strip_prefix("file://").unwrap_or(src);
        let path = match &self.root {
            Some(root) => root.join(relative.trim_start_matches('/')),
            None => PathBuf::from(relative),
        };
        std::fs::read(&path)
            .map_err(|e| log::warn!("Failed to read image {}: {e}", path.display()))
            .ok()
    }
}

impl ImageSource for AssetImageSource {
    fn load(&mut self, src: &str) -> Option<Arc<Pixmap>> {
        if src.is_empty() {
            return None;
        }
        if let Some(cached) = self.cache.get(src) {
            return cached.clone();
        }
        let pixmap = self.read(src).and_then(|bytes| decode_pixmap(&bytes)).map(Arc::new);
        self.cache.insert(src.to_string(), pixmap.clone());
        pixmap
    }
}

/// Decode PNG/JPEG/WebP bytes into a premultiplied pixmap.
pub fn decode_pixmap(bytes: &[u8]) -> Option<Pixmap> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| log::warn!("Failed to decode image: {e}"))
        .ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, IntSize::from_wh(width, height)?)
}
