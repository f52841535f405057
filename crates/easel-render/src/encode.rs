//! Pixmap encoders.

use crate::export::{ExportError, ExportResult};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tiny_skia::Pixmap;

/// Straight-alpha RGBA bytes.
fn demultiplied_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

/// RGB bytes composited over white.
fn rgb_over_white(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for px in pixmap.pixels() {
        let backdrop = 255 - px.alpha();
        out.extend_from_slice(&[
            px.red().saturating_add(backdrop),
            px.green().saturating_add(backdrop),
            px.blue().saturating_add(backdrop),
        ]);
    }
    out
}

pub fn encode_png(pixmap: &Pixmap) -> ExportResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = png::Encoder::new(&mut bytes, pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| ExportError::Encode(format!("PNG header: {e}")))?;
    writer
        .write_image_data(&demultiplied_rgba(pixmap))
        .map_err(|e| ExportError::Encode(format!("PNG data: {e}")))?;
    writer
        .finish()
        .map_err(|e| ExportError::Encode(format!("PNG finish: {e}")))?;
    Ok(bytes)
}

/// `quality` is 0.0 to 1.0.
pub fn encode_jpeg(pixmap: &Pixmap, quality: f64) -> ExportResult<Vec<u8>> {
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode(&rgb_over_white(pixmap), pixmap.width(), pixmap.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ExportError::Encode(format!("JPEG: {e}")))?;
    Ok(bytes)
}
