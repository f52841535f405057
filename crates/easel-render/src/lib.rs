//! Easel Render Library
//!
//! CPU rendering and export for Easel designs: a tiny-skia rasterizer,
//! system-font text outlines, image decoding, and PNG/JPEG/PDF output.

mod encode;
pub mod export;
pub mod images;
pub mod pdf;
mod renderer;
pub mod text;
mod thumbnail;

pub use encode::{encode_jpeg, encode_png};
pub use export::{
    EXPORT_FAILED, ExportArtifact, ExportError, ExportFormat, ExportOptions, ExportResult, Exporter,
    sanitize_filename,
};
pub use images::{AssetImageSource, ImageSource};
pub use renderer::{MAX_PIXELS, Rasterizer, RenderContext, RenderResult, RendererError, SELECTION_COLOR};
pub use text::{FontBook, TextLayout};
pub use thumbnail::JpegThumbnailer;
