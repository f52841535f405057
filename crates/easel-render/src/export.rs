//! Export pipeline: rasterize a design and encode it as a download.

use crate::encode::{encode_jpeg, encode_png};
use crate::pdf::{PDF_RASTER_QUALITY, write_pdf};
use crate::renderer::{Rasterizer, RenderContext, RendererError};
use easel_core::design::Dimensions;
use easel_core::scene::SceneGraph;
use easel_core::session::EditorSession;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Shown when an export fails.
pub const EXPORT_FAILED: &str = "Export failed. Please try again.";

pub const MIN_QUALITY: f64 = 0.1;
pub const MAX_QUALITY: f64 = 1.0;
pub const MIN_MULTIPLIER: f64 = 1.0;
pub const MAX_MULTIPLIER: f64 = 4.0;
pub const DEFAULT_QUALITY: f64 = 1.0;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Raster(#[from] RendererError),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("PDF failed: {0}")]
    Pdf(String),
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// What to export. Quality only affects JPEG, the multiplier only raster
/// formats; both are clamped into range on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    quality: f64,
    multiplier: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::new(ExportFormat::Png)
    }
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            quality: DEFAULT_QUALITY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = clamp_or(quality, MIN_QUALITY, MAX_QUALITY, DEFAULT_QUALITY);
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = clamp_or(multiplier, MIN_MULTIPLIER, MAX_MULTIPLIER, DEFAULT_MULTIPLIER);
        self
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() { value.clamp(min, max) } else { fallback }
}

/// An encoded, named file ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    /// Raster size in pixels.
    pub width: u32,
    pub height: u32,
}

/// Lowercased title with every non-alphanumeric UTF-16 unit replaced by
/// `_` (so an emoji becomes `__`); `design` when nothing is left.
pub fn sanitize_filename(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else {
            name.extend(std::iter::repeat_n('_', c.len_utf16()));
        }
    }
    if name.is_empty() { "design".to_string() } else { name }
}

/// Turns scenes into downloadable files.
#[derive(Default)]
pub struct Exporter {
    rasterizer: Rasterizer,
}

impl Exporter {
    pub fn new(rasterizer: Rasterizer) -> Self {
        Self { rasterizer }
    }

    pub fn rasterizer_mut(&mut self) -> &mut Rasterizer {
        &mut self.rasterizer
    }

    /// Export a scene. Selection decoration is never drawn.
    pub fn export(
        &mut self,
        scene: &SceneGraph,
        dimensions: Dimensions,
        title: &str,
        options: &ExportOptions,
    ) -> ExportResult<ExportArtifact> {
        let (scale, quality) = match options.format {
            ExportFormat::Pdf => (1.0, PDF_RASTER_QUALITY),
            _ => (options.multiplier(), options.quality()),
        };
        let pixmap = self
            .rasterizer
            .render(&RenderContext::new(scene, dimensions).with_scale(scale))?;
        let (width, height) = (pixmap.width(), pixmap.height());

        let bytes = match options.format {
            ExportFormat::Png => encode_png(&pixmap)?,
            ExportFormat::Jpeg => encode_jpeg(&pixmap, quality)?,
            ExportFormat::Pdf => write_pdf(&encode_jpeg(&pixmap, quality)?, width, height, dimensions)?,
        };

        Ok(ExportArtifact {
            filename: format!("{}.{}", sanitize_filename(title), options.format.extension()),
            mime_type: options.format.mime_type(),
            bytes,
            width,
            height,
        })
    }

    /// Export the session's design. The selection is cleared for the
    /// render and restored afterwards; the outcome is reported as a notice.
    pub fn export_session(&mut self, session: &mut EditorSession, options: &ExportOptions) -> Option<ExportArtifact> {
        let selected = session.take_selection();
        let result = self.export(session.scene(), session.dimensions(), session.title(), options);
        session.restore_selection(selected);

        match result {
            Ok(artifact) => {
                log::info!("Exported {} ({} bytes)", artifact.filename, artifact.bytes.len());
                session
                    .notices_mut()
                    .success(format!("Exported as {} successfully!", options.format));
                Some(artifact)
            }
            Err(e) => {
                log::error!("Export failed: {e}");
                session.notices_mut().error(EXPORT_FAILED);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Poster 2024!"), "my_poster_2024_");
        assert_eq!(sanitize_filename("Café"), "caf_");
        assert_eq!(sanitize_filename(""), "design");
        assert_eq!(sanitize_filename("Sale 🎉"), "sale___");
        assert_eq!(sanitize_filename("a😀b"), "a__b");
    }

    #[test]
    fn test_options_are_clamped() {
        let options = ExportOptions::new(ExportFormat::Jpeg)
            .with_quality(0.0)
            .with_multiplier(9.0);
        assert_eq!(options.quality(), MIN_QUALITY);
        assert_eq!(options.multiplier(), MAX_MULTIPLIER);

        let options = ExportOptions::default().with_quality(f64::NAN);
        assert_eq!(options.quality(), DEFAULT_QUALITY);
        assert_eq!(options.multiplier(), DEFAULT_MULTIPLIER);
    }

    #[test]
    fn test_oversized_export_fails_before_allocating() {
        let scene = SceneGraph::new();
        let options = ExportOptions::new(ExportFormat::Png).with_multiplier(4.0);
        let result = Exporter::new(Rasterizer::new().with_fonts(crate::text::FontBook::empty())).export(
            &scene,
            Dimensions::new(10_000, 10_000),
            "big",
            &options,
        );
        assert!(matches!(result, Err(ExportError::Raster(RendererError::TooLarge { .. }))));
    }

    #[test]
    fn test_format_parsing_and_labels() {
        assert_eq!("JPEG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert_eq!("jpg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert!("gif".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Jpeg.to_string(), "JPG");
        assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
    }
}
