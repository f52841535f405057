//! Uploaded asset references and the upload policy shared with the asset
//! service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "video/mp4",
    "font/ttf",
    "font/otf",
    "font/woff",
    "font/woff2",
];

/// Upload rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("No file provided")]
    Empty,
    #[error("File size exceeds 10MB limit")]
    TooLarge,
    #[error("File type not allowed")]
    TypeNotAllowed,
}

/// Type tag given with an upload; decides the storage folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Image,
    Icon,
}

impl AssetKind {
    pub fn folder(&self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::Icon => "icons",
        }
    }

    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("icon") { AssetKind::Icon } else { AssetKind::Image }
    }
}

/// Check an upload against the size limit and MIME allow-list.
pub fn check_upload(mime: &str, len: usize) -> Result<(), AssetError> {
    if len == 0 {
        return Err(AssetError::Empty);
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(AssetError::TooLarge);
    }
    let mime = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(AssetError::TypeNotAllowed);
    }
    Ok(())
}

/// File extension for an allowed MIME type.
pub fn extension_for(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "video/mp4" => "mp4",
        "font/ttf" => "ttf",
        "font/otf" => "otf",
        "font/woff" => "woff",
        "font/woff2" => "woff2",
        _ => "bin",
    }
}

/// An uploaded asset ready to be placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    /// Opaque public URL returned by the asset service.
    pub url: String,
    /// Natural pixel size.
    pub width: f64,
    pub height: f64,
}

impl AssetRef {
    pub fn new(url: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }
}

/// Metadata returned by the asset service after an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub url: String,
    pub name: String,
    pub mime_type: String,
    pub size: usize,
    pub kind: AssetKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upload() {
        assert_eq!(check_upload("image/png", 10), Ok(()));
        assert_eq!(check_upload("IMAGE/PNG; charset=binary", 10), Ok(()));
        assert_eq!(check_upload("image/png", 0), Err(AssetError::Empty));
        assert_eq!(check_upload("image/png", MAX_UPLOAD_BYTES + 1), Err(AssetError::TooLarge));
        assert_eq!(check_upload("application/zip", 10), Err(AssetError::TypeNotAllowed));
    }

    #[test]
    fn test_extension_and_folder() {
        assert_eq!(extension_for("image/svg+xml"), "svg");
        assert_eq!(extension_for("image/jpg"), "jpg");
        assert_eq!(AssetKind::from_name("icon").folder(), "icons");
        assert_eq!(AssetKind::from_name("whatever").folder(), "images");
    }
}
