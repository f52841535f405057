//! Design and template records exchanged with the storage service.

use crate::storage::{StorageError, StorageResult};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_DESIGN_TITLE: &str = "Untitled Design";
pub const TITLE_MAX_CHARS: usize = 100;
pub const MIN_DIMENSION: u32 = 100;
pub const MAX_DIMENSION: u32 = 10_000;
pub const DEFAULT_DIMENSION: u32 = 1080;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Record validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title must be between 1 and 100 characters")]
    Title,
    #[error("Dimensions must be between 100 and 10000 pixels")]
    Dimensions,
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if (1..=TITLE_MAX_CHARS).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::Title)
    }
}

/// Canvas size in pixels, fixed when the design is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION, DEFAULT_DIMENSION)
    }
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let range = MIN_DIMENSION..=MAX_DIMENSION;
        if range.contains(&self.width) && range.contains(&self.height) {
            Ok(())
        } else {
            Err(ValidationError::Dimensions)
        }
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// A stored design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub dimensions: Dimensions,
    /// Serialized scene payload; `None` for a fresh design.
    pub canvas_data: Option<Value>,
    /// Thumbnail image reference (usually a data URL).
    pub thumbnail: Option<String>,
    /// Incremented by exactly one on every update.
    pub version: u64,
    pub template_id: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Default for DesignRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner_id: String::new(),
            title: DEFAULT_DESIGN_TITLE.to_string(),
            dimensions: Dimensions::default(),
            canvas_data: None,
            thumbnail: None,
            version: 1,
            template_id: None,
            category: None,
            tags: Vec::new(),
            is_public: false,
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl DesignRecord {
    /// A fresh record from a create request.
    pub fn create(id: impl Into<String>, owner_id: impl Into<String>, request: NewDesign, now: u64) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: request.title.unwrap_or_else(|| DEFAULT_DESIGN_TITLE.to_string()),
            dimensions: request.dimensions.unwrap_or_default(),
            canvas_data: request.canvas_data,
            template_id: request.template_id,
            created_at: now,
            updated_at: now,
            ..Self::default()
        }
    }

    /// Merge an update and bump the version.
    pub fn apply_update(&mut self, update: DesignUpdate, now: u64) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(canvas_data) = update.canvas_data {
            self.canvas_data = Some(canvas_data);
        }
        if let Some(thumbnail) = update.thumbnail {
            self.thumbnail = Some(thumbnail);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(is_public) = update.is_public {
            self.is_public = is_public;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        self.version += 1;
        self.updated_at = now;
    }

    /// A copy under a new id titled "<title> (Copy)".
    pub fn duplicate(&self, id: impl Into<String>, now: u64) -> Self {
        Self {
            id: id.into(),
            title: format!("{} (Copy)", self.title),
            version: 1,
            is_public: false,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDesign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_data: Option<Value>,
}

impl NewDesign {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(dimensions) = &self.dimensions {
            dimensions.validate()?;
        }
        Ok(())
    }
}

/// Body of an update request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl DesignUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

/// A read-only seed design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    /// Scene payload in the same form as `DesignRecord::canvas_data`.
    pub canvas_data: Value,
    pub category_id: Option<String>,
    pub tags: Vec<String>,
    pub dimensions: Dimensions,
    pub is_premium: bool,
    pub usage_count: u64,
    pub created_by: String,
    pub is_active: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Default for TemplateRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            thumbnail: String::new(),
            canvas_data: Value::Null,
            category_id: None,
            tags: Vec::new(),
            dimensions: Dimensions::default(),
            is_premium: false,
            usage_count: 0,
            created_by: String::new(),
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Response envelope used by the storage service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// The payload, or `StorageError::Rejected` carrying the HTTP status
    /// and the envelope's error text.
    pub fn into_result(self, status: u16) -> StorageResult<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(StorageError::Rejected {
                status,
                message: self.error.unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}
