//! Storage collaborator abstraction and the persistence bridge.

mod bridge;
mod memory;
mod schedule;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use bridge::{
    LoadOutcome, LoadTicket, PersistenceBridge, SaveReason, SaveRequest, ThumbnailError,
    ThumbnailRenderer,
};
pub use memory::MemoryDesignStore;
pub use schedule::ScheduledTask;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileDesignStore;

use crate::design::{DesignRecord, DesignUpdate, NewDesign};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Design not found: {0}")]
    NotFound(String),
    #[error("Invalid design id: {0:?}")]
    InvalidId(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    /// The service answered with an error envelope.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// The design storage service as seen by the editor.
///
/// On native platforms implementations must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait DesignStore: Send + Sync {
    /// Fetch a design by id.
    fn fetch(&self, id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    /// Apply an update; the stored version increases by exactly one.
    fn update(&self, id: &str, update: &DesignUpdate) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    /// Create a design.
    fn create(&self, request: &NewDesign) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    /// Delete a design.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;
}

/// The design storage service (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait DesignStore {
    fn fetch(&self, id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    fn update(&self, id: &str, update: &DesignUpdate) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    fn create(&self, request: &NewDesign) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;
}
