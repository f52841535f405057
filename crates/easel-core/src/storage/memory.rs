//! In-memory design store.

use super::{BoxFuture, DesignStore, StorageError, StorageResult};
use crate::design::{DesignRecord, DesignUpdate, NewDesign, now_millis};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owner recorded on designs created through this store.
pub const LOCAL_OWNER: &str = "local";

/// In-memory store for tests and ephemeral use.
///
/// Every accepted update is also appended to a log, so callers can check
/// what was sent and in which order.
#[derive(Default)]
pub struct MemoryDesignStore {
    designs: RwLock<HashMap<String, DesignRecord>>,
    updates: RwLock<Vec<(String, DesignUpdate)>>,
    failing: AtomicBool,
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl MemoryDesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly.
    pub fn insert(&self, record: DesignRecord) -> StorageResult<()> {
        let mut designs = self.designs.write().map_err(lock_error)?;
        designs.insert(record.id.clone(), record);
        Ok(())
    }

    /// Current stored record, bypassing the async interface.
    pub fn get(&self, id: &str) -> Option<DesignRecord> {
        self.designs.read().ok()?.get(id).cloned()
    }

    /// Updates accepted so far, oldest first.
    pub fn updates(&self) -> Vec<(String, DesignUpdate)> {
        self.updates.read().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.read().map(|u| u.len()).unwrap_or_default()
    }

    /// While set, every update is rejected the way an unavailable service
    /// would answer.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl DesignStore for MemoryDesignStore {
    fn fetch(&self, id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let id = id.to_string();
        Box::pin(async move {
            let designs = self.designs.read().map_err(lock_error)?;
            designs.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn update(&self, id: &str, update: &DesignUpdate) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let id = id.to_string();
        let update = update.clone();
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Rejected {
                    status: 503,
                    message: "Service unavailable".to_string(),
                });
            }
            let mut designs = self.designs.write().map_err(lock_error)?;
            let record = designs.get_mut(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            record.apply_update(update.clone(), now_millis());
            let saved = record.clone();
            drop(designs);

            self.updates.write().map_err(lock_error)?.push((id, update));
            Ok(saved)
        })
    }

    fn create(&self, request: &NewDesign) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let request = request.clone();
        Box::pin(async move {
            let record = DesignRecord::create(uuid::Uuid::new_v4().to_string(), LOCAL_OWNER, request, now_millis());
            let mut designs = self.designs.write().map_err(lock_error)?;
            designs.insert(record.id.clone(), record.clone());
            Ok(record)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut designs = self.designs.write().map_err(lock_error)?;
            designs.remove(&id).map(|_| ()).ok_or(StorageError::NotFound(id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use serde_json::json;

    #[test]
    fn test_create_fetch_update() {
        let store = MemoryDesignStore::new();
        let created = block_on(store.create(&NewDesign::default())).unwrap();
        assert_eq!(created.version, 1);

        let update = DesignUpdate {
            canvas_data: Some(json!({ "objects": [] })),
            ..DesignUpdate::default()
        };
        let updated = block_on(store.update(&created.id, &update)).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(block_on(store.fetch(&created.id)).unwrap().version, 2);
        assert_eq!(store.update_count(), 1);
    }

    #[test]
    fn test_not_found() {
        let store = MemoryDesignStore::new();
        assert!(matches!(block_on(store.fetch("missing")), Err(StorageError::NotFound(_))));
        assert!(matches!(
            block_on(store.update("missing", &DesignUpdate::default())),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(block_on(store.delete("missing")), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_failing_updates_leave_record_alone() {
        let store = MemoryDesignStore::new();
        let created = block_on(store.create(&NewDesign::default())).unwrap();
        store.set_failing(true);
        assert!(matches!(
            block_on(store.update(&created.id, &DesignUpdate::default())),
            Err(StorageError::Rejected { status: 503, .. })
        ));
        assert_eq!(store.get(&created.id).unwrap().version, 1);
        assert_eq!(store.update_count(), 0);
    }
}
