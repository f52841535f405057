//! File-based design store for native platforms.

use super::{BoxFuture, DesignStore, StorageError, StorageResult};
use crate::design::{DesignRecord, DesignUpdate, NewDesign, now_millis};
use crate::storage::memory::LOCAL_OWNER;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each design as a JSON file named after its id.
pub struct FileDesignStore {
    base_path: PathBuf,
}

impl FileDesignStore {
    /// Create a store in `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Store in the platform data directory.
    ///
    /// On Unix: `~/.local/share/easel/designs/`
    /// On Windows: `%LOCALAPPDATA%\easel\designs\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("easel").join("designs"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `{id}.json`. Ids outside `[A-Za-z0-9_-]` are refused.
    fn design_path(&self, id: &str) -> StorageResult<PathBuf> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.base_path.join(format!("{id}.json")))
    }

    fn read(&self, id: &str) -> StorageResult<DesignRecord> {
        let path = self.design_path(id)?;
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn write(&self, record: &DesignRecord) -> StorageResult<()> {
        let path = self.design_path(&record.id)?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

impl DesignStore for FileDesignStore {
    fn fetch(&self, id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let result = self.read(id);
        Box::pin(async move { result })
    }

    fn update(&self, id: &str, update: &DesignUpdate) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let id = id.to_string();
        let update = update.clone();
        Box::pin(async move {
            let mut record = self.read(&id)?;
            record.apply_update(update, now_millis());
            self.write(&record)?;
            Ok(record)
        })
    }

    fn create(&self, request: &NewDesign) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let request = request.clone();
        Box::pin(async move {
            let record = DesignRecord::create(uuid::Uuid::new_v4().to_string(), LOCAL_OWNER, request, now_millis());
            self.write(&record)?;
            Ok(record)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.design_path(id);
        let id = id.to_string();
        Box::pin(async move {
            let path = path?;
            if !path.exists() {
                return Err(StorageError::NotFound(id));
            }
            fs::remove_file(&path)
                .map_err(|e| StorageError::Io(format!("Failed to delete {}: {}", path.display(), e)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileDesignStore::new(dir.path().to_path_buf()).unwrap();

        let created = block_on(store.create(&NewDesign {
            title: Some("Flyer".into()),
            ..NewDesign::default()
        }))
        .unwrap();
        let update = DesignUpdate {
            canvas_data: Some(json!({ "version": 1, "objects": [] })),
            ..DesignUpdate::default()
        };
        block_on(store.update(&created.id, &update)).unwrap();

        let loaded = block_on(store.fetch(&created.id)).unwrap();
        assert_eq!(loaded.title, "Flyer");
        assert_eq!(loaded.version, 2);
        assert!(loaded.canvas_data.is_some());
    }

    #[test]
    fn test_file_store_not_found_and_delete() {
        let dir = tempdir().unwrap();
        let store = FileDesignStore::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(block_on(store.fetch("nope")), Err(StorageError::NotFound(_))));

        let created = block_on(store.create(&NewDesign::default())).unwrap();
        block_on(store.delete(&created.id)).unwrap();
        assert!(matches!(block_on(store.fetch(&created.id)), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_store_keeps_similar_ids_apart() {
        let dir = tempdir().unwrap();
        let store = FileDesignStore::new(dir.path().to_path_buf()).unwrap();
        for (id, title) in [("a-b", "dash"), ("a_b", "underscore")] {
            store
                .write(&DesignRecord {
                    id: id.into(),
                    title: title.into(),
                    ..DesignRecord::default()
                })
                .unwrap();
        }
        assert_eq!(block_on(store.fetch("a-b")).unwrap().title, "dash");
        assert_eq!(block_on(store.fetch("a_b")).unwrap().title, "underscore");

        for id in ["a.b", "a/b:c", "../x", ""] {
            let record = DesignRecord {
                id: id.into(),
                ..DesignRecord::default()
            };
            assert!(matches!(store.write(&record), Err(StorageError::InvalidId(_))));
            assert!(matches!(block_on(store.fetch(id)), Err(StorageError::InvalidId(_))));
            assert!(matches!(block_on(store.delete(id)), Err(StorageError::InvalidId(_))));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
