//! Bounded linear undo/redo over scene snapshots.

use crate::scene::ScenePayload;
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of snapshots to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// An immutable serialized copy of the whole scene.
pub type Snapshot = Arc<ScenePayload>;

/// Snapshot buffer with a cursor at the current state.
///
/// The manager never touches the scene itself; callers apply the snapshots
/// returned by [`HistoryManager::undo`] and [`HistoryManager::redo`].
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: VecDeque<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl HistoryManager {
    /// Create a manager keeping at most `capacity` snapshots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
        }
    }

    /// Record the state after a committed mutation. Discards any redo
    /// branch and evicts the oldest snapshot beyond capacity.
    pub fn record(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back. `None` when already at the first snapshot.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        log::debug!("Undo to history entry {}/{}", self.cursor + 1, self.entries.len());
        self.entries.get(self.cursor).cloned()
    }

    /// Step forward. `None` when already at the last snapshot.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        log::debug!("Redo to history entry {}/{}", self.cursor + 1, self.entries.len());
        self.entries.get(self.cursor).cloned()
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
