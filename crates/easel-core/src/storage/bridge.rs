//! Persistence bridge between an editor session and a design store.
//!
//! Saving is split in three steps so hosts with their own executors can
//! drive it: [`PersistenceBridge::begin_save`] snapshots the session and
//! builds the update, the host awaits [`DesignStore::update`], and
//! [`PersistenceBridge::finish_save`] settles the dirty state. At most one
//! save per design is in flight; a trigger during that window is deferred
//! and fires afterwards with whatever the session holds by then.
//!
//! Auto-save is a trailing debounce: every observed revision change pushes
//! the deadline out by the configured delay.

use super::schedule::ScheduledTask;
use super::{DesignStore, StorageError, StorageResult};
use crate::config::EditorConfig;
use crate::design::{DesignRecord, DesignUpdate};
use crate::session::{EditorSession, OpenStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Notice shown when a debounced save fails.
pub const AUTO_SAVE_FAILED: &str = "Auto-save failed";
/// Notice shown when an explicit save fails.
pub const SAVE_FAILED: &str = "Save failed";

/// What triggered a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveReason {
    Auto,
    Explicit,
}

impl SaveReason {
    fn failure_message(self) -> &'static str {
        match self {
            SaveReason::Auto => AUTO_SAVE_FAILED,
            SaveReason::Explicit => SAVE_FAILED,
        }
    }

    /// Explicit wins when two triggers collapse into one save.
    fn merge(self, other: SaveReason) -> SaveReason {
        if self == SaveReason::Explicit || other == SaveReason::Explicit {
            SaveReason::Explicit
        } else {
            SaveReason::Auto
        }
    }
}

/// One save, built from the session state at the moment it was begun.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub design_id: String,
    /// Session revision the update reflects.
    pub revision: u64,
    pub reason: SaveReason,
    pub update: DesignUpdate,
}

/// Thumbnail rendering failure.
#[derive(Debug, Error)]
#[error("Thumbnail failed: {0}")]
pub struct ThumbnailError(pub String);

/// Renders the low-resolution preview stored alongside each save.
pub trait ThumbnailRenderer {
    /// Returns an image reference, usually a `data:` URL.
    fn render_thumbnail(
        &self,
        session: &EditorSession,
        multiplier: f64,
        quality: f64,
    ) -> Result<String, ThumbnailError>;
}

/// Identifies one load so late results can be recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub design_id: String,
    generation: u64,
}

/// Result of finishing a load.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    /// The stored payload was unreadable; the canvas is empty and the
    /// session holds a warning notice.
    LoadedWithWarning,
    /// Nothing was opened. The host should leave the editor.
    Failed(StorageError),
    /// A newer load superseded this one; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    design_id: String,
    revision: u64,
}

/// Debounced and explicit saves plus guarded loads for one editor.
pub struct PersistenceBridge<S: DesignStore> {
    store: Arc<S>,
    delay: Duration,
    autosave: ScheduledTask,
    observed_design: String,
    observed_revision: u64,
    in_flight: Option<InFlight>,
    deferred: Option<SaveReason>,
    thumbnailer: Option<Box<dyn ThumbnailRenderer>>,
    thumbnail_multiplier: f64,
    thumbnail_quality: f64,
    load_generation: u64,
    pending_load: Option<LoadTicket>,
}

impl<S: DesignStore> PersistenceBridge<S> {
    pub fn new(store: Arc<S>, config: &EditorConfig) -> Self {
        Self {
            store,
            delay: Duration::from_millis(config.autosave_delay_ms),
            autosave: ScheduledTask::new(),
            observed_design: String::new(),
            observed_revision: 0,
            in_flight: None,
            deferred: None,
            thumbnailer: None,
            thumbnail_multiplier: config.thumbnail_multiplier,
            thumbnail_quality: config.thumbnail_quality,
            load_generation: 0,
            pending_load: None,
        }
    }

    pub fn with_thumbnailer(mut self, renderer: impl ThumbnailRenderer + 'static) -> Self {
        self.thumbnailer = Some(Box::new(renderer));
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// When the pending auto-save fires, if one is scheduled.
    pub fn autosave_due(&self) -> Option<Instant> {
        self.autosave.due()
    }

    // --- auto-save ------------------------------------------------------

    /// Note the session's current revision. A new revision on a dirty
    /// design restarts the debounce window from `now`.
    pub fn observe(&mut self, session: &EditorSession, now: Instant) {
        if session.design_id() != self.observed_design {
            self.observed_design = session.design_id().to_string();
            self.observed_revision = session.revision();
            self.autosave.cancel();
            self.deferred = None;
            return;
        }
        if session.revision() == self.observed_revision {
            return;
        }
        self.observed_revision = session.revision();
        if session.is_dirty() && !session.design_id().is_empty() {
            self.autosave.schedule(now + self.delay);
        }
    }

    /// Observe, then begin an auto-save if the debounce window has elapsed.
    pub fn poll(&mut self, session: &mut EditorSession, now: Instant) -> Option<SaveRequest> {
        self.observe(session, now);
        if self.autosave.poll(now) {
            self.begin_save(session, SaveReason::Auto)
        } else {
            None
        }
    }

    // --- saving ---------------------------------------------------------

    /// Build a save from the current state.
    ///
    /// Returns `None` when there is nothing to send: no design is open, the
    /// design is clean, or a save for it is already in flight (in which case
    /// the trigger is remembered and reported by [`Self::finish_save`]).
    pub fn begin_save(&mut self, session: &mut EditorSession, reason: SaveReason) -> Option<SaveRequest> {
        let design_id = session.design_id().to_string();
        if design_id.is_empty() {
            log::debug!("No design open, nothing to save");
            return None;
        }
        if self.in_flight.as_ref().is_some_and(|f| f.design_id == design_id) {
            log::debug!("Save for {design_id} in flight, deferring");
            self.deferred = Some(self.deferred.map_or(reason, |d| d.merge(reason)));
            self.autosave.cancel();
            return None;
        }
        self.autosave.cancel();
        if !session.is_dirty() {
            log::debug!("Design {design_id} is clean, skipping save");
            return None;
        }

        let canvas_data = match session.snapshot().to_value() {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to serialize design {design_id}: {e}");
                session.notices_mut().error(reason.failure_message());
                return None;
            }
        };
        let thumbnail = self.thumbnailer.as_ref().and_then(|renderer| {
            renderer
                .render_thumbnail(session, self.thumbnail_multiplier, self.thumbnail_quality)
                .map_err(|e| log::warn!("Saving {design_id} without thumbnail: {e}"))
                .ok()
        });

        let revision = session.revision();
        self.in_flight = Some(InFlight {
            design_id: design_id.clone(),
            revision,
        });
        self.deferred = None;
        log::debug!("Saving design {design_id} at revision {revision} ({reason:?})");

        Some(SaveRequest {
            design_id,
            revision,
            reason,
            update: DesignUpdate {
                canvas_data: Some(canvas_data),
                thumbnail,
                title: Some(session.title().to_string()),
                ..DesignUpdate::default()
            },
        })
    }

    /// Settle a save. Success clears dirty up to the saved revision;
    /// failure keeps the design dirty and queues an error notice.
    ///
    /// Returns the reason of a deferred trigger that should be saved now.
    pub fn finish_save(
        &mut self,
        session: &mut EditorSession,
        request: &SaveRequest,
        result: StorageResult<DesignRecord>,
    ) -> Option<SaveReason> {
        let matches_in_flight = self.in_flight.as_ref().is_some_and(|f| {
            f.design_id == request.design_id && f.revision == request.revision
        });
        if matches_in_flight {
            self.in_flight = None;
        }
        let same_design = session.design_id() == request.design_id;

        match result {
            Ok(record) => {
                if same_design {
                    session.mark_saved(request.revision);
                }
                log::info!("Saved design {} (version {})", record.id, record.version);
            }
            Err(e) => {
                log::error!("Failed to save design {}: {e}", request.design_id);
                session.notices_mut().error(request.reason.failure_message());
            }
        }

        if !matches_in_flight {
            return None;
        }
        let deferred = self.deferred.take()?;
        (same_design && session.is_dirty()).then_some(deferred)
    }

    /// Run a save to completion, including any save deferred meanwhile.
    /// Returns whether the last attempt succeeded.
    pub async fn save_now(&mut self, session: &mut EditorSession, reason: SaveReason) -> bool {
        let mut next = self.begin_save(session, reason);
        let mut saved = false;
        while let Some(request) = next {
            let store = Arc::clone(&self.store);
            let result = store.update(&request.design_id, &request.update).await;
            saved = result.is_ok();
            next = self
                .finish_save(session, &request, result)
                .and_then(|reason| self.begin_save(session, reason));
        }
        saved
    }

    // --- loading --------------------------------------------------------

    /// Start loading a design. A second load of the design already being
    /// loaded is ignored; a load of a different design supersedes it.
    pub fn begin_load(&mut self, design_id: &str) -> Option<LoadTicket> {
        if self.pending_load.as_ref().is_some_and(|t| t.design_id == design_id) {
            log::debug!("Load of {design_id} already pending");
            return None;
        }
        self.load_generation += 1;
        let ticket = LoadTicket {
            design_id: design_id.to_string(),
            generation: self.load_generation,
        };
        self.pending_load = Some(ticket.clone());
        Some(ticket)
    }

    /// Apply a fetched design to the session.
    pub fn finish_load(
        &mut self,
        session: &mut EditorSession,
        ticket: &LoadTicket,
        result: StorageResult<DesignRecord>,
    ) -> LoadOutcome {
        if self.pending_load.as_ref() != Some(ticket) {
            log::debug!("Dropping stale load of {}", ticket.design_id);
            return LoadOutcome::Stale;
        }
        self.pending_load = None;

        match result {
            Ok(record) => {
                let status = session.open_design(&record);
                self.observed_design = session.design_id().to_string();
                self.observed_revision = session.revision();
                self.autosave.cancel();
                self.deferred = None;
                match status {
                    OpenStatus::Opened => LoadOutcome::Loaded,
                    OpenStatus::Recovered => LoadOutcome::LoadedWithWarning,
                }
            }
            Err(e) => {
                log::error!("Failed to load design {}: {e}", ticket.design_id);
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Fetch and open a design. `None` when an identical load is pending.
    pub async fn load(&mut self, session: &mut EditorSession, design_id: &str) -> Option<LoadOutcome> {
        let ticket = self.begin_load(design_id)?;
        let store = Arc::clone(&self.store);
        let result = store.fetch(design_id).await;
        Some(self.finish_load(session, &ticket, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeLevel;
    use crate::objects::{AttributePatch, ObjectKind};
    use crate::session::MALFORMED_DESIGN_WARNING;
    use crate::storage::MemoryDesignStore;
    use pollster::block_on;
    use serde_json::json;

    const DESIGN: &str = "design-1";

    fn setup() -> (PersistenceBridge<MemoryDesignStore>, EditorSession) {
        let store = Arc::new(MemoryDesignStore::new());
        store
            .insert(DesignRecord {
                id: DESIGN.into(),
                ..DesignRecord::default()
            })
            .unwrap();
        let mut bridge = PersistenceBridge::new(store, &EditorConfig::default());
        let mut session = EditorSession::default();
        let outcome = block_on(bridge.load(&mut session, DESIGN)).unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded));
        (bridge, session)
    }

    fn add_rect(session: &mut EditorSession, left: f64) {
        session.add_object(
            ObjectKind::Rect,
            &AttributePatch {
                left: Some(left),
                ..AttributePatch::default()
            },
        );
    }

    fn complete(
        bridge: &mut PersistenceBridge<MemoryDesignStore>,
        session: &mut EditorSession,
        request: &SaveRequest,
    ) -> Option<SaveReason> {
        let result = block_on(bridge.store().update(&request.design_id, &request.update));
        bridge.finish_save(session, request, result)
    }

    fn saved_object_count(update: &DesignUpdate) -> usize {
        update.canvas_data.as_ref().unwrap()["objects"].as_array().unwrap().len()
    }

    struct FixedThumbnail;

    impl ThumbnailRenderer for FixedThumbnail {
        fn render_thumbnail(&self, _: &EditorSession, multiplier: f64, quality: f64) -> Result<String, ThumbnailError> {
            Ok(format!("thumb@{multiplier}x{quality}"))
        }
    }

    struct BrokenThumbnail;

    impl ThumbnailRenderer for BrokenThumbnail {
        fn render_thumbnail(&self, _: &EditorSession, _: f64, _: f64) -> Result<String, ThumbnailError> {
            Err(ThumbnailError("no pixels".into()))
        }
    }

    #[test]
    fn test_autosave_waits_for_quiet_period() {
        let (mut bridge, mut session) = setup();
        let t0 = Instant::now();
        add_rect(&mut session, 10.0);

        assert!(bridge.poll(&mut session, t0).is_none());
        assert!(bridge.poll(&mut session, t0 + Duration::from_millis(2499)).is_none());
        let request = bridge.poll(&mut session, t0 + Duration::from_millis(2500)).unwrap();
        assert_eq!(request.reason, SaveReason::Auto);
        assert_eq!(request.design_id, DESIGN);
    }

    #[test]
    fn test_mutations_in_window_coalesce() {
        let (mut bridge, mut session) = setup();
        let t0 = Instant::now();

        add_rect(&mut session, 10.0);
        bridge.observe(&session, t0);
        add_rect(&mut session, 20.0);
        bridge.observe(&session, t0 + Duration::from_millis(500));

        assert!(bridge.poll(&mut session, t0 + Duration::from_millis(2500)).is_none());
        let request = bridge.poll(&mut session, t0 + Duration::from_millis(3000)).unwrap();
        assert_eq!(saved_object_count(&request.update), 2);

        assert!(complete(&mut bridge, &mut session, &request).is_none());
        assert!(!session.is_dirty());
        assert_eq!(bridge.store().update_count(), 1);
        assert!(bridge.poll(&mut session, t0 + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_save_during_flight_is_deferred() {
        let (mut bridge, mut session) = setup();
        add_rect(&mut session, 10.0);
        let first = bridge.begin_save(&mut session, SaveReason::Explicit).unwrap();
        assert!(bridge.is_saving());

        add_rect(&mut session, 20.0);
        assert!(bridge.begin_save(&mut session, SaveReason::Auto).is_none());
        assert_eq!(bridge.store().update_count(), 0);

        let follow_up = complete(&mut bridge, &mut session, &first);
        assert_eq!(follow_up, Some(SaveReason::Auto));
        assert!(session.is_dirty());

        let second = bridge.begin_save(&mut session, SaveReason::Auto).unwrap();
        assert_eq!(saved_object_count(&second.update), 2);
        complete(&mut bridge, &mut session, &second);
        assert!(!session.is_dirty());
        assert_eq!(bridge.store().get(DESIGN).unwrap().version, 3);
    }

    #[test]
    fn test_save_now_runs_deferred_cycle() {
        let (mut bridge, mut session) = setup();
        add_rect(&mut session, 10.0);
        session.set_title("Poster").unwrap();

        assert!(block_on(bridge.save_now(&mut session, SaveReason::Explicit)));
        let stored = bridge.store().get(DESIGN).unwrap();
        assert_eq!(stored.title, "Poster");
        assert_eq!(stored.version, 2);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_clean_design_is_not_saved() {
        let (mut bridge, mut session) = setup();
        assert!(bridge.begin_save(&mut session, SaveReason::Explicit).is_none());
        assert!(!block_on(bridge.save_now(&mut session, SaveReason::Explicit)));
        assert_eq!(bridge.store().update_count(), 0);
    }

    #[test]
    fn test_failed_save_keeps_dirty_and_notifies() {
        let (mut bridge, mut session) = setup();
        bridge.store().set_failing(true);
        add_rect(&mut session, 10.0);
        session.take_notices();

        let t0 = Instant::now();
        bridge.observe(&session, t0);
        let request = bridge.poll(&mut session, t0 + Duration::from_secs(3)).unwrap();
        complete(&mut bridge, &mut session, &request);

        assert!(session.is_dirty());
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, AUTO_SAVE_FAILED);
        assert!(!bridge.is_saving());
    }

    #[test]
    fn test_edit_during_flight_stays_dirty() {
        let (mut bridge, mut session) = setup();
        add_rect(&mut session, 10.0);
        let request = bridge.begin_save(&mut session, SaveReason::Explicit).unwrap();
        add_rect(&mut session, 20.0);

        assert!(complete(&mut bridge, &mut session, &request).is_none());
        assert!(session.is_dirty());
        assert_eq!(session.saved_revision(), request.revision);
    }

    #[test]
    fn test_thumbnail_attached_or_skipped() {
        let (bridge, mut session) = setup();
        let mut bridge = bridge.with_thumbnailer(FixedThumbnail);
        add_rect(&mut session, 10.0);
        let request = bridge.begin_save(&mut session, SaveReason::Explicit).unwrap();
        assert_eq!(request.update.thumbnail.as_deref(), Some("thumb@0.25x0.4"));

        let (bridge, mut session) = setup();
        let mut bridge = bridge.with_thumbnailer(BrokenThumbnail);
        add_rect(&mut session, 10.0);
        let request = bridge.begin_save(&mut session, SaveReason::Explicit).unwrap();
        assert!(request.update.thumbnail.is_none());
        assert!(request.update.canvas_data.is_some());
    }

    #[test]
    fn test_duplicate_load_is_ignored() {
        let (mut bridge, _session) = setup();
        let first = bridge.begin_load(DESIGN);
        assert!(first.is_some());
        assert!(bridge.begin_load(DESIGN).is_none());
        assert!(bridge.is_loading());
    }

    #[test]
    fn test_superseded_load_is_stale() {
        let (mut bridge, mut session) = setup();
        bridge
            .store()
            .insert(DesignRecord {
                id: "design-2".into(),
                title: "Second".into(),
                ..DesignRecord::default()
            })
            .unwrap();

        let old = bridge.begin_load(DESIGN).unwrap();
        let new = bridge.begin_load("design-2").unwrap();
        let result = block_on(bridge.store().fetch("design-2"));
        assert!(matches!(bridge.finish_load(&mut session, &new, result), LoadOutcome::Loaded));

        let result = block_on(bridge.store().fetch(DESIGN));
        assert!(matches!(bridge.finish_load(&mut session, &old, result), LoadOutcome::Stale));
        assert_eq!(session.title(), "Second");
    }

    #[test]
    fn test_malformed_payload_loads_with_warning() {
        let (mut bridge, mut session) = setup();
        bridge
            .store()
            .insert(DesignRecord {
                id: "broken".into(),
                canvas_data: Some(json!({ "version": 1, "objects": [{ "kind": "hologram" }] })),
                ..DesignRecord::default()
            })
            .unwrap();

        let outcome = block_on(bridge.load(&mut session, "broken")).unwrap();
        assert!(matches!(outcome, LoadOutcome::LoadedWithWarning));
        assert!(session.scene().is_empty());
        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, MALFORMED_DESIGN_WARNING);
    }

    #[test]
    fn test_failed_load_has_no_notice() {
        let (mut bridge, mut session) = setup();
        let outcome = block_on(bridge.load(&mut session, "missing")).unwrap();
        assert!(matches!(outcome, LoadOutcome::Failed(StorageError::NotFound(_))));
        assert!(session.notices().is_empty());
        assert!(!bridge.is_loading());
    }
}
