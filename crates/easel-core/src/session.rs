//! The editor session: one open design and everything editing it.
//!
//! [`EditorSession`] owns the scene graph, selection, history, tool machine,
//! viewport, layer view and notice queue. It is the only consumer of scene
//! events: after every operation it drains them, records a history snapshot
//! for user changes, bumps the revision used for dirty tracking, and
//! refreshes the layer view.

use crate::assets::AssetRef;
use crate::color::Color;
use crate::config::EditorConfig;
use crate::design::{DEFAULT_DESIGN_TITLE, DesignRecord, Dimensions, ValidationError, validate_title};
use crate::history::HistoryManager;
use crate::input::{KeyPress, PointerEvent};
use crate::layers::{LayerCommand, LayerView};
use crate::notify::{Notice, NoticeQueue};
use crate::objects::{AttributePatch, ObjectId, ObjectKind, SceneObject};
use crate::scene::{ChangeOrigin, SceneGraph, ScenePayload, ZDirection};
use crate::selection::{Corner, Dimension, SelectionController};
use crate::tools::{Preset, Tool, ToolCommand, ToolContext, ToolMachine};
use crate::viewport::Viewport;
use kurbo::{Size, Vec2};
use std::sync::Arc;

/// Shown when a stored payload cannot be read.
pub const MALFORMED_DESIGN_WARNING: &str = "Could not read design data. Starting with an empty canvas.";

/// Identity of the open design.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMeta {
    pub id: String,
    pub title: String,
    pub dimensions: Dimensions,
}

/// How opening a design went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Opened,
    /// The stored payload was unreadable; the canvas starts empty and a
    /// warning notice was queued.
    Recovered,
}

/// Editing state for one design.
#[derive(Debug, Clone)]
pub struct EditorSession {
    config: EditorConfig,
    design: DesignMeta,
    scene: SceneGraph,
    selection: SelectionController,
    history: HistoryManager,
    tools: ToolMachine,
    viewport: Viewport,
    layers: LayerView,
    notices: NoticeQueue,
    revision: u64,
    saved_revision: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    /// A session on an empty, unsaved design.
    pub fn new(config: EditorConfig) -> Self {
        let mut session = Self {
            design: DesignMeta {
                id: String::new(),
                title: DEFAULT_DESIGN_TITLE.to_string(),
                dimensions: config.default_dimensions,
            },
            scene: SceneGraph::new(),
            selection: SelectionController::new(),
            history: HistoryManager::new(config.history_limit),
            tools: ToolMachine::new(config.tool_settings()),
            viewport: Viewport::new(config.zoom_min, config.zoom_max),
            layers: LayerView::new(),
            notices: NoticeQueue::new(),
            revision: 0,
            saved_revision: 0,
            config,
        };
        session.reset_history();
        session
    }

    // --- lifecycle ------------------------------------------------------

    /// Replace everything with a stored design. Selection, tool state and
    /// history are discarded; the loaded content becomes the undo baseline.
    pub fn open_design(&mut self, record: &DesignRecord) -> OpenStatus {
        self.tools = ToolMachine::new(self.config.tool_settings());
        self.selection.clear();
        self.viewport.reset();
        self.design = DesignMeta {
            id: record.id.clone(),
            title: record.title.clone(),
            dimensions: record.dimensions,
        };

        let status = match record.canvas_data.as_ref().filter(|v| !v.is_null()) {
            None => {
                self.scene.clear(ChangeOrigin::Load);
                OpenStatus::Opened
            }
            Some(payload) => match self.scene.deserialize(payload) {
                Ok(()) => OpenStatus::Opened,
                Err(e) => {
                    log::warn!("Design {} has unreadable canvas data: {e}", record.id);
                    self.scene.clear(ChangeOrigin::Load);
                    self.notices.warning(MALFORMED_DESIGN_WARNING);
                    OpenStatus::Recovered
                }
            },
        };

        self.scene.take_events();
        self.reset_history();
        self.saved_revision = self.revision;
        self.refresh_layers();
        log::info!("Opened design {} ({} objects)", self.design.id, self.scene.len());
        status
    }

    fn reset_history(&mut self) {
        self.history.clear();
        self.history.record(Arc::new(self.scene.serialize()));
    }

    /// Drain scene events into history, revision and the layer view.
    fn sync(&mut self) {
        let events = self.scene.take_events();
        if !events.is_empty() {
            if events.iter().any(|e| e.origin == ChangeOrigin::User) {
                let snapshot = self.scene.serialize();
                // A cancelled drag publishes changes that net out to nothing.
                if self.history.current().is_none_or(|current| **current != snapshot) {
                    self.history.record(Arc::new(snapshot));
                    self.revision += 1;
                }
            }
            if events.iter().any(|e| e.origin == ChangeOrigin::History) {
                self.revision += 1;
            }
            self.selection.retain_valid(&self.scene);
        }
        self.refresh_layers();
    }

    fn refresh_layers(&mut self) {
        self.layers.refresh(&self.scene, &self.selection);
    }

    // --- queries --------------------------------------------------------

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn design(&self) -> &DesignMeta {
        &self.design
    }

    pub fn design_id(&self) -> &str {
        &self.design.id
    }

    pub fn title(&self) -> &str {
        &self.design.title
    }

    pub fn dimensions(&self) -> Dimensions {
        self.design.dimensions
    }

    pub fn canvas_size(&self) -> Size {
        self.design.dimensions.size()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tools(&self) -> &ToolMachine {
        &self.tools
    }

    pub fn tool(&self) -> Tool {
        self.tools.tool()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Zoom and pan never touch the scene.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn layers(&self) -> &LayerView {
        &self.layers
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Serialized scene content.
    pub fn snapshot(&self) -> ScenePayload {
        self.scene.serialize()
    }

    /// Bumped by every user-visible change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn saved_revision(&self) -> u64 {
        self.saved_revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// Record that the state at `revision` reached storage.
    pub fn mark_saved(&mut self, revision: u64) {
        if revision > self.saved_revision && revision <= self.revision {
            self.saved_revision = revision;
        }
    }

    // --- design metadata ------------------------------------------------

    pub fn set_title(&mut self, title: &str) -> Result<(), ValidationError> {
        validate_title(title)?;
        let title = title.trim();
        if self.design.title != title {
            self.design.title = title.to_string();
            self.revision += 1;
        }
        Ok(())
    }

    // --- input ----------------------------------------------------------

    fn with_tools<R>(&mut self, f: impl FnOnce(&mut ToolMachine, &mut ToolContext<'_>) -> R) -> R {
        let mut ctx = ToolContext {
            scene: &mut self.scene,
            selection: &mut self.selection,
            viewport: &mut self.viewport,
            canvas: self.design.dimensions.size(),
        };
        let result = f(&mut self.tools, &mut ctx);
        self.sync();
        result
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        self.with_tools(|tools, ctx| tools.handle_pointer(ctx, event));
    }

    /// Handle a key press. Undo and redo are carried out here; `Save` is
    /// returned for the host to hand to the persistence bridge.
    pub fn handle_key(&mut self, press: &KeyPress) -> Option<ToolCommand> {
        let command = self.with_tools(|tools, ctx| tools.handle_key(ctx, press));
        match command {
            Some(ToolCommand::Undo) => {
                self.undo();
            }
            Some(ToolCommand::Redo) => {
                self.redo();
            }
            Some(ToolCommand::Save) | None => {}
        }
        command
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.with_tools(|tools, ctx| tools.set_tool(ctx, tool));
    }

    /// Arm the image tool with an uploaded asset.
    pub fn arm_image(&mut self, asset: AssetRef) {
        self.with_tools(|tools, ctx| tools.arm_image(ctx, asset));
    }

    /// Abort any drag in progress, restoring what it moved.
    pub fn cancel_interaction(&mut self) {
        self.with_tools(|tools, ctx| tools.cancel(ctx));
    }

    // --- history --------------------------------------------------------

    /// Step back one snapshot. Returns `false` when there is nothing to
    /// undo.
    pub fn undo(&mut self) -> bool {
        self.cancel_interaction();
        match self.history.undo() {
            Some(snapshot) => {
                self.scene.replace(&snapshot, ChangeOrigin::History);
                self.sync();
                true
            }
            None => {
                log::debug!("Nothing to undo");
                false
            }
        }
    }

    /// Step forward one snapshot. Returns `false` when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        self.cancel_interaction();
        match self.history.redo() {
            Some(snapshot) => {
                self.scene.replace(&snapshot, ChangeOrigin::History);
                self.sync();
                true
            }
            None => {
                log::debug!("Nothing to redo");
                false
            }
        }
    }

    // --- editing --------------------------------------------------------

    /// Run several scene mutations as one logical action.
    pub fn with_scene<R>(&mut self, f: impl FnOnce(&mut SceneGraph) -> R) -> R {
        let result = self.scene.batch(f);
        self.sync();
        result
    }

    /// Add an object from its kind's defaults plus `initial`, topmost.
    pub fn add_object(&mut self, kind: ObjectKind, initial: &AttributePatch) -> ObjectId {
        let id = self.scene.add_object(kind, initial).id().clone();
        self.sync();
        id
    }

    /// Add a prepared object topmost.
    pub fn insert_object(&mut self, object: SceneObject) -> ObjectId {
        let id = self.scene.insert(object).id().clone();
        self.sync();
        id
    }

    /// Insert a panel preset at its default position, select it and return
    /// to the select tool.
    pub fn place_preset(&mut self, preset: Preset) -> ObjectId {
        self.with_tools(|tools, ctx| tools.place_preset(ctx, preset))
    }

    /// Insert an uploaded image at the canvas origin and select it.
    pub fn place_image(&mut self, asset: &AssetRef) -> ObjectId {
        self.with_tools(|tools, ctx| tools.place_image(ctx, asset, None))
    }

    pub fn set_attributes(&mut self, id: &ObjectId, patch: &AttributePatch) -> bool {
        let changed = self.scene.set_attributes(id, patch);
        self.sync();
        changed
    }

    pub fn remove_object(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let removed = self.scene.remove_object(id);
        self.sync();
        removed
    }

    pub fn reorder(&mut self, id: &ObjectId, direction: ZDirection) -> bool {
        let moved = self.scene.reorder(id, direction);
        self.sync();
        moved
    }

    pub fn bring_to_front(&mut self, id: &ObjectId) -> bool {
        let moved = self.scene.bring_to_front(id);
        self.sync();
        moved
    }

    pub fn send_to_back(&mut self, id: &ObjectId) -> bool {
        let moved = self.scene.send_to_back(id);
        self.sync();
        moved
    }

    pub fn set_background(&mut self, color: Color) {
        self.scene.set_background(color);
        self.sync();
    }

    // --- selection ------------------------------------------------------

    pub fn select(&mut self, ids: &[ObjectId]) {
        self.selection.select(&self.scene, ids);
        self.refresh_layers();
    }

    pub fn toggle_in_selection(&mut self, id: &ObjectId) {
        self.selection.toggle(&self.scene, id);
        self.refresh_layers();
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.scene);
        self.refresh_layers();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.refresh_layers();
    }

    /// Take the selection out, e.g. so a render carries no decoration.
    pub fn take_selection(&mut self) -> Vec<ObjectId> {
        let ids = self.selection.take();
        self.refresh_layers();
        ids
    }

    pub fn restore_selection(&mut self, ids: Vec<ObjectId>) {
        self.selection.restore(&self.scene, ids);
        self.refresh_layers();
    }

    pub fn move_selection(&mut self, delta: Vec2) {
        self.selection.move_by(&mut self.scene, delta);
        self.sync();
    }

    pub fn resize_selection(&mut self, corner: Corner, delta: Vec2, keep_aspect_ratio: bool) {
        self.selection.resize(&mut self.scene, corner, delta, keep_aspect_ratio);
        self.sync();
    }

    pub fn rotate_selection(&mut self, degrees: f64) {
        self.selection.rotate(&mut self.scene, degrees);
        self.sync();
    }

    pub fn set_selection_size(&mut self, dimension: Dimension, value: f64) {
        self.selection.set_size(&mut self.scene, dimension, value);
        self.sync();
    }

    pub fn set_selection_opacity(&mut self, percent: f64) {
        self.selection.set_opacity_percent(&mut self.scene, percent);
        self.sync();
    }

    pub fn apply_style(&mut self, patch: &AttributePatch) {
        self.selection.apply_style(&mut self.scene, patch);
        self.sync();
    }

    pub fn delete_selection(&mut self) -> usize {
        let removed = self.selection.delete(&mut self.scene);
        self.sync();
        removed
    }

    pub fn toggle_lock(&mut self, id: &ObjectId) -> Option<bool> {
        let locked = self.selection.toggle_lock(&mut self.scene, id);
        self.sync();
        locked
    }

    pub fn toggle_visibility(&mut self, id: &ObjectId) -> Option<bool> {
        let visible = self.selection.toggle_visibility(&mut self.scene, id);
        self.sync();
        visible
    }

    /// Carry out a layer panel action.
    pub fn layer_command(&mut self, command: &LayerCommand) {
        LayerView::apply(command, &mut self.scene, &mut self.selection);
        self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use serde_json::json;

    fn record(canvas_data: Option<serde_json::Value>) -> DesignRecord {
        DesignRecord {
            id: "d1".into(),
            title: "Poster".into(),
            canvas_data,
            ..DesignRecord::default()
        }
    }

    #[test]
    fn test_each_action_records_one_snapshot() {
        let mut session = EditorSession::default();
        assert_eq!(session.history().len(), 1);

        let id = session.add_object(ObjectKind::Rect, &AttributePatch::new());
        session.select(std::slice::from_ref(&id));
        session.move_selection(Vec2::new(5.0, 5.0));
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.revision(), 2);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_undo_redo_restore_state_and_dirty() {
        let mut session = EditorSession::default();
        let id = session.add_object(ObjectKind::Rect, &AttributePatch::new().with_position(10.0, 10.0));
        session.set_attributes(&id, &AttributePatch::new().with_position(50.0, 50.0));
        session.mark_saved(session.revision());
        assert!(!session.is_dirty());

        assert!(session.undo());
        assert_eq!(session.scene().get(&id).unwrap().base().left, 10.0);
        assert!(session.is_dirty());

        assert!(session.redo());
        assert_eq!(session.scene().get(&id).unwrap().base().left, 50.0);
        assert!(!session.redo());
    }

    #[test]
    fn test_open_malformed_recovers_with_one_warning() {
        let mut session = EditorSession::default();
        let status = session.open_design(&record(Some(json!({ "objects": [{ "kind": "hexagon" }] }))));
        assert_eq!(status, OpenStatus::Recovered);
        assert!(session.scene().is_empty());
        assert_eq!(session.notices().count(crate::notify::NoticeLevel::Warning), 1);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_open_sets_baseline() {
        let mut session = EditorSession::default();
        session.add_object(ObjectKind::Text, &AttributePatch::new());
        session.open_design(&record(Some(json!([{ "kind": "rect", "id": "r1" }]))));
        assert_eq!(session.title(), "Poster");
        assert_eq!(session.history().len(), 1);
        assert!(!session.history().can_undo());

        session.set_attributes(&ObjectId::from("r1"), &AttributePatch::new().with_fill(Color::WHITE));
        assert!(session.undo());
        assert_eq!(session.scene().get(&ObjectId::from("r1")).unwrap().base().fill, Color::BLACK);
        assert!(!session.undo());
    }

    #[test]
    fn test_keyboard_undo_and_layers_follow() {
        let mut session = EditorSession::default();
        session.place_preset(Preset::Shape(crate::tools::ShapePreset::Star));
        assert_eq!(session.layers().len(), 1);
        assert!(session.layers().rows()[0].selected);

        let command = session.handle_key(&KeyPress::new("z", Modifiers::CTRL));
        assert_eq!(command, Some(ToolCommand::Undo));
        assert!(session.scene().is_empty());
        assert!(session.layers().is_empty());
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_cancelled_drag_records_nothing() {
        let mut session = EditorSession::default();
        let id = session.add_object(ObjectKind::Rect, &AttributePatch::new().with_position(100.0, 100.0));
        let revision = session.revision();
        let entries = session.history().len();

        session.handle_pointer(&PointerEvent::down(150.0, 150.0));
        session.handle_pointer(&PointerEvent::moved(220.0, 190.0));
        session.handle_key(&KeyPress::plain("Escape"));

        assert_eq!(session.scene().get(&id).unwrap().base().left, 100.0);
        assert_eq!(session.revision(), revision);
        assert_eq!(session.history().len(), entries);
    }

    #[test]
    fn test_with_scene_is_one_action() {
        let mut session = EditorSession::default();
        session.with_scene(|scene| {
            scene.add_object(ObjectKind::Rect, &AttributePatch::new());
            scene.add_object(ObjectKind::Ellipse, &AttributePatch::new());
            scene.set_background(Color::BLACK);
        });
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.revision(), 1);
    }

    #[test]
    fn test_title_change_dirties() {
        let mut session = EditorSession::default();
        assert!(session.set_title("").is_err());
        session.set_title("Launch day").unwrap();
        assert!(session.is_dirty());
    }
}
