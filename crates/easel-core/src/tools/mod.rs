//! Tool system for the editor.
//!
//! The [`ToolMachine`] interprets pointer and keyboard input for the active
//! tool and turns it into scene, selection and viewport changes. A drag
//! holds a scene batch open from pointer-down to pointer-up, so one gesture
//! publishes one scene event.

mod presets;
mod shortcuts;

pub use presets::{
    IMAGE_MAX_WIDTH, LINE_DEFAULT_POSITION, Preset, SHAPE_DEFAULT_POSITION, ShapePreset,
    TEXT_DEFAULT_POSITION, TextPreset, image_from_asset,
};
pub use shortcuts::{Shortcut, ShortcutAction, ShortcutRegistry};

use crate::assets::AssetRef;
use crate::input::{KeyPress, Modifiers, MouseButton, PointerEvent};
use crate::objects::{AttributePatch, ObjectId, SceneObject};
use crate::scene::SceneGraph;
use crate::selection::{
    Corner, HANDLE_HIT_TOLERANCE, HandleKind, ROTATION_SNAP_DEGREES, SelectionController,
    hit_test_handles, resize_patch, rotate_patch,
};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Object hit tolerance in screen pixels.
pub const OBJECT_HIT_TOLERANCE: f64 = 4.0;
/// A marquee shorter than this (screen pixels) counts as a click.
pub const MARQUEE_MIN_EXTENT: f64 = 3.0;
/// Zoom factor per ctrl+wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    Pan,
    Text,
    Rect,
    Circle,
    Triangle,
    Line,
    Image,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Select,
        Tool::Pan,
        Tool::Text,
        Tool::Rect,
        Tool::Circle,
        Tool::Triangle,
        Tool::Line,
        Tool::Image,
    ];

    /// The preset a click with this tool inserts.
    pub fn preset(&self) -> Option<Preset> {
        match self {
            Tool::Text => Some(Preset::Text(TextPreset::Body)),
            Tool::Rect => Some(Preset::Shape(ShapePreset::Rect)),
            Tool::Circle => Some(Preset::Shape(ShapePreset::Circle)),
            Tool::Triangle => Some(Preset::Shape(ShapePreset::Triangle)),
            Tool::Line => Some(Preset::Shape(ShapePreset::Line)),
            Tool::Select | Tool::Pan | Tool::Image => None,
        }
    }
}

/// Session-level commands produced by keyboard shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCommand {
    Undo,
    Redo,
    Save,
}

/// What a select-tool drag is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize(Corner),
    Rotate,
}

/// State of a pointer interaction.
#[derive(Debug, Clone, Default)]
pub enum Interaction {
    #[default]
    Idle,
    /// Moving, resizing or rotating. `originals` are the objects as they
    /// were on pointer-down; every move recomputes from them.
    Dragging {
        kind: DragKind,
        start: Point,
        originals: Vec<SceneObject>,
    },
    /// Rubber-band selection in canvas coordinates.
    Marquee {
        start: Point,
        current: Point,
        additive: bool,
    },
    /// Viewport drag; `last` is in screen coordinates.
    Panning { last: Point },
}

/// Tunables for the tool machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSettings {
    pub nudge_step: f64,
    pub nudge_step_large: f64,
    pub rotation_snap_degrees: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            rotation_snap_degrees: ROTATION_SNAP_DEGREES,
        }
    }
}

/// Everything a tool may touch while handling one input event.
pub struct ToolContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub selection: &'a mut SelectionController,
    pub viewport: &'a mut Viewport,
    /// Fixed design dimensions.
    pub canvas: Size,
}

/// Manages the current tool and its interaction state.
#[derive(Debug, Clone, Default)]
pub struct ToolMachine {
    tool: Tool,
    interaction: Interaction,
    pending_asset: Option<AssetRef>,
    settings: ToolSettings,
}

impl ToolMachine {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.interaction, Interaction::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.interaction, Interaction::Dragging { .. })
    }

    pub fn pending_asset(&self) -> Option<&AssetRef> {
        self.pending_asset.as_ref()
    }

    /// Current marquee rectangle in canvas coordinates, for preview.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self.interaction {
            Interaction::Marquee { start, current, .. } => Some(Rect::from_points(start, current)),
            _ => None,
        }
    }

    /// Switch tools unconditionally. An active drag is cancelled.
    pub fn set_tool(&mut self, ctx: &mut ToolContext<'_>, tool: Tool) {
        self.cancel(ctx);
        if tool != Tool::Image {
            self.pending_asset = None;
        }
        if self.tool != tool {
            log::debug!("Tool {:?} -> {:?}", self.tool, tool);
            self.tool = tool;
        }
    }

    /// Arm the image tool with an uploaded asset; the next click places it.
    pub fn arm_image(&mut self, ctx: &mut ToolContext<'_>, asset: AssetRef) {
        self.set_tool(ctx, Tool::Image);
        self.pending_asset = Some(asset);
    }

    /// Abort the current interaction. A drag restores the objects it moved.
    pub fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Dragging { originals, .. } => {
                for original in originals {
                    ctx.scene.restore_object(original);
                }
                ctx.scene.end_batch();
                log::debug!("Drag cancelled");
            }
            Interaction::Marquee { .. } | Interaction::Panning { .. } | Interaction::Idle => {}
        }
    }

    /// Insert a panel preset at its default position.
    pub fn place_preset(&mut self, ctx: &mut ToolContext<'_>, preset: Preset) -> ObjectId {
        self.place(ctx, preset.build_at(preset.default_position()))
    }

    /// Insert an uploaded image. Without a position it lands at the canvas
    /// origin.
    pub fn place_image(&mut self, ctx: &mut ToolContext<'_>, asset: &AssetRef, at: Option<Point>) -> ObjectId {
        let object = image_from_asset(asset, ctx.canvas.width, at.unwrap_or(Point::ZERO));
        self.place(ctx, object)
    }

    /// Add an object, select it and return to the select tool.
    fn place(&mut self, ctx: &mut ToolContext<'_>, object: SceneObject) -> ObjectId {
        self.cancel(ctx);
        let id = ctx.scene.insert(object).id().clone();
        ctx.selection.select(ctx.scene, std::slice::from_ref(&id));
        self.pending_asset = None;
        self.tool = Tool::Select;
        id
    }

    // --- pointer ----------------------------------------------------------

    pub fn handle_pointer(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) {
        match *event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => self.pointer_down(ctx, position, button, modifiers),
            PointerEvent::Move { position, modifiers } => self.pointer_move(ctx, position, modifiers),
            PointerEvent::Up { position, modifiers, .. } => {
                self.pointer_move(ctx, position, modifiers);
                self.pointer_up(ctx);
            }
            PointerEvent::Scroll {
                position,
                delta,
                modifiers,
            } => {
                if modifiers.command() {
                    let factor = if delta.y < 0.0 { WHEEL_ZOOM_FACTOR } else { 1.0 / WHEEL_ZOOM_FACTOR };
                    ctx.viewport.zoom_at(position, factor);
                } else {
                    ctx.viewport.pan(-delta);
                }
            }
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, screen: Point, button: MouseButton, modifiers: Modifiers) {
        // A down without a matching up; commit what we have.
        if !self.is_idle() {
            self.pointer_up(ctx);
        }

        if button == MouseButton::Middle || (button == MouseButton::Left && self.tool == Tool::Pan) {
            self.interaction = Interaction::Panning { last: screen };
            return;
        }
        if button != MouseButton::Left {
            return;
        }

        let point = ctx.viewport.screen_to_canvas(screen);
        match self.tool {
            Tool::Select => self.select_down(ctx, point, modifiers),
            Tool::Image => match self.pending_asset.take() {
                Some(asset) => {
                    self.place_image(ctx, &asset, Some(point));
                }
                None => log::debug!("Image tool has no asset to place"),
            },
            tool => {
                if let Some(preset) = tool.preset() {
                    self.place(ctx, preset.build_at(point));
                }
            }
        }
    }

    fn select_down(&mut self, ctx: &mut ToolContext<'_>, point: Point, modifiers: Modifiers) {
        let zoom = ctx.viewport.zoom;

        if let Some(single) = ctx.selection.single(ctx.scene).cloned() {
            if let Some(handle) = hit_test_handles(&single, point, HANDLE_HIT_TOLERANCE / zoom) {
                let kind = match handle {
                    HandleKind::Corner(corner) => DragKind::Resize(corner),
                    HandleKind::Rotate => DragKind::Rotate,
                };
                self.begin_drag(ctx, kind, point, vec![single]);
                return;
            }
        }

        let hit = ctx
            .scene
            .object_at(point, OBJECT_HIT_TOLERANCE / zoom)
            .map(|o| o.id().clone());
        match hit {
            Some(id) if modifiers.shift => ctx.selection.toggle(ctx.scene, &id),
            Some(id) => {
                if !ctx.selection.contains(&id) {
                    ctx.selection.select(ctx.scene, &[id]);
                }
                let originals = ctx
                    .selection
                    .ids()
                    .iter()
                    .filter_map(|id| ctx.scene.get(id))
                    .filter(|o| !o.is_locked())
                    .cloned()
                    .collect();
                self.begin_drag(ctx, DragKind::Move, point, originals);
            }
            None => {
                self.interaction = Interaction::Marquee {
                    start: point,
                    current: point,
                    additive: modifiers.shift,
                };
            }
        }
    }

    fn begin_drag(&mut self, ctx: &mut ToolContext<'_>, kind: DragKind, start: Point, originals: Vec<SceneObject>) {
        ctx.scene.begin_batch();
        self.interaction = Interaction::Dragging { kind, start, originals };
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, screen: Point, modifiers: Modifiers) {
        let point = ctx.viewport.screen_to_canvas(screen);
        match &mut self.interaction {
            Interaction::Idle => {}
            Interaction::Panning { last } => {
                ctx.viewport.pan(screen - *last);
                *last = screen;
            }
            Interaction::Marquee { current, .. } => *current = point,
            Interaction::Dragging { kind, start, originals } => {
                let delta = point - *start;
                let snap = modifiers.shift.then_some(self.settings.rotation_snap_degrees);
                for original in originals.iter() {
                    let patch = match *kind {
                        DragKind::Move => {
                            let base = original.base();
                            AttributePatch::new().with_position(base.left + delta.x, base.top + delta.y)
                        }
                        DragKind::Resize(corner) => resize_patch(original, corner, delta, modifiers.shift),
                        DragKind::Rotate => rotate_patch(original, point, snap),
                    };
                    ctx.scene.set_attributes(original.id(), &patch);
                }
            }
        }
    }

    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>) {
        match std::mem::take(&mut self.interaction) {
            Interaction::Dragging { .. } => ctx.scene.end_batch(),
            Interaction::Marquee {
                start,
                current,
                additive,
            } => {
                let extent = (current - start).hypot() * ctx.viewport.zoom;
                if extent < MARQUEE_MIN_EXTENT {
                    if !additive {
                        ctx.selection.clear();
                    }
                    return;
                }
                let previous = if additive { ctx.selection.ids().to_vec() } else { Vec::new() };
                ctx.selection
                    .select_in_rect(ctx.scene, Rect::from_points(start, current), ctx.canvas);
                for id in &previous {
                    ctx.selection.add(ctx.scene, id);
                }
            }
            Interaction::Panning { .. } | Interaction::Idle => {}
        }
    }

    // --- keyboard ---------------------------------------------------------

    /// Handle a key press. Undo, redo and save are returned for the session
    /// to carry out.
    pub fn handle_key(&mut self, ctx: &mut ToolContext<'_>, press: &KeyPress) -> Option<ToolCommand> {
        let action = ShortcutRegistry::resolve(press)?;
        if self.is_dragging() && !matches!(action, ShortcutAction::Cancel | ShortcutAction::SetTool(_)) {
            return None;
        }
        match action {
            ShortcutAction::SetTool(tool) => self.set_tool(ctx, tool),
            ShortcutAction::Delete => {
                ctx.selection.delete(ctx.scene);
            }
            ShortcutAction::Cancel => {
                if self.is_idle() {
                    ctx.selection.clear();
                } else {
                    self.cancel(ctx);
                }
            }
            ShortcutAction::SelectAll => ctx.selection.select_all(ctx.scene),
            ShortcutAction::Undo => return Some(ToolCommand::Undo),
            ShortcutAction::Redo => return Some(ToolCommand::Redo),
            ShortcutAction::Save => return Some(ToolCommand::Save),
            ShortcutAction::Nudge(dx, dy) => {
                let step = if press.modifiers.shift {
                    self.settings.nudge_step_large
                } else {
                    self.settings.nudge_step
                };
                ctx.selection
                    .move_by(ctx.scene, Vec2::new(f64::from(dx) * step, f64::from(dy) * step));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectKind;

    struct Harness {
        scene: SceneGraph,
        selection: SelectionController,
        viewport: Viewport,
        tools: ToolMachine,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scene: SceneGraph::new(),
                selection: SelectionController::new(),
                viewport: Viewport::default(),
                tools: ToolMachine::default(),
            }
        }

        fn pointer(&mut self, event: PointerEvent) {
            let mut ctx = ToolContext {
                scene: &mut self.scene,
                selection: &mut self.selection,
                viewport: &mut self.viewport,
                canvas: Size::new(1080.0, 1080.0),
            };
            self.tools.handle_pointer(&mut ctx, &event);
        }

        fn key(&mut self, press: KeyPress) -> Option<ToolCommand> {
            let mut ctx = ToolContext {
                scene: &mut self.scene,
                selection: &mut self.selection,
                viewport: &mut self.viewport,
                canvas: Size::new(1080.0, 1080.0),
            };
            self.tools.handle_key(&mut ctx, &press)
        }

        fn drag(&mut self, from: (f64, f64), to: (f64, f64)) {
            self.pointer(PointerEvent::down(from.0, from.1));
            self.pointer(PointerEvent::moved((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
            self.pointer(PointerEvent::moved(to.0, to.1));
            self.pointer(PointerEvent::up(to.0, to.1));
        }

        fn rect(&mut self, left: f64, top: f64) -> ObjectId {
            self.scene
                .add_object(ObjectKind::Rect, &AttributePatch::new().with_position(left, top))
                .id()
                .clone()
        }
    }

    #[test]
    fn test_shape_tool_places_and_returns_to_select() {
        let mut h = Harness::new();
        h.key(KeyPress::plain("r"));
        assert_eq!(h.tools.tool(), Tool::Rect);

        h.pointer(PointerEvent::down(300.0, 200.0));
        h.pointer(PointerEvent::up(300.0, 200.0));

        assert_eq!(h.tools.tool(), Tool::Select);
        assert_eq!(h.scene.len(), 1);
        let placed = h.scene.objects().next().unwrap();
        assert_eq!((placed.base().left, placed.base().top), (300.0, 200.0));
        assert_eq!(h.selection.ids(), &[placed.id().clone()]);
    }

    #[test]
    fn test_move_drag_is_one_event() {
        let mut h = Harness::new();
        let id = h.rect(100.0, 100.0);
        h.scene.take_events();

        h.drag((150.0, 150.0), (180.0, 170.0));

        let base = h.scene.get(&id).unwrap().base();
        assert_eq!((base.left, base.top), (130.0, 120.0));
        assert_eq!(h.scene.take_events().len(), 1);
        assert!(!h.scene.in_batch());
    }

    #[test]
    fn test_locked_object_is_not_dragged() {
        let mut h = Harness::new();
        let id = h.rect(100.0, 100.0);
        h.scene.set_attributes(&id, &AttributePatch::new().with_locked(true));

        h.drag((150.0, 150.0), (400.0, 400.0));

        assert_eq!(h.scene.get(&id).unwrap().base().left, 100.0);
        assert!(h.selection.is_empty());
    }

    #[test]
    fn test_marquee_and_click_to_clear() {
        let mut h = Harness::new();
        let a = h.rect(100.0, 100.0);
        let _far = h.rect(800.0, 800.0);

        h.drag((50.0, 50.0), (320.0, 320.0));
        assert_eq!(h.selection.ids(), &[a]);

        h.pointer(PointerEvent::down(600.0, 50.0));
        h.pointer(PointerEvent::up(601.0, 50.0));
        assert!(h.selection.is_empty());
    }

    #[test]
    fn test_shift_click_toggles() {
        let mut h = Harness::new();
        let a = h.rect(0.0, 0.0);
        let b = h.rect(500.0, 500.0);
        h.pointer(PointerEvent::down(10.0, 10.0));
        h.pointer(PointerEvent::up(10.0, 10.0));

        let shift_click = PointerEvent::down(510.0, 510.0).with_modifiers(Modifiers::SHIFT);
        h.pointer(shift_click);
        h.pointer(PointerEvent::up(510.0, 510.0).with_modifiers(Modifiers::SHIFT));
        assert_eq!(h.selection.ids(), &[a.clone(), b.clone()]);

        h.pointer(shift_click);
        assert_eq!(h.selection.ids(), &[a]);
    }

    #[test]
    fn test_pan_tool_only_moves_viewport() {
        let mut h = Harness::new();
        h.rect(0.0, 0.0);
        h.scene.take_events();
        h.key(KeyPress::plain("h"));

        h.drag((10.0, 10.0), (60.0, 30.0));
        assert_eq!(h.viewport.offset, Vec2::new(50.0, 20.0));
        assert!(h.scene.take_events().is_empty());
    }

    #[test]
    fn test_tool_switch_cancels_drag() {
        let mut h = Harness::new();
        let id = h.rect(100.0, 100.0);
        h.scene.take_events();

        h.pointer(PointerEvent::down(150.0, 150.0));
        h.pointer(PointerEvent::moved(300.0, 300.0));
        assert_eq!(h.scene.get(&id).unwrap().base().left, 250.0);

        h.key(KeyPress::plain("t"));
        assert_eq!(h.tools.tool(), Tool::Text);
        assert!(!h.scene.in_batch());
        assert_eq!(h.scene.get(&id).unwrap().base().left, 100.0);
    }

    #[test]
    fn test_corner_handle_resizes() {
        let mut h = Harness::new();
        let id = h.rect(100.0, 100.0);
        h.pointer(PointerEvent::down(150.0, 150.0));
        h.pointer(PointerEvent::up(150.0, 150.0));

        // Bottom-right corner of the 200x150 box.
        h.drag((300.0, 250.0), (500.0, 400.0));
        let base = h.scene.get(&id).unwrap().base();
        assert!((base.scale_x - 2.0).abs() < 1e-9);
        assert!((base.scale_y - 2.0).abs() < 1e-9);
        assert_eq!((base.left, base.top), (100.0, 100.0));
    }

    #[test]
    fn test_image_tool_needs_asset() {
        let mut h = Harness::new();
        h.key(KeyPress::plain("i"));
        h.pointer(PointerEvent::down(10.0, 10.0));
        assert!(h.scene.is_empty());

        let mut ctx = ToolContext {
            scene: &mut h.scene,
            selection: &mut h.selection,
            viewport: &mut h.viewport,
            canvas: Size::new(1080.0, 1080.0),
        };
        h.tools.arm_image(&mut ctx, AssetRef::new("/uploads/images/p.png", 1200.0, 600.0));
        h.pointer(PointerEvent::down(40.0, 40.0));

        let image = h.scene.objects().next().unwrap();
        assert_eq!(image.kind(), ObjectKind::Image);
        assert!((image.base().rendered_size().width - 300.0).abs() < 1e-9);
        assert_eq!(h.tools.tool(), Tool::Select);
    }

    #[test]
    fn test_zoomed_click_maps_to_canvas() {
        let mut h = Harness::new();
        h.viewport.set_zoom(2.0);
        h.key(KeyPress::plain("c"));
        h.pointer(PointerEvent::down(200.0, 100.0));
        let circle = h.scene.objects().next().unwrap();
        assert_eq!((circle.base().left, circle.base().top), (100.0, 50.0));
    }

    #[test]
    fn test_keys() {
        let mut h = Harness::new();
        let id = h.rect(0.0, 0.0);
        assert_eq!(h.key(KeyPress::new("z", Modifiers::CTRL)), Some(ToolCommand::Undo));
        assert_eq!(h.key(KeyPress::new("y", Modifiers::CTRL)), Some(ToolCommand::Redo));

        h.key(KeyPress::new("a", Modifiers::CTRL));
        assert_eq!(h.selection.ids(), &[id.clone()]);

        h.key(KeyPress::plain("ArrowRight"));
        h.key(KeyPress::new("ArrowDown", Modifiers::SHIFT));
        let base = h.scene.get(&id).unwrap().base();
        assert_eq!((base.left, base.top), (1.0, 10.0));

        h.key(KeyPress::plain("Escape"));
        assert!(h.selection.is_empty());

        h.key(KeyPress::new("a", Modifiers::CTRL));
        h.key(KeyPress::plain("Delete"));
        assert!(h.scene.is_empty());
    }
}
