//! Active selection, transform handles and the operations that edit the
//! selected objects.
//!
//! Every operation on [`SelectionController`] runs as one scene batch, so a
//! logical action publishes at most one scene event. Locked objects are
//! never selected and never transformed.

use crate::objects::{AttributePatch, ObjectId, SceneObject, normalize_angle, rotate_vec};
use crate::scene::SceneGraph;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 10.0;
/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;
/// Distance from the box's top edge to the rotation handle (canvas units).
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Smallest rendered box edge produced by a resize.
pub const MIN_RESIZE_EDGE: f64 = 1.0;
/// Default rotation snapping step in degrees.
pub const ROTATION_SNAP_DEGREES: f64 = 15.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Unit signs of this corner relative to the box center.
    fn signs(self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomLeft => (-1.0, 1.0),
            Corner::BottomRight => (1.0, 1.0),
        }
    }
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Rotate,
}

/// A selection handle with its canvas position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// `tolerance` should already be divided by the viewport zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Corner handles plus a rotation handle above the top-center, all
/// rotated with the object.
pub fn get_handles(object: &SceneObject) -> Vec<Handle> {
    let base = object.base();
    let size = base.rendered_size();
    let center = base.center();
    let radians = base.angle.to_radians();
    let at = |dx: f64, dy: f64| center + rotate_vec(Vec2::new(dx, dy), radians);
    let (hw, hh) = (size.width / 2.0, size.height / 2.0);

    vec![
        Handle::new(at(-hw, -hh), HandleKind::Corner(Corner::TopLeft)),
        Handle::new(at(hw, -hh), HandleKind::Corner(Corner::TopRight)),
        Handle::new(at(-hw, hh), HandleKind::Corner(Corner::BottomLeft)),
        Handle::new(at(hw, hh), HandleKind::Corner(Corner::BottomRight)),
        Handle::new(at(0.0, -hh - ROTATE_HANDLE_OFFSET), HandleKind::Rotate),
    ]
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(object: &SceneObject, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(object)
        .into_iter()
        .find(|h| h.hit_test(point, tolerance))
        .map(|h| h.kind)
}

/// Patch resizing `original` by dragging `corner` by `delta` (canvas units).
///
/// The opposite corner stays fixed in canvas space, rotation included.
/// The new size goes into the scale factors, never width/height, so text
/// keeps its font size. With `keep_aspect_ratio` the larger relative change
/// wins on both axes.
pub fn resize_patch(
    original: &SceneObject,
    corner: Corner,
    delta: Vec2,
    keep_aspect_ratio: bool,
) -> AttributePatch {
    let base = original.base();
    let size = base.rendered_size();
    let radians = base.angle.to_radians();
    let (sx, sy) = corner.signs();
    let local = rotate_vec(delta, -radians);

    let can_x = base.width > f64::EPSILON;
    let can_y = base.height > f64::EPSILON;
    let mut new_w = if can_x { (size.width + sx * local.x).max(MIN_RESIZE_EDGE) } else { size.width };
    let mut new_h = if can_y { (size.height + sy * local.y).max(MIN_RESIZE_EDGE) } else { size.height };

    if keep_aspect_ratio && can_x && can_y && size.width > 0.0 && size.height > 0.0 {
        let factor = (new_w / size.width).max(new_h / size.height);
        new_w = (size.width * factor).max(MIN_RESIZE_EDGE);
        new_h = (size.height * factor).max(MIN_RESIZE_EDGE);
    }

    let anchor = base.center() + rotate_vec(Vec2::new(-sx * size.width / 2.0, -sy * size.height / 2.0), radians);
    let new_center = anchor + rotate_vec(Vec2::new(sx * new_w / 2.0, sy * new_h / 2.0), radians);

    let mut patch = AttributePatch::new().with_position(new_center.x - new_w / 2.0, new_center.y - new_h / 2.0);
    if can_x {
        patch.scale_x = Some(new_w / base.width);
    }
    if can_y {
        patch.scale_y = Some(new_h / base.height);
    }
    patch
}

/// Patch rotating `original` so its rotation handle points at `cursor`,
/// optionally snapped to multiples of `snap_degrees`.
pub fn rotate_patch(original: &SceneObject, cursor: Point, snap_degrees: Option<f64>) -> AttributePatch {
    let center = original.base().center();
    let d = cursor - center;
    // 0° has the handle straight up.
    let mut degrees = d.y.atan2(d.x).to_degrees() + 90.0;
    if let Some(step) = snap_degrees.filter(|s| *s > 0.0) {
        degrees = (degrees / step).round() * step;
    }
    AttributePatch::new().with_angle(normalize_angle(degrees))
}

/// Which box dimension a property-panel size edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

/// The set of active object ids, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionController {
    ids: Vec<ObjectId>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    /// First selected object.
    pub fn primary<'a>(&self, scene: &'a SceneGraph) -> Option<&'a SceneObject> {
        self.ids.first().and_then(|id| scene.get(id))
    }

    /// The single selected object, if exactly one is selected.
    pub fn single<'a>(&self, scene: &'a SceneGraph) -> Option<&'a SceneObject> {
        if self.ids.len() == 1 { self.primary(scene) } else { None }
    }

    /// Union of the selected objects' bounds.
    pub fn bounds(&self, scene: &SceneGraph) -> Option<Rect> {
        self.ids
            .iter()
            .filter_map(|id| scene.get(id))
            .map(SceneObject::bounds)
            .reduce(|a, b| a.union(b))
    }

    fn selectable(scene: &SceneGraph, id: &ObjectId) -> bool {
        scene.get(id).is_some_and(|o| !o.is_locked())
    }

    /// Replace the selection, keeping only existing unlocked ids.
    pub fn select(&mut self, scene: &SceneGraph, ids: &[ObjectId]) {
        self.ids.clear();
        for id in ids {
            if Self::selectable(scene, id) && !self.ids.contains(id) {
                self.ids.push(id.clone());
            }
        }
    }

    pub fn add(&mut self, scene: &SceneGraph, id: &ObjectId) {
        if Self::selectable(scene, id) && !self.ids.contains(id) {
            self.ids.push(id.clone());
        }
    }

    /// Shift-click behaviour.
    pub fn toggle(&mut self, scene: &SceneGraph, id: &ObjectId) {
        if self.contains(id) {
            self.ids.retain(|other| other != id);
        } else {
            self.add(scene, id);
        }
    }

    pub fn remove(&mut self, id: &ObjectId) {
        self.ids.retain(|other| other != id);
    }

    pub fn select_all(&mut self, scene: &SceneGraph) {
        let ids: Vec<ObjectId> = scene
            .objects()
            .filter(|o| o.is_visible())
            .map(|o| o.id().clone())
            .collect();
        self.select(scene, &ids);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Take the selection out, leaving it empty.
    pub fn take(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.ids)
    }

    /// Put back a selection taken earlier, dropping ids that no longer
    /// qualify.
    pub fn restore(&mut self, scene: &SceneGraph, ids: Vec<ObjectId>) {
        self.select(scene, &ids);
    }

    /// Drop ids that were removed or locked since they were selected.
    pub fn retain_valid(&mut self, scene: &SceneGraph) {
        self.ids.retain(|id| Self::selectable(scene, id));
    }

    /// Marquee selection. The rectangle is clamped to the canvas; visible,
    /// unlocked objects intersecting it are selected.
    pub fn select_in_rect(&mut self, scene: &SceneGraph, rect: Rect, canvas: Size) {
        let clamped = rect.abs().intersect(Rect::from_origin_size(Point::ZERO, canvas));
        let hits = if clamped.area() > 0.0 || clamped.width() > 0.0 || clamped.height() > 0.0 {
            scene.objects_in_rect(clamped)
        } else {
            Vec::new()
        };
        self.select(scene, &hits);
    }

    /// Ids of selected objects that may be transformed right now.
    fn editable(&self, scene: &SceneGraph) -> Vec<ObjectId> {
        self.ids
            .iter()
            .filter(|id| Self::selectable(scene, id))
            .cloned()
            .collect()
    }

    /// Translate every selected object.
    pub fn move_by(&self, scene: &mut SceneGraph, delta: Vec2) {
        let ids = self.editable(scene);
        scene.batch(|scene| {
            for id in &ids {
                if let Some(base) = scene.get(id).map(|o| o.base().clone()) {
                    scene.set_attributes(
                        id,
                        &AttributePatch::new().with_position(base.left + delta.x, base.top + delta.y),
                    );
                }
            }
        });
    }

    /// Corner-handle resize of every selected object by `delta`.
    pub fn resize(&self, scene: &mut SceneGraph, corner: Corner, delta: Vec2, keep_aspect_ratio: bool) {
        let ids = self.editable(scene);
        scene.batch(|scene| {
            for id in &ids {
                if let Some(patch) = scene.get(id).map(|o| resize_patch(o, corner, delta, keep_aspect_ratio)) {
                    scene.set_attributes(id, &patch);
                }
            }
        });
    }

    /// Rotate every selected object about its own center by `degrees`.
    pub fn rotate(&self, scene: &mut SceneGraph, degrees: f64) {
        let ids = self.editable(scene);
        scene.batch(|scene| {
            for id in &ids {
                if let Some(angle) = scene.get(id).map(|o| o.base().angle) {
                    scene.set_attributes(id, &AttributePatch::new().with_angle(angle + degrees));
                }
            }
        });
    }

    /// Set the rendered width or height of every selected object through
    /// its scale factor.
    pub fn set_size(&self, scene: &mut SceneGraph, dimension: Dimension, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            return;
        }
        let ids = self.editable(scene);
        scene.batch(|scene| {
            for id in &ids {
                let Some(base) = scene.get(id).map(|o| o.base().clone()) else {
                    continue;
                };
                let patch = match dimension {
                    Dimension::Width if base.width > f64::EPSILON => AttributePatch {
                        scale_x: Some(value / base.width),
                        ..AttributePatch::default()
                    },
                    Dimension::Height if base.height > f64::EPSILON => AttributePatch {
                        scale_y: Some(value / base.height),
                        ..AttributePatch::default()
                    },
                    _ => continue,
                };
                scene.set_attributes(id, &patch);
            }
        });
    }

    /// Opacity as a percentage (0..=100).
    pub fn set_opacity_percent(&self, scene: &mut SceneGraph, percent: f64) {
        self.apply_style(scene, &AttributePatch::new().with_opacity(percent.clamp(0.0, 100.0) / 100.0));
    }

    /// Apply paint/typography attributes to every selected object.
    /// Attributes that do not apply to an object's kind are ignored.
    pub fn apply_style(&self, scene: &mut SceneGraph, patch: &AttributePatch) {
        let style = patch.style_only();
        if style.is_empty() {
            return;
        }
        let ids = self.editable(scene);
        scene.batch(|scene| {
            for id in &ids {
                scene.set_attributes(id, &style);
            }
        });
    }

    /// Remove every selected object and clear the selection.
    pub fn delete(&mut self, scene: &mut SceneGraph) -> usize {
        let ids = self.editable(scene);
        let removed = scene.batch(|scene| ids.iter().filter(|id| scene.remove_object(id).is_some()).count());
        self.ids.clear();
        removed
    }

    /// Flip the lock flag. Locking removes the object from the selection.
    /// Returns the new state, or `None` for an unknown id.
    pub fn toggle_lock(&mut self, scene: &mut SceneGraph, id: &ObjectId) -> Option<bool> {
        let locked = !scene.get(id)?.is_locked();
        scene.set_attributes(id, &AttributePatch::new().with_locked(locked));
        if locked {
            self.remove(id);
        }
        Some(locked)
    }

    /// Flip the visibility flag. Hiding removes the object from the
    /// selection. Returns the new state, or `None` for an unknown id.
    pub fn toggle_visibility(&mut self, scene: &mut SceneGraph, id: &ObjectId) -> Option<bool> {
        let visible = !scene.get(id)?.is_visible();
        scene.set_attributes(id, &AttributePatch::new().with_visible(visible));
        if !visible {
            self.remove(id);
        }
        Some(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::objects::ObjectKind;
    use crate::scene::SceneChange;

    fn rect(scene: &mut SceneGraph, left: f64, top: f64) -> ObjectId {
        scene
            .add_object(ObjectKind::Rect, &AttributePatch::new().with_position(left, top))
            .id()
            .clone()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_select_filters_locked_and_missing() {
        let mut scene = SceneGraph::new();
        let a = rect(&mut scene, 0.0, 0.0);
        let b = rect(&mut scene, 0.0, 0.0);
        scene.set_attributes(&b, &AttributePatch::new().with_locked(true));

        let mut selection = SelectionController::new();
        selection.select(&scene, &[a.clone(), b, ObjectId::from("ghost")]);
        assert_eq!(selection.ids(), &[a]);

        selection.select(&scene, &[]);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_move_is_one_event() {
        let mut scene = SceneGraph::new();
        let a = rect(&mut scene, 0.0, 0.0);
        let b = rect(&mut scene, 50.0, 50.0);
        let mut selection = SelectionController::new();
        selection.select(&scene, &[a.clone(), b.clone()]);
        scene.take_events();

        selection.move_by(&mut scene, Vec2::new(10.0, -5.0));
        let events = scene.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].changes.len(), 2);
        assert_eq!(scene.get(&b).unwrap().base().left, 60.0);
        assert_eq!(scene.get(&a).unwrap().base().top, -5.0);
    }

    #[test]
    fn test_resize_bottom_right_changes_scale() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 100.0, 100.0);
        let object = scene.get(&id).unwrap();
        let patch = resize_patch(object, Corner::BottomRight, Vec2::new(200.0, 150.0), false);
        assert_eq!(patch.left, Some(100.0));
        assert_eq!(patch.top, Some(100.0));
        assert!(close(patch.scale_x.unwrap(), 2.0));
        assert!(close(patch.scale_y.unwrap(), 2.0));
        assert!(patch.width.is_none());
    }

    #[test]
    fn test_resize_top_left_keeps_opposite_corner() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 100.0, 100.0);
        scene.set_attributes(&id, &AttributePatch::new().with_angle(30.0));
        let before = scene.get(&id).unwrap().base().corners()[2];

        let mut selection = SelectionController::new();
        selection.select(&scene, &[id.clone()]);
        selection.resize(&mut scene, Corner::TopLeft, Vec2::new(-40.0, -25.0), false);

        let after = scene.get(&id).unwrap().base().corners()[2];
        assert!((after - before).hypot() < 1e-6);
    }

    #[test]
    fn test_resize_enforces_minimum_and_aspect() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 0.0, 0.0);
        let object = scene.get(&id).unwrap();

        let shrunk = resize_patch(object, Corner::BottomRight, Vec2::new(-500.0, -500.0), false);
        assert!(close(shrunk.scale_x.unwrap() * 200.0, MIN_RESIZE_EDGE));

        let uniform = resize_patch(object, Corner::BottomRight, Vec2::new(200.0, 0.0), true);
        assert!(close(uniform.scale_x.unwrap(), uniform.scale_y.unwrap()));
        assert!(close(uniform.scale_x.unwrap(), 2.0));
    }

    #[test]
    fn test_text_resize_keeps_font_size() {
        let mut scene = SceneGraph::new();
        let id = scene
            .add_object(ObjectKind::Text, &AttributePatch::new().with_font_size(32.0))
            .id()
            .clone();
        let mut selection = SelectionController::new();
        selection.select(&scene, &[id.clone()]);
        selection.resize(&mut scene, Corner::BottomRight, Vec2::new(50.0, 50.0), false);

        let text = scene.get(&id).unwrap();
        assert_eq!(text.as_text().unwrap().font_size, 32.0);
        assert!(text.base().scale_x > 1.0);
    }

    #[test]
    fn test_rotate_patch_snaps() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 0.0, 0.0);
        let object = scene.get(&id).unwrap();
        let center = object.base().center();

        let right = rotate_patch(object, center + Vec2::new(100.0, 3.0), Some(ROTATION_SNAP_DEGREES));
        assert_eq!(right.angle, Some(90.0));
        let up = rotate_patch(object, center + Vec2::new(0.0, -100.0), None);
        assert!(close(up.angle.unwrap(), 0.0));
    }

    #[test]
    fn test_apply_style_ignores_geometry() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 5.0, 5.0);
        let mut selection = SelectionController::new();
        selection.select(&scene, &[id.clone()]);

        selection.apply_style(
            &mut scene,
            &AttributePatch::new().with_fill(Color::WHITE).with_position(99.0, 99.0),
        );
        let base = scene.get(&id).unwrap().base();
        assert_eq!(base.fill, Color::WHITE);
        assert_eq!(base.left, 5.0);
    }

    #[test]
    fn test_set_size_and_opacity() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 0.0, 0.0);
        let mut selection = SelectionController::new();
        selection.select(&scene, &[id.clone()]);

        selection.set_size(&mut scene, Dimension::Width, 400.0);
        selection.set_opacity_percent(&mut scene, 40.0);
        let base = scene.get(&id).unwrap().base();
        assert!(close(base.rendered_size().width, 400.0));
        assert_eq!(base.width, 200.0);
        assert!(close(base.opacity, 0.4));
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut scene = SceneGraph::new();
        let a = rect(&mut scene, 0.0, 0.0);
        let b = rect(&mut scene, 0.0, 0.0);
        let mut selection = SelectionController::new();
        selection.select(&scene, &[a.clone(), b.clone()]);
        scene.take_events();

        assert_eq!(selection.delete(&mut scene), 2);
        assert!(selection.is_empty());
        assert!(scene.is_empty());
        let events = scene.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].changes, vec![SceneChange::Removed(a), SceneChange::Removed(b)]);
    }

    #[test]
    fn test_lock_removes_from_selection_and_blocks_transform() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 0.0, 0.0);
        let mut selection = SelectionController::new();
        selection.select(&scene, &[id.clone()]);

        assert_eq!(selection.toggle_lock(&mut scene, &id), Some(true));
        assert!(selection.is_empty());

        // A stale controller still naming the locked id must not move it.
        let stale = SelectionController { ids: vec![id.clone()] };
        stale.move_by(&mut scene, Vec2::new(10.0, 10.0));
        assert_eq!(scene.get(&id).unwrap().base().left, 0.0);
    }

    #[test]
    fn test_marquee_is_clamped_and_skips_locked() {
        let mut scene = SceneGraph::new();
        let inside = rect(&mut scene, 100.0, 100.0);
        let locked = rect(&mut scene, 100.0, 100.0);
        let outside = rect(&mut scene, 2000.0, 2000.0);
        scene.set_attributes(&locked, &AttributePatch::new().with_locked(true));

        let mut selection = SelectionController::new();
        selection.select_in_rect(&scene, Rect::new(-50.0, -50.0, 5000.0, 5000.0), Size::new(1080.0, 1080.0));
        assert_eq!(selection.ids(), &[inside]);
        assert!(!selection.contains(&outside));
    }

    #[test]
    fn test_handles_follow_rotation() {
        let mut scene = SceneGraph::new();
        let id = rect(&mut scene, 0.0, 0.0);
        scene.set_attributes(&id, &AttributePatch::new().with_angle(90.0));
        let object = scene.get(&id).unwrap();
        let center = object.base().center();

        let rotate = get_handles(object)
            .into_iter()
            .find(|h| h.kind == HandleKind::Rotate)
            .unwrap();
        // Quarter turn moves the handle from above the box to its right.
        assert!(close(rotate.position.y, center.y));
        assert!(rotate.position.x > center.x);
        assert_eq!(
            hit_test_handles(object, rotate.position, HANDLE_HIT_TOLERANCE),
            Some(HandleKind::Rotate)
        );
    }
}
