//! The scene graph: the ordered set of objects composing one design.
//!
//! Every mutation is recorded as a [`SceneChange`]. Changes are published as
//! one [`SceneEvent`] per logical action: a lone mutation flushes at once,
//! while mutations inside [`SceneGraph::begin_batch`]/[`SceneGraph::end_batch`]
//! are coalesced into a single event when the outermost batch closes.

use crate::color::Color;
use crate::objects::{AttributePatch, ObjectId, ObjectKind, SceneObject};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Current payload format version.
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Scene errors.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The payload is not an array of object records, names an unknown
    /// kind, or carries a field of the wrong type.
    #[error("malformed scene data: {0}")]
    Malformed(String),
    #[error("scene encoding failed: {0}")]
    Encode(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Complete serialized form of a scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePayload {
    pub version: u32,
    pub background: Color,
    /// Objects back to front.
    pub objects: Vec<SceneObject>,
}

impl Default for ScenePayload {
    fn default() -> Self {
        Self {
            version: SCENE_FORMAT_VERSION,
            background: Color::WHITE,
            objects: Vec::new(),
        }
    }
}

impl ScenePayload {
    pub fn to_value(&self) -> SceneResult<Value> {
        serde_json::to_value(self).map_err(|e| SceneError::Encode(e.to_string()))
    }

    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string(self).map_err(|e| SceneError::Encode(e.to_string()))
    }

    /// Parse a stored payload.
    ///
    /// Accepts `{ "objects": [...] }` (with optional `version` and
    /// `background`), a bare array of object records, or either of those
    /// encoded as a JSON string. Missing attributes take the defaults of
    /// the record's kind.
    pub fn from_value(value: &Value) -> SceneResult<Self> {
        match value {
            Value::String(raw) => {
                let inner: Value = serde_json::from_str(raw)
                    .map_err(|e| SceneError::Malformed(format!("payload is not JSON: {e}")))?;
                if inner.is_string() {
                    return Err(SceneError::Malformed("doubly encoded payload".to_string()));
                }
                Self::from_value(&inner)
            }
            Value::Array(records) => Ok(Self {
                objects: parse_records(records)?,
                ..Self::default()
            }),
            Value::Object(map) => {
                let records = map
                    .get("objects")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        SceneError::Malformed("expected an array of object records".to_string())
                    })?;
                let version = match map.get("version") {
                    None | Some(Value::Null) => SCENE_FORMAT_VERSION,
                    Some(v) => v
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .unwrap_or_else(|| {
                            log::warn!("Unrecognised scene version {v}, reading as current");
                            SCENE_FORMAT_VERSION
                        }),
                };
                let background = match map.get("background") {
                    Some(Value::String(s)) => s.parse().map_err(|e| {
                        SceneError::Malformed(format!("invalid background: {e}"))
                    })?,
                    _ => Color::WHITE,
                };
                Ok(Self {
                    version,
                    background,
                    objects: parse_records(records)?,
                })
            }
            _ => Err(SceneError::Malformed(
                "expected an array of object records".to_string(),
            )),
        }
    }

    pub fn from_json(json: &str) -> SceneResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SceneError::Malformed(format!("payload is not JSON: {e}")))?;
        Self::from_value(&value)
    }
}

/// Parse object records, filling defaults per kind and regenerating
/// duplicate ids.
fn parse_records(records: &[Value]) -> SceneResult<Vec<SceneObject>> {
    let mut seen = HashSet::new();
    let mut objects = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(SceneError::Malformed(format!("record {index} is not an object")));
        };

        let kind_name = fields
            .get("kind")
            .or_else(|| fields.get("type"))
            .and_then(Value::as_str)
            .ok_or_else(|| SceneError::Malformed(format!("record {index} has no kind")))?;
        let kind = ObjectKind::from_name(kind_name).ok_or_else(|| {
            SceneError::Malformed(format!("record {index} has unknown kind {kind_name:?}"))
        })?;

        let mut merged = default_record(kind)?;
        for (key, value) in fields {
            if key == "type" || key == "kind" || value.is_null() {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
        merged.insert("kind".to_string(), Value::String(kind.as_str().to_string()));

        let mut object: SceneObject = serde_json::from_value(Value::Object(merged))
            .map_err(|e| SceneError::Malformed(format!("record {index}: {e}")))?;

        if !seen.insert(object.id().clone()) {
            let fresh = ObjectId::new();
            log::warn!("Duplicate object id {} in scene data, assigned {}", object.id(), fresh);
            object.base_mut().id = fresh.clone();
            seen.insert(fresh);
        }
        objects.push(object);
    }

    Ok(objects)
}

fn default_record(kind: ObjectKind) -> SceneResult<Map<String, Value>> {
    match serde_json::to_value(SceneObject::with_kind(kind)) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SceneError::Encode("object did not encode as a map".to_string())),
        Err(e) => Err(SceneError::Encode(e.to_string())),
    }
}

/// Where a scene event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A user action through the editing API.
    User,
    /// An undo or redo restoring a snapshot.
    History,
    /// Content replaced by loading a design.
    Load,
}

/// One primitive change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneChange {
    Added(ObjectId),
    Removed(ObjectId),
    Updated(ObjectId),
    Reordered(ObjectId),
    BackgroundChanged,
    /// The whole content was replaced.
    Replaced,
}

/// All changes made by one logical action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneEvent {
    pub origin: ChangeOrigin,
    pub changes: Vec<SceneChange>,
}

/// Direction of a one-step z-order move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZDirection {
    Forward,
    Backward,
}

/// The ordered collection of objects composing one design.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    objects: HashMap<ObjectId, SceneObject>,
    /// Back to front.
    z_order: Vec<ObjectId>,
    background: Color,
    batch_depth: usize,
    pending: Vec<SceneChange>,
    events: Vec<SceneEvent>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            z_order: Vec::new(),
            background: Color::WHITE,
            batch_depth: 0,
            pending: Vec::new(),
            events: Vec::new(),
        }
    }

    // --- events -----------------------------------------------------------

    fn record(&mut self, change: SceneChange) {
        if !self.pending.contains(&change) {
            self.pending.push(change);
        }
        if self.batch_depth == 0 {
            self.flush(ChangeOrigin::User);
        }
    }

    fn flush(&mut self, origin: ChangeOrigin) {
        if !self.pending.is_empty() {
            let changes = std::mem::take(&mut self.pending);
            self.events.push(SceneEvent { origin, changes });
        }
    }

    /// Open a batch. Batches nest; only the outermost close publishes.
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch, publishing one event if anything changed.
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            log::warn!("end_batch called without a matching begin_batch");
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.flush(ChangeOrigin::User);
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Run `f` as one logical action.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_batch();
        let result = f(self);
        self.end_batch();
        result
    }

    /// Drain published events.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    // --- mutations ------------------------------------------------------

    /// Create an object of `kind` from its defaults merged with `initial`,
    /// placed topmost. Returns the new object.
    pub fn add_object(&mut self, kind: ObjectKind, initial: &AttributePatch) -> &SceneObject {
        let mut object = SceneObject::with_kind(kind);
        object.apply(initial);
        self.insert(object)
    }

    /// Insert a prepared object topmost. Its id is replaced if it collides
    /// with an existing one.
    pub fn insert(&mut self, mut object: SceneObject) -> &SceneObject {
        if self.objects.contains_key(object.id()) {
            object.base_mut().id = ObjectId::new();
        }
        let id = object.id().clone();
        self.z_order.push(id.clone());
        self.objects.insert(id.clone(), object);
        self.record(SceneChange::Added(id.clone()));
        &self.objects[&id]
    }

    /// Remove an object. Returns it if it was present.
    pub fn remove_object(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let removed = self.objects.remove(id)?;
        self.z_order.retain(|other| other != id);
        self.record(SceneChange::Removed(id.clone()));
        Some(removed)
    }

    /// Merge attributes into an object. Returns `true` if it changed;
    /// unknown ids and no-op patches publish nothing.
    pub fn set_attributes(&mut self, id: &ObjectId, patch: &AttributePatch) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        if object.apply(patch) {
            self.record(SceneChange::Updated(id.clone()));
            true
        } else {
            false
        }
    }

    /// Overwrite an existing object with a saved copy of itself, keeping
    /// its z position. Returns `true` if it changed.
    pub fn restore_object(&mut self, object: SceneObject) -> bool {
        let id = object.id().clone();
        match self.objects.get_mut(&id) {
            Some(current) if *current != object => {
                *current = object;
                self.record(SceneChange::Updated(id));
                true
            }
            _ => false,
        }
    }

    /// Move an object one step. Returns `false` at either end.
    pub fn reorder(&mut self, id: &ObjectId, direction: ZDirection) -> bool {
        let Some(pos) = self.position_of(id) else {
            return false;
        };
        let target = match direction {
            ZDirection::Forward if pos + 1 < self.z_order.len() => pos + 1,
            ZDirection::Backward if pos > 0 => pos - 1,
            _ => return false,
        };
        self.z_order.swap(pos, target);
        self.record(SceneChange::Reordered(id.clone()));
        true
    }

    pub fn bring_to_front(&mut self, id: &ObjectId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos + 1 < self.z_order.len() => {
                let id = self.z_order.remove(pos);
                self.z_order.push(id.clone());
                self.record(SceneChange::Reordered(id));
                true
            }
            _ => false,
        }
    }

    pub fn send_to_back(&mut self, id: &ObjectId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos > 0 => {
                let id = self.z_order.remove(pos);
                self.z_order.insert(0, id.clone());
                self.record(SceneChange::Reordered(id));
                true
            }
            _ => false,
        }
    }

    pub fn set_background(&mut self, color: Color) {
        if self.background != color {
            self.background = color;
            self.record(SceneChange::BackgroundChanged);
        }
    }

    // --- serialization --------------------------------------------------

    /// Complete, order-preserving copy of the content.
    pub fn serialize(&self) -> ScenePayload {
        ScenePayload {
            version: SCENE_FORMAT_VERSION,
            background: self.background,
            objects: self.objects().cloned().collect(),
        }
    }

    /// Replace the content from a stored payload. On error the scene is
    /// left untouched.
    pub fn deserialize(&mut self, value: &Value) -> SceneResult<()> {
        let payload = ScenePayload::from_value(value)?;
        self.replace(&payload, ChangeOrigin::Load);
        Ok(())
    }

    /// Replace the content with a payload, publishing one `Replaced` event
    /// with the given origin.
    pub fn replace(&mut self, payload: &ScenePayload, origin: ChangeOrigin) {
        // Anything still pending belongs to the previous action.
        self.flush(ChangeOrigin::User);
        self.objects.clear();
        self.z_order.clear();
        for object in &payload.objects {
            let mut object = object.clone();
            if self.objects.contains_key(object.id()) {
                object.base_mut().id = ObjectId::new();
            }
            self.z_order.push(object.id().clone());
            self.objects.insert(object.id().clone(), object);
        }
        self.background = payload.background;
        self.events.push(SceneEvent {
            origin,
            changes: vec![SceneChange::Replaced],
        });
    }

    /// Remove everything, publishing a `Replaced` event.
    pub fn clear(&mut self, origin: ChangeOrigin) {
        self.replace(&ScenePayload::default(), origin);
    }

    // --- queries --------------------------------------------------------

    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Objects back to front.
    pub fn objects(&self) -> impl DoubleEndedIterator<Item = &SceneObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Ids back to front.
    pub fn ids_in_order(&self) -> &[ObjectId] {
        &self.z_order
    }

    /// Z position (0 = back).
    pub fn position_of(&self, id: &ObjectId) -> Option<usize> {
        self.z_order.iter().position(|other| other == id)
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Topmost visible, unlocked object under a point.
    pub fn object_at(&self, point: Point, tolerance: f64) -> Option<&SceneObject> {
        self.objects()
            .rev()
            .find(|o| o.is_visible() && !o.is_locked() && o.hit_test(point, tolerance))
    }

    /// Visible, unlocked objects intersecting a rectangle, back to front.
    pub fn objects_in_rect(&self, rect: Rect) -> Vec<ObjectId> {
        self.objects()
            .filter(|o| o.is_visible() && !o.is_locked() && o.intersects_rect(rect))
            .map(|o| o.id().clone())
            .collect()
    }
}
