//! Layer panel projection of the scene graph.

use crate::objects::{ObjectId, ObjectKind};
use crate::scene::{SceneGraph, ZDirection};
use crate::selection::SelectionController;
use serde::{Deserialize, Serialize};

/// One row of the layer panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRow {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub visible: bool,
    pub locked: bool,
    /// Position in the stacking order, 0 = back.
    pub z_index: usize,
    pub selected: bool,
}

/// Actions available on a layer row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerCommand {
    Select(ObjectId),
    Forward(ObjectId),
    Backward(ObjectId),
    ToggleVisibility(ObjectId),
    ToggleLock(ObjectId),
    Delete(ObjectId),
}

/// Read-only list of layers, front first. Rebuilt after every scene event.
#[derive(Debug, Clone, Default)]
pub struct LayerView {
    rows: Vec<LayerRow>,
}

impl LayerView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[LayerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: &ObjectId) -> Option<&LayerRow> {
        self.rows.iter().find(|row| &row.id == id)
    }

    pub fn refresh(&mut self, scene: &SceneGraph, selection: &SelectionController) {
        self.rows = scene
            .ids_in_order()
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(z_index, id)| scene.get(id).map(|object| (z_index, object)))
            .map(|(z_index, object)| LayerRow {
                id: object.id().clone(),
                name: object.name().to_string(),
                kind: object.kind(),
                visible: object.is_visible(),
                locked: object.is_locked(),
                z_index,
                selected: selection.contains(object.id()),
            })
            .collect();
    }

    /// Carry out a row action through the scene graph and selection.
    pub fn apply(command: &LayerCommand, scene: &mut SceneGraph, selection: &mut SelectionController) {
        match command {
            LayerCommand::Select(id) => selection.select(scene, std::slice::from_ref(id)),
            LayerCommand::Forward(id) => {
                scene.reorder(id, ZDirection::Forward);
            }
            LayerCommand::Backward(id) => {
                scene.reorder(id, ZDirection::Backward);
            }
            LayerCommand::ToggleVisibility(id) => {
                selection.toggle_visibility(scene, id);
            }
            LayerCommand::ToggleLock(id) => {
                selection.toggle_lock(scene, id);
            }
            LayerCommand::Delete(id) => {
                if scene.remove_object(id).is_some() {
                    selection.remove(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::AttributePatch;

    #[test]
    fn test_rows_are_front_first() {
        let mut scene = SceneGraph::new();
        let back = scene.add_object(ObjectKind::Rect, &AttributePatch::new()).id().clone();
        let front = scene.add_object(ObjectKind::Text, &AttributePatch::new()).id().clone();
        let mut selection = SelectionController::new();
        selection.select(&scene, std::slice::from_ref(&back));

        let mut layers = LayerView::new();
        layers.refresh(&scene, &selection);
        assert_eq!(layers.rows()[0].id, front);
        assert_eq!(layers.rows()[0].z_index, 1);
        assert_eq!(layers.rows()[1].name, "Rect");
        assert!(layers.rows()[1].selected);
    }

    #[test]
    fn test_commands_delegate() {
        let mut scene = SceneGraph::new();
        let a = scene.add_object(ObjectKind::Rect, &AttributePatch::new()).id().clone();
        let b = scene.add_object(ObjectKind::Rect, &AttributePatch::new()).id().clone();
        let mut selection = SelectionController::new();

        LayerView::apply(&LayerCommand::Forward(a.clone()), &mut scene, &mut selection);
        assert_eq!(scene.ids_in_order(), &[b.clone(), a.clone()]);

        LayerView::apply(&LayerCommand::Select(a.clone()), &mut scene, &mut selection);
        LayerView::apply(&LayerCommand::ToggleLock(a.clone()), &mut scene, &mut selection);
        assert!(selection.is_empty());
        assert!(scene.get(&a).unwrap().is_locked());

        LayerView::apply(&LayerCommand::Delete(b), &mut scene, &mut selection);
        assert_eq!(scene.len(), 1);
    }
}
