//! Keyboard shortcut registry.

use super::Tool;
use crate::input::KeyPress;

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    SetTool(Tool),
    Delete,
    Cancel,
    SelectAll,
    Undo,
    Redo,
    Save,
    /// Nudge the selection by one step in the given direction (unit
    /// signs). Shift uses the large step.
    Nudge(i8, i8),
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+S").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    fn matches(&self, press: &KeyPress) -> bool {
        self.key.eq_ignore_ascii_case(&press.key)
            && self.ctrl == press.modifiers.command()
            && self.shift == press.modifiers.shift
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        use ShortcutAction::*;
        let mut shortcuts = vec![
            Shortcut::new("V", false, false, SetTool(Tool::Select), "Select tool"),
            Shortcut::new("H", false, false, SetTool(Tool::Pan), "Pan tool"),
            Shortcut::new("T", false, false, SetTool(Tool::Text), "Text tool"),
            Shortcut::new("R", false, false, SetTool(Tool::Rect), "Rectangle tool"),
            Shortcut::new("C", false, false, SetTool(Tool::Circle), "Circle tool"),
            Shortcut::new("L", false, false, SetTool(Tool::Line), "Line tool"),
            Shortcut::new("I", false, false, SetTool(Tool::Image), "Image tool"),
            Shortcut::new("A", true, false, SelectAll, "Select all objects"),
            Shortcut::new("S", true, false, Save, "Save now"),
            Shortcut::new("Z", true, false, Undo, "Undo"),
            Shortcut::new("Z", true, true, Redo, "Redo"),
            Shortcut::new("Y", true, false, Redo, "Redo"),
            Shortcut::new("Delete", false, false, Delete, "Delete selected objects"),
            Shortcut::new("Backspace", false, false, Delete, "Delete selected objects"),
            Shortcut::new("Escape", false, false, Cancel, "Cancel drag or clear selection"),
        ];
        for (key, dx, dy) in [
            ("ArrowLeft", -1, 0),
            ("ArrowRight", 1, 0),
            ("ArrowUp", 0, -1),
            ("ArrowDown", 0, 1),
        ] {
            shortcuts.push(Shortcut::new(key, false, false, Nudge(dx, dy), "Nudge selection"));
            shortcuts.push(Shortcut::new(key, false, true, Nudge(dx, dy), "Nudge selection further"));
        }
        shortcuts
    }

    /// The action bound to a key press, if any.
    pub fn resolve(press: &KeyPress) -> Option<ShortcutAction> {
        Self::all().into_iter().find(|s| s.matches(press)).map(|s| s.action)
    }
}
