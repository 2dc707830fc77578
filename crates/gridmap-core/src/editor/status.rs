//! Status bar text and cursor feedback.

use super::{DragState, Editor, EditorMode};

/// Pointer cursor the UI should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    /// Hovering something clickable.
    Pointer,
    /// Move armed, ready to drag.
    Grab,
    Grabbing,
}

impl CursorStyle {
    /// CSS `cursor` value.
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pointer => "pointer",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
        }
    }
}

impl Editor {
    pub fn cursor(&self, hovering_object: bool) -> CursorStyle {
        if matches!(self.drag, DragState::Dragging { .. }) {
            CursorStyle::Grabbing
        } else if self.is_move_armed() {
            CursorStyle::Grab
        } else if hovering_object && self.mode != EditorMode::Place {
            CursorStyle::Pointer
        } else {
            CursorStyle::Default
        }
    }

    /// Mode description, followed by the selected object's label if any.
    pub fn status_text(&self) -> String {
        let mode = if self.is_move_armed() {
            "MOVE MODE - Drag to move horizontally, Shift+Drag for vertical"
        } else {
            match self.mode {
                EditorMode::Select => "SELECT MODE - Click objects to select",
                EditorMode::Place => "PLACE MODE - Click to place objects (stacks automatically)",
                EditorMode::Delete => "DELETE MODE - Click objects to delete",
            }
        };

        let selected = self
            .store
            .selected_object()
            .and_then(|id| self.store.object(id));
        match selected {
            Some(obj) => format!("{mode} | Selected: {}", obj.label()),
            None => mode.to_string(),
        }
    }

    /// Shortcuts that currently apply, as `(key, action)` pairs.
    pub fn shortcut_hints(&self) -> Vec<(&'static str, &'static str)> {
        let has_selection = self.store.selected_object().is_some();
        let mut hints = Vec::new();
        if self.mode == EditorMode::Select && has_selection {
            hints.push(("G", "Move object"));
        }
        if has_selection {
            hints.push(("Del", "Delete object"));
        }
        if self.is_move_armed() {
            hints.push(("Shift", "+Drag for vertical"));
        }
        hints.extend([
            ("1", "Select"),
            ("2", "Place"),
            ("3", "Delete"),
            ("Esc", "Cancel"),
        ]);
        hints
    }
}
