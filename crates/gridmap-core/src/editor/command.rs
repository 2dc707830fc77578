//! Keyboard and toolbar commands.

use super::{Editor, EditorMode};
use crate::scene::ObjectKind;

/// A discrete command from the toolbar or keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    SetMode(EditorMode),
    SetSelectedKind(ObjectKind),
    Grab,
    Cancel,
    DeleteSelected,
}

impl EditorCommand {
    /// Maps a key name (`KeyboardEvent.key`) to its shortcut.
    ///
    /// `g` grabs, `Delete`/`Backspace`/`x` delete, `Escape` cancels and
    /// `1`/`2`/`3` switch to select/place/delete mode.
    pub fn from_key(key: &str) -> Option<Self> {
        let command = match key.to_ascii_lowercase().as_str() {
            "g" => Self::Grab,
            "delete" | "backspace" | "x" => Self::DeleteSelected,
            "escape" | "esc" => Self::Cancel,
            "1" => Self::SetMode(EditorMode::Select),
            "2" => Self::SetMode(EditorMode::Place),
            "3" => Self::SetMode(EditorMode::Delete),
            _ => return None,
        };
        Some(command)
    }
}

impl Editor {
    /// Runs a command. Returns false when it did not apply, e.g. `Grab`
    /// without a selection.
    pub fn apply(&mut self, command: EditorCommand) -> bool {
        match command {
            EditorCommand::SetMode(mode) => {
                self.set_mode(mode);
                true
            }
            EditorCommand::SetSelectedKind(kind) => {
                self.set_selected_kind(kind);
                true
            }
            EditorCommand::Grab => self.grab(),
            EditorCommand::Cancel => {
                self.cancel();
                true
            }
            EditorCommand::DeleteSelected => self.delete_selected().is_some(),
        }
    }
}
