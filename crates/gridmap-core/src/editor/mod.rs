//! Interaction state machine.
//!
//! [`Editor`] turns pointer and command input into store operations. It
//! tracks three pieces of state:
//!
//! - the editor mode (`Select`, `Place`, `Delete`), switched explicitly;
//! - the move-armed flag, set by `grab` in `Select` mode with an object
//!   selected;
//! - the drag gesture, `Idle -> Dragging -> Idle`, entered by pressing an
//!   object while move is armed.
//!
//! Leaving move-armed always ends the drag. A cancelled drag leaves the
//! object where the last pointer move put it. Move is only armed while an
//! object is selected, however the selection was lost.

mod command;
mod input;
mod status;
#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

use bevy_math::Vec2;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, Viewport, screen_point_to_world_on_ground_plane};
use crate::color::Color;
use crate::persistence::{self, ImportError};
use crate::scene::{GroupId, ObjectId, ObjectKind, ObjectPatch, SceneObject, SceneState};
use crate::store::SceneStore;

pub use command::EditorCommand;
pub use status::CursorStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    Select,
    #[default]
    Place,
    Delete,
}

impl EditorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Place => "place",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for EditorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EditorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "select" => Ok(Self::Select),
            "place" => Ok(Self::Place),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("unknown editor mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { object: ObjectId },
}

/// What a pointer-down landed on, as reported by the renderer's picking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Empty,
    Object(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    /// Position in the same coordinates as the [`Viewport`].
    pub screen: Vec2,
    /// Vertical-lock modifier (Shift) held.
    pub vertical_lock: bool,
}

impl Pointer {
    pub fn at(screen: Vec2) -> Self {
        Self {
            screen,
            vertical_lock: false,
        }
    }

    #[must_use]
    pub fn vertical(mut self) -> Self {
        self.vertical_lock = true;
        self
    }
}

/// Camera and viewport the pointer coordinates refer to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub camera: Camera,
    pub viewport: Viewport,
}

/// Effect of a pointer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerOutcome {
    Ignored,
    SelectionCleared,
    Selected(ObjectId),
    DragStarted(ObjectId),
    Moved(ObjectId),
    DragEnded(ObjectId),
    Placed(ObjectId),
    Removed(ObjectId),
}

/// Read-only state for one rendered frame.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub scene: Arc<SceneState>,
    pub mode: EditorMode,
    pub selected_object: Option<ObjectId>,
    pub selected_group: Option<GroupId>,
    pub move_armed: bool,
    pub dragging: bool,
}

impl RenderSnapshot {
    pub fn is_highlighted(&self, obj: &SceneObject) -> bool {
        self.selected_object.as_ref() == Some(&obj.id)
            || (self.selected_group.is_some() && obj.group_id == self.selected_group)
    }

    /// Fill to draw `obj` with: the highlight color when selected directly
    /// or through its group.
    pub fn display_color(&self, obj: &SceneObject) -> Color {
        if self.is_highlighted(obj) {
            Color::SELECTED
        } else {
            obj.color
        }
    }
}

#[derive(Debug)]
pub struct Editor {
    store: SceneStore,
    mode: EditorMode,
    selected_kind: ObjectKind,
    move_armed: bool,
    drag: DragState,
}

impl Editor {
    /// Starts in the configured mode with the configured kind selected.
    pub fn new(store: SceneStore) -> Self {
        let config = store.config();
        let mode = config.initial_mode;
        let selected_kind = config.default_kind;
        Self {
            store,
            mode,
            selected_kind,
            move_armed: false,
            drag: DragState::Idle,
        }
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    /// Direct store access for panels (hierarchy, properties, environment).
    /// Selection and deletion should go through the editor methods below so
    /// that move is disarmed with them.
    pub fn store_mut(&mut self) -> &mut SceneStore {
        &mut self.store
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn selected_kind(&self) -> ObjectKind {
        self.selected_kind
    }

    pub fn is_move_armed(&self) -> bool {
        self.move_armed && self.store.selected_object().is_some()
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    /// True while a drag is in progress; the UI keeps global pointer-move
    /// and pointer-up listeners attached exactly as long as this holds.
    pub fn capturing_pointer(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn set_mode(&mut self, mode: EditorMode) {
        if self.mode != mode {
            tracing::debug!("[editor] mode {} -> {mode}", self.mode);
        }
        self.mode = mode;
        self.disarm();
    }

    pub fn set_selected_kind(&mut self, kind: ObjectKind) {
        self.selected_kind = kind;
    }

    /// Arms move for the selected object. Only valid in `Select` mode.
    pub fn grab(&mut self) -> bool {
        self.drop_stale_arm();
        if self.mode != EditorMode::Select || self.store.selected_object().is_none() {
            return false;
        }
        self.move_armed = true;
        tracing::debug!("[editor] move armed");
        true
    }

    /// Disarms move and clears the selection.
    pub fn cancel(&mut self) {
        self.disarm();
        self.store.select_object(None);
    }

    /// Removes the selected object. Returns its id if one was selected.
    pub fn delete_selected(&mut self) -> Option<ObjectId> {
        let id = self.store.selected_object()?.clone();
        self.disarm();
        self.store.remove_object(&id);
        self.store.select_object(None);
        Some(id)
    }

    /// Selects an object from a panel. Clearing the selection disarms move.
    pub fn select_object(&mut self, id: Option<ObjectId>) -> bool {
        if id.is_none() {
            self.disarm();
        }
        self.store.select_object(id)
    }

    /// Selects a group from a panel. Object selection, and with it move,
    /// is dropped.
    pub fn select_group(&mut self, id: Option<GroupId>) -> bool {
        let changed = self.store.select_group(id);
        self.drop_stale_arm();
        changed
    }

    /// Removes an object from a panel, disarming move if it was selected.
    pub fn remove_object(&mut self, id: &ObjectId) -> bool {
        if self.store.selected_object() == Some(id) {
            self.disarm();
        }
        self.store.remove_object(id)
    }

    /// Empties the scene.
    pub fn clear(&mut self) {
        self.cancel();
        self.store.clear();
    }

    /// Replaces the scene with an exchange file. A file that does not parse
    /// leaves both the scene and the selection alone.
    pub fn import(&mut self, text: &str) -> Result<(), ImportError> {
        let next = persistence::import_text(text)?;
        self.cancel();
        self.store.replace(next);
        Ok(())
    }

    fn disarm(&mut self) {
        self.move_armed = false;
        if let DragState::Dragging { object } = std::mem::take(&mut self.drag) {
            tracing::debug!("[editor] drag of {object} ended");
        }
    }

    /// Disarms move if the selection went away behind the editor's back.
    fn drop_stale_arm(&mut self) {
        if self.move_armed && self.store.selected_object().is_none() {
            tracing::debug!("[editor] selection gone, move disarmed");
            self.disarm();
        }
    }

    pub fn pointer_down(
        &mut self,
        target: &PointerTarget,
        pointer: Pointer,
        view: &View,
    ) -> PointerOutcome {
        self.drop_stale_arm();
        match (self.mode, target) {
            (EditorMode::Select, PointerTarget::Empty) => {
                self.disarm();
                self.store.select_object(None);
                PointerOutcome::SelectionCleared
            }
            (EditorMode::Select, PointerTarget::Object(id)) => {
                if self.store.object(id).is_none() {
                    return PointerOutcome::Ignored;
                }
                self.store.select_object(Some(id.clone()));
                if self.move_armed {
                    self.drag = DragState::Dragging { object: id.clone() };
                    tracing::debug!("[editor] drag of {id} started");
                    return PointerOutcome::DragStarted(id.clone());
                }
                PointerOutcome::Selected(id.clone())
            }
            (EditorMode::Place, PointerTarget::Empty) => {
                let Some(point) = screen_point_to_world_on_ground_plane(
                    pointer.screen.x,
                    pointer.screen.y,
                    &view.camera,
                    &view.viewport,
                ) else {
                    return PointerOutcome::Ignored;
                };
                PointerOutcome::Placed(self.store.place_object(self.selected_kind, point))
            }
            (EditorMode::Place, PointerTarget::Object(_))
            | (EditorMode::Delete, PointerTarget::Empty) => PointerOutcome::Ignored,
            (EditorMode::Delete, PointerTarget::Object(id)) => {
                if self.store.selected_object() == Some(id) {
                    self.disarm();
                }
                if self.store.remove_object(id) {
                    PointerOutcome::Removed(id.clone())
                } else {
                    PointerOutcome::Ignored
                }
            }
        }
    }

    /// Moves the dragged object under the pointer.
    pub fn pointer_move(&mut self, pointer: Pointer, view: &View) -> PointerOutcome {
        let DragState::Dragging { object } = &self.drag else {
            return PointerOutcome::Ignored;
        };
        let id = object.clone();
        let Some(position) = self.store.object(&id).map(|obj| obj.position) else {
            // Removed mid-drag
            self.disarm();
            return PointerOutcome::Ignored;
        };
        let Some(ray) = view.camera.ray_from_screen(pointer.screen, &view.viewport) else {
            return PointerOutcome::Ignored;
        };

        let step = self.store.config().grid_step;
        let target = if pointer.vertical_lock {
            input::vertical_drag(ray, position, &view.camera, step)
        } else {
            input::horizontal_drag(ray, position, step)
        };
        let Some(target) = target else {
            return PointerOutcome::Ignored;
        };

        self.store.update_object(&id, &ObjectPatch::position(target));
        PointerOutcome::Moved(id)
    }

    /// Ends the drag. Move stays armed for the next press.
    pub fn pointer_up(&mut self) -> PointerOutcome {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging { object } => {
                tracing::debug!("[editor] drag of {object} ended");
                PointerOutcome::DragEnded(object)
            }
            DragState::Idle => PointerOutcome::Ignored,
        }
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            scene: self.store.snapshot(),
            mode: self.mode,
            selected_object: self.store.selected_object().cloned(),
            selected_group: self.store.selected_group().cloned(),
            move_armed: self.is_move_armed(),
            dragging: self.capturing_pointer(),
        }
    }
}
