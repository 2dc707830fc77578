//! Test harness for driving the editor with world-space gestures.
//!
//! `TestEditor` owns an in-memory [`Editor`] and a fixed camera. Gestures
//! are given as world points and converted to pointer positions through the
//! camera, so tests read in world units and never depend on screen layout.

use std::ops::{Deref, DerefMut};

use bevy_math::Vec3;

use super::{Editor, Pointer, PointerOutcome, PointerTarget, View};
use crate::camera::{Camera, Viewport};
use crate::config::EditorConfig;
use crate::scene::ObjectId;
use crate::store::SceneStore;

pub(crate) struct TestEditor {
    pub editor: Editor,
    pub view: View,
}

impl TestEditor {
    /// Default config, camera at (0, 10, 10) looking at the origin.
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            editor: Editor::new(SceneStore::in_memory(config)),
            view: View {
                camera: Camera::looking_at(Vec3::new(0.0, 10.0, 10.0), Vec3::ZERO),
                viewport: Viewport::new(800.0, 600.0),
            },
        }
    }

    fn pointer_at(&self, point: Vec3) -> Pointer {
        let screen = self
            .view
            .camera
            .world_to_screen(point, &self.view.viewport)
            .expect("point is behind the test camera");
        Pointer::at(screen)
    }

    /// Pointer-down on empty space above the ground point `(x, 0, z)`.
    pub fn click_ground(&mut self, x: f32, z: f32) -> PointerOutcome {
        let pointer = self.pointer_at(Vec3::new(x, 0.0, z));
        let view = self.view;
        self.editor
            .pointer_down(&PointerTarget::Empty, pointer, &view)
    }

    /// Pointer-down on an object, at its centre.
    pub fn press(&mut self, id: &ObjectId) -> PointerOutcome {
        let pointer = self.pointer_at(Vec3::from_array(self.position(id)));
        let view = self.view;
        self.editor
            .pointer_down(&PointerTarget::Object(id.clone()), pointer, &view)
    }

    /// Pointer-move to where `point` is drawn.
    pub fn drag_to(&mut self, point: Vec3) -> PointerOutcome {
        let pointer = self.pointer_at(point);
        let view = self.view;
        self.editor.pointer_move(pointer, &view)
    }

    /// Pointer-move with the vertical-lock modifier held.
    pub fn drag_vertical_to(&mut self, point: Vec3) -> PointerOutcome {
        let pointer = self.pointer_at(point).vertical();
        let view = self.view;
        self.editor.pointer_move(pointer, &view)
    }

    pub fn release(&mut self) -> PointerOutcome {
        self.editor.pointer_up()
    }

    pub fn position(&self, id: &ObjectId) -> [f32; 3] {
        self.editor
            .store()
            .object(id)
            .map(|obj| obj.position)
            .expect("object exists")
    }
}

impl Deref for TestEditor {
    type Target = Editor;

    fn deref(&self) -> &Editor {
        &self.editor
    }
}

impl DerefMut for TestEditor {
    fn deref_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }
}

impl PointerOutcome {
    /// Id of the object a Place click created.
    pub(crate) fn placed(self) -> ObjectId {
        match self {
            PointerOutcome::Placed(id) => id,
            other => panic!("expected a placed object, got {other:?}"),
        }
    }
}
