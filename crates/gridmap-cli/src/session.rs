//! Runs script commands against an editor.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, bail};
use gridmap_core::{
    Camera, DirectionalLight, Editor, EditorCommand, EnvironmentPatch, GroupId, ObjectId, Pointer,
    PointerOutcome, PointerTarget, SceneObject, Vec3, View, Viewport, export_file_name,
};

use crate::script::{Command, EnvSetting};

/// An editor plus the fixed view that script coordinates are projected
/// through.
pub struct Session {
    editor: Editor,
    view: View,
}

impl Session {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            view: View {
                camera: Camera::default(),
                viewport: Viewport::new(1280.0, 720.0),
            },
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    fn pointer_at(&self, point: Vec3) -> anyhow::Result<Pointer> {
        let screen = self
            .view
            .camera
            .world_to_screen(point, &self.view.viewport)
            .with_context(|| format!("{point} is not visible from the camera"))?;
        Ok(Pointer::at(screen))
    }

    fn dragged_position(&self) -> anyhow::Result<[f32; 3]> {
        let gridmap_core::DragState::Dragging { object } = self.editor.drag_state() else {
            bail!("no drag in progress; use grab and press first");
        };
        self.editor
            .store()
            .object(object)
            .map(|obj| obj.position)
            .with_context(|| format!("dragged object {object} no longer exists"))
    }

    pub fn run(&mut self, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
        let view = self.view;
        match command {
            Command::Mode(mode) => {
                self.editor.apply(EditorCommand::SetMode(mode));
                writeln!(out, "mode {mode}")?;
            }
            Command::Kind(kind) => {
                self.editor.apply(EditorCommand::SetSelectedKind(kind));
                writeln!(out, "kind {kind}")?;
            }
            Command::Click { x, z } => {
                let pointer = self.pointer_at(Vec3::new(x, 0.0, z))?;
                let outcome = self
                    .editor
                    .pointer_down(&PointerTarget::Empty, pointer, &view);
                self.report(&outcome, out)?;
            }
            Command::Press(id) => {
                let position = self
                    .editor
                    .store()
                    .object(&id)
                    .map(|obj| obj.position)
                    .with_context(|| format!("unknown object {id}"))?;
                let pointer = self.pointer_at(Vec3::from_array(position))?;
                let outcome = self
                    .editor
                    .pointer_down(&PointerTarget::Object(id), pointer, &view);
                self.report(&outcome, out)?;
            }
            Command::Drag { x, z } => {
                let [_, y, _] = self.dragged_position()?;
                let pointer = self.pointer_at(Vec3::new(x, y, z))?;
                let outcome = self.editor.pointer_move(pointer, &view);
                self.report(&outcome, out)?;
            }
            Command::Lift { y } => {
                let [x, _, z] = self.dragged_position()?;
                let pointer = self.pointer_at(Vec3::new(x, y, z))?.vertical();
                let outcome = self.editor.pointer_move(pointer, &view);
                self.report(&outcome, out)?;
            }
            Command::Release => {
                let outcome = self.editor.pointer_up();
                self.report(&outcome, out)?;
            }
            Command::Grab => self.command(EditorCommand::Grab, "grab", out)?,
            Command::Cancel => self.command(EditorCommand::Cancel, "cancel", out)?,
            Command::Delete => self.command(EditorCommand::DeleteSelected, "delete", out)?,
            Command::Key(key) => {
                let command = EditorCommand::from_key(&key)
                    .with_context(|| format!("no shortcut bound to {key:?}"))?;
                self.command(command, &key, out)?;
            }
            Command::Select(id) => {
                if self.editor.select_object(Some(id.clone())) {
                    writeln!(out, "selected {id}")?;
                } else {
                    writeln!(out, "select {id}: no change")?;
                }
            }
            Command::Duplicate(id) => match self.editor.store_mut().duplicate_object(&id) {
                Some(copy) => writeln!(out, "duplicated {id} as {copy}")?,
                None => writeln!(out, "duplicate {id}: no such object")?,
            },
            Command::Rename { id, name } => {
                let store = self.editor.store_mut();
                let renamed = store.rename_object(&ObjectId::new(id.as_str()), &name)
                    || store.rename_group(&GroupId::new(id.as_str()), &name);
                if renamed {
                    writeln!(out, "renamed {id} to {}", name.trim())?;
                } else {
                    writeln!(out, "rename {id}: no change")?;
                }
            }
            Command::Group { name, members } => {
                let group = self.editor.store_mut().create_group(&name, members)?;
                writeln!(out, "created group {group}")?;
            }
            Command::Ungroup(id) => {
                if self.editor.store_mut().remove_group(&id) {
                    writeln!(out, "removed group {id}")?;
                } else {
                    writeln!(out, "ungroup {id}: no such group")?;
                }
            }
            Command::Env(setting) => self.update_environment(setting, out)?,
            Command::List => self.list(out)?,
            Command::Status => self.status(out)?,
            Command::Clear => {
                self.editor.clear();
                writeln!(out, "cleared")?;
            }
            Command::Save => {
                self.editor.store().save_now()?;
                writeln!(out, "saved")?;
            }
            Command::Export(path) => {
                let path = path.unwrap_or_else(|| {
                    export_file_name(chrono::Local::now().date_naive()).into()
                });
                self.export(&path)?;
                writeln!(out, "exported to {}", path.display())?;
            }
            Command::Import(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                self.editor.import(&text)?;
                writeln!(
                    out,
                    "imported {} objects from {}",
                    self.editor.store().state().objects.len(),
                    path.display()
                )?;
            }
        }
        Ok(())
    }

    fn command(
        &mut self,
        command: EditorCommand,
        label: &str,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        if self.editor.apply(command) {
            writeln!(out, "{label}: ok")?;
        } else {
            writeln!(out, "{label}: not applicable")?;
        }
        Ok(())
    }

    fn report(&self, outcome: &PointerOutcome, out: &mut impl Write) -> anyhow::Result<()> {
        let store = self.editor.store();
        let describe = |id: &ObjectId| match store.object(id) {
            Some(obj) => format!("{id} at {}", format_position(obj)),
            None => id.to_string(),
        };
        match outcome {
            PointerOutcome::Ignored => writeln!(out, "ignored")?,
            PointerOutcome::SelectionCleared => writeln!(out, "selection cleared")?,
            PointerOutcome::Selected(id) => writeln!(out, "selected {}", describe(id))?,
            PointerOutcome::DragStarted(id) => writeln!(out, "dragging {}", describe(id))?,
            PointerOutcome::Moved(id) => writeln!(out, "moved {}", describe(id))?,
            PointerOutcome::DragEnded(id) => writeln!(out, "released {}", describe(id))?,
            PointerOutcome::Placed(id) => writeln!(out, "placed {}", describe(id))?,
            PointerOutcome::Removed(id) => writeln!(out, "removed {id}")?,
        }
        Ok(())
    }

    fn update_environment(&mut self, setting: EnvSetting, out: &mut impl Write) -> anyhow::Result<()> {
        let current = self.editor.store().state().environment.directional_light;
        let patch = match setting {
            EnvSetting::Ambient(value) => EnvironmentPatch {
                ambient_intensity: Some(value),
                ..EnvironmentPatch::default()
            },
            EnvSetting::Light(value) => EnvironmentPatch {
                directional_light: Some(DirectionalLight {
                    intensity: value,
                    ..current
                }),
                ..EnvironmentPatch::default()
            },
            EnvSetting::Background(color) => EnvironmentPatch {
                background_color: Some(color),
                ..EnvironmentPatch::default()
            },
        };
        if self.editor.store_mut().update_environment(&patch) {
            writeln!(out, "environment updated")?;
        } else {
            writeln!(out, "environment: no change")?;
        }
        Ok(())
    }

    /// Prints the object hierarchy: groups with their members, then
    /// ungrouped objects.
    fn list(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let store = self.editor.store();
        let state = store.state();
        for group in &state.groups {
            let marker = if group.collapsed { "+" } else { "-" };
            writeln!(
                out,
                "{marker} {} ({}) [{}]",
                group.name,
                group.id,
                group.child_ids.len()
            )?;
            if !group.collapsed {
                for obj in store.children_of(group) {
                    writeln!(out, "    {}", format_object(obj))?;
                }
            }
        }
        for obj in store.ungrouped_objects() {
            writeln!(out, "  {}", format_object(obj))?;
        }
        Ok(())
    }

    fn status(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let store = self.editor.store();
        writeln!(out, "{}", self.editor.status_text())?;
        writeln!(
            out,
            "objects: {}, groups: {}, version: {}",
            store.state().objects.len(),
            store.state().groups.len(),
            store.version()
        )?;
        match store.last_saved() {
            Some(time) => writeln!(out, "last saved: {}", time.to_rfc3339())?,
            None => writeln!(out, "last saved: never")?,
        }
        Ok(())
    }

    fn export(&self, path: &Path) -> anyhow::Result<()> {
        let text = self.editor.store().serialize()?;
        std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
    }
}

fn format_position(obj: &SceneObject) -> String {
    let [x, y, z] = obj.position;
    format!("[{x}, {y}, {z}]")
}

fn format_object(obj: &SceneObject) -> String {
    format!("{} {} {} {}", obj.label(), obj.id, obj.kind, format_position(obj))
}
