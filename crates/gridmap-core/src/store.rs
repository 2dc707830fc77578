//! The scene store of record.
//!
//! Every mutation goes through a named operation that produces the next
//! consistent [`SceneState`] in one step and writes it through to the
//! configured [`Persistence`]. Operations on unknown ids return `false`
//! (or `None`) without touching the state.

use std::collections::HashSet;
use std::sync::Arc;

use bevy_math::Vec3;
use chrono::{DateTime, Utc};

use crate::config::EditorConfig;
use crate::grid::placement_position;
use crate::persistence::{self, ImportError, Persistence};
use crate::scene::{
    EnvironmentPatch, Group, GroupId, NewObject, ObjectId, ObjectKind, ObjectPatch, SceneObject,
    SceneState,
};
use crate::storage::PersistenceError;

/// Rejected store operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("group name must not be empty")]
    EmptyGroupName,
    #[error("group needs at least one existing member")]
    EmptyGroupMembers,
}

/// Current selection. At most one of the two is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub object: Option<ObjectId>,
    pub group: Option<GroupId>,
}

/// Owns the scene, the selection and the autosave slot.
#[derive(Debug)]
pub struct SceneStore {
    state: Arc<SceneState>,
    version: u64,
    selection: Selection,
    config: EditorConfig,
    persistence: Option<Persistence>,
    /// Every object id that has been in the scene this session.
    issued_ids: HashSet<ObjectId>,
}

impl SceneStore {
    /// A store with an empty scene and no persistence.
    pub fn in_memory(config: EditorConfig) -> Self {
        Self {
            state: Arc::new(SceneState::default()),
            version: 0,
            selection: Selection::default(),
            config,
            persistence: None,
            issued_ids: HashSet::new(),
        }
    }

    /// A store initialised from, and saving to, `persistence`.
    pub fn open(config: EditorConfig, persistence: Persistence) -> Self {
        let state = persistence.load();
        let issued_ids = state.objects.iter().map(|obj| obj.id.clone()).collect();
        Self {
            state: Arc::new(state),
            version: 0,
            selection: Selection::default(),
            config,
            persistence: Some(persistence),
            issued_ids,
        }
    }

    /// Consistent snapshot of the scene, safe to keep across mutations.
    pub fn snapshot(&self) -> Arc<SceneState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Incremented by every mutation that changed the scene.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn object(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.state.object(id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.state.group(id)
    }

    pub fn ungrouped_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.state.ungrouped_objects()
    }

    pub fn children_of<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a SceneObject> {
        self.state.children_of(group)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_object(&self) -> Option<&ObjectId> {
        self.selection.object.as_ref()
    }

    pub fn selected_group(&self) -> Option<&GroupId> {
        self.selection.group.as_ref()
    }

    /// Selects an object, or clears the selection with `None`. Selecting an
    /// unknown id is ignored. Returns true if the selection changed.
    pub fn select_object(&mut self, id: Option<ObjectId>) -> bool {
        if id.as_ref().is_some_and(|id| self.state.object(id).is_none()) {
            return false;
        }
        let next = Selection {
            object: id,
            group: None,
        };
        self.set_selection(next)
    }

    /// Selects a group, or clears the selection with `None`.
    pub fn select_group(&mut self, id: Option<GroupId>) -> bool {
        if id.as_ref().is_some_and(|id| self.state.group(id).is_none()) {
            return false;
        }
        let next = Selection {
            object: None,
            group: id,
        };
        self.set_selection(next)
    }

    fn set_selection(&mut self, next: Selection) -> bool {
        if self.selection == next {
            return false;
        }
        tracing::debug!("[selection] {:?} -> {:?}", self.selection, next);
        self.selection = next;
        true
    }

    /// Applies `mutation` to the next state and publishes it if it reports a
    /// change.
    fn mutate(&mut self, op: &str, mutation: impl FnOnce(&mut SceneState) -> bool) -> bool {
        let mut next = SceneState::clone(&self.state);
        if !mutation(&mut next) {
            return false;
        }
        self.commit(op, next);
        true
    }

    fn commit(&mut self, op: &str, next: SceneState) {
        self.state = Arc::new(next);
        self.version += 1;
        self.drop_stale_selection();
        tracing::debug!("[store] {op} (version {})", self.version);
        if let Some(persistence) = &self.persistence {
            persistence.save(&self.state);
        }
    }

    fn drop_stale_selection(&mut self) {
        if let Some(id) = &self.selection.object
            && self.state.object(id).is_none()
        {
            self.selection.object = None;
        }
        if let Some(id) = &self.selection.group
            && self.state.group(id).is_none()
        {
            self.selection.group = None;
        }
    }

    /// Appends an object. A missing id, or one already used this session,
    /// is replaced by a fresh one, a missing name by `"{kind}_{millis}"`.
    /// Non-finite vectors fall back to the [`NewObject::new`] defaults.
    pub fn add_object(&mut self, candidate: NewObject) -> ObjectId {
        let mut next = SceneState::clone(&self.state);
        let id = insert_object(&mut next, &mut self.issued_ids, candidate);
        self.commit("add_object", next);
        id
    }

    /// Places a new object of `kind` on the grid cell under `ground_point`,
    /// stacked on top of the cell's occupants.
    pub fn place_object(&mut self, kind: ObjectKind, ground_point: Vec3) -> ObjectId {
        let position = placement_position(
            ground_point.x,
            ground_point.z,
            &self.state.objects,
            self.config.grid_step,
        );
        let mut candidate = NewObject::new(kind).at(position);
        candidate.color = self.config.default_color;
        candidate.surface_style = self.config.default_surface;
        self.add_object(candidate)
    }

    /// Removes an object and its group membership.
    pub fn remove_object(&mut self, id: &ObjectId) -> bool {
        self.mutate("remove_object", |state| {
            let Some(index) = state.objects.iter().position(|obj| &obj.id == id) else {
                return false;
            };
            let removed = state.objects.remove(index);
            if let Some(group_id) = &removed.group_id
                && let Some(group) = state.group_mut(group_id)
            {
                group.child_ids.retain(|child| child != id);
            }
            true
        })
    }

    pub fn update_object(&mut self, id: &ObjectId, patch: &ObjectPatch) -> bool {
        if self.state.object(id).is_none() {
            return false;
        }
        self.mutate("update_object", |state| {
            state.object_mut(id).is_some_and(|obj| patch.apply(obj))
        })
    }

    /// Copies an object one grid step along X, named `"{name}_copy"`. The
    /// copy joins the original's group.
    pub fn duplicate_object(&mut self, id: &ObjectId) -> Option<ObjectId> {
        let original = self.state.object(id)?.clone();
        let step = self.config.grid_step;

        let mut candidate = NewObject::from(&original);
        candidate.position[0] += step;
        candidate.display_name = Some(format!("{}_copy", original.label()));

        let mut next = SceneState::clone(&self.state);
        let copy = insert_object(&mut next, &mut self.issued_ids, candidate);
        if let Some(group_id) = &original.group_id {
            link(&mut next, group_id, &copy);
        }
        self.commit("duplicate_object", next);
        Some(copy)
    }

    /// Creates a group from the given objects. Unknown and repeated ids are
    /// dropped; members leave their previous group.
    pub fn create_group(
        &mut self,
        name: &str,
        object_ids: impl IntoIterator<Item = ObjectId>,
    ) -> Result<GroupId, SceneError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SceneError::EmptyGroupName);
        }

        let mut seen = HashSet::new();
        let members: Vec<ObjectId> = object_ids
            .into_iter()
            .filter(|id| self.state.object(id).is_some() && seen.insert(id.clone()))
            .collect();
        if members.is_empty() {
            return Err(SceneError::EmptyGroupMembers);
        }

        let group_id = GroupId::generate();
        self.mutate("create_group", |state| {
            state.groups.push(Group {
                id: group_id.clone(),
                name: name.to_string(),
                child_ids: Vec::with_capacity(members.len()),
                collapsed: false,
                parent_group_id: None,
            });
            for member in &members {
                link(state, &group_id, member);
            }
            true
        });
        Ok(group_id)
    }

    /// Deletes a group. Its members stay in the scene, ungrouped.
    pub fn remove_group(&mut self, id: &GroupId) -> bool {
        self.mutate("remove_group", |state| {
            let Some(index) = state.groups.iter().position(|group| &group.id == id) else {
                return false;
            };
            let removed = state.groups.remove(index);
            for child in &removed.child_ids {
                if let Some(obj) = state.object_mut(child) {
                    obj.group_id = None;
                }
            }
            for group in &mut state.groups {
                if group.parent_group_id.as_ref() == Some(id) {
                    group.parent_group_id = None;
                }
            }
            true
        })
    }

    /// Moves an object into a group, out of any group it was in.
    pub fn add_to_group(&mut self, group_id: &GroupId, object_id: &ObjectId) -> bool {
        let Some(obj) = self.state.object(object_id) else {
            return false;
        };
        if self.state.group(group_id).is_none() || obj.group_id.as_ref() == Some(group_id) {
            return false;
        }
        self.mutate("add_to_group", |state| link(state, group_id, object_id))
    }

    pub fn remove_from_group(&mut self, group_id: &GroupId, object_id: &ObjectId) -> bool {
        let is_member = self
            .state
            .object(object_id)
            .is_some_and(|obj| obj.group_id.as_ref() == Some(group_id));
        if !is_member {
            return false;
        }
        self.mutate("remove_from_group", |state| {
            unlink(state, object_id);
            true
        })
    }

    pub fn toggle_group_collapse(&mut self, id: &GroupId) -> bool {
        self.mutate("toggle_group_collapse", |state| {
            let Some(group) = state.group_mut(id) else {
                return false;
            };
            group.collapsed = !group.collapsed;
            true
        })
    }

    /// Renames an object. Blank names are ignored; others are trimmed.
    pub fn rename_object(&mut self, id: &ObjectId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.mutate("rename_object", |state| {
            let Some(obj) = state.object_mut(id) else {
                return false;
            };
            if obj.display_name.as_deref() == Some(name) {
                return false;
            }
            obj.display_name = Some(name.to_string());
            true
        })
    }

    pub fn rename_group(&mut self, id: &GroupId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.mutate("rename_group", |state| {
            let Some(group) = state.group_mut(id) else {
                return false;
            };
            if group.name == name {
                return false;
            }
            group.name = name.to_string();
            true
        })
    }

    pub fn update_environment(&mut self, patch: &EnvironmentPatch) -> bool {
        self.mutate("update_environment", |state| patch.apply(&mut state.environment))
    }

    /// Resets to the empty scene and saves it.
    pub fn clear(&mut self) {
        tracing::info!("[store] clearing {} objects", self.state.objects.len());
        self.commit("clear", SceneState::default());
    }

    /// Replaces the whole scene after repairing its links. Ids of the new
    /// scene are accepted even if they were used before.
    pub fn replace(&mut self, mut next: SceneState) {
        let repairs = next.normalize();
        if repairs > 0 {
            tracing::warn!("[store] repaired {repairs} inconsistent links in replacement scene");
        }
        tracing::info!(
            "[store] replacing scene with {} objects, {} groups",
            next.objects.len(),
            next.groups.len()
        );
        self.issued_ids
            .extend(next.objects.iter().map(|obj| obj.id.clone()));
        self.commit("replace", next);
    }

    /// Replaces the scene with the contents of an exchange file. On error the
    /// scene is unchanged.
    pub fn import(&mut self, text: &str) -> Result<(), ImportError> {
        let next = persistence::import_text(text)?;
        self.replace(next);
        Ok(())
    }

    /// Exchange text for the current scene.
    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        persistence::export_text(&self.state)
    }

    /// Saves immediately, reporting failures.
    pub fn save_now(&self) -> Result<(), PersistenceError> {
        match &self.persistence {
            Some(persistence) => persistence.try_save(&self.state),
            None => Err(PersistenceError::Unavailable(
                "no storage configured".to_string(),
            )),
        }
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.persistence.as_ref()?.last_saved()
    }
}

fn insert_object(
    state: &mut SceneState,
    issued_ids: &mut HashSet<ObjectId>,
    mut candidate: NewObject,
) -> ObjectId {
    for field in candidate.reset_non_finite() {
        tracing::warn!("[store] non-finite {field} for new {}, using default", candidate.kind);
    }
    let id = match candidate.id.take() {
        Some(id) if !issued_ids.contains(&id) && state.object(&id).is_none() => id,
        _ => ObjectId::generate(candidate.kind),
    };
    issued_ids.insert(id.clone());
    let display_name = candidate.display_name.unwrap_or_else(|| {
        format!("{}_{}", candidate.kind, Utc::now().timestamp_millis())
    });
    state.objects.push(SceneObject {
        id: id.clone(),
        kind: candidate.kind,
        position: candidate.position,
        rotation: candidate.rotation,
        scale: candidate.scale,
        color: candidate.color,
        surface_style: candidate.surface_style,
        group_id: None,
        display_name: Some(display_name),
    });
    id
}

/// Makes `object_id` a member of `group_id`, updating both sides of the link.
fn link(state: &mut SceneState, group_id: &GroupId, object_id: &ObjectId) -> bool {
    if state.group(group_id).is_none() {
        return false;
    }
    unlink(state, object_id);
    let Some(obj) = state.object_mut(object_id) else {
        return false;
    };
    obj.group_id = Some(group_id.clone());
    if let Some(group) = state.group_mut(group_id) {
        group.child_ids.push(object_id.clone());
    }
    true
}

/// Removes `object_id` from whatever group holds it.
fn unlink(state: &mut SceneState, object_id: &ObjectId) {
    let Some(previous) = state.object_mut(object_id).and_then(|obj| obj.group_id.take()) else {
        return;
    };
    if let Some(group) = state.group_mut(&previous) {
        group.child_ids.retain(|child| child != object_id);
    }
}
