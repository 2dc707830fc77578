//! Scene data model.
//!
//! The exchange format keeps the field names of existing map files
//! (`type`, `material`, `parentId`, `children`, `ambientLight`, ...) so that
//! previously saved maps load unchanged. Groups are single-level: the
//! `parentId` of a group is carried through but never created by the editor.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::color::Color;

/// Unique identifier of a scene object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id of the form `{kind}_{uuid}`.
    pub fn generate(kind: ObjectKind) -> Self {
        Self(format!("{kind}_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id of the form `group_{uuid}`.
    pub fn generate() -> Self {
        Self(format!("group_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primitive shape of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Cube,
    Sphere,
    Cylinder,
    Plane,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [Self::Cube, Self::Sphere, Self::Cylinder, Self::Plane];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Plane => "plane",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown object kind: {s}"))
    }
}

/// Material model used when rendering an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceStyle {
    #[default]
    Standard,
    Basic,
    Phong,
}

/// A primitive placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub color: Color,
    #[serde(rename = "material", default)]
    pub surface_style: SurfaceStyle,
    /// Owning group. Only the store writes this, together with the group's
    /// `child_ids`.
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SceneObject {
    /// Name shown in lists, falling back to the kind.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.kind.as_str())
    }

    /// Height of the object's top face.
    pub fn top(&self) -> f32 {
        self.position[1] + self.scale[1] / 2.0
    }
}

/// A named set of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Member ids in display order. Source of truth for membership.
    #[serde(rename = "children")]
    pub child_ids: Vec<ObjectId>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<GroupId>,
}

/// Directional light settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Recommended range 0..=3.
    pub intensity: f32,
    pub position: [f32; 3],
}

impl DirectionalLight {
    pub fn is_finite(&self) -> bool {
        self.intensity.is_finite() && self.position.iter().all(|v| v.is_finite())
    }
}

/// Scene-wide lighting and background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(rename = "backgroundColor")]
    pub background_color: Color,
    /// Recommended range 0..=2.
    #[serde(rename = "ambientLight")]
    pub ambient_intensity: f32,
    #[serde(rename = "directionalLight")]
    pub directional_light: DirectionalLight,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            background_color: Color::MIDNIGHT,
            ambient_intensity: 0.4,
            directional_light: DirectionalLight {
                intensity: 1.0,
                position: [10.0, 10.0, 5.0],
            },
        }
    }
}

/// Heightfield block carried by older map files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainData {
    pub width: f32,
    pub height: f32,
    pub segments: u32,
    #[serde(rename = "heightData")]
    pub height_data: Vec<Vec<f32>>,
}

/// The complete editable scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneState {
    pub objects: Vec<SceneObject>,
    /// Absent (or `null`) in maps saved before grouping existed.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain: Option<TerrainData>,
    #[serde(default)]
    pub environment: Environment,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SceneState {
    /// Parses a scene from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the scene to indented JSON with stable field order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| &obj.id == id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| &group.id == id)
    }

    pub(crate) fn object_mut(&mut self, id: &ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| &obj.id == id)
    }

    pub(crate) fn group_mut(&mut self, id: &GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| &group.id == id)
    }

    /// Objects that belong to no group.
    pub fn ungrouped_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|obj| obj.group_id.is_none())
    }

    /// Members of a group in the group's order.
    pub fn children_of<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a SceneObject> {
        group.child_ids.iter().filter_map(|id| self.object(id))
    }

    /// Repairs ids and group links so that the scene satisfies the store's
    /// invariants. Returns the number of repairs made; a consistent scene
    /// is left untouched and yields 0.
    ///
    /// - Duplicate object and group ids keep their first occurrence.
    /// - `child_ids` lose unknown and repeated ids; an object listed by
    ///   several groups stays in the first one.
    /// - Every `group_id` is recomputed from `child_ids`.
    /// - A group `parent_group_id` that points nowhere (or to itself) is cleared.
    pub fn normalize(&mut self) -> usize {
        let mut repairs = 0;

        let mut object_ids = HashSet::new();
        let before = self.objects.len();
        self.objects.retain(|obj| object_ids.insert(obj.id.clone()));
        repairs += before - self.objects.len();

        let mut group_ids = HashSet::new();
        let before = self.groups.len();
        self.groups.retain(|group| group_ids.insert(group.id.clone()));
        repairs += before - self.groups.len();

        let mut owners: HashMap<ObjectId, GroupId> = HashMap::new();
        for group in &mut self.groups {
            let before = group.child_ids.len();
            group.child_ids.retain(|child| {
                if !object_ids.contains(child) || owners.contains_key(child) {
                    return false;
                }
                owners.insert(child.clone(), group.id.clone());
                true
            });
            repairs += before - group.child_ids.len();

            let dangling = group
                .parent_group_id
                .as_ref()
                .is_some_and(|parent| parent == &group.id || !group_ids.contains(parent));
            if dangling {
                group.parent_group_id = None;
                repairs += 1;
            }
        }

        for obj in &mut self.objects {
            let owner = owners.remove(&obj.id);
            if obj.group_id != owner {
                obj.group_id = owner;
                repairs += 1;
            }
        }

        repairs
    }
}

/// A candidate object for [`SceneStore::add_object`](crate::SceneStore::add_object).
///
/// Missing ids and names are filled in by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObject {
    pub id: Option<ObjectId>,
    pub kind: ObjectKind,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub color: Color,
    pub surface_style: SurfaceStyle,
    pub display_name: Option<String>,
}

impl NewObject {
    /// A unit-sized object of `kind` at the origin.
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            id: None,
            kind,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            color: Color::OBJECT_BLUE,
            surface_style: SurfaceStyle::default(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn scaled(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }
}

impl NewObject {
    /// Resets vectors with non-finite components to the defaults of
    /// [`NewObject::new`]. Returns the names of the fields that were reset.
    pub(crate) fn reset_non_finite(&mut self) -> Vec<&'static str> {
        let defaults = Self::new(self.kind);
        let mut reset = Vec::new();
        for (field, value, default) in [
            ("position", &mut self.position, defaults.position),
            ("rotation", &mut self.rotation, defaults.rotation),
            ("scale", &mut self.scale, defaults.scale),
        ] {
            if !value.iter().all(|v| v.is_finite()) {
                *value = default;
                reset.push(field);
            }
        }
        reset
    }
}

impl From<&SceneObject> for NewObject {
    fn from(obj: &SceneObject) -> Self {
        Self {
            id: None,
            kind: obj.kind,
            position: obj.position,
            rotation: obj.rotation,
            scale: obj.scale,
            color: obj.color,
            surface_style: obj.surface_style,
            display_name: obj.display_name.clone(),
        }
    }
}

/// Field-wise update for an object. `None` fields are left unchanged.
///
/// Group membership is not patchable; it changes only through the group
/// operations of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub kind: Option<ObjectKind>,
    pub position: Option<[f32; 3]>,
    pub rotation: Option<[f32; 3]>,
    pub scale: Option<[f32; 3]>,
    pub color: Option<Color>,
    pub surface_style: Option<SurfaceStyle>,
}

impl ObjectPatch {
    pub fn position(position: [f32; 3]) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Applies the patch. Vectors with non-finite components are skipped.
    /// Returns true if anything changed.
    pub(crate) fn apply(&self, obj: &mut SceneObject) -> bool {
        let mut changed = false;

        if let Some(kind) = self.kind {
            changed |= replace(&mut obj.kind, kind);
        }
        for (field, value, target) in [
            ("position", self.position, &mut obj.position),
            ("rotation", self.rotation, &mut obj.rotation),
            ("scale", self.scale, &mut obj.scale),
        ] {
            let Some(value) = value else {
                continue;
            };
            if value.iter().all(|v| v.is_finite()) {
                changed |= replace(target, value);
            } else {
                tracing::warn!("[scene] ignoring non-finite {field} {value:?} for {}", obj.id);
            }
        }
        if let Some(color) = self.color {
            changed |= replace(&mut obj.color, color);
        }
        if let Some(style) = self.surface_style {
            changed |= replace(&mut obj.surface_style, style);
        }

        changed
    }
}

/// Field-wise update for the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentPatch {
    pub background_color: Option<Color>,
    pub ambient_intensity: Option<f32>,
    pub directional_light: Option<DirectionalLight>,
}

impl EnvironmentPatch {
    /// Applies the patch. Non-finite intensities and light positions are
    /// skipped.
    pub(crate) fn apply(&self, env: &mut Environment) -> bool {
        let mut changed = false;
        if let Some(color) = self.background_color {
            changed |= replace(&mut env.background_color, color);
        }
        if let Some(ambient) = self.ambient_intensity {
            if ambient.is_finite() {
                changed |= replace(&mut env.ambient_intensity, ambient);
            } else {
                tracing::warn!("[scene] ignoring non-finite ambient intensity {ambient}");
            }
        }
        if let Some(light) = self.directional_light {
            if light.is_finite() {
                changed |= replace(&mut env.directional_light, light);
            } else {
                tracing::warn!("[scene] ignoring non-finite directional light {light:?}");
            }
        }
        changed
    }
}

fn replace<T: PartialEq>(target: &mut T, value: T) -> bool {
    if *target == value {
        return false;
    }
    *target = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str) -> SceneObject {
        SceneObject {
            id: ObjectId::new(id),
            kind: ObjectKind::Cube,
            position: [0.0, 0.5, 0.0],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            color: Color::OBJECT_BLUE,
            surface_style: SurfaceStyle::Standard,
            group_id: None,
            display_name: None,
        }
    }

    fn group(id: &str, children: &[&str]) -> Group {
        Group {
            id: GroupId::new(id),
            name: id.to_string(),
            child_ids: children.iter().map(|c| ObjectId::new(*c)).collect(),
            collapsed: false,
            parent_group_id: None,
        }
    }

    #[test]
    fn test_parse_saved_map_format() {
        let json = r##"{
            "objects": [
                {
                    "id": "cube_1",
                    "type": "cube",
                    "position": [2, 0.5, -1],
                    "rotation": [0, 0, 0],
                    "scale": [1, 1, 1],
                    "color": "#4a90e2",
                    "material": "phong",
                    "parentId": "group_1",
                    "name": "Pillar"
                },
                {
                    "id": "sphere_1",
                    "type": "sphere",
                    "position": [0, 0.5, 0],
                    "rotation": [0, 0, 0],
                    "scale": [1, 2, 1],
                    "color": "#ff0000"
                }
            ],
            "groups": [
                { "id": "group_1", "name": "Walls", "children": ["cube_1"], "collapsed": true }
            ],
            "environment": {
                "backgroundColor": "#2c3e50",
                "ambientLight": 0.4,
                "directionalLight": { "intensity": 1, "position": [10, 10, 5] }
            }
        }"##;

        let scene = SceneState::from_json(json).expect("Failed to parse map");

        assert_eq!(scene.objects.len(), 2);
        let pillar = &scene.objects[0];
        assert_eq!(pillar.kind, ObjectKind::Cube);
        assert_eq!(pillar.surface_style, SurfaceStyle::Phong);
        assert_eq!(pillar.group_id, Some(GroupId::new("group_1")));
        assert_eq!(pillar.label(), "Pillar");

        let sphere = &scene.objects[1];
        assert_eq!(sphere.surface_style, SurfaceStyle::Standard);
        assert_eq!(sphere.label(), "sphere");
        assert!((sphere.top() - 1.5).abs() < 1e-6);

        assert!(scene.groups[0].collapsed);
        assert_eq!(scene.environment, Environment::default());
    }

    #[test]
    fn test_missing_groups_defaults_to_empty() {
        let json = r##"{
            "objects": [],
            "environment": {
                "backgroundColor": "#000000",
                "ambientLight": 1.5,
                "directionalLight": { "intensity": 2, "position": [0, 5, 0] }
            }
        }"##;

        let scene = SceneState::from_json(json).unwrap();
        assert!(scene.groups.is_empty());
        assert!((scene.environment.ambient_intensity - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_null_groups_defaults_to_empty() {
        let json = r##"{
            "objects": [],
            "groups": null,
            "environment": {
                "backgroundColor": "#2c3e50",
                "ambientLight": 0.4,
                "directionalLight": { "intensity": 1, "position": [10, 10, 5] }
            }
        }"##;

        let scene = SceneState::from_json(json).unwrap();
        assert!(scene.groups.is_empty());
    }

    #[test]
    fn test_terrain_block_survives_json() {
        let json = r##"{
            "objects": [],
            "groups": [],
            "terrain": {
                "width": 20,
                "height": 20,
                "segments": 2,
                "heightData": [[0, 0.5, 1], [0.25, 0, 0], [0, 0, 2]]
            },
            "environment": {
                "backgroundColor": "#2c3e50",
                "ambientLight": 0.4,
                "directionalLight": { "intensity": 1, "position": [10, 10, 5] }
            }
        }"##;

        let scene = SceneState::from_json(json).unwrap();
        let terrain = scene.terrain.as_ref().expect("terrain block");
        assert_eq!(terrain.segments, 2);
        assert_eq!(terrain.height_data[2], vec![0.0, 0.0, 2.0]);

        let text = scene.to_json().unwrap();
        assert!(text.contains("\"heightData\""));
        assert_eq!(SceneState::from_json(&text).unwrap(), scene);
    }

    #[test]
    fn test_environment_patch_skips_non_finite() {
        let mut env = Environment::default();
        let patch = EnvironmentPatch {
            ambient_intensity: Some(f32::NAN),
            directional_light: Some(DirectionalLight {
                intensity: f32::INFINITY,
                position: [0.0, 1.0, 0.0],
            }),
            background_color: Some(Color::SELECTED),
        };

        assert!(patch.apply(&mut env));
        assert_eq!(env.background_color, Color::SELECTED);
        assert!((env.ambient_intensity - 0.4).abs() < 1e-6);
        assert_eq!(env.directional_light, Environment::default().directional_light);

        let only_bad = EnvironmentPatch {
            ambient_intensity: Some(f32::NEG_INFINITY),
            ..EnvironmentPatch::default()
        };
        assert!(!only_bad.apply(&mut env));
    }

    #[test]
    fn test_new_object_resets_non_finite_vectors() {
        let mut candidate = NewObject::new(ObjectKind::Cube)
            .at([f32::INFINITY, 0.5, 0.0])
            .scaled([2.0, 2.0, 2.0]);
        candidate.rotation = [0.0, f32::NAN, 0.0];

        assert_eq!(candidate.reset_non_finite(), vec!["position", "rotation"]);
        assert_eq!(candidate.position, [0.0; 3]);
        assert_eq!(candidate.rotation, [0.0; 3]);
        assert_eq!(candidate.scale, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_serialized_field_names() {
        let mut scene = SceneState::default();
        let mut obj = object("cube_1");
        obj.group_id = Some(GroupId::new("group_1"));
        scene.objects.push(obj);
        scene.groups.push(group("group_1", &["cube_1"]));

        let json = scene.to_json().unwrap();
        assert!(json.contains("\"type\": \"cube\""));
        assert!(json.contains("\"material\": \"standard\""));
        assert!(json.contains("\"parentId\": \"group_1\""));
        assert!(json.contains("\"children\""));
        assert!(json.contains("\"ambientLight\""));
        assert!(!json.contains("terrain"));
        // Indented output
        assert!(json.contains("\n  \"objects\""));
    }

    #[test]
    fn test_normalize_consistent_scene_is_untouched() {
        let mut scene = SceneState::default();
        let mut a = object("a");
        a.group_id = Some(GroupId::new("g"));
        scene.objects.push(a);
        scene.objects.push(object("b"));
        scene.groups.push(group("g", &["a"]));

        let before = scene.clone();
        assert_eq!(scene.normalize(), 0);
        assert_eq!(scene, before);
    }

    #[test]
    fn test_normalize_repairs_links() {
        let mut scene = SceneState::default();
        let mut a = object("a");
        // Points at a group that does not list it
        a.group_id = Some(GroupId::new("g2"));
        scene.objects.push(a);
        scene.objects.push(object("b"));
        scene.objects.push(object("b"));
        scene.groups.push(group("g1", &["a", "a", "ghost"]));
        scene.groups.push(group("g2", &["a", "b"]));

        let repairs = scene.normalize();
        assert!(repairs > 0);

        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.groups[0].child_ids, vec![ObjectId::new("a")]);
        assert_eq!(scene.groups[1].child_ids, vec![ObjectId::new("b")]);
        assert_eq!(scene.objects[0].group_id, Some(GroupId::new("g1")));
        assert_eq!(scene.objects[1].group_id, Some(GroupId::new("g2")));

        // Second pass finds nothing left to fix
        assert_eq!(scene.normalize(), 0);
    }

    #[test]
    fn test_normalize_clears_dangling_parent_group() {
        let mut scene = SceneState::default();
        let mut nested = group("inner", &[]);
        nested.parent_group_id = Some(GroupId::new("missing"));
        scene.groups.push(nested);

        assert_eq!(scene.normalize(), 1);
        assert_eq!(scene.groups[0].parent_group_id, None);
    }

    #[test]
    fn test_patch_skips_non_finite_vectors() {
        let mut obj = object("a");
        let patch = ObjectPatch {
            position: Some([f32::NAN, 1.0, 0.0]),
            color: Some(Color::MIDNIGHT),
            ..ObjectPatch::default()
        };

        assert!(patch.apply(&mut obj));
        assert_eq!(obj.position, [0.0, 0.5, 0.0]);
        assert_eq!(obj.color, Color::MIDNIGHT);

        // Re-applying the same values is not a change
        assert!(!patch.apply(&mut obj));
    }

    #[test]
    fn test_object_kind_from_str() {
        assert_eq!("Sphere".parse::<ObjectKind>(), Ok(ObjectKind::Sphere));
        assert!("cone".parse::<ObjectKind>().is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ObjectId::generate(ObjectKind::Cube);
        let b = ObjectId::generate(ObjectKind::Cube);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("cube_"));
        assert!(GroupId::generate().as_str().starts_with("group_"));
    }
}
