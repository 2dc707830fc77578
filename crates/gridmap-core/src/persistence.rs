//! Scene persistence: autosave slot, import and export.
//!
//! Saving is best-effort. Failures are logged and editing continues in
//! memory; only imports report errors to the caller.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::EditorConfig;
use crate::scene::SceneState;
use crate::storage::{PersistenceError, Storage};

/// Failure to read an exchange file. The store is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("map file is empty")]
    Empty,
    #[error("malformed map file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Autosave slot of a [`Storage`] backend.
pub struct Persistence {
    storage: Box<dyn Storage>,
    key: String,
    timestamp_key: String,
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence")
            .field("key", &self.key)
            .field("timestamp_key", &self.timestamp_key)
            .finish_non_exhaustive()
    }
}

impl Persistence {
    /// Uses the storage keys configured in `config`.
    pub fn new(storage: impl Storage + 'static, config: &EditorConfig) -> Self {
        Self {
            storage: Box::new(storage),
            key: config.storage_key.clone(),
            timestamp_key: config.timestamp_key(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the saved scene. Missing or unreadable data yields the default
    /// scene.
    pub fn load(&self) -> SceneState {
        let text = match self.storage.get_item(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!("[persistence] no saved map under {}", self.key);
                return SceneState::default();
            }
            Err(err) => {
                tracing::warn!("[persistence] failed to read {}: {err}", self.key);
                return SceneState::default();
            }
        };

        match import_text(&text) {
            Ok(state) => {
                tracing::info!(
                    "[persistence] loaded {} objects, {} groups from {}",
                    state.objects.len(),
                    state.groups.len(),
                    self.key
                );
                state
            }
            Err(err) => {
                tracing::warn!("[persistence] discarding saved map {}: {err}", self.key);
                SceneState::default()
            }
        }
    }

    /// Writes the scene and the save time.
    pub fn try_save(&self, state: &SceneState) -> Result<(), PersistenceError> {
        let text = export_text(state)?;
        self.storage.set_item(&self.key, &text)?;
        self.storage
            .set_item(&self.timestamp_key, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    /// Like [`try_save`](Self::try_save), but only logs failures.
    pub fn save(&self, state: &SceneState) {
        if let Err(err) = self.try_save(state) {
            tracing::warn!("[persistence] autosave to {} failed: {err}", self.key);
        }
    }

    /// Time of the last successful save.
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        let text = self.storage.get_item(&self.timestamp_key).ok()??;
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }
}

/// Parses exchange text into a normalized scene.
pub fn import_text(text: &str) -> Result<SceneState, ImportError> {
    if text.trim().is_empty() {
        return Err(ImportError::Empty);
    }
    let mut state = SceneState::from_json(text)?;
    let repairs = state.normalize();
    if repairs > 0 {
        tracing::warn!("[persistence] repaired {repairs} inconsistent links in imported map");
    }
    Ok(state)
}

/// Exchange text for `state`: indented JSON with stable field order.
pub fn export_text(state: &SceneState) -> Result<String, serde_json::Error> {
    state.to_json()
}

/// Suggested file name for an export made on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("map_{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Group, GroupId, NewObject, ObjectId, ObjectKind, SceneObject, TerrainData};
    use crate::storage::MemoryStorage;

    fn persistence() -> (Persistence, MemoryStorage) {
        let storage = MemoryStorage::new();
        let persistence = Persistence::new(storage.clone(), &EditorConfig::default());
        (persistence, storage)
    }

    fn sample_scene() -> SceneState {
        let draft = NewObject::new(ObjectKind::Sphere).at([1.0, 0.5, -2.0]);
        let mut scene = SceneState::default();
        scene.objects.push(SceneObject {
            id: ObjectId::new("sphere_1"),
            kind: draft.kind,
            position: draft.position,
            rotation: draft.rotation,
            scale: draft.scale,
            color: draft.color,
            surface_style: draft.surface_style,
            group_id: Some(GroupId::new("group_1")),
            display_name: Some("Ball".to_string()),
        });
        scene.groups.push(Group {
            id: GroupId::new("group_1"),
            name: "Props".to_string(),
            child_ids: vec![ObjectId::new("sphere_1")],
            collapsed: true,
            parent_group_id: None,
        });
        scene
    }

    #[test]
    fn test_load_missing_returns_default() {
        let (persistence, _) = persistence();
        assert_eq!(persistence.load(), SceneState::default());
        assert_eq!(persistence.last_saved(), None);
    }

    #[test]
    fn test_load_corrupt_returns_default() {
        let (persistence, storage) = persistence();
        storage.set_item("map-editor-autosave", "{ not json").unwrap();
        assert_eq!(persistence.load(), SceneState::default());
    }

    #[test]
    fn test_save_then_load() {
        let (persistence, storage) = persistence();
        let scene = sample_scene();

        persistence.save(&scene);

        assert!(storage.get_item("map-editor-autosave").unwrap().is_some());
        assert!(persistence.last_saved().is_some());
        assert_eq!(persistence.load(), scene);
    }

    #[test]
    fn test_load_upgrades_map_without_groups() {
        let (persistence, storage) = persistence();
        storage
            .set_item(
                "map-editor-autosave",
                r##"{
                    "objects": [{
                        "id": "cube_1", "type": "cube",
                        "position": [0, 0.5, 0], "rotation": [0, 0, 0], "scale": [1, 1, 1],
                        "color": "#4a90e2", "parentId": "group_gone"
                    }],
                    "environment": {
                        "backgroundColor": "#2c3e50", "ambientLight": 0.4,
                        "directionalLight": { "intensity": 1, "position": [10, 10, 5] }
                    }
                }"##,
            )
            .unwrap();

        let scene = persistence.load();
        assert_eq!(scene.objects.len(), 1);
        assert!(scene.groups.is_empty());
        // Link to a group that does not exist is dropped
        assert_eq!(scene.objects[0].group_id, None);
    }

    #[test]
    fn test_import_export_roundtrip() {
        let scene = sample_scene();
        let text = export_text(&scene).unwrap();
        assert_eq!(import_text(&text).unwrap(), scene);
    }

    #[test]
    fn test_terrain_passes_through() {
        let (persistence, _) = persistence();
        let mut scene = sample_scene();
        scene.terrain = Some(TerrainData {
            width: 16.0,
            height: 8.0,
            segments: 2,
            height_data: vec![vec![0.0, 0.5, 1.0], vec![0.0, 0.0, 0.0], vec![2.0, 1.5, 0.25]],
        });

        let text = export_text(&scene).unwrap();
        assert!(text.contains("\"heightData\""));
        assert_eq!(import_text(&text).unwrap(), scene);

        persistence.save(&scene);
        assert_eq!(persistence.load(), scene);
    }

    #[test]
    fn test_load_accepts_null_groups() {
        let (persistence, storage) = persistence();
        storage
            .set_item(
                "map-editor-autosave",
                r##"{
                    "objects": [{
                        "id": "cube_1", "type": "cube",
                        "position": [0, 0.5, 0], "rotation": [0, 0, 0], "scale": [1, 1, 1],
                        "color": "#4a90e2"
                    }],
                    "groups": null,
                    "environment": {
                        "backgroundColor": "#2c3e50", "ambientLight": 0.4,
                        "directionalLight": { "intensity": 1, "position": [10, 10, 5] }
                    }
                }"##,
            )
            .unwrap();

        let scene = persistence.load();
        assert_eq!(scene.objects.len(), 1);
        assert!(scene.groups.is_empty());
    }

    #[test]
    fn test_import_rejects_bad_input() {
        assert!(matches!(import_text("   \n"), Err(ImportError::Empty)));
        assert!(matches!(import_text("[1, 2"), Err(ImportError::Malformed(_))));
        assert!(matches!(
            import_text(r#"{ "objects": [], "environment": { "backgroundColor": "blue" } }"#),
            Err(ImportError::Malformed(_))
        ));
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "map_2024-03-07.json");
    }
}
