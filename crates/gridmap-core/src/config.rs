//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::editor::EditorMode;
use crate::grid::DEFAULT_GRID_STEP;
use crate::scene::{ObjectKind, SurfaceStyle};

/// Key under which the scene is stored; the save time goes under
/// `{key}_timestamp`.
pub const DEFAULT_STORAGE_KEY: &str = "map-editor-autosave";

/// Editor settings. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Horizontal snap interval in world units.
    pub grid_step: f32,
    pub storage_key: String,
    /// Fill for newly placed objects.
    pub default_color: Color,
    /// Kind selected when the editor starts.
    pub default_kind: ObjectKind,
    pub default_surface: SurfaceStyle,
    pub initial_mode: EditorMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_step: DEFAULT_GRID_STEP,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_color: Color::OBJECT_BLUE,
            default_kind: ObjectKind::Cube,
            default_surface: SurfaceStyle::Standard,
            initial_mode: EditorMode::Place,
        }
    }
}

impl EditorConfig {
    /// Loads a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        if !(config.grid_step > 0.0 && config.grid_step.is_finite()) {
            tracing::warn!(
                "[config] invalid grid_step {}, using {DEFAULT_GRID_STEP}",
                config.grid_step
            );
            config.grid_step = DEFAULT_GRID_STEP;
        }
        Ok(config)
    }

    /// Storage key holding the time of the last save.
    pub fn timestamp_key(&self) -> String {
        format!("{}_timestamp", self.storage_key)
    }
}
