//! Gridmap Core Library
//!
//! Headless core of a grid-snapped 3D map editor: pointer-ray geometry and
//! snapping, the scene store, the interaction state machine and scene
//! persistence. Rendering and UI panels live outside this crate and talk to
//! it through [`Editor`] and [`RenderSnapshot`].

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod camera;
pub mod color;
pub mod config;
pub mod editor;
pub mod grid;
pub mod persistence;
pub mod scene;
pub mod storage;
pub mod store;

pub use bevy_math::{Vec2, Vec3};
pub use camera::{
    Camera, Viewport, intersect_ray_with_plane, screen_point_to_world_on_ground_plane,
};
pub use color::{Color, ColorParseError};
pub use config::{DEFAULT_STORAGE_KEY, EditorConfig};
pub use editor::{
    CursorStyle, DragState, Editor, EditorCommand, EditorMode, Pointer, PointerOutcome,
    PointerTarget, RenderSnapshot, View,
};
pub use grid::{DEFAULT_GRID_STEP, compute_stack_height, placement_position, snap, snap_horizontal};
pub use persistence::{ImportError, Persistence, export_file_name, export_text, import_text};
pub use scene::{
    DirectionalLight, Environment, EnvironmentPatch, Group, GroupId, NewObject, ObjectId,
    ObjectKind, ObjectPatch, SceneObject, SceneState, SurfaceStyle, TerrainData,
};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use storage::{FileStorage, MemoryStorage, PersistenceError, Storage};
pub use store::{SceneError, SceneStore, Selection};
