//! Drag-plane projection for moving objects with a 2D pointer.
//!
//! A drag has two degrees of freedom, so the vertical-lock modifier picks
//! the plane the pointer ray is projected onto: the horizontal plane through
//! the object, or the vertical plane through it that faces the camera.

use bevy_math::{Ray3d, Vec3};

use crate::camera::{Camera, intersect_ray_with_plane};
use crate::grid::snap;

/// New position for an object dragged along the horizontal plane at its
/// current height. X and Z snap to the grid; Y is unchanged.
pub(crate) fn horizontal_drag(ray: Ray3d, position: [f32; 3], step: f32) -> Option<[f32; 3]> {
    let height = position[1];
    let hit = intersect_ray_with_plane(ray, Vec3::Y, -height)?;
    Some([snap(hit.x, step), height, snap(hit.z, step)])
}

/// New position for an object dragged vertically. Only Y changes, and it is
/// kept at least half a grid step above the ground.
pub(crate) fn vertical_drag(
    ray: Ray3d,
    position: [f32; 3],
    camera: &Camera,
    step: f32,
) -> Option<[f32; 3]> {
    let normal = vertical_plane_normal(camera);
    let through = Vec3::from_array(position);
    let hit = intersect_ray_with_plane(ray, normal, -normal.dot(through))?;
    Some([position[0], hit.y.max(step / 2.0), position[2]])
}

/// Normal of the vertical plane facing the camera.
fn vertical_plane_normal(camera: &Camera) -> Vec3 {
    let forward = camera.target - camera.position;
    let flat = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    // Looking straight down leaves no horizontal direction to face
    if flat == Vec3::ZERO { Vec3::X } else { -flat }
}
