//! Grid snapping and stacking.
//!
//! Horizontal placement is discrete: X and Z snap to the grid. The vertical
//! axis is continuous and comes from stacking or from an explicit drag, so
//! objects of any height can sit on top of each other.

use crate::scene::SceneObject;

/// Default grid step in world units.
pub const DEFAULT_GRID_STEP: f32 = 1.0;

/// Rounds `value` to the nearest multiple of `step`.
///
/// Exact halves round away from zero (`0.5 -> 1`, `-0.5 -> -1`). The result
/// is never negative zero. A non-positive or NaN step returns the value as is.
pub fn snap(value: f32, step: f32) -> f32 {
    if step.is_nan() || step <= 0.0 {
        return value;
    }
    // `+ 0.0` folds -0.0 into 0.0 so exported maps never contain "-0.0"
    (value / step).round() * step + 0.0
}

/// Snaps X and Z to the grid, leaving Y untouched.
pub fn snap_horizontal(position: [f32; 3], step: f32) -> [f32; 3] {
    [snap(position[0], step), position[1], snap(position[2], step)]
}

/// Height at which a new object placed on the cell containing `(x, z)`
/// should be centred.
///
/// The result is the highest top face among the objects in that cell (never
/// below the ground) plus half a grid step, so an empty cell yields `step / 2`.
pub fn compute_stack_height<'a>(
    x: f32,
    z: f32,
    objects: impl IntoIterator<Item = &'a SceneObject>,
    step: f32,
) -> f32 {
    let cell = (snap(x, step), snap(z, step));

    let highest_top = objects
        .into_iter()
        .filter(|obj| (snap(obj.position[0], step), snap(obj.position[2], step)) == cell)
        .map(SceneObject::top)
        .fold(0.0_f32, f32::max);

    highest_top + step / 2.0
}

/// Snapped and stacked position for a new object dropped at `(x, z)`.
pub fn placement_position<'a>(
    x: f32,
    z: f32,
    objects: impl IntoIterator<Item = &'a SceneObject>,
    step: f32,
) -> [f32; 3] {
    let x = snap(x, step);
    let z = snap(z, step);
    [x, compute_stack_height(x, z, objects, step), z]
}
