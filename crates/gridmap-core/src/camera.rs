//! Camera model and pointer-ray geometry.
//!
//! Converts pointer coordinates into world-space rays and intersects them
//! with planes. Conventions follow the renderer: right-handed, Y up, screen
//! Y grows downwards, NDC Y grows upwards.

use bevy_math::primitives::InfinitePlane3d;
use bevy_math::{Dir3, Mat4, Ray3d, Vec2, Vec3};

/// Screen rectangle the scene is drawn into, in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// A viewport anchored at the screen origin.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Converts a pointer position to normalized device coordinates.
    ///
    /// Returns `None` for an empty viewport.
    pub fn to_ndc(&self, screen: Vec2) -> Option<Vec2> {
        if self.is_empty() {
            return None;
        }
        Some(Vec2::new(
            (screen.x - self.left) / self.width * 2.0 - 1.0,
            -((screen.y - self.top) / self.height) * 2.0 + 1.0,
        ))
    }

    /// Converts normalized device coordinates back to a pointer position.
    pub fn from_ndc(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            self.left + (ndc.x + 1.0) / 2.0 * self.width,
            self.top + (1.0 - ndc.y) / 2.0 * self.height,
        )
    }
}

/// Perspective camera looking at a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(10.0, 10.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 60_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Default lens placed at `position`, aimed at `target`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Self::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Viewing direction, if the camera is not degenerate.
    pub fn forward(&self) -> Option<Dir3> {
        Dir3::new(self.target - self.position).ok()
    }

    /// Ray from the camera through a point given in normalized device
    /// coordinates.
    pub fn ray_through_ndc(&self, ndc: Vec2, aspect_ratio: f32) -> Option<Ray3d> {
        let inverse = self.view_projection(aspect_ratio).inverse();
        // Any depth inside the frustum lies on the ray
        let through = inverse.project_point3(ndc.extend(0.5));
        let direction = Dir3::new(through - self.position).ok()?;
        Some(Ray3d {
            origin: self.position,
            direction,
        })
    }

    /// Ray from the camera through a pointer position.
    pub fn ray_from_screen(&self, screen: Vec2, viewport: &Viewport) -> Option<Ray3d> {
        let ndc = viewport.to_ndc(screen)?;
        self.ray_through_ndc(ndc, viewport.aspect_ratio())
    }

    /// Pointer position at which `point` is drawn, or `None` when the point
    /// is behind the camera.
    pub fn world_to_screen(&self, point: Vec3, viewport: &Viewport) -> Option<Vec2> {
        if viewport.is_empty() {
            return None;
        }
        let clip = self.view_projection(viewport.aspect_ratio()) * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(viewport.from_ndc(ndc.truncate()))
    }
}

/// Intersects `ray` with the plane of points `p` where
/// `normal · p + offset = 0`, with `normal` of unit length.
///
/// Returns `None` when the ray is parallel to the plane or the plane lies
/// behind the ray origin.
pub fn intersect_ray_with_plane(ray: Ray3d, normal: Vec3, offset: f32) -> Option<Vec3> {
    let normal = Dir3::new(normal).ok()?;
    let plane_origin = *normal * -offset;
    let distance = ray.intersect_plane(plane_origin, InfinitePlane3d { normal })?;
    Some(ray.get_point(distance))
}

/// World point on the ground plane (`y = 0`) under a pointer position.
pub fn screen_point_to_world_on_ground_plane(
    screen_x: f32,
    screen_y: f32,
    camera: &Camera,
    viewport: &Viewport,
) -> Option<Vec3> {
    let ray = camera.ray_from_screen(Vec2::new(screen_x, screen_y), viewport)?;
    intersect_ray_with_plane(ray, Vec3::Y, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn viewport() -> Viewport {
        Viewport {
            left: 20.0,
            top: 10.0,
            width: 800.0,
            height: 600.0,
        }
    }

    #[test]
    fn test_ndc_corners() {
        let vp = viewport();
        assert_eq!(vp.to_ndc(Vec2::new(20.0, 10.0)), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(vp.to_ndc(Vec2::new(820.0, 610.0)), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(vp.to_ndc(Vec2::new(420.0, 310.0)), Some(Vec2::ZERO));
        assert_eq!(Viewport::new(0.0, 600.0).to_ndc(Vec2::ZERO), None);
    }

    #[test]
    fn test_ndc_roundtrip() {
        let vp = viewport();
        let screen = Vec2::new(123.0, 456.0);
        let back = vp.from_ndc(vp.to_ndc(screen).unwrap());
        assert!((back - screen).length() < EPS);
    }

    #[test]
    fn test_ray_plane_intersection() {
        let ray = Ray3d {
            origin: Vec3::new(1.0, 5.0, 2.0),
            direction: Dir3::NEG_Y,
        };
        let hit = intersect_ray_with_plane(ray, Vec3::Y, 0.0).unwrap();
        assert!((hit - Vec3::new(1.0, 0.0, 2.0)).length() < EPS);

        // Plane y = 2 expressed as Y · p - 2 = 0
        let hit = intersect_ray_with_plane(ray, Vec3::Y, -2.0).unwrap();
        assert!((hit.y - 2.0).abs() < EPS);
    }

    #[test]
    fn test_ray_parallel_to_plane_misses() {
        let ray = Ray3d {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Dir3::X,
        };
        assert_eq!(intersect_ray_with_plane(ray, Vec3::Y, 0.0), None);
    }

    #[test]
    fn test_plane_behind_ray_misses() {
        let ray = Ray3d {
            origin: Vec3::new(0.0, 1.0, 0.0),
            direction: Dir3::Y,
        };
        assert_eq!(intersect_ray_with_plane(ray, Vec3::Y, 0.0), None);
    }

    #[test]
    fn test_degenerate_normal_misses() {
        let ray = Ray3d {
            origin: Vec3::ONE,
            direction: Dir3::NEG_Y,
        };
        assert_eq!(intersect_ray_with_plane(ray, Vec3::ZERO, 0.0), None);
    }

    #[test]
    fn test_screen_center_hits_camera_target() {
        let camera = Camera::looking_at(Vec3::new(0.0, 10.0, 10.0), Vec3::ZERO);
        let vp = viewport();

        let hit = screen_point_to_world_on_ground_plane(420.0, 310.0, &camera, &vp).unwrap();
        assert!(hit.length() < EPS, "hit={hit}");
    }

    #[test]
    fn test_world_to_screen_roundtrip() {
        let camera = Camera::default();
        let vp = viewport();

        for point in [
            Vec3::new(2.6, 0.0, -0.4),
            Vec3::new(-4.0, 0.0, 3.5),
            Vec3::new(0.0, 0.0, 0.0),
        ] {
            let screen = camera.world_to_screen(point, &vp).unwrap();
            let hit = screen_point_to_world_on_ground_plane(screen.x, screen.y, &camera, &vp)
                .unwrap();
            assert!((hit - point).length() < EPS, "point={point} hit={hit}");
        }
    }

    #[test]
    fn test_pointer_above_horizon_misses_ground() {
        // Level camera: the top of the screen looks at the sky
        let camera = Camera::looking_at(Vec3::new(0.0, 2.0, 10.0), Vec3::new(0.0, 2.0, 0.0));
        let vp = viewport();
        assert_eq!(
            screen_point_to_world_on_ground_plane(420.0, 10.0, &camera, &vp),
            None
        );
    }

    #[test]
    fn test_point_behind_camera_has_no_screen_position() {
        let camera = Camera::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        assert_eq!(camera.world_to_screen(Vec3::new(0.0, 0.0, 20.0), &viewport()), None);
    }
}
