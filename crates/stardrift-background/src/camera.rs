//! Perspective camera with pointer-driven parallax easing.

use glam::{Mat4, Vec2, Vec3};
use stardrift_core::{CAMERA_DISTANCE, CAMERA_FAR, CAMERA_FOV_DEG, CAMERA_NEAR};

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    /// Width / height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    view: Mat4,
    projection: Mat4,
}

impl PerspectiveCamera {
    /// Camera at the origin looking down -Z.
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// The backdrop camera: 75°, 0.1..2000, 70 units back and aimed at the origin.
    pub fn backdrop(aspect: f32) -> Self {
        let mut camera = Self::new(CAMERA_FOV_DEG, aspect, CAMERA_NEAR, CAMERA_FAR);
        camera.position.z = CAMERA_DISTANCE;
        camera.look_at(Vec3::ZERO);
        camera
    }

    /// Recompute the projection after changing fov, aspect or clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_deg.to_radians(),
            self.aspect.max(f32::EPSILON),
            self.near,
            self.far,
        );
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    /// Orient the camera towards `target`, keeping +Y up.
    pub fn look_at(&mut self, target: Vec3) {
        self.view = Mat4::look_at_rh(self.position, target, Vec3::Y);
    }

    /// Move x and y a `factor` fraction of the remaining distance to `target`.
    pub fn ease_toward(&mut self, target: Vec2, factor: f32) {
        self.position.x += (target.x - self.position.x) * factor;
        self.position.y += (target.y - self.position.y) * factor;
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backdrop_defaults() {
        let camera = PerspectiveCamera::backdrop(1.5);
        assert_eq!(camera.fov_deg, 75.0);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 2000.0);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 70.0));
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = PerspectiveCamera::backdrop(2.0);
        let clip = camera.projection_matrix() * camera.view_matrix() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn test_look_at_keeps_origin_centered_after_move() {
        let mut camera = PerspectiveCamera::backdrop(1.0);
        camera.position.x = 3.0;
        camera.position.y = -2.0;
        camera.look_at(Vec3::ZERO);
        let view = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(view.x.abs() < 1e-4);
        assert!(view.y.abs() < 1e-4);
        assert!(view.z < 0.0);
    }

    #[test]
    fn test_ease_moves_fraction_of_remaining_distance() {
        let mut camera = PerspectiveCamera::backdrop(1.0);
        camera.ease_toward(Vec2::new(4.0, -4.0), 0.06);
        assert!((camera.position.x - 0.24).abs() < 1e-6);
        assert!((camera.position.y + 0.24).abs() < 1e-6);
        assert_eq!(camera.position.z, 70.0);
    }

    #[test]
    fn test_set_aspect_updates_projection() {
        let mut camera = PerspectiveCamera::backdrop(1.0);
        let before = camera.projection_matrix();
        camera.set_aspect(2.0);
        assert_eq!(camera.aspect, 2.0);
        assert_ne!(camera.projection_matrix(), before);
    }
}
