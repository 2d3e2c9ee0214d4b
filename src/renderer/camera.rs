//! First-person camera

use glam::{Mat4, Quat, Vec3};

/// Default movement speed in units per second
pub const DEFAULT_SPEED: f32 = 2.5;
/// Default mouse sensitivity in degrees per pixel
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
/// Widest field of view the scroll wheel can reach, in degrees
pub const MAX_ZOOM: f32 = 45.0;
/// Narrowest field of view the scroll wheel can reach, in degrees
pub const MIN_ZOOM: f32 = 1.0;

/// Keyboard-driven movement directions, independent of the windowing system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Perspective camera for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Direction the camera is looking at
    pub direction: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub zoom: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Units per second for keyboard movement
    pub movement_speed: f32,
    /// Degrees of rotation per pixel of mouse movement
    pub mouse_sensitivity: f32,
    /// Yaw angle (rotation around Y axis), radians
    yaw: f32,
    /// Pitch angle (rotation around X axis), radians
    pitch: f32,
}

impl Camera {
    /// Create a new camera with default settings
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            zoom: MAX_ZOOM,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            yaw: -90.0_f32.to_radians(),
            pitch: 0.0,
        }
    }

    /// Create a camera at a specific position looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self::new();
        camera.position = position;
        camera.up = up;
        camera.set_direction(target - position);
        camera
    }

    /// Point the camera along `direction`, keeping yaw and pitch in sync
    pub fn set_direction(&mut self, direction: Vec3) {
        let direction = direction.normalize_or(Vec3::NEG_Z);
        self.direction = direction;
        self.yaw = direction.z.atan2(direction.x);
        self.pitch = direction.y.clamp(-1.0, 1.0).asin();
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Get the right vector
    pub fn right(&self) -> Vec3 {
        self.direction.cross(self.up).normalize_or(Vec3::X)
    }

    /// Move along the view direction or its right vector
    pub fn process_keyboard(&mut self, movement: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match movement {
            CameraMovement::Forward => self.position += self.direction * velocity,
            CameraMovement::Backward => self.position -= self.direction * velocity,
            CameraMovement::Left => self.position -= self.right() * velocity,
            CameraMovement::Right => self.position += self.right() * velocity,
        }
    }

    /// Rotate the view by a mouse offset in pixels.
    ///
    /// Screen y grows downward, so a positive `offset_y` looks down.
    pub fn process_mouse_movement(&mut self, offset_x: f32, offset_y: f32) {
        self.yaw += (offset_x * self.mouse_sensitivity).to_radians();
        self.pitch -= (offset_y * self.mouse_sensitivity).to_radians();

        let max_pitch = 89.0_f32.to_radians();
        self.pitch = self.pitch.clamp(-max_pitch, max_pitch);

        self.direction = Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize();
        self.up = Vec3::Y;
    }

    /// Narrow or widen the field of view with the scroll wheel
    pub fn process_mouse_scroll(&mut self, offset_y: f32) {
        self.zoom = (self.zoom - offset_y).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Circle around `center`: `offset` is rotated about +Y by
    /// `-2 * elapsed / 3` radians and the camera looks back at the center.
    pub fn orbit(&mut self, center: Vec3, offset: Vec3, elapsed: f32) {
        let rotation = Quat::from_rotation_y(-2.0 * elapsed / 3.0);
        self.position = center + rotation * offset;
        self.up = Vec3::Y;
        self.set_direction(center - self.position);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_keyboard_movement() {
        let mut camera = Camera::new();
        camera.process_keyboard(CameraMovement::Forward, 2.0);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, -5.0)));

        camera.process_keyboard(CameraMovement::Right, 1.0);
        assert!(approx(camera.position, Vec3::new(2.5, 0.0, -5.0)));

        camera.process_keyboard(CameraMovement::Left, 1.0);
        camera.process_keyboard(CameraMovement::Backward, 2.0);
        assert!(approx(camera.position, Vec3::ZERO));
    }

    #[test]
    fn test_mouse_movement_clamps_pitch() {
        let mut camera = Camera::new();
        // Far more than 90 degrees upward
        camera.process_mouse_movement(0.0, -5000.0);
        assert!(camera.direction.y > 0.99);
        assert!(camera.direction.y < 1.0);
        assert!(camera.right().is_finite());
    }

    #[test]
    fn test_mouse_movement_yaw() {
        let mut camera = Camera::new();
        // 900 px * 0.1 deg/px = 90 degrees to the right
        camera.process_mouse_movement(900.0, 0.0);
        assert!(approx(camera.direction, Vec3::X));
    }

    #[test]
    fn test_scroll_zoom_is_clamped() {
        let mut camera = Camera::new();
        camera.process_mouse_scroll(10.0);
        assert!((camera.zoom - 35.0).abs() < 1e-5);

        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom, MIN_ZOOM);

        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom, MAX_ZOOM);
    }

    #[test]
    fn test_orbit_looks_at_center() {
        let mut camera = Camera::new();
        let offset = Vec3::new(20.0, 10.0, 20.0);

        camera.orbit(Vec3::ZERO, offset, 0.0);
        assert!(approx(camera.position, offset));
        assert!(approx(camera.direction, (-offset).normalize()));

        // Half a turn takes 1.5 * pi seconds
        camera.orbit(Vec3::ZERO, offset, 1.5 * std::f32::consts::PI);
        assert!(approx(camera.position, Vec3::new(-20.0, 10.0, -20.0)));
        assert!((camera.position.length() - offset.length()).abs() < 1e-3);
    }

    #[test]
    fn test_orbit_straight_above_keeps_right_vector_finite() {
        let mut camera = Camera::new();
        camera.orbit(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0), 0.0);
        assert!(approx(camera.direction, Vec3::NEG_Y));
        assert!(approx(camera.right(), Vec3::X));

        camera.process_keyboard(CameraMovement::Right, 1.0);
        assert!(camera.position.is_finite());
        assert!(approx(camera.position, Vec3::new(2.5, 10.0, 0.0)));
    }

    #[test]
    fn test_look_at_then_mouse_keeps_direction_continuous() {
        let mut camera = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let before = camera.direction;
        camera.process_mouse_movement(0.0, 0.0);
        assert!(approx(camera.direction, before));
    }
}
