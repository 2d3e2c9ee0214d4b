//! Components attached to scene entities

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Transform component for position, rotation, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation, XYZ Euler rotation in degrees and scale
    pub fn from_euler_degrees(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                rotation.x.to_radians(),
                rotation.y.to_radians(),
                rotation.z.to_radians(),
            ),
            scale,
        }
    }

    /// Scale, then rotate, then translate
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Name component for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_order() {
        // Magazine placement: translate, rotate 180 about Y, scale 0.05
        let t = Transform::from_euler_degrees(
            Vec3::new(0.0, -0.9, 0.0),
            Vec3::new(0.0, 180.0, 0.0),
            Vec3::splat(0.05),
        );
        let expected = Mat4::from_translation(Vec3::new(0.0, -0.9, 0.0))
            * Mat4::from_rotation_y(std::f32::consts::PI)
            * Mat4::from_scale(Vec3::splat(0.05));
        assert!(t.matrix().abs_diff_eq(expected, 1e-5));

        let p = t.matrix().transform_point3(Vec3::new(20.0, 0.0, 0.0));
        assert!((p - Vec3::new(-1.0, -0.9, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_quad_lies_flat() {
        // The ground quad faces +Z; -90 degrees about X turns it upwards
        let t = Transform::from_euler_degrees(
            Vec3::new(0.0, -5.0, 0.0),
            Vec3::new(-90.0, 0.0, 0.0),
            Vec3::splat(30.0),
        );
        let normal = t.matrix().transform_vector3(Vec3::Z).normalize();
        assert!((normal - Vec3::Y).length() < 1e-5);
        assert_eq!(Transform::new().matrix(), Mat4::IDENTITY);
        assert_eq!(Name::new("ak47").to_string(), "ak47");
    }
}
