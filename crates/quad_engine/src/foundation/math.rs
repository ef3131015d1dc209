//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the few camera transforms the renderer
//! needs, with Vulkan's clip-space conventions applied in one place.

pub use nalgebra::{Matrix4, Point3 as NPoint3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = NPoint3<f32>;

/// Column-major matrix layout as consumed by GLSL `mat4`
pub type Mat4Columns = [[f32; 4]; 4];

/// Rotation of `angle` radians about the +Z axis
pub fn rotation_z(angle: f32) -> Mat4 {
    Mat4::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Right-handed view matrix looking from `eye` at `target`
pub fn look_at(eye: Point3, target: Point3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(&eye, &target, &up)
}

/// Right-handed perspective projection for Vulkan
///
/// Same as the OpenGL-style projection with the Y axis flipped, because
/// Vulkan's clip space has Y pointing down.
pub fn vulkan_perspective(fovy: f32, aspect: f32, znear: f32, zfar: f32) -> Mat4 {
    let mut projection = Mat4::new_perspective(aspect, fovy, znear, zfar);
    projection[(1, 1)] *= -1.0;
    projection
}

/// Convert to the column arrays GLSL expects
pub fn to_columns(matrix: &Mat4) -> Mat4Columns {
    (*matrix).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_z_quarter_turn() {
        let rotated = rotation_z(FRAC_PI_2).transform_vector(&Vec3::x());
        assert_relative_eq!(rotated, Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_vulkan_perspective_flips_y() {
        let gl = Mat4::new_perspective(4.0 / 3.0, 0.8, 0.1, 10.0);
        let vk = vulkan_perspective(0.8, 4.0 / 3.0, 0.1, 10.0);
        assert_relative_eq!(vk[(1, 1)], -gl[(1, 1)]);
        assert_relative_eq!(vk[(0, 0)], gl[(0, 0)]);
    }

    #[test]
    fn test_columns_are_column_major() {
        let translation = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let columns = to_columns(&translation);
        assert_eq!(columns[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
