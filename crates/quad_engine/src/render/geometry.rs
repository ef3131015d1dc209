//! Static quad geometry and the per-frame uniform block
//!
//! `Vertex` is plain data; its Vulkan input layout lives in
//! `vulkan::vertex_layout`.

use std::time::Duration;

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{self, Mat4Columns, Point3, Vec3};

/// Vertex with 2D position, RGB color and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space (z = 0)
    pub pos: [f32; 2],
    /// Per-vertex color
    pub color: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

/// The quad, counter-clockwise when viewed down -Z
pub const VERTICES: [Vertex; 4] = [
    Vertex { pos: [-0.5, -0.5], color: [1.0, 0.0, 0.0], tex_coord: [1.0, 0.0] },
    Vertex { pos: [0.5, -0.5], color: [0.0, 1.0, 0.0], tex_coord: [0.0, 0.0] },
    Vertex { pos: [0.5, 0.5], color: [0.0, 0.0, 1.0], tex_coord: [0.0, 1.0] },
    Vertex { pos: [-0.5, 0.5], color: [1.0, 1.0, 1.0], tex_coord: [1.0, 1.0] },
];

/// Two triangles sharing the 0-2 diagonal
pub const INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Model rotation speed in radians per second (90 degrees)
pub const ROTATION_SPEED: f32 = std::f32::consts::FRAC_PI_2;

/// Vertical field of view of the camera (45 degrees)
pub const FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_4;

/// Near clip plane
pub const Z_NEAR: f32 = 0.1;

/// Far clip plane
pub const Z_FAR: f32 = 10.0;

/// Uniform block consumed by the vertex shader at binding 0
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    /// Model transform
    pub model: Mat4Columns,
    /// View transform
    pub view: Mat4Columns,
    /// Projection transform
    pub proj: Mat4Columns,
}

impl UniformBufferObject {
    /// Transforms for a frame rendered `elapsed` after the first frame
    ///
    /// Depends only on `elapsed` and the swapchain extent, never on how many
    /// frames were drawn before.
    pub fn at(elapsed: Duration, extent: vk::Extent2D) -> Self {
        let angle = elapsed.as_secs_f32() * ROTATION_SPEED;
        let model = math::rotation_z(angle);
        let view = math::look_at(
            Point3::new(2.0, 2.0, 2.0),
            Point3::origin(),
            Vec3::z(),
        );
        let proj = math::vulkan_perspective(FIELD_OF_VIEW, aspect_ratio(extent), Z_NEAR, Z_FAR);

        Self {
            model: math::to_columns(&model),
            view: math::to_columns(&view),
            proj: math::to_columns(&proj),
        }
    }
}

/// Width over height, guarding against a zero-height surface
pub fn aspect_ratio(extent: vk::Extent2D) -> f32 {
    extent.width as f32 / extent.height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EXTENT: vk::Extent2D = vk::Extent2D { width: 800, height: 600 };

    #[test]
    fn test_quad_literals() {
        assert_eq!(VERTICES.len(), 4);
        assert_eq!(INDICES, [0, 1, 2, 2, 3, 0]);
        assert_eq!(VERTICES[3].pos, [-0.5, 0.5]);
        assert_eq!(VERTICES[0].tex_coord, [1.0, 0.0]);
        assert!(INDICES.iter().all(|&i| usize::from(i) < VERTICES.len()));
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 7 * 4);
        assert_eq!(std::mem::size_of::<UniformBufferObject>(), 3 * 64);
    }

    #[test]
    fn test_transform_depends_only_on_elapsed_time() {
        let at_two_seconds = UniformBufferObject::at(Duration::from_secs(2), EXTENT);

        // Simulate many intervening frames; the result at t = 2s must not move.
        for millis in (0..2000).step_by(7) {
            let _ = UniformBufferObject::at(Duration::from_millis(millis), EXTENT);
        }
        assert_eq!(UniformBufferObject::at(Duration::from_secs(2), EXTENT), at_two_seconds);
    }

    #[test]
    fn test_model_rotates_ninety_degrees_per_second() {
        let ubo = UniformBufferObject::at(Duration::from_secs(1), EXTENT);
        let model = crate::foundation::math::Mat4::from(ubo.model);
        let rotated = model.transform_vector(&Vec3::x());
        assert_relative_eq!(rotated, Vec3::y(), epsilon = 1e-5);

        let start = UniformBufferObject::at(Duration::ZERO, EXTENT);
        assert_eq!(start.model, math::to_columns(&crate::foundation::math::Mat4::identity()));
    }

    #[test]
    fn test_projection_tracks_extent() {
        let wide = UniformBufferObject::at(Duration::ZERO, vk::Extent2D { width: 1600, height: 600 });
        let narrow = UniformBufferObject::at(Duration::ZERO, EXTENT);
        assert!(wide.proj[0][0] < narrow.proj[0][0]);
        assert!(narrow.proj[1][1] < 0.0);
        assert_eq!(wide.view, narrow.view);
    }

    #[test]
    fn test_zero_height_extent_does_not_divide_by_zero() {
        assert!(aspect_ratio(vk::Extent2D { width: 800, height: 0 }).is_finite());
    }
}
