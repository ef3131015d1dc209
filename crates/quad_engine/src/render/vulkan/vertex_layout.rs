//! Vulkan-specific vertex layout definitions
//!
//! Keeps `render::geometry::Vertex` free of Vulkan input state.

use ash::vk;

use crate::render::geometry::Vertex;

/// Vulkan vertex layout implementation for the quad's Vertex type
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// Byte offset of `pos`
    pub const POSITION_OFFSET: u32 = 0;
    /// Byte offset of `color`, after two position floats
    pub const COLOR_OFFSET: u32 = 8;
    /// Byte offset of `tex_coord`, after position and three color floats
    pub const TEX_COORD_OFFSET: u32 = 20;

    /// One interleaved binding advancing per vertex
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, color and texture coordinate at locations 0, 1 and 2
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: Self::POSITION_OFFSET,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: Self::COLOR_OFFSET,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: Self::TEX_COORD_OFFSET,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_offset<T>(base: &Vertex, field: &T) -> u32 {
        (field as *const T as usize - base as *const Vertex as usize) as u32
    }

    #[test]
    fn test_offsets_match_struct_layout() {
        let vertex = crate::render::geometry::VERTICES[0];
        assert_eq!(field_offset(&vertex, &vertex.pos), VulkanVertexLayout::POSITION_OFFSET);
        assert_eq!(field_offset(&vertex, &vertex.color), VulkanVertexLayout::COLOR_OFFSET);
        assert_eq!(field_offset(&vertex, &vertex.tex_coord), VulkanVertexLayout::TEX_COORD_OFFSET);
    }

    #[test]
    fn test_binding_stride() {
        let binding = VulkanVertexLayout::binding_description();
        assert_eq!(binding.stride, 28);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);

        let locations: Vec<u32> = VulkanVertexLayout::attribute_descriptions()
            .iter()
            .map(|attribute| attribute.location)
            .collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }
}
