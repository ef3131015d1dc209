//! Static GPU resources of the quad
//!
//! Vertex and index buffers plus the texture. Everything is uploaded once
//! through staging buffers and lives until the renderer is dropped.

use ash::vk;

use crate::render::geometry::{INDICES, VERTICES};
use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::{VulkanContext, VulkanResult};
use crate::render::vulkan::texture::{Texture, TextureData};

/// Manages the quad's geometry and texture
pub struct ResourceManager {
    texture: Texture,
    index_buffer: Buffer,
    vertex_buffer: Buffer,
}

impl ResourceManager {
    /// Upload the quad geometry and `texture_data`
    pub fn new(context: &VulkanContext, texture_data: &TextureData) -> VulkanResult<Self> {
        log::debug!("Creating ResourceManager...");

        let device = context.raw_device();
        let memory_properties = context.memory_properties();
        let queue = context.graphics_queue();
        let upload_pool = CommandPool::new(device.clone(), context.queue_families().graphics)?;

        let vertex_buffer = Buffer::device_local_with_data(
            device.clone(),
            memory_properties,
            &upload_pool,
            queue,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &VERTICES,
        )?;
        let index_buffer = Buffer::device_local_with_data(
            device.clone(),
            memory_properties,
            &upload_pool,
            queue,
            vk::BufferUsageFlags::INDEX_BUFFER,
            &INDICES,
        )?;

        let texture = Texture::new(
            device,
            memory_properties,
            &upload_pool,
            queue,
            texture_data,
            context.physical_device().max_sampler_anisotropy(),
        )?;

        log::debug!(
            "Uploaded {} vertices, {} indices and a {}x{} texture",
            VERTICES.len(),
            INDICES.len(),
            texture_data.width(),
            texture_data.height()
        );

        Ok(Self {
            texture,
            index_buffer,
            vertex_buffer,
        })
    }

    /// Device-local vertex buffer
    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer.handle()
    }

    /// Device-local index buffer
    pub fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer.handle()
    }

    /// Number of indices in the index buffer
    pub fn index_count(&self) -> u32 {
        INDICES.len() as u32
    }

    /// The sampled texture
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}
