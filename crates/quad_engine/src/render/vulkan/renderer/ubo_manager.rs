//! Uniform buffers and descriptor sets
//!
//! Every frame slot owns a persistently mapped uniform buffer and a
//! descriptor set pointing at it and at the shared texture. A slot's buffer
//! is only written after the slot's fence was waited on.

use ash::vk;

use crate::render::geometry::UniformBufferObject;
use crate::render::vulkan::buffer::MappedUniformBuffer;
use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::descriptor_set::{
    quad_layout_builder, write_quad_descriptors, DescriptorPool, DescriptorSetLayout,
};
use crate::render::vulkan::texture::Texture;

/// Manages per-slot uniform buffers and their descriptor sets
pub struct UboManager {
    descriptor_sets: Vec<vk::DescriptorSet>,
    // Sets are freed with the pool
    _descriptor_pool: DescriptorPool,
    uniform_buffers: Vec<MappedUniformBuffer<UniformBufferObject>>,
    layout: DescriptorSetLayout,
}

impl UboManager {
    /// Create `frames` uniform buffers and descriptor sets bound to `texture`
    pub fn new(context: &VulkanContext, texture: &Texture, frames: usize) -> VulkanResult<Self> {
        log::debug!("Creating UboManager...");

        let device = context.raw_device();
        let layout = quad_layout_builder().build(&device)?;

        let uniform_buffers = (0..frames)
            .map(|_| MappedUniformBuffer::new(device.clone(), context.memory_properties()))
            .collect::<VulkanResult<Vec<_>>>()?;

        let descriptor_pool = DescriptorPool::new(device.clone(), frames as u32)?;
        let layouts = vec![layout.handle(); frames];
        let descriptor_sets = descriptor_pool.allocate_descriptor_sets(&layouts)?;

        let image_info = vk::DescriptorImageInfo {
            sampler: texture.sampler(),
            image_view: texture.image_view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        };
        for (&set, uniform) in descriptor_sets.iter().zip(&uniform_buffers) {
            let buffer_info = vk::DescriptorBufferInfo {
                buffer: uniform.handle(),
                offset: 0,
                range: uniform.range(),
            };
            write_quad_descriptors(&device, set, buffer_info, image_info);
        }

        Ok(Self {
            descriptor_sets,
            _descriptor_pool: descriptor_pool,
            uniform_buffers,
            layout,
        })
    }

    /// Write the transforms of `slot`
    pub fn update(&mut self, slot: usize, ubo: &UniformBufferObject) -> VulkanResult<()> {
        let buffer = self.uniform_buffers.get_mut(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("No uniform buffer for frame slot {slot}"),
        })?;
        buffer.write(ubo);
        Ok(())
    }

    /// Descriptor set of `slot`
    pub fn descriptor_set(&self, slot: usize) -> VulkanResult<vk::DescriptorSet> {
        self.descriptor_sets
            .get(slot)
            .copied()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No descriptor set for frame slot {slot}"),
            })
    }

    /// Layout shared by every slot's set
    pub fn layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }
}
