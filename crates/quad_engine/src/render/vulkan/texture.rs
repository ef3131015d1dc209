//! Vulkan texture management
//!
//! Decoded pixels ([`TextureData`]) are uploaded through a staging buffer into
//! a device-local sRGB image, which is then sampled through one sampler.
//!
//! ```text
//! UNDEFINED --(barrier)--> TRANSFER_DST_OPTIMAL --(copy)--> --(barrier)--> SHADER_READ_ONLY_OPTIMAL
//! ```

use ash::{vk, Device};

use super::buffer::{allocate_memory, Buffer};
use super::commands::CommandPool;
use super::context::{VulkanError, VulkanResult};

/// Format of every uploaded texture
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

const BYTES_PER_PIXEL: usize = 4;

const COLOR_SUBRESOURCE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// RGBA8 pixels ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureData {
    /// Wrap tightly packed RGBA8 pixels, checking the size matches
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> VulkanResult<Self> {
        let data = Self { width, height, pixels };
        data.validate()?;
        Ok(data)
    }

    /// Two-tone checkerboard with `cell`-pixel squares
    pub fn checkerboard(width: u32, height: u32, cell: u32) -> Self {
        let cell = cell.max(1);
        let light: [u8; 4] = [235, 235, 235, 255];
        let dark: [u8; 4] = [40, 40, 48, 255];

        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x / cell) + (y / cell)) % 2 == 0))
            .flat_map(|is_light| if is_light { light } else { dark })
            .collect();

        Self { width, height, pixels }
    }

    /// Check dimensions are non-zero and the pixel count matches them
    pub fn validate(&self) -> VulkanResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VulkanError::InvalidTexture(format!(
                "Texture has zero size ({}x{})",
                self.width, self.height
            )));
        }

        let expected = self.width as usize * self.height as usize * BYTES_PER_PIXEL;
        if self.pixels.len() != expected {
            return Err(VulkanError::InvalidTexture(format!(
                "Expected {expected} bytes for {}x{} RGBA8, got {}",
                self.width,
                self.height,
                self.pixels.len()
            )));
        }
        Ok(())
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// Barrier parameters for one supported image layout change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    /// Accesses that must complete before the transition
    pub src_access: vk::AccessFlags,
    /// Accesses that wait for the transition
    pub dst_access: vk::AccessFlags,
    /// Stage the barrier waits on
    pub src_stage: vk::PipelineStageFlags,
    /// Stage that waits on the barrier
    pub dst_stage: vk::PipelineStageFlags,
}

impl LayoutTransition {
    /// Barrier recipe for `old -> new`
    ///
    /// Only the two transitions of a texture upload are supported; anything
    /// else is a programming error.
    pub fn between(old: vk::ImageLayout, new: vk::ImageLayout) -> VulkanResult<Self> {
        match (old, new) {
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(Self {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            }),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => Ok(Self {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            }),
            _ => Err(VulkanError::UnsupportedLayoutTransition { old, new }),
        }
    }
}

/// Record and run a layout transition for the whole color image
pub fn transition_image_layout(
    command_pool: &CommandPool,
    queue: vk::Queue,
    image: vk::Image,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) -> VulkanResult<()> {
    let transition = LayoutTransition::between(old, new)?;

    command_pool.run_single_time(queue, |device, command_buffer| {
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old)
            .new_layout(new)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(COLOR_SUBRESOURCE)
            .src_access_mask(transition.src_access)
            .dst_access_mask(transition.dst_access)
            .build();

        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                transition.src_stage,
                transition.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    })
}

/// Copy tightly packed pixels from `buffer` into `image`
pub fn copy_buffer_to_image(
    command_pool: &CommandPool,
    queue: vk::Queue,
    buffer: vk::Buffer,
    image: vk::Image,
    extent: vk::Extent2D,
) -> VulkanResult<()> {
    command_pool.run_single_time(queue, |device, command_buffer| {
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .build();

        unsafe {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    })
}

/// Sampled texture: image, memory, view and sampler
pub struct Texture {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
}

impl Texture {
    /// Upload `data` and create its view and sampler
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        data: &TextureData,
        max_anisotropy: f32,
    ) -> VulkanResult<Self> {
        data.validate()?;
        let extent = data.extent();

        let staging = Buffer::staging(device.clone(), memory_properties, data.pixels())?;

        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(TEXTURE_FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.create_image(&image_create_info, None).map_err(VulkanError::Api)? };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match allocate_memory(&device, memory_properties, requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // Null view and sampler are valid to destroy if a later step fails
        let mut texture = Self {
            device,
            image,
            memory,
            image_view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
        };

        unsafe {
            texture
                .device
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        transition_image_layout(
            command_pool,
            queue,
            image,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )?;
        copy_buffer_to_image(command_pool, queue, staging.handle(), image, extent)?;
        transition_image_layout(
            command_pool,
            queue,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )?;

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(COLOR_SUBRESOURCE);
        texture.image_view = unsafe {
            texture
                .device
                .create_image_view(&view_info, None)
                .map_err(VulkanError::Api)?
        };

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0);
        texture.sampler = unsafe {
            texture
                .device
                .create_sampler(&sampler_info, None)
                .map_err(VulkanError::Api)?
        };

        log::debug!("Texture uploaded: {}x{}", extent.width, extent.height);
        Ok(texture)
    }

    /// Image view handle
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Sampler handle
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transitions() {
        let to_transfer =
            LayoutTransition::between(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(to_transfer.src_access, vk::AccessFlags::empty());
        assert_eq!(to_transfer.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_transfer.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(to_transfer.dst_stage, vk::PipelineStageFlags::TRANSFER);

        let to_shader = LayoutTransition::between(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(to_shader.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(to_shader.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(to_shader.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(to_shader.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_unsupported_transition_is_an_error() {
        let result = LayoutTransition::between(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );
        assert!(matches!(
            result,
            Err(VulkanError::UnsupportedLayoutTransition {
                old: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                new: vk::ImageLayout::PRESENT_SRC_KHR,
            })
        ));
    }

    #[test]
    fn test_checkerboard() {
        let board = TextureData::checkerboard(4, 2, 2);
        assert!(board.validate().is_ok());
        assert_eq!(board.pixels().len(), 4 * 2 * 4);
        assert_eq!(&board.pixels()[0..4], &[235, 235, 235, 255]);
        assert_eq!(&board.pixels()[8..12], &[40, 40, 48, 255]);
    }

    #[test]
    fn test_texture_data_validation() {
        assert!(TextureData::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            TextureData::from_rgba(2, 2, vec![0; 15]),
            Err(VulkanError::InvalidTexture(_))
        ));
        assert!(TextureData::from_rgba(0, 2, Vec::new()).is_err());
    }
}
