//! Vulkan renderer
//!
//! [`QuadRenderer`] owns every Vulkan resource and delegates frame ordering
//! to [`FrameScheduler`]. The managers each own one concern:
//!
//! - `SwapchainManager`: swapchain, render pass, framebuffers
//! - `ResourceManager`: vertex/index buffers and the texture
//! - `UboManager`: per-slot uniform buffers and descriptor sets
//! - `FrameCommands`: per-slot command buffers
//! - `SyncManager`: per-slot semaphores and fences

pub mod command_recorder;
pub mod resource_manager;
pub mod swapchain_manager;
pub mod sync_manager;
pub mod ubo_manager;

use std::time::Duration;

use ash::vk;

pub use command_recorder::{DrawCommandSink, FrameCommands, QuadDraw};
pub use resource_manager::ResourceManager;
pub use swapchain_manager::SwapchainManager;
pub use sync_manager::SyncManager;
pub use ubo_manager::UboManager;

use crate::core::config::{RendererConfig, MAX_FRAMES_IN_FLIGHT};
use crate::render::frame::{AcquireOutcome, FrameBackend, FrameOutcome, FrameScheduler, PresentOutcome};
use crate::render::geometry::UniformBufferObject;
use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::shader::{GraphicsPipeline, ShaderBytecode};
use crate::render::vulkan::texture::TextureData;
use crate::render::vulkan::window::{is_zero_area, Window};

/// Every Vulkan object the renderer owns
///
/// Fields are in reverse creation order so they drop dependents first and
/// the context last.
struct RenderComponents {
    sync: SyncManager,
    commands: FrameCommands,
    pipeline: GraphicsPipeline,
    ubos: UboManager,
    resources: ResourceManager,
    swapchain: SwapchainManager,
    shaders: ShaderBytecode,
    context: VulkanContext,
}

/// Renders one textured quad with frames in flight
pub struct QuadRenderer {
    scheduler: FrameScheduler,
    components: RenderComponents,
}

impl QuadRenderer {
    /// Create the renderer for `window`
    ///
    /// Shaders and texture pixels are loaded by the caller so that file and
    /// decoding errors surface before any Vulkan object exists.
    pub fn new(
        window: &mut Window,
        config: &RendererConfig,
        shaders: &ShaderBytecode,
        texture: &TextureData,
    ) -> VulkanResult<Self> {
        log::debug!("Creating QuadRenderer...");

        texture.validate()?;

        let context = VulkanContext::new(window, &config.application_name)?;
        log::info!("Using GPU: {}", context.physical_device().name());

        let swapchain = SwapchainManager::new(&context, window.framebuffer_extent())?;
        let resources = ResourceManager::new(&context, texture)?;
        let ubos = UboManager::new(&context, resources.texture(), MAX_FRAMES_IN_FLIGHT)?;
        let pipeline = GraphicsPipeline::new(context.raw_device(), swapchain.render_pass(), shaders, ubos.layout())?;
        let commands = FrameCommands::new(&context, MAX_FRAMES_IN_FLIGHT)?;
        let sync = SyncManager::new(&context, MAX_FRAMES_IN_FLIGHT)?;

        let scheduler = FrameScheduler::new(MAX_FRAMES_IN_FLIGHT, swapchain.image_count());

        log::info!("QuadRenderer initialized");

        Ok(Self {
            scheduler,
            components: RenderComponents {
                sync,
                commands,
                pipeline,
                ubos,
                resources,
                swapchain,
                shaders: shaders.clone(),
                context,
            },
        })
    }

    /// Draw one frame at `elapsed` since the first frame
    ///
    /// `window` is needed when the swapchain has to be rebuilt: a minimized
    /// window blocks here until it is restored.
    pub fn draw_frame(&mut self, window: &mut Window, elapsed: Duration) -> VulkanResult<FrameOutcome> {
        let mut frame = VulkanFrame {
            components: &mut self.components,
            window,
        };
        self.scheduler.draw_frame(&mut frame, elapsed)
    }

    /// Rebuild the swapchain after the next present
    pub fn notify_resized(&mut self) {
        self.scheduler.notify_resized();
    }

    /// Block until the GPU finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.components.context.wait_idle()
    }

    /// Frame ordering state
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Current swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.components.swapchain.extent()
    }

    /// Name of the GPU in use
    pub fn device_name(&self) -> String {
        self.components.context.physical_device().name()
    }
}

impl Drop for QuadRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            log::error!("Failed to wait for device idle during renderer drop: {e}");
        }
        log::debug!("QuadRenderer dropped");
    }
}

/// One frame's view of the renderer, borrowed for the scheduler
struct VulkanFrame<'a> {
    components: &'a mut RenderComponents,
    window: &'a mut Window,
}

impl FrameBackend for VulkanFrame<'_> {
    type Error = VulkanError;

    fn wait_for_slot(&mut self, slot: usize) -> VulkanResult<()> {
        self.components.sync.wait(slot)
    }

    fn acquire_image(&mut self, slot: usize) -> VulkanResult<AcquireOutcome> {
        let semaphore = self.components.sync.image_available(slot)?;
        Ok(match self.components.swapchain.swapchain().acquire_next_image(semaphore)? {
            Some((image_index, suboptimal)) => AcquireOutcome::Acquired { image_index, suboptimal },
            None => AcquireOutcome::OutOfDate,
        })
    }

    fn record_commands(&mut self, slot: usize, image_index: u32) -> VulkanResult<()> {
        let components = &mut *self.components;
        let draw = QuadDraw {
            render_pass: components.swapchain.render_pass(),
            framebuffer: components.swapchain.framebuffer(image_index)?,
            extent: components.swapchain.extent(),
            pipeline: components.pipeline.handle(),
            pipeline_layout: components.pipeline.layout(),
            vertex_buffer: components.resources.vertex_buffer(),
            index_buffer: components.resources.index_buffer(),
            index_count: components.resources.index_count(),
            descriptor_set: components.ubos.descriptor_set(slot)?,
        };
        components.commands.record(slot, &draw)?;
        Ok(())
    }

    fn update_uniforms(&mut self, slot: usize, elapsed: Duration) -> VulkanResult<()> {
        let ubo = UniformBufferObject::at(elapsed, self.components.swapchain.extent());
        self.components.ubos.update(slot, &ubo)
    }

    fn submit(&mut self, slot: usize) -> VulkanResult<()> {
        let components = &*self.components;
        let sync = components.sync.frame(slot)?;
        let command_buffer = components
            .commands
            .command_buffer(slot)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No command buffer for frame slot {slot}"),
            })?;

        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished.handle()];
        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        // Reset only once work is certain to be submitted
        sync.in_flight.reset()?;
        unsafe {
            components
                .context
                .device()
                .device
                .queue_submit(components.context.graphics_queue(), &[submit_info], sync.in_flight.handle())
                .map_err(VulkanError::Api)
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> VulkanResult<PresentOutcome> {
        let wait = self.components.sync.render_finished(slot)?;
        let queue = self.components.context.present_queue();
        Ok(match self.components.swapchain.swapchain().present(queue, image_index, wait)? {
            Some(false) => PresentOutcome::Presented,
            Some(true) => PresentOutcome::Suboptimal,
            None => PresentOutcome::OutOfDate,
        })
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<usize> {
        let extent = self.window.wait_while_minimized();
        let components = &mut *self.components;
        if is_zero_area(extent) {
            // Only reachable when the window closed while minimized
            log::debug!("Window closed while minimized, keeping the current swapchain");
            return Ok(components.swapchain.image_count());
        }

        let render_pass_rebuilt = components.swapchain.recreate(&components.context, extent)?;
        if render_pass_rebuilt {
            components.pipeline = GraphicsPipeline::new(
                components.context.raw_device(),
                components.swapchain.render_pass(),
                &components.shaders,
                components.ubos.layout(),
            )?;
        }

        Ok(components.swapchain.image_count())
    }
}
