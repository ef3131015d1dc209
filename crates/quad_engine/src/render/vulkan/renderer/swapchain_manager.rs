//! Swapchain-sized resources
//!
//! The swapchain, the render pass that targets its format, and one
//! framebuffer per swapchain image. Recreation rebuilds them together.

use ash::vk;

use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::framebuffer::Framebuffer;
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::swapchain::Swapchain;

/// True when a swapchain in `new` can no longer use a render pass built for `old`
pub fn render_pass_outdated(old: vk::Format, new: vk::Format) -> bool {
    old != new
}

/// Swap freshly built targets in for the live ones
///
/// Old framebuffers are dropped before the old render pass and the old
/// swapchain, whose views and pass they reference.
fn install_targets<S, P, F>(
    live: (&mut S, &mut P, &mut Vec<F>),
    swapchain: S,
    render_pass: Option<P>,
    framebuffers: Vec<F>,
) {
    let (live_swapchain, live_pass, live_framebuffers) = live;
    drop(std::mem::replace(live_framebuffers, framebuffers));
    if let Some(render_pass) = render_pass {
        drop(std::mem::replace(live_pass, render_pass));
    }
    drop(std::mem::replace(live_swapchain, swapchain));
}

/// Manages the swapchain and its dependent render targets
pub struct SwapchainManager {
    // Drop order: framebuffers, then the pass, then the swapchain
    framebuffers: Vec<Framebuffer>,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

impl SwapchainManager {
    /// Create the swapchain for a framebuffer of `extent`
    pub fn new(context: &VulkanContext, extent: vk::Extent2D) -> VulkanResult<Self> {
        log::debug!("Creating SwapchainManager...");

        let swapchain = Swapchain::new(context, extent)?;
        let render_pass = RenderPass::new_color_pass(context.raw_device(), swapchain.format().format)?;
        let framebuffers = Framebuffer::for_views(
            &context.raw_device(),
            render_pass.handle(),
            swapchain.image_views(),
            swapchain.extent(),
        )?;

        log::debug!(
            "Swapchain ready: {} images, {}x{}",
            swapchain.image_count(),
            swapchain.extent().width,
            swapchain.extent().height
        );

        Ok(Self {
            framebuffers,
            render_pass,
            swapchain,
        })
    }

    /// Rebuild everything for a framebuffer of `extent`
    ///
    /// Waits for the device to go idle first. The old swapchain is handed to
    /// the new one and destroyed afterwards. Returns `true` when the render
    /// pass had to be rebuilt, which invalidates pipelines created against it.
    ///
    /// Every replacement is built before anything live is touched, so an
    /// error leaves the current swapchain, pass and framebuffers in place.
    pub fn recreate(&mut self, context: &VulkanContext, extent: vk::Extent2D) -> VulkanResult<bool> {
        context.wait_idle()?;

        let swapchain = Swapchain::recreate(context, extent, &self.swapchain)?;

        let old_format = self.swapchain.format().format;
        let new_format = swapchain.format().format;
        let render_pass = if render_pass_outdated(old_format, new_format) {
            log::info!("Surface format changed from {old_format:?} to {new_format:?}, rebuilding render pass");
            Some(RenderPass::new_color_pass(context.raw_device(), new_format)?)
        } else {
            None
        };
        let rebuild_pass = render_pass.is_some();

        let pass_handle = render_pass.as_ref().map_or(self.render_pass.handle(), RenderPass::handle);
        let framebuffers = Framebuffer::for_views(
            &context.raw_device(),
            pass_handle,
            swapchain.image_views(),
            swapchain.extent(),
        )?;

        install_targets(
            (&mut self.swapchain, &mut self.render_pass, &mut self.framebuffers),
            swapchain,
            render_pass,
            framebuffers,
        );

        log::debug!(
            "Swapchain recreated: {} images, {}x{}",
            self.swapchain.image_count(),
            self.swapchain.extent().width,
            self.swapchain.extent().height
        );

        Ok(rebuild_pass)
    }

    /// The swapchain
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Current swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    /// Number of swapchain images
    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// Render pass matching the swapchain format
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    /// Framebuffer wrapping swapchain image `image_index`
    pub fn framebuffer(&self, image_index: u32) -> VulkanResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No framebuffer for swapchain image {image_index}"),
            })
    }
}
