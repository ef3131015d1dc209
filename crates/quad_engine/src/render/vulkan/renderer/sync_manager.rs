//! Per-slot synchronization objects

use ash::vk;

use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::sync::FrameSync;

/// Manages the semaphores and fence of every frame slot
pub struct SyncManager {
    frames: Vec<FrameSync>,
}

impl SyncManager {
    /// Create synchronization objects for `frames` slots
    pub fn new(context: &VulkanContext, frames: usize) -> VulkanResult<Self> {
        log::debug!("Creating SyncManager for {frames} frames in flight...");

        let frames = (0..frames)
            .map(|_| FrameSync::new(context.raw_device()))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self { frames })
    }

    /// Synchronization objects of `slot`
    pub fn frame(&self, slot: usize) -> VulkanResult<&FrameSync> {
        self.frames.get(slot).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("No synchronization objects for frame slot {slot}"),
        })
    }

    /// Block until the last submission of `slot` completed
    pub fn wait(&self, slot: usize) -> VulkanResult<()> {
        self.frame(slot)?.in_flight.wait_forever()
    }

    /// Image-available semaphore of `slot`
    pub fn image_available(&self, slot: usize) -> VulkanResult<vk::Semaphore> {
        Ok(self.frame(slot)?.image_available.handle())
    }

    /// Render-finished semaphore of `slot`
    pub fn render_finished(&self, slot: usize) -> VulkanResult<vk::Semaphore> {
        Ok(self.frame(slot)?.render_finished.handle())
    }
}
