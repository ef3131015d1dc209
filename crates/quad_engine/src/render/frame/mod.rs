//! Frame scheduling for frames in flight
//!
//! [`FrameScheduler`] owns the ordering rules of the render loop and nothing
//! else. The GPU work itself is behind [`FrameBackend`], implemented by the
//! Vulkan renderer and by mock backends in tests.
//!
//! # Synchronization Flow
//!
//! ```text
//! 1. Wait on the slot's in-flight fence (CPU waits for the slot's last submit)
//! 2. Acquire a swapchain image (signals the slot's image-available semaphore)
//!      out-of-date -> recreate, skip this frame
//!      suboptimal  -> keep going, recreate after present
//! 3. If another slot still guards that image, wait on that slot's fence too
//! 4. Re-record the slot's command buffer
//! 5. Write the slot's uniform buffer
//! 6. Reset the fence, submit (wait image-available, signal render-finished + fence)
//! 7. Present (waits on render-finished); recreate if asked to
//! 8. Advance to the next slot
//! ```

mod images_in_flight;

#[cfg(test)]
mod tests;

pub use images_in_flight::ImagesInFlight;

use std::time::Duration;

/// Result of asking the swapchain for the next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; the image-available semaphore will be signaled
    Acquired {
        /// Swapchain image index
        image_index: u32,
        /// The swapchain still works but no longer matches the surface exactly
        suboptimal: bool,
    },
    /// The swapchain can no longer be used; nothing was signaled
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented and the swapchain matches the surface
    Presented,
    /// Presented, but the swapchain should be rebuilt
    Suboptimal,
    /// The swapchain is out of date
    OutOfDate,
}

/// What happened during one call to [`FrameScheduler::draw_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was presented
    Presented,
    /// The frame was presented and the swapchain was rebuilt afterwards
    Recreated,
    /// Acquire reported out-of-date; the swapchain was rebuilt and nothing was drawn
    Skipped,
}

/// Lifecycle of a single frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameSlotState {
    /// Not part of the frame currently being built
    #[default]
    Idle,
    /// Fence waited on, image being acquired
    Acquiring,
    /// Command buffer and uniforms being rewritten
    Recording,
    /// Command buffer handed to the graphics queue
    Submitted,
    /// Image handed to the presentation engine
    Presenting,
}

/// GPU-facing operations the scheduler sequences
///
/// Every method maps to one step of the frame; the scheduler decides order,
/// slot and image, the backend does the work.
pub trait FrameBackend {
    /// Backend error type
    type Error;

    /// Block until the in-flight fence of `slot` is signaled
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Acquire the next image, signaling the image-available semaphore of `slot`
    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, Self::Error>;

    /// Reset and re-record the command buffer of `slot` to draw into `image_index`
    fn record_commands(&mut self, slot: usize, image_index: u32) -> Result<(), Self::Error>;

    /// Write the uniform buffer of `slot` for a frame at `elapsed`
    fn update_uniforms(&mut self, slot: usize, elapsed: Duration) -> Result<(), Self::Error>;

    /// Reset the fence of `slot` and submit its command buffer
    fn submit(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Present `image_index` once the render-finished semaphore of `slot` is signaled
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome, Self::Error>;

    /// Rebuild the swapchain and everything sized by it; returns the new image count
    fn recreate_swapchain(&mut self) -> Result<usize, Self::Error>;
}

/// Drives the per-frame acquire → record → submit → present cycle
#[derive(Debug)]
pub struct FrameScheduler {
    current_frame: usize,
    frames_in_flight: usize,
    images_in_flight: ImagesInFlight,
    slot_states: Vec<FrameSlotState>,
    framebuffer_resized: bool,
    frames_presented: u64,
    recreations: u64,
}

impl FrameScheduler {
    /// Scheduler for `frames_in_flight` slots over a swapchain of `image_count` images
    ///
    /// # Panics
    ///
    /// Panics if `frames_in_flight` is zero.
    pub fn new(frames_in_flight: usize, image_count: usize) -> Self {
        assert!(frames_in_flight > 0, "at least one frame slot is required");
        Self {
            current_frame: 0,
            frames_in_flight,
            images_in_flight: ImagesInFlight::new(image_count),
            slot_states: vec![FrameSlotState::Idle; frames_in_flight],
            framebuffer_resized: false,
            frames_presented: 0,
            recreations: 0,
        }
    }

    /// Slot the next frame will use
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// State of `slot`
    pub fn slot_state(&self, slot: usize) -> FrameSlotState {
        self.slot_states.get(slot).copied().unwrap_or_default()
    }

    /// Image → slot tracking
    pub fn images_in_flight(&self) -> &ImagesInFlight {
        &self.images_in_flight
    }

    /// Whether a resize notification is waiting to be handled
    pub fn resize_pending(&self) -> bool {
        self.framebuffer_resized
    }

    /// Total frames presented
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Total swapchain rebuilds
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Note that the window's framebuffer changed size
    ///
    /// The swapchain is rebuilt after the next present, however many
    /// notifications arrive before then.
    pub fn notify_resized(&mut self) {
        self.framebuffer_resized = true;
    }

    /// Run one iteration of the frame loop
    pub fn draw_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        elapsed: Duration,
    ) -> Result<FrameOutcome, B::Error> {
        let slot = self.current_frame;

        backend.wait_for_slot(slot)?;
        self.transition(slot, FrameSlotState::Acquiring);

        let (image_index, acquire_suboptimal) = match backend.acquire_image(slot)? {
            AcquireOutcome::Acquired { image_index, suboptimal } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                log::warn!("Swapchain out of date during acquire, skipping frame");
                self.transition(slot, FrameSlotState::Idle);
                self.recreate_swapchain(backend)?;
                return Ok(FrameOutcome::Skipped);
            }
        };

        if let Some(owner) = self.images_in_flight.conflicting_slot(image_index, slot) {
            log::trace!("Image {image_index} still guarded by slot {owner}, waiting");
            backend.wait_for_slot(owner)?;
        }
        self.images_in_flight.assign(image_index, slot);

        self.transition(slot, FrameSlotState::Recording);
        backend.record_commands(slot, image_index)?;
        backend.update_uniforms(slot, elapsed)?;

        backend.submit(slot)?;
        self.transition(slot, FrameSlotState::Submitted);

        self.transition(slot, FrameSlotState::Presenting);
        let present = backend.present(slot, image_index)?;
        self.frames_presented += 1;
        self.transition(slot, FrameSlotState::Idle);

        let needs_recreate = acquire_suboptimal
            || self.framebuffer_resized
            || matches!(present, PresentOutcome::Suboptimal | PresentOutcome::OutOfDate);

        self.current_frame = (slot + 1) % self.frames_in_flight;

        if needs_recreate {
            log::debug!(
                "Recreating swapchain (present: {present:?}, suboptimal acquire: {acquire_suboptimal}, resized: {})",
                self.framebuffer_resized
            );
            self.recreate_swapchain(backend)?;
            return Ok(FrameOutcome::Recreated);
        }

        Ok(FrameOutcome::Presented)
    }

    /// Rebuild the swapchain now and reset image tracking for it
    pub fn recreate_swapchain<B: FrameBackend>(&mut self, backend: &mut B) -> Result<(), B::Error> {
        let image_count = backend.recreate_swapchain()?;
        self.images_in_flight.reset(image_count);
        self.framebuffer_resized = false;
        self.recreations += 1;
        log::debug!("Swapchain rebuilt with {image_count} images");
        Ok(())
    }

    fn transition(&mut self, slot: usize, next: FrameSlotState) {
        let state = &mut self.slot_states[slot];
        log::trace!("Frame slot {slot}: {state:?} -> {next:?}");
        *state = next;
    }
}
