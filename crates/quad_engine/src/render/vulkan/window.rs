//! Window management using GLFW
//!
//! Provides window creation, event handling and the Vulkan surface hooks

use ash::vk;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// GLFW refused to create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// The platform cannot present with Vulkan
    #[error("Vulkan is not supported by the window system")]
    VulkanUnsupported,

    /// Surface creation returned an error code
    #[error("Failed to create Vulkan surface: {0:?}")]
    SurfaceCreation(vk::Result),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Convert a GLFW framebuffer size to a Vulkan extent
pub fn extent_from_size(width: i32, height: i32) -> vk::Extent2D {
    vk::Extent2D {
        width: width.max(0).unsigned_abs(),
        height: height.max(0).unsigned_abs(),
    }
}

/// Whether an extent has no drawable area
pub fn is_zero_area(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Open a resizable window without a client API
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::VulkanUnsupported);
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::debug!("Window created: {width}x{height} \"{title}\"");

        Ok(Self { glfw, window, events })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request that the main loop exit
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Process pending window system events without blocking
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain the events collected by the last poll
    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_extent(&self) -> vk::Extent2D {
        let (width, height) = self.window.get_framebuffer_size();
        extent_from_size(width, height)
    }

    /// Block until the framebuffer has a non-zero size, then return it
    ///
    /// A minimized window reports 0x0 and cannot back a swapchain.
    pub fn wait_while_minimized(&mut self) -> vk::Extent2D {
        let mut extent = self.framebuffer_extent();
        if is_zero_area(extent) {
            log::debug!("Framebuffer is zero-sized, waiting for the window to be restored");
        }
        while is_zero_area(extent) && !self.window.should_close() {
            self.glfw.wait_events();
            extent = self.framebuffer_extent();
        }
        extent
    }

    /// Vulkan instance extensions the window system needs
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or(WindowError::VulkanUnsupported)
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::SurfaceCreation(result))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_from_size() {
        assert_eq!(extent_from_size(800, 600), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(extent_from_size(-1, 600), vk::Extent2D { width: 0, height: 600 });
    }

    #[test]
    fn test_zero_area() {
        assert!(is_zero_area(vk::Extent2D { width: 0, height: 0 }));
        assert!(is_zero_area(vk::Extent2D { width: 1024, height: 0 }));
        assert!(!is_zero_area(vk::Extent2D { width: 1, height: 1 }));
    }
}
