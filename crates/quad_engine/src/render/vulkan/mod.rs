//! Vulkan rendering backend
//!
//! Low-level RAII wrappers, one per Vulkan handle family, and the
//! [`QuadRenderer`] that assembles them.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod diagnostics;
pub mod framebuffer;
pub mod render_pass;
pub mod renderer;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex_layout;
pub mod window;

pub use buffer::{Buffer, MappedUniformBuffer};
pub use commands::{CommandPool, CommandRecorder, SingleTimeCommands};
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder};
pub use diagnostics::{LogSink, ValidationSink};
pub use framebuffer::Framebuffer;
pub use render_pass::RenderPass;
pub use renderer::QuadRenderer;
pub use shader::{GraphicsPipeline, ShaderBytecode, ShaderModule};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use texture::{LayoutTransition, Texture, TextureData};
pub use vertex_layout::VulkanVertexLayout;
pub use window::{Window, WindowError, WindowResult};
