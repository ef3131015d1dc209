//! Rendering
//!
//! - [`geometry`]: the static quad and its per-frame uniform block
//! - [`frame`]: the backend-independent frame scheduler
//! - [`vulkan`]: the Vulkan implementation of every component

pub mod geometry;
pub mod frame;
pub mod vulkan;

pub use geometry::{UniformBufferObject, Vertex, INDICES, VERTICES};
