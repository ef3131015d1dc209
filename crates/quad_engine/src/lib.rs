//! # Quad Engine
//!
//! A small Vulkan renderer that draws one textured, rotating quad and keeps
//! the swapchain frame lifecycle honest: every frame slot is fenced before it
//! is re-recorded, images are tracked across slots, and the swapchain is
//! rebuilt whenever the surface goes out of date.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quad_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::default();
//!     let mut window = Window::new(&config.window_title, WINDOW_WIDTH, WINDOW_HEIGHT)?;
//!     let texture = TextureData::checkerboard(64, 64, 8);
//!     let shaders = ShaderBytecode::load(&config.shaders)?;
//!     let mut renderer = QuadRenderer::new(&mut window, &config, &shaders, &texture)?;
//!     let mut clock = FrameClock::new();
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         renderer.draw_frame(&mut window, clock.elapsed())?;
//!     }
//!     renderer.wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{
            RendererConfig, ShaderConfig, MAX_FRAMES_IN_FLIGHT, WINDOW_HEIGHT, WINDOW_WIDTH,
        },
        config::{Config, ConfigError},
        foundation::time::{FrameClock, FrameRateCounter},
        render::{
            frame::FrameOutcome,
            vulkan::{
                QuadRenderer, ShaderBytecode, TextureData, VulkanError, VulkanResult, Window,
                WindowError,
            },
        },
    };
}
