//! # Core Engine Module
//!
//! Shared configuration for the renderer and the binary that drives it.
//!
//! - **Config**: renderer settings loaded from disk plus the build-time
//!   constants that are never runtime-configurable

pub mod config;

pub use config::{
    RendererConfig,
    ShaderConfig,
    DEVICE_EXTENSIONS,
    ENABLE_VALIDATION,
    MAX_FRAMES_IN_FLIGHT,
    VALIDATION_LAYERS,
    WINDOW_HEIGHT,
    WINDOW_WIDTH,
};
