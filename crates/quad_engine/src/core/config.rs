//! # Renderer Configuration
//!
//! Two kinds of settings live here:
//!
//! - **Build-time constants**: window extent, frames in flight, required
//!   device extensions and validation layers. These shape synchronization
//!   and resource counts and are deliberately not loadable from disk.
//! - **`RendererConfig`**: names, log level and asset paths, which may come
//!   from a TOML/RON file through [`Config`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{Config, ConfigError};

/// Initial window width in screen coordinates
pub const WINDOW_WIDTH: u32 = 800;

/// Initial window height in screen coordinates
pub const WINDOW_HEIGHT: u32 = 600;

/// Number of frame slots the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Device extensions every candidate GPU must expose
pub const DEVICE_EXTENSIONS: &[&str] = &["VK_KHR_swapchain"];

/// Validation layers requested when validation is enabled
pub const VALIDATION_LAYERS: &[&str] = &["VK_LAYER_KHRONOS_validation"];

/// Validation layers are only enabled in debug builds
pub const ENABLE_VALIDATION: bool = cfg!(debug_assertions);

/// # Shader Configuration
///
/// Paths of the precompiled SPIR-V blobs for the two pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual output and source locations so the binary can be run
    /// from the workspace root or from inside the app crate.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = [
            "target/shaders/",
            "../target/shaders/",
            "shaders/",
            "resources/shaders/",
            "./",
        ];

        let find = |name: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{dir}{name}"))
                .find(|candidate| Path::new(candidate).exists())
        };

        Self {
            vertex_shader_path: find(base_vertex)
                .unwrap_or_else(|| format!("target/shaders/{base_vertex}")),
            fragment_shader_path: find(base_fragment)
                .unwrap_or_else(|| format!("target/shaders/{base_fragment}")),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !Path::new(path).exists() {
                return Err(ConfigError::Invalid(format!("Shader not found: {path}")));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("shader.vert.spv", "shader.frag.spv")
    }
}

/// # Renderer Configuration
///
/// Everything about the renderer that is allowed to vary between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan instance
    pub application_name: String,
    /// Window title
    pub window_title: String,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Texture image to decode and upload
    pub texture_path: String,
    /// Shader blob locations, kept last: TOML tables must follow plain values
    pub shaders: ShaderConfig,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        let application_name = app_name.into();
        Self {
            window_title: application_name.clone(),
            application_name,
            log_level: "info".to_string(),
            texture_path: "resources/textures/texture.jpg".to_string(),
            shaders: ShaderConfig::default(),
        }
    }

    /// Set custom shader configuration
    #[must_use]
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set texture path
    #[must_use]
    pub fn with_texture(mut self, path: impl Into<String>) -> Self {
        self.texture_path = path.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.application_name.contains('\0') {
            return Err(ConfigError::Invalid(
                "Application name cannot contain NUL bytes".to_string(),
            ));
        }

        self.shaders.validate()
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Vulkan Quad")
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_build_time_constants() {
        assert_eq!((WINDOW_WIDTH, WINDOW_HEIGHT), (800, 600));
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
        assert_eq!(DEVICE_EXTENSIONS, &["VK_KHR_swapchain"]);
        assert_eq!(ENABLE_VALIDATION, cfg!(debug_assertions));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RendererConfig::parse(
            "window_title = \"Resizable quad\"\ntexture_path = \"assets/wall.png\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.window_title, "Resizable quad");
        assert_eq!(config.texture_path, "assets/wall.png");
        assert_eq!(config.application_name, RendererConfig::default().application_name);
        assert_eq!(config.log_level, "info");
    }

    fn round_trip(extension: &str) {
        let path = std::env::temp_dir().join(format!("quad_engine_config_{}.{extension}", std::process::id()));
        let config = RendererConfig::new("Round trip")
            .with_texture("assets/bricks.png")
            .with_shaders(ShaderConfig::new("out/quad.vert.spv", "out/quad.frag.spv"));

        config.save_to_file(&path).unwrap();
        let loaded = RendererConfig::load_from_file(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.unwrap(), config);
    }

    #[test]
    fn test_toml_save_and_load_round_trip() {
        round_trip("toml");
    }

    #[test]
    fn test_ron_save_and_load_round_trip() {
        round_trip("ron");
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = RendererConfig::parse("(log_level: \"debug\")", ConfigFormat::Ron).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.window_title, RendererConfig::default().window_title);
    }

    #[test]
    fn test_unknown_extension_not_saved() {
        let path = std::env::temp_dir().join("quad_engine_config.json");
        assert!(matches!(
            RendererConfig::default().save_to_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_application_name_rejected() {
        let mut config = RendererConfig::default();
        config.application_name.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_shader_rejected() {
        let shaders = ShaderConfig::new("does/not/exist.vert.spv", "does/not/exist.frag.spv");
        assert!(shaders.validate().is_err());
    }
}
