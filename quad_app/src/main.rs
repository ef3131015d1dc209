//! Rotating textured quad
//!
//! Opens a resizable window and renders until it is closed or Escape is
//! pressed. Settings are read from `quad.toml` when present.

use std::path::Path;
use std::process::ExitCode;

use glfw::{Action, Key, WindowEvent};
use quad_engine::foundation::logging;
use quad_engine::prelude::*;
use thiserror::Error;

const CONFIG_PATH: &str = "quad.toml";

/// Fallback texture when the configured image cannot be decoded
const CHECKERBOARD_SIZE: u32 = 256;
const CHECKERBOARD_CELL: u32 = 32;

/// Anything that ends the application early
#[derive(Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Renderer error: {0}")]
    Renderer(#[from] VulkanError),
}

fn load_texture(path: &str) -> TextureData {
    let decoded = image::open(path)
        .map_err(|e| e.to_string())
        .and_then(|image| {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            TextureData::from_rgba(width, height, rgba.into_raw()).map_err(|e| e.to_string())
        });

    match decoded {
        Ok(texture) => {
            log::info!("Loaded texture {path} ({}x{})", texture.width(), texture.height());
            texture
        }
        Err(e) => {
            log::warn!("Could not load texture {path}: {e}; using a checkerboard");
            TextureData::checkerboard(CHECKERBOARD_SIZE, CHECKERBOARD_SIZE, CHECKERBOARD_CELL)
        }
    }
}

/// Where the settings came from, for the startup log
fn config_source(path: &Path) -> String {
    if path.exists() {
        format!("Configuration loaded from {}", path.display())
    } else {
        format!("No {} found, using default configuration", path.display())
    }
}

/// Whether `outcome` put a new image on screen
fn presented(outcome: FrameOutcome) -> bool {
    !matches!(outcome, FrameOutcome::Skipped)
}

fn run() -> Result<(), AppError> {
    let config = RendererConfig::load_or_default(CONFIG_PATH)?;
    logging::init(&config.log_level);
    log::info!("{}", config_source(Path::new(CONFIG_PATH)));
    config.validate()?;

    let shaders = ShaderBytecode::load(&config.shaders)?;
    let texture = load_texture(&config.texture_path);

    let mut window = Window::new(&config.window_title, WINDOW_WIDTH, WINDOW_HEIGHT)?;
    let mut renderer = QuadRenderer::new(&mut window, &config, &shaders, &texture)?;
    log::info!("Rendering on {}", renderer.device_name());

    let mut clock = FrameClock::new();
    let mut frame_rate = FrameRateCounter::new();

    while !window.should_close() {
        window.poll_events();

        let events: Vec<WindowEvent> = window.flush_events().map(|(_, event)| event).collect();
        for event in events {
            match event {
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => window.set_should_close(true),
                WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {width}x{height}");
                    renderer.notify_resized();
                }
                _ => {}
            }
        }

        if window.should_close() {
            break;
        }

        if presented(renderer.draw_frame(&mut window, clock.elapsed())?) {
            frame_rate.tick();
        }
    }

    renderer.wait_idle()?;
    log::info!(
        "Presented {} frames, rebuilt the swapchain {} times",
        renderer.scheduler().frames_presented(),
        renderer.scheduler().recreations()
    );
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_texture_falls_back_to_checkerboard() {
        let texture = load_texture("no/such/texture.png");
        assert_eq!((texture.width(), texture.height()), (CHECKERBOARD_SIZE, CHECKERBOARD_SIZE));
        assert!(texture.validate().is_ok());
    }

    #[test]
    fn test_skipped_frames_are_not_counted() {
        assert!(presented(FrameOutcome::Presented));
        assert!(presented(FrameOutcome::Recreated));
        assert!(!presented(FrameOutcome::Skipped));
    }

    #[test]
    fn test_config_source_names_the_file() {
        assert!(config_source(Path::new("no/such/quad.toml")).starts_with("No no/such/quad.toml found"));
        assert!(config_source(Path::new("Cargo.toml")).starts_with("Configuration loaded from Cargo.toml"));
    }
}
