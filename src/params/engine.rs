//! Engine loop and output configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Engine loop configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Output width (pixels)
    pub width: u32,

    /// Output height (pixels)
    pub height: u32,

    /// Target tick rate (Hz); 60 = 16.67 ms per tick
    pub target_fps: u32,

    /// Root directory for module shaders and local shared snippets
    pub shader_root: PathBuf,

    /// Root directory of the vendored shader utility library (`#include <...>`)
    pub vendor_root: PathBuf,

    /// Log frame statistics periodically
    pub log_stats: bool,

    /// Ticks between statistics reports
    pub stats_interval_frames: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            target_fps: 60,
            shader_root: PathBuf::from("shaders"),
            vendor_root: PathBuf::from("shaders/vendor"),
            log_stats: false,
            stats_interval_frames: 60,
        }
    }
}

impl EngineConfig {
    /// Fixed interval between tick starts
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps as f64)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "Resolution must be non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        if self.target_fps == 0 {
            return Err("Target FPS must be > 0".to_string());
        }
        if self.stats_interval_frames == 0 {
            return Err("Statistics interval must be > 0 frames".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval_at_60hz() {
        let config = EngineConfig::default();
        let interval = config.frame_interval().as_secs_f64();
        assert!((interval - 0.016_666).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let config = EngineConfig {
            width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
