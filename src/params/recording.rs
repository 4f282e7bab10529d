//! Recording (frame capture) configuration.

use std::path::PathBuf;

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for captured frames
    pub output_dir: PathBuf,

    /// Frame rate (FPS)
    pub fps: u32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32, fps: u32) -> Self {
        Self {
            duration_secs,
            output_dir: PathBuf::from("recording"),
            fps,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs * self.fps as f32).ceil() as u64
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join("frames")
    }

    /// Path of a numbered frame
    pub fn frame_path(&self, frame: u64) -> PathBuf {
        self.frames_dir().join(format!("frame_{:05}.png", frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_frames_rounds_up() {
        let config = RecordingConfig::new(1.01, 60);
        assert_eq!(config.total_frames(), 61);
    }

    #[test]
    fn test_frame_path_is_zero_padded() {
        let config = RecordingConfig::new(1.0, 60);
        assert!(config.frame_path(7).ends_with("frames/frame_00007.png"));
    }
}
