//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use oblique::params::{EngineConfig, RecordingConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "oblique")]
#[command(about = "Real-time audio-reactive shader synthesiser", long_about = None)]
pub struct Args {
    /// Patch file (JSON); defaults to a single echo_trails layer
    #[arg(long, value_name = "PATH")]
    pub patch: Option<PathBuf>,

    /// Play a WAV file instead of capturing from an input device
    #[arg(long, value_name = "WAV", conflicts_with = "device")]
    pub audio: Option<PathBuf>,

    /// Capture from an input device (default device when no name is given)
    #[arg(long, value_name = "NAME", num_args = 0..=1, default_missing_value = "")]
    pub device: Option<String>,

    /// List audio input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Output width (pixels)
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Output height (pixels)
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Target tick rate
    #[arg(long, default_value = "60")]
    pub fps: u32,

    /// Shader root directory (vendored library under <shaders>/vendor)
    #[arg(long, value_name = "DIR", default_value = "shaders")]
    pub shaders: PathBuf,

    /// Run without a window
    #[arg(long)]
    pub headless: bool,

    /// Record numbered PNG frames for the given duration (implies --headless)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Log frame statistics every 60 frames (at debug level)
    #[arg(long)]
    pub stats: bool,

    /// Default log level; RUST_LOG overrides
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Where audio comes from
#[derive(Debug, Clone, PartialEq)]
pub enum AudioChoice {
    File(PathBuf),
    /// `None` is the host's default input device
    Device(Option<String>),
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.width,
            height: self.height,
            target_fps: self.fps,
            shader_root: self.shaders.clone(),
            vendor_root: self.shaders.join("vendor"),
            log_stats: self.stats,
            ..Default::default()
        }
    }

    pub fn recording_config(&self) -> Option<RecordingConfig> {
        self.record
            .map(|duration| RecordingConfig::new(duration, self.fps))
    }

    pub fn is_headless(&self) -> bool {
        self.headless || self.record.is_some()
    }

    pub fn audio_choice(&self) -> AudioChoice {
        match (&self.audio, &self.device) {
            (Some(path), _) => AudioChoice::File(path.clone()),
            (None, Some(name)) if !name.is_empty() => AudioChoice::Device(Some(name.clone())),
            _ => AudioChoice::Device(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("oblique").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.audio_choice(), AudioChoice::Device(None));
        assert!(!args.is_headless());
        let config = args.engine_config();
        assert_eq!((config.width, config.height, config.target_fps), (1280, 720, 60));
        assert_eq!(config.vendor_root, PathBuf::from("shaders/vendor"));
    }

    #[test]
    fn test_bare_device_flag_means_default_device() {
        assert_eq!(parse(&["--device"]).audio_choice(), AudioChoice::Device(None));
        assert_eq!(
            parse(&["--device", "USB Mic"]).audio_choice(),
            AudioChoice::Device(Some("USB Mic".to_string()))
        );
    }

    #[test]
    fn test_record_implies_headless() {
        let args = parse(&["--record", "2", "--fps", "30", "--audio", "song.wav"]);
        assert!(args.is_headless());
        assert_eq!(args.recording_config().unwrap().total_frames(), 60);
        assert_eq!(args.audio_choice(), AudioChoice::File(PathBuf::from("song.wav")));
    }

    #[test]
    fn test_audio_conflicts_with_device() {
        let result = Args::try_parse_from(["oblique", "--audio", "a.wav", "--device", "x"]);
        assert!(result.is_err());
    }
}
