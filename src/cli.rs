//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::error::ConsoleError;
use crate::params::{RenderConfig, VisualizerConfig};
use crate::session::ConsoleConfig;

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "transmission-console")]
#[command(about = "Simulated radio transmission console", long_about = None)]
pub struct Args {
    /// Run one transmission without a window
    #[arg(long)]
    pub headless: bool,

    /// Headless run length (simulated milliseconds)
    #[arg(long, value_name = "MS", default_value_t = 16_000)]
    pub duration_ms: u64,

    /// Headless frame rate
    #[arg(long, value_name = "FPS", default_value_t = 60)]
    pub fps: u32,

    /// Save the last headless frame as PNG
    #[arg(long, value_name = "PNG")]
    pub snapshot: Option<PathBuf>,

    /// Render audio offline instead of playing it
    #[arg(long)]
    pub mute: bool,

    /// Draw frequency bars behind the waveform
    #[arg(long)]
    pub spectrum: bool,

    /// Seed for noise and signal jitter
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Window pixels per surface pixel (1-16)
    #[arg(long, value_name = "FACTOR", default_value_t = 2)]
    pub scale: u32,
}

impl Args {
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if self.fps == 0 {
            return Err(ConsoleError::Config("Frame rate must be > 0".to_string()));
        }
        self.render_config().validate().map_err(ConsoleError::Config)
    }

    pub fn console_config(&self) -> ConsoleConfig {
        ConsoleConfig {
            visualizer: VisualizerConfig {
                spectrum: self.spectrum,
                ..VisualizerConfig::default()
            },
            seed: self.seed,
            ..ConsoleConfig::default()
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_scale: self.scale,
            ..RenderConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["transmission-console"]).unwrap();
        assert!(!args.headless);
        assert_eq!(args.duration_ms, 16_000);
        assert_eq!(args.fps, 60);
        assert_eq!(args.scale, 2);
        assert!(args.snapshot.is_none());
        assert!(args.validate().is_ok());

        let config = args.console_config();
        assert!(!config.visualizer.spectrum);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_flags_reach_configs() {
        let args = Args::try_parse_from([
            "transmission-console",
            "--headless",
            "--mute",
            "--spectrum",
            "--seed",
            "7",
            "--scale",
            "3",
            "--snapshot",
            "out.png",
        ])
        .unwrap();

        assert!(args.headless && args.mute);
        assert_eq!(args.snapshot, Some(PathBuf::from("out.png")));
        assert!(args.console_config().visualizer.spectrum);
        assert_eq!(args.console_config().seed, Some(7));
        assert_eq!(args.render_config().window_width(), 1920);
    }

    #[test]
    fn test_zero_fps_rejected() {
        let args = Args::try_parse_from(["transmission-console", "--fps", "0"]).unwrap();
        assert!(matches!(args.validate(), Err(ConsoleError::Config(_))));
    }

    #[test]
    fn test_oversized_scale_rejected() {
        let args =
            Args::try_parse_from(["transmission-console", "--scale", "7000000"]).unwrap();
        assert!(matches!(args.validate(), Err(ConsoleError::Config(_))));
    }
}
