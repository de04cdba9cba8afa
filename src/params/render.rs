//! Visualizer and window configuration.

use crate::surface::Rgba;

/// Waveform visualizer configuration
#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    /// Surface clear color (#02020a)
    pub background: Rgba,

    /// Waveform stroke color
    pub stroke: Rgba,

    /// Waveform stroke width (pixels)
    pub line_width: f32,

    /// Scanline fill color (very low opacity)
    pub scanline: Rgba,

    /// Vertical distance between scanlines (pixels)
    pub scanline_stride_px: u32,

    /// Scanline thickness (pixels)
    pub scanline_height_px: u32,

    /// Draw frequency bars behind the waveform
    pub spectrum: bool,

    /// Frequency bar color
    pub spectrum_color: Rgba,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            background: Rgba::rgb(0x02, 0x02, 0x0a),
            stroke: Rgba::new(0, 255, 200, 0.9),
            line_width: 2.0,
            scanline: Rgba::new(0, 255, 200, 0.02),
            scanline_stride_px: 4,
            scanline_height_px: 1,
            spectrum: false,
            spectrum_color: Rgba::new(0, 255, 200, 0.15),
        }
    }
}

impl VisualizerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.scanline_stride_px == 0 {
            return Err("Scanline stride must be > 0".to_string());
        }
        if self.line_width <= 0.0 {
            return Err("Line width must be > 0".to_string());
        }
        Ok(())
    }
}

/// Largest accepted window scale factor
pub const MAX_WINDOW_SCALE: u32 = 16;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Drawing surface width (pixels)
    pub surface_width: u32,

    /// Drawing surface height (pixels)
    pub surface_height: u32,

    /// Window pixels per surface pixel
    pub window_scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            surface_width: 640,
            surface_height: 160,
            window_scale: 2,
        }
    }
}

impl RenderConfig {
    pub fn window_width(&self) -> u32 {
        self.surface_width.saturating_mul(self.window_scale)
    }

    pub fn window_height(&self) -> u32 {
        self.surface_height.saturating_mul(self.window_scale)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(format!(
                "Surface size must be non-zero, got {}x{}",
                self.surface_width, self.surface_height
            ));
        }
        if !(1..=MAX_WINDOW_SCALE).contains(&self.window_scale) {
            return Err(format!(
                "Window scale must be in 1..={}, got {}",
                MAX_WINDOW_SCALE, self.window_scale
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_are_valid() {
        assert!(VisualizerConfig::default().validate().is_ok());
        let render = RenderConfig::default();
        assert!(render.validate().is_ok());
        assert_eq!((render.window_width(), render.window_height()), (1280, 320));
    }

    #[test]
    fn test_window_scale_is_bounded() {
        for window_scale in [0, MAX_WINDOW_SCALE + 1, 7_000_000] {
            let config = RenderConfig {
                window_scale,
                ..RenderConfig::default()
            };
            assert!(config.validate().is_err(), "accepted scale {}", window_scale);
        }

        let huge = RenderConfig {
            window_scale: 7_000_000,
            ..RenderConfig::default()
        };
        assert_eq!(huge.window_width(), u32::MAX);
    }
}
