//! Oscilloscope-style waveform visualizer.
//!
//! One [`Visualizer::draw`] call paints one frame: background, optional
//! frequency bars, the waveform trace and a scanline overlay.

use crate::audio::AnalysisTap;
use crate::params::VisualizerConfig;
use crate::surface::DrawingSurface;

/// Number of bars in the optional spectrum strip
const SPECTRUM_BARS: usize = 64;

/// Per-frame waveform renderer with reusable sample buffers
#[derive(Debug, Clone)]
pub struct Visualizer {
    config: VisualizerConfig,
    samples: Vec<u8>,
    bins: Vec<u8>,
    points: Vec<(f32, f32)>,
}

impl Visualizer {
    pub fn new(config: VisualizerConfig) -> Self {
        Self {
            config,
            samples: Vec::new(),
            bins: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Paint one frame from the tap's current window.
    ///
    /// Returns false without drawing when the surface or tap is missing.
    pub fn draw(
        &mut self,
        surface: Option<&mut dyn DrawingSurface>,
        tap: Option<&AnalysisTap>,
    ) -> bool {
        let (Some(surface), Some(tap)) = (surface, tap) else {
            log::trace!("Frame skipped: no surface or analysis tap");
            return false;
        };

        let width = surface.width() as f32;
        let height = surface.height() as f32;

        surface.fill_rect(0.0, 0.0, width, height, self.config.background);

        if self.config.spectrum {
            self.draw_spectrum(surface, tap);
        }

        self.samples.resize(tap.fft_size(), 128);
        tap.byte_time_domain_data(&mut self.samples);

        // Byte 128 is silence and lands on the vertical midline
        let slice_width = width / self.samples.len() as f32;
        self.points.clear();
        self.points.extend(
            self.samples
                .iter()
                .enumerate()
                .map(|(i, &v)| (i as f32 * slice_width, v as f32 / 128.0 * height / 2.0)),
        );
        self.points.push((width, height / 2.0));
        surface.stroke_polyline(&self.points, self.config.line_width, self.config.stroke);

        let stride = self.config.scanline_stride_px.max(1) as usize;
        for y in (0..surface.height()).step_by(stride) {
            surface.fill_rect(
                0.0,
                y as f32,
                width,
                self.config.scanline_height_px as f32,
                self.config.scanline,
            );
        }

        true
    }

    fn draw_spectrum(&mut self, surface: &mut dyn DrawingSurface, tap: &AnalysisTap) {
        self.bins.resize(tap.frequency_bin_count(), 0);
        tap.byte_frequency_data(&mut self.bins);

        let width = surface.width() as f32;
        let height = surface.height() as f32;
        let bars = SPECTRUM_BARS.min(self.bins.len()).max(1);
        let per_bar = self.bins.len() / bars;
        let bar_width = width / bars as f32;

        for (bar, chunk) in self.bins.chunks(per_bar.max(1)).take(bars).enumerate() {
            let mean = chunk.iter().map(|&b| b as f32).sum::<f32>() / chunk.len() as f32;
            let bar_height = mean / 255.0 * height;
            if bar_height <= 0.0 {
                continue;
            }
            surface.fill_rect(
                bar as f32 * bar_width,
                height - bar_height,
                (bar_width - 1.0).max(1.0),
                bar_height,
                self.config.spectrum_color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalyserConfig;
    use crate::surface::{Framebuffer, Rgba};

    #[derive(Debug, Clone, PartialEq)]
    enum DrawCommand {
        Fill(f32, f32, f32, f32, Rgba),
        Stroke(Vec<(f32, f32)>, f32, Rgba),
    }

    struct RecordingSurface {
        width: u32,
        height: u32,
        commands: Vec<DrawCommand>,
    }

    impl RecordingSurface {
        fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                commands: Vec::new(),
            }
        }
    }

    impl DrawingSurface for RecordingSurface {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
            self.commands.push(DrawCommand::Fill(x, y, width, height, color));
        }

        fn stroke_polyline(&mut self, points: &[(f32, f32)], line_width: f32, color: Rgba) {
            self.commands
                .push(DrawCommand::Stroke(points.to_vec(), line_width, color));
        }
    }

    fn silent_tap() -> AnalysisTap {
        AnalysisTap::new(AnalyserConfig::default())
    }

    #[test]
    fn test_silence_draws_flat_midline() {
        let config = VisualizerConfig::default();
        let mut visualizer = Visualizer::new(config.clone());
        let mut surface = RecordingSurface::new(640, 160);
        let tap = silent_tap();

        assert!(visualizer.draw(Some(&mut surface), Some(&tap)));

        let commands = &surface.commands;
        assert_eq!(
            commands[0],
            DrawCommand::Fill(0.0, 0.0, 640.0, 160.0, config.background)
        );

        let DrawCommand::Stroke(points, line_width, color) = &commands[1] else {
            panic!("expected waveform stroke, got {:?}", commands[1]);
        };
        assert_eq!(points.len(), 2049);
        assert!(points.iter().all(|&(_, y)| y == 80.0));
        assert_eq!(points[0], (0.0, 80.0));
        assert_eq!(points[2048], (640.0, 80.0));
        assert_eq!(*line_width, 2.0);
        assert_eq!(*color, config.stroke);

        let scanlines: Vec<_> = commands[2..].to_vec();
        assert_eq!(scanlines.len(), 40);
        for (i, command) in scanlines.iter().enumerate() {
            assert_eq!(
                *command,
                DrawCommand::Fill(0.0, (i * 4) as f32, 640.0, 1.0, config.scanline)
            );
        }
    }

    #[test]
    fn test_waveform_tracks_samples() {
        let mut visualizer = Visualizer::new(VisualizerConfig::default());
        let mut surface = RecordingSurface::new(640, 160);
        let tap = silent_tap();
        // Full-scale negative: byte 0 maps to the top edge
        tap.record(&vec![-1.0; 2048]);

        assert!(visualizer.draw(Some(&mut surface), Some(&tap)));
        let DrawCommand::Stroke(points, ..) = &surface.commands[1] else {
            panic!("expected waveform stroke");
        };
        assert!(points[..2048].iter().all(|&(_, y)| y == 0.0));
        assert_eq!(points[2048], (640.0, 80.0));
        assert_eq!(points[1].0, 640.0 / 2048.0);
    }

    #[test]
    fn test_missing_inputs_skip_frame() {
        let mut visualizer = Visualizer::new(VisualizerConfig::default());
        let mut surface = RecordingSurface::new(640, 160);
        let tap = silent_tap();

        assert!(!visualizer.draw(None, Some(&tap)));
        assert!(!visualizer.draw(Some(&mut surface), None));
        assert!(surface.commands.is_empty());
    }

    #[test]
    fn test_spectrum_strip_draws_under_waveform() {
        let config = VisualizerConfig {
            spectrum: true,
            ..VisualizerConfig::default()
        };
        let mut visualizer = Visualizer::new(config.clone());
        let mut surface = RecordingSurface::new(640, 160);
        let tap = silent_tap();
        let tone: Vec<f32> = (0..2048)
            .map(|i| (i as f32 * 0.3).sin() * 0.8)
            .collect();
        tap.record(&tone);

        assert!(visualizer.draw(Some(&mut surface), Some(&tap)));

        let stroke_at = surface
            .commands
            .iter()
            .position(|c| matches!(c, DrawCommand::Stroke(..)))
            .unwrap();
        let bars = surface.commands[1..stroke_at]
            .iter()
            .filter(|c| {
                matches!(c, DrawCommand::Fill(.., color) if *color == config.spectrum_color)
            })
            .count();
        assert!(bars > 0);
        assert!(bars <= SPECTRUM_BARS);
    }

    #[test]
    fn test_framebuffer_frame() {
        let mut visualizer = Visualizer::new(VisualizerConfig::default());
        let mut fb = Framebuffer::new(640, 160).unwrap();
        let tap = silent_tap();

        assert!(visualizer.draw(Some(&mut fb), Some(&tap)));

        // Plain background row
        assert_eq!(fb.pixel(10, 50), Some([2, 2, 10, 255]));
        // Scanline row is faintly tinted
        assert_eq!(fb.pixel(10, 1), Some([2, 2, 10, 255]));
        assert!(fb.pixel(10, 0).unwrap()[1] > 2);
        // Trace straddles the midline
        assert!(fb.pixel(320, 79).unwrap()[1] > 200);
        assert!(fb.pixel(320, 80).unwrap()[1] > 200);
    }
}
