//! Analysis tap: read-only view on the signal passing through the analyser node.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::fft::{to_decibels, SpectrumAnalyzer};
use crate::params::AnalyserConfig;

struct TapState {
    config: AnalyserConfig,
    /// Ring of the last `fft_size` samples
    ring: Vec<f32>,
    write: usize,
    spectrum: SpectrumAnalyzer,
}

impl TapState {
    /// Copy the ring into `out`, oldest sample first
    fn window(&self, out: &mut [f32]) {
        let size = self.ring.len();
        for (i, slot) in out.iter_mut().take(size).enumerate() {
            *slot = self.ring[(self.write + i) % size];
        }
    }
}

/// Shared handle on an analyser's capture buffer.
///
/// The graph writes through [`record`](Self::record) on the audio thread; the
/// visualizer only ever reads.
#[derive(Clone)]
pub struct AnalysisTap {
    state: Arc<Mutex<TapState>>,
    fft_size: usize,
}

impl fmt::Debug for AnalysisTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisTap")
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

impl AnalysisTap {
    /// Create a tap. `config` is expected to be validated.
    pub fn new(config: AnalyserConfig) -> Self {
        let fft_size = config.fft_size;
        Self {
            state: Arc::new(Mutex::new(TapState {
                ring: vec![0.0; fft_size],
                write: 0,
                spectrum: SpectrumAnalyzer::new(fft_size),
                config,
            })),
            fft_size,
        }
    }

    /// Number of samples in a time-domain snapshot
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub(crate) fn record(&self, samples: &[f32]) {
        let mut state = self.state.lock();
        let size = state.ring.len();
        for &sample in samples {
            let write = state.write;
            state.ring[write] = sample;
            state.write = (write + 1) % size;
        }
    }

    pub fn float_time_domain_data(&self, out: &mut [f32]) {
        self.state.lock().window(out);
    }

    /// Time-domain snapshot as bytes, 128 = zero signal
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let mut window = vec![0.0f32; self.fft_size];
        self.float_time_domain_data(&mut window);
        for (byte, sample) in out.iter_mut().zip(&window) {
            *byte = (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Smoothed spectrum in dBFS, one value per bin
    pub fn float_frequency_data(&self, out: &mut [f32]) {
        let mut state = self.state.lock();
        let mut window = vec![0.0f32; self.fft_size];
        state.window(&mut window);
        let smoothing = state.config.smoothing_time_constant;
        let magnitudes = state.spectrum.analyze(&window, smoothing);
        for (slot, &magnitude) in out.iter_mut().zip(magnitudes) {
            *slot = to_decibels(magnitude);
        }
    }

    /// Smoothed spectrum mapped linearly from [min_decibels, max_decibels] to [0, 255]
    pub fn byte_frequency_data(&self, out: &mut [u8]) {
        let mut decibels = vec![0.0f32; self.frequency_bin_count()];
        self.float_frequency_data(&mut decibels);

        let (min_db, max_db) = {
            let state = self.state.lock();
            (state.config.min_decibels, state.config.max_decibels)
        };
        let scale = 255.0 / (max_db - min_db);
        for (byte, db) in out.iter_mut().zip(&decibels) {
            let scaled = (scale * (db - min_db)).floor();
            *byte = if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, 255.0) as u8
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tap() -> AnalysisTap {
        AnalysisTap::new(AnalyserConfig::default())
    }

    #[test]
    fn test_fresh_tap_reads_centered_silence() {
        let tap = tap();
        let mut bytes = vec![0u8; tap.fft_size()];
        tap.byte_time_domain_data(&mut bytes);
        assert_eq!(bytes.len(), 2048);
        assert!(bytes.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_snapshot_is_oldest_first() {
        let tap = tap();
        let samples: Vec<f32> = (0..3000).map(|i| i as f32).collect();
        tap.record(&samples);

        let mut window = vec![0.0f32; 2048];
        tap.float_time_domain_data(&mut window);
        assert_eq!(window[0], 952.0);
        assert_eq!(window[2047], 2999.0);
    }

    #[test]
    fn test_byte_mapping_clamps_extremes() {
        let tap = tap();
        tap.record(&vec![0.5; 2046]);
        tap.record(&[-2.0, 2.0]);

        let mut bytes = vec![0u8; 2048];
        tap.byte_time_domain_data(&mut bytes);
        assert_eq!(bytes[0], 192);
        assert_eq!(bytes[2046], 0);
        assert_eq!(bytes[2047], 255);
    }

    #[test]
    fn test_silence_has_empty_spectrum() {
        let tap = tap();
        let mut bins = vec![1u8; tap.frequency_bin_count()];
        tap.byte_frequency_data(&mut bins);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tone_shows_up_in_spectrum() {
        let tap = tap();
        let freq = 64.0 * 44_100.0 / 2048.0;
        let samples: Vec<f32> = (0..2048)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / 44_100.0).sin())
            .collect();
        tap.record(&samples);

        let mut bins = vec![0u8; tap.frequency_bin_count()];
        tap.byte_frequency_data(&mut bins);
        assert!(bins[64] > 200);
        assert!(bins[64] > bins[300]);
    }
}
