//! Synthesis graph and analysis tap configuration.

/// One point of the tone envelope, relative to the graph's start time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopePoint {
    /// Gain reached at this point (linear, 0.0 - 1.0)
    pub value: f32,

    /// Offset from the moment the graph was built (seconds)
    pub offset_s: f64,
}

/// Fixed parameters of the simulated-transmission synthesis graph
#[derive(Debug, Clone)]
pub struct SynthesisParams {
    /// Sawtooth tone frequency (Hz)
    pub tone_frequency_hz: f32,

    /// Band-pass center frequency (Hz)
    /// 1200 Hz sits in the middle of the "voice over radio" band
    pub filter_center_hz: f32,

    /// Band-pass resonance (Q, dimensionless)
    pub filter_q: f32,

    /// Length of the looped static buffer (seconds)
    pub noise_duration_s: f32,

    /// Peak amplitude of the static buffer samples (linear)
    pub noise_amplitude: f32,

    /// Constant attenuation on the static path (linear, fraction of full scale)
    pub noise_gain: f32,

    /// Tone gain ramps scheduled at build time ("keying up" the transmitter)
    pub envelope: Vec<EnvelopePoint>,

    /// Analysis tap settings
    pub analyser: AnalyserConfig,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            tone_frequency_hz: 220.0,
            filter_center_hz: 1200.0,
            filter_q: 1.2,
            noise_duration_s: 2.0,
            noise_amplitude: 0.4,
            noise_gain: 0.12,
            envelope: vec![
                EnvelopePoint {
                    value: 0.0,
                    offset_s: 0.0,
                },
                EnvelopePoint {
                    value: 0.9,
                    offset_s: 0.4,
                },
                EnvelopePoint {
                    value: 0.6,
                    offset_s: 1.2,
                },
            ],
            analyser: AnalyserConfig::default(),
        }
    }
}

impl SynthesisParams {
    /// Validate configuration (positive frequencies, ordered envelope, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tone_frequency_hz > 0.0 && self.tone_frequency_hz.is_finite()) {
            return Err(format!(
                "Tone frequency must be > 0, got {}",
                self.tone_frequency_hz
            ));
        }
        let positive = |v: f32| v > 0.0 && v.is_finite();
        if !positive(self.filter_center_hz) || !positive(self.filter_q) {
            return Err("Filter center and Q must be finite and > 0".to_string());
        }
        if !(self.noise_duration_s > 0.0 && self.noise_duration_s.is_finite()) {
            return Err(format!(
                "Noise buffer duration must be finite and > 0, got {}",
                self.noise_duration_s
            ));
        }
        if !self.noise_amplitude.is_finite() || !self.noise_gain.is_finite() {
            return Err("Noise amplitude and gain must be finite".to_string());
        }
        if self
            .envelope
            .iter()
            .any(|point| !point.value.is_finite() || !point.offset_s.is_finite())
        {
            return Err("Envelope points must be finite".to_string());
        }
        if self
            .envelope
            .windows(2)
            .any(|pair| pair[1].offset_s < pair[0].offset_s)
        {
            return Err("Envelope points must be in time order".to_string());
        }
        self.analyser.validate()
    }
}

/// Analysis tap configuration (browser analyser semantics)
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// Time-domain window and FFT size (must be power of 2, 32 - 32768)
    pub fft_size: usize,

    /// Averaging constant between successive spectra (0.0 - 1.0)
    pub smoothing_time_constant: f32,

    /// Level mapped to byte 0 in frequency data (dBFS)
    pub min_decibels: f32,

    /// Level mapped to byte 255 in frequency data (dBFS)
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins exposed by the tap
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(format!(
                "Smoothing constant must be in [0, 1], got {}",
                self.smoothing_time_constant
            ));
        }
        if self.min_decibels >= self.max_decibels {
            return Err("min_decibels must be below max_decibels".to_string());
        }
        Ok(())
    }
}

/// Audio constants (compile-time, shared by the graph and its backends)
pub mod audio_constants {
    /// Frames rendered per graph pass
    /// 128 (= 2.9ms @ 44.1kHz), the browser render quantum
    pub const RENDER_QUANTUM: usize = 128;

    /// Sample rate used by the offline backend (Hz)
    pub const OFFLINE_SAMPLE_RATE_HZ: f32 = 44100.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(SynthesisParams::default().validate().is_ok());
        assert_eq!(AnalyserConfig::default().frequency_bin_count(), 1024);
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let config = AnalyserConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unordered_envelope() {
        let mut params = SynthesisParams::default();
        params.envelope.swap(1, 2);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let cases = [
            SynthesisParams {
                noise_duration_s: f32::INFINITY,
                ..Default::default()
            },
            SynthesisParams {
                noise_duration_s: f32::NAN,
                ..Default::default()
            },
            SynthesisParams {
                tone_frequency_hz: f32::NAN,
                ..Default::default()
            },
            SynthesisParams {
                filter_q: f32::INFINITY,
                ..Default::default()
            },
            SynthesisParams {
                noise_gain: f32::NAN,
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(params.validate().is_err(), "accepted {:?}", params);
        }
    }
}
