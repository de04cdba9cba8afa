//! Signal-producing and signal-shaping nodes.

use rand::Rng;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::sync::Arc;

use super::analyser::AnalysisTap;
use super::param::AudioParam;
use crate::error::{AudioError, AudioResult};

/// Timing of the render quantum being processed
#[derive(Debug, Clone, Copy)]
pub struct BlockClock {
    /// Context time of the first frame (seconds)
    pub start_time: f64,
    pub sample_rate: f32,
}

impl BlockClock {
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.sample_rate as f64
    }
}

/// Lifecycle of a scheduled source node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Unscheduled,
    Playing,
    Finished,
}

impl PlaybackState {
    fn start(&mut self) -> AudioResult<()> {
        match self {
            Self::Unscheduled => {
                *self = Self::Playing;
                Ok(())
            }
            _ => Err(AudioError::InvalidState("source already started")),
        }
    }

    fn stop(&mut self) -> AudioResult<()> {
        match self {
            Self::Playing => {
                *self = Self::Finished;
                Ok(())
            }
            Self::Unscheduled => Err(AudioError::InvalidState("source not started")),
            Self::Finished => Err(AudioError::InvalidState("source already stopped")),
        }
    }
}

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorType {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// PolyBLEP correction for a discontinuity at phase 0
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

/// Periodic tone generator
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: OscillatorType,
    /// Frequency (Hz)
    pub frequency: AudioParam,
    phase: f32,
    state: PlaybackState,
}

impl Oscillator {
    pub fn new(waveform: OscillatorType, frequency_hz: f32) -> Self {
        Self {
            waveform,
            frequency: AudioParam::new(frequency_hz, 0.0, 24_000.0),
            phase: 0.0,
            state: PlaybackState::Unscheduled,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn start(&mut self) -> AudioResult<()> {
        self.state.start()
    }

    pub fn stop(&mut self) -> AudioResult<()> {
        self.state.stop()
    }

    fn sample(&self, dt: f32) -> f32 {
        let phase = self.phase;
        match self.waveform {
            OscillatorType::Sine => (2.0 * PI * phase).sin(),
            OscillatorType::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            OscillatorType::Square => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(phase, dt) - poly_blep((phase + 0.5) % 1.0, dt)
            }
            OscillatorType::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }

    pub fn process(&mut self, output: &mut [f32], clock: &BlockClock) {
        if self.state != PlaybackState::Playing {
            output.fill(0.0);
            return;
        }
        let frame_duration = clock.frame_duration();
        for (i, out) in output.iter_mut().enumerate() {
            let freq = self
                .frequency
                .value_at(clock.start_time + i as f64 * frame_duration);
            let dt = (freq / clock.sample_rate).clamp(0.0, 0.5);
            *out = self.sample(dt);
            self.phase += dt;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    }
}

/// Biquad response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadType {
    Lowpass,
    Highpass,
    /// Constant 0 dB peak gain at the center frequency
    Bandpass,
    Notch,
}

#[derive(Debug, Clone, Copy, Default)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    /// Audio EQ cookbook design, normalised by a0
    fn design(kind: BiquadType, frequency_hz: f32, q: f32, sample_rate: f32) -> Self {
        let nyquist = sample_rate / 2.0;
        let w0 = 2.0 * PI * frequency_hz.clamp(1.0, nyquist * 0.999) / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q.max(1e-4));

        let (b0, b1, b2) = match kind {
            BiquadType::Lowpass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            BiquadType::Highpass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
            BiquadType::Bandpass => (alpha, 0.0, -alpha),
            BiquadType::Notch => (1.0, -2.0 * cos_w0, 1.0),
        };
        let a0 = 1.0 + alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Second-order IIR filter (transposed direct form II)
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub kind: BiquadType,
    /// Center or cutoff frequency (Hz)
    pub frequency: AudioParam,
    /// Resonance (linear Q)
    pub q: AudioParam,
    coefficients: Coefficients,
    designed_for: Option<(f32, f32, f32)>,
    z1: f32,
    z2: f32,
}

impl BiquadFilter {
    pub fn new(kind: BiquadType, frequency_hz: f32, q: f32) -> Self {
        Self {
            kind,
            frequency: AudioParam::new(frequency_hz, 0.0, 24_000.0),
            q: AudioParam::new(q, 1e-4, 1_000.0),
            coefficients: Coefficients::default(),
            designed_for: None,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn update_coefficients(&mut self, clock: &BlockClock) {
        // k-rate: parameters are sampled once per render quantum
        let frequency = self.frequency.value_at(clock.start_time);
        let q = self.q.value_at(clock.start_time);
        let key = (frequency, q, clock.sample_rate);
        if self.designed_for != Some(key) {
            self.coefficients = Coefficients::design(self.kind, frequency, q, clock.sample_rate);
            self.designed_for = Some(key);
        }
    }

    /// Magnitude response at `frequency_hz` for the current parameter values
    pub fn magnitude_response(&self, frequency_hz: f32, sample_rate: f32) -> f32 {
        let c = Coefficients::design(
            self.kind,
            self.frequency.value(),
            self.q.value(),
            sample_rate,
        );
        let w = 2.0 * PI * frequency_hz / sample_rate;
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = Complex::from_polar(1.0, -2.0 * w);
        let numerator = Complex::new(c.b0, 0.0) + z1 * c.b1 + z2 * c.b2;
        let denominator = Complex::new(1.0, 0.0) + z1 * c.a1 + z2 * c.a2;
        (numerator / denominator).norm()
    }

    pub fn process(&mut self, input: &[f32], output: &mut [f32], clock: &BlockClock) {
        self.update_coefficients(clock);
        let c = self.coefficients;
        for (x, y) in input.iter().zip(output.iter_mut()) {
            let out = c.b0 * x + self.z1;
            self.z1 = c.b1 * x - c.a1 * out + self.z2;
            self.z2 = c.b2 * x - c.a2 * out;
            *y = out;
        }
    }
}

/// Immutable mono sample buffer
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    sample_rate: f32,
    samples: Arc<[f32]>,
}

impl AudioBuffer {
    pub fn new(sample_rate: f32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples: samples.into(),
        }
    }

    /// Uniform white noise in [-amplitude, amplitude)
    pub fn noise<R: Rng + ?Sized>(
        sample_rate: f32,
        duration_s: f32,
        amplitude: f32,
        rng: &mut R,
    ) -> Self {
        let len = (sample_rate * duration_s) as usize;
        let samples = (0..len)
            .map(|_| rng.gen_range(-1.0f32..1.0) * amplitude)
            .collect();
        Self::new(sample_rate, samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_s(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// Plays an [`AudioBuffer`], optionally looping
#[derive(Debug, Clone)]
pub struct BufferSource {
    buffer: AudioBuffer,
    pub looping: bool,
    position: usize,
    state: PlaybackState,
}

impl BufferSource {
    pub fn new(buffer: AudioBuffer, looping: bool) -> Self {
        Self {
            buffer,
            looping,
            position: 0,
            state: PlaybackState::Unscheduled,
        }
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn start(&mut self) -> AudioResult<()> {
        self.state.start()
    }

    pub fn stop(&mut self) -> AudioResult<()> {
        self.state.stop()
    }

    pub fn process(&mut self, output: &mut [f32]) {
        let samples = self.buffer.samples();
        for out in output.iter_mut() {
            if self.state != PlaybackState::Playing || samples.is_empty() {
                *out = 0.0;
                continue;
            }
            *out = samples[self.position];
            self.position += 1;
            if self.position == samples.len() {
                if self.looping {
                    self.position = 0;
                } else {
                    self.state = PlaybackState::Finished;
                }
            }
        }
    }
}

/// Multiplies its input by an automatable gain
#[derive(Debug, Clone)]
pub struct Gain {
    pub gain: AudioParam,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AudioParam::new(gain, 0.0, 16.0),
        }
    }

    pub fn process(&mut self, input: &[f32], output: &mut [f32], clock: &BlockClock) {
        self.gain
            .fill(clock.start_time, clock.frame_duration(), output);
        for (y, x) in output.iter_mut().zip(input) {
            *y *= x;
        }
    }
}

/// Node kinds the graph can host
#[derive(Debug)]
pub enum Node {
    Oscillator(Oscillator),
    BiquadFilter(BiquadFilter),
    BufferSource(BufferSource),
    Gain(Gain),
    /// Pass-through that records what it hears into a tap
    Analyser(AnalysisTap),
    Destination,
}

/// Discriminant of [`Node`], used for census and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Oscillator,
    BiquadFilter,
    BufferSource,
    Gain,
    Analyser,
    Destination,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Oscillator => "oscillator",
            Self::BiquadFilter => "biquad filter",
            Self::BufferSource => "buffer source",
            Self::Gain => "gain",
            Self::Analyser => "analyser",
            Self::Destination => "destination",
        }
    }
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Oscillator(_) => NodeType::Oscillator,
            Self::BiquadFilter(_) => NodeType::BiquadFilter,
            Self::BufferSource(_) => NodeType::BufferSource,
            Self::Gain(_) => NodeType::Gain,
            Self::Analyser(_) => NodeType::Analyser,
            Self::Destination => NodeType::Destination,
        }
    }

    /// Source nodes ignore their (empty) input
    pub fn process(&mut self, input: &[f32], output: &mut [f32], clock: &BlockClock) {
        match self {
            Self::Oscillator(osc) => osc.process(output, clock),
            Self::BufferSource(source) => source.process(output),
            Self::BiquadFilter(filter) => filter.process(input, output, clock),
            Self::Gain(gain) => gain.process(input, output, clock),
            Self::Analyser(tap) => {
                output.copy_from_slice(input);
                tap.record(input);
            }
            Self::Destination => output.copy_from_slice(input),
        }
    }
}

impl From<Oscillator> for Node {
    fn from(node: Oscillator) -> Self {
        Self::Oscillator(node)
    }
}

impl From<BiquadFilter> for Node {
    fn from(node: BiquadFilter) -> Self {
        Self::BiquadFilter(node)
    }
}

impl From<BufferSource> for Node {
    fn from(node: BufferSource) -> Self {
        Self::BufferSource(node)
    }
}

impl From<Gain> for Node {
    fn from(node: Gain) -> Self {
        Self::Gain(node)
    }
}

impl From<AnalysisTap> for Node {
    fn from(tap: AnalysisTap) -> Self {
        Self::Analyser(tap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SR: f32 = 44_100.0;

    fn clock(start_time: f64) -> BlockClock {
        BlockClock {
            start_time,
            sample_rate: SR,
        }
    }

    #[test]
    fn test_source_double_stop_is_invalid_state() {
        let mut osc = Oscillator::new(OscillatorType::Sawtooth, 220.0);
        assert!(osc.stop().is_err());
        osc.start().unwrap();
        assert!(osc.start().is_err());
        osc.stop().unwrap();
        assert_eq!(
            osc.stop(),
            Err(AudioError::InvalidState("source already stopped"))
        );
    }

    #[test]
    fn test_silent_until_started() {
        let mut osc = Oscillator::new(OscillatorType::Sine, 440.0);
        let mut out = [1.0f32; 64];
        osc.process(&mut out, &clock(0.0));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_sawtooth_stays_bounded() {
        let mut osc = Oscillator::new(OscillatorType::Sawtooth, 220.0);
        osc.start().unwrap();
        let mut out = [0.0f32; 1024];
        osc.process(&mut out, &clock(0.0));
        assert!(out.iter().all(|s| s.abs() <= 1.01));
        assert!(out.iter().any(|&s| s > 0.9));
        assert!(out.iter().any(|&s| s < -0.9));
    }

    #[test]
    fn test_bandpass_peaks_at_center() {
        let filter = BiquadFilter::new(BiquadType::Bandpass, 1200.0, 1.2);
        let at_center = filter.magnitude_response(1200.0, SR);
        let low = filter.magnitude_response(100.0, SR);
        let high = filter.magnitude_response(10_000.0, SR);

        assert!((at_center - 1.0).abs() < 0.01);
        assert!(low < 0.2);
        assert!(high < 0.3);
    }

    /// One started oscillator, 100 samples per period
    fn one_period(waveform: OscillatorType) -> [f32; 100] {
        let mut osc = Oscillator::new(waveform, 441.0);
        osc.start().unwrap();
        let mut out = [0.0f32; 100];
        osc.process(&mut out, &clock(0.0));
        out
    }

    #[test]
    fn test_sine_period() {
        let out = one_period(OscillatorType::Sine);
        assert!(out[0].abs() < 1e-6);
        assert!((out[25] - 1.0).abs() < 1e-3);
        assert!((out[75] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_square_halves() {
        let out = one_period(OscillatorType::Square);
        assert!(out.iter().all(|s| s.abs() <= 1.0 + 1e-6));
        assert!(out[10..40].iter().all(|&s| (s - 1.0).abs() < 1e-6));
        assert!(out[60..90].iter().all(|&s| (s + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_triangle_shape() {
        let out = one_period(OscillatorType::Triangle);
        assert!(out.iter().all(|s| s.abs() <= 1.0 + 1e-6));
        assert!((out[0] + 1.0).abs() < 1e-3);
        assert!(out[25].abs() < 1e-2);
        assert!((out[50] - 1.0).abs() < 1e-2);
        assert!(out[75].abs() < 1e-2);
    }

    #[test]
    fn test_lowpass_and_highpass_responses() {
        let lowpass = BiquadFilter::new(BiquadType::Lowpass, 1000.0, 0.707);
        assert!((lowpass.magnitude_response(10.0, SR) - 1.0).abs() < 0.01);
        assert!(lowpass.magnitude_response(20_000.0, SR) < 0.05);

        let highpass = BiquadFilter::new(BiquadType::Highpass, 1000.0, 0.707);
        assert!(highpass.magnitude_response(10.0, SR) < 0.01);
        assert!((highpass.magnitude_response(15_000.0, SR) - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_notch_rejects_center() {
        let notch = BiquadFilter::new(BiquadType::Notch, 1200.0, 1.2);
        assert!(notch.magnitude_response(1200.0, SR) < 0.01);
        assert!(notch.magnitude_response(100.0, SR) > 0.9);
        assert!(notch.magnitude_response(15_000.0, SR) > 0.9);
    }

    #[test]
    fn test_lowpass_passes_dc_when_processing() {
        let mut filter = BiquadFilter::new(BiquadType::Lowpass, 1000.0, 0.707);
        let input = [1.0f32; 128];
        let mut output = [0.0f32; 128];
        for block in 0..40 {
            filter.process(&input, &mut output, &clock(block as f64 * 128.0 / SR as f64));
        }
        assert!((output[127] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_noise_buffer_length_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let buffer = AudioBuffer::noise(SR, 2.0, 0.4, &mut rng);
        assert_eq!(buffer.len(), 88_200);
        assert!((buffer.duration_s() - 2.0).abs() < 1e-6);
        assert!(buffer.samples().iter().all(|s| (-0.4..0.4).contains(s)));
    }

    #[test]
    fn test_looping_source_wraps() {
        let buffer = AudioBuffer::new(SR, vec![0.1, 0.2, 0.3]);
        let mut source = BufferSource::new(buffer, true);
        source.start().unwrap();
        let mut out = [0.0f32; 7];
        source.process(&mut out);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
        assert_eq!(source.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_one_shot_source_finishes() {
        let buffer = AudioBuffer::new(SR, vec![0.5, 0.5]);
        let mut source = BufferSource::new(buffer, false);
        source.start().unwrap();
        let mut out = [1.0f32; 4];
        source.process(&mut out);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(source.state(), PlaybackState::Finished);
    }

    #[test]
    fn test_gain_follows_automation() {
        let mut gain = Gain::new(0.0);
        gain.gain.linear_ramp_to_value_at_time(1.0, 1.0, 0.0);
        let input = [1.0f32; 4];
        let mut out = [0.0f32; 4];
        gain.process(&input, &mut out, &clock(0.5));
        assert!((out[0] - 0.5).abs() < 1e-3);
        assert!(out[3] > out[0]);
    }
}
