//! Simulated-transmission synthesis graph.
//!
//! ```text
//! tone (saw) -> band-pass -> tone gain --\
//!                                         +--> analyser -> destination
//! noise (looped) ---------> noise gain --/
//! ```

use rand::Rng;
use std::collections::BTreeMap;

use super::analyser::AnalysisTap;
use super::backend::AudioBackend;
use super::context::{AudioContext, ContextState};
use super::graph::{AudioGraph, NodeId};
use super::nodes::{
    AudioBuffer, BiquadFilter, BiquadType, BufferSource, Gain, NodeType, Oscillator,
    OscillatorType,
};
use super::param::AutomationEvent;
use crate::error::{AudioError, AudioResult};
use crate::params::SynthesisParams;

/// Node handles of one built graph
#[derive(Debug, Clone, Copy)]
struct Wiring {
    tone: NodeId,
    filter: NodeId,
    tone_gain: NodeId,
    noise: NodeId,
    noise_gain: NodeId,
    analyser: NodeId,
}

impl Wiring {
    fn all(&self) -> [NodeId; 6] {
        [
            self.tone,
            self.filter,
            self.tone_gain,
            self.noise,
            self.noise_gain,
            self.analyser,
        ]
    }
}

/// A built, running synthesis graph and the context it plays through
pub struct SynthesisGraph {
    context: AudioContext,
    wiring: Wiring,
    tap: AnalysisTap,
    started_at: f64,
    torn_down: bool,
}

impl SynthesisGraph {
    /// Read-only waveform tap feeding the visualizer
    pub fn tap(&self) -> &AnalysisTap {
        &self.tap
    }

    /// Context time at which the envelope was scheduled (seconds)
    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn context_state(&self) -> ContextState {
        self.context.state()
    }

    /// Node count per type, destination included
    pub fn census(&self) -> BTreeMap<NodeType, usize> {
        self.context.graph().census()
    }

    /// Automation scheduled on the tone gain
    pub fn tone_envelope(&self) -> AudioResult<Vec<AutomationEvent>> {
        let graph = self.context.graph();
        Ok(graph.gain(self.wiring.tone_gain)?.gain.events().to_vec())
    }

    /// Tone gain value at context time `t`
    pub fn tone_gain_at(&self, t: f64) -> AudioResult<f32> {
        let graph = self.context.graph();
        Ok(graph.gain(self.wiring.tone_gain)?.gain.value_at(t))
    }

    /// Render frames on the caller's thread (offline backends only)
    pub fn pump(&mut self, frames: usize) {
        if !self.torn_down {
            self.context.pump(frames);
        }
    }

    /// Stop both sources and close the context.
    ///
    /// Safe to call any number of times; stop and close failures are logged
    /// and discarded.
    pub fn teardown(&mut self) {
        if std::mem::replace(&mut self.torn_down, true) {
            return;
        }

        {
            let mut graph = self.context.graph();
            let stops = [
                graph
                    .oscillator_mut(self.wiring.tone)
                    .and_then(|tone| tone.stop()),
                graph
                    .buffer_source_mut(self.wiring.noise)
                    .and_then(|noise| noise.stop()),
            ];
            for result in stops {
                if let Err(e) = result {
                    log::debug!("Ignoring source stop failure: {}", e);
                }
            }

            // Unhook everything so a late device callback renders silence
            for id in self.wiring.all() {
                if let Err(e) = graph.disconnect(id) {
                    log::debug!("Ignoring disconnect failure: {}", e);
                }
            }
        }

        if let Err(e) = self.context.close() {
            log::debug!("Ignoring context close failure: {}", e);
        }
    }
}

impl Drop for SynthesisGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Builds the fixed transmission graph from [`SynthesisParams`]
#[derive(Debug, Clone, Default)]
pub struct SynthesisGraphBuilder {
    params: SynthesisParams,
}

impl SynthesisGraphBuilder {
    pub fn new(params: SynthesisParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    /// Open a context on `backend`, wire the graph and start every source.
    ///
    /// Sound begins as soon as this returns. On failure the context is closed
    /// again before the error is returned.
    pub fn build<R: Rng + ?Sized>(
        &self,
        backend: &mut dyn AudioBackend,
        rng: &mut R,
    ) -> AudioResult<SynthesisGraph> {
        self.params.validate().map_err(AudioError::InvalidParam)?;

        let mut context = AudioContext::new(backend)?;
        let tap = AnalysisTap::new(self.params.analyser.clone());

        let wired = {
            let mut graph = context.graph();
            let started_at = graph.current_time();
            self.wire(&mut graph, &tap, started_at, rng)
                .map(|wiring| (wiring, started_at))
        };

        match wired {
            Ok((wiring, started_at)) => Ok(SynthesisGraph {
                context,
                wiring,
                tap,
                started_at,
                torn_down: false,
            }),
            Err(e) => {
                if let Err(close_err) = context.close() {
                    log::debug!("Ignoring context close failure: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn wire<R: Rng + ?Sized>(
        &self,
        graph: &mut AudioGraph,
        tap: &AnalysisTap,
        now: f64,
        rng: &mut R,
    ) -> AudioResult<Wiring> {
        let p = &self.params;

        let analyser = graph.add(tap.clone());
        let tone = graph.add(Oscillator::new(
            OscillatorType::Sawtooth,
            p.tone_frequency_hz,
        ));
        let filter = graph.add(BiquadFilter::new(
            BiquadType::Bandpass,
            p.filter_center_hz,
            p.filter_q,
        ));
        let tone_gain = graph.add(Gain::new(0.0));

        let noise_buffer = AudioBuffer::noise(
            graph.sample_rate(),
            p.noise_duration_s,
            p.noise_amplitude,
            rng,
        );
        let noise = graph.add(BufferSource::new(noise_buffer, true));
        let noise_gain = graph.add(Gain::new(p.noise_gain));

        let destination = graph.destination();
        graph.connect(tone, filter)?;
        graph.connect(filter, tone_gain)?;
        graph.connect(tone_gain, analyser)?;
        graph.connect(analyser, destination)?;
        graph.connect(noise, noise_gain)?;
        graph.connect(noise_gain, analyser)?;

        graph.oscillator_mut(tone)?.start()?;
        graph.buffer_source_mut(noise)?.start()?;

        let envelope = &mut graph.gain_mut(tone_gain)?.gain;
        for point in &p.envelope {
            envelope.linear_ramp_to_value_at_time(point.value, now + point.offset_s, now);
        }

        log::debug!(
            "Synthesis graph wired: {} nodes @ {}Hz",
            graph.len(),
            graph.sample_rate()
        );

        Ok(Wiring {
            tone,
            filter,
            tone_gain,
            noise,
            noise_gain,
            analyser,
        })
    }
}
