//! Session controller: start/stop state, signal-strength simulation and the
//! automatic stop.
//!
//! A [`TransmissionConsole`] owns the scheduler it runs its timers and frame
//! requests on. Hosts drive it by advancing simulated time
//! ([`advance_to`](TransmissionConsole::advance_to)) and by delivering display
//! refreshes ([`on_animation_frame`](TransmissionConsole::on_animation_frame)).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::{AudioBackend, SynthesisGraph, SynthesisGraphBuilder};
use crate::error::ConsoleError;
use crate::params::{SessionTiming, SynthesisParams, VisualizerConfig};
use crate::scheduler::{FrameRequestId, Scheduler, TimerId};
use crate::surface::DrawingSurface;
use crate::visualizer::Visualizer;

/// Transmission lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// Everything a console is built from
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    pub synthesis: SynthesisParams,
    pub timing: SessionTiming,
    pub visualizer: VisualizerConfig,
    /// Fixed RNG seed; entropy-seeded when `None`
    pub seed: Option<u64>,
}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.synthesis.validate()?;
        self.timing.validate()?;
        self.visualizer.validate()?;
        Ok(())
    }
}

/// Resources held for exactly one active session
struct SessionResources {
    graph: SynthesisGraph,
    strength_timer: TimerId,
    auto_stop_timer: TimerId,
    frame_request: Option<FrameRequestId>,
}

impl SessionResources {
    /// Cancel every timer and frame request, then tear the graph down
    fn release(mut self, scheduler: &mut Scheduler) {
        scheduler.clear(self.strength_timer);
        scheduler.clear(self.auto_stop_timer);
        if let Some(request) = self.frame_request.take() {
            scheduler.cancel_animation_frame(request);
        }
        self.graph.teardown();
    }
}

/// The interactive transmission widget, minus its page chrome
pub struct TransmissionConsole<B: AudioBackend> {
    backend: B,
    builder: SynthesisGraphBuilder,
    timing: SessionTiming,
    visualizer: Visualizer,
    scheduler: Scheduler,
    rng: StdRng,
    session: Option<SessionResources>,
    /// Unrounded strength of the current (or last) session
    level: f32,
    signal_strength: u8,
}

impl<B: AudioBackend> TransmissionConsole<B> {
    /// Console with default parameters
    pub fn new(backend: B) -> Self {
        let timing = SessionTiming::default();
        Self {
            backend,
            builder: SynthesisGraphBuilder::default(),
            signal_strength: timing.initial_display,
            level: timing.initial_level,
            timing,
            visualizer: Visualizer::new(VisualizerConfig::default()),
            scheduler: Scheduler::new(),
            rng: StdRng::from_entropy(),
            session: None,
        }
    }

    pub fn with_config(backend: B, config: ConsoleConfig) -> Result<Self, ConsoleError> {
        config.validate().map_err(ConsoleError::Config)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            backend,
            builder: SynthesisGraphBuilder::new(config.synthesis),
            signal_strength: config.timing.initial_display,
            level: config.timing.initial_level,
            timing: config.timing,
            visualizer: Visualizer::new(config.visualizer),
            scheduler: Scheduler::new(),
            rng,
            session: None,
        })
    }

    pub fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Displayed signal strength (percent)
    pub fn signal_strength(&self) -> u8 {
        self.signal_strength
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Graph of the active session
    pub fn graph(&self) -> Option<&SynthesisGraph> {
        self.session.as_ref().map(|session| &session.graph)
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Begin a transmission, or end the current one.
    ///
    /// Returns the state after the call. A build failure leaves the console
    /// Idle with nothing scheduled.
    pub fn start(&mut self) -> Result<SessionState, ConsoleError> {
        if self.session.is_some() {
            log::info!("Start requested while active, stopping");
            return Ok(self.stop());
        }

        let graph = match self.builder.build(&mut self.backend, &mut self.rng) {
            Ok(graph) => graph,
            Err(e) => {
                log::warn!("Transmission could not start: {}", e);
                return Err(e.into());
            }
        };

        let strength_timer = self
            .scheduler
            .set_interval(self.timing.strength_update_interval_ms);
        let auto_stop_timer = self.scheduler.set_timeout(self.timing.auto_stop_after_ms);
        let frame_request = Some(self.scheduler.request_animation_frame());

        self.level = self.timing.initial_level;
        self.session = Some(SessionResources {
            graph,
            strength_timer,
            auto_stop_timer,
            frame_request,
        });

        log::info!(
            "Transmission started at {}ms (auto stop in {}ms)",
            self.scheduler.now_ms(),
            self.timing.auto_stop_after_ms
        );
        Ok(SessionState::Active)
    }

    /// End the transmission. Does nothing while Idle.
    pub fn stop(&mut self) -> SessionState {
        if let Some(session) = self.session.take() {
            session.release(&mut self.scheduler);
            log::info!("Transmission stopped at {}ms", self.scheduler.now_ms());
        }
        SessionState::Idle
    }

    /// The single user-facing control
    pub fn toggle(&mut self) -> Result<SessionState, ConsoleError> {
        self.start()
    }

    /// Run every timer due up to `now_ms`, then move the clock there
    pub fn advance_to(&mut self, now_ms: u64) {
        while let Some(id) = self.scheduler.pop_due(now_ms) {
            self.on_timer(id);
        }
        self.scheduler.advance_to(now_ms);
    }

    pub fn advance_by(&mut self, delta_ms: u64) {
        let target = self.scheduler.now_ms() + delta_ms;
        self.advance_to(target);
    }

    fn on_timer(&mut self, id: TimerId) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        if id == session.strength_timer {
            self.perturb_strength();
        } else if id == session.auto_stop_timer {
            log::info!("Transmission timed out");
            self.stop();
        }
    }

    fn perturb_strength(&mut self) {
        let jitter = self.timing.strength_jitter;
        let delta = if jitter > 0.0 {
            self.rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        self.level = self.timing.clamp_level(self.level + delta);
        self.signal_strength = self.level.round() as u8;
        log::trace!("Signal strength {}%", self.signal_strength);
    }

    /// Display refresh: draw one frame if this session asked for it.
    ///
    /// Returns whether anything was drawn. The next frame is requested as
    /// long as the session stays active.
    pub fn on_animation_frame(&mut self, surface: Option<&mut dyn DrawingSurface>) -> bool {
        let requests = self.scheduler.take_frame_requests();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(request) = session.frame_request else {
            return false;
        };
        if !requests.contains(&request) {
            return false;
        }

        let drawn = self.visualizer.draw(surface, Some(session.graph.tap()));
        session.frame_request = Some(self.scheduler.request_animation_frame());
        drawn
    }

    /// Render audio on the caller's thread (offline backends)
    pub fn pump_audio(&mut self, frames: usize) {
        if let Some(session) = self.session.as_mut() {
            session.graph.pump(frames);
        }
    }
}

impl<B: AudioBackend> Drop for TransmissionConsole<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
