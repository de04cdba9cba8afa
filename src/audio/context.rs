//! Audio context: one graph bound to one output stream.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use super::backend::{AudioBackend, OutputStream, SharedGraph};
use super::graph::AudioGraph;
use crate::error::{AudioError, AudioResult};

/// Lifecycle of an [`AudioContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Closed,
}

/// Owns a graph and the stream rendering it
pub struct AudioContext {
    graph: SharedGraph,
    stream: Option<Box<dyn OutputStream>>,
    sample_rate: f32,
}

impl AudioContext {
    /// Open a running context on `backend`
    pub fn new(backend: &mut dyn AudioBackend) -> AudioResult<Self> {
        let sample_rate = backend.sample_rate()?;
        let graph = Arc::new(Mutex::new(AudioGraph::new(sample_rate)));
        let stream = backend.open(Arc::clone(&graph))?;

        log::debug!("Audio context opened @ {}Hz", sample_rate);

        Ok(Self {
            graph,
            stream: Some(stream),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        if self.stream.is_some() {
            ContextState::Running
        } else {
            ContextState::Closed
        }
    }

    /// Context time in seconds
    pub fn current_time(&self) -> f64 {
        self.graph.lock().current_time()
    }

    /// Lock the graph for construction or inspection.
    ///
    /// Hold the guard briefly: the audio callback waits on it.
    pub fn graph(&self) -> MutexGuard<'_, AudioGraph> {
        self.graph.lock()
    }

    /// Render `frames` frames when the backend has no device clock
    pub fn pump(&mut self, frames: usize) {
        if let Some(stream) = self.stream.as_mut() {
            stream.pump(frames);
        }
    }

    /// Release the output stream. Closing twice is an invalid-state error.
    pub fn close(&mut self) -> AudioResult<()> {
        let mut stream = self
            .stream
            .take()
            .ok_or(AudioError::InvalidState("context already closed"))?;
        stream.close()?;
        log::debug!("Audio context closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::OfflineBackend;

    #[test]
    fn test_close_twice_is_invalid_state() {
        let mut backend = OfflineBackend::default();
        let mut context = AudioContext::new(&mut backend).unwrap();
        assert_eq!(context.state(), ContextState::Running);

        assert!(context.close().is_ok());
        assert_eq!(context.state(), ContextState::Closed);
        assert_eq!(
            context.close(),
            Err(AudioError::InvalidState("context already closed"))
        );
    }

    #[test]
    fn test_pump_moves_clock_until_closed() {
        let mut backend = OfflineBackend::new(48_000.0);
        let mut context = AudioContext::new(&mut backend).unwrap();
        assert_eq!(context.sample_rate(), 48_000.0);

        context.pump(480);
        let before_close = context.current_time();
        assert!(before_close > 0.0);

        context.close().unwrap();
        context.pump(480);
        assert_eq!(context.current_time(), before_close);
    }
}
