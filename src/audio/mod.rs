//! Audio engine: node graph, automation, analysis and output backends.
//!
//! Models a small browser-style audio context: nodes are added to an
//! [`AudioGraph`], connected into a DAG and rendered in 128-frame quanta by
//! whichever [`AudioBackend`] the context was opened on.

mod analyser;
mod backend;
mod context;
mod fft;
mod graph;
mod nodes;
mod param;
mod synthesis;

// Re-export public types
pub use analyser::AnalysisTap;
pub use backend::{AudioBackend, CpalBackend, OfflineBackend, OutputStream, SharedGraph};
pub use context::{AudioContext, ContextState};
pub use fft::{blackman_window, to_decibels, SpectrumAnalyzer};
pub use graph::{AudioGraph, NodeId};
pub use nodes::{
    AudioBuffer, BiquadFilter, BiquadType, BlockClock, BufferSource, Gain, Node, NodeType,
    Oscillator, OscillatorType, PlaybackState,
};
pub use param::{AudioParam, AutomationEvent, AutomationKind};
pub use synthesis::{SynthesisGraph, SynthesisGraphBuilder};
