//! Parameter definitions with physical units and documented semantics.
//!
//! All fixed numbers of the widget live here with:
//! - Physical units (seconds, milliseconds, Hz, pixels, percent)
//! - Documented ranges and meanings
//! - A `validate()` per parameter set

mod audio;
mod render;
mod session;

// Re-export all types
pub use audio::{audio_constants, AnalyserConfig, EnvelopePoint, SynthesisParams};
pub use render::{RenderConfig, VisualizerConfig};
pub use session::SessionTiming;
