//! Transmission console - simulated radio transmission with a live scope
//!
//! Toggling the console on synthesizes a filtered sawtooth over looped
//! static, draws the waveform with a scanline overlay and jitters a signal
//! readout until the transmission ends on its own.

pub mod audio;
pub mod cli;
pub mod error;
pub mod params;
pub mod rendering;
pub mod scheduler;
pub mod session;
pub mod surface;
pub mod telemetry;
pub mod visualizer;

pub use error::{AudioError, ConsoleError, RenderError};
pub use session::{ConsoleConfig, SessionState, TransmissionConsole};
