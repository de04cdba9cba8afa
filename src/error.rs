//! Error types for the audio engine, the renderer and the console.

use thiserror::Error;

/// Result type for audio engine operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors raised by the audio graph, its nodes and output backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No usable output device on the host
    #[error("no audio output device found")]
    NoOutputDevice,

    /// Device configuration could not be queried
    #[error("failed to query device config: {0}")]
    DeviceConfig(String),

    /// Output stream could not be built or started
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Operation not allowed in the current node or context state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Node id does not belong to this graph
    #[error("unknown node {0}")]
    UnknownNode(usize),

    /// Node exists but is not of the requested type
    #[error("node {id} is a {actual}, expected {expected}")]
    WrongNodeType {
        id: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// Connection would make the graph cyclic or leave the destination
    #[error("cannot connect node {from} to node {to}: {reason}")]
    InvalidConnection {
        from: usize,
        to: usize,
        reason: &'static str,
    },

    /// Parameter value out of range
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}

/// Errors raised while presenting or saving frames
#[derive(Error, Debug)]
pub enum RenderError {
    /// GPU adapter, device or surface setup failed
    #[error("GPU setup failed: {0}")]
    Gpu(String),

    /// Surface texture could not be acquired
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// Event loop or window could not be created
    #[error("window system error: {0}")]
    Window(String),

    /// Frame could not be written as PNG
    #[error("failed to save frame: {0}")]
    Image(#[from] image::ImageError),

    /// Framebuffer dimensions are unusable
    #[error("invalid framebuffer size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Top-level error for the console and its host
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Parameter set rejected by `validate()`
    #[error("invalid configuration: {0}")]
    Config(String),
}
