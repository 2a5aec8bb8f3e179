//! GPU subsystem errors.

use thiserror::Error;
use vcomp_core::{CoreError, PixelFormat};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("pipeline creation failed for '{label}': {reason}")]
    PipelineCreation { label: String, reason: String },

    #[error("pixel format {0:?} is not supported by this device")]
    UnsupportedFormat(PixelFormat),

    #[error("format mismatch: pipeline renders {expected:?}, got {found:?}")]
    FormatMismatch {
        expected: PixelFormat,
        found: PixelFormat,
    },

    #[error("invalid canvas {width}x{height}: {reason}")]
    InvalidCanvas {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("buffer pool exhausted ({capacity} buffers live)")]
    PoolExhausted { capacity: usize },

    #[error("texture is empty ({width}x{height})")]
    EmptyTexture { width: u32, height: u32 },

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    DeviceRequest(String),

    #[error("command buffer '{label}' failed: {reason}")]
    Execution { label: String, reason: String },

    #[error("command buffer '{0}' has no render target")]
    MissingTarget(String),

    #[error("command queue is closed")]
    QueueClosed,

    #[error("command buffer was cancelled before execution")]
    Cancelled,

    #[error("failed to start GPU queue thread: {0}")]
    Spawn(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for GPU operations.
pub type Result<T> = std::result::Result<T, GpuError>;
