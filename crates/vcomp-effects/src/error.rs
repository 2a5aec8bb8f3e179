//! Renderer errors.

use thiserror::Error;
use vcomp_core::PixelFormat;
use vcomp_gpu::GpuError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("{renderer} renders {expected:?}, got {found:?}")]
    FormatMismatch {
        renderer: &'static str,
        expected: PixelFormat,
        found: PixelFormat,
    },

    #[error("{renderer} needs {expected} inputs, got {found}")]
    MissingInputs {
        renderer: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("slot {slot} is out of range or already used (grid has {slots} slots)")]
    InvalidSlot { slot: u32, slots: u32 },
}

pub type Result<T> = std::result::Result<T, RenderError>;
