//! Compositor errors. Every failed request reports exactly one of these.

use thiserror::Error;
use vcomp_core::{RationalTime, TimelineKind, TrackId};
use vcomp_effects::RenderError;
use vcomp_gpu::GpuError;
use vcomp_timeline::TimelineError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositorError {
    #[error("no instruction for the request: {0}")]
    MissingInstruction(#[source] TimelineError),

    #[error("source frame for {track} at {time} is unavailable")]
    SourceFrameUnavailable { track: TrackId, time: RationalTime },

    #[error("output buffer allocation failed: {0}")]
    OutputBufferAllocationFailed(#[source] GpuError),

    #[error("instruction set is {found}, renderer draws {expected}")]
    IncompatibleInstructionType {
        expected: TimelineKind,
        found: TimelineKind,
    },

    #[error("renderer initialization failed: {0}")]
    RendererInit(#[source] RenderError),

    #[error("render failed: {0}")]
    Render(#[source] RenderError),

    #[error("invalid timeline: {0}")]
    InvalidTimeline(#[source] TimelineError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("failed to start compositor lane: {0}")]
    Spawn(String),

    #[error("request was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CompositorError>;
