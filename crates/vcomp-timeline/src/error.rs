//! Timeline errors.

use thiserror::Error;
use vcomp_core::{CoreError, RationalTime, TrackId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("no active layer at {time}")]
    NoActiveLayer { time: RationalTime },

    #[error("instruction set has no layers")]
    Empty,

    #[error("layer {index} ({track}) starts before the layer ahead of it ends")]
    OverlappingLayers { index: usize, track: TrackId },

    #[error("grid slot {slot} is used by more than one layer")]
    DuplicateSlot { slot: u32 },

    #[error("layer {index} ({track}) has negative duration {duration}")]
    NegativeDuration {
        index: usize,
        track: TrackId,
        duration: RationalTime,
    },

    #[error("watermark instruction set names no overlay track")]
    MissingOverlayTrack,

    #[error("transition window must not be negative, got {0}")]
    NegativeWindow(RationalTime),

    #[error("descriptor version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
