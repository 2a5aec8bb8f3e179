//! VComp Core - Foundation types for frame compositing
//!
//! This crate provides the fundamental types used throughout vcomp:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Image buffers and the packed 32-bit pixel formats
//! - Track and buffer identifiers
//! - Pixel-space geometry
//! - The instruction kind tag shared by timelines and renderers

pub mod error;
pub mod frame;
pub mod geometry;
pub mod kind;
pub mod time;

pub use error::{CoreError, Result};
pub use frame::{BufferId, BufferRecycler, ImageBuffer, PixelFormat, SharedImage, TrackId};
pub use geometry::PixelRect;
pub use kind::TimelineKind;
pub use time::{FrameRate, RationalTime, TimeRange};
