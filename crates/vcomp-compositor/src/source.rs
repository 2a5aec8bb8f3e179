//! Where decoded source frames come from.

use parking_lot::RwLock;
use std::collections::HashMap;
use vcomp_core::{RationalTime, SharedImage, TrackId};

/// Supplies decoded frames by track.
///
/// Called concurrently from the compositor lane for different requests.
/// `None` means the frame is not available right now; the compositor never
/// retries.
pub trait FrameSource: Send + Sync {
    fn source_frame(&self, track: TrackId, time: RationalTime) -> Option<SharedImage>;
}

impl<F> FrameSource for F
where
    F: Fn(TrackId, RationalTime) -> Option<SharedImage> + Send + Sync,
{
    fn source_frame(&self, track: TrackId, time: RationalTime) -> Option<SharedImage> {
        self(track, time)
    }
}

/// One still frame per track, whatever the time.
#[derive(Debug, Default)]
pub struct StaticFrameSource {
    frames: RwLock<HashMap<TrackId, SharedImage>>,
}

impl StaticFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(self, track: TrackId, frame: SharedImage) -> Self {
        self.insert(track, frame);
        self
    }

    pub fn insert(&self, track: TrackId, frame: SharedImage) -> Option<SharedImage> {
        self.frames.write().insert(track, frame)
    }

    pub fn remove(&self, track: TrackId) -> Option<SharedImage> {
        self.frames.write().remove(&track)
    }
}

impl FrameSource for StaticFrameSource {
    fn source_frame(&self, track: TrackId, _time: RationalTime) -> Option<SharedImage> {
        self.frames.read().get(&track).cloned()
    }
}
