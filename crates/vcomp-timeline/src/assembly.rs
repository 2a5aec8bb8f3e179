//! Layout helpers that turn a list of clips into an instruction set.

use crate::error::Result;
use crate::instruction::{LayerInstruction, TimelineInstructionSet};
use tracing::debug;
use vcomp_core::{RationalTime, TimeRange, TrackId};

/// One clip placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clip {
    pub track: TrackId,
    pub duration: RationalTime,
}

impl Clip {
    pub fn new(track: TrackId, duration: RationalTime) -> Self {
        Self { track, duration }
    }
}

/// Clips back to back from `start`, each one's transition beginning where
/// the clip does.
pub fn sequential_layout(
    start: RationalTime,
    clips: &[Clip],
    transition_window: RationalTime,
) -> Result<TimelineInstructionSet> {
    let mut cursor = start;
    let mut layers = Vec::with_capacity(clips.len());
    for clip in clips {
        let range = TimeRange::try_new(cursor, clip.duration)?;
        layers.push(LayerInstruction::new(clip.track, range, cursor));
        cursor = range.end();
    }
    debug!(layers = layers.len(), end = %cursor, "sequential layout");
    TimelineInstructionSet::transition(layers, transition_window)
}

/// All clips start together at `start`; clip `i` takes grid slot `i`.
pub fn parallel_layout(start: RationalTime, clips: &[Clip]) -> Result<TimelineInstructionSet> {
    let mut layers = Vec::with_capacity(clips.len());
    for (slot, clip) in clips.iter().enumerate() {
        let range = TimeRange::try_new(start, clip.duration)?;
        layers.push(LayerInstruction::new(clip.track, range, start).with_slot(slot as u32));
    }
    debug!(layers = layers.len(), "parallel layout");
    TimelineInstructionSet::grid(layers)
}
