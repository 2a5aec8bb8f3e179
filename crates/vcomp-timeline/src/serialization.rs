//! JSON form of instruction sets.
//!
//! Times serialize as `[numerator, denominator]` pairs so a descriptor
//! written on a 600 Hz clock reads back exactly.

use crate::error::{Result, TimelineError};
use crate::instruction::{LayerInstruction, RequiredTracks, TimelineInstructionSet};
use serde::{Deserialize, Serialize};
use vcomp_core::{RationalTime, TimeRange, TimelineKind, TrackId};

/// Serializable description of one instruction set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSetDescriptor {
    pub kind: TimelineKind,
    pub layers: Vec<LayerInstruction>,
    /// Falls back to the compositor default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_window: Option<RationalTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_track: Option<TrackId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tracks: Option<RequiredTracks>,
    /// Overlay for watermark sets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_track: Option<TrackId>,
}

impl InstructionSetDescriptor {
    /// Describe an existing set.
    pub fn from_set(set: &TimelineInstructionSet) -> Self {
        Self {
            kind: set.kind(),
            layers: set.layers().to_vec(),
            transition_window: match set.kind() {
                TimelineKind::Transition if set.passthrough_track().is_none() => {
                    Some(set.transition_window())
                }
                _ => None,
            },
            passthrough_track: set.passthrough_track(),
            required_tracks: Some(set.required_tracks().clone()),
            overlay_track: set.overlay_track(),
        }
    }

    /// Validate and build the instruction set.
    pub fn build(&self, default_window: RationalTime) -> Result<TimelineInstructionSet> {
        let set = match (self.passthrough_track, self.kind) {
            (Some(track), _) => {
                if self.layers.is_empty() {
                    return Err(TimelineError::Empty);
                }
                let range = self
                    .layers
                    .iter()
                    .fold(TimeRange::EMPTY, |hull, l| hull.union(l.active_range));
                TimelineInstructionSet::passthrough(track, range)
            }
            (None, TimelineKind::Transition) => TimelineInstructionSet::transition(
                self.layers.clone(),
                self.transition_window.unwrap_or(default_window),
            )?,
            (None, TimelineKind::Grid) => TimelineInstructionSet::grid(self.layers.clone())?,
            (None, TimelineKind::Watermark) => {
                let overlay = self.overlay_track.ok_or(TimelineError::MissingOverlayTrack)?;
                TimelineInstructionSet::watermark(self.layers.clone(), overlay)?
            }
        };
        Ok(match &self.required_tracks {
            Some(required) => set.with_required_tracks(required.clone()),
            None => set,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            TimelineError::Serialization(format!("failed to serialize instruction set: {e}"))
        })
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| TimelineError::Serialization(format!("invalid instruction set: {e}")))
    }
}
