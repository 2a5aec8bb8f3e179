//! Layer instructions and the instruction sets that group them.

use crate::error::{Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vcomp_core::{RationalTime, TimeRange, TimelineKind, TrackId};

/// One source layer's scheduled participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInstruction {
    pub track: TrackId,
    pub active_range: TimeRange,
    /// Blend progress is measured from here.
    pub transition_start: RationalTime,
    /// Grid slot, row-major. Ignored by transitions.
    #[serde(default)]
    pub slot: u32,
}

impl LayerInstruction {
    pub fn new(track: TrackId, active_range: TimeRange, transition_start: RationalTime) -> Self {
        Self {
            track,
            active_range,
            transition_start,
            slot: 0,
        }
    }

    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    #[inline]
    pub fn is_active_at(&self, time: RationalTime) -> bool {
        self.active_range.contains(time)
    }
}

/// Tracks whose frames must be decoded for an instruction set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredTracks {
    All,
    Only(BTreeSet<TrackId>),
}

impl RequiredTracks {
    pub fn contains(&self, track: TrackId) -> bool {
        match self {
            Self::All => true,
            Self::Only(tracks) => tracks.contains(&track),
        }
    }
}

/// Immutable group of layers rendered by one renderer kind.
///
/// `covered_range` is always the hull of the layers' active ranges; there
/// is no way to set it independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineInstructionSet {
    kind: TimelineKind,
    layers: Vec<LayerInstruction>,
    covered_range: TimeRange,
    requires_tweening: bool,
    required_tracks: RequiredTracks,
    passthrough_track: Option<TrackId>,
    overlay_track: Option<TrackId>,
    transition_window: RationalTime,
}

impl TimelineInstructionSet {
    /// Sequential layers blended pairwise over `transition_window`.
    ///
    /// Layers must be ordered by start time and must not overlap.
    pub fn transition(
        layers: Vec<LayerInstruction>,
        transition_window: RationalTime,
    ) -> Result<Self> {
        if transition_window.is_negative() {
            return Err(TimelineError::NegativeWindow(transition_window));
        }
        check_durations(&layers)?;
        for (index, pair) in layers.windows(2).enumerate() {
            if pair[1].active_range.start < pair[0].active_range.end() {
                return Err(TimelineError::OverlappingLayers {
                    index: index + 1,
                    track: pair[1].track,
                });
            }
        }
        Self::build(TimelineKind::Transition, layers, transition_window)
    }

    /// Simultaneous layers, each drawn into its own grid slot.
    pub fn grid(layers: Vec<LayerInstruction>) -> Result<Self> {
        check_durations(&layers)?;
        let mut slots = BTreeSet::new();
        for layer in &layers {
            if !slots.insert(layer.slot) {
                return Err(TimelineError::DuplicateSlot { slot: layer.slot });
            }
        }
        Self::build(TimelineKind::Grid, layers, RationalTime::ZERO)
    }

    /// The first active layer with `overlay_track`'s frame drawn into the
    /// top-right corner.
    pub fn watermark(layers: Vec<LayerInstruction>, overlay_track: TrackId) -> Result<Self> {
        check_durations(&layers)?;
        let mut set = Self::build(TimelineKind::Watermark, layers, RationalTime::ZERO)?;
        if let RequiredTracks::Only(tracks) = &mut set.required_tracks {
            tracks.insert(overlay_track);
        }
        set.overlay_track = Some(overlay_track);
        Ok(set)
    }

    /// Every frame in `range` is `track`'s frame, untouched.
    ///
    /// A negative duration is clamped to zero.
    pub fn passthrough(track: TrackId, range: TimeRange) -> Self {
        let range = TimeRange::new(range.start, range.duration);
        let layer = LayerInstruction::new(track, range, range.start);
        Self {
            kind: TimelineKind::Transition,
            layers: vec![layer],
            covered_range: range,
            requires_tweening: false,
            required_tracks: RequiredTracks::Only(BTreeSet::from([track])),
            passthrough_track: Some(track),
            overlay_track: None,
            transition_window: RationalTime::ZERO,
        }
    }

    fn build(
        kind: TimelineKind,
        layers: Vec<LayerInstruction>,
        transition_window: RationalTime,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(TimelineError::Empty);
        }
        let covered_range = layers
            .iter()
            .fold(TimeRange::EMPTY, |hull, l| hull.union(l.active_range));
        let required_tracks = RequiredTracks::Only(layers.iter().map(|l| l.track).collect());
        Ok(Self {
            kind,
            layers,
            covered_range,
            requires_tweening: true,
            required_tracks,
            passthrough_track: None,
            overlay_track: None,
            transition_window,
        })
    }

    /// Override the tracks the pipeline must decode.
    pub fn with_required_tracks(mut self, required: RequiredTracks) -> Self {
        self.required_tracks = required;
        self
    }

    pub fn kind(&self) -> TimelineKind {
        self.kind
    }

    pub fn layers(&self) -> &[LayerInstruction] {
        &self.layers
    }

    pub fn covered_range(&self) -> TimeRange {
        self.covered_range
    }

    /// Whether consecutive frames differ even when sources do not.
    pub fn requires_tweening(&self) -> bool {
        self.requires_tweening
    }

    pub fn required_tracks(&self) -> &RequiredTracks {
        &self.required_tracks
    }

    pub fn passthrough_track(&self) -> Option<TrackId> {
        self.passthrough_track
    }

    /// Track drawn over watermark sets.
    pub fn overlay_track(&self) -> Option<TrackId> {
        self.overlay_track
    }

    pub fn transition_window(&self) -> RationalTime {
        self.transition_window
    }
}

fn check_durations(layers: &[LayerInstruction]) -> Result<()> {
    match layers
        .iter()
        .enumerate()
        .find(|(_, l)| l.active_range.duration.is_negative())
    {
        Some((index, layer)) => Err(TimelineError::NegativeDuration {
            index,
            track: layer.track,
            duration: layer.active_range.duration,
        }),
        None => Ok(()),
    }
}
