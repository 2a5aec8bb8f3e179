//! Resolving which layers feed the frame at a query time.
//!
//! Ranges are half-open: a layer whose exclusive end equals the query time
//! has already ended and can only be the "previous" layer.

use crate::error::{Result, TimelineError};
use crate::instruction::{LayerInstruction, TimelineInstructionSet};
use smallvec::SmallVec;
use vcomp_core::{RationalTime, TrackId};

/// Layers relevant to a transition frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLayers<'a> {
    /// First layer still active or upcoming.
    pub target: &'a LayerInstruction,
    /// Most recent layer that already ended.
    pub previous: Option<&'a LayerInstruction>,
}

/// What the compositor has to do for one transition frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    /// Return `track`'s frame untouched.
    PassThrough { track: TrackId },
    /// Blend `previous` into `target` at `factor`.
    Transition {
        previous: &'a LayerInstruction,
        target: &'a LayerInstruction,
        factor: f32,
    },
}

/// Blend progress of `target` at `time`, clamped to `[0, 1]`.
///
/// A zero window is an instant cut.
pub fn blend_factor(target: &LayerInstruction, time: RationalTime, window: RationalTime) -> f32 {
    let elapsed = time - target.transition_start;
    match elapsed.ratio(window) {
        Some(progress) => progress.clamp(0.0, 1.0) as f32,
        None => 1.0,
    }
}

impl TimelineInstructionSet {
    /// Find the target and previous layer at `time`.
    pub fn resolve(&self, time: RationalTime) -> Result<ResolvedLayers<'_>> {
        if !self.covered_range().contains(time) {
            return Err(TimelineError::NoActiveLayer { time });
        }

        let mut target = None;
        let mut previous = None;
        for layer in self.layers() {
            if layer.active_range.end() > time {
                if target.is_none() {
                    target = Some(layer);
                }
            } else {
                previous = Some(layer);
            }
        }

        target
            .map(|target| ResolvedLayers { target, previous })
            .ok_or(TimelineError::NoActiveLayer { time })
    }

    /// Resolve `time` and decide between pass-through and a blend.
    pub fn resolve_frame(&self, time: RationalTime) -> Result<Resolution<'_>> {
        let ResolvedLayers { target, previous } = self.resolve(time)?;
        let factor = blend_factor(target, time, self.transition_window());
        match previous {
            Some(previous) if factor < 1.0 => Ok(Resolution::Transition {
                previous,
                target,
                factor,
            }),
            _ => Ok(Resolution::PassThrough {
                track: target.track,
            }),
        }
    }

    /// Layers whose active range contains `time`, in instruction order.
    pub fn active_layers(
        &self,
        time: RationalTime,
    ) -> Result<SmallVec<[&LayerInstruction; 4]>> {
        if !self.covered_range().contains(time) {
            return Err(TimelineError::NoActiveLayer { time });
        }
        Ok(self
            .layers()
            .iter()
            .filter(|layer| layer.is_active_at(time))
            .collect())
    }
}
