//! Instruction kinds shared by timelines and renderers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What an instruction set asks the renderer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    /// Two layers in sequence, blended over a transition window.
    Transition,
    /// Several layers at once, one grid slot each.
    Grid,
    /// One layer at a time with an overlay stamped in a corner.
    Watermark,
}

impl fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition => f.write_str("transition"),
            Self::Grid => f.write_str("grid"),
            Self::Watermark => f.write_str("watermark"),
        }
    }
}
