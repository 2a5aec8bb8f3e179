//! VComp Timeline - which layers feed a frame
//!
//! Implements the timeline side of compositing:
//! - Layer instructions and instruction sets
//! - Resolution of target/previous layers at a query time
//! - Blend factor over the transition window
//! - Sequential and parallel layout helpers
//! - Versioned JSON descriptors

pub mod assembly;
pub mod error;
pub mod instruction;
pub mod resolve;
pub mod serialization;

pub use assembly::{parallel_layout, sequential_layout, Clip};
pub use error::{Result, TimelineError};
pub use instruction::{LayerInstruction, RequiredTracks, TimelineInstructionSet};
pub use resolve::{blend_factor, ResolvedLayers, Resolution};
pub use serialization::InstructionSetDescriptor;
