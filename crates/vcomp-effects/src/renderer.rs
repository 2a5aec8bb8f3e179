//! Renderer capability shared by every blend algorithm.

use crate::error::{RenderError, Result};
use smallvec::SmallVec;
use vcomp_core::{PixelFormat, SharedImage, TimelineKind};
use vcomp_gpu::{CommandBuffer, RenderContext};

/// Per-frame parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderParams {
    /// 0 = fully previous, 1 = fully target.
    pub blend_factor: f32,
    /// Grid slot of each input, in input order.
    pub slots: SmallVec<[u32; 4]>,
}

impl RenderParams {
    /// Parameters for a two-input transition.
    pub fn transition(blend_factor: f32) -> Self {
        Self {
            blend_factor: blend_factor.clamp(0.0, 1.0),
            slots: SmallVec::new(),
        }
    }

    /// Parameters for a grid composite.
    pub fn grid(slots: impl IntoIterator<Item = u32>) -> Self {
        Self {
            blend_factor: 0.0,
            slots: slots.into_iter().collect(),
        }
    }
}

/// A blend algorithm.
///
/// Implementations are built once against a [`RenderContext`] and are
/// immutable afterwards, so one instance serves every in-flight request.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Instruction kind this renderer draws.
    fn kind(&self) -> TimelineKind;

    /// Check that output buffers of `context` can be drawn into.
    fn validate_context(&self, context: &RenderContext) -> Result<()>;

    /// Record the draws that compose `inputs` into the command buffer's
    /// target. For transitions `inputs` is `[previous, target]`.
    ///
    /// Inputs are only sampled, never written.
    fn encode(
        &self,
        commands: &mut CommandBuffer,
        inputs: &[SharedImage],
        params: &RenderParams,
    ) -> Result<()>;
}

pub(crate) fn expect_inputs(renderer: &'static str, inputs: &[SharedImage], expected: usize) -> Result<()> {
    if inputs.len() != expected {
        return Err(RenderError::MissingInputs {
            renderer,
            expected,
            found: inputs.len(),
        });
    }
    Ok(())
}

pub(crate) fn expect_format(
    renderer: &'static str,
    expected: PixelFormat,
    found: PixelFormat,
) -> Result<()> {
    if expected != found {
        return Err(RenderError::FormatMismatch {
            renderer,
            expected,
            found,
        });
    }
    Ok(())
}
