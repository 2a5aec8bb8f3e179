//! Command recording.
//!
//! A [`CommandBuffer`] owns its render target and retains a reference to
//! every texture a draw samples from. The references are released after the
//! passes have executed and before the completion handler runs, so a source
//! frame stays alive exactly as long as the GPU needs it.

use crate::context::Device;
use crate::error::{GpuError, Result};
use crate::pipeline::RenderPipeline;
use std::panic::{self, AssertUnwindSafe};
use tracing::{trace, warn};
use vcomp_core::{ImageBuffer, PixelFormat, PixelRect, SharedImage};

/// What happens to the target at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Fill the target with a color first.
    Clear([u8; 4]),
    /// Keep whatever the target already holds.
    Load,
}

/// One textured quad.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pipeline: RenderPipeline,
    texture: SharedImage,
    dest: PixelRect,
    scissor: Option<PixelRect>,
    blend_constant: f32,
}

impl DrawCommand {
    /// Draw `texture` stretched over `dest`.
    pub fn new(pipeline: &RenderPipeline, texture: SharedImage, dest: PixelRect) -> Self {
        Self {
            pipeline: pipeline.clone(),
            texture,
            dest,
            scissor: None,
            blend_constant: 1.0,
        }
    }

    /// Restrict writes to `scissor`.
    pub fn with_scissor(mut self, scissor: PixelRect) -> Self {
        self.scissor = Some(scissor);
        self
    }

    /// Constant used by [`BlendState::ConstantAlpha`](crate::BlendState::ConstantAlpha).
    pub fn with_blend_constant(mut self, constant: f32) -> Self {
        self.blend_constant = constant;
        self
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn texture(&self) -> &SharedImage {
        &self.texture
    }

    pub fn dest(&self) -> PixelRect {
        self.dest
    }

    pub fn scissor(&self) -> Option<PixelRect> {
        self.scissor
    }

    pub fn blend_constant(&self) -> f32 {
        self.blend_constant
    }

    /// The part of a target of size `bounds` this draw may write, if any.
    pub(crate) fn clip_rect(&self, bounds: PixelRect) -> Option<PixelRect> {
        if self.dest.is_empty() {
            return None;
        }
        let rect = self.dest.intersection(bounds)?;
        match self.scissor {
            Some(scissor) => rect.intersection(scissor),
            None => Some(rect),
        }
    }
}

/// An ordered list of draws into the command buffer's target.
#[derive(Debug)]
pub struct RenderPass {
    load: LoadAction,
    target_format: PixelFormat,
    draws: Vec<DrawCommand>,
}

impl RenderPass {
    /// Append a draw.
    ///
    /// The pipeline must render the target's format and the texture must be
    /// in the same format; nothing converts between layouts. Textures with
    /// no pixels are rejected.
    pub fn draw(&mut self, command: DrawCommand) -> Result<()> {
        let (width, height) = (command.texture.width(), command.texture.height());
        if width == 0 || height == 0 {
            return Err(GpuError::EmptyTexture { width, height });
        }
        let pipeline_format = command.pipeline.format();
        if pipeline_format != self.target_format {
            return Err(GpuError::FormatMismatch {
                expected: self.target_format,
                found: pipeline_format,
            });
        }
        let texture_format = command.texture.format();
        if texture_format != pipeline_format {
            return Err(GpuError::FormatMismatch {
                expected: pipeline_format,
                found: texture_format,
            });
        }
        self.draws.push(command);
        Ok(())
    }

    pub fn load_action(&self) -> LoadAction {
        self.load
    }

    pub fn draws(&self) -> &[DrawCommand] {
        &self.draws
    }
}

/// Called once with the rendered target, or with the reason it was not
/// rendered.
pub type CompletionHandler = Box<dyn FnOnce(Result<ImageBuffer>) + Send>;

/// Recorded work for one output buffer.
pub struct CommandBuffer {
    label: String,
    format: PixelFormat,
    width: u32,
    height: u32,
    target: Option<ImageBuffer>,
    passes: Vec<RenderPass>,
    on_complete: Option<CompletionHandler>,
}

impl CommandBuffer {
    /// Start recording into `target`.
    pub fn new(label: impl Into<String>, target: ImageBuffer) -> Self {
        Self {
            label: label.into(),
            format: target.format(),
            width: target.width(),
            height: target.height(),
            target: Some(target),
            passes: Vec::new(),
            on_complete: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Target format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Target size in pixels.
    pub fn target_rect(&self) -> PixelRect {
        PixelRect::full(self.width, self.height)
    }

    /// Begin a new pass and return it for recording.
    pub fn render_pass(&mut self, load: LoadAction) -> &mut RenderPass {
        self.passes.push(RenderPass {
            load,
            target_format: self.format,
            draws: Vec::new(),
        });
        let last = self.passes.len() - 1;
        &mut self.passes[last]
    }

    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Number of texture references currently held by recorded draws.
    pub fn retained_count(&self) -> usize {
        self.passes.iter().map(|p| p.draws.len()).sum()
    }

    /// Install the completion handler, replacing any previous one.
    pub fn set_completed_handler(
        &mut self,
        handler: impl FnOnce(Result<ImageBuffer>) + Send + 'static,
    ) {
        self.on_complete = Some(Box::new(handler));
    }

    /// Run every pass on `device` and hand the target to the completion
    /// handler.
    pub(crate) fn execute(mut self, device: &Device) {
        let Some(mut target) = self.target.take() else {
            let label = self.label.clone();
            self.complete(Err(GpuError::MissingTarget(label)));
            return;
        };
        trace!(
            label = %self.label,
            passes = self.passes.len(),
            retained = self.retained_count(),
            "executing command buffer"
        );
        let passes = &self.passes;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| device.execute(&mut target, passes)));
        let result = match outcome {
            Ok(Ok(())) => Ok(target),
            Ok(Err(GpuError::Execution { reason, .. })) => Err(GpuError::Execution {
                label: self.label.clone(),
                reason,
            }),
            Ok(Err(other)) => Err(other),
            Err(_) => Err(GpuError::Execution {
                label: self.label.clone(),
                reason: "device panicked".to_string(),
            }),
        };
        if let Err(err) = &result {
            warn!(label = %self.label, %err, "command buffer failed");
        }
        self.complete(result);
    }

    /// Drop the recorded work and report [`GpuError::Cancelled`].
    pub fn cancel(mut self) {
        self.target = None;
        self.complete(Err(GpuError::Cancelled));
    }

    fn complete(&mut self, result: Result<ImageBuffer>) {
        // Release retained textures before anyone observes completion.
        self.passes.clear();
        if let Some(handler) = self.on_complete.take() {
            handler(result);
        }
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("label", &self.label)
            .field("format", &self.format)
            .field("size", &(self.width, self.height))
            .field("passes", &self.passes.len())
            .field("has_handler", &self.on_complete.is_some())
            .finish()
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        if self.on_complete.is_some() {
            self.target = None;
            self.complete(Err(GpuError::Cancelled));
        }
    }
}
