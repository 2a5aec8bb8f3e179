use crate::error::Result;
use crate::renderer::{expect_format, expect_inputs, RenderParams, Renderer};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vcomp_core::{PixelFormat, PixelRect, SharedImage, TimelineKind};
use vcomp_gpu::{
    BlendState, CommandBuffer, DrawCommand, LoadAction, RenderContext, RenderPipeline,
    RenderPipelineDescriptor,
};

const NAME: &str = "Wipe";

/// Edge the incoming frame enters from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeDirection {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

impl WipeDirection {
    /// Region of `canvas` already showing the target at `progress`.
    pub fn revealed(self, canvas: PixelRect, progress: f32) -> PixelRect {
        let p = progress.clamp(0.0, 1.0);
        let w = (canvas.width as f32 * p).round() as u32;
        let h = (canvas.height as f32 * p).round() as u32;
        match self {
            Self::Left => PixelRect::new(canvas.x, canvas.y, w, canvas.height),
            Self::Right => PixelRect::new(canvas.right() - w, canvas.y, w, canvas.height),
            Self::Up => PixelRect::new(canvas.x, canvas.y, canvas.width, h),
            Self::Down => PixelRect::new(canvas.x, canvas.bottom() - h, canvas.width, h),
        }
    }
}

/// Hard-edged wipe; the blend factor is the fraction of the canvas
/// uncovered so far.
#[derive(Debug, Clone)]
pub struct WipeRenderer {
    direction: WipeDirection,
    copy: RenderPipeline,
}

impl WipeRenderer {
    pub fn new(context: &RenderContext, direction: WipeDirection) -> Result<Self> {
        let copy = context.gpu().create_pipeline(RenderPipelineDescriptor::new(
            "wipe/copy",
            context.format(),
            BlendState::Replace,
        ))?;
        debug!(?direction, format = ?context.format(), "wipe renderer ready");
        Ok(Self { direction, copy })
    }

    pub fn direction(&self) -> WipeDirection {
        self.direction
    }

    pub fn format(&self) -> PixelFormat {
        self.copy.format()
    }
}

impl Renderer for WipeRenderer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> TimelineKind {
        TimelineKind::Transition
    }

    fn validate_context(&self, context: &RenderContext) -> Result<()> {
        expect_format(NAME, self.format(), context.format())
    }

    fn encode(
        &self,
        commands: &mut CommandBuffer,
        inputs: &[SharedImage],
        params: &RenderParams,
    ) -> Result<()> {
        expect_inputs(NAME, inputs, 2)?;
        expect_format(NAME, self.format(), commands.format())?;
        for input in inputs {
            expect_format(NAME, self.format(), input.format())?;
        }

        let full = commands.target_rect();
        let revealed = self.direction.revealed(full, params.blend_factor);
        trace!(progress = params.blend_factor, ?revealed, "encoding wipe");

        let pass = commands.render_pass(LoadAction::Clear([0, 0, 0, 255]));
        pass.draw(DrawCommand::new(&self.copy, inputs[0].clone(), full))?;
        if !revealed.is_empty() {
            pass.draw(DrawCommand::new(&self.copy, inputs[1].clone(), full).with_scissor(revealed))?;
        }
        Ok(())
    }
}
