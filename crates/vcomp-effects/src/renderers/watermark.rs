use crate::error::{RenderError, Result};
use crate::renderer::{expect_format, RenderParams, Renderer};
use tracing::{debug, trace};
use vcomp_core::{PixelFormat, PixelRect, SharedImage, TimelineKind};
use vcomp_gpu::{
    BlendState, CommandBuffer, DrawCommand, LoadAction, RenderContext, RenderPipeline,
    RenderPipelineDescriptor,
};

const NAME: &str = "Watermark";

/// Copies the base frame and stamps an overlay into the top-right corner.
///
/// The overlay square has side `width / size_divisor` and is composited
/// with source-over, so transparent overlay pixels leave the base visible.
/// Inputs are `[base]` or `[base, overlay]`.
#[derive(Debug, Clone)]
pub struct WatermarkRenderer {
    size_divisor: u32,
    copy: RenderPipeline,
    over: RenderPipeline,
}

impl WatermarkRenderer {
    pub const DEFAULT_SIZE_DIVISOR: u32 = 10;

    pub fn new(context: &RenderContext, size_divisor: u32) -> Result<Self> {
        if size_divisor == 0 {
            return Err(RenderError::InvalidLayout(
                "watermark size divisor must be at least 1".to_string(),
            ));
        }
        let gpu = context.gpu();
        let copy = gpu.create_pipeline(RenderPipelineDescriptor::new(
            "watermark/copy",
            context.format(),
            BlendState::Replace,
        ))?;
        let over = gpu.create_pipeline(RenderPipelineDescriptor::new(
            "watermark/over",
            context.format(),
            BlendState::SourceOver,
        ))?;
        let renderer = Self {
            size_divisor,
            copy,
            over,
        };
        renderer.validate_context(context)?;
        debug!(size_divisor, "watermark renderer ready");
        Ok(renderer)
    }

    pub fn format(&self) -> PixelFormat {
        self.copy.format()
    }

    /// Square the overlay covers on `canvas`.
    pub fn corner(&self, canvas: PixelRect) -> PixelRect {
        let side = canvas.width / self.size_divisor;
        PixelRect::new(canvas.right() - side, canvas.y, side, side)
    }

    fn check_canvas(&self, width: u32) -> Result<()> {
        if width / self.size_divisor == 0 {
            return Err(RenderError::InvalidLayout(format!(
                "canvas width {width} leaves no room for a 1/{} watermark",
                self.size_divisor
            )));
        }
        Ok(())
    }
}

impl Renderer for WatermarkRenderer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> TimelineKind {
        TimelineKind::Watermark
    }

    fn validate_context(&self, context: &RenderContext) -> Result<()> {
        expect_format(NAME, self.format(), context.format())?;
        self.check_canvas(context.width())
    }

    fn encode(
        &self,
        commands: &mut CommandBuffer,
        inputs: &[SharedImage],
        _params: &RenderParams,
    ) -> Result<()> {
        let (base, overlay) = match inputs {
            [base] => (base, None),
            [base, overlay] => (base, Some(overlay)),
            _ => {
                return Err(RenderError::MissingInputs {
                    renderer: NAME,
                    expected: 2,
                    found: inputs.len(),
                })
            }
        };
        expect_format(NAME, self.format(), commands.format())?;
        for input in inputs {
            expect_format(NAME, self.format(), input.format())?;
        }
        let canvas = commands.target_rect();
        self.check_canvas(canvas.width)?;
        let corner = self.corner(canvas);
        trace!(?corner, overlay = overlay.is_some(), "encoding watermark");

        let pass = commands.render_pass(LoadAction::Clear([0, 0, 0, 255]));
        pass.draw(DrawCommand::new(&self.copy, base.clone(), canvas))?;
        if let Some(overlay) = overlay {
            pass.draw(DrawCommand::new(&self.over, overlay.clone(), corner))?;
        }
        Ok(())
    }
}
