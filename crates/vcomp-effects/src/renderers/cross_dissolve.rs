use crate::error::Result;
use crate::renderer::{expect_format, expect_inputs, RenderParams, Renderer};
use tracing::{debug, trace};
use vcomp_core::{PixelFormat, SharedImage, TimelineKind};
use vcomp_gpu::{
    BlendState, CommandBuffer, DrawCommand, LoadAction, RenderContext, RenderPipeline,
    RenderPipelineDescriptor,
};

const NAME: &str = "Cross Dissolve";

/// Uniform alpha blend: `out = previous * (1 - f) + target * f`.
#[derive(Debug, Clone)]
pub struct CrossDissolveRenderer {
    copy: RenderPipeline,
    dissolve: RenderPipeline,
}

impl CrossDissolveRenderer {
    pub fn new(context: &RenderContext) -> Result<Self> {
        let gpu = context.gpu();
        let format = context.format();
        let copy = gpu.create_pipeline(RenderPipelineDescriptor::new(
            "cross-dissolve/copy",
            format,
            BlendState::Replace,
        ))?;
        let dissolve = gpu.create_pipeline(RenderPipelineDescriptor::new(
            "cross-dissolve/blend",
            format,
            BlendState::ConstantAlpha,
        ))?;
        debug!(?format, "cross-dissolve renderer ready");
        Ok(Self { copy, dissolve })
    }

    pub fn format(&self) -> PixelFormat {
        self.copy.format()
    }
}

impl Renderer for CrossDissolveRenderer {
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

        let factor = params.blend_factor.clamp(0.0, 1.0);
        let full = commands.target_rect();
        trace!(factor, "encoding cross-dissolve");

        let pass = commands.render_pass(LoadAction::Clear([0, 0, 0, 255]));
        pass.draw(DrawCommand::new(&self.copy, inputs[0].clone(), full))?;
        pass.draw(
            DrawCommand::new(&self.dissolve, inputs[1].clone(), full).with_blend_constant(factor),
        )?;
        Ok(())
    }
}
