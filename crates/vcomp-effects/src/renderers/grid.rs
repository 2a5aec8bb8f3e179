use crate::error::{RenderError, Result};
use crate::renderer::{expect_format, RenderParams, Renderer};
use glam::UVec2;
use tracing::{debug, trace};
use vcomp_core::{PixelFormat, PixelRect, SharedImage, TimelineKind};
use vcomp_gpu::{
    BlendState, CommandBuffer, DrawCommand, LoadAction, RenderContext, RenderPipeline,
    RenderPipelineDescriptor,
};

const NAME: &str = "Grid";

/// Draws each input into its own tile of a `columns` x `rows` grid.
///
/// Slots are numbered row-major, so a 2x2 grid has top-left 0, top-right 1,
/// bottom-left 2 and bottom-right 3. Tiles without an input stay cleared.
#[derive(Debug, Clone)]
pub struct GridRenderer {
    columns: u32,
    rows: u32,
    copy: RenderPipeline,
}

impl GridRenderer {
    pub fn new(context: &RenderContext, columns: u32, rows: u32) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(RenderError::InvalidLayout(format!(
                "grid must have at least one column and row, got {columns}x{rows}"
            )));
        }
        let copy = context.gpu().create_pipeline(RenderPipelineDescriptor::new(
            "grid/copy",
            context.format(),
            BlendState::Replace,
        ))?;
        let renderer = Self {
            columns,
            rows,
            copy,
        };
        renderer.validate_context(context)?;
        debug!(columns, rows, "grid renderer ready");
        Ok(renderer)
    }

    pub fn slot_count(&self) -> u32 {
        self.columns * self.rows
    }

    pub fn format(&self) -> PixelFormat {
        self.copy.format()
    }

    fn check_canvas(&self, width: u32, height: u32) -> Result<()> {
        if width % self.columns != 0 || height % self.rows != 0 {
            return Err(RenderError::InvalidLayout(format!(
                "canvas {width}x{height} is not a multiple of a {}x{} grid",
                self.columns, self.rows
            )));
        }
        Ok(())
    }

    /// Tile occupied by `slot` on `canvas`.
    pub fn tile(&self, canvas: PixelRect, slot: u32) -> Result<PixelRect> {
        if slot >= self.slot_count() {
            return Err(RenderError::InvalidSlot {
                slot,
                slots: self.slot_count(),
            });
        }
        let grid = UVec2::new(self.columns, self.rows);
        let tile = canvas.size() / grid;
        let cell = UVec2::new(slot % self.columns, slot / self.columns);
        let origin = canvas.origin() + cell * tile;
        Ok(PixelRect::new(origin.x, origin.y, tile.x, tile.y))
    }
}

impl Renderer for GridRenderer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> TimelineKind {
        TimelineKind::Grid
    }

    fn validate_context(&self, context: &RenderContext) -> Result<()> {
        expect_format(NAME, self.format(), context.format())?;
        self.check_canvas(context.width(), context.height())
    }

    fn encode(
        &self,
        commands: &mut CommandBuffer,
        inputs: &[SharedImage],
        params: &RenderParams,
    ) -> Result<()> {
        if params.slots.len() != inputs.len() {
            return Err(RenderError::MissingInputs {
                renderer: NAME,
                expected: params.slots.len(),
                found: inputs.len(),
            });
        }
        expect_format(NAME, self.format(), commands.format())?;
        let canvas = commands.target_rect();
        self.check_canvas(canvas.width, canvas.height)?;

        let mut used = vec![false; self.slot_count() as usize];
        let mut draws = Vec::with_capacity(inputs.len());
        for (input, &slot) in inputs.iter().zip(&params.slots) {
            expect_format(NAME, self.format(), input.format())?;
            let tile = self.tile(canvas, slot)?;
            if std::mem::replace(&mut used[slot as usize], true) {
                return Err(RenderError::InvalidSlot {
                    slot,
                    slots: self.slot_count(),
                });
            }
            draws.push(DrawCommand::new(&self.copy, input.clone(), tile));
        }
        trace!(tiles = draws.len(), "encoding grid");

        let pass = commands.render_pass(LoadAction::Clear([0, 0, 0, 255]));
        for draw in draws {
            pass.draw(draw)?;
        }
        Ok(())
    }
}
