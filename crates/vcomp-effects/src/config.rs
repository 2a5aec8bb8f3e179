//! Renderer selection.
//!
//! The renderer is chosen when the timeline is assembled and bound to a
//! compositor for its whole life, so dispatch goes through a closed enum.

use crate::error::Result;
use crate::renderer::{RenderParams, Renderer};
use crate::renderers::{
    CrossDissolveRenderer, GridRenderer, WatermarkRenderer, WipeDirection, WipeRenderer,
};
use serde::{Deserialize, Serialize};
use vcomp_core::{SharedImage, TimelineKind};
use vcomp_gpu::{CommandBuffer, RenderContext};

/// Renderer variant identifier and its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendererConfig {
    #[default]
    CrossDissolve,
    Wipe {
        #[serde(default)]
        direction: WipeDirection,
    },
    Grid {
        columns: u32,
        rows: u32,
    },
    Watermark {
        /// Overlay side is the canvas width divided by this.
        #[serde(default = "default_size_divisor")]
        size_divisor: u32,
    },
}

fn default_size_divisor() -> u32 {
    WatermarkRenderer::DEFAULT_SIZE_DIVISOR
}

impl RendererConfig {
    /// 2x2 grid, one quadrant per layer.
    pub const QUAD: Self = Self::Grid {
        columns: 2,
        rows: 2,
    };

    pub fn kind(&self) -> TimelineKind {
        match self {
            Self::CrossDissolve | Self::Wipe { .. } => TimelineKind::Transition,
            Self::Grid { .. } => TimelineKind::Grid,
            Self::Watermark { .. } => TimelineKind::Watermark,
        }
    }
}

/// Any built-in renderer.
#[derive(Debug, Clone)]
pub enum AnyRenderer {
    CrossDissolve(CrossDissolveRenderer),
    Wipe(WipeRenderer),
    Grid(GridRenderer),
    Watermark(WatermarkRenderer),
}

impl AnyRenderer {
    /// Build the configured renderer. Pipeline or layout problems fail here,
    /// never per frame.
    pub fn new(config: &RendererConfig, context: &RenderContext) -> Result<Self> {
        let renderer = match *config {
            RendererConfig::CrossDissolve => Self::CrossDissolve(CrossDissolveRenderer::new(context)?),
            RendererConfig::Wipe { direction } => Self::Wipe(WipeRenderer::new(context, direction)?),
            RendererConfig::Grid { columns, rows } => {
                Self::Grid(GridRenderer::new(context, columns, rows)?)
            }
            RendererConfig::Watermark { size_divisor } => {
                Self::Watermark(WatermarkRenderer::new(context, size_divisor)?)
            }
        };
        Ok(renderer)
    }
}

impl Renderer for AnyRenderer {
    fn name(&self) -> &'static str {
        match self {
            Self::CrossDissolve(r) => r.name(),
            Self::Wipe(r) => r.name(),
            Self::Grid(r) => r.name(),
            Self::Watermark(r) => r.name(),
        }
    }

    fn kind(&self) -> TimelineKind {
        match self {
            Self::CrossDissolve(r) => r.kind(),
            Self::Wipe(r) => r.kind(),
            Self::Grid(r) => r.kind(),
            Self::Watermark(r) => r.kind(),
        }
    }

    fn validate_context(&self, context: &RenderContext) -> Result<()> {
        match self {
            Self::CrossDissolve(r) => r.validate_context(context),
            Self::Wipe(r) => r.validate_context(context),
            Self::Grid(r) => r.validate_context(context),
            Self::Watermark(r) => r.validate_context(context),
        }
    }

    fn encode(
        &self,
        commands: &mut CommandBuffer,
        inputs: &[SharedImage],
        params: &RenderParams,
    ) -> Result<()> {
        match self {
            Self::CrossDissolve(r) => r.encode(commands, inputs, params),
            Self::Wipe(r) => r.encode(commands, inputs, params),
            Self::Grid(r) => r.encode(commands, inputs, params),
            Self::Watermark(r) => r.encode(commands, inputs, params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::renderers::test_support::context;
    use std::sync::Arc;
    use vcomp_core::PixelFormat;
    use vcomp_gpu::{GpuConfig, GpuContext, RenderContextConfig};

    #[test]
    fn test_config_json_roundtrip_names() {
        let wipe: RendererConfig =
            serde_json::from_str(r#"{"type": "wipe", "direction": "up"}"#).unwrap();
        assert_eq!(
            wipe,
            RendererConfig::Wipe {
                direction: WipeDirection::Up
            }
        );
        let grid: RendererConfig =
            serde_json::from_str(r#"{"type": "grid", "columns": 2, "rows": 2}"#).unwrap();
        assert_eq!(grid, RendererConfig::QUAD);
        assert_eq!(grid.kind(), TimelineKind::Grid);

        let watermark: RendererConfig = serde_json::from_str(r#"{"type": "watermark"}"#).unwrap();
        assert_eq!(watermark, RendererConfig::Watermark { size_divisor: 10 });
        assert_eq!(watermark.kind(), TimelineKind::Watermark);
    }

    #[test]
    fn test_builds_each_variant() {
        let ctx = context(16, 16);
        for config in [
            RendererConfig::CrossDissolve,
            RendererConfig::Wipe {
                direction: WipeDirection::Right,
            },
            RendererConfig::QUAD,
            RendererConfig::Watermark { size_divisor: 4 },
        ] {
            let renderer = AnyRenderer::new(&config, &ctx).unwrap();
            assert_eq!(renderer.kind(), config.kind());
        }
    }

    #[test]
    fn test_format_and_layout_checked_up_front() {
        let gpu = Arc::new(
            GpuContext::new(GpuConfig {
                supported_formats: vec![PixelFormat::Rgba8],
                ..GpuConfig::software()
            })
            .unwrap(),
        );
        let ctx = RenderContext::new(gpu, RenderContextConfig::default().with_size(8, 8)).unwrap();
        let renderer = AnyRenderer::new(&RendererConfig::CrossDissolve, &ctx).unwrap();

        let bgra_gpu = Arc::new(
            GpuContext::new(GpuConfig {
                supported_formats: vec![PixelFormat::Bgra8],
                ..GpuConfig::software()
            })
            .unwrap(),
        );
        let bgra_ctx = RenderContext::new(
            bgra_gpu,
            RenderContextConfig::default()
                .with_size(8, 8)
                .with_format(PixelFormat::Bgra8),
        )
        .unwrap();
        assert!(matches!(
            renderer.validate_context(&bgra_ctx),
            Err(RenderError::FormatMismatch { .. })
        ));
        assert!(matches!(
            AnyRenderer::new(&RendererConfig::QUAD, &context(7, 8)),
            Err(RenderError::InvalidLayout(_))
        ));
    }
}
