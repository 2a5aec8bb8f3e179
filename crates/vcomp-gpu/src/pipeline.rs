//! Render pipeline state objects.

use crate::blend::BlendState;
use std::sync::Arc;
use vcomp_core::PixelFormat;

/// Parameters for building a [`RenderPipeline`] through
/// [`GpuContext::create_pipeline`](crate::GpuContext::create_pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineDescriptor {
    pub label: String,
    /// Color attachment format the pipeline renders into.
    pub format: PixelFormat,
    pub blend: BlendState,
}

impl RenderPipelineDescriptor {
    pub fn new(label: impl Into<String>, format: PixelFormat, blend: BlendState) -> Self {
        Self {
            label: label.into(),
            format,
            blend,
        }
    }
}

#[derive(Debug)]
struct PipelineState {
    label: String,
    format: PixelFormat,
    blend: BlendState,
    raw: Option<wgpu::RenderPipeline>,
}

/// Compiled, immutable pipeline. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    state: Arc<PipelineState>,
}

impl RenderPipeline {
    /// Wrap a pipeline compiled on a wgpu device.
    pub(crate) fn hardware(desc: RenderPipelineDescriptor, raw: wgpu::RenderPipeline) -> Self {
        Self::build(desc, Some(raw))
    }

    /// A pipeline executed by the software rasterizer.
    pub(crate) fn software(desc: RenderPipelineDescriptor) -> Self {
        Self::build(desc, None)
    }

    fn build(desc: RenderPipelineDescriptor, raw: Option<wgpu::RenderPipeline>) -> Self {
        Self {
            state: Arc::new(PipelineState {
                label: desc.label,
                format: desc.format,
                blend: desc.blend,
                raw,
            }),
        }
    }

    pub(crate) fn raw(&self) -> Option<&wgpu::RenderPipeline> {
        self.state.raw.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.state.label
    }

    pub fn format(&self) -> PixelFormat {
        self.state.format
    }

    pub fn blend(&self) -> BlendState {
        self.state.blend
    }
}
