//! A complete composition: instruction sets over time, one renderer and an
//! output canvas.
//!
//! Loaded from a versioned JSON descriptor, this is the assembly-time input
//! a media pipeline turns into per-frame requests.

use crate::compositor::{Compositor, CompositorConfig};
use crate::error::{CompositorError, Result};
use crate::request::CompositionRequest;
use crate::source::FrameSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vcomp_core::{FrameRate, PixelFormat, RationalTime, TimeRange};
use vcomp_effects::{AnyRenderer, RendererConfig};
use vcomp_gpu::{GpuContext, RenderContext, RenderContextConfig};
use vcomp_timeline::{InstructionSetDescriptor, TimelineError, TimelineInstructionSet};

/// Current descriptor schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned JSON form of a [`VideoComposition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionDescriptor {
    pub version: u32,
    pub renderer: RendererConfig,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub format: PixelFormat,
    #[serde(default)]
    pub frame_rate: FrameRate,
    pub instruction_sets: Vec<InstructionSetDescriptor>,
}

impl CompositionDescriptor {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            CompositorError::InvalidTimeline(TimelineError::Serialization(format!(
                "failed to serialize composition: {e}"
            )))
        })
    }

    /// Parse a descriptor, rejecting versions newer than this build.
    pub fn from_json(data: &str) -> Result<Self> {
        let parse_error = |e: serde_json::Error| {
            CompositorError::InvalidTimeline(TimelineError::Serialization(format!(
                "invalid composition: {e}"
            )))
        };
        let raw: serde_json::Value = serde_json::from_str(data).map_err(parse_error)?;
        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(CompositorError::InvalidTimeline(
                TimelineError::UnsupportedVersion {
                    found: version,
                    supported: CURRENT_VERSION,
                },
            ));
        }
        serde_json::from_value(raw).map_err(parse_error)
    }
}

/// Instruction sets, renderer choice and canvas for one composition.
#[derive(Debug, Clone)]
pub struct VideoComposition {
    renderer: RendererConfig,
    render_config: RenderContextConfig,
    frame_rate: FrameRate,
    instruction_sets: Vec<Arc<TimelineInstructionSet>>,
}

impl VideoComposition {
    /// Every set must be of the renderer's kind.
    pub fn new(
        renderer: RendererConfig,
        render_config: RenderContextConfig,
        frame_rate: FrameRate,
        instruction_sets: Vec<TimelineInstructionSet>,
    ) -> Result<Self> {
        let expected = renderer.kind();
        for set in &instruction_sets {
            if set.kind() != expected {
                return Err(CompositorError::IncompatibleInstructionType {
                    expected,
                    found: set.kind(),
                });
            }
        }
        let mut instruction_sets: Vec<_> = instruction_sets.into_iter().map(Arc::new).collect();
        instruction_sets.sort_by_key(|set| set.covered_range().start);
        Ok(Self {
            renderer,
            render_config,
            frame_rate,
            instruction_sets,
        })
    }

    /// Build from a descriptor; sets without a window use `default_window`.
    pub fn from_descriptor(desc: &CompositionDescriptor, default_window: RationalTime) -> Result<Self> {
        let sets = desc
            .instruction_sets
            .iter()
            .map(|d| d.build(default_window))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CompositorError::InvalidTimeline)?;
        let render_config = RenderContextConfig::default()
            .with_size(desc.width, desc.height)
            .with_format(desc.format);
        Self::new(desc.renderer, render_config, desc.frame_rate, sets)
    }

    pub fn renderer(&self) -> &RendererConfig {
        &self.renderer
    }

    pub fn render_config(&self) -> &RenderContextConfig {
        &self.render_config
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn instruction_sets(&self) -> &[Arc<TimelineInstructionSet>] {
        &self.instruction_sets
    }

    /// Hull of every instruction set.
    pub fn time_range(&self) -> TimeRange {
        self.instruction_sets
            .iter()
            .fold(TimeRange::EMPTY, |hull, set| hull.union(set.covered_range()))
    }

    /// The request for the frame at `time`, using the first set covering it.
    pub fn request_at(&self, time: RationalTime) -> Result<CompositionRequest> {
        self.instruction_sets
            .iter()
            .find(|set| set.covered_range().contains(time))
            .map(|set| CompositionRequest::new(time, set.clone()))
            .ok_or(CompositorError::MissingInstruction(
                TimelineError::NoActiveLayer { time },
            ))
    }

    /// Frame times from the start of the composition to its end.
    pub fn frame_times(&self) -> impl Iterator<Item = RationalTime> {
        let range = self.time_range();
        let rate = self.frame_rate;
        let first = range.start.to_frames(rate);
        let end = range.end();
        (first..)
            .map(move |frame| RationalTime::from_frames(frame, rate))
            .skip_while(move |t| *t < range.start)
            .take_while(move |t| *t < end)
    }

    /// Render context matching this composition's canvas.
    pub fn render_context(&self, gpu: Arc<GpuContext>) -> Result<RenderContext> {
        Ok(RenderContext::new(gpu, self.render_config.clone())?)
    }

    /// Start a compositor for this composition.
    pub fn compositor(
        &self,
        gpu: Arc<GpuContext>,
        source: Arc<dyn FrameSource>,
        config: CompositorConfig,
    ) -> Result<Compositor<AnyRenderer>> {
        let context = Arc::new(self.render_context(gpu)?);
        info!(
            sets = self.instruction_sets.len(),
            width = context.width(),
            height = context.height(),
            fps = %self.frame_rate,
            "starting compositor for composition"
        );
        Compositor::from_renderer_config(&self.renderer, context, source, config)
    }
}
