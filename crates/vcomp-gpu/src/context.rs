//! GPU context management.

use crate::command::RenderPass;
use crate::error::{GpuError, Result};
use crate::hardware::WgpuDevice;
use crate::pipeline::{RenderPipeline, RenderPipelineDescriptor};
use crate::queue::CommandQueue;
use crate::software;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use vcomp_core::{ImageBuffer, PixelFormat};

/// Which device executes committed command buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuBackend {
    /// A wgpu adapter (Metal, Vulkan, DX12 or GL).
    #[default]
    Wgpu,
    /// The CPU rasterizer, for headless runs and tests.
    Software,
}

/// Device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    pub label: String,
    pub backend: GpuBackend,
    /// Ask wgpu for a software adapter such as lavapipe or WARP.
    pub force_fallback_adapter: bool,
    /// Committed command buffers allowed to wait on the queue.
    pub queue_depth: usize,
    /// Color formats pipelines may target.
    pub supported_formats: Vec<PixelFormat>,
    pub max_texture_dimension: u32,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            label: "vcomp-device".to_string(),
            backend: GpuBackend::Wgpu,
            force_fallback_adapter: false,
            queue_depth: 8,
            supported_formats: vec![PixelFormat::Rgba8, PixelFormat::Bgra8],
            max_texture_dimension: 8192,
        }
    }
}

impl GpuConfig {
    /// Defaults with the CPU rasterizer as the device.
    pub fn software() -> Self {
        Self {
            backend: GpuBackend::Software,
            ..Self::default()
        }
    }
}

/// The device command buffers run on.
#[derive(Debug)]
pub(crate) enum Device {
    Wgpu(WgpuDevice),
    Software,
}

impl Device {
    pub(crate) fn execute(&self, target: &mut ImageBuffer, passes: &[RenderPass]) -> Result<()> {
        match self {
            Self::Wgpu(device) => device.execute(target, passes),
            Self::Software => {
                software::execute(target, passes);
                Ok(())
            }
        }
    }
}

/// GPU context holding the device and its command queue.
#[derive(Debug)]
pub struct GpuContext {
    config: GpuConfig,
    pub(crate) device: Arc<Device>,
    queue: CommandQueue,
}

impl GpuContext {
    /// Open the configured device and start its queue.
    ///
    /// Blocks while wgpu negotiates the adapter and device.
    pub fn new(config: GpuConfig) -> Result<Self> {
        let device = Arc::new(match config.backend {
            GpuBackend::Wgpu => Device::Wgpu(WgpuDevice::new(&config)?),
            GpuBackend::Software => Device::Software,
        });
        let queue = CommandQueue::new(config.label.clone(), config.queue_depth, device.clone())?;
        let ctx = Self {
            config,
            device,
            queue,
        };
        info!(
            device = %ctx.config.label,
            adapter = ctx.adapter_name().unwrap_or("software"),
            formats = ?ctx.config.supported_formats,
            max_dim = ctx.max_texture_dimension(),
            "GPU context created"
        );
        Ok(ctx)
    }

    pub fn config(&self) -> &GpuConfig {
        &self.config
    }

    pub fn supports_format(&self, format: PixelFormat) -> bool {
        self.config.supported_formats.contains(&format)
    }

    pub fn max_texture_dimension(&self) -> u32 {
        match self.device.as_ref() {
            Device::Wgpu(device) => device.max_texture_dimension(),
            Device::Software => self.config.max_texture_dimension,
        }
    }

    pub fn backend(&self) -> GpuBackend {
        self.config.backend
    }

    /// Name of the wgpu adapter, `None` for the software device.
    pub fn adapter_name(&self) -> Option<&str> {
        match self.device.as_ref() {
            Device::Wgpu(device) => Some(device.adapter_name()),
            Device::Software => None,
        }
    }

    /// Compile a pipeline. Fails for an empty label, an unsupported
    /// attachment format, or a pipeline the device rejects.
    pub fn create_pipeline(&self, desc: RenderPipelineDescriptor) -> Result<RenderPipeline> {
        if desc.label.trim().is_empty() {
            return Err(GpuError::PipelineCreation {
                label: desc.label,
                reason: "pipeline label must not be empty".to_string(),
            });
        }
        if !self.supports_format(desc.format) {
            return Err(GpuError::PipelineCreation {
                reason: format!("attachment format {:?} is not supported", desc.format),
                label: desc.label,
            });
        }
        debug!(label = %desc.label, format = ?desc.format, blend = desc.blend.name(), "pipeline created");
        match self.device.as_ref() {
            Device::Wgpu(device) => {
                let raw = device.create_pipeline(&desc)?;
                Ok(RenderPipeline::hardware(desc, raw))
            }
            Device::Software => Ok(RenderPipeline::software(desc)),
        }
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }
}
