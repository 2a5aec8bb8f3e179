//! Render context: output size, pixel format and the pool that backs
//! every composed frame.

use crate::buffer_pool::BufferPool;
use crate::command::CommandBuffer;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vcomp_core::{ImageBuffer, PixelFormat, PixelRect};

/// Output surface description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderContextConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Maximum output buffers alive at once.
    pub pool_capacity: usize,
    /// Bytes of released buffers kept for reuse.
    pub pool_free_budget: usize,
}

impl Default for RenderContextConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            format: PixelFormat::Rgba8,
            pool_capacity: 16,
            pool_free_budget: 256 * 1024 * 1024,
        }
    }
}

impl RenderContextConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }
}

/// Everything a renderer needs to produce output buffers.
#[derive(Debug)]
pub struct RenderContext {
    gpu: Arc<GpuContext>,
    config: RenderContextConfig,
    pool: Arc<BufferPool>,
}

impl RenderContext {
    pub fn new(gpu: Arc<GpuContext>, config: RenderContextConfig) -> Result<Self> {
        let max = gpu.max_texture_dimension();
        if config.width == 0 || config.height == 0 {
            return Err(GpuError::InvalidCanvas {
                width: config.width,
                height: config.height,
                reason: "render size must be non-zero".to_string(),
            });
        }
        if config.width > max || config.height > max {
            return Err(GpuError::InvalidCanvas {
                width: config.width,
                height: config.height,
                reason: format!("exceeds max texture dimension {max}"),
            });
        }
        if !gpu.supports_format(config.format) {
            return Err(GpuError::UnsupportedFormat(config.format));
        }

        let pool = BufferPool::new(config.pool_capacity, config.pool_free_budget);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "render context created"
        );
        Ok(Self { gpu, config, pool })
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Whole output canvas.
    pub fn render_rect(&self) -> PixelRect {
        PixelRect::full(self.config.width, self.config.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.config.format
    }

    pub fn config(&self) -> &RenderContextConfig {
        &self.config
    }

    /// Allocate an output buffer at the render size from the pool.
    pub fn new_buffer(&self) -> Result<ImageBuffer> {
        self.pool
            .acquire(self.config.width, self.config.height, self.config.format)
    }

    /// Commit recorded work to the device queue.
    pub fn commit(&self, buffer: CommandBuffer) -> Result<()> {
        self.gpu.queue().commit(buffer)
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }
}
