//! VComp GPU - command submission model for frame compositing
//!
//! Renderers record render passes into a [`CommandBuffer`] that targets
//! one pooled output buffer. Committed buffers run on the context's
//! [`CommandQueue`] thread, on a wgpu device or the software rasterizer,
//! and report back through a completion handler, which is also where the
//! references they retain are released.

pub mod blend;
pub mod buffer_pool;
pub mod command;
pub mod context;
pub mod error;
mod hardware;
pub mod pipeline;
pub mod queue;
pub mod render_context;
mod software;

pub use blend::BlendState;
pub use buffer_pool::BufferPool;
pub use command::{CommandBuffer, CompletionHandler, DrawCommand, LoadAction, RenderPass};
pub use context::{GpuBackend, GpuConfig, GpuContext};
pub use error::{GpuError, Result};
pub use pipeline::{RenderPipeline, RenderPipelineDescriptor};
pub use queue::CommandQueue;
pub use render_context::{RenderContext, RenderContextConfig};
