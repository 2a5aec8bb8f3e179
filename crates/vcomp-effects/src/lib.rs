//! VComp Effects - renderers that blend source frames into one output
//!
//! Every renderer records its work into a [`vcomp_gpu::CommandBuffer`]
//! targeting the output buffer; none of them touch pixels directly.

pub mod config;
pub mod error;
pub mod renderer;
pub mod renderers;

pub use config::{AnyRenderer, RendererConfig};
pub use error::{RenderError, Result};
pub use renderer::{RenderParams, Renderer};
pub use renderers::{
    CrossDissolveRenderer, GridRenderer, WatermarkRenderer, WipeDirection, WipeRenderer,
};
