//! Built-in renderer implementations.

mod cross_dissolve;
mod grid;
mod watermark;
mod wipe;

pub use cross_dissolve::CrossDissolveRenderer;
pub use grid::GridRenderer;
pub use watermark::WatermarkRenderer;
pub use wipe::{WipeDirection, WipeRenderer};
