//! Shared fixtures for the integration tests.

use std::sync::{Arc, Once, OnceLock};
use tracing_subscriber::EnvFilter;
use vcomp_compositor::{Compositor, CompositorConfig, FrameSource, StaticFrameSource};
use vcomp_core::{ImageBuffer, PixelFormat, RationalTime, SharedImage, TimeRange, TrackId};
use vcomp_effects::RendererConfig;
use vcomp_gpu::{GpuConfig, GpuContext, GpuError, RenderContext, RenderContextConfig};
use vcomp_timeline::{LayerInstruction, TimelineInstructionSet};

pub const RED: [u8; 4] = [200, 0, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 100, 255];

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// wgpu's fallback adapter when the machine has one, the software device
/// otherwise. Decided once per test binary.
fn gpu_config() -> GpuConfig {
    static CONFIG: OnceLock<GpuConfig> = OnceLock::new();
    CONFIG
        .get_or_init(|| {
            let fallback = GpuConfig {
                force_fallback_adapter: true,
                ..GpuConfig::default()
            };
            match GpuContext::new(fallback.clone()) {
                Ok(_) => fallback,
                Err(GpuError::NoAdapter | GpuError::DeviceRequest(_)) => GpuConfig::software(),
                Err(other) => panic!("GPU setup failed: {other}"),
            }
        })
        .clone()
}

pub fn gpu() -> Arc<GpuContext> {
    init_tracing();
    Arc::new(GpuContext::new(gpu_config()).unwrap())
}

pub fn context(width: u32, height: u32) -> Arc<RenderContext> {
    context_with(RenderContextConfig::default().with_size(width, height))
}

pub fn context_with(config: RenderContextConfig) -> Arc<RenderContext> {
    Arc::new(RenderContext::new(gpu(), config).unwrap())
}

pub fn solid(width: u32, height: u32, color: [u8; 4]) -> SharedImage {
    Arc::new(ImageBuffer::filled(width, height, PixelFormat::Rgba8, color))
}

pub fn secs(numerator: i64, denominator: i64) -> RationalTime {
    RationalTime::new(numerator, denominator)
}

/// A on track 1 over [0, 5), B on track 2 over [5, 10), 2 s window.
pub fn a_then_b() -> Arc<TimelineInstructionSet> {
    let a = LayerInstruction::new(
        TrackId(1),
        TimeRange::new(RationalTime::ZERO, RationalTime::from_secs(5)),
        RationalTime::ZERO,
    );
    let b = LayerInstruction::new(
        TrackId(2),
        TimeRange::new(RationalTime::from_secs(5), RationalTime::from_secs(5)),
        RationalTime::from_secs(5),
    );
    Arc::new(TimelineInstructionSet::transition(vec![a, b], RationalTime::from_secs(2)).unwrap())
}

/// Red frame on track 1, blue frame on track 2.
pub fn red_blue_source(width: u32, height: u32) -> Arc<StaticFrameSource> {
    Arc::new(
        StaticFrameSource::new()
            .with_frame(TrackId(1), solid(width, height, RED))
            .with_frame(TrackId(2), solid(width, height, BLUE)),
    )
}

pub fn compositor(
    renderer: RendererConfig,
    context: Arc<RenderContext>,
    source: Arc<dyn FrameSource>,
) -> Compositor {
    init_tracing();
    Compositor::from_renderer_config(&renderer, context, source, CompositorConfig::default())
        .unwrap()
}
