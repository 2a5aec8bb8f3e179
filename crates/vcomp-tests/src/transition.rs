//! Integration tests for two-layer transitions through the compositor.

use crate::support::*;
use std::sync::Arc;
use vcomp_compositor::{
    CompositionDescriptor, CompositionRequest, CompositorConfig, CompositorError, FrameOrigin,
    FrameSource, StaticFrameSource, VideoComposition,
};
use vcomp_core::{ImageBuffer, PixelFormat, RationalTime, SharedImage, TimeRange, TimelineKind, TrackId};
use vcomp_effects::{RenderError, RendererConfig};
use vcomp_gpu::{GpuError, RenderContextConfig};
use vcomp_timeline::{sequential_layout, Clip, TimelineError, TimelineInstructionSet};

const W: u32 = 16;
const H: u32 = 8;

fn frame_at(compositor: &vcomp_compositor::Compositor, t: RationalTime) -> vcomp_compositor::FrameResult {
    compositor
        .submit(CompositionRequest::new(t, a_then_b()))
        .wait()
}

// ── The A/B scenario ───────────────────────────────────────────

#[test]
fn before_cut_passes_a_through_untouched() {
    let source = red_blue_source(W, H);
    let a = source.source_frame(TrackId(1), RationalTime::ZERO).unwrap();
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);

    let frame = frame_at(&comp, secs(49, 10)).unwrap();
    assert_eq!(frame.origin, FrameOrigin::PassThrough { track: TrackId(1) });
    assert!(Arc::ptr_eq(&frame.image, &a));
}

#[test]
fn at_cut_dissolve_starts_from_a() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    let frame = frame_at(&comp, RationalTime::from_secs(5)).unwrap();
    assert!(matches!(frame.origin, FrameOrigin::Rendered { .. }));
    assert!(frame.image.same_pixels(&solid(W, H, RED)));
}

#[test]
fn mid_window_is_even_mix() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    let frame = frame_at(&comp, RationalTime::from_secs(6)).unwrap();
    for y in 0..H {
        for x in 0..W {
            assert_eq!(frame.image.pixel(x, y), [100, 0, 50, 255]);
        }
    }
}

#[test]
fn after_window_passes_b_through_untouched() {
    let source = red_blue_source(W, H);
    let b = source.source_frame(TrackId(2), RationalTime::ZERO).unwrap();
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);

    let frame = frame_at(&comp, secs(71, 10)).unwrap();
    assert_eq!(frame.origin, FrameOrigin::PassThrough { track: TrackId(2) });
    assert!(Arc::ptr_eq(&frame.image, &b));
}

#[test]
fn out_of_range_is_missing_instruction() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    let err = frame_at(&comp, RationalTime::from_secs(100)).unwrap_err();
    assert_eq!(
        err,
        CompositorError::MissingInstruction(TimelineError::NoActiveLayer {
            time: RationalTime::from_secs(100)
        })
    );
}

// ── Failures and degradation ───────────────────────────────────

#[test]
fn missing_target_frame_fails_the_frame() {
    let source = Arc::new(StaticFrameSource::new().with_frame(TrackId(1), solid(W, H, RED)));
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);

    let err = frame_at(&comp, RationalTime::from_secs(6)).unwrap_err();
    assert_eq!(
        err,
        CompositorError::SourceFrameUnavailable {
            track: TrackId(2),
            time: RationalTime::from_secs(6)
        }
    );

    // the stream carries on
    assert!(frame_at(&comp, RationalTime::from_secs(1)).is_ok());
}

#[test]
fn missing_previous_frame_degrades_to_target() {
    let b = solid(W, H, BLUE);
    let source = Arc::new(StaticFrameSource::new().with_frame(TrackId(2), b.clone()));
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);

    let frame = frame_at(&comp, RationalTime::from_secs(6)).unwrap();
    assert_eq!(frame.origin, FrameOrigin::PassThrough { track: TrackId(2) });
    assert!(Arc::ptr_eq(&frame.image, &b));
}

#[test]
fn passthrough_track_skips_resolution() {
    let source = red_blue_source(W, H);
    let b = source.source_frame(TrackId(2), RationalTime::ZERO).unwrap();
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);
    let set = Arc::new(TimelineInstructionSet::passthrough(
        TrackId(2),
        TimeRange::new(RationalTime::ZERO, RationalTime::from_secs(10)),
    ));

    let frame = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), set))
        .wait()
        .unwrap();
    assert!(Arc::ptr_eq(&frame.image, &b));
}

#[test]
fn grid_instructions_rejected_by_transition_renderer() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));
    let grid = vcomp_timeline::parallel_layout(
        RationalTime::ZERO,
        &[Clip::new(TrackId(1), RationalTime::from_secs(2))],
    )
    .unwrap();

    assert!(comp.check_instructions(&grid).is_err());
    let err = comp
        .submit(CompositionRequest::new(RationalTime::ZERO, Arc::new(grid)))
        .wait()
        .unwrap_err();
    assert_eq!(
        err,
        CompositorError::IncompatibleInstructionType {
            expected: TimelineKind::Transition,
            found: TimelineKind::Grid
        }
    );
}

#[test]
fn source_in_foreign_format_is_render_error() {
    let bgra: SharedImage = Arc::new(ImageBuffer::new(W, H, PixelFormat::Bgra8));
    let source = Arc::new(
        StaticFrameSource::new()
            .with_frame(TrackId(1), bgra)
            .with_frame(TrackId(2), solid(W, H, BLUE)),
    );
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);
    assert_eq!(comp.pixel_format(), PixelFormat::Rgba8);

    let err = frame_at(&comp, RationalTime::from_secs(6)).unwrap_err();
    assert!(matches!(
        err,
        CompositorError::Render(RenderError::FormatMismatch { .. })
    ));
}

#[test]
fn empty_source_frame_fails_only_its_own_request() {
    let source = Arc::new(
        StaticFrameSource::new()
            .with_frame(TrackId(1), Arc::new(ImageBuffer::new(0, 0, PixelFormat::Rgba8)))
            .with_frame(TrackId(2), solid(8, 4, BLUE)),
    );
    let comp = compositor(RendererConfig::CrossDissolve, context(8, 4), source.clone());

    let err = frame_at(&comp, RationalTime::from_secs(6)).unwrap_err();
    assert_eq!(
        err,
        CompositorError::Render(RenderError::Gpu(GpuError::EmptyTexture {
            width: 0,
            height: 0
        }))
    );

    source.insert(TrackId(1), solid(8, 4, RED));
    let frame = frame_at(&comp, RationalTime::from_secs(6)).unwrap();
    assert_eq!(frame.image.pixel(7, 3), [100, 0, 50, 255]);
}

#[test]
fn exhausted_pool_fails_allocation() {
    let ctx = context_with(RenderContextConfig {
        pool_capacity: 1,
        ..RenderContextConfig::default().with_size(W, H)
    });
    let comp = compositor(RendererConfig::CrossDissolve, ctx, red_blue_source(W, H));

    let held = frame_at(&comp, RationalTime::from_secs(6)).unwrap();
    let err = frame_at(&comp, secs(13, 2)).unwrap_err();
    assert_eq!(
        err,
        CompositorError::OutputBufferAllocationFailed(GpuError::PoolExhausted { capacity: 1 })
    );

    drop(held);
    assert!(frame_at(&comp, secs(13, 2)).is_ok());
}

// ── Renderer variants and assembly ─────────────────────────────

#[test]
fn wipe_from_descriptor() {
    let set = sequential_layout(
        RationalTime::ZERO,
        &[
            Clip::new(TrackId(1), RationalTime::from_secs(5)),
            Clip::new(TrackId(2), RationalTime::from_secs(5)),
        ],
        RationalTime::from_secs(2),
    )
    .unwrap();
    let desc = CompositionDescriptor {
        version: 1,
        renderer: RendererConfig::Wipe {
            direction: vcomp_effects::WipeDirection::Left,
        },
        width: W,
        height: H,
        format: PixelFormat::Rgba8,
        frame_rate: Default::default(),
        instruction_sets: vec![vcomp_timeline::InstructionSetDescriptor::from_set(&set)],
    };
    let json = desc.to_json().unwrap();
    let composition = VideoComposition::from_descriptor(
        &CompositionDescriptor::from_json(&json).unwrap(),
        RationalTime::from_secs(2),
    )
    .unwrap();

    init_tracing();
    let comp = composition
        .compositor(gpu(), red_blue_source(W, H), CompositorConfig::default())
        .unwrap();
    let frame = comp
        .submit(composition.request_at(RationalTime::from_secs(6)).unwrap())
        .wait()
        .unwrap();

    // halfway: left half blue, right half red
    assert_eq!(frame.image.pixel(W / 2 - 1, 0), BLUE);
    assert_eq!(frame.image.pixel(W / 2, H - 1), RED);
}

#[test]
fn every_frame_of_a_composition_completes() {
    let set = sequential_layout(
        RationalTime::ZERO,
        &[
            Clip::new(TrackId(1), RationalTime::from_secs(1)),
            Clip::new(TrackId(2), RationalTime::from_secs(1)),
        ],
        secs(1, 2),
    )
    .unwrap();
    let composition = VideoComposition::new(
        RendererConfig::CrossDissolve,
        RenderContextConfig::default().with_size(W, H),
        vcomp_core::FrameRate::FPS_30,
        vec![set],
    )
    .unwrap();
    init_tracing();
    let comp = composition
        .compositor(gpu(), red_blue_source(W, H), CompositorConfig::default())
        .unwrap();

    let tickets: Vec<_> = composition
        .frame_times()
        .map(|t| comp.submit(composition.request_at(t).unwrap()))
        .collect();
    assert_eq!(tickets.len(), 60);

    let rendered = tickets
        .into_iter()
        .map(|ticket| ticket.wait().unwrap())
        .filter(|frame| !frame.is_pass_through())
        .count();
    // frames 30..45 fall inside the half-second window
    assert_eq!(rendered, 15);
}
