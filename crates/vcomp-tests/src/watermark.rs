//! Integration tests for the watermark renderer.

use crate::support::*;
use std::sync::Arc;
use vcomp_compositor::{CompositionRequest, CompositorError, FrameOrigin, StaticFrameSource};
use vcomp_core::{RationalTime, TimeRange, TimelineKind, TrackId};
use vcomp_effects::RendererConfig;
use vcomp_timeline::{LayerInstruction, TimelineError, TimelineInstructionSet};

const W: u32 = 40;
const H: u32 = 20;
const SIDE: u32 = W / 10;
const LOGO: TrackId = TrackId(9);
const WHITE: [u8; 4] = [255, 255, 255, 255];

// ── Helpers ────────────────────────────────────────────────────

/// Red on track 1 over [0, 5), blue on track 2 over [5, 10), logo on top.
fn stamped() -> Arc<TimelineInstructionSet> {
    let layers = vec![
        LayerInstruction::new(
            TrackId(1),
            TimeRange::new(RationalTime::ZERO, RationalTime::from_secs(5)),
            RationalTime::ZERO,
        ),
        LayerInstruction::new(
            TrackId(2),
            TimeRange::new(RationalTime::from_secs(5), RationalTime::from_secs(5)),
            RationalTime::from_secs(5),
        ),
    ];
    Arc::new(TimelineInstructionSet::watermark(layers, LOGO).unwrap())
}

fn source_with_logo() -> Arc<StaticFrameSource> {
    let source = red_blue_source(W, H);
    source.insert(LOGO, solid(2, 2, WHITE));
    source
}

fn watermark() -> RendererConfig {
    RendererConfig::Watermark { size_divisor: 10 }
}

// ── Stamping ───────────────────────────────────────────────────

#[test]
fn logo_covers_top_right_square_of_current_clip() {
    let comp = compositor(watermark(), context(W, H), source_with_logo());

    for (t, base) in [(RationalTime::from_secs(1), RED), (RationalTime::from_secs(7), BLUE)] {
        let frame = comp
            .submit(CompositionRequest::new(t, stamped()))
            .wait()
            .unwrap();
        assert_eq!(frame.origin, FrameOrigin::Rendered { renderer: "Watermark" });
        for y in 0..H {
            for x in 0..W {
                let expected = if x >= W - SIDE && y < SIDE { WHITE } else { base };
                assert_eq!(frame.image.pixel(x, y), expected, "at {t} ({x},{y})");
            }
        }
    }
}

#[test]
fn missing_logo_passes_clip_through() {
    let source = red_blue_source(W, H);
    let comp = compositor(watermark(), context(W, H), source);

    let frame = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), stamped()))
        .wait()
        .unwrap();
    assert_eq!(frame.origin, FrameOrigin::PassThrough { track: TrackId(1) });
}

#[test]
fn missing_clip_frame_fails_the_frame() {
    let source = Arc::new(StaticFrameSource::new().with_frame(LOGO, solid(2, 2, WHITE)));
    let comp = compositor(watermark(), context(W, H), source);

    let err = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), stamped()))
        .wait()
        .unwrap_err();
    assert_eq!(
        err,
        CompositorError::SourceFrameUnavailable {
            track: TrackId(1),
            time: RationalTime::from_secs(1)
        }
    );
}

#[test]
fn outside_covered_range_is_missing_instruction() {
    let comp = compositor(watermark(), context(W, H), source_with_logo());

    let err = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(10), stamped()))
        .wait()
        .unwrap_err();
    assert_eq!(
        err,
        CompositorError::MissingInstruction(TimelineError::NoActiveLayer {
            time: RationalTime::from_secs(10)
        })
    );
}

#[test]
fn transition_set_rejected_by_watermark() {
    let comp = compositor(watermark(), context(W, H), source_with_logo());

    let err = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), a_then_b()))
        .wait()
        .unwrap_err();
    assert_eq!(
        err,
        CompositorError::IncompatibleInstructionType {
            expected: TimelineKind::Watermark,
            found: TimelineKind::Transition
        }
    );
}
