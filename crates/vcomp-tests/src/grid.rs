//! Integration tests for the grid renderer driven by parallel layouts.

use crate::support::*;
use std::sync::Arc;
use vcomp_compositor::{CompositionRequest, CompositorError, FrameOrigin, StaticFrameSource};
use vcomp_core::{ImageBuffer, RationalTime, TimelineKind, TrackId};
use vcomp_effects::{RenderError, RendererConfig};
use vcomp_timeline::{parallel_layout, Clip, TimelineInstructionSet};

const SIZE: u32 = 8;
const TILE: u32 = SIZE / 2;

const COLORS: [[u8; 4]; 4] = [
    [255, 0, 0, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 255, 0, 255],
];
const CLEARED: [u8; 4] = [0, 0, 0, 255];

// ── Helpers ────────────────────────────────────────────────────

/// Tracks 1..=4 in slots 0..=3, lasting 2, 3, 4 and 5 seconds.
fn quad() -> Arc<TimelineInstructionSet> {
    let clips: Vec<_> = (0..4)
        .map(|i| Clip::new(TrackId(i + 1), RationalTime::from_secs(i as i64 + 2)))
        .collect();
    Arc::new(parallel_layout(RationalTime::ZERO, &clips).unwrap())
}

fn quad_source() -> Arc<StaticFrameSource> {
    let source = StaticFrameSource::new();
    for (i, color) in COLORS.iter().enumerate() {
        source.insert(TrackId(i as u32 + 1), solid(TILE, TILE, *color));
    }
    Arc::new(source)
}

fn tile_color(image: &ImageBuffer, slot: u32) -> Option<[u8; 4]> {
    let x0 = (slot % 2) * TILE;
    let y0 = (slot / 2) * TILE;
    let first = image.pixel(x0, y0);
    for y in y0..y0 + TILE {
        for x in x0..x0 + TILE {
            if image.pixel(x, y) != first {
                return None;
            }
        }
    }
    Some(first)
}

fn grid_2x2() -> RendererConfig {
    RendererConfig::Grid {
        columns: 2,
        rows: 2,
    }
}

// ── Layout ─────────────────────────────────────────────────────

#[test]
fn all_four_tiles_drawn_while_everything_is_active() {
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), quad_source());

    let frame = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), quad()))
        .wait()
        .unwrap();
    assert_eq!(frame.origin, FrameOrigin::Rendered { renderer: "Grid" });
    for slot in 0..4 {
        assert_eq!(tile_color(&frame.image, slot), Some(COLORS[slot as usize]));
    }
}

#[test]
fn ended_clips_leave_their_tiles_cleared() {
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), quad_source());

    let frame = comp
        .submit(CompositionRequest::new(RationalTime::new(9, 2), quad()))
        .wait()
        .unwrap();
    assert_eq!(tile_color(&frame.image, 0), Some(CLEARED));
    assert_eq!(tile_color(&frame.image, 1), Some(CLEARED));
    assert_eq!(tile_color(&frame.image, 2), Some(CLEARED));
    assert_eq!(tile_color(&frame.image, 3), Some(COLORS[3]));
}

#[test]
fn missing_tile_source_stays_cleared() {
    let source = quad_source();
    source.remove(TrackId(2));
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), source);

    let frame = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), quad()))
        .wait()
        .unwrap();
    assert_eq!(tile_color(&frame.image, 0), Some(COLORS[0]));
    assert_eq!(tile_color(&frame.image, 1), Some(CLEARED));
    assert_eq!(tile_color(&frame.image, 3), Some(COLORS[3]));
}

#[test]
fn after_last_clip_is_missing_instruction() {
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), quad_source());

    let err = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(5), quad()))
        .wait()
        .unwrap_err();
    assert!(matches!(err, CompositorError::MissingInstruction(_)));
}

#[test]
fn transition_set_rejected_by_grid() {
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), quad_source());

    let err = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), a_then_b()))
        .wait()
        .unwrap_err();
    assert_eq!(
        err,
        CompositorError::IncompatibleInstructionType {
            expected: TimelineKind::Grid,
            found: TimelineKind::Transition
        }
    );
}

// ── Render context changes ─────────────────────────────────────

#[test]
fn larger_context_applies_to_later_frames() {
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), quad_source());
    let small = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), quad()))
        .wait()
        .unwrap();

    comp.render_context_changed(context(SIZE * 2, SIZE * 2)).unwrap();
    let large = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), quad()))
        .wait()
        .unwrap();

    assert_eq!((small.image.width(), small.image.height()), (SIZE, SIZE));
    assert_eq!((large.image.width(), large.image.height()), (SIZE * 2, SIZE * 2));
    // tiles scale up with the canvas
    assert_eq!(large.image.pixel(SIZE * 2 - 1, SIZE * 2 - 1), COLORS[3]);
}

#[test]
fn indivisible_context_rejected() {
    let comp = compositor(grid_2x2(), context(SIZE, SIZE), quad_source());

    let err = comp.render_context_changed(context(SIZE + 1, SIZE)).unwrap_err();
    assert!(matches!(
        err,
        CompositorError::RendererInit(RenderError::InvalidLayout(_))
    ));
    assert_eq!(comp.render_context().width(), SIZE);
}
