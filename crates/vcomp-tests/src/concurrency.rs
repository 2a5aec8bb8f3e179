//! Many requests in flight, several submitters, and shutdown.

use crate::support::*;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vcomp_compositor::{
    CompositionRequest, Compositor, CompositorError, FrameResult, FrameSource,
    StaticFrameSource,
};
use vcomp_core::{RationalTime, SharedImage, TrackId};
use vcomp_effects::RendererConfig;

const W: u32 = 8;
const H: u32 = 4;

// ── Helpers ────────────────────────────────────────────────────

/// Red/blue source whose first lookup announces itself on `entered`, then
/// blocks until something arrives on `gate`.
struct GatedSource {
    frames: Arc<StaticFrameSource>,
    gated: AtomicBool,
    entered: Sender<()>,
    gate: Receiver<()>,
}

impl FrameSource for GatedSource {
    fn source_frame(&self, track: TrackId, time: RationalTime) -> Option<SharedImage> {
        if self.gated.swap(false, Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.gate.recv();
        }
        self.frames.source_frame(track, time)
    }
}

struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

fn gated_source() -> (Arc<GatedSource>, Gate) {
    let (entered_tx, entered) = bounded(1);
    let (release, gate) = bounded(1);
    let source = GatedSource {
        frames: red_blue_source(W, H),
        gated: AtomicBool::new(true),
        entered: entered_tx,
        gate,
    };
    (Arc::new(source), Gate { entered, release })
}

/// Shut `comp` down while its lane is stuck in the gated source, letting
/// the lane continue only once the compositor reports closed.
fn shutdown_while_gated(comp: &Compositor, gate: Gate) {
    gate.entered.recv().unwrap();
    thread::scope(|scope| {
        scope.spawn(|| {
            while !comp.is_closed() {
                thread::sleep(Duration::from_millis(1));
            }
            gate.release.send(()).unwrap();
        });
        comp.shutdown();
    });
}

/// Times inside the A/B transition window, 0.1 s apart.
fn window_times(count: i64) -> impl Iterator<Item = RationalTime> {
    (0..count).map(|i| secs(50 + i, 10))
}

// ── Concurrent requests ────────────────────────────────────────

#[test]
fn concurrent_transition_frames_get_distinct_buffers() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));
    let (tx, rx) = unbounded::<FrameResult>();

    let ids: Vec<_> = window_times(8)
        .map(|t| {
            let tx = tx.clone();
            comp.submit_with(CompositionRequest::new(t, a_then_b()), move |result| {
                tx.send(result).unwrap();
            })
        })
        .collect();
    drop(tx);

    // Keep every frame alive so no buffer goes back to the pool.
    let frames: Vec<_> = rx.iter().map(|result| result.unwrap()).collect();
    assert_eq!(frames.len(), 8);
    assert_eq!(comp.in_flight(), 0);

    let buffers: HashSet<_> = frames.iter().map(|frame| frame.image.id()).collect();
    assert_eq!(buffers.len(), 8);
    let requests: HashSet<_> = frames.iter().map(|frame| frame.request).collect();
    assert_eq!(requests, ids.into_iter().collect());
}

#[test]
fn each_frame_matches_its_own_time() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    // 5.0, 5.2, ... 7.2 s: ten blended frames, then B on its own
    let tickets: Vec<_> = (0..12)
        .map(|i| secs(50 + 2 * i, 10))
        .map(|t| (t, comp.submit(CompositionRequest::new(t, a_then_b()))))
        .collect();

    for (t, ticket) in tickets {
        let frame = ticket.wait().unwrap();
        assert_eq!(frame.time, t);
        if t < RationalTime::from_secs(7) {
            let factor = (t - RationalTime::from_secs(5)).ratio(RationalTime::from_secs(2)).unwrap();
            let red = (200.0 * (1.0 - factor)).round() as u8;
            let pixel = frame.image.pixel(0, 0);
            assert!(pixel[0].abs_diff(red) <= 1, "at {t}: {pixel:?}");
        } else {
            assert!(frame.is_pass_through());
        }
    }
}

#[test]
fn submitters_on_many_threads() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    thread::scope(|scope| {
        for worker in 0..4 {
            let comp = &comp;
            scope.spawn(move || {
                for i in 0..10 {
                    let t = secs(40 + worker * 10 + i, 10);
                    let frame = comp
                        .submit(CompositionRequest::new(t, a_then_b()))
                        .wait()
                        .unwrap();
                    assert_eq!(frame.time, t);
                }
            });
        }
    });
    assert_eq!(comp.in_flight(), 0);
}

#[test]
fn dropped_ticket_still_completes() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    drop(comp.submit(CompositionRequest::new(RationalTime::from_secs(6), a_then_b())));
    let last = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), a_then_b()))
        .wait();
    assert!(last.is_ok());

    // the GPU may still be finishing the first frame
    for _ in 0..200 {
        if comp.in_flight() == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(comp.in_flight(), 0);
}

#[tokio::test]
async fn ticket_can_be_awaited() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));

    let frame = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(6), a_then_b()))
        .await
        .unwrap();
    assert_eq!(frame.image.pixel(0, 0), [100, 0, 50, 255]);
}

// ── Shutdown ───────────────────────────────────────────────────

#[test]
fn shutdown_cancels_queued_requests() {
    let (source, gate) = gated_source();
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);

    // The first request blocks the lane inside the source; the rest queue.
    let first = comp.submit(CompositionRequest::new(RationalTime::from_secs(1), a_then_b()));
    let queued: Vec<_> = window_times(4)
        .map(|t| comp.submit(CompositionRequest::new(t, a_then_b())))
        .collect();
    shutdown_while_gated(&comp, gate);

    assert!(first.wait().unwrap().is_pass_through());
    for ticket in queued {
        assert_eq!(ticket.wait().unwrap_err(), CompositorError::Cancelled);
    }
}

#[test]
fn rendered_frame_finishing_after_shutdown_is_cancelled() {
    let (source, gate) = gated_source();
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), source);

    let ticket = comp.submit(CompositionRequest::new(RationalTime::from_secs(6), a_then_b()));
    shutdown_while_gated(&comp, gate);

    assert_eq!(ticket.wait().unwrap_err(), CompositorError::Cancelled);
}

#[test]
fn submit_after_shutdown_is_cancelled() {
    let comp = compositor(RendererConfig::CrossDissolve, context(W, H), red_blue_source(W, H));
    comp.shutdown();
    comp.shutdown();

    let result = comp
        .submit(CompositionRequest::new(RationalTime::from_secs(1), a_then_b()))
        .wait();
    assert_eq!(result.unwrap_err(), CompositorError::Cancelled);
    assert_eq!(comp.in_flight(), 0);
}
