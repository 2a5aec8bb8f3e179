//! The frame compositor.
//!
//! Requests go onto a FIFO lane served by one thread. The lane does the
//! CPU side (resolution, source fetch, encoding) and commits to the GPU
//! queue without waiting for the GPU, so several requests can be in flight
//! at once. Each request's state lives in its own command buffer and
//! completion slot.

use crate::completion::{FrameHandler, InFlight, RequestId};
use crate::error::{CompositorError, Result};
use crate::request::{ComposedFrame, CompositionRequest, FrameOrigin, FrameResult, FrameTicket};
use crate::source::FrameSource;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use vcomp_core::{PixelFormat, RationalTime, SharedImage, TimelineKind, TrackId};
use vcomp_effects::{AnyRenderer, RenderParams, Renderer, RendererConfig};
use vcomp_gpu::{CommandBuffer, GpuError, RenderContext};
use vcomp_timeline::{Resolution, TimelineError, TimelineInstructionSet};

/// Compositor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Name of the lane thread.
    pub lane_name: String,
    /// Window used when a descriptor does not name one.
    pub default_transition_window: RationalTime,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            lane_name: "vcomp-compositor".to_string(),
            default_transition_window: RationalTime::from_secs(2),
        }
    }
}

struct Job {
    id: RequestId,
    request: CompositionRequest,
}

struct Lane {
    sender: Sender<Job>,
    worker: JoinHandle<()>,
}

struct Shared<R> {
    renderer: R,
    source: Arc<dyn FrameSource>,
    context: RwLock<Arc<RenderContext>>,
    in_flight: Arc<InFlight>,
    closed: Arc<AtomicBool>,
}

/// What the lane produced for one request.
enum Outcome {
    /// Finished on the lane.
    Ready(ComposedFrame),
    /// Committed to the GPU; the command buffer's handler finishes it.
    Submitted,
}

/// Turns composition requests into frames with one renderer.
pub struct Compositor<R: Renderer + 'static = AnyRenderer> {
    shared: Arc<Shared<R>>,
    lane: Mutex<Option<Lane>>,
    next_id: AtomicU64,
    config: CompositorConfig,
}

impl Compositor<AnyRenderer> {
    /// Build the configured renderer and start the compositor.
    pub fn from_renderer_config(
        renderer: &RendererConfig,
        context: Arc<RenderContext>,
        source: Arc<dyn FrameSource>,
        config: CompositorConfig,
    ) -> Result<Self> {
        let renderer =
            AnyRenderer::new(renderer, &context).map_err(CompositorError::RendererInit)?;
        Self::new(renderer, context, source, config)
    }
}

impl<R: Renderer + 'static> Compositor<R> {
    pub fn new(
        renderer: R,
        context: Arc<RenderContext>,
        source: Arc<dyn FrameSource>,
        config: CompositorConfig,
    ) -> Result<Self> {
        renderer
            .validate_context(&context)
            .map_err(CompositorError::RendererInit)?;

        let shared = Arc::new(Shared {
            renderer,
            source,
            context: RwLock::new(context),
            in_flight: Arc::new(InFlight::default()),
            closed: Arc::new(AtomicBool::new(false)),
        });

        let (sender, receiver) = unbounded::<Job>();
        let worker = {
            let shared = shared.clone();
            thread::Builder::new()
                .name(config.lane_name.clone())
                .spawn(move || run_lane(shared, receiver))
                .map_err(|e| CompositorError::Spawn(e.to_string()))?
        };

        info!(
            lane = %config.lane_name,
            renderer = shared.renderer.name(),
            kind = %shared.renderer.kind(),
            "compositor started"
        );
        Ok(Self {
            shared,
            lane: Mutex::new(Some(Lane { sender, worker })),
            next_id: AtomicU64::new(1),
            config,
        })
    }

    pub fn renderer(&self) -> &R {
        &self.shared.renderer
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Pixel format required of source frames and produced for outputs.
    pub fn pixel_format(&self) -> PixelFormat {
        self.shared.context.read().format()
    }

    pub fn render_context(&self) -> Arc<RenderContext> {
        self.shared.context.read().clone()
    }

    /// Check up front that `set` can be drawn by this compositor's renderer.
    pub fn check_instructions(&self, set: &TimelineInstructionSet) -> Result<()> {
        check_kind(self.shared.renderer.kind(), set.kind())
    }

    /// Switch to `context` for requests processed from now on.
    ///
    /// Requests already committed keep the context they started with.
    pub fn render_context_changed(&self, context: Arc<RenderContext>) -> Result<()> {
        self.shared
            .renderer
            .validate_context(&context)
            .map_err(CompositorError::RendererInit)?;
        info!(
            width = context.width(),
            height = context.height(),
            format = ?context.format(),
            "render context changed"
        );
        *self.shared.context.write() = context;
        Ok(())
    }

    /// Queue `request`; `handler` receives the outcome exactly once.
    pub fn submit_with(
        &self,
        request: CompositionRequest,
        handler: impl FnOnce(FrameResult) + Send + 'static,
    ) -> RequestId {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: FrameHandler = Box::new(handler);
        self.shared.in_flight.register(id, handler);

        let sender = self.lane.lock().as_ref().map(|lane| lane.sender.clone());
        let queued = match sender {
            Some(sender) if !self.shared.closed.load(Ordering::Acquire) => {
                sender.send(Job { id, request }).is_ok()
            }
            _ => false,
        };
        if !queued {
            debug!(request = %id, "compositor closed, cancelling request");
            self.shared.in_flight.cancel(id);
        }
        id
    }

    /// Queue `request` and get a ticket for the result.
    pub fn submit(&self, request: CompositionRequest) -> FrameTicket {
        let (tx, rx) = oneshot::channel();
        let id = self.submit_with(request, move |result| {
            // The ticket may have been dropped; nobody is waiting then.
            let _ = tx.send(result);
        });
        FrameTicket::new(id, rx)
    }

    /// Requests submitted and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Tear down. Requests still on the lane and requests whose GPU work
    /// has not finished complete with [`CompositorError::Cancelled`].
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let lane = self.lane.lock().take();
        if let Some(Lane { sender, worker }) = lane {
            drop(sender);
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                warn!(lane = %self.config.lane_name, "compositor lane panicked");
            }
        }
        info!(
            lane = %self.config.lane_name,
            pending_gpu = self.shared.in_flight.len(),
            "compositor shut down"
        );
    }
}

impl<R: Renderer + 'static> Drop for Compositor<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<R: Renderer + 'static> std::fmt::Debug for Compositor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("lane", &self.config.lane_name)
            .field("renderer", &self.shared.renderer.name())
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn check_kind(expected: TimelineKind, found: TimelineKind) -> Result<()> {
    if expected != found {
        return Err(CompositorError::IncompatibleInstructionType { expected, found });
    }
    Ok(())
}

fn run_lane<R: Renderer>(shared: Arc<Shared<R>>, receiver: Receiver<Job>) {
    for Job { id, request } in receiver.iter() {
        if shared.closed.load(Ordering::Acquire) {
            shared.in_flight.cancel(id);
            continue;
        }
        match shared.process(id, &request) {
            Ok(Outcome::Ready(frame)) => {
                shared.in_flight.finish(id, Ok(frame));
            }
            Ok(Outcome::Submitted) => {}
            Err(err) => {
                debug!(request = %id, time = %request.query_time, error = %err, "frame failed");
                shared.in_flight.finish(id, Err(err));
            }
        }
    }
    debug!(pending_gpu = shared.in_flight.len(), "compositor lane stopped");
}

impl<R: Renderer> Shared<R> {
    fn fetch(&self, track: TrackId, time: RationalTime) -> Option<SharedImage> {
        self.source.source_frame(track, time)
    }

    fn fetch_required(&self, track: TrackId, time: RationalTime) -> Result<SharedImage> {
        self.fetch(track, time)
            .ok_or(CompositorError::SourceFrameUnavailable { track, time })
    }

    fn pass_through(
        &self,
        id: RequestId,
        time: RationalTime,
        track: TrackId,
        image: SharedImage,
    ) -> Outcome {
        debug!(request = %id, %time, %track, "pass-through");
        Outcome::Ready(ComposedFrame {
            request: id,
            time,
            image,
            origin: FrameOrigin::PassThrough { track },
        })
    }

    fn process(&self, id: RequestId, request: &CompositionRequest) -> Result<Outcome> {
        let set = &request.instructions;
        let time = request.query_time;
        check_kind(self.renderer.kind(), set.kind())?;

        if let Some(track) = set.passthrough_track() {
            let image = self.fetch_required(track, time)?;
            return Ok(self.pass_through(id, time, track, image));
        }

        let (inputs, params): (Vec<SharedImage>, RenderParams) = match set.kind() {
            TimelineKind::Transition => {
                match set
                    .resolve_frame(time)
                    .map_err(CompositorError::MissingInstruction)?
                {
                    Resolution::PassThrough { track } => {
                        let image = self.fetch_required(track, time)?;
                        return Ok(self.pass_through(id, time, track, image));
                    }
                    Resolution::Transition {
                        previous,
                        target,
                        factor,
                    } => {
                        let target_frame = self.fetch_required(target.track, time)?;
                        let Some(previous_frame) = self.fetch(previous.track, time) else {
                            warn!(
                                request = %id,
                                %time,
                                track = %previous.track,
                                "previous layer frame unavailable, passing target through"
                            );
                            return Ok(self.pass_through(id, time, target.track, target_frame));
                        };
                        (
                            vec![previous_frame, target_frame],
                            RenderParams::transition(factor),
                        )
                    }
                }
            }
            TimelineKind::Grid => {
                let layers = set
                    .active_layers(time)
                    .map_err(CompositorError::MissingInstruction)?;
                let mut inputs = Vec::with_capacity(layers.len());
                let mut slots = Vec::with_capacity(layers.len());
                for layer in layers {
                    match self.fetch(layer.track, time) {
                        Some(frame) => {
                            inputs.push(frame);
                            slots.push(layer.slot);
                        }
                        None => warn!(
                            request = %id,
                            %time,
                            track = %layer.track,
                            slot = layer.slot,
                            "grid tile source unavailable, leaving tile empty"
                        ),
                    }
                }
                (inputs, RenderParams::grid(slots))
            }
            TimelineKind::Watermark => {
                let layers = set
                    .active_layers(time)
                    .map_err(CompositorError::MissingInstruction)?;
                let base = layers
                    .first()
                    .ok_or(CompositorError::MissingInstruction(TimelineError::NoActiveLayer {
                        time,
                    }))?;
                let base_frame = self.fetch_required(base.track, time)?;
                let overlay = set.overlay_track().and_then(|track| self.fetch(track, time));
                let Some(overlay_frame) = overlay else {
                    warn!(
                        request = %id,
                        %time,
                        overlay = ?set.overlay_track(),
                        "watermark overlay unavailable, passing base through"
                    );
                    return Ok(self.pass_through(id, time, base.track, base_frame));
                };
                (vec![base_frame, overlay_frame], RenderParams::default())
            }
        };

        let context = self.context.read().clone();
        let output = context
            .new_buffer()
            .map_err(CompositorError::OutputBufferAllocationFailed)?;

        let mut commands = CommandBuffer::new(format!("compose {id}"), output);
        self.renderer
            .encode(&mut commands, &inputs, &params)
            .map_err(CompositorError::Render)?;
        drop(inputs);

        let in_flight = self.in_flight.clone();
        let closed = self.closed.clone();
        let renderer = self.renderer.name();
        commands.set_completed_handler(move |result| {
            let outcome = match result {
                _ if closed.load(Ordering::Acquire) => Err(CompositorError::Cancelled),
                Ok(image) => Ok(ComposedFrame {
                    request: id,
                    time,
                    image: Arc::new(image),
                    origin: FrameOrigin::Rendered { renderer },
                }),
                Err(GpuError::Cancelled) => Err(CompositorError::Cancelled),
                Err(other) => Err(CompositorError::Gpu(other)),
            };
            in_flight.finish(id, outcome);
        });

        debug!(request = %id, %time, factor = params.blend_factor, tiles = params.slots.len(), "frame submitted");
        if let Err(err) = context.commit(commands) {
            // The command buffer's handler has already reported the request.
            debug!(request = %id, error = %err, "commit rejected");
        }
        Ok(Outcome::Submitted)
    }
}
