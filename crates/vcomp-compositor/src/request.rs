//! Requests in, composed frames out.

use crate::completion::RequestId;
use crate::error::{CompositorError, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use vcomp_core::{RationalTime, SharedImage, TrackId};
use vcomp_timeline::TimelineInstructionSet;

/// One output frame to produce.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub query_time: RationalTime,
    pub instructions: Arc<TimelineInstructionSet>,
}

impl CompositionRequest {
    pub fn new(query_time: RationalTime, instructions: Arc<TimelineInstructionSet>) -> Self {
        Self {
            query_time,
            instructions,
        }
    }
}

/// How a composed frame was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// The source frame of `track`, returned as-is.
    PassThrough { track: TrackId },
    /// A new buffer written by the named renderer.
    Rendered { renderer: &'static str },
}

/// A finished request.
#[derive(Debug, Clone)]
pub struct ComposedFrame {
    pub request: RequestId,
    pub time: RationalTime,
    pub image: SharedImage,
    pub origin: FrameOrigin,
}

impl ComposedFrame {
    pub fn is_pass_through(&self) -> bool {
        matches!(self.origin, FrameOrigin::PassThrough { .. })
    }
}

pub type FrameResult = Result<ComposedFrame>;

/// Receiving end of [`Compositor::submit`](crate::Compositor::submit).
///
/// Await it from async code or call [`FrameTicket::wait`] from a plain
/// thread.
#[derive(Debug)]
pub struct FrameTicket {
    id: RequestId,
    receiver: oneshot::Receiver<FrameResult>,
}

impl FrameTicket {
    pub(crate) fn new(id: RequestId, receiver: oneshot::Receiver<FrameResult>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Block the current thread until the frame is done.
    ///
    /// Panics when called from inside an async runtime; `.await` instead.
    pub fn wait(self) -> FrameResult {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(CompositorError::Cancelled))
    }
}

impl Future for FrameTicket {
    type Output = FrameResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CompositorError::Cancelled)))
    }
}
