//! VComp Compositor - one composed frame per request
//!
//! A [`Compositor`] resolves each request's instruction set at the query
//! time, fetches source frames from a [`FrameSource`], and either hands a
//! source frame back untouched or renders a new one on the GPU queue.
//! Requests are processed on a dedicated lane thread; the result arrives
//! through a handler or a [`FrameTicket`] exactly once.

pub mod completion;
pub mod composition;
pub mod compositor;
pub mod error;
pub mod request;
pub mod source;

pub use completion::{PendingCompletion, RequestId};
pub use composition::{CompositionDescriptor, VideoComposition};
pub use compositor::{Compositor, CompositorConfig};
pub use error::{CompositorError, Result};
pub use request::{ComposedFrame, CompositionRequest, FrameOrigin, FrameResult, FrameTicket};
pub use source::{FrameSource, StaticFrameSource};
