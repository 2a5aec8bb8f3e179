//! Single-fire completion slots and the registry of requests in flight.

use crate::error::CompositorError;
use crate::request::FrameResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifies one submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

pub(crate) type FrameHandler = Box<dyn FnOnce(FrameResult) + Send>;

/// The caller's handler for one request, fired at most once.
///
/// Dropping an unfired completion delivers [`CompositorError::Cancelled`].
pub struct PendingCompletion {
    id: RequestId,
    handler: Mutex<Option<FrameHandler>>,
}

impl PendingCompletion {
    pub(crate) fn new(id: RequestId, handler: FrameHandler) -> Self {
        Self {
            id,
            handler: Mutex::new(Some(handler)),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Deliver `result`. Returns `false` if the completion already fired.
    pub fn finish(&self, result: FrameResult) -> bool {
        // Take the handler out first so it never runs under the lock.
        let handler = self.handler.lock().take();
        match handler {
            Some(handler) => {
                handler(result);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&self) -> bool {
        self.finish(Err(CompositorError::Cancelled))
    }

    pub fn is_finished(&self) -> bool {
        self.handler.lock().is_none()
    }
}

impl fmt::Debug for PendingCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCompletion")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl Drop for PendingCompletion {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.get_mut().take() {
            handler(Err(CompositorError::Cancelled));
        }
    }
}

/// Requests submitted but not yet completed.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pending: Mutex<HashMap<RequestId, Arc<PendingCompletion>>>,
}

impl InFlight {
    pub(crate) fn register(&self, id: RequestId, handler: FrameHandler) {
        let completion = Arc::new(PendingCompletion::new(id, handler));
        self.pending.lock().insert(id, completion);
    }

    /// Fire and forget `id`'s completion. Unknown ids are ignored.
    pub(crate) fn finish(&self, id: RequestId, result: FrameResult) -> bool {
        let completion = self.pending.lock().remove(&id);
        match completion {
            Some(completion) => completion.finish(result),
            None => false,
        }
    }

    pub(crate) fn cancel(&self, id: RequestId) -> bool {
        self.finish(id, Err(CompositorError::Cancelled))
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}
