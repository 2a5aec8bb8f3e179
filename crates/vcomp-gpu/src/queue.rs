//! Serial command queue.
//!
//! Committed command buffers execute in commit order on one dedicated
//! thread. The channel is bounded, so a producer that outruns the device
//! blocks in [`CommandQueue::commit`] instead of queueing without limit.

use crate::command::CommandBuffer;
use crate::context::Device;
use crate::error::{GpuError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

#[derive(Default)]
struct QueueStats {
    submitted: AtomicU64,
    finished: AtomicU64,
}

pub struct CommandQueue {
    label: String,
    sender: Mutex<Option<Sender<CommandBuffer>>>,
    closing: Arc<AtomicBool>,
    stats: Arc<QueueStats>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    /// Spawn the queue thread for `device`. At most `depth` committed
    /// buffers wait at once.
    pub(crate) fn new(label: impl Into<String>, depth: usize, device: Arc<Device>) -> Result<Self> {
        let label = label.into();
        let (sender, receiver) = bounded::<CommandBuffer>(depth.max(1));
        let closing = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(QueueStats::default());

        let worker = {
            let closing = closing.clone();
            let stats = stats.clone();
            thread::Builder::new()
                .name(format!("{label}-queue"))
                .spawn(move || run_queue(receiver, device, closing, stats))
                .map_err(|e| GpuError::Spawn(e.to_string()))?
        };

        debug!(label = %label, depth, "command queue started");
        Ok(Self {
            label,
            sender: Mutex::new(Some(sender)),
            closing,
            stats,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Schedule `buffer` for execution.
    ///
    /// On a closed queue the buffer's completion handler receives
    /// [`GpuError::Cancelled`] and this returns [`GpuError::QueueClosed`].
    pub fn commit(&self, buffer: CommandBuffer) -> Result<()> {
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            buffer.cancel();
            return Err(GpuError::QueueClosed);
        };
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if let Err(rejected) = sender.send(buffer) {
            self.stats.finished.fetch_add(1, Ordering::Relaxed);
            rejected.into_inner().cancel();
            return Err(GpuError::QueueClosed);
        }
        Ok(())
    }

    /// Buffers committed but not yet completed or cancelled.
    pub fn in_flight(&self) -> u64 {
        let submitted = self.stats.submitted.load(Ordering::Acquire);
        let finished = self.stats.finished.load(Ordering::Acquire);
        submitted.saturating_sub(finished)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Stop accepting work. The buffer currently executing finishes; buffers
    /// still waiting are cancelled.
    pub fn shutdown(&self) {
        self.closing.store(true, Ordering::Release);
        self.sender.lock().take();
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            // A completion handler dropped the last reference to the queue.
            return;
        }
        if worker.join().is_err() {
            warn!(label = %self.label, "command queue thread panicked");
        }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("label", &self.label)
            .field("in_flight", &self.in_flight())
            .field("closing", &self.is_closing())
            .finish()
    }
}

fn run_queue(
    receiver: Receiver<CommandBuffer>,
    device: Arc<Device>,
    closing: Arc<AtomicBool>,
    stats: Arc<QueueStats>,
) {
    for buffer in receiver.iter() {
        if closing.load(Ordering::Acquire) {
            debug!(label = buffer.label(), "cancelling queued command buffer");
            buffer.cancel();
        } else {
            let label = buffer.label().to_string();
            if panic::catch_unwind(AssertUnwindSafe(|| buffer.execute(&device))).is_err() {
                error!(label = %label, "command buffer panicked");
            }
        }
        stats.finished.fetch_add(1, Ordering::Release);
    }
}
