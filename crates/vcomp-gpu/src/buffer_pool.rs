//! Output buffer pool.
//!
//! Avoids allocating a fresh frame per request by keeping released buffers
//! keyed by (width, height, format). Buffers handed out by the pool find
//! their own way back when their last owner drops them.

use crate::error::{GpuError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{trace, warn};
use vcomp_core::{BufferRecycler, ImageBuffer, PixelFormat};

/// Key for pooled buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BufferKey {
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl BufferKey {
    fn of(buffer: &ImageBuffer) -> Self {
        Self {
            width: buffer.width(),
            height: buffer.height(),
            format: buffer.format(),
        }
    }
}

#[derive(Default)]
struct PoolState {
    /// Available (free) buffers, keyed by dimensions + format.
    free: HashMap<BufferKey, Vec<ImageBuffer>>,
    /// Total memory held by free buffers.
    free_memory: usize,
    /// Buffers currently handed out.
    live: usize,
}

/// Pool of reusable image buffers.
pub struct BufferPool {
    this: Weak<BufferPool>,
    state: Mutex<PoolState>,
    /// Maximum number of buffers handed out at once.
    capacity: usize,
    /// Memory budget for free buffers.
    max_free_memory: usize,
}

impl BufferPool {
    pub fn new(capacity: usize, max_free_memory: usize) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            state: Mutex::new(PoolState::default()),
            capacity,
            max_free_memory,
        })
    }

    /// Take a buffer from the pool or allocate a new one.
    ///
    /// Reused buffers keep their previous contents; callers clear them.
    pub fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> Result<ImageBuffer> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidCanvas {
                width,
                height,
                reason: "buffer dimensions must be non-zero".to_string(),
            });
        }

        let key = BufferKey {
            width,
            height,
            format,
        };

        let reused = {
            let mut state = self.state.lock();
            if state.live >= self.capacity {
                warn!(capacity = self.capacity, width, height, "buffer pool exhausted");
                return Err(GpuError::PoolExhausted {
                    capacity: self.capacity,
                });
            }
            state.live += 1;
            let reused = state.free.get_mut(&key).and_then(Vec::pop);
            if let Some(buffer) = &reused {
                state.free_memory -= buffer.memory_size();
            }
            reused
        };

        let mut buffer = match reused {
            Some(buffer) => buffer,
            None => {
                trace!(width, height, ?format, "allocating pooled buffer");
                ImageBuffer::new(width, height, format)
            }
        };
        let recycler: Weak<dyn BufferRecycler> = self.this.clone();
        buffer.attach_recycler(recycler);
        Ok(buffer)
    }

    /// Buffers currently handed out.
    pub fn live_count(&self) -> usize {
        self.state.lock().live
    }

    /// Number of buffers waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.state.lock().free.values().map(Vec::len).sum()
    }

    /// Total memory used by free buffers.
    pub fn memory_usage(&self) -> usize {
        self.state.lock().free_memory
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every free buffer.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.free.clear();
        state.free_memory = 0;
    }
}

impl BufferRecycler for BufferPool {
    fn recycle(&self, buffer: ImageBuffer) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);

        let mem = buffer.memory_size();
        // Over budget: let the storage go.
        if state.free_memory + mem > self.max_free_memory {
            return;
        }
        state.free_memory += mem;
        state.free.entry(BufferKey::of(&buffer)).or_default().push(buffer);
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity)
            .field("live", &state.live)
            .field("free_memory", &state.free_memory)
            .finish()
    }
}
