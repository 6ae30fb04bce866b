//! Shared byte source between a producing writer and the player thread.
//!
//! Producers append with [`StreamBuffer::write`] (serialized by a single
//! mutex, safe from any thread). The player reads positionally with
//! [`StreamBuffer::read_at`]; when a read runs past buffered data the
//! registered input supplier is asked for more bytes. Reads never block
//! without making progress: if the supplier cannot deliver, the read
//! returns short and the caller treats it as insufficient data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::ring::ByteRing;

/// Input supplier invoked when a read extends past buffered data.
///
/// Receives the stream handle so it can append via [`StreamBuffer::write`];
/// returns the number of bytes it delivered (zero meaning "nothing more
/// right now", which ends the read short). Suppliers must only write; a
/// supplier that reads back from the same stream will deadlock.
pub type InputFn = Box<dyn FnMut(&StreamBuffer) -> usize + Send>;

/// Cloneable handle to the shared stream buffer.
#[derive(Clone)]
pub struct StreamBuffer {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    ring: Mutex<ByteRing>,
    supplier: Mutex<Option<InputFn>>,
    /// When set, ordinary reads advance the reclamation watermark
    /// (commit-on-read). Cleared during speculative probes.
    dequeue_enabled: AtomicBool,
    closed: AtomicBool,
}

impl StreamBuffer {
    /// Create a stream buffer with the given ring capacity (rounded up to a
    /// power of 2). Commit-on-read starts enabled.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                ring: Mutex::new(ByteRing::new(capacity)),
                supplier: Mutex::new(None),
                dequeue_enabled: AtomicBool::new(true),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register the input supplier consulted on read underflow.
    pub fn set_input(&self, supplier: InputFn) {
        *self.inner.supplier.lock() = Some(supplier);
    }

    /// Append producer bytes; returns the count accepted (short when the
    /// ring is full of unconsumed data).
    pub fn write(&self, data: &[u8]) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.inner.ring.lock().write(data)
    }

    /// Positional read at a logical stream offset.
    ///
    /// Pulls from the supplier as needed; returns short on underflow or
    /// when the offset has already been reclaimed.
    pub fn read_at(&self, offset: u64, out: &mut [u8]) -> usize {
        let mut filled = 0;

        loop {
            {
                let mut ring = self.inner.ring.lock();
                filled += ring.read_at(offset + filled as u64, &mut out[filled..]);
                if self.inner.dequeue_enabled.load(Ordering::Acquire) {
                    ring.mark_read(offset);
                }
            }

            if filled == out.len() || self.is_closed() {
                return filled;
            }

            let mut supplier = self.inner.supplier.lock();
            let Some(supply) = supplier.as_mut() else {
                return filled;
            };
            let delivered = supply(self);
            if delivered == 0 {
                trace!(offset, filled, wanted = out.len(), "input supplier dry, short read");
                return filled;
            }
        }
    }

    /// Durably advance the consumption point: bytes below `offset` may be
    /// discarded. Monotonic; committing backwards is a no-op.
    pub fn commit(&self, offset: u64) {
        self.inner.ring.lock().discard_to(offset);
    }

    /// Offset of the last commit (first retained byte).
    pub fn committed(&self) -> u64 {
        self.inner.ring.lock().base()
    }

    /// Bytes currently buffered.
    pub fn available_data(&self) -> usize {
        self.inner.ring.lock().available_data()
    }

    /// Bytes a producer can append before hitting unconsumed data.
    pub fn available_space(&self) -> usize {
        self.inner.ring.lock().free_space()
    }

    /// Toggle commit-on-read; returns the previous value.
    pub fn set_dequeue_enabled(&self, enabled: bool) -> bool {
        self.inner.dequeue_enabled.swap(enabled, Ordering::AcqRel)
    }

    /// Disable commit-on-read for the lifetime of the returned guard, which
    /// restores the prior value on every exit path.
    pub fn suppress_dequeue(&self) -> DequeueGuard {
        let previous = self.set_dequeue_enabled(false);
        DequeueGuard {
            stream: self.clone(),
            previous,
        }
    }

    /// Close the stream: writes are refused and pending reads return short,
    /// driving the consumer to end of stream.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// Scoped suppression of commit-on-read (see
/// [`StreamBuffer::suppress_dequeue`]).
pub struct DequeueGuard {
    stream: StreamBuffer,
    previous: bool,
}

impl Drop for DequeueGuard {
    fn drop(&mut self) {
        self.stream.set_dequeue_enabled(self.previous);
    }
}
