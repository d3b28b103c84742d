//! Bounded byte ring buffer with UTF-8 boundary preservation.
//!
//! Each PTY session owns one of these for its output. Writes append; when
//! the capacity is exceeded, the oldest bytes are evicted and the read
//! front is advanced past any UTF-8 continuation bytes (`0x80..=0xBF`) so
//! `read()` always yields a slice that begins on a codepoint boundary.
//!
//! All operations are atomic with respect to each other: the I/O pump
//! writes while UI threads read, so the state lives behind a mutex.

use std::collections::VecDeque;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default capacity: 64 KiB per PTY session.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

struct Inner {
    buf: VecDeque<u8>,
    capacity: usize,
}

/// A fixed-capacity, thread-safe circular byte buffer.
pub struct RingBuffer {
    inner: Mutex<Inner>,
}

impl RingBuffer {
    /// Create a new `RingBuffer` with the given capacity in bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                capacity,
            }),
        }
    }

    /// Create a new `RingBuffer` with the [`DEFAULT_CAPACITY`] (64 KiB).
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append bytes, evicting the oldest bytes on overflow.
    ///
    /// After eviction the front is advanced past UTF-8 continuation bytes
    /// so the stored slice still begins on a codepoint boundary.
    pub fn write(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        let capacity = inner.capacity;

        if bytes.len() >= capacity {
            // The write alone fills the buffer: keep only its tail.
            inner.buf.clear();
            let tail = &bytes[bytes.len() - capacity..];
            inner.buf.extend(tail.iter().copied());
        } else {
            inner.buf.extend(bytes.iter().copied());
            while inner.buf.len() > capacity {
                inner.buf.pop_front();
            }
        }

        // Re-align the front to a codepoint boundary.
        while matches!(inner.buf.front(), Some(b) if (0x80..=0xBF).contains(b)) {
            inner.buf.pop_front();
        }
    }

    /// Return a copy of all stored bytes, in order. Does not consume.
    pub fn read(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        inner.buf.iter().copied().collect()
    }

    /// Remove all stored bytes.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.buf.clear();
    }

    /// Number of bytes currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
