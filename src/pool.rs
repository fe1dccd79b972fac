//! Buffer pool for writer buffers.
//!
//! Provides reusable `BytesMut` buffers so repeated encodes do not pay for
//! a fresh allocation each time.
//!
//! # Design
//!
//! The pool is a bounded lock-free queue shared by every writer that holds
//! an `Arc` to it:
//! - `acquire` pops a cached buffer or allocates a new one
//! - `ensure_capacity` grows a buffer geometrically up to `max_buffer_size`
//! - `release` clears the buffer and pushes it back, dropping it when the
//!   pool is full or the buffer grew past `max_retained_capacity`
//!
//! A buffer is moved out of the pool on `acquire` and moved back on
//! `release`, so it is owned by exactly one writer in between.
//!
//! # Usage
//!
//! ```
//! use lbinary::pool::{BufferPool, PoolConfig};
//!
//! let pool = BufferPool::new(PoolConfig::default());
//! let mut buf = pool.acquire(64);
//! pool.ensure_capacity(&mut buf, 0, 4096).unwrap();
//! assert!(buf.capacity() >= 4096);
//! pool.release(buf);
//! assert_eq!(pool.pooled(), 1);
//! ```

use std::sync::{Arc, OnceLock};

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;
use serde::{Deserialize, Serialize};

use crate::error::{LBinaryError, Result};
use crate::protocol::MAX_BUFFER_SIZE;

/// Default number of buffers kept in the pool.
pub const DEFAULT_MAX_POOLED_BUFFERS: usize = 32;

/// Default largest capacity a released buffer may have and still be kept (1 MB).
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// Configuration for a [`BufferPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of idle buffers kept for reuse.
    pub max_pooled_buffers: usize,
    /// Released buffers with a larger capacity are dropped instead of pooled.
    pub max_retained_capacity: usize,
    /// Hard limit on the size of any single buffer.
    pub max_buffer_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pooled_buffers: DEFAULT_MAX_POOLED_BUFFERS,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl PoolConfig {
    /// Set the number of idle buffers kept for reuse.
    pub fn with_max_pooled_buffers(mut self, count: usize) -> Self {
        self.max_pooled_buffers = count;
        self
    }

    /// Set the largest capacity a released buffer may keep.
    pub fn with_max_retained_capacity(mut self, capacity: usize) -> Self {
        self.max_retained_capacity = capacity;
        self
    }

    /// Set the hard buffer size limit (clamped to `MAX_BUFFER_SIZE`).
    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size.min(MAX_BUFFER_SIZE);
        self
    }
}

/// A pool of reusable byte buffers.
///
/// Safe to share across threads; acquire and release may race freely.
pub struct BufferPool {
    /// Idle buffers.
    buffers: ArrayQueue<BytesMut>,
    /// Pool limits.
    config: PoolConfig,
}

static SHARED_POOL: OnceLock<Arc<BufferPool>> = OnceLock::new();

impl BufferPool {
    /// Create a new pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            buffers: ArrayQueue::new(config.max_pooled_buffers.max(1)),
            config,
        }
    }

    /// The process-wide pool used by writers that are not given one.
    pub fn shared() -> Arc<BufferPool> {
        SHARED_POOL
            .get_or_init(|| Arc::new(BufferPool::new(PoolConfig::default())))
            .clone()
    }

    /// Pool limits.
    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of idle buffers currently held.
    #[inline]
    pub fn pooled(&self) -> usize {
        self.buffers.len()
    }

    /// Acquire an empty buffer with at least `min_capacity` bytes of capacity.
    ///
    /// `min_capacity` is clamped to `max_buffer_size`.
    pub fn acquire(&self, min_capacity: usize) -> BytesMut {
        let min_capacity = min_capacity.min(self.config.max_buffer_size);
        match self.buffers.pop() {
            Some(mut buf) => {
                buf.clear();
                if buf.capacity() < min_capacity {
                    buf.reserve(min_capacity);
                }
                tracing::trace!(capacity = buf.capacity(), "Reused pooled buffer");
                buf
            }
            None => {
                tracing::trace!(capacity = min_capacity, "Allocated new buffer");
                BytesMut::with_capacity(min_capacity)
            }
        }
    }

    /// Make room for `additional` bytes after `offset`, preserving `buf[..offset]`.
    ///
    /// Capacity doubles until it fits, capped at `max_buffer_size`.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` if `offset + additional` exceeds `max_buffer_size`.
    /// The buffer is left untouched in that case.
    pub fn ensure_capacity(&self, buf: &mut BytesMut, offset: usize, additional: usize) -> Result<()> {
        let max = self.config.max_buffer_size;
        let required = offset
            .checked_add(additional)
            .filter(|&required| required <= max)
            .ok_or(LBinaryError::CapacityExceeded {
                required: offset.saturating_add(additional),
                max,
            })?;

        let capacity = buf.capacity();
        if required <= capacity {
            return Ok(());
        }

        let target = capacity.saturating_mul(2).max(required).min(max);
        buf.reserve(target - buf.len());
        tracing::debug!(from = capacity, to = buf.capacity(), "Grew writer buffer");
        Ok(())
    }

    /// Return a buffer to the pool.
    pub fn release(&self, mut buf: BytesMut) {
        if buf.capacity() > self.config.max_retained_capacity {
            tracing::warn!(
                capacity = buf.capacity(),
                limit = self.config.max_retained_capacity,
                "Dropping oversized buffer instead of pooling it"
            );
            return;
        }
        buf.clear();
        if self.buffers.push(buf).is_err() {
            tracing::trace!("Pool full, dropping released buffer");
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("pooled", &self.buffers.len())
            .field("config", &self.config)
            .finish()
    }
}
