// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ops::{Deref, DerefMut};

use bytes::BytesMut;
use parking_lot::Mutex;

/// Buffers kept for reuse; anything beyond is dropped.
const MAX_POOLED: usize = 64;

/// Buffers larger than this are not returned to the pool.
const MAX_POOLED_CAPACITY: usize = 1024 * 1024;

/// Reusable buffers for collecting response bodies.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    buffers: Mutex<Vec<BytesMut>>,
}

impl BufferPool {
    /// Takes an empty buffer. It goes back to the pool when the guard drops.
    pub(crate) fn take(&self) -> PooledBuffer<'_> {
        let buffer = self.buffers.lock().pop().unwrap_or_default();
        PooledBuffer { pool: self, buffer }
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.buffers.lock().len()
    }

    fn give_back(&self, mut buffer: BytesMut) {
        if buffer.capacity() > MAX_POOLED_CAPACITY {
            return;
        }

        buffer.clear();
        let mut buffers = self.buffers.lock();
        if buffers.len() < MAX_POOLED {
            buffers.push(buffer);
        }
    }
}

/// A buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub(crate) struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: BytesMut,
}

impl Deref for PooledBuffer<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_reused_empty() {
        let pool = BufferPool::default();
        {
            let mut buffer = pool.take();
            buffer.extend_from_slice(b"response body");
        }
        assert_eq!(pool.idle(), 1);

        let buffer = pool.take();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= b"response body".len());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn returned_on_early_exit() {
        fn fails(pool: &BufferPool) -> Result<(), &'static str> {
            let mut buffer = pool.take();
            buffer.extend_from_slice(b"partial");
            Err("read failed")
        }

        let pool = BufferPool::default();
        assert!(fails(&pool).is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn oversized_buffers_dropped() {
        let pool = BufferPool::default();
        {
            let mut buffer = pool.take();
            buffer.resize(MAX_POOLED_CAPACITY + 1, 0);
        }
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn pool_is_bounded() {
        let pool = BufferPool::default();
        let loans: Vec<_> = (0..MAX_POOLED + 5).map(|_| pool.take()).collect();
        drop(loans);
        assert_eq!(pool.idle(), MAX_POOLED);
    }
}
