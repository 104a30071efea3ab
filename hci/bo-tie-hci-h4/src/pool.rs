//! A heap backed buffer provider

use crate::buffer::{BufferKind, MessageBuffer};
use crate::driver::BufferProvider;
use alloc::vec::Vec;

/// A [`BufferProvider`] that allocates from the heap
///
/// Freed buffers are kept within a reserve and handed out again by later allocations. The number
/// of buffers that may be outstanding at once can be limited, once the limit is reached `alloc`
/// returns `None` until a buffer is freed.
#[derive(Debug)]
pub struct BufferPool {
    reserve: Vec<MessageBuffer>,
    reserve_size: usize,
    limit: Option<usize>,
    outstanding: usize,
}

impl BufferPool {
    /// Create a new `BufferPool`
    ///
    /// Up to `reserve_size` freed buffers are kept for reuse.
    pub fn new(reserve_size: usize) -> Self {
        BufferPool {
            reserve: Vec::with_capacity(reserve_size),
            reserve_size,
            limit: None,
            outstanding: 0,
        }
    }

    /// Limit the number of buffers that can be outstanding
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get the number of buffers allocated and not yet freed
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(8)
    }
}

impl BufferProvider for BufferPool {
    fn alloc(&mut self, kind: BufferKind, size: usize) -> Option<MessageBuffer> {
        if self.limit.map_or(false, |limit| self.outstanding >= limit) {
            log::trace!("(H4) buffer pool exhausted ({} outstanding)", self.outstanding);

            return None;
        }

        self.outstanding += 1;

        match self.reserve.pop() {
            Some(mut buffer) => {
                buffer.reset(kind, size);

                Some(buffer)
            }
            None => Some(MessageBuffer::with_capacity(kind, size)),
        }
    }

    fn free(&mut self, buffer: MessageBuffer) {
        self.outstanding = self.outstanding.saturating_sub(1);

        if self.reserve.len() < self.reserve_size {
            self.reserve.push(buffer);
        }
    }
}
