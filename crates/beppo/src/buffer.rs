//! Buffer management utilities

use bytes::{Bytes, BytesMut};

/// A bounded buffer that accumulates data before it is shipped upstream
#[derive(Debug)]
pub(crate) struct WriteBuffer {
    buffer: BytesMut,
    capacity: usize,
}

impl WriteBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Remaining capacity before the buffer must be shipped
    pub fn remaining(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Copy as much of `data` as fits, returning the number of bytes taken
    pub fn write(&mut self, data: &[u8]) -> usize {
        let to_write = data.len().min(self.remaining());
        self.buffer.extend_from_slice(&data[..to_write]);
        to_write
    }

    /// Take the buffer contents, leaving it empty
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}
