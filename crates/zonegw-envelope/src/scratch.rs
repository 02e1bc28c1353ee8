use bytes::BytesMut;

use crate::envelope::PcieEnvelope;
use crate::error::{EnvelopeError, Result};
use crate::wire::{encode_envelope, PCIE_ENVELOPE_SIZE};

/// Default scratch capacity used by gateways.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 1024;

/// Fixed-capacity serialization buffer.
///
/// Unlike a bare byte array, writes that would exceed the capacity fail with
/// [`EnvelopeError::SerializationOverflow`] and leave the buffer empty.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ScratchBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Serialize `envelope`, replacing any previous contents.
    pub fn encode_envelope(&mut self, envelope: &PcieEnvelope) -> Result<&[u8]> {
        self.write_with(PCIE_ENVELOPE_SIZE, |buf| encode_envelope(envelope, buf))
    }

    /// Run `encode` against the cleared buffer after checking that `needed`
    /// bytes fit. The result is re-checked so an encoder that writes more
    /// than it announced still fails.
    pub fn write_with<F>(&mut self, needed: usize, encode: F) -> Result<&[u8]>
    where
        F: FnOnce(&mut BytesMut) -> Result<()>,
    {
        self.buf.clear();
        if needed > self.capacity {
            return Err(self.overflow(needed));
        }
        if let Err(err) = encode(&mut self.buf) {
            self.buf.clear();
            return Err(err);
        }
        if self.buf.len() > self.capacity {
            let written = self.buf.len();
            self.buf.clear();
            return Err(self.overflow(written));
        }
        Ok(&self.buf[..])
    }

    fn overflow(&self, needed: usize) -> EnvelopeError {
        EnvelopeError::SerializationOverflow {
            needed,
            capacity: self.capacity,
        }
    }

    /// Bytes currently held.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SCRATCH_CAPACITY)
    }
}
