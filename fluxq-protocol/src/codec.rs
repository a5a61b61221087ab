//! Streaming decoder with partial-read accumulation.

use crate::error::ProtocolError;
use crate::frame::Frame;
use bytes::BytesMut;

/// Accumulates raw socket bytes and yields complete frames.
///
/// Feed every chunk read from the wire with [`extend`](Decoder::extend),
/// then call [`decode_frame`](Decoder::decode_frame) until it returns
/// `Ok(None)`; unconsumed bytes stay buffered for the next chunk.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        Frame::decode(&mut self.buffer)
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
