//! Frame reassembler for accumulating partial reads.
//!
//! The wire is a stream of frames, each a 4-byte big-endian length prefix
//! followed by that many payload bytes. Transports deliver arbitrary chunks:
//! a chunk may hold a fraction of a frame, exactly one frame, or several
//! frames back to back. The reassembler turns that chunk stream back into
//! discrete payloads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management and a two-state
//! machine:
//! - `AwaitingLength`: need the 4 prefix bytes
//! - `AwaitingPayload`: prefix read, need N more payload bytes
//!
//! # Example
//!
//! ```
//! use vizwire_client::protocol::FrameReassembler;
//!
//! let mut reassembler = FrameReassembler::new();
//!
//! // 5-byte frame split across two chunks
//! let payloads = reassembler.push(&[0, 0, 0, 5, b'h', b'e', b'l']).unwrap();
//! assert!(payloads.is_empty());
//! let payloads = reassembler.push(&[b'l', b'o']).unwrap();
//! assert_eq!(&payloads[0][..], b"hello");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire::LENGTH_PREFIX_SIZE;
use crate::error::{Result, VizwireError};

/// Default maximum payload size (10 MB), sized for camera imagery frames.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 10_000_000;

/// Initial capacity of the accumulation buffer.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// State machine for frame extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a complete 4-byte length prefix.
    AwaitingLength,
    /// Prefix consumed, waiting for `expected` payload bytes.
    AwaitingPayload { expected: usize },
}

/// Accumulates incoming byte chunks and extracts complete frame payloads.
///
/// One reassembler per transport connection; it is owned exclusively by
/// that connection's read loop and never shared.
pub struct FrameReassembler {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Current extraction state.
    state: State,
    /// Maximum allowed payload size.
    max_frame_size: usize,
}

impl FrameReassembler {
    /// Create a reassembler with the default maximum frame size.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a reassembler with a custom maximum frame size.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            state: State::AwaitingLength,
            max_frame_size,
        }
    }

    /// Push a chunk and extract every complete payload it completes.
    ///
    /// Payloads are returned in arrival order, byte-for-byte identical to
    /// what the peer framed. Partial data is buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`VizwireError::FrameTooLarge`] when a prefix declares a
    /// payload larger than the configured maximum. That error is fatal:
    /// the stream position can no longer be trusted and the connection
    /// must be closed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(payload) = self.try_extract_one()? {
            payloads.push(payload);
        }

        Ok(payloads)
    }

    /// Try to extract a single payload from the buffer.
    ///
    /// Returns `Ok(None)` when more data is needed.
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::AwaitingLength => {
                if self.buffer.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }

                let expected = u32::from_be_bytes([
                    self.buffer[0],
                    self.buffer[1],
                    self.buffer[2],
                    self.buffer[3],
                ]) as usize;

                if expected > self.max_frame_size {
                    return Err(VizwireError::FrameTooLarge {
                        size: expected,
                        max: self.max_frame_size,
                    });
                }

                let _ = self.buffer.split_to(LENGTH_PREFIX_SIZE);

                if expected == 0 {
                    // Zero-length frame completes immediately.
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::AwaitingPayload { expected };
                self.try_extract_one()
            }

            State::AwaitingPayload { expected } => {
                if self.buffer.len() < expected {
                    return Ok(None);
                }

                let payload = self.buffer.split_to(expected).freeze();
                self.state = State::AwaitingLength;

                Ok(Some(payload))
            }
        }
    }

    /// Number of buffered (not yet emitted) bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether an in-flight frame or partial prefix is pending.
    pub fn has_partial_frame(&self) -> bool {
        !self.buffer.is_empty() || self.state != State::AwaitingLength
    }

    /// Discard any partial frame and reset to awaiting a length prefix.
    ///
    /// Called on connection close; partial frames never survive a reopen.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingLength;
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}
