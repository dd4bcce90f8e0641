//! In-process duplex channel transport.
//!
//! Useful when the "server" lives in the same process (a simulator, a
//! replay source) and for exercising the full client stack in tests
//! without sockets.

use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

use super::Transport;

/// Default in-flight buffer between the two ends, in bytes.
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// One end of an in-process duplex byte channel.
pub struct ChannelTransport {
    stream: DuplexStream,
}

impl ChannelTransport {
    /// Create a connected pair with the default buffer size.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_buffer(DEFAULT_BUFFER_SIZE)
    }

    /// Create a connected pair with an explicit buffer size.
    pub fn pair_with_buffer(buffer_size: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(buffer_size);
        (Self { stream: a }, Self { stream: b })
    }
}

impl Transport for ChannelTransport {
    type Reader = ReadHalf<DuplexStream>;
    type Writer = WriteHalf<DuplexStream>;

    fn into_split(self) -> (Self::Reader, Self::Writer) {
        tokio::io::split(self.stream)
    }
}
