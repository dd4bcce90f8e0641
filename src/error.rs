//! Error types for vizwire-client.

use thiserror::Error;

/// Main error type for all vizwire operations.
#[derive(Debug, Error)]
pub enum VizwireError {
    /// I/O error during socket/pipe operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (control plane).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A frame's declared payload length exceeds the configured maximum.
    ///
    /// Fatal to the connection: the reassembler cannot resynchronize once
    /// a length prefix is implausible.
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// A binary frame carried an opcode the decoder does not know.
    ///
    /// Non-fatal: the frame is dropped and the connection continues.
    #[error("unrecognized server opcode in binary message: 0x{0:02x}")]
    UnrecognizedOpcode(u8),

    /// The first frame on a connection was not a valid JSON handshake.
    ///
    /// Fatal: the peer is not speaking this protocol.
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    /// Protocol error (truncated fields, empty frame, etc.).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Connection closed while a send or open was in progress.
    #[error("connection closed")]
    ConnectionClosed,
}

impl VizwireError {
    /// Whether this error terminates the connection.
    ///
    /// Per-message decode failures leave the framing layer intact, so the
    /// connection keeps streaming. Framing and handshake failures do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            VizwireError::UnrecognizedOpcode(_) | VizwireError::Protocol(_)
        )
    }
}

/// Result type alias using VizwireError.
pub type Result<T> = std::result::Result<T, VizwireError>;
