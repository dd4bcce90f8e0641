//! Duplex transport abstraction.
//!
//! The client core is transport-agnostic: anything that can be split into
//! an async read half and an async write half carries the protocol. Each
//! transport kind is a thin adapter; framing and decoding live in the
//! client, not in the transport.
//!
//! Transports are constructed by the owning context and handed to
//! [`Client::open`](crate::Client::open); nothing here reads ambient
//! configuration.

mod channel;
mod pipe;
mod tcp;

use tokio::io::{AsyncRead, AsyncWrite};

pub use channel::ChannelTransport;
pub use pipe::{PipeReader, PipeTransport};
pub use tcp::TcpTransport;

/// A connected duplex byte stream.
///
/// Implementors are already open when handed to the client; connection
/// establishment (dialing, spawning, pairing) belongs to the adapter's
/// constructor.
pub trait Transport: Send + 'static {
    type Reader: AsyncRead + Unpin + Send + 'static;
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Split into independently owned read and write halves.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}
