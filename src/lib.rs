//! # vizwire-client
//!
//! Client for a length-prefixed binary/JSON hybrid streaming protocol used
//! by visualization frontends: servers advertise schema-tagged channels,
//! clients subscribe and receive timestamped message data, plus parameter,
//! service-call, and connection-graph operations.
//!
//! ## Architecture
//!
//! - **Frame Reassembler**: turns arbitrary transport chunks back into
//!   discrete length-prefixed payloads ([`protocol::FrameReassembler`]).
//! - **Protocol Decoder/Client**: classifies each payload (JSON handshake,
//!   JSON control message, or tagged binary record), decodes it into a
//!   typed [`protocol::ServerMessage`], and republishes it as a
//!   [`ClientEvent`]; outbound requests are framed and handed to the
//!   transport ([`Client`]).
//!
//! The transport boundary is pluggable: TCP sockets, child-process stdio
//! pipes, and in-process channels all satisfy [`transport::Transport`].
//!
//! ## Example
//!
//! ```ignore
//! use vizwire_client::{Client, ClientEvent, EventKind};
//! use vizwire_client::transport::TcpTransport;
//!
//! #[tokio::main]
//! async fn main() -> vizwire_client::Result<()> {
//!     let client = Client::new();
//!     client.on(EventKind::Advertise, |event| {
//!         if let ClientEvent::Advertise(channels) = event {
//!             println!("server advertised {} channels", channels.len());
//!         }
//!     });
//!     client.open(TcpTransport::connect("127.0.0.1:9999").await?)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

mod client;
mod writer;

pub use client::{Client, ClientConfig, ConnectionState, DEFAULT_READ_BUFFER_SIZE};
pub use error::{Result, VizwireError};
pub use events::{ClientEvent, EventKind, ListenerId};
pub use writer::{OutboundFrame, WriterHandle};
