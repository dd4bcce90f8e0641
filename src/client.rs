//! Protocol client: connection lifecycle, decoding, and request methods.
//!
//! The client is purely reactive. A transport is attached with
//! [`Client::open`]; a read task then drives chunk → reassembler →
//! decoder → event dispatch, and a writer task drains outbound frames.
//! Reconnection is caller policy: after a close, call `open` again with a
//! fresh transport.
//!
//! # Example
//!
//! ```ignore
//! use vizwire_client::{Client, ClientConfig, EventKind, ClientEvent};
//! use vizwire_client::transport::TcpTransport;
//!
//! #[tokio::main]
//! async fn main() -> vizwire_client::Result<()> {
//!     let client = Client::new();
//!     client.on(EventKind::Message, |event| {
//!         if let ClientEvent::Message(data) = event {
//!             println!("sub {} got {} bytes", data.subscription_id, data.data.len());
//!         }
//!     });
//!
//!     let transport = TcpTransport::connect("127.0.0.1:9999").await?;
//!     client.open(transport)?;
//!     let sub_id = client.subscribe(42).await?;
//!     # let _ = sub_id;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use crate::error::{Result, VizwireError};
use crate::events::{ClientEvent, EventKind, EventListeners, ListenerId};
use crate::protocol::{
    wire, ChannelId, ClientChannel, ClientChannelId, ClientMessage, ClientSubscription,
    FrameReassembler, Parameter, ServerMessageDecoder, ServiceCallRequest, SubscriptionId,
    DEFAULT_MAX_FRAME_SIZE,
};
use crate::transport::Transport;
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle, DEFAULT_CHANNEL_CAPACITY};

/// Default transport read buffer size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum accepted frame payload size; a larger declared length is a
    /// fatal `FrameTooLarge`.
    pub max_frame_size: usize,
    /// Size of the buffer handed to each transport read.
    pub read_buffer_size: usize,
    /// Capacity of the outbound frame queue.
    pub channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport attached yet.
    Disconnected,
    /// Transport attached, tasks starting.
    Connecting,
    /// Open; the next frame must be the JSON handshake.
    AwaitingFirstMessage,
    /// Handshake consumed; frames go through the binary/JSON classifier.
    Streaming,
    /// Transport gone; `open` may be called again to reconnect.
    Closed,
}

/// State shared between the client handle and its connection tasks.
struct Shared {
    config: ClientConfig,
    listeners: Mutex<EventListeners>,
    state: Mutex<ConnectionState>,
    writer: Mutex<Option<WriterHandle>>,
    next_subscription_id: AtomicU32,
    next_advertisement_id: AtomicU32,
}

impl Shared {
    /// Dispatch an event to listeners registered for its kind.
    ///
    /// Callbacks run outside the registry lock, so they may call
    /// `on`/`off` freely.
    fn emit(&self, event: &ClientEvent) {
        let handlers = self
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .handlers_for(event.kind());
        for handler in handlers {
            handler(event);
        }
    }

    /// Transition to `Closed` if a connection was live.
    ///
    /// Returns whether this call performed the transition, so `Close` is
    /// emitted exactly once per connection.
    fn finish_close(&self) -> bool {
        let mut state = self.state.lock().expect("state poisoned");
        match *state {
            ConnectionState::Connecting
            | ConnectionState::AwaitingFirstMessage
            | ConnectionState::Streaming => {
                *state = ConnectionState::Closed;
                true
            }
            ConnectionState::Disconnected | ConnectionState::Closed => false,
        }
    }

    fn writer(&self) -> Result<WriterHandle> {
        self.writer
            .lock()
            .expect("writer handle poisoned")
            .clone()
            .ok_or(VizwireError::ConnectionClosed)
    }

    async fn send_json(&self, message: &ClientMessage) -> Result<()> {
        let json = serde_json::to_vec(message)?;
        self.writer()?
            .send(OutboundFrame::new(Bytes::from(json)))
            .await
    }

    async fn send_binary(&self, record: Bytes) -> Result<()> {
        self.writer()?.send(OutboundFrame::new(record)).await
    }
}

/// Streaming protocol client.
///
/// One client owns one connection at a time: an isolated reassembler,
/// decoder, and id counters. Independent connections want independent
/// clients; no state is shared between instances.
pub struct Client {
    shared: Arc<Shared>,
    read_task: Mutex<Option<JoinHandle<()>>>,
    writer_task: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Client {
    /// Create a client with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                listeners: Mutex::new(EventListeners::new()),
                state: Mutex::new(ConnectionState::Disconnected),
                writer: Mutex::new(None),
                next_subscription_id: AtomicU32::new(0),
                next_advertisement_id: AtomicU32::new(0),
            }),
            read_task: Mutex::new(None),
            writer_task: Mutex::new(None),
        }
    }

    /// Register an event listener.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.shared
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .on(kind, callback)
    }

    /// Remove an event listener.
    pub fn off(&self, id: ListenerId) -> bool {
        self.shared
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .off(id)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().expect("state poisoned")
    }

    /// Attach a connected transport and start streaming.
    ///
    /// Spawns the writer task and read loop and emits `Open` exactly once
    /// for this connection; a duplicate call while a connection is live is
    /// an error rather than a second `Open`. After a close, call again
    /// with a fresh transport to reconnect; partial frames and decoder
    /// state never carry over.
    pub fn open<T: Transport>(&self, transport: T) -> Result<()> {
        {
            let mut state = self.shared.state.lock().expect("state poisoned");
            match *state {
                ConnectionState::Disconnected | ConnectionState::Closed => {
                    *state = ConnectionState::Connecting;
                }
                _ => {
                    return Err(VizwireError::Protocol(
                        "connection already open".to_string(),
                    ));
                }
            }
        }

        let (reader, write_half) = transport.into_split();
        let (writer, writer_task) =
            spawn_writer_task(write_half, self.shared.config.channel_capacity);
        *self.shared.writer.lock().expect("writer handle poisoned") = Some(writer);

        *self.shared.state.lock().expect("state poisoned") = ConnectionState::AwaitingFirstMessage;
        tracing::debug!("transport attached, awaiting handshake");
        self.shared.emit(&ClientEvent::Open);

        let shared = self.shared.clone();
        let read_task = tokio::spawn(read_loop(reader, shared));

        *self.read_task.lock().expect("task handle poisoned") = Some(read_task);
        *self.writer_task.lock().expect("task handle poisoned") = Some(writer_task);
        Ok(())
    }

    /// Close the connection, discarding any in-flight partial frame.
    ///
    /// Emits `Close` if a connection was live. Idempotent.
    pub fn close(&self) {
        if let Some(task) = self.read_task.lock().expect("task handle poisoned").take() {
            task.abort();
        }
        if let Some(task) = self
            .writer_task
            .lock()
            .expect("task handle poisoned")
            .take()
        {
            task.abort();
        }
        self.shared.writer.lock().expect("writer handle poisoned").take();

        if self.shared.finish_close() {
            self.shared.emit(&ClientEvent::Close);
        }
    }

    /// Subscribe to a server channel.
    ///
    /// Allocates and returns a fresh subscription id; ids are monotonic
    /// for the lifetime of this client and never reused, even when the
    /// same channel is subscribed twice.
    pub async fn subscribe(&self, channel_id: ChannelId) -> Result<SubscriptionId> {
        let id = self
            .shared
            .next_subscription_id
            .fetch_add(1, Ordering::Relaxed);
        let message = ClientMessage::Subscribe {
            subscriptions: vec![ClientSubscription { id, channel_id }],
        };
        self.shared.send_json(&message).await?;
        Ok(id)
    }

    /// Cancel an active subscription.
    pub async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<()> {
        let message = ClientMessage::Unsubscribe {
            subscription_ids: vec![subscription_id],
        };
        self.shared.send_json(&message).await
    }

    /// Advertise a client channel for publishing.
    ///
    /// Allocates and returns a fresh client channel id (monotonic from 1,
    /// never reused).
    pub async fn advertise(
        &self,
        topic: &str,
        encoding: &str,
        schema_name: &str,
    ) -> Result<ClientChannelId> {
        let id = self
            .shared
            .next_advertisement_id
            .fetch_add(1, Ordering::Relaxed)
            + 1;
        let message = ClientMessage::Advertise {
            channels: vec![ClientChannel {
                id,
                topic: topic.to_string(),
                encoding: encoding.to_string(),
                schema_name: schema_name.to_string(),
            }],
        };
        self.shared.send_json(&message).await?;
        Ok(id)
    }

    /// Withdraw a previously advertised client channel.
    pub async fn unadvertise(&self, channel_id: ClientChannelId) -> Result<()> {
        let message = ClientMessage::Unadvertise {
            channel_ids: vec![channel_id],
        };
        self.shared.send_json(&message).await
    }

    /// Request current values for a set of parameters.
    pub async fn get_parameters(
        &self,
        parameter_names: Vec<String>,
        id: Option<String>,
    ) -> Result<()> {
        let message = ClientMessage::GetParameters {
            parameter_names,
            id,
        };
        self.shared.send_json(&message).await
    }

    /// Set parameter values on the server.
    pub async fn set_parameters(
        &self,
        parameters: Vec<Parameter>,
        id: Option<String>,
    ) -> Result<()> {
        let message = ClientMessage::SetParameters { parameters, id };
        self.shared.send_json(&message).await
    }

    /// Start receiving `parameterValues` updates for these parameters.
    pub async fn subscribe_parameter_updates(&self, parameter_names: Vec<String>) -> Result<()> {
        let message = ClientMessage::SubscribeParameterUpdates { parameter_names };
        self.shared.send_json(&message).await
    }

    /// Stop receiving parameter updates for these parameters.
    pub async fn unsubscribe_parameter_updates(&self, parameter_names: Vec<String>) -> Result<()> {
        let message = ClientMessage::UnsubscribeParameterUpdates { parameter_names };
        self.shared.send_json(&message).await
    }

    /// Start receiving `connectionGraphUpdate` events.
    pub async fn subscribe_connection_graph(&self) -> Result<()> {
        self.shared
            .send_json(&ClientMessage::SubscribeConnectionGraph)
            .await
    }

    /// Stop receiving connection graph updates.
    pub async fn unsubscribe_connection_graph(&self) -> Result<()> {
        self.shared
            .send_json(&ClientMessage::UnsubscribeConnectionGraph)
            .await
    }

    /// Publish a message on an advertised client channel (binary frame).
    pub async fn send_message(&self, channel_id: ClientChannelId, data: &[u8]) -> Result<()> {
        self.shared
            .send_binary(wire::encode_message_data(channel_id, data))
            .await
    }

    /// Call a server service (binary frame).
    ///
    /// The response arrives as a `ServiceCallResponse` event correlated by
    /// the request's `call_id`.
    pub async fn send_service_call_request(&self, request: &ServiceCallRequest) -> Result<()> {
        self.shared
            .send_binary(wire::encode_service_call_request(request))
            .await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection read loop: chunk → reassembler → decoder → events.
///
/// Errors surface exclusively through the `Error` event; there is no
/// throw path across the event boundary. Non-fatal decode errors leave
/// the framing state intact and the loop running.
async fn read_loop<R: AsyncRead + Unpin>(mut reader: R, shared: Arc<Shared>) {
    let mut reassembler = FrameReassembler::with_max_frame_size(shared.config.max_frame_size);
    let mut decoder = ServerMessageDecoder::new();
    let mut buf = vec![0u8; shared.config.read_buffer_size];

    'read: loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break 'read,
            Ok(n) => n,
            Err(e) => {
                tracing::error!("transport read failed: {}", e);
                shared.emit(&ClientEvent::Error(e.into()));
                break 'read;
            }
        };

        let frames = match reassembler.push(&buf[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                // FrameTooLarge: the stream position is unrecoverable.
                tracing::error!("frame reassembly failed: {}", e);
                shared.emit(&ClientEvent::Error(e));
                break 'read;
            }
        };

        for frame in frames {
            match decoder.decode(frame) {
                Ok(message) => {
                    let mut state = shared.state.lock().expect("state poisoned");
                    if *state == ConnectionState::AwaitingFirstMessage {
                        *state = ConnectionState::Streaming;
                        tracing::debug!("handshake received, streaming");
                    }
                    drop(state);
                    shared.emit(&message.into());
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!("decode failed: {}", e);
                    shared.emit(&ClientEvent::Error(e));
                    break 'read;
                }
                Err(e) => {
                    tracing::warn!("dropping frame: {}", e);
                    shared.emit(&ClientEvent::Error(e));
                }
            }
        }
    }

    shared.writer.lock().expect("writer handle poisoned").take();
    if shared.finish_close() {
        shared.emit(&ClientEvent::Close);
    }
}
