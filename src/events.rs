//! Closed event taxonomy and listener registry.
//!
//! Decoded server messages and connection lifecycle changes are published
//! as [`ClientEvent`] values. The taxonomy is a closed enum rather than
//! free-form string channels, so opcode handling stays exhaustive at
//! compile time: adding a server message variant forces an event mapping.

use crate::error::VizwireError;
use crate::protocol::{
    Channel, ChannelId, ConnectionGraphUpdate, MessageData, ParameterValues, ServerInfo,
    ServerMessage, Service, ServiceCallResponse, ServiceId, StatusMessage, Time,
};

/// Everything a client connection can report to its subscribers.
#[derive(Debug)]
pub enum ClientEvent {
    /// Transport signaled open; emitted exactly once per connection.
    Open,
    /// Transport closed (EOF, explicit close, or after a fatal error).
    Close,
    /// A transport or decode failure. Carries the underlying cause;
    /// whether the connection survives depends on the error, see
    /// [`VizwireError::is_fatal`].
    Error(VizwireError),
    ServerInfo(ServerInfo),
    Status(StatusMessage),
    Message(MessageData),
    Time(Time),
    Advertise(Vec<Channel>),
    Unadvertise(Vec<ChannelId>),
    AdvertiseServices(Vec<Service>),
    UnadvertiseServices(Vec<ServiceId>),
    ParameterValues(ParameterValues),
    ServiceCallResponse(ServiceCallResponse),
    ConnectionGraphUpdate(ConnectionGraphUpdate),
}

impl ClientEvent {
    /// The discriminant used for listener registration.
    pub fn kind(&self) -> EventKind {
        match self {
            ClientEvent::Open => EventKind::Open,
            ClientEvent::Close => EventKind::Close,
            ClientEvent::Error(_) => EventKind::Error,
            ClientEvent::ServerInfo(_) => EventKind::ServerInfo,
            ClientEvent::Status(_) => EventKind::Status,
            ClientEvent::Message(_) => EventKind::Message,
            ClientEvent::Time(_) => EventKind::Time,
            ClientEvent::Advertise(_) => EventKind::Advertise,
            ClientEvent::Unadvertise(_) => EventKind::Unadvertise,
            ClientEvent::AdvertiseServices(_) => EventKind::AdvertiseServices,
            ClientEvent::UnadvertiseServices(_) => EventKind::UnadvertiseServices,
            ClientEvent::ParameterValues(_) => EventKind::ParameterValues,
            ClientEvent::ServiceCallResponse(_) => EventKind::ServiceCallResponse,
            ClientEvent::ConnectionGraphUpdate(_) => EventKind::ConnectionGraphUpdate,
        }
    }
}

impl From<ServerMessage> for ClientEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::ServerInfo(info) => ClientEvent::ServerInfo(info),
            ServerMessage::Status(status) => ClientEvent::Status(status),
            ServerMessage::Advertise { channels } => ClientEvent::Advertise(channels),
            ServerMessage::Unadvertise { channel_ids } => ClientEvent::Unadvertise(channel_ids),
            ServerMessage::ParameterValues(values) => ClientEvent::ParameterValues(values),
            ServerMessage::AdvertiseServices { services } => {
                ClientEvent::AdvertiseServices(services)
            }
            ServerMessage::UnadvertiseServices { service_ids } => {
                ClientEvent::UnadvertiseServices(service_ids)
            }
            ServerMessage::ConnectionGraphUpdate(update) => {
                ClientEvent::ConnectionGraphUpdate(update)
            }
            ServerMessage::ServiceCallResponse(response) => {
                ClientEvent::ServiceCallResponse(response)
            }
            ServerMessage::MessageData(data) => ClientEvent::Message(data),
            ServerMessage::Time(time) => ClientEvent::Time(time),
        }
    }
}

/// Discriminant of [`ClientEvent`], used to register listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Error,
    ServerInfo,
    Status,
    Message,
    Time,
    Advertise,
    Unadvertise,
    AdvertiseServices,
    UnadvertiseServices,
    ParameterValues,
    ServiceCallResponse,
    ConnectionGraphUpdate,
}

/// Handle returned by [`EventListeners::on`]; pass to `off` to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Shared, invocable event callback.
pub type EventCallback = std::sync::Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Registry of per-kind event callbacks.
///
/// Dispatch happens synchronously on the connection's read task; listeners
/// should hand heavy work off rather than block the read loop.
#[derive(Default)]
pub struct EventListeners {
    next_id: u64,
    listeners: Vec<(ListenerId, EventKind, EventCallback)>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one event kind.
    pub fn on<F>(&mut self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, std::sync::Arc::new(callback)));
        id
    }

    /// Remove a previously registered callback.
    ///
    /// Returns `false` if the id was already removed.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Invoke every listener registered for this event's kind, in
    /// registration order.
    pub fn emit(&self, event: &ClientEvent) {
        let kind = event.kind();
        for (_, listener_kind, callback) in &self.listeners {
            if *listener_kind == kind {
                callback(event);
            }
        }
    }

    /// Clone the callbacks registered for one kind, in registration order.
    ///
    /// Lets the caller invoke listeners without holding a registry lock,
    /// so a callback may call back into `on`/`off`.
    pub fn handlers_for(&self, kind: EventKind) -> Vec<EventCallback> {
        self.listeners
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .map(|(_, _, callback)| callback.clone())
            .collect()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_reaches_matching_listeners_only() {
        let mut listeners = EventListeners::new();
        let opens = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));

        let opens_clone = opens.clone();
        listeners.on(EventKind::Open, move |_| {
            opens_clone.fetch_add(1, Ordering::SeqCst);
        });
        let closes_clone = closes.clone();
        listeners.on(EventKind::Close, move |_| {
            closes_clone.fetch_add(1, Ordering::SeqCst);
        });

        listeners.emit(&ClientEvent::Open);
        listeners.emit(&ClientEvent::Open);
        listeners.emit(&ClientEvent::Close);

        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_listener() {
        let mut listeners = EventListeners::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = count.clone();
        let id = listeners.on(EventKind::Time, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        listeners.emit(&ClientEvent::Time(crate::protocol::Time { timestamp: 1 }));
        assert!(listeners.off(id));
        assert!(!listeners.off(id));
        listeners.emit(&ClientEvent::Time(crate::protocol::Time { timestamp: 2 }));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_server_message_to_event_mapping() {
        let event: ClientEvent = ServerMessage::Unadvertise {
            channel_ids: vec![9],
        }
        .into();
        assert_eq!(event.kind(), EventKind::Unadvertise);

        let event: ClientEvent = ServerMessage::Time(crate::protocol::Time { timestamp: 0 }).into();
        assert_eq!(event.kind(), EventKind::Time);
    }
}
