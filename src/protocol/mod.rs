//! Wire protocol: framing, binary record layouts, typed messages.

mod decoder;
mod messages;
mod reassembler;
pub mod wire;

pub use decoder::ServerMessageDecoder;
pub use messages::{
    CallId, Channel, ChannelId, ClientChannel, ClientChannelId, ClientMessage, ClientSubscription,
    ConnectionGraphUpdate, MessageData, Parameter, ParameterValues, ServerInfo, ServerMessage,
    Service, ServiceCallRequest, ServiceCallResponse, ServiceId, StatusLevel, StatusMessage,
    SubscriptionId, Time, TopicGraphEntry,
};
pub use reassembler::{FrameReassembler, DEFAULT_MAX_FRAME_SIZE};
