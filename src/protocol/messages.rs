//! Typed protocol messages.
//!
//! Server messages form a tagged union discriminated by an opcode: the
//! control plane travels as JSON text with an `op` string field, the data
//! plane as binary records with a leading opcode byte (see
//! [`super::wire`]). Client messages mirror that split.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Id of a server-advertised channel.
pub type ChannelId = u32;
/// Id of an active client subscription, assigned client-side.
pub type SubscriptionId = u32;
/// Id of a client-advertised channel, assigned client-side.
pub type ClientChannelId = u32;
/// Id of a server-advertised service.
pub type ServiceId = u32;
/// Id correlating a service call request with its response.
pub type CallId = u32;

/// A named, schema-tagged data stream advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub topic: String,
    pub encoding: String,
    pub schema_name: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_encoding: Option<String>,
}

/// A channel advertised by this client for publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientChannel {
    pub id: ClientChannelId,
    pub topic: String,
    pub encoding: String,
    pub schema_name: String,
}

/// One entry of a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSubscription {
    pub id: SubscriptionId,
    pub channel_id: ChannelId,
}

/// Handshake message; always the first frame on a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_encodings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Severity of a server status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

impl TryFrom<u8> for StatusLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(StatusLevel::Info),
            1 => Ok(StatusLevel::Warning),
            2 => Ok(StatusLevel::Error),
            other => Err(format!("invalid status level: {}", other)),
        }
    }
}

impl From<StatusLevel> for u8 {
    fn from(level: StatusLevel) -> u8 {
        match level {
            StatusLevel::Info => 0,
            StatusLevel::Warning => 1,
            StatusLevel::Error => 2,
        }
    }
}

/// Free-form status report from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub message: String,
}

/// A named parameter with a JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub value: serde_json::Value,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<String>,
}

/// Current values for a set of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValues {
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A callable service advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub request_schema: String,
    #[serde(default)]
    pub response_schema: String,
}

/// Outbound service call; encoded as a binary record, never as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCallRequest {
    pub service_id: ServiceId,
    pub call_id: CallId,
    pub encoding: String,
    pub data: Bytes,
}

/// Server response to a service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCallResponse {
    pub service_id: ServiceId,
    pub call_id: CallId,
    pub encoding: String,
    #[serde(default)]
    pub data: Vec<u8>,
}

/// One topic or service entry in a connection graph update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicGraphEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publisher_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscriber_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_ids: Vec<String>,
}

/// Incremental update of the server-side pub/sub graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionGraphUpdate {
    #[serde(default)]
    pub published_topics: Vec<TopicGraphEntry>,
    #[serde(default)]
    pub subscribed_topics: Vec<TopicGraphEntry>,
    #[serde(default)]
    pub advertised_services: Vec<TopicGraphEntry>,
    #[serde(default)]
    pub removed_topics: Vec<String>,
    #[serde(default)]
    pub removed_services: Vec<String>,
}

/// Message data for one subscription.
///
/// `data` is a zero-copy view into the frame buffer it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageData {
    pub subscription_id: SubscriptionId,
    pub timestamp: u64,
    pub data: Bytes,
}

/// Server timestamp broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub timestamp: u64,
}

/// Every message the server can send, JSON and binary variants combined.
///
/// JSON variants deserialize from control-plane frames via the `op` tag.
/// The binary variants are constructed by [`super::wire`] and never appear
/// in JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ServerMessage {
    ServerInfo(ServerInfo),
    Status(StatusMessage),
    #[serde(rename_all = "camelCase")]
    Advertise { channels: Vec<Channel> },
    #[serde(rename_all = "camelCase")]
    Unadvertise { channel_ids: Vec<ChannelId> },
    ParameterValues(ParameterValues),
    #[serde(rename_all = "camelCase")]
    AdvertiseServices { services: Vec<Service> },
    #[serde(rename_all = "camelCase")]
    UnadvertiseServices { service_ids: Vec<ServiceId> },
    ConnectionGraphUpdate(ConnectionGraphUpdate),
    ServiceCallResponse(ServiceCallResponse),
    #[serde(skip)]
    MessageData(MessageData),
    #[serde(skip)]
    Time(Time),
}

/// Every JSON-framed request this client can send, tagged by `op`.
///
/// The two binary-framed requests (`MESSAGE_DATA`, `SERVICE_CALL_REQUEST`)
/// are encoded by [`super::wire`] instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClientMessage {
    Subscribe {
        subscriptions: Vec<ClientSubscription>,
    },
    #[serde(rename_all = "camelCase")]
    Unsubscribe {
        subscription_ids: Vec<SubscriptionId>,
    },
    Advertise {
        channels: Vec<ClientChannel>,
    },
    #[serde(rename_all = "camelCase")]
    Unadvertise {
        channel_ids: Vec<ClientChannelId>,
    },
    #[serde(rename_all = "camelCase")]
    GetParameters {
        parameter_names: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    SetParameters {
        parameters: Vec<Parameter>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubscribeParameterUpdates {
        parameter_names: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    UnsubscribeParameterUpdates {
        parameter_names: Vec<String>,
    },
    SubscribeConnectionGraph,
    UnsubscribeConnectionGraph,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_deserializes_from_handshake_json() {
        let json = r#"{
            "op": "serverInfo",
            "name": "visualization server",
            "capabilities": ["parameters", "services"],
            "sessionId": "abc123"
        }"#;

        let message: ServerMessage = serde_json::from_str(json).unwrap();
        match message {
            ServerMessage::ServerInfo(info) => {
                assert_eq!(info.name, "visualization server");
                assert_eq!(info.capabilities, vec!["parameters", "services"]);
                assert_eq!(info.session_id.as_deref(), Some("abc123"));
                assert!(info.supported_encodings.is_none());
            }
            other => panic!("expected ServerInfo, got {:?}", other),
        }
    }

    #[test]
    fn test_advertise_uses_camel_case_fields() {
        let json = r#"{
            "op": "advertise",
            "channels": [{
                "id": 3,
                "topic": "/camera/image",
                "encoding": "jpeg",
                "schemaName": "sensor.Image",
                "schema": ""
            }]
        }"#;

        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Advertise { channels } = message else {
            panic!("expected Advertise");
        };
        assert_eq!(channels[0].id, 3);
        assert_eq!(channels[0].schema_name, "sensor.Image");
    }

    #[test]
    fn test_unadvertise_channel_ids() {
        let json = r#"{"op": "unadvertise", "channelIds": [1, 4]}"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            message,
            ServerMessage::Unadvertise {
                channel_ids: vec![1, 4]
            }
        );
    }

    #[test]
    fn test_status_level_values() {
        let json = r#"{"op": "status", "level": 1, "message": "lagging"}"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Status(status) = message else {
            panic!("expected Status");
        };
        assert_eq!(status.level, StatusLevel::Warning);

        let bad = r#"{"op": "status", "level": 9, "message": "?"}"#;
        assert!(serde_json::from_str::<ServerMessage>(bad).is_err());
    }

    #[test]
    fn test_connection_graph_update_defaults() {
        let json = r#"{
            "op": "connectionGraphUpdate",
            "publishedTopics": [{"name": "/tf", "publisherIds": ["node_a"]}],
            "removedTopics": ["/old"]
        }"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::ConnectionGraphUpdate(update) = message else {
            panic!("expected ConnectionGraphUpdate");
        };
        assert_eq!(update.published_topics[0].name, "/tf");
        assert_eq!(update.removed_topics, vec!["/old"]);
        assert!(update.subscribed_topics.is_empty());
    }

    #[test]
    fn test_subscribe_serializes_with_op_tag() {
        let message = ClientMessage::Subscribe {
            subscriptions: vec![ClientSubscription { id: 0, channel_id: 42 }],
        };
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["op"], "subscribe");
        assert_eq!(json["subscriptions"][0]["id"], 0);
        assert_eq!(json["subscriptions"][0]["channelId"], 42);
    }

    #[test]
    fn test_unit_ops_serialize_as_bare_tag() {
        let json = serde_json::to_value(ClientMessage::SubscribeConnectionGraph).unwrap();
        assert_eq!(json, serde_json::json!({"op": "subscribeConnectionGraph"}));
    }

    #[test]
    fn test_get_parameters_omits_missing_id() {
        let message = ClientMessage::GetParameters {
            parameter_names: vec!["rate".to_string()],
            id: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["op"], "getParameters");
        assert_eq!(json["parameterNames"][0], "rate");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_parameter_type_field_rename() {
        let parameter = Parameter {
            name: "exposure".to_string(),
            value: serde_json::json!(2.5),
            parameter_type: Some("float64".to_string()),
        };
        let json = serde_json::to_value(&parameter).unwrap();
        assert_eq!(json["type"], "float64");
    }
}
