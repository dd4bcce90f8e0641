//! Binary wire encoding and decoding.
//!
//! Framing and payload internals use different byte orders, and that
//! asymmetry is a wire-compatibility contract:
//!
//! - The 4-byte frame length prefix is **big-endian**.
//! - Integers inside payloads (ids, timestamps, string lengths) are
//!   **little-endian**, fixed width.
//! - Strings are a u32 LE byte count followed by UTF-8 bytes.
//!
//! Binary record layouts:
//!
//! ```text
//! server MESSAGE_DATA:        [0x01][u32 LE sub id][u64 LE timestamp][payload…]
//! server TIME:                [0x02][u64 LE timestamp]
//! client MESSAGE_DATA:        [0x01][u32 LE channel id][payload…]
//! client SERVICE_CALL_REQUEST:[0x02][u32 LE service id][u32 LE call id]
//!                             [u32 LE encoding len][encoding UTF-8][payload…]
//! ```
//!
//! All other operations are JSON-text frames carrying an `op` string field;
//! see [`super::messages`].

use bytes::{BufMut, Bytes, BytesMut};

use super::messages::{ChannelId, MessageData, ServerMessage, ServiceCallRequest, Time};
use crate::error::{Result, VizwireError};

/// Size of the frame length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Binary opcodes for server-to-client records.
pub mod server_opcode {
    /// Subscription message data.
    pub const MESSAGE_DATA: u8 = 0x01;
    /// Server timestamp broadcast.
    pub const TIME: u8 = 0x02;
}

/// Binary opcodes for client-to-server records.
pub mod client_opcode {
    /// Client channel message data.
    pub const MESSAGE_DATA: u8 = 0x01;
    /// Service call request.
    pub const SERVICE_CALL_REQUEST: u8 = 0x02;
}

/// Write a big-endian u32 into the first 4 bytes of `buf`.
///
/// Used for the frame length prefix.
///
/// # Panics
///
/// Panics if `buf` is shorter than 4 bytes.
#[inline]
pub fn write_u32_be(buf: &mut [u8], value: u32) {
    buf[..LENGTH_PREFIX_SIZE].copy_from_slice(&value.to_be_bytes());
}

/// Read a big-endian u32 from the first 4 bytes of `buf`.
///
/// Returns `None` if `buf` is shorter than 4 bytes.
#[inline]
pub fn read_u32_be(buf: &[u8]) -> Option<u32> {
    let bytes = buf.get(..LENGTH_PREFIX_SIZE)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32> {
    let bytes = buf
        .get(offset..offset + 4)
        .ok_or_else(|| truncated("u32", offset))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
fn read_u64_le(buf: &[u8], offset: usize) -> Result<u64> {
    let bytes = buf
        .get(offset..offset + 8)
        .ok_or_else(|| truncated("u64", offset))?;
    Ok(u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

fn truncated(what: &str, offset: usize) -> VizwireError {
    VizwireError::Protocol(format!(
        "binary message truncated reading {} at offset {}",
        what, offset
    ))
}

/// Parse a binary server record (frame payload after the length prefix).
///
/// The payload view of a `MESSAGE_DATA` record is a zero-copy slice over
/// the frame buffer; no per-message allocation happens here.
///
/// # Errors
///
/// [`VizwireError::UnrecognizedOpcode`] for an unknown leading byte,
/// [`VizwireError::Protocol`] for an empty frame or truncated fields.
/// Both are non-fatal to the connection.
pub fn parse_binary_message(payload: Bytes) -> Result<ServerMessage> {
    let Some(&op) = payload.first() else {
        return Err(VizwireError::Protocol("empty binary message".to_string()));
    };

    match op {
        server_opcode::MESSAGE_DATA => {
            let subscription_id = read_u32_le(&payload, 1)?;
            let timestamp = read_u64_le(&payload, 5)?;
            let data = payload.slice(13..);
            Ok(ServerMessage::MessageData(MessageData {
                subscription_id,
                timestamp,
                data,
            }))
        }
        server_opcode::TIME => {
            let timestamp = read_u64_le(&payload, 1)?;
            Ok(ServerMessage::Time(Time { timestamp }))
        }
        op => Err(VizwireError::UnrecognizedOpcode(op)),
    }
}

/// Encode a client `MESSAGE_DATA` record.
pub fn encode_message_data(channel_id: ChannelId, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + 4 + data.len());
    buf.put_u8(client_opcode::MESSAGE_DATA);
    buf.put_u32_le(channel_id);
    buf.put_slice(data);
    buf.freeze()
}

/// Encode a client `SERVICE_CALL_REQUEST` record.
pub fn encode_service_call_request(request: &ServiceCallRequest) -> Bytes {
    let encoding = request.encoding.as_bytes();
    let mut buf = BytesMut::with_capacity(1 + 4 + 4 + 4 + encoding.len() + request.data.len());
    buf.put_u8(client_opcode::SERVICE_CALL_REQUEST);
    buf.put_u32_le(request.service_id);
    buf.put_u32_le(request.call_id);
    buf.put_u32_le(encoding.len() as u32);
    buf.put_slice(encoding);
    buf.put_slice(&request.data);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_helpers_roundtrip() {
        let mut buf = [0u8; 4];
        write_u32_be(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(read_u32_be(&buf), Some(0x0102_0304));
        assert_eq!(read_u32_be(&buf[..3]), None);
    }

    #[test]
    fn test_parse_message_data() {
        // Scenario from the protocol contract: sub id 7, ts 123456789,
        // 3-byte payload.
        let mut bytes = vec![server_opcode::MESSAGE_DATA];
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&123_456_789u64.to_le_bytes());
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let message = parse_binary_message(Bytes::from(bytes)).unwrap();
        match message {
            ServerMessage::MessageData(data) => {
                assert_eq!(data.subscription_id, 7);
                assert_eq!(data.timestamp, 123_456_789);
                assert_eq!(&data.data[..], [0xAA, 0xBB, 0xCC]);
            }
            other => panic!("expected MessageData, got {:?}", other),
        }
    }

    #[test]
    fn test_message_data_payload_is_zero_copy() {
        let mut bytes = vec![server_opcode::MESSAGE_DATA];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(b"payload");
        let frame = Bytes::from(bytes);

        let message = parse_binary_message(frame.clone()).unwrap();
        let ServerMessage::MessageData(data) = message else {
            panic!("expected MessageData");
        };

        // The data view points into the original frame buffer.
        assert_eq!(data.data.as_ptr(), frame[13..].as_ptr());
    }

    #[test]
    fn test_message_data_empty_payload() {
        let mut bytes = vec![server_opcode::MESSAGE_DATA];
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&4u64.to_le_bytes());

        let message = parse_binary_message(Bytes::from(bytes)).unwrap();
        let ServerMessage::MessageData(data) = message else {
            panic!("expected MessageData");
        };
        assert!(data.data.is_empty());
    }

    #[test]
    fn test_parse_time() {
        let mut bytes = vec![server_opcode::TIME];
        bytes.extend_from_slice(&0xDEAD_BEEFu64.to_le_bytes());

        let message = parse_binary_message(Bytes::from(bytes)).unwrap();
        match message {
            ServerMessage::Time(time) => assert_eq!(time.timestamp, 0xDEAD_BEEF),
            other => panic!("expected Time, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_opcode() {
        let result = parse_binary_message(Bytes::from_static(&[0x7F, 1, 2, 3]));
        match result {
            Err(VizwireError::UnrecognizedOpcode(0x7F)) => {}
            other => panic!("expected UnrecognizedOpcode, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_opcode_is_non_fatal() {
        let err = parse_binary_message(Bytes::from_static(&[0xFF])).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_empty_and_truncated_messages() {
        assert!(parse_binary_message(Bytes::new()).is_err());

        // MESSAGE_DATA with only 2 of 4 subscription id bytes
        let result = parse_binary_message(Bytes::from_static(&[0x01, 0x07, 0x00]));
        assert!(matches!(result, Err(VizwireError::Protocol(_))));

        // TIME with a short timestamp
        let result = parse_binary_message(Bytes::from_static(&[0x02, 1, 2, 3]));
        assert!(matches!(result, Err(VizwireError::Protocol(_))));
    }

    #[test]
    fn test_encode_message_data_layout() {
        let encoded = encode_message_data(42, &[0xAA, 0xBB]);

        assert_eq!(encoded[0], client_opcode::MESSAGE_DATA);
        assert_eq!(&encoded[1..5], &42u32.to_le_bytes());
        assert_eq!(&encoded[5..], [0xAA, 0xBB]);
    }

    #[test]
    fn test_encode_service_call_request_layout() {
        let request = ServiceCallRequest {
            service_id: 9,
            call_id: 17,
            encoding: "json".to_string(),
            data: Bytes::from_static(b"{}"),
        };
        let encoded = encode_service_call_request(&request);

        assert_eq!(encoded[0], client_opcode::SERVICE_CALL_REQUEST);
        assert_eq!(&encoded[1..5], &9u32.to_le_bytes());
        assert_eq!(&encoded[5..9], &17u32.to_le_bytes());
        assert_eq!(&encoded[9..13], &4u32.to_le_bytes());
        assert_eq!(&encoded[13..17], b"json");
        assert_eq!(&encoded[17..], b"{}");
    }

    #[test]
    fn test_shared_layout_roundtrip() {
        // The client MESSAGE_DATA layout shares its id field with the server
        // record; check the encoded id decodes back field-for-field.
        let encoded = encode_message_data(7, b"xyz");
        assert_eq!(encoded[0], 0x01);

        let id = u32::from_le_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]);
        assert_eq!(id, 7);
        assert_eq!(&encoded[5..], b"xyz");
    }
}
