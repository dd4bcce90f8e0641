//! Stateful per-connection frame classifier and decoder.
//!
//! The protocol's framing is ambiguous on purpose: the very first frame of
//! every connection is JSON text (the `serverInfo` handshake) no matter
//! what, while later frames are either binary opcode records or JSON
//! control messages. The decoder keeps the one bit of state needed to
//! honor that contract.

use bytes::Bytes;

use super::messages::ServerMessage;
use super::wire;
use crate::error::{Result, VizwireError};

/// Decodes complete frame payloads into [`ServerMessage`]s.
///
/// One decoder per connection; discarded together with the reassembler on
/// close, so a reopened connection starts back at the handshake.
#[derive(Debug, Default)]
pub struct ServerMessageDecoder {
    got_first_message: bool,
}

impl ServerMessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the handshake frame has been consumed.
    pub fn handshake_complete(&self) -> bool {
        self.got_first_message
    }

    /// Decode one frame payload.
    ///
    /// The first frame is always parsed as JSON; this takes precedence
    /// over opcode sniffing even when the bytes would decode as a valid
    /// binary record. Subsequent frames are classified by their leading
    /// byte: a known opcode selects the binary decoder, `{` selects the
    /// JSON control-plane decoder.
    ///
    /// # Errors
    ///
    /// [`VizwireError::MalformedHandshake`] (fatal) when the first frame
    /// is not valid JSON; [`VizwireError::UnrecognizedOpcode`] or
    /// [`VizwireError::Protocol`] (both non-fatal) for bad frames after
    /// the handshake.
    pub fn decode(&mut self, frame: Bytes) -> Result<ServerMessage> {
        if !self.got_first_message {
            let message: ServerMessage = serde_json::from_slice(&frame)
                .map_err(|e| VizwireError::MalformedHandshake(e.to_string()))?;
            self.got_first_message = true;
            return Ok(message);
        }

        match frame.first() {
            None => Err(VizwireError::Protocol("empty frame".to_string())),
            Some(b'{') => serde_json::from_slice(&frame)
                .map_err(|e| VizwireError::Protocol(format!("invalid control message: {}", e))),
            Some(_) => wire::parse_binary_message(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{MessageData, Time};

    fn handshake_frame() -> Bytes {
        Bytes::from_static(br#"{"op": "serverInfo", "name": "test server", "capabilities": []}"#)
    }

    #[test]
    fn test_first_frame_parsed_as_json() {
        let mut decoder = ServerMessageDecoder::new();

        let message = decoder.decode(handshake_frame()).unwrap();
        match message {
            ServerMessage::ServerInfo(info) => assert_eq!(info.name, "test server"),
            other => panic!("expected ServerInfo, got {:?}", other),
        }
        assert!(decoder.handshake_complete());
    }

    #[test]
    fn test_handshake_takes_precedence_over_opcode_sniffing() {
        let mut decoder = ServerMessageDecoder::new();

        // A perfectly valid binary TIME record; as the first frame it must
        // still be treated as (malformed) JSON.
        let mut time_record = vec![wire::server_opcode::TIME];
        time_record.extend_from_slice(&99u64.to_le_bytes());

        let result = decoder.decode(Bytes::from(time_record));
        assert!(matches!(result, Err(VizwireError::MalformedHandshake(_))));
    }

    #[test]
    fn test_malformed_handshake_is_fatal() {
        let mut decoder = ServerMessageDecoder::new();
        let err = decoder.decode(Bytes::from_static(b"not json")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_binary_frames_after_handshake() {
        let mut decoder = ServerMessageDecoder::new();
        decoder.decode(handshake_frame()).unwrap();

        let mut record = vec![wire::server_opcode::MESSAGE_DATA];
        record.extend_from_slice(&7u32.to_le_bytes());
        record.extend_from_slice(&123_456_789u64.to_le_bytes());
        record.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let message = decoder.decode(Bytes::from(record)).unwrap();
        assert_eq!(
            message,
            ServerMessage::MessageData(MessageData {
                subscription_id: 7,
                timestamp: 123_456_789,
                data: Bytes::from_static(&[0xAA, 0xBB, 0xCC]),
            })
        );

        let mut record = vec![wire::server_opcode::TIME];
        record.extend_from_slice(&42u64.to_le_bytes());
        let message = decoder.decode(Bytes::from(record)).unwrap();
        assert_eq!(message, ServerMessage::Time(Time { timestamp: 42 }));
    }

    #[test]
    fn test_json_control_frames_after_handshake() {
        let mut decoder = ServerMessageDecoder::new();
        decoder.decode(handshake_frame()).unwrap();

        let frame = Bytes::from_static(br#"{"op": "unadvertise", "channelIds": [2]}"#);
        let message = decoder.decode(frame).unwrap();
        assert_eq!(
            message,
            ServerMessage::Unadvertise {
                channel_ids: vec![2]
            }
        );
    }

    #[test]
    fn test_unrecognized_opcode_does_not_poison_decoder() {
        let mut decoder = ServerMessageDecoder::new();
        decoder.decode(handshake_frame()).unwrap();

        let err = decoder.decode(Bytes::from_static(&[0x6A, 0, 0])).unwrap_err();
        assert!(matches!(err, VizwireError::UnrecognizedOpcode(0x6A)));
        assert!(!err.is_fatal());

        // The next frame decodes normally.
        let mut record = vec![wire::server_opcode::TIME];
        record.extend_from_slice(&5u64.to_le_bytes());
        assert!(decoder.decode(Bytes::from(record)).is_ok());
    }

    #[test]
    fn test_empty_frame_after_handshake_is_non_fatal() {
        let mut decoder = ServerMessageDecoder::new();
        decoder.decode(handshake_frame()).unwrap();

        let err = decoder.decode(Bytes::new()).unwrap_err();
        assert!(matches!(err, VizwireError::Protocol(_)));
        assert!(!err.is_fatal());
    }
}
