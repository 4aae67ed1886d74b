//! # Socket Frames - Opcode Framing for the Control and Message Channels
//!
//! ## Purpose
//!
//! Every binary WebSocket frame exchanged with the gateway starts with a
//! one-byte [`Opcode`]. This module builds outbound frames and classifies
//! inbound ones into [`InboundFrame`] values for the channel dispatcher.
//!
//! ## Frame Layouts
//!
//! ```text
//! Message:     [0xD][u32 length][ioMessage bytes]
//! Receipt:     [0xE][u8 id len][u8 ts size][id bytes][ts bytes]
//! Acknowledge: [0xB]
//! Control:     [0xC]
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::bytes::{bytes_to_string, int_to_bytes, read_uint_be, string_to_bytes, uint_to_bytes};
use crate::error::{CodecError, CodecResult};
use crate::message::IoMessage;
use crate::protocol_constants::frame::{MESSAGE_PREFIX_SIZE, RECEIPT_PREFIX_SIZE};

/// One-byte frame tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Ping = 0x9,
    Pong = 0xA,
    Acknowledge = 0xB,
    ControlSignal = 0xC,
    Message = 0xD,
    Receipt = 0xE,
}

impl Opcode {
    /// Single-byte frame carrying only this opcode
    pub fn frame(self) -> Vec<u8> {
        vec![self.into()]
    }
}

/// Classified inbound binary frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Zero-length frame
    Empty,
    /// New configuration is waiting on the gateway
    ControlSignal,
    /// Pushed ioMessage
    Message(IoMessage),
    /// Well-formed message frame carrying another ioMessage version
    ForeignVersion(u16),
    /// Gateway receipt for a message this client published
    Receipt { id: String, timestamp: u64 },
    /// Known opcode with no inbound meaning (ack, pong, ...)
    Other(Opcode),
    /// Byte at offset 0 is not a protocol opcode
    Unknown(u8),
}

/// Acknowledge frame `[0xB]`
pub fn ack_frame() -> Vec<u8> {
    Opcode::Acknowledge.frame()
}

/// Pong payload `[0xA]` answering a protocol ping
pub fn pong_payload() -> Vec<u8> {
    Opcode::Pong.frame()
}

/// True for a ping payload that carries exactly the protocol ping opcode
pub fn is_protocol_ping(payload: &[u8]) -> bool {
    payload == [u8::from(Opcode::Ping)]
}

/// Wrap an encoded ioMessage into `[0xD][u32 length][bytes]`
pub fn encode_message_frame(msg: &IoMessage) -> CodecResult<Vec<u8>> {
    let body = msg.encode();
    let len = body_length(body.len())?;
    let mut frame = Vec::with_capacity(MESSAGE_PREFIX_SIZE + body.len());
    frame.push(Opcode::Message.into());
    frame.extend_from_slice(&int_to_bytes(len));
    frame.extend_from_slice(&body);
    Ok(frame)
}

fn body_length(len: usize) -> CodecResult<u32> {
    u32::try_from(len).map_err(|_| CodecError::FieldOverflow {
        field: "message frame length",
        value: len as u64,
        max_bits: 32,
    })
}

/// Build a receipt frame
///
/// The timestamp is written with the fewest bytes that hold it (0 when zero).
pub fn encode_receipt_frame(id: &str, timestamp: u64) -> CodecResult<Vec<u8>> {
    let id_bytes = string_to_bytes(id);
    let id_len = u8::try_from(id_bytes.len()).map_err(|_| CodecError::FieldOverflow {
        field: "receipt id",
        value: id_bytes.len() as u64,
        max_bits: 8,
    })?;
    let ts_size = (8 - timestamp.leading_zeros() as usize / 8).min(8);
    let ts_bytes = if timestamp == 0 {
        Vec::new()
    } else {
        uint_to_bytes(timestamp, ts_size)
    };

    let mut frame = Vec::with_capacity(RECEIPT_PREFIX_SIZE + id_bytes.len() + ts_bytes.len());
    frame.push(Opcode::Receipt.into());
    frame.push(id_len);
    frame.push(ts_bytes.len() as u8);
    frame.extend_from_slice(&id_bytes);
    frame.extend_from_slice(&ts_bytes);
    Ok(frame)
}

/// Extract the ioMessage carried by a message frame
///
/// A message of another protocol version decodes to the empty message.
pub fn decode_message_frame(data: &[u8]) -> CodecResult<IoMessage> {
    IoMessage::decode(message_body(data)?)
}

fn message_body(data: &[u8]) -> CodecResult<&[u8]> {
    if data.len() < MESSAGE_PREFIX_SIZE {
        return Err(CodecError::message_too_small(
            MESSAGE_PREFIX_SIZE,
            data.len(),
            "message frame prefix",
        ));
    }
    let len = read_uint_be(data, 1, 4)? as usize;
    let end = MESSAGE_PREFIX_SIZE
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| CodecError::truncated("message body", MESSAGE_PREFIX_SIZE, len, data.len()))?;
    Ok(&data[MESSAGE_PREFIX_SIZE..end])
}

/// Extract `(id, timestamp)` from a receipt frame
pub fn decode_receipt_frame(data: &[u8]) -> CodecResult<(String, u64)> {
    if data.len() < RECEIPT_PREFIX_SIZE {
        return Err(CodecError::message_too_small(
            RECEIPT_PREFIX_SIZE,
            data.len(),
            "receipt frame prefix",
        ));
    }
    let id_len = data[1] as usize;
    let ts_size = data[2] as usize;
    let mut pos = RECEIPT_PREFIX_SIZE;

    let mut id = String::new();
    if id_len > 0 {
        let end = pos + id_len;
        if end > data.len() {
            return Err(CodecError::truncated("receipt id", pos, id_len, data.len()));
        }
        id = bytes_to_string(&data[pos..end]);
        pos = end;
    }

    let mut timestamp = 0;
    if ts_size > 0 {
        timestamp = read_uint_be(data, pos, ts_size).map_err(|e| match e {
            CodecError::TruncatedField { .. } => {
                CodecError::truncated("receipt timestamp", pos, ts_size, data.len())
            }
            other => other,
        })?;
    }

    Ok((id, timestamp))
}

/// Classify an inbound binary frame by its opcode
pub fn decode_inbound(data: &[u8]) -> CodecResult<InboundFrame> {
    let Some(&first) = data.first() else {
        return Ok(InboundFrame::Empty);
    };
    let opcode = match Opcode::try_from(first) {
        Ok(op) => op,
        Err(_) => return Ok(InboundFrame::Unknown(first)),
    };

    match opcode {
        Opcode::ControlSignal => Ok(InboundFrame::ControlSignal),
        Opcode::Message => match IoMessage::try_decode(message_body(data)?) {
            Ok(message) => Ok(InboundFrame::Message(message)),
            Err(CodecError::UnsupportedVersion { version, .. }) => {
                Ok(InboundFrame::ForeignVersion(version))
            }
            Err(e) => Err(e),
        },
        Opcode::Receipt => {
            decode_receipt_frame(data).map(|(id, timestamp)| InboundFrame::Receipt { id, timestamp })
        }
        other => Ok(InboundFrame::Other(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_opcode_values() {
        assert_eq!(u8::from(Opcode::Ping), 0x9);
        assert_eq!(u8::from(Opcode::Receipt), 0xE);
        assert_eq!(Opcode::try_from(0xB).unwrap(), Opcode::Acknowledge);
        assert!(Opcode::try_from(0x1).is_err());
        assert_eq!(ack_frame(), vec![0xB]);
        assert!(is_protocol_ping(&[0x9]));
        assert!(!is_protocol_ping(&[0x9, 0x9]));
    }

    #[test]
    fn test_receipt_frame_layout() {
        let frame = decode_inbound(&hex!("0E 02 02 6964 0102")).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Receipt {
                id: "id".to_string(),
                timestamp: 0x0102
            }
        );
    }

    #[test]
    fn test_receipt_roundtrip_minimal_timestamp() {
        let frame = encode_receipt_frame("abc", 1_700_000_000_000).unwrap();
        assert_eq!(frame[1], 3);
        assert_eq!(frame[2], 6); // 1.7e12 fits in 6 bytes
        assert_eq!(
            decode_receipt_frame(&frame).unwrap(),
            ("abc".to_string(), 1_700_000_000_000)
        );

        let zero = encode_receipt_frame("", 0).unwrap();
        assert_eq!(zero, vec![0xE, 0, 0]);
        assert_eq!(decode_receipt_frame(&zero).unwrap(), (String::new(), 0));
    }

    #[test]
    fn test_message_frame_length_prefix() {
        let msg = IoMessage::builder().tag("t").build();
        let frame = encode_message_frame(&msg).unwrap();
        let body_len = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;

        assert_eq!(frame[0], 0xD);
        assert_eq!(body_len, frame.len() - MESSAGE_PREFIX_SIZE);
        assert_eq!(decode_inbound(&frame).unwrap(), InboundFrame::Message(msg));
    }

    #[test]
    fn test_message_frame_declaring_too_much() {
        let frame = hex!("0D 00 00 00 40 00 04");
        assert!(matches!(
            decode_inbound(&frame),
            Err(CodecError::TruncatedField { field: "message body", .. })
        ));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(decode_inbound(&[]).unwrap(), InboundFrame::Empty);
        assert_eq!(decode_inbound(&[0x42]).unwrap(), InboundFrame::Unknown(0x42));
        assert_eq!(
            decode_inbound(&[0xB]).unwrap(),
            InboundFrame::Other(Opcode::Acknowledge)
        );
    }

    #[test]
    fn test_default_message_is_delivered() {
        let frame = encode_message_frame(&IoMessage::default()).unwrap();
        assert_eq!(
            decode_inbound(&frame).unwrap(),
            InboundFrame::Message(IoMessage::default())
        );
    }

    #[test]
    fn test_foreign_version_is_reported() {
        let mut frame = encode_message_frame(&IoMessage::builder().tag("t").build()).unwrap();
        frame[5..7].copy_from_slice(&[0, 3]);
        assert_eq!(decode_inbound(&frame).unwrap(), InboundFrame::ForeignVersion(3));
        assert!(decode_message_frame(&frame).unwrap().is_empty());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_frame_length_overflow() {
        assert_eq!(body_length(u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(
            body_length(u32::MAX as usize + 1),
            Err(CodecError::FieldOverflow { max_bits: 32, .. })
        ));
    }
}
