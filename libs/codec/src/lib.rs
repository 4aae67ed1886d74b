//! # ioFog Codec - ioMessage Wire Formats
//!
//! ## Purpose
//!
//! This crate is the "rules" layer of the SDK. It owns every byte-level
//! format exchanged with the gateway:
//! - Fixed-width big-endian integer and text primitives ([`bytes`])
//! - The [`IoMessage`] record and its binary layout ([`message`])
//! - The JSON transport form used by the REST API ([`json`])
//! - Opcode framing for the control and message sockets ([`frame`])
//!
//! ## Architecture Role
//!
//! ```text
//! libs/codec → libs/sdk (channels, REST) → services/*
//!     ↑               ↓
//! Wire Rules     Transport
//! IoMessage      WebSocket / HTTP
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Network transport logic (belongs in libs/sdk)
//! - Configuration loading (belongs in libs/config)
//!
//! ## Error Policy
//!
//! Encoding never fails: a value that does not fit its length prefix is
//! omitted with a warning. Decoding returns [`CodecError`] for malformed
//! frames, and degrades a foreign protocol version to the empty message.

pub mod bytes;
pub mod error;
pub mod frame;
pub mod json;
pub mod message;
pub mod protocol_constants;

pub use error::{CodecError, CodecResult};
pub use frame::{
    ack_frame, decode_inbound, decode_message_frame, decode_receipt_frame, encode_message_frame,
    encode_receipt_frame, is_protocol_ping, pong_payload, InboundFrame, Opcode,
};
pub use json::{decode_base64, encode_base64, parse_messages, PayloadEncoding};
pub use message::{IoMessage, IoMessageBuilder};
pub use protocol_constants::{DATA_OFFSET, HEADER_SIZE, IO_MESSAGE_VERSION};
