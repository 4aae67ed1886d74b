//! # ioMessage - Binary Message Codec
//!
//! ## Purpose
//!
//! The [`IoMessage`] record exchanged between a micro-service and the gateway,
//! plus its length-prefixed binary layout used on the message socket.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌─────────────────────────── header (33 bytes) ───────────────────────────┐┌─ data ─┐
//! │ver│id│tag │grp│seq│tot│pri│ts│pub│authid│authgrp│chain│hash│prev│nonce│...│ctx│cnt ││ values │
//! │ 2 │1 │ 2  │ 1 │ 1 │ 1 │ 1 │1 │ 1 │  2   │   2   │  1  │ 2  │ 2  │  2  │   │ 4 │ 4  ││        │
//! └─────────────────────────────────────────────────────────────────────────┘└────────┘
//! ```
//!
//! Every header slot after the version is a size indicator. String slots hold
//! the string's wire length, numeric slots hold either 0 or the field's fixed
//! width, payload slots hold the byte length. The data region (offset 33)
//! carries the non-empty values in header order, so sparse messages stay
//! compact. See [`crate::protocol_constants::offsets`] for exact offsets.
//!
//! ## Version Handling
//!
//! [`IoMessage::decode`] treats a foreign version as "no message": it logs a
//! warning and yields [`IoMessage::default`]. [`IoMessage::try_decode`]
//! reports it as [`CodecError::UnsupportedVersion`] instead.

use tracing::warn;

use crate::bytes::{
    bytes_to_string, int_to_bytes, read_uint_be, short_to_bytes, string_to_bytes, uint_to_bytes,
    wire_len,
};
use crate::error::{CodecError, CodecResult};
use crate::protocol_constants::{offsets, widths, DATA_OFFSET, HEADER_SIZE, IO_MESSAGE_VERSION};

/// Structured record exchanged with the gateway
///
/// Absent fields hold their defaults: empty string, zero, empty payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoMessage {
    /// Assigned by the gateway on receipt; empty at creation
    pub id: String,
    pub tag: String,
    pub group_id: String,
    pub sequence_number: u32,
    pub sequence_total: u32,
    pub priority: u8,
    /// Always [`IO_MESSAGE_VERSION`] for messages built locally
    pub version: u16,
    /// Publish time; 0 until set by the gateway
    pub timestamp: u64,
    /// Identity of the originating service instance
    pub publisher: String,
    pub auth_id: String,
    pub auth_group: String,
    pub chain_position: u64,
    pub hash: String,
    pub previous_hash: String,
    pub nonce: String,
    pub difficulty_target: u32,
    pub info_type: String,
    pub info_format: String,
    pub context_data: Vec<u8>,
    pub content_data: Vec<u8>,
}

impl Default for IoMessage {
    fn default() -> Self {
        Self {
            id: String::new(),
            tag: String::new(),
            group_id: String::new(),
            sequence_number: 0,
            sequence_total: 0,
            priority: 0,
            version: IO_MESSAGE_VERSION,
            timestamp: 0,
            publisher: String::new(),
            auth_id: String::new(),
            auth_group: String::new(),
            chain_position: 0,
            hash: String::new(),
            previous_hash: String::new(),
            nonce: String::new(),
            difficulty_target: 0,
            info_type: String::new(),
            info_format: String::new(),
            context_data: Vec::new(),
            content_data: Vec::new(),
        }
    }
}

/// Width of a string field's length prefix
#[derive(Debug, Clone, Copy)]
enum Prefix {
    Byte,
    Short,
}

impl Prefix {
    fn max_len(self) -> usize {
        match self {
            Prefix::Byte => u8::MAX as usize,
            Prefix::Short => u16::MAX as usize,
        }
    }

    fn width(self) -> usize {
        match self {
            Prefix::Byte => 1,
            Prefix::Short => 2,
        }
    }
}

/// Accumulates the header and data regions while encoding
struct FrameWriter {
    header: Vec<u8>,
    data: Vec<u8>,
}

impl FrameWriter {
    fn new() -> Self {
        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(&short_to_bytes(IO_MESSAGE_VERSION));
        Self {
            header,
            data: Vec::new(),
        }
    }

    fn string(&mut self, field: &'static str, value: &str, prefix: Prefix) {
        let mut len = wire_len(value);
        if len > prefix.max_len() {
            warn!(
                "ioMessage field {} is {} bytes, exceeds {}-byte prefix; field omitted",
                field,
                len,
                prefix.width()
            );
            len = 0;
        }
        self.header
            .extend_from_slice(&uint_to_bytes(len as u64, prefix.width()));
        if len > 0 {
            self.data.extend_from_slice(&string_to_bytes(value));
        }
    }

    fn number(&mut self, value: u64, width: u8) {
        if value == 0 {
            self.header.push(0);
            return;
        }
        self.header.push(width);
        self.data
            .extend_from_slice(&uint_to_bytes(value, width as usize));
    }

    fn payload(&mut self, field: &'static str, value: &[u8]) {
        let len = match u32::try_from(value.len()) {
            Ok(len) => len,
            Err(_) => {
                warn!(
                    "ioMessage field {} is {} bytes, exceeds 4-byte prefix; field omitted",
                    field,
                    value.len()
                );
                0
            }
        };
        self.header.extend_from_slice(&int_to_bytes(len));
        if len > 0 {
            self.data.extend_from_slice(value);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        debug_assert_eq!(self.header.len(), HEADER_SIZE);
        self.header.append(&mut self.data);
        self.header
    }
}

/// Walks the data region with a running cursor
struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: DATA_OFFSET,
        }
    }

    /// Size indicator stored in the header at `offset` with `width` bytes
    fn size_at(&self, offset: usize, width: usize) -> CodecResult<usize> {
        read_uint_be(self.data, offset, width).map(|size| size as usize)
    }

    fn take(&mut self, field: &'static str, size: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| CodecError::truncated(field, self.pos, size, self.data.len()))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn string(&mut self, field: &'static str, size: usize) -> CodecResult<String> {
        if size == 0 {
            return Ok(String::new());
        }
        self.take(field, size).map(bytes_to_string)
    }

    fn number(&mut self, field: &'static str, size: usize) -> CodecResult<u64> {
        if size == 0 {
            return Ok(0);
        }
        let value = read_uint_be(self.data, self.pos, size).map_err(|e| match e {
            CodecError::TruncatedField {
                offset,
                required_bytes,
                buffer_size,
                ..
            } => CodecError::truncated(field, offset, required_bytes, buffer_size),
            other => other,
        })?;
        self.pos += size;
        Ok(value)
    }

    fn payload(&mut self, field: &'static str, size: usize) -> CodecResult<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        self.take(field, size).map(<[u8]>::to_vec)
    }
}

fn narrow<T: TryFrom<u64>>(field: &'static str, value: u64) -> CodecResult<T> {
    T::try_from(value).map_err(|_| CodecError::FieldOverflow {
        field,
        value,
        max_bits: (std::mem::size_of::<T>() * 8) as u32,
    })
}

impl IoMessage {
    /// Empty message carrying only the protocol version
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a message
    pub fn builder() -> IoMessageBuilder {
        IoMessageBuilder::default()
    }

    /// True when no field other than the version carries a value
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Serialize into the binary wire layout
    pub fn encode(&self) -> Vec<u8> {
        let mut w = FrameWriter::new();
        w.string("id", &self.id, Prefix::Byte);
        w.string("tag", &self.tag, Prefix::Short);
        w.string("groupid", &self.group_id, Prefix::Byte);
        w.number(self.sequence_number.into(), widths::SEQUENCE_NUMBER);
        w.number(self.sequence_total.into(), widths::SEQUENCE_TOTAL);
        w.number(self.priority.into(), widths::PRIORITY);
        w.number(self.timestamp, widths::TIMESTAMP);
        w.string("publisher", &self.publisher, Prefix::Byte);
        w.string("authid", &self.auth_id, Prefix::Short);
        w.string("authgroup", &self.auth_group, Prefix::Short);
        w.number(self.chain_position, widths::CHAIN_POSITION);
        w.string("hash", &self.hash, Prefix::Short);
        w.string("previoushash", &self.previous_hash, Prefix::Short);
        w.string("nonce", &self.nonce, Prefix::Short);
        w.number(self.difficulty_target.into(), widths::DIFFICULTY_TARGET);
        w.string("infotype", &self.info_type, Prefix::Byte);
        w.string("infoformat", &self.info_format, Prefix::Byte);
        w.payload("contextdata", &self.context_data);
        w.payload("contentdata", &self.content_data);
        w.finish()
    }

    /// Decode a binary frame, degrading a version mismatch to the empty message
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        match Self::try_decode(data) {
            Err(CodecError::UnsupportedVersion { version, expected }) => {
                warn!(
                    "ioMessage version not valid: got {}, expected {}",
                    version, expected
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Decode a binary frame, rejecting any version other than the protocol's
    pub fn try_decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < 2 {
            return Err(CodecError::message_too_small(
                2,
                data.len(),
                "ioMessage version",
            ));
        }
        let version = read_uint_be(data, offsets::VERSION, 2)? as u16;
        if version != IO_MESSAGE_VERSION {
            return Err(CodecError::UnsupportedVersion {
                version,
                expected: IO_MESSAGE_VERSION,
            });
        }
        if data.len() < HEADER_SIZE {
            return Err(CodecError::message_too_small(
                HEADER_SIZE,
                data.len(),
                "ioMessage header",
            ));
        }

        let mut r = FrameReader::new(data);
        let mut msg = Self::default();

        let size = r.size_at(offsets::ID, 1)?;
        msg.id = r.string("id", size)?;
        let size = r.size_at(offsets::TAG, 2)?;
        msg.tag = r.string("tag", size)?;
        let size = r.size_at(offsets::GROUP_ID, 1)?;
        msg.group_id = r.string("groupid", size)?;

        let size = r.size_at(offsets::SEQUENCE_NUMBER, 1)?;
        msg.sequence_number = narrow("sequencenumber", r.number("sequencenumber", size)?)?;
        let size = r.size_at(offsets::SEQUENCE_TOTAL, 1)?;
        msg.sequence_total = narrow("sequencetotal", r.number("sequencetotal", size)?)?;
        let size = r.size_at(offsets::PRIORITY, 1)?;
        msg.priority = narrow("priority", r.number("priority", size)?)?;
        let size = r.size_at(offsets::TIMESTAMP, 1)?;
        msg.timestamp = r.number("timestamp", size)?;

        let size = r.size_at(offsets::PUBLISHER, 1)?;
        msg.publisher = r.string("publisher", size)?;
        let size = r.size_at(offsets::AUTH_ID, 2)?;
        msg.auth_id = r.string("authid", size)?;
        let size = r.size_at(offsets::AUTH_GROUP, 2)?;
        msg.auth_group = r.string("authgroup", size)?;

        let size = r.size_at(offsets::CHAIN_POSITION, 1)?;
        msg.chain_position = r.number("chainposition", size)?;

        let size = r.size_at(offsets::HASH, 2)?;
        msg.hash = r.string("hash", size)?;
        let size = r.size_at(offsets::PREVIOUS_HASH, 2)?;
        msg.previous_hash = r.string("previoushash", size)?;
        let size = r.size_at(offsets::NONCE, 2)?;
        msg.nonce = r.string("nonce", size)?;

        let size = r.size_at(offsets::DIFFICULTY_TARGET, 1)?;
        msg.difficulty_target = narrow("difficultytarget", r.number("difficultytarget", size)?)?;

        let size = r.size_at(offsets::INFO_TYPE, 1)?;
        msg.info_type = r.string("infotype", size)?;
        let size = r.size_at(offsets::INFO_FORMAT, 1)?;
        msg.info_format = r.string("infoformat", size)?;

        let size = r.size_at(offsets::CONTEXT_DATA, 4)?;
        msg.context_data = r.payload("contextdata", size)?;
        let size = r.size_at(offsets::CONTENT_DATA, 4)?;
        msg.content_data = r.payload("contentdata", size)?;

        Ok(msg)
    }
}

/// Fluent construction of an [`IoMessage`]
///
/// `id` and `timestamp` are gateway-assigned and cannot be set here.
#[derive(Debug, Clone, Default)]
pub struct IoMessageBuilder {
    msg: IoMessage,
}

macro_rules! setters {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(mut self, value: impl Into<$ty>) -> Self {
                self.msg.$name = value.into();
                self
            }
        )*
    };
}

impl IoMessageBuilder {
    setters! {
        tag: String,
        group_id: String,
        sequence_number: u32,
        sequence_total: u32,
        priority: u8,
        publisher: String,
        auth_id: String,
        auth_group: String,
        chain_position: u64,
        hash: String,
        previous_hash: String,
        nonce: String,
        difficulty_target: u32,
        info_type: String,
        info_format: String,
        context_data: Vec<u8>,
        content_data: Vec<u8>,
    }

    pub fn build(self) -> IoMessage {
        self.msg
    }
}
