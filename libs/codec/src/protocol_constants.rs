//! Protocol-level constants for the ioMessage wire format
//!
//! These values are part of the wire format shared with the gateway. They
//! MUST stay consistent with every other implementation of the protocol.

/// ioMessage protocol version
///
/// Written as the first two bytes of every binary ioMessage. Frames that
/// declare any other version are rejected without partial decode.
pub const IO_MESSAGE_VERSION: u16 = 4;

/// Size of the fixed header region (bytes 0..=32)
pub const HEADER_SIZE: usize = 33;

/// Offset where the variable-length data region begins
pub const DATA_OFFSET: usize = HEADER_SIZE;

/// Byte offsets of each size indicator inside the header region
///
/// The decoder relies on these exact offsets; changing field order or width
/// breaks wire compatibility.
pub mod offsets {
    pub const VERSION: usize = 0;
    pub const ID: usize = 2;
    pub const TAG: usize = 3;
    pub const GROUP_ID: usize = 5;
    pub const SEQUENCE_NUMBER: usize = 6;
    pub const SEQUENCE_TOTAL: usize = 7;
    pub const PRIORITY: usize = 8;
    pub const TIMESTAMP: usize = 9;
    pub const PUBLISHER: usize = 10;
    pub const AUTH_ID: usize = 11;
    pub const AUTH_GROUP: usize = 13;
    pub const CHAIN_POSITION: usize = 15;
    pub const HASH: usize = 16;
    pub const PREVIOUS_HASH: usize = 18;
    pub const NONCE: usize = 20;
    pub const DIFFICULTY_TARGET: usize = 22;
    pub const INFO_TYPE: usize = 23;
    pub const INFO_FORMAT: usize = 24;
    pub const CONTEXT_DATA: usize = 25;
    pub const CONTENT_DATA: usize = 29;
}

/// Fixed widths of numeric fields when present in the data region
pub mod widths {
    pub const SEQUENCE_NUMBER: u8 = 4;
    pub const SEQUENCE_TOTAL: u8 = 4;
    pub const PRIORITY: u8 = 1;
    pub const TIMESTAMP: u8 = 8;
    pub const CHAIN_POSITION: u8 = 8;
    pub const DIFFICULTY_TARGET: u8 = 4;
}

/// Socket frame layout
pub mod frame {
    /// `[opcode][u32 length]` prefix of a message frame
    pub const MESSAGE_PREFIX_SIZE: usize = 5;

    /// `[opcode][u8 id length][u8 timestamp size]` prefix of a receipt frame
    pub const RECEIPT_PREFIX_SIZE: usize = 3;
}
