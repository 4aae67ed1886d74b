//! Codec errors for ioMessage and socket frame processing
//!
//! Each variant carries enough context (offsets, sizes, field names) to
//! diagnose a malformed frame from a log line alone.

use thiserror::Error;

/// Errors raised while decoding binary frames or JSON transport forms
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Buffer is too small to contain the expected structure
    #[error("Message too small: need {need} bytes, got {got} (context: {context})")]
    MessageTooSmall {
        need: usize,
        got: usize,
        context: String,
    },

    /// A field's declared size runs past the end of the buffer
    #[error("Truncated field {field}: need {required_bytes} bytes at offset {offset}, buffer has {buffer_size}")]
    TruncatedField {
        field: &'static str,
        offset: usize,
        required_bytes: usize,
        buffer_size: usize,
    },

    /// Integer width outside the 1..=8 byte range
    #[error("Invalid integer width {width} (context: {context})")]
    InvalidWidth { width: usize, context: String },

    /// Decoded value does not fit the destination field
    #[error("Value {value} overflows field {field} ({max_bits} bits)")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        max_bits: u32,
    },

    /// Protocol version is not supported by this decoder
    #[error("Unsupported ioMessage version {version}: expected {expected}")]
    UnsupportedVersion { version: u16, expected: u16 },

    /// Payload field was not valid base64
    #[error("Invalid base64 in {field}: {reason}")]
    InvalidBase64 { field: &'static str, reason: String },

    /// JSON transport form could not be mapped to an ioMessage
    #[error("Invalid ioMessage JSON: {0}")]
    Json(String),
}

impl CodecError {
    /// Create MessageTooSmall error with diagnostic context
    pub fn message_too_small(need: usize, got: usize, context: impl Into<String>) -> Self {
        Self::MessageTooSmall {
            need,
            got,
            context: context.into(),
        }
    }

    /// Create TruncatedField error for a field read past the buffer end
    pub fn truncated(
        field: &'static str,
        offset: usize,
        required_bytes: usize,
        buffer_size: usize,
    ) -> Self {
        Self::TruncatedField {
            field,
            offset,
            required_bytes,
            buffer_size,
        }
    }

    /// Create InvalidWidth error
    pub fn invalid_width(width: usize, context: impl Into<String>) -> Self {
        Self::InvalidWidth {
            width,
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
