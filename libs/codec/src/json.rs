//! JSON transport form of [`IoMessage`]
//!
//! The REST API exchanges ioMessages as JSON objects keyed by the lowercase
//! wire names (`groupid`, `sequencenumber`, ...). Payload fields are base64
//! strings on the REST boundary; [`PayloadEncoding::Raw`] keeps them as byte
//! arrays for in-process use. Missing or `null` fields decode to defaults so
//! the JSON and binary forms stay interchangeable.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CodecError, CodecResult};
use crate::message::IoMessage;
use crate::protocol_constants::IO_MESSAGE_VERSION;

/// How `contextdata` / `contentdata` are represented in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadEncoding {
    /// Base64 strings (REST transport)
    #[default]
    Base64,
    /// Arrays of byte values (in-process)
    Raw,
}

/// Lenient mirror of the JSON object: every field may be missing or null
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IoMessageRepr {
    id: Option<String>,
    tag: Option<String>,
    groupid: Option<String>,
    sequencenumber: Option<u32>,
    sequencetotal: Option<u32>,
    priority: Option<u8>,
    version: Option<u16>,
    timestamp: Option<u64>,
    publisher: Option<String>,
    authid: Option<String>,
    authgroup: Option<String>,
    chainposition: Option<u64>,
    hash: Option<String>,
    previoushash: Option<String>,
    nonce: Option<String>,
    difficultytarget: Option<u32>,
    infotype: Option<String>,
    infoformat: Option<String>,
    contextdata: Option<Value>,
    contentdata: Option<Value>,
}

/// Encode bytes as standard base64; empty input gives an empty string
pub fn encode_base64(data: &[u8]) -> String {
    if data.is_empty() {
        return String::new();
    }
    STANDARD.encode(data)
}

/// Decode standard base64; an empty string gives an empty payload
pub fn decode_base64(field: &'static str, text: &str) -> CodecResult<Vec<u8>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::InvalidBase64 {
            field,
            reason: e.to_string(),
        })
}

fn payload_to_json(data: &[u8], encoding: PayloadEncoding) -> Value {
    match encoding {
        PayloadEncoding::Base64 => Value::String(encode_base64(data)),
        PayloadEncoding::Raw => Value::from(data.to_vec()),
    }
}

fn payload_from_json(
    field: &'static str,
    value: Option<Value>,
    encoding: PayloadEncoding,
) -> CodecResult<Vec<u8>> {
    match (value, encoding) {
        (None, _) | (Some(Value::Null), _) => Ok(Vec::new()),
        (Some(Value::String(text)), PayloadEncoding::Base64) => decode_base64(field, &text),
        (Some(Value::String(text)), PayloadEncoding::Raw) => Ok(text.into_bytes()),
        (Some(value @ Value::Array(_)), _) => {
            serde_json::from_value(value).map_err(CodecError::from)
        }
        (Some(other), _) => Err(CodecError::Json(format!(
            "{} must be a string or byte array, got {}",
            field, other
        ))),
    }
}

impl IoMessage {
    /// JSON object for transport; payloads encoded per `encoding`
    pub fn to_json(&self, encoding: PayloadEncoding) -> Value {
        json!({
            "id": self.id,
            "tag": self.tag,
            "groupid": self.group_id,
            "sequencenumber": self.sequence_number,
            "sequencetotal": self.sequence_total,
            "priority": self.priority,
            "version": IO_MESSAGE_VERSION,
            "timestamp": self.timestamp,
            "publisher": self.publisher,
            "authid": self.auth_id,
            "authgroup": self.auth_group,
            "chainposition": self.chain_position,
            "hash": self.hash,
            "previoushash": self.previous_hash,
            "nonce": self.nonce,
            "difficultytarget": self.difficulty_target,
            "infotype": self.info_type,
            "infoformat": self.info_format,
            "contextdata": payload_to_json(&self.context_data, encoding),
            "contentdata": payload_to_json(&self.content_data, encoding),
        })
    }

    /// Build a message from its JSON form; absent fields take defaults
    pub fn from_json(value: &Value, encoding: PayloadEncoding) -> CodecResult<Self> {
        let repr = IoMessageRepr::deserialize(value)?;
        Ok(Self {
            id: repr.id.unwrap_or_default(),
            tag: repr.tag.unwrap_or_default(),
            group_id: repr.groupid.unwrap_or_default(),
            sequence_number: repr.sequencenumber.unwrap_or_default(),
            sequence_total: repr.sequencetotal.unwrap_or_default(),
            priority: repr.priority.unwrap_or_default(),
            version: repr.version.unwrap_or(IO_MESSAGE_VERSION),
            timestamp: repr.timestamp.unwrap_or_default(),
            publisher: repr.publisher.unwrap_or_default(),
            auth_id: repr.authid.unwrap_or_default(),
            auth_group: repr.authgroup.unwrap_or_default(),
            chain_position: repr.chainposition.unwrap_or_default(),
            hash: repr.hash.unwrap_or_default(),
            previous_hash: repr.previoushash.unwrap_or_default(),
            nonce: repr.nonce.unwrap_or_default(),
            difficulty_target: repr.difficultytarget.unwrap_or_default(),
            info_type: repr.infotype.unwrap_or_default(),
            info_format: repr.infoformat.unwrap_or_default(),
            context_data: payload_from_json("contextdata", repr.contextdata, encoding)?,
            content_data: payload_from_json("contentdata", repr.contentdata, encoding)?,
        })
    }
}

/// Parse a REST `messages` array (base64 payloads)
pub fn parse_messages(messages: &[Value]) -> CodecResult<Vec<IoMessage>> {
    messages
        .iter()
        .map(|m| IoMessage::from_json(m, PayloadEncoding::Base64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_payloads_on_rest_boundary() {
        let msg = IoMessage::builder()
            .tag("cam")
            .content_data(b"abc".to_vec())
            .build();
        let value = msg.to_json(PayloadEncoding::Base64);

        assert_eq!(value["contentdata"], "YWJj");
        assert_eq!(value["contextdata"], "");
        assert_eq!(value["version"], 4);
        assert_eq!(
            IoMessage::from_json(&value, PayloadEncoding::Base64).unwrap(),
            msg
        );
    }

    #[test]
    fn test_raw_payloads_in_process() {
        let msg = IoMessage::builder().context_data(vec![1, 2, 255]).build();
        let value = msg.to_json(PayloadEncoding::Raw);

        assert_eq!(value["contextdata"], json!([1, 2, 255]));
        assert_eq!(
            IoMessage::from_json(&value, PayloadEncoding::Raw).unwrap(),
            msg
        );
    }

    #[test]
    fn test_missing_and_null_fields_default() {
        let value = json!({
            "id": "m-1",
            "tag": null,
            "timestamp": 1700000000000u64,
            "contentdata": null,
        });
        let msg = IoMessage::from_json(&value, PayloadEncoding::Base64).unwrap();

        assert_eq!(msg.id, "m-1");
        assert_eq!(msg.tag, "");
        assert_eq!(msg.sequence_number, 0);
        assert_eq!(msg.version, IO_MESSAGE_VERSION);
        assert_eq!(msg.timestamp, 1_700_000_000_000);
        assert!(msg.content_data.is_empty());
        assert!(msg.context_data.is_empty());
    }

    #[test]
    fn test_invalid_base64_is_reported() {
        let value = json!({ "contentdata": "***" });
        assert!(matches!(
            IoMessage::from_json(&value, PayloadEncoding::Base64),
            Err(CodecError::InvalidBase64 { field: "contentdata", .. })
        ));
    }

    #[test]
    fn test_parse_messages() {
        let list = vec![json!({ "tag": "a" }), json!({ "tag": "b", "contentdata": "AQI=" })];
        let parsed = parse_messages(&list).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].content_data, vec![1, 2]);
    }
}
