//! Integration tests for the ioMessage binary and JSON codecs
//!
//! Focus on end-to-end scenarios across the public API: sparse messages,
//! full messages, socket framing and the JSON transport form.

use iofog_codec::{
    decode_inbound, encode_message_frame, InboundFrame, IoMessage, PayloadEncoding, DATA_OFFSET,
    HEADER_SIZE,
};
use proptest::prelude::*;

fn full_message() -> IoMessage {
    IoMessage::builder()
        .tag("Bosch Camera 8798797")
        .group_id("group1")
        .sequence_number(2u32)
        .sequence_total(100u32)
        .priority(5u8)
        .publisher("publisher-uuid")
        .auth_id("auth")
        .auth_group("authgrp")
        .chain_position(10u64)
        .hash("hashingggg")
        .previous_hash("prevhashingggg")
        .nonce("nounceee")
        .difficulty_target(30u32)
        .info_type("image/jpeg")
        .info_format("base64")
        .context_data(b"gghh".to_vec())
        .content_data(b"sdkjhwrtiy8wrtgSDFOiuhsrgowh4touwsdhsDFDSKJhsdkljasjklweklfjwhefiauhw98p328".to_vec())
        .build()
}

#[test]
fn test_sparse_message_scenario() {
    let msg = IoMessage::builder()
        .tag("t")
        .sequence_number(5u32)
        .content_data(b"abc".to_vec())
        .build();

    let frame = msg.encode();
    // header + "t" + 4-byte sequence number + "abc"
    assert_eq!(frame.len(), HEADER_SIZE + 1 + 4 + 3);

    let decoded = IoMessage::decode(&frame).expect("sparse message should decode");
    assert_eq!(decoded.tag, "t");
    assert_eq!(decoded.sequence_number, 5);
    assert_eq!(decoded.content_data, b"abc");

    assert_eq!(decoded.id, "");
    assert_eq!(decoded.group_id, "");
    assert_eq!(decoded.sequence_total, 0);
    assert_eq!(decoded.priority, 0);
    assert_eq!(decoded.timestamp, 0);
    assert_eq!(decoded.publisher, "");
    assert_eq!(decoded.chain_position, 0);
    assert_eq!(decoded.difficulty_target, 0);
    assert!(decoded.context_data.is_empty());
    assert_eq!(decoded, msg);
}

#[test]
fn test_full_message_roundtrip() {
    let msg = full_message();
    let decoded = IoMessage::decode(&msg.encode()).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn test_gateway_assigned_fields_survive_binary_form() {
    let mut msg = full_message();
    msg.id = "gateway-id".to_string();
    msg.timestamp = (1u64 << 62) + 17;

    let decoded = IoMessage::decode(&msg.encode()).unwrap();
    assert_eq!(decoded.id, "gateway-id");
    assert_eq!(decoded.timestamp, (1u64 << 62) + 17);
}

#[test]
fn test_zero_size_indicator_keeps_defaults() {
    let mut frame = vec![0u8; HEADER_SIZE];
    frame[1] = 4;
    let msg = IoMessage::decode(&frame).unwrap();
    assert!(msg.is_empty());
    assert_eq!(msg.version, 4);
    assert_eq!(frame.len(), DATA_OFFSET);
}

#[test]
fn test_foreign_version_yields_empty_message() {
    let mut frame = full_message().encode();
    frame[0] = 0;
    frame[1] = 5;
    let msg = IoMessage::decode(&frame).unwrap();
    assert_eq!(msg, IoMessage::default());
}

#[test]
fn test_message_frame_dispatch_scenario() {
    let msg = IoMessage::builder().info_type("text/plain").build();
    let frame = encode_message_frame(&msg).unwrap();
    match decode_inbound(&frame).unwrap() {
        InboundFrame::Message(decoded) => assert_eq!(decoded, msg),
        other => panic!("Expected message frame, got {:?}", other),
    }
}

#[test]
fn test_json_and_binary_forms_agree() {
    let msg = full_message();
    let via_json =
        IoMessage::from_json(&msg.to_json(PayloadEncoding::Base64), PayloadEncoding::Base64)
            .unwrap();
    let via_binary = IoMessage::decode(&msg.encode()).unwrap();
    assert_eq!(via_json, via_binary);
}

fn wire_string(max: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<u8>(), 0..max)
        .prop_map(|bytes| bytes.into_iter().map(char::from).collect())
}

fn arb_message() -> impl Strategy<Value = IoMessage> {
    let text = (
        wire_string(16),
        wire_string(64),
        wire_string(16),
        wire_string(16),
        wire_string(32),
        wire_string(32),
        wire_string(32),
        wire_string(32),
        wire_string(32),
        wire_string(16),
        wire_string(16),
    );
    let numbers = (
        any::<u32>(),
        any::<u32>(),
        any::<u8>(),
        any::<u64>(),
        any::<u64>(),
        any::<u32>(),
    );
    let payloads = (
        proptest::collection::vec(any::<u8>(), 0..64),
        proptest::collection::vec(any::<u8>(), 0..256),
    );

    (text, numbers, payloads).prop_map(|(t, n, p)| IoMessage {
        id: t.0,
        tag: t.1,
        group_id: t.2,
        publisher: t.3,
        auth_id: t.4,
        auth_group: t.5,
        hash: t.6,
        previous_hash: t.7,
        nonce: t.8,
        info_type: t.9,
        info_format: t.10,
        sequence_number: n.0,
        sequence_total: n.1,
        priority: n.2,
        timestamp: n.3,
        chain_position: n.4,
        difficulty_target: n.5,
        context_data: p.0,
        content_data: p.1,
        ..IoMessage::default()
    })
}

proptest! {
    #[test]
    fn prop_binary_roundtrip(msg in arb_message()) {
        let decoded = IoMessage::decode(&msg.encode()).unwrap();
        prop_assert_eq!(decoded, msg);
    }
}
