//! Integration tests for kvwire.
//!
//! These tests verify the interplay between the protocol layer and the
//! document parsers, without a live session.

use kvwire::config::ClusterConfig;
use kvwire::error_map::ErrorMap;
use kvwire::protocol::{
    encode_request, encode_response, map_status, FrameBuffer, Magic, Opcode, Status, HEADER_SIZE,
};
use kvwire::Error;

/// Full frame cycle with a JSON topology payload.
#[test]
fn frame_with_configuration_payload() {
    let document = serde_json::json!({
        "rev": 42,
        "name": "beer-sample",
        "nodesExt": [
            {"hostname": "10.0.0.1", "services": {"kv": 11210}},
            {"services": {"kv": 11210}, "thisNode": true},
        ],
    })
    .to_string();

    let wire = encode_response(
        Opcode::GetClusterConfig as u8,
        12345,
        0,
        Status::Success as u16,
        b"",
        b"",
        document.as_bytes(),
    );

    let mut buffer = FrameBuffer::new();
    buffer.feed(&wire);
    let frame = buffer.next().unwrap().unwrap();

    assert_eq!(frame.magic, Magic::ClientResponse);
    assert_eq!(frame.opaque, 12345);
    assert_eq!(frame.status(), Some(Status::Success as u16));

    let config = ClusterConfig::parse(&frame.value).unwrap();
    assert_eq!(config.rev, 42);
    assert_eq!(config.bucket.as_deref(), Some("beer-sample"));
    assert_eq!(config.this_node_index(), Some(1));
}

/// Several frames in sequence parse independently.
#[test]
fn multiple_frames_sequence() {
    let mut wire = Vec::new();
    for opaque in 1u32..=5 {
        let value = format!("value_{opaque}");
        wire.extend_from_slice(&encode_response(
            Opcode::Get as u8,
            opaque,
            u64::from(opaque) * 7,
            Status::Success as u16,
            b"",
            b"",
            value.as_bytes(),
        ));
    }

    let mut buffer = FrameBuffer::new();
    buffer.feed(&wire);

    for opaque in 1u32..=5 {
        let frame = buffer.next().unwrap().unwrap();
        assert_eq!(frame.opaque, opaque);
        assert_eq!(frame.cas, u64::from(opaque) * 7);
        assert_eq!(frame.value, format!("value_{opaque}").as_bytes());
    }
    assert!(buffer.next().unwrap().is_none());
    assert!(buffer.is_empty());
}

/// Chunked delivery produces the same frames as a single feed.
#[test]
fn chunked_delivery_equivalence() {
    let mut wire = Vec::new();
    wire.extend_from_slice(&encode_request(
        Opcode::Upsert as u8,
        9,
        0,
        100,
        b"\x00\x00\x00\x00\x00\x00\x00\x00",
        b"document-key",
        br#"{"content": "payload"}"#,
    ));
    wire.extend_from_slice(&encode_request(Opcode::Get as u8, 10, 0, 100, b"", b"k", b""));

    for chunk_size in [1, 3, HEADER_SIZE, HEADER_SIZE + 1, wire.len()] {
        let mut buffer = FrameBuffer::new();
        let mut opaques = Vec::new();
        for chunk in wire.chunks(chunk_size) {
            buffer.feed(chunk);
            while let Some(frame) = buffer.next().unwrap() {
                opaques.push(frame.opaque);
            }
        }
        assert_eq!(opaques, vec![9, 10], "chunk_size={chunk_size}");
    }
}

/// The error map document round-trips through a frame body.
#[test]
fn error_map_through_frame_body() {
    let document = br#"{"version": 1, "revision": 2, "errors": {
        "7": {"name": "NOT_MY_VBUCKET", "desc": "vbucket moved", "attrs": ["fetch-config"]}
    }}"#;
    let wire = encode_response(
        Opcode::GetErrorMap as u8,
        77,
        0,
        Status::Success as u16,
        b"",
        b"",
        document,
    );

    let mut buffer = FrameBuffer::new();
    buffer.feed(&wire);
    let frame = buffer.next().unwrap().unwrap();

    let map = ErrorMap::parse(&frame.value).unwrap();
    assert_eq!(map.revision, 2);
    assert_eq!(map.get(0x07).unwrap().name, "NOT_MY_VBUCKET");
}

/// Status translation distinguishes opcodes where the protocol overloads
/// a status code.
#[test]
fn status_translation_rules() {
    assert!(map_status(Opcode::Get, Status::Success as u16).is_ok());
    assert!(matches!(
        map_status(Opcode::Insert, Status::Exists as u16),
        Err(Error::DocumentExists)
    ));
    assert!(matches!(
        map_status(Opcode::Upsert, Status::Exists as u16),
        Err(Error::CasMismatch)
    ));
    assert!(matches!(
        map_status(Opcode::Get, Status::NotFound as u16),
        Err(Error::DocumentNotFound)
    ));
    // Sub-document path-level failures stay successful so callers can
    // inspect per-path status.
    assert!(map_status(
        Opcode::SubdocMultiLookup,
        Status::SubdocMultiPathFailure as u16
    )
    .is_ok());
}
