#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for the wire format and registry
//! Covers boundary encodings, hostile length prefixes, malformed fields, and
//! registration corner cases.

use bytes::{Bytes, BytesMut};
use gamewire::core::codec::{Frame, FrameCodec};
use gamewire::core::cursor::ByteCursor;
use gamewire::core::packet::Packet;
use gamewire::core::varint::{VarInt, VarLong};
use gamewire::core::wire::WireWrite;
use gamewire::error::ProtocolError;
use gamewire::protocol::messages::{builtin_registry, Ping, Pong};
use gamewire::protocol::registry::PacketRegistry;
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// VARINT WIRE FORMAT EDGE CASES
// ============================================================================

#[test]
fn test_var_int_known_encodings() {
    let vectors: [(i32, &[u8]); 9] = [
        (0, &[0x00]),
        (1, &[0x01]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (255, &[0xFF, 0x01]),
        (300, &[0xAC, 0x02]),
        (2147483647, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
        (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        (i32::MIN, &[0x80, 0x80, 0x80, 0x80, 0x08]),
    ];

    for (value, wire) in vectors {
        let mut buf = BytesMut::new();
        let written = VarInt(value).encode(&mut buf);
        assert_eq!(&buf[..], wire, "encoding of {value}");
        assert_eq!(written, wire.len());

        let mut cursor = ByteCursor::new(wire);
        assert_eq!(VarInt::decode(&mut cursor).unwrap().value(), value);
        assert_eq!(cursor.remaining(), 0);
    }
}

#[test]
fn test_var_long_known_encodings() {
    let vectors: [(i64, &[u8]); 4] = [
        (0, &[0x00]),
        (2147483647, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
        (
            i64::MAX,
            &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F],
        ),
        (
            -1,
            &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01],
        ),
    ];

    for (value, wire) in vectors {
        let mut buf = BytesMut::new();
        VarLong(value).encode(&mut buf);
        assert_eq!(&buf[..], wire, "encoding of {value}");

        let mut cursor = ByteCursor::new(wire);
        assert_eq!(VarLong::decode(&mut cursor).unwrap().value(), value);
    }
}

#[test]
fn test_var_int_six_continuation_bytes_rejected() {
    let mut cursor = ByteCursor::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
    let err = VarInt::decode(&mut cursor).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedVarInt(_)));
}

#[test]
fn test_var_long_eleven_continuation_bytes_rejected() {
    let wire = [
        0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01,
    ];
    let mut cursor = ByteCursor::new(&wire);
    let err = VarLong::decode(&mut cursor).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedVarInt(_)));
}

#[test]
fn test_var_int_non_minimal_zero_accepted() {
    let mut cursor = ByteCursor::new(&[0x80, 0x00]);
    assert_eq!(VarInt::decode(&mut cursor).unwrap().value(), 0);
    assert_eq!(cursor.position(), 2);
}

#[test]
fn test_var_int_incomplete_input_leaves_cursor_in_place() {
    let mut cursor = ByteCursor::new(&[0x80, 0x80]);
    assert!(VarInt::try_decode(&mut cursor).unwrap().is_none());
    assert_eq!(cursor.position(), 0, "failed probe must not consume");

    let err = VarInt::decode(&mut cursor).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedVarInt(_)));
}

// ============================================================================
// FRAME BOUNDARY EDGE CASES
// ============================================================================

#[test]
fn test_frame_zero_length_rejected() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(&[0x00u8][..]);
    let err = codec.decode(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidFrameLength { length: 0 }
    ));
}

#[test]
fn test_frame_negative_length_rejected() {
    let mut codec = FrameCodec::default();
    // VarInt(-1) as the length prefix.
    let mut buf = BytesMut::from(&[0xFFu8, 0xFF, 0xFF, 0xFF, 0x0F][..]);
    let err = codec.decode(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidFrameLength { length: -1 }
    ));
}

#[test]
fn test_frame_with_id_only_has_empty_payload() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(&[0x01u8, 0x2A][..]);
    let frame = codec.decode(&mut buf).unwrap().unwrap();
    assert_eq!(frame.id.value(), 0x2A);
    assert!(frame.payload.is_empty());
}

#[test]
fn test_frame_id_overrunning_declared_body_rejected() {
    let mut codec = FrameCodec::default();
    // One-byte body whose only byte says the id continues.
    let mut buf = BytesMut::from(&[0x01u8, 0x80][..]);
    let err = codec.decode(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidFrameLength { length: 1 }
    ));
}

#[test]
fn test_oversized_frame_rejected_before_body_arrives() {
    let mut codec = FrameCodec::new(8);
    // Length prefix claims 1000 bytes; no body bytes present yet.
    let mut buf = BytesMut::new();
    buf.put_var_int(1000);

    let err = codec.decode(&mut buf).unwrap_err();
    match err {
        ProtocolError::OversizedFrame { length, max } => {
            assert_eq!(length, 1000);
            assert_eq!(max, 8);
        }
        other => panic!("Unexpected: {other:?}"),
    }
}

#[test]
fn test_frame_body_exactly_at_limit_accepted() {
    let mut codec = FrameCodec::new(8);
    let frame = Frame::new(0x01, Bytes::from(vec![0xCC; 7]));
    assert_eq!(frame.body_len(), 8);

    let mut buf = BytesMut::new();
    codec.encode(frame.clone(), &mut buf).unwrap();
    assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), frame);
}

// ============================================================================
// STRING FIELD EDGE CASES
// ============================================================================

#[test]
fn test_var_string_multibyte_utf8_roundtrip() {
    let original = "héllo wörld 世界 🎮";
    let mut buf = BytesMut::new();
    buf.put_var_string(original);

    let mut cursor = ByteCursor::new(&buf);
    assert_eq!(cursor.read_var_string(1024).unwrap(), original);
    assert_eq!(cursor.remaining(), 0);
}

#[test]
fn test_var_string_empty_roundtrip() {
    let mut buf = BytesMut::new();
    assert_eq!(buf.put_var_string(""), 1);
    assert_eq!(&buf[..], [0x00]);

    let mut cursor = ByteCursor::new(&buf);
    assert_eq!(cursor.read_var_string(16).unwrap(), "");
}

#[test]
fn test_var_string_invalid_utf8_rejected() {
    let mut buf = BytesMut::new();
    buf.put_var_int(2);
    buf.extend_from_slice(&[0xFF, 0xFE]);

    let mut cursor = ByteCursor::new(&buf);
    let err = cursor.read_var_string(16).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPacket(_)));
}

#[test]
fn test_var_string_over_limit_rejected() {
    let mut buf = BytesMut::new();
    buf.put_var_string("hello");

    let mut cursor = ByteCursor::new(&buf);
    let err = cursor.read_var_string(4).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPacket(_)));
}

#[test]
fn test_var_string_negative_length_rejected() {
    let mut buf = BytesMut::new();
    buf.put_var_int(-5);

    let mut cursor = ByteCursor::new(&buf);
    let err = cursor.read_var_string(16).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPacket(_)));
}

// ============================================================================
// CURSOR EDGE CASES
// ============================================================================

#[test]
fn test_cursor_errors_on_truncated_field() {
    let mut cursor = ByteCursor::new(&[1, 2, 3]);
    let err = cursor.read_u64().unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPacket(_)));
    assert_eq!(cursor.remaining(), 3, "failed read must not consume");
}

#[test]
fn test_cursor_rewind_replays_bytes() {
    let mut cursor = ByteCursor::new(&[0x12, 0x34, 0x56]);
    assert_eq!(cursor.read_u16().unwrap(), 0x1234);

    cursor.rewind(2).unwrap();
    assert_eq!(cursor.read_u16().unwrap(), 0x1234);

    let err = cursor.rewind(3).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedPacket(_)));
}

// ============================================================================
// REGISTRY EDGE CASES
// ============================================================================

#[test]
fn test_registry_overwrite_replaces_decoder() {
    #[derive(Debug)]
    struct AltPing;

    impl Packet for AltPing {
        const ID: i32 = Ping::ID;

        fn decode(_cursor: &mut ByteCursor<'_>) -> gamewire::error::Result<Self> {
            Ok(Self)
        }

        fn encode(&self, _buf: &mut BytesMut) -> gamewire::error::Result<usize> {
            Ok(0)
        }

        fn encoded_len(&self) -> usize {
            0
        }
    }

    let mut registry = PacketRegistry::default();
    registry.register::<Ping>().register::<AltPing>();
    assert_eq!(registry.len(), 1);

    let prepared = registry.prepare();
    let entry = prepared.get(Ping::ID).unwrap();
    assert!(entry.name().contains("AltPing"));
}

#[test]
fn test_registry_unregister_removes_id() {
    let mut registry = builtin_registry();
    assert!(registry.contains(Ping::ID));

    assert!(registry.unregister(Ping::ID));
    assert!(!registry.contains(Ping::ID));
    assert!(!registry.unregister(Ping::ID));
}

#[test]
fn test_prepared_snapshot_ignores_later_registrations() {
    let mut registry = PacketRegistry::default();
    registry.register::<Ping>();

    let snapshot = registry.prepare();
    registry.register::<Pong>();

    assert!(snapshot.contains(Ping::ID));
    assert!(!snapshot.contains(Pong::ID));
    assert!(registry.contains(Pong::ID));
}
