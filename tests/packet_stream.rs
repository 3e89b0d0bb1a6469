//! End-to-end tests for typed packet streams over an in-memory duplex
//! transport: write/flush/read cycles, unknown-id passthrough, cancellation,
//! and teardown behavior.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use gamewire::config::CodecConfig;
use gamewire::core::packet::{AnyPacket, Packet, UnknownPacket};
use gamewire::core::varint::VarInt;
use gamewire::error::ProtocolError;
use gamewire::protocol::messages::{
    builtin_registry, Disconnect, Handshake, KeepAlive, Ping, Pong, StatusRequest, StatusResponse,
};
use gamewire::protocol::stream::PacketStream;
use tokio::io::DuplexStream;

fn stream_pair() -> (PacketStream<DuplexStream>, PacketStream<DuplexStream>) {
    stream_pair_with(CodecConfig::default(), 64 * 1024)
}

fn stream_pair_with(
    config: CodecConfig,
    transport_capacity: usize,
) -> (PacketStream<DuplexStream>, PacketStream<DuplexStream>) {
    let registry = builtin_registry().prepare();
    let (client_io, server_io) = tokio::io::duplex(transport_capacity);
    let client = PacketStream::new(client_io, registry.clone(), config.clone());
    let server = PacketStream::new(server_io, registry, config);
    (client, server)
}

#[tokio::test]
async fn test_typed_packet_roundtrip() {
    let (mut client, mut server) = stream_pair();

    let sent = Handshake {
        protocol_version: 770,
        server_address: "play.example.net".to_string(),
        server_port: 25565,
        next_state: 2,
    };
    client.write_packet(&sent).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());

    let got = server
        .read_as::<Handshake>()
        .await
        .unwrap()
        .ready()
        .expect("read should not be canceled");
    assert_eq!(got, sent);
}

#[tokio::test]
async fn test_read_any_yields_typed_carrier() {
    let (mut client, mut server) = stream_pair();

    client.write_packet(&Ping { nonce: 998877 }).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());

    let packet = server
        .read_any()
        .await
        .unwrap()
        .ready()
        .expect("read should not be canceled");
    assert_eq!(packet.id(), Ping::ID);
    assert!(packet.is::<Ping>());
    assert!(!packet.is_unknown());
    assert_eq!(packet.downcast_ref::<Ping>().unwrap().nonce, 998877);
}

#[tokio::test]
async fn test_unknown_id_passes_through_and_relays_verbatim() {
    let (mut client, mut server) = stream_pair();

    // 0x77 is not in the builtin registry.
    let raw = UnknownPacket {
        id: VarInt(0x77),
        payload: Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]),
    };
    client.write_any(&AnyPacket::unknown(raw.clone())).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());

    let packet = server
        .read_any()
        .await
        .unwrap()
        .ready()
        .expect("read should not be canceled");
    assert!(packet.is_unknown());
    let captured = packet.as_unknown().unwrap();
    assert_eq!(captured, &raw);

    // Relay it back untouched; the client should see an identical body.
    server.write_any(&packet).unwrap();
    assert!(!server.flush().await.unwrap().is_canceled());

    let relayed = client
        .read_any()
        .await
        .unwrap()
        .ready()
        .expect("read should not be canceled");
    assert_eq!(relayed.as_unknown().unwrap(), &raw);
}

#[tokio::test]
async fn test_read_as_with_wrong_id_reports_desync() {
    let (mut client, mut server) = stream_pair();

    client.write_packet(&StatusRequest).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());

    let err = server.read_as::<StatusResponse>().await.unwrap_err();
    match err {
        ProtocolError::UnexpectedPacketId { expected, got } => {
            assert_eq!(expected, 0x02);
            assert_eq!(got, 0x01);
        }
        other => panic!("Unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancellation_resolves_pending_read() {
    let (_client, mut server) = stream_pair();

    let token = server.cancellation_token();
    let reader = tokio::spawn(async move { server.read_any().await });

    token.cancel();
    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), reader)
        .await
        .expect("canceled read must resolve promptly")
        .unwrap()
        .unwrap();
    assert!(outcome.is_canceled());
}

#[tokio::test]
async fn test_cancellation_resolves_blocked_flush() {
    // Transport too small for the staged frame and nobody reading: the
    // flush parks, then the token fires.
    let (mut client, _server) = stream_pair_with(CodecConfig::default(), 16);

    client
        .write_packet(&Disconnect {
            reason: "server restarting, come back in five minutes".to_string(),
        })
        .unwrap();

    let token = client.cancellation_token();
    let flusher = tokio::spawn(async move { client.flush().await });

    token.cancel();
    let outcome = flusher.await.unwrap().unwrap();
    assert!(outcome.is_canceled());
}

#[tokio::test]
async fn test_close_is_idempotent_and_poisons_io() {
    let (mut client, _server) = stream_pair();

    client.write_packet(&KeepAlive { id: 1 }).unwrap();
    client.close().await.unwrap();
    assert!(client.is_closed());

    // Second close is a no-op.
    client.close().await.unwrap();

    assert!(matches!(
        client.read_any().await.unwrap_err(),
        ProtocolError::ConnectionClosed
    ));
    assert!(matches!(
        client.write_packet(&Ping { nonce: 1 }).unwrap_err(),
        ProtocolError::ConnectionClosed
    ));
    assert!(matches!(
        client.flush().await.unwrap_err(),
        ProtocolError::ConnectionClosed
    ));
}

#[tokio::test]
async fn test_peer_disconnect_surfaces_connection_closed() {
    let (client, mut server) = stream_pair();

    drop(client);
    let err = server.read_any().await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn test_writes_batch_until_flush() {
    let (mut client, mut server) = stream_pair();

    client.write_packet(&Ping { nonce: 1 }).unwrap();
    client.write_packet(&KeepAlive { id: 2 }).unwrap();
    client.write_packet(&Pong { nonce: 3 }).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());

    let first = server.read_as::<Ping>().await.unwrap().ready().unwrap();
    assert_eq!(first.nonce, 1);
    let second = server.read_as::<KeepAlive>().await.unwrap().ready().unwrap();
    assert_eq!(second.id, 2);
    let third = server.read_as::<Pong>().await.unwrap().ready().unwrap();
    assert_eq!(third.nonce, 3);
}

#[tokio::test]
async fn test_status_exchange_sequence() {
    let (mut client, mut server) = stream_pair();

    client.write_packet(&StatusRequest).unwrap();
    client.write_packet(&Ping { nonce: 42 }).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());

    let _request = server
        .read_as::<StatusRequest>()
        .await
        .unwrap()
        .ready()
        .unwrap();
    server
        .write_packet(&StatusResponse {
            payload: r#"{"players":{"online":3,"max":20}}"#.to_string(),
        })
        .unwrap();

    let ping = server.read_as::<Ping>().await.unwrap().ready().unwrap();
    server.write_packet(&Pong { nonce: ping.nonce }).unwrap();
    assert!(!server.flush().await.unwrap().is_canceled());

    let status = client
        .read_as::<StatusResponse>()
        .await
        .unwrap()
        .ready()
        .unwrap();
    assert!(status.payload.contains("online"));
    let pong = client.read_as::<Pong>().await.unwrap().ready().unwrap();
    assert_eq!(pong.nonce, 42);
}

#[tokio::test]
async fn test_oversized_outbound_packet_rejected_before_staging() {
    let config = CodecConfig {
        max_frame_len: 32,
        ..CodecConfig::default()
    };
    let (mut client, _server) = stream_pair_with(config, 1024);

    let err = client
        .write_packet(&Disconnect {
            reason: "x".repeat(100),
        })
        .unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedFrame { .. }));

    // The stream stays usable for frames that fit.
    client.write_packet(&Ping { nonce: 5 }).unwrap();
    assert!(!client.flush().await.unwrap().is_canceled());
}
