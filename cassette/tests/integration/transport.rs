use assert_matches::assert_matches;
use cassette::frame::frame_errors::FrameError;
use cassette::frame::Opcode;
use cassette::{Connection, ConnectionConfig, QueryError};
use cassette_cql::frame::{HEADER_SIZE, MAX_FRAME_BODY_SIZE};
use std::io::ErrorKind;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::utils::{read_request, respond, setup_tracing};

/// Opens a connection over an in-memory pipe. READY is queued before the
/// handshake starts, so no server task is needed.
async fn connected(max_buf_size: usize) -> (Connection<DuplexStream>, DuplexStream) {
    let (client, mut server) = tokio::io::duplex(max_buf_size);
    respond(&mut server, Opcode::Ready, &[]).await;
    let connection = Connection::open_stream(client, &ConnectionConfig::default())
        .await
        .unwrap();
    let (opcode, _) = read_request(&mut server).await.unwrap();
    assert_eq!(opcode, Opcode::Startup);
    (connection, server)
}

/// Answers every request with a frame of the same opcode whose body has
/// the same length, filled with zeroes. Request bodies are streamed
/// through, so frames of any size fit in a small pipe.
async fn zero_filling_server(server: DuplexStream) {
    let (mut reader, mut writer) = tokio::io::split(server);
    loop {
        let mut header = [0u8; HEADER_SIZE];
        if reader.read_exact(&mut header).await.is_err() {
            return;
        }
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as u64;
        tokio::io::copy(&mut (&mut reader).take(len), &mut tokio::io::sink())
            .await
            .unwrap();

        header[0] = 0x81;
        writer.write_all(&header).await.unwrap();
        tokio::io::copy(&mut tokio::io::repeat(0).take(len), &mut writer)
            .await
            .unwrap();
        writer.flush().await.unwrap();
    }
}

#[tokio::test]
#[ntest::timeout(120000)]
async fn loopback_round_trip() {
    setup_tracing();
    let (mut connection, server) = connected(1 << 20).await;
    let server_task = tokio::spawn(zero_filling_server(server));

    for len in [0, 1, MAX_FRAME_BODY_SIZE - 1] {
        let body = vec![0u8; len];
        connection.send(Opcode::Options, &body).await.unwrap();
        drop(body);

        let (opcode, received) = connection.recv().await.unwrap();
        assert_eq!(opcode, Opcode::Options);
        assert_eq!(received.len(), len);
        assert!(received.iter().all(|b| *b == 0));
    }

    drop(connection);
    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn request_bodies_are_sent_verbatim() {
    setup_tracing();
    let (mut connection, mut server) = connected(4096).await;

    connection.send(Opcode::Query, b"\x00\x01abc").await.unwrap();
    let (opcode, body) = read_request(&mut server).await.unwrap();
    assert_eq!(opcode, Opcode::Query);
    assert_eq!(body, b"\x00\x01abc");

    respond(&mut server, Opcode::Result, b"\x00\x00\x00\x01").await;
    let (opcode, body) = connection.recv().await.unwrap();
    assert_eq!(opcode, Opcode::Result);
    assert_eq!(&body[..], b"\x00\x00\x00\x01");
}

/// Feeds `bytes` to a fresh connection and checks that receiving fails
/// and leaves the connection closed.
async fn assert_recv_closes(bytes: &[u8], check: impl FnOnce(&QueryError)) {
    let (mut connection, mut server) = connected(4096).await;
    server.write_all(bytes).await.unwrap();
    drop(server);

    let err = connection.recv().await.unwrap_err();
    check(&err);
    assert!(connection.is_closed());
    assert_matches!(connection.recv().await, Err(QueryError::BrokenConnection));
    assert_matches!(
        connection.send(Opcode::Options, &[]).await,
        Err(QueryError::BrokenConnection)
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn malformed_frames_close_the_connection() {
    setup_tracing();

    // A request frame, as if the peer were a client.
    assert_recv_closes(&[0x01, 0, 0, 0x02, 0, 0, 0, 0], |err| {
        assert_matches!(err, QueryError::FrameError(e) if matches!(**e, FrameError::NotAResponse(0x01)));
    })
    .await;

    assert_recv_closes(&[0x81, 0x02, 0, 0x02, 0, 0, 0, 0], |err| {
        assert_matches!(err, QueryError::FrameError(e) if matches!(**e, FrameError::UnsupportedFlags(0x02)));
    })
    .await;

    assert_recv_closes(&[0x81, 0, 0, 0x0B, 0, 0, 0, 0], |err| {
        assert_matches!(err, QueryError::FrameError(e) if matches!(**e, FrameError::UnknownOpcode(_)));
    })
    .await;

    assert_recv_closes(&[0x81, 0, 0, 0x08, 0x10, 0, 0, 0x01], |err| {
        assert_matches!(err, QueryError::FrameError(e) if matches!(**e, FrameError::FrameTooLarge(0x1000_0001)));
    })
    .await;

    // The body is cut short by the peer hanging up.
    assert_recv_closes(&[0x81, 0, 0, 0x08, 0, 0, 0, 0x0A, 1, 2, 3], |err| {
        assert_matches!(err, QueryError::IoError(e) if e.kind() == ErrorKind::UnexpectedEof);
    })
    .await;

    // A truncated header.
    assert_recv_closes(&[0x81, 0], |err| {
        assert_matches!(err, QueryError::IoError(e) if e.kind() == ErrorKind::UnexpectedEof);
    })
    .await;
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn compressed_frame_without_negotiation_is_passed_through() {
    setup_tracing();
    let (mut connection, mut server) = connected(4096).await;

    server
        .write_all(&[0x81, 0x01, 0, 0x08, 0, 0, 0, 0x02, 0xCA, 0xFE])
        .await
        .unwrap();
    let (opcode, body) = connection.recv().await.unwrap();
    assert_eq!(opcode, Opcode::Result);
    assert_eq!(&body[..], &[0xCA, 0xFE]);
    assert!(!connection.is_closed());
}
