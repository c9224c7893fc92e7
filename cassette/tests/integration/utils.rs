use std::net::SocketAddr;

use cassette_cql::frame::request::{DeserializableRequest, Execute, Prepare, Startup};
use cassette_cql::frame::types;
use cassette_cql::frame::{write_response_frame, Opcode, HEADER_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

pub(crate) fn setup_tracing() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(tracing_subscriber::fmt::TestWriter::new())
        .try_init();
}

/// Reads one request frame. Returns `None` if the client closed the
/// connection before sending anything.
pub(crate) async fn read_request(
    stream: &mut (impl AsyncRead + Unpin),
) -> Option<(Opcode, Vec<u8>)> {
    let mut header = [0u8; HEADER_SIZE];
    match stream.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return None,
        Err(err) => panic!("failed to read request header: {}", err),
    }
    assert_eq!(header[0], 0x01, "not a request frame: {:?}", header);
    assert_eq!(header[1], 0x00, "requests are never compressed");
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.unwrap();
    Some((Opcode::try_from(header[3]).unwrap(), body))
}

pub(crate) async fn respond(stream: &mut (impl AsyncWrite + Unpin), opcode: Opcode, body: &[u8]) {
    write_response_frame(stream, opcode, body, None)
        .await
        .unwrap();
}

pub(crate) async fn expect_startup(stream: &mut (impl AsyncRead + Unpin)) -> Startup<'static> {
    let (opcode, body) = read_request(stream).await.expect("no STARTUP");
    assert_eq!(opcode, Opcode::Startup);
    Startup::deserialize(&mut &body[..]).unwrap()
}

pub(crate) async fn expect_prepare(stream: &mut (impl AsyncRead + Unpin)) -> String {
    let (opcode, body) = read_request(stream).await.expect("no PREPARE");
    assert_eq!(opcode, Opcode::Prepare);
    Prepare::deserialize(&mut &body[..])
        .unwrap()
        .query
        .into_owned()
}

pub(crate) async fn expect_execute(stream: &mut (impl AsyncRead + Unpin)) -> Execute<'static> {
    let (opcode, body) = read_request(stream).await.expect("no EXECUTE");
    assert_eq!(opcode, Opcode::Execute);
    Execute::deserialize(&mut &body[..]).unwrap()
}

/// Accepts connections on a random local port.
pub(crate) struct StubServer {
    listener: TcpListener,
}

impl StubServer {
    pub(crate) async fn bind() -> StubServer {
        StubServer {
            listener: TcpListener::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        self.listener.local_addr().unwrap()
    }

    /// Accepts one connection and answers its STARTUP with READY.
    pub(crate) async fn accept_ready(&self) -> (TcpStream, Startup<'static>) {
        let (mut stream, _) = self.listener.accept().await.unwrap();
        let startup = expect_startup(&mut stream).await;
        respond(&mut stream, Opcode::Ready, &[]).await;
        (stream, startup)
    }
}

pub(crate) fn error_body(code: i32, message: &str) -> Vec<u8> {
    let mut body = Vec::new();
    types::write_int(code, &mut body);
    types::write_string(message, &mut body).unwrap();
    body
}

pub(crate) fn void_body() -> Vec<u8> {
    let mut body = Vec::new();
    types::write_int(0x0001, &mut body);
    body
}

pub(crate) fn set_keyspace_body(keyspace: &str) -> Vec<u8> {
    let mut body = Vec::new();
    types::write_int(0x0003, &mut body);
    types::write_string(keyspace, &mut body).unwrap();
    body
}

fn write_metadata(columns: &[(&str, u16)], body: &mut Vec<u8>) {
    types::write_int(0x0001, body);
    types::write_int(columns.len() as i32, body);
    types::write_string("ks", body).unwrap();
    types::write_string("t", body).unwrap();
    for (name, typ) in columns {
        types::write_string(name, body).unwrap();
        types::write_short(*typ, body);
    }
}

pub(crate) fn prepared_body(id: &[u8], columns: &[(&str, u16)]) -> Vec<u8> {
    let mut body = Vec::new();
    types::write_int(0x0004, &mut body);
    types::write_short_bytes(id, &mut body).unwrap();
    write_metadata(columns, &mut body);
    body
}

pub(crate) fn rows_body(columns: &[(&str, u16)], rows: &[Vec<Option<&[u8]>>]) -> Vec<u8> {
    let mut body = Vec::new();
    types::write_int(0x0002, &mut body);
    write_metadata(columns, &mut body);
    types::write_int(rows.len() as i32, &mut body);
    for row in rows {
        for cell in row {
            match cell {
                Some(cell) => types::write_bytes(cell, &mut body).unwrap(),
                None => types::write_int(-1, &mut body),
            }
        }
    }
    body
}

pub(crate) const INT: u16 = 0x0009;
pub(crate) const VARCHAR: u16 = 0x000D;
