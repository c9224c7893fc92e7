use std::time::Duration;

use assert_matches::assert_matches;
use cassette::{Connection, QueryError};
use cassette_cql::frame::Opcode;

use crate::utils::{
    expect_prepare, prepared_body, read_request, respond, setup_tracing, StubServer,
};

#[tokio::test]
#[ntest::timeout(10000)]
async fn connection_is_closed_after_its_lifetime() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        // Nothing is sent once the lifetime is over.
        assert!(read_request(&mut stream).await.is_none());
    });

    let mut connection = Connection::open(&format!("{} recycle=1ms", addr))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;

    assert_matches!(
        connection.prepare("SELECT a FROM t").await,
        Err(QueryError::BrokenConnection)
    );
    assert!(connection.is_closed());
    assert_matches!(connection.begin(), Err(QueryError::BrokenConnection));
    assert_matches!(connection.commit(), Err(QueryError::BrokenConnection));
    assert_matches!(connection.close(), Err(QueryError::BrokenConnection));

    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn connection_is_usable_within_its_lifetime() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;
    });

    let mut connection = Connection::open(&format!("{} recycle=1h30m", addr))
        .await
        .unwrap();
    connection.prepare("SELECT a FROM t").await.unwrap();
    assert!(!connection.is_closed());

    server_task.await.unwrap();
}
