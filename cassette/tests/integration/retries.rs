use assert_matches::assert_matches;
use cassette::{Connection, DbError, QueryError};
use cassette_cql::frame::Opcode;

use crate::utils::{
    error_body, expect_execute, expect_prepare, prepared_body, read_request, respond,
    setup_tracing, void_body, StubServer,
};

const WRITE_TIMEOUT: i32 = 0x1100;
const UNAVAILABLE: i32 = 0x1000;

/// Answers a PREPARE, then fails the first `failures` EXECUTEs with
/// `code` before answering VOID. Returns how many EXECUTEs were received.
async fn run_flaky_server(server: StubServer, code: i32, failures: usize) -> usize {
    let (mut stream, _) = server.accept_ready().await;
    expect_prepare(&mut stream).await;
    respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;

    let mut attempts = 0;
    while let Some((opcode, _)) = read_request(&mut stream).await {
        assert_eq!(opcode, Opcode::Execute);
        attempts += 1;
        if attempts <= failures {
            respond(&mut stream, Opcode::Error, &error_body(code, "flaky")).await;
        } else {
            respond(&mut stream, Opcode::Result, &void_body()).await;
        }
    }
    attempts
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn transient_errors_are_retried() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();
    let server_task = tokio::spawn(run_flaky_server(server, WRITE_TIMEOUT, 2));

    let mut connection = Connection::open(&format!("{} retries=2", addr))
        .await
        .unwrap();
    let prepared = connection.prepare("UPDATE t SET a = 1").await.unwrap();
    connection.execute(&prepared, &[]).await.unwrap();
    drop(connection);

    assert_eq!(server_task.await.unwrap(), 3);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn retry_budget_is_bounded() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();
    let server_task = tokio::spawn(run_flaky_server(server, WRITE_TIMEOUT, usize::MAX));

    let mut connection = Connection::open(&format!("{} retries=1", addr))
        .await
        .unwrap();
    let prepared = connection.prepare("UPDATE t SET a = 1").await.unwrap();
    assert_matches!(
        connection.execute(&prepared, &[]).await,
        Err(QueryError::DbError(DbError::WriteTimeout, reason)) if reason == "flaky"
    );
    // A server error leaves the stream in sync.
    assert!(!connection.is_closed());
    drop(connection);

    assert_eq!(server_task.await.unwrap(), 2);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn no_retries_by_default() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();
    let server_task = tokio::spawn(run_flaky_server(server, WRITE_TIMEOUT, 1));

    let mut connection = Connection::open(&addr.to_string()).await.unwrap();
    let prepared = connection.prepare("UPDATE t SET a = 1").await.unwrap();
    assert_matches!(
        connection.execute(&prepared, &[]).await,
        Err(QueryError::DbError(DbError::WriteTimeout, _))
    );
    drop(connection);

    assert_eq!(server_task.await.unwrap(), 1);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn permanent_errors_are_not_retried() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();
    let server_task = tokio::spawn(run_flaky_server(server, UNAVAILABLE, 1));

    let mut connection = Connection::open(&format!("{} retries=-1", addr))
        .await
        .unwrap();
    let prepared = connection.prepare("UPDATE t SET a = 1").await.unwrap();
    assert_matches!(
        connection.execute(&prepared, &[]).await,
        Err(QueryError::DbError(DbError::Unavailable, _))
    );
    drop(connection);

    assert_eq!(server_task.await.unwrap(), 1);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn prepare_is_retried_too() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(&mut stream, Opcode::Error, &error_body(0x1001, "busy")).await;
        assert_eq!(expect_prepare(&mut stream).await, "SELECT a FROM t");
        respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;
        expect_execute(&mut stream).await;
        respond(&mut stream, Opcode::Error, &error_body(0x1200, "slow")).await;
        expect_execute(&mut stream).await;
        respond(&mut stream, Opcode::Result, &void_body()).await;
    });

    let mut connection = Connection::open(&format!("{} retries=0x10", addr))
        .await
        .unwrap();
    let prepared = connection.prepare("SELECT a FROM t").await.unwrap();
    connection.execute(&prepared, &[]).await.unwrap();

    server_task.await.unwrap();
}
