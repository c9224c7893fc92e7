use assert_matches::assert_matches;
use bytes::Bytes;
use cassette::serialize::Value;
use cassette::value::{CqlValue, NativeCodec};
use cassette::{Connection, Consistency, DbError, QueryError};
use cassette_cql::frame::Opcode;

use crate::utils::{
    error_body, expect_execute, expect_prepare, prepared_body, read_request, respond,
    rows_body, set_keyspace_body, setup_tracing, void_body, StubServer, INT, VARCHAR,
};

#[tokio::test]
#[ntest::timeout(10000)]
async fn prepare_query_and_read_rows() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, startup) = server.accept_ready().await;
        assert_eq!(startup.get("CQL_VERSION"), Some("3.0.0"));
        assert_eq!(startup.get("COMPRESSION"), None);

        assert_eq!(expect_prepare(&mut stream).await, "SELECT a,b FROM t");
        let columns = [("a", INT), ("b", INT)];
        respond(&mut stream, Opcode::Result, &prepared_body(&[0xBE, 0xEF], &columns)).await;

        let execute = expect_execute(&mut stream).await;
        assert_eq!(&execute.id[..], &[0xBE, 0xEF]);
        assert_eq!(execute.consistency, Consistency::Quorum);
        assert!(execute.values.is_empty());
        let rows = rows_body(
            &[("a", INT), ("b", INT)],
            &[vec![None, Some(&[0, 0, 0, 1])]],
        );
        respond(&mut stream, Opcode::Result, &rows).await;

        // The client hangs up.
        assert!(read_request(&mut stream).await.is_none());
    });

    let mut connection = Connection::open(&format!("{} consistency=quorum", addr))
        .await
        .unwrap();
    let prepared = connection.prepare("SELECT a,b FROM t").await.unwrap();
    assert_eq!(prepared.col_count(), 2);
    assert_eq!(prepared.col_names().collect::<Vec<_>>(), vec!["a", "b"]);

    let mut rows = connection.query(&prepared, &[]).await.unwrap();
    assert_eq!(rows.columns(), vec!["a", "b"]);
    assert_eq!(rows.rows_num(), 1);
    assert_eq!(
        rows.next_row().unwrap(),
        Some(vec![None, Some(CqlValue::Int(1))])
    );
    assert_eq!(rows.next_row().unwrap(), None);

    connection.close().unwrap();
    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn execute_bound_values() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;

        expect_prepare(&mut stream).await;
        let columns = [("id", INT), ("name", VARCHAR)];
        respond(&mut stream, Opcode::Result, &prepared_body(&[7], &columns)).await;

        let execute = expect_execute(&mut stream).await;
        // Writes use the write consistency.
        assert_eq!(execute.consistency, Consistency::All);
        assert_eq!(
            execute.values.to_vec(),
            vec![
                Value::Bytes(Bytes::from_static(&[0, 0, 0, 42])),
                Value::Bytes(Bytes::from_static(b"socks")),
            ]
        );
        respond(&mut stream, Opcode::Result, &void_body()).await;
    });

    let mut connection = Connection::open(&format!(
        "{} readconsistency=one writeconsistency=all",
        addr
    ))
    .await
    .unwrap();
    let prepared = connection
        .prepare("INSERT INTO t (id, name) VALUES (?, ?)")
        .await
        .unwrap();
    assert_eq!(prepared.col_names().collect::<Vec<_>>(), vec!["id", "name"]);

    let values = prepared
        .bind(
            vec![
                CqlValue::Int(42).into(),
                CqlValue::Text("socks".to_owned()).into(),
            ],
            &NativeCodec,
        )
        .unwrap();
    connection.execute(&prepared, &values).await.unwrap();

    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn unencoded_values_are_rejected_before_sending() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(&mut stream, Opcode::Result, &prepared_body(&[7], &[("id", INT)])).await;
        assert!(read_request(&mut stream).await.is_none());
    });

    let mut connection = Connection::open(&addr.to_string()).await.unwrap();
    let prepared = connection
        .prepare("DELETE FROM t WHERE id = ?")
        .await
        .unwrap();
    assert_matches!(
        connection
            .execute(&prepared, &[Value::Cql(CqlValue::Int(1))])
            .await,
        Err(QueryError::BadQuery(err)) if err.column_index == 0
    );
    assert!(!connection.is_closed());

    drop(connection);
    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn use_keyspace_on_open() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        assert_eq!(expect_prepare(&mut stream).await, "USE shop");
        respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;
        let execute = expect_execute(&mut stream).await;
        assert_eq!(execute.consistency, Consistency::Two);
        respond(&mut stream, Opcode::Result, &set_keyspace_body("shop")).await;
    });

    let connection = Connection::open(&format!("{} Keyspace=shop WriteConsistency=two", addr))
        .await
        .unwrap();
    assert_eq!(connection.get_write_consistency(), Consistency::Two);
    assert_eq!(connection.get_read_consistency(), Consistency::One);

    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn unexpected_result_kind_closes_the_connection() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(&mut stream, Opcode::Result, &void_body()).await;
        // Nothing else is sent on a connection out of sync.
        assert!(read_request(&mut stream).await.is_none());
    });

    let mut connection = Connection::open(&addr.to_string()).await.unwrap();
    assert_matches!(
        connection.prepare("SELECT a FROM t").await,
        Err(QueryError::UnexpectedResponse {
            expected: "RESULT:Prepared",
            received: "RESULT:Void"
        })
    );
    assert!(connection.is_closed());
    assert_matches!(
        connection.prepare("SELECT a FROM t").await,
        Err(QueryError::BrokenConnection)
    );

    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn rows_expected_but_not_returned() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;
        expect_execute(&mut stream).await;
        respond(&mut stream, Opcode::Result, &void_body()).await;
        assert!(read_request(&mut stream).await.is_none());
    });

    let mut connection = Connection::open(&addr.to_string()).await.unwrap();
    let prepared = connection.prepare("UPDATE t SET a = 1").await.unwrap();
    assert_matches!(
        connection.query(&prepared, &[]).await,
        Err(QueryError::UnexpectedResponse {
            expected: "RESULT:Rows",
            received: "RESULT:Void"
        })
    );
    assert!(connection.is_closed());
    assert_matches!(
        connection.execute(&prepared, &[]).await,
        Err(QueryError::BrokenConnection)
    );

    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn server_errors_keep_the_connection() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(
            &mut stream,
            Opcode::Error,
            &error_body(0x2000, "line 1:0 no viable alternative at input 'SELEC'"),
        )
        .await;
        assert_eq!(expect_prepare(&mut stream).await, "SELECT a FROM t");
        respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;
    });

    let mut connection = Connection::open(&addr.to_string()).await.unwrap();
    assert_matches!(
        connection.prepare("SELEC a FROM t").await,
        Err(QueryError::DbError(DbError::SyntaxError, reason)) if reason.starts_with("line 1:0")
    );
    assert!(!connection.is_closed());
    connection.prepare("SELECT a FROM t").await.unwrap();

    server_task.await.unwrap();
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn statements_run_through_a_transaction() {
    setup_tracing();
    let server = StubServer::bind().await;
    let addr = server.addr();

    let server_task = tokio::spawn(async move {
        let (mut stream, _) = server.accept_ready().await;
        expect_prepare(&mut stream).await;
        respond(&mut stream, Opcode::Result, &prepared_body(&[1], &[])).await;
        expect_execute(&mut stream).await;
        respond(&mut stream, Opcode::Result, &void_body()).await;
    });

    let mut connection = Connection::open(&addr.to_string()).await.unwrap();
    let mut transaction = connection.begin().unwrap();
    let prepared = transaction.prepare("TRUNCATE t").await.unwrap();
    transaction.execute(&prepared, &[]).await.unwrap();
    transaction.commit().unwrap();

    server_task.await.unwrap();
}
