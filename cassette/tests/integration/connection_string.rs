use assert_matches::assert_matches;
use cassette::errors::ConnectionStringError;
use cassette::frame::types::UnknownConsistency;
use cassette::{Connection, ConnectionConfig, Consistency, QueryError};
use tokio::net::TcpListener;

use crate::utils::{setup_tracing, StubServer};

#[tokio::test]
#[ntest::timeout(10000)]
async fn bad_connection_strings_fail_before_connecting() {
    setup_tracing();

    assert_matches!(
        Connection::open("127.0.0.1 Consistency").await,
        Err(QueryError::ConnectionString(ConnectionStringError::MissingEquals(option))) if option == "Consistency"
    );
    assert_matches!(
        Connection::open("127.0.0.1 consistency=most").await,
        Err(QueryError::ConnectionString(ConnectionStringError::UnknownConsistency(
            UnknownConsistency(value)
        ))) if value == "most"
    );
    assert_matches!(
        Connection::open("127.0.0.1 timeout=1s").await,
        Err(QueryError::ConnectionString(ConnectionStringError::UnsupportedOption(_)))
    );
    assert_matches!(
        Connection::open(" keyspace=shop").await,
        Err(QueryError::ConnectionString(ConnectionStringError::NoHosts))
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn unreachable_hosts_report_the_connect_error() {
    setup_tracing();
    // Grab a free port, then release it so nothing listens there.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    assert_matches!(
        Connection::open(&addr.to_string()).await,
        Err(QueryError::IoError(_))
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn any_reachable_host_is_used() {
    setup_tracing();
    let dead = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let server = StubServer::bind().await;
    let alive = server.addr();
    let server_task = tokio::spawn(async move {
        server.accept_ready().await;
    });

    let connection = Connection::open(&format!("{},{}", dead, alive))
        .await
        .unwrap();
    assert!(!connection.is_closed());

    server_task.await.unwrap();
}

#[test]
fn consistency_names_round_trip() {
    for consistency in Consistency::ALL {
        let name = consistency.as_str();
        assert_eq!(name.parse::<Consistency>().unwrap(), consistency);
        assert_eq!(name.to_uppercase().parse::<Consistency>().unwrap(), consistency);

        let config: ConnectionConfig = format!("localhost consistency={}", name).parse().unwrap();
        assert_eq!(config.read_consistency, consistency);
        assert_eq!(config.write_consistency, consistency);
    }
}
