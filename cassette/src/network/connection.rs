use std::borrow::Cow;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cassette_cql::frame::request::{Execute, Prepare, Startup};
use cassette_cql::frame::response::{self, result, Response};
use cassette_cql::frame::{
    parse_response_body, read_response_frame, Compression, Opcode, SerializedRequest,
};
use cassette_cql::serialize::Value;
use cassette_cql::Consistency;
use rand::seq::SliceRandom;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::config::ConnectionConfig;
use crate::errors::{ConnectionStringError, HandshakeError, QueryError};
use crate::policies::retry::{send_with_retries, DefaultRetryPolicy, FrameTransport, RetryPolicy};
use crate::response::result_set::ResultSet;
use crate::statement::prepared::PreparedStatement;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A single connection to a node, speaking the CQL native protocol v1.
///
/// Requests are strictly sequential: each one waits for its response
/// before the next can be sent. Any failure that leaves the byte stream
/// in an unknown state closes the connection, after which every operation
/// fails with [QueryError::BrokenConnection].
///
/// `S` is the transport, a TCP stream unless the connection was set up
/// with [Connection::open_stream].
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: Option<S>,
    id: u64,
    compression: Option<Compression>,
    read_consistency: Consistency,
    write_consistency: Consistency,
    recycle_deadline: Option<Instant>,
    retry_policy: Arc<dyn RetryPolicy>,
}

impl Connection {
    /// Connects to one of the hosts of the connection string and
    /// performs the handshake.
    ///
    /// See [ConnectionConfig] for the syntax.
    pub async fn open(name: &str) -> Result<Connection, QueryError> {
        let config: ConnectionConfig = name.parse()?;
        Self::open_with_config(&config).await
    }

    /// Like [Connection::open], with the connection string already parsed.
    pub async fn open_with_config(config: &ConnectionConfig) -> Result<Connection, QueryError> {
        let recycle_deadline = config.recycle.map(|lifetime| Instant::now() + lifetime);
        let stream = connect_any(&config.hosts).await?;
        Self::setup(stream, config, recycle_deadline).await
    }
}

/// Tries the hosts in random order, returning the first stream that
/// connects or the last error.
async fn connect_any(hosts: &[String]) -> Result<TcpStream, QueryError> {
    let mut hosts: Vec<&str> = hosts.iter().map(String::as_str).collect();
    hosts.shuffle(&mut rand::rng());

    let mut last_error = None;
    for host in hosts {
        debug!("Connecting to {}", host);
        match TcpStream::connect(host).await {
            Ok(stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    debug!("Failed to set TCP_NODELAY on connection to {}: {}", host, err);
                }
                return Ok(stream);
            }
            Err(err) => {
                debug!("Failed to connect to {}: {}", host, err);
                last_error = Some(err);
            }
        }
    }

    Err(match last_error {
        Some(err) => err.into(),
        None => ConnectionStringError::NoHosts.into(),
    })
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Performs the handshake over an already established transport.
    ///
    /// The hosts of `config` are not used.
    pub async fn open_stream(stream: S, config: &ConnectionConfig) -> Result<Self, QueryError> {
        let recycle_deadline = config.recycle.map(|lifetime| Instant::now() + lifetime);
        Self::setup(stream, config, recycle_deadline).await
    }

    async fn setup(
        stream: S,
        config: &ConnectionConfig,
        recycle_deadline: Option<Instant>,
    ) -> Result<Self, QueryError> {
        let mut connection = Connection {
            stream: Some(stream),
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            compression: config.compression,
            read_consistency: config.read_consistency,
            write_consistency: config.write_consistency,
            recycle_deadline,
            retry_policy: Arc::new(DefaultRetryPolicy::new(config.retries)),
        };

        connection.startup(&config.cql_version).await?;
        debug!(
            "[{}] Connection ready (CQL {}, compression: {:?})",
            connection.id, config.cql_version, connection.compression
        );

        if let Some(keyspace) = &config.keyspace {
            connection.use_keyspace(keyspace).await?;
        }

        Ok(connection)
    }

    async fn startup(&mut self, cql_version: &str) -> Result<(), QueryError> {
        let compression = self.compression.map(|compression| compression.as_str());
        let request = SerializedRequest::make(&Startup::new(cql_version, compression))?;
        self.write_request(&request).await?;

        match self.recv().await {
            Ok((Opcode::Ready, _)) => Ok(()),
            Ok((opcode, _)) => Err(QueryError::HandshakeFailed(
                HandshakeError::UnexpectedResponse(opcode.as_str()),
            )),
            Err(QueryError::DbError(db_error, reason)) => Err(QueryError::HandshakeFailed(
                HandshakeError::DbError(db_error, reason),
            )),
            Err(err) => Err(err),
        }
    }

    async fn use_keyspace(&mut self, keyspace: &str) -> Result<(), QueryError> {
        // Keyspace names cannot be bound, the statement is built as text.
        let prepared = self.prepare(&format!("USE {}", keyspace)).await?;
        self.execute(&prepared, &[]).await?;
        debug!("[{}] Using keyspace {}", self.id, keyspace);
        Ok(())
    }

    /// Process-unique id of this connection.
    pub fn get_id(&self) -> u64 {
        self.id
    }

    /// Compression requested in the handshake, if any.
    pub fn get_compression(&self) -> Option<Compression> {
        self.compression
    }

    /// Consistency used by [Connection::query].
    pub fn get_read_consistency(&self) -> Consistency {
        self.read_consistency
    }

    /// Consistency used by [Connection::execute].
    pub fn get_write_consistency(&self) -> Consistency {
        self.write_consistency
    }

    /// Replaces the policy deciding which failed requests are resent.
    pub fn set_retry_policy(&mut self, retry_policy: Arc<dyn RetryPolicy>) {
        self.retry_policy = retry_policy;
    }

    /// Whether the connection was closed, explicitly or after a failure.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Closes the connection.
    ///
    /// Closing an already closed connection fails with
    /// [QueryError::BrokenConnection].
    pub fn close(&mut self) -> Result<(), QueryError> {
        match self.stream.take() {
            Some(_) => {
                debug!("[{}] Connection closed", self.id);
                Ok(())
            }
            None => Err(QueryError::BrokenConnection),
        }
    }

    fn close_on_error(&mut self, err: &QueryError) {
        if self.stream.take().is_some() {
            warn!("[{}] Closing connection: {}", self.id, err);
        }
    }

    fn ensure_open(&self) -> Result<(), QueryError> {
        match self.stream {
            Some(_) => Ok(()),
            None => Err(QueryError::BrokenConnection),
        }
    }

    /// Closes the connection if its lifetime is over.
    fn check_recycle(&mut self) -> Result<(), QueryError> {
        self.ensure_open()?;
        match self.recycle_deadline {
            Some(deadline) if Instant::now() >= deadline => {
                warn!("[{}] Connection reached its lifetime, closing", self.id);
                self.stream = None;
                Err(QueryError::BrokenConnection)
            }
            _ => Ok(()),
        }
    }

    async fn write_request(&mut self, request: &SerializedRequest) -> Result<(), QueryError> {
        let id = self.id;
        let stream = self.stream.as_mut().ok_or(QueryError::BrokenConnection)?;
        trace!(
            "[{}] Sending {} frame, {} bytes",
            id,
            request.opcode(),
            request.body().len()
        );
        stream.write_all(request.get_data()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Sends a single, uncompressed request frame.
    ///
    /// A failed write is returned as is and does not close the connection.
    pub async fn send(&mut self, opcode: Opcode, body: &[u8]) -> Result<(), QueryError> {
        self.write_request(&SerializedRequest::from_body(opcode, body))
            .await
    }

    /// Reads a single response frame, and decompresses it if needed.
    ///
    /// ERROR frames are returned as [QueryError::DbError]. Any other
    /// failure closes the connection.
    pub async fn recv(&mut self) -> Result<(Opcode, Bytes), QueryError> {
        let compression = self.compression;
        let stream = self.stream.as_mut().ok_or(QueryError::BrokenConnection)?;

        let frame = read_response_frame(stream)
            .await
            .and_then(|(params, opcode, body)| {
                Ok((opcode, parse_response_body(params, compression, body)?))
            });
        let (opcode, body) = match frame {
            Ok(frame) => frame,
            Err(err) => {
                let err = QueryError::from(err);
                self.close_on_error(&err);
                return Err(err);
            }
        };
        trace!("[{}] Received {} frame, {} bytes", self.id, opcode, body.len());

        if opcode == Opcode::Error {
            let err = match response::Error::deserialize(&mut &*body) {
                Ok(error) => QueryError::DbError(error.error, error.reason),
                Err(parse_error) => {
                    let err = QueryError::ResponseParseError(parse_error.into());
                    self.close_on_error(&err);
                    err
                }
            };
            return Err(err);
        }

        Ok((opcode, body))
    }

    async fn request_with_retries(
        &mut self,
        request: &SerializedRequest,
    ) -> Result<(Opcode, Bytes), QueryError> {
        let retry_policy = Arc::clone(&self.retry_policy);
        send_with_retries(self, request, retry_policy.as_ref()).await
    }

    /// A body that does not parse leaves the stream in an unknown state,
    /// so the connection is closed.
    fn parse_response(&mut self, opcode: Opcode, body: Bytes) -> Result<Response, QueryError> {
        Response::deserialize(opcode, body).map_err(|err| {
            let err = QueryError::from(err);
            self.close_on_error(&err);
            err
        })
    }

    /// Closes the connection: a response of the wrong kind means the
    /// peer does not follow the protocol.
    fn unexpected_response(&mut self, expected: &'static str, received: &Response) -> QueryError {
        let err = QueryError::UnexpectedResponse {
            expected,
            received: received.kind_name(),
        };
        self.close_on_error(&err);
        err
    }

    fn check_owned(&self, prepared: &PreparedStatement) -> Result<(), QueryError> {
        if prepared.connection_id() != self.id {
            return Err(QueryError::ForeignStatement {
                prepared_on: prepared.connection_id(),
                used_on: self.id,
            });
        }
        Ok(())
    }

    /// Prepares a statement on the server.
    pub async fn prepare(&mut self, query: &str) -> Result<PreparedStatement, QueryError> {
        self.check_recycle()?;
        let request = SerializedRequest::make(&Prepare {
            query: Cow::Borrowed(query),
        })?;
        let (opcode, body) = self.request_with_retries(&request).await?;

        match self.parse_response(opcode, body)? {
            Response::Result(result::Result::Prepared(prepared)) => {
                trace!(
                    "[{}] Prepared {:?}, {} bind markers",
                    self.id,
                    query,
                    prepared.metadata.col_count()
                );
                Ok(PreparedStatement::new(
                    prepared.id,
                    prepared.metadata.into_col_specs(),
                    query.to_owned(),
                    self.id,
                ))
            }
            other => Err(self.unexpected_response("RESULT:Prepared", &other)),
        }
    }

    async fn send_execute(
        &mut self,
        prepared: &PreparedStatement,
        values: &[Value],
        consistency: Consistency,
    ) -> Result<(Opcode, Bytes), QueryError> {
        self.check_recycle()?;
        self.check_owned(prepared)?;
        let request = SerializedRequest::make(&Execute {
            id: prepared.get_id().clone(),
            values: Cow::Borrowed(values),
            consistency,
        })?;
        self.request_with_retries(&request).await
    }

    /// Executes a statement for its side effects, at the write consistency.
    ///
    /// Values must be encoded already, see [PreparedStatement::bind].
    /// Whatever the server answers besides an error is discarded.
    pub async fn execute(
        &mut self,
        prepared: &PreparedStatement,
        values: &[Value],
    ) -> Result<(), QueryError> {
        let consistency = self.write_consistency;
        self.send_execute(prepared, values, consistency).await?;
        Ok(())
    }

    /// Executes a statement returning rows, at the read consistency.
    pub async fn query(
        &mut self,
        prepared: &PreparedStatement,
        values: &[Value],
    ) -> Result<ResultSet, QueryError> {
        let consistency = self.read_consistency;
        let (opcode, body) = self.send_execute(prepared, values, consistency).await?;

        match self.parse_response(opcode, body)? {
            Response::Result(result::Result::Rows(rows)) => Ok(ResultSet::new(rows)),
            other => Err(self.unexpected_response("RESULT:Rows", &other)),
        }
    }

    /// Starts a transaction.
    ///
    /// The protocol has no transactions: statements run through the
    /// returned guard are executed right away, and committing or rolling
    /// back only checks that the connection is still usable.
    pub fn begin(&mut self) -> Result<Transaction<'_, S>, QueryError> {
        self.check_recycle()?;
        Ok(Transaction { connection: self })
    }

    /// Fails with [QueryError::BrokenConnection] if the connection is closed.
    pub fn commit(&self) -> Result<(), QueryError> {
        self.ensure_open()
    }

    /// Fails with [QueryError::BrokenConnection] if the connection is closed.
    pub fn rollback(&self) -> Result<(), QueryError> {
        self.ensure_open()
    }
}

#[async_trait]
impl<S> FrameTransport for Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_request(&mut self, request: &SerializedRequest) -> Result<(), QueryError> {
        self.write_request(request).await
    }

    async fn recv_response(&mut self) -> Result<(Opcode, Bytes), QueryError> {
        self.recv().await
    }
}

/// Returned by [Connection::begin].
///
/// Dereferences to the connection, so statements can be prepared and
/// executed through it.
#[derive(Debug)]
pub struct Transaction<'a, S = TcpStream> {
    connection: &'a mut Connection<S>,
}

impl<S> Transaction<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Ends the transaction, see [Connection::commit].
    pub fn commit(self) -> Result<(), QueryError> {
        self.connection.commit()
    }

    /// Ends the transaction, see [Connection::rollback].
    pub fn rollback(self) -> Result<(), QueryError> {
        self.connection.rollback()
    }
}

impl<S> Deref for Transaction<'_, S> {
    type Target = Connection<S>;

    fn deref(&self) -> &Self::Target {
        self.connection
    }
}

impl<S> DerefMut for Transaction<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
    }
}
