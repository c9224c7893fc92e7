//! This module contains various errors which can be returned by [`Connection`](crate::Connection).

use std::sync::Arc;

use cassette_cql::errors::DbError;
use cassette_cql::frame::frame_errors::{
    CqlRequestSerializationError, CqlResponseParseError, FrameError,
};
use cassette_cql::frame::request::execute::ExecuteSerializationError;
use cassette_cql::frame::types::UnknownConsistency;
use cassette_cql::frame::UnknownCompression;
use cassette_cql::serialize::SerializationError;
use thiserror::Error;

/// Error that occurred during request execution
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum QueryError {
    /// The connection was closed, explicitly or after a failure, and cannot
    /// be used anymore. A new one has to be opened.
    #[error("Connection unusable")]
    BrokenConnection,

    /// Input/Output error has occurred, connection broken etc.
    #[error("IO Error: {0}")]
    IoError(Arc<std::io::Error>),

    /// The server sent a frame that violates the protocol.
    #[error("Protocol violation: {0}")]
    FrameError(Arc<FrameError>),

    /// Database sent a response containing some error with a message
    #[error("Database returned an error: {0}, Error message: {1}")]
    DbError(DbError, String),

    /// The response was well formed, but not the one the request calls for.
    #[error("Received unexpected response from the server: {received}. Expected {expected}.")]
    UnexpectedResponse {
        expected: &'static str,
        received: &'static str,
    },

    /// Failed to deserialize a response body.
    #[error(transparent)]
    ResponseParseError(#[from] CqlResponseParseError),

    /// Failed to serialize a request.
    #[error(transparent)]
    RequestSerialization(CqlRequestSerializationError),

    /// Bound values could not be encoded.
    #[error("Invalid query passed to the driver: {0}")]
    BadQuery(#[from] SerializationError),

    /// A prepared statement was executed on a connection other than the one
    /// that prepared it.
    #[error("Prepared statement was prepared on connection {prepared_on}, not {used_on}")]
    ForeignStatement { prepared_on: u64, used_on: u64 },

    /// The connection string could not be parsed.
    #[error("Invalid connection string: {0}")]
    ConnectionString(#[from] ConnectionStringError),

    /// The server did not accept the connection options.
    #[error("Connection handshake failed: {0}")]
    HandshakeFailed(HandshakeError),
}

impl QueryError {
    /// Whether the request may be sent again unchanged.
    ///
    /// Only write timeouts, read timeouts and overload reports qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QueryError::DbError(db_error, _) if db_error.is_transient())
    }
}

impl From<std::io::Error> for QueryError {
    fn from(io_error: std::io::Error) -> QueryError {
        QueryError::IoError(Arc::new(io_error))
    }
}

impl From<FrameError> for QueryError {
    fn from(frame_error: FrameError) -> QueryError {
        match frame_error {
            FrameError::StdIoError(io_error) => io_error.into(),
            other => QueryError::FrameError(Arc::new(other)),
        }
    }
}

impl From<CqlRequestSerializationError> for QueryError {
    fn from(err: CqlRequestSerializationError) -> QueryError {
        match err {
            CqlRequestSerializationError::ExecuteSerialization(
                ExecuteSerializationError::ValueSerialization(value_error),
            ) => QueryError::BadQuery(value_error),
            other => QueryError::RequestSerialization(other),
        }
    }
}

/// Why the STARTUP exchange did not end with READY.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum HandshakeError {
    /// The server answered with an error frame.
    #[error("Database returned an error: {0}, Error message: {1}")]
    DbError(DbError, String),

    /// The server answered with something else than READY,
    /// e.g. it asked for authentication.
    #[error("Expected READY, received {0}")]
    UnexpectedResponse(&'static str),
}

/// An error in the connection string passed to
/// [`Connection::open`](crate::Connection::open).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionStringError {
    /// An option token has no `=`.
    #[error("missing = in option: {0:?}")]
    MissingEquals(String),

    /// The option key is not known.
    #[error("unsupported option {0:?}")]
    UnsupportedOption(String),

    /// A consistency option names no consistency level.
    #[error(transparent)]
    UnknownConsistency(#[from] UnknownConsistency),

    /// The compression option is not `snappy`.
    #[error(transparent)]
    UnknownCompression(#[from] UnknownCompression),

    /// The recycle option is not a valid duration.
    #[error("bad recycle option {value:?}: {reason}")]
    BadRecycle { value: String, reason: String },

    /// The retries option is not a valid integer.
    #[error("bad retries option {value:?}: {reason}")]
    BadRetries { value: String, reason: String },

    /// The host list is empty.
    #[error("no hosts to connect to")]
    NoHosts,
}
