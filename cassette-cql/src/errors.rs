//! Errors reported by the server in ERROR frames.

use thiserror::Error;

/// An error sent from the database in response to a request,
/// classified by its protocol v1 error code.
///
/// The human-readable message travels next to it, see
/// [`Error`](crate::frame::response::error::Error).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbError {
    /// Something unexpected happened on the server side
    #[error("Internal server error. This indicates a server-side bug")]
    ServerError,

    /// The server judged the request to be invalid protocol-wise
    #[error("Invalid protocol message received from the driver")]
    ProtocolError,

    /// Authentication failed - bad credentials
    #[error("Authentication failed - bad credentials")]
    AuthenticationError,

    /// Not enough nodes are alive to satisfy required consistency level
    #[error("Not enough nodes are alive to satisfy required consistency level")]
    Unavailable,

    /// The request cannot be processed because the coordinator node is overloaded
    #[error("The request cannot be processed because the coordinator node is overloaded")]
    Overloaded,

    /// The coordinator node is still bootstrapping
    #[error("The coordinator node is still bootstrapping")]
    IsBootstrapping,

    /// Error during truncate operation
    #[error("Error during truncate operation")]
    TruncateError,

    /// Not enough nodes responded to the write request in time to satisfy required consistency level
    #[error("Not enough nodes responded to the write request in time to satisfy required consistency level")]
    WriteTimeout,

    /// Not enough nodes responded to the read request in time to satisfy required consistency level
    #[error("Not enough nodes responded to the read request in time to satisfy required consistency level")]
    ReadTimeout,

    /// The submitted query has a syntax error
    #[error("The submitted query has a syntax error")]
    SyntaxError,

    /// The logged user doesn't have the right to perform the query
    #[error("The logged user doesn't have the right to perform the query")]
    Unauthorized,

    /// The query is syntactically correct but invalid
    #[error("The query is syntactically correct but invalid")]
    Invalid,

    /// The query is invalid because of some configuration issue
    #[error("The query is invalid because of some configuration issue")]
    ConfigError,

    /// Attempted to create a keyspace or a table that was already existing
    #[error("Attempted to create a keyspace or a table that was already existing")]
    AlreadyExists,

    /// Tried to execute a prepared statement that is not prepared
    #[error("Tried to execute a prepared statement that is not prepared")]
    Unprepared,

    /// Error code not defined by protocol v1
    #[error("Other error not specified in the protocol. Error code: {0}")]
    Other(i32),
}

impl DbError {
    /// Classifies a raw error code.
    pub fn from_code(code: i32) -> DbError {
        match code {
            0x0000 => DbError::ServerError,
            0x000A => DbError::ProtocolError,
            0x0100 => DbError::AuthenticationError,
            0x1000 => DbError::Unavailable,
            0x1001 => DbError::Overloaded,
            0x1002 => DbError::IsBootstrapping,
            0x1003 => DbError::TruncateError,
            0x1100 => DbError::WriteTimeout,
            0x1200 => DbError::ReadTimeout,
            0x2000 => DbError::SyntaxError,
            0x2100 => DbError::Unauthorized,
            0x2200 => DbError::Invalid,
            0x2300 => DbError::ConfigError,
            0x2400 => DbError::AlreadyExists,
            0x2500 => DbError::Unprepared,
            _ => DbError::Other(code),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            DbError::ServerError => 0x0000,
            DbError::ProtocolError => 0x000A,
            DbError::AuthenticationError => 0x0100,
            DbError::Unavailable => 0x1000,
            DbError::Overloaded => 0x1001,
            DbError::IsBootstrapping => 0x1002,
            DbError::TruncateError => 0x1003,
            DbError::WriteTimeout => 0x1100,
            DbError::ReadTimeout => 0x1200,
            DbError::SyntaxError => 0x2000,
            DbError::Unauthorized => 0x2100,
            DbError::Invalid => 0x2200,
            DbError::ConfigError => 0x2300,
            DbError::AlreadyExists => 0x2400,
            DbError::Unprepared => 0x2500,
            DbError::Other(code) => *code,
        }
    }

    /// Whether the server guarantees the request was not applied and may be resent as is.
    ///
    /// Only write timeout, read timeout and overload qualify.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::WriteTimeout | DbError::ReadTimeout | DbError::Overloaded
        )
    }
}
