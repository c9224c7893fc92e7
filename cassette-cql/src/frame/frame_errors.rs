use std::num::TryFromIntError;
use std::sync::Arc;

use super::request::{
    execute::ExecuteSerializationError, prepare::PrepareSerializationError,
    startup::StartupSerializationError,
};
use super::TryFromPrimitiveError;
use thiserror::Error;

/// An error that occurred while reading or validating a response frame.
///
/// Every variant leaves the byte stream in an unknown position,
/// so the connection it was read from must not be used afterwards.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Unsupported frame version or not a response: 0x{0:02x}")]
    NotAResponse(u8),
    #[error("Unsupported frame flags: 0x{0:02x}")]
    UnsupportedFlags(u8),
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(#[from] TryFromPrimitiveError<u8>),
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("Frame decompression failed.")]
    FrameDecompression,
    #[error("Frame compression failed.")]
    FrameCompression,
    #[error(transparent)]
    StdIoError(#[from] std::io::Error),
}

/// An error type returned when serialization of a CQL request fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CqlRequestSerializationError {
    /// Failed to serialize STARTUP request.
    #[error("Failed to serialize STARTUP request: {0}")]
    StartupSerialization(#[from] StartupSerializationError),

    /// Failed to serialize PREPARE request.
    #[error("Failed to serialize PREPARE request: {0}")]
    PrepareSerialization(#[from] PrepareSerializationError),

    /// Failed to serialize EXECUTE request.
    #[error("Failed to serialize EXECUTE request: {0}")]
    ExecuteSerialization(#[from] ExecuteSerializationError),
}

/// An error type returned when deserialization of a response body fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CqlResponseParseError {
    #[error("Failed to deserialize ERROR response: {0}")]
    CqlErrorParseError(#[from] CqlErrorParseError),
    #[error("Failed to deserialize AUTHENTICATE response: {0}")]
    CqlAuthenticateParseError(LowLevelDeserializationError),
    #[error("Failed to deserialize RESULT response: {0}")]
    CqlResultParseError(#[from] CqlResultParseError),
}

/// An error type returned when deserialization of ERROR response fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CqlErrorParseError {
    #[error("Malformed error code: {0}")]
    ErrorCodeParseError(LowLevelDeserializationError),
    #[error("Malformed error reason: {0}")]
    ReasonParseError(LowLevelDeserializationError),
}

/// An error type returned when deserialization of RESULT response fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CqlResultParseError {
    #[error("Malformed RESULT response id: {0}")]
    ResultIdParseError(LowLevelDeserializationError),
    #[error("Unknown RESULT response id: {0}")]
    UnknownResultId(i32),
    #[error("RESULT:Set_keyspace response deserialization failed: {0}")]
    SetKeyspaceParseError(LowLevelDeserializationError),
    #[error("RESULT:Schema_change response deserialization failed: {0}")]
    SchemaChangeParseError(LowLevelDeserializationError),
    #[error("RESULT:Prepared response deserialization failed: {0}")]
    PreparedParseError(#[from] PreparedParseError),
    #[error("RESULT:Rows response deserialization failed: {0}")]
    RawRowsParseError(#[from] RowsParseError),
}

/// An error type returned when deserialization
/// of `RESULT::Prepared` response fails.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum PreparedParseError {
    #[error("Malformed prepared statement's id length: {0}")]
    IdLengthParseError(LowLevelDeserializationError),
    #[error("Invalid prepared metadata: {0}")]
    ResultMetadataParseError(#[from] ResultMetadataParseError),
}

/// An error type returned when deserialization
/// of `RESULT::Rows` response fails.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum RowsParseError {
    #[error("Invalid result metadata: {0}")]
    ResultMetadataParseError(#[from] ResultMetadataParseError),
    #[error("Invalid rows count: {0}")]
    RowsCountParseError(LowLevelDeserializationError),
}

/// An error type returned when deserialization
/// of `[Result/Prepared]Metadata` failed.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ResultMetadataParseError {
    #[error("Malformed metadata flags: {0}")]
    FlagsParseError(LowLevelDeserializationError),
    #[error("Malformed column count: {0}")]
    ColumnCountParseError(LowLevelDeserializationError),
    #[error("Malformed global table spec: {0}")]
    GlobalTableSpecParseError(#[from] TableSpecParseError),
    #[error("Malformed column spec: {0}")]
    ColumnSpecParseError(#[from] ColumnSpecParseError),
}

/// An error type returned when deserialization of table specification fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TableSpecParseError {
    #[error("Malformed keyspace name: {0}")]
    MalformedKeyspaceName(LowLevelDeserializationError),
    #[error("Malformed table name: {0}")]
    MalformedTableName(LowLevelDeserializationError),
}

/// An error type returned when deserialization of the column specification fails.
#[derive(Error, Debug, Clone)]
#[error("Column spec deserialization failed, column index: {column_index}, error: {kind}")]
pub struct ColumnSpecParseError {
    pub column_index: usize,
    pub kind: ColumnSpecParseErrorKind,
}

/// The type of error that appeared during deserialization
/// of a column specification.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ColumnSpecParseErrorKind {
    #[error("Invalid table spec: {0}")]
    TableSpecParseError(#[from] TableSpecParseError),
    #[error("Malformed column name: {0}")]
    ColumnNameParseError(#[from] LowLevelDeserializationError),
    #[error("Invalid column type: {0}")]
    ColumnTypeParseError(#[from] CqlTypeParseError),
}

/// An error type returned when deserialization of CQL type name fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum CqlTypeParseError {
    #[error("Malformed type id: {0}")]
    TypeIdParseError(LowLevelDeserializationError),
    #[error("Malformed custom type name: {0}")]
    CustomTypeNameParseError(LowLevelDeserializationError),
    #[error("Malformed name of UDT keyspace: {0}")]
    UdtKeyspaceNameParseError(LowLevelDeserializationError),
    #[error("Malformed UDT name: {0}")]
    UdtNameParseError(LowLevelDeserializationError),
    #[error("Malformed UDT fields count: {0}")]
    UdtFieldsCountParseError(LowLevelDeserializationError),
    #[error("Malformed UDT's field name: {0}")]
    UdtFieldNameParseError(LowLevelDeserializationError),
    #[error("Malformed tuple length: {0}")]
    TupleLengthParseError(LowLevelDeserializationError),
}

/// A low level deserialization error.
///
/// This type of error is returned when deserialization
/// of some primitive value fails.
///
/// Possible error kinds:
/// - generic io error - reading from buffer failed
/// - out of range integer conversion
/// - conversion errors - e.g. slice-to-array or primitive-to-enum
/// - not enough bytes in the buffer to deserialize a value
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum LowLevelDeserializationError {
    #[error(transparent)]
    IoError(Arc<std::io::Error>),
    #[error(transparent)]
    TryFromIntError(#[from] TryFromIntError),
    #[error("Failed to convert slice into array: {0}")]
    TryFromSliceError(#[from] std::array::TryFromSliceError),
    #[error("Not enough bytes! expected: {expected}, received: {received}")]
    TooFewBytesReceived { expected: usize, received: usize },
    #[error("Invalid value length: {0}")]
    InvalidValueLength(i32),
    #[error("Unknown consistency: {0}")]
    UnknownConsistency(#[from] TryFromPrimitiveError<u16>),
    #[error("UTF8 deserialization failed: {0}")]
    UTF8DeserializationError(#[from] std::str::Utf8Error),
}

impl From<std::io::Error> for LowLevelDeserializationError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(Arc::new(value))
    }
}
