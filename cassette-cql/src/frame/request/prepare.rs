//! CQL protocol-level representation of a `PREPARE` request.

use std::borrow::Cow;
use std::num::TryFromIntError;

use thiserror::Error;

use crate::frame::frame_errors::CqlRequestSerializationError;

use crate::{
    frame::request::{DeserializableRequest, RequestDeserializationError, SerializableRequest},
    frame::types,
    frame::Opcode,
};

/// CQL protocol-level representation of an `PREPARE` request,
/// used to prepare a single statement for further execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepare<'a> {
    /// CQL statement string to prepare.
    pub query: Cow<'a, str>,
}

impl SerializableRequest for Prepare<'_> {
    const OPCODE: Opcode = Opcode::Prepare;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), CqlRequestSerializationError> {
        types::write_long_string(&self.query, buf)
            .map_err(PrepareSerializationError::StatementStringSerialization)?;
        Ok(())
    }
}

impl DeserializableRequest for Prepare<'_> {
    fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let query = types::read_long_string(buf)?.to_owned().into();
        Ok(Self { query })
    }
}

/// An error type returned when serialization of PREPARE request fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum PrepareSerializationError {
    /// Failed to serialize the CQL statement string.
    #[error("Failed to serialize statement contents: {0}")]
    StatementStringSerialization(TryFromIntError),
}
