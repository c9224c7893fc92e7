//! CQL protocol-level representation of a `EXECUTE` request.

use std::borrow::Cow;
use std::num::TryFromIntError;

use crate::frame::frame_errors::CqlRequestSerializationError;
use crate::serialize::{self, SerializationError, Value};
use crate::Consistency;
use bytes::Bytes;
use thiserror::Error;

use crate::{frame::request::SerializableRequest, frame::types, frame::Opcode};

use super::{DeserializableRequest, RequestDeserializationError};

/// CQL protocol-level representation of an `EXECUTE` request,
/// used to execute a single prepared statement.
///
/// The body is the statement id, the values and the consistency,
/// with no flags in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Execute<'a> {
    /// ID of the prepared statement to execute.
    pub id: Bytes,

    /// Bound values. Each must already be [Value::Bytes].
    pub values: Cow<'a, [Value]>,

    pub consistency: Consistency,
}

impl SerializableRequest for Execute<'_> {
    const OPCODE: Opcode = Opcode::Execute;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), CqlRequestSerializationError> {
        // Serializing statement id
        types::write_short_bytes(&self.id[..], buf)
            .map_err(ExecuteSerializationError::StatementIdSerialization)?;

        // Serializing values
        let count: u16 = self
            .values
            .len()
            .try_into()
            .map_err(|_| ExecuteSerializationError::TooManyValues(self.values.len()))?;
        types::write_short(count, buf);
        serialize::write_values(&self.values, buf)
            .map_err(ExecuteSerializationError::ValueSerialization)?;

        types::write_consistency(self.consistency, buf);
        Ok(())
    }
}

impl DeserializableRequest for Execute<'_> {
    fn deserialize(buf: &mut &[u8]) -> Result<Self, RequestDeserializationError> {
        let id = types::read_short_bytes(buf)?.to_vec().into();
        let count = types::read_short(buf)?;
        let values = (0..count)
            .map(|_| {
                types::read_bytes(buf).map(|v| Value::Bytes(Bytes::copy_from_slice(v)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let consistency = types::read_consistency(buf)?;

        Ok(Self {
            id,
            values: Cow::Owned(values),
            consistency,
        })
    }
}

/// An error type returned when serialization of EXECUTE request fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ExecuteSerializationError {
    /// Failed to serialize prepared statement id.
    #[error("Malformed statement id: {0}")]
    StatementIdSerialization(TryFromIntError),

    /// The value count does not fit in a short.
    #[error("Too many values: {0}")]
    TooManyValues(usize),

    /// One of the values could not be written.
    #[error(transparent)]
    ValueSerialization(SerializationError),
}
