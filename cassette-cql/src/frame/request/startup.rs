//! CQL protocol-level representation of a `STARTUP` request.

use thiserror::Error;

use crate::frame::frame_errors::CqlRequestSerializationError;

use std::{borrow::Cow, num::TryFromIntError};

use crate::{
    frame::request::SerializableRequest,
    frame::types,
    frame::Opcode,
};

use super::DeserializableRequest;

pub const CQL_VERSION: &str = "CQL_VERSION";
pub const COMPRESSION: &str = "COMPRESSION";

pub const DEFAULT_CQL_VERSION: &str = "3.0.0";

/// The CQL protocol-level representation of an `STARTUP` request,
/// used to negotiate the connection options.
///
/// Options are written in the order they are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Startup<'a> {
    pub options: Vec<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> Startup<'a> {
    /// Builds the options map: the CQL version, then the compression if any.
    pub fn new(cql_version: &'a str, compression: Option<&'a str>) -> Self {
        let mut options = vec![(Cow::Borrowed(CQL_VERSION), Cow::Borrowed(cql_version))];
        if let Some(compression) = compression {
            options.push((Cow::Borrowed(COMPRESSION), Cow::Borrowed(compression)));
        }
        Self { options }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }
}

impl SerializableRequest for Startup<'_> {
    const OPCODE: Opcode = Opcode::Startup;

    fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), CqlRequestSerializationError> {
        types::write_string_map(&self.options, buf)
            .map_err(StartupSerializationError::OptionsSerialization)?;
        Ok(())
    }
}

/// An error type returned when serialization of STARTUP request fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StartupSerializationError {
    /// Failed to serialize startup options.
    #[error("Malformed startup options: {0}")]
    OptionsSerialization(TryFromIntError),
}

impl DeserializableRequest for Startup<'_> {
    fn deserialize(buf: &mut &[u8]) -> Result<Self, super::RequestDeserializationError> {
        let options = types::read_string_map(buf)?
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Ok(Self { options })
    }
}
