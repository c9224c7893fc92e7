//! Encoding of statement parameters.
//!
//! At the wire level every parameter is an opaque `[bytes]` value: an EXECUTE
//! request only accepts [Value::Bytes]. Native values are turned into bytes
//! beforehand by [bind_values], using a [SerializeCell] implementation that
//! knows the column types of the statement.

use std::net::IpAddr;

use bytes::{BufMut, Bytes};
use thiserror::Error;

use crate::frame::response::result::{ColumnSpec, ColumnType};
use crate::frame::types;
use crate::value::{CqlValue, NativeCodec};

/// A statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Already encoded contents of the value.
    Bytes(Bytes),
    /// A native value that still has to be encoded for its column.
    Cql(CqlValue),
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value.into())
    }
}

impl From<&'static [u8]> for Value {
    fn from(value: &'static [u8]) -> Self {
        Value::Bytes(Bytes::from_static(value))
    }
}

impl From<CqlValue> for Value {
    fn from(value: CqlValue) -> Self {
        Value::Cql(value)
    }
}

/// Encoding a parameter failed.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Failed to serialize value at column {column_index}: {kind}")]
pub struct SerializationError {
    pub column_index: usize,
    pub kind: SerializationErrorKind,
}

impl SerializationError {
    pub fn new(column_index: usize, kind: SerializationErrorKind) -> Self {
        Self { column_index, kind }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SerializationErrorKind {
    /// Only raw bytes can be written into a request.
    #[error("unsupported value of type {value_kind}, expected raw bytes")]
    UnsupportedValue { value_kind: &'static str },

    /// The value does not fit the column type.
    #[error("cannot encode a value of type {value_kind} as {cql_type:?}")]
    TypeMismatch {
        cql_type: ColumnType,
        value_kind: &'static str,
    },

    /// Expected valid ASCII string.
    #[error("expected a valid ASCII string")]
    ExpectedAscii,

    /// The value is too large to be length-prefixed with an int.
    #[error("the value is too big to be serialized in the CQL protocol format: {0} bytes")]
    SizeOverflow(usize),

    /// The number of values does not match the number of bind markers.
    #[error("the statement has {expected} bind markers but {got} values were given")]
    ValueCountMismatch { expected: usize, got: usize },
}

/// Converts a native value into the contents of a cell of the given type.
pub trait SerializeCell {
    fn serialize_cell(
        &self,
        typ: &ColumnType,
        value: &CqlValue,
    ) -> Result<Bytes, SerializationErrorKind>;
}

impl<T: SerializeCell + ?Sized> SerializeCell for &T {
    fn serialize_cell(
        &self,
        typ: &ColumnType,
        value: &CqlValue,
    ) -> Result<Bytes, SerializationErrorKind> {
        (**self).serialize_cell(typ, value)
    }
}

impl SerializeCell for NativeCodec {
    fn serialize_cell(
        &self,
        typ: &ColumnType,
        value: &CqlValue,
    ) -> Result<Bytes, SerializationErrorKind> {
        use ColumnType as T;
        use CqlValue as V;

        let bytes: Bytes = match (typ, value) {
            (_, V::Raw { bytes, .. }) => bytes.clone(),
            (T::Ascii, V::Ascii(s) | V::Text(s)) => {
                if !s.is_ascii() {
                    return Err(SerializationErrorKind::ExpectedAscii);
                }
                Bytes::copy_from_slice(s.as_bytes())
            }
            (T::Text | T::Varchar, V::Ascii(s) | V::Text(s)) => {
                Bytes::copy_from_slice(s.as_bytes())
            }
            (T::Boolean, V::Boolean(b)) => Bytes::copy_from_slice(&[*b as u8]),
            (T::Blob, V::Blob(b)) => Bytes::copy_from_slice(b),
            (T::BigInt, V::BigInt(i)) => Bytes::copy_from_slice(&i.to_be_bytes()),
            (T::Counter, V::Counter(c)) => Bytes::copy_from_slice(&c.0.to_be_bytes()),
            (T::Timestamp, V::Timestamp(t)) => Bytes::copy_from_slice(&t.0.to_be_bytes()),
            (T::Int, V::Int(i)) => Bytes::copy_from_slice(&i.to_be_bytes()),
            (T::SmallInt, V::SmallInt(i)) => Bytes::copy_from_slice(&i.to_be_bytes()),
            (T::TinyInt, V::TinyInt(i)) => Bytes::copy_from_slice(&i.to_be_bytes()),
            (T::Double, V::Double(d)) => Bytes::copy_from_slice(&d.to_be_bytes()),
            (T::Float, V::Float(f)) => Bytes::copy_from_slice(&f.to_be_bytes()),
            (T::Uuid, V::Uuid(u)) | (T::Timeuuid, V::Timeuuid(u) | V::Uuid(u)) => {
                Bytes::copy_from_slice(u.as_bytes())
            }
            (T::Inet, V::Inet(IpAddr::V4(a))) => Bytes::copy_from_slice(&a.octets()),
            (T::Inet, V::Inet(IpAddr::V6(a))) => Bytes::copy_from_slice(&a.octets()),
            (typ, value) => {
                return Err(SerializationErrorKind::TypeMismatch {
                    cql_type: typ.clone(),
                    value_kind: value.kind_name(),
                })
            }
        };
        Ok(bytes)
    }
}

/// Encodes every [Value::Cql] with `encoder`, according to the column it is bound to.
/// [Value::Bytes] pass through untouched.
pub fn bind_values(
    col_specs: &[ColumnSpec],
    values: Vec<Value>,
    encoder: &impl SerializeCell,
) -> Result<Vec<Value>, SerializationError> {
    if values.len() != col_specs.len() {
        return Err(SerializationError::new(
            values.len().min(col_specs.len()),
            SerializationErrorKind::ValueCountMismatch {
                expected: col_specs.len(),
                got: values.len(),
            },
        ));
    }

    values
        .into_iter()
        .zip(col_specs)
        .enumerate()
        .map(|(column_index, (value, spec))| match value {
            Value::Bytes(b) => Ok(Value::Bytes(b)),
            Value::Cql(v) => encoder
                .serialize_cell(spec.typ(), &v)
                .map(Value::Bytes)
                .map_err(|kind| SerializationError::new(column_index, kind)),
        })
        .collect()
}

/// Writes each value as `[bytes]`.
///
/// The count prefix is not written, as its width depends on the request.
pub fn write_values(values: &[Value], buf: &mut impl BufMut) -> Result<(), SerializationError> {
    for (column_index, value) in values.iter().enumerate() {
        match value {
            Value::Bytes(bytes) => types::write_bytes(bytes, buf).map_err(|_| {
                SerializationError::new(
                    column_index,
                    SerializationErrorKind::SizeOverflow(bytes.len()),
                )
            })?,
            Value::Cql(v) => {
                return Err(SerializationError::new(
                    column_index,
                    SerializationErrorKind::UnsupportedValue {
                        value_kind: v.kind_name(),
                    },
                ))
            }
        }
    }
    Ok(())
}
