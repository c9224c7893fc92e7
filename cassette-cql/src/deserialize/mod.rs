//! Decoding of row cells into [CqlValue]s.
//!
//! Splitting rows into cells is done here; turning one cell into a value is
//! delegated to a [DeserializeCell] implementation, [NativeCodec] by default.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use bytes::{Buf, Bytes};
use thiserror::Error;

use crate::frame::frame_errors::LowLevelDeserializationError;
use crate::frame::response::result::{ColumnSpec, ColumnType};
use crate::frame::types;
use crate::value::{Counter, CqlTimestamp, CqlValue, NativeCodec};

/// Converts the contents of one non-null cell into a value.
///
/// `cell` holds exactly the bytes of the cell, without the length prefix.
pub trait DeserializeCell {
    fn deserialize_cell(
        &self,
        typ: &ColumnType,
        cell: Bytes,
    ) -> Result<CqlValue, DeserializationError>;
}

impl<T: DeserializeCell + ?Sized> DeserializeCell for &T {
    fn deserialize_cell(
        &self,
        typ: &ColumnType,
        cell: Bytes,
    ) -> Result<CqlValue, DeserializationError> {
        (**self).deserialize_cell(typ, cell)
    }
}

/// Decoding of a single cell failed.
#[derive(Debug, Error, Clone)]
#[error("Failed to deserialize CQL type {cql_type:?}: {kind}")]
pub struct DeserializationError {
    /// The CQL type of the cell.
    pub cql_type: ColumnType,

    /// Detailed information about the failure.
    pub kind: BuiltinDeserializationErrorKind,
}

impl DeserializationError {
    pub fn new(cql_type: &ColumnType, kind: BuiltinDeserializationErrorKind) -> Self {
        Self {
            cql_type: cql_type.clone(),
            kind,
        }
    }

    /// Wraps an error raised by a custom decoder.
    pub fn custom(
        cql_type: &ColumnType,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::new(cql_type, BuiltinDeserializationErrorKind::Custom(Arc::new(err)))
    }
}

/// Describes why decoding a cell failed.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum BuiltinDeserializationErrorKind {
    /// The length of read value in bytes is different than expected for the CQL type.
    ByteLengthMismatch { expected: usize, got: usize },

    /// Expected valid ASCII string.
    ExpectedAscii,

    /// Invalid UTF-8 string.
    InvalidUtf8(std::str::Utf8Error),

    /// The length of read value in bytes is not suitable for IP address.
    BadInetLength { got: usize },

    /// Raised by a decoder other than [NativeCodec].
    Custom(Arc<dyn std::error::Error + Send + Sync>),
}

impl Display for BuiltinDeserializationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltinDeserializationErrorKind::ByteLengthMismatch { expected, got } => write!(
                f,
                "the CQL type requires {} bytes, but got {}",
                expected, got,
            ),
            BuiltinDeserializationErrorKind::ExpectedAscii => {
                f.write_str("expected a valid ASCII string")
            }
            BuiltinDeserializationErrorKind::InvalidUtf8(err) => err.fmt(f),
            BuiltinDeserializationErrorKind::BadInetLength { got } => write!(
                f,
                "the length of read value in bytes ({got}) is not suitable for IP address; expected 4 or 16"
            ),
            BuiltinDeserializationErrorKind::Custom(err) => err.fmt(f),
        }
    }
}

/// Splitting a row into cells, or decoding one of them, failed.
#[derive(Debug, Error, Clone)]
#[error("Failed to deserialize column {column_index} of a row: {kind}")]
pub struct RowDeserializationError {
    pub column_index: usize,
    pub kind: RowDeserializationErrorKind,
}

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum RowDeserializationErrorKind {
    /// The cell's length prefix or contents are missing.
    #[error("Malformed cell: {0}")]
    RawCellParseError(#[from] LowLevelDeserializationError),
    #[error(transparent)]
    CellDeserializationError(#[from] DeserializationError),
}

fn ensure_exact_length<const SIZE: usize>(
    typ: &ColumnType,
    v: &[u8],
) -> Result<[u8; SIZE], DeserializationError> {
    v.try_into().map_err(|_| {
        DeserializationError::new(
            typ,
            BuiltinDeserializationErrorKind::ByteLengthMismatch {
                expected: SIZE,
                got: v.len(),
            },
        )
    })
}

fn deser_string(typ: &ColumnType, v: &[u8]) -> Result<String, DeserializationError> {
    std::str::from_utf8(v)
        .map(ToOwned::to_owned)
        .map_err(|err| {
            DeserializationError::new(typ, BuiltinDeserializationErrorKind::InvalidUtf8(err))
        })
}

impl DeserializeCell for NativeCodec {
    fn deserialize_cell(
        &self,
        typ: &ColumnType,
        cell: Bytes,
    ) -> Result<CqlValue, DeserializationError> {
        use ColumnType::*;

        let v = &cell[..];
        Ok(match typ {
            Ascii => {
                if !v.is_ascii() {
                    return Err(DeserializationError::new(
                        typ,
                        BuiltinDeserializationErrorKind::ExpectedAscii,
                    ));
                }
                CqlValue::Ascii(deser_string(typ, v)?)
            }
            Text | Varchar => CqlValue::Text(deser_string(typ, v)?),
            Boolean => CqlValue::Boolean(ensure_exact_length::<1>(typ, v)?[0] != 0x00),
            Blob => CqlValue::Blob(v.to_vec()),
            BigInt => CqlValue::BigInt(i64::from_be_bytes(ensure_exact_length(typ, v)?)),
            Counter => CqlValue::Counter(self::Counter(i64::from_be_bytes(ensure_exact_length(
                typ, v,
            )?))),
            Timestamp => CqlValue::Timestamp(CqlTimestamp(i64::from_be_bytes(
                ensure_exact_length(typ, v)?,
            ))),
            Int => CqlValue::Int(i32::from_be_bytes(ensure_exact_length(typ, v)?)),
            SmallInt => CqlValue::SmallInt(i16::from_be_bytes(ensure_exact_length(typ, v)?)),
            TinyInt => CqlValue::TinyInt(i8::from_be_bytes(ensure_exact_length(typ, v)?)),
            Double => CqlValue::Double(f64::from_be_bytes(ensure_exact_length(typ, v)?)),
            Float => CqlValue::Float(f32::from_be_bytes(ensure_exact_length(typ, v)?)),
            Uuid => CqlValue::Uuid(uuid::Uuid::from_bytes(ensure_exact_length(typ, v)?)),
            Timeuuid => CqlValue::Timeuuid(uuid::Uuid::from_bytes(ensure_exact_length(typ, v)?)),
            Inet => CqlValue::Inet(match v.len() {
                4 => IpAddr::V4(Ipv4Addr::from(ensure_exact_length::<4>(typ, v)?)),
                16 => IpAddr::V6(Ipv6Addr::from(ensure_exact_length::<16>(typ, v)?)),
                got => {
                    return Err(DeserializationError::new(
                        typ,
                        BuiltinDeserializationErrorKind::BadInetLength { got },
                    ))
                }
            }),
            _ => CqlValue::Raw {
                typ: typ.clone(),
                bytes: cell,
            },
        })
    }
}

/// Splits off one `[bytes]` cell, `None` standing for null.
fn read_cell(buf: &mut Bytes) -> Result<Option<Bytes>, LowLevelDeserializationError> {
    let mut slice = &buf[..];
    let cell = types::read_bytes_opt(&mut slice)?.map(|v| buf.slice_ref(v));
    let consumed = buf.len() - slice.len();
    buf.advance(consumed);
    Ok(cell)
}

/// Decodes one row from the front of `buf` into `out`, one entry per column.
///
/// `out` is cleared first. On success `buf` is advanced past the row;
/// on failure its position is unspecified.
pub fn deser_row_into(
    buf: &mut Bytes,
    col_specs: &[ColumnSpec],
    decoder: &impl DeserializeCell,
    out: &mut Vec<Option<CqlValue>>,
) -> Result<(), RowDeserializationError> {
    out.clear();
    out.reserve(col_specs.len());
    for (column_index, spec) in col_specs.iter().enumerate() {
        let mk_err = |kind: RowDeserializationErrorKind| RowDeserializationError {
            column_index,
            kind,
        };
        let value = match read_cell(buf).map_err(|err| mk_err(err.into()))? {
            Some(cell) => Some(
                decoder
                    .deserialize_cell(spec.typ(), cell)
                    .map_err(|err| mk_err(err.into()))?,
            ),
            None => None,
        };
        out.push(value);
    }
    Ok(())
}

/// Decodes one row from the front of `buf`.
pub fn deser_row(
    buf: &mut Bytes,
    col_specs: &[ColumnSpec],
    decoder: &impl DeserializeCell,
) -> Result<Vec<Option<CqlValue>>, RowDeserializationError> {
    let mut row = Vec::with_capacity(col_specs.len());
    deser_row_into(buf, col_specs, decoder, &mut row)?;
    Ok(row)
}
