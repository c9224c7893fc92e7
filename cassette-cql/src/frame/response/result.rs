use crate::frame::frame_errors::{
    ColumnSpecParseError, ColumnSpecParseErrorKind, CqlResultParseError, CqlTypeParseError,
    PreparedParseError, ResultMetadataParseError, RowsParseError, TableSpecParseError,
};
use crate::frame::types;
use bytes::Bytes;
use std::result::Result as StdResult;

// Metadata flags
const FLAG_GLOBAL_TABLES_SPEC: i32 = 0x0001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetKeyspace {
    pub keyspace_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub id: Bytes,
    /// Describes the bind markers of the prepared statement.
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChange {
    /// One of `CREATED`, `UPDATED` or `DROPPED`.
    pub change: String,
    pub keyspace_name: String,
    /// Empty when the change affects the keyspace itself.
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TableSpec {
    ks_name: String,
    table_name: String,
}

impl TableSpec {
    pub fn new(ks_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            ks_name: ks_name.into(),
            table_name: table_name.into(),
        }
    }

    pub fn ks_name(&self) -> &str {
        &self.ks_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// The type of a column, as announced by a type option in result metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Custom(String),
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    Text,
    Timestamp,
    Uuid,
    Varchar,
    Varint,
    Timeuuid,
    Inet,
    Date,
    Time,
    SmallInt,
    TinyInt,
    List(Box<ColumnType>),
    Map(Box<ColumnType>, Box<ColumnType>),
    Set(Box<ColumnType>),
    UserDefinedType {
        keyspace: String,
        type_name: String,
        field_types: Vec<(String, ColumnType)>,
    },
    Tuple(Vec<ColumnType>),
    /// A type id we do not know. It carries no options we could parse.
    Other(u16),
}

impl ColumnType {
    /// The type id this type is announced with.
    pub fn code(&self) -> u16 {
        match self {
            ColumnType::Custom(_) => 0x0000,
            ColumnType::Ascii => 0x0001,
            ColumnType::BigInt => 0x0002,
            ColumnType::Blob => 0x0003,
            ColumnType::Boolean => 0x0004,
            ColumnType::Counter => 0x0005,
            ColumnType::Decimal => 0x0006,
            ColumnType::Double => 0x0007,
            ColumnType::Float => 0x0008,
            ColumnType::Int => 0x0009,
            ColumnType::Text => 0x000A,
            ColumnType::Timestamp => 0x000B,
            ColumnType::Uuid => 0x000C,
            ColumnType::Varchar => 0x000D,
            ColumnType::Varint => 0x000E,
            ColumnType::Timeuuid => 0x000F,
            ColumnType::Inet => 0x0010,
            ColumnType::Date => 0x0011,
            ColumnType::Time => 0x0012,
            ColumnType::SmallInt => 0x0013,
            ColumnType::TinyInt => 0x0014,
            ColumnType::List(_) => 0x0020,
            ColumnType::Map(_, _) => 0x0021,
            ColumnType::Set(_) => 0x0022,
            ColumnType::UserDefinedType { .. } => 0x0030,
            ColumnType::Tuple(_) => 0x0031,
            ColumnType::Other(code) => *code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub(crate) table_spec: TableSpec,
    pub(crate) name: String,
    pub(crate) typ: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, typ: ColumnType, table_spec: TableSpec) -> Self {
        Self {
            table_spec,
            name: name.into(),
            typ,
        }
    }

    pub fn table_spec(&self) -> &TableSpec {
        &self.table_spec
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> &ColumnType {
        &self.typ
    }
}

/// Column specifications of a prepared statement's bind markers or of a row set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultMetadata {
    col_specs: Vec<ColumnSpec>,
}

impl ResultMetadata {
    pub fn new(col_specs: Vec<ColumnSpec>) -> Self {
        Self { col_specs }
    }

    pub fn col_count(&self) -> usize {
        self.col_specs.len()
    }

    pub fn col_specs(&self) -> &[ColumnSpec] {
        &self.col_specs
    }

    pub fn into_col_specs(self) -> Vec<ColumnSpec> {
        self.col_specs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rows {
    pub metadata: ResultMetadata,
    pub rows_count: usize,
    /// Row contents, not yet split into cells.
    pub raw_rows: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Result {
    Void,
    Rows(Rows),
    SetKeyspace(SetKeyspace),
    Prepared(Prepared),
    SchemaChange(SchemaChange),
}

impl Result {
    /// Name of the result kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Result::Void => "RESULT:Void",
            Result::Rows(_) => "RESULT:Rows",
            Result::SetKeyspace(_) => "RESULT:Set_keyspace",
            Result::Prepared(_) => "RESULT:Prepared",
            Result::SchemaChange(_) => "RESULT:Schema_change",
        }
    }
}

fn deser_type(buf: &mut &[u8]) -> StdResult<ColumnType, CqlTypeParseError> {
    use ColumnType::*;
    let id =
        types::read_short(buf).map_err(|err| CqlTypeParseError::TypeIdParseError(err.into()))?;
    Ok(match id {
        0x0000 => {
            let type_str =
                types::read_string(buf).map_err(CqlTypeParseError::CustomTypeNameParseError)?;
            Custom(type_str.to_owned())
        }
        0x0001 => Ascii,
        0x0002 => BigInt,
        0x0003 => Blob,
        0x0004 => Boolean,
        0x0005 => Counter,
        0x0006 => Decimal,
        0x0007 => Double,
        0x0008 => Float,
        0x0009 => Int,
        0x000A => Text,
        0x000B => Timestamp,
        0x000C => Uuid,
        0x000D => Varchar,
        0x000E => Varint,
        0x000F => Timeuuid,
        0x0010 => Inet,
        0x0011 => Date,
        0x0012 => Time,
        0x0013 => SmallInt,
        0x0014 => TinyInt,
        0x0020 => List(Box::new(deser_type(buf)?)),
        0x0021 => Map(Box::new(deser_type(buf)?), Box::new(deser_type(buf)?)),
        0x0022 => Set(Box::new(deser_type(buf)?)),
        0x0030 => {
            let keyspace = types::read_string(buf)
                .map_err(CqlTypeParseError::UdtKeyspaceNameParseError)?
                .to_owned();
            let type_name = types::read_string(buf)
                .map_err(CqlTypeParseError::UdtNameParseError)?
                .to_owned();
            let fields_size: usize = types::read_short(buf)
                .map_err(|err| CqlTypeParseError::UdtFieldsCountParseError(err.into()))?
                .into();

            let mut field_types = Vec::with_capacity(fields_size);
            for _ in 0..fields_size {
                let field_name = types::read_string(buf)
                    .map_err(CqlTypeParseError::UdtFieldNameParseError)?
                    .to_owned();
                let field_type = deser_type(buf)?;
                field_types.push((field_name, field_type));
            }

            UserDefinedType {
                keyspace,
                type_name,
                field_types,
            }
        }
        0x0031 => {
            let len: usize = types::read_short(buf)
                .map_err(|err| CqlTypeParseError::TupleLengthParseError(err.into()))?
                .into();
            let mut types = Vec::with_capacity(len);
            for _ in 0..len {
                types.push(deser_type(buf)?);
            }
            Tuple(types)
        }
        id => Other(id),
    })
}

fn deser_table_spec(buf: &mut &[u8]) -> StdResult<TableSpec, TableSpecParseError> {
    let ks_name = types::read_string(buf).map_err(TableSpecParseError::MalformedKeyspaceName)?;
    let table_name = types::read_string(buf).map_err(TableSpecParseError::MalformedTableName)?;
    Ok(TableSpec::new(ks_name, table_name))
}

fn mk_col_spec_parse_error(
    col_idx: usize,
    err: impl Into<ColumnSpecParseErrorKind>,
) -> ColumnSpecParseError {
    ColumnSpecParseError {
        column_index: col_idx,
        kind: err.into(),
    }
}

fn deser_col_specs(
    buf: &mut &[u8],
    global_table_spec: Option<TableSpec>,
    col_count: usize,
) -> StdResult<Vec<ColumnSpec>, ColumnSpecParseError> {
    // The count comes from the wire, so it only bounds the preallocation loosely.
    let mut col_specs = Vec::with_capacity(col_count.min(buf.len()));
    for col_idx in 0..col_count {
        let table_spec = match &global_table_spec {
            Some(spec) => spec.clone(),
            None => deser_table_spec(buf).map_err(|err| mk_col_spec_parse_error(col_idx, err))?,
        };
        let name = types::read_string(buf)
            .map_err(|err| mk_col_spec_parse_error(col_idx, err))?
            .to_owned();
        let typ = deser_type(buf).map_err(|err| mk_col_spec_parse_error(col_idx, err))?;
        col_specs.push(ColumnSpec {
            table_spec,
            name,
            typ,
        });
    }
    Ok(col_specs)
}

/// Deserializes a metadata block, advancing `buf` past it.
pub fn deser_result_metadata(
    buf: &mut &[u8],
) -> StdResult<ResultMetadata, ResultMetadataParseError> {
    let flags = types::read_int(buf)
        .map_err(|err| ResultMetadataParseError::FlagsParseError(err.into()))?;
    let global_tables_spec = flags & FLAG_GLOBAL_TABLES_SPEC != 0;

    let col_count =
        types::read_int_length(buf).map_err(ResultMetadataParseError::ColumnCountParseError)?;

    let global_table_spec = global_tables_spec
        .then(|| deser_table_spec(buf))
        .transpose()?;

    let col_specs = deser_col_specs(buf, global_table_spec, col_count)?;

    Ok(ResultMetadata { col_specs })
}

/// Parses a metadata block at the start of `body`.
///
/// Returns the metadata and the number of bytes it occupied, so that
/// the caller can find what follows it.
pub fn parse_metadata(body: &[u8]) -> StdResult<(ResultMetadata, usize), ResultMetadataParseError> {
    let mut buf = body;
    let metadata = deser_result_metadata(&mut buf)?;
    Ok((metadata, body.len() - buf.len()))
}

fn deser_rows(buf_bytes: Bytes) -> StdResult<Rows, RowsParseError> {
    let buf = &mut &*buf_bytes;
    let metadata = deser_result_metadata(buf)?;

    let rows_count: usize =
        types::read_int_length(buf).map_err(RowsParseError::RowsCountParseError)?;

    Ok(Rows {
        metadata,
        rows_count,
        raw_rows: buf_bytes.slice_ref(buf),
    })
}

fn deser_prepared(buf: &mut &[u8]) -> StdResult<Prepared, PreparedParseError> {
    let id: Bytes = types::read_short_bytes(buf)
        .map_err(PreparedParseError::IdLengthParseError)?
        .to_owned()
        .into();
    let metadata = deser_result_metadata(buf)?;

    Ok(Prepared { id, metadata })
}

fn deser_schema_change(buf: &mut &[u8]) -> StdResult<SchemaChange, CqlResultParseError> {
    let mut read = || {
        types::read_string(buf)
            .map(ToOwned::to_owned)
            .map_err(CqlResultParseError::SchemaChangeParseError)
    };
    Ok(SchemaChange {
        change: read()?,
        keyspace_name: read()?,
        table_name: read()?,
    })
}

/// Deserializes the body of a RESULT frame.
pub fn deserialize(buf_bytes: Bytes) -> StdResult<Result, CqlResultParseError> {
    let buf = &mut &*buf_bytes;
    use self::Result::*;
    Ok(
        match types::read_int(buf)
            .map_err(|err| CqlResultParseError::ResultIdParseError(err.into()))?
        {
            0x0001 => Void,
            0x0002 => Rows(deser_rows(buf_bytes.slice_ref(buf))?),
            0x0003 => SetKeyspace(self::SetKeyspace {
                keyspace_name: types::read_string(buf)
                    .map_err(CqlResultParseError::SetKeyspaceParseError)?
                    .to_owned(),
            }),
            0x0004 => Prepared(deser_prepared(buf)?),
            0x0005 => SchemaChange(deser_schema_change(buf)?),
            id => return Err(CqlResultParseError::UnknownResultId(id)),
        },
    )
}
