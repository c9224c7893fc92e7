//! Statements prepared on a [`Connection`](crate::Connection).

use bytes::Bytes;
use cassette_cql::frame::response::result::ColumnSpec;
use cassette_cql::serialize::{self, SerializationError, SerializeCell, Value};

/// Represents a statement prepared on the server.
///
/// The statement is tied to the connection that prepared it: the server
/// only knows its id on that connection, and executing it elsewhere is
/// rejected with [`QueryError::ForeignStatement`](crate::errors::QueryError::ForeignStatement).
///
/// ```rust,no_run
/// # use cassette::Connection;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use cassette::statement::prepared::PreparedStatement;
/// use cassette::value::{CqlValue, NativeCodec};
///
/// let mut connection = Connection::open("127.0.0.1 keyspace=shop").await?;
/// let prepared: PreparedStatement = connection
///     .prepare("INSERT INTO items (id, name) VALUES (?, ?)")
///     .await?;
///
/// let values = prepared.bind(
///     vec![CqlValue::Int(7).into(), CqlValue::Text("socks".to_owned()).into()],
///     &NativeCodec,
/// )?;
/// connection.execute(&prepared, &values).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    id: Bytes,
    col_specs: Vec<ColumnSpec>,
    statement: String,
    connection_id: u64,
}

impl PreparedStatement {
    pub(crate) fn new(
        id: Bytes,
        col_specs: Vec<ColumnSpec>,
        statement: String,
        connection_id: u64,
    ) -> Self {
        Self {
            id,
            col_specs,
            statement,
            connection_id,
        }
    }

    /// Id assigned by the server.
    pub fn get_id(&self) -> &Bytes {
        &self.id
    }

    /// The statement text as it was prepared.
    pub fn get_statement(&self) -> &str {
        &self.statement
    }

    pub(crate) fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Number of bind markers.
    pub fn col_count(&self) -> usize {
        self.col_specs.len()
    }

    /// Names of the bind markers, in order.
    pub fn col_names(&self) -> impl Iterator<Item = &str> {
        self.col_specs.iter().map(ColumnSpec::name)
    }

    /// Specs of the bind markers, in order.
    pub fn col_specs(&self) -> &[ColumnSpec] {
        &self.col_specs
    }

    /// Turns native values into cell contents, using the types of the bind
    /// markers. Values that are already raw bytes are passed through.
    pub fn bind(
        &self,
        values: Vec<Value>,
        encoder: &impl SerializeCell,
    ) -> Result<Vec<Value>, SerializationError> {
        serialize::bind_values(&self.col_specs, values, encoder)
    }
}
