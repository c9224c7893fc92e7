//! Cursor over the rows of a RESULT:Rows response.

use bytes::Bytes;
use cassette_cql::deserialize::{self, DeserializeCell, RowDeserializationError};
use cassette_cql::frame::response::result::{ColumnSpec, Rows};
use cassette_cql::value::{CqlValue, NativeCodec};

/// Rows returned by a [`query`](crate::Connection::query), decoded lazily
/// with a forward-only cursor.
///
/// ```rust,no_run
/// # use cassette::Connection;
/// # async fn example(connection: &mut Connection) -> Result<(), Box<dyn std::error::Error>> {
/// let prepared = connection.prepare("SELECT id, name FROM items").await?;
/// let mut rows = connection.query(&prepared, &[]).await?;
///
/// while let Some(row) = rows.next_row()? {
///     println!("{:?}", row);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ResultSet {
    col_specs: Vec<ColumnSpec>,
    rows_count: usize,
    raw_rows: Bytes,
    next_row: usize,
}

impl ResultSet {
    pub(crate) fn new(rows: Rows) -> Self {
        Self {
            col_specs: rows.metadata.into_col_specs(),
            rows_count: rows.rows_count,
            raw_rows: rows.raw_rows,
            next_row: 0,
        }
    }

    /// Column names, in order.
    pub fn columns(&self) -> Vec<&str> {
        self.col_specs.iter().map(ColumnSpec::name).collect()
    }

    /// Name and type of every column, in order.
    pub fn col_specs(&self) -> &[ColumnSpec] {
        &self.col_specs
    }

    /// Number of rows the server sent, regardless of how many were read.
    pub fn rows_num(&self) -> usize {
        self.rows_count
    }

    /// Decodes the next row with [NativeCodec].
    ///
    /// Returns `Ok(None)` once all rows have been read. A null cell is `None`.
    pub fn next_row(&mut self) -> Result<Option<Vec<Option<CqlValue>>>, RowDeserializationError> {
        self.next_row_with(&NativeCodec)
    }

    /// Decodes the next row with a custom decoder.
    pub fn next_row_with(
        &mut self,
        decoder: &impl DeserializeCell,
    ) -> Result<Option<Vec<Option<CqlValue>>>, RowDeserializationError> {
        let mut row = Vec::with_capacity(self.col_specs.len());
        match self.next_into_with(&mut row, decoder)? {
            true => Ok(Some(row)),
            false => Ok(None),
        }
    }

    /// Decodes the next row with [NativeCodec] into `dest`, replacing its
    /// contents. Returns `Ok(false)`, leaving `dest` untouched, once all
    /// rows have been read.
    pub fn next_into(
        &mut self,
        dest: &mut Vec<Option<CqlValue>>,
    ) -> Result<bool, RowDeserializationError> {
        self.next_into_with(dest, &NativeCodec)
    }

    /// Like [ResultSet::next_into], with a custom decoder.
    ///
    /// A row that fails to decode leaves the cursor exhausted, since the
    /// position of the following row is unknown.
    pub fn next_into_with(
        &mut self,
        dest: &mut Vec<Option<CqlValue>>,
        decoder: &impl DeserializeCell,
    ) -> Result<bool, RowDeserializationError> {
        if self.next_row >= self.rows_count {
            return Ok(false);
        }
        match deserialize::deser_row_into(&mut self.raw_rows, &self.col_specs, decoder, dest) {
            Ok(()) => {
                self.next_row += 1;
                Ok(true)
            }
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    /// Drops the remaining rows. Further reads report the end of data.
    pub fn close(&mut self) {
        self.next_row = self.rows_count;
        self.raw_rows = Bytes::new();
    }
}
