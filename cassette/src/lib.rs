//! Async Rust client for Cassandra-compatible databases, speaking
//! version 1 of the CQL native protocol over a single connection.
//!
//! # Driver overview
//! ### Connecting
//! A [Connection] is opened from a connection string: a list of hosts
//! followed by options.
//!
//! ```rust,no_run
//! use cassette::Connection;
//! use std::error::Error;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     let connection = Connection::open("10.0.0.1,10.0.0.2:9043 keyspace=shop consistency=quorum")
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//! The hosts are tried in random order. See [ConnectionConfig] for the options.
//!
//! ### Making queries
//! Statements are [prepared](Connection::prepare) first, then
//! [executed](Connection::execute) for their side effects or
//! [queried](Connection::query) for rows. Bound values are sent as raw
//! bytes; [PreparedStatement::bind] encodes native values using the
//! types of the bind markers:
//!
//! ```rust
//! # use cassette::Connection;
//! # use std::error::Error;
//! # async fn check_only_compiles(connection: &mut Connection) -> Result<(), Box<dyn Error>> {
//! use cassette::value::{CqlValue, NativeCodec};
//!
//! let insert = connection.prepare("INSERT INTO items (id, name) VALUES (?, ?)").await?;
//! let values = insert.bind(
//!     vec![CqlValue::Int(2).into(), CqlValue::Text("some text".to_owned()).into()],
//!     &NativeCodec,
//! )?;
//! connection.execute(&insert, &values).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Receiving results
//! [Connection::query] returns a [ResultSet], which decodes rows one at a time:
//!
//! ```rust
//! # use cassette::Connection;
//! # use std::error::Error;
//! # async fn check_only_compiles(connection: &mut Connection) -> Result<(), Box<dyn Error>> {
//! let select = connection.prepare("SELECT id, name FROM items").await?;
//! let mut rows = connection.query(&select, &[]).await?;
//!
//! while let Some(row) = rows.next_row()? {
//!     // A null cell is `None`
//!     let id = row[0].as_ref().and_then(|v| v.as_int());
//!     println!("{:?}", id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Transient server failures (write timeouts, read timeouts, overload) are
//! retried as many times as the `retries` option allows.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

/// Protocol types appearing in the public API.
pub mod frame {
    pub use cassette_cql::frame::{frame_errors, Compression, Opcode};

    /// Consistency levels.
    pub mod types {
        pub use cassette_cql::frame::types::{Consistency, UnknownConsistency};
    }

    /// Response metadata.
    pub mod response {
        /// Column specs and types of prepared statements and rows.
        pub mod result {
            pub use cassette_cql::frame::response::result::{ColumnSpec, ColumnType, TableSpec};
        }
    }
}

/// Native values and the default codec.
pub mod value {
    pub use cassette_cql::value::*;
}

/// Serializing bound values of a statement to be sent to the DB.
pub mod serialize {
    pub use cassette_cql::serialize::*;
}

/// Deserializing rows returned by the DB.
pub mod deserialize {
    pub use cassette_cql::deserialize::*;
}

pub mod client;
pub mod errors;
pub mod network;
pub mod policies;
pub mod response;
pub mod statement;

pub(crate) mod utils;

pub use cassette_cql::errors::DbError;
pub use cassette_cql::Consistency;

pub use client::driver::{ConnectionFactory, Driver};
pub use errors::QueryError;
pub use network::{Connection, ConnectionConfig, Transaction};
pub use response::result_set::ResultSet;
pub use statement::prepared::PreparedStatement;
