//! Connections to a node and their configuration.

mod config;
mod connection;

pub use config::{ConnectionConfig, DEFAULT_PORT};
pub use connection::{Connection, Transaction};
