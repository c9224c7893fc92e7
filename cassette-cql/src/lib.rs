//! Defines CQL native protocol (v1) types and primitives used by the cassette driver.
//!
//! The crate knows nothing about sockets: it builds request frames, validates and
//! parses response frames, and converts column values to and from their wire form.

pub mod errors;
pub mod frame;

pub mod deserialize;
pub mod serialize;

pub mod value;

pub use crate::frame::types::Consistency;
