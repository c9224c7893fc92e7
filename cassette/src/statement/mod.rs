//! Statements and their lifecycle.

pub mod prepared;
