//! Entry points for front ends that open connections by name.

pub mod driver;
