//! Policies that shape how requests are executed.

pub mod retry;
