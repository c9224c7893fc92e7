//! Results of requests.

pub mod result_set;
