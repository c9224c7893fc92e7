mod connection_string;
mod queries;
mod recycle;
mod retries;
mod transport;
pub(crate) mod utils;
