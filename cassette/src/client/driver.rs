//! Opening connections through a factory chosen by name.

use async_trait::async_trait;

use crate::errors::QueryError;
use crate::network::Connection;

/// Something that opens connections from a connection string.
///
/// A front end mapping driver names to factories keeps them as
/// `Box<dyn ConnectionFactory>`. Nothing is registered globally.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Name under which the factory is meant to be registered.
    fn name(&self) -> &'static str;

    /// Opens a connection from a connection string.
    async fn open(&self, name: &str) -> Result<Connection, QueryError>;
}

/// The factory for [Connection]s.
///
/// ```rust,no_run
/// # async fn example() -> Result<(), cassette::errors::QueryError> {
/// use std::collections::HashMap;
/// use cassette::{ConnectionFactory, Driver};
///
/// let mut drivers: HashMap<&str, Box<dyn ConnectionFactory>> = HashMap::new();
/// drivers.insert(Driver::NAME, Box::new(Driver));
///
/// let connection = drivers[Driver::NAME]
///     .open("127.0.0.1:9042 consistency=quorum")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Driver;

impl Driver {
    /// The name this driver is registered under.
    pub const NAME: &'static str = "cassette";
}

#[async_trait]
impl ConnectionFactory for Driver {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn open(&self, name: &str) -> Result<Connection, QueryError> {
        Connection::open(name).await
    }
}
