//! Parsing of connection strings.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use cassette_cql::frame::request::startup::DEFAULT_CQL_VERSION;
use cassette_cql::frame::Compression;
use cassette_cql::Consistency;

use crate::errors::ConnectionStringError;
use crate::policies::retry::Retries;
use crate::utils::parse::{parse_duration_nanos, parse_prefixed_int, ParseError};

/// Port used for hosts given without one.
pub const DEFAULT_PORT: u16 = 9042;

/// Everything a connection string can say about a connection.
///
/// A connection string is a comma-separated list of hosts, optionally
/// followed by space-separated `key=value` options:
///
/// ```text
/// 10.0.0.1,10.0.0.2:9043 keyspace=shop consistency=quorum retries=3
/// ```
///
/// | key | value |
/// |-----|-------|
/// | `keyspace` | keyspace to `USE` once connected |
/// | `compression` | `snappy` |
/// | `version` | CQL version announced in STARTUP, `3.0.0` by default |
/// | `consistency` | read and write consistency |
/// | `readconsistency`, `writeconsistency` | one of them only |
/// | `recycle` | connection lifetime, e.g. `30m` or `1h30m`; zero or negative means forever |
/// | `retries` | resends after transient failures; negative means no limit |
///
/// Keys are case-insensitive and options are applied left to right,
/// so later ones override earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ConnectionConfig {
    /// `host:port` addresses, tried in random order.
    pub hosts: Vec<String>,
    /// Keyspace to `USE` after the handshake.
    pub keyspace: Option<String>,
    /// Compression requested in STARTUP. Only responses are compressed.
    pub compression: Option<Compression>,
    /// CQL version announced in STARTUP.
    pub cql_version: String,
    /// Consistency of [`Connection::query`](crate::Connection::query).
    pub read_consistency: Consistency,
    /// Consistency of [`Connection::execute`](crate::Connection::execute).
    pub write_consistency: Consistency,
    /// How long the connection may be used for, counted from when it is opened.
    pub recycle: Option<Duration>,
    /// Retry budget for transient server errors.
    pub retries: Retries,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            keyspace: None,
            compression: None,
            cql_version: DEFAULT_CQL_VERSION.to_owned(),
            read_consistency: Consistency::One,
            write_consistency: Consistency::One,
            recycle: None,
            retries: Retries::default(),
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration with default options for the given hosts.
    pub fn new(hosts: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            hosts: hosts
                .into_iter()
                .map(|host| with_default_port(host.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    /// Applies a single `key=value` option.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<(), ConnectionStringError> {
        let value = value.trim();
        match key.to_lowercase().as_str() {
            "keyspace" => {
                self.keyspace = (!value.is_empty()).then(|| value.to_owned());
            }
            "compression" => {
                self.compression = Some(value.parse()?);
            }
            "version" => {
                self.cql_version = value.to_owned();
            }
            "consistency" => {
                let consistency: Consistency = value.parse()?;
                self.read_consistency = consistency;
                self.write_consistency = consistency;
            }
            "writeconsistency" => {
                self.write_consistency = value.parse()?;
            }
            "readconsistency" => {
                self.read_consistency = value.parse()?;
            }
            "recycle" => {
                let nanos = parse_duration_nanos(value).map_err(|err| {
                    ConnectionStringError::BadRecycle {
                        value: value.to_owned(),
                        reason: describe(err, value),
                    }
                })?;
                self.recycle = u64::try_from(nanos)
                    .ok()
                    .filter(|nanos| *nanos > 0)
                    .map(Duration::from_nanos);
            }
            "retries" => {
                let count =
                    parse_prefixed_int(value).map_err(|err| ConnectionStringError::BadRetries {
                        value: value.to_owned(),
                        reason: describe(err, value),
                    })?;
                self.retries = Retries::from(count);
            }
            other => return Err(ConnectionStringError::UnsupportedOption(other.to_owned())),
        }
        Ok(())
    }
}

fn describe(err: ParseError, input: &str) -> String {
    match err.calculate_position(input) {
        Some(position) => format!("{} at position {}", err.get_cause(), position),
        None => err.get_cause().to_string(),
    }
}

/// Appends [DEFAULT_PORT] to a host that does not name a port.
fn with_default_port(host: &str) -> String {
    if host.parse::<SocketAddr>().is_ok() {
        return host.to_owned();
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return SocketAddr::new(ip, DEFAULT_PORT).to_string();
    }
    match host.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => host.to_owned(),
        _ => format!("{}:{}", host, DEFAULT_PORT),
    }
}

impl FromStr for ConnectionConfig {
    type Err = ConnectionStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(' ');
        let hosts: Vec<&str> = parts
            .next()
            .unwrap_or_default()
            .split(',')
            .filter(|host| !host.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(ConnectionStringError::NoHosts);
        }

        let mut config = ConnectionConfig::new(hosts);
        for part in parts.filter(|part| !part.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MissingEquals(part.to_owned()))?;
            config.set_option(key, value)?;
        }
        Ok(config)
    }
}
