//! Core utilities and shared types for the fleet ranking engine.

pub mod runguard;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use time::{OffsetDateTime, UtcOffset};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Port Bedrock servers listen on when the address list omits one.
pub const DEFAULT_PORT: u16 = 19132;

/// Minutes since the unix epoch. `NEVER` marks a record that was never touched.
pub type MinuteStamp = i64;

pub const NEVER: MinuteStamp = -1;

pub fn minute_timestamp(at: OffsetDateTime) -> MinuteStamp {
    at.unix_timestamp().div_euclid(60)
}

/// Convert a minute stamp back into a wall-clock time at `offset`. `None` for `NEVER`
/// or values outside the representable range.
pub fn from_minute_timestamp(stamp: MinuteStamp, offset: UtcOffset) -> Option<OffsetDateTime> {
    if stamp < 0 {
        return None;
    }
    let secs = stamp.checked_mul(60)?;
    OffsetDateTime::from_unix_timestamp(secs).ok().map(|t| t.to_offset(offset))
}

/// A configured game-server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
    /// Other configured hostnames that resolved to the same endpoint.
    #[serde(default, alias = "another_hosts")]
    pub alias_hosts: Vec<String>,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Address { host: host.into(), port, ip: None, alias_hosts: Vec::new() }
    }

    pub fn identity(&self) -> Identity {
        match self.ip {
            Some(ip) => Identity::Resolved(ip, self.port),
            None => Identity::Unresolved(self.host.clone(), self.port),
        }
    }

    /// Host string to hand to a probe: the resolved ip when known.
    pub fn probe_host(&self) -> String {
        match self.ip {
            Some(ip) => ip.to_string(),
            None => self.host.clone(),
        }
    }
}

/// Deduplication and storage key of a physical server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Resolved(IpAddr, u16),
    Unresolved(String, u16),
}

impl Identity {
    /// Filesystem-safe form used to name per-server files: `<host>_<port>`, with every
    /// byte of the host outside `[A-Za-z0-9.-]` written as `%XX`. Distinct identities
    /// never share a stem.
    pub fn file_stem(&self) -> String {
        let (host, port) = match self {
            Identity::Resolved(ip, port) => (ip.to_string(), *port),
            Identity::Unresolved(host, port) => (host.clone(), *port),
        };
        let mut stem = String::with_capacity(host.len() + 6);
        for b in host.bytes() {
            if b.is_ascii_alphanumeric() || b == b'.' || b == b'-' {
                stem.push(char::from(b));
            } else {
                stem.push_str(&format!("%{:02X}", b));
            }
        }
        stem.push_str(&format!("_{}", port));
        stem
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Resolved(ip, port) => write!(f, "{}", SocketAddr::new(*ip, *port)),
            Identity::Unresolved(host, port) => write!(f, "{}:{}", host, port),
        }
    }
}
