//! Socket address vocabulary
//!
//! Addresses follow the `scheme://rest` convention. All four classic
//! schemes parse, but this fabric only operates the in-process transport;
//! bind/connect answer `ProtocolNotSupported` for the others.

use std::fmt;
use std::str::FromStr;

use crate::error::Errno;

/// A parsed socket address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// In-process transport: `inproc://name`
    Inproc(String),
    /// TCP transport: `tcp://host:port` (recognized, not operational)
    Tcp(String),
    /// Unix-domain transport: `ipc://path` (recognized, not operational)
    Ipc(String),
    /// WebSocket transport: `ws://host:port` (recognized, not operational)
    Ws(String),
}

impl Address {
    /// Parse an address from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use spaceframe_core::endpoint::Address;
    ///
    /// let addr = Address::parse("inproc://control").unwrap();
    /// assert!(addr.is_operational());
    /// assert_eq!(addr.to_string(), "inproc://control");
    ///
    /// let addr = Address::parse("tcp://127.0.0.1:5555").unwrap();
    /// assert!(!addr.is_operational());
    /// ```
    pub fn parse(s: &str) -> Result<Self, Errno> {
        s.parse()
    }

    /// True when this fabric can carry traffic for the address.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::Inproc(_))
    }

    /// The in-process name, for operational addresses.
    #[must_use]
    pub fn inproc_name(&self) -> Option<&str> {
        match self {
            Self::Inproc(name) => Some(name),
            _ => None,
        }
    }
}

impl FromStr for Address {
    type Err = Errno;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("inproc://") {
            if name.is_empty() {
                return Err(Errno::InvalidArgument);
            }
            Ok(Self::Inproc(name.to_string()))
        } else if let Some(rest) = s.strip_prefix("tcp://") {
            Ok(Self::Tcp(rest.to_string()))
        } else if let Some(rest) = s.strip_prefix("ipc://") {
            Ok(Self::Ipc(rest.to_string()))
        } else if let Some(rest) = s.strip_prefix("ws://") {
            Ok(Self::Ws(rest.to_string()))
        } else {
            Err(Errno::InvalidArgument)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inproc(name) => write!(f, "inproc://{name}"),
            Self::Tcp(rest) => write!(f, "tcp://{rest}"),
            Self::Ipc(rest) => write!(f, "ipc://{rest}"),
            Self::Ws(rest) => write!(f, "ws://{rest}"),
        }
    }
}
