//! Typed socket vocabulary
//!
//! [`Domain`] and [`SocketType`] are the typed faces of the fabric's numeric
//! identifier space. Parsing accepts the lowercase protocol names used by
//! command-line front ends (`"pair"`, `"sub"`, ...), with a `_raw` suffix
//! selecting the raw domain.

use std::fmt;
use std::str::FromStr;

use spaceframe_core::protocol;

use crate::error::{Error, Result};

/// Socket domain: full pattern behavior, or raw forwarding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Standard SP socket with full end-to-end pattern state machines
    #[default]
    Sp,
    /// Raw SP socket: same routing, pattern state machines bypassed, for
    /// intermediary devices
    SpRaw,
}

impl Domain {
    /// Fabric domain id.
    #[must_use]
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Sp => protocol::AF_SP,
            Self::SpRaw => protocol::AF_SP_RAW,
        }
    }
}

/// Messaging pattern implemented by a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// One-to-one bidirectional pipe
    Pair,
    /// Fan-out publisher, send only
    Pub,
    /// Prefix-filtered subscriber, receive only
    Sub,
    /// Request side of request/reply
    Req,
    /// Reply side of request/reply
    Rep,
    /// Pipeline producer, round-robin, send only
    Push,
    /// Pipeline consumer, receive only
    Pull,
    /// Survey initiator: broadcast with a response deadline
    Surveyor,
    /// Survey responder
    Respondent,
    /// Many-to-many broadcast bus
    Bus,
}

impl SocketType {
    /// Lowercase protocol name, the same vocabulary [`FromStr`] accepts.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "pair",
            Self::Pub => "pub",
            Self::Sub => "sub",
            Self::Req => "req",
            Self::Rep => "rep",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Surveyor => "surveyor",
            Self::Respondent => "respondent",
            Self::Bus => "bus",
        }
    }

    /// Fabric protocol id.
    #[must_use]
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Pair => protocol::PAIR,
            Self::Pub => protocol::PUB,
            Self::Sub => protocol::SUB,
            Self::Req => protocol::REQ,
            Self::Rep => protocol::REP,
            Self::Push => protocol::PUSH,
            Self::Pull => protocol::PULL,
            Self::Surveyor => protocol::SURVEYOR,
            Self::Respondent => protocol::RESPONDENT,
            Self::Bus => protocol::BUS,
        }
    }

    /// Typed view of a fabric protocol id.
    #[must_use]
    pub const fn from_raw(protocol: i32) -> Option<Self> {
        match protocol {
            protocol::PAIR => Some(Self::Pair),
            protocol::PUB => Some(Self::Pub),
            protocol::SUB => Some(Self::Sub),
            protocol::REQ => Some(Self::Req),
            protocol::REP => Some(Self::Rep),
            protocol::PUSH => Some(Self::Push),
            protocol::PULL => Some(Self::Pull),
            protocol::SURVEYOR => Some(Self::Surveyor),
            protocol::RESPONDENT => Some(Self::Respondent),
            protocol::BUS => Some(Self::Bus),
            _ => None,
        }
    }

    /// Protocol family id, shared by both sides of a pattern. This is also
    /// the option level for protocol-specific options.
    #[must_use]
    pub const fn family(self) -> i32 {
        protocol::family(self.to_raw())
    }

    /// True when the fabric would link sockets of these two types.
    #[must_use]
    pub const fn is_compatible(self, peer: Self) -> bool {
        protocol::is_compatible(self.to_raw(), peer.to_raw())
    }

    /// True when the pattern has a send direction at all.
    #[must_use]
    pub const fn can_send(self) -> bool {
        protocol::can_send(self.to_raw())
    }

    /// True when the pattern has a receive direction at all.
    #[must_use]
    pub const fn can_recv(self) -> bool {
        protocol::can_recv(self.to_raw())
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocketType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pair" => Ok(Self::Pair),
            "pub" => Ok(Self::Pub),
            "sub" => Ok(Self::Sub),
            "req" => Ok(Self::Req),
            "rep" => Ok(Self::Rep),
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            "surveyor" => Ok(Self::Surveyor),
            "respondent" => Ok(Self::Respondent),
            "bus" => Ok(Self::Bus),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Parse a socket spec as front ends name them: a protocol name with an
/// optional `_raw` suffix selecting [`Domain::SpRaw`].
///
/// # Errors
///
/// [`Error::InvalidArgument`] for an unknown protocol name.
///
/// # Examples
///
/// ```
/// use spaceframe::socket_type::{parse_spec, Domain, SocketType};
///
/// assert_eq!(parse_spec("req").unwrap(), (Domain::Sp, SocketType::Req));
/// assert_eq!(parse_spec("rep_raw").unwrap(), (Domain::SpRaw, SocketType::Rep));
/// assert!(parse_spec("dealer").is_err());
/// ```
pub fn parse_spec(name: &str) -> Result<(Domain, SocketType)> {
    match name.strip_suffix("_raw") {
        Some(base) => Ok((Domain::SpRaw, base.parse()?)),
        None => Ok((Domain::Sp, name.parse()?)),
    }
}
