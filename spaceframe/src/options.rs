//! Typed socket options
//!
//! [`SocketOption`] is the closed set of configurable knobs; each knows its
//! fabric level, its numeric id and the kind of value it carries, so typed
//! get/set can be checked without an open-ended generic surface.
//! Subscription management is not an option here: [`crate::Socket`] exposes
//! `subscribe`/`unsubscribe` directly.

use spaceframe_core::protocol;

use crate::error::{Error, Result};

/// Closed set of socket options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// How long close keeps trying to flush pending output, in milliseconds
    Linger,
    /// Send buffer size, in bytes
    SendBuffer,
    /// Receive queue bound, in bytes
    ReceiveBuffer,
    /// Send timeout in milliseconds; -1 means infinite
    SendTimeout,
    /// Receive timeout in milliseconds; -1 means infinite
    ReceiveTimeout,
    /// Initial reconnect interval, in milliseconds
    ReconnectInterval,
    /// Reconnect backoff cap, in milliseconds; 0 disables backoff
    ReconnectIntervalMax,
    /// Outbound priority, 1 (highest) to 16 (lowest)
    SendPriority,
    /// Restrict to IPv4 addresses, 0 or 1
    Ipv4Only,
    /// Diagnostic socket name
    SocketName,
    /// Socket domain, read-only
    Domain,
    /// Socket protocol, read-only
    Protocol,
    /// How long a request socket waits before resending, in milliseconds
    RequestResendInterval,
    /// How long a surveyor accepts responses, in milliseconds
    SurveyorDeadline,
}

/// Kind of value an option carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// 32-bit integer
    Int,
    /// UTF-8 string
    Str,
}

impl SocketOption {
    /// Fabric option level: the socket-general level or a protocol family.
    #[must_use]
    pub const fn level(self) -> i32 {
        match self {
            Self::RequestResendInterval => protocol::REQ,
            Self::SurveyorDeadline => protocol::SURVEYOR,
            _ => protocol::SOL_SOCKET,
        }
    }

    /// Fabric option id within its level.
    #[must_use]
    pub const fn id(self) -> i32 {
        match self {
            Self::Linger => protocol::LINGER,
            Self::SendBuffer => protocol::SNDBUF,
            Self::ReceiveBuffer => protocol::RCVBUF,
            Self::SendTimeout => protocol::SNDTIMEO,
            Self::ReceiveTimeout => protocol::RCVTIMEO,
            Self::ReconnectInterval => protocol::RECONNECT_IVL,
            Self::ReconnectIntervalMax => protocol::RECONNECT_IVL_MAX,
            Self::SendPriority => protocol::SNDPRIO,
            Self::Ipv4Only => protocol::IPV4ONLY,
            Self::SocketName => protocol::SOCKET_NAME,
            Self::Domain => protocol::DOMAIN,
            Self::Protocol => protocol::PROTOCOL,
            Self::RequestResendInterval => protocol::REQ_RESEND_IVL,
            Self::SurveyorDeadline => protocol::SURVEYOR_DEADLINE,
        }
    }

    /// Kind of value this option carries.
    #[must_use]
    pub const fn kind(self) -> OptionKind {
        match self {
            Self::SocketName => OptionKind::Str,
            _ => OptionKind::Int,
        }
    }

    /// Decode the fabric's wire image of this option into a typed value.
    pub(crate) fn value_from_wire(self, bytes: Vec<u8>) -> Result<OptionValue> {
        match self.kind() {
            OptionKind::Int => {
                let raw: [u8; 4] = bytes.try_into().map_err(|_| Error::InvalidArgument)?;
                Ok(OptionValue::Int(i32::from_ne_bytes(raw)))
            }
            OptionKind::Str => {
                let text = String::from_utf8(bytes).map_err(|_| Error::InvalidArgument)?;
                Ok(OptionValue::Str(text))
            }
        }
    }
}

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// 32-bit integer value
    Int(i32),
    /// UTF-8 string value
    Str(String),
}

impl OptionValue {
    /// Kind of value this is.
    #[must_use]
    pub const fn kind(&self) -> OptionKind {
        match self {
            Self::Int(_) => OptionKind::Int,
            Self::Str(_) => OptionKind::Str,
        }
    }

    /// The integer inside, if this is an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// The string inside, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(v) => Some(v),
        }
    }

    /// Fabric wire image of this value.
    pub(crate) fn to_wire(&self) -> Vec<u8> {
        match self {
            Self::Int(v) => v.to_ne_bytes().to_vec(),
            Self::Str(v) => v.as_bytes().to_vec(),
        }
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_and_ids() {
        assert_eq!(SocketOption::Linger.level(), 0);
        assert_eq!(SocketOption::Linger.id(), 1);
        assert_eq!(SocketOption::SocketName.id(), 15);
        assert_eq!(SocketOption::RequestResendInterval.level(), 48);
        assert_eq!(SocketOption::RequestResendInterval.id(), 1);
        assert_eq!(SocketOption::SurveyorDeadline.level(), 96);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(SocketOption::SocketName.kind(), OptionKind::Str);
        assert_eq!(SocketOption::ReceiveTimeout.kind(), OptionKind::Int);
        assert_eq!(OptionValue::Int(7).kind(), OptionKind::Int);
        assert_eq!(OptionValue::from("pipe").kind(), OptionKind::Str);
    }

    #[test]
    fn test_wire_round_trip() {
        let int = OptionValue::Int(-1);
        assert_eq!(
            SocketOption::SendTimeout
                .value_from_wire(int.to_wire())
                .unwrap(),
            int
        );
        let name = OptionValue::from("socket.7");
        assert_eq!(
            SocketOption::SocketName
                .value_from_wire(name.to_wire())
                .unwrap(),
            name
        );
        assert!(SocketOption::Linger.value_from_wire(vec![1, 2]).is_err());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(OptionValue::Int(42).as_int(), Some(42));
        assert_eq!(OptionValue::Int(42).as_str(), None);
        assert_eq!(OptionValue::from("bus").as_str(), Some("bus"));
    }
}
