//! Fabric error codes
//!
//! Every fabric entry point reports failure as an [`Errno`] value returned
//! directly from the failing call. There is no process-global error slot to
//! read afterwards, so a code can never be overwritten by a later call
//! before the caller inspects it.

use thiserror::Error;

/// Closed set of fabric error codes.
///
/// Codes follow the usual errno numbering where one exists; `BadState` is a
/// fabric extension for protocol state machine violations and uses a code
/// above the errno range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Errno {
    /// Operation cannot complete without blocking (DONTWAIT was set)
    #[error("operation would block")]
    WouldBlock = 11,

    /// Unknown or already-closed socket handle
    #[error("bad socket handle")]
    BadHandle = 9,

    /// Fabric allocation refused
    #[error("out of message memory")]
    OutOfMemory = 12,

    /// Malformed argument (address, option value, endpoint id, ...)
    #[error("invalid argument")]
    InvalidArgument = 22,

    /// Socket table is full
    #[error("too many open sockets")]
    TooManySockets = 24,

    /// Received segmentation does not fit the caller's descriptor
    #[error("message does not fit the supplied descriptor")]
    MessageSize = 90,

    /// Unknown option id, or option not valid at the given level
    #[error("unknown option for this socket")]
    BadOption = 92,

    /// Address scheme is recognized but not operational in this fabric
    #[error("transport not supported")]
    ProtocolNotSupported = 93,

    /// Operation is meaningless for this protocol (e.g. receive on PUB)
    #[error("operation not supported by protocol")]
    NotSupported = 95,

    /// Another socket already owns this address
    #[error("address already in use")]
    AddressInUse = 98,

    /// Deadline elapsed before the operation could complete
    #[error("operation timed out")]
    TimedOut = 110,

    /// Operation not permitted in the socket's current protocol state
    #[error("protocol state does not permit this operation")]
    BadState = 1000,
}

impl Errno {
    /// Numeric code, stable across releases.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Fixed human-readable reason string for this code.
    #[must_use]
    pub fn message(self) -> String {
        self.to_string()
    }

    /// True for the transient "try again" condition.
    #[must_use]
    pub const fn is_would_block(self) -> bool {
        matches!(self, Self::WouldBlock)
    }

    /// True when a configured deadline expired.
    #[must_use]
    pub const fn is_timed_out(self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Result type alias for fabric operations
pub type Result<T> = std::result::Result<T, Errno>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Errno::WouldBlock.code(), 11);
        assert_eq!(Errno::BadHandle.code(), 9);
        assert_eq!(Errno::TimedOut.code(), 110);
        assert_eq!(Errno::BadState.code(), 1000);
    }

    #[test]
    fn test_messages_are_fixed() {
        assert_eq!(Errno::WouldBlock.message(), "operation would block");
        assert_eq!(
            Errno::AddressInUse.message(),
            "address already in use"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(Errno::WouldBlock.is_would_block());
        assert!(!Errno::WouldBlock.is_timed_out());
        assert!(Errno::TimedOut.is_timed_out());
    }
}
