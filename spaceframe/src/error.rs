//! Spaceframe error types
//!
//! Every fallible operation reports one of four conditions. Fabric codes
//! that have no dedicated variant surface as [`Error::Transport`] with the
//! numeric code and its fixed reason string, so nothing the substrate
//! reports is ever silently collapsed.

use thiserror::Error;

use spaceframe_core::error::Errno;

/// Main error type for spaceframe operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Substrate-level failure, carrying the fabric's numeric code
    #[error("transport error {code}: {reason}")]
    Transport {
        /// Stable fabric error code
        code: i32,
        /// Fixed reason string for the code
        reason: String,
    },

    /// Operation applied to a released part, a closed socket, or a socket
    /// whose protocol state forbids it
    #[error("object state does not permit this operation")]
    InvalidState,

    /// Buffer allocation refused by the fabric
    #[error("message allocation failed")]
    Allocation,

    /// Malformed argument (address, option value, part count, scalar size)
    #[error("invalid argument")]
    InvalidArgument,
}

/// Result type alias for spaceframe operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error from a raw fabric code
    pub fn transport(code: i32, reason: impl Into<String>) -> Self {
        Self::Transport {
            code,
            reason: reason.into(),
        }
    }

    /// The fabric code behind a transport error, if that is what this is
    #[must_use]
    pub fn transport_code(&self) -> Option<i32> {
        match self {
            Self::Transport { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check for the transient "try again" condition of non-blocking calls
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        self.transport_code() == Some(Errno::WouldBlock.code())
    }

    /// Check whether a configured deadline expired
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.transport_code() == Some(Errno::TimedOut.code())
    }

    /// Check whether the handle itself was rejected as unknown or closed
    #[must_use]
    pub fn is_bad_handle(&self) -> bool {
        self.transport_code() == Some(Errno::BadHandle.code())
    }
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::BadState => Self::InvalidState,
            Errno::OutOfMemory => Self::Allocation,
            Errno::InvalidArgument => Self::InvalidArgument,
            other => Self::Transport {
                code: other.code(),
                reason: other.message(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fabric_codes_map_to_variants() {
        assert_eq!(Error::from(Errno::BadState), Error::InvalidState);
        assert_eq!(Error::from(Errno::OutOfMemory), Error::Allocation);
        assert_eq!(Error::from(Errno::InvalidArgument), Error::InvalidArgument);
        assert_eq!(
            Error::from(Errno::AddressInUse),
            Error::Transport {
                code: 98,
                reason: "address already in use".into()
            }
        );
    }

    #[test]
    fn test_predicates_see_through_transport() {
        assert!(Error::from(Errno::WouldBlock).is_would_block());
        assert!(!Error::from(Errno::WouldBlock).is_timed_out());
        assert!(Error::from(Errno::TimedOut).is_timed_out());
        assert!(Error::from(Errno::BadHandle).is_bad_handle());
        assert!(!Error::InvalidState.is_would_block());
    }
}
