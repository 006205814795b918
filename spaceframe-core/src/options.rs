//! Socket configuration options
//!
//! Typed storage for every per-socket option the fabric understands, plus
//! the raw byte marshalling used by the C-shaped `set_option`/`get_option`
//! entry points. Integer options travel as exactly four native-endian
//! bytes; string options travel as UTF-8.

use std::time::Duration;

use crate::error::{Errno, Result};
use crate::protocol;
use crate::timeout;

/// Per-socket options.
///
/// Defaults follow the substrate's documented values. Buffer, priority and
/// reconnect settings are stored and read back even where in-process
/// delivery has no use for them; callers configure them and expect the
/// round-trip.
///
/// # Examples
///
/// ```
/// use spaceframe_core::options::SocketOptions;
/// use std::time::Duration;
///
/// let opts = SocketOptions::default()
///     .with_recv_timeout(Some(Duration::from_millis(500)))
///     .with_rcvbuf(64 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Grace period for pending output on close.
    /// - `None`: wait indefinitely
    /// - Default: 1000 ms
    pub linger: Option<Duration>,

    /// Send-side buffer size in bytes. Inert for in-process delivery
    /// (hand-off is direct); stored for round-trip.
    /// - Default: 128 KiB
    pub sndbuf: usize,

    /// Receive queue bound in bytes; admission charges at least one byte
    /// per message.
    /// - Default: 128 KiB
    pub rcvbuf: usize,

    /// Maximum time a send may block.
    /// - `None`: block indefinitely (default)
    /// - `Some(Duration::ZERO)`: fail immediately when not ready
    pub send_timeout: Option<Duration>,

    /// Maximum time a receive may block.
    /// - `None`: block indefinitely (default)
    /// - `Some(Duration::ZERO)`: fail immediately when not ready
    pub recv_timeout: Option<Duration>,

    /// Interval before an unanswered request may be re-issued by the
    /// caller. Stored for round-trip; re-sending is caller-driven.
    /// - Default: 60 000 ms
    pub resend_ivl: Duration,

    /// Initial reconnect interval. Inert in-process; stored for round-trip.
    /// - Default: 100 ms
    pub reconnect_ivl: Duration,

    /// Reconnect backoff cap; zero disables backoff.
    /// - Default: 0
    pub reconnect_ivl_max: Duration,

    /// Outbound priority, 1..=16. Inert in-process; stored for round-trip.
    /// - Default: 8
    pub send_priority: i32,

    /// Restrict transports to IPv4. Inert in-process; stored for
    /// round-trip.
    /// - Default: true
    pub ipv4_only: bool,

    /// How long a survey collects responses before it terminates.
    /// - `None`: no deadline
    /// - Default: 1000 ms
    pub surveyor_deadline: Option<Duration>,

    /// Diagnostic name; the fabric assigns `socket.<fd>` at open.
    pub socket_name: String,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            linger: Some(Duration::from_millis(1000)),
            sndbuf: 128 * 1024,
            rcvbuf: 128 * 1024,
            send_timeout: None, // Block indefinitely
            recv_timeout: None, // Block indefinitely
            resend_ivl: Duration::from_millis(60_000),
            reconnect_ivl: Duration::from_millis(100),
            reconnect_ivl_max: Duration::ZERO, // No backoff
            send_priority: 8,
            ipv4_only: true,
            surveyor_deadline: Some(Duration::from_millis(1000)),
            socket_name: String::from("socket.0"),
        }
    }
}

impl SocketOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the linger period (`None` waits indefinitely).
    #[must_use]
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// Set the send buffer size.
    #[must_use]
    pub fn with_sndbuf(mut self, bytes: usize) -> Self {
        self.sndbuf = bytes;
        self
    }

    /// Set the receive queue bound.
    #[must_use]
    pub fn with_rcvbuf(mut self, bytes: usize) -> Self {
        self.rcvbuf = bytes;
        self
    }

    /// Set the send timeout (`None` blocks indefinitely).
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the receive timeout (`None` blocks indefinitely).
    #[must_use]
    pub fn with_recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the request resend interval.
    #[must_use]
    pub fn with_resend_ivl(mut self, ivl: Duration) -> Self {
        self.resend_ivl = ivl;
        self
    }

    /// Set the survey deadline (`None` collects forever).
    #[must_use]
    pub fn with_surveyor_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.surveyor_deadline = deadline;
        self
    }

    /// Set the diagnostic socket name.
    #[must_use]
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket_name = name.into();
        self
    }

    /// True when sends should fail instead of blocking.
    #[must_use]
    pub fn is_send_nonblocking(&self) -> bool {
        matches!(self.send_timeout, Some(d) if d.is_zero())
    }

    /// True when receives should fail instead of blocking.
    #[must_use]
    pub fn is_recv_nonblocking(&self) -> bool {
        matches!(self.recv_timeout, Some(d) if d.is_zero())
    }

    /// Apply a raw option write.
    ///
    /// `protocol` is the owning socket's protocol id; protocol-level
    /// options are only accepted at the matching level. Subscription
    /// options never reach here (they edit socket state, not options).
    ///
    /// # Errors
    ///
    /// * [`Errno::BadOption`] for an unknown option or a level mismatch
    /// * [`Errno::InvalidArgument`] for a malformed or read-only value
    pub fn set_raw(&mut self, level: i32, option: i32, value: &[u8], proto: i32) -> Result<()> {
        match (level, option) {
            (protocol::SOL_SOCKET, protocol::LINGER) => {
                self.linger = timeout::from_millis(int_value(value)?)?;
            }
            (protocol::SOL_SOCKET, protocol::SNDBUF) => {
                self.sndbuf = positive_size(int_value(value)?)?;
            }
            (protocol::SOL_SOCKET, protocol::RCVBUF) => {
                self.rcvbuf = positive_size(int_value(value)?)?;
            }
            (protocol::SOL_SOCKET, protocol::SNDTIMEO) => {
                self.send_timeout = timeout::from_millis(int_value(value)?)?;
            }
            (protocol::SOL_SOCKET, protocol::RCVTIMEO) => {
                self.recv_timeout = timeout::from_millis(int_value(value)?)?;
            }
            (protocol::SOL_SOCKET, protocol::RECONNECT_IVL) => {
                let ms = int_value(value)?;
                if ms < 1 {
                    return Err(Errno::InvalidArgument);
                }
                self.reconnect_ivl = Duration::from_millis(ms as u64);
            }
            (protocol::SOL_SOCKET, protocol::RECONNECT_IVL_MAX) => {
                let ms = int_value(value)?;
                if ms < 0 {
                    return Err(Errno::InvalidArgument);
                }
                self.reconnect_ivl_max = Duration::from_millis(ms as u64);
            }
            (protocol::SOL_SOCKET, protocol::SNDPRIO) => {
                let prio = int_value(value)?;
                if !(1..=16).contains(&prio) {
                    return Err(Errno::InvalidArgument);
                }
                self.send_priority = prio;
            }
            (protocol::SOL_SOCKET, protocol::IPV4ONLY) => {
                self.ipv4_only = match int_value(value)? {
                    0 => false,
                    1 => true,
                    _ => return Err(Errno::InvalidArgument),
                };
            }
            (protocol::SOL_SOCKET, protocol::SOCKET_NAME) => {
                self.socket_name = str_value(value)?;
            }
            // Identity options are answered from the socket itself
            (protocol::SOL_SOCKET, protocol::DOMAIN | protocol::PROTOCOL) => {
                return Err(Errno::InvalidArgument);
            }
            (protocol::REQ, protocol::REQ_RESEND_IVL) if protocol::family(proto) == protocol::REQ => {
                let ms = int_value(value)?;
                if ms < 1 {
                    return Err(Errno::InvalidArgument);
                }
                self.resend_ivl = Duration::from_millis(ms as u64);
            }
            (protocol::SURVEYOR, protocol::SURVEYOR_DEADLINE)
                if protocol::family(proto) == protocol::SURVEYOR =>
            {
                self.surveyor_deadline = timeout::from_millis(int_value(value)?)?;
            }
            _ => return Err(Errno::BadOption),
        }
        Ok(())
    }

    /// Read a raw option value.
    ///
    /// # Errors
    ///
    /// [`Errno::BadOption`] for an unknown option or a level mismatch.
    pub fn get_raw(&self, level: i32, option: i32, domain: i32, proto: i32) -> Result<Vec<u8>> {
        let int = |v: i32| v.to_ne_bytes().to_vec();
        match (level, option) {
            (protocol::SOL_SOCKET, protocol::LINGER) => Ok(int(timeout::to_millis(self.linger))),
            (protocol::SOL_SOCKET, protocol::SNDBUF) => Ok(int(clamped(self.sndbuf))),
            (protocol::SOL_SOCKET, protocol::RCVBUF) => Ok(int(clamped(self.rcvbuf))),
            (protocol::SOL_SOCKET, protocol::SNDTIMEO) => {
                Ok(int(timeout::to_millis(self.send_timeout)))
            }
            (protocol::SOL_SOCKET, protocol::RCVTIMEO) => {
                Ok(int(timeout::to_millis(self.recv_timeout)))
            }
            (protocol::SOL_SOCKET, protocol::RECONNECT_IVL) => {
                Ok(int(timeout::to_millis(Some(self.reconnect_ivl))))
            }
            (protocol::SOL_SOCKET, protocol::RECONNECT_IVL_MAX) => {
                Ok(int(timeout::to_millis(Some(self.reconnect_ivl_max))))
            }
            (protocol::SOL_SOCKET, protocol::SNDPRIO) => Ok(int(self.send_priority)),
            (protocol::SOL_SOCKET, protocol::IPV4ONLY) => Ok(int(i32::from(self.ipv4_only))),
            (protocol::SOL_SOCKET, protocol::SOCKET_NAME) => {
                Ok(self.socket_name.as_bytes().to_vec())
            }
            (protocol::SOL_SOCKET, protocol::DOMAIN) => Ok(int(domain)),
            (protocol::SOL_SOCKET, protocol::PROTOCOL) => Ok(int(proto)),
            (protocol::REQ, protocol::REQ_RESEND_IVL) if protocol::family(proto) == protocol::REQ => {
                Ok(int(timeout::to_millis(Some(self.resend_ivl))))
            }
            (protocol::SURVEYOR, protocol::SURVEYOR_DEADLINE)
                if protocol::family(proto) == protocol::SURVEYOR =>
            {
                Ok(int(timeout::to_millis(self.surveyor_deadline)))
            }
            _ => Err(Errno::BadOption),
        }
    }
}

/// Decode an integer option image: exactly four native-endian bytes.
fn int_value(value: &[u8]) -> Result<i32> {
    let bytes: [u8; 4] = value.try_into().map_err(|_| Errno::InvalidArgument)?;
    Ok(i32::from_ne_bytes(bytes))
}

/// Decode a string option image: UTF-8.
fn str_value(value: &[u8]) -> Result<String> {
    String::from_utf8(value.to_vec()).map_err(|_| Errno::InvalidArgument)
}

fn positive_size(v: i32) -> Result<usize> {
    if v < 1 {
        return Err(Errno::InvalidArgument);
    }
    Ok(v as usize)
}

fn clamped(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}
