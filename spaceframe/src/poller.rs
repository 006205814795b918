//! Readiness polling over several sockets
//!
//! [`Poller`] keeps a registration list and asks the fabric about all of it
//! in one call. It stores plain handles, never sockets: registering does
//! not borrow or own the socket beyond the call, and dropping a registered
//! socket simply leaves an entry that never reports again.

use std::time::Duration;

use smallvec::SmallVec;

use spaceframe_core::poll::{self, PollFd};
use spaceframe_core::protocol;

use crate::error::Result;
use crate::socket::Socket;

/// Which readiness directions a registration asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// A message can be received without blocking
    Readable,
    /// The socket would accept a send attempt
    Writable,
    /// Either direction
    Both,
}

impl Interest {
    pub(crate) const fn events(self) -> i32 {
        match self {
            Self::Readable => protocol::POLL_IN,
            Self::Writable => protocol::POLL_OUT,
            Self::Both => protocol::POLL_IN | protocol::POLL_OUT,
        }
    }
}

/// A reusable readiness poll set.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use spaceframe::{Domain, Interest, Poller, Socket, SocketType};
///
/// # fn main() -> spaceframe::Result<()> {
/// let mut sock = Socket::new(Domain::Sp, SocketType::Pair)?;
/// sock.bind("inproc://docs.poller")?;
///
/// let mut poller = Poller::new();
/// poller.add(&sock, Interest::Both);
///
/// // Nothing queued yet, but an open pair socket admits a send attempt.
/// assert!(poller.poll(Some(Duration::ZERO))?);
/// assert!(poller.has_event(&sock, Interest::Writable));
/// assert!(!poller.has_event(&sock, Interest::Readable));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Poller {
    entries: SmallVec<[PollFd; 8]>,
}

impl Poller {
    /// Empty poll set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `socket` with `interest`.
    ///
    /// A socket already in the set has its interest replaced; one socket
    /// never occupies two entries.
    pub fn add(&mut self, socket: &Socket, interest: Interest) {
        let fd = socket.raw_fd();
        match self.entries.iter_mut().find(|entry| entry.fd == fd) {
            Some(entry) => {
                entry.events = interest.events();
                entry.revents = 0;
            }
            None => self.entries.push(PollFd::new(fd, interest.events())),
        }
    }

    /// Drop the registration for `socket`; no-op when absent.
    pub fn remove(&mut self, socket: &Socket) {
        let fd = socket.raw_fd();
        self.entries.retain(|entry| entry.fd != fd);
    }

    /// Registered socket count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait until any registered interest is ready.
    ///
    /// `None` waits indefinitely; `Some(Duration::ZERO)` checks once
    /// without blocking. Millisecond granularity. Returns `true` when at
    /// least one entry reports a requested event, `false` when the timeout
    /// passed first.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Transport`] when the fabric rejects the poll.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let timeout_ms = match timeout {
            None => -1,
            Some(bound) => i32::try_from(bound.as_millis()).unwrap_or(i32::MAX),
        };
        let ready = poll::poll(&mut self.entries, timeout_ms)?;
        Ok(ready > 0)
    }

    /// True when the last [`Poller::poll`] granted any of `interest` for
    /// `socket`; false for an unregistered socket.
    #[must_use]
    pub fn has_event(&self, socket: &Socket, interest: Interest) -> bool {
        let fd = socket.raw_fd();
        self.entries
            .iter()
            .find(|entry| entry.fd == fd)
            .is_some_and(|entry| entry.revents & interest.events() != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket_type::{Domain, SocketType};

    #[test]
    fn test_re_add_updates_in_place() {
        let sock = Socket::new(Domain::Sp, SocketType::Pair).unwrap();
        let mut poller = Poller::new();
        poller.add(&sock, Interest::Readable);
        poller.add(&sock, Interest::Both);
        assert_eq!(poller.len(), 1, "re-adding must not double-register");
        assert_eq!(poller.entries[0].events, Interest::Both.events());
    }

    #[test]
    fn test_remove_is_by_handle() {
        let one = Socket::new(Domain::Sp, SocketType::Pair).unwrap();
        let two = Socket::new(Domain::Sp, SocketType::Pair).unwrap();
        let mut poller = Poller::new();
        poller.add(&one, Interest::Readable);
        poller.add(&two, Interest::Readable);
        poller.remove(&one);
        assert_eq!(poller.len(), 1);
        poller.remove(&one);
        assert_eq!(poller.len(), 1, "removing an absent socket is a no-op");
    }

    #[test]
    fn test_has_event_false_for_unregistered() {
        let sock = Socket::new(Domain::Sp, SocketType::Pair).unwrap();
        let poller = Poller::new();
        assert!(!poller.has_event(&sock, Interest::Both));
    }

    #[test]
    fn test_interest_bits() {
        assert_eq!(Interest::Readable.events(), 1);
        assert_eq!(Interest::Writable.events(), 2);
        assert_eq!(Interest::Both.events(), 3);
    }
}
