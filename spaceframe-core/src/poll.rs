//! Readiness polling across sockets
//!
//! `POLL_IN` is accurate: it reports a queued message (or an expired
//! survey, so the waiter collects its timeout promptly). `POLL_OUT` is
//! advisory: it reports that the socket would accept a send attempt, not
//! that a peer queue has room. A bound-but-unconnected socket therefore
//! polls writable.

use std::time::Instant;

use crate::error::{Errno, Result};
use crate::fabric;
use crate::protocol;
use crate::timeout;

/// One socket's poll request and result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFd {
    /// Socket handle
    pub fd: i32,
    /// Requested events ([`protocol::POLL_IN`] | [`protocol::POLL_OUT`])
    pub events: i32,
    /// Granted events, filled by [`poll`]
    pub revents: i32,
}

impl PollFd {
    /// Request `events` for `fd` with no results yet.
    #[must_use]
    pub const fn new(fd: i32, events: i32) -> Self {
        Self {
            fd,
            events,
            revents: 0,
        }
    }

    /// True when the last poll granted `POLL_IN`.
    #[must_use]
    pub const fn readable(&self) -> bool {
        self.revents & protocol::POLL_IN != 0
    }

    /// True when the last poll granted `POLL_OUT`.
    #[must_use]
    pub const fn writable(&self) -> bool {
        self.revents & protocol::POLL_OUT != 0
    }
}

/// Wait until any requested event is ready, up to `timeout_ms`.
///
/// Returns the number of entries with granted events; `0` means the
/// timeout passed first. A negative timeout blocks indefinitely and `0`
/// checks once without blocking. Entries naming unknown or closed sockets
/// report nothing.
///
/// # Errors
///
/// [`crate::error::Errno::InvalidArgument`] when an entry requests events
/// outside `POLL_IN | POLL_OUT`.
pub fn poll(fds: &mut [PollFd], timeout_ms: i32) -> Result<usize> {
    if fds
        .iter()
        .any(|entry| entry.events & !(protocol::POLL_IN | protocol::POLL_OUT) != 0)
    {
        return Err(Errno::InvalidArgument);
    }
    let deadline = timeout::poll_bound(timeout_ms).map(|bound| Instant::now() + bound);
    loop {
        let seen = fabric::generation();
        let mut ready = 0;
        let mut wake_at = deadline;
        for entry in fds.iter_mut() {
            entry.revents = 0;
            let Ok((in_ready, out_ready, survey_deadline)) = fabric::poll_state(entry.fd) else {
                continue;
            };
            if entry.events & protocol::POLL_IN != 0 {
                if in_ready {
                    entry.revents |= protocol::POLL_IN;
                }
                // A running survey must wake the poll at its deadline
                wake_at = timeout::earliest(wake_at, survey_deadline);
            }
            if entry.events & protocol::POLL_OUT != 0 && out_ready {
                entry.revents |= protocol::POLL_OUT;
            }
            if entry.revents != 0 {
                ready += 1;
            }
        }
        if ready > 0 {
            return Ok(ready);
        }
        if timeout_ms == 0 {
            return Ok(0);
        }
        if fabric::wait_change(seen, wake_at) && timeout::expired(deadline) {
            return Ok(0);
        }
    }
}
