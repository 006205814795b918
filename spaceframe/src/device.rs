//! Message-forwarding devices
//!
//! A device relays whole messages between two sockets (or back onto one),
//! preserving segmentation and per-direction order. Devices are usually
//! built from raw-domain sockets so the pattern state machines of the end
//! nodes pass through untouched; an SP-domain reply socket in
//! [`loopback`] also makes a serviceable echo server.
//!
//! Termination: `&mut` exclusivity means nobody can close a relayed socket
//! out from under the loop, so a device stops in one of two ways. When
//! every relayed socket carries a finite receive timeout, a full idle
//! window of the smallest one returns `Ok(())`. Otherwise the loop runs
//! until the fabric reports a fatal condition (for example the handle was
//! torn down through a raw-handle clone), which surfaces as the error.

use std::time::Duration;

use tracing::{debug, trace};

use crate::error::Result;
use crate::options::SocketOption;
use crate::poller::{Interest, Poller};
use crate::socket::Socket;

/// Relay messages between `a` and `b`, both directions, until the device
/// terminates.
///
/// One message is in flight at a time per direction; a slow receiving side
/// backpressures the sending side through the fabric's queue bounds.
///
/// # Errors
///
/// [`crate::Error::Transport`] and friends from the underlying receive and
/// send calls; an elapsed idle window is `Ok`.
pub fn forward(a: &mut Socket, b: &mut Socket) -> Result<()> {
    let window = merge_windows(receive_window(a)?, receive_window(b)?);
    debug!(
        "[DEVICE] Forwarding between fd={} and fd={}",
        a.raw_fd(),
        b.raw_fd()
    );
    let mut poller = Poller::new();
    poller.add(a, Interest::Readable);
    poller.add(b, Interest::Readable);
    loop {
        if !poller.poll(window)? {
            debug!("[DEVICE] Idle window elapsed, stopping");
            return Ok(());
        }
        if poller.has_event(a, Interest::Readable) {
            relay(a, b)?;
        }
        if poller.has_event(b, Interest::Readable) {
            relay(b, a)?;
        }
    }
}

/// Relay every message received on `socket` back onto it.
///
/// # Errors
///
/// As [`forward`].
pub fn loopback(socket: &mut Socket) -> Result<()> {
    let window = receive_window(socket)?;
    debug!("[DEVICE] Looping back on fd={}", socket.raw_fd());
    let mut poller = Poller::new();
    poller.add(socket, Interest::Readable);
    loop {
        if !poller.poll(window)? {
            debug!("[DEVICE] Idle window elapsed, stopping");
            return Ok(());
        }
        let mut msg = socket.recv_parts()?;
        let bytes = socket.sendmsg(&mut msg)?;
        trace!("[DEVICE] Looped {} bytes on fd={}", bytes, socket.raw_fd());
    }
}

fn relay(from: &mut Socket, to: &mut Socket) -> Result<()> {
    let mut msg = from.recv_parts()?;
    let bytes = to.sendmsg(&mut msg)?;
    trace!(
        "[DEVICE] Relayed {} bytes from fd={} to fd={}",
        bytes,
        from.raw_fd(),
        to.raw_fd()
    );
    Ok(())
}

/// The socket's receive timeout as a poll window; `None` when infinite.
fn receive_window(socket: &Socket) -> Result<Option<Duration>> {
    let timeout = socket
        .get_option(SocketOption::ReceiveTimeout)?
        .as_int()
        .unwrap_or(-1);
    if timeout < 0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_millis(u64::from(timeout.unsigned_abs()))))
    }
}

/// Idle window for the whole device: the smaller of two finite windows,
/// unbounded as soon as either side is unbounded.
fn merge_windows(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(left), Some(right)) => Some(left.min(right)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_windows() {
        let short = Some(Duration::from_millis(50));
        let long = Some(Duration::from_millis(200));
        assert_eq!(merge_windows(short, long), short);
        assert_eq!(merge_windows(long, short), short);
        assert_eq!(merge_windows(short, None), None);
        assert_eq!(merge_windows(None, None), None);
    }
}
