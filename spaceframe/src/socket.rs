//! Owned socket handles
//!
//! A [`Socket`] owns one fabric handle for its whole life: operations
//! borrow it, `close` (or drop) releases it, and a closed socket answers
//! every further operation with [`Error::InvalidState`] instead of touching
//! a recycled handle. The endpoint map remembers which address produced
//! which fabric endpoint id so a specific `bind`/`connect` can be undone
//! later by name.

use std::collections::HashMap;

use tracing::{debug, trace};

use spaceframe_core::alloc::MsgBuf;
use spaceframe_core::error::Errno;
use spaceframe_core::fabric;
use spaceframe_core::msg::Msg;
use spaceframe_core::protocol;

use crate::error::{Error, Result};
use crate::message::Message;
use crate::options::{OptionValue, SocketOption};
use crate::part::Part;
use crate::socket_type::{Domain, SocketType};

/// An owned handle to a fabric socket.
///
/// Move-only: the handle is released exactly once, by [`Socket::close`] or
/// by drop, whichever comes first.
///
/// # Examples
///
/// ```
/// use spaceframe::{Domain, Message, Socket, SocketType};
///
/// # fn main() -> spaceframe::Result<()> {
/// let mut server = Socket::new(Domain::Sp, SocketType::Pair)?;
/// server.bind("inproc://docs.pair")?;
///
/// let mut client = Socket::new(Domain::Sp, SocketType::Pair)?;
/// client.connect("inproc://docs.pair")?;
///
/// let mut hello = Message::new();
/// hello.append_str("hello");
/// client.sendmsg(&mut hello)?;
///
/// let got = server.recvmsg(1)?;
/// assert_eq!(got.at(0).unwrap().as_bytes(), b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Socket {
    fd: i32,
    endpoints: HashMap<String, i32>,
    open: bool,
}

impl Socket {
    /// Open a socket in `domain` implementing `socket_type`.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] when the fabric refuses the handle (socket
    /// table full).
    pub fn new(domain: Domain, socket_type: SocketType) -> Result<Self> {
        let fd = fabric::open(domain.to_raw(), socket_type.to_raw())?;
        Ok(Self {
            fd,
            endpoints: HashMap::new(),
            open: true,
        })
    }

    /// Adopt an existing fabric handle.
    ///
    /// The socket takes ownership: it will close `fd` on drop. A negative
    /// `fd` yields an already-closed socket.
    #[must_use]
    pub fn from_raw(fd: i32) -> Self {
        Self {
            fd,
            endpoints: HashMap::new(),
            open: fd >= 0,
        }
    }

    /// The underlying fabric handle; `-1` once closed.
    #[must_use]
    pub const fn raw_fd(&self) -> i32 {
        self.fd
    }

    /// Release the handle without closing it.
    ///
    /// The inverse of [`Socket::from_raw`]: the caller becomes responsible
    /// for closing the returned handle.
    #[must_use]
    pub fn into_raw(mut self) -> i32 {
        let fd = self.fd;
        self.open = false;
        fd
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    /// Bind to `addr` and start accepting compatible connectors.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] when this socket already holds an
    ///   endpoint for `addr` (re-binding would orphan the first endpoint)
    /// * [`Error::Transport`] for fabric refusals (`EADDRINUSE` when
    ///   another socket owns the address, unsupported scheme)
    pub fn bind(&mut self, addr: &str) -> Result<()> {
        self.ensure_open()?;
        if self.endpoints.contains_key(addr) {
            return Err(Error::InvalidArgument);
        }
        let eid = fabric::bind(self.fd, addr)?;
        self.endpoints.insert(addr.to_owned(), eid);
        Ok(())
    }

    /// Connect toward `addr`, linking now or when a binder appears.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] when this socket already holds an
    ///   endpoint for `addr`
    /// * [`Error::Transport`] for fabric refusals (unsupported scheme)
    pub fn connect(&mut self, addr: &str) -> Result<()> {
        self.ensure_open()?;
        if self.endpoints.contains_key(addr) {
            return Err(Error::InvalidArgument);
        }
        let eid = fabric::connect(self.fd, addr)?;
        self.endpoints.insert(addr.to_owned(), eid);
        Ok(())
    }

    /// Tear down the endpoint previously created for `addr`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when no endpoint of this socket is
    /// recorded under `addr`.
    pub fn shutdown(&mut self, addr: &str) -> Result<()> {
        self.ensure_open()?;
        // Absent addresses pass the fabric's unknown-endpoint sentinel
        let eid = self.endpoints.get(addr).copied().unwrap_or(-1);
        fabric::shutdown(self.fd, eid)?;
        self.endpoints.remove(addr);
        Ok(())
    }

    /// Set one typed option.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] when the value's kind does not match
    ///   the option, or the value itself is out of domain
    /// * [`Error::Transport`] when the option does not apply to this socket
    pub fn set_option(&mut self, option: SocketOption, value: OptionValue) -> Result<()> {
        self.ensure_open()?;
        if value.kind() != option.kind() {
            return Err(Error::InvalidArgument);
        }
        fabric::set_option(self.fd, option.level(), option.id(), &value.to_wire())?;
        Ok(())
    }

    /// Read one typed option back.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] when the option does not apply to this socket.
    pub fn get_option(&self, option: SocketOption) -> Result<OptionValue> {
        self.ensure_open()?;
        let wire = fabric::get_option(self.fd, option.level(), option.id())?;
        option.value_from_wire(wire)
    }

    /// Subscribe this SUB socket to messages starting with `topic`.
    ///
    /// Duplicate subscriptions are a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] on a socket that is not a subscriber.
    pub fn subscribe(&mut self, topic: &[u8]) -> Result<()> {
        self.ensure_open()?;
        fabric::set_option(self.fd, protocol::SUB, protocol::SUB_SUBSCRIBE, topic)?;
        Ok(())
    }

    /// Remove a subscription added by [`Socket::subscribe`].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] when `topic` is not currently subscribed
    /// * [`Error::Transport`] on a socket that is not a subscriber
    pub fn unsubscribe(&mut self, topic: &[u8]) -> Result<()> {
        self.ensure_open()?;
        fabric::set_option(self.fd, protocol::SUB, protocol::SUB_UNSUBSCRIBE, topic)?;
        Ok(())
    }

    /// Send a multi-part message, blocking up to the send timeout.
    ///
    /// Ownership is two-phase: the parts' buffers are drained into the
    /// fabric and, only if the send fails, restored into the same parts in
    /// order — after an error the message is intact for retry, after
    /// success every part reads as released. Returns the payload size in
    /// bytes.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] when the protocol state machine refuses
    ///   (e.g. a reply with no request pending)
    /// * [`Error::Transport`] with `ETIMEDOUT` when the send timeout runs
    ///   out, and for other fabric refusals
    pub fn sendmsg(&mut self, msg: &mut Message) -> Result<usize> {
        self.send_message(msg, 0)
    }

    /// Non-blocking [`Socket::sendmsg`].
    ///
    /// # Errors
    ///
    /// As [`Socket::sendmsg`], but refusing with `EAGAIN` (see
    /// [`Error::is_would_block`]) instead of waiting.
    pub fn try_sendmsg(&mut self, msg: &mut Message) -> Result<usize> {
        self.send_message(msg, protocol::DONTWAIT)
    }

    fn send_message(&mut self, msg: &mut Message, flags: i32) -> Result<usize> {
        self.ensure_open()?;
        let mut wire = Msg::new();
        for part in msg.iter_mut() {
            // A released part still marks a boundary: send it as empty
            wire.push(part.release().unwrap_or_else(|| MsgBuf::heap(0)));
        }
        match fabric::sendmsg(self.fd, wire, flags) {
            Ok(bytes) => {
                trace!("[SOCKET] Sent {} bytes from fd={}", bytes, self.fd);
                Ok(bytes)
            }
            Err(give_back) => {
                let errno = give_back.errno;
                for (part, buf) in msg.iter_mut().zip(give_back.msg.into_segments()) {
                    *part = Part::from_buffer(buf);
                }
                Err(errno.into())
            }
        }
    }

    /// Receive a message shaped into `parts` parts, blocking up to the
    /// receive timeout.
    ///
    /// `parts == 1` collapses the delivery into one part regardless of how
    /// the sender segmented it (zero-copy when it arrived as a single
    /// segment). For `parts > 1` the delivered segmentation must match
    /// exactly; each part then reports its true byte length.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] for `parts == 0`
    /// * [`Error::InvalidState`] when the protocol state machine refuses
    ///   (e.g. a request socket with no request outstanding)
    /// * [`Error::Transport`] with `EMSGSIZE` when the delivery does not
    ///   have `parts` segments, with `ETIMEDOUT` when the receive timeout
    ///   runs out, and for other fabric refusals
    pub fn recvmsg(&mut self, parts: usize) -> Result<Message> {
        self.recv_message(parts, 0)
    }

    /// Non-blocking [`Socket::recvmsg`].
    ///
    /// # Errors
    ///
    /// As [`Socket::recvmsg`], but refusing with `EAGAIN` (see
    /// [`Error::is_would_block`]) when no message is queued.
    pub fn try_recvmsg(&mut self, parts: usize) -> Result<Message> {
        self.recv_message(parts, protocol::DONTWAIT)
    }

    fn recv_message(&mut self, parts: usize, flags: i32) -> Result<Message> {
        self.ensure_open()?;
        if parts == 0 {
            return Err(Error::InvalidArgument);
        }
        let msg = fabric::recvmsg(self.fd, flags)?;
        if parts == 1 {
            let whole = msg.into_whole()?;
            return Ok(Message::from_parts(vec![Part::from_buffer(whole)]));
        }
        if msg.len() != parts {
            trace!(
                "[SOCKET] Delivery of {} segments does not fit {} expected parts on fd={}",
                msg.len(),
                parts,
                self.fd
            );
            return Err(Errno::MessageSize.into());
        }
        let received = msg.iter().map(|seg| Part::from_bytes(seg.as_slice())).collect();
        Ok(Message::from_parts(received))
    }

    /// Receive a message with whatever segmentation it was sent with,
    /// adopting every segment without copying.
    ///
    /// # Errors
    ///
    /// As [`Socket::recvmsg`], minus the shape conditions.
    pub fn recv_parts(&mut self) -> Result<Message> {
        self.ensure_open()?;
        let msg = fabric::recvmsg(self.fd, 0)?;
        let received = msg.into_segments().into_iter().map(Part::from_buffer).collect();
        Ok(Message::from_parts(received))
    }

    /// Send one caller-managed buffer, blocking up to the send timeout.
    ///
    /// # Errors
    ///
    /// As [`Socket::sendmsg`].
    pub fn send_raw(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        Ok(fabric::send(self.fd, buf, 0)?)
    }

    /// Non-blocking [`Socket::send_raw`].
    ///
    /// # Errors
    ///
    /// As [`Socket::try_sendmsg`].
    pub fn try_send_raw(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        Ok(fabric::send(self.fd, buf, protocol::DONTWAIT)?)
    }

    /// Receive into a caller-managed buffer, blocking up to the receive
    /// timeout.
    ///
    /// The delivery is truncated to `buf`; the return value is the full
    /// message length, so a short buffer is detectable.
    ///
    /// # Errors
    ///
    /// As [`Socket::recvmsg`], minus the shape conditions.
    pub fn recv_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        Ok(fabric::recv(self.fd, buf, 0)?)
    }

    /// Non-blocking [`Socket::recv_raw`].
    ///
    /// # Errors
    ///
    /// As [`Socket::try_recvmsg`], minus the shape conditions.
    pub fn try_recv_raw(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        Ok(fabric::recv(self.fd, buf, protocol::DONTWAIT)?)
    }

    /// Close the socket.
    ///
    /// Idempotent: the first call releases the handle (waking any blocked
    /// peers), later calls return `Ok` without touching the fabric. After
    /// a failed teardown the socket still counts as closed.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] when the fabric no longer knows the handle.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let fd = self.fd;
        self.fd = -1;
        self.endpoints.clear();
        debug!("[SOCKET] Closed fd={}", fd);
        fabric::close(fd)?;
        Ok(())
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if self.open {
            trace!("[SOCKET] Dropping open socket fd={}", self.fd);
            let _ = fabric::close(self.fd);
        }
    }
}
