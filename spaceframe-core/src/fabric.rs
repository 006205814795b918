//! Process-wide messaging fabric
//!
//! The fabric owns every socket in the process and moves whole messages
//! between them. Entry points mirror the classic C surface (integer socket
//! handles, flag words, errno-style failures) so the typed layer above
//! stays a thin shell. Delivery is a direct hand-off: a send locks the
//! receiving socket, offers the message to its queue, and wakes waiters
//! through a process-wide readiness monitor.
//!
//! Lock discipline: at most one socket lock is held at a time. Routing
//! snapshots peer ids under the sender's lock, drops it, then locks each
//! candidate receiver in turn. The monitor is a generation counter; a
//! waiter captures the generation, re-checks its condition, and sleeps
//! only if nothing changed in between.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};

use crate::alloc::MsgBuf;
use crate::endpoint::Address;
use crate::error::{Errno, Result};
use crate::msg::Msg;
use crate::protocol;
use crate::socket::{Admit, Delivery, EndpointKind, SendPlan, SendRollback, SocketCore};
use crate::timeout;

/// A send that did not complete. The undelivered message rides along so
/// the caller keeps ownership of its buffers.
#[derive(Debug, Error)]
#[error("{errno}")]
pub struct SendError {
    /// Why the send failed
    pub errno: Errno,
    /// The message, handed back untouched
    pub msg: Msg,
}

struct SocketSlot {
    core: Mutex<SocketCore>,
}

struct PendingConnect {
    fd: i32,
    name: String,
}

struct Monitor {
    generation: Mutex<u64>,
    changed: Condvar,
}

static SOCKETS: Lazy<DashMap<i32, Arc<SocketSlot>>> = Lazy::new(DashMap::new);
static BINDINGS: Lazy<DashMap<String, i32>> = Lazy::new(DashMap::new);
static PARKED: Lazy<Mutex<Vec<PendingConnect>>> = Lazy::new(|| Mutex::new(Vec::new()));
static MONITOR: Lazy<Monitor> = Lazy::new(|| Monitor {
    generation: Mutex::new(0),
    changed: Condvar::new(),
});
static NEXT_FD: AtomicI32 = AtomicI32::new(1);
static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

fn lookup(fd: i32) -> Result<Arc<SocketSlot>> {
    SOCKETS
        .get(&fd)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or(Errno::BadHandle)
}

fn next_tag() -> u64 {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

fn bump() {
    let mut generation = MONITOR.generation.lock();
    *generation += 1;
    MONITOR.changed.notify_all();
}

pub(crate) fn generation() -> u64 {
    *MONITOR.generation.lock()
}

/// Sleep until the fabric changes or `deadline` passes. Returns true when
/// the deadline passed first. A generation already past `seen` counts as a
/// change and returns immediately.
pub(crate) fn wait_change(seen: u64, deadline: Option<Instant>) -> bool {
    let mut generation = MONITOR.generation.lock();
    if *generation != seen {
        return false;
    }
    match deadline {
        None => {
            MONITOR.changed.wait(&mut generation);
            false
        }
        Some(at) => MONITOR.changed.wait_until(&mut generation, at).timed_out(),
    }
}

/// Readiness snapshot for polling: (readable, writable, survey deadline).
pub(crate) fn poll_state(fd: i32) -> Result<(bool, bool, Option<Instant>)> {
    let slot = lookup(fd)?;
    let core = slot.core.lock();
    Ok((core.in_ready(), core.out_ready(), core.survey_deadline()))
}

/// Open a socket, returning its handle.
///
/// # Errors
///
/// * [`Errno::InvalidArgument`] for an unknown domain
/// * [`Errno::ProtocolNotSupported`] for an unknown protocol id
/// * [`Errno::TooManySockets`] at the socket cap
pub fn open(domain: i32, proto: i32) -> Result<i32> {
    if !protocol::is_valid_domain(domain) {
        return Err(Errno::InvalidArgument);
    }
    if !protocol::is_valid_protocol(proto) {
        return Err(Errno::ProtocolNotSupported);
    }
    if SOCKETS.len() >= protocol::MAX_SOCKETS {
        return Err(Errno::TooManySockets);
    }
    let fd = NEXT_FD.fetch_add(1, Ordering::Relaxed);
    let core = SocketCore::new(fd, domain, proto);
    SOCKETS.insert(
        fd,
        Arc::new(SocketSlot {
            core: Mutex::new(core),
        }),
    );
    debug!("[FABRIC] Opened {} socket fd={}", protocol::name(proto), fd);
    Ok(fd)
}

/// Close a socket.
///
/// Peers are unlinked, owned bindings are released, and any thread blocked
/// on the socket wakes with [`Errno::BadHandle`]. Remote connectors that
/// reached this socket through one of its bindings go back to waiting for
/// the name.
///
/// # Errors
///
/// [`Errno::BadHandle`] when the handle is unknown or already closed.
pub fn close(fd: i32) -> Result<()> {
    let (_, slot) = SOCKETS.remove(&fd).ok_or(Errno::BadHandle)?;
    let (links, bindings) = {
        let mut core = slot.core.lock();
        let links = std::mem::take(&mut core.peers);
        let bindings: Vec<String> = core
            .endpoint_kinds()
            .filter_map(|kind| match kind {
                EndpointKind::Binding(name) => Some(name.clone()),
                EndpointKind::Connect(_) => None,
            })
            .collect();
        (links, bindings)
    };
    for name in &bindings {
        BINDINGS.remove(name);
    }
    PARKED.lock().retain(|pending| pending.fd != fd);
    for link in links {
        if link.fd == fd {
            continue; // self-link dies with the socket
        }
        let Ok(peer) = lookup(link.fd) else { continue };
        let mut core = peer.core.lock();
        core.remove_peer(fd, &link.via);
        let reconnects = bindings.contains(&link.via)
            && core
                .endpoint_kinds()
                .any(|kind| matches!(kind, EndpointKind::Connect(name) if *name == link.via));
        drop(core);
        if reconnects {
            park(link.fd, &link.via);
        }
    }
    debug!("[FABRIC] Closed fd={}", fd);
    bump();
    Ok(())
}

/// Bind a socket to an address, returning the endpoint id.
///
/// Connectors already waiting for the name are linked immediately when
/// their protocol pairs with this socket's.
///
/// # Errors
///
/// * [`Errno::BadHandle`] for an unknown handle
/// * [`Errno::InvalidArgument`] for a malformed address
/// * [`Errno::ProtocolNotSupported`] for a non-operational transport
/// * [`Errno::AddressInUse`] when the name is already bound
pub fn bind(fd: i32, addr: &str) -> Result<i32> {
    let slot = lookup(fd)?;
    let name = operational_name(addr)?;
    match BINDINGS.entry(name.clone()) {
        Entry::Occupied(_) => return Err(Errno::AddressInUse),
        Entry::Vacant(vacant) => {
            vacant.insert(fd);
        }
    }
    let eid = slot
        .core
        .lock()
        .record_endpoint(EndpointKind::Binding(name.clone()));
    // The registry entry is visible before the parked list is drained, so
    // a connect racing this bind either finds the binding or is found here
    let waiting: Vec<i32> = {
        let mut parked = PARKED.lock();
        let mut waiting = Vec::new();
        parked.retain(|pending| {
            if pending.name == name {
                waiting.push(pending.fd);
                false
            } else {
                true
            }
        });
        waiting
    };
    for connector in waiting {
        if !link(fd, connector, &name) {
            park(connector, &name);
        }
    }
    debug!("[FABRIC] Bound fd={} to {} (eid={})", fd, name, eid);
    bump();
    Ok(eid)
}

/// Connect a socket toward an address, returning the endpoint id.
///
/// The link comes up immediately when a compatible binder owns the name;
/// otherwise the attempt stays pending until one appears.
///
/// # Errors
///
/// * [`Errno::BadHandle`] for an unknown handle
/// * [`Errno::InvalidArgument`] for a malformed address
/// * [`Errno::ProtocolNotSupported`] for a non-operational transport
pub fn connect(fd: i32, addr: &str) -> Result<i32> {
    let slot = lookup(fd)?;
    let name = operational_name(addr)?;
    let eid = slot
        .core
        .lock()
        .record_endpoint(EndpointKind::Connect(name.clone()));
    let owner = {
        let mut parked = PARKED.lock();
        let owner = BINDINGS.get(&name).map(|entry| *entry.value());
        if owner.is_none() {
            trace!("[FABRIC] Parked fd={} awaiting {}", fd, name);
            parked.push(PendingConnect {
                fd,
                name: name.clone(),
            });
        }
        owner
    };
    if let Some(owner) = owner {
        if !link(owner, fd, &name) {
            park(fd, &name);
        }
    }
    debug!("[FABRIC] Connected fd={} toward {} (eid={})", fd, name, eid);
    bump();
    Ok(eid)
}

/// Tear down one endpoint of a socket.
///
/// Shutting down a binding releases the name and severs the links made
/// through it; remote connectors go back to waiting for the name. Shutting
/// down a connect severs its link or cancels the pending attempt.
///
/// # Errors
///
/// * [`Errno::BadHandle`] for an unknown handle
/// * [`Errno::InvalidArgument`] for an unknown endpoint id
pub fn shutdown(fd: i32, eid: i32) -> Result<()> {
    let slot = lookup(fd)?;
    let kind = slot
        .core
        .lock()
        .take_endpoint(eid)
        .ok_or(Errno::InvalidArgument)?;
    match kind {
        EndpointKind::Binding(name) => {
            BINDINGS.remove(&name);
            let severed: Vec<i32> = {
                let mut core = slot.core.lock();
                let mut severed = Vec::new();
                core.peers.retain(|link| {
                    if link.via == name {
                        severed.push(link.fd);
                        false
                    } else {
                        true
                    }
                });
                severed
            };
            for peer_fd in severed {
                let peer = if peer_fd == fd {
                    Arc::clone(&slot)
                } else {
                    match lookup(peer_fd) {
                        Ok(peer) => peer,
                        Err(_) => continue,
                    }
                };
                let mut core = peer.core.lock();
                if peer_fd != fd {
                    core.remove_peer(fd, &name);
                }
                let reconnects = core
                    .endpoint_kinds()
                    .any(|kind| matches!(kind, EndpointKind::Connect(n) if *n == name));
                drop(core);
                if reconnects {
                    park(peer_fd, &name);
                }
            }
        }
        EndpointKind::Connect(name) => {
            let linked = {
                let mut core = slot.core.lock();
                core.peers
                    .iter()
                    .position(|link| link.via == name)
                    .map(|pos| core.peers.remove(pos).fd)
            };
            match linked {
                Some(peer_fd) if peer_fd != fd => {
                    if let Ok(peer) = lookup(peer_fd) {
                        peer.core.lock().remove_peer(fd, &name);
                    }
                }
                Some(_) => {}
                None => {
                    let mut parked = PARKED.lock();
                    if let Some(pos) = parked
                        .iter()
                        .position(|pending| pending.fd == fd && pending.name == name)
                    {
                        parked.remove(pos);
                    }
                }
            }
        }
    }
    debug!("[FABRIC] Shut down eid={} on fd={}", eid, fd);
    bump();
    Ok(())
}

/// Set a socket option from its raw wire image.
///
/// Subscription edits change the socket's filter set; every other option
/// lands in its option block.
///
/// # Errors
///
/// * [`Errno::BadHandle`] for an unknown handle
/// * [`Errno::BadOption`] for an unknown option or a level mismatch
/// * [`Errno::InvalidArgument`] for a malformed value
pub fn set_option(fd: i32, level: i32, option: i32, value: &[u8]) -> Result<()> {
    let slot = lookup(fd)?;
    let mut core = slot.core.lock();
    if level == protocol::SUB
        && matches!(option, protocol::SUB_SUBSCRIBE | protocol::SUB_UNSUBSCRIBE)
    {
        core.edit_subscription(option, value)?;
    } else {
        let proto = core.protocol;
        core.opts.set_raw(level, option, value, proto)?;
    }
    drop(core);
    // A larger receive buffer can unblock senders parked on a full queue
    bump();
    Ok(())
}

/// Read a socket option as its raw wire image.
///
/// # Errors
///
/// * [`Errno::BadHandle`] for an unknown handle
/// * [`Errno::BadOption`] for an unknown option or a level mismatch
pub fn get_option(fd: i32, level: i32, option: i32) -> Result<Vec<u8>> {
    let slot = lookup(fd)?;
    let core = slot.core.lock();
    core.opts.get_raw(level, option, core.domain, core.protocol)
}

/// Send a message, taking ownership of its buffers.
///
/// Routing and blocking follow the socket's protocol: one-peer patterns
/// try each candidate and block (or fail with `WouldBlock`/`TimedOut`)
/// when every queue is full, while fan-out patterns copy to every peer
/// immediately and drop at full queues. On failure the message comes back
/// inside the [`SendError`].
pub fn sendmsg(fd: i32, mut msg: Msg, flags: i32) -> std::result::Result<usize, SendError> {
    msg.normalize_empty();
    let bytes = msg.total_bytes();
    let dontwait = flags & protocol::DONTWAIT != 0;

    let slot = match lookup(fd) {
        Ok(slot) => slot,
        Err(errno) => return Err(SendError { errno, msg }),
    };
    // Plan under the sender's lock; pattern state commits up front so a
    // reply racing the send is admitted
    let (plan, saved, nonblocking, deadline) = {
        let mut core = slot.core.lock();
        let (plan, saved) = match core.plan_send(next_tag()) {
            Ok(planned) => planned,
            Err(errno) => return Err(SendError { errno, msg }),
        };
        let nonblocking = dontwait || core.opts.is_send_nonblocking();
        let deadline = if nonblocking {
            None
        } else {
            timeout::deadline_after(core.opts.send_timeout)
        };
        (plan, saved, nonblocking, deadline)
    };

    match plan {
        SendPlan::Broadcast { targets, tag } => {
            let delivered = fan_out(fd, &msg, &targets, tag);
            trace!(
                "[FABRIC] Fanned out {} bytes from fd={} to {} peers",
                bytes,
                fd,
                delivered
            );
            if delivered > 0 {
                bump();
            }
            Ok(bytes)
        }
        SendPlan::Unicast { candidates, tag } => send_unicast(
            &slot,
            fd,
            msg,
            bytes,
            candidates,
            tag,
            saved,
            nonblocking,
            deadline,
        ),
    }
}

/// Offer a copy to every target queue; full queues drop. Returns how many
/// accepted.
fn fan_out(from: i32, msg: &Msg, targets: &[i32], tag: u64) -> usize {
    let mut delivered = 0;
    for &peer_fd in targets {
        let Ok(peer) = lookup(peer_fd) else { continue };
        let offered = Delivery {
            msg: msg.deep_copy(),
            from,
            tag,
        };
        match peer.core.lock().try_admit(offered) {
            Admit::Delivered => delivered += 1,
            Admit::Full(dropped) => {
                trace!(
                    "[FABRIC] Dropping fan-out to fd={}: queue full ({} bytes)",
                    peer_fd,
                    dropped.msg.total_bytes()
                );
            }
            Admit::Filtered => {}
        };
    }
    delivered
}

#[allow(clippy::too_many_arguments)]
fn send_unicast(
    slot: &Arc<SocketSlot>,
    fd: i32,
    msg: Msg,
    bytes: usize,
    candidates: SmallVec<[i32; 4]>,
    tag: u64,
    saved: SendRollback,
    nonblocking: bool,
    deadline: Option<Instant>,
) -> std::result::Result<usize, SendError> {
    let mut msg = msg;
    let mut candidates = candidates;
    loop {
        let seen = generation();
        let mut dead: SmallVec<[i32; 4]> = SmallVec::new();
        for &peer_fd in &candidates {
            let Ok(peer) = lookup(peer_fd) else {
                dead.push(peer_fd);
                continue;
            };
            let outcome = peer.core.lock().try_admit(Delivery { msg, from: fd, tag });
            match outcome {
                Admit::Delivered => {
                    slot.core.lock().commit_send(tag);
                    trace!(
                        "[FABRIC] Delivered {} bytes from fd={} to fd={}",
                        bytes,
                        fd,
                        peer_fd
                    );
                    bump();
                    return Ok(bytes);
                }
                Admit::Filtered => {
                    // The receiver consumed and discarded it; the send is done
                    slot.core.lock().commit_send(tag);
                    return Ok(bytes);
                }
                Admit::Full(returned) => {
                    msg = returned.msg;
                }
            }
        }
        if !dead.is_empty() {
            let mut core = slot.core.lock();
            for peer_fd in dead {
                core.remove_peer_all(peer_fd);
            }
        }
        if nonblocking {
            return fail_send(slot, saved, Errno::WouldBlock, msg);
        }
        if wait_change(seen, deadline) {
            return fail_send(slot, saved, Errno::TimedOut, msg);
        }
        if lookup(fd).is_err() {
            return fail_send(slot, saved, Errno::BadHandle, msg);
        }
        candidates = slot.core.lock().retry_candidates(&candidates);
    }
}

fn fail_send(
    slot: &Arc<SocketSlot>,
    saved: SendRollback,
    errno: Errno,
    msg: Msg,
) -> std::result::Result<usize, SendError> {
    slot.core.lock().rollback_send(saved);
    Err(SendError { errno, msg })
}

/// Receive the next message for a socket, blocking per its options.
///
/// # Errors
///
/// * [`Errno::BadHandle`] when the handle is unknown or closed mid-wait
/// * [`Errno::WouldBlock`] when nothing is queued and blocking is off
/// * [`Errno::TimedOut`] at the receive timeout or survey deadline
/// * [`Errno::BadState`] when the pattern forbids receiving now
/// * [`Errno::NotSupported`] for send-only protocols
pub fn recvmsg(fd: i32, flags: i32) -> Result<Msg> {
    let dontwait = flags & protocol::DONTWAIT != 0;
    let mut deadline: Option<Option<Instant>> = None;
    loop {
        let seen = generation();
        let slot = lookup(fd)?;
        let (popped, nonblocking, wake_at) = {
            let mut core = slot.core.lock();
            core.check_recv()?;
            match core.pop_delivery() {
                Some(delivery) => (Some(delivery), false, None),
                None => {
                    if deadline.is_none() {
                        deadline = Some(timeout::deadline_after(core.opts.recv_timeout));
                    }
                    let nonblocking = dontwait || core.opts.is_recv_nonblocking();
                    (None, nonblocking, core.survey_deadline())
                }
            }
        };
        if let Some(delivery) = popped {
            trace!(
                "[FABRIC] Collected {} bytes on fd={} (from fd={})",
                delivery.msg.total_bytes(),
                fd,
                delivery.from
            );
            // Senders may be waiting for queue space
            bump();
            return Ok(delivery.msg);
        }
        if nonblocking {
            return Err(Errno::WouldBlock);
        }
        let user_deadline = deadline.unwrap_or(None);
        if wait_change(seen, timeout::earliest(user_deadline, wake_at))
            && timeout::expired(user_deadline)
        {
            return Err(Errno::TimedOut);
        }
    }
}

/// Copy-send a byte slice as a single-part message.
///
/// # Errors
///
/// As [`sendmsg`], with the message dropped instead of handed back.
pub fn send(fd: i32, buf: &[u8], flags: i32) -> Result<usize> {
    let msg = Msg::from_segments(vec![MsgBuf::copy_from(buf)]);
    sendmsg(fd, msg, flags).map_err(|failed| failed.errno)
}

/// Receive into a caller buffer.
///
/// The full message length is returned even when it exceeds the buffer;
/// the copy is truncated to fit.
///
/// # Errors
///
/// As [`recvmsg`].
pub fn recv(fd: i32, buf: &mut [u8], flags: i32) -> Result<usize> {
    let whole = recv_whole(fd, flags)?;
    let bytes = whole.as_slice();
    let take = bytes.len().min(buf.len());
    buf[..take].copy_from_slice(&bytes[..take]);
    Ok(bytes.len())
}

/// Receive one message as a single owned buffer.
///
/// # Errors
///
/// As [`recvmsg`].
pub fn recv_whole(fd: i32, flags: i32) -> Result<MsgBuf> {
    recvmsg(fd, flags)?.into_whole()
}

fn operational_name(addr: &str) -> Result<String> {
    let address: Address = addr.parse()?;
    if !address.is_operational() {
        return Err(Errno::ProtocolNotSupported);
    }
    Ok(address.to_string())
}

fn park(fd: i32, name: &str) {
    trace!("[FABRIC] Parked fd={} awaiting {}", fd, name);
    PARKED.lock().push(PendingConnect {
        fd,
        name: name.to_string(),
    });
}

/// Link a binder and a connector when their protocols pair up.
fn link(binder: i32, connector: i32, name: &str) -> bool {
    if binder == connector {
        // A socket reaching its own binding loops back through one entry
        let Ok(slot) = lookup(binder) else { return false };
        let mut core = slot.core.lock();
        if !protocol::is_compatible(core.protocol, core.protocol) {
            return false;
        }
        core.add_peer(binder, name);
        trace!("[FABRIC] Linked fd={} to itself via {}", binder, name);
        return true;
    }
    let Ok(binder_slot) = lookup(binder) else {
        return false;
    };
    let Ok(connector_slot) = lookup(connector) else {
        return false;
    };
    let binder_proto = binder_slot.core.lock().protocol;
    let connector_proto = connector_slot.core.lock().protocol;
    if !protocol::is_compatible(binder_proto, connector_proto) {
        trace!(
            "[FABRIC] Not linking fd={} and fd={}: {} does not pair with {}",
            binder,
            connector,
            protocol::name(binder_proto),
            protocol::name(connector_proto)
        );
        return false;
    }
    binder_slot.core.lock().add_peer(connector, name);
    connector_slot.core.lock().add_peer(binder, name);
    trace!(
        "[FABRIC] Linked fd={} and fd={} via {}",
        binder,
        connector,
        name
    );
    true
}
