//! Per-socket state and pattern rules
//!
//! A [`SocketCore`] holds everything one socket owns: its options, its
//! receive queue, its peer links, and the protocol state machine. The rules
//! in this module decide three things only: where a send goes, whether a
//! delivery is admitted, and whether the state machine permits an operation.
//! Actually moving messages and waiting is [`crate::fabric`]'s job.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Instant;

use smallvec::SmallVec;
use tracing::trace;

use crate::error::{Errno, Result};
use crate::msg::Msg;
use crate::options::SocketOptions;
use crate::protocol;
use crate::timeout;

/// A queued inbound message with its routing metadata.
///
/// `from` is the sending socket and `tag` the request/survey id the message
/// belongs to (zero for patterns without ids). Metadata never reaches the
/// caller; it drives reply routing and stale-reply filtering.
#[derive(Debug)]
pub(crate) struct Delivery {
    pub msg: Msg,
    pub from: i32,
    pub tag: u64,
}

/// One established link to a peer socket, remembering the binding name the
/// link was made through so endpoint shutdown can tear down exactly the
/// links it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PeerLink {
    pub fd: i32,
    pub via: String,
}

/// What an endpoint id refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EndpointKind {
    /// This socket owns the binding for the name
    Binding(String),
    /// This socket connected (or is parked waiting) toward the name
    Connect(String),
}

/// Request-side state for the REQ pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReqState {
    Idle,
    Awaiting { request_id: u64 },
}

/// Protocol state machine, present only in the standard domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PatternState {
    None,
    Req(ReqState),
    /// Requester waiting for our reply: (fd, request id)
    Rep { pending: Option<(i32, u64)> },
    Surveyor {
        survey_id: u64,
        deadline: Option<Instant>,
        active: bool,
    },
    /// Surveyor waiting for our response: (fd, survey id)
    Respondent { pending: Option<(i32, u64)> },
}

/// Saved state for rolling back an uncommitted send.
#[derive(Debug)]
pub(crate) enum SendRollback {
    None,
    Restore(PatternState),
}

/// Where a send should go.
///
/// `candidates` are tried in order until one peer admits the message;
/// `targets` of a broadcast each get their own copy and full queues drop.
#[derive(Debug)]
pub(crate) enum SendPlan {
    Unicast {
        candidates: SmallVec<[i32; 4]>,
        tag: u64,
    },
    Broadcast {
        targets: SmallVec<[i32; 4]>,
        tag: u64,
    },
}

/// Outcome of offering a delivery to a socket.
#[derive(Debug)]
pub(crate) enum Admit {
    /// Queued; the receiver owns the message now
    Delivered,
    /// Queue has no room; the delivery is handed back
    Full(Delivery),
    /// Rejected by a pattern filter; the message is gone, the send counts
    /// as complete
    Filtered,
}

/// Everything one socket owns.
#[derive(Debug)]
pub(crate) struct SocketCore {
    pub fd: i32,
    pub domain: i32,
    pub protocol: i32,
    pub opts: SocketOptions,
    pub peers: Vec<PeerLink>,
    pub subscriptions: Vec<Vec<u8>>,
    inbox: VecDeque<Delivery>,
    inbox_bytes: usize,
    rr_cursor: usize,
    state: PatternState,
    endpoints: HashMap<i32, EndpointKind>,
    next_endpoint_id: i32,
}

impl SocketCore {
    pub(crate) fn new(fd: i32, domain: i32, proto: i32) -> Self {
        let state = if domain == protocol::AF_SP_RAW {
            PatternState::None
        } else {
            match proto {
                protocol::REQ => PatternState::Req(ReqState::Idle),
                protocol::REP => PatternState::Rep { pending: None },
                protocol::SURVEYOR => PatternState::Surveyor {
                    survey_id: 0,
                    deadline: None,
                    active: false,
                },
                protocol::RESPONDENT => PatternState::Respondent { pending: None },
                _ => PatternState::None,
            }
        };
        Self {
            fd,
            domain,
            protocol: proto,
            opts: SocketOptions::default().with_socket_name(format!("socket.{fd}")),
            peers: Vec::new(),
            subscriptions: Vec::new(),
            inbox: VecDeque::new(),
            inbox_bytes: 0,
            rr_cursor: 0,
            state: PatternState::None,
            endpoints: HashMap::new(),
            next_endpoint_id: 1,
        }
        .with_state(state)
    }

    fn with_state(mut self, state: PatternState) -> Self {
        self.state = state;
        self
    }

    pub(crate) fn is_raw(&self) -> bool {
        self.domain == protocol::AF_SP_RAW
    }

    /// Record a new endpoint, returning its id.
    pub(crate) fn record_endpoint(&mut self, kind: EndpointKind) -> i32 {
        let eid = self.next_endpoint_id;
        self.next_endpoint_id += 1;
        self.endpoints.insert(eid, kind);
        eid
    }

    /// Remove and return an endpoint record.
    pub(crate) fn take_endpoint(&mut self, eid: i32) -> Option<EndpointKind> {
        self.endpoints.remove(&eid)
    }

    pub(crate) fn endpoint_kinds(&self) -> impl Iterator<Item = &EndpointKind> {
        self.endpoints.values()
    }

    /// Add a peer link (one entry even when a socket links to itself).
    pub(crate) fn add_peer(&mut self, fd: i32, via: &str) {
        self.peers.push(PeerLink {
            fd,
            via: via.to_string(),
        });
    }

    /// Remove one link to `fd` made through `via`.
    pub(crate) fn remove_peer(&mut self, fd: i32, via: &str) {
        if let Some(pos) = self
            .peers
            .iter()
            .position(|p| p.fd == fd && p.via == via)
        {
            self.peers.remove(pos);
        }
    }

    /// Remove every link to `fd`, returning the binding names they used.
    pub(crate) fn remove_peer_all(&mut self, fd: i32) -> Vec<String> {
        let mut removed = Vec::new();
        self.peers.retain(|p| {
            if p.fd == fd {
                removed.push(p.via.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Edit the subscription list. Duplicate subscribe is a no-op;
    /// unsubscribing an absent prefix is an error.
    pub(crate) fn edit_subscription(&mut self, option: i32, prefix: &[u8]) -> Result<()> {
        if self.protocol != protocol::SUB {
            return Err(Errno::BadOption);
        }
        match option {
            protocol::SUB_SUBSCRIBE => {
                if !self.subscriptions.iter().any(|p| p == prefix) {
                    trace!("[SUB] Subscribing fd={} to {:?}", self.fd, prefix);
                    self.subscriptions.push(prefix.to_vec());
                }
                Ok(())
            }
            protocol::SUB_UNSUBSCRIBE => {
                match self.subscriptions.iter().position(|p| p == prefix) {
                    Some(pos) => {
                        trace!("[SUB] Unsubscribing fd={} from {:?}", self.fd, prefix);
                        self.subscriptions.remove(pos);
                        Ok(())
                    }
                    None => Err(Errno::InvalidArgument),
                }
            }
            _ => Err(Errno::BadOption),
        }
    }

    /// Decide where a send goes and advance the state machine.
    ///
    /// State changes are applied here so a racing reply cannot slip past
    /// them; the returned rollback undoes them if the send ultimately
    /// fails. `next_id` supplies fresh request/survey ids.
    pub(crate) fn plan_send(&mut self, next_id: u64) -> Result<(SendPlan, SendRollback)> {
        if !protocol::can_send(self.protocol) {
            return Err(Errno::NotSupported);
        }
        let raw = self.is_raw();
        match self.protocol {
            protocol::PAIR => {
                let mut candidates = SmallVec::new();
                if let Some(link) = self.peers.first() {
                    candidates.push(link.fd);
                }
                Ok((SendPlan::Unicast { candidates, tag: 0 }, SendRollback::None))
            }
            protocol::PUSH => Ok((
                SendPlan::Unicast {
                    candidates: self.rotated_peers(),
                    tag: 0,
                },
                SendRollback::None,
            )),
            protocol::PUB => Ok((
                SendPlan::Broadcast {
                    targets: self.all_peers(),
                    tag: 0,
                },
                SendRollback::None,
            )),
            protocol::BUS => Ok((
                SendPlan::Broadcast {
                    targets: self.all_peers(),
                    tag: 0,
                },
                SendRollback::None,
            )),
            protocol::REQ => {
                let candidates = self.rotated_peers();
                if raw {
                    return Ok((SendPlan::Unicast { candidates, tag: 0 }, SendRollback::None));
                }
                let prev = self.state.clone();
                trace!("[REQ] Issuing request id={} on fd={}", next_id, self.fd);
                self.state = PatternState::Req(ReqState::Awaiting {
                    request_id: next_id,
                });
                Ok((
                    SendPlan::Unicast {
                        candidates,
                        tag: next_id,
                    },
                    SendRollback::Restore(prev),
                ))
            }
            protocol::REP | protocol::RESPONDENT => {
                if raw {
                    // Without a stashed origin, a raw reply fans out
                    return Ok((
                        SendPlan::Broadcast {
                            targets: self.all_peers(),
                            tag: 0,
                        },
                        SendRollback::None,
                    ));
                }
                let pending = match &self.state {
                    PatternState::Rep { pending } | PatternState::Respondent { pending } => {
                        *pending
                    }
                    _ => None,
                };
                let Some((origin, tag)) = pending else {
                    return Err(Errno::BadState);
                };
                // The stash survives a failed attempt; commit_send clears it
                let mut candidates = SmallVec::new();
                candidates.push(origin);
                Ok((SendPlan::Unicast { candidates, tag }, SendRollback::None))
            }
            protocol::SURVEYOR => {
                let targets = self.all_peers();
                if raw {
                    return Ok((SendPlan::Broadcast { targets, tag: 0 }, SendRollback::None));
                }
                trace!("[SURVEYOR] Opening survey id={} on fd={}", next_id, self.fd);
                self.state = PatternState::Surveyor {
                    survey_id: next_id,
                    deadline: timeout::deadline_after(self.opts.surveyor_deadline),
                    active: true,
                };
                // A new survey supersedes the old one; nothing to roll back
                Ok((
                    SendPlan::Broadcast {
                        targets,
                        tag: next_id,
                    },
                    SendRollback::None,
                ))
            }
            _ => Err(Errno::NotSupported),
        }
    }

    /// Undo the state changes of a failed send.
    pub(crate) fn rollback_send(&mut self, rollback: SendRollback) {
        if let SendRollback::Restore(prev) = rollback {
            self.state = prev;
        }
    }

    /// Recompute the candidate list for a retried unicast send.
    ///
    /// Peers come and go while a sender waits; routing that picked a
    /// specific origin keeps it.
    pub(crate) fn retry_candidates(&mut self, stored: &SmallVec<[i32; 4]>) -> SmallVec<[i32; 4]> {
        match self.protocol {
            protocol::PAIR => {
                let mut fresh = SmallVec::new();
                if let Some(link) = self.peers.first() {
                    fresh.push(link.fd);
                }
                fresh
            }
            protocol::PUSH | protocol::REQ => self.rotated_peers(),
            _ => stored.clone(),
        }
    }

    /// Commit the state change of a send that reached its peer.
    pub(crate) fn commit_send(&mut self, sent_tag: u64) {
        if let PatternState::Rep { pending } | PatternState::Respondent { pending } =
            &mut self.state
        {
            if matches!(pending, Some((_, tag)) if *tag == sent_tag) {
                trace!("[{}] Reply dispatched on fd={}", protocol::name(self.protocol), self.fd);
                *pending = None;
            }
        }
    }

    /// Check that the state machine permits a receive right now.
    ///
    /// Terminates an expired survey with `TimedOut`.
    pub(crate) fn check_recv(&mut self) -> Result<()> {
        if !protocol::can_recv(self.protocol) {
            return Err(Errno::NotSupported);
        }
        if self.is_raw() {
            return Ok(());
        }
        match &mut self.state {
            PatternState::Req(ReqState::Idle) => Err(Errno::BadState),
            PatternState::Surveyor {
                active, deadline, ..
            } => {
                if !*active {
                    return Err(Errno::BadState);
                }
                if timeout::expired(*deadline) {
                    trace!("[SURVEYOR] Survey expired on fd={}", self.fd);
                    *active = false;
                    return Err(Errno::TimedOut);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The survey deadline, when one is running.
    pub(crate) fn survey_deadline(&self) -> Option<Instant> {
        match &self.state {
            PatternState::Surveyor {
                active: true,
                deadline,
                ..
            } => *deadline,
            _ => None,
        }
    }

    /// Dequeue the next delivery and commit the receive-side state change.
    pub(crate) fn pop_delivery(&mut self) -> Option<Delivery> {
        let delivery = self.inbox.pop_front()?;
        self.inbox_bytes -= delivery.msg.accounted_bytes();
        if !self.is_raw() {
            match &mut self.state {
                PatternState::Req(state) => {
                    trace!("[REQ] Reply collected on fd={}", self.fd);
                    *state = ReqState::Idle;
                }
                PatternState::Rep { pending } | PatternState::Respondent { pending } => {
                    *pending = Some((delivery.from, delivery.tag));
                }
                _ => {}
            }
        }
        Some(delivery)
    }

    /// Offer a delivery to this socket.
    pub(crate) fn try_admit(&mut self, delivery: Delivery) -> Admit {
        // Pattern filters first: a filtered message is consumed, not retried
        if self.protocol == protocol::SUB {
            let matched = self
                .subscriptions
                .iter()
                .any(|prefix| msg_starts_with(&delivery.msg, prefix));
            if !matched {
                trace!("[SUB] Dropping unmatched message on fd={}", self.fd);
                return Admit::Filtered;
            }
        }
        if !self.is_raw() {
            match &self.state {
                PatternState::Req(ReqState::Awaiting { request_id })
                    if *request_id == delivery.tag => {}
                PatternState::Req(_) => {
                    trace!("[REQ] Dropping stale reply on fd={}", self.fd);
                    return Admit::Filtered;
                }
                PatternState::Surveyor {
                    survey_id,
                    active,
                    deadline,
                } => {
                    if !*active || *survey_id != delivery.tag || timeout::expired(*deadline) {
                        trace!("[SURVEYOR] Dropping late response on fd={}", self.fd);
                        return Admit::Filtered;
                    }
                }
                _ => {}
            }
        }
        let charge = delivery.msg.accounted_bytes();
        if self.inbox_bytes + charge > self.opts.rcvbuf {
            return Admit::Full(delivery);
        }
        self.inbox_bytes += charge;
        self.inbox.push_back(delivery);
        Admit::Delivered
    }

    /// A message can be received without blocking.
    pub(crate) fn in_ready(&self) -> bool {
        if !protocol::can_recv(self.protocol) {
            return false;
        }
        if !self.is_raw() {
            match &self.state {
                PatternState::Req(ReqState::Idle) => return false,
                PatternState::Surveyor {
                    active, deadline, ..
                } => {
                    // Expiry counts as readable so the waiter collects its
                    // timeout promptly
                    return *active && (!self.inbox.is_empty() || timeout::expired(*deadline));
                }
                _ => {}
            }
        }
        !self.inbox.is_empty()
    }

    /// The socket admits a send attempt.
    ///
    /// Advisory by design: "ready" means open and permitted by the state
    /// machine, not that a peer queue has room.
    pub(crate) fn out_ready(&self) -> bool {
        if !protocol::can_send(self.protocol) {
            return false;
        }
        if self.is_raw() {
            return true;
        }
        match &self.state {
            PatternState::Rep { pending } | PatternState::Respondent { pending } => {
                pending.is_some()
            }
            _ => true,
        }
    }

    fn all_peers(&self) -> SmallVec<[i32; 4]> {
        self.peers.iter().map(|p| p.fd).collect()
    }

    /// Peers starting at the round-robin cursor; planning advances it.
    fn rotated_peers(&mut self) -> SmallVec<[i32; 4]> {
        let n = self.peers.len();
        if n == 0 {
            return SmallVec::new();
        }
        let start = self.rr_cursor % n;
        self.rr_cursor = self.rr_cursor.wrapping_add(1);
        (0..n).map(|i| self.peers[(start + i) % n].fd).collect()
    }
}

/// Prefix match over the logical byte stream of a message, crossing
/// segment boundaries.
fn msg_starts_with(msg: &Msg, prefix: &[u8]) -> bool {
    let mut rest = prefix;
    for seg in msg.iter() {
        if rest.is_empty() {
            return true;
        }
        let bytes = seg.as_slice();
        let take = rest.len().min(bytes.len());
        if bytes[..take] != rest[..take] {
            return false;
        }
        rest = &rest[take..];
    }
    rest.is_empty()
}
