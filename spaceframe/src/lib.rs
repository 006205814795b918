//! # Spaceframe
//!
//! Typed, resource-safe messaging over the scalability protocols.
//!
//! ## Architecture
//!
//! Spaceframe is structured as a small **messaging kernel** with a typed
//! shell:
//!
//! - **`spaceframe-core`**: the in-process fabric — socket registry,
//!   pattern state machines, rendezvous, queue admission, the readiness
//!   monitor
//! - **`spaceframe`**: the public API surface (this crate) — owned sockets,
//!   multi-part messages, pollers and forwarding devices
//!
//! ## Patterns
//!
//! All six scalability-protocols patterns are available through one
//! [`Socket`] type:
//!
//! - **pair** — one-to-one bidirectional pipe
//! - **pub/sub** — fan-out with byte-prefix subscription filtering
//! - **req/rep** — correlated request/reply with stale-reply rejection
//! - **push/pull** — round-robin pipeline distribution
//! - **surveyor/respondent** — broadcast questions with a response deadline
//! - **bus** — many-to-many broadcast
//!
//! ## Quick Start
//!
//! ```rust
//! use spaceframe::{Domain, Message, Socket, SocketType};
//!
//! fn main() -> spaceframe::Result<()> {
//!     let mut responder = Socket::new(Domain::Sp, SocketType::Rep)?;
//!     responder.bind("inproc://quickstart")?;
//!
//!     let mut requester = Socket::new(Domain::Sp, SocketType::Req)?;
//!     requester.connect("inproc://quickstart")?;
//!
//!     let mut ping = Message::new();
//!     ping.append_str("ping");
//!     requester.sendmsg(&mut ping)?;
//!
//!     let question = responder.recvmsg(1)?;
//!     assert_eq!(question.at(0).unwrap().as_bytes(), b"ping");
//!
//!     let mut pong = Message::new();
//!     pong.append_str("pong");
//!     responder.sendmsg(&mut pong)?;
//!
//!     let answer = requester.recvmsg(1)?;
//!     assert_eq!(answer.at(0).unwrap().as_bytes(), b"pong");
//!     Ok(())
//! }
//! ```
//!
//! ## Ownership
//!
//! - Every buffer carries a provenance tag; whoever ends up dropping it
//!   frees it the right way, with no double-free path to misuse
//! - Send is two-phase: buffers drain into the fabric and come back intact
//!   if the send fails, so retry and drop both stay safe
//! - [`Socket`] and [`Part`] are move-only; `close` is idempotent and drop
//!   always releases

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dev_tracing;
pub mod device;
pub mod error;
pub mod message;
pub mod options;
pub mod part;
pub mod poller;
pub mod socket;
pub mod socket_type;

pub use error::{Error, Result};
pub use message::{Descriptor, Message, Segment};
pub use options::{OptionKind, OptionValue, SocketOption};
pub use part::{Part, Scalar};
pub use poller::{Interest, Poller};
pub use socket::Socket;
pub use socket_type::{Domain, SocketType};

// Re-export the substrate buffer types that appear in the public API
pub use spaceframe_core::alloc::{stats as buffer_stats, AllocStats, MsgBuf};

/// Optional: a small prelude for the common messaging vocabulary.
pub mod prelude {
    pub use crate::device;
    pub use crate::error::{Error, Result};
    pub use crate::message::Message;
    pub use crate::options::{OptionValue, SocketOption};
    pub use crate::part::Part;
    pub use crate::poller::{Interest, Poller};
    pub use crate::socket::Socket;
    pub use crate::socket_type::{Domain, SocketType};
}
