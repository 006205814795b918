//! Spaceframe Core
//!
//! This crate contains the in-process fabric the typed `spaceframe` API
//! sits on:
//! - Library-accounted message buffers (`alloc`)
//! - Segmented whole-message carrier (`msg`)
//! - Protocol and option identifier space (`protocol`)
//! - Socket state and pattern rules (`socket`)
//! - The fabric itself: registries, routing, blocking (`fabric`)
//! - Readiness polling (`poll`)
//! - Addresses, options, timeout arithmetic, errno values (`endpoint`,
//!   `options`, `timeout`, `error`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]

pub mod alloc;
pub mod endpoint;
pub mod error;
pub mod fabric;
pub mod msg;
pub mod options;
pub mod poll;
pub mod protocol;
pub mod timeout;

mod socket;

// Optional: a small prelude to make downstream crates ergonomic.
// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::alloc::{AllocStats, MsgBuf};
    pub use crate::endpoint::Address;
    pub use crate::error::{Errno, Result};
    pub use crate::fabric::SendError;
    pub use crate::msg::Msg;
    pub use crate::options::SocketOptions;
    pub use crate::poll::PollFd;
}
