//! Protocol and option identifier space
//!
//! The fabric keeps the classic scalability-protocols numbering: a protocol
//! id is `family * 16 + role`, option levels are either the socket-general
//! level or a protocol family id, and flags/poll events are small bitmasks.
//! The typed layer above converts these to and from its enums; everything in
//! this module is plain `i32` so the entry points in [`crate::fabric`] keep
//! their C shape.

/// Standard scalability-protocols domain
pub const AF_SP: i32 = 1;
/// Raw domain: identical routing, but per-pattern send/receive state
/// machines are bypassed (device traffic)
pub const AF_SP_RAW: i32 = 2;

/// One-to-one bidirectional pipe
pub const PAIR: i32 = 16;
/// Publisher: fan-out, send only
pub const PUB: i32 = 32;
/// Subscriber: prefix-filtered, receive only
pub const SUB: i32 = 33;
/// Request side of request/reply
pub const REQ: i32 = 48;
/// Reply side of request/reply
pub const REP: i32 = 49;
/// Pipeline producer: round-robin, send only
pub const PUSH: i32 = 80;
/// Pipeline consumer: receive only
pub const PULL: i32 = 81;
/// Survey initiator: broadcast with a response deadline
pub const SURVEYOR: i32 = 96;
/// Survey responder
pub const RESPONDENT: i32 = 97;
/// Many-to-many broadcast bus
pub const BUS: i32 = 112;

/// Socket-general option level
pub const SOL_SOCKET: i32 = 0;

/// Linger on close, ms (int)
pub const LINGER: i32 = 1;
/// Send buffer size, bytes (int)
pub const SNDBUF: i32 = 2;
/// Receive queue bound, bytes (int)
pub const RCVBUF: i32 = 3;
/// Send timeout, ms; -1 means infinite (int)
pub const SNDTIMEO: i32 = 4;
/// Receive timeout, ms; -1 means infinite (int)
pub const RCVTIMEO: i32 = 5;
/// Initial reconnect interval, ms (int)
pub const RECONNECT_IVL: i32 = 6;
/// Reconnect backoff cap, ms; 0 disables backoff (int)
pub const RECONNECT_IVL_MAX: i32 = 7;
/// Outbound priority, 1..=16 (int)
pub const SNDPRIO: i32 = 8;
/// Socket domain, read-only (int)
pub const DOMAIN: i32 = 12;
/// Socket protocol, read-only (int)
pub const PROTOCOL: i32 = 13;
/// Restrict to IPv4, 0 or 1 (int)
pub const IPV4ONLY: i32 = 14;
/// Diagnostic socket name (string)
pub const SOCKET_NAME: i32 = 15;

/// Add a subscription prefix (string, level [`SUB`])
pub const SUB_SUBSCRIBE: i32 = 1;
/// Remove a subscription prefix (string, level [`SUB`])
pub const SUB_UNSUBSCRIBE: i32 = 2;
/// Request resend interval, ms (int, level [`REQ`])
pub const REQ_RESEND_IVL: i32 = 1;
/// Survey deadline, ms (int, level [`SURVEYOR`])
pub const SURVEYOR_DEADLINE: i32 = 1;

/// Non-blocking send/receive flag
pub const DONTWAIT: i32 = 1;

/// Poll event: a message can be received without blocking
pub const POLL_IN: i32 = 1;
/// Poll event: the socket admits a send attempt
pub const POLL_OUT: i32 = 2;

/// Hard cap on live sockets in the fabric
pub const MAX_SOCKETS: usize = 512;

/// True for a known socket domain.
#[must_use]
pub const fn is_valid_domain(domain: i32) -> bool {
    matches!(domain, AF_SP | AF_SP_RAW)
}

/// True for a known protocol id.
#[must_use]
pub const fn is_valid_protocol(protocol: i32) -> bool {
    matches!(
        protocol,
        PAIR | PUB | SUB | REQ | REP | PUSH | PULL | SURVEYOR | RESPONDENT | BUS
    )
}

/// Protocol family id (the protocol-level option level).
#[must_use]
pub const fn family(protocol: i32) -> i32 {
    protocol & !0xf
}

/// True when the protocol has a send direction at all.
#[must_use]
pub const fn can_send(protocol: i32) -> bool {
    !matches!(protocol, SUB | PULL)
}

/// True when the protocol has a receive direction at all.
#[must_use]
pub const fn can_recv(protocol: i32) -> bool {
    !matches!(protocol, PUB | PUSH)
}

/// Display name of a protocol id, for diagnostics.
#[must_use]
pub const fn name(protocol: i32) -> &'static str {
    match protocol {
        PAIR => "PAIR",
        PUB => "PUB",
        SUB => "SUB",
        REQ => "REQ",
        REP => "REP",
        PUSH => "PUSH",
        PULL => "PULL",
        SURVEYOR => "SURVEYOR",
        RESPONDENT => "RESPONDENT",
        BUS => "BUS",
        _ => "UNKNOWN",
    }
}

/// True when two protocols may be linked by the fabric.
#[must_use]
pub const fn is_compatible(a: i32, b: i32) -> bool {
    matches!(
        (a, b),
        (PAIR, PAIR)
            | (PUB, SUB)
            | (SUB, PUB)
            | (REQ, REP)
            | (REP, REQ)
            | (PUSH, PULL)
            | (PULL, PUSH)
            | (SURVEYOR, RESPONDENT)
            | (RESPONDENT, SURVEYOR)
            | (BUS, BUS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_numbering() {
        assert_eq!(family(PAIR), 16);
        assert_eq!(family(SUB), family(PUB));
        assert_eq!(family(REP), family(REQ));
        assert_eq!(family(RESPONDENT), SURVEYOR & !0xf);
    }

    #[test]
    fn test_direction_predicates() {
        assert!(can_send(PUB));
        assert!(!can_recv(PUB));
        assert!(!can_send(SUB));
        assert!(can_recv(SUB));
        assert!(can_send(BUS) && can_recv(BUS));
    }

    #[test]
    fn test_compatibility() {
        assert!(is_compatible(PAIR, PAIR));
        assert!(is_compatible(REQ, REP));
        assert!(is_compatible(SUB, PUB));
        assert!(!is_compatible(REQ, PULL));
        assert!(!is_compatible(PUB, PUB));
    }

    #[test]
    fn test_names() {
        assert_eq!(name(SURVEYOR), "SURVEYOR");
        assert_eq!(name(0), "UNKNOWN");
    }
}
