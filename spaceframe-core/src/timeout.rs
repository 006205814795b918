//! Timeout arithmetic for blocking operations
//!
//! Option values carry timeouts as milliseconds with `-1` meaning infinite.
//! Internally every wait works on `Option<Duration>`:
//! - `None`: block indefinitely
//! - `Some(Duration::ZERO)`: non-blocking (fail immediately if not ready)
//! - `Some(duration)`: wait up to duration

use std::time::{Duration, Instant};

use crate::error::{Errno, Result};

/// Millisecond sentinel for "no timeout".
pub const INFINITE: i32 = -1;

/// Decode a millisecond option value into a wait bound.
///
/// # Errors
///
/// [`Errno::InvalidArgument`] for negative values other than [`INFINITE`].
pub fn from_millis(ms: i32) -> Result<Option<Duration>> {
    match ms {
        INFINITE => Ok(None),
        v if v < 0 => Err(Errno::InvalidArgument),
        v => Ok(Some(Duration::from_millis(v as u64))),
    }
}

/// Encode a wait bound back into the millisecond option value.
#[must_use]
pub fn to_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => INFINITE,
        Some(d) => i32::try_from(d.as_millis()).unwrap_or(i32::MAX),
    }
}

/// Decode a poll timeout: any negative value blocks indefinitely.
#[must_use]
pub fn poll_bound(ms: i32) -> Option<Duration> {
    if ms < 0 {
        None
    } else {
        Some(Duration::from_millis(ms as u64))
    }
}

/// Absolute deadline for a wait starting now; `None` for infinite waits.
#[must_use]
pub fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|d| Instant::now() + d)
}

/// Time left until `deadline`.
///
/// `None` for infinite waits, `Some(Duration::ZERO)` once the deadline has
/// passed.
#[must_use]
pub fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|d| d.saturating_duration_since(Instant::now()))
}

/// True once `deadline` has passed.
#[must_use]
pub fn expired(deadline: Option<Instant>) -> bool {
    matches!(remaining(deadline), Some(d) if d.is_zero())
}

/// The earlier of two optional deadlines; `None` means unbounded.
#[must_use]
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        assert_eq!(from_millis(-1).unwrap(), None);
        assert_eq!(from_millis(0).unwrap(), Some(Duration::ZERO));
        assert_eq!(
            from_millis(250).unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(from_millis(-2).unwrap_err(), Errno::InvalidArgument);
    }

    #[test]
    fn test_round_trip() {
        for ms in [0, 1, 100, 60_000] {
            assert_eq!(to_millis(from_millis(ms).unwrap()), ms);
        }
        assert_eq!(to_millis(None), INFINITE);
    }

    #[test]
    fn test_poll_bound_any_negative_is_infinite() {
        assert_eq!(poll_bound(-1), None);
        assert_eq!(poll_bound(-100), None);
        assert_eq!(poll_bound(0), Some(Duration::ZERO));
    }

    #[test]
    fn test_deadlines() {
        assert_eq!(deadline_after(None), None);
        assert!(!expired(None));

        let past = deadline_after(Some(Duration::ZERO));
        assert!(expired(past));

        let future = deadline_after(Some(Duration::from_secs(60)));
        assert!(!expired(future));
        assert!(remaining(future).is_some());
    }

    #[test]
    fn test_earliest() {
        let soon = Instant::now();
        let later = soon + Duration::from_secs(5);
        assert_eq!(earliest(Some(soon), Some(later)), Some(soon));
        assert_eq!(earliest(None, Some(later)), Some(later));
        assert_eq!(earliest(Some(soon), None), Some(soon));
        assert_eq!(earliest(None, None), None);
    }
}
