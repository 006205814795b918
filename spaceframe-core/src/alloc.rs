//! Message buffer allocation
//!
//! This module is the only place buffers enter and leave the fabric's
//! accounting. Every buffer carries its provenance tag with it, so the
//! correct release path is chosen by `Drop` no matter how many moves the
//! buffer went through in between.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Errno, Result};

/// Refuse single allocations beyond this size.
/// Keeps a corrupted length from taking the process down.
pub const MAX_ALLOC: usize = 1 << 30;

/// The only defined allocation type tag.
pub const ALLOC_DEFAULT: i32 = 0;

static LIVE: AtomicUsize = AtomicUsize::new(0);
static TOTAL_ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static TOTAL_RELEASED: AtomicUsize = AtomicUsize::new(0);

/// A fabric-allocated buffer.
///
/// Invariant:
/// - Created only by [`allocate`], which bumps the live counter.
/// - The counter is decremented exactly once, in `Drop`.
#[derive(Debug)]
pub struct LibraryBuf {
    data: Box<[u8]>,
}

impl Drop for LibraryBuf {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::Relaxed);
        TOTAL_RELEASED.fetch_add(1, Ordering::Relaxed);
    }
}

/// An owned message buffer, tagged with its allocation origin.
///
/// The tag travels with the buffer through every move; it never changes
/// after construction. `Library` buffers came from the fabric's allocator
/// and are accounted in [`stats`]; `Heap` buffers are ordinary
/// caller-side allocations.
#[derive(Debug)]
pub enum MsgBuf {
    /// Allocated by the fabric ([`allocate`])
    Library(LibraryBuf),
    /// Allocated by the caller (copies, placeholders)
    Heap(Box<[u8]>),
}

impl MsgBuf {
    /// Zeroed caller-side buffer of `size` bytes.
    #[must_use]
    pub fn heap(size: usize) -> Self {
        Self::Heap(vec![0u8; size].into_boxed_slice())
    }

    /// Caller-side buffer holding a deep copy of `bytes`.
    #[must_use]
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self::Heap(bytes.to_vec().into_boxed_slice())
    }

    /// Adopt an existing allocation without copying.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::Heap(bytes.into_boxed_slice())
    }

    /// Buffer length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True for a zero-length buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the buffer came from the fabric allocator.
    #[must_use]
    pub const fn is_library(&self) -> bool {
        matches!(self, Self::Library(_))
    }

    /// Read view of the bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Library(buf) => &buf.data,
            Self::Heap(data) => data,
        }
    }

    /// Write view of the bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Library(buf) => &mut buf.data,
            Self::Heap(data) => data,
        }
    }
}

/// Allocate `size` bytes from the fabric.
///
/// A buffer obtained here can be handed to a send entry point with no
/// further copies. `type_tag` selects the allocation type; only
/// [`ALLOC_DEFAULT`] is defined.
///
/// # Errors
///
/// * [`Errno::InvalidArgument`] for an unknown `type_tag`
/// * [`Errno::OutOfMemory`] when `size` exceeds [`MAX_ALLOC`]
pub fn allocate(size: usize, type_tag: i32) -> Result<MsgBuf> {
    if type_tag != ALLOC_DEFAULT {
        return Err(Errno::InvalidArgument);
    }
    if size > MAX_ALLOC {
        return Err(Errno::OutOfMemory);
    }
    LIVE.fetch_add(1, Ordering::Relaxed);
    TOTAL_ALLOCATED.fetch_add(1, Ordering::Relaxed);
    Ok(MsgBuf::Library(LibraryBuf {
        data: vec![0u8; size].into_boxed_slice(),
    }))
}

/// Snapshot of the allocator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
    /// Fabric buffers currently alive
    pub live: usize,
    /// Fabric buffers handed out since process start
    pub total_allocated: usize,
    /// Fabric buffers released since process start
    pub total_released: usize,
}

/// Read the allocator counters.
///
/// `live` is the number of fabric-allocated buffers not yet dropped; tests
/// use it to prove that ownership hand-off neither leaks nor double-frees.
#[must_use]
pub fn stats() -> AllocStats {
    AllocStats {
        live: LIVE.load(Ordering::Relaxed),
        total_allocated: TOTAL_ALLOCATED.load(Ordering::Relaxed),
        total_released: TOTAL_RELEASED.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_allocate_counts_live() {
        let before = stats().live;
        let buf = allocate(64, ALLOC_DEFAULT).unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.is_library());
        assert_eq!(stats().live, before + 1);
        drop(buf);
        assert_eq!(stats().live, before);
    }

    #[test]
    fn test_unknown_type_tag_rejected() {
        assert_eq!(allocate(16, 7).unwrap_err(), Errno::InvalidArgument);
    }

    #[test]
    fn test_oversized_allocation_rejected() {
        assert_eq!(
            allocate(MAX_ALLOC + 1, ALLOC_DEFAULT).unwrap_err(),
            Errno::OutOfMemory
        );
    }

    #[test]
    #[serial]
    fn test_heap_buffers_do_not_touch_counters() {
        let before = stats();
        let copy = MsgBuf::copy_from(b"hello");
        assert_eq!(copy.as_slice(), b"hello");
        assert!(!copy.is_library());
        drop(copy);
        assert_eq!(stats(), before);
    }

    #[test]
    fn test_zeroed_allocation() {
        let buf = allocate(8, ALLOC_DEFAULT).unwrap();
        assert_eq!(buf.as_slice(), &[0u8; 8]);
    }
}
