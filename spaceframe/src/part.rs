//! One owned message segment
//!
//! A [`Part`] owns exactly one buffer, or nothing after [`Part::release`].
//! The buffer keeps its provenance tag (fabric-allocated or caller-side)
//! through every move, so whichever side ends up dropping it frees it the
//! right way. Parts are move-only; duplicating payload is an explicit
//! [`Part::from_bytes`] copy.

use spaceframe_core::alloc::{self, MsgBuf, ALLOC_DEFAULT};

use crate::error::{Error, Result};

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width scalars that can pass through a part byte-for-byte.
///
/// Implemented for the primitive integer and floating-point types. The byte
/// image is native-endian; both ends of an in-process fabric agree on it by
/// construction.
pub trait Scalar: Copy + sealed::Sealed {
    /// Byte width of the scalar.
    const WIDTH: usize;

    #[doc(hidden)]
    fn write_ne(self, out: &mut [u8]);

    #[doc(hidden)]
    fn read_ne(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn write_ne(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn read_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                Self::from_ne_bytes(raw)
            }
        }
    )*};
}

impl_scalar!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// One owned segment of a message.
///
/// # Examples
///
/// ```
/// use spaceframe::Part;
///
/// let mut part = Part::from_bytes(b"field");
/// assert_eq!(part.as_bytes(), b"field");
///
/// let buffer = part.release().expect("an unreleased part yields its buffer");
/// assert_eq!(buffer.as_slice(), b"field");
/// assert!(part.release().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Part {
    buf: Option<MsgBuf>,
}

impl Part {
    /// Deep-copy `bytes` into a caller-side buffer.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            buf: Some(MsgBuf::copy_from(bytes)),
        }
    }

    /// Adopt an existing allocation without copying.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            buf: Some(MsgBuf::from_vec(bytes)),
        }
    }

    /// Adopt a buffer handed out by the substrate.
    #[must_use]
    pub fn from_buffer(buf: MsgBuf) -> Self {
        Self { buf: Some(buf) }
    }

    /// One new part holding the native-endian image of `value`.
    #[must_use]
    pub fn from_scalar<T: Scalar>(value: T) -> Self {
        let mut buf = MsgBuf::heap(T::WIDTH);
        value.write_ne(buf.as_mut_slice());
        Self { buf: Some(buf) }
    }

    /// Zeroed caller-side buffer of `size` bytes, for fill-in-place
    /// construction.
    #[must_use]
    pub fn alloc(size: usize) -> Self {
        Self {
            buf: Some(MsgBuf::heap(size)),
        }
    }

    /// Fabric-allocated buffer of `size` bytes.
    ///
    /// A part built here moves into a send without any further copy.
    ///
    /// # Errors
    ///
    /// [`Error::Allocation`] when the fabric refuses the allocation.
    pub fn alloc_library(size: usize) -> Result<Self> {
        let buf = alloc::allocate(size, ALLOC_DEFAULT)?;
        Ok(Self { buf: Some(buf) })
    }

    /// Byte length; `0` for a released part.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.as_ref().map_or(0, MsgBuf::len)
    }

    /// True for zero bytes, including the released state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the buffer has been taken out by [`Part::release`].
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.buf.is_none()
    }

    /// True when the buffer came from the fabric allocator.
    #[must_use]
    pub fn is_library(&self) -> bool {
        self.buf.as_ref().is_some_and(MsgBuf::is_library)
    }

    /// Read view of the bytes; empty for a released part.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_ref().map_or(&[], MsgBuf::as_slice)
    }

    /// Write view of the bytes; empty for a released part.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.buf.as_mut().map_or(&mut [], MsgBuf::as_mut_slice)
    }

    /// Reinterpret the bytes as one fixed-width scalar.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] unless the part holds exactly
    /// `size_of::<T>()` bytes.
    pub fn as_scalar<T: Scalar>(&self) -> Result<T> {
        let bytes = self.as_bytes();
        if bytes.len() != T::WIDTH {
            return Err(Error::InvalidArgument);
        }
        Ok(T::read_ne(bytes))
    }

    /// Take the buffer out, leaving the part released.
    ///
    /// Used immediately before handing the buffer to the substrate; the
    /// part's destructor then has nothing left to free. `None` when already
    /// released.
    pub fn release(&mut self) -> Option<MsgBuf> {
        self.buf.take()
    }
}
