//! Message carrier
//!
//! A [`Msg`] is what moves through the fabric: an ordered sequence of owned
//! buffers. Segment boundaries are preserved from send to receive, and each
//! segment reports its true length; a receiver never has to guess sizes.

use crate::alloc::{self, MsgBuf, ALLOC_DEFAULT};
use crate::error::Result;

/// An ordered sequence of owned buffer segments.
#[derive(Debug, Default)]
pub struct Msg {
    segments: Vec<MsgBuf>,
}

impl Msg {
    /// Empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message over a pre-built segment sequence.
    #[must_use]
    pub fn from_segments(segments: Vec<MsgBuf>) -> Self {
        Self { segments }
    }

    /// Append one segment; insertion order is wire order.
    pub fn push(&mut self, segment: MsgBuf) {
        self.segments.push(segment);
    }

    /// Segment count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the message has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all segment lengths in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(MsgBuf::len).sum()
    }

    /// Queue admission charge for this message.
    ///
    /// At least one byte, so zero-length messages still occupy queue space
    /// and cannot bypass the receive buffer bound.
    #[must_use]
    pub fn accounted_bytes(&self) -> usize {
        self.total_bytes().max(1)
    }

    /// Iterate the segments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, MsgBuf> {
        self.segments.iter()
    }

    /// Take the segments out.
    #[must_use]
    pub fn into_segments(self) -> Vec<MsgBuf> {
        self.segments
    }

    /// Ensure at least one segment.
    ///
    /// Delivery normalizes an empty message to a single zero-length segment
    /// so a receive always observes at least one part.
    pub fn normalize_empty(&mut self) {
        if self.segments.is_empty() {
            self.segments.push(MsgBuf::heap(0));
        }
    }

    /// Collapse into one contiguous buffer.
    ///
    /// A single segment passes through untouched (no copy, provenance tag
    /// intact). Multiple segments concatenate, in order, into one fresh
    /// fabric allocation.
    ///
    /// # Errors
    ///
    /// Propagates allocation refusal for the concatenation buffer.
    pub fn into_whole(self) -> Result<MsgBuf> {
        let mut segments = self.segments;
        if segments.len() <= 1 {
            return Ok(segments.pop().unwrap_or_else(|| MsgBuf::heap(0)));
        }
        let total: usize = segments.iter().map(MsgBuf::len).sum();
        let mut whole = alloc::allocate(total, ALLOC_DEFAULT)?;
        let mut at = 0;
        for seg in &segments {
            let bytes = seg.as_slice();
            whole.as_mut_slice()[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        }
        Ok(whole)
    }

    /// Deep copy with caller-side buffers, for fan-out delivery.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|seg| MsgBuf::copy_from(seg.as_slice()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Msg {
    type Item = &'a MsgBuf;
    type IntoIter = std::slice::Iter<'a, MsgBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
