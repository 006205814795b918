//! Ordered multi-part messages
//!
//! A [`Message`] is a sequence of [`Part`]s built one field at a time; part
//! boundaries are preserved through the fabric, so the receiver sees the
//! same segmentation the sender built. A [`Descriptor`] is the transient
//! read-only view a send works from: regenerated on demand, never cached,
//! and borrow-checked against the message it describes.

use smallvec::SmallVec;

use crate::part::{Part, Scalar};

/// An ordered sequence of owned parts.
///
/// # Examples
///
/// ```
/// use spaceframe::Message;
///
/// let mut msg = Message::new();
/// msg.append(1234u32).append_str("status").append_bytes(&[0xff]);
///
/// assert_eq!(msg.len(), 3);
/// assert_eq!(msg.at(0).unwrap().as_scalar::<u32>().unwrap(), 1234);
/// assert_eq!(msg.generate_descriptor().total_bytes(), 4 + 6 + 1);
/// ```
#[derive(Debug, Default)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    /// Empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message over a pre-built part sequence.
    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Append one part; insertion order is wire order.
    pub fn add_part(&mut self, part: Part) -> &mut Self {
        self.parts.push(part);
        self
    }

    /// Append a fixed-width scalar as a new part of `size_of::<T>()` bytes.
    pub fn append<T: Scalar>(&mut self, value: T) -> &mut Self {
        self.add_part(Part::from_scalar(value))
    }

    /// Append a deep copy of `bytes` as a new part.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.add_part(Part::from_bytes(bytes))
    }

    /// Append a deep copy of `text` as a new part.
    pub fn append_str(&mut self, text: &str) -> &mut Self {
        self.add_part(Part::from_bytes(text.as_bytes()))
    }

    /// Part count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the message has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The part at `index`, in insertion order.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    /// Mutable access to the part at `index`.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    /// Iterate the parts in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// Iterate the parts mutably, in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Part> {
        self.parts.iter_mut()
    }

    /// Free every buffer and clear the message.
    pub fn release(&mut self) {
        self.parts.clear();
    }

    /// Build the transient send view: one [`Segment`] per part, in order.
    ///
    /// The descriptor borrows the message, so it can neither outlive it nor
    /// coexist with mutation; regenerate after any change.
    #[must_use]
    pub fn generate_descriptor(&self) -> Descriptor<'_> {
        Descriptor {
            segments: self
                .parts
                .iter()
                .map(|part| Segment {
                    bytes: part.as_bytes(),
                    library: part.is_library(),
                })
                .collect(),
        }
    }
}

impl<'m> IntoIterator for &'m Message {
    type Item = &'m Part;
    type IntoIter = std::slice::Iter<'m, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'m> IntoIterator for &'m mut Message {
    type Item = &'m mut Part;
    type IntoIter = std::slice::IterMut<'m, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// One entry of a [`Descriptor`].
#[derive(Debug, Clone, Copy)]
pub struct Segment<'m> {
    /// The part's bytes
    pub bytes: &'m [u8],
    /// True when the part's buffer is fabric-allocated
    pub library: bool,
}

/// Read-only send view over a [`Message`].
#[derive(Debug)]
pub struct Descriptor<'m> {
    segments: SmallVec<[Segment<'m>; 4]>,
}

impl<'m> Descriptor<'m> {
    /// Segment count; equals the part count of the message it was built
    /// from.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for a descriptor over an empty message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all segment lengths in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.segments.iter().map(|seg| seg.bytes.len()).sum()
    }

    /// Iterate the segments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Segment<'m>> {
        self.segments.iter()
    }
}

impl<'d, 'm> IntoIterator for &'d Descriptor<'m> {
    type Item = &'d Segment<'m>;
    type IntoIter = std::slice::Iter<'d, Segment<'m>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
