//! Fragment reconstruction: reassembling physically separate byte ranges
//! into one virtual stream for re-parsing.
//!
//! Container formats routinely scatter one logical payload across several
//! physical chunks. A [`CustomFragment`] is both things at once: N raw bytes
//! at a fixed place in the outer tree, and an opaque pointer into a wider
//! logical stream that only becomes meaningful once every sibling fragment is
//! known. The [`FragmentGroup`] collects the fragments in registration order
//! (which is independent of their physical offsets) and, on demand,
//! concatenates their contents into a fresh [`InputStream`] tagged with the
//! sub-parser that understands the reassembled bytes.
//!
//! Construction is explicitly two-phase: build the fragment, then append it
//! to a caller-held group with [`FragmentGroup::add`]. There is no implicit
//! group creation and no registration side effect hidden inside a
//! constructor.
//!
//! # Usage Examples
//!
//! ```rust
//! use fieldscope::{CustomFragment, FragmentGroup, InputStream, ReparseTag};
//! use std::sync::Arc;
//!
//! let stream = Arc::new(InputStream::from_bytes(b"..AB..CD".to_vec()));
//! let group = Arc::new(FragmentGroup::new(ReparseTag::new("ttf")));
//!
//! let first = CustomFragment::new("part[0]".into(), String::new(),
//!     Arc::clone(&stream), 16, 16, Arc::clone(&group));
//! group.add(&first);
//! let second = CustomFragment::new("part[1]".into(), String::new(),
//!     Arc::clone(&stream), 48, 16, Arc::clone(&group));
//! group.add(&second);
//!
//! let rebuilt = group.create_input_stream()?;
//! assert_eq!(rebuilt.data(), b"ABCD");
//! # Ok::<(), fieldscope::Error>(())
//! ```

use std::sync::Arc;

use crate::{
    stream::{InputStream, ReparseTag},
    Result,
};

/// One registered byte range: enough to re-read its content later.
#[derive(Debug)]
struct Piece {
    stream: Arc<InputStream>,
    bit_offset: u64,
    bit_size: u64,
}

/// Ordered accumulator of fragment ranges plus the sub-parser that should
/// interpret their reassembled bytes.
///
/// Registration order defines reassembly order. The group is shared as an
/// [`Arc`] between the fragments and whoever triggers reconstruction;
/// appends go through `&self` (boxcar), so no interior-mutability wrapper is
/// needed at the call sites.
#[derive(Debug)]
pub struct FragmentGroup {
    pieces: boxcar::Vec<Piece>,
    tag: ReparseTag,
}

impl FragmentGroup {
    /// Creates an empty group whose reconstructed stream will carry `tag`.
    #[must_use]
    pub fn new(tag: ReparseTag) -> Self {
        Self {
            pieces: boxcar::Vec::new(),
            tag,
        }
    }

    /// Registers a fragment. Order of `add` calls is reassembly order.
    pub fn add(&self, fragment: &CustomFragment) {
        self.pieces.push(Piece {
            stream: Arc::clone(&fragment.stream),
            bit_offset: fragment.bit_offset,
            bit_size: fragment.bit_size,
        });
    }

    /// Number of registered fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.count()
    }

    /// True when no fragments have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.count() == 0
    }

    /// The tag applied to reconstructed streams.
    #[must_use]
    pub fn tag(&self) -> &ReparseTag {
        &self.tag
    }

    /// Builds a fresh stream by concatenating every fragment's raw bytes in
    /// registration order.
    ///
    /// The result is recomputed on every call (never cached) and owns an
    /// independent copy of the bytes with no aliasing back to the source
    /// streams.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when a fragment's range no longer fits
    /// its source stream.
    pub fn create_input_stream(&self) -> Result<InputStream> {
        let mut contents = Vec::with_capacity(self.pieces.count());
        for (_, piece) in self.pieces.iter() {
            contents.push(
                piece
                    .stream
                    .read_bytes(piece.bit_offset, (piece.bit_size / 8) as usize)?,
            );
        }
        Ok(InputStream::from_fragments(
            &contents,
            Some(self.tag.clone()),
        ))
    }
}

/// A field covering one physical chunk of fragment bytes.
///
/// Within the outer tree it behaves like any raw-byte leaf; asked to
/// reinterpret its content, it defers entirely to its group's reconstructed
/// stream rather than its own narrow range.
#[derive(Debug)]
pub struct CustomFragment {
    name: String,
    description: String,
    stream: Arc<InputStream>,
    bit_offset: u64,
    bit_size: u64,
    group: Arc<FragmentGroup>,
}

impl CustomFragment {
    /// Creates a fragment over `bit_size` bits at `bit_offset`.
    ///
    /// The group argument is always explicit, and this does *not* register
    /// the fragment; call [`FragmentGroup::add`] afterwards.
    #[must_use]
    pub fn new(
        name: String,
        description: String,
        stream: Arc<InputStream>,
        bit_offset: u64,
        bit_size: u64,
        group: Arc<FragmentGroup>,
    ) -> Self {
        Self {
            name,
            description,
            stream,
            bit_offset,
            bit_size,
            group,
        }
    }

    /// Fragment name, unique within its parent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Absolute bit offset within the outer stream.
    #[must_use]
    pub fn bit_offset(&self) -> u64 {
        self.bit_offset
    }

    /// Size in bits.
    #[must_use]
    pub fn bit_size(&self) -> u64 {
        self.bit_size
    }

    /// The shared group this fragment belongs to.
    #[must_use]
    pub fn group(&self) -> &Arc<FragmentGroup> {
        &self.group
    }

    /// Reads this fragment's own raw bytes from the outer stream.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when the range does not fit the stream.
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        self.stream
            .read_bytes(self.bit_offset, (self.bit_size / 8) as usize)
    }

    /// Reinterprets this fragment by reconstructing the whole group.
    ///
    /// # Errors
    /// Propagates reconstruction failures from the group.
    pub fn reinterpret(&self) -> Result<InputStream> {
        self.group.create_input_stream()
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = description;
    }
}
