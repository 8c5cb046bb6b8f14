//! Immutable, randomly addressable bit sources.
//!
//! An [`InputStream`] is the single byte source behind a parse tree. It is
//! immutable once built and addressed in bits, with big-endian bit order
//! (bit 0 is the most significant bit of byte 0). Three construction modes
//! exist:
//!
//! - **Owned buffer** via [`InputStream::from_bytes`] — in-memory parsing and
//!   crafted test input.
//! - **Memory-mapped file** via [`InputStream::from_file`] — large files are
//!   paged in on demand rather than loaded upfront.
//! - **Synthesized** via [`InputStream::from_fragments`] — several byte ranges
//!   independently decoded from other trees, concatenated into one fresh
//!   buffer for re-parsing. The copy has no aliasing back to its sources.
//!
//! A stream may carry a [`ReparseTag`] naming the sub-parser (and arguments)
//! that should interpret its content; fragment-reconstructed streams use this
//! to tell the consumer what the reassembled bytes mean.
//!
//! # Usage Examples
//!
//! ```rust
//! use fieldscope::InputStream;
//!
//! let stream = InputStream::from_bytes(vec![0x12, 0x34]);
//! assert_eq!(stream.size_bits(), 16);
//! assert_eq!(stream.read_bits(0, 16)?, 0x1234);
//! # Ok::<(), fieldscope::Error>(())
//! ```

pub(crate) mod bits;

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::Result;

/// Metadata describing how a stream's content should be reinterpreted.
///
/// Carried by fragment-reconstructed streams to name the sub-parser that
/// understands the reassembled bytes, together with free-form arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReparseTag {
    /// Identifier of the parser to apply, e.g. `"ttf"`.
    pub parser_id: &'static str,
    /// Free-form key/value arguments for the parser.
    pub args: Vec<(String, String)>,
}

impl ReparseTag {
    /// Creates a tag for the given parser with no arguments.
    #[must_use]
    pub fn new(parser_id: &'static str) -> Self {
        Self {
            parser_id,
            args: Vec::new(),
        }
    }

    /// Adds one key/value argument.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }
}

/// Backing storage of an [`InputStream`].
enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Backing {
    fn data(&self) -> &[u8] {
        match self {
            Backing::Owned(bytes) => bytes,
            Backing::Mapped(map) => map,
        }
    }
}

impl std::fmt::Debug for Backing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backing::Owned(bytes) => write!(f, "Owned({} bytes)", bytes.len()),
            Backing::Mapped(map) => write!(f, "Mapped({} bytes)", map.len()),
        }
    }
}

/// Immutable, bit-addressable byte source feeding a parse tree.
///
/// All reads are bounds-checked; reading past the end yields
/// [`crate::Error::OutOfBounds`]. The stream itself carries no cursor —
/// position bookkeeping belongs to the field sets consuming it.
#[derive(Debug)]
pub struct InputStream {
    backing: Backing,
    tag: Option<ReparseTag>,
}

impl InputStream {
    /// Creates a stream over an owned byte buffer.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Owned(bytes),
            tag: None,
        }
    }

    /// Creates a stream by memory-mapping a file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty file and
    /// [`crate::Error::FileError`] for I/O failures.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(crate::Error::Empty);
        }

        // Safety: the mapping is read-only and the file handle is dropped
        // after mapping; Mmap keeps the underlying file alive.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self {
            backing: Backing::Mapped(map),
            tag: None,
        })
    }

    /// Creates a stream by concatenating byte ranges in the given order.
    ///
    /// The result is an independently allocated copy with no aliasing back to
    /// the source buffers. Used by fragment groups to reassemble a logical
    /// stream out of physically separate ranges.
    #[must_use]
    pub fn from_fragments(pieces: &[Vec<u8>], tag: Option<ReparseTag>) -> Self {
        let total = pieces.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for piece in pieces {
            bytes.extend_from_slice(piece);
        }
        Self {
            backing: Backing::Owned(bytes),
            tag,
        }
    }

    /// Attaches a [`ReparseTag`] describing how this content should be
    /// reinterpreted.
    #[must_use]
    pub fn with_tag(mut self, tag: ReparseTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Returns the reinterpretation tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&ReparseTag> {
        self.tag.as_ref()
    }

    /// Returns the raw backing bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backing.data()
    }

    /// Total size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.backing.data().len() as u64
    }

    /// Total size in bits.
    #[must_use]
    pub fn size_bits(&self) -> u64 {
        self.size_bytes() * 8
    }

    /// Reads up to 64 bits at `bit_offset`, MSB-first.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] past the end of the stream.
    pub fn read_bits(&self, bit_offset: u64, count: u64) -> Result<u64> {
        bits::read_bits_at(self.backing.data(), bit_offset, count)
    }

    /// Reads `count` whole bytes starting at `bit_offset`.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] past the end of the stream.
    pub fn read_bytes(&self, bit_offset: u64, count: usize) -> Result<Vec<u8>> {
        bits::read_bytes_at(self.backing.data(), bit_offset, count)
    }
}
