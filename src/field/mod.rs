//! The field tree: lazily decoded leaves, lazily produced composites, and
//! fragment reassembly.
//!
//! # Architecture
//!
//! A parse tree is built from three node kinds:
//!
//! - [`Field`] — a leaf with a fixed bit offset and bit length, decoded on
//!   first access and cached thereafter.
//! - [`FieldSet`] — an ordered, named composite produced on demand by a
//!   [`FieldProducer`] pulling bits through a forward-only cursor.
//! - [`CustomFragment`] — a leaf covering raw bytes that only become
//!   meaningful once every sibling fragment in its [`FragmentGroup`] is
//!   known and the group reassembles them into a fresh stream.
//!
//! Nothing is computed beyond what the caller's access pattern demands: a
//! malformed or oversized directory never forces unbounded work, and a
//! fatal error uncovered mid-production leaves the already-produced
//! siblings intact for inspection.

pub(crate) mod fragment;
pub(crate) mod set;
pub(crate) mod value;

pub use fragment::{CustomFragment, FragmentGroup};
pub use set::{Emitter, FieldProducer, FieldSet, Node, Step};
pub use value::{Charset, Decode, DisplayHint, FieldValue, MAC_EPOCH_TO_UNIX};

use std::sync::{Arc, OnceLock};

use crate::{stream::InputStream, Result};

/// A leaf value with a fixed bit offset and length within its stream.
///
/// The value is decoded lazily on first access and cached; repeated access is
/// idempotent and has no side effect beyond the internal cache. A decode that
/// fails (for example past the end of a truncated stream) is *not* cached, so
/// the error is reported on every attempt.
pub struct Field {
    name: String,
    description: String,
    stream: Arc<InputStream>,
    bit_offset: u64,
    bit_size: u64,
    decode: Decode,
    hint: DisplayHint,
    cache: OnceLock<FieldValue>,
}

impl Field {
    pub(crate) fn new(
        name: String,
        description: String,
        stream: Arc<InputStream>,
        bit_offset: u64,
        bit_size: u64,
        decode: Decode,
        hint: DisplayHint,
    ) -> Self {
        Self {
            name,
            description,
            stream,
            bit_offset,
            bit_size,
            decode,
            hint,
            cache: OnceLock::new(),
        }
    }

    /// Field name, unique within its parent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description, possibly empty.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Absolute bit offset within the stream.
    #[must_use]
    pub fn bit_offset(&self) -> u64 {
        self.bit_offset
    }

    /// Size in bits.
    #[must_use]
    pub fn bit_size(&self) -> u64 {
        self.bit_size
    }

    /// Decodes the value, caching it on first success.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when the field's range extends past the
    /// stream; the failure is not cached.
    pub fn value(&self) -> Result<&FieldValue> {
        if let Some(value) = self.cache.get() {
            return Ok(value);
        }
        let value = self.decode.run(&self.stream, self.bit_offset, self.bit_size)?;
        Ok(self.cache.get_or_init(|| value))
    }

    /// Renders the decoded value according to the field's display hint.
    ///
    /// # Errors
    /// Propagates the decode error when the value cannot be read.
    pub fn display(&self) -> Result<String> {
        Ok(self.hint.render(self.value()?, self.bit_size))
    }

    #[cfg(test)]
    pub(crate) fn decode(&self) -> Decode {
        self.decode
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("bit_offset", &self.bit_offset)
            .field("bit_size", &self.bit_size)
            .field("decode", &self.decode)
            .finish()
    }
}
