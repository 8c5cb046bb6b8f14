//! The lazy field-set engine: pull-based production over a forward-only
//! bit cursor.
//!
//! # Architecture
//!
//! A [`FieldSet`] owns an ordered list of produced children and a boxed
//! [`FieldProducer`], an explicit state machine standing in for a generator:
//! each [`FieldSet::produce_next`] call advances the machine until at least
//! one new child exists or the producer reports [`Step::Done`]. Nothing past
//! the caller's demand is ever materialized, so a prefix of an arbitrarily
//! large directory can be inspected without forcing the remainder.
//!
//! Producers speak to the set through an [`Emitter`], which enforces the
//! layout invariants at the only place children can be created:
//!
//! - children are gapless and in offset order — every emitted child starts at
//!   the current cursor, and gaps are covered by explicit padding fields
//!   emitted by [`Emitter::seek_bit`];
//! - the cursor only moves forward — a backward seek is
//!   [`crate::Error::BackwardSeek`], since later random-access lookups assume
//!   already-produced offsets are final;
//! - names are unique within the set — repeated logical roles use the
//!   `name[]` convention and receive implicit sequence suffixes;
//! - once production completes, the children's bit sizes sum exactly to the
//!   declared size when one was declared (a trailing padding field is added
//!   automatically if the producer stops short).
//!
//! # Error policy
//!
//! A fatal error returned by a producer aborts that set's production: the
//! producer is dropped, the error propagates to whoever pulled, and the
//! already-produced children remain inspectable. Recoverable anomalies are
//! reported through [`Emitter::warn`] to the shared
//! [`crate::diagnostics::Diagnostics`] sink and production continues.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    diagnostics::{Anomaly, AnomalyCategory, AnomalySeverity, Diagnostics},
    field::{
        fragment::{CustomFragment, FragmentGroup},
        value::{Charset, Decode, DisplayHint},
        Field,
    },
    stream::InputStream,
    Result,
};

/// Outcome of one producer step.
pub enum Step {
    /// More children may follow; call again.
    Continue,
    /// Production of this set is complete.
    Done,
}

/// Pull-driven producer routine of a [`FieldSet`].
///
/// The engine calls [`FieldProducer::produce`] once per demanded step; each
/// successful `Continue` step is expected to emit at least one child through
/// the [`Emitter`].
pub trait FieldProducer {
    /// Advances the production state machine by one step.
    ///
    /// # Errors
    /// A fatal structural error aborts this set's production permanently.
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step>;
}

/// One node of the field tree.
#[derive(Debug)]
pub enum Node {
    /// Leaf value.
    Field(Field),
    /// Nested composite.
    Set(FieldSet),
    /// Raw bytes registered into a fragment group.
    Fragment(CustomFragment),
}

impl Node {
    /// Node name, unique within its parent.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Node::Field(f) => f.name(),
            Node::Set(s) => s.name(),
            Node::Fragment(f) => f.name(),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Node::Field(f) => f.description(),
            Node::Set(s) => s.description(),
            Node::Fragment(f) => f.description(),
        }
    }

    /// Absolute bit offset within the stream.
    #[must_use]
    pub fn bit_offset(&self) -> u64 {
        match self {
            Node::Field(f) => f.bit_offset(),
            Node::Set(s) => s.bit_offset(),
            Node::Fragment(f) => f.bit_offset(),
        }
    }

    /// Size in bits. For a set with a declared size this is the declared
    /// size; otherwise the bits produced so far.
    #[must_use]
    pub fn bit_size(&self) -> u64 {
        match self {
            Node::Field(f) => f.bit_size(),
            Node::Set(s) => s.bit_size(),
            Node::Fragment(f) => f.bit_size(),
        }
    }

    /// Leaf view of this node.
    #[must_use]
    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Node::Field(f) => Some(f),
            _ => None,
        }
    }

    /// Composite view of this node.
    #[must_use]
    pub fn as_set(&self) -> Option<&FieldSet> {
        match self {
            Node::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable composite view, needed to drive a nested set's production.
    #[must_use]
    pub fn as_set_mut(&mut self) -> Option<&mut FieldSet> {
        match self {
            Node::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Fragment view of this node.
    #[must_use]
    pub fn as_fragment(&self) -> Option<&CustomFragment> {
        match self {
            Node::Fragment(f) => Some(f),
            _ => None,
        }
    }

    fn set_description(&mut self, description: String) {
        match self {
            Node::Field(f) => f.description = description,
            Node::Set(s) => s.description = description,
            Node::Fragment(f) => f.set_description(description),
        }
    }
}

/// Ordered, named composite of fields and nested sets, produced lazily.
pub struct FieldSet {
    name: String,
    pub(crate) description: String,
    stream: Arc<InputStream>,
    diag: Arc<Diagnostics>,
    base: u64,
    declared_size: Option<u64>,
    children: Vec<Node>,
    index: HashMap<String, usize>,
    counters: HashMap<String, u32>,
    cursor: u64,
    producer: Option<Box<dyn FieldProducer>>,
}

impl FieldSet {
    /// Creates a root set spanning the whole stream.
    #[must_use]
    pub fn root(
        name: impl Into<String>,
        stream: Arc<InputStream>,
        diag: Arc<Diagnostics>,
        producer: Box<dyn FieldProducer>,
    ) -> Self {
        let declared = stream.size_bits();
        Self::new(
            name.into(),
            String::new(),
            stream,
            diag,
            0,
            Some(declared),
            producer,
        )
    }

    pub(crate) fn new(
        name: String,
        description: String,
        stream: Arc<InputStream>,
        diag: Arc<Diagnostics>,
        base: u64,
        declared_size: Option<u64>,
        producer: Box<dyn FieldProducer>,
    ) -> Self {
        Self {
            name,
            description,
            stream,
            diag,
            base,
            declared_size,
            children: Vec::new(),
            index: HashMap::new(),
            counters: HashMap::new(),
            cursor: 0,
            producer: Some(producer),
        }
    }

    /// Set name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Absolute bit offset of this set's first child.
    #[must_use]
    pub fn bit_offset(&self) -> u64 {
        self.base
    }

    /// Declared size in bits, or the bits produced so far when none was
    /// declared.
    #[must_use]
    pub fn bit_size(&self) -> u64 {
        self.declared_size.unwrap_or(self.cursor)
    }

    /// Bits produced so far.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.cursor
    }

    /// The backing stream.
    #[must_use]
    pub fn stream(&self) -> &Arc<InputStream> {
        &self.stream
    }

    /// The shared anomaly sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diag
    }

    /// Number of children produced so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when no children have been produced yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// True once the producer has finished or aborted.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.producer.is_none()
    }

    /// Returns an already-produced child by index.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// Iterates over the children produced so far.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.children.iter()
    }

    /// Looks up an already-produced child by name without forcing production.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).and_then(|&i| self.children.get(i))
    }

    /// Looks up a child by name, producing preceding siblings as needed.
    ///
    /// # Errors
    /// Propagates a fatal production error hit while searching.
    pub fn by_name(&mut self, name: &str) -> Result<Option<&Node>> {
        let index = self.find(name)?;
        Ok(index.and_then(|i| self.children.get(i)))
    }

    /// Mutable variant of [`FieldSet::by_name`], used to drive a nested
    /// set's own production.
    ///
    /// # Errors
    /// Propagates a fatal production error hit while searching.
    pub fn by_name_mut(&mut self, name: &str) -> Result<Option<&mut Node>> {
        let index = self.find(name)?;
        Ok(index.and_then(move |i| self.children.get_mut(i)))
    }

    fn find(&mut self, name: &str) -> Result<Option<usize>> {
        if let Some(&i) = self.index.get(name) {
            return Ok(Some(i));
        }
        while self.producer.is_some() {
            self.produce_next()?;
            if let Some(&i) = self.index.get(name) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Pulls the next production step.
    ///
    /// Returns the index of the first newly produced child, or `None` once
    /// the set is exhausted.
    ///
    /// # Errors
    /// A fatal error from the producer aborts this set's production; the
    /// children emitted before the failure remain inspectable.
    pub fn produce_next(&mut self) -> Result<Option<usize>> {
        let Some(mut producer) = self.producer.take() else {
            return Ok(None);
        };

        let before = self.children.len();
        loop {
            let step = {
                let mut emitter = self.emitter();
                producer.produce(&mut emitter)
            };
            match step {
                Ok(Step::Continue) => {
                    if self.children.len() > before {
                        self.producer = Some(producer);
                        return Ok(Some(before));
                    }
                    // A step that emitted nothing; keep pulling.
                }
                Ok(Step::Done) => {
                    self.finish()?;
                    return Ok((self.children.len() > before).then_some(before));
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Produces every remaining child.
    ///
    /// # Errors
    /// Propagates the first fatal production error.
    pub fn produce_all(&mut self) -> Result<()> {
        while self.produce_next()?.is_some() {}
        Ok(())
    }

    /// Covers any remainder up to the declared size with one padding field.
    fn finish(&mut self) -> Result<()> {
        if let Some(declared) = self.declared_size {
            if self.cursor < declared {
                self.emitter().seek_bit(declared, true)?;
            }
        }
        Ok(())
    }

    fn emitter(&mut self) -> Emitter<'_> {
        Emitter {
            set_name: &self.name,
            stream: &self.stream,
            diag: &self.diag,
            base: self.base,
            declared_size: self.declared_size,
            children: &mut self.children,
            index: &mut self.index,
            counters: &mut self.counters,
            cursor: &mut self.cursor,
        }
    }
}

impl std::fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSet")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("declared_size", &self.declared_size)
            .field("cursor", &self.cursor)
            .field("children", &self.children.len())
            .field("exhausted", &self.producer.is_none())
            .finish()
    }
}

/// The producer's handle into its owning set.
///
/// All child creation funnels through this type, which is where the layout
/// invariants (gapless non-decreasing offsets, forward-only cursor, unique
/// names, declared-size ceiling) are enforced.
pub struct Emitter<'a> {
    set_name: &'a str,
    stream: &'a Arc<InputStream>,
    diag: &'a Arc<Diagnostics>,
    base: u64,
    declared_size: Option<u64>,
    children: &'a mut Vec<Node>,
    index: &'a mut HashMap<String, usize>,
    counters: &'a mut HashMap<String, u32>,
    cursor: &'a mut u64,
}

impl Emitter<'_> {
    /// Current cursor position in bits, relative to the set.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        *self.cursor
    }

    /// Current cursor position in whole bytes, rounding down.
    #[must_use]
    pub fn cursor_bytes(&self) -> u64 {
        *self.cursor / 8
    }

    /// Declared size of the set in bits, when one was declared.
    #[must_use]
    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    /// Bits left before the declared size, when one was declared.
    #[must_use]
    pub fn remaining_bits(&self) -> Option<u64> {
        self.declared_size.map(|d| d.saturating_sub(*self.cursor))
    }

    /// The backing stream.
    #[must_use]
    pub fn stream(&self) -> &Arc<InputStream> {
        self.stream
    }

    /// Returns an already-produced child by index.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// Reports a recoverable anomaly at the current cursor position.
    pub fn warn(&self, category: AnomalyCategory, message: impl Into<String>) {
        self.diag.push(
            Anomaly::new(AnomalySeverity::Warning, category, message)
                .with_bit_offset(self.base + *self.cursor),
        );
    }

    /// Replaces the description of the most recently emitted child.
    ///
    /// Descriptions that depend on decoded values (for example a directory
    /// record naming its own tag) are computed by the producer after the
    /// record's fields exist, then attached here.
    pub fn describe_last(&mut self, description: impl Into<String>) {
        if let Some(node) = self.children.last_mut() {
            node.set_description(description.into());
        }
    }

    fn resolve(&mut self, name: &str) -> Result<String> {
        if let Some(basename) = name.strip_suffix("[]") {
            let counter = self.counters.entry(basename.to_string()).or_insert(0);
            let resolved = format!("{basename}[{counter}]");
            *counter += 1;
            Ok(resolved)
        } else if self.index.contains_key(name) {
            Err(crate::Error::DuplicateName(name.to_string()))
        } else {
            Ok(name.to_string())
        }
    }

    fn push_node(&mut self, node: Node) -> Result<usize> {
        let size = node.bit_size();
        if let Some(declared) = self.declared_size {
            if *self.cursor + size > declared {
                return Err(malformed_error!(
                    "Field '{}' extends past the declared size of '{}' ({} + {} > {} bits)",
                    node.name(),
                    self.set_name,
                    *self.cursor,
                    size,
                    declared
                ));
            }
        }
        let index = self.children.len();
        self.index.insert(node.name().to_string(), index);
        self.children.push(node);
        *self.cursor += size;
        Ok(index)
    }

    fn push_field(
        &mut self,
        name: &str,
        description: &str,
        bit_size: u64,
        decode: Decode,
        hint: DisplayHint,
    ) -> Result<usize> {
        let resolved = self.resolve(name)?;
        let field = Field::new(
            resolved,
            description.to_string(),
            Arc::clone(self.stream),
            self.base + *self.cursor,
            bit_size,
            decode,
            hint,
        );
        self.push_node(Node::Field(field))
    }

    fn force_u64(&self, index: usize) -> Result<u64> {
        if let Some(Node::Field(field)) = self.children.get(index) {
            if let Some(value) = field.value()?.as_u64() {
                return Ok(value);
            }
        }
        Err(malformed_error!(
            "Field {} of '{}' has no unsigned value",
            index,
            self.set_name
        ))
    }

    /// Emits a big-endian `u16` field and returns its value.
    pub fn u16(&mut self, name: &str, description: &str) -> Result<u16> {
        let index = self.push_field(name, description, 16, Decode::UIntBe, DisplayHint::Default)?;
        Ok(self.force_u64(index)? as u16)
    }

    /// Emits a labeled big-endian `u16` field and returns its value.
    pub fn u16_labeled(
        &mut self,
        name: &str,
        description: &str,
        labels: fn(i64) -> Option<&'static str>,
    ) -> Result<u16> {
        let index = self.push_field(
            name,
            description,
            16,
            Decode::UIntBe,
            DisplayHint::Labels(labels),
        )?;
        Ok(self.force_u64(index)? as u16)
    }

    /// Emits a labeled big-endian `i16` field and returns its value.
    pub fn i16_labeled(
        &mut self,
        name: &str,
        description: &str,
        labels: fn(i64) -> Option<&'static str>,
    ) -> Result<i16> {
        let index = self.push_field(
            name,
            description,
            16,
            Decode::IntBe,
            DisplayHint::Labels(labels),
        )?;
        if let Some(Node::Field(field)) = self.children.get(index) {
            if let Some(value) = field.value()?.as_i64() {
                return Ok(value as i16);
            }
        }
        Err(malformed_error!(
            "Field '{}' of '{}' has no signed value",
            name,
            self.set_name
        ))
    }

    /// Emits a big-endian `u32` field and returns its value.
    pub fn u32(&mut self, name: &str, description: &str) -> Result<u32> {
        let index = self.push_field(name, description, 32, Decode::UIntBe, DisplayHint::Default)?;
        Ok(self.force_u64(index)? as u32)
    }

    /// Emits a big-endian `u32` field displayed as hexadecimal.
    pub fn u32_hex(&mut self, name: &str, description: &str) -> Result<u32> {
        let index = self.push_field(
            name,
            description,
            32,
            Decode::UIntBe,
            DisplayHint::Hexadecimal,
        )?;
        Ok(self.force_u64(index)? as u32)
    }

    /// Emits a big-endian `u32` field displayed as a human-readable size.
    pub fn u32_size(&mut self, name: &str, description: &str) -> Result<u32> {
        let index =
            self.push_field(name, description, 32, Decode::UIntBe, DisplayHint::FileSize)?;
        Ok(self.force_u64(index)? as u32)
    }

    /// Emits a single flag bit and returns its value.
    pub fn bit(&mut self, name: &str, description: &str) -> Result<bool> {
        let index = self.push_field(name, description, 1, Decode::Bit, DisplayHint::Default)?;
        Ok(self.force_u64(index)? != 0)
    }

    /// Emits a right-aligned bit group and returns its value.
    pub fn bits(&mut self, name: &str, count: u64, description: &str) -> Result<u64> {
        let index = self.push_field(name, description, count, Decode::Bits, DisplayHint::Default)?;
        self.force_u64(index)
    }

    /// Emits reserved bits that carry no value.
    pub fn null_bits(&mut self, name: &str, count: u64, description: &str) -> Result<()> {
        self.push_field(name, description, count, Decode::NullBits, DisplayHint::Default)?;
        Ok(())
    }

    /// Emits a raw-byte field and returns its content.
    pub fn bytes(&mut self, name: &str, byte_count: u64, description: &str) -> Result<Vec<u8>> {
        let index = self.push_field(
            name,
            description,
            byte_count * 8,
            Decode::Bytes,
            DisplayHint::Default,
        )?;
        if let Some(Node::Field(field)) = self.children.get(index) {
            if let Some(bytes) = field.value()?.as_bytes() {
                return Ok(bytes.to_vec());
            }
        }
        Err(malformed_error!(
            "Field '{}' of '{}' has no byte value",
            name,
            self.set_name
        ))
    }

    /// Emits an opaque raw-byte field without decoding it.
    pub fn raw(&mut self, name: &str, byte_count: u64, description: &str) -> Result<()> {
        self.push_field(
            name,
            description,
            byte_count * 8,
            Decode::Bytes,
            DisplayHint::Default,
        )?;
        Ok(())
    }

    /// Emits a string field without decoding it; the value is produced on
    /// first access.
    pub fn str_field(
        &mut self,
        name: &str,
        byte_count: u64,
        charset: Charset,
        description: &str,
    ) -> Result<()> {
        self.push_field(
            name,
            description,
            byte_count * 8,
            Decode::Str(charset),
            DisplayHint::Default,
        )?;
        Ok(())
    }

    /// Emits a 32-bit Macintosh-epoch timestamp field.
    pub fn timestamp_mac32(&mut self, name: &str, description: &str) -> Result<()> {
        self.push_field(
            name,
            description,
            32,
            Decode::TimestampMac32,
            DisplayHint::Default,
        )?;
        Ok(())
    }

    /// Emits a nested set and produces it to completion immediately.
    ///
    /// Used for small fixed-layout records whose values the producer needs
    /// right away (directory and index records).
    pub fn set_eager(
        &mut self,
        name: &str,
        description: &str,
        producer: Box<dyn FieldProducer>,
    ) -> Result<usize> {
        let resolved = self.resolve(name)?;
        let mut child = FieldSet::new(
            resolved,
            description.to_string(),
            Arc::clone(self.stream),
            Arc::clone(self.diag),
            self.base + *self.cursor,
            None,
            producer,
        );
        child.produce_all()?;
        self.push_node(Node::Set(child))
    }

    /// Emits a nested set bound to exactly `bit_size` bits, left unproduced.
    ///
    /// The parent cursor advances over the whole region immediately; the
    /// child's own production happens on demand, and a fatal error inside it
    /// aborts only that sub-tree.
    pub fn set_sized(
        &mut self,
        name: &str,
        description: &str,
        bit_size: u64,
        producer: Box<dyn FieldProducer>,
    ) -> Result<usize> {
        let resolved = self.resolve(name)?;
        let child = FieldSet::new(
            resolved,
            description.to_string(),
            Arc::clone(self.stream),
            Arc::clone(self.diag),
            self.base + *self.cursor,
            Some(bit_size),
            producer,
        );
        self.push_node(Node::Set(child))
    }

    /// Emits a fragment covering `byte_count` raw bytes.
    ///
    /// The fragment is *not* registered into the group here; construction and
    /// registration are separate steps, so the caller follows up with
    /// [`FragmentGroup::add`].
    pub fn fragment(
        &mut self,
        name: &str,
        byte_count: u64,
        description: &str,
        group: &Arc<FragmentGroup>,
    ) -> Result<&CustomFragment> {
        let resolved = self.resolve(name)?;
        let fragment = CustomFragment::new(
            resolved,
            description.to_string(),
            Arc::clone(self.stream),
            self.base + *self.cursor,
            byte_count * 8,
            Arc::clone(group),
        );
        let index = self.push_node(Node::Fragment(fragment))?;
        match self.children.get(index) {
            Some(Node::Fragment(fragment)) => Ok(fragment),
            _ => Err(malformed_error!(
                "Fragment '{}' of '{}' was not stored",
                name,
                self.set_name
            )),
        }
    }

    /// Advances the cursor to `target` bits, emitting one padding field over
    /// the gap.
    ///
    /// Seeking to the current position emits nothing; `zero_fill` chooses
    /// null-bit padding over opaque padding for the gap field.
    ///
    /// # Errors
    /// [`crate::Error::BackwardSeek`] when `target` is behind the cursor.
    pub fn seek_bit(&mut self, target: u64, zero_fill: bool) -> Result<bool> {
        use std::cmp::Ordering;
        match target.cmp(self.cursor) {
            Ordering::Less => Err(crate::Error::BackwardSeek {
                cursor: *self.cursor,
                target,
            }),
            Ordering::Equal => Ok(false),
            Ordering::Greater => {
                let gap = target - *self.cursor;
                let decode = if zero_fill {
                    Decode::NullBits
                } else {
                    Decode::Padding
                };
                self.push_field("padding[]", "", gap, decode, DisplayHint::Default)?;
                Ok(true)
            }
        }
    }

    /// Byte-granular variant of [`Emitter::seek_bit`].
    ///
    /// # Errors
    /// [`crate::Error::BackwardSeek`] when the target is behind the cursor.
    pub fn seek_byte(&mut self, target: u64, zero_fill: bool) -> Result<bool> {
        self.seek_bit(target * 8, zero_fill)
    }

    /// Pads to the declared size, when one was declared and bits remain.
    ///
    /// # Errors
    /// Propagates padding-emission failures.
    pub fn pad_to_end(&mut self) -> Result<()> {
        if let Some(declared) = self.declared_size {
            if *self.cursor < declared {
                self.seek_bit(declared, true)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    /// Emits `count` u16 fields named `word[]`, one per step.
    struct Words {
        count: usize,
        emitted: usize,
    }

    impl FieldProducer for Words {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            if self.emitted == self.count {
                return Ok(Step::Done);
            }
            out.u16("word[]", "")?;
            self.emitted += 1;
            Ok(Step::Continue)
        }
    }

    fn set_over(bytes: Vec<u8>, producer: Box<dyn FieldProducer>) -> FieldSet {
        FieldSet::root(
            "test",
            Arc::new(InputStream::from_bytes(bytes)),
            Arc::new(Diagnostics::new()),
            producer,
        )
    }

    #[test]
    fn production_is_pull_based() {
        let mut set = set_over(
            vec![0, 1, 0, 2, 0, 3],
            Box::new(Words {
                count: 3,
                emitted: 0,
            }),
        );

        assert_eq!(set.len(), 0);
        assert_eq!(set.produce_next().unwrap(), Some(0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.current_size(), 16);

        // The remainder is still unproduced.
        assert!(!set.is_exhausted());
    }

    #[test]
    fn by_name_forces_preceding_siblings() {
        let mut set = set_over(
            vec![0, 1, 0, 2, 0, 3],
            Box::new(Words {
                count: 3,
                emitted: 0,
            }),
        );

        let node = set.by_name("word[2]").unwrap().unwrap();
        assert_eq!(node.as_field().unwrap().value().unwrap().as_u64(), Some(3));
        assert_eq!(set.len(), 3);
        assert!(set.get("word[0]").is_some());
        assert!(set.get("word[1]").is_some());
    }

    #[test]
    fn missing_name_exhausts_and_returns_none() {
        let mut set = set_over(
            vec![0, 1],
            Box::new(Words {
                count: 1,
                emitted: 0,
            }),
        );
        assert!(set.by_name("nope").unwrap().is_none());
        assert!(set.is_exhausted());
    }

    struct SeekBack;
    impl FieldProducer for SeekBack {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            out.u16("a", "")?;
            out.seek_bit(8, true)?;
            Ok(Step::Done)
        }
    }

    #[test]
    fn backward_seek_is_fatal() {
        let mut set = set_over(vec![0; 4], Box::new(SeekBack));
        let error = set.produce_all().unwrap_err();
        assert!(matches!(
            error,
            Error::BackwardSeek {
                cursor: 16,
                target: 8
            }
        ));

        // Production aborted, already-produced children remain.
        assert!(set.is_exhausted());
        assert_eq!(set.len(), 1);
        assert_eq!(set.produce_next().unwrap(), None);
    }

    struct SeekSame;
    impl FieldProducer for SeekSame {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            out.u16("a", "")?;
            assert!(!out.seek_bit(16, true).unwrap());
            out.u16("b", "")?;
            Ok(Step::Done)
        }
    }

    #[test]
    fn seek_to_current_position_emits_no_padding() {
        let mut set = set_over(vec![0; 4], Box::new(SeekSame));
        set.produce_all().unwrap();
        assert_eq!(set.len(), 2);
    }

    struct SeekAhead;
    impl FieldProducer for SeekAhead {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            out.u16("a", "")?;
            assert!(out.seek_byte(6, true).unwrap());
            out.u16("b", "")?;
            Ok(Step::Done)
        }
    }

    #[test]
    fn gaps_are_covered_by_padding_and_sizes_sum_exactly() {
        let mut set = set_over(vec![0; 10], Box::new(SeekAhead));
        set.produce_all().unwrap();

        // a, padding[0], b, and the automatic trailing padding to 10 bytes.
        assert_eq!(set.len(), 4);
        let total: u64 = set.iter().map(Node::bit_size).sum();
        assert_eq!(total, 80);
        assert_eq!(set.current_size(), 80);

        // Offsets are non-decreasing and gapless.
        let mut expected = set.bit_offset();
        for node in set.iter() {
            assert_eq!(node.bit_offset(), expected);
            expected += node.bit_size();
        }
    }

    struct Dupes;
    impl FieldProducer for Dupes {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            out.u16("a", "")?;
            out.u16("a", "")?;
            Ok(Step::Done)
        }
    }

    #[test]
    fn duplicate_names_are_fatal() {
        let mut set = set_over(vec![0; 4], Box::new(Dupes));
        assert!(matches!(
            set.produce_all().unwrap_err(),
            Error::DuplicateName(name) if name == "a"
        ));
    }

    struct Oversized;
    impl FieldProducer for Oversized {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            out.u32("too_big", "")?;
            Ok(Step::Done)
        }
    }

    #[test]
    fn emitting_past_declared_size_is_fatal() {
        let mut set = set_over(vec![0; 2], Box::new(Oversized));
        assert!(matches!(
            set.produce_all().unwrap_err(),
            Error::Malformed { .. }
        ));
    }

    struct Nested;
    impl FieldProducer for Nested {
        fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
            let index = out.set_eager(
                "record[]",
                "",
                Box::new(Words {
                    count: 2,
                    emitted: 0,
                }),
            )?;
            let record = out.child(index).and_then(Node::as_set).unwrap();
            assert_eq!(record.current_size(), 32);
            out.describe_last(format!("record of {} fields", record.len()));
            Ok(Step::Done)
        }
    }

    #[test]
    fn eager_nested_sets_advance_the_parent_cursor() {
        let mut set = set_over(vec![0, 7, 0, 9], Box::new(Nested));
        set.produce_all().unwrap();

        let record = set.get("record[0]").unwrap();
        assert_eq!(record.bit_size(), 32);
        assert_eq!(record.description(), "record of 2 fields");
        assert_eq!(
            record
                .as_set()
                .unwrap()
                .get("word[1]")
                .unwrap()
                .as_field()
                .unwrap()
                .value()
                .unwrap()
                .as_u64(),
            Some(9)
        );
        assert_eq!(set.current_size(), 32);
    }
}
