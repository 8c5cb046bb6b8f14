//! TrueType font container parser: the table-directory dispatch exemplar.
//!
//! # Architecture
//!
//! A TrueType file is a directory of `(tag, checksum, offset, size)` records
//! pointing at sub-tables laid out elsewhere in the stream; directory order
//! and physical order are independent. The root producer walks four phases:
//!
//! 1. **Reading the directory** — fixed header, then one record per pull, in
//!    file order. A table count outside `[MIN_TABLES, MAX_TABLES]` is fatal.
//! 2. **Sorting by offset** — records are stable-sorted by declared offset,
//!    because the cursor only moves forward and on-disk record order need not
//!    match physical layout.
//! 3. **Emitting tables** — seek to each record's offset (inter-table
//!    alignment slack becomes padding, not an error), skip zero-size records,
//!    and dispatch the tag through the static [`TAG_INFO`] registry. Unknown
//!    tags fall back to an opaque raw-byte capture.
//! 4. **Done** — any bytes left before the declared end of the stream become
//!    one final padding field.
//!
//! Sub-table parsers are bound to exactly `size * 8` bits; a fatal error
//! inside one aborts only that table's sub-tree.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use fieldscope::formats::ttf::TrueTypeFont;
//! use fieldscope::InputStream;
//!
//! let stream = InputStream::from_file(std::path::Path::new("font.ttf"))?;
//! let mut font = TrueTypeFont::new(stream.into(), Default::default());
//! if let fieldscope::formats::Validation::Invalid(reason) = font.validate() {
//!     eprintln!("not a clean font: {reason}");
//! }
//! font.root_mut().produce_all()?;
//! # Ok::<(), fieldscope::Error>(())
//! ```

pub mod head;
pub mod name;

use std::sync::Arc;

use crate::{
    diagnostics::{AnomalyCategory, Diagnostics},
    field::{Charset, Emitter, FieldProducer, FieldSet, Node, Step},
    formats::{FormatCategory, FormatMetadata, Validation},
    stream::InputStream,
    Result,
};

/// Smallest directory a valid font may declare.
pub const MIN_TABLES: u64 = 3;
/// Largest directory a valid font may declare.
pub const MAX_TABLES: u64 = 30;

type ProducerFactory = fn() -> Box<dyn FieldProducer>;

/// One entry of the static tag registry: the set name, description, and
/// sub-parser bound to a known table tag.
struct TagInfo {
    tag: &'static str,
    name: &'static str,
    description: &'static str,
    producer: ProducerFactory,
}

fn head_producer() -> Box<dyn FieldProducer> {
    Box::new(head::FontHeaderProducer::new())
}

fn names_producer() -> Box<dyn FieldProducer> {
    Box::new(name::NamesProducer::new())
}

/// Closed tag registry, resolved per record during table emission.
static TAG_INFO: &[TagInfo] = &[
    TagInfo {
        tag: "head",
        name: "header",
        description: "Font header",
        producer: head_producer,
    },
    TagInfo {
        tag: "name",
        name: "names",
        description: "Names",
        producer: names_producer,
    },
];

fn lookup_tag(tag: &str) -> Option<&'static TagInfo> {
    TAG_INFO.iter().find(|info| info.tag == tag)
}

/// One decoded directory record, kept for the sorted emission phase.
struct DirRecord {
    tag: String,
    offset: u64,
    size: u64,
}

/// Emits the four fields of one directory record.
struct TableHeaderProducer;

impl FieldProducer for TableHeaderProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        out.str_field("tag", 4, Charset::Ascii, "")?;
        out.u32_hex("checksum", "")?;
        out.u32("offset", "")?;
        out.u32_size("size", "")?;
        Ok(Step::Done)
    }
}

/// Fallback sub-parser for unrecognized tags: one opaque byte run.
struct RawTableProducer;

impl FieldProducer for RawTableProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        let remaining = out.remaining_bits().unwrap_or(0);
        if remaining > 0 {
            out.raw("content", remaining / 8, "")?;
        }
        Ok(Step::Done)
    }
}

enum State {
    Header,
    Directory {
        remaining: u64,
        records: Vec<DirRecord>,
    },
    Tables {
        records: Vec<DirRecord>,
        next: usize,
    },
}

/// Root producer implementing the directory dispatch state machine.
struct TrueTypeProducer {
    state: State,
}

impl TrueTypeProducer {
    fn new() -> Self {
        Self {
            state: State::Header,
        }
    }

    fn record_values(out: &Emitter<'_>, index: usize) -> Result<(DirRecord, String)> {
        let set = out
            .child(index)
            .and_then(Node::as_set)
            .ok_or_else(|| malformed_error!("Directory record {} missing", index))?;

        let field = |name: &str| {
            set.get(name)
                .and_then(Node::as_field)
                .ok_or_else(|| malformed_error!("Directory record missing field '{}'", name))
        };

        let tag = field("tag")?
            .value()?
            .as_str()
            .ok_or_else(|| malformed_error!("Directory tag is not a string"))?
            .to_string();
        let offset = field("offset")?
            .value()?
            .as_u64()
            .ok_or_else(|| malformed_error!("Directory offset is not numeric"))?;
        let size_field = field("size")?;
        let size = size_field
            .value()?
            .as_u64()
            .ok_or_else(|| malformed_error!("Directory size is not numeric"))?;
        let size_display = size_field.display()?;

        Ok((DirRecord { tag, offset, size }, size_display))
    }
}

impl FieldProducer for TrueTypeProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        match &mut self.state {
            State::Header => {
                out.u16("maj_ver", "Major version")?;
                out.u16("min_ver", "Minor version")?;
                let count = out.u16("nb_table", "Number of tables")?;
                out.u16("search_range", "")?;
                out.u16("entry_selector", "")?;
                out.u16("range_shift", "")?;
                self.state = State::Directory {
                    remaining: u64::from(count),
                    records: Vec::new(),
                };
                Ok(Step::Continue)
            }
            State::Directory { remaining, records } => {
                if records.is_empty() {
                    let declared = *remaining;
                    if !(MIN_TABLES..=MAX_TABLES).contains(&declared) {
                        return Err(malformed_error!(
                            "Invalid number of tables ({})",
                            declared
                        ));
                    }
                }

                let index = out.set_eager("table_hdr[]", "", Box::new(TableHeaderProducer))?;
                let (record, size_display) = Self::record_values(out, index)?;
                out.describe_last(format!("Table entry: {} ({})", record.tag, size_display));
                records.push(record);
                *remaining -= 1;

                if *remaining == 0 {
                    let mut records = std::mem::take(records);
                    records.sort_by_key(|record| record.offset);
                    self.state = State::Tables { records, next: 0 };
                }
                Ok(Step::Continue)
            }
            State::Tables { records, next } => {
                let Some(record) = records.get(*next) else {
                    return Ok(Step::Done);
                };
                *next += 1;

                out.seek_byte(record.offset, true)?;
                if record.size == 0 {
                    return Ok(Step::Continue);
                }

                match lookup_tag(&record.tag) {
                    Some(info) => {
                        out.set_sized(
                            info.name,
                            info.description,
                            record.size * 8,
                            (info.producer)(),
                        )?;
                    }
                    None => {
                        out.warn(
                            AnomalyCategory::Directory,
                            format!("Unknown table tag '{}'", record.tag),
                        );
                        out.set_sized("table[]", "", record.size * 8, Box::new(RawTableProducer))?;
                        out.describe_last(format!("Table {} (opaque)", record.tag));
                    }
                }
                Ok(Step::Continue)
            }
        }
    }
}

/// Root parser for TrueType font files.
///
/// Wraps the root [`FieldSet`] with the format-identification metadata an
/// external dispatcher consumes, and a non-panicking structural
/// [`TrueTypeFont::validate`] over the already-produced header fields.
pub struct TrueTypeFont {
    root: FieldSet,
}

impl TrueTypeFont {
    /// Identification metadata for an external multi-format dispatcher.
    pub const METADATA: FormatMetadata = FormatMetadata {
        id: "ttf",
        category: FormatCategory::Font,
        extensions: &["ttf"],
        min_size_bits: 80,
        description: "TrueType font",
    };

    /// Creates a parser over `stream`, reporting anomalies to `diag`.
    #[must_use]
    pub fn new(stream: Arc<InputStream>, diag: Arc<Diagnostics>) -> Self {
        Self {
            root: FieldSet::root("ttf", stream, diag, Box::new(TrueTypeProducer::new())),
        }
    }

    /// Convenience constructor over an owned buffer with a fresh sink.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(
            Arc::new(InputStream::from_bytes(bytes)),
            Arc::new(Diagnostics::new()),
        )
    }

    /// The root field set.
    #[must_use]
    pub fn root(&self) -> &FieldSet {
        &self.root
    }

    /// Mutable root field set, needed to drive production.
    pub fn root_mut(&mut self) -> &mut FieldSet {
        &mut self.root
    }

    /// The anomaly sink shared by this parse tree.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        self.root.diagnostics()
    }

    /// Checks the structural preconditions of the container header.
    ///
    /// Forces only the fixed header fields (never the directory or tables)
    /// and returns the first violated precondition. Never panics; an
    /// `Invalid` outcome does not block later table production.
    pub fn validate(&mut self) -> Validation {
        let maj_ver = match self.header_value("maj_ver") {
            Ok(value) => value,
            Err(error) => return Validation::Invalid(format!("Unreadable header: {error}")),
        };
        if maj_ver != 1 {
            return Validation::Invalid(format!("Invalid major version ({maj_ver})"));
        }

        let min_ver = match self.header_value("min_ver") {
            Ok(value) => value,
            Err(error) => return Validation::Invalid(format!("Unreadable header: {error}")),
        };
        if min_ver != 0 {
            return Validation::Invalid(format!("Invalid minor version ({min_ver})"));
        }

        let nb_table = match self.header_value("nb_table") {
            Ok(value) => value,
            Err(error) => return Validation::Invalid(format!("Unreadable header: {error}")),
        };
        if !(MIN_TABLES..=MAX_TABLES).contains(&nb_table) {
            return Validation::Invalid(format!("Invalid number of tables ({nb_table})"));
        }

        Validation::Valid
    }

    fn header_value(&mut self, name: &str) -> Result<u64> {
        let node = self
            .root
            .by_name(name)?
            .ok_or_else(|| malformed_error!("Missing header field '{}'", name))?;
        let field = node
            .as_field()
            .ok_or_else(|| malformed_error!("Header field '{}' is not a leaf", name))?;
        field
            .value()?
            .as_u64()
            .ok_or_else(|| malformed_error!("Header field '{}' is not numeric", name))
    }
}
