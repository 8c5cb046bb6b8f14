//! The `name` table: an index of string records pointing into a shared
//! storage area.
//!
//! Record offsets are relative to the storage area and frequently shared or
//! disordered in real fonts, so the walk is defensive: records are sorted by
//! offset before their strings are emitted, exact duplicate `(offset, length)`
//! pairs are skipped, and a record whose string would require rewinding the
//! cursor is skipped too. Every skip is an anomaly, never a fatal error. Only
//! a format other than 0 aborts the table.

use strum::{FromRepr, IntoStaticStr};

use crate::{
    diagnostics::AnomalyCategory,
    field::{Charset, Emitter, FieldProducer, Step},
    Result,
};

/// Platform identifier of a name record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, IntoStaticStr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum Platform {
    #[strum(serialize = "Unicode")]
    Unicode = 0,
    #[strum(serialize = "Macintosh")]
    Macintosh = 1,
    #[strum(serialize = "ISO")]
    Iso = 2,
    #[strum(serialize = "Microsoft")]
    Microsoft = 3,
    #[strum(serialize = "Custom")]
    Custom = 4,
}

/// Well-known name identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, IntoStaticStr)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum NameId {
    #[strum(serialize = "Copyright notice")]
    Copyright = 0,
    #[strum(serialize = "Font family name")]
    FontFamily = 1,
    #[strum(serialize = "Font subfamily name")]
    FontSubfamily = 2,
    #[strum(serialize = "Unique font identifier")]
    UniqueId = 3,
    #[strum(serialize = "Full font name")]
    FullName = 4,
    #[strum(serialize = "Version string")]
    Version = 5,
    #[strum(serialize = "Postscript name")]
    PostscriptName = 6,
    #[strum(serialize = "Trademark")]
    Trademark = 7,
    #[strum(serialize = "Manufacturer name")]
    Manufacturer = 8,
    #[strum(serialize = "Designer")]
    Designer = 9,
    #[strum(serialize = "Description")]
    Description = 10,
    #[strum(serialize = "URL Vendor")]
    VendorUrl = 11,
    #[strum(serialize = "URL Designer")]
    DesignerUrl = 12,
    #[strum(serialize = "License description")]
    License = 13,
    #[strum(serialize = "License info URL")]
    LicenseUrl = 14,
    #[strum(serialize = "Preferred family")]
    PreferredFamily = 16,
    #[strum(serialize = "Preferred subfamily")]
    PreferredSubfamily = 17,
    #[strum(serialize = "Compatible full name")]
    CompatibleFullName = 18,
    #[strum(serialize = "Sample text")]
    SampleText = 19,
    #[strum(serialize = "PostScript CID findfont name")]
    PostscriptCid = 20,
}

pub(crate) fn platform_label(value: i64) -> Option<&'static str> {
    u16::try_from(value)
        .ok()
        .and_then(Platform::from_repr)
        .map(Into::into)
}

pub(crate) fn name_id_label(value: i64) -> Option<&'static str> {
    u16::try_from(value)
        .ok()
        .and_then(NameId::from_repr)
        .map(Into::into)
}

/// One decoded index record, kept for the sorted string walk.
struct NameRecord {
    name: String,
    description: String,
    platform: u16,
    encoding: u16,
    offset: u64,
    length: u64,
}

impl NameRecord {
    fn charset(&self) -> Charset {
        if self.platform == Platform::Microsoft as u16 && self.encoding == 1 {
            Charset::Utf16Be
        } else {
            Charset::Ascii
        }
    }
}

/// Emits the six fields of one index record.
struct NameIndexProducer;

impl FieldProducer for NameIndexProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        out.u16_labeled("platform_id", "", platform_label)?;
        out.u16("encoding_id", "")?;
        out.u16("language_id", "")?;
        out.u16_labeled("name_id", "", name_id_label)?;
        out.u16("length", "")?;
        out.u16("offset", "")?;
        Ok(Step::Done)
    }
}

enum State {
    Header,
    Index {
        remaining: u64,
        records: Vec<NameRecord>,
    },
    Values {
        records: Vec<NameRecord>,
        next: usize,
        last: Option<(u64, u64)>,
    },
}

/// Producer for the `name` table body.
pub struct NamesProducer {
    state: State,
    /// Byte offset of the string storage area, relative to the table start.
    storage_base: u64,
}

impl NamesProducer {
    /// Creates a producer positioned at the start of the table body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Header,
            storage_base: 0,
        }
    }

    fn record_values(out: &Emitter<'_>, index: usize) -> Result<NameRecord> {
        let set = out
            .child(index)
            .and_then(crate::field::Node::as_set)
            .ok_or_else(|| malformed_error!("Name record {} missing", index))?;

        let value = |name: &str| -> Result<u64> {
            set.get(name)
                .and_then(crate::field::Node::as_field)
                .ok_or_else(|| malformed_error!("Name record missing field '{}'", name))?
                .value()?
                .as_u64()
                .ok_or_else(|| malformed_error!("Name record field '{}' is not numeric", name))
        };

        let platform = value("platform_id")?;
        let name_id = value("name_id")?;
        let name = set.name().to_string();
        let description = format!(
            "Name record: {} ({})",
            name_id_label(name_id as i64).unwrap_or("unknown"),
            platform_label(platform as i64).unwrap_or("unknown"),
        );

        Ok(NameRecord {
            name,
            description,
            platform: platform as u16,
            encoding: value("encoding_id")? as u16,
            offset: value("offset")?,
            length: value("length")?,
        })
    }
}

impl Default for NamesProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldProducer for NamesProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        match &mut self.state {
            State::Header => {
                let format = out.u16("format", "Format")?;
                if format != 0 {
                    return Err(malformed_error!(
                        "Invalid name table format ({})",
                        format
                    ));
                }
                let count = out.u16("count", "Number of name records")?;
                self.storage_base = u64::from(out.u16("offset", "Offset to string storage")?);
                self.state = State::Index {
                    remaining: u64::from(count),
                    records: Vec::new(),
                };
                Ok(Step::Continue)
            }
            State::Index { remaining, records } => {
                if *remaining == 0 {
                    let mut records = std::mem::take(records);
                    records.sort_by_key(|record| record.offset);
                    self.state = State::Values {
                        records,
                        next: 0,
                        last: None,
                    };
                    return Ok(Step::Continue);
                }

                let index = out.set_eager("header[]", "", Box::new(NameIndexProducer))?;
                let record = Self::record_values(out, index)?;
                out.describe_last(record.description.clone());
                records.push(record);
                *remaining -= 1;
                Ok(Step::Continue)
            }
            State::Values {
                records,
                next,
                last,
            } => {
                let Some(record) = records.get(*next) else {
                    return Ok(Step::Done);
                };
                *next += 1;

                if *last == Some((record.offset, record.length)) {
                    out.warn(
                        AnomalyCategory::Names,
                        format!(
                            "Skip duplicate {} ({}, {})",
                            record.name, record.offset, record.length
                        ),
                    );
                    return Ok(Step::Continue);
                }
                *last = Some((record.offset, record.length));

                let target = self.storage_base + record.offset;
                if target < out.cursor_bytes() {
                    out.warn(
                        AnomalyCategory::Names,
                        format!("Skip value {} (backward offset {})", record.name, target),
                    );
                    return Ok(Step::Continue);
                }

                out.seek_byte(target, false)?;
                if record.length > 0 {
                    out.str_field(
                        "value[]",
                        record.length,
                        record.charset(),
                        &record.description,
                    )?;
                }
                Ok(Step::Continue)
            }
        }
    }
}
