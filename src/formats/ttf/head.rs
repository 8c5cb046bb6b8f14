//! The `head` table: fixed 54-byte font header with packed flag words.
//!
//! Exercises the sub-byte machinery: the two flag words are emitted as
//! individual named bits (with reserved null-bit runs), and the decoded bits
//! can be reassembled into typed [`HeadFlags`] / [`MacStyle`] sets.

use bitflags::bitflags;
use strum::{FromRepr, IntoStaticStr};

use crate::{
    field::{Emitter, FieldProducer, FieldSet, Step},
    Result,
};

/// Magic string every `head` table carries after its checksum adjustment.
pub const HEAD_MAGIC: [u8; 4] = [0x5F, 0x0F, 0x3C, 0xF5];

/// Inclusive bounds on `unit_per_em`.
pub const UNITS_PER_EM_RANGE: std::ops::RangeInclusive<u64> = 16..=16384;

bitflags! {
    /// The `head` flags word, named from the most significant bit down to
    /// match the on-wire bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeadFlags: u16 {
        /// Baseline for the font is at y=0.
        const BASELINE_AT_Y0 = 1 << 15;
        /// Left sidebearing point is at x=0.
        const LSB_AT_X0 = 1 << 14;
        /// Instructions may depend on point size.
        const INSTRUCTIONS_DEPEND_ON_POINT_SIZE = 1 << 13;
        /// Force ppem to integer values.
        const FORCE_INTEGER_PPEM = 1 << 12;
        /// Instructions may alter the advance width.
        const INSTRUCTIONS_ALTER_ADVANCE_WIDTH = 1 << 11;
        /// Glyphs are laid out vertically.
        const VERTICAL_LAYOUT = 1 << 10;
        /// Requires layout for correct linguistic rendering.
        const LINGUISTIC_LAYOUT = 1 << 8;
        /// Has metamorphosis (GX) effects.
        const METAMORPHOSIS = 1 << 7;
        /// Contains strong right-to-left glyphs.
        const RIGHT_TO_LEFT = 1 << 6;
        /// Contains Indic-style rearrangement effects.
        const INDIC_REARRANGEMENT = 1 << 5;
        /// Data is lossless (Agfa MicroType compression).
        const LOSSLESS_COMPRESSION = 1 << 4;
        /// Font converted, produces compatible metrics.
        const CONVERTED = 1 << 3;
        /// Optimized for ClearType.
        const CLEARTYPE_OPTIMIZED = 1 << 2;
    }
}

bitflags! {
    /// The Macintosh style word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MacStyle: u16 {
        /// Bold glyphs.
        const BOLD = 1 << 15;
        /// Italic glyphs.
        const ITALIC = 1 << 14;
        /// Underlined glyphs.
        const UNDERLINE = 1 << 13;
        /// Outline glyphs.
        const OUTLINE = 1 << 12;
        /// Shadowed glyphs.
        const SHADOW = 1 << 11;
        /// Condensed (narrow) glyphs.
        const CONDENSED = 1 << 10;
        /// Extended glyphs.
        const EXTENDED = 1 << 9;
    }
}

/// Glyph directionality declared by `font_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, IntoStaticStr)]
#[repr(i16)]
pub enum Direction {
    /// Like right-to-left but also contains neutrals.
    #[strum(serialize = "Like -1 but also contains neutrals")]
    RightToLeftWithNeutrals = -2,
    /// Only strongly right-to-left glyphs.
    #[strum(serialize = "Only strongly right to left glyphs")]
    RightToLeft = -1,
    /// Mixed directional glyphs.
    #[strum(serialize = "Mixed directional glyphs")]
    Mixed = 0,
    /// Only strongly left-to-right glyphs.
    #[strum(serialize = "Only strongly left to right glyphs")]
    LeftToRight = 1,
    /// Like left-to-right but also contains neutrals.
    #[strum(serialize = "Like 1 but also contains neutrals")]
    LeftToRightWithNeutrals = 2,
}

/// Index-to-location offset width declared by `ofst_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, IntoStaticStr)]
#[repr(u16)]
pub enum OffsetFormat {
    /// 16-bit offsets into the glyph data.
    #[strum(serialize = "Short offsets (Offset16)")]
    Short = 0,
    /// 32-bit offsets into the glyph data.
    #[strum(serialize = "Long offsets (Offset32)")]
    Long = 1,
}

pub(crate) fn direction_label(value: i64) -> Option<&'static str> {
    i16::try_from(value)
        .ok()
        .and_then(Direction::from_repr)
        .map(Into::into)
}

pub(crate) fn offset_format_label(value: i64) -> Option<&'static str> {
    u16::try_from(value)
        .ok()
        .and_then(OffsetFormat::from_repr)
        .map(Into::into)
}

enum State {
    Versions,
    Flags,
    Metrics,
    Style,
    Tail,
}

/// Producer for the `head` table body.
///
/// Fatal on a wrong magic string or an out-of-range `unit_per_em`; both end
/// only this table's sub-tree.
pub struct FontHeaderProducer {
    state: State,
}

impl FontHeaderProducer {
    /// Creates a producer positioned at the start of the table body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Versions,
        }
    }
}

impl Default for FontHeaderProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldProducer for FontHeaderProducer {
    fn produce(&mut self, out: &mut Emitter<'_>) -> Result<Step> {
        match self.state {
            State::Versions => {
                out.u16("maj_ver", "Major version")?;
                out.u16("min_ver", "Minor version")?;
                out.u16("font_maj_ver", "Font major version")?;
                out.u16("font_min_ver", "Font minor version")?;
                out.u32_hex("checksum", "")?;
                let magic = out.bytes("magic", 4, "Magic string")?;
                if magic != HEAD_MAGIC {
                    return Err(malformed_error!("Invalid magic of font header"));
                }
                self.state = State::Flags;
                Ok(Step::Continue)
            }
            State::Flags => {
                out.bit("y0", "Baseline at y=0")?;
                out.bit("x0", "Left sidebearing point at x=0")?;
                out.bit("instr_point", "Instructions may depend on point size")?;
                out.bit("ppem", "Force ppem to integer values for all")?;
                out.bit("instr_width", "Instructions may alter advance width")?;
                out.bit("vertical", "Glyphs laid out vertically?")?;
                out.null_bits("reserved[]", 1, "")?;
                out.bit("linguistic", "Requires layout for correct linguistic rendering?")?;
                out.bit("gx", "Metamorphosis effects?")?;
                out.bit("strong", "Contains strong right-to-left glyphs?")?;
                out.bit("indic", "Contains Indic-style rearrangement effects?")?;
                out.bit("lossless", "Contains lossless compression?")?;
                out.bit("converted", "Contains converted font?")?;
                out.bit("cleartype", "Optimized for ClearType?")?;
                out.bits("adobe", 2, "(used by Adobe)")?;
                self.state = State::Metrics;
                Ok(Step::Continue)
            }
            State::Metrics => {
                let unit_per_em = u64::from(out.u16("unit_per_em", "Units per em")?);
                if !UNITS_PER_EM_RANGE.contains(&unit_per_em) {
                    return Err(malformed_error!(
                        "Invalid units per em ({})",
                        unit_per_em
                    ));
                }
                out.u32("created_high", "")?;
                out.timestamp_mac32("created", "Creation date")?;
                out.u32("modified_high", "")?;
                out.timestamp_mac32("modified", "Modification date")?;
                out.u16("xmin", "")?;
                out.u16("ymin", "")?;
                out.u16("xmax", "")?;
                out.u16("ymax", "")?;
                self.state = State::Style;
                Ok(Step::Continue)
            }
            State::Style => {
                out.bit("bold", "")?;
                out.bit("italic", "")?;
                out.bit("underline", "")?;
                out.bit("outline", "")?;
                out.bit("shadow", "")?;
                out.bit("condensed", "(narrow)")?;
                out.bit("extensed", "")?;
                out.null_bits("reserved[]", 9, "")?;
                self.state = State::Tail;
                Ok(Step::Continue)
            }
            State::Tail => {
                out.u16("lowest", "Smallest readable size in pixels")?;
                out.i16_labeled("font_dir", "Font direction hint", direction_label)?;
                out.u16_labeled("ofst_format", "", offset_format_label)?;
                out.u16("glyph_format", "(=0)")?;
                Ok(Step::Done)
            }
        }
    }
}

fn flag_bit(header: &mut FieldSet, name: &str) -> Result<bool> {
    let node = header
        .by_name(name)?
        .ok_or_else(|| malformed_error!("Missing flag field '{}'", name))?;
    let field = node
        .as_field()
        .ok_or_else(|| malformed_error!("Flag field '{}' is not a leaf", name))?;
    field
        .value()?
        .as_bool()
        .ok_or_else(|| malformed_error!("Flag field '{}' is not a bit", name))
}

/// Reassembles the typed flags word from a produced `head` table set.
///
/// # Errors
/// Propagates production or decoding failures of the underlying bit fields.
pub fn head_flags(header: &mut FieldSet) -> Result<HeadFlags> {
    const BITS: [(&str, HeadFlags); 13] = [
        ("y0", HeadFlags::BASELINE_AT_Y0),
        ("x0", HeadFlags::LSB_AT_X0),
        ("instr_point", HeadFlags::INSTRUCTIONS_DEPEND_ON_POINT_SIZE),
        ("ppem", HeadFlags::FORCE_INTEGER_PPEM),
        ("instr_width", HeadFlags::INSTRUCTIONS_ALTER_ADVANCE_WIDTH),
        ("vertical", HeadFlags::VERTICAL_LAYOUT),
        ("linguistic", HeadFlags::LINGUISTIC_LAYOUT),
        ("gx", HeadFlags::METAMORPHOSIS),
        ("strong", HeadFlags::RIGHT_TO_LEFT),
        ("indic", HeadFlags::INDIC_REARRANGEMENT),
        ("lossless", HeadFlags::LOSSLESS_COMPRESSION),
        ("converted", HeadFlags::CONVERTED),
        ("cleartype", HeadFlags::CLEARTYPE_OPTIMIZED),
    ];

    let mut flags = HeadFlags::empty();
    for (name, flag) in BITS {
        if flag_bit(header, name)? {
            flags |= flag;
        }
    }
    Ok(flags)
}

/// Reassembles the typed Macintosh style word from a produced `head` table
/// set.
///
/// # Errors
/// Propagates production or decoding failures of the underlying bit fields.
pub fn mac_style(header: &mut FieldSet) -> Result<MacStyle> {
    const BITS: [(&str, MacStyle); 7] = [
        ("bold", MacStyle::BOLD),
        ("italic", MacStyle::ITALIC),
        ("underline", MacStyle::UNDERLINE),
        ("outline", MacStyle::OUTLINE),
        ("shadow", MacStyle::SHADOW),
        ("condensed", MacStyle::CONDENSED),
        ("extensed", MacStyle::EXTENDED),
    ];

    let mut style = MacStyle::empty();
    for (name, flag) in BITS {
        if flag_bit(header, name)? {
            style |= flag;
        }
    }
    Ok(style)
}
