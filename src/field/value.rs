//! Decoded field values and the scalar decoders producing them.
//!
//! [`Decode`] is a closed registry of every decoder the engine knows: each
//! variant couples a wire interpretation (big-endian unsigned, sign-extended
//! signed, raw bytes, charset-decoded string, Macintosh-epoch timestamp, ...)
//! with the [`FieldValue`] it produces. [`DisplayHint`] controls presentation
//! only and never affects the decoded value.

use std::fmt;

use widestring::U16String;

use crate::{stream::InputStream, Result};

/// Seconds between the Macintosh epoch (1904-01-01 UTC) and the Unix epoch.
pub const MAC_EPOCH_TO_UNIX: i64 = 2_082_844_800;

/// Character encoding for string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Single-byte text, decoded lossily as UTF-8/ASCII.
    Ascii,
    /// Two-byte big-endian code units.
    Utf16Be,
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Unsigned big-endian integer.
    UInt(u64),
    /// Signed (sign-extended) big-endian integer.
    Int(i64),
    /// Raw bit group, right-aligned.
    Bits(u64),
    /// Single flag bit.
    Bool(bool),
    /// Raw byte run.
    Bytes(Vec<u8>),
    /// Decoded text.
    Str(String),
    /// Seconds since the Unix epoch (converted from the wire epoch).
    Timestamp(i64),
    /// Gap or reserved-bit filler; carries no data.
    Padding,
}

impl FieldValue {
    /// Unsigned view of the value, when it has one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt(v) | FieldValue::Bits(v) => Some(*v),
            FieldValue::Bool(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    /// Signed view of the value, when it has one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) | FieldValue::Timestamp(v) => Some(*v),
            FieldValue::UInt(v) | FieldValue::Bits(v) => i64::try_from(*v).ok(),
            FieldValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Flag view of the value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Byte view of the value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::UInt(v) | FieldValue::Bits(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            FieldValue::Str(s) => write!(f, "\"{s}\""),
            FieldValue::Timestamp(v) => write!(f, "{v} s (Unix epoch)"),
            FieldValue::Padding => write!(f, "(padding)"),
        }
    }
}

/// Closed registry of scalar decoders.
///
/// Every field names one variant; dispatch is a single match, and the default
/// arm for unknown content is [`Decode::Bytes`] (opaque raw capture).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// Big-endian unsigned integer of the field's bit width.
    UIntBe,
    /// Big-endian signed integer, sign-extended from the field's bit width.
    IntBe,
    /// Single flag bit.
    Bit,
    /// Right-aligned bit group.
    Bits,
    /// Reserved bits; value is [`FieldValue::Padding`].
    NullBits,
    /// Raw byte run.
    Bytes,
    /// Charset-decoded text.
    Str(Charset),
    /// 32-bit seconds since 1904-01-01 UTC, converted to the Unix epoch.
    TimestampMac32,
    /// Gap filler emitted by seeks; value is [`FieldValue::Padding`].
    Padding,
}

impl Decode {
    /// Runs the decoder against `stream` at the given bit range.
    ///
    /// # Errors
    /// [`crate::Error::OutOfBounds`] when the range extends past the stream.
    pub(crate) fn run(
        self,
        stream: &InputStream,
        bit_offset: u64,
        bit_size: u64,
    ) -> Result<FieldValue> {
        match self {
            Decode::UIntBe => Ok(FieldValue::UInt(stream.read_bits(bit_offset, bit_size)?)),
            Decode::IntBe => {
                let raw = stream.read_bits(bit_offset, bit_size)?;
                Ok(FieldValue::Int(sign_extend(raw, bit_size)))
            }
            Decode::Bit => Ok(FieldValue::Bool(stream.read_bits(bit_offset, 1)? != 0)),
            Decode::Bits => Ok(FieldValue::Bits(stream.read_bits(bit_offset, bit_size)?)),
            Decode::NullBits | Decode::Padding => {
                check_bounds(stream, bit_offset, bit_size)?;
                Ok(FieldValue::Padding)
            }
            Decode::Bytes => Ok(FieldValue::Bytes(
                stream.read_bytes(bit_offset, (bit_size / 8) as usize)?,
            )),
            Decode::Str(charset) => {
                let bytes = stream.read_bytes(bit_offset, (bit_size / 8) as usize)?;
                Ok(FieldValue::Str(decode_string(&bytes, charset)))
            }
            Decode::TimestampMac32 => {
                let raw = stream.read_bits(bit_offset, 32)?;
                Ok(FieldValue::Timestamp(raw as i64 - MAC_EPOCH_TO_UNIX))
            }
        }
    }
}

fn check_bounds(stream: &InputStream, bit_offset: u64, bit_size: u64) -> Result<()> {
    let end = bit_offset
        .checked_add(bit_size)
        .ok_or(crate::Error::OutOfBounds)?;
    if end > stream.size_bits() {
        return Err(crate::Error::OutOfBounds);
    }
    Ok(())
}

fn sign_extend(raw: u64, bit_size: u64) -> i64 {
    if bit_size == 0 || bit_size >= 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (bit_size - 1);
    if raw & sign_bit != 0 {
        (raw | !((1u64 << bit_size) - 1)) as i64
    } else {
        raw as i64
    }
}

fn decode_string(bytes: &[u8], charset: Charset) -> String {
    match charset {
        Charset::Ascii => String::from_utf8_lossy(bytes).into_owned(),
        Charset::Utf16Be => {
            // An odd byte count cannot form a whole code unit; the stray
            // trailing byte decodes to U+FFFD rather than disappearing.
            let units: Vec<u16> = bytes
                .chunks(2)
                .map(|pair| match *pair {
                    [hi, lo] => u16::from_be_bytes([hi, lo]),
                    _ => 0xFFFD,
                })
                .collect();
            U16String::from_vec(units).to_string_lossy()
        }
    }
}

/// Presentation hint applied by [`crate::field::Field::display`].
#[derive(Debug, Clone, Copy)]
pub enum DisplayHint {
    /// Render the value with its natural `Display`.
    Default,
    /// Render unsigned values as zero-padded hexadecimal.
    Hexadecimal,
    /// Render unsigned byte counts as a human-readable size.
    FileSize,
    /// Render through a label lookup, falling back to the raw value.
    Labels(fn(i64) -> Option<&'static str>),
}

impl DisplayHint {
    /// Formats `value` according to this hint. `bit_size` widths the
    /// hexadecimal rendering.
    pub(crate) fn render(self, value: &FieldValue, bit_size: u64) -> String {
        match self {
            DisplayHint::Default => value.to_string(),
            DisplayHint::Hexadecimal => match value.as_u64() {
                Some(v) => format!("0x{:0width$x}", v, width = (bit_size as usize / 4).max(1)),
                None => value.to_string(),
            },
            DisplayHint::FileSize => match value.as_u64() {
                Some(v) => human_size(v),
                None => value.to_string(),
            },
            DisplayHint::Labels(lookup) => match value.as_i64().and_then(lookup) {
                Some(label) => label.to_string(),
                None => value.to_string(),
            },
        }
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["bytes", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} bytes")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
