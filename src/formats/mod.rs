//! Format parsers and the identification metadata they expose.
//!
//! Each root parser publishes a const [`FormatMetadata`] bundle (short id,
//! category, accepted extensions, minimum size) for consumption by an
//! external multi-format dispatcher, and offers a non-panicking structural
//! [`Validation`] check over its already-produced header fields. The
//! dispatcher itself lives outside this crate.

pub mod ttf;

use strum::Display;

/// Coarse classification of a file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FormatCategory {
    /// Font containers.
    #[strum(serialize = "font")]
    Font,
    /// Anything without a better home.
    #[strum(serialize = "misc")]
    Misc,
}

/// Static identification metadata of a format parser.
#[derive(Debug, Clone, Copy)]
pub struct FormatMetadata {
    /// Short identifier, e.g. `"ttf"`.
    pub id: &'static str,
    /// Coarse category.
    pub category: FormatCategory,
    /// File extensions commonly carrying this format.
    pub extensions: &'static [&'static str],
    /// Minimum stream size in bits for the format to be plausible.
    pub min_size_bits: u64,
    /// Human-readable format name.
    pub description: &'static str,
}

/// Outcome of a root parser's structural precondition check.
///
/// `validate()` inspects already-produced header fields and names the first
/// violated precondition; it never panics and never raises a fatal error.
/// Whether an `Invalid` outcome stops further processing is the caller's
/// decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// All structural preconditions hold.
    Valid,
    /// The named precondition is violated.
    Invalid(String),
}

impl Validation {
    /// True for [`Validation::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}
