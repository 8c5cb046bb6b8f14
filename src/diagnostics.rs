//! Diagnostics collection for recoverable parsing anomalies.
//!
//! This module provides the *recoverable* half of the two-tier error policy.
//! A locally inconsistent but non-essential record (a duplicate name-table
//! entry, an offset that would require rewinding the cursor, an unrecognized
//! directory tag) should not abort a parse: the offending unit is skipped or
//! replaced with an opaque fallback, an [`Anomaly`] is recorded here, and
//! production continues. Hard wire-contract violations are not anomalies;
//! those surface as [`crate::Error`] and unwind the current production.
//!
//! # Architecture
//!
//! One [`Diagnostics`] sink is shared across an entire parse tree via
//! [`std::sync::Arc`]. The container uses `boxcar::Vec` internally, so
//! producers append entries through `&self` without any interior-mutability
//! ceremony at the call sites.
//!
//! # Usage Examples
//!
//! ```rust
//! use fieldscope::diagnostics::{Diagnostics, AnomalyCategory};
//! use std::sync::Arc;
//!
//! let diagnostics = Arc::new(Diagnostics::new());
//!
//! diagnostics.warning(
//!     AnomalyCategory::Names,
//!     "Skip duplicate header[3] (64, 12)",
//! );
//!
//! assert!(diagnostics.has_warnings());
//! for entry in diagnostics.iter() {
//!     println!("{entry}");
//! }
//! ```

use std::fmt::{self, Write};

/// Severity level of an anomaly entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalySeverity {
    /// Informational message, not indicating a problem.
    ///
    /// Used for noting unusual but valid constructs.
    Info,

    /// Warning about a locally inconsistent record.
    ///
    /// The parse continues, but the offending unit was skipped or replaced
    /// with a fallback, so the resulting tree may be missing data.
    Warning,

    /// Error-grade inconsistency that was still recoverable.
    ///
    /// The affected sub-structure is unavailable, but surrounding fields
    /// were produced normally.
    Error,
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySeverity::Info => write!(f, "INFO"),
            AnomalySeverity::Warning => write!(f, "WARN"),
            AnomalySeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Category indicating the source of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyCategory {
    /// Issues with the raw byte stream or bit addressing.
    Stream,

    /// Issues in a table directory (unknown tags, odd record layout).
    Directory,

    /// Issues in name-table records (duplicates, backward offsets).
    Names,

    /// Issues found by a root parser's structural `validate()`.
    Validation,

    /// General issues not fitting other categories.
    General,
}

impl fmt::Display for AnomalyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyCategory::Stream => write!(f, "Stream"),
            AnomalyCategory::Directory => write!(f, "Directory"),
            AnomalyCategory::Names => write!(f, "Names"),
            AnomalyCategory::Validation => write!(f, "Validation"),
            AnomalyCategory::General => write!(f, "General"),
        }
    }
}

/// A single recoverable-anomaly entry with context information.
#[derive(Debug, Clone)]
pub struct Anomaly {
    /// Severity level of this anomaly.
    pub severity: AnomalySeverity,

    /// Category indicating the source of this anomaly.
    pub category: AnomalyCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Optional bit offset in the stream where the issue was found.
    pub bit_offset: Option<u64>,
}

impl Anomaly {
    /// Creates a new anomaly entry.
    pub fn new(
        severity: AnomalySeverity,
        category: AnomalyCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            bit_offset: None,
        }
    }

    /// Adds the stream bit offset at which the anomaly was detected.
    #[must_use]
    pub fn with_bit_offset(mut self, bit_offset: u64) -> Self {
        self.bit_offset = Some(bit_offset);
        self
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;

        if let Some(bit_offset) = self.bit_offset {
            write!(f, " (bit offset: {bit_offset})")?;
        }

        Ok(())
    }
}

/// Container for collecting anomaly entries during a parse.
///
/// Uses `boxcar::Vec` internally, so entries are appended through `&self`
/// and the sink can be shared across a whole parse tree via
/// [`std::sync::Arc`] clones.
///
/// # Example
///
/// ```rust
/// use fieldscope::diagnostics::{Diagnostics, AnomalyCategory};
///
/// let diagnostics = Diagnostics::new();
/// diagnostics.warning(AnomalyCategory::Directory, "Unknown table tag 'zzzz'");
/// assert_eq!(diagnostics.count(), 1);
/// ```
#[derive(Debug)]
pub struct Diagnostics {
    entries: boxcar::Vec<Anomaly>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates a new empty diagnostics container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Adds an informational anomaly.
    pub fn info(&self, category: AnomalyCategory, message: impl Into<String>) {
        self.push(Anomaly::new(AnomalySeverity::Info, category, message));
    }

    /// Adds a warning anomaly.
    pub fn warning(&self, category: AnomalyCategory, message: impl Into<String>) {
        self.push(Anomaly::new(AnomalySeverity::Warning, category, message));
    }

    /// Adds an error-grade anomaly.
    pub fn error(&self, category: AnomalyCategory, message: impl Into<String>) {
        self.push(Anomaly::new(AnomalySeverity::Error, category, message));
    }

    /// Adds an anomaly entry directly.
    ///
    /// Use this for anomalies that need additional context like the bit
    /// offset of the offending record.
    pub fn push(&self, anomaly: Anomaly) {
        self.entries.push(anomaly);
    }

    /// Returns true if any anomalies have been collected.
    pub fn has_any(&self) -> bool {
        self.entries.count() > 0
    }

    /// Returns true if any error-grade anomalies have been collected.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, a)| a.severity == AnomalySeverity::Error)
    }

    /// Returns true if any warning anomalies have been collected.
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, a)| a.severity == AnomalySeverity::Warning)
    }

    /// Returns the total number of anomalies.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Returns the number of warning anomalies.
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, a)| a.severity == AnomalySeverity::Warning)
            .count()
    }

    /// Returns an iterator over all anomalies.
    ///
    /// Note: boxcar's own iterator yields `(index, &Anomaly)` tuples; the
    /// index is dropped here.
    pub fn iter(&self) -> impl Iterator<Item = &Anomaly> {
        self.entries.iter().map(|(_, a)| a)
    }

    /// Returns anomalies filtered by category.
    pub fn by_category(&self, category: AnomalyCategory) -> Vec<&Anomaly> {
        self.entries
            .iter()
            .filter(|(_, a)| a.category == category)
            .map(|(_, a)| a)
            .collect()
    }

    /// Formats a summary of all anomalies for display.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "Anomalies: {}", self.count());
        for anomaly in self.iter() {
            let _ = writeln!(output, "  {anomaly}");
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_creation() {
        let anomaly = Anomaly::new(
            AnomalySeverity::Warning,
            AnomalyCategory::Names,
            "Test message",
        );

        assert_eq!(anomaly.severity, AnomalySeverity::Warning);
        assert_eq!(anomaly.category, AnomalyCategory::Names);
        assert_eq!(anomaly.message, "Test message");
        assert!(anomaly.bit_offset.is_none());
    }

    #[test]
    fn anomaly_with_context() {
        let anomaly = Anomaly::new(
            AnomalySeverity::Error,
            AnomalyCategory::Directory,
            "Invalid record",
        )
        .with_bit_offset(96);

        assert_eq!(anomaly.bit_offset, Some(96));
    }

    #[test]
    fn container_counts() {
        let diagnostics = Diagnostics::new();

        diagnostics.info(AnomalyCategory::General, "Info message");
        diagnostics.warning(AnomalyCategory::Names, "Warning message");
        diagnostics.error(AnomalyCategory::Stream, "Error message");

        assert_eq!(diagnostics.count(), 3);
        assert_eq!(diagnostics.warning_count(), 1);
        assert!(diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert!(diagnostics.has_any());
    }

    #[test]
    fn filter_by_category() {
        let diagnostics = Diagnostics::new();

        diagnostics.warning(AnomalyCategory::Names, "Names warning 1");
        diagnostics.warning(AnomalyCategory::Names, "Names warning 2");
        diagnostics.warning(AnomalyCategory::Directory, "Directory warning");

        assert_eq!(diagnostics.by_category(AnomalyCategory::Names).len(), 2);
        assert_eq!(diagnostics.by_category(AnomalyCategory::Directory).len(), 1);
    }

    #[test]
    fn anomaly_display() {
        let anomaly = Anomaly::new(
            AnomalySeverity::Warning,
            AnomalyCategory::Names,
            "Skip duplicate header[1] (64, 12)",
        )
        .with_bit_offset(0x40);

        let display = format!("{anomaly}");
        assert!(display.contains("WARN"));
        assert!(display.contains("Names"));
        assert!(display.contains("Skip duplicate"));
        assert!(display.contains("bit offset: 64"));
    }
}
