//! # fieldscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the fieldscope library. Import this module to get quick
//! access to the essentials for parsing and inspecting binary containers.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all fieldscope operations
pub use crate::Error;

/// The result type used throughout fieldscope
pub use crate::Result;

// ================================================================================================
// Input Streams
// ================================================================================================

/// Bit-addressable input over buffers and memory-mapped files
pub use crate::stream::{InputStream, ReparseTag};

// ================================================================================================
// The Field Tree
// ================================================================================================

/// Tree nodes: decoded leaves, lazy composites, and the sum of both
pub use crate::field::{Field, FieldSet, Node};

/// Producer machinery for writing custom parsers
pub use crate::field::{Emitter, FieldProducer, Step};

/// Decoded values and their presentation
pub use crate::field::{Charset, DisplayHint, FieldValue};

/// Fragment reassembly
pub use crate::field::{CustomFragment, FragmentGroup};

// ================================================================================================
// Diagnostics
// ================================================================================================

/// The recoverable-anomaly sink and its entry types
pub use crate::diagnostics::{Anomaly, AnomalyCategory, AnomalySeverity, Diagnostics};

// ================================================================================================
// Format Parsers
// ================================================================================================

/// Format identification and structural validation outcomes
pub use crate::formats::{FormatCategory, FormatMetadata, Validation};

/// The TrueType font parser
pub use crate::formats::ttf::TrueTypeFont;
