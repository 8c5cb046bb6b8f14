#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'stream/mod.rs' uses mmap to map a file into memory

//! # fieldscope
//!
//! A declarative engine for decoding binary container formats into lazy,
//! bit-addressable field trees. Built in pure Rust, `fieldscope` separates
//! the generic production machinery (bit-granular addressing, forward-only
//! cursors, on-demand decoding, two-tier error reporting) from per-format
//! parsers that only describe *what* the bytes mean.
//!
//! ## Features
//!
//! - **Bit-granular addressing** - Every field knows its absolute position
//!   and size in bits; single flag bits and packed bit groups are first-class
//! - **Lazy production** - Children of a field set are produced on demand, so
//!   a prefix of a large file can be inspected without decoding the rest
//! - **Lazy decoding** - Field values are decoded on first access and cached;
//!   padding is never read at all
//! - **Two-tier errors** - Hard wire-contract violations unwind as
//!   [`Error`]; locally inconsistent records are skipped and reported to a
//!   shared [`diagnostics::Diagnostics`] sink
//! - **Fragment reassembly** - Scattered byte runs can be registered into a
//!   [`FragmentGroup`] and re-parsed as one contiguous virtual stream
//! - **Memory-mapped input** - Files are mapped, not copied, and decoded
//!   by reference
//!
//! ## Quick Start
//!
//! Add `fieldscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! fieldscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use fieldscope::prelude::*;
//!
//! let stream = InputStream::from_file("font.ttf".as_ref())?;
//! let mut font = TrueTypeFont::new(stream.into(), Default::default());
//! font.root_mut().produce_all()?;
//! println!("{} top-level fields", font.root().len());
//! # Ok::<(), fieldscope::Error>(())
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use fieldscope::formats::ttf::TrueTypeFont;
//! use fieldscope::InputStream;
//! use std::path::Path;
//!
//! let stream = InputStream::from_file(Path::new("font.ttf"))?;
//! let mut font = TrueTypeFont::new(stream.into(), Default::default());
//!
//! // Structural validation forces only the fixed header.
//! if let fieldscope::formats::Validation::Invalid(reason) = font.validate() {
//!     eprintln!("rejected: {reason}");
//! }
//!
//! // Random access by name produces exactly the needed prefix.
//! if let Some(node) = font.root_mut().by_name("nb_table")? {
//!     let field = node.as_field().unwrap();
//!     println!("{} = {}", field.name(), field.display()?);
//! }
//!
//! // Anomalies never abort the parse; inspect them afterwards.
//! for anomaly in font.diagnostics().iter() {
//!     println!("{anomaly}");
//! }
//! # Ok::<(), fieldscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `fieldscope` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`stream`] - Immutable bit-addressable input over buffers and mapped files
//! - [`field`] - The lazy field-tree engine: sets, producers, values, fragments
//! - [`formats`] - Per-format parsers built on the engine, keyed by metadata
//! - [`diagnostics`] - The recoverable-anomaly sink shared across a parse tree
//! - [`Error`] and [`Result`] - Fatal structural error handling
//!
//! ### The Field Engine
//!
//! A [`FieldSet`] owns an ordered list of children and a boxed
//! [`field::FieldProducer`], an explicit state machine advanced one step per
//! demand. Producers emit children through a [`field::Emitter`], which
//! enforces the layout invariants: gapless offsets, a forward-only cursor
//! with automatic padding over seek gaps, unique names with `name[]`
//! sequence suffixing, and a hard ceiling at the set's declared size.
//!
//! ### Format Parsers
//!
//! The [`formats::ttf::TrueTypeFont`] parser is the reference consumer of the
//! engine: a sorted table-directory walk dispatching known tags (`head`,
//! `name`) to typed sub-parsers and unknown tags to an opaque fallback.

#[macro_use]
mod error;

pub mod diagnostics;
pub mod field;
pub mod formats;
pub mod stream;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use fieldscope::prelude::*;
///
/// let stream = InputStream::from_file("font.ttf".as_ref())?;
/// let mut font = TrueTypeFont::new(stream.into(), Default::default());
/// font.root_mut().produce_all()?;
/// # Ok::<(), fieldscope::Error>(())
/// ```
pub mod prelude;

/// `fieldscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `fieldscope` Error type
///
/// The fatal half of the two-tier error policy: structural wire-contract
/// violations that unwind the current production. Recoverable inconsistencies
/// go to [`diagnostics::Diagnostics`] instead.
///
/// # Examples
///
/// ```rust
/// use fieldscope::{Error, InputStream};
///
/// let stream = InputStream::from_bytes(vec![0xAB]);
/// match stream.read_bits(0, 16) {
///     Err(Error::OutOfBounds) => {}
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
pub use error::Error;

/// The lazy field tree: nodes, leaf fields, and composite sets.
///
/// [`FieldSet`] is the composite node driving production; [`Field`] is a
/// decoded-on-demand leaf; [`Node`] is the sum of both plus fragments.
pub use field::{Field, FieldSet, FieldValue, Node};

/// Fragment reassembly for scattered payloads.
///
/// A [`CustomFragment`] covers one physical byte run; a [`FragmentGroup`]
/// collects fragments in registration order and materializes them as a new
/// contiguous [`InputStream`] for re-parsing.
pub use field::{CustomFragment, FragmentGroup};

/// Bit-addressable input over owned buffers and memory-mapped files.
///
/// [`ReparseTag`] travels with streams synthesized from fragment groups and
/// names the parser the reassembled payload should be fed to.
pub use stream::{InputStream, ReparseTag};
