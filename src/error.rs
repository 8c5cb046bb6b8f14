//! Fatal error type and the `malformed_error!` constructor macro.

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all fatal conditions this
/// library can return.
///
/// These are the *structural* failures of the two-tier error policy: a hard wire
/// contract was violated (bad magic, out-of-range mandatory value, read past the
/// end of a stream), and the current field-set production cannot continue.
/// Recoverable inconsistencies never surface here; they are reported to a
/// [`crate::diagnostics::Diagnostics`] sink and parsing continues without the
/// offending element.
///
/// # Examples
///
/// ```rust
/// use fieldscope::{Error, InputStream};
///
/// let stream = InputStream::from_bytes(vec![0xAB]);
/// match stream.read_bits(0, 16) {
///     Err(Error::OutOfBounds) => {}
///     other => panic!("expected OutOfBounds, got {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An out of bound access was attempted while reading from a stream.
    ///
    /// This error occurs when trying to read data beyond the end of the backing
    /// buffer. It's a safety check to prevent overruns when decoding malformed
    /// or truncated input.
    #[error("Out of bound read would have occurred!")]
    OutOfBounds,

    /// The input violates a hard structural contract and could not be parsed.
    ///
    /// Raised for bad magic constants, fixed version mismatches, directory
    /// counts outside their declared bounds, and mandatory numeric fields out
    /// of range. The error includes the source location where the malformation
    /// was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error was detected
        file: &'static str,
        /// The source line in which this error was detected
        line: u32,
    },

    /// A seek targeted a position behind the forward-only cursor.
    ///
    /// A field set's bit cursor is the single forward-moving authority over its
    /// region of the stream; a lazy producer cannot be rewound, so any seek to
    /// an already-produced position is rejected.
    #[error("Cannot seek backwards: cursor at bit {cursor}, target bit {target}")]
    BackwardSeek {
        /// Current cursor position in bits, relative to the field set
        cursor: u64,
        /// Requested target position in bits, relative to the field set
        target: u64,
    },

    /// A producer emitted two children with the same resolved name.
    ///
    /// Names must be unique within their parent; repeated logical roles use the
    /// `name[]` sequence-suffix convention instead.
    #[error("Duplicate field name '{0}' within one field set")]
    DuplicateName(String),

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening or mapping an
    /// input file.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
