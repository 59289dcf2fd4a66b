//! Error types for the huffcoder engine.
//!
//! All operations return structured errors rather than panicking. Empty and
//! single-symbol alphabets are *not* errors; they are representable states
//! that callers check for (see [`crate::tree::CodeTree::build`] and
//! [`crate::tree::CodeTree::is_degenerate`]).

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Codec: encode/decode against a built tree
/// - Alphabet: weight validation
/// - Table: frequency table text parsing
/// - Framing: tagged transport messages
/// - I/O: sockets and files owned by collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Encode or decode failure
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Alphabet entry rejected
    #[error("alphabet error: {0}")]
    Alphabet(#[from] AlphabetError),

    /// Frequency table could not be parsed
    #[error("frequency table error: {0}")]
    Table(#[from] TableError),

    /// Transport message could not be interpreted
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Socket or file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel communication error (receiver or owner task gone)
    #[error("channel error: {0}")]
    Channel(String),
}

/// Alphabet validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlphabetError {
    /// Weight is negative, NaN or infinite
    #[error("symbol {symbol:?} has invalid weight {weight}")]
    InvalidWeight { symbol: char, weight: f64 },
}

/// Encode/decode errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Plaintext contains a symbol that has no leaf in the tree
    #[error("unknown symbol {symbol:?} at position {position}")]
    UnknownSymbol { symbol: char, position: usize },

    /// Code text contains something other than '0', '1' or a line break
    #[error("invalid code symbol {symbol:?} at position {position}")]
    InvalidCodeSymbol { symbol: char, position: usize },

    /// Code text ended part way down a root-to-leaf path
    #[error("truncated code: input ended {dangling} bits into an unfinished code")]
    TruncatedCode { dangling: usize },

    /// Decode attempted against a single-leaf tree, which has no descend transitions
    #[error("tree has a single symbol {symbol:?} and cannot decode bits")]
    DegenerateTree { symbol: char },
}

/// Frequency table parse errors.
///
/// Any of these rejects the whole table; no partial alphabet is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Symbol was not followed by a tab
    #[error("line {line}: expected tab after symbol")]
    MissingTab { line: usize },

    /// Weight column is empty
    #[error("line {line}: missing weight")]
    MissingWeight { line: usize },

    /// Weight is not a finite non-negative decimal literal
    #[error("line {line}: invalid weight {text:?}")]
    InvalidWeight { line: usize, text: String },

    /// Code column is missing or not a bit string (3-column form only)
    #[error("line {line}: invalid code column {text:?}")]
    InvalidCode { line: usize, text: String },

    /// Extra columns after the last expected one
    #[error("line {line}: unexpected trailing column")]
    TrailingColumn { line: usize },

    /// Table parsed but has no entries, so there is no tree to code with
    #[error("table has no entries")]
    Empty,
}

/// Transport framing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Zero-length frame (no tag byte)
    #[error("unrecognized message: empty frame")]
    EmptyFrame,

    /// Tag byte other than 't' or 'c'
    #[error("unrecognized message: unknown tag {tag:#04x}")]
    UnknownTag { tag: u8 },

    /// Known tag with nothing after it
    #[error("unrecognized message: empty payload for tag {tag:?}")]
    EmptyPayload { tag: char },

    /// Payload bytes are not valid UTF-8 text
    #[error("unrecognized message: payload for tag {tag:?} is not UTF-8")]
    NotText { tag: char },
}

impl Error {
    /// True when this error is one of the "unrecognized message" family.
    pub fn is_unrecognized_message(&self) -> bool {
        matches!(self, Error::Framing(_))
    }
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_wraps() {
        let err: Error = CodecError::TruncatedCode { dangling: 3 }.into();
        assert!(matches!(
            err,
            Error::Codec(CodecError::TruncatedCode { dangling: 3 })
        ));
        assert!(err.to_string().contains("truncated code"));
    }

    #[test]
    fn test_unrecognized_family() {
        let err: Error = FramingError::UnknownTag { tag: b'x' }.into();
        assert!(err.is_unrecognized_message());
        assert!(err.to_string().contains("0x78"));

        let err: Error = TableError::MissingTab { line: 2 }.into();
        assert!(!err.is_unrecognized_message());
        assert_eq!(err.to_string(), "frequency table error: line 2: expected tab after symbol");
    }
}
