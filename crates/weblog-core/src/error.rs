// Error types for compiling formats and parsing lines

use thiserror::Error;

/// Failure converting between text and the date / IPv4 integer encodings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid date {0:?}")]
    Date(String),

    #[error("epoch {0} is outside the representable calendar range")]
    Epoch(i64),

    #[error("invalid IPv4 address {0:?}")]
    Address(String),
}

/// A format string that cannot be turned into a `CompiledFormat`.
///
/// This is the only fatal error kind: nothing can be parsed without a format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("log format is empty")]
    Empty,

    #[error("unterminated {delimiter:?} group in log format {format:?}")]
    Unterminated { delimiter: char, format: String },

    #[error("directives {first:?} and {second:?} both resolve to field '{identifier}'")]
    DuplicateIdentifier {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("generated pattern failed to compile: {0}")]
    Pattern(String),
}

/// A line that does not match the compiled format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line does not match log format: {line:?}")]
pub struct ParseError {
    pub line: String,
}

impl ParseError {
    pub fn new(line: &str) -> Self {
        Self {
            line: line.to_string(),
        }
    }
}

/// A matched field whose text cannot be converted to its typed form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldConversionError {
    #[error("required field '{0}' is not captured by the log format")]
    Missing(&'static str),

    #[error("field '{field}' has invalid value {value:?}: {reason}")]
    Invalid {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl FieldConversionError {
    pub(crate) fn invalid(field: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Everything that can go wrong with a single input line.
///
/// All variants are recoverable: the caller skips the line and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Conversion(#[from] FieldConversionError),

    #[error("line is not valid UTF-8: {0}")]
    Encoding(String),
}
