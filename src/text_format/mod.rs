//! The protobuf text format.
//!
//! [`Parser`] reads text such as `a: 1 b { c: "x" }` into a
//! [`DynamicMessage`] and [`Printer`] writes one back out. Both work purely
//! through reflection, so any message type known to a pool can be handled.
//!
//! ```
//! use protodyn::test_utils::build_pool;
//! use protodyn::text_format;
//!
//! let pool = build_pool(&[r#"
//!     name: "t.proto" package: "t"
//!     message_type { name: "M"
//!       field { name: "x" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
//!       field { name: "tag" number: 2 label: LABEL_REPEATED type: TYPE_STRING }
//!     }
//! "#]);
//! let mut message = pool.find_message_by_name("t.M").unwrap().new_message();
//! text_format::parse_from_str("x: 3 tag: ['a', 'b']", &mut message).unwrap();
//! assert_eq!(message.short_debug_string(), r#"x: 3 tag: "a" tag: "b""#);
//! ```

use log::error;
use thiserror::Error;

use crate::descriptor::{FieldDescriptor, MessageDescriptor};
use crate::reflection::DynamicMessage;

mod parser;
mod printer;
mod tokenizer;

pub use parser::{ParseInfoTree, ParseLocation, Parser};
pub use printer::Printer;

/// A text-format syntax or semantic error. `line` and `column` are
/// 1-based; errors about the message as a whole have line 0.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    /// From a 0-based position.
    pub(crate) fn at(line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError {
            line: line + 1,
            column: column + 1,
            message: message.into(),
        }
    }

    pub(crate) fn without_position(message: impl Into<String>) -> Self {
        ParseError {
            line: 0,
            column: 1,
            message: message.into(),
        }
    }
}

/// Receives the errors and warnings of a parse.
pub trait ParseErrorCollector {
    fn add_error(&mut self, error: &ParseError);

    fn add_warning(&mut self, warning: &ParseError) {
        let _ = warning;
    }
}

/// Resolves `[name]` extension keys.
pub trait ExtensionFinder {
    fn find_extension(&self, message: &MessageDescriptor, name: &str) -> Option<FieldDescriptor>;
}

/// Clears `message` and parses `text` into it, logging any failure.
pub fn parse_from_str(text: &str, message: &mut DynamicMessage) -> Result<(), ParseError> {
    let result = Parser::new().parse_from_str(text, message);
    log_failure(message, result)
}

/// Like [`parse_from_str`] but keeps existing content; singular fields
/// may be overwritten.
pub fn merge_from_str(text: &str, message: &mut DynamicMessage) -> Result<(), ParseError> {
    let result = Parser::new().merge_from_str(text, message);
    log_failure(message, result)
}

fn log_failure(message: &DynamicMessage, result: Result<(), ParseError>) -> Result<(), ParseError> {
    if let Err(err) = &result {
        error!(
            "Error parsing text-format {}: {err}",
            message.descriptor().full_name()
        );
    }
    result
}

/// Multi-line text format of `message`.
pub fn print_to_string(message: &DynamicMessage) -> String {
    Printer::new().print_to_string(message)
}

/// Decodes C escape sequences. Malformed escapes are kept as written.
pub fn unescape_c_bytes(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    tokenizer::unescape_into(text.as_bytes(), &mut out);
    out
}

/// C-escapes `bytes` with octal escapes for anything unprintable.
pub fn escape_c_bytes(bytes: &[u8]) -> String {
    printer::c_escape(bytes, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_one_based() {
        let err = ParseError::at(0, 13, "bad");
        assert_eq!(err.to_string(), "1:14: bad");
        assert_eq!(ParseError::without_position("x").to_string(), "0:1: x");
    }

    #[test]
    fn c_escapes() {
        assert_eq!(unescape_c_bytes("a\\001"), vec![b'a', 1]);
        assert_eq!(unescape_c_bytes("\\x41\\n\\q"), b"A\n\\q".to_vec());
        assert_eq!(escape_c_bytes(b"a\"\x01\xfe"), "a\\\"\\001\\376");
    }
}
