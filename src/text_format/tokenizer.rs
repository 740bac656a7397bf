//! Splits text-format input into tokens with 0-based positions.

use super::ParseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Before the first call to [`Tokenizer::next`].
    Start,
    End,
    Identifier,
    Integer,
    Float,
    /// A quoted string; the token text keeps the quotes and escapes.
    String,
    Symbol,
}

#[derive(Clone, Debug)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

const TAB_WIDTH: usize = 8;

pub(crate) struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    current: Token,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Tokenizer {
            input: input.as_bytes(),
            pos: 0,
            line: 0,
            column: 0,
            current: Token {
                kind: TokenKind::Start,
                text: String::new(),
                line: 0,
                column: 0,
            },
        }
    }

    pub(crate) fn current(&self) -> &Token {
        &self.current
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        match self.peek() {
            Some(b'\n') => {
                self.line += 1;
                self.column = 0;
            }
            Some(b'\t') => self.column += TAB_WIDTH - self.column % TAB_WIDTH,
            Some(_) => self.column += 1,
            None => return,
        }
        self.pos += 1;
    }

    fn error_here(&self, message: &str) -> ParseError {
        ParseError::at(self.line, self.column, message)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => self.bump(),
                b'#' => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                c if c < b' ' || c == 0x7f => {
                    return Err(self.error_here("Invalid control characters encountered in text."));
                }
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    /// Advances to the next token. At the end of input the current token
    /// becomes [`TokenKind::End`] with empty text.
    pub(crate) fn next(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace_and_comments()?;
        let (line, column, start) = (self.line, self.column, self.pos);
        let kind = match self.peek() {
            None => TokenKind::End,
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
                    self.bump();
                }
                TokenKind::Identifier
            }
            Some(c) if c.is_ascii_digit() => self.consume_number(false)?,
            Some(b'.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.bump();
                self.consume_number(true)?
            }
            Some(quote @ (b'"' | b'\'')) => {
                self.bump();
                self.consume_string(quote)?;
                TokenKind::String
            }
            Some(c) => {
                self.bump();
                // Keep multi-byte UTF-8 sequences together as one symbol.
                if c >= 0x80 {
                    while self.peek().is_some_and(|c| (0x80..0xc0).contains(&c)) {
                        self.bump();
                    }
                }
                TokenKind::Symbol
            }
        };
        self.current = Token {
            kind,
            text: String::from_utf8_lossy(&self.input[start..self.pos]).into_owned(),
            line,
            column,
        };
        Ok(())
    }

    fn consume_digits(&mut self, radix: u32) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| (c as char).is_digit(radix)) {
            self.bump();
            count += 1;
        }
        count
    }

    fn consume_number(&mut self, started_with_dot: bool) -> Result<TokenKind, ParseError> {
        let mut is_float = started_with_dot;
        let mut is_decimal = true;
        if started_with_dot {
            self.consume_digits(10);
        } else if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.bump();
            self.bump();
            is_decimal = false;
            if self.consume_digits(16) == 0 {
                return Err(self.error_here("\"0x\" must be followed by hex digits."));
            }
        } else if self.peek() == Some(b'0') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            is_decimal = false;
            self.consume_digits(8);
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error_here("Numbers starting with leading zero must be in octal."));
            }
        } else {
            self.consume_digits(10);
            if self.peek() == Some(b'.') {
                self.bump();
                is_float = true;
                self.consume_digits(10);
            }
        }

        if is_decimal {
            if matches!(self.peek(), Some(b'e' | b'E')) {
                self.bump();
                is_float = true;
                if matches!(self.peek(), Some(b'-' | b'+')) {
                    self.bump();
                }
                if self.consume_digits(10) == 0 {
                    return Err(self.error_here("\"e\" must be followed by exponent."));
                }
            }
            if matches!(self.peek(), Some(b'f' | b'F')) {
                self.bump();
                is_float = true;
            }
        }

        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                Err(self.error_here("Need space between number and identifier."))
            }
            Some(b'.') if is_float => {
                Err(self.error_here("Already saw decimal point or exponent; can't have another one."))
            }
            _ => Ok(if is_float { TokenKind::Float } else { TokenKind::Integer }),
        }
    }

    fn consume_string(&mut self, quote: u8) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                None => return Err(self.error_here("Unexpected end of string.")),
                Some(b'\n') => {
                    return Err(self.error_here("String literals cannot cross line boundaries."));
                }
                Some(b'\\') => {
                    self.bump();
                    match self.peek() {
                        Some(b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' | b'\\' | b'?' | b'\'' | b'"') => {
                            self.bump()
                        }
                        Some(b'0'..=b'7') => {
                            self.consume_digits(8);
                        }
                        Some(b'x' | b'X') => {
                            self.bump();
                            if !self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                                return Err(self.error_here("Expected hex digits for escape sequence."));
                            }
                            self.consume_digits(16);
                        }
                        _ => return Err(self.error_here("Invalid escape sequence in string literal.")),
                    }
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => self.bump(),
            }
        }
    }
}

/// Parses an integer literal as produced by the tokenizer (decimal, `0x`
/// hex or leading-zero octal), failing when it exceeds `max`.
pub(crate) fn parse_integer(text: &str, max: u64) -> Option<u64> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    let value = u64::from_str_radix(digits, radix).ok()?;
    (value <= max).then_some(value)
}

/// Parses a float literal, ignoring a trailing `f`.
pub(crate) fn parse_float(text: &str) -> f64 {
    let text = text.trim_end_matches(['f', 'F']);
    let text = if text.ends_with(['e', 'E']) {
        &text[..text.len() - 1]
    } else {
        text
    };
    text.parse().unwrap_or(0.0)
}

/// Decodes the body of one quoted string token, quotes included.
pub(crate) fn parse_string_append(text: &str, out: &mut Vec<u8>) {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return;
    }
    unescape_into(&bytes[1..bytes.len() - 1], out);
}

/// C unescaping. Malformed escapes are copied through.
pub(crate) fn unescape_into(bytes: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        i += 1;
        if c != b'\\' || i == bytes.len() {
            out.push(c);
            continue;
        }
        let escaped = bytes[i];
        i += 1;
        match escaped {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'0'..=b'7' => {
                let mut value = u32::from(escaped - b'0');
                let mut len = 1;
                while len < 3 && i < bytes.len() && (b'0'..=b'7').contains(&bytes[i]) {
                    value = value * 8 + u32::from(bytes[i] - b'0');
                    i += 1;
                    len += 1;
                }
                out.push(value as u8);
            }
            b'x' | b'X' if i < bytes.len() && bytes[i].is_ascii_hexdigit() => {
                let mut value = 0u32;
                let mut len = 0;
                while len < 2 && i < bytes.len() && bytes[i].is_ascii_hexdigit() {
                    value = value * 16 + (bytes[i] as char).to_digit(16).unwrap_or(0);
                    i += 1;
                    len += 1;
                }
                out.push(value as u8);
            }
            b'\\' | b'?' | b'\'' | b'"' => out.push(escaped),
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<(TokenKind, String, usize, usize)> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            tokenizer.next().unwrap();
            let t = tokenizer.current().clone();
            if t.kind == TokenKind::End {
                out.push((t.kind, t.text, t.line, t.column));
                return out;
            }
            out.push((t.kind, t.text, t.line, t.column));
        }
    }

    #[test]
    fn kinds_and_positions() {
        let toks = tokens("foo: 0x1F # comment\n  bar { 1.5f 'x\\n' }");
        let kinds: Vec<_> = toks.iter().map(|t| (t.0, t.1.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Identifier, "foo"),
                (TokenKind::Symbol, ":"),
                (TokenKind::Integer, "0x1F"),
                (TokenKind::Identifier, "bar"),
                (TokenKind::Symbol, "{"),
                (TokenKind::Float, "1.5f"),
                (TokenKind::String, "'x\\n'"),
                (TokenKind::Symbol, "}"),
                (TokenKind::End, ""),
            ]
        );
        assert_eq!((toks[3].2, toks[3].3), (1, 2));
    }

    #[test]
    fn numbers() {
        assert_eq!(tokens("1e5")[0].0, TokenKind::Float);
        assert_eq!(tokens(".5")[0].0, TokenKind::Float);
        assert_eq!(tokens("0xef")[0].0, TokenKind::Integer);
        assert_eq!(tokens("017")[0].0, TokenKind::Integer);
        assert_eq!(parse_integer("0x1F", u64::MAX), Some(31));
        assert_eq!(parse_integer("017", u64::MAX), Some(15));
        assert_eq!(parse_integer("256", 255), None);
        assert_eq!(parse_float("1.5f"), 1.5);
        assert_eq!(parse_float("2e"), 2.0);
    }

    #[test]
    fn tab_stops() {
        let toks = tokens("\tx");
        assert_eq!(toks[0].3, 8);
    }

    #[test]
    fn malformed_input() {
        let mut t = Tokenizer::new("\u{10}");
        let err = t.next().unwrap_err();
        assert_eq!(err.to_string(), "1:1: Invalid control characters encountered in text.");

        let mut t = Tokenizer::new("\"abc");
        assert_eq!(t.next().unwrap_err().message, "Unexpected end of string.");
        let mut t = Tokenizer::new("123abc");
        assert_eq!(t.next().unwrap_err().message, "Need space between number and identifier.");
        let mut t = Tokenizer::new("08");
        assert_eq!(
            t.next().unwrap_err().message,
            "Numbers starting with leading zero must be in octal."
        );
    }

    #[test]
    fn unescaping() {
        let mut out = Vec::new();
        parse_string_append(r#""a\001\x41\'\n""#, &mut out);
        assert_eq!(out, b"a\x01A'\n");
    }
}
