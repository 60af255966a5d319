//! Low-level byte-by-byte parser for ASCII text.
//!
//! This module provides [ByteParser] for parsing the text-based morphology
//! formats with support for peeking, consuming, line tracking and token
//! extraction. Used as the foundation for both the SWC and the Neurolucida
//! readers.

use crate::diagnostics::Location;
use crate::parser::byte_source::{ByteSource, InMemoryByteSource};

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte parser for ASCII text with support for peeking, consuming,
/// and line-aware token extraction.
///
/// # Features
/// - Works with any ByteSource
/// - Tracks the current line for diagnostics
/// - Whitespace and line comment skipping
/// - Line and token slicing without allocation
///
/// # Example
/// ```
/// use neuromorph::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("# header\n1 1 0 0 0 1 -1\n");
/// assert_eq!(parser.next_line(), Some(&b"# header"[..]));
/// assert_eq!(parser.line(), 2);
/// assert_eq!(parser.next_line(), Some(&b"1 1 0 0 0 1 -1"[..]));
/// assert_eq!(parser.next_line(), None);
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
    uri: String,
}

impl ByteParser<InMemoryByteSource> {
    /// Creates a new `ByteParser` from a byte slice by copying it into a Vec.
    ///
    /// # Arguments
    /// * `input` - The byte slice to parse
    pub fn for_bytes(input: &[u8]) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.to_vec()))
    }

    /// Creates a new `ByteParser` from a string by copying it into a Vec.
    ///
    /// # Arguments
    /// * `input` - The string to parse
    pub fn for_str(input: &str) -> Self {
        Self::for_bytes(input.as_bytes())
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a new `ByteParser` from a byte source, with the
    /// [placeholder uri](crate::diagnostics::STRING_URI).
    ///
    /// # Arguments
    /// * `source` - The byte source to parse
    pub fn new(source: S) -> Self {
        Self { source, uri: crate::diagnostics::STRING_URI.to_string() }
    }

    /// Names the input, reported in every [Location] created by this parser.
    pub fn with_uri<U: Into<String>>(mut self, uri: U) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Peeks at the current byte without consuming it.
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.source.peek()
    }

    /// Gets the current byte and advances the position (consumes it).
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Skips (consumes) all consecutive whitespace characters.
    ///
    /// Whitespace includes: space (' '), tab ('\t'), newline ('\n'), and carriage return ('\r').
    ///
    /// # Returns
    /// Number of newlines skipped
    pub fn skip_whitespace(&mut self) -> usize {
        let mut newlines = 0;
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                if b == b'\n' {
                    newlines += 1;
                }
                self.next_byte();
            } else {
                break;
            }
        }
        newlines
    }

    /// Skips (consumes) a line comment introduced by `marker` if present,
    /// leaving the parser at the terminating newline.
    ///
    /// # Returns
    /// `true` if a comment was found and consumed
    pub fn skip_line_comment(&mut self, marker: u8) -> bool {
        if self.peek() != Some(marker) {
            return false;
        }
        self.consume_until(b'\n', ConsumeMode::Exclusive);
        true
    }

    /// Skips (consumes) all consecutive whitespace and line comments.
    pub fn skip_comment_and_whitespace(&mut self, marker: u8) {
        self.skip_whitespace();
        while self.skip_line_comment(marker) {
            self.skip_whitespace();
        }
    }

    /// Consumes the current byte if it matches the target byte.
    ///
    /// # Returns
    /// `true` if the byte was matched and consumed, `false` otherwise
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes bytes until the target byte is found.
    ///
    /// # Arguments
    /// * `target` - The byte to search for
    /// * `mode` - Whether to consume the target byte (`Inclusive`) or stop before it (`Exclusive`)
    ///
    /// # Returns
    /// `true` if the target was found, `false` if EOF was reached first
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false // reached EOF without finding target
    }

    /// Consumes a token, i.e. bytes until whitespace or any of the delimiters.
    ///
    /// # Returns
    /// The (possibly empty) token as a byte slice
    pub fn consume_token(&mut self, delimiters: &[u8]) -> &[u8] {
        let start = self.position();
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || delimiters.contains(&b) {
                break;
            }
            self.next_byte();
        }
        self.source.slice(start, self.position())
    }

    /// Consumes the next line and returns it without its line terminator
    /// (`\n` or `\r\n`).
    ///
    /// # Returns
    /// `None` if at EOF before the call
    pub fn next_line(&mut self) -> Option<&[u8]> {
        if self.is_eof() {
            return None;
        }
        let start = self.position();
        self.consume_until(b'\n', ConsumeMode::Exclusive);
        let mut end = self.position();
        self.next_byte();
        if end > start && self.source.slice(end - 1, end) == b"\r" {
            end -= 1;
        }
        Some(self.source.slice(start, end))
    }

    /// Bytes from `start` up to the current position.
    pub fn slice_from(&self, start: usize) -> &[u8] {
        self.source.slice(start, self.position())
    }

    /// Returns whether the end of data (EOF) has been reached.
    pub fn is_eof(&self) -> bool {
        self.source.is_eof()
    }

    /// Returns the current parser position in the input.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Returns the current line (1-based).
    pub fn line(&self) -> usize {
        self.source.line()
    }

    /// Location of the current line.
    pub fn location(&self) -> Location {
        Location::new(self.uri.clone(), self.line())
    }
}

/// Specifies whether to consume or leave the target when using `consume_until`.
///
/// # Examples
/// ```
/// use neuromorph::parser::{ByteParser, ConsumeMode};
///
/// let mut parser = ByteParser::for_str("(3 -4 0 5) ; comment");
///
/// // Inclusive: consume up to and including ')'
/// parser.consume_until(b')', ConsumeMode::Inclusive);
/// assert_eq!(parser.peek(), Some(b' '));
///
/// // Exclusive: consume up to but not including ';'
/// parser.consume_until(b';', ConsumeMode::Exclusive);
/// assert_eq!(parser.peek(), Some(b';'));
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConsumeMode {
    /// Consume the target byte along with everything before it.
    Inclusive,

    /// Stop before the target byte without consuming it.
    Exclusive,
}
