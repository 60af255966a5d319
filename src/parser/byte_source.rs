//! Byte source abstractions for parsing.
//!
//! This module provides the [ByteSource] trait and the [InMemoryByteSource]
//! implementation. Morphology files are small enough to be read at once,
//! so the in-memory source is the only one needed.

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================#=
/// Trait defining the interface of byte sources used by [ByteParser](super::ByteParser).
///
/// On top of positional access, a source tracks the current (1-based) line,
/// which all diagnostics of the text formats refer to.
pub trait ByteSource {
    /// The byte under the cursor, `None` at the end of the input.
    fn peek(&self) -> Option<u8>;

    /// Consumes the byte under the cursor. Consuming a `\n` starts a new line.
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns the current position in the byte stream.
    fn position(&self) -> usize;

    /// Returns the current line, starting at 1.
    fn line(&self) -> usize;

    /// Returns the bytes between two positions, empty if out of range.
    fn slice(&self, start: usize, end: usize) -> &[u8];

    /// Check if at end of data.
    fn is_eof(&self) -> bool;
}

// =#========================================================================#=
// IN MEMORY BYTE SOURCE
// =#========================================================================#=
/// Whole file or string held in memory, with a cursor and a line counter.
pub struct InMemoryByteSource {
    input: Vec<u8>,
    pos: usize,
    line: usize,
}

impl InMemoryByteSource {
    /// Takes ownership of `bytes`; the cursor starts on line 1.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { input: bytes, pos: 0, line: 1 }
    }
}

impl ByteSource for InMemoryByteSource {
    #[inline(always)]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
        }
        Some(byte)
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn line(&self) -> usize {
        self.line
    }

    fn slice(&self, start: usize, end: usize) -> &[u8] {
        let end = end.min(self.input.len());
        if start <= end { &self.input[start..end] } else { &[] }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}
