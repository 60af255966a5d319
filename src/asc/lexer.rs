//! Tokenizer for Neurolucida files.

use crate::diagnostics::Location;
use crate::error::MorphError;
use crate::parser::byte_source::ByteSource;
use crate::parser::{ByteParser, ConsumeMode, ParsingError, ParsingErrorType};
use std::fmt;

/// Bytes ending a word or number
const ASC_DELIMITERS: &[u8] = b"()<>|,;\"";

/// Neurolucida marker shapes, optionally followed by digits (`Dot3`)
const MARKER_WORDS: &[&str] = &[
    "Dot",
    "Plus",
    "Cross",
    "Splat",
    "Flower",
    "Circle",
    "TriStar",
    "OpenStar",
    "Asterisk",
    "SnowFlake",
    "OpenCircle",
    "ShadedStar",
    "FilledStar",
    "TexacoStar",
    "MoneyGreen",
    "DarkYellow",
    "OpenSquare",
    "OpenDiamond",
    "CircleArrow",
    "CircleCross",
    "OpenQuadStar",
    "DoubleCircle",
    "FilledSquare",
    "MalteseCross",
    "FilledCircle",
    "FilledDiamond",
    "FilledQuadStar",
    "OpenUpTriangle",
    "FilledUpTriangle",
    "OpenDownTriangle",
    "FilledDownTriangle",
];

/// Whether `word` is a marker shape name, e.g. `Dot` or `FilledCircle12`.
pub(crate) fn is_marker_word(word: &str) -> bool {
    let name = word.trim_end_matches(|c: char| c.is_ascii_digit());
    MARKER_WORDS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Eof,
    LParen,
    RParen,
    /// `<(`
    LSpine,
    /// `)>`
    RSpine,
    Comma,
    Pipe,
    Word,
    String,
    Number,
    Axon,
    Apical,
    Dendrite,
    CellBody,
    Color,
    Font,
    Rgb,
    Marker,
    Generated,
    High,
    Incomplete,
    Low,
    Normal,
    Midpoint,
    Origin,
}

impl TokenKind {
    fn from_word(word: &str) -> Self {
        match word {
            "Axon" => TokenKind::Axon,
            "Apical" => TokenKind::Apical,
            "Dendrite" => TokenKind::Dendrite,
            "CellBody" => TokenKind::CellBody,
            "Color" => TokenKind::Color,
            "Font" => TokenKind::Font,
            "RGB" => TokenKind::Rgb,
            "Generated" => TokenKind::Generated,
            "High" => TokenKind::High,
            "Incomplete" => TokenKind::Incomplete,
            "Low" => TokenKind::Low,
            "Normal" => TokenKind::Normal,
            "Midpoint" => TokenKind::Midpoint,
            "Origin" => TokenKind::Origin,
            w if is_marker_word(w) => TokenKind::Marker,
            _ => TokenKind::Word,
        }
    }

    /// Sentinels that may close a branch
    pub(crate) fn is_end_of_branch(self) -> bool {
        matches!(
            self,
            TokenKind::Generated
                | TokenKind::High
                | TokenKind::Incomplete
                | TokenKind::Low
                | TokenKind::Normal
                | TokenKind::Midpoint
                | TokenKind::Origin
        )
    }

    pub(crate) fn is_end_of_section(self) -> bool {
        matches!(self, TokenKind::RParen | TokenKind::Pipe)
    }

    pub(crate) fn is_neurite_type(self) -> bool {
        matches!(self, TokenKind::Axon | TokenKind::Apical | TokenKind::Dendrite | TokenKind::CellBody)
    }

    /// Groups introduced by these tokens carry no geometry
    pub(crate) fn is_skipped_group(self) -> bool {
        matches!(
            self,
            TokenKind::Word
                | TokenKind::Color
                | TokenKind::Rgb
                | TokenKind::Generated
                | TokenKind::High
                | TokenKind::Incomplete
                | TokenKind::Low
                | TokenKind::Normal
                | TokenKind::Font
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LSpine => write!(f, "<("),
            TokenKind::RSpine => write!(f, ")>"),
            TokenKind::Pipe => write!(f, "|"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A token with its text and line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

// =#========================================================================#=
// ASC LEXER
// =#========================================================================#=
/// Tokenizer with one token of lookahead.
///
/// Whitespace and `;` comments are dropped. `current` is the token being
/// looked at, `peek` the one after it.
pub(crate) struct AscLexer<S: ByteSource> {
    parser: ByteParser<S>,
    current: Token,
    next: Token,
}

impl<S: ByteSource> AscLexer<S> {
    /// Creates a lexer positioned at the first token.
    pub fn new(mut parser: ByteParser<S>) -> Result<Self, MorphError> {
        let current = read_token(&mut parser)?;
        let next = read_token(&mut parser)?;
        Ok(Self { parser, current, next })
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn peek(&self) -> &Token {
        &self.next
    }

    pub fn ended(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Line of the current token.
    pub fn line(&self) -> usize {
        self.current.line
    }

    pub fn location(&self) -> Location {
        Location::new(self.parser.uri(), self.current.line)
    }

    /// Advances by one token.
    ///
    /// # Errors
    /// If already at the end of the input.
    pub fn consume(&mut self) -> Result<(), MorphError> {
        if self.ended() {
            return Err(ParsingError::truncated_input(self.location(), "Can't iterate past the end").into());
        }
        let next = read_token(&mut self.parser)?;
        self.current = std::mem::replace(&mut self.next, next);
        Ok(())
    }

    /// Checks the current token is of `kind`, then advances.
    pub fn consume_expected(&mut self, kind: TokenKind, message: &str) -> Result<(), MorphError> {
        self.expect(kind, message)?;
        self.consume()
    }

    /// Checks the current token is of `kind`.
    ///
    /// # Errors
    /// An [UnexpectedToken](ParsingErrorType::UnexpectedToken) error.
    pub fn expect(&self, kind: TokenKind, message: &str) -> Result<(), MorphError> {
        if self.current.kind == kind {
            return Ok(());
        }
        Err(ParsingError::new(
            ParsingErrorType::UnexpectedToken {
                expected: kind.to_string(),
                got: self.current.text.clone(),
                message: message.to_string(),
            },
            self.location(),
        )
        .into())
    }

    /// Advances until the current token is of `kind`.
    pub fn consume_until(&mut self, kind: TokenKind) -> Result<(), MorphError> {
        loop {
            self.consume()?;
            if self.current.kind == kind {
                return Ok(());
            }
        }
    }

    /// With the current token an opening paren, consumes the whole group
    /// including its closing paren.
    ///
    /// # Errors
    /// If the input ends before the group is balanced.
    pub fn consume_until_balanced_paren(&mut self) -> Result<(), MorphError> {
        let mut opening_count = 1usize;
        while opening_count != 0 {
            self.consume()?;
            match self.current.kind {
                TokenKind::RParen => opening_count -= 1,
                TokenKind::LParen => opening_count += 1,
                _ => {}
            }
            if self.ended() {
                return Err(ParsingError::truncated_input(
                    self.location(),
                    "Hit end of file before balanced parens",
                )
                .into());
            }
        }
        self.consume_expected(TokenKind::RParen, "consume_until_balanced_paren should end in RPAREN")
    }
}

/// Reads the next token, skipping whitespace and comments.
fn read_token<S: ByteSource>(parser: &mut ByteParser<S>) -> Result<Token, MorphError> {
    parser.skip_comment_and_whitespace(b';');
    let line = parser.line();
    let token = |kind: TokenKind, text: &str| Token { kind, text: text.to_string(), line };

    let Some(byte) = parser.peek() else {
        return Ok(token(TokenKind::Eof, ""));
    };
    match byte {
        b'(' => {
            parser.next_byte();
            Ok(token(TokenKind::LParen, "("))
        }
        b')' => {
            parser.next_byte();
            if parser.consume_if(b'>') {
                Ok(token(TokenKind::RSpine, ")>"))
            } else {
                Ok(token(TokenKind::RParen, ")"))
            }
        }
        b'<' => {
            parser.next_byte();
            while matches!(parser.peek(), Some(b' ' | b'\t' | b'\r')) {
                parser.next_byte();
            }
            if parser.consume_if(b'(') {
                Ok(token(TokenKind::LSpine, "<("))
            } else {
                Err(ParsingError::unknown_token(parser.location(), "<").into())
            }
        }
        b',' => {
            parser.next_byte();
            Ok(token(TokenKind::Comma, ","))
        }
        b'|' => {
            parser.next_byte();
            Ok(token(TokenKind::Pipe, "|"))
        }
        b'"' => {
            parser.next_byte();
            let start = parser.position();
            if !parser.consume_until(b'"', ConsumeMode::Exclusive) {
                return Err(ParsingError::truncated_input(parser.location(), "Hit end of file inside a string").into());
            }
            let content = String::from_utf8_lossy(parser.slice_from(start)).into_owned();
            parser.next_byte();
            Ok(Token { kind: TokenKind::String, text: format!("\"{content}\""), line })
        }
        _ => {
            let text = String::from_utf8_lossy(parser.consume_token(ASC_DELIMITERS)).into_owned();
            if text.is_empty() {
                // a stray delimiter such as '>'
                parser.next_byte();
                return Err(ParsingError::unknown_token(parser.location(), (byte as char).to_string()).into());
            }
            let kind = match text.as_bytes()[0] {
                b'0'..=b'9' | b'+' | b'-' | b'.' => TokenKind::Number,
                b'a'..=b'z' | b'A'..=b'Z' => TokenKind::from_word(&text),
                _ => return Err(ParsingError::unknown_token(Location::new(parser.uri(), line), text).into()),
            };
            Ok(Token { kind, text, line })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::byte_source::InMemoryByteSource;

    fn lexer(input: &str) -> AscLexer<InMemoryByteSource> {
        AscLexer::new(ByteParser::for_str(input)).unwrap()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = lexer(input);
        let mut kinds = Vec::new();
        while !lexer.ended() {
            kinds.push(lexer.current().kind);
            lexer.consume().unwrap();
        }
        kinds
    }

    #[test]
    fn test_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("(\"CellBody\" (Color Red) ; comment\n (1 +2.5 -3e2 4) | <( )> Dot12 Dots)"),
            vec![
                LParen, String, LParen, Color, Word, RParen, LParen, Number, Number, Number, Number, RParen, Pipe,
                LSpine, RSpine, Marker, Word, RParen
            ]
        );
    }

    #[test]
    fn test_lines_and_lookahead() {
        let mut lexer = lexer("(\n\n  Axon)");
        assert_eq!(lexer.peek().kind, TokenKind::Axon);
        lexer.consume().unwrap();
        assert_eq!(lexer.line(), 3);
        assert_eq!(lexer.current().text, "Axon");
    }

    #[test]
    fn test_unbalanced_group() {
        let mut lexer = lexer("(Color (RGB 1 2 3)");
        let err = lexer.consume_until_balanced_paren().unwrap_err();
        assert!(err.to_string().contains("Hit end of file before balanced parens"));
    }

    #[test]
    fn test_marker_words() {
        assert!(is_marker_word("FilledCircle"));
        assert!(is_marker_word("Dot3"));
        assert!(!is_marker_word("Dots"));
    }
}
