//! Neurolucida parsing.

use crate::asc::lexer::{AscLexer, TokenKind};
use crate::diagnostics::{Diagnostics, Location, Warning};
use crate::error::MorphError;
use crate::model::geometry::{self, EPSILON};
use crate::model::{Marker, MutableMorphology, Point, PointLevel, SectionId, SectionType, SomaConvention};
use crate::parser::byte_source::ByteSource;
use crate::parser::{ParsingError, ParsingErrorType};
use tracing::trace;

/// Label of the marker left by an `Incomplete` branch end
pub const INCOMPLETE_MARKER: &str = "INCOMPLETE";

/// What the points of a group describe.
#[derive(Debug, Clone, PartialEq)]
enum GroupKind {
    CellBody,
    Neurite(SectionType),
    /// A labelled point set: string-named top level groups and marker shapes
    Marker(String),
}

/// Header of a group: its kind and where its points go.
#[derive(Debug, Clone)]
struct Header {
    kind: GroupKind,
    /// Parent section of a neurite section, or section of a marker
    parent: Option<SectionId>,
}

impl Header {
    fn top_level() -> Self {
        Self { kind: GroupKind::Marker(String::new()), parent: None }
    }
}

/// Recursive descent over the top level groups of a Neurolucida file.
pub(crate) struct AscParser<'a, S: ByteSource> {
    lexer: AscLexer<S>,
    morph: MutableMorphology,
    soma_line: Option<usize>,
    uri: String,
    diagnostics: &'a mut Diagnostics,
}

impl<'a, S: ByteSource> AscParser<'a, S> {
    pub fn new(lexer: AscLexer<S>, uri: &str, diagnostics: &'a mut Diagnostics) -> Self {
        Self { lexer, morph: MutableMorphology::new(), soma_line: None, uri: uri.to_string(), diagnostics }
    }

    /// Parses all top level groups.
    ///
    /// # Errors
    /// A [ParsingError] for malformed input, [MorphError::Soma] for a soma
    /// contour made of a single point, or a raised warning.
    pub fn parse(mut self) -> Result<MutableMorphology, MorphError> {
        self.parse_root_groups()?;
        if self.soma_line.is_none() {
            self.diagnostics.emit(Warning::no_soma_found(&self.uri))?;
        }
        let uri = self.uri;
        let mut morph = self.morph.with_uri(uri.as_str());
        morph.set_soma_convention(SomaConvention::Contour);
        if morph.soma().points().len() == 1 {
            return Err(MorphError::Soma(format!(
                "Morphology contour with only a single point is not valid: {uri}"
            )));
        }
        Ok(morph)
    }

    fn parse_root_groups(&mut self) -> Result<(), MorphError> {
        while !self.lexer.ended() {
            if self.lexer.current().kind == TokenKind::LParen {
                self.lexer.consume()?;
                let header = self.parse_root_header()?;
                if self.lexer.current().kind != TokenKind::RParen {
                    self.parse_section(&header)?;
                }
            }
            if !self.lexer.ended() {
                self.lexer.consume()?;
            }
        }
        Ok(())
    }

    /// Reads the leading part of a top level group up to its first point.
    fn parse_root_header(&mut self) -> Result<Header, MorphError> {
        let mut header = Header::top_level();
        loop {
            let current = self.lexer.current().kind;
            let peek = self.lexer.peek().kind;
            match current {
                TokenKind::Eof => return Err(self.eof_in_neurite()),
                TokenKind::Marker => {
                    header.kind = GroupKind::Marker(self.lexer.current().text.clone());
                    self.lexer.consume()?;
                }
                TokenKind::Word => {
                    self.lexer.consume_until_balanced_paren()?;
                    self.lexer.consume_expected(TokenKind::LParen, "")?;
                }
                TokenKind::String => {
                    let text = &self.lexer.current().text;
                    let label = text.trim_matches('"').to_string();
                    // early files name the soma in a string
                    let normalized: String = label.chars().filter(|c| *c != ' ').collect();
                    header.kind = if normalized.eq_ignore_ascii_case("cellbody") {
                        GroupKind::CellBody
                    } else {
                        GroupKind::Marker(label)
                    };
                    self.lexer.consume()?;
                }
                TokenKind::RParen => return Ok(header),
                TokenKind::LParen if peek.is_skipped_group() => {
                    self.lexer.consume_until_balanced_paren()?;
                    if peek == TokenKind::Font {
                        self.lexer.consume_until_balanced_paren()?;
                    }
                }
                TokenKind::LParen if peek.is_neurite_type() => {
                    header.kind = match peek {
                        TokenKind::Axon => GroupKind::Neurite(SectionType::Axon),
                        TokenKind::Apical => GroupKind::Neurite(SectionType::ApicalDendrite),
                        TokenKind::Dendrite => GroupKind::Neurite(SectionType::BasalDendrite),
                        _ => GroupKind::CellBody,
                    };
                    self.lexer.consume()?;
                    self.lexer.consume()?;
                    self.lexer.consume_expected(TokenKind::RParen, "New Neurite should end in RPAREN")?;
                }
                TokenKind::LParen if peek == TokenKind::Number => return Ok(header),
                TokenKind::LParen => return Err(self.unknown_token(self.lexer.peek().text.clone())),
                _ => return Err(self.unknown_token(self.lexer.current().text.clone())),
            }
        }
    }

    /// Parses the points of one section and its child branches, up to the
    /// `)` or `|` that ends it.
    fn parse_section(&mut self, header: &Header) -> Result<(), MorphError> {
        let mut level = PointLevel::default();
        // line of the first point of `level`
        let mut first_line = self.lexer.line();
        // id the section will get once created
        let mut section_id = Some(self.morph.sections.len());
        let is_marker = matches!(header.kind, GroupKind::Marker(_));

        loop {
            let current = self.lexer.current().kind;
            let peek = self.lexer.peek().kind;
            match current {
                TokenKind::Eof => return Err(self.eof_in_neurite()),
                kind if kind.is_end_of_section() => {
                    if !level.is_empty() {
                        self.create_group(header, std::mem::take(&mut level), first_line)?;
                    }
                    return Ok(());
                }
                kind if kind.is_end_of_branch() => {
                    if kind == TokenKind::Incomplete {
                        let section = section_id.map_or(-1, |id| id as i64);
                        self.morph.add_marker(Marker::new(INCOMPLETE_MARKER, PointLevel::default(), section));
                        if !peek.is_end_of_section() {
                            return Err(ParsingError::new(
                                ParsingErrorType::UnexpectedToken {
                                    expected: TokenKind::RParen.to_string(),
                                    got: self.lexer.peek().text.clone(),
                                    message: "'Incomplete' tag must finish the branch.".to_string(),
                                },
                                self.lexer.location(),
                            )
                            .into());
                        }
                    }
                    self.lexer.consume()?;
                }
                TokenKind::LSpine => {
                    while !self.lexer.ended() && self.lexer.current().kind != TokenKind::RSpine {
                        self.lexer.consume()?;
                    }
                    self.lexer.consume_expected(TokenKind::RSpine, "Must be end of spine")?;
                }
                TokenKind::LParen if peek.is_skipped_group() => self.lexer.consume_until_balanced_paren()?,
                TokenKind::LParen if peek == TokenKind::Marker => {
                    let marker = Header {
                        kind: GroupKind::Marker(self.lexer.peek().text.clone()),
                        parent: section_id,
                    };
                    self.lexer.consume_until(TokenKind::LParen)?;
                    self.parse_section(&marker)?;
                    self.lexer.consume_expected(TokenKind::RParen, "Marker should end with RPAREN")?;
                }
                TokenKind::LParen if peek == TokenKind::Number => {
                    let line = self.lexer.line();
                    let (point, diameter) = self.parse_point(is_marker)?;
                    if level.is_empty() {
                        first_line = line;
                    }
                    if !is_marker && diameter < EPSILON {
                        self.diagnostics.emit(Warning::zero_diameter(Location::new(self.uri.as_str(), line)))?;
                    }
                    level.push(point, diameter, None);
                }
                TokenKind::LParen if peek == TokenKind::LParen => {
                    if !level.is_empty() {
                        section_id = self.create_group(header, std::mem::take(&mut level), first_line)?;
                    }
                    let child = Header { kind: header.kind.clone(), parent: section_id };
                    self.parse_branch(&child)?;
                }
                TokenKind::LParen => return Err(self.unknown_token(self.lexer.peek().text.clone())),
                TokenKind::String => self.lexer.consume()?,
                _ => return Err(self.unknown_token(self.lexer.current().text.clone())),
            }
        }
    }

    /// Sibling sections separated by `|`, enclosed in parens.
    fn parse_branch(&mut self, header: &Header) -> Result<(), MorphError> {
        self.lexer.consume_expected(TokenKind::LParen, "New branch should start with LPAREN")?;
        loop {
            self.parse_section(header)?;
            let kind = self.lexer.current().kind;
            if self.lexer.ended() || (kind != TokenKind::Pipe && kind != TokenKind::LParen) {
                break;
            }
            self.lexer.consume()?;
        }
        self.lexer.consume_expected(TokenKind::RParen, "Branch should end with RPAREN")
    }

    /// `(x y z d [Sname])`, markers may omit the diameter.
    fn parse_point(&mut self, is_marker: bool) -> Result<(Point, f64), MorphError> {
        self.lexer.expect(TokenKind::LParen, "Point should start in LPAREN")?;
        let mut values = [0.0f64; 4];
        for (i, value) in values.iter_mut().enumerate() {
            self.lexer.consume()?;
            let token = self.lexer.current();
            *value = match (token.kind, token.text.parse::<f64>()) {
                (TokenKind::Number, Ok(v)) => v,
                _ => {
                    return Err(ParsingError::new(
                        ParsingErrorType::InvalidNumber(token.text.clone()),
                        self.lexer.location(),
                    )
                    .into());
                }
            };
            if is_marker && i == 2 && self.lexer.peek().kind == TokenKind::RParen {
                break;
            }
        }
        self.lexer.consume()?;
        if self.lexer.current().kind == TokenKind::Word {
            self.lexer.consume()?;
        }
        self.lexer.consume_expected(TokenKind::RParen, "Point should end in RPAREN")?;
        Ok(([values[0], values[1], values[2]], values[3]))
    }

    /// Stores the points of a finished group, whose first point is on `line`.
    ///
    /// # Returns
    /// Section the following child branches attach to
    fn create_group(
        &mut self,
        header: &Header,
        mut level: PointLevel,
        line: usize,
    ) -> Result<Option<SectionId>, MorphError> {
        match &header.kind {
            GroupKind::Marker(label) => {
                let section = header.parent.map_or(-1, |id| id as i64);
                self.morph.add_marker(Marker::new(label.clone(), level, section));
                Ok(None)
            }
            GroupKind::CellBody => {
                if let Some(first) = self.soma_line {
                    return Err(ParsingError::new(
                        ParsingErrorType::SomaAlreadyDefined(Location::new(self.lexer.location().uri(), first)),
                        self.lexer.location(),
                    )
                    .into());
                }
                self.soma_line = Some(line);
                self.morph.set_soma_point_level(level);
                Ok(None)
            }
            GroupKind::Neurite(section_type) => {
                let parent = header.parent.filter(|&p| self.morph.section(p).is_ok());
                if let Some(p) = parent {
                    self.insert_parent_last_point(p, &mut level, line)?;
                    // a lone copy of the parent's last point adds nothing
                    if level.len() == 1 {
                        return Ok(Some(p));
                    }
                }
                trace!("ASC section of type {section_type} with {} points", level.len());
                let id = self.morph.attach_section(parent, level, *section_type);
                self.morph.section_mut(id)?.set_source_line(line);
                Ok(Some(id))
            }
        }
    }

    /// Makes the section start with its parent's last point, with the
    /// diameter of the section's own first point.
    ///
    /// An explicit copy of the parent's last point keeps its own diameter;
    /// a different one from the parent's is warned about.
    fn insert_parent_last_point(
        &mut self,
        parent: SectionId,
        level: &mut PointLevel,
        line: usize,
    ) -> Result<(), MorphError> {
        let Some(last) = self.morph.section(parent)?.point_level().last_sample() else {
            return Ok(());
        };
        let Some(first) = level.first_sample() else {
            return Ok(());
        };
        let last_point = [last[0], last[1], last[2]];
        if !geometry::points_equal(&last_point, &[first[0], first[1], first[2]]) {
            level.insert_front(last_point, first[3], None);
        } else if (last[3] - first[3]).abs() > EPSILON {
            let location = Location::new(self.uri.as_str(), line);
            self.diagnostics.emit(Warning::duplicate_diameter_differs(location, last[3], first[3]))?;
        }
        Ok(())
    }

    fn eof_in_neurite(&self) -> MorphError {
        ParsingError::truncated_input(self.lexer.location(), "Hit end of file while consuming a neurite").into()
    }

    fn unknown_token(&self, token: String) -> MorphError {
        ParsingError::unknown_token(self.lexer.location(), token).into()
    }
}
