//! Neurolucida (`.asc`) reader and writer.
//!
//! # Format
//! Parenthesized groups, whitespace insensitive, `;` starts a comment.
//! * One top level group per tree: a `CellBody` soma contour or a neurite
//!   tagged `(Axon)`, `(Dendrite)` or `(Apical)`
//! * A point is `(x y z d)`, optionally followed by a name (`S1`)
//! * Nested groups are child sections, siblings are separated by `|`
//! * `Color`, `Font`, `Name`, `Resolution` and other word groups are
//!   skipped, as are spines `<( ... )>` and branch end tags like `Normal`
//! * Marker shapes (`Dot`, `FilledCircle`, ...) are kept as [Marker]s
//!
//! A child section starting right after its parent's last point gets that
//! point prepended, with the child's own first diameter.
//!
//! # Example
//! ```
//! use neuromorph::model::SomaType;
//!
//! let morph = neuromorph::asc::parse_str(
//!     "(\"CellBody\" (Color Red) (CellBody)
//!        (0 0 0 2) (1 0 0 2) (0 1 0 2))
//!      ((Dendrite)
//!        (0 0 0 2) (0 5 0 2)
//!        (
//!          (-5 5 0 1) (-6 6 0 1)
//!        |
//!          (5 5 0 1)
//!        )
//!      )",
//! ).unwrap();
//! assert_eq!(morph.soma().soma_type(), SomaType::SimpleContour);
//! assert_eq!(morph.section_count(), 3);
//! ```
//!
//! [Marker]: crate::model::Marker

mod lexer;
mod parser;
mod writer;

pub use self::parser::INCOMPLETE_MARKER;
pub use self::writer::{to_asc_string, write_asc};

use crate::diagnostics::{Diagnostics, STRING_URI};
use crate::error::MorphError;
use crate::model::MutableMorphology;
use crate::options::{LoadOptions, WriteOptions};
use crate::parser::ByteParser;
use crate::sanitize::apply_modifiers;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a Neurolucida string with default options.
pub fn parse_str(content: &str) -> Result<MutableMorphology, MorphError> {
    let options = LoadOptions::default();
    let mut diagnostics = options.diagnostics();
    parse_str_with(content, STRING_URI, &options, &mut diagnostics)
}

/// Parses Neurolucida content, reporting errors against `uri`.
///
/// # Errors
/// A [ParsingError](crate::parser::ParsingError) naming the offending line,
/// or [MorphError::Soma] for a soma contour of a single point.
pub fn parse_str_with(
    content: &str,
    uri: &str,
    options: &LoadOptions,
    diagnostics: &mut Diagnostics,
) -> Result<MutableMorphology, MorphError> {
    parse_bytes_with(content.as_bytes(), uri, options, diagnostics)
}

pub(crate) fn parse_bytes_with(
    content: &[u8],
    uri: &str,
    options: &LoadOptions,
    diagnostics: &mut Diagnostics,
) -> Result<MutableMorphology, MorphError> {
    debug!("Parsing ASC {uri}");
    let byte_parser = ByteParser::for_bytes(content).with_uri(uri);
    let lexer = lexer::AscLexer::new(byte_parser)?;
    let mut morph = parser::AscParser::new(lexer, uri, diagnostics).parse()?;
    apply_modifiers(&mut morph, options.modifiers());
    Ok(morph)
}

/// Parses a Neurolucida file.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<MutableMorphology, MorphError> {
    let mut diagnostics = options.diagnostics();
    parse_file_with(path, options, &mut diagnostics)
}

/// Parses a Neurolucida file into the given diagnostics sink.
pub fn parse_file_with<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
    diagnostics: &mut Diagnostics,
) -> Result<MutableMorphology, MorphError> {
    let content = std::fs::read(path.as_ref())?;
    parse_bytes_with(&content, &path.as_ref().to_string_lossy(), options, diagnostics)
}

// ============================================================================
// QUICK WRITING API (pub)
// ============================================================================
/// Writes a morphology to a Neurolucida file. Nothing is created for an
/// empty morphology.
pub fn write_file<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    options: &WriteOptions,
) -> Result<(), MorphError> {
    let mut diagnostics = options.diagnostics();
    write_file_with(morph, path, &mut diagnostics)
}

/// Writes a morphology to a Neurolucida file into the given diagnostics sink.
pub fn write_file_with<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    diagnostics: &mut Diagnostics,
) -> Result<(), MorphError> {
    if let Some(content) = to_asc_string(morph, diagnostics)? {
        let mut writer = BufWriter::new(File::create(path)?);
        std::io::Write::write_all(&mut writer, content.as_bytes())?;
        std::io::Write::flush(&mut writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SectionTree, SectionType, SomaType};
    use crate::parser::ParsingErrorType;

    #[test]
    fn test_explicit_and_implicit_duplicates_agree() {
        let explicit = parse_str(
            "((Dendrite) (3 -8 0 5) (3 -10 0 5)
               ( (3 -10 0 2) (0 -10 0 2) (-3 -10 0 2)
               | (3 -10 0 2) (6 -10 0 2) (9 -10 0 2) ))",
        )
        .unwrap();
        let implicit = parse_str(
            "((Dendrite) (3 -8 0 5) (3 -10 0 5)
               ( (0 -10 0 2) (-3 -10 0 2)
               | (6 -10 0 2) (9 -10 0 2) ))",
        )
        .unwrap();
        assert!(explicit == implicit);
        let first_child = implicit.section(1).unwrap();
        assert_eq!(first_child.points()[0], [3., -10., 0.]);
        assert_eq!(first_child.diameters(), &[2., 2., 2.]);
    }

    #[test]
    fn test_skips_decorations_and_keeps_markers() {
        let morph = parse_str(
            "; header comment
             (ImageCoords Filename \"x.jpg\" Merge 65535 65535 65535 0)
             ((Color Yellow) (Axon) (Name \"axon 1\")
               (0 0 0 1 S1) (0 5 0 1 S2)
               (Dot (Color White) (Name \"spot\") (1 2 3) (4 5 6 0.5))
               <(1 1 1 1)>
               Normal
             )",
        )
        .unwrap();
        assert_eq!(morph.section_count(), 1);
        assert_eq!(morph.section(0).unwrap().section_type(), SectionType::Axon);
        let marker = &morph.markers()[0];
        assert_eq!(marker.label, "Dot");
        assert_eq!(marker.section_id, 0);
        assert_eq!(marker.point_level.diameters, vec![0., 0.5]);
        assert_eq!(morph.soma().soma_type(), SomaType::Undefined);
    }

    #[test]
    fn test_single_point_child_is_dropped() {
        let morph = parse_str(
            "((Dendrite) (0 0 0 1) (0 1 0 1)
               ( (0 1 0 1)
                 ( (1 2 0 1) (1 3 0 1) | (-1 2 0 1) (-1 3 0 1) )
               | (0 2 0 1) (0 3 0 1) ))",
        )
        .unwrap();
        assert_eq!(morph.section(0).unwrap().children().len(), 3);
        assert_eq!(morph.leaves().len(), 3);
    }

    #[test]
    fn test_incomplete_marker() {
        let morph = parse_str("((Axon) (0 0 0 1) (0 1 0 1) Incomplete)").unwrap();
        assert_eq!(morph.markers()[0].label, INCOMPLETE_MARKER);
        assert_eq!(morph.markers()[0].section_id, 0);

        let err = parse_str("((Axon) (0 0 0 1) (0 1 0 1) Incomplete (0 2 0 1))").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Expected: ) but got ("), "{message}");
        assert!(message.contains("'Incomplete' tag must finish the branch."));
    }

    #[test]
    fn test_errors_carry_lines() {
        let err = parse_str("((Dendrite)\n (0 0 0 1)\n (0 1 zero 1)))").unwrap_err();
        let parsing = err.as_parsing().unwrap();
        assert_eq!(parsing.kind(), &ParsingErrorType::InvalidNumber("zero".to_string()));
        assert_eq!(parsing.line(), Some(3));

        let err = parse_str("((Dendrite)\n (0 0 0 1)\n").unwrap_err();
        assert!(err.to_string().contains("Hit end of file while consuming a neurite"));

        let soma = "(\"CellBody\" (CellBody) (0 0 0 1) (1 0 0 1) (0 1 0 1))\n";
        let err = parse_str(&format!("{soma}{soma}")).unwrap_err();
        assert!(matches!(err.as_parsing().unwrap().kind(), ParsingErrorType::SomaAlreadyDefined(_)));

        let err = parse_str("((CellBody) (0 0 0 1))").unwrap_err();
        assert!(err.to_string().contains("Morphology contour with only a single point is not valid"));
    }
}
