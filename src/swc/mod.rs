//! SWC format reader and writer.
//!
//! # Format
//! One sample per line: `id type x y z radius parent_id`.
//! * `#` starts a comment, whole line or trailing
//! * Blank lines are ignored, whitespace is arbitrary
//! * Extra trailing columns are ignored
//! * Diameters are stored as `2 * radius`
//!
//! Sections are built walking the samples depth first from the roots. A
//! section ends at the last soma sample, at a leaf or at a neurite
//! bifurcation; the next section starts with a copy of its parent's last
//! sample unless the file already repeats it.
//!
//! # Quick API
//! * [parse_str] - parses a string with default [LoadOptions]
//! * [parse_file] - parses a file
//! * [write_file] - writes a morphology
//!
//! The `_with` variants take an explicit [Diagnostics] sink, which keeps
//! the collected warnings.

mod parser;
mod writer;

pub use self::writer::{to_swc_string, write_swc};

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
/// Parses an SWC string with default options.
///
/// # Example
/// ```
/// use neuromorph::model::SomaType;
///
/// let morph = neuromorph::swc::parse_str(
///     "1 1 0 0 0 1 -1\n\
///      2 3 0 0 0 1  1\n\
///      3 3 0 5 0 1  2\n",
/// ).unwrap();
/// assert_eq!(morph.soma().soma_type(), SomaType::SinglePoint);
/// assert_eq!(morph.section_count(), 1);
/// ```
pub fn parse_str(content: &str) -> Result<MutableMorphology, MorphError> {
    let options = LoadOptions::default();
    let mut diagnostics = options.diagnostics();
    parse_str_with(content, STRING_URI, &options, &mut diagnostics)
}

/// Parses SWC content, reporting diagnostics against `uri`.
///
/// # Errors
/// A [ParsingError](crate::parser::ParsingError) naming the offending line,
/// or a raised warning.
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
    debug!("Parsing SWC {uri}");
    let mut byte_parser = ByteParser::for_bytes(content).with_uri(uri);
    let mut morph = parser::SwcParser::new(uri, options, diagnostics).parse(&mut byte_parser)?;
    apply_modifiers(&mut morph, options.modifiers());
    Ok(morph)
}

/// Parses an SWC file.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<MutableMorphology, MorphError> {
    let mut diagnostics = options.diagnostics();
    parse_file_with(path, options, &mut diagnostics)
}

/// Parses an SWC file into the given diagnostics sink.
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
/// Writes a morphology to an SWC file. Nothing is created for an empty
/// morphology.
pub fn write_file<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    options: &WriteOptions,
) -> Result<(), MorphError> {
    let mut diagnostics = options.diagnostics();
    write_file_with(morph, path, &mut diagnostics)
}

/// Writes a morphology to an SWC file into the given diagnostics sink.
pub fn write_file_with<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    diagnostics: &mut Diagnostics,
) -> Result<(), MorphError> {
    if let Some(content) = to_swc_string(morph, diagnostics)? {
        let mut writer = BufWriter::new(File::create(path)?);
        std::io::Write::write_all(&mut writer, content.as_bytes())?;
        std::io::Write::flush(&mut writer)?;
    }
    Ok(())
}
