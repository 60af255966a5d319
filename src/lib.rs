//! Neuromorph is a library to read, edit and write neuronal morphologies.
//!
//! A morphology is a soma plus a forest of neurite sections, each section
//! being a polyline of 3D points with a diameter per point. This crate
//! offers readers and writers for three file formats and a model to work
//! with the result. Core functionality provided:
//! - SWC: one sample per line, see [crate::swc].
//! - Neurolucida: parenthesized `.asc` files, see [crate::asc].
//! - Columnar: typed table container (`.h5`), and merged containers of many
//!   morphologies, see [crate::columnar].
//! - Models:
//!   - [MutableMorphology]: editable arena of sections.
//!   - [Morphology]: immutable snapshot with flattened point arrays.
//!   - Both use the arena pattern: sections are referred to by id only,
//!     traversal goes through [SectionTree](crate::model::SectionTree).
//!   - See [crate::model] for more details.
//! - Sanitation: unifurcation removal, post-load [modifiers](crate::model::Modifiers)
//!   and a structural diff, see [crate::sanitize].
//! - Vasculature: read-only vessel graphs with typed sections, stored in the
//!   columnar container, see [crate::vasculature].
//! - Collections: named access to a directory or a merged container, with
//!   a parallel unordered loader, see [crate::collection].
//! - Diagnostics: recoverable problems are reported as warnings, which a
//!   [WarningPolicy](crate::diagnostics::WarningPolicy) prints, collects or
//!   raises as errors.
//!
//! Limitations:
//! - No dendritic spine geometry beyond post-synaptic densities
//! - Vasculature graphs are read-only, with no mutable model
//! - Columnar containers only in this crate's own table layout
//!
//! # Usage patterns
//! 1. [load_file] and [write_file] pick the format from the file extension.
//! 2. The format modules offer `parse_str` / `parse_file` / `write_file`
//!    functions, their `_with` variants take an explicit
//!    [Diagnostics](crate::diagnostics::Diagnostics) sink.
//!
//! ## Example
//! ```
//! use neuromorph::model::{SectionTree, SectionType};
//!
//! let mut morph = neuromorph::swc::parse_str(
//!     "1 1 0 0 0 1 -1\n\
//!      2 3 0 0 0 1 1\n\
//!      3 3 0 4 0 1 2\n\
//!      4 3 0 6 0 1 3\n\
//!      5 3 2 8 0 1 4\n\
//!      6 3 -2 8 0 1 4\n",
//! )
//! .unwrap();
//! assert_eq!(morph.section_count(), 3);
//!
//! let frozen = morph.to_immutable();
//! let types: Vec<SectionType> = frozen.depth_first().map(|id| frozen.section(id).unwrap().section_type()).collect();
//! assert_eq!(types, vec![SectionType::BasalDendrite; 3]);
//!
//! morph.delete_section(1, true).unwrap();
//! assert_eq!(morph.leaves(), vec![2]);
//! ```

pub mod asc;
pub mod collection;
pub mod columnar;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod options;
pub mod parser;
pub mod sanitize;
pub mod swc;
pub mod vasculature;

mod write_checks;

pub use crate::collection::Collection;
pub use crate::error::{MorphError, WriteError};
pub use crate::model::{Morphology, MutableMorphology};
pub use crate::options::{LoadOptions, WriteOptions};

use crate::diagnostics::Diagnostics;
use std::path::Path;

/// File formats, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Swc,
    Asc,
    Columnar,
}

impl Format {
    fn of(path: &Path) -> Result<Self, MorphError> {
        let extension = path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("swc") => Ok(Format::Swc),
            Some("asc") => Ok(Format::Asc),
            Some("h5") => Ok(Format::Columnar),
            _ => Err(MorphError::UnsupportedExtension(path.display().to_string())),
        }
    }
}

// ============================================================================
// Quick Loading API
// ============================================================================
/// Loads a morphology file as immutable, the format being given by the
/// extension (`swc`, `asc` or `h5`, any case).
///
/// # Errors
/// - [MorphError::UnsupportedExtension] for another extension
/// - [MorphError::Io] if the file cannot be read
/// - Any error of the format reader
pub fn load_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Morphology, MorphError> {
    Ok(load_mutable_file(path, options)?.to_immutable())
}

/// Loads a morphology file as mutable, see [load_file].
pub fn load_mutable_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<MutableMorphology, MorphError> {
    let mut diagnostics = options.diagnostics();
    load_mutable_file_with(path, options, &mut diagnostics)
}

/// Loads a morphology file as mutable into the given diagnostics sink.
pub fn load_mutable_file_with<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
    diagnostics: &mut Diagnostics,
) -> Result<MutableMorphology, MorphError> {
    let path = path.as_ref();
    match Format::of(path)? {
        Format::Swc => swc::parse_file_with(path, options, diagnostics),
        Format::Asc => asc::parse_file_with(path, options, diagnostics),
        Format::Columnar => columnar::parse_file_with(path, options, diagnostics),
    }
}

// ============================================================================
// Quick Writing API
// ============================================================================
/// Writes a morphology, the format being given by the extension of `path`.
///
/// Nothing is written for an empty morphology.
///
/// # Errors
/// - [MorphError::UnsupportedExtension] for an extension other than `swc`,
///   `asc` or `h5`
/// - [MorphError::Write] if the morphology does not fit the format
pub fn write_file<P: AsRef<Path>>(morph: &MutableMorphology, path: P, options: &WriteOptions) -> Result<(), MorphError> {
    let mut diagnostics = options.diagnostics();
    write_file_with(morph, path, &mut diagnostics)
}

/// Writes a morphology into the given diagnostics sink, see [write_file].
pub fn write_file_with<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    diagnostics: &mut Diagnostics,
) -> Result<(), MorphError> {
    let path = path.as_ref();
    match Format::of(path)? {
        Format::Swc => swc::write_file_with(morph, path, diagnostics),
        Format::Asc => asc::write_file_with(morph, path, diagnostics),
        Format::Columnar => columnar::write_file_with(morph, path, diagnostics),
    }
}
