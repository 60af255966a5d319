//! Columnar (`.h5`) reader and writer.
//!
//! # Format
//! A [TableStore] of named, typed 2D tables:
//! * `points`: one `x y z diameter` row per point, soma points first
//! * `structure`: one `offset type parent` row per section. Row 0 is the
//!   soma, the parent of a section is the row of its parent section, and
//!   roots have parent 0 (or -1)
//! * `perimeters`: optional, one value per point, zero for soma points
//! * `metadata/cell_family`
//! * `organelles/...`: mitochondria, endoplasmic reticulum and post-synaptic
//!   densities
//!
//! The soma points are read as a contour. Sections keep the duplicate of
//! their parent's last point, as stored.
//!
//! A merged container holds several morphologies, each table being named
//! `"{name}/{table}"`. See [ContainerWriter] and
//! [Collection](crate::collection::Collection).
//!
//! # Quick API
//! * [parse_bytes] - reads a single-morphology container from memory
//! * [parse_file] - reads a file
//! * [write_file] - writes a morphology

mod reader;
mod table_store;
mod writer;

pub use self::table_store::{Table, TableData, TableStore};
pub use self::writer::{ContainerWriter, to_table_store, write_columnar};

pub(crate) use self::reader::{ColumnarReader, check_version};

use crate::diagnostics::{Diagnostics, STRING_URI};
use crate::error::MorphError;
use crate::model::MutableMorphology;
use crate::options::{LoadOptions, WriteOptions};
use crate::sanitize::apply_modifiers;
use std::path::Path;

/// Schema version written by this crate, as `(major, minor)`
pub const CURRENT_VERSION: (u32, u32) = (1, 3);

/// Table names of one morphology.
pub(crate) mod tables {
    pub const POINTS: &str = "points";
    pub const STRUCTURE: &str = "structure";
    pub const PERIMETERS: &str = "perimeters";
    pub const CELL_FAMILY: &str = "metadata/cell_family";
    pub const MITO_POINTS: &str = "organelles/mitochondria/points";
    pub const MITO_STRUCTURE: &str = "organelles/mitochondria/structure";
    pub const ER_SECTION_INDEX: &str = "organelles/endoplasmic_reticulum/section_index";
    pub const ER_VOLUME: &str = "organelles/endoplasmic_reticulum/volume";
    pub const ER_SURFACE_AREA: &str = "organelles/endoplasmic_reticulum/surface_area";
    pub const ER_FILAMENT_COUNT: &str = "organelles/endoplasmic_reticulum/filament_count";
    pub const PSD_SECTION_ID: &str = "organelles/postsynaptic_density/section_id";
    pub const PSD_SEGMENT_ID: &str = "organelles/postsynaptic_density/segment_id";
    pub const PSD_OFFSET: &str = "organelles/postsynaptic_density/offset";
}

/// Names of the morphologies of a merged container, in file order.
///
/// Empty for a single-morphology store.
pub(crate) fn container_names(store: &TableStore) -> Vec<String> {
    store
        .names()
        .filter_map(|table| table.strip_suffix("/structure"))
        .filter(|name| !name.contains('/'))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Reads a single-morphology container from memory with default options.
pub fn parse_bytes(content: &[u8]) -> Result<MutableMorphology, MorphError> {
    let options = LoadOptions::default();
    let mut diagnostics = options.diagnostics();
    parse_bytes_with(content, STRING_URI, &options, &mut diagnostics)
}

/// Reads a single-morphology container, reporting errors against `uri`.
///
/// # Errors
/// - [InvalidContainer](crate::parser::ParsingErrorType::InvalidContainer)
///   for malformed tables
/// - [UnsupportedVersion](crate::parser::ParsingErrorType::UnsupportedVersion)
///   for the legacy version 2 or an unknown version
/// - [UnsupportedSectionType](crate::parser::ParsingErrorType::UnsupportedSectionType)
///   for a section type outside `0..=10`
pub fn parse_bytes_with(
    content: &[u8],
    uri: &str,
    options: &LoadOptions,
    diagnostics: &mut Diagnostics,
) -> Result<MutableMorphology, MorphError> {
    let store = TableStore::read_from(content, uri)?;
    read_store(&store, "", uri, options, diagnostics)
}

/// Reads the morphology stored under `prefix` in an already decoded store.
pub(crate) fn read_store(
    store: &TableStore,
    prefix: &str,
    uri: &str,
    options: &LoadOptions,
    diagnostics: &mut Diagnostics,
) -> Result<MutableMorphology, MorphError> {
    let mut morph = ColumnarReader::new(store, prefix, uri).read(diagnostics)?;
    apply_modifiers(&mut morph, options.modifiers());
    Ok(morph)
}

/// Reads a single-morphology container file.
pub fn parse_file<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<MutableMorphology, MorphError> {
    let mut diagnostics = options.diagnostics();
    parse_file_with(path, options, &mut diagnostics)
}

/// Reads a single-morphology container file into the given diagnostics sink.
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
/// Writes a morphology to a container file. Nothing is created for an
/// empty morphology.
pub fn write_file<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    options: &WriteOptions,
) -> Result<(), MorphError> {
    let mut diagnostics = options.diagnostics();
    write_file_with(morph, path, &mut diagnostics)
}

/// Writes a morphology to a container file into the given diagnostics sink.
pub fn write_file_with<P: AsRef<Path>>(
    morph: &MutableMorphology,
    path: P,
    diagnostics: &mut Diagnostics,
) -> Result<(), MorphError> {
    if let Some(mut store) = to_table_store(morph, diagnostics)? {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        store.write_to(&mut writer)?;
        std::io::Write::flush(&mut writer)?;
    }
    Ok(())
}
