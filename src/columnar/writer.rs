//! Columnar container writing.

use crate::columnar::table_store::{Table, TableStore};
use crate::columnar::{CURRENT_VERSION, tables};
use crate::diagnostics::Diagnostics;
use crate::error::{MorphError, WriteError};
use crate::model::{Morphology, MutableMorphology, PointLevel, SectionType};
use crate::write_checks::{check_contour_soma, check_section_continuity, check_uniform_perimeters, is_empty_morphology};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Builds the tables of a morphology into a new store.
///
/// # Returns
/// `None` for an empty morphology
///
/// # Errors
/// - [WriteError::SomaWithoutDiameter] for a single soma point lacking its diameter
/// - [WriteError::LengthMismatch] if the points, diameters or perimeters of
///   a section differ in length
/// - [WriteError::MixedPerimeterData] if only some sections have perimeters;
///   a soma without perimeters gets zeros
/// - [WriteError::DisconnectedSection] for a section not starting at its
///   parent's last point
/// - A raised warning, e.g. for a soma that is not a contour
pub fn to_table_store(
    morph: &MutableMorphology,
    diagnostics: &mut Diagnostics,
) -> Result<Option<TableStore>, MorphError> {
    let mut store = TableStore::new(CURRENT_VERSION);
    if !insert_tables(&mut store, morph, "", diagnostics)? {
        return Ok(None);
    }
    Ok(Some(store))
}

/// Writes a morphology as a single-morphology container to `writer`.
///
/// # Returns
/// `false` if nothing was written (empty morphology)
pub fn write_columnar<W: Write>(
    morph: &MutableMorphology,
    writer: &mut W,
    diagnostics: &mut Diagnostics,
) -> Result<bool, MorphError> {
    match to_table_store(morph, diagnostics)? {
        Some(mut store) => {
            store.write_to(writer)?;
            writer.flush()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Adds the tables of `morph`, named `{prefix}{table}`, to `store`.
pub(crate) fn insert_tables(
    store: &mut TableStore,
    morph: &MutableMorphology,
    prefix: &str,
    diagnostics: &mut Diagnostics,
) -> Result<bool, MorphError> {
    if is_empty_morphology(morph, diagnostics)? {
        return Ok(false);
    }
    let soma = morph.soma();
    if soma.points().len() == 1 && soma.diameters().is_empty() {
        return Err(WriteError::SomaWithoutDiameter.into());
    }
    check_contour_soma(morph, diagnostics)?;
    check_lengths(soma.point_level())?;
    for section in morph.sections() {
        check_lengths(section.point_level())?;
    }
    check_uniform_perimeters(morph)?;
    check_section_continuity(morph)?;
    debug!("Writing {} sections of {} to columnar tables", morph.section_count(), morph.uri());

    let frozen = morph.to_immutable();
    let with_perimeters = morph.has_perimeters() || soma.point_level().has_perimeters();

    let mut points: Vec<[f64; 4]> = Vec::with_capacity(soma.points().len() + frozen.points().len());
    let mut perimeters: Vec<f64> = Vec::new();
    for (point, &diameter) in soma.points().iter().zip(soma.diameters()) {
        points.push([point[0], point[1], point[2], diameter]);
    }
    if with_perimeters {
        let soma_perimeters = soma.perimeters();
        perimeters.extend((0..soma.points().len()).map(|i| soma_perimeters.get(i).copied().unwrap_or(0.0)));
    }

    let mut structure: Vec<[i32; 3]> = vec![[0, SectionType::Soma.code() as i32, -1]];
    for section in frozen.sections() {
        // row 0 is the soma, so section `i` is row `i + 1`
        let parent_on_disk = match section.parent_id() {
            Some(parent) => to_i32(parent + 1, "section id")?,
            None => 0,
        };
        structure.push([to_i32(points.len(), "point offset")?, section.section_type().code() as i32, parent_on_disk]);
        for (point, &diameter) in section.points().iter().zip(section.diameters()) {
            points.push([point[0], point[1], point[2], diameter]);
        }
        if with_perimeters {
            let section_perimeters = section.perimeters();
            perimeters.extend((0..section.points().len()).map(|i| section_perimeters.get(i).copied().unwrap_or(0.0)));
        }
    }

    let name = |table: &str| format!("{prefix}{table}");
    store.insert(name(tables::POINTS), Table::from_f64_rows(&points));
    store.insert(name(tables::STRUCTURE), Table::from_i32_rows(&structure));
    if with_perimeters {
        store.insert(name(tables::PERIMETERS), Table::f64_column(perimeters));
    }
    store.insert(name(tables::CELL_FAMILY), Table::i32_column(vec![morph.cell_family().code() as i32]));
    insert_organelles(store, &frozen, prefix)?;
    Ok(true)
}

fn insert_organelles(store: &mut TableStore, frozen: &Morphology, prefix: &str) -> Result<(), MorphError> {
    let name = |table: &str| format!("{prefix}{table}");

    let mitochondria = frozen.mitochondria();
    if !mitochondria.is_empty() {
        let mut points: Vec<[f64; 3]> = Vec::new();
        let mut structure: Vec<[i32; 2]> = Vec::new();
        for section in mitochondria.sections() {
            let parent = match section.parent() {
                Some(parent) => to_i32(parent, "mitochondrial section id")?,
                None => -1,
            };
            structure.push([to_i32(points.len(), "mitochondrial point offset")?, parent]);
            let level = section.point_level();
            for ((&id, &length), &diameter) in
                level.section_ids.iter().zip(&level.relative_path_lengths).zip(&level.diameters)
            {
                points.push([id as f64, length, diameter]);
            }
        }
        store.insert(name(tables::MITO_POINTS), Table::from_f64_rows(&points));
        store.insert(name(tables::MITO_STRUCTURE), Table::from_i32_rows(&structure));
    }

    let er = frozen.endoplasmic_reticulum();
    if !er.is_empty() {
        er.validate()?;
        let indices: Vec<i32> = er.section_indices.iter().map(|&i| to_i32(i, "section index")).collect::<Result<_, _>>()?;
        let counts: Vec<i32> = er.filament_counts.iter().map(|&c| to_i32(c as usize, "filament count")).collect::<Result<_, _>>()?;
        store.insert(name(tables::ER_SECTION_INDEX), Table::i32_column(indices));
        store.insert(name(tables::ER_VOLUME), Table::f64_column(er.volumes.clone()));
        store.insert(name(tables::ER_SURFACE_AREA), Table::f64_column(er.surface_areas.clone()));
        store.insert(name(tables::ER_FILAMENT_COUNT), Table::i32_column(counts));
    }

    let psd = frozen.post_synaptic_density();
    if !psd.is_empty() {
        let sections: Vec<i32> = psd.iter().map(|p| to_i32(p.section_id, "section id")).collect::<Result<_, _>>()?;
        let segments: Vec<i32> = psd.iter().map(|p| to_i32(p.segment_id, "segment id")).collect::<Result<_, _>>()?;
        store.insert(name(tables::PSD_SECTION_ID), Table::i32_column(sections));
        store.insert(name(tables::PSD_SEGMENT_ID), Table::i32_column(segments));
        store.insert(name(tables::PSD_OFFSET), Table::f64_column(psd.iter().map(|p| p.offset).collect()));
    }
    Ok(())
}

fn check_lengths(level: &PointLevel) -> Result<(), MorphError> {
    let points = level.points.len();
    if level.diameters.len() != points {
        return Err(WriteError::LengthMismatch {
            first: "points",
            first_len: points,
            second: "diameters",
            second_len: level.diameters.len(),
        }
        .into());
    }
    if level.has_perimeters() && level.perimeters.len() != points {
        return Err(WriteError::LengthMismatch {
            first: "points",
            first_len: points,
            second: "perimeters",
            second_len: level.perimeters.len(),
        }
        .into());
    }
    Ok(())
}

fn to_i32(value: usize, what: &str) -> Result<i32, MorphError> {
    i32::try_from(value)
        .map_err(|_| MorphError::InvalidPointLevel(format!("The {what} {value} does not fit the columnar format")))
}

// =#========================================================================#=
// CONTAINER WRITER
// =#========================================================================#=
/// Assembles several named morphologies into one merged container.
///
/// Tables of a morphology are stored as `"{name}/{table}"`, in the order the
/// morphologies are added.
///
/// # Example
/// ```
/// use neuromorph::columnar::ContainerWriter;
/// use neuromorph::diagnostics::{Diagnostics, WarningPolicy};
///
/// let cell = neuromorph::swc::parse_str("1 1 0 0 0 1 -1\n2 2 0 0 0 1 1\n3 2 0 4 0 1 2\n").unwrap();
/// let mut diagnostics = Diagnostics::new(WarningPolicy::collecting());
/// let mut container = ContainerWriter::new();
/// container.add("cell_a", &cell, &mut diagnostics).unwrap();
/// container.add("cell_b", &cell, &mut diagnostics).unwrap();
/// assert_eq!(container.names(), &["cell_a", "cell_b"]);
/// let bytes = container.to_bytes().unwrap();
/// assert!(bytes.starts_with(b"NMCOLUMN"));
/// ```
#[derive(Debug, Clone)]
pub struct ContainerWriter {
    store: TableStore,
    names: Vec<String>,
}

impl Default for ContainerWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerWriter {
    pub fn new() -> Self {
        Self { store: TableStore::new(CURRENT_VERSION), names: Vec::new() }
    }

    /// Adds a morphology under `name`.
    ///
    /// Empty morphologies are skipped with a warning.
    ///
    /// # Errors
    /// - [MorphError::Collection] if `name` is empty, contains `/` or is
    ///   already used
    /// - Any error of the single-morphology writer
    pub fn add(
        &mut self,
        name: &str,
        morph: &MutableMorphology,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), MorphError> {
        if name.is_empty() || name.contains('/') {
            return Err(MorphError::Collection(format!("Invalid morphology name: '{name}'")));
        }
        if self.names.iter().any(|n| n == name) {
            return Err(MorphError::Collection(format!("Morphology '{name}' is already in the container")));
        }
        if insert_tables(&mut self.store, morph, &format!("{name}/"), diagnostics)? {
            self.names.push(name.to_string());
        }
        Ok(())
    }

    /// Names of the added morphologies, in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn to_bytes(mut self) -> Result<Vec<u8>, MorphError> {
        self.store.to_bytes()
    }

    /// Writes the container to `path`.
    pub fn write_file<P: AsRef<Path>>(mut self, path: P) -> Result<(), MorphError> {
        debug!("Writing container of {} morphologies to {}", self.names.len(), path.as_ref().display());
        let mut writer = BufWriter::new(File::create(path)?);
        self.store.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
