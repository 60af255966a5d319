//! Columnar container reading.

use crate::columnar::table_store::{Table, TableStore};
use crate::columnar::{CURRENT_VERSION, tables};
use crate::diagnostics::{Diagnostics, Location, Warning};
use crate::error::MorphError;
use crate::model::{
    CellFamily, MitoPointLevel, MutableMitochondria, MutableMorphology, PointLevel, PostSynapticDensity, SectionId,
    SectionType, SomaConvention, geometry,
};
use crate::parser::{ParsingError, ParsingErrorType};
use tracing::{debug, trace};

/// Checks the schema version of a store.
///
/// # Errors
/// [UnsupportedVersion](ParsingErrorType::UnsupportedVersion) for the legacy
/// major version 2, a later major version or a minor version above the
/// current one.
pub(crate) fn check_version(store: &TableStore, uri: &str) -> Result<(), MorphError> {
    let (major, minor) = store.version();
    let message = match (major, minor) {
        (2, _) => format!(
            "Unsupported columnar format version 2.{minor} in {uri}.\n\
             Version 2 is a legacy layout that is no longer read. Please convert the file to \
             version 1.{} by loading it with an older release and writing it again.",
            CURRENT_VERSION.1
        ),
        (1, minor) if minor <= CURRENT_VERSION.1 => return Ok(()),
        _ => format!(
            "Unsupported columnar format version {major}.{minor} in {uri}, \
             the latest supported version is {}.{}",
            CURRENT_VERSION.0, CURRENT_VERSION.1
        ),
    };
    Err(ParsingError::new(ParsingErrorType::UnsupportedVersion(message), Location::file(uri)).into())
}

/// Reads the morphology whose tables are named `{prefix}{table}`.
///
/// `prefix` is empty for a single-morphology file and `"{name}/"` inside a
/// merged container.
pub(crate) struct ColumnarReader<'a> {
    store: &'a TableStore,
    prefix: &'a str,
    uri: &'a str,
}

impl<'a> ColumnarReader<'a> {
    pub fn new(store: &'a TableStore, prefix: &'a str, uri: &'a str) -> Self {
        Self { store, prefix, uri }
    }

    pub fn read(&self, diagnostics: &mut Diagnostics) -> Result<MutableMorphology, MorphError> {
        check_version(self.store, self.uri)?;
        debug!("Reading columnar morphology {}", self.uri);

        let points = self.f64_table(tables::POINTS, 4)?;
        let point_count = points.len() / 4;
        let structure = self.i32_table(tables::STRUCTURE, 3)?;
        let perimeters = match self.optional(tables::PERIMETERS) {
            Some(table) => {
                let values = self.f64_values(tables::PERIMETERS, table, 1)?;
                if values.len() != point_count {
                    return Err(self.invalid(format!(
                        "Perimeters have {} values while there are {} points",
                        values.len(),
                        point_count
                    )));
                }
                Some(values)
            }
            None => None,
        };

        let rows: Vec<&[i32]> = structure.chunks_exact(3).collect();
        let mut offsets: Vec<usize> = Vec::with_capacity(rows.len() + 1);
        for row in &rows {
            let offset = usize::try_from(row[0]).map_err(|_| self.invalid(format!("Negative offset {}", row[0])))?;
            if offset > point_count || offsets.last().is_some_and(|&previous| offset < previous) {
                return Err(self.invalid(format!("Section offset {offset} is out of order or out of range")));
            }
            offsets.push(offset);
        }
        offsets.push(point_count);

        let level = |i: usize| -> PointLevel {
            let (start, end) = (offsets[i], offsets[i + 1]);
            let chunk = &points[start * 4..end * 4];
            let mut level = PointLevel::default();
            for (j, p) in chunk.chunks_exact(4).enumerate() {
                level.push([p[0], p[1], p[2]], p[3], perimeters.map(|values| values[start + j]));
            }
            level
        };

        let mut morph = MutableMorphology::new().with_uri(self.uri);
        morph.set_soma_convention(SomaConvention::Contour);
        let family = self.cell_family()?;
        morph.set_cell_family(family);

        let has_soma_row = rows.first().is_some_and(|row| row[1] == SectionType::Soma.code() as i32);
        let first_section = usize::from(has_soma_row);
        if has_soma_row {
            let mut soma = level(0);
            if soma.perimeters.iter().all(|&p| p == 0.0) {
                soma.perimeters.clear();
            }
            morph.set_soma_point_level(soma);
        }

        for (row_index, row) in rows.iter().enumerate().skip(first_section) {
            let id = row_index - first_section;
            let section_type = match SectionType::from_code(row[1] as i64) {
                Some(t) if t.is_neurite() || t == SectionType::Undefined => t,
                Some(_) => {
                    return Err(ParsingError::soma_placement(
                        Location::file(self.uri),
                        format!("Section {id} has the soma type, only the first structure row may be the soma"),
                    )
                    .into());
                }
                None => return Err(ParsingError::unsupported_section_type(Location::file(self.uri), row[1] as i64).into()),
            };
            if !family.allows(section_type) {
                let kind = ParsingErrorType::SectionTypeForFamily { section_type: row[1] as i64, family };
                return Err(ParsingError::new(kind, Location::file(self.uri)).into());
            }
            let parent = self.parent_of(id, row[2], has_soma_row)?;
            trace!("Columnar section {id} of type {}, parent {parent:?}", section_type.name_in(family));
            let level = level(row_index);
            if let Some(p) = parent {
                let parent_last = morph.section(p)?.point_level().last_sample();
                let child_first = level.first_sample();
                let duplicated = match (parent_last, child_first) {
                    (Some(a), Some(b)) => geometry::points_equal(&[a[0], a[1], a[2]], &[b[0], b[1], b[2]]),
                    _ => false,
                };
                if !duplicated {
                    diagnostics.emit(Warning::wrong_duplicate(self.uri, id, p, parent_last, child_first))?;
                }
            }
            morph.attach_section(parent, level, section_type);
        }

        self.read_mitochondria(&mut morph)?;
        self.read_endoplasmic_reticulum(&mut morph)?;
        self.read_post_synaptic_density(&mut morph)?;
        Ok(morph)
    }

    /// Cell family of the metadata table, neuron when absent.
    fn cell_family(&self) -> Result<CellFamily, MorphError> {
        let Some(table) = self.optional(tables::CELL_FAMILY) else {
            return Ok(CellFamily::Neuron);
        };
        let code = self.i32_values(tables::CELL_FAMILY, table, 1)?.first().copied().unwrap_or(0);
        CellFamily::from_code(code as i64).ok_or_else(|| self.invalid(format!("Unknown cell family {code}")))
    }

    /// Section id of the parent stored as `on_disk`.
    fn parent_of(&self, id: SectionId, on_disk: i32, has_soma_row: bool) -> Result<Option<SectionId>, MorphError> {
        let parent = match (on_disk, has_soma_row) {
            (p, _) if p < 0 => return Ok(None),
            (0, true) => return Ok(None),
            (p, true) => p as usize - 1,
            (p, false) => p as usize,
        };
        if parent >= id {
            return Err(self.invalid(format!("Parent {parent} of section {id} must come before it")));
        }
        Ok(Some(parent))
    }

    fn read_mitochondria(&self, morph: &mut MutableMorphology) -> Result<(), MorphError> {
        let Some(structure_table) = self.optional(tables::MITO_STRUCTURE) else {
            return Ok(());
        };
        let structure = self.i32_values(tables::MITO_STRUCTURE, structure_table, 2)?;
        let points = self.f64_table(tables::MITO_POINTS, 3)?;
        let point_count = points.len() / 3;

        let rows: Vec<&[i32]> = structure.chunks_exact(2).collect();
        let mut mitochondria = MutableMitochondria::new();
        for (i, row) in rows.iter().enumerate() {
            let start = usize::try_from(row[0]).map_err(|_| self.invalid(format!("Negative offset {}", row[0])))?;
            let end = rows.get(i + 1).map_or(Ok(point_count), |next| {
                usize::try_from(next[0]).map_err(|_| self.invalid(format!("Negative offset {}", next[0])))
            })?;
            if start > end || end > point_count {
                return Err(self.invalid(format!("Mitochondrial section {i} has invalid offsets")));
            }
            let mut section_ids = Vec::with_capacity(end - start);
            let mut relative_path_lengths = Vec::with_capacity(end - start);
            let mut diameters = Vec::with_capacity(end - start);
            for p in points[start * 3..end * 3].chunks_exact(3) {
                if p[0] < 0.0 || p[0].fract() != 0.0 || morph.section(p[0] as usize).is_err() {
                    return Err(self.invalid(format!("Mitochondrial point refers to an invalid section {}", p[0])));
                }
                section_ids.push(p[0] as usize);
                relative_path_lengths.push(p[1]);
                diameters.push(p[2]);
            }
            let level = MitoPointLevel::new(section_ids, relative_path_lengths, diameters)?;
            match row[1] {
                p if p < 0 => {
                    mitochondria.append_root_section(level);
                }
                p => {
                    mitochondria.append_section(p as usize, level)?;
                }
            }
        }
        morph.set_mitochondria(mitochondria);
        Ok(())
    }

    fn read_endoplasmic_reticulum(&self, morph: &mut MutableMorphology) -> Result<(), MorphError> {
        let Some(index_table) = self.optional(tables::ER_SECTION_INDEX) else {
            return Ok(());
        };
        let indices = self.i32_values(tables::ER_SECTION_INDEX, index_table, 1)?;
        let volumes = self.f64_table(tables::ER_VOLUME, 1)?;
        let areas = self.f64_table(tables::ER_SURFACE_AREA, 1)?;
        let counts = self.i32_table(tables::ER_FILAMENT_COUNT, 1)?;
        let er = morph.endoplasmic_reticulum_mut();
        for (i, &index) in indices.iter().enumerate() {
            let (Some(&volume), Some(&area), Some(&count)) = (volumes.get(i), areas.get(i), counts.get(i)) else {
                return Err(self.invalid("Endoplasmic reticulum tables differ in length".to_string()));
            };
            let section = usize::try_from(index).map_err(|_| self.invalid(format!("Negative section index {index}")))?;
            let count = u32::try_from(count).map_err(|_| self.invalid(format!("Negative filament count {count}")))?;
            er.push(section, volume, area, count);
        }
        Ok(())
    }

    fn read_post_synaptic_density(&self, morph: &mut MutableMorphology) -> Result<(), MorphError> {
        let Some(section_table) = self.optional(tables::PSD_SECTION_ID) else {
            return Ok(());
        };
        let sections = self.i32_values(tables::PSD_SECTION_ID, section_table, 1)?;
        let segments = self.i32_table(tables::PSD_SEGMENT_ID, 1)?;
        let offsets = self.f64_table(tables::PSD_OFFSET, 1)?;
        if segments.len() != sections.len() || offsets.len() != sections.len() {
            return Err(self.invalid("Post-synaptic density tables differ in length".to_string()));
        }
        for ((&section, &segment), &offset) in sections.iter().zip(segments).zip(offsets) {
            let (Ok(section_id), Ok(segment_id)) = (usize::try_from(section), usize::try_from(segment)) else {
                return Err(self.invalid(format!("Negative post-synaptic density location {section}:{segment}")));
            };
            morph.add_post_synaptic_density(PostSynapticDensity { section_id, segment_id, offset });
        }
        Ok(())
    }

    // ============================================================================
    // Table access
    // ============================================================================
    fn optional(&self, name: &str) -> Option<&'a Table> {
        self.store.get(&format!("{}{name}", self.prefix))
    }

    fn required(&self, name: &str) -> Result<&'a Table, MorphError> {
        self.optional(name).ok_or_else(|| self.invalid(format!("Missing table '{}{name}'", self.prefix)))
    }

    fn f64_table(&self, name: &str, columns: usize) -> Result<&'a [f64], MorphError> {
        let table = self.required(name)?;
        self.f64_values(name, table, columns)
    }

    fn i32_table(&self, name: &str, columns: usize) -> Result<&'a [i32], MorphError> {
        let table = self.required(name)?;
        self.i32_values(name, table, columns)
    }

    fn f64_values(&self, name: &str, table: &'a Table, columns: usize) -> Result<&'a [f64], MorphError> {
        match table.as_f64() {
            Some(values) if table.columns() == columns => Ok(values),
            _ => Err(self.bad_shape(name, "f64", columns)),
        }
    }

    fn i32_values(&self, name: &str, table: &'a Table, columns: usize) -> Result<&'a [i32], MorphError> {
        match table.as_i32() {
            Some(values) if table.columns() == columns => Ok(values),
            _ => Err(self.bad_shape(name, "i32", columns)),
        }
    }

    fn bad_shape(&self, name: &str, dtype: &str, columns: usize) -> MorphError {
        self.invalid(format!(
            "Opening morphology '{}': table '{}{name}' must hold {dtype} values in {columns} columns",
            self.uri, self.prefix
        ))
    }

    fn invalid(&self, message: String) -> MorphError {
        ParsingError::invalid_container(Location::file(self.uri), message).into()
    }
}
