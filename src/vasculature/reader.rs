//! Vasculature table reading and encoding.

use crate::columnar::{CURRENT_VERSION, Table, TableStore};
use crate::diagnostics::Location;
use crate::error::MorphError;
use crate::model::{Point, SectionId, VascularSectionType};
use crate::parser::ParsingError;
use crate::vasculature::{Vasculature, tables};
use tracing::{debug, trace};

/// Reads the three vasculature tables of a store.
pub(crate) fn read(store: &TableStore, uri: &str) -> Result<Vasculature, MorphError> {
    debug!("Reading vasculature {uri}");
    let invalid = |message: String| -> MorphError { ParsingError::invalid_container(Location::file(uri), message).into() };

    let points = f64_table(store, tables::POINTS, 4, uri)?;
    let structure = i32_table(store, tables::STRUCTURE, 2, uri)?;
    let connectivity = i32_table(store, tables::CONNECTIVITY, 2, uri)?;
    let point_count = points.len() / 4;

    let mut offsets = Vec::with_capacity(structure.len() / 2 + 1);
    let mut section_types = Vec::with_capacity(structure.len() / 2);
    for row in structure.chunks_exact(2) {
        let offset = usize::try_from(row[0]).map_err(|_| invalid(format!("Negative offset {}", row[0])))?;
        if offset > point_count || offsets.last().is_some_and(|&previous| offset < previous) {
            return Err(invalid(format!("Section offset {offset} is out of order or out of range")));
        }
        offsets.push(offset);
        let section_type = VascularSectionType::from_code(row[1] as i64)
            .ok_or_else(|| ParsingError::unsupported_section_type(Location::file(uri), row[1] as i64))?;
        section_types.push(section_type);
    }
    offsets.push(point_count);

    let section_count = section_types.len();
    let mut edges = Vec::with_capacity(connectivity.len() / 2);
    for row in connectivity.chunks_exact(2) {
        let id = |value: i32| match usize::try_from(value) {
            Ok(id) if id < section_count => Ok(id),
            _ => Err(invalid(format!("Connectivity refers to an unknown section {value}"))),
        };
        let edge: [SectionId; 2] = [id(row[0])?, id(row[1])?];
        trace!("Vessel edge {} -> {}", edge[0], edge[1]);
        edges.push(edge);
    }

    let (coordinates, diameters): (Vec<Point>, Vec<f64>) =
        points.chunks_exact(4).map(|p| ([p[0], p[1], p[2]], p[3])).unzip();
    debug!("Vasculature {uri} has {section_count} sections and {} edges", edges.len());
    Ok(Vasculature::from_parts(coordinates, diameters, offsets, section_types, edges))
}

/// Encodes a vasculature into its three tables.
pub fn to_table_store(vasculature: &Vasculature) -> TableStore {
    let mut store = TableStore::new(CURRENT_VERSION);
    let points: Vec<[f64; 4]> =
        vasculature.points().iter().zip(vasculature.diameters()).map(|(p, &d)| [p[0], p[1], p[2], d]).collect();
    let structure: Vec<[i32; 2]> = vasculature
        .sections()
        .map(|section| [vasculature.offsets[section.id()] as i32, section.section_type().code() as i32])
        .collect();
    let connectivity: Vec<[i32; 2]> =
        vasculature.connectivity().iter().map(|&[from, to]| [from as i32, to as i32]).collect();
    store.insert(tables::POINTS, Table::from_f64_rows(&points));
    store.insert(tables::STRUCTURE, Table::from_i32_rows(&structure));
    store.insert(tables::CONNECTIVITY, Table::from_i32_rows(&connectivity));
    store
}

// ============================================================================
// Table access
// ============================================================================
fn required<'a>(store: &'a TableStore, name: &str, uri: &str) -> Result<&'a Table, MorphError> {
    store
        .get(name)
        .ok_or_else(|| ParsingError::invalid_container(Location::file(uri), format!("Missing table '{name}'")).into())
}

fn bad_shape(name: &str, dtype: &str, columns: usize, uri: &str) -> MorphError {
    let message =
        format!("Opening vasculature file '{uri}': table '{name}' must hold {dtype} values in {columns} columns");
    ParsingError::invalid_container(Location::file(uri), message).into()
}

fn f64_table<'a>(store: &'a TableStore, name: &str, columns: usize, uri: &str) -> Result<&'a [f64], MorphError> {
    let table = required(store, name, uri)?;
    match table.as_f64() {
        Some(values) if table.columns() == columns => Ok(values),
        _ => Err(bad_shape(name, "f64", columns, uri)),
    }
}

fn i32_table<'a>(store: &'a TableStore, name: &str, columns: usize, uri: &str) -> Result<&'a [i32], MorphError> {
    let table = required(store, name, uri)?;
    match table.as_i32() {
        Some(values) if table.columns() == columns => Ok(values),
        _ => Err(bad_shape(name, "i32", columns, uri)),
    }
}
