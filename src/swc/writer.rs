//! SWC format writing.

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{MorphError, WriteError};
use crate::model::{MutableMorphology, Point, SectionTree, SectionType, SomaType};
use crate::model::geometry;
use crate::write_checks::{check_no_organelles, check_no_perimeters, check_section_continuity, is_empty_morphology};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use tracing::debug;

/// Writes a morphology in SWC format to `writer`.
///
/// The soma is written first, as three point soma (parents `-1, 1, 1`) or
/// as a chain of samples. Sections follow in depth-first order, roots
/// attached to the first soma sample or to `-1` without soma. A section's
/// first point is skipped if it repeats the parent's last point with the
/// same diameter.
///
/// # Returns
/// `false` if nothing was written (empty morphology)
///
/// # Errors
/// - [WriteError::OnlyChild] for unifurcations
/// - [WriteError::DisconnectedSection] for a section not starting at its
///   parent's last point
/// - [WriteError::PerimeterData] and [WriteError::OrganelleData] for
///   content SWC cannot represent
/// - [MorphError::Io] if writing fails
pub fn write_swc<W: Write>(
    morph: &MutableMorphology,
    writer: &mut W,
    diagnostics: &mut Diagnostics,
) -> Result<bool, MorphError> {
    match to_swc_string(morph, diagnostics)? {
        Some(content) => {
            writer.write_all(content.as_bytes())?;
            writer.flush()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Serializes a morphology to an SWC string, see [write_swc].
///
/// # Returns
/// `None` for an empty morphology
pub fn to_swc_string(morph: &MutableMorphology, diagnostics: &mut Diagnostics) -> Result<Option<String>, MorphError> {
    if !check_soma(morph, diagnostics)? {
        return Ok(None);
    }
    check_writable(morph)?;
    debug!("Writing {} sections of {} to SWC", morph.section_count(), morph.uri());

    let mut out = String::with_capacity(64 * (morph.soma().points().len() + 1));
    out.push_str(&format!("# created by neuromorph v{}\n", env!("CARGO_PKG_VERSION")));
    out.push_str("# index type X Y Z radius parent\n");

    let soma = morph.soma();
    let mut next_id: i64 = 1;
    if soma.soma_type() == SomaType::ThreePoint {
        for (i, parent) in [-1, 1, 1].into_iter().enumerate() {
            write_line(&mut out, next_id, SectionType::Soma, &soma.points()[i], soma.diameters()[i], parent);
            next_id += 1;
        }
    } else {
        for (point, diameter) in soma.points().iter().zip(soma.diameters()) {
            let parent = if next_id == 1 { -1 } else { next_id - 1 };
            write_line(&mut out, next_id, SectionType::Soma, point, *diameter, parent);
            next_id += 1;
        }
    }
    let root_parent = if soma.is_empty() { -1 } else { 1 };

    // id on disk of each section's last sample
    let mut last_sample: HashMap<usize, i64> = HashMap::new();
    for id in morph.depth_first() {
        let section = morph.section(id)?;
        let parent = section.parent().map(|p| morph.section(p)).transpose()?;
        let skip_first = match (parent.and_then(|p| p.point_level().last_sample()), section.point_level().first_sample()) {
            (Some(last), Some(first)) => {
                geometry::points_equal(&[last[0], last[1], last[2]], &[first[0], first[1], first[2]])
                    && geometry::almost_equal(last[3], first[3])
            }
            _ => false,
        };
        let first = usize::from(skip_first);
        for (i, (point, diameter)) in section.points().iter().zip(section.diameters()).enumerate().skip(first) {
            let parent_on_disk = if i > first {
                next_id - 1
            } else {
                match section.parent() {
                    Some(parent) => last_sample.get(&parent).copied().unwrap_or(root_parent),
                    None => root_parent,
                }
            };
            write_line(&mut out, next_id, section.section_type(), point, *diameter, parent_on_disk);
            next_id += 1;
        }
        last_sample.insert(id, next_id - 1);
    }
    Ok(Some(out))
}

fn write_line(out: &mut String, id: i64, section_type: SectionType, point: &Point, diameter: f64, parent: i64) {
    let _ = writeln!(
        out,
        "{} {} {} {} {} {} {}",
        id,
        section_type.code(),
        point[0],
        point[1],
        point[2],
        diameter / 2.0,
        parent
    );
}

/// Soma related warnings and errors.
///
/// # Returns
/// `false` if the morphology is empty and must not be written
fn check_soma(morph: &MutableMorphology, diagnostics: &mut Diagnostics) -> Result<bool, MorphError> {
    if is_empty_morphology(morph, diagnostics)? {
        return Ok(false);
    }
    let soma = morph.soma();
    if soma.is_empty() {
        diagnostics.emit(Warning::write_no_soma())?;
        return Ok(true);
    }
    match soma.soma_type() {
        SomaType::Undefined => diagnostics.emit(Warning::write_undefined_soma())?,
        SomaType::SimpleContour => diagnostics.emit(Warning::soma_non_cylinder_or_point())?,
        SomaType::SinglePoint if soma.points().len() != 1 => {
            return Err(WriteError::InvalidSinglePointSoma.into());
        }
        SomaType::ThreePoint if soma.points().len() != 3 => {
            return Err(WriteError::InvalidThreePointSoma.into());
        }
        _ => {}
    }
    Ok(true)
}

/// Content SWC can not represent.
fn check_writable(morph: &MutableMorphology) -> Result<(), MorphError> {
    check_no_perimeters(morph, "SWC")?;
    check_no_organelles(morph, "SWC")?;
    for id in morph.depth_first() {
        if let Some(parent) = morph.section(id)?.parent() {
            if morph.section(parent)?.children().len() == 1 {
                return Err(WriteError::OnlyChild { parent }.into());
            }
        }
    }
    check_section_continuity(morph)
}
