//! Preconditions shared by the writers.

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{MorphError, WriteError};
use crate::model::{MutableMorphology, SomaType, geometry};

/// Warns about and reports a morphology with neither soma nor sections.
pub(crate) fn is_empty_morphology(morph: &MutableMorphology, diagnostics: &mut Diagnostics) -> Result<bool, MorphError> {
    if morph.is_empty() {
        diagnostics.emit(Warning::write_empty_morphology())?;
        return Ok(true);
    }
    Ok(false)
}

/// Soma checks of the formats storing the soma as a contour.
pub(crate) fn check_contour_soma(morph: &MutableMorphology, diagnostics: &mut Diagnostics) -> Result<(), MorphError> {
    let soma = morph.soma();
    if soma.is_empty() {
        return diagnostics.emit(Warning::write_no_soma());
    }
    match soma.soma_type() {
        SomaType::Undefined => diagnostics.emit(Warning::write_undefined_soma()),
        SomaType::SimpleContour => Ok(()),
        _ => diagnostics.emit(Warning::soma_non_contour()),
    }
}

pub(crate) fn check_no_perimeters(morph: &MutableMorphology, format: &'static str) -> Result<(), MorphError> {
    if morph.has_perimeters() {
        return Err(WriteError::PerimeterData { format }.into());
    }
    Ok(())
}

/// Mitochondria and endoplasmic reticulum only fit the columnar format.
pub(crate) fn check_no_organelles(morph: &MutableMorphology, format: &'static str) -> Result<(), MorphError> {
    if !morph.mitochondria().is_empty() {
        return Err(WriteError::OrganelleData { organelle: "mitochondria", format }.into());
    }
    if !morph.endoplasmic_reticulum().is_empty() {
        return Err(WriteError::OrganelleData { organelle: "endoplasmic reticulum", format }.into());
    }
    Ok(())
}

/// Every section must start with a copy of its parent's last point.
/// Diameters may differ, e.g. for Neurolucida branches.
pub(crate) fn check_section_continuity(morph: &MutableMorphology) -> Result<(), MorphError> {
    for section in morph.sections() {
        let Some(parent) = section.parent() else { continue };
        let last = morph.section(parent)?.points().last();
        if let (Some(last), Some(first)) = (last, section.points().first()) {
            if !geometry::points_equal(last, first) {
                return Err(WriteError::DisconnectedSection { section: section.id(), parent }.into());
            }
        }
    }
    Ok(())
}

/// Perimeters are stored for all sections or for none of them.
pub(crate) fn check_uniform_perimeters(morph: &MutableMorphology) -> Result<(), MorphError> {
    if !morph.sections().any(|s| s.point_level().has_perimeters()) {
        return Ok(());
    }
    let lacking = morph.sections().find(|s| !s.point_level().is_empty() && !s.point_level().has_perimeters());
    match lacking {
        Some(section) => Err(WriteError::MixedPerimeterData { section: section.id() }.into()),
        None => Ok(()),
    }
}
