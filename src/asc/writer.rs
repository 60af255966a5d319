//! Neurolucida writing.

use crate::asc::lexer::is_marker_word;
use crate::asc::parser::INCOMPLETE_MARKER;
use crate::diagnostics::Diagnostics;
use crate::error::{MorphError, WriteError};
use crate::model::{Marker, MutableMorphology, PointLevel, SectionId, SectionType};
use crate::write_checks::{
    check_contour_soma, check_no_organelles, check_no_perimeters, check_section_continuity, is_empty_morphology,
};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use tracing::debug;

/// Writes a morphology in Neurolucida format to `writer`.
///
/// # Returns
/// `false` if nothing was written (empty morphology)
///
/// # Errors
/// - [WriteError::UnsupportedSectionType] for roots other than axon, basal
///   or apical dendrite
/// - [WriteError::PerimeterData] and [WriteError::OrganelleData]
/// - [WriteError::DisconnectedSection] for a section not starting at its
///   parent's last point
/// - [MorphError::Io] if writing fails
pub fn write_asc<W: Write>(
    morph: &MutableMorphology,
    writer: &mut W,
    diagnostics: &mut Diagnostics,
) -> Result<bool, MorphError> {
    match to_asc_string(morph, diagnostics)? {
        Some(content) => {
            writer.write_all(content.as_bytes())?;
            writer.flush()?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Serializes a morphology to a Neurolucida string, see [write_asc].
///
/// Markers found inside a section are written back into it when their
/// label is a marker shape; all other markers become top level groups
/// named after their label.
///
/// # Returns
/// `None` for an empty morphology
pub fn to_asc_string(morph: &MutableMorphology, diagnostics: &mut Diagnostics) -> Result<Option<String>, MorphError> {
    if is_empty_morphology(morph, diagnostics)? {
        return Ok(None);
    }
    check_contour_soma(morph, diagnostics)?;
    check_no_organelles(morph, "ASC")?;
    check_no_perimeters(morph, "ASC")?;
    check_section_continuity(morph)?;
    debug!("Writing {} sections of {} to ASC", morph.section_count(), morph.uri());

    let mut in_section: HashMap<SectionId, Vec<&Marker>> = HashMap::new();
    let mut top_level: Vec<&Marker> = Vec::new();
    for marker in morph.markers() {
        let section = usize::try_from(marker.section_id).ok().filter(|&id| morph.section(id).is_ok());
        match section {
            Some(id) if marker.label == INCOMPLETE_MARKER || is_marker_word(&marker.label) => {
                in_section.entry(id).or_default().push(marker);
            }
            _ if !marker.point_level.is_empty() => top_level.push(marker),
            _ => {}
        }
    }

    let mut out = String::new();
    let soma = morph.soma();
    if !soma.is_empty() {
        out.push_str("(\"CellBody\"\n  (Color Red)\n  (CellBody)\n");
        write_points(&mut out, soma.point_level(), 2);
        out.push_str(")\n\n");
    }

    for &root in morph.root_sections() {
        let header = match morph.section(root)?.section_type() {
            SectionType::Axon => "( (Color Cyan)\n  (Axon)\n",
            SectionType::BasalDendrite => "( (Color Red)\n  (Dendrite)\n",
            SectionType::ApicalDendrite => "( (Color Red)\n  (Apical)\n",
            other => return Err(WriteError::UnsupportedSectionType { section_type: other.code() }.into()),
        };
        out.push_str(header);
        write_section(&mut out, morph, root, 2, &in_section)?;
        out.push_str(")\n\n");
    }

    for marker in top_level {
        let _ = writeln!(out, "(\"{}\"", marker.label);
        write_points(&mut out, &marker.point_level, 2);
        out.push_str(")\n\n");
    }

    let _ = writeln!(out, "; created by neuromorph v{}", env!("CARGO_PKG_VERSION"));
    Ok(Some(out))
}

/// Writes a section, its markers and its children, depth first.
fn write_section(
    out: &mut String,
    morph: &MutableMorphology,
    id: SectionId,
    indent: usize,
    markers: &HashMap<SectionId, Vec<&Marker>>,
) -> Result<(), MorphError> {
    let section = morph.section(id)?;
    let pad = " ".repeat(indent);
    write_points(out, section.point_level(), indent);

    let own_markers = markers.get(&id).map(Vec::as_slice).unwrap_or(&[]);
    for marker in own_markers.iter().filter(|m| m.label != INCOMPLETE_MARKER) {
        let _ = writeln!(out, "{pad}({}", marker.label);
        write_points(out, &marker.point_level, indent + 2);
        let _ = writeln!(out, "{pad})");
    }

    let children = section.children();
    for (i, &child) in children.iter().enumerate() {
        out.push_str(&pad);
        out.push_str(if i == 0 { "(\n" } else { "|\n" });
        write_section(out, morph, child, indent + 2, markers)?;
    }
    if !children.is_empty() {
        let _ = writeln!(out, "{pad})");
    }
    if own_markers.iter().any(|m| m.label == INCOMPLETE_MARKER) {
        let _ = writeln!(out, "{pad}Incomplete");
    }
    Ok(())
}

fn write_points(out: &mut String, level: &PointLevel, indent: usize) {
    for (point, diameter) in level.points.iter().zip(&level.diameters) {
        let _ = writeln!(
            out,
            "{:indent$}({} {} {} {})",
            "",
            point[0],
            point[1],
            point[2],
            diameter,
            indent = indent
        );
    }
}
