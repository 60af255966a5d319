//! Immutable morphology snapshot and its borrowed section views.

use crate::diagnostics::STRING_URI;
use crate::error::MorphError;
use crate::model::annotation::{Annotation, Marker};
use crate::model::enums::{CellFamily, SectionType};
use crate::model::iterators::{SectionId, SectionTree};
use crate::model::mutable::MutableMorphology;
use crate::model::organelles::{EndoplasmicReticulum, Mitochondria, PostSynapticDensity};
use crate::model::point_level::{Point, PointLevel};
use crate::model::soma::Soma;

/// Flattened topology and point range of one section.
#[derive(Debug, Clone)]
struct SectionRecord {
    section_type: SectionType,
    start: usize,
    end: usize,
    parent: Option<SectionId>,
    children: Vec<SectionId>,
}

// =#========================================================================#=
// MORPHOLOGY
// =#========================================================================#=
/// A read-only morphology.
///
/// All section points are stored in one flattened array each for points,
/// diameters and perimeters; [Section] views borrow slices out of them.
/// Section ids are dense in `[0, N)` and numbered in depth-first order, so a
/// parent always has a smaller id than its children.
///
/// Obtained by freezing a [MutableMorphology] or by loading a file, see
/// [load_file](crate::load_file).
#[derive(Debug, Clone)]
pub struct Morphology {
    points: Vec<Point>,
    diameters: Vec<f64>,
    /// Empty, or aligned with `points` (zero-padded for sections without)
    perimeters: Vec<f64>,
    sections: Vec<SectionRecord>,
    roots: Vec<SectionId>,
    soma: Soma,
    cell_family: CellFamily,
    mitochondria: Mitochondria,
    endoplasmic_reticulum: EndoplasmicReticulum,
    post_synaptic_density: Vec<PostSynapticDensity>,
    markers: Vec<Marker>,
    annotations: Vec<Annotation>,
    uri: Option<String>,
}

impl Morphology {
    /// Assembles a snapshot from sections given in id order as
    /// `(type, points, parent)`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        sections: &[(SectionType, &PointLevel, Option<SectionId>)],
        soma: Soma,
        cell_family: CellFamily,
        mitochondria: Mitochondria,
        endoplasmic_reticulum: EndoplasmicReticulum,
        post_synaptic_density: Vec<PostSynapticDensity>,
        markers: Vec<Marker>,
        annotations: Vec<Annotation>,
        uri: Option<String>,
    ) -> Self {
        let total: usize = sections.iter().map(|(_, level, _)| level.len()).sum();
        let with_perimeters = sections.iter().any(|(_, level, _)| level.has_perimeters());
        let mut points = Vec::with_capacity(total);
        let mut diameters = Vec::with_capacity(total);
        let mut perimeters = Vec::with_capacity(if with_perimeters { total } else { 0 });
        let mut records: Vec<SectionRecord> = Vec::with_capacity(sections.len());
        let mut roots = Vec::new();

        for (id, (section_type, level, parent)) in sections.iter().enumerate() {
            let start = points.len();
            points.extend_from_slice(&level.points);
            diameters.extend_from_slice(&level.diameters);
            if with_perimeters {
                if level.has_perimeters() {
                    perimeters.extend_from_slice(&level.perimeters);
                } else {
                    perimeters.resize(points.len(), 0.0);
                }
            }
            records.push(SectionRecord {
                section_type: *section_type,
                start,
                end: points.len(),
                parent: *parent,
                children: Vec::new(),
            });
            match parent {
                Some(p) if *p < id => records[*p].children.push(id),
                _ => roots.push(id),
            }
        }

        Self {
            points,
            diameters,
            perimeters,
            sections: records,
            roots,
            soma,
            cell_family,
            mitochondria,
            endoplasmic_reticulum,
            post_synaptic_density,
            markers,
            annotations,
            uri,
        }
    }

    /// Creates a morphology with the same content, editable.
    pub fn to_mutable(&self) -> MutableMorphology {
        let mut morph = MutableMorphology::new();
        if let Some(uri) = &self.uri {
            morph = morph.with_uri(uri.clone());
        }
        *morph.soma_mut() = self.soma.clone();
        morph.set_cell_family(self.cell_family);
        for section in self.sections() {
            // parents have smaller ids, so ids are reproduced as is
            morph.attach_section(section.parent_id(), section.point_level(), section.section_type());
        }
        morph.set_mitochondria(self.mitochondria.to_mutable());
        *morph.endoplasmic_reticulum_mut() = self.endoplasmic_reticulum.clone();
        for psd in &self.post_synaptic_density {
            morph.add_post_synaptic_density(*psd);
        }
        for marker in &self.markers {
            morph.add_marker(marker.clone());
        }
        for annotation in &self.annotations {
            morph.add_annotation(annotation.clone());
        }
        morph
    }

    /// Uri of the source, or the placeholder for in-memory morphologies.
    pub fn uri(&self) -> &str {
        self.uri.as_deref().unwrap_or(STRING_URI)
    }

    pub fn soma(&self) -> &Soma {
        &self.soma
    }

    pub fn cell_family(&self) -> CellFamily {
        self.cell_family
    }

    /// Section with the given id.
    ///
    /// # Errors
    /// [MorphError::UnknownSection] if `id >= section_count()`.
    pub fn section(&self, id: SectionId) -> Result<Section<'_>, MorphError> {
        if id < self.sections.len() {
            Ok(Section { morphology: self, id })
        } else {
            Err(MorphError::UnknownSection(id))
        }
    }

    /// All sections in id (depth-first) order.
    pub fn sections(&self) -> impl Iterator<Item = Section<'_>> {
        (0..self.sections.len()).map(move |id| Section { morphology: self, id })
    }

    pub fn root_sections(&self) -> impl Iterator<Item = Section<'_>> {
        self.roots.iter().map(move |&id| Section { morphology: self, id })
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Flattened points of all sections.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn diameters(&self) -> &[f64] {
        &self.diameters
    }

    /// Flattened perimeters, empty if no section has perimeter data.
    pub fn perimeters(&self) -> &[f64] {
        &self.perimeters
    }

    /// Type of every section, in id order.
    pub fn section_types(&self) -> Vec<SectionType> {
        self.sections.iter().map(|s| s.section_type).collect()
    }

    /// Offset of every section into the flattened point arrays.
    pub fn section_offsets(&self) -> Vec<usize> {
        self.sections.iter().map(|s| s.start).collect()
    }

    pub fn mitochondria(&self) -> &Mitochondria {
        &self.mitochondria
    }

    pub fn endoplasmic_reticulum(&self) -> &EndoplasmicReticulum {
        &self.endoplasmic_reticulum
    }

    pub fn post_synaptic_density(&self) -> &[PostSynapticDensity] {
        &self.post_synaptic_density
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn is_empty(&self) -> bool {
        self.soma.is_empty() && self.sections.is_empty()
    }
}

impl SectionTree for Morphology {
    fn root_ids(&self) -> &[SectionId] {
        &self.roots
    }

    fn child_ids(&self, id: SectionId) -> &[SectionId] {
        self.sections.get(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    fn parent_id(&self, id: SectionId) -> Option<SectionId> {
        self.sections.get(id).and_then(|s| s.parent)
    }

    fn has_section(&self, id: SectionId) -> bool {
        id < self.sections.len()
    }
}

impl PartialEq for Morphology {
    /// Structural equality, see [diff](crate::sanitize::diff).
    fn eq(&self, other: &Self) -> bool {
        crate::sanitize::diff(self, other).is_none()
    }
}

// =#========================================================================#=
// SECTION VIEW
// =#========================================================================#=
/// A borrowed view on one section of a [Morphology].
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    morphology: &'a Morphology,
    id: SectionId,
}

impl<'a> Section<'a> {
    fn record(&self) -> &'a SectionRecord {
        &self.morphology.sections[self.id]
    }

    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn section_type(&self) -> SectionType {
        self.record().section_type
    }

    pub fn points(&self) -> &'a [Point] {
        let record = self.record();
        &self.morphology.points[record.start..record.end]
    }

    pub fn diameters(&self) -> &'a [f64] {
        let record = self.record();
        &self.morphology.diameters[record.start..record.end]
    }

    /// Perimeters, empty if the morphology has no perimeter data.
    pub fn perimeters(&self) -> &'a [f64] {
        let record = self.record();
        self.morphology.perimeters.get(record.start..record.end).unwrap_or(&[])
    }

    /// Owned copy of the point data.
    pub fn point_level(&self) -> PointLevel {
        PointLevel {
            points: self.points().to_vec(),
            diameters: self.diameters().to_vec(),
            perimeters: self.perimeters().to_vec(),
        }
    }

    pub fn parent_id(&self) -> Option<SectionId> {
        self.record().parent
    }

    pub fn parent(&self) -> Option<Section<'a>> {
        self.parent_id().map(|id| Section { morphology: self.morphology, id })
    }

    pub fn children(self) -> impl Iterator<Item = Section<'a>> {
        let morphology = self.morphology;
        self.record().children.iter().map(move |&id| Section { morphology, id })
    }

    pub fn is_root(&self) -> bool {
        self.record().parent.is_none()
    }

    /// This section and its subtree, in depth-first order.
    pub fn depth_first(self) -> impl Iterator<Item = Section<'a>> {
        let morphology = self.morphology;
        morphology.depth_first_from(self.id).map(move |id| Section { morphology, id })
    }

    /// This section and its subtree, in breadth-first order.
    pub fn breadth_first(self) -> impl Iterator<Item = Section<'a>> {
        let morphology = self.morphology;
        morphology.breadth_first_from(self.id).map(move |id| Section { morphology, id })
    }

    /// This section and its ancestors up to the root.
    pub fn upstream(self) -> impl Iterator<Item = Section<'a>> {
        let morphology = self.morphology;
        morphology.upstream(self.id).map(move |id| Section { morphology, id })
    }
}
