//! Editable morphology: an arena of sections addressed by [SectionId].

use crate::diagnostics::STRING_URI;
use crate::error::MorphError;
use crate::model::annotation::{Annotation, Marker};
use crate::model::enums::{CellFamily, SectionType, SomaConvention};
use crate::model::geometry::points_equal;
use crate::model::iterators::{SectionId, SectionTree};
use crate::model::morphology::Morphology;
use crate::model::organelles::{
    EndoplasmicReticulum, MitoPointLevel, MutableMitochondria, PostSynapticDensity,
};
use crate::model::point_level::{Point, PointLevel};
use crate::model::soma::Soma;
use tracing::trace;

// =#========================================================================#=
// MUTABLE SECTION
// =#========================================================================#=
/// A section of a [MutableMorphology].
///
/// Topology (parent and children) is managed by the owning morphology; only
/// the type and the point data may be edited through a section.
#[derive(Debug, Clone, PartialEq)]
pub struct MutableSection {
    id: SectionId,
    section_type: SectionType,
    level: PointLevel,
    parent: Option<SectionId>,
    children: Vec<SectionId>,
    /// Line of the first point in the source file
    line: Option<usize>,
}

impl MutableSection {
    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn section_type(&self) -> SectionType {
        self.section_type
    }

    pub fn set_section_type(&mut self, section_type: SectionType) {
        self.section_type = section_type;
    }

    pub fn points(&self) -> &[Point] {
        &self.level.points
    }

    pub fn diameters(&self) -> &[f64] {
        &self.level.diameters
    }

    pub fn perimeters(&self) -> &[f64] {
        &self.level.perimeters
    }

    pub fn point_level(&self) -> &PointLevel {
        &self.level
    }

    pub fn point_level_mut(&mut self) -> &mut PointLevel {
        &mut self.level
    }

    pub fn set_point_level(&mut self, level: PointLevel) {
        self.level = level;
    }

    pub fn parent(&self) -> Option<SectionId> {
        self.parent
    }

    pub fn children(&self) -> &[SectionId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Line of the section's first point in the file it was read from,
    /// `None` for sections built in memory or thawed from a [Morphology].
    pub fn source_line(&self) -> Option<usize> {
        self.line
    }

    pub(crate) fn set_source_line(&mut self, line: usize) {
        self.line = Some(line);
    }
}

// =#========================================================================#=
// MUTABLE MORPHOLOGY
// =#========================================================================#=
/// A morphology under construction or being edited.
///
/// Sections live in an arena; a [SectionId] stays valid until the section
/// gets deleted and is never handed out again afterwards, so a stale id
/// always results in [MorphError::UnknownSection]. Clones are independent.
///
/// # Example
/// ```
/// use neuromorph::model::{MutableMorphology, PointLevel, SectionType, SectionTree};
///
/// let mut morph = MutableMorphology::new();
/// let level = PointLevel::with_diameters(vec![[0., 0., 0.], [0., 5., 0.]], vec![2., 2.]).unwrap();
/// let root = morph.append_root_section(level.clone(), SectionType::BasalDendrite);
/// let child = morph.append_section(root, level, SectionType::BasalDendrite).unwrap();
///
/// morph.delete_section(child, true).unwrap();
/// assert!(morph.section(child).is_err());
/// assert_eq!(morph.depth_first().count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MutableMorphology {
    pub(crate) sections: Vec<Option<MutableSection>>,
    pub(crate) roots: Vec<SectionId>,
    soma: Soma,
    cell_family: CellFamily,
    mitochondria: MutableMitochondria,
    endoplasmic_reticulum: EndoplasmicReticulum,
    post_synaptic_density: Vec<PostSynapticDensity>,
    markers: Vec<Marker>,
    annotations: Vec<Annotation>,
    uri: Option<String>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl MutableMorphology {
    /// Creates an empty morphology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the uri of the file this morphology was read from.
    pub fn with_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Uri of the source, or the placeholder for in-memory morphologies.
    pub fn uri(&self) -> &str {
        self.uri.as_deref().unwrap_or(STRING_URI)
    }

    pub fn soma(&self) -> &Soma {
        &self.soma
    }

    pub fn soma_mut(&mut self) -> &mut Soma {
        &mut self.soma
    }

    /// Replaces the soma points, keeping the soma convention.
    pub fn set_soma_point_level(&mut self, level: PointLevel) {
        self.soma.set_point_level(level);
    }

    pub fn set_soma_convention(&mut self, convention: SomaConvention) {
        self.soma.set_convention(convention);
    }

    pub fn cell_family(&self) -> CellFamily {
        self.cell_family
    }

    pub fn set_cell_family(&mut self, cell_family: CellFamily) {
        self.cell_family = cell_family;
    }

    /// Section with the given id.
    ///
    /// # Errors
    /// [MorphError::UnknownSection] for deleted or never issued ids.
    pub fn section(&self, id: SectionId) -> Result<&MutableSection, MorphError> {
        self.sections.get(id).and_then(|s| s.as_ref()).ok_or(MorphError::UnknownSection(id))
    }

    /// Mutable access to the section with the given id.
    ///
    /// # Errors
    /// [MorphError::UnknownSection] for deleted or never issued ids.
    pub fn section_mut(&mut self, id: SectionId) -> Result<&mut MutableSection, MorphError> {
        self.sections.get_mut(id).and_then(|s| s.as_mut()).ok_or(MorphError::UnknownSection(id))
    }

    /// Live sections in id order.
    pub fn sections(&self) -> impl Iterator<Item = &MutableSection> {
        self.sections.iter().flatten()
    }

    /// Number of live sections.
    pub fn section_count(&self) -> usize {
        self.sections().count()
    }

    /// Root section ids, in order.
    pub fn root_sections(&self) -> &[SectionId] {
        &self.roots
    }

    /// Whether neither soma points nor sections exist.
    pub fn is_empty(&self) -> bool {
        self.soma.is_empty() && self.roots.is_empty()
    }

    pub fn mitochondria(&self) -> &MutableMitochondria {
        &self.mitochondria
    }

    pub fn endoplasmic_reticulum(&self) -> &EndoplasmicReticulum {
        &self.endoplasmic_reticulum
    }

    pub fn endoplasmic_reticulum_mut(&mut self) -> &mut EndoplasmicReticulum {
        &mut self.endoplasmic_reticulum
    }

    pub fn post_synaptic_density(&self) -> &[PostSynapticDensity] {
        &self.post_synaptic_density
    }

    pub fn add_post_synaptic_density(&mut self, psd: PostSynapticDensity) {
        self.post_synaptic_density.push(psd);
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    /// Whether any neurite section or the soma carries perimeter data.
    pub fn has_perimeters(&self) -> bool {
        self.soma.point_level().has_perimeters() || self.sections().any(|s| s.level.has_perimeters())
    }
}

// ============================================================================
// Building & Editing (pub)
// ============================================================================
impl MutableMorphology {
    /// Appends a new root section and returns its id.
    pub fn append_root_section(&mut self, level: PointLevel, section_type: SectionType) -> SectionId {
        let id = self.push_section(level, section_type, None);
        self.roots.push(id);
        id
    }

    /// Appends a new child section to `parent` and returns its id.
    ///
    /// # Errors
    /// [MorphError::UnknownSection] if `parent` does not exist.
    pub fn append_section(
        &mut self,
        parent: SectionId,
        level: PointLevel,
        section_type: SectionType,
    ) -> Result<SectionId, MorphError> {
        self.section(parent)?;
        let id = self.push_section(level, section_type, Some(parent));
        self.section_mut(parent)?.children.push(id);
        Ok(id)
    }

    fn push_section(&mut self, level: PointLevel, section_type: SectionType, parent: Option<SectionId>) -> SectionId {
        let id = self.sections.len();
        trace!("Appending section {id} of type {section_type} with {} points", level.len());
        self.sections.push(Some(MutableSection { id, section_type, level, parent, children: Vec::new(), line: None }));
        id
    }

    /// Appends a section below `parent`, or as root if `parent` is `None`
    /// or does not exist.
    pub(crate) fn attach_section(
        &mut self,
        parent: Option<SectionId>,
        level: PointLevel,
        section_type: SectionType,
    ) -> SectionId {
        match parent.filter(|&p| self.has_section(p)) {
            Some(p) => {
                let id = self.push_section(level, section_type, Some(p));
                if let Some(Some(parent)) = self.sections.get_mut(p) {
                    parent.children.push(id);
                }
                id
            }
            None => self.append_root_section(level, section_type),
        }
    }

    /// Deletes a section.
    ///
    /// With `recursive`, the whole subtree goes. Otherwise the children take
    /// the place of the deleted section among its siblings (or among the
    /// roots if it was a root), in order, and each starts again at the last
    /// point of its new parent.
    ///
    /// Organelle records and annotations on deleted sections are dropped;
    /// markers on them become top level markers.
    ///
    /// # Errors
    /// [MorphError::UnknownSection] if `id` does not exist.
    pub fn delete_section(&mut self, id: SectionId, recursive: bool) -> Result<(), MorphError> {
        let section = self.section(id)?;
        let parent = section.parent;
        let children = section.children.clone();

        let subtree: Vec<SectionId> = if recursive { self.depth_first_from(id).collect() } else { vec![id] };
        let replacement: Vec<SectionId> = if recursive { Vec::new() } else { children.clone() };

        let siblings = match parent {
            Some(p) => &mut self.section_mut(p)?.children,
            None => &mut self.roots,
        };
        if let Some(position) = siblings.iter().position(|&s| s == id) {
            let tail = siblings.split_off(position + 1);
            siblings.pop();
            siblings.extend(replacement);
            siblings.extend(tail);
        }
        if !recursive {
            let junction = match parent {
                Some(p) => self.section(p)?.level.last_sample(),
                None => None,
            };
            for child in children {
                let child = self.section_mut(child)?;
                child.parent = parent;
                if let Some([x, y, z, diameter]) = junction {
                    reconnect(&mut child.level, [x, y, z], diameter);
                }
            }
        }
        trace!("Deleting sections {subtree:?}");
        for &removed in &subtree {
            self.sections[removed] = None;
        }
        self.prune_references();
        Ok(())
    }

    /// Drops organelle records and annotations on sections that no longer
    /// exist, and detaches markers from them.
    fn prune_references(&mut self) {
        let sections = &self.sections;
        let live = |id: SectionId| matches!(sections.get(id), Some(Some(_))).then_some(id);
        self.mitochondria.remap_neurite_ids(live);
        self.endoplasmic_reticulum.remap_sections(live);
        self.post_synaptic_density.retain(|psd| live(psd.section_id).is_some());
        self.annotations.retain(|a| a.section_id < 0 || live(a.section_id as usize).is_some());
        for marker in &mut self.markers {
            if marker.section_id >= 0 && live(marker.section_id as usize).is_none() {
                marker.section_id = -1;
            }
        }
    }

    /// Appends a mitochondrial section, as root if `parent` is `None`.
    ///
    /// # Errors
    /// - [MorphError::UnknownSection] if a point refers to a missing neurite section
    /// - [MorphError::UnknownMitoSection] if `parent` does not exist
    pub fn append_mitochondrion(
        &mut self,
        parent: Option<SectionId>,
        level: MitoPointLevel,
    ) -> Result<SectionId, MorphError> {
        if let Some(&missing) = level.section_ids.iter().find(|&&s| self.section(s).is_err()) {
            return Err(MorphError::UnknownSection(missing));
        }
        match parent {
            Some(p) => self.mitochondria.append_section(p, level),
            None => Ok(self.mitochondria.append_root_section(level)),
        }
    }

    /// Replaces the mitochondria forest without any check.
    pub(crate) fn set_mitochondria(&mut self, mitochondria: MutableMitochondria) {
        self.mitochondria = mitochondria;
    }

    /// Stable reordering of the roots.
    pub(crate) fn sort_roots_by_key<K: Ord, F: Fn(&MutableSection) -> K>(&mut self, key: F) {
        let sections = &self.sections;
        self.roots.sort_by_key(|&r| sections[r].as_ref().map(&key));
    }

    /// Reparents all children of `from` onto `to`, appended after its own.
    pub(crate) fn adopt_children(&mut self, to: SectionId, from: SectionId) -> Result<Vec<SectionId>, MorphError> {
        let grandchildren = std::mem::take(&mut self.section_mut(from)?.children);
        for &g in &grandchildren {
            self.section_mut(g)?.parent = Some(to);
        }
        self.section_mut(to)?.children.extend(grandchildren.iter().copied());
        Ok(grandchildren)
    }

    /// Drops a child already merged into `parent`. Its markers move to the
    /// parent, other references to it are dropped.
    pub(crate) fn detach_merged_child(&mut self, parent: SectionId, child: SectionId) -> Result<(), MorphError> {
        self.section_mut(parent)?.children.retain(|&c| c != child);
        if let Some(slot) = self.sections.get_mut(child) {
            *slot = None;
        }
        for marker in self.markers.iter_mut().filter(|m| m.section_id == child as i64) {
            marker.section_id = parent as i64;
        }
        self.prune_references();
        Ok(())
    }
}

// ============================================================================
// Freezing (pub)
// ============================================================================
impl MutableMorphology {
    /// Freezes into an immutable [Morphology], renumbering the sections
    /// compactly in depth-first order.
    ///
    /// All references to neurite sections (organelles, markers and
    /// annotations) are renumbered along.
    pub fn to_immutable(&self) -> Morphology {
        let order: Vec<SectionId> = self.depth_first().collect();
        let mut new_ids = vec![None; self.sections.len()];
        for (new, &old) in order.iter().enumerate() {
            new_ids[old] = Some(new);
        }
        // `None` for ids of deleted sections
        let remap = |old: SectionId| new_ids.get(old).copied().flatten();
        let remap_signed = |old: i64| usize::try_from(old).ok().map(|old| remap(old).map(|new| new as i64));

        let sections: Vec<(SectionType, &PointLevel, Option<SectionId>)> = order
            .iter()
            .filter_map(|&old| self.sections[old].as_ref())
            .map(|s| (s.section_type, &s.level, s.parent.and_then(remap)))
            .collect();

        let mut mitochondria = self.mitochondria.clone();
        mitochondria.remap_neurite_ids(remap);
        let mut endoplasmic_reticulum = self.endoplasmic_reticulum.clone();
        endoplasmic_reticulum.remap_sections(remap);
        let post_synaptic_density = self
            .post_synaptic_density
            .iter()
            .filter_map(|psd| Some(PostSynapticDensity { section_id: remap(psd.section_id)?, ..*psd }))
            .collect();
        let markers = self
            .markers
            .iter()
            .map(|m| {
                let section_id = match remap_signed(m.section_id) {
                    Some(Some(new)) => new,
                    Some(None) => -1,
                    None => m.section_id,
                };
                Marker { section_id, ..m.clone() }
            })
            .collect();
        let annotations = self
            .annotations
            .iter()
            .filter_map(|a| {
                let section_id = match remap_signed(a.section_id) {
                    Some(new) => new?,
                    None => a.section_id,
                };
                Some(Annotation { section_id, ..a.clone() })
            })
            .collect();

        Morphology::from_parts(
            &sections,
            self.soma.clone(),
            self.cell_family,
            mitochondria.to_immutable(),
            endoplasmic_reticulum,
            post_synaptic_density,
            markers,
            annotations,
            self.uri.clone(),
        )
    }
}

/// Makes `level` start at `point`, prepending it unless the first point is
/// already there.
fn reconnect(level: &mut PointLevel, point: Point, diameter: f64) {
    match level.points.first() {
        Some(first) if points_equal(first, &point) => {}
        _ => level.insert_front(point, diameter, None),
    }
}

impl SectionTree for MutableMorphology {
    fn root_ids(&self) -> &[SectionId] {
        &self.roots
    }

    fn child_ids(&self, id: SectionId) -> &[SectionId] {
        self.section(id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    fn parent_id(&self, id: SectionId) -> Option<SectionId> {
        self.section(id).ok().and_then(|s| s.parent)
    }

    fn has_section(&self, id: SectionId) -> bool {
        self.section(id).is_ok()
    }
}

impl PartialEq for MutableMorphology {
    /// Structural equality, see [diff](crate::sanitize::diff).
    fn eq(&self, other: &Self) -> bool {
        self.to_immutable() == other.to_immutable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::enums::AnnotationType;

    fn level(y: f64) -> PointLevel {
        PointLevel::with_diameters(vec![[0., y, 0.], [0., y + 1., 0.]], vec![1., 1.]).unwrap()
    }

    /// root -> (a -> (c, d)), b
    fn build() -> (MutableMorphology, [SectionId; 5]) {
        let mut morph = MutableMorphology::new();
        let root = morph.append_root_section(level(0.), SectionType::Axon);
        let a = morph.append_section(root, level(1.), SectionType::Axon).unwrap();
        let b = morph.append_section(root, level(1.), SectionType::Axon).unwrap();
        let c = morph.append_section(a, level(2.), SectionType::Axon).unwrap();
        let d = morph.append_section(a, level(2.), SectionType::Axon).unwrap();
        (morph, [root, a, b, c, d])
    }

    #[test]
    fn test_delete_reparents_in_place() {
        let (mut morph, [root, a, b, c, d]) = build();
        morph.delete_section(a, false).unwrap();
        assert_eq!(morph.section(root).unwrap().children(), &[c, d, b]);
        assert_eq!(morph.section(c).unwrap().parent(), Some(root));
        assert!(matches!(morph.section(a), Err(MorphError::UnknownSection(id)) if id == a));
    }

    #[test]
    fn test_delete_reconnects_children_to_new_parent() {
        let (mut morph, [root, a, _, c, d]) = build();
        morph.delete_section(a, false).unwrap();
        let end = morph.section(root).unwrap().point_level().last_sample().unwrap();
        for child in [c, d] {
            let section = morph.section(child).unwrap();
            assert_eq!(section.point_level().first_sample(), Some(end));
            assert_eq!(section.points().len(), 3);
            assert_eq!(section.diameters().len(), 3);
        }
    }

    #[test]
    fn test_delete_drops_references_to_removed_sections() {
        let (mut morph, [_, a, b, c, _]) = build();
        let on_a = MitoPointLevel::new(vec![a, c], vec![0.1, 0.2], vec![1., 1.]).unwrap();
        let mito = morph.append_mitochondrion(None, on_a).unwrap();
        let on_b = MitoPointLevel::new(vec![b], vec![0.5], vec![1.]).unwrap();
        morph.append_mitochondrion(Some(mito), on_b).unwrap();
        morph.endoplasmic_reticulum_mut().push(c, 1., 1., 1);
        morph.endoplasmic_reticulum_mut().push(b, 2., 2., 2);
        morph.add_post_synaptic_density(PostSynapticDensity { section_id: a, segment_id: 0, offset: 0.5 });
        morph.add_marker(Marker::new("Dot", level(0.), c as i64));
        morph.add_annotation(Annotation::new(AnnotationType::SingleChild, a as i64, level(0.), 3));

        morph.delete_section(a, true).unwrap();
        assert_eq!(morph.mitochondria().len(), 1);
        assert_eq!(morph.mitochondria().section(0).unwrap().neurite_section_ids(), &[b]);
        assert_eq!(morph.endoplasmic_reticulum().section_indices, vec![b]);
        assert!(morph.post_synaptic_density().is_empty());
        assert!(morph.annotations().is_empty());
        assert_eq!(morph.markers()[0].section_id, -1);

        // b is the second section once frozen
        let frozen = morph.to_immutable();
        assert_eq!(frozen.mitochondria().section(0).unwrap().neurite_section_ids(), &[1]);
        assert_eq!(frozen.endoplasmic_reticulum().section_indices, vec![1]);
        assert_eq!(frozen.markers()[0].section_id, -1);
    }

    #[test]
    fn test_freeze_skips_references_to_missing_sections() {
        let (mut morph, [root, ..]) = build();
        morph.add_post_synaptic_density(PostSynapticDensity { section_id: 99, segment_id: 0, offset: 0.5 });
        morph.add_post_synaptic_density(PostSynapticDensity { section_id: root, segment_id: 1, offset: 0.5 });
        morph.add_annotation(Annotation::new(AnnotationType::SingleChild, 99, level(0.), -1));
        let frozen = morph.to_immutable();
        assert_eq!(frozen.post_synaptic_density().len(), 1);
        assert_eq!(frozen.post_synaptic_density()[0].segment_id, 1);
        assert!(frozen.annotations().is_empty());
    }

    #[test]
    fn test_delete_root_promotes_children() {
        let (mut morph, [root, a, b, _, _]) = build();
        morph.delete_section(root, false).unwrap();
        assert_eq!(morph.root_sections(), &[a, b]);
        assert!(morph.section(a).unwrap().is_root());
    }

    #[test]
    fn test_delete_recursive_and_ids_not_reused() {
        let (mut morph, [root, a, b, _, _]) = build();
        morph.delete_section(a, true).unwrap();
        assert_eq!(morph.section_count(), 2);
        assert_eq!(morph.section(root).unwrap().children(), &[b]);
        let new = morph.append_section(root, level(5.), SectionType::Axon).unwrap();
        assert_eq!(new, 5);
        assert!(morph.delete_section(a, true).is_err());
    }

    #[test]
    fn test_clone_is_independent() {
        let (mut morph, [_, a, ..]) = build();
        let copy = morph.clone();
        morph.delete_section(a, true).unwrap();
        assert!(copy.section(a).is_ok());
    }

    #[test]
    fn test_freeze_renumbers_depth_first() {
        let (mut morph, [_, a, _, _, _]) = build();
        morph.delete_section(a, false).unwrap();
        let frozen = morph.to_immutable();
        assert_eq!(frozen.section_count(), 4);
        assert_eq!(frozen.depth_first().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(frozen.section(3).unwrap().parent().map(|p| p.id()), Some(0));
    }

    #[test]
    fn test_mitochondrion_checks_neurite_ids() {
        let (mut morph, [root, ..]) = build();
        let points = MitoPointLevel::new(vec![root, 42], vec![0.1, 0.2], vec![1., 1.]).unwrap();
        assert!(matches!(morph.append_mitochondrion(None, points), Err(MorphError::UnknownSection(42))));
    }
}
