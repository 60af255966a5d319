//! Organelles: mitochondria forests, the endoplasmic reticulum and the
//! post-synaptic densities of spines.

use crate::error::MorphError;
use crate::model::iterators::{SectionId, SectionTree};
use serde::{Deserialize, Serialize};

// =#========================================================================#=
// MITOCHONDRIA
// =#========================================================================#=
/// Points of a mitochondrial section, located along neurite sections.
///
/// Each point is given by the neurite section it lies in, its relative path
/// length within that section (in `[0, 1]`) and its diameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MitoPointLevel {
    pub section_ids: Vec<SectionId>,
    pub relative_path_lengths: Vec<f64>,
    pub diameters: Vec<f64>,
}

impl MitoPointLevel {
    /// Creates a mitochondrial point level.
    ///
    /// # Errors
    /// If the three vectors differ in length or a relative path length is
    /// outside `[0, 1]`.
    pub fn new(
        section_ids: Vec<SectionId>,
        relative_path_lengths: Vec<f64>,
        diameters: Vec<f64>,
    ) -> Result<Self, MorphError> {
        if section_ids.len() != relative_path_lengths.len() || section_ids.len() != diameters.len() {
            return Err(MorphError::InvalidPointLevel(format!(
                "While appending mitochondrial points: section id vector has size {}, relative path \
                 length vector has size {} and diameter vector has size {}",
                section_ids.len(),
                relative_path_lengths.len(),
                diameters.len()
            )));
        }
        if let Some(bad) = relative_path_lengths.iter().find(|l| !(0.0..=1.0).contains(*l)) {
            return Err(MorphError::InvalidPointLevel(format!(
                "Relative path length must be within [0, 1], got: {bad}"
            )));
        }
        Ok(Self { section_ids, relative_path_lengths, diameters })
    }

    pub fn len(&self) -> usize {
        self.section_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.section_ids.is_empty()
    }
}

/// A section of a mitochondria forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitoSection {
    id: SectionId,
    level: MitoPointLevel,
    parent: Option<SectionId>,
    children: Vec<SectionId>,
}

impl MitoSection {
    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn point_level(&self) -> &MitoPointLevel {
        &self.level
    }

    pub fn neurite_section_ids(&self) -> &[SectionId] {
        &self.level.section_ids
    }

    pub fn relative_path_lengths(&self) -> &[f64] {
        &self.level.relative_path_lengths
    }

    pub fn diameters(&self) -> &[f64] {
        &self.level.diameters
    }

    pub fn parent(&self) -> Option<SectionId> {
        self.parent
    }

    pub fn children(&self) -> &[SectionId] {
        &self.children
    }
}

/// Editable mitochondria forest, with ids independent of the neurite tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutableMitochondria {
    sections: Vec<MitoSection>,
    roots: Vec<SectionId>,
}

impl MutableMitochondria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new root section and returns its id.
    pub fn append_root_section(&mut self, level: MitoPointLevel) -> SectionId {
        let id = self.push(level, None);
        self.roots.push(id);
        id
    }

    /// Appends a child section to `parent` and returns its id.
    ///
    /// # Errors
    /// [MorphError::UnknownMitoSection] if `parent` does not exist.
    pub fn append_section(&mut self, parent: SectionId, level: MitoPointLevel) -> Result<SectionId, MorphError> {
        if parent >= self.sections.len() {
            return Err(MorphError::UnknownMitoSection(parent));
        }
        let id = self.push(level, Some(parent));
        self.sections[parent].children.push(id);
        Ok(id)
    }

    fn push(&mut self, level: MitoPointLevel, parent: Option<SectionId>) -> SectionId {
        let id = self.sections.len();
        self.sections.push(MitoSection { id, level, parent, children: Vec::new() });
        id
    }

    pub fn section(&self, id: SectionId) -> Result<&MitoSection, MorphError> {
        self.sections.get(id).ok_or(MorphError::UnknownMitoSection(id))
    }

    /// Sections in id order.
    pub fn sections(&self) -> &[MitoSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Rewrites the neurite section ids of all points, e.g. after the
    /// neurite tree was renumbered.
    ///
    /// Points mapped to `None` are dropped. Sections losing all their points
    /// go as well, their children moving up to the closest kept ancestor.
    pub(crate) fn remap_neurite_ids<F: Fn(SectionId) -> Option<SectionId>>(&mut self, map: F) {
        let mut emptied = vec![false; self.sections.len()];
        for section in &mut self.sections {
            let level = &mut section.level;
            let was_empty = level.is_empty();
            let mapped: Vec<Option<SectionId>> = level.section_ids.iter().map(|&id| map(id)).collect();
            let mut kept = MitoPointLevel::default();
            for (i, id) in mapped.into_iter().enumerate() {
                let Some(id) = id else { continue };
                kept.section_ids.push(id);
                kept.relative_path_lengths.extend(level.relative_path_lengths.get(i));
                kept.diameters.extend(level.diameters.get(i));
            }
            *level = kept;
            emptied[section.id] = !was_empty && level.is_empty();
        }
        if emptied.contains(&true) {
            self.remove_sections(&emptied);
        }
    }

    /// Rebuilds the forest without the flagged sections, in depth-first order.
    fn remove_sections(&mut self, removed: &[bool]) {
        let old = std::mem::take(self);
        let mut new_id: Vec<Option<SectionId>> = vec![None; old.sections.len()];
        for id in old.depth_first() {
            if removed[id] {
                continue;
            }
            let mut parent = old.sections[id].parent;
            while let Some(p) = parent.filter(|&p| removed[p]) {
                parent = old.sections[p].parent;
            }
            let parent = parent.and_then(|p| new_id[p]);
            let new = self.push(old.sections[id].level.clone(), parent);
            match parent {
                Some(p) => self.sections[p].children.push(new),
                None => self.roots.push(new),
            }
            new_id[id] = Some(new);
        }
    }

    /// Freezes the forest, renumbering its sections in depth-first order.
    pub fn to_immutable(&self) -> Mitochondria {
        let order: Vec<SectionId> = self.depth_first().collect();
        let mut new_id = vec![0; self.sections.len()];
        for (new, &old) in order.iter().enumerate() {
            new_id[old] = new;
        }
        let sections = order
            .iter()
            .map(|&old| {
                let section = &self.sections[old];
                MitoSection {
                    id: new_id[old],
                    level: section.level.clone(),
                    parent: section.parent.map(|p| new_id[p]),
                    children: section.children.iter().map(|&c| new_id[c]).collect(),
                }
            })
            .collect();
        let roots = self.roots.iter().map(|&r| new_id[r]).collect();
        Mitochondria { inner: MutableMitochondria { sections, roots } }
    }
}

impl SectionTree for MutableMitochondria {
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

/// Read-only mitochondria forest with depth-first numbered sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mitochondria {
    inner: MutableMitochondria,
}

impl Mitochondria {
    pub fn section(&self, id: SectionId) -> Result<&MitoSection, MorphError> {
        self.inner.section(id)
    }

    pub fn sections(&self) -> &[MitoSection] {
        self.inner.sections()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn to_mutable(&self) -> MutableMitochondria {
        self.inner.clone()
    }
}

impl SectionTree for Mitochondria {
    fn root_ids(&self) -> &[SectionId] {
        self.inner.root_ids()
    }

    fn child_ids(&self, id: SectionId) -> &[SectionId] {
        self.inner.child_ids(id)
    }

    fn parent_id(&self, id: SectionId) -> Option<SectionId> {
        self.inner.parent_id(id)
    }

    fn has_section(&self, id: SectionId) -> bool {
        self.inner.has_section(id)
    }
}

// =#========================================================================#=
// ENDOPLASMIC RETICULUM
// =#========================================================================#=
/// Per-section endoplasmic reticulum records, as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndoplasmicReticulum {
    pub section_indices: Vec<SectionId>,
    pub volumes: Vec<f64>,
    pub surface_areas: Vec<f64>,
    pub filament_counts: Vec<u32>,
}

impl EndoplasmicReticulum {
    /// Adds the record of one neurite section.
    pub fn push(&mut self, section_index: SectionId, volume: f64, surface_area: f64, filament_count: u32) {
        self.section_indices.push(section_index);
        self.volumes.push(volume);
        self.surface_areas.push(surface_area);
        self.filament_counts.push(filament_count);
    }

    pub fn len(&self) -> usize {
        self.section_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.section_indices.is_empty()
    }

    /// Rewrites the section index of every record, dropping those mapped
    /// to `None`.
    pub(crate) fn remap_sections<F: Fn(SectionId) -> Option<SectionId>>(&mut self, map: F) {
        let mapped: Vec<Option<SectionId>> = self.section_indices.iter().map(|&id| map(id)).collect();
        let keep: Vec<bool> = mapped.iter().map(Option::is_some).collect();
        self.section_indices = mapped.into_iter().flatten().collect();
        retain_flagged(&mut self.volumes, &keep);
        retain_flagged(&mut self.surface_areas, &keep);
        retain_flagged(&mut self.filament_counts, &keep);
    }

    /// Checks the four arrays match in length.
    pub fn validate(&self) -> Result<(), MorphError> {
        let n = self.section_indices.len();
        if self.volumes.len() != n || self.surface_areas.len() != n || self.filament_counts.len() != n {
            return Err(MorphError::InvalidPointLevel(format!(
                "Endoplasmic reticulum vectors differ in size: section indices {}, volumes {}, \
                 surface areas {}, filament counts {}",
                n,
                self.volumes.len(),
                self.surface_areas.len(),
                self.filament_counts.len()
            )));
        }
        Ok(())
    }
}

/// Keeps the values flagged in `keep`, and any beyond its length.
fn retain_flagged<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    values.retain(|_| {
        let kept = keep.get(i).copied().unwrap_or(true);
        i += 1;
        kept
    });
}

// =#========================================================================#=
// POST-SYNAPTIC DENSITY
// =#========================================================================#=
/// Location of a post-synaptic density on a dendritic spine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostSynapticDensity {
    pub section_id: SectionId,
    pub segment_id: usize,
    pub offset: f64,
}
