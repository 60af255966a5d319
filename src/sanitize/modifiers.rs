//! Load modifiers: normalizations applied right after parsing.

use crate::model::{Modifiers, MutableMorphology, PointLevel, SectionTree, geometry};
use tracing::trace;

/// Applies the given modifiers, in the order: two point sections, soma
/// sphere, no duplicates, NRN root order.
pub fn apply_modifiers(morph: &mut MutableMorphology, modifiers: Modifiers) {
    if modifiers.is_empty() {
        return;
    }
    trace!("Applying modifiers {modifiers:?} to {}", morph.uri());
    if modifiers.contains(Modifiers::TWO_POINTS_SECTIONS) {
        two_points_sections(morph);
    }
    if modifiers.contains(Modifiers::SOMA_SPHERE) {
        soma_sphere(morph);
    }
    if modifiers.contains(Modifiers::NO_DUPLICATES) {
        no_duplicate_points(morph);
    }
    if modifiers.contains(Modifiers::NRN_ORDER) {
        nrn_order(morph);
    }
}

/// Keeps only the first and last point of every section.
pub fn two_points_sections(morph: &mut MutableMorphology) {
    for section in morph.sections.iter_mut().flatten() {
        let n = section.points().len();
        if n > 2 {
            section.point_level_mut().retain_indices(&[0, n - 1]);
        }
    }
}

/// Collapses the soma into its centroid, with the mean distance of the
/// soma points to the centroid as diameter.
pub fn soma_sphere(morph: &mut MutableMorphology) {
    let points = morph.soma().points();
    if points.len() < 2 {
        return;
    }
    let Some(center) = geometry::center_of_gravity(points) else { return };
    let mean_distance = points.iter().map(|p| geometry::distance(p, &center)).sum::<f64>() / points.len() as f64;
    morph.set_soma_point_level(PointLevel { points: vec![center], diameters: vec![mean_distance], perimeters: vec![] });
}

/// Drops the first point of every non-root section, i.e. the copy of the
/// parent's last point.
pub fn no_duplicate_points(morph: &mut MutableMorphology) {
    let non_roots: Vec<_> = morph.depth_first().filter(|&id| morph.parent_id(id).is_some()).collect();
    for id in non_roots {
        if let Ok(section) = morph.section_mut(id) {
            section.point_level_mut().remove_front();
        }
    }
}

/// Stable-sorts the roots by type code, as NEURON orders them.
pub fn nrn_order(morph: &mut MutableMorphology) {
    morph.sort_roots_by_key(|section| section.section_type());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionType;

    fn level(n: usize) -> PointLevel {
        let points = (0..n).map(|i| [i as f64, 0., 0.]).collect();
        PointLevel::with_diameters(points, vec![1.; n]).unwrap()
    }

    #[test]
    fn test_two_points_and_no_duplicates() {
        let mut morph = MutableMorphology::new();
        let root = morph.append_root_section(level(4), SectionType::Axon);
        let child = morph.append_section(root, level(3), SectionType::Axon).unwrap();
        apply_modifiers(&mut morph, Modifiers::TWO_POINTS_SECTIONS | Modifiers::NO_DUPLICATES);
        assert_eq!(morph.section(root).unwrap().points(), &[[0., 0., 0.], [3., 0., 0.]]);
        assert_eq!(morph.section(child).unwrap().points(), &[[2., 0., 0.]]);
    }

    #[test]
    fn test_soma_sphere() {
        let mut morph = MutableMorphology::new();
        morph.set_soma_point_level(
            PointLevel::with_diameters(vec![[-1., 0., 0.], [1., 0., 0.], [0., 3., 0.], [0., -3., 0.]], vec![1.; 4])
                .unwrap(),
        );
        soma_sphere(&mut morph);
        assert_eq!(morph.soma().points(), &[[0., 0., 0.]]);
        assert_eq!(morph.soma().diameters(), &[2.]);
    }

    #[test]
    fn test_nrn_order_is_stable() {
        let mut morph = MutableMorphology::new();
        let apical = morph.append_root_section(level(2), SectionType::ApicalDendrite);
        let basal_1 = morph.append_root_section(level(2), SectionType::BasalDendrite);
        let axon = morph.append_root_section(level(2), SectionType::Axon);
        let basal_2 = morph.append_root_section(level(2), SectionType::BasalDendrite);
        nrn_order(&mut morph);
        assert_eq!(morph.root_sections(), &[axon, basal_1, basal_2, apical]);
    }
}
