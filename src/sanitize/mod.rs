//! Sanitation of mutable morphologies.
//!
//! - [remove_unifurcations]: merges single children into their parent
//! - [apply_modifiers]: post-load normalizations, see [Modifiers](crate::model::Modifiers)
//! - [diff]: structural comparison reporting the first divergence

mod diff;
mod modifiers;

pub use self::diff::{DiffReport, DivergenceKind, diff, diff_mutable};
pub use self::modifiers::{apply_modifiers, no_duplicate_points, nrn_order, soma_sphere, two_points_sections};

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::MorphError;
use crate::model::{Annotation, AnnotationType, MutableMorphology, SectionId, geometry};
use tracing::debug;

/// Merges every section that is the only child of its parent into the
/// parent, and warns about sections not starting with a copy of their
/// parent's last point.
///
/// Each merge records a [SingleChild](AnnotationType::SingleChild)
/// annotation holding the merged child's points and the source line of the
/// parent, `-1` for sections built in memory. The children of a merged
/// section become children of the parent. Roots and leaves are never
/// affected and a second call changes nothing.
///
/// # Errors
/// A raised warning, depending on the policy of `diagnostics`.
pub fn remove_unifurcations(morph: &mut MutableMorphology, diagnostics: &mut Diagnostics) -> Result<(), MorphError> {
    let uri = morph.uri().to_string();
    let mut merged = 0usize;
    let mut stack: Vec<SectionId> = morph.root_sections().iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let Some(parent) = morph.section(id)?.parent() else {
            stack.extend(morph.section(id)?.children().iter().rev());
            continue;
        };
        let parent_last = morph.section(parent)?.point_level().last_sample();
        let child_first = morph.section(id)?.point_level().first_sample();
        let duplicated = match (parent_last, child_first) {
            (Some(p), Some(c)) => geometry::points_equal(&[p[0], p[1], p[2]], &[c[0], c[1], c[2]]),
            _ => false,
        };
        if !duplicated {
            diagnostics.emit(Warning::wrong_duplicate(&uri, id, parent, parent_last, child_first))?;
        }

        if morph.section(parent)?.children().len() != 1 {
            stack.extend(morph.section(id)?.children().iter().rev());
            continue;
        }

        diagnostics.emit(Warning::only_child(&uri, parent, id))?;
        let child_level = morph.section(id)?.point_level().clone();
        let line = morph.section(parent)?.source_line().map_or(-1, |line| line as i64);
        morph.add_annotation(Annotation::new(AnnotationType::SingleChild, parent as i64, child_level.clone(), line));
        morph.section_mut(parent)?.point_level_mut().extend_from(&child_level, usize::from(duplicated));

        let grandchildren = morph.adopt_children(parent, id)?;
        morph.detach_merged_child(parent, id)?;
        merged += 1;
        // a single grandchild is the parent's only child again
        stack.extend(grandchildren.iter().rev());
    }
    debug!("Merged {merged} unifurcations of {uri}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{WarningKind, WarningPolicy};
    use crate::model::{PointLevel, SectionTree, SectionType};

    fn level(xs: &[f64]) -> PointLevel {
        PointLevel::with_diameters(xs.iter().map(|&x| [x, 0., 0.]).collect(), vec![1.; xs.len()]).unwrap()
    }

    #[test]
    fn test_merge_single_child() {
        let mut morph = MutableMorphology::new();
        let root = morph.append_root_section(level(&[0., 1., 2., 3.]), SectionType::BasalDendrite);
        let child = morph.append_section(root, level(&[3., 4., 5.]), SectionType::BasalDendrite).unwrap();
        let a = morph.append_section(child, level(&[5., 6.]), SectionType::BasalDendrite).unwrap();
        let b = morph.append_section(child, level(&[5., 7.]), SectionType::BasalDendrite).unwrap();

        let mut diagnostics = Diagnostics::new(WarningPolicy::collecting());
        remove_unifurcations(&mut morph, &mut diagnostics).unwrap();

        let xs: Vec<f64> = morph.section(root).unwrap().points().iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![0., 1., 2., 3., 4., 5.]);
        assert_eq!(morph.section(root).unwrap().children(), &[a, b]);
        assert!(morph.section(child).is_err());
        assert_eq!(diagnostics.count(WarningKind::OnlyChild), 1);
        assert_eq!(diagnostics.count(WarningKind::WrongDuplicate), 0);
        assert_eq!(morph.annotations().len(), 1);
        assert_eq!(morph.annotations()[0].section_id, root as i64);
    }

    #[test]
    fn test_chain_collapses_and_is_idempotent() {
        let mut morph = MutableMorphology::new();
        let root = morph.append_root_section(level(&[0., 1.]), SectionType::Axon);
        let mid = morph.append_section(root, level(&[1., 2.]), SectionType::Axon).unwrap();
        morph.append_section(mid, level(&[2., 3.]), SectionType::Axon).unwrap();

        let mut diagnostics = Diagnostics::new(WarningPolicy::collecting());
        remove_unifurcations(&mut morph, &mut diagnostics).unwrap();
        assert_eq!(morph.section_count(), 1);
        assert_eq!(morph.section(root).unwrap().points().len(), 4);

        let once = morph.clone();
        remove_unifurcations(&mut morph, &mut diagnostics).unwrap();
        assert!(morph == once);
        assert_eq!(morph.leaves().len(), 1);
    }

    #[test]
    fn test_missing_duplicate_warns_and_keeps_point() {
        let mut morph = MutableMorphology::new();
        let root = morph.append_root_section(level(&[0., 1.]), SectionType::Axon);
        morph.append_section(root, level(&[2., 3.]), SectionType::Axon).unwrap();
        morph.append_section(root, level(&[1., 3.]), SectionType::Axon).unwrap();

        let mut diagnostics = Diagnostics::new(WarningPolicy::collecting());
        remove_unifurcations(&mut morph, &mut diagnostics).unwrap();
        assert_eq!(diagnostics.count(WarningKind::WrongDuplicate), 1);
        assert_eq!(morph.section_count(), 3);
    }
}
