mod common;

use common::collecting;
use neuromorph::model::{MutableMorphology, PointLevel, SectionTree, SectionType};
use neuromorph::sanitize::remove_unifurcations;
use proptest::prelude::*;
use std::collections::HashSet;

/// Forest where section `i` hangs below `parents[i] % (i + 1)`, or is a root
/// when that is `i` itself. Points chain from the parent's last point.
fn forest(parents: &[usize]) -> MutableMorphology {
    let mut morph = MutableMorphology::new();
    let mut last_points: Vec<[f64; 3]> = Vec::new();
    for (i, &raw) in parents.iter().enumerate() {
        let parent = raw % (i + 1);
        let x = i as f64;
        let (start, parent) = if parent == i { ([x, 0., 0.], None) } else { (last_points[parent], Some(parent)) };
        let end = [start[0] + 1., start[1] + 1., x];
        let level = PointLevel::with_diameters(vec![start, end], vec![1., 1.]).unwrap();
        let id = match parent {
            Some(parent) => morph.append_section(parent, level, SectionType::BasalDendrite).unwrap(),
            None => morph.append_root_section(level, SectionType::BasalDendrite),
        };
        assert_eq!(id, i);
        last_points.push(end);
    }
    morph
}

fn parents_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..64, 1..48)
}

proptest! {
    #[test]
    fn test_depth_first_visits_parents_first(parents in parents_strategy()) {
        let morph = forest(&parents);
        let order: Vec<usize> = morph.depth_first().collect();
        prop_assert_eq!(order.len(), morph.section_count());
        prop_assert_eq!(order.iter().collect::<HashSet<_>>().len(), order.len());

        let position: Vec<usize> = {
            let mut position = vec![0; order.len()];
            for (i, &id) in order.iter().enumerate() {
                position[id] = i;
            }
            position
        };
        for &id in &order {
            if let Some(parent) = morph.parent_id(id) {
                prop_assert!(position[parent] < position[id]);
            }
            // a subtree is a contiguous run starting at its root
            let subtree: Vec<usize> = morph.depth_first_from(id).collect();
            prop_assert_eq!(&order[position[id]..position[id] + subtree.len()], &subtree[..]);
        }
    }

    #[test]
    fn test_breadth_first_is_level_ordered(parents in parents_strategy()) {
        let morph = forest(&parents);
        let order: Vec<usize> = morph.breadth_first().collect();
        prop_assert_eq!(order.iter().collect::<HashSet<_>>().len(), morph.section_count());
        let depths: Vec<usize> = order.iter().map(|&id| morph.depth(id)).collect();
        prop_assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_upstream_ends_at_a_root(parents in parents_strategy()) {
        let morph = forest(&parents);
        let roots: HashSet<usize> = morph.root_ids().iter().copied().collect();
        for id in morph.depth_first() {
            let path: Vec<usize> = morph.upstream(id).collect();
            prop_assert_eq!(path[0], id);
            prop_assert!(roots.contains(path.last().unwrap()));
            for pair in path.windows(2) {
                prop_assert_eq!(morph.parent_id(pair[0]), Some(pair[1]));
            }
        }
    }

    #[test]
    fn test_unifurcation_removal_keeps_roots_and_leaves(parents in parents_strategy()) {
        let mut morph = forest(&parents);
        let roots = morph.root_ids().len();
        let leaves = morph.leaves().len();
        let points: usize = morph.sections().map(|s| s.points().len()).sum();
        let merges = morph.depth_first().filter(|&id| morph.child_ids(id).len() == 1).count();

        let mut diagnostics = collecting();
        remove_unifurcations(&mut morph, &mut diagnostics).unwrap();
        prop_assert_eq!(morph.root_ids().len(), roots);
        prop_assert_eq!(morph.leaves().len(), leaves);
        prop_assert_eq!(morph.annotations().len(), merges);
        // every merge drops the child's copy of its parent's last point
        let merged_points: usize = morph.sections().map(|s| s.points().len()).sum();
        prop_assert_eq!(merged_points, points - merges);
        prop_assert!(morph.depth_first().all(|id| morph.child_ids(id).len() != 1));

        let once = morph.clone();
        remove_unifurcations(&mut morph, &mut diagnostics).unwrap();
        prop_assert!(morph == once);
        prop_assert_eq!(morph.annotations().len(), merges);
    }
}
