//! Structural equality and diff of morphologies.

use crate::model::{Morphology, MutableMorphology, Point, SectionId, SectionTree, geometry::almost_equal};
use serde::Serialize;
use std::fmt;

/// What differs at the first divergence of two morphologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DivergenceKind {
    RootCountDiffers,
    SomaDiffers,
    TypeDiffers,
    PointsDiffer,
    DiametersDiffer,
    PerimetersDiffer,
    ChildCountDiffers,
}

/// First divergence found by [diff].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffReport {
    pub kind: DivergenceKind,
    /// Where, e.g. `section 3 (root 0, depth 2)`
    pub locator: String,
    pub message: String,
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.locator, self.message)
    }
}

fn report<S: Into<String>>(kind: DivergenceKind, locator: String, message: S) -> Option<DiffReport> {
    Some(DiffReport { kind, locator, message: message.into() })
}

fn floats_equal(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| almost_equal(*x, *y))
}

fn points_equal(a: &[Point], b: &[Point]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.iter().zip(q).all(|(x, y)| almost_equal(*x, *y)))
}

/// Compares two morphologies in lock step, depth first, and returns the
/// first divergence, `None` if they are equal.
///
/// Compared are the soma points and diameters, the number of roots, and
/// for every section its type, points, diameters, perimeters and number of
/// children, all in stored order. Floats are compared with the tolerance
/// of [almost_equal].
pub fn diff(a: &Morphology, b: &Morphology) -> Option<DiffReport> {
    let (soma_a, soma_b) = (a.soma(), b.soma());
    if !points_equal(soma_a.points(), soma_b.points()) || !floats_equal(soma_a.diameters(), soma_b.diameters()) {
        return report(DivergenceKind::SomaDiffers, "soma".to_string(), "Soma points or diameters differ");
    }
    if a.root_ids().len() != b.root_ids().len() {
        return report(
            DivergenceKind::RootCountDiffers,
            "root sections".to_string(),
            format!("{} vs {} root sections", a.root_ids().len(), b.root_ids().len()),
        );
    }

    // (section in a, section in b, root index, depth)
    let mut stack: Vec<(SectionId, SectionId, usize, usize)> =
        a.root_ids().iter().zip(b.root_ids()).enumerate().rev().map(|(r, (&x, &y))| (x, y, r, 0)).collect();
    while let Some((id_a, id_b, root, depth)) = stack.pop() {
        let (Ok(x), Ok(y)) = (a.section(id_a), b.section(id_b)) else { continue };
        let locator = format!("section {id_a} (root {root}, depth {depth})");
        if x.section_type() != y.section_type() {
            let message = format!("{} vs {}", x.section_type(), y.section_type());
            return report(DivergenceKind::TypeDiffers, locator, message);
        }
        if !points_equal(x.points(), y.points()) {
            return report(DivergenceKind::PointsDiffer, locator, "Points differ");
        }
        if !floats_equal(x.diameters(), y.diameters()) {
            return report(DivergenceKind::DiametersDiffer, locator, "Diameters differ");
        }
        if !floats_equal(x.perimeters(), y.perimeters()) {
            return report(DivergenceKind::PerimetersDiffer, locator, "Perimeters differ");
        }
        let (children_a, children_b) = (a.child_ids(id_a), b.child_ids(id_b));
        if children_a.len() != children_b.len() {
            let message = format!("{} vs {} children", children_a.len(), children_b.len());
            return report(DivergenceKind::ChildCountDiffers, locator, message);
        }
        stack.extend(children_a.iter().zip(children_b).rev().map(|(&c, &d)| (c, d, root, depth + 1)));
    }
    None
}

/// [diff] for mutable morphologies, comparing their frozen forms.
pub fn diff_mutable(a: &MutableMorphology, b: &MutableMorphology) -> Option<DiffReport> {
    diff(&a.to_immutable(), &b.to_immutable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PointLevel, SectionType};

    fn morphology(end: f64) -> MutableMorphology {
        let mut morph = MutableMorphology::new();
        let level = |y: f64| PointLevel::with_diameters(vec![[0., 0., 0.], [0., y, 0.]], vec![1., 1.]).unwrap();
        let root = morph.append_root_section(level(1.), SectionType::Axon);
        let first = morph.append_section(root, level(2.), SectionType::Axon).unwrap();
        morph.append_section(root, level(2.), SectionType::Axon).unwrap();
        morph.append_section(first, level(end), SectionType::Axon).unwrap();
        morph
    }

    #[test]
    fn test_diff_locates_divergence() {
        assert_eq!(diff_mutable(&morphology(3.), &morphology(3.)), None);
        let report = diff_mutable(&morphology(3.), &morphology(4.)).unwrap();
        assert_eq!(report.kind, DivergenceKind::PointsDiffer);
        assert_eq!(report.locator, "section 2 (root 0, depth 2)");
    }

    #[test]
    fn test_diff_root_count() {
        let mut other = morphology(3.);
        other.append_root_section(PointLevel::default(), SectionType::Axon);
        let report = diff_mutable(&morphology(3.), &other).unwrap();
        assert_eq!(report.kind, DivergenceKind::RootCountDiffers);
        assert!(morphology(3.) != other);
    }
}
