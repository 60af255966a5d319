//! Traversal orders over section forests.
//!
//! All iterators are lazy and yield [SectionId]s. They are defined once for
//! any [SectionTree]: the neurite tree of [Morphology](crate::model::Morphology)
//! and [MutableMorphology](crate::model::MutableMorphology), and both
//! mitochondria forests.

use std::collections::VecDeque;

/// Index of a section in its morphology (or mitochondria forest).
pub type SectionId = usize;

// =#========================================================================#=
// SECTION TREE (Trait)
// =#========================================================================#=
/// A forest of sections addressed by id.
///
/// Implementors only describe the topology; the traversal orders come for
/// free.
///
/// # Example
/// ```
/// use neuromorph::model::{MutableMorphology, PointLevel, SectionTree, SectionType};
///
/// let mut morph = MutableMorphology::new();
/// let level = PointLevel::with_diameters(vec![[0., 0., 0.], [1., 0., 0.]], vec![1., 1.]).unwrap();
/// let root = morph.append_root_section(level.clone(), SectionType::Axon);
/// let a = morph.append_section(root, level.clone(), SectionType::Axon).unwrap();
/// let b = morph.append_section(root, level.clone(), SectionType::Axon).unwrap();
/// let c = morph.append_section(a, level, SectionType::Axon).unwrap();
///
/// assert_eq!(morph.depth_first().collect::<Vec<_>>(), vec![root, a, c, b]);
/// assert_eq!(morph.breadth_first().collect::<Vec<_>>(), vec![root, a, b, c]);
/// assert_eq!(morph.upstream(c).collect::<Vec<_>>(), vec![c, a, root]);
/// ```
pub trait SectionTree {
    /// Root section ids, in stored order.
    fn root_ids(&self) -> &[SectionId];

    /// Child ids of a section, in stored order; empty for unknown ids.
    fn child_ids(&self, id: SectionId) -> &[SectionId];

    /// Parent id of a section; `None` for roots and unknown ids.
    fn parent_id(&self, id: SectionId) -> Option<SectionId>;

    /// Whether the section id exists.
    fn has_section(&self, id: SectionId) -> bool;

    /// Pre-order traversal, all roots in order.
    fn depth_first(&self) -> DepthFirstIter<'_, Self>
    where
        Self: Sized,
    {
        DepthFirstIter::new(self, self.root_ids().to_vec())
    }

    /// Pre-order traversal of the subtree at `id`.
    fn depth_first_from(&self, id: SectionId) -> DepthFirstIter<'_, Self>
    where
        Self: Sized,
    {
        let start = if self.has_section(id) { vec![id] } else { Vec::new() };
        DepthFirstIter::new(self, start)
    }

    /// Level order traversal: all roots come before any of their children.
    fn breadth_first(&self) -> BreadthFirstIter<'_, Self>
    where
        Self: Sized,
    {
        BreadthFirstIter::new(self, self.root_ids().to_vec())
    }

    /// Level order traversal of the subtree at `id`.
    fn breadth_first_from(&self, id: SectionId) -> BreadthFirstIter<'_, Self>
    where
        Self: Sized,
    {
        let start = if self.has_section(id) { vec![id] } else { Vec::new() };
        BreadthFirstIter::new(self, start)
    }

    /// From `id` up to its root, both included.
    fn upstream(&self, id: SectionId) -> UpstreamIter<'_, Self>
    where
        Self: Sized,
    {
        UpstreamIter { tree: self, current: self.has_section(id).then_some(id) }
    }

    /// Number of sections between `id` and its root.
    fn depth(&self, id: SectionId) -> usize
    where
        Self: Sized,
    {
        self.upstream(id).count().saturating_sub(1)
    }

    /// Ids of the sections without children.
    fn leaves(&self) -> Vec<SectionId>
    where
        Self: Sized,
    {
        self.depth_first().filter(|&id| self.child_ids(id).is_empty()).collect()
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Iterator for pre-order traversal (parents before children).
///
/// This iterator uses a stack-based approach to traverse the tree without recursion.
pub struct DepthFirstIter<'a, T: SectionTree> {
    tree: &'a T,
    stack: Vec<SectionId>,
}

impl<'a, T: SectionTree> DepthFirstIter<'a, T> {
    fn new(tree: &'a T, mut start: Vec<SectionId>) -> Self {
        start.reverse();
        DepthFirstIter { tree, stack: start }
    }
}

impl<T: SectionTree> Iterator for DepthFirstIter<'_, T> {
    type Item = SectionId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        // Push children in reverse, so the first child is processed first
        self.stack.extend(self.tree.child_ids(id).iter().rev());
        Some(id)
    }
}

/// Iterator for level order traversal.
pub struct BreadthFirstIter<'a, T: SectionTree> {
    tree: &'a T,
    queue: VecDeque<SectionId>,
}

impl<'a, T: SectionTree> BreadthFirstIter<'a, T> {
    fn new(tree: &'a T, start: Vec<SectionId>) -> Self {
        BreadthFirstIter { tree, queue: start.into() }
    }
}

impl<T: SectionTree> Iterator for BreadthFirstIter<'_, T> {
    type Item = SectionId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.child_ids(id));
        Some(id)
    }
}

/// Iterator from a section towards its root.
pub struct UpstreamIter<'a, T: SectionTree> {
    tree: &'a T,
    current: Option<SectionId>,
}

impl<T: SectionTree> Iterator for UpstreamIter<'_, T> {
    type Item = SectionId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent_id(id);
        Some(id)
    }
}
