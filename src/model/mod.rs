//! The canonical morphology model.
//!
//! - [MutableMorphology]: editable arena of [MutableSection]s, built
//!   incrementally or by a reader.
//! - [Morphology]: the immutable snapshot obtained by freezing, with its
//!   sections stored in flattened arrays and exposed through [Section] views.
//! - Both use the arena pattern: no section references are stored, only
//!   [SectionId]s, and traversal is provided by the [SectionTree] trait.

/// Annotations of repairs and markers
pub mod annotation;
/// Section types, soma types, cell families, modifiers
pub mod enums;
/// Pure geometric helpers
pub mod geometry;
/// Traversal orders
pub mod iterators;
/// Immutable morphology
pub mod morphology;
/// Mutable morphology
pub mod mutable;
/// Mitochondria, endoplasmic reticulum, post-synaptic density
pub mod organelles;
/// Point level storage
pub mod point_level;
/// Soma and its classification
pub mod soma;

pub use annotation::{Annotation, Marker};
pub use enums::{
    AnnotationType, CellFamily, Modifiers, SectionType, SomaConvention, SomaType, VascularSectionType,
};
pub use iterators::{BreadthFirstIter, DepthFirstIter, SectionId, SectionTree, UpstreamIter};
pub use morphology::{Morphology, Section};
pub use mutable::{MutableMorphology, MutableSection};
pub use organelles::{
    EndoplasmicReticulum, MitoPointLevel, MitoSection, Mitochondria, MutableMitochondria, PostSynapticDensity,
};
pub use point_level::{Point, PointLevel};
pub use soma::{Soma, ThreePointStatus};
