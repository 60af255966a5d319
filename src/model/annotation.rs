use crate::model::enums::AnnotationType;
use crate::model::point_level::PointLevel;
use serde::{Deserialize, Serialize};

/// Record of a repair done while sanitizing, e.g. a merged single child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub annotation_type: AnnotationType,
    pub section_id: i64,
    pub point_level: PointLevel,
    /// Line in the source file, `-1` if synthesized
    pub line_number: i64,
}

impl Annotation {
    pub fn new(annotation_type: AnnotationType, section_id: i64, point_level: PointLevel, line_number: i64) -> Self {
        Self { annotation_type, section_id, point_level, line_number }
    }
}

/// A labelled point sequence outside the section tree, as found in
/// Neurolucida files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub point_level: PointLevel,
    /// Section the marker was found in, `-1` at top level
    pub section_id: i64,
}

impl Marker {
    pub fn new<S: Into<String>>(label: S, point_level: PointLevel, section_id: i64) -> Self {
        Self { label: label.into(), point_level, section_id }
    }
}
