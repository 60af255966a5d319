//! Recoverable diagnostics and the locators attached to them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder uri used for morphologies parsed from in-memory strings.
pub const STRING_URI: &str = "$STRING$";

// =#========================================================================#=
// LOCATION
// =#========================================================================#=
/// A `(file, line)` locator pointing into the parsed input.
///
/// Inputs without a line concept (e.g. the columnar container, or a
/// morphology built programmatically) carry a location without line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    uri: String,
    line: Option<usize>,
}

impl Location {
    /// Creates a location pointing at `line` (1-based) of `uri`.
    pub fn new<S: Into<String>>(uri: S, line: usize) -> Self {
        Self { uri: uri.into(), line: Some(line) }
    }

    /// Creates a location naming only the file.
    pub fn file<S: Into<String>>(uri: S) -> Self {
        Self { uri: uri.into(), line: None }
    }

    /// Same file, another line.
    pub fn at_line(&self, line: usize) -> Self {
        Self { uri: self.uri.clone(), line: Some(line) }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.uri, line),
            None => write!(f, "{}", self.uri),
        }
    }
}

// =#========================================================================#=
// WARNING KIND
// =#========================================================================#=
/// Warning kinds, usable to selectively ignore warnings in a
/// [WarningPolicy](crate::diagnostics::WarningPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WarningKind {
    /// Writing a morphology without soma
    WriteNoSoma,
    /// Writing a soma whose type is undefined
    WriteUndefinedSoma,
    /// Three point soma that does not conform to the NeuroMorpho convention
    SomaNonConform,
    /// No soma found in a file
    NoSomaFound,
    /// Neurite with parent -1 although the file has a soma
    DisconnectedNeurite,
    /// First point of a section is not its parent's last point
    WrongDuplicate,
    /// Explicit copy of the parent's last point with another diameter
    DuplicateDiameterDiffers,
    /// Neurite attached to another than the first point of a three point soma
    WrongRootPoint,
    /// Section being the single child of its parent
    OnlyChild,
    /// Skipped writing an empty morphology
    WriteEmptyMorphology,
    /// Sample with zero diameter
    ZeroDiameter,
    /// Section type changed without bifurcation
    SectionTypeChanged,
    /// Soma written to a contour based format is not a contour
    SomaNonContour,
    /// Soma written to SWC is neither stacked cylinders nor a single point
    SomaNonCylinderOrPoint,
}

// =#========================================================================#=
// WARNING
// =#========================================================================#=
/// A recoverable diagnostic: the operation continued, but something was off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    kind: WarningKind,
    message: String,
    location: Option<Location>,
}

impl Warning {
    /// Creates a warning from its parts.
    pub fn new<S: Into<String>>(kind: WarningKind, message: S, location: Option<Location>) -> Self {
        Self { kind, message: message.into(), location }
    }

    pub fn kind(&self) -> WarningKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    // ============================================================================
    // Convenience constructors (pub)
    // ============================================================================
    /// Convenience constructor for NoSomaFound
    pub fn no_soma_found(uri: &str) -> Self {
        Self::new(WarningKind::NoSomaFound, "Warning: no soma found in file", Some(Location::file(uri)))
    }

    /// Convenience constructor for DisconnectedNeurite
    pub fn disconnected_neurite(location: Location) -> Self {
        Self::new(
            WarningKind::DisconnectedNeurite,
            "Warning: found a disconnected neurite.\n\
             Neurites are not supposed to have parentId: -1\n\
             (although this is normal if this neuron has no soma)",
            Some(location),
        )
    }

    /// Convenience constructor for ZeroDiameter
    pub fn zero_diameter(location: Location) -> Self {
        Self::new(WarningKind::ZeroDiameter, "Warning: zero diameter in file", Some(location))
    }

    /// Convenience constructor for SectionTypeChanged
    pub fn section_type_changed(location: Location) -> Self {
        Self::new(
            WarningKind::SectionTypeChanged,
            "Warning: Type changed within section, without bifurcation",
            Some(location),
        )
    }

    /// Convenience constructor for WrongRootPoint, listing the offending lines
    pub fn wrong_root_point(uri: &str, lines: &[usize]) -> Self {
        let mut message = String::from(
            "Warning: with a 3 points soma, neurites must be connected to the first soma point:",
        );
        for line in lines {
            message.push_str(&format!("\n{}", Location::new(uri, *line)));
        }
        Self::new(WarningKind::WrongRootPoint, message, Some(Location::file(uri)))
    }

    /// Convenience constructor for SomaNonConform, `description` explains the deviation
    pub fn soma_non_conform(uri: &str, description: &str) -> Self {
        Self::new(
            WarningKind::SomaNonConform,
            format!("Warning: the soma does not conform to the NeuroMorpho three point convention\n{description}"),
            Some(Location::file(uri)),
        )
    }

    /// Convenience constructor for WrongDuplicate
    ///
    /// # Arguments
    /// * `section` - Id of the section being checked
    /// * `parent` - Id of its parent section
    /// * `parent_last` - Parent's last point as `[x, y, z, diameter]`, if any
    /// * `child_first` - Section's first point as `[x, y, z, diameter]`, if any
    pub fn wrong_duplicate(
        uri: &str,
        section: usize,
        parent: usize,
        parent_last: Option<[f64; 4]>,
        child_first: Option<[f64; 4]>,
    ) -> Self {
        let mut message = format!("Warning: while appending section: {section} to parent: {parent}");
        match (parent_last, child_first) {
            (None, _) => message.push_str("\nThe parent section is empty."),
            (_, None) => message.push_str(
                "\nThe current section has no points. It should at least contains parent section last point",
            ),
            (Some(p), Some(c)) => message.push_str(&format!(
                "\nThe section first point should be parent section last point: \
                 \n        : X Y Z Diameter\
                 \nparent last point :[{:.6}, {:.6}, {:.6}, {:.6}]\
                 \nchild first point :[{:.6}, {:.6}, {:.6}, {:.6}]",
                p[0], p[1], p[2], p[3], c[0], c[1], c[2], c[3]
            )),
        }
        Self::new(WarningKind::WrongDuplicate, message, Some(Location::file(uri)))
    }

    /// Convenience constructor for DuplicateDiameterDiffers
    pub fn duplicate_diameter_differs(location: Location, parent_diameter: f64, diameter: f64) -> Self {
        Self::new(
            WarningKind::DuplicateDiameterDiffers,
            format!(
                "Warning: parent point is duplicated but has a different diameter\n\
                 parent diameter: {parent_diameter}, duplicate diameter: {diameter}\n\
                 The diameter of the duplicate is kept"
            ),
            Some(location),
        )
    }

    /// Convenience constructor for OnlyChild
    pub fn only_child(uri: &str, parent: usize, child: usize) -> Self {
        Self::new(
            WarningKind::OnlyChild,
            format!(
                "Warning: section {child} is the only child of section: {parent}\n\
                 It will be merged with the parent section"
            ),
            Some(Location::file(uri)),
        )
    }

    /// Convenience constructor for WriteNoSoma
    pub fn write_no_soma() -> Self {
        Self::new(WarningKind::WriteNoSoma, "Warning: writing file without a soma", None)
    }

    /// Convenience constructor for WriteEmptyMorphology
    pub fn write_empty_morphology() -> Self {
        Self::new(
            WarningKind::WriteEmptyMorphology,
            "Warning: Skipping an attempt to write an empty morphology.",
            None,
        )
    }

    /// Convenience constructor for WriteUndefinedSoma
    pub fn write_undefined_soma() -> Self {
        Self::new(WarningKind::WriteUndefinedSoma, "Warning: writing soma set to SOMA_UNDEFINED", None)
    }

    /// Convenience constructor for SomaNonContour
    pub fn soma_non_contour() -> Self {
        Self::new(WarningKind::SomaNonContour, "Soma must be a contour for ASC and H5", None)
    }

    /// Convenience constructor for SomaNonCylinderOrPoint
    pub fn soma_non_cylinder_or_point() -> Self {
        Self::new(
            WarningKind::SomaNonCylinderOrPoint,
            "Soma must be stacked cylinders or a point",
            None,
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}:warning\n{}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("neuron.swc", 12).to_string(), "neuron.swc:12");
        assert_eq!(Location::file(STRING_URI).to_string(), "$STRING$");
    }

    #[test]
    fn test_wrong_duplicate_message() {
        let warning = Warning::wrong_duplicate(
            STRING_URI,
            2,
            0,
            Some([2.0, 0.0, 0.0, 2.0]),
            Some([2.0, 1.0, 0.0, 2.0]),
        );
        assert_eq!(
            warning.message(),
            "Warning: while appending section: 2 to parent: 0\n\
             The section first point should be parent section last point: \n\
             \x20       : X Y Z Diameter\n\
             parent last point :[2.000000, 0.000000, 0.000000, 2.000000]\n\
             child first point :[2.000000, 1.000000, 0.000000, 2.000000]"
        );
    }

    #[test]
    fn test_only_child_message() {
        let warning = Warning::only_child(STRING_URI, 0, 1);
        assert_eq!(warning.kind(), WarningKind::OnlyChild);
        assert_eq!(
            warning.message(),
            "Warning: section 1 is the only child of section: 0\nIt will be merged with the parent section"
        );
    }
}
