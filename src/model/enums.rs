//! Enumerations of the morphology model: section types (neurite and
//! vascular), soma types, cell families and the load modifiers.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

// =#========================================================================#=
// SECTION TYPE
// =#========================================================================#=
/// Type tag of a section, with the numeric codes of the SWC convention.
///
/// Glia and spine morphologies reuse the codes 2 and 3 under other names,
/// see the associated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SectionType {
    Undefined = 0,
    Soma = 1,
    Axon = 2,
    BasalDendrite = 3,
    ApicalDendrite = 4,
    Custom5 = 5,
    Custom6 = 6,
    Custom7 = 7,
    Custom8 = 8,
    Custom9 = 9,
    Custom10 = 10,
}

impl SectionType {
    /// Perivascular process of a glia cell
    pub const GLIA_PERIVASCULAR_PROCESS: SectionType = SectionType::Axon;
    /// Process of a glia cell
    pub const GLIA_PROCESS: SectionType = SectionType::BasalDendrite;
    /// Neck of a dendritic spine
    pub const SPINE_NECK: SectionType = SectionType::Axon;
    /// Head of a dendritic spine
    pub const SPINE_HEAD: SectionType = SectionType::BasalDendrite;
    /// Endfoot of a glia cell, the older name of its perivascular process
    pub const GLIA_ENDFOOT: SectionType = SectionType::Axon;

    /// Maps a numeric code to its type, `None` if out of `0..=10`.
    pub fn from_code(code: i64) -> Option<Self> {
        use SectionType::*;
        let section_type = match code {
            0 => Undefined,
            1 => Soma,
            2 => Axon,
            3 => BasalDendrite,
            4 => ApicalDendrite,
            5 => Custom5,
            6 => Custom6,
            7 => Custom7,
            8 => Custom8,
            9 => Custom9,
            10 => Custom10,
            _ => return None,
        };
        Some(section_type)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a neurite section may carry this type (anything but
    /// undefined and soma).
    pub fn is_neurite(self) -> bool {
        !matches!(self, SectionType::Undefined | SectionType::Soma)
    }

    /// Name of this type within a cell family, e.g. `"SpineNeck"` for code 2
    /// of a spine.
    pub fn name_in(self, family: CellFamily) -> &'static str {
        use SectionType::*;
        match (family, self) {
            (CellFamily::Glia, Axon) => "GliaPerivascularProcess",
            (CellFamily::Glia, BasalDendrite) => "GliaProcess",
            (CellFamily::Spine, Axon) => "SpineNeck",
            (CellFamily::Spine, BasalDendrite) => "SpineHead",
            (_, Undefined) => "Undefined",
            (_, Soma) => "Soma",
            (_, Axon) => "Axon",
            (_, BasalDendrite) => "BasalDendrite",
            (_, ApicalDendrite) => "ApicalDendrite",
            (_, Custom5) => "Custom5",
            (_, Custom6) => "Custom6",
            (_, Custom7) => "Custom7",
            (_, Custom8) => "Custom8",
            (_, Custom9) => "Custom9",
            (_, Custom10) => "Custom10",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// =#========================================================================#=
// SOMA TYPE & CONVENTION
// =#========================================================================#=
/// Shape class of a soma, derived from its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SomaType {
    Undefined,
    SinglePoint,
    /// NeuroMorpho three point convention
    ThreePoint,
    /// Stack of cylinders
    Cylinders,
    SimpleContour,
}

/// How the soma points of a morphology are meant: as samples with a
/// diameter each (SWC, programmatic) or as a contour outline (Neurolucida,
/// columnar container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SomaConvention {
    #[default]
    Samples,
    Contour,
}

// =#========================================================================#=
// CELL FAMILY
// =#========================================================================#=
/// Family of the described cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellFamily {
    #[default]
    Neuron = 0,
    Glia = 1,
    Spine = 2,
}

impl CellFamily {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(CellFamily::Neuron),
            1 => Some(CellFamily::Glia),
            2 => Some(CellFamily::Spine),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether a section of this family may carry `section_type`.
    ///
    /// Neurons accept every type. Glia and spines only know their two
    /// process types besides the soma.
    pub fn allows(self, section_type: SectionType) -> bool {
        match self {
            CellFamily::Neuron => true,
            CellFamily::Glia | CellFamily::Spine => {
                matches!(section_type, SectionType::Soma | SectionType::Axon | SectionType::BasalDendrite)
            }
        }
    }
}

impl fmt::Display for CellFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// =#========================================================================#=
// VASCULAR SECTION TYPE
// =#========================================================================#=
/// Type tag of a vessel section of a [Vasculature](crate::vasculature::Vasculature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum VascularSectionType {
    NotDefined = 0,
    Vein = 1,
    Artery = 2,
    Venule = 3,
    Arteriole = 4,
    VenousCapillary = 5,
    ArterialCapillary = 6,
    Transitional = 7,
    Custom = 8,
}

impl VascularSectionType {
    /// Maps a numeric code to its type, `None` if out of `0..=8`.
    pub fn from_code(code: i64) -> Option<Self> {
        use VascularSectionType::*;
        let section_type = match code {
            0 => NotDefined,
            1 => Vein,
            2 => Artery,
            3 => Venule,
            4 => Arteriole,
            5 => VenousCapillary,
            6 => ArterialCapillary,
            7 => Transitional,
            8 => Custom,
            _ => return None,
        };
        Some(section_type)
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for VascularSectionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Kind of an [Annotation](crate::model::Annotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationType {
    /// A section which was the single child of its parent
    SingleChild,
}

// =#========================================================================#=
// MODIFIERS
// =#========================================================================#=
bitflags! {
    /// Normalizations applied to a morphology right after loading.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        /// Keep only the first and last point of every section
        const TWO_POINTS_SECTIONS = 0b0001;
        /// Collapse the soma into a single point
        const SOMA_SPHERE = 0b0010;
        /// Drop the first point of every non-root section
        const NO_DUPLICATES = 0b0100;
        /// Order roots by type: axon, basal, apical
        const NRN_ORDER = 0b1000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_type_codes() {
        for code in 0..=10 {
            let section_type = SectionType::from_code(code).unwrap();
            assert_eq!(section_type.code() as i64, code);
        }
        assert_eq!(SectionType::from_code(11), None);
        assert_eq!(SectionType::from_code(-1), None);
    }

    #[test]
    fn test_aliases_share_codes() {
        assert_eq!(SectionType::GLIA_PROCESS.code(), 3);
        assert_eq!(SectionType::SPINE_NECK.code(), 2);
        assert!(!SectionType::Soma.is_neurite());
        assert!(SectionType::Custom7.is_neurite());
        assert_eq!(SectionType::GLIA_ENDFOOT, SectionType::GLIA_PERIVASCULAR_PROCESS);
    }

    #[test]
    fn test_names_follow_the_cell_family() {
        assert_eq!(SectionType::Axon.name_in(CellFamily::Neuron), "Axon");
        assert_eq!(SectionType::Axon.name_in(CellFamily::Glia), "GliaPerivascularProcess");
        assert_eq!(SectionType::BasalDendrite.name_in(CellFamily::Spine), "SpineHead");
        assert_eq!(SectionType::Custom9.name_in(CellFamily::Spine), "Custom9");
    }

    #[test]
    fn test_families_restrict_types() {
        assert!(CellFamily::Neuron.allows(SectionType::Custom10));
        assert!(CellFamily::Glia.allows(SectionType::GLIA_PROCESS));
        assert!(!CellFamily::Glia.allows(SectionType::ApicalDendrite));
        assert!(!CellFamily::Spine.allows(SectionType::Undefined));
        assert!(CellFamily::Spine.allows(SectionType::SPINE_NECK));
    }

    #[test]
    fn test_vascular_section_type_codes() {
        for code in 0..=8 {
            let section_type = VascularSectionType::from_code(code).unwrap();
            assert_eq!(section_type.code() as i64, code);
        }
        assert_eq!(VascularSectionType::from_code(9), None);
        assert_eq!(VascularSectionType::from_code(-1), None);
        assert_eq!(VascularSectionType::ArterialCapillary.to_string(), "ArterialCapillary");
    }
}
