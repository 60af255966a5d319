//! The soma and its classification.

use crate::error::MorphError;
use crate::model::enums::{SomaConvention, SomaType};
use crate::model::geometry::{self, almost_equal};
use crate::model::point_level::{Point, PointLevel};
use serde::{Deserialize, Serialize};

// =#========================================================================#=
// SOMA
// =#========================================================================#=
/// The cell body: a typeless point sequence.
///
/// The [SomaType] is never stored but derived on demand from the points and
/// the [SomaConvention] the soma was described with.
///
/// # Example
/// ```
/// use neuromorph::model::{PointLevel, Soma, SomaConvention, SomaType};
///
/// let level = PointLevel::with_diameters(
///     vec![[0., 0., 0.], [0., -1., 0.], [0., 1., 0.]],
///     vec![2., 2., 2.],
/// ).unwrap();
/// let soma = Soma::new(level.clone(), SomaConvention::Samples);
/// assert_eq!(soma.soma_type(), SomaType::ThreePoint);
///
/// let contour = Soma::new(level, SomaConvention::Contour);
/// assert_eq!(contour.soma_type(), SomaType::SimpleContour);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Soma {
    level: PointLevel,
    convention: SomaConvention,
}

impl Soma {
    pub fn new(level: PointLevel, convention: SomaConvention) -> Self {
        Self { level, convention }
    }

    pub fn points(&self) -> &[Point] {
        &self.level.points
    }

    pub fn diameters(&self) -> &[f64] {
        &self.level.diameters
    }

    pub fn perimeters(&self) -> &[f64] {
        &self.level.perimeters
    }

    pub fn point_level(&self) -> &PointLevel {
        &self.level
    }

    pub fn point_level_mut(&mut self) -> &mut PointLevel {
        &mut self.level
    }

    pub fn set_point_level(&mut self, level: PointLevel) {
        self.level = level;
    }

    pub fn convention(&self) -> SomaConvention {
        self.convention
    }

    pub fn set_convention(&mut self, convention: SomaConvention) {
        self.convention = convention;
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_empty()
    }

    /// Classifies the soma.
    pub fn soma_type(&self) -> SomaType {
        let n = self.level.len();
        match self.convention {
            SomaConvention::Samples => match n {
                0 => SomaType::Undefined,
                1 => SomaType::SinglePoint,
                3 if self.three_point_status() == ThreePointStatus::Conform => SomaType::ThreePoint,
                _ => SomaType::Cylinders,
            },
            SomaConvention::Contour => match n {
                0 | 2 => SomaType::Undefined,
                1 => SomaType::SinglePoint,
                _ => SomaType::SimpleContour,
            },
        }
    }

    /// Checks the points against the NeuroMorpho three point convention:
    /// two constant coordinate columns, and the outer points offset by the
    /// radius of the first point along the third column.
    pub fn three_point_status(&self) -> ThreePointStatus {
        three_point_status(&self.level.points, &self.level.diameters)
    }

    /// Mean of the soma points, `None` if empty.
    pub fn center(&self) -> Option<Point> {
        geometry::center_of_gravity(&self.level.points)
    }

    /// Largest distance of a soma point to the center, `None` if empty.
    pub fn max_distance(&self) -> Option<f64> {
        geometry::max_distance_to_center(&self.level.points)
    }

    /// Surface, depending on the soma type.
    ///
    /// # Errors
    /// For contour and undefined somata.
    pub fn surface(&self) -> Result<f64, MorphError> {
        geometry::soma_surface(self.soma_type(), &self.level.points, &self.level.diameters)
    }
}

// =#========================================================================#=
// THREE POINT STATUS
// =#========================================================================#=
/// Outcome of the three point soma check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreePointStatus {
    Conform,
    NotThreePoints,
    NoColumnConstant,
    OneColumnConstant,
    AllColumnsConstant,
    NotRadiusOffset,
}

impl ThreePointStatus {
    /// Explanation of a non-conforming layout, `None` for conforming ones.
    pub fn description(self) -> Option<&'static str> {
        match self {
            ThreePointStatus::Conform => None,
            ThreePointStatus::NotThreePoints => Some("The soma does not have exactly three points."),
            ThreePointStatus::NoColumnConstant => {
                Some("None of the columns (ie: all the X, Y or Z values) are the same.")
            }
            ThreePointStatus::OneColumnConstant => Some("Only one column has the same coordinates."),
            ThreePointStatus::AllColumnsConstant => Some("All three columns have the same coordinates."),
            ThreePointStatus::NotRadiusOffset => {
                Some("The non-constant columns is not offset by +/- the radius from the initial sample.")
            }
        }
    }
}

/// See [Soma::three_point_status].
pub fn three_point_status(points: &[Point], diameters: &[f64]) -> ThreePointStatus {
    if points.len() != 3 || diameters.is_empty() {
        return ThreePointStatus::NotThreePoints;
    }
    let constant: Vec<bool> = (0..3)
        .map(|c| almost_equal(points[0][c], points[1][c]) && almost_equal(points[0][c], points[2][c]))
        .collect();
    match constant.iter().filter(|&&c| c).count() {
        0 => ThreePointStatus::NoColumnConstant,
        1 => ThreePointStatus::OneColumnConstant,
        3 => ThreePointStatus::AllColumnsConstant,
        _ => {
            let column = constant.iter().position(|&c| !c).unwrap_or(0);
            let center = points[0][column];
            let radius = diameters[0] / 2.0;
            let (a, b) = (points[1][column], points[2][column]);
            let offset = (almost_equal(a, center - radius) && almost_equal(b, center + radius))
                || (almost_equal(a, center + radius) && almost_equal(b, center - radius));
            if offset { ThreePointStatus::Conform } else { ThreePointStatus::NotRadiusOffset }
        }
    }
}
