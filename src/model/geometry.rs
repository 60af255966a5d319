//! Small geometric helpers on point sequences, all pure functions.

use crate::error::MorphError;
use crate::model::enums::SomaType;
use crate::model::point_level::Point;
use std::f64::consts::PI;

/// Absolute float comparison tolerance
pub const EPSILON: f64 = 1e-6;
/// Relative float comparison tolerance
pub const RELATIVE_EPSILON: f64 = 1e-7;

/// Compares two floats with an absolute and a relative tolerance:
/// `|a - b| <= max(EPSILON, RELATIVE_EPSILON * max(|a|, |b|))`.
pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON.max(RELATIVE_EPSILON * a.abs().max(b.abs()))
}

/// Compares two points coordinate-wise with [almost_equal].
pub fn points_equal(a: &Point, b: &Point) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| almost_equal(*x, *y))
}

pub fn distance(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// Lengths of the segments between consecutive points.
pub fn segment_lengths(points: &[Point]) -> Vec<f64> {
    points.windows(2).map(|w| distance(&w[0], &w[1])).collect()
}

/// Path length of a section.
pub fn section_length(points: &[Point]) -> f64 {
    segment_lengths(points).iter().sum()
}

/// Point at `fraction` (clamped to `[0, 1]`) of the path length along `points`.
///
/// # Returns
/// `None` for an empty sequence
pub fn point_at_fraction(points: &[Point], fraction: f64) -> Option<Point> {
    let first = *points.first()?;
    let total = section_length(points);
    if total <= 0.0 {
        return Some(first);
    }
    let target = fraction.clamp(0.0, 1.0) * total;
    let mut walked = 0.0;
    for w in points.windows(2) {
        let length = distance(&w[0], &w[1]);
        if walked + length >= target && length > 0.0 {
            let t = (target - walked) / length;
            return Some([
                w[0][0] + t * (w[1][0] - w[0][0]),
                w[0][1] + t * (w[1][1] - w[0][1]),
                w[0][2] + t * (w[1][2] - w[0][2]),
            ]);
        }
        walked += length;
    }
    points.last().copied()
}

/// Mean of the points, `None` for an empty sequence.
pub fn center_of_gravity(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mut center = [0.0; 3];
    for p in points {
        for (c, x) in center.iter_mut().zip(p.iter()) {
            *c += x;
        }
    }
    Some(center.map(|c| c / n))
}

/// Largest distance of any point to the [center_of_gravity], `None` for an
/// empty sequence.
pub fn max_distance_to_center(points: &[Point]) -> Option<f64> {
    let center = center_of_gravity(points)?;
    Some(points.iter().map(|p| distance(p, &center)).fold(0.0, f64::max))
}

/// Surface of a soma of the given type.
///
/// Point-like somata count as spheres of the first diameter. Stacked
/// cylinders sum the lateral areas of their conical frustums, without end
/// caps.
///
/// # Errors
/// For contour and undefined somata, which have no surface model.
pub fn soma_surface(soma_type: SomaType, points: &[Point], diameters: &[f64]) -> Result<f64, MorphError> {
    match soma_type {
        SomaType::SinglePoint | SomaType::ThreePoint => {
            let radius = diameters.first().copied().unwrap_or(0.0) / 2.0;
            Ok(4.0 * PI * radius * radius)
        }
        SomaType::Cylinders => {
            let mut surface = 0.0;
            for i in 1..points.len().min(diameters.len()) {
                let (r0, r1) = (diameters[i - 1] * 0.5, diameters[i] * 0.5);
                let h = distance(&points[i - 1], &points[i]);
                surface += PI * (r0 + r1) * ((r0 - r1) * (r0 - r1) + h * h).sqrt();
            }
            Ok(surface)
        }
        SomaType::SimpleContour => {
            Err(MorphError::Soma("Surface is not implemented for SOMA_SIMPLE_CONTOUR".to_string()))
        }
        SomaType::Undefined => {
            Err(MorphError::Soma("Soma::surface is not implemented for an undefined soma".to_string()))
        }
    }
}
