//! Point level storage: parallel arrays of coordinates, diameters and
//! optional perimeters.

use crate::error::MorphError;
use serde::{Deserialize, Serialize};

/// A 3D coordinate.
pub type Point = [f64; 3];

// =#========================================================================#=
// POINT LEVEL
// =#========================================================================#=
/// Point data of a section, the soma or a marker.
///
/// Points are stored as parallel arrays, never as point objects. `diameters`
/// always matches `points` in length; `perimeters` is either empty (no
/// perimeter data) or matches as well. The arrays are only reachable through
/// methods that keep these lengths in step.
///
/// # Example
/// ```
/// use neuromorph::model::PointLevel;
///
/// let level = PointLevel::new(vec![[0., 0., 0.], [1., 0., 0.]], vec![2., 2.], vec![]).unwrap();
/// assert_eq!(level.len(), 2);
/// assert!(PointLevel::new(vec![[0., 0., 0.]], vec![], vec![]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointLevel {
    pub(crate) points: Vec<Point>,
    pub(crate) diameters: Vec<f64>,
    pub(crate) perimeters: Vec<f64>,
}

impl PointLevel {
    /// Creates a point level, checking that the arrays match in length.
    ///
    /// # Errors
    /// Returns [MorphError::InvalidPointLevel] if `diameters` or a non-empty
    /// `perimeters` differ in length from `points`.
    pub fn new(points: Vec<Point>, diameters: Vec<f64>, perimeters: Vec<f64>) -> Result<Self, MorphError> {
        if points.len() != diameters.len() {
            return Err(MorphError::InvalidPointLevel(format!(
                "Point vector have size: {} while Diameter vector has size: {}",
                points.len(),
                diameters.len()
            )));
        }
        if !perimeters.is_empty() && points.len() != perimeters.len() {
            return Err(MorphError::InvalidPointLevel(format!(
                "Point vector have size: {} while Perimeter vector has size: {}",
                points.len(),
                perimeters.len()
            )));
        }
        Ok(Self { points, diameters, perimeters })
    }

    /// Convenience constructor for a point level without perimeters
    pub fn with_diameters(points: Vec<Point>, diameters: Vec<f64>) -> Result<Self, MorphError> {
        Self::new(points, diameters, Vec::new())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn diameters(&self) -> &[f64] {
        &self.diameters
    }

    /// Empty when the level holds no perimeter data.
    pub fn perimeters(&self) -> &[f64] {
        &self.perimeters
    }

    /// Moves sample `i` to `point`.
    ///
    /// # Errors
    /// Returns [MorphError::InvalidPointLevel] if `i` is out of range.
    pub fn set_point(&mut self, i: usize, point: Point) -> Result<(), MorphError> {
        let len = self.len();
        let slot = self.points.get_mut(i).ok_or_else(|| out_of_range(i, len))?;
        *slot = point;
        Ok(())
    }

    /// Sets the diameter of sample `i`.
    ///
    /// # Errors
    /// Returns [MorphError::InvalidPointLevel] if `i` is out of range.
    pub fn set_diameter(&mut self, i: usize, diameter: f64) -> Result<(), MorphError> {
        let len = self.len();
        let slot = self.diameters.get_mut(i).ok_or_else(|| out_of_range(i, len))?;
        *slot = diameter;
        Ok(())
    }

    /// Sets the perimeter of sample `i`. A level without perimeter data
    /// gets zero perimeters for all its other samples.
    ///
    /// # Errors
    /// Returns [MorphError::InvalidPointLevel] if `i` is out of range.
    pub fn set_perimeter(&mut self, i: usize, perimeter: f64) -> Result<(), MorphError> {
        if i >= self.len() {
            return Err(out_of_range(i, self.len()));
        }
        if !self.has_perimeters() {
            self.perimeters = vec![0.0; self.len()];
        }
        self.perimeters[i] = perimeter;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_perimeters(&self) -> bool {
        !self.perimeters.is_empty()
    }

    /// Appends one sample. The perimeter is only stored if this level
    /// already holds perimeter data or is empty; a level with perimeters
    /// gets a zero perimeter when none is given.
    pub fn push(&mut self, point: Point, diameter: f64, perimeter: Option<f64>) {
        let had_perimeters = self.has_perimeters();
        let was_empty = self.is_empty();
        self.points.push(point);
        self.diameters.push(diameter);
        match perimeter {
            Some(perimeter) if had_perimeters || was_empty => self.perimeters.push(perimeter),
            None if had_perimeters => self.perimeters.push(0.0),
            _ => {}
        }
    }

    /// Sample `i` as `[x, y, z, diameter]`.
    pub fn sample(&self, i: usize) -> Option<[f64; 4]> {
        let p = self.points.get(i)?;
        let d = self.diameters.get(i)?;
        Some([p[0], p[1], p[2], *d])
    }

    pub fn first_sample(&self) -> Option<[f64; 4]> {
        self.sample(0)
    }

    pub fn last_sample(&self) -> Option<[f64; 4]> {
        self.len().checked_sub(1).and_then(|i| self.sample(i))
    }

    /// Appends the samples of `other`, skipping its first `skip` samples.
    ///
    /// Perimeters stay in step with the points: missing ones on either side
    /// are filled with zeros, unless neither level has any.
    pub fn extend_from(&mut self, other: &PointLevel, skip: usize) {
        let skip = skip.min(other.len());
        let added = other.len() - skip;
        if other.has_perimeters() && !self.has_perimeters() && !self.is_empty() {
            self.perimeters = vec![0.0; self.len()];
        }
        self.points.extend_from_slice(&other.points[skip..]);
        self.diameters.extend_from_slice(&other.diameters[skip..]);
        if other.has_perimeters() {
            self.perimeters.extend_from_slice(&other.perimeters[skip..]);
        } else if self.has_perimeters() {
            self.perimeters.extend(std::iter::repeat_n(0.0, added));
        }
    }

    /// Prepends one sample.
    pub fn insert_front(&mut self, point: Point, diameter: f64, perimeter: Option<f64>) {
        self.points.insert(0, point);
        self.diameters.insert(0, diameter);
        if self.has_perimeters() {
            self.perimeters.insert(0, perimeter.unwrap_or(0.0));
        }
    }

    /// Removes the first sample, if any.
    pub fn remove_front(&mut self) {
        if self.is_empty() {
            return;
        }
        self.points.remove(0);
        self.diameters.remove(0);
        if self.has_perimeters() {
            self.perimeters.remove(0);
        }
    }

    /// Keeps only the samples at the given (sorted) indices.
    pub fn retain_indices(&mut self, indices: &[usize]) {
        self.points = indices.iter().filter_map(|&i| self.points.get(i).copied()).collect();
        self.diameters = indices.iter().filter_map(|&i| self.diameters.get(i).copied()).collect();
        if self.has_perimeters() {
            self.perimeters = indices.iter().filter_map(|&i| self.perimeters.get(i).copied()).collect();
        }
    }
}

fn out_of_range(i: usize, len: usize) -> MorphError {
    MorphError::InvalidPointLevel(format!("Point index {i} is out of range for {len} points"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perimeter_length_is_checked() {
        let err = PointLevel::new(vec![[0.; 3], [1.; 3]], vec![1., 1.], vec![1.]).unwrap_err();
        assert_eq!(err.to_string(), "Point vector have size: 2 while Perimeter vector has size: 1");
    }

    #[test]
    fn test_extend_skips_duplicate() {
        let mut level = PointLevel::with_diameters(vec![[0.; 3], [1., 0., 0.]], vec![4., 3.]).unwrap();
        let other = PointLevel::with_diameters(vec![[1., 0., 0.], [2., 0., 0.]], vec![3., 2.]).unwrap();
        level.extend_from(&other, 1);
        assert_eq!(level.diameters, vec![4., 3., 2.]);
        assert_eq!(level.last_sample(), Some([2., 0., 0., 2.]));
    }

    #[test]
    fn test_perimeters_stay_in_step() {
        let mut level = PointLevel::new(vec![[0.; 3]], vec![1.], vec![3.]).unwrap();
        level.push([1., 0., 0.], 1., None);
        assert_eq!(level.perimeters(), &[3., 0.]);

        let plain = PointLevel::with_diameters(vec![[1., 0., 0.], [2., 0., 0.]], vec![1., 1.]).unwrap();
        level.extend_from(&plain, 1);
        assert_eq!(level.perimeters(), &[3., 0., 0.]);

        let mut plain = PointLevel::with_diameters(vec![[0.; 3]], vec![1.]).unwrap();
        let other = PointLevel::new(vec![[0.; 3], [1., 0., 0.]], vec![1., 1.], vec![2., 5.]).unwrap();
        plain.extend_from(&other, 1);
        assert_eq!(plain.perimeters(), &[0., 5.]);
        assert_eq!(plain.len(), plain.perimeters().len());
    }

    #[test]
    fn test_setters_check_the_index() {
        let mut level = PointLevel::with_diameters(vec![[0.; 3], [1., 0., 0.]], vec![1., 1.]).unwrap();
        level.set_diameter(1, 5.).unwrap();
        level.set_point(0, [0., 2., 0.]).unwrap();
        assert_eq!(level.sample(1), Some([1., 0., 0., 5.]));
        assert_eq!(level.first_sample(), Some([0., 2., 0., 1.]));
        assert!(level.set_diameter(2, 1.).is_err());
        assert!(level.set_point(9, [0.; 3]).is_err());

        level.set_perimeter(1, 4.).unwrap();
        assert_eq!(level.perimeters(), &[0., 4.]);
        assert!(level.set_perimeter(2, 1.).is_err());
    }
}
