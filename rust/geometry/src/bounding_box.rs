// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding box accumulator.

use crate::Point3;

/// Axis-aligned box that starts empty and grows as points are added.
///
/// Once non-empty, `min <= max` holds on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    min: Option<Point3<f64>>,
    max: Option<Point3<f64>>,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box enclosing `points`; empty if `points` is.
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let mut result = Self::new();
        result.add_points(points);
        result
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    pub fn add_point(&mut self, point: &Point3<f64>) {
        match (&mut self.min, &mut self.max) {
            (Some(min), Some(max)) => {
                min.x = min.x.min(point.x);
                min.y = min.y.min(point.y);
                min.z = min.z.min(point.z);
                max.x = max.x.max(point.x);
                max.y = max.y.max(point.y);
                max.z = max.z.max(point.z);
            }
            _ => {
                self.min = Some(*point);
                self.max = Some(*point);
            }
        }
    }

    pub fn add_points(&mut self, points: &[Point3<f64>]) {
        for p in points {
            self.add_point(p);
        }
    }

    /// Grows this box to enclose `other`.
    pub fn add(&mut self, other: &BoundingBox) {
        if let (Some(min), Some(max)) = (other.min, other.max) {
            self.add_point(&min);
            self.add_point(&max);
        }
    }

    pub fn min_corner(&self) -> Option<Point3<f64>> {
        self.min
    }

    pub fn max_corner(&self) -> Option<Point3<f64>> {
        self.max
    }

    pub fn min_x(&self) -> Option<f64> {
        self.min.map(|p| p.x)
    }

    pub fn min_y(&self) -> Option<f64> {
        self.min.map(|p| p.y)
    }

    pub fn min_z(&self) -> Option<f64> {
        self.min.map(|p| p.z)
    }

    pub fn max_x(&self) -> Option<f64> {
        self.max.map(|p| p.x)
    }

    pub fn max_y(&self) -> Option<f64> {
        self.max.map(|p| p.y)
    }

    pub fn max_z(&self) -> Option<f64> {
        self.max.map(|p| p.z)
    }

    /// The eight corners, or none for an empty box.
    pub fn corners(&self) -> Vec<Point3<f64>> {
        let (Some(lo), Some(hi)) = (self.min, self.max) else {
            return Vec::new();
        };
        let mut result = Vec::with_capacity(8);
        for x in [lo.x, hi.x] {
            for y in [lo.y, hi.y] {
                for z in [lo.z, hi.z] {
                    result.push(Point3::new(x, y, z));
                }
            }
        }
        result
    }

    pub fn contains_point(&self, point: &Point3<f64>, tol: f64) -> bool {
        let (Some(lo), Some(hi)) = (self.min, self.max) else {
            return false;
        };
        (0..3).all(|i| point[i] >= lo[i] - tol && point[i] <= hi[i] + tol)
    }

    /// True if the boxes overlap or touch within `tol`; empty boxes never do.
    pub fn intersects(&self, other: &BoundingBox, tol: f64) -> bool {
        let (Some(lo1), Some(hi1), Some(lo2), Some(hi2)) = (self.min, self.max, other.min, other.max)
        else {
            return false;
        };
        (0..3).all(|i| lo1[i] <= hi2[i] + tol && lo2[i] <= hi1[i] + tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box() {
        let bb = BoundingBox::new();
        assert!(bb.is_empty());
        assert!(bb.min_x().is_none());
        assert!(bb.corners().is_empty());
        assert!(!bb.intersects(&bb, 1.0));
    }

    #[test]
    fn accumulates_extrema() {
        let mut bb = BoundingBox::new();
        bb.add_point(&Point3::new(1.0, -2.0, 3.0));
        bb.add_point(&Point3::new(-1.0, 4.0, 0.5));
        assert_eq!(bb.min_corner(), Some(Point3::new(-1.0, -2.0, 0.5)));
        assert_eq!(bb.max_corner(), Some(Point3::new(1.0, 4.0, 3.0)));
        assert_eq!(bb.corners().len(), 8);

        let mut other = BoundingBox::new();
        other.add(&bb);
        assert_eq!(other, bb);
    }

    #[test]
    fn touching_boxes_intersect_within_tolerance() {
        let a = BoundingBox::from_points(&[Point3::new(0.0, 0.0, 0.0), Point3::new(5.0, 5.0, 3.0)]);
        let b = BoundingBox::from_points(&[Point3::new(5.0, 0.0, 0.0), Point3::new(9.0, 5.0, 3.0)]);
        let c = BoundingBox::from_points(&[Point3::new(5.5, 0.0, 0.0), Point3::new(9.0, 5.0, 3.0)]);
        assert!(a.intersects(&b, 0.01));
        assert!(b.intersects(&a, 0.01));
        assert!(!a.intersects(&c, 0.01));
        assert!(a.contains_point(&Point3::new(5.005, 1.0, 1.0), 0.01));
    }
}
