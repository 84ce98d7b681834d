// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Oriented plane `a·x + b·y + c·z = d` with a unit normal `(a, b, c)`.

use crate::polygon::outward_normal;
use crate::{Error, Point3, Result, Vector3};

/// An oriented plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Plane {
    /// Plane through `point` with the given (non-zero) normal.
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Result<Self> {
        let n = crate::normalize(normal)?;
        Ok(Self {
            a: n.x,
            b: n.y,
            c: n.z,
            d: n.dot(&point.coords),
        })
    }

    /// Best-fit plane through an ordered polygon, oriented by its winding.
    ///
    /// The normal comes from Newell's method and the offset from the vertex
    /// mean, which is the least-squares plane for the polygon's projected
    /// area. Needs at least three non-collinear points.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Self> {
        let normal = outward_normal(points).ok_or_else(|| {
            Error::DegeneratePolygon(format!(
                "cannot fit a plane through {} collinear or repeated points",
                points.len()
            ))
        })?;
        let mean = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as f64;
        Self::from_point_normal(&Point3::from(mean), &normal)
    }

    /// Like [`Plane::from_points`], also rejecting polygons with any vertex
    /// farther than `tol` from the fitted plane.
    pub fn fit(points: &[Point3<f64>], tol: f64) -> Result<Self> {
        let plane = Self::from_points(points)?;
        if let Some(worst) = points
            .iter()
            .map(|p| plane.distance(p).abs())
            .find(|d| *d > tol)
        {
            return Err(Error::DegeneratePolygon(format!(
                "polygon is not planar: vertex is {worst:.4} from fitted plane"
            )));
        }
        Ok(plane)
    }

    /// Unit normal `(a, b, c)`.
    #[inline]
    pub fn outward_normal(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    /// Signed distance from the plane, positive on the normal side.
    #[inline]
    pub fn distance(&self, point: &Point3<f64>) -> f64 {
        self.outward_normal().dot(&point.coords) - self.d
    }

    /// Orthogonal projection onto the plane.
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        point - self.outward_normal() * self.distance(point)
    }

    pub fn point_on_plane(&self, point: &Point3<f64>, tol: f64) -> bool {
        self.distance(point).abs() <= tol
    }

    /// Some point lying on the plane.
    pub fn origin(&self) -> Point3<f64> {
        Point3::from(self.outward_normal() * self.d)
    }

    /// Same plane with the opposite orientation.
    pub fn reversed(&self) -> Self {
        Self {
            a: -self.a,
            b: -self.b,
            c: -self.c,
            d: -self.d,
        }
    }

    /// Coefficient-wise equality within `tol`.
    pub fn equal(&self, other: &Plane, tol: f64) -> bool {
        (self.a - other.a).abs() <= tol
            && (self.b - other.b).abs() <= tol
            && (self.c - other.c).abs() <= tol
            && (self.d - other.d).abs() <= tol
    }

    /// True if `other` is this plane facing the other way.
    pub fn reverse_equal(&self, other: &Plane, tol: f64) -> bool {
        self.equal(&other.reversed(), tol)
    }
}
