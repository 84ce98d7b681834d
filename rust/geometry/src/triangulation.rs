// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Holes are first subtracted with i_overlay (so sub-surfaces touching the
//! parent edge, like doors, work), then each resulting region goes through
//! earcutr.

use crate::bool2d::{signed_area_2d, subtract_holes};
use crate::{Error, Point2, Point3, Result};

/// A triangle in face coordinates, counter-clockwise.
pub type Triangle = [Point3<f64>; 3];

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false;
            }
        }
    }

    true
}

/// Simple fan triangulation for convex polygons
#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulate a polygon with holes
/// Returns triangle indices into the combined vertex array (outer + all holes)
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    let n = outer.len();
    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    let valid_holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();

    // FAST PATH: convex without holes
    if valid_holes.is_empty() && is_convex(outer) {
        return Ok(fan_triangulate(n));
    }

    let total_points: usize = n + valid_holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);
    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let mut hole_indices = Vec::with_capacity(valid_holes.len());
    for hole in valid_holes {
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))
}

/// Triangulates a face-coordinate polygon (z = 0) minus its holes.
///
/// Every returned triangle is counter-clockwise. Fails if any vertex is off
/// the z = 0 plane by more than `tol` or if nothing is left to triangulate.
pub fn triangulate_face(
    polygon: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
    tol: f64,
) -> Result<Vec<Triangle>> {
    if polygon.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }
    let off_plane = polygon
        .iter()
        .chain(holes.iter().flatten())
        .any(|p| p.z.abs() > tol);
    if off_plane {
        return Err(Error::TriangulationError(
            "Vertices must lie in the z = 0 plane".to_string(),
        ));
    }

    let min_area = tol * tol;
    let mut triangles = Vec::new();

    for shape in subtract_holes(polygon, holes, min_area) {
        let outer: Vec<Point2<f64>> = shape.outer.iter().map(|p| p.xy()).collect();
        let shape_holes: Vec<Vec<Point2<f64>>> = shape
            .holes
            .iter()
            .map(|h| h.iter().map(|p| p.xy()).collect())
            .collect();

        let flat: Vec<Point3<f64>> = shape
            .outer
            .iter()
            .chain(shape.holes.iter().flatten())
            .copied()
            .collect();

        let indices = triangulate_polygon_with_holes(&outer, &shape_holes)?;
        for tri in indices.chunks_exact(3) {
            let mut t = [flat[tri[0]], flat[tri[1]], flat[tri[2]]];
            let signed = signed_area_2d(&t);
            if signed.abs() < 1e-12 {
                continue;
            }
            if signed < 0.0 {
                t.swap(1, 2);
            }
            triangles.push(t);
        }
    }

    if triangles.is_empty() {
        return Err(Error::TriangulationError(
            "No area left after subtracting holes".to_string(),
        ));
    }
    Ok(triangles)
}

/// Triangulates `polygon` minus `holes`, returning an empty list on failure.
///
/// Callers treat an empty result as a failure for that one polygon.
pub fn compute_triangulation(
    polygon: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
    tol: f64,
) -> Vec<Triangle> {
    triangulate_face(polygon, holes, tol).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::area;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x1, y0, 0.0),
            Point3::new(x1, y1, 0.0),
            Point3::new(x0, y1, 0.0),
        ]
    }

    fn l_shape() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(8.0, 0.0, 0.0),
            Point3::new(8.0, 3.0, 0.0),
            Point3::new(3.0, 3.0, 0.0),
            Point3::new(3.0, 7.0, 0.0),
            Point3::new(0.0, 7.0, 0.0),
        ]
    }

    fn triangle_area(triangles: &[Triangle]) -> f64 {
        triangles.iter().map(|t| signed_area_2d(t)).sum()
    }

    #[test]
    fn fan_for_convex_polygon() {
        let triangles = compute_triangulation(&rect(0.0, 0.0, 4.0, 3.0), &[], 0.01);
        assert_eq!(triangles.len(), 2);
        assert_relative_eq!(triangle_area(&triangles), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn area_is_conserved_with_holes() {
        let cases: Vec<(Vec<Point3<f64>>, Vec<Vec<Point3<f64>>>)> = vec![
            (rect(0.0, 0.0, 10.0, 3.0), vec![]),
            (rect(0.0, 0.0, 10.0, 3.0), vec![rect(1.0, 1.0, 3.0, 2.0)]),
            (
                rect(0.0, 0.0, 10.0, 3.0),
                vec![rect(1.0, 1.0, 3.0, 2.0), rect(5.0, 0.5, 9.0, 2.5)],
            ),
            (l_shape(), vec![]),
            (l_shape(), vec![rect(0.5, 0.5, 2.5, 2.5), rect(4.0, 1.0, 7.0, 2.0)]),
        ];

        for (polygon, holes) in cases {
            let expected = area(&polygon).unwrap()
                - holes.iter().map(|h| area(h).unwrap()).sum::<f64>();
            let triangles = compute_triangulation(&polygon, &holes, 0.01);
            assert!(!triangles.is_empty());
            assert_relative_eq!(triangle_area(&triangles), expected, epsilon = 1e-6);
            assert!(triangles.iter().all(|t| signed_area_2d(t) > 0.0));
        }
    }

    #[test]
    fn door_on_the_bottom_edge() {
        let wall = rect(0.0, 0.0, 6.0, 3.0);
        let door = rect(1.0, 0.0, 2.0, 2.2);
        let triangles = compute_triangulation(&wall, &[door], 0.01);
        assert_relative_eq!(triangle_area(&triangles), 18.0 - 2.2, epsilon = 1e-6);
    }

    #[test]
    fn clockwise_input_is_accepted() {
        let cw: Vec<_> = rect(0.0, 0.0, 2.0, 2.0).into_iter().rev().collect();
        let triangles = compute_triangulation(&cw, &[], 0.01);
        assert_relative_eq!(triangle_area(&triangles), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn failures_return_empty() {
        let mut lifted = rect(0.0, 0.0, 2.0, 2.0);
        lifted[2].z = 1.0;
        assert!(compute_triangulation(&lifted, &[], 0.01).is_empty());
        assert!(matches!(
            triangulate_face(&lifted, &[], 0.01),
            Err(Error::TriangulationError(_))
        ));

        let covered = rect(0.0, 0.0, 2.0, 2.0);
        assert!(compute_triangulation(&covered, &[covered.clone()], 0.01).is_empty());
        assert!(compute_triangulation(&covered[..2], &[], 0.01).is_empty());
    }
}
