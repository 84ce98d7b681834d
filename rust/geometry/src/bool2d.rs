// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D polygon booleans in face coordinates.
//!
//! Inputs are loops lying in the z = 0 plane of a face frame (see
//! [`Transformation::align_face`](crate::Transformation::align_face)), wound
//! counter-clockwise. Uses i_overlay for robust boolean operations.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use smallvec::SmallVec;

use crate::polygon::{remove_collinear, reorder_upper_left};
use crate::{Error, Point3, Result};

/// A face-coordinate region: one outer loop plus zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceShape {
    pub outer: Vec<Point3<f64>>,
    pub holes: Vec<Vec<Point3<f64>>>,
}

/// Overlap of two face-coordinate polygons and what is left of each.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonIntersection {
    /// The shared region, counter-clockwise, starting at its upper-left vertex.
    pub intersection: Vec<Point3<f64>>,
    /// Pieces of the first polygon outside the second.
    pub remainders_a: SmallVec<[Vec<Point3<f64>>; 2]>,
    /// Pieces of the second polygon outside the first.
    pub remainders_b: SmallVec<[Vec<Point3<f64>>; 2]>,
}

/// Signed area of the loop projected onto XY (positive when counter-clockwise).
pub fn signed_area_2d(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

fn ensure_ccw(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if signed_area_2d(points) < 0.0 {
        points.iter().rev().copied().collect()
    } else {
        points.to_vec()
    }
}

fn ensure_cw(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if signed_area_2d(points) > 0.0 {
        points.iter().rev().copied().collect()
    } else {
        points.to_vec()
    }
}

/// Convert a face loop to i_overlay path format
fn to_path(points: &[Point3<f64>]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

fn from_path(path: &[[f64; 2]]) -> Vec<Point3<f64>> {
    path.iter().map(|p| Point3::new(p[0], p[1], 0.0)).collect()
}

/// Converts i_overlay shapes (first contour outer, rest holes) to cleaned
/// face shapes, dropping slivers below `min_area`.
fn to_face_shapes(shapes: &[Vec<Vec<[f64; 2]>>], min_area: f64) -> Vec<FaceShape> {
    let mut result = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let Some((outer, holes)) = shape.split_first() else {
            continue;
        };
        let outer = remove_collinear(&ensure_ccw(&from_path(outer)), 1e-9);
        if outer.len() < 3 || signed_area_2d(&outer).abs() < min_area {
            continue;
        }
        let holes = holes
            .iter()
            .map(|h| remove_collinear(&ensure_cw(&from_path(h)), 1e-9))
            .filter(|h| h.len() >= 3 && signed_area_2d(h).abs() >= min_area)
            .collect();
        result.push(FaceShape { outer, holes });
    }
    result
}

/// Subtracts `holes` from `outer`.
///
/// Holes touching or crossing the outer boundary are handled; the result
/// may split into several shapes.
pub fn subtract_holes(
    outer: &[Point3<f64>],
    holes: &[Vec<Point3<f64>>],
    min_area: f64,
) -> Vec<FaceShape> {
    let subject = vec![to_path(&ensure_ccw(outer))];
    let clip: Vec<Vec<[f64; 2]>> = holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(|h| to_path(&ensure_ccw(h)))
        .collect();

    if clip.is_empty() {
        return to_face_shapes(&[subject], min_area);
    }

    let result = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero);
    to_face_shapes(&result, min_area)
}

fn only_outers(shapes: Vec<FaceShape>) -> Result<SmallVec<[Vec<Point3<f64>>; 2]>> {
    let mut result = SmallVec::new();
    for shape in shapes {
        if !shape.holes.is_empty() {
            return Err(Error::NotRepresentable(
                "boolean result contains a hole".to_string(),
            ));
        }
        result.push(reorder_upper_left(&shape.outer));
    }
    Ok(result)
}

/// Intersects two counter-clockwise face polygons.
///
/// Returns `Ok(None)` when the overlap is smaller than `tol²`, and an error
/// when the overlap or a remainder cannot be expressed as plain polygons
/// (multiple overlap pieces, or holes).
pub fn intersect_polygons(
    a: &[Point3<f64>],
    b: &[Point3<f64>],
    tol: f64,
) -> Result<Option<PolygonIntersection>> {
    if a.len() < 3 || b.len() < 3 {
        return Err(Error::DegeneratePolygon(
            "need at least 3 points per polygon".to_string(),
        ));
    }

    let min_area = tol * tol;
    let subject = vec![to_path(&ensure_ccw(a))];
    let clip = vec![to_path(&ensure_ccw(b))];

    let overlap = subject.overlay(&clip, OverlayRule::Intersect, FillRule::NonZero);
    let mut overlap = only_outers(to_face_shapes(&overlap, min_area))?;
    let intersection = match overlap.len() {
        0 => return Ok(None),
        1 => overlap.remove(0),
        n => {
            return Err(Error::NotRepresentable(format!(
                "intersection has {n} separate pieces"
            )))
        }
    };

    let only_a = subject.overlay(&clip, OverlayRule::Difference, FillRule::NonZero);
    let only_b = clip.overlay(&subject, OverlayRule::Difference, FillRule::NonZero);

    Ok(Some(PolygonIntersection {
        intersection,
        remainders_a: only_outers(to_face_shapes(&only_a, min_area))?,
        remainders_b: only_outers(to_face_shapes(&only_b, min_area))?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x1, y0, 0.0),
            Point3::new(x1, y1, 0.0),
            Point3::new(x0, y1, 0.0),
        ]
    }

    fn total_area(polygons: &[Vec<Point3<f64>>]) -> f64 {
        polygons.iter().map(|p| signed_area_2d(p)).sum()
    }

    #[test]
    fn signed_area_tracks_winding() {
        let r = rect(0.0, 0.0, 2.0, 3.0);
        assert_relative_eq!(signed_area_2d(&r), 6.0);
        assert_relative_eq!(signed_area_2d(&ensure_cw(&r)), -6.0);
    }

    #[test]
    fn identical_polygons_have_no_remainders() {
        let r = rect(0.0, 0.0, 4.0, 3.0);
        let result = intersect_polygons(&r, &r, 0.01).unwrap().unwrap();
        assert_relative_eq!(signed_area_2d(&result.intersection), 12.0, epsilon = 1e-6);
        assert!(result.remainders_a.is_empty());
        assert!(result.remainders_b.is_empty());
    }

    #[test]
    fn partial_overlap_splits_both_sides() {
        let a = rect(0.0, 0.0, 10.0, 3.0);
        let b = rect(6.0, 0.0, 12.0, 3.0);
        let result = intersect_polygons(&a, &b, 0.01).unwrap().unwrap();

        assert_relative_eq!(signed_area_2d(&result.intersection), 12.0, epsilon = 1e-6);
        assert_relative_eq!(total_area(&result.remainders_a), 18.0, epsilon = 1e-6);
        assert_relative_eq!(total_area(&result.remainders_b), 6.0, epsilon = 1e-6);
        assert_relative_eq!(result.intersection[0], Point3::new(6.0, 3.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn disjoint_polygons_do_not_intersect() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(2.0, 0.0, 3.0, 1.0);
        assert!(intersect_polygons(&a, &b, 0.01).unwrap().is_none());

        // shared edge only
        let c = rect(1.0, 0.0, 2.0, 1.0);
        assert!(intersect_polygons(&a, &c, 0.01).unwrap().is_none());
    }

    #[test]
    fn enclosed_polygon_leaves_a_hole() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(4.0, 4.0, 6.0, 6.0);
        assert!(matches!(
            intersect_polygons(&a, &b, 0.01),
            Err(Error::NotRepresentable(_))
        ));
    }

    #[test]
    fn holes_touching_the_boundary_are_subtracted() {
        let wall = rect(0.0, 0.0, 10.0, 3.0);
        let door = rect(2.0, 0.0, 3.0, 2.0);
        let shapes = subtract_holes(&wall, &[door], 1e-6);
        let area: f64 = shapes.iter().map(|s| signed_area_2d(&s.outer)).sum();
        assert_relative_eq!(area, 28.0, epsilon = 1e-6);
        assert!(shapes.iter().all(|s| s.holes.is_empty()));

        let window = rect(5.0, 1.0, 7.0, 2.0);
        let shapes = subtract_holes(&wall, &[window], 1e-6);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
    }
}
