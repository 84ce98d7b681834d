// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon algorithms on ordered 3D vertex loops.
//!
//! Functions that can fail on degenerate input (fewer than three points,
//! all points collinear) return `None` rather than an error, so callers can
//! skip a single surface without aborting a whole pass.

use crate::{Point3, Vector3};

/// Newell's method: twice the vector area of the loop.
#[inline]
fn newell_vector(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    let mut v = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        v.x += (a.y - b.y) * (a.z + b.z);
        v.y += (a.z - b.z) * (a.x + b.x);
        v.z += (a.x - b.x) * (a.y + b.y);
    }
    v
}

/// Unit normal of the polygon following its winding (right-hand rule).
pub fn outward_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if points.len() < 3 {
        return None;
    }
    newell_vector(points).try_normalize(1e-12)
}

/// Unsigned area of a planar polygon.
pub fn area(points: &[Point3<f64>]) -> Option<f64> {
    if points.len() < 3 {
        return None;
    }
    let v = newell_vector(points);
    let a = 0.5 * v.norm();
    if a < 1e-12 {
        None
    } else {
        Some(a)
    }
}

/// Area-weighted centroid of a planar polygon.
///
/// Works for non-convex simple polygons: each fan triangle contributes with
/// its signed area relative to the polygon normal.
pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    let normal = outward_normal(points)?;
    let origin = points[0];
    let mut weighted = Vector3::zeros();
    let mut total = 0.0;
    for i in 1..points.len() - 1 {
        let a = points[i] - origin;
        let b = points[i + 1] - origin;
        let signed = 0.5 * a.cross(&b).dot(&normal);
        weighted += (a + b) / 3.0 * signed;
        total += signed;
    }
    if total.abs() < 1e-12 {
        return None;
    }
    Some(origin + weighted / total)
}

/// Returns the loop in reverse order.
pub fn reverse(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    points.iter().rev().copied().collect()
}

/// Drops vertices whose adjacent unit edges have a cross product below `tol`.
///
/// Repeated vertices are dropped too. Runs until no vertex is removed.
pub fn remove_collinear(points: &[Point3<f64>], tol: f64) -> Vec<Point3<f64>> {
    let mut result = points.to_vec();
    loop {
        let n = result.len();
        if n < 3 {
            return result;
        }
        let mut removed = None;
        for i in 0..n {
            let prev = result[(i + n - 1) % n];
            let curr = result[i];
            let next = result[(i + 1) % n];
            let a = (curr - prev).try_normalize(1e-12);
            let b = (next - curr).try_normalize(1e-12);
            let keep = match (a, b) {
                (Some(a), Some(b)) => a.cross(&b).norm() >= tol,
                _ => false,
            };
            if !keep {
                removed = Some(i);
                break;
            }
        }
        match removed {
            Some(i) => {
                result.remove(i);
            }
            None => return result,
        }
    }
}

/// True if `q` is `p` rotated to any starting offset, same winding, with
/// every vertex pair within `tol`.
pub fn circular_equal(p: &[Point3<f64>], q: &[Point3<f64>], tol: f64) -> bool {
    if p.len() != q.len() {
        return false;
    }
    if p.is_empty() {
        return true;
    }

    let n = p.len();
    (0..n).any(|offset| {
        (0..n).all(|i| (p[i] - q[(i + offset) % n]).norm() <= tol)
    })
}

/// Index of a pooled point within `tol` of `point`, appending it when absent.
pub fn combined_point_index(point: &Point3<f64>, pool: &mut Vec<Point3<f64>>, tol: f64) -> usize {
    if let Some(index) = pool.iter().position(|p| (p - point).norm() <= tol) {
        return index;
    }
    pool.push(*point);
    pool.len() - 1
}

/// Existing pooled point within `tol` of `point`, or `point` after appending it.
pub fn get_combined_point(point: &Point3<f64>, pool: &mut Vec<Point3<f64>>, tol: f64) -> Point3<f64> {
    let index = combined_point_index(point, pool, tol);
    pool[index]
}

/// True if every turn of the loop agrees with its outward normal.
pub fn is_convex(points: &[Point3<f64>], tol: f64) -> bool {
    let Some(normal) = outward_normal(points) else {
        return false;
    };
    let n = points.len();
    (0..n).all(|i| {
        let a = points[(i + 1) % n] - points[i];
        let b = points[(i + 2) % n] - points[(i + 1) % n];
        a.cross(&b).dot(&normal) >= -tol
    })
}

/// Rotates a face-coordinate loop (z = 0) so it starts at its upper-left vertex.
///
/// The upper-left vertex is the one closest to (min x, max y) of the loop's
/// extent; ordering is otherwise unchanged.
pub fn reorder_upper_left(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    if points.is_empty() {
        return Vec::new();
    }
    let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let corner = Point3::new(min_x, max_y, 0.0);

    let mut start = 0;
    let mut best = f64::INFINITY;
    for (i, p) in points.iter().enumerate() {
        let d = (Point3::new(p.x, p.y, 0.0) - corner).norm();
        if d < best {
            best = d;
            start = i;
        }
    }

    points[start..].iter().chain(points[..start].iter()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ]
    }

    fn l_shape() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(2.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ]
    }

    #[test]
    fn normal_follows_winding() {
        let n = outward_normal(&square(1.0)).unwrap();
        assert_relative_eq!(n, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);

        let n = outward_normal(&reverse(&square(1.0))).unwrap();
        assert_relative_eq!(n, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_polygons_have_no_normal() {
        assert!(outward_normal(&square(1.0)[..2]).is_none());
        let collinear = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(outward_normal(&collinear).is_none());
        assert!(area(&collinear).is_none());
        assert!(centroid(&collinear).is_none());
    }

    #[test]
    fn area_and_centroid_of_l_shape() {
        let l = l_shape();
        assert_relative_eq!(area(&l).unwrap(), 12.0, epsilon = 1e-12);

        // Two rectangles: 4x2 centered (2,1) and 2x2 centered (1,3)
        let c = centroid(&l).unwrap();
        assert_relative_eq!(c.x, (8.0 * 2.0 + 4.0 * 1.0) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, (8.0 * 1.0 + 4.0 * 3.0) / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn area_of_vertical_wall() {
        let wall = vec![
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 3.0),
        ];
        assert_relative_eq!(area(&wall).unwrap(), 15.0, epsilon = 1e-12);
        let n = outward_normal(&wall).unwrap();
        assert_relative_eq!(n, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn remove_collinear_drops_midpoints_and_duplicates() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let result = remove_collinear(&points, 0.001);
        assert_eq!(result.len(), 4);
        assert_relative_eq!(area(&result).unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn circular_equal_is_rotation_invariant() {
        let p = square(2.0);
        let mut q = p.clone();
        q.rotate_left(2);
        assert!(circular_equal(&p, &q, 0.01));
        assert!(circular_equal(&q, &p, 0.01));
        assert!(circular_equal(&p, &p, 0.01));

        // Opposite winding is not equal
        assert!(!circular_equal(&p, &reverse(&p), 0.01));
        assert!(circular_equal(&p, &reverse(&reverse(&p)), 0.01));
    }

    #[test]
    fn circular_equal_respects_tolerance() {
        let p = square(2.0);
        let mut q = p.clone();
        q[1].x += 0.005;
        assert!(circular_equal(&p, &q, 0.01));
        assert!(circular_equal(&q, &p, 0.01));
        q[1].x += 0.05;
        assert!(!circular_equal(&p, &q, 0.01));
        assert!(!circular_equal(&q, &p, 0.01));
        assert!(!circular_equal(&p, &p[..3], 0.01));
    }

    #[test]
    fn combined_points_do_not_grow_pool() {
        let mut pool = Vec::new();
        for p in square(1.0) {
            get_combined_point(&p, &mut pool, 0.01);
        }
        assert_eq!(pool.len(), 4);

        for p in square(1.0) {
            let jittered = p + Vector3::new(0.004, -0.003, 0.002);
            let combined = get_combined_point(&jittered, &mut pool, 0.01);
            assert_eq!(combined, p);
        }
        assert_eq!(pool.len(), 4);

        let index = combined_point_index(&Point3::new(5.0, 5.0, 0.0), &mut pool, 0.01);
        assert_eq!(index, 4);
    }

    #[test]
    fn convexity() {
        assert!(is_convex(&square(1.0), 1e-9));
        assert!(!is_convex(&l_shape(), 1e-9));
    }

    #[test]
    fn reorder_starts_at_upper_left() {
        let reordered = reorder_upper_left(&square(1.0));
        assert_eq!(reordered[0], Point3::new(0.0, 1.0, 0.0));
        assert!(circular_equal(&reordered, &square(1.0), 1e-9));
    }
}
