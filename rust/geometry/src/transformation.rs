// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 4×4 affine transformations.
//!
//! A [`Transformation`] maps points from a local frame into its parent
//! frame. Composition follows matrix order: `a * b` applies `b` first, so a
//! chain is written parent-first:
//!
//! ```
//! use bem_lite_geometry::{Point3, Transformation, Vector3};
//!
//! let building_to_site = Transformation::rotation(&Vector3::z(), -0.5).unwrap();
//! let space_to_building = Transformation::translation(&Vector3::new(10.0, 0.0, 0.0));
//! let space_to_site = &building_to_site * &space_to_building;
//! let p = &space_to_site * Point3::origin();
//! assert!((p.coords.norm() - 10.0).abs() < 1e-12);
//! ```
//!
//! The face-alignment constructors build the frame used to flatten a planar
//! polygon into the XY plane for triangulation and 2D booleans.

use std::ops::Mul;

use nalgebra::{Matrix3, Matrix4, Rotation3, Unit};

use crate::polygon::outward_normal;
use crate::{BoundingBox, Error, Plane, Point3, Result, Tolerances, Vector3};

/// Rotation angles about x (psi), y (theta) and z (phi), in radians.
///
/// The rotation they describe is `Rz(phi) * Ry(theta) * Rx(psi)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    pub psi: f64,
    pub theta: f64,
    pub phi: f64,
}

impl EulerAngles {
    pub fn new(psi: f64, theta: f64, phi: f64) -> Self {
        Self { psi, theta, phi }
    }
}

/// Affine 4×4 transformation; the bottom row is always `[0, 0, 0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation {
    matrix: Matrix4<f64>,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformation {
    /// Identity transformation.
    pub fn new() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wraps a matrix, rejecting perspective terms.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Result<Self> {
        let bottom = [matrix[(3, 0)], matrix[(3, 1)], matrix[(3, 2)], matrix[(3, 3)]];
        if bottom != [0.0, 0.0, 0.0, 1.0] {
            return Err(Error::NotAffine);
        }
        Ok(Self { matrix })
    }

    /// Right-handed rotation of `radians` about `axis` through the origin.
    pub fn rotation(axis: &Vector3<f64>, radians: f64) -> Result<Self> {
        let axis = Unit::new_unchecked(crate::normalize(axis)?);
        Ok(Self {
            matrix: Rotation3::from_axis_angle(&axis, radians).to_homogeneous(),
        })
    }

    /// Right-handed rotation about +Z; cannot fail.
    pub fn rotation_z(radians: f64) -> Self {
        Self {
            matrix: Rotation3::from_axis_angle(&Vector3::z_axis(), radians).to_homogeneous(),
        }
    }

    /// Rotation of `radians` about `axis` passing through `origin`.
    pub fn rotation_about(origin: &Point3<f64>, axis: &Vector3<f64>, radians: f64) -> Result<Self> {
        let to_origin = Self::translation(&-origin.coords);
        let back = Self::translation(&origin.coords);
        Ok(&back * &(&Self::rotation(axis, radians)? * &to_origin))
    }

    /// Rotation `Rz(phi) * Ry(theta) * Rx(psi)`.
    pub fn from_euler_angles(angles: &EulerAngles) -> Self {
        Self {
            matrix: Rotation3::from_euler_angles(angles.psi, angles.theta, angles.phi)
                .to_homogeneous(),
        }
    }

    pub fn translation(offset: &Vector3<f64>) -> Self {
        Self {
            matrix: Matrix4::new_translation(offset),
        }
    }

    /// Orthonormal frame whose z′ axis is `z_prime`, with the default
    /// near-vertical threshold.
    pub fn align_z_prime(z_prime: &Vector3<f64>) -> Result<Self> {
        Self::align_z_prime_with_threshold(z_prime, Tolerances::default().align_z_prime_threshold)
    }

    /// Orthonormal frame whose z′ axis is `z_prime`.
    ///
    /// While `|z′·Z| < threshold`, y′ is world Z projected onto the plane
    /// normal to z′ (so walls keep "up" as face y). Past the threshold the
    /// projection degenerates, so y′ is world −X projected instead and
    /// `x′ = y′ × z′`. For z′ = +Z this gives x′ = +Y and y′ = −X.
    pub fn align_z_prime_with_threshold(z_prime: &Vector3<f64>, threshold: f64) -> Result<Self> {
        let z = crate::normalize(z_prime)?;
        let dot = Vector3::z().dot(&z);

        let (x, y) = if dot.abs() < threshold {
            let y = crate::normalize(&(Vector3::z() - z * dot))?;
            (y.cross(&z), y)
        } else {
            let neg_x = -Vector3::x();
            let y = crate::normalize(&(neg_x - z * neg_x.dot(&z)))?;
            (y.cross(&z), y)
        };

        let rotation = Matrix3::from_columns(&[x, y, z]);
        Ok(Self {
            matrix: rotation.to_homogeneous(),
        })
    }

    /// Face frame of a planar polygon: z′ along its outward normal and the
    /// minimum face-coordinate corner at the origin.
    ///
    /// Map the polygon into the frame with `align_face(p).inverse()`.
    /// Returns identity when no normal can be computed.
    pub fn align_face(points: &[Point3<f64>]) -> Self {
        Self::align_face_with_tolerances(points, &Tolerances::default())
    }

    pub fn align_face_with_tolerances(points: &[Point3<f64>], tolerances: &Tolerances) -> Self {
        let Some(normal) = outward_normal(points) else {
            return Self::new();
        };
        let Ok(align) = Self::align_z_prime_with_threshold(&normal, tolerances.align_z_prime_threshold)
        else {
            return Self::new();
        };

        // pure rotation: the transpose is the inverse
        let to_face = align.rotation_matrix().transpose();
        let mut min = Vector3::repeat(f64::INFINITY);
        for p in points {
            let local = to_face * p.coords;
            min = min.inf(&local);
        }

        &align * &Self::translation(&min)
    }

    /// Inverse transformation; a singular matrix is an error.
    pub fn inverse(&self) -> Result<Self> {
        if self.matrix.determinant().abs() < 1e-14 {
            return Err(Error::SingularMatrix);
        }
        let matrix = self.matrix.try_inverse().ok_or(Error::SingularMatrix)?;
        Ok(Self { matrix })
    }

    /// Decomposes the rotation part into Euler angles.
    ///
    /// When `m[2][0]` is ±1 the pitch is ±90° and roll and yaw are coupled;
    /// yaw is then reported as zero and the whole rotation goes to roll.
    pub fn euler_angles(&self) -> EulerAngles {
        let m = &self.matrix;
        let r20 = m[(2, 0)];

        if (r20.abs() - 1.0).abs() > 1e-12 {
            let theta = -r20.clamp(-1.0, 1.0).asin();
            let cos_theta = theta.cos();
            let psi = (m[(2, 1)] / cos_theta).atan2(m[(2, 2)] / cos_theta);
            let phi = (m[(1, 0)] / cos_theta).atan2(m[(0, 0)] / cos_theta);
            EulerAngles { psi, theta, phi }
        } else if r20 < 0.0 {
            let phi = 0.0;
            let theta = std::f64::consts::FRAC_PI_2;
            let psi = phi + m[(0, 1)].atan2(m[(0, 2)]);
            EulerAngles { psi, theta, phi }
        } else {
            let phi = 0.0;
            let theta = -std::f64::consts::FRAC_PI_2;
            let psi = -phi + (-m[(0, 1)]).atan2(-m[(0, 2)]);
            EulerAngles { psi, theta, phi }
        }
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Upper-left 3×3 block.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation_vector(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Element-wise comparison within `tol`.
    pub fn approx_eq(&self, other: &Transformation, tol: f64) -> bool {
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).abs() <= tol)
    }

    pub fn is_identity(&self, tol: f64) -> bool {
        self.approx_eq(&Self::new(), tol)
    }

    #[inline]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.matrix.transform_point(point)
    }

    /// Applies the linear part only.
    #[inline]
    pub fn transform_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transform_vector(vector)
    }

    pub fn transform_points(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// Box enclosing the eight transformed corners.
    pub fn transform_bounding_box(&self, bounding_box: &BoundingBox) -> BoundingBox {
        BoundingBox::from_points(&self.transform_points(&bounding_box.corners()))
    }

    /// Maps a plane; normals go through the inverse transpose of the linear part.
    pub fn transform_plane(&self, plane: &Plane) -> Result<Plane> {
        let linear = self.rotation_matrix();
        let inverse = linear.try_inverse().ok_or(Error::SingularMatrix)?;
        let normal = inverse.transpose() * plane.outward_normal();
        Plane::from_point_normal(&self.transform_point(&plane.origin()), &normal)
    }
}

impl Mul<&Transformation> for &Transformation {
    type Output = Transformation;

    fn mul(self, rhs: &Transformation) -> Transformation {
        Transformation {
            matrix: self.matrix * rhs.matrix,
        }
    }
}

impl Mul for Transformation {
    type Output = Transformation;

    fn mul(self, rhs: Transformation) -> Transformation {
        &self * &rhs
    }
}

impl Mul<Point3<f64>> for &Transformation {
    type Output = Point3<f64>;

    fn mul(self, rhs: Point3<f64>) -> Point3<f64> {
        self.transform_point(&rhs)
    }
}

impl Mul<Vector3<f64>> for &Transformation {
    type Output = Vector3<f64>;

    fn mul(self, rhs: Vector3<f64>) -> Vector3<f64> {
        self.transform_vector(&rhs)
    }
}

impl Mul<&[Point3<f64>]> for &Transformation {
    type Output = Vec<Point3<f64>>;

    fn mul(self, rhs: &[Point3<f64>]) -> Vec<Point3<f64>> {
        self.transform_points(rhs)
    }
}

/// Fails when the linear part is singular.
impl Mul<&Plane> for &Transformation {
    type Output = Result<Plane>;

    fn mul(self, rhs: &Plane) -> Result<Plane> {
        self.transform_plane(rhs)
    }
}

impl Mul<&BoundingBox> for &Transformation {
    type Output = BoundingBox;

    fn mul(self, rhs: &BoundingBox) -> BoundingBox {
        self.transform_bounding_box(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::{area, outward_normal, reverse};
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn sample_transforms() -> Vec<Transformation> {
        let mut result = vec![
            Transformation::new(),
            Transformation::translation(&Vector3::new(10.0, -3.0, 2.5)),
            Transformation::rotation(&Vector3::z(), 0.3).unwrap(),
            Transformation::rotation(&Vector3::new(1.0, 2.0, 3.0), -1.1).unwrap(),
            Transformation::rotation_about(&Point3::new(1.0, 1.0, 0.0), &Vector3::x(), FRAC_PI_2)
                .unwrap(),
            Transformation::from_euler_angles(&EulerAngles::new(0.2, -0.4, 2.0)),
            Transformation::align_z_prime(&Vector3::new(0.3, -0.8, 0.1)).unwrap(),
        ];
        let scale = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 0.5, 3.0));
        result.push(Transformation::from_matrix(scale).unwrap());
        result.push(&result[1] * &result[3]);
        result
    }

    fn sample_points() -> Vec<Point3<f64>> {
        vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-4.0, 7.5, 2.0),
            Point3::new(100.0, -50.0, 12.0),
        ]
    }

    #[test]
    fn rotation_z_matches_axis_rotation() {
        let a = Transformation::rotation_z(0.7);
        let b = Transformation::rotation(&Vector3::z(), 0.7).unwrap();
        assert!(a.approx_eq(&b, 1e-12));
        assert_relative_eq!(&Transformation::rotation_z(FRAC_PI_2) * Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn inverse_round_trip() {
        for t in sample_transforms() {
            let inv = t.inverse().unwrap();
            assert!((&inv * &t).is_identity(1e-9));
            assert!((&t * &inv).is_identity(1e-9));
            for p in sample_points() {
                let back = &inv * (&t * p);
                assert_relative_eq!(back, p, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn composition_is_associative() {
        let ts = sample_transforms();
        let (a, b, c) = (&ts[2], &ts[4], &ts[1]);
        let left = &(a * b) * c;
        let right = a * &(b * c);
        assert!(left.approx_eq(&right, 1e-9));

        // b applies first
        let p = Point3::new(0.0, 2.0, 0.0);
        assert_relative_eq!(&(a * b) * p, a * (b * p), epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_fails_to_invert() {
        let flat = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, 0.0));
        let t = Transformation::from_matrix(flat).unwrap();
        assert_eq!(t.inverse(), Err(Error::SingularMatrix));
    }

    #[test]
    fn perspective_rows_are_rejected() {
        let mut m = Matrix4::identity();
        m[(3, 0)] = 0.5;
        assert_eq!(Transformation::from_matrix(m), Err(Error::NotAffine));
    }

    #[test]
    fn rotation_needs_an_axis() {
        assert_eq!(
            Transformation::rotation(&Vector3::zeros(), 1.0),
            Err(Error::ZeroLengthVector)
        );
    }

    #[test]
    fn rotation_about_keeps_origin_fixed() {
        let origin = Point3::new(3.0, 4.0, 5.0);
        let t = Transformation::rotation_about(&origin, &Vector3::z(), PI).unwrap();
        assert_relative_eq!(&t * origin, origin, epsilon = 1e-12);
        assert_relative_eq!(
            &t * Point3::new(4.0, 4.0, 5.0),
            Point3::new(2.0, 4.0, 5.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn vectors_ignore_translation() {
        let t = Transformation::translation(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(&t * Vector3::x(), Vector3::x());
        assert_eq!(t.translation_vector(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn euler_angles_round_trip() {
        let angles = [-2.5, -1.0, -0.2, 0.0, 0.4, 1.3, 3.0];
        let pitches = [-1.2, -0.5, 0.0, 0.7, 1.5];
        for &psi in &angles {
            for &theta in &pitches {
                for &phi in &angles {
                    let t = Transformation::from_euler_angles(&EulerAngles::new(psi, theta, phi));
                    let back = Transformation::from_euler_angles(&t.euler_angles());
                    assert!(back.approx_eq(&t, 1e-9), "psi {psi} theta {theta} phi {phi}");
                }
            }
        }
    }

    #[test]
    fn euler_angles_at_gimbal_lock() {
        for theta in [FRAC_PI_2, -FRAC_PI_2] {
            for psi in [0.0, 0.3, -1.0] {
                let t = Transformation::from_euler_angles(&EulerAngles::new(psi, theta, 0.0));
                let e = t.euler_angles();
                assert_relative_eq!(e.theta, theta, epsilon = 1e-9);
                assert_eq!(e.phi, 0.0);
                let back = Transformation::from_euler_angles(&e);
                assert!(back.approx_eq(&t, 1e-9));
            }
        }
    }

    #[test]
    fn pure_yaw_decomposes_to_phi() {
        let t = Transformation::rotation(&Vector3::z(), -FRAC_PI_4).unwrap();
        let e = t.euler_angles();
        assert_relative_eq!(e.psi, 0.0, epsilon = 1e-12);
        assert_relative_eq!(e.theta, 0.0, epsilon = 1e-12);
        assert_relative_eq!(e.phi, -FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn align_z_prime_builds_orthonormal_frames() {
        let directions = [
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.2, 0.1, 0.9),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.01, 0.0, -1.0),
        ];
        for d in directions {
            let t = Transformation::align_z_prime(&d).unwrap();
            let r = t.rotation_matrix();
            assert!((r.transpose() * r - Matrix3::identity()).norm() < 1e-12);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(&t * Vector3::z(), d.normalize(), epsilon = 1e-12);
        }

        // walls keep world up as face y
        let wall = Transformation::align_z_prime(&Vector3::new(0.0, -1.0, 0.0)).unwrap();
        assert_relative_eq!(&wall * Vector3::y(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn align_z_prime_threshold_is_configurable() {
        let steep = Vector3::new(0.3, 0.0, 1.0).normalize();
        let default = Transformation::align_z_prime(&steep).unwrap();
        let strict = Transformation::align_z_prime_with_threshold(&steep, 0.5).unwrap();
        // default keeps Z as the face-y reference, strict switches to -X
        let default_y = &default * Vector3::y();
        let strict_y = &strict * Vector3::y();
        assert_relative_eq!(default_y.y, 0.0, epsilon = 1e-12);
        assert!(default_y.z > 0.9);
        assert_relative_eq!(strict_y.y, 0.0, epsilon = 1e-12);
        assert!(strict_y.x < -0.9);
        assert_relative_eq!((&default * Vector3::x()).y.abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!((&strict * Vector3::x()).y.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn vertical_z_prime_takes_negative_x_as_face_y() {
        let up = Transformation::align_z_prime(&Vector3::z()).unwrap();
        assert_relative_eq!(&up * Vector3::x(), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(&up * Vector3::y(), -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(&up * Vector3::z(), Vector3::z(), epsilon = 1e-12);

        let down = Transformation::align_z_prime(&-Vector3::z()).unwrap();
        assert_relative_eq!(&down * Vector3::y(), -Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(&down * Vector3::z(), -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(down.rotation_matrix().determinant(), 1.0, epsilon = 1e-12);
    }

    fn sample_polygons() -> Vec<Vec<Point3<f64>>> {
        let south_wall = vec![
            Point3::new(2.0, 1.0, 3.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(7.0, 1.0, 0.0),
            Point3::new(7.0, 1.0, 3.0),
        ];
        let floor = vec![
            Point3::new(0.0, 0.0, 0.5),
            Point3::new(0.0, 4.0, 0.5),
            Point3::new(6.0, 4.0, 0.5),
            Point3::new(6.0, 0.0, 0.5),
        ];
        let tilted_roof = vec![
            Point3::new(0.0, 0.0, 3.0),
            Point3::new(5.0, 0.0, 3.0),
            Point3::new(5.0, 4.0, 5.0),
            Point3::new(0.0, 4.0, 5.0),
        ];
        let rotation = Transformation::rotation(&Vector3::new(0.3, 0.4, 1.0), 0.7).unwrap();
        let skewed = rotation.transform_points(&south_wall);
        vec![south_wall, reverse(&floor), floor, tilted_roof, skewed]
    }

    #[test]
    fn align_face_is_stable_under_realignment() {
        let assert_aligned = |local: &[Point3<f64>]| {
            for p in local {
                assert!(p.z.abs() < 1e-9);
                assert!(p.x > -1e-9 && p.y > -1e-9);
            }
            let normal = outward_normal(local).unwrap();
            assert_relative_eq!(normal, Vector3::z(), epsilon = 1e-9);
        };

        for polygon in sample_polygons() {
            let face = Transformation::align_face(&polygon);
            let local = face.inverse().unwrap().transform_points(&polygon);
            assert_aligned(&local);

            // an aligned face is horizontal, so realigning is a quarter turn
            // about +Z (face y along world -x) plus an in-plane shift
            let again = Transformation::align_face(&local);
            assert_relative_eq!(&again * Vector3::z(), Vector3::z(), epsilon = 1e-9);
            assert_relative_eq!(&again * Vector3::y(), -Vector3::x(), epsilon = 1e-9);
            assert_relative_eq!(again.translation_vector().z, 0.0, epsilon = 1e-9);

            let relocal = again.inverse().unwrap().transform_points(&local);
            assert_aligned(&relocal);
            assert_relative_eq!(area(&relocal).unwrap(), area(&local).unwrap(), epsilon = 1e-9);
        }
    }

    #[test]
    fn align_face_of_degenerate_polygon_is_identity() {
        let line = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
        assert!(Transformation::align_face(&line).is_identity(0.0));
    }

    #[test]
    fn planes_and_boxes_follow_the_transform() {
        let t = &Transformation::translation(&Vector3::new(0.0, 0.0, 3.0))
            * &Transformation::rotation(&Vector3::x(), FRAC_PI_2).unwrap();
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::z()).unwrap();
        let moved = t.transform_plane(&plane).unwrap();
        assert_relative_eq!(moved.outward_normal(), -Vector3::y(), epsilon = 1e-12);
        assert!(moved.point_on_plane(&Point3::new(5.0, 0.0, 3.0), 1e-9));
        let multiplied = (&t * &plane).unwrap();
        assert!(multiplied.equal(&moved, 1e-12));
        let flat =
            Transformation::from_matrix(Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, 0.0)))
                .unwrap();
        assert!((&flat * &plane).is_err());

        let bb = BoundingBox::from_points(&[Point3::origin(), Point3::new(1.0, 2.0, 3.0)]);
        let moved = &t * &bb;
        assert_relative_eq!(moved.min_corner().unwrap(), Point3::new(0.0, -3.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(moved.max_corner().unwrap(), Point3::new(1.0, 0.0, 5.0), epsilon = 1e-12);
    }
}
