// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BEM-Lite Geometry
//!
//! Value types and polygon algorithms shared by the building model and the
//! scene translators: planes, axis-aligned bounding boxes, 4×4 affine
//! transformations, outward normals, triangulation with holes and 2D
//! polygon booleans in face coordinates.
//!
//! All polygons are `[Point3<f64>]` slices with counter-clockwise winding
//! about their outward normal (right-hand rule).

pub mod bool2d;
pub mod bounding_box;
pub mod error;
pub mod polygon;
pub mod plane;
pub mod tolerance;
pub mod transformation;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use bool2d::{intersect_polygons, signed_area_2d, subtract_holes, FaceShape, PolygonIntersection};
pub use bounding_box::BoundingBox;
pub use error::{Error, Result};
pub use plane::Plane;
pub use polygon::{
    area, centroid, circular_equal, combined_point_index, get_combined_point, is_convex,
    outward_normal, remove_collinear, reorder_upper_left, reverse,
};
pub use tolerance::Tolerances;
pub use transformation::{EulerAngles, Transformation};
pub use triangulation::{compute_triangulation, triangulate_face, Triangle};

/// Normalizes `v`, failing when its length is below `f64::EPSILON`.
pub fn normalize(v: &Vector3<f64>) -> Result<Vector3<f64>> {
    v.try_normalize(f64::EPSILON).ok_or(Error::ZeroLengthVector)
}
