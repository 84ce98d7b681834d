// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface intersection and matching between spaces.
//!
//! Intersection splits coplanar, opposite-facing surfaces of two spaces so
//! that their overlap becomes one surface on each side. Matching then pairs
//! surfaces whose vertices coincide (with reversed winding) as adjacent
//! surfaces, and does the same for their sub-surfaces.

use bem_lite_geometry::{
    area, circular_equal, intersect_polygons, outward_normal, remove_collinear, reorder_upper_left,
    reverse, BoundingBox, Error as GeometryError, Plane, Point3, Tolerances, Transformation,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::keys::ObjectKey;
use crate::log::LogSink;
use crate::model::Model;
use crate::objects::{Surface, SurfaceType};

/// Point tolerance for matching and intersection, in meters.
pub const MATCH_TOLERANCE: f64 = 0.01;

/// Outward normals must be at least this anti-parallel to match.
const NORMAL_DOT_LIMIT: f64 = -0.98;

/// Allowed drift between a surface's area and the pieces it was split into.
const AREA_TOLERANCE: f64 = 0.001;

/// Box around all surfaces of `space`, in building coordinates.
pub fn space_bounding_box(model: &Model, space: ObjectKey) -> Result<BoundingBox> {
    let mut result = BoundingBox::new();
    for surface in model.surfaces(space) {
        result.add_points(&model.building_vertices(surface)?);
    }
    Ok(result)
}

/// Total area of the floors of `space`.
pub fn floor_area(model: &Model, space: ObjectKey) -> f64 {
    model
        .surfaces(space)
        .into_iter()
        .filter_map(|s| model.get::<Surface>(s))
        .filter(|s| s.surface_type == SurfaceType::Floor)
        .filter_map(|s| area(&s.vertices))
        .sum()
}

fn space_bounds(model: &Model, spaces: &[ObjectKey]) -> Vec<BoundingBox> {
    spaces
        .iter()
        .map(|&s| space_bounding_box(model, s).unwrap_or_default())
        .collect()
}

/// Intersects the surfaces of every pair of spaces whose boxes touch.
///
/// Returns the number of surfaces created.
pub fn intersect_surfaces(model: &mut Model, spaces: &[ObjectKey], log: &mut LogSink) -> usize {
    let mut spaces = spaces.to_vec();
    spaces.sort_by(|a, b| floor_area(model, *a).total_cmp(&floor_area(model, *b)));
    let bounds = space_bounds(model, &spaces);

    let mut created = 0;
    for i in 0..spaces.len() {
        for j in (i + 1)..spaces.len() {
            if !bounds[i].intersects(&bounds[j], MATCH_TOLERANCE) {
                continue;
            }
            created += intersect_space_pair(model, spaces[i], spaces[j], log);
        }
    }
    created
}

/// Matches surfaces of every pair of spaces whose boxes touch.
///
/// Returns the number of surface pairs made adjacent.
pub fn match_surfaces(model: &mut Model, spaces: &[ObjectKey]) -> usize {
    let bounds = space_bounds(model, spaces);
    let mut matched = 0;
    for i in 0..spaces.len() {
        for j in (i + 1)..spaces.len() {
            if !bounds[i].intersects(&bounds[j], MATCH_TOLERANCE) {
                continue;
            }
            matched += match_space_pair(model, spaces[i], spaces[j]);
        }
    }
    matched
}

/// Detaches every surface and sub-surface of `spaces` from its partner.
pub fn unmatch_surfaces(model: &mut Model, spaces: &[ObjectKey]) -> Result<()> {
    for &space in spaces {
        for surface in model.surfaces(space) {
            model.reset_adjacent_surface(surface)?;
            for sub_surface in model.sub_surfaces(surface) {
                model.reset_adjacent_sub_surface(sub_surface)?;
            }
        }
    }
    Ok(())
}

fn largest_first(model: &Model, surfaces: &mut [ObjectKey]) {
    let areas: FxHashMap<ObjectKey, f64> = surfaces
        .iter()
        .map(|&s| {
            let a = model
                .get::<Surface>(s)
                .and_then(|s| area(&s.vertices))
                .unwrap_or(0.0);
            (s, a)
        })
        .collect();
    surfaces.sort_by(|a, b| areas[b].total_cmp(&areas[a]));
}

/// Intersects every eligible surface of `a` with every eligible surface of
/// `b`, repeating while new pieces appear. Returns the number of surfaces
/// created.
pub fn intersect_space_pair(model: &mut Model, a: ObjectKey, b: ObjectKey, log: &mut LogSink) -> usize {
    if a == b {
        return 0;
    }
    tracing::debug!(
        space = model.name(a).unwrap_or_default(),
        other = model.name(b).unwrap_or_default(),
        "intersecting spaces"
    );

    let mut surfaces = model.surfaces(a);
    let mut other_surfaces = model.surfaces(b);
    largest_first(model, &mut surfaces);
    largest_first(model, &mut other_surfaces);

    // eligibility is decided once per surface, on first sight
    let mut ineligible: FxHashMap<ObjectKey, bool> = FxHashMap::default();
    let mut is_ineligible = |model: &Model, key: ObjectKey| -> bool {
        *ineligible.entry(key).or_insert_with(|| {
            !model.sub_surfaces(key).is_empty()
                || model
                    .get::<Surface>(key)
                    .map_or(true, |s| s.adjacent_surface.is_some())
        })
    };
    let mut completed: FxHashSet<(ObjectKey, ObjectKey)> = FxHashSet::default();

    let mut created = 0;
    loop {
        let mut new_surfaces = Vec::new();
        let mut new_other_surfaces = Vec::new();

        for &surface in &surfaces {
            if is_ineligible(model, surface) {
                continue;
            }
            for &other in &other_surfaces {
                if is_ineligible(model, other) || !completed.insert((surface, other)) {
                    continue;
                }
                let Some((pieces, other_pieces)) = intersect_surface_pair(model, surface, other, log)
                else {
                    continue;
                };

                // pieces of one intersection never need intersecting with each other
                for &s in pieces.iter().chain(std::iter::once(&surface)) {
                    for &o in other_pieces.iter().chain(std::iter::once(&other)) {
                        completed.insert((s, o));
                    }
                }
                created += pieces.len() + other_pieces.len();
                new_surfaces.extend(pieces);
                new_other_surfaces.extend(other_pieces);
            }
        }

        if new_surfaces.is_empty() && new_other_surfaces.is_empty() {
            break;
        }
        surfaces.extend(new_surfaces);
        other_surfaces.extend(new_other_surfaces);
    }
    created
}

/// Intersects two surfaces of different spaces.
///
/// Both surfaces are replaced by their overlap; what is left of each becomes
/// new surfaces in the same space, copying type and construction. Returns
/// the new surfaces of each side, or `None` when the surfaces do not overlap
/// or cannot be intersected.
pub fn intersect_surface_pair(
    model: &mut Model,
    surface: ObjectKey,
    other: ObjectKey,
    log: &mut LogSink,
) -> Option<(Vec<ObjectKey>, Vec<ObjectKey>)> {
    let name = model.name(surface).unwrap_or_default().to_string();
    let other_name = model.name(other).unwrap_or_default().to_string();

    let (space, other_space) = match (model.space_of(surface), model.space_of(other)) {
        (Some(s), Some(o)) if s != o => (s, o),
        _ => {
            log.error(format!(
                "cannot intersect '{name}' with '{other_name}': missing space or same space"
            ));
            return None;
        }
    };
    if !model.sub_surfaces(surface).is_empty() || !model.sub_surfaces(other).is_empty() {
        log.error(format!(
            "cannot intersect '{name}' with '{other_name}': sub-surfaces are not allowed"
        ));
        return None;
    }
    let adjacent = |key: ObjectKey| model.get::<Surface>(key).map_or(true, |s| s.adjacent_surface.is_some());
    if adjacent(surface) || adjacent(other) {
        log.error(format!(
            "cannot intersect '{name}' with '{other_name}': adjacent surfaces are not allowed"
        ));
        return None;
    }

    let vertices = model.building_vertices(surface).ok()?;
    let other_vertices = model.building_vertices(other).ok()?;
    if vertices.len() < 3 || other_vertices.len() < 3 {
        log.error(format!(
            "fewer than 3 vertices, intersection of '{name}' with '{other_name}' fails"
        ));
        return None;
    }

    let plane_tol = Tolerances::default().plane;
    let (Ok(plane), Ok(other_plane)) = (Plane::from_points(&vertices), Plane::from_points(&other_vertices))
    else {
        return None;
    };
    if !plane.reverse_equal(&other_plane, plane_tol) {
        return None;
    }

    let face = Transformation::align_face(&vertices);
    let to_face = match face.inverse() {
        Ok(t) => t,
        Err(_) => {
            log.error(format!(
                "cannot compute face transformation, intersection of '{name}' with '{other_name}' fails"
            ));
            return None;
        }
    };
    let face_vertices = to_face.transform_points(&vertices);
    let other_face_vertices = to_face.transform_points(&other_vertices);

    let result = match intersect_polygons(&face_vertices, &other_face_vertices, MATCH_TOLERANCE) {
        Ok(Some(result)) => result,
        Ok(None) => return None,
        Err(GeometryError::NotRepresentable(reason)) => {
            log.warn(format!(
                "skipping intersection of '{name}' with '{other_name}': {reason}"
            ));
            return None;
        }
        Err(err) => {
            log.warn(format!("intersection of '{name}' with '{other_name}' failed: {err}"));
            return None;
        }
    };

    let pieces_area = |first: &[Point3<f64>], rest: &[Vec<Point3<f64>>]| -> f64 {
        area(first).unwrap_or(0.0) + rest.iter().filter_map(|p| area(p)).sum::<f64>()
    };
    for (label, original, remainders) in [
        (&name, &face_vertices, &result.remainders_a),
        (&other_name, &other_face_vertices, &result.remainders_b),
    ] {
        let before = area(original).unwrap_or(0.0);
        let after = pieces_area(&result.intersection, remainders.as_slice());
        if (before - after).abs() > AREA_TOLERANCE {
            log.error(format!(
                "area of '{label}' changed from {before} to {after} during intersection"
            ));
        }
    }

    let to_space = model.building_transformation(space).ok()?.inverse().ok()?;
    let to_other_space = model.building_transformation(other_space).ok()?.inverse().ok()?;

    // face loops come back counter-clockwise, which is the first surface's winding
    let own = |loop_: &[Point3<f64>]| to_space.transform_points(&face.transform_points(loop_));
    let flipped = |loop_: &[Point3<f64>]| {
        to_other_space.transform_points(&face.transform_points(&reorder_upper_left(&reverse(loop_))))
    };

    set_vertices(model, surface, own(&result.intersection));
    set_vertices(model, other, flipped(&result.intersection));

    let mut pieces = Vec::with_capacity(result.remainders_a.len());
    for remainder in &result.remainders_a {
        if let Some(key) = add_piece(model, surface, space, own(remainder)) {
            pieces.push(key);
        }
    }
    let mut other_pieces = Vec::with_capacity(result.remainders_b.len());
    for remainder in &result.remainders_b {
        if let Some(key) = add_piece(model, other, other_space, flipped(remainder)) {
            other_pieces.push(key);
        }
    }

    tracing::debug!(
        surface = %name,
        other = %other_name,
        new = pieces.len() + other_pieces.len(),
        "intersected surfaces"
    );
    Some((pieces, other_pieces))
}

fn set_vertices(model: &mut Model, surface: ObjectKey, vertices: Vec<Point3<f64>>) {
    if let Some(s) = model.get_mut::<Surface>(surface) {
        s.vertices = vertices;
    }
}

fn add_piece(
    model: &mut Model,
    template: ObjectKey,
    space: ObjectKey,
    vertices: Vec<Point3<f64>>,
) -> Option<ObjectKey> {
    let (surface_type, construction) = {
        let s = model.get::<Surface>(template)?;
        (s.surface_type, s.construction)
    };
    let base = model.name(template).unwrap_or("Surface").to_string();
    let name = model.unique_name(crate::keys::ObjectType::Surface, &base);
    let key = model.add_surface(name, space, vertices, Some(surface_type)).ok()?;
    if let Some(s) = model.get_mut::<Surface>(key) {
        s.construction = construction;
    }
    Some(key)
}

/// Pairs coincident, opposite-facing surfaces of two spaces and then their
/// sub-surfaces. Returns the number of surface pairs made adjacent.
pub fn match_space_pair(model: &mut Model, a: ObjectKey, b: ObjectKey) -> usize {
    if a == b {
        return 0;
    }
    let collinear_tol = Tolerances::default().collinear;
    let mut matched = 0;

    for surface in model.surfaces(a) {
        if is_matched(model, surface) {
            continue;
        }
        let Ok(vertices) = model.building_vertices(surface) else {
            continue;
        };
        let Some(normal) = outward_normal(&vertices) else {
            continue;
        };

        for other in model.surfaces(b) {
            if is_matched(model, other) {
                continue;
            }
            let Ok(other_vertices) = model.building_vertices(other) else {
                continue;
            };
            let Some(other_normal) = outward_normal(&other_vertices) else {
                continue;
            };
            if normal.dot(&other_normal) > NORMAL_DOT_LIMIT {
                continue;
            }
            if !circular_equal(&vertices, &reverse(&other_vertices), MATCH_TOLERANCE) {
                continue;
            }

            if model.set_adjacent_surface(surface, other).is_err() {
                continue;
            }
            matched += 1;

            for sub_surface in model.sub_surfaces(surface) {
                let Ok(sub_vertices) = model.building_vertices(sub_surface) else {
                    continue;
                };
                let sub_vertices = remove_collinear(&sub_vertices, collinear_tol);
                for other_sub in model.sub_surfaces(other) {
                    let Ok(other_sub_vertices) = model.building_vertices(other_sub) else {
                        continue;
                    };
                    let other_sub_vertices = reverse(&remove_collinear(&other_sub_vertices, collinear_tol));
                    // first coincident partner wins
                    if circular_equal(&sub_vertices, &other_sub_vertices, MATCH_TOLERANCE)
                        && model.set_adjacent_sub_surface(sub_surface, other_sub).is_ok()
                    {
                        break;
                    }
                }
            }
            break;
        }
    }
    matched
}

fn is_matched(model: &Model, surface: ObjectKey) -> bool {
    model
        .get::<Surface>(surface)
        .map_or(true, |s| s.adjacent_surface.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{BoundaryCondition, Space, SubSurface};
    use approx::assert_relative_eq;

    /// Axis-aligned box space with outward-facing surfaces.
    fn box_space(model: &mut Model, name: &str, min: [f64; 3], max: [f64; 3]) -> ObjectKey {
        let space = model.add(name, Space::default());
        let [x0, y0, z0] = min;
        let [x1, y1, z1] = max;
        let p = |x, y, z| Point3::new(x, y, z);
        let faces = [
            ("Floor", vec![p(x0, y0, z0), p(x0, y1, z0), p(x1, y1, z0), p(x1, y0, z0)]),
            ("Roof", vec![p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1)]),
            ("South", vec![p(x0, y0, z1), p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1)]),
            ("North", vec![p(x1, y1, z1), p(x1, y1, z0), p(x0, y1, z0), p(x0, y1, z1)]),
            ("West", vec![p(x0, y1, z1), p(x0, y1, z0), p(x0, y0, z0), p(x0, y0, z1)]),
            ("East", vec![p(x1, y0, z1), p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1)]),
        ];
        for (face, vertices) in faces {
            model
                .add_surface(format!("{name} {face}"), space, vertices, None)
                .unwrap();
        }
        space
    }

    fn surface_named(model: &Model, name: &str) -> ObjectKey {
        model
            .find_by_name(crate::keys::ObjectType::Surface, name)
            .unwrap()
    }

    #[test]
    fn shared_wall_matches() {
        let mut model = Model::new();
        let a = box_space(&mut model, "A", [0.0, 0.0, 0.0], [4.0, 4.0, 3.0]);
        let b = box_space(&mut model, "B", [4.0, 0.0, 0.0], [8.0, 4.0, 3.0]);

        assert_eq!(match_surfaces(&mut model, &[a, b]), 1);
        let east = model.get::<Surface>(surface_named(&model, "A East")).unwrap();
        assert_eq!(east.adjacent_surface, Some(surface_named(&model, "B West")));
        assert_eq!(east.outside_boundary_condition, BoundaryCondition::Surface);

        // already matched surfaces are left alone
        assert_eq!(match_surfaces(&mut model, &[a, b]), 0);

        unmatch_surfaces(&mut model, &[a]).unwrap();
        let west = model.get::<Surface>(surface_named(&model, "B West")).unwrap();
        assert_eq!(west.adjacent_surface, None);
        assert_eq!(west.outside_boundary_condition, BoundaryCondition::Outdoors);
    }

    #[test]
    fn sub_surfaces_follow_their_parents() {
        let mut model = Model::new();
        let a = box_space(&mut model, "A", [0.0, 0.0, 0.0], [4.0, 4.0, 3.0]);
        let b = box_space(&mut model, "B", [4.0, 0.0, 0.0], [8.0, 4.0, 3.0]);
        let door = |flip: bool| {
            let mut v = vec![
                Point3::new(4.0, 1.0, 2.0),
                Point3::new(4.0, 1.0, 0.0),
                Point3::new(4.0, 2.0, 0.0),
                Point3::new(4.0, 2.0, 2.0),
            ];
            if flip {
                v.reverse();
            }
            v
        };
        let east = surface_named(&model, "A East");
        let west = surface_named(&model, "B West");
        let d1 = model.add_sub_surface("Door A", east, door(false), None).unwrap();
        let d2 = model.add_sub_surface("Door B", west, door(true), None).unwrap();
        // a duplicate on the far side does not steal the pairing
        let d3 = model.add_sub_surface("Door B copy", west, door(true), None).unwrap();

        assert_eq!(match_surfaces(&mut model, &[a, b]), 1);
        assert_eq!(model.get::<SubSurface>(d1).unwrap().adjacent_sub_surface, Some(d2));
        assert_eq!(model.get::<SubSurface>(d2).unwrap().adjacent_sub_surface, Some(d1));
        assert_eq!(model.get::<SubSurface>(d3).unwrap().adjacent_sub_surface, None);
    }

    #[test]
    fn partial_overlap_is_split_then_matched() {
        let mut model = Model::new();
        // B is shorter than A along their shared wall
        let a = box_space(&mut model, "A", [0.0, 0.0, 0.0], [4.0, 6.0, 3.0]);
        let b = box_space(&mut model, "B", [4.0, 0.0, 0.0], [8.0, 4.0, 3.0]);
        let mut log = LogSink::new("test");

        let before = model.surfaces(a).len();
        let created = intersect_surfaces(&mut model, &[a, b], &mut log);
        assert_eq!(created, 1);
        assert_eq!(model.surfaces(a).len(), before + 1);
        assert!(log.errors().is_empty());

        let east = surface_named(&model, "A East");
        let east_area = area(&model.get::<Surface>(east).unwrap().vertices).unwrap();
        assert_relative_eq!(east_area, 12.0, epsilon = 1e-6);
        let piece = surface_named(&model, "A East 1");
        let piece = model.get::<Surface>(piece).unwrap();
        assert_relative_eq!(area(&piece.vertices).unwrap(), 6.0, epsilon = 1e-6);
        assert_eq!(piece.surface_type, SurfaceType::Wall);
        assert_relative_eq!(
            outward_normal(&piece.vertices).unwrap(),
            bem_lite_geometry::Vector3::x(),
            epsilon = 1e-9
        );

        assert_eq!(match_surfaces(&mut model, &[a, b]), 1);
        let east = model.get::<Surface>(surface_named(&model, "A East")).unwrap();
        assert_eq!(east.adjacent_surface, Some(surface_named(&model, "B West")));
    }

    #[test]
    fn perfect_overlap_creates_nothing() {
        let mut model = Model::new();
        let a = box_space(&mut model, "A", [0.0, 0.0, 0.0], [4.0, 4.0, 3.0]);
        let b = box_space(&mut model, "B", [0.0, 0.0, 3.0], [4.0, 4.0, 6.0]);
        let mut log = LogSink::new("test");
        assert_eq!(intersect_surfaces(&mut model, &[a, b], &mut log), 0);
        assert_eq!(match_surfaces(&mut model, &[a, b]), 1);
        let roof = model.get::<Surface>(surface_named(&model, "A Roof")).unwrap();
        assert_eq!(roof.adjacent_surface, Some(surface_named(&model, "B Floor")));
    }

    #[test]
    fn distant_spaces_are_not_compared() {
        let mut model = Model::new();
        let a = box_space(&mut model, "A", [0.0, 0.0, 0.0], [4.0, 4.0, 3.0]);
        let b = box_space(&mut model, "B", [10.0, 0.0, 0.0], [14.0, 4.0, 3.0]);
        let mut log = LogSink::new("test");
        assert_eq!(intersect_surfaces(&mut model, &[a, b], &mut log), 0);
        assert_eq!(match_surfaces(&mut model, &[a, b]), 0);
    }
}
