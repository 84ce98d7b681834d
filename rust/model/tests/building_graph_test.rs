// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graph-level scenarios: coordinate chains, matching across rotated
//! spaces, and merging a rebuilt graph back into the original.

use approx::assert_relative_eq;
use bem_lite_geometry::{Point3, Transformation, Vector3};
use bem_lite_model::{
    match_surfaces, BoundaryCondition, Building, BuildingStory, HandleMapping, Model,
    ModelMerger, ObjectType, Space, Surface, ThermalZone,
};

fn floor(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point3<f64>> {
    vec![
        Point3::new(x0, y0, 0.0),
        Point3::new(x0, y1, 0.0),
        Point3::new(x1, y1, 0.0),
        Point3::new(x1, y0, 0.0),
    ]
}

fn wall(x: f64, y0: f64, y1: f64) -> Vec<Point3<f64>> {
    vec![
        Point3::new(x, y0, 3.0),
        Point3::new(x, y0, 0.0),
        Point3::new(x, y1, 0.0),
        Point3::new(x, y1, 3.0),
    ]
}

#[test]
fn space_origin_and_north_axis_chain_to_site() {
    let mut model = Model::new();
    let building = model.get_unique_building();
    model.get_mut::<Building>(building).unwrap().north_axis = Some(90.0);

    let space = model.add("Space", Space::default());
    model
        .get_mut::<Space>(space)
        .unwrap()
        .frame
        .set_x_origin(10.0);
    let surface = model.add_surface("Floor", space, floor(0.0, 0.0, 1.0, 1.0), None).unwrap();

    let building_vertices = model.building_vertices(surface).unwrap();
    assert_relative_eq!(building_vertices[0], Point3::new(10.0, 0.0, 0.0), epsilon = 1e-9);

    // north axis 90 turns building +x into site -y
    let site_vertices = model.site_vertices(surface).unwrap();
    assert_relative_eq!(site_vertices[0], Point3::new(0.0, -10.0, 0.0), epsilon = 1e-9);

    // changing the frame is visible immediately
    model.get_mut::<Space>(space).unwrap().frame.set_x_origin(0.0);
    let building_vertices = model.building_vertices(surface).unwrap();
    assert_relative_eq!(building_vertices[0], Point3::new(0.0, 0.0, 0.0), epsilon = 1e-9);
}

#[test]
fn set_transformation_round_trips_through_the_frame() {
    let mut model = Model::new();
    let space = model.add("Space", Space::default());
    let t = &Transformation::translation(&Vector3::new(3.0, -2.0, 1.5))
        * &Transformation::rotation_z(-30f64.to_radians());
    model.set_transformation(space, &t).unwrap();

    let frame = &model.get::<Space>(space).unwrap().frame;
    assert_relative_eq!(frame.direction_of_relative_north(), 30.0, epsilon = 1e-9);
    assert!(model.transformation(space).unwrap().approx_eq(&t, 1e-9));
}

#[test]
fn spaces_with_offset_frames_still_match() {
    let mut model = Model::new();
    let zone = model.add("Zone", ThermalZone::default());
    let a = model.add("A", Space { thermal_zone: Some(zone), ..Default::default() });
    let b = model.add("B", Space { thermal_zone: Some(zone), ..Default::default() });
    model.get_mut::<Space>(b).unwrap().frame.set_x_origin(4.0);

    let east = model.add_surface("A East", a, wall(4.0, 0.0, 4.0), None).unwrap();
    // same wall in B's local frame, reversed
    let mut west_vertices = wall(0.0, 0.0, 4.0);
    west_vertices.reverse();
    let west = model.add_surface("B West", b, west_vertices, None).unwrap();

    assert_eq!(match_surfaces(&mut model, &[a, b]), 1);
    let s = model.get::<Surface>(east).unwrap();
    assert_eq!(s.adjacent_surface, Some(west));
    assert_eq!(s.outside_boundary_condition, BoundaryCondition::Surface);
    assert!(!s.sun_exposed);
}

#[test]
fn floors_on_grade_default_to_ground() {
    let mut model = Model::new();
    let space = model.add("Space", Space::default());
    let ground = model.add_surface("Slab", space, floor(0.0, 0.0, 2.0, 2.0), None).unwrap();
    let s = model.get::<Surface>(ground).unwrap();
    assert_eq!(s.outside_boundary_condition, BoundaryCondition::Ground);
    assert_eq!((s.sun_exposed, s.wind_exposed), (false, false));

    let upper = model.add("Upper", Space::default());
    model.get_mut::<Space>(upper).unwrap().frame.set_z_origin(3.0);
    let raised = model.add_surface("Floor", upper, floor(0.0, 0.0, 2.0, 2.0), None).unwrap();
    let s = model.get::<Surface>(raised).unwrap();
    assert_eq!(s.outside_boundary_condition, BoundaryCondition::Outdoors);
    assert_eq!((s.sun_exposed, s.wind_exposed), (true, true));
}

#[test]
fn stories_with_the_same_name_pair_across_graphs() {
    let mut current = Model::new();
    let a = current.add("L1", BuildingStory::default());
    let mut new = Model::new();
    let b = new.add(
        "L1",
        BuildingStory {
            nominal_z_coordinate: Some(0.0),
            nominal_floor_to_floor_height: Some(3.5),
            ..Default::default()
        },
    );
    assert_ne!(current.handle(a), new.handle(b));

    let mut merger = ModelMerger::new();
    let mapping = merger.suggest_handle_mapping(&current, &new);
    assert_eq!(mapping.get(&current.handle(a).unwrap()), new.handle(b));

    merger.merge_models(&mut current, &new, &mapping);
    assert_eq!(current.objects_of_type(ObjectType::BuildingStory), vec![a]);
    let story = current.get::<BuildingStory>(a).unwrap();
    assert_eq!(story.nominal_floor_to_floor_height, Some(3.5));
    assert!(merger.errors().is_empty());
}

#[test]
fn merging_a_snapshot_restores_adjacency() {
    let mut original = Model::new();
    let a = original.add("A", Space::default());
    let b = original.add("B", Space::default());
    original.add_surface("A East", a, wall(4.0, 0.0, 4.0), None).unwrap();
    let mut reversed = wall(4.0, 0.0, 4.0);
    reversed.reverse();
    original.add_surface("B West", b, reversed, None).unwrap();
    match_surfaces(&mut original, &[a, b]);

    let snapshot = Model::from_json(&original.to_json().unwrap()).unwrap();

    let mut current = Model::new();
    current.add("A", Space::default());
    let mut merger = ModelMerger::new();
    let mapping = merger.suggest_handle_mapping(&current, &snapshot);
    merger.merge_models(&mut current, &snapshot, &mapping);

    let east = current.find_by_name(ObjectType::Surface, "A East").unwrap();
    let west = current.find_by_name(ObjectType::Surface, "B West").unwrap();
    assert_eq!(current.get::<Surface>(east).unwrap().adjacent_surface, Some(west));
    assert_eq!(current.objects_of_type(ObjectType::Space).len(), 2);

    // a second merge with a fresh mapping is a no-op on structure
    let mapping: HandleMapping = merger.suggest_handle_mapping(&current, &snapshot);
    merger.merge_models(&mut current, &snapshot, &mapping);
    assert_eq!(current.objects_of_type(ObjectType::Surface).len(), 2);
    let east = current.find_by_name(ObjectType::Surface, "A East").unwrap();
    assert!(current.get::<Surface>(east).unwrap().adjacent_surface.is_some());
}
