// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building graph → three.js scene.
//!
//! Every planar object becomes one mesh in site coordinates. With
//! triangulation on, surfaces are triangulated in their face frame with
//! their sub-surfaces cut out; with it off, each mesh holds one polygon face
//! so the scene can be read back into a model.

use bem_lite_geometry::{
    circular_equal, combined_point_index, compute_triangulation, outward_normal, reverse,
    BoundingBox, Point3, Tolerances, Transformation, Vector3,
};
use bem_lite_model::{
    Building, BuildingStory, DaylightingControl, InteriorPartitionSurface,
    InteriorPartitionSurfaceGroup, LogMessage, LogSink, Model, ObjectKey, ObjectType,
    ShadingSurface, ShadingSurfaceGroup, ShadingSurfaceType, Space, SubSurface, Surface,
    ThermalZone,
};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::materials::{
    boundary_material_name, object_material_name, surface_type_material_name, MaterialPalette,
    AIR_WALL_MATERIAL, DAYLIGHTING_CONTROL_MATERIAL,
};
use crate::three::{
    idd_object_type, to_three_vector, ThreeBoundingBox, ThreeGeometry, ThreeGeometryData,
    ThreeModelObjectMetadata, ThreeScene, ThreeSceneChild, ThreeSceneMetadata, ThreeSceneObject,
    ThreeUserData, FACE_FORMAT_POLYGON, FACE_FORMAT_TRIANGLE, FEATURE_ABOVE_CEILING_PLENUM_HEIGHT,
    FEATURE_BELOW_FLOOR_PLENUM_HEIGHT, FEATURE_OPEN_TO_BELOW, METADATA_TYPES,
};

/// Half the edge of the square drawn for a daylighting control.
const DAYLIGHTING_CONTROL_HALF_SIZE: f64 = 0.1;

/// Types that get a `<Type>_<name>` material from their rendering color.
const COLORED_TYPES: [ObjectType; 5] = [
    ObjectType::ThermalZone,
    ObjectType::SpaceType,
    ObjectType::BuildingStory,
    ObjectType::BuildingUnit,
    ObjectType::Construction,
];

#[derive(Debug, Clone, Copy)]
pub struct ForwardOptions {
    /// Triangulate faces for display; off keeps one polygon per mesh.
    pub triangulate: bool,
    /// Vertex merge distance in meters.
    pub tolerance: f64,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            tolerance: Tolerances::default().point,
        }
    }
}

/// Translates a building graph into a scene.
#[derive(Debug)]
pub struct ForwardTranslator {
    log: LogSink,
}

impl Default for ForwardTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardTranslator {
    pub fn new() -> Self {
        Self {
            log: LogSink::new("bem_lite.scene.ForwardTranslator"),
        }
    }

    pub fn warnings(&self) -> Vec<LogMessage> {
        self.log.warnings()
    }

    pub fn errors(&self) -> Vec<LogMessage> {
        self.log.errors()
    }

    pub fn messages(&self) -> &[LogMessage] {
        self.log.messages()
    }

    pub fn model_to_three_js(&mut self, model: &mut Model, options: &ForwardOptions) -> Result<ThreeScene> {
        self.model_to_three_js_with_progress(model, options, |_| {})
    }

    /// Like [`model_to_three_js`](Self::model_to_three_js), reporting
    /// progress in percent. Reported values never decrease and end at 100.
    ///
    /// Objects that carry a rendering color and have none get one first.
    pub fn model_to_three_js_with_progress(
        &mut self,
        model: &mut Model,
        options: &ForwardOptions,
        mut progress: impl FnMut(f64),
    ) -> Result<ThreeScene> {
        self.log.reset();
        for ty in COLORED_TYPES {
            for key in model.objects_of_type(ty) {
                model.ensure_rendering_color(key)?;
            }
        }
        let model: &Model = model;

        let planar = [
            ObjectType::Surface,
            ObjectType::SubSurface,
            ObjectType::ShadingSurface,
            ObjectType::InteriorPartitionSurface,
            ObjectType::DaylightingControl,
        ];
        let total = planar
            .iter()
            .chain(COLORED_TYPES.iter())
            .chain(METADATA_TYPES.iter())
            .map(|&ty| model.objects_of_type(ty).len())
            .sum();

        let mut pass = Pass {
            model,
            options,
            log: &mut self.log,
            progress: Progress::new(total, &mut progress),
            palette: MaterialPalette::standard(),
            spaces: FxHashMap::default(),
            bounds: BoundingBox::new(),
            geometries: Vec::new(),
            children: Vec::new(),
        };
        pass.progress.start();
        pass.add_object_materials();
        for surface in model.objects_of_type(ObjectType::Surface) {
            pass.add_surface(surface)?;
        }
        for sub_surface in model.objects_of_type(ObjectType::SubSurface) {
            pass.add_sub_surface(sub_surface)?;
        }
        for shading in model.objects_of_type(ObjectType::ShadingSurface) {
            pass.add_shading_surface(shading)?;
        }
        for partition in model.objects_of_type(ObjectType::InteriorPartitionSurface) {
            pass.add_interior_partition_surface(partition)?;
        }
        for control in model.objects_of_type(ObjectType::DaylightingControl) {
            pass.add_daylighting_control(control)?;
        }
        let metadata = pass.metadata();
        pass.progress.finish();

        tracing::info!(
            meshes = pass.children.len(),
            materials = pass.palette.materials().len(),
            triangulated = options.triangulate,
            "model translated to scene"
        );

        Ok(ThreeScene {
            metadata,
            geometries: pass.geometries,
            materials: pass.palette.into_materials(),
            object: ThreeSceneObject::new(pass.children),
        })
    }
}

struct Progress<'p> {
    total: usize,
    done: usize,
    last: f64,
    callback: &'p mut dyn FnMut(f64),
}

impl<'p> Progress<'p> {
    fn new(total: usize, callback: &'p mut dyn FnMut(f64)) -> Self {
        Self {
            total,
            done: 0,
            last: 0.0,
            callback,
        }
    }

    fn start(&mut self) {
        (self.callback)(0.0);
    }

    fn step(&mut self) {
        self.done += 1;
        let percent = if self.total == 0 {
            100.0
        } else {
            (100.0 * self.done as f64 / self.total as f64).min(100.0)
        };
        if percent > self.last {
            self.last = percent;
            (self.callback)(percent);
        }
    }

    fn finish(&mut self) {
        if self.last < 100.0 {
            self.last = 100.0;
            (self.callback)(100.0);
        }
    }
}

/// Name, handle and material name of a referenced object.
#[derive(Debug, Clone, Default)]
struct Named {
    name: String,
    handle: String,
    material: String,
}

impl Named {
    fn of(model: &Model, key: Option<ObjectKey>) -> Self {
        let Some(object) = key.and_then(|k| model.object(k)) else {
            return Self::default();
        };
        Self {
            name: object.name().to_string(),
            handle: object.handle().to_string(),
            material: object_material_name(object.object_type(), object.name()).unwrap_or_default(),
        }
    }
}

/// Objects a space hangs off, resolved once per space.
#[derive(Debug, Clone, Default)]
struct SpaceInfo {
    space: Named,
    thermal_zone: Named,
    space_type: Named,
    building_story: Named,
    building_unit: Named,
    construction_set: Named,
}

impl SpaceInfo {
    fn apply(&self, user_data: &mut ThreeUserData) {
        user_data.space_name = self.space.name.clone();
        user_data.space_handle = self.space.handle.clone();
        user_data.thermal_zone_name = self.thermal_zone.name.clone();
        user_data.thermal_zone_handle = self.thermal_zone.handle.clone();
        user_data.thermal_zone_material_name = self.thermal_zone.material.clone();
        user_data.space_type_name = self.space_type.name.clone();
        user_data.space_type_handle = self.space_type.handle.clone();
        user_data.space_type_material_name = self.space_type.material.clone();
        user_data.building_story_name = self.building_story.name.clone();
        user_data.building_story_handle = self.building_story.handle.clone();
        user_data.building_story_material_name = self.building_story.material.clone();
        user_data.building_unit_name = self.building_unit.name.clone();
        user_data.building_unit_handle = self.building_unit.handle.clone();
        user_data.building_unit_material_name = self.building_unit.material.clone();
        user_data.construction_set_name = self.construction_set.name.clone();
        user_data.construction_set_handle = self.construction_set.handle.clone();
        user_data.construction_set_material_name = self.construction_set.material.clone();
    }
}

fn exposure_strings(sun: bool, wind: bool) -> (String, String) {
    (
        if sun { "SunExposed" } else { "NoSun" }.to_string(),
        if wind { "WindExposed" } else { "NoWind" }.to_string(),
    )
}

/// State of one translation call.
struct Pass<'a> {
    model: &'a Model,
    options: &'a ForwardOptions,
    log: &'a mut LogSink,
    progress: Progress<'a>,
    palette: MaterialPalette,
    spaces: FxHashMap<ObjectKey, SpaceInfo>,
    bounds: BoundingBox,
    geometries: Vec<ThreeGeometry>,
    children: Vec<ThreeSceneChild>,
}

impl Pass<'_> {
    fn add_object_materials(&mut self) {
        for ty in COLORED_TYPES {
            for key in self.model.objects_of_type(ty) {
                let color = self
                    .model
                    .object(key)
                    .and_then(|o| o.data.rendering_color().copied().flatten());
                if let (Some(name), Some(color)) = (
                    self.model.name(key).and_then(|n| object_material_name(ty, n)),
                    color,
                ) {
                    self.palette.add_object_material(name, color);
                }
                self.progress.step();
            }
        }
    }

    fn space_info(&mut self, space: Option<ObjectKey>) -> SpaceInfo {
        let Some(space) = space else {
            return SpaceInfo::default();
        };
        let model = self.model;
        self.spaces
            .entry(space)
            .or_insert_with(|| {
                let Some(data) = model.get::<Space>(space) else {
                    return SpaceInfo::default();
                };
                let building_space_type = model
                    .unique_building()
                    .and_then(|b| model.get::<Building>(b))
                    .and_then(|b| b.space_type);
                SpaceInfo {
                    space: Named::of(model, Some(space)),
                    thermal_zone: Named::of(model, data.thermal_zone),
                    space_type: Named::of(model, data.space_type.or(building_space_type)),
                    building_story: Named::of(model, data.building_story),
                    building_unit: Named::of(model, data.building_unit),
                    construction_set: Named::of(model, data.default_construction_set),
                }
            })
            .clone()
    }

    fn base_user_data(&self, key: ObjectKey) -> ThreeUserData {
        let mut user_data = ThreeUserData::default();
        if let Some(object) = self.model.object(key) {
            user_data.handle = object.handle().to_string();
            user_data.name = object.name().to_string();
        }
        user_data
    }

    fn set_construction(&self, user_data: &mut ThreeUserData, construction: Option<ObjectKey>) {
        let named = Named::of(self.model, construction);
        user_data.construction_name = named.name;
        user_data.construction_handle = named.handle;
        user_data.construction_material_name = named.material;
    }

    /// True if `other` lies on `key` with opposite winding.
    fn coincident(&self, key: ObjectKey, other: ObjectKey) -> bool {
        match (self.model.site_vertices(key), self.model.site_vertices(other)) {
            (Ok(a), Ok(b)) => circular_equal(&a, &reverse(&b), self.options.tolerance),
            _ => false,
        }
    }

    fn add_surface(&mut self, key: ObjectKey) -> Result<()> {
        self.progress.step();
        let Some(surface) = self.model.get::<Surface>(key) else {
            return Ok(());
        };
        let role = surface.surface_type.as_str();
        let mut user_data = self.base_user_data(key);
        user_data.surface_type = role.to_string();
        user_data.surface_type_material_name = surface_type_material_name(role).to_string();
        self.set_construction(&mut user_data, surface.construction);
        self.space_info(surface.space).apply(&mut user_data);

        let condition = surface.outside_boundary_condition;
        user_data.outside_boundary_condition = condition.as_str().to_string();
        user_data.boundary_material_name =
            boundary_material_name(condition, surface.sun_exposed, surface.wind_exposed);
        (user_data.sun_exposure, user_data.wind_exposure) =
            exposure_strings(surface.sun_exposed, surface.wind_exposed);
        if let Some(adjacent) = surface.adjacent_surface {
            let named = Named::of(self.model, Some(adjacent));
            user_data.outside_boundary_condition_object_name = named.name;
            user_data.outside_boundary_condition_object_handle = named.handle;
            user_data.coincident_with_outside_object = self.coincident(key, adjacent);
        }
        user_data.air_wall = self.model.is_air_wall(key);

        let holes: Vec<Vec<Point3<f64>>> = self
            .model
            .sub_surfaces(key)
            .into_iter()
            .filter_map(|s| self.model.get::<SubSurface>(s))
            .map(|s| s.vertices.clone())
            .collect();
        let material = if user_data.air_wall {
            AIR_WALL_MATERIAL.to_string()
        } else {
            user_data.surface_type_material_name.clone()
        };
        self.add_mesh(key, &surface.vertices, &holes, &material, user_data)
    }

    fn add_sub_surface(&mut self, key: ObjectKey) -> Result<()> {
        self.progress.step();
        let Some(sub_surface) = self.model.get::<SubSurface>(key) else {
            return Ok(());
        };
        let role = sub_surface.sub_surface_type.as_str();
        let mut user_data = self.base_user_data(key);
        user_data.surface_type = role.to_string();
        user_data.surface_type_material_name = surface_type_material_name(role).to_string();
        self.set_construction(&mut user_data, sub_surface.construction);

        let parent = sub_surface.surface;
        let named = Named::of(self.model, parent);
        user_data.surface_name = named.name;
        user_data.surface_handle = named.handle;
        if let Some(surface) = parent.and_then(|p| self.model.get::<Surface>(p)) {
            self.space_info(surface.space).apply(&mut user_data);
            let condition = surface.outside_boundary_condition;
            user_data.outside_boundary_condition = condition.as_str().to_string();
            user_data.boundary_material_name =
                boundary_material_name(condition, surface.sun_exposed, surface.wind_exposed);
            (user_data.sun_exposure, user_data.wind_exposure) =
                exposure_strings(surface.sun_exposed, surface.wind_exposed);
        }
        if let Some(adjacent) = sub_surface.adjacent_sub_surface {
            let named = Named::of(self.model, Some(adjacent));
            user_data.outside_boundary_condition_object_name = named.name;
            user_data.outside_boundary_condition_object_handle = named.handle;
            user_data.coincident_with_outside_object = self.coincident(key, adjacent);
        }
        user_data.air_wall = self.model.is_air_wall(key);

        let material = if user_data.air_wall {
            AIR_WALL_MATERIAL.to_string()
        } else {
            user_data.surface_type_material_name.clone()
        };
        self.add_mesh(key, &sub_surface.vertices, &[], &material, user_data)
    }

    fn add_shading_surface(&mut self, key: ObjectKey) -> Result<()> {
        self.progress.step();
        let Some(shading) = self.model.get::<ShadingSurface>(key) else {
            return Ok(());
        };
        let group = shading.group.and_then(|g| self.model.get::<ShadingSurfaceGroup>(g));
        let role = match group.map(|g| g.shading_type) {
            Some(ShadingSurfaceType::Site) => "SiteShading",
            Some(ShadingSurfaceType::Space) => "SpaceShading",
            _ => "BuildingShading",
        };
        let mut user_data = self.base_user_data(key);
        user_data.surface_type = role.to_string();
        user_data.surface_type_material_name = role.to_string();
        self.set_construction(&mut user_data, shading.construction);

        let named = Named::of(self.model, shading.group);
        user_data.shading_name = named.name;
        user_data.shading_handle = named.handle;
        if let Some(group) = group {
            self.space_info(group.space).apply(&mut user_data);
            let shaded = Named::of(self.model, group.shaded_sub_surface);
            user_data.sub_surface_name = shaded.name;
            user_data.sub_surface_handle = shaded.handle;
        }
        self.add_mesh(key, &shading.vertices, &[], role, user_data)
    }

    fn add_interior_partition_surface(&mut self, key: ObjectKey) -> Result<()> {
        self.progress.step();
        let Some(partition) = self.model.get::<InteriorPartitionSurface>(key) else {
            return Ok(());
        };
        let role = "InteriorPartitionSurface";
        let mut user_data = self.base_user_data(key);
        user_data.surface_type = role.to_string();
        user_data.surface_type_material_name = role.to_string();
        self.set_construction(&mut user_data, partition.construction);
        let space = partition
            .group
            .and_then(|g| self.model.get::<InteriorPartitionSurfaceGroup>(g))
            .and_then(|g| g.space);
        self.space_info(space).apply(&mut user_data);
        self.add_mesh(key, &partition.vertices, &[], role, user_data)
    }

    /// Drawn as a small horizontal square centered on the sensor.
    fn add_daylighting_control(&mut self, key: ObjectKey) -> Result<()> {
        self.progress.step();
        let Some(control) = self.model.get::<DaylightingControl>(key) else {
            return Ok(());
        };
        let mut user_data = self.base_user_data(key);
        user_data.surface_type = DAYLIGHTING_CONTROL_MATERIAL.to_string();
        user_data.surface_type_material_name = DAYLIGHTING_CONTROL_MATERIAL.to_string();
        user_data.illuminance_setpoint = control.illuminance_setpoint;
        self.space_info(control.space).apply(&mut user_data);

        let h = DAYLIGHTING_CONTROL_HALF_SIZE;
        let square: Vec<Point3<f64>> = [(-h, -h), (h, -h), (h, h), (-h, h)]
            .into_iter()
            .map(|(dx, dy)| control.position + Vector3::new(dx, dy, 0.0))
            .collect();
        self.add_mesh(key, &square, &[], DAYLIGHTING_CONTROL_MATERIAL, user_data)
    }

    /// Emits one geometry and one mesh child for `key`; degenerate or
    /// untriangulable polygons are logged and skipped.
    fn add_mesh(
        &mut self,
        key: ObjectKey,
        vertices: &[Point3<f64>],
        holes: &[Vec<Point3<f64>>],
        material_name: &str,
        user_data: ThreeUserData,
    ) -> Result<()> {
        let Some(object) = self.model.object(key) else {
            return Ok(());
        };
        let ty = object.object_type();
        let name = object.name().to_string();
        let handle = object.handle().to_string();

        if outward_normal(vertices).is_none() {
            self.log.warn(format!("Skipping degenerate {ty} '{name}'"));
            return Ok(());
        }
        let site = match self.model.site_transformation(key) {
            Ok(t) => t,
            Err(err) => {
                self.log.error(format!("Cannot place {ty} '{name}': {err}"));
                return Ok(());
            }
        };

        let mut pool: Vec<Point3<f64>> = Vec::new();
        let mut faces: Vec<usize> = Vec::new();
        let tol = self.options.tolerance;
        if self.options.triangulate {
            let face = Transformation::align_face(vertices);
            let to_face = face.inverse()?;
            let local = to_face.transform_points(vertices);
            let local_holes: Vec<Vec<Point3<f64>>> =
                holes.iter().map(|h| to_face.transform_points(h)).collect();
            let triangles = compute_triangulation(&local, &local_holes, tol);
            if triangles.is_empty() {
                self.log.error(format!("Failed to triangulate {ty} '{name}'"));
                return Ok(());
            }
            let to_site = &site * &face;
            for triangle in &triangles {
                faces.push(FACE_FORMAT_TRIANGLE);
                for p in triangle {
                    faces.push(combined_point_index(&(&to_site * *p), &mut pool, tol));
                }
            }
        } else {
            let indices: Vec<usize> = site
                .transform_points(vertices)
                .iter()
                .map(|p| combined_point_index(p, &mut pool, tol))
                .collect();
            faces.push(FACE_FORMAT_POLYGON);
            faces.extend(indices.into_iter().rev());
        }
        self.bounds.add_points(&pool);

        let material = self.palette.material_id(material_name).to_string();
        self.geometries.push(ThreeGeometry::new(
            handle.clone(),
            ThreeGeometryData::new(to_three_vector(&pool), faces),
        ));
        self.children
            .push(ThreeSceneChild::mesh(name, handle, material, user_data));
        Ok(())
    }

    fn metadata(&mut self) -> ThreeSceneMetadata {
        let model = self.model;
        let mut records = Vec::new();
        for ty in METADATA_TYPES {
            let mut keys = model.objects_of_type(ty);
            keys.sort_by(|a, b| model.name(*a).cmp(&model.name(*b)));
            for key in keys {
                if let Some(record) = object_metadata(model, key) {
                    records.push(record);
                }
                self.progress.step();
            }
        }

        let north_axis = model
            .unique_building()
            .and_then(|b| model.get::<Building>(b))
            .and_then(|b| b.north_axis)
            .unwrap_or(0.0);

        ThreeSceneMetadata {
            building_story_names: building_story_names(model),
            bounding_box: scene_bounds(&self.bounds),
            north_axis,
            model_object_metadata: records,
            ..Default::default()
        }
    }
}

fn object_metadata(model: &Model, key: ObjectKey) -> Option<ThreeModelObjectMetadata> {
    let object = model.object(key)?;
    let mut record = ThreeModelObjectMetadata::new(
        idd_object_type(object.object_type()),
        object.handle().to_string(),
        object.name(),
    );
    if let Some(color) = object.data.rendering_color().copied().flatten() {
        record.color = color.color_string();
    }
    record.open_to_below = object.features.get_boolean(FEATURE_OPEN_TO_BELOW).unwrap_or(false);

    if let Some(zone) = model.get::<ThermalZone>(key) {
        record.multiplier = Some(zone.multiplier());
    }
    if let Some(story) = model.get::<BuildingStory>(key) {
        record.nominal_z_coordinate = story.nominal_z_coordinate;
        record.floor_to_ceiling_height = story.nominal_floor_to_ceiling_height;
        record.below_floor_plenum_height =
            object.features.get_double(FEATURE_BELOW_FLOOR_PLENUM_HEIGHT).ok();
        record.above_ceiling_plenum_height =
            object.features.get_double(FEATURE_ABOVE_CEILING_PLENUM_HEIGHT).ok();
    }
    Some(record)
}

/// Story names ordered by nominal z, stories without one last, then by name.
fn building_story_names(model: &Model) -> Vec<String> {
    let mut stories: Vec<(f64, String)> = model
        .objects_of_type(ObjectType::BuildingStory)
        .into_iter()
        .filter_map(|k| {
            let z = model
                .get::<BuildingStory>(k)?
                .nominal_z_coordinate
                .unwrap_or(f64::INFINITY);
            Some((z, model.name(k)?.to_string()))
        })
        .collect();
    stories.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    stories.into_iter().map(|(_, name)| name).collect()
}

fn scene_bounds(bounds: &BoundingBox) -> ThreeBoundingBox {
    let (Some(min), Some(max)) = (bounds.min_corner(), bounds.max_corner()) else {
        return ThreeBoundingBox::default();
    };
    let center = Point3::from((min.coords + max.coords) / 2.0);
    ThreeBoundingBox {
        min_x: min.x,
        min_y: min.y,
        min_z: min.z,
        max_x: max.x,
        max_y: max.y,
        max_z: max.z,
        look_at_x: center.x,
        look_at_y: center.y,
        look_at_z: center.z,
        look_at_r: (max - min).norm() / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bem_lite_model::{BoundaryCondition, SurfaceType};

    fn rect_xz(x0: f64, x1: f64, y: f64, h: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(x0, y, h),
            Point3::new(x0, y, 0.0),
            Point3::new(x1, y, 0.0),
            Point3::new(x1, y, h),
        ]
    }

    fn one_wall_model() -> (Model, ObjectKey) {
        let mut model = Model::new();
        let zone = model.add("Zone 1", ThermalZone::default());
        let space = model.add(
            "Space 1",
            Space {
                thermal_zone: Some(zone),
                ..Default::default()
            },
        );
        let wall = model
            .add_surface("South Wall", space, rect_xz(0.0, 4.0, 0.0, 3.0), None)
            .unwrap();
        model
            .add_sub_surface(
                "Window",
                wall,
                vec![
                    Point3::new(1.0, 0.0, 2.0),
                    Point3::new(1.0, 0.0, 1.0),
                    Point3::new(3.0, 0.0, 1.0),
                    Point3::new(3.0, 0.0, 2.0),
                ],
                None,
            )
            .unwrap();
        (model, wall)
    }

    fn child<'a>(scene: &'a ThreeScene, name: &str) -> &'a ThreeSceneChild {
        scene.object.children.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn wall_user_data_describes_the_surface() {
        let (mut model, wall) = one_wall_model();
        assert_eq!(model.get::<Surface>(wall).unwrap().surface_type, SurfaceType::Wall);
        let scene = ForwardTranslator::new()
            .model_to_three_js(&mut model, &ForwardOptions::default())
            .unwrap();

        let wall = child(&scene, "South Wall");
        let data = &wall.user_data;
        assert_eq!(data.surface_type, "Wall");
        assert_eq!(data.space_name, "Space 1");
        assert_eq!(data.thermal_zone_name, "Zone 1");
        assert_eq!(data.thermal_zone_material_name, "ThermalZone_Zone 1");
        assert_eq!(data.outside_boundary_condition, "Outdoors");
        assert_eq!(data.boundary_material_name, "Boundary_Outdoors_SunWind");
        assert_eq!(data.sun_exposure, "SunExposed");
        assert_eq!(data.wind_exposure, "WindExposed");
        assert_eq!(wall.kind, "Mesh");

        let wall_material = scene.material(&wall.material).unwrap();
        assert_eq!(wall_material.name, "Wall");

        let window = child(&scene, "Window");
        assert_eq!(window.user_data.surface_type, "FixedWindow");
        assert_eq!(window.user_data.surface_type_material_name, "Window");
        assert_eq!(window.user_data.surface_name, "South Wall");
        assert!(scene.materials.iter().any(|m| m.name == "ThermalZone_Zone 1"));
    }

    #[test]
    fn triangulated_wall_leaves_the_window_open() {
        let (mut model, _) = one_wall_model();
        let scene = ForwardTranslator::new()
            .model_to_three_js(&mut model, &ForwardOptions::default())
            .unwrap();
        let wall = child(&scene, "South Wall");
        let data = &scene.geometry(&wall.geometry).unwrap().data;

        let points = crate::three::from_three_vector(&data.vertices);
        let mut total = 0.0;
        for face in data.faces.chunks(4) {
            assert_eq!(face[0], FACE_FORMAT_TRIANGLE);
            let triangle = [points[face[1]], points[face[2]], points[face[3]]];
            total += bem_lite_geometry::area(&triangle).unwrap();
            let normal = outward_normal(&triangle).unwrap();
            assert_relative_eq!(normal, -Vector3::y(), epsilon = 1e-9);
        }
        assert_relative_eq!(total, 12.0 - 2.0, epsilon = 1e-6);
    }

    #[test]
    fn untriangulated_faces_list_vertices_in_reverse() {
        let (mut model, _) = one_wall_model();
        let options = ForwardOptions {
            triangulate: false,
            ..Default::default()
        };
        let scene = ForwardTranslator::new().model_to_three_js(&mut model, &options).unwrap();
        let data = &scene.geometry(&child(&scene, "South Wall").geometry).unwrap().data;
        assert_eq!(data.faces, vec![FACE_FORMAT_POLYGON, 3, 2, 1, 0]);
        assert_eq!(data.vertices.len(), 12);
        // first vertex (0, 0, 3) in Y-up
        assert_eq!(&data.vertices[..3], &[0.0, 3.0, 0.0]);
    }

    #[test]
    fn north_axis_rotates_into_site_coordinates() {
        let (mut model, _) = one_wall_model();
        let building = model.get_unique_building();
        model.get_mut::<Building>(building).unwrap().north_axis = Some(90.0);
        let options = ForwardOptions {
            triangulate: false,
            ..Default::default()
        };
        let scene = ForwardTranslator::new().model_to_three_js(&mut model, &options).unwrap();
        assert_eq!(scene.metadata.north_axis, 90.0);

        let data = &scene.geometry(&child(&scene, "South Wall").geometry).unwrap().data;
        let points = crate::three::from_three_vector(&data.vertices);
        // building +X points to site -Y after a clockwise quarter turn
        assert_relative_eq!(points[2], Point3::new(0.0, -4.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn progress_is_monotonic_and_complete() {
        let (mut model, _) = one_wall_model();
        let mut reported = Vec::new();
        ForwardTranslator::new()
            .model_to_three_js_with_progress(&mut model, &ForwardOptions::default(), |p| {
                reported.push(p)
            })
            .unwrap();
        assert_eq!(reported.first(), Some(&0.0));
        assert_eq!(reported.last(), Some(&100.0));
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert!(reported.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[test]
    fn metadata_is_ordered_by_type_then_name() {
        let mut model = Model::new();
        model.add("Zone B", ThermalZone::default());
        model.add("Zone A", ThermalZone::default());
        let upper = model.add(
            "Upper",
            BuildingStory {
                nominal_z_coordinate: Some(3.0),
                ..Default::default()
            },
        );
        model.add(
            "Ground",
            BuildingStory {
                nominal_z_coordinate: Some(0.0),
                ..Default::default()
            },
        );
        model.add("Space 2", Space::default());
        model.add("Space 1", Space::default());
        model
            .features_mut(upper)
            .unwrap()
            .set_double(FEATURE_BELOW_FLOOR_PLENUM_HEIGHT, 0.5);

        let scene = ForwardTranslator::new()
            .model_to_three_js(&mut model, &ForwardOptions::default())
            .unwrap();
        let names: Vec<&str> = scene
            .metadata
            .model_object_metadata
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, ["Space 1", "Space 2", "Zone A", "Zone B", "Ground", "Upper"]);
        assert_eq!(scene.metadata.building_story_names, ["Ground", "Upper"]);

        let zone = &scene.metadata.model_object_metadata[2];
        assert_eq!(zone.idd_object_type, "OS:ThermalZone");
        assert_eq!(zone.multiplier, Some(1));
        assert_eq!(zone.color.len(), 7);

        let upper = &scene.metadata.model_object_metadata[5];
        assert_eq!(upper.nominal_z_coordinate, Some(3.0));
        assert_eq!(upper.below_floor_plenum_height, Some(0.5));
        assert_eq!(upper.above_ceiling_plenum_height, None);
    }

    #[test]
    fn adjacent_surfaces_report_their_partner() {
        let mut model = Model::new();
        let a = model.add("A", Space::default());
        let b = model.add("B", Space::default());
        let wall = rect_xz(0.0, 4.0, 0.0, 3.0);
        let sa = model.add_surface("A Wall", a, wall.clone(), None).unwrap();
        let sb = model
            .add_surface("B Wall", b, bem_lite_geometry::reverse(&wall), None)
            .unwrap();
        model.set_adjacent_surface(sa, sb).unwrap();

        let scene = ForwardTranslator::new()
            .model_to_three_js(&mut model, &ForwardOptions::default())
            .unwrap();
        let data = &child(&scene, "A Wall").user_data;
        assert_eq!(data.outside_boundary_condition, BoundaryCondition::Surface.as_str());
        assert_eq!(data.outside_boundary_condition_object_name, "B Wall");
        assert_eq!(data.boundary_material_name, "Boundary_Surface");
        assert!(data.coincident_with_outside_object);
        assert_eq!(data.sun_exposure, "NoSun");
    }

    #[test]
    fn daylighting_controls_become_small_squares() {
        let mut model = Model::new();
        let space = model.add("Space 1", Space::default());
        model.add(
            "Sensor",
            DaylightingControl {
                space: Some(space),
                position: Point3::new(2.0, 3.0, 0.8),
                illuminance_setpoint: 300.0,
            },
        );
        let scene = ForwardTranslator::new()
            .model_to_three_js(&mut model, &ForwardOptions::default())
            .unwrap();
        let sensor = child(&scene, "Sensor");
        assert_eq!(sensor.user_data.surface_type, "DaylightingControl");
        assert_eq!(sensor.user_data.illuminance_setpoint, 300.0);
        assert_eq!(sensor.user_data.space_name, "Space 1");

        let data = &scene.geometry(&sensor.geometry).unwrap().data;
        let points = crate::three::from_three_vector(&data.vertices);
        let center = bem_lite_geometry::centroid(&points).unwrap();
        assert_relative_eq!(center, Point3::new(2.0, 3.0, 0.8), epsilon = 1e-9);
    }
}
