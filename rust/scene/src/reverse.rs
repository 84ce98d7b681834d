// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! three.js scene → building graph.
//!
//! Only untriangulated scenes (one polygon face per mesh) can be read back.
//! Objects are rebuilt from the metadata records first, then from the
//! meshes in role order so every parent exists before its children. Finally
//! surfaces of touching spaces are intersected and matched, within each
//! story and across stories.

use bem_lite_geometry::{centroid, BoundingBox, Plane, Point3, Tolerances};
use bem_lite_model::{
    intersect_space_pair, intersect_surfaces, match_space_pair, match_surfaces,
    space_bounding_box, BoundaryCondition, Building, BuildingStory, BuildingUnit, Construction,
    DaylightingControl, DefaultConstructionSet, Handle, HandleMapping,
    InteriorPartitionSurfaceGroup, LogMessage, LogSink, Model, ObjectData, ObjectKey, ObjectType,
    RenderingColor, ShadingSurfaceGroup, ShadingSurfaceType, Space, SpaceType, SubSurfaceType,
    Surface, SurfaceType, ThermalZone, MATCH_TOLERANCE,
};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

use crate::error::Result;
use crate::three::{
    from_three_vector, parse_idd_object_type, ThreeModelObjectMetadata, ThreeScene,
    ThreeSceneChild, ThreeUserData, FACE_FORMAT_POLYGON, FEATURE_ABOVE_CEILING_PLENUM_HEIGHT,
    FEATURE_BELOW_FLOOR_PLENUM_HEIGHT, FEATURE_OPEN_TO_BELOW, METADATA_TYPES,
};

/// Space that base surfaces without a space name are put in.
pub const DEFAULT_SPACE_NAME: &str = "Default Space";

#[derive(Debug, Clone, Copy)]
pub struct ReverseOptions {
    /// Split partially overlapping surfaces of touching spaces.
    pub intersect_surfaces: bool,
    /// Pair up coincident surfaces of touching spaces.
    pub match_surfaces: bool,
    /// Plane validation tolerance in meters.
    pub tolerance: f64,
}

impl Default for ReverseOptions {
    fn default() -> Self {
        Self {
            intersect_surfaces: true,
            match_surfaces: true,
            tolerance: Tolerances::default().point,
        }
    }
}

/// What a mesh turns into, ordered so parents come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Surface(SurfaceType),
    SubSurface(SubSurfaceType),
    Shading(ShadingSurfaceType),
    InteriorPartition,
    DaylightingControl,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        if let Ok(t) = s.parse::<SurfaceType>() {
            return Some(Role::Surface(t));
        }
        if let Ok(t) = s.parse::<SubSurfaceType>() {
            return Some(Role::SubSurface(t));
        }
        match s.to_ascii_lowercase().as_str() {
            "siteshading" => Some(Role::Shading(ShadingSurfaceType::Site)),
            "buildingshading" => Some(Role::Shading(ShadingSurfaceType::Building)),
            "spaceshading" => Some(Role::Shading(ShadingSurfaceType::Space)),
            "interiorpartitionsurface" => Some(Role::InteriorPartition),
            "daylightingcontrol" => Some(Role::DaylightingControl),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Role::Surface(_) => 0,
            Role::SubSurface(_) => 1,
            Role::Shading(_) => 2,
            Role::InteriorPartition => 3,
            Role::DaylightingControl => 4,
        }
    }
}

/// Rebuilds a building graph from a scene.
#[derive(Debug)]
pub struct ReverseTranslator {
    log: LogSink,
    /// scene handle -> new handle
    mapping: HandleMapping,
}

impl Default for ReverseTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReverseTranslator {
    pub fn new() -> Self {
        Self {
            log: LogSink::new("bem_lite.scene.ReverseTranslator"),
            mapping: HandleMapping::new(),
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

    /// Scene handles to handles in the last model built.
    pub fn handle_mapping(&self) -> &HandleMapping {
        &self.mapping
    }

    /// Builds a new model from `scene`.
    ///
    /// Objects that cannot be rebuilt are logged and skipped; only a
    /// singular transformation fails the call.
    pub fn model_from_three_js(&mut self, scene: &ThreeScene, options: &ReverseOptions) -> Result<Model> {
        self.log.reset();
        self.mapping = HandleMapping::new();

        let mut pass = Rebuild {
            options,
            log: &mut self.log,
            mapping: &mut self.mapping,
            model: Model::new(),
            by_scene_handle: FxHashMap::default(),
            by_name: FxHashMap::default(),
            surface_links: Vec::new(),
            sub_surface_links: Vec::new(),
            partition_groups: FxHashMap::default(),
        };

        let building = pass.model.get_unique_building();
        if scene.metadata.north_axis != 0.0 {
            if let Some(b) = pass.model.get_mut::<Building>(building) {
                b.north_axis = Some(scene.metadata.north_axis);
            }
        }

        pass.create_metadata_objects(&scene.metadata.model_object_metadata);

        let mut children: Vec<(Role, &ThreeSceneChild)> = Vec::with_capacity(scene.object.children.len());
        for child in &scene.object.children {
            match Role::parse(&child.user_data.surface_type) {
                Some(role) => children.push((role, child)),
                None => pass.log.warn(format!(
                    "Unknown surface type '{}' for '{}'",
                    child.user_data.surface_type, child.name
                )),
            }
        }
        children.sort_by_key(|(role, _)| role.precedence());
        for (role, child) in children {
            pass.add_child(scene, role, child)?;
        }

        pass.restore_links();
        pass.intersect_and_match();

        let model = pass.model;
        tracing::info!(
            objects = model.len(),
            spaces = model.objects_of_type(ObjectType::Space).len(),
            warnings = self.log.warnings().len(),
            errors = self.log.errors().len(),
            "scene translated to model"
        );
        Ok(model)
    }
}

/// Partner of a surface or sub-surface named in its user data.
struct PendingLink {
    key: ObjectKey,
    name: String,
    handle: String,
}

/// State of one translation call.
struct Rebuild<'a> {
    options: &'a ReverseOptions,
    log: &'a mut LogSink,
    mapping: &'a mut HandleMapping,
    model: Model,
    by_scene_handle: FxHashMap<Handle, ObjectKey>,
    /// First object of each type and name.
    by_name: FxHashMap<(ObjectType, String), ObjectKey>,
    surface_links: Vec<PendingLink>,
    sub_surface_links: Vec<PendingLink>,
    partition_groups: FxHashMap<ObjectKey, ObjectKey>,
}

fn display_name(child: &ThreeSceneChild) -> &str {
    if child.user_data.name.is_empty() {
        &child.name
    } else {
        &child.user_data.name
    }
}

impl Rebuild<'_> {
    /// Records a new object under its scene handle and name.
    fn register(&mut self, key: ObjectKey, scene_handle: &str, name: &str) {
        let Some(ty) = self.model.object_type(key) else {
            return;
        };
        if let (Some(scene), Some(new)) = (Handle::parse(scene_handle), self.model.handle(key)) {
            if self.mapping.insert(scene, new) {
                self.by_scene_handle.insert(scene, key);
            } else {
                self.log.warn(format!("Duplicate handle {scene} for {ty} '{name}'"));
            }
        }
        match self.by_name.entry((ty, name.to_string())) {
            Entry::Occupied(_) => {
                self.log
                    .warn(format!("Multiple {ty} objects named '{name}', the first one is used"));
            }
            Entry::Vacant(slot) => {
                slot.insert(key);
            }
        }
    }

    /// Object of `ty` by scene handle, then by name.
    fn resolve(&self, ty: ObjectType, handle: &str, name: &str) -> Option<ObjectKey> {
        Handle::parse(handle)
            .and_then(|h| self.by_scene_handle.get(&h).copied())
            .filter(|&k| self.model.object_type(k) == Some(ty))
            .or_else(|| {
                (!name.is_empty())
                    .then(|| self.by_name.get(&(ty, name.to_string())).copied())
                    .flatten()
            })
    }

    fn create_metadata_objects(&mut self, records: &[ThreeModelObjectMetadata]) {
        let mut typed: Vec<(usize, &ThreeModelObjectMetadata)> = Vec::with_capacity(records.len());
        for record in records {
            let position = parse_idd_object_type(&record.idd_object_type)
                .and_then(|ty| METADATA_TYPES.iter().position(|t| *t == ty));
            match position {
                Some(p) => typed.push((p, record)),
                None => self.log.warn(format!(
                    "Unknown object type '{}' for '{}'",
                    record.idd_object_type, record.name
                )),
            }
        }
        typed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));

        for (position, record) in typed {
            let data: ObjectData = match METADATA_TYPES[position] {
                ObjectType::Space => Space::default().into(),
                ObjectType::ThermalZone => ThermalZone {
                    multiplier: record.multiplier,
                    ..Default::default()
                }
                .into(),
                ObjectType::SpaceType => SpaceType::default().into(),
                ObjectType::BuildingStory => BuildingStory {
                    nominal_z_coordinate: record.nominal_z_coordinate,
                    nominal_floor_to_ceiling_height: record.floor_to_ceiling_height,
                    ..Default::default()
                }
                .into(),
                ObjectType::BuildingUnit => BuildingUnit::default().into(),
                _ => DefaultConstructionSet::default().into(),
            };
            let key = self.model.add_data(record.name.as_str(), data);

            if !record.color.is_empty() {
                match RenderingColor::from_color_string(&record.color) {
                    Ok(color) => {
                        if let Some(slot) = self
                            .model
                            .object_mut(key)
                            .and_then(|o| o.data.rendering_color_mut())
                        {
                            *slot = Some(color);
                        }
                    }
                    Err(err) => self.log.warn(format!("Ignoring color of '{}': {err}", record.name)),
                }
            }
            if let Some(features) = self.model.features_mut(key) {
                if record.open_to_below {
                    features.set_boolean(FEATURE_OPEN_TO_BELOW, true);
                }
                if let Some(h) = record.below_floor_plenum_height {
                    features.set_double(FEATURE_BELOW_FLOOR_PLENUM_HEIGHT, h);
                }
                if let Some(h) = record.above_ceiling_plenum_height {
                    features.set_double(FEATURE_ABOVE_CEILING_PLENUM_HEIGHT, h);
                }
            }
            self.register(key, &record.handle, &record.name);
        }
    }

    /// Polygon of a mesh in site coordinates, or `None` (logged) when the
    /// mesh is not a single valid polygon face.
    fn face_points(&mut self, scene: &ThreeScene, child: &ThreeSceneChild) -> Option<Vec<Point3<f64>>> {
        let name = display_name(child);
        let Some(geometry) = scene.geometry(&child.geometry) else {
            self.log.error(format!("Missing geometry '{}' for '{name}'", child.geometry));
            return None;
        };
        let faces = &geometry.data.faces;
        match faces.first() {
            Some(&FACE_FORMAT_POLYGON) => {}
            Some(format) => {
                self.log.warn(format!("Unknown face format {format} for '{name}'"));
                return None;
            }
            None => {
                self.log.warn(format!("No faces for '{name}'"));
                return None;
            }
        }

        let vertices = from_three_vector(&geometry.data.vertices);
        let mut points = Vec::with_capacity(faces.len() - 1);
        for &index in faces[1..].iter().rev() {
            match vertices.get(index) {
                Some(p) => points.push(*p),
                None => {
                    self.log.warn(format!("Vertex index {index} out of range for '{name}'"));
                    return None;
                }
            }
        }

        if let Err(err) = Plane::fit(&points, self.options.tolerance) {
            self.log.warn(format!("Skipping '{name}': {err}"));
            return None;
        }
        Some(points)
    }

    /// Site points into the local coordinates of `key`'s frame.
    fn to_local(&self, key: ObjectKey, points: &[Point3<f64>]) -> Result<Vec<Point3<f64>>> {
        let to_local = self.model.site_transformation(key)?.inverse()?;
        Ok(to_local.transform_points(points))
    }

    fn add_child(&mut self, scene: &ThreeScene, role: Role, child: &ThreeSceneChild) -> Result<()> {
        let Some(points) = self.face_points(scene, child) else {
            return Ok(());
        };
        let name = display_name(child).to_string();
        let user_data = &child.user_data;
        match role {
            Role::Surface(surface_type) => self.add_surface(&name, surface_type, user_data, &points),
            Role::SubSurface(sub_surface_type) => {
                self.add_sub_surface(&name, sub_surface_type, user_data, &points)
            }
            Role::Shading(shading_type) => self.add_shading_surface(&name, shading_type, user_data, &points),
            Role::InteriorPartition => self.add_interior_partition_surface(&name, user_data, &points),
            Role::DaylightingControl => self.add_daylighting_control(&name, user_data, &points),
        }
    }

    /// Space named in the user data; created for base surfaces.
    fn space(&mut self, user_data: &ThreeUserData, create: bool) -> Option<ObjectKey> {
        if let Some(space) = self.resolve(ObjectType::Space, &user_data.space_handle, &user_data.space_name) {
            return Some(space);
        }
        if !create {
            return None;
        }
        let name = if user_data.space_name.is_empty() {
            DEFAULT_SPACE_NAME
        } else {
            user_data.space_name.as_str()
        };
        if let Some(space) = self.by_name.get(&(ObjectType::Space, name.to_string())) {
            return Some(*space);
        }
        let space = self.model.add(name, Space::default());
        self.register(space, &user_data.space_handle, name);
        Some(space)
    }

    /// Fills unset links of `space` from the names in the user data.
    fn bind_space(&mut self, space: ObjectKey, user_data: &ThreeUserData) {
        let zone = self.resolve(
            ObjectType::ThermalZone,
            &user_data.thermal_zone_handle,
            &user_data.thermal_zone_name,
        );
        let space_type = self.resolve(
            ObjectType::SpaceType,
            &user_data.space_type_handle,
            &user_data.space_type_name,
        );
        let story = self.resolve(
            ObjectType::BuildingStory,
            &user_data.building_story_handle,
            &user_data.building_story_name,
        );
        let unit = self.resolve(
            ObjectType::BuildingUnit,
            &user_data.building_unit_handle,
            &user_data.building_unit_name,
        );
        let construction_set = self.resolve(
            ObjectType::DefaultConstructionSet,
            &user_data.construction_set_handle,
            &user_data.construction_set_name,
        );
        if let Some(s) = self.model.get_mut::<Space>(space) {
            s.thermal_zone = s.thermal_zone.or(zone);
            s.space_type = s.space_type.or(space_type);
            s.building_story = s.building_story.or(story);
            s.building_unit = s.building_unit.or(unit);
            s.default_construction_set = s.default_construction_set.or(construction_set);
        }
    }

    /// Air walls get the shared air-wall construction; otherwise the named
    /// construction is found or created.
    fn apply_construction(&mut self, key: ObjectKey, user_data: &ThreeUserData) {
        let construction = if user_data.air_wall {
            Some(self.model.air_wall_construction())
        } else if !user_data.construction_name.is_empty() {
            let name = user_data.construction_name.as_str();
            Some(
                self.model
                    .find_by_name(ObjectType::Construction, name)
                    .unwrap_or_else(|| self.model.add(name, Construction::default())),
            )
        } else {
            None
        };
        if construction.is_some() {
            if let Err(err) = self.model.set_construction(key, construction) {
                self.log.error(format!("Cannot set construction: {err}"));
            }
        }
    }

    fn add_surface(
        &mut self,
        name: &str,
        surface_type: SurfaceType,
        user_data: &ThreeUserData,
        points: &[Point3<f64>],
    ) -> Result<()> {
        let Some(space) = self.space(user_data, true) else {
            return Ok(());
        };
        self.bind_space(space, user_data);
        let vertices = self.to_local(space, points)?;
        let key = match self.model.add_surface(name, space, vertices, Some(surface_type)) {
            Ok(key) => key,
            Err(err) => {
                self.log.error(format!("Cannot create surface '{name}': {err}"));
                return Ok(());
            }
        };
        self.register(key, &user_data.handle, name);
        self.apply_construction(key, user_data);

        if user_data.outside_boundary_condition.is_empty() {
            return Ok(());
        }
        match user_data.outside_boundary_condition.parse::<BoundaryCondition>() {
            Ok(BoundaryCondition::Surface) => {
                if !user_data.outside_boundary_condition_object_name.is_empty()
                    || !user_data.outside_boundary_condition_object_handle.is_empty()
                {
                    self.surface_links.push(PendingLink {
                        key,
                        name: user_data.outside_boundary_condition_object_name.clone(),
                        handle: user_data.outside_boundary_condition_object_handle.clone(),
                    });
                }
            }
            Ok(condition) => {
                if let Err(err) = self.model.set_outside_boundary_condition(key, condition) {
                    self.log.error(format!("Cannot set boundary condition of '{name}': {err}"));
                }
                if let Some(surface) = self.model.get_mut::<Surface>(key) {
                    if !user_data.sun_exposure.is_empty() {
                        surface.sun_exposed = user_data.sun_exposure.eq_ignore_ascii_case("SunExposed");
                    }
                    if !user_data.wind_exposure.is_empty() {
                        surface.wind_exposed = user_data.wind_exposure.eq_ignore_ascii_case("WindExposed");
                    }
                }
            }
            Err(err) => self.log.warn(format!("'{name}': {err}")),
        }
        Ok(())
    }

    fn add_sub_surface(
        &mut self,
        name: &str,
        sub_surface_type: SubSurfaceType,
        user_data: &ThreeUserData,
        points: &[Point3<f64>],
    ) -> Result<()> {
        let Some(parent) = self.resolve(ObjectType::Surface, &user_data.surface_handle, &user_data.surface_name)
        else {
            self.log.error(format!(
                "Cannot find surface '{}' for sub-surface '{name}'",
                user_data.surface_name
            ));
            return Ok(());
        };
        let vertices = self.to_local(parent, points)?;
        let key = match self.model.add_sub_surface(name, parent, vertices, Some(sub_surface_type)) {
            Ok(key) => key,
            Err(err) => {
                self.log.error(format!("Cannot create sub-surface '{name}': {err}"));
                return Ok(());
            }
        };
        self.register(key, &user_data.handle, name);
        self.apply_construction(key, user_data);

        let linked = user_data
            .outside_boundary_condition
            .eq_ignore_ascii_case(BoundaryCondition::Surface.as_str());
        if linked && !user_data.outside_boundary_condition_object_name.is_empty() {
            self.sub_surface_links.push(PendingLink {
                key,
                name: user_data.outside_boundary_condition_object_name.clone(),
                handle: user_data.outside_boundary_condition_object_handle.clone(),
            });
        }
        Ok(())
    }

    fn add_shading_surface(
        &mut self,
        name: &str,
        shading_type: ShadingSurfaceType,
        user_data: &ThreeUserData,
        points: &[Point3<f64>],
    ) -> Result<()> {
        let (space, shaded) = if shading_type == ShadingSurfaceType::Space {
            let Some(space) = self.space(user_data, false) else {
                self.log.error(format!(
                    "Cannot find space '{}' for shading surface '{name}'",
                    user_data.space_name
                ));
                return Ok(());
            };
            let Some(sub_surface) = self.resolve(
                ObjectType::SubSurface,
                &user_data.sub_surface_handle,
                &user_data.sub_surface_name,
            ) else {
                self.log.error(format!(
                    "Cannot find sub-surface '{}' for shading surface '{name}'",
                    user_data.sub_surface_name
                ));
                return Ok(());
            };
            (Some(space), Some(sub_surface))
        } else {
            (None, None)
        };

        let existing = self
            .resolve(
                ObjectType::ShadingSurfaceGroup,
                &user_data.shading_handle,
                &user_data.shading_name,
            )
            .filter(|&g| {
                self.model
                    .get::<ShadingSurfaceGroup>(g)
                    .is_some_and(|g| g.shading_type == shading_type && g.space == space)
            });
        let group = match existing {
            Some(group) => group,
            None => {
                let group_name = if user_data.shading_name.is_empty() {
                    self.model.unique_name(
                        ObjectType::ShadingSurfaceGroup,
                        &format!("{shading_type} Shading Surface Group"),
                    )
                } else {
                    user_data.shading_name.clone()
                };
                let group = self.model.add(
                    group_name.as_str(),
                    ShadingSurfaceGroup {
                        shading_type,
                        space,
                        shaded_sub_surface: shaded,
                        ..Default::default()
                    },
                );
                self.register(group, &user_data.shading_handle, &group_name);
                group
            }
        };

        let vertices = self.to_local(group, points)?;
        match self.model.add_shading_surface(name, group, vertices) {
            Ok(key) => {
                self.register(key, &user_data.handle, name);
                self.apply_construction(key, user_data);
            }
            Err(err) => self.log.error(format!("Cannot create shading surface '{name}': {err}")),
        }
        Ok(())
    }

    fn add_interior_partition_surface(
        &mut self,
        name: &str,
        user_data: &ThreeUserData,
        points: &[Point3<f64>],
    ) -> Result<()> {
        let Some(space) = self.space(user_data, false) else {
            self.log.error(format!(
                "Cannot find space '{}' for interior partition surface '{name}'",
                user_data.space_name
            ));
            return Ok(());
        };
        let group = match self.partition_groups.get(&space) {
            Some(group) => *group,
            None => {
                let space_name = self.model.name(space).unwrap_or_default().to_string();
                let group = self.model.add(
                    format!("{space_name} Interior Partition Group"),
                    InteriorPartitionSurfaceGroup {
                        space: Some(space),
                        ..Default::default()
                    },
                );
                self.partition_groups.insert(space, group);
                group
            }
        };

        let vertices = self.to_local(group, points)?;
        match self.model.add_interior_partition_surface(name, group, vertices) {
            Ok(key) => {
                self.register(key, &user_data.handle, name);
                self.apply_construction(key, user_data);
            }
            Err(err) => self.log.error(format!(
                "Cannot create interior partition surface '{name}': {err}"
            )),
        }
        Ok(())
    }

    /// The control sits at the face centroid and becomes its zone's primary
    /// control, or the secondary one when a primary exists.
    fn add_daylighting_control(
        &mut self,
        name: &str,
        user_data: &ThreeUserData,
        points: &[Point3<f64>],
    ) -> Result<()> {
        let Some(space) = self.space(user_data, false) else {
            self.log.error(format!(
                "Cannot find space '{}' for daylighting control '{name}'",
                user_data.space_name
            ));
            return Ok(());
        };
        self.bind_space(space, user_data);
        let Some(position) = centroid(&self.to_local(space, points)?) else {
            self.log.warn(format!("Skipping daylighting control '{name}' without a centroid"));
            return Ok(());
        };
        let mut control = DaylightingControl {
            space: Some(space),
            position,
            ..Default::default()
        };
        if user_data.illuminance_setpoint > 0.0 {
            control.illuminance_setpoint = user_data.illuminance_setpoint;
        }
        let key = self.model.add(name, control);
        self.register(key, &user_data.handle, name);

        let zone = self.model.get::<Space>(space).and_then(|s| s.thermal_zone);
        let Some(zone) = zone.and_then(|z| self.model.get_mut::<ThermalZone>(z)) else {
            return Ok(());
        };
        if zone.primary_daylighting_control.is_none() {
            zone.primary_daylighting_control = Some(key);
        } else if zone.secondary_daylighting_control.is_none() {
            zone.secondary_daylighting_control = Some(key);
        } else {
            self.log.warn(format!(
                "Zone already has two daylighting controls, '{name}' is not attached"
            ));
        }
        Ok(())
    }

    /// Re-creates adjacencies named explicitly in the user data.
    fn restore_links(&mut self) {
        for link in std::mem::take(&mut self.surface_links) {
            match self.resolve(ObjectType::Surface, &link.handle, &link.name) {
                Some(other) if other != link.key => {
                    if let Err(err) = self.model.set_adjacent_surface(link.key, other) {
                        self.log.warn(format!("Cannot link surface to '{}': {err}", link.name));
                    }
                }
                _ => self.log.warn(format!("Cannot find adjacent surface '{}'", link.name)),
            }
        }
        for link in std::mem::take(&mut self.sub_surface_links) {
            match self.resolve(ObjectType::SubSurface, &link.handle, &link.name) {
                Some(other) if other != link.key => {
                    if let Err(err) = self.model.set_adjacent_sub_surface(link.key, other) {
                        self.log.warn(format!("Cannot link sub-surface to '{}': {err}", link.name));
                    }
                }
                _ => self.log.warn(format!("Cannot find adjacent sub-surface '{}'", link.name)),
            }
        }
    }

    /// Intersects then matches surfaces of touching spaces, within each
    /// story and between every pair of stories.
    fn intersect_and_match(&mut self) {
        if !self.options.intersect_surfaces && !self.options.match_surfaces {
            return;
        }
        let stories = story_groups(&self.model);

        if self.options.intersect_surfaces {
            let mut created = 0;
            for spaces in &stories {
                created += intersect_surfaces(&mut self.model, spaces, self.log);
            }
            for (a, b) in cross_story_pairs(&self.model, &stories) {
                created += intersect_space_pair(&mut self.model, a, b, self.log);
            }
            tracing::debug!(created, "intersected surfaces");
        }

        if self.options.match_surfaces {
            // intersection adds surfaces, so boxes are recomputed
            let mut matched = 0;
            for spaces in &stories {
                matched += match_surfaces(&mut self.model, spaces);
            }
            for (a, b) in cross_story_pairs(&self.model, &stories) {
                matched += match_space_pair(&mut self.model, a, b);
            }
            tracing::debug!(matched, "matched surfaces");
        }
    }
}

/// Spaces grouped by story, spaces without a story forming one group.
fn story_groups(model: &Model) -> Vec<Vec<ObjectKey>> {
    let mut groups: Vec<(Option<ObjectKey>, Vec<ObjectKey>)> = Vec::new();
    for space in model.objects_of_type(ObjectType::Space) {
        let story = model.get::<Space>(space).and_then(|s| s.building_story);
        match groups.iter_mut().find(|(s, _)| *s == story) {
            Some((_, spaces)) => spaces.push(space),
            None => groups.push((story, vec![space])),
        }
    }
    groups.into_iter().map(|(_, spaces)| spaces).collect()
}

/// Space pairs from different stories whose boxes touch.
fn cross_story_pairs(model: &Model, stories: &[Vec<ObjectKey>]) -> Vec<(ObjectKey, ObjectKey)> {
    let boxes: Vec<Vec<BoundingBox>> = stories
        .iter()
        .map(|spaces| {
            spaces
                .iter()
                .map(|&s| space_bounding_box(model, s).unwrap_or_default())
                .collect()
        })
        .collect();
    let story_box = |i: usize| {
        let mut result = BoundingBox::new();
        for b in &boxes[i] {
            result.add(b);
        }
        result
    };

    let mut pairs = Vec::new();
    for i in 0..stories.len() {
        for j in (i + 1)..stories.len() {
            if !story_box(i).intersects(&story_box(j), MATCH_TOLERANCE) {
                continue;
            }
            for (a, box_a) in stories[i].iter().zip(&boxes[i]) {
                for (b, box_b) in stories[j].iter().zip(&boxes[j]) {
                    if box_a.intersects(box_b, MATCH_TOLERANCE) {
                        pairs.push((*a, *b));
                    }
                }
            }
        }
    }
    pairs
}
