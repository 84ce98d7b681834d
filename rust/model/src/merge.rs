// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging one building graph into another.
//!
//! [`ModelMerger::suggest_handle_mapping`] pairs objects of the current graph
//! with objects of the new graph by handle, then by the `CADObjectId`
//! feature, then by name. [`ModelMerger::merge_models`] drops current objects
//! that have no partner and copies the new graph into the current one field
//! by field, creating objects on demand.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::features::CAD_OBJECT_ID;
use crate::handle::Handle;
use crate::keys::{ObjectKey, ObjectType};
use crate::log::{LogMessage, LogSink};
use crate::mapping::HandleMapping;
use crate::model::Model;
use crate::objects::{
    BoundaryCondition, Building, BuildingStory, BuildingUnit, Construction, DaylightingControl,
    DefaultConstructionSet, ObjectData, ShadingSurface, ShadingSurfaceGroup, Site, Space,
    SpaceType, SubSurface, Surface, ThermalZone,
};

/// Object types the merger pairs up and copies, in processing order.
pub const MERGED_TYPES: [ObjectType; 9] = [
    ObjectType::Site,
    ObjectType::Building,
    ObjectType::Space,
    ObjectType::ShadingSurfaceGroup,
    ObjectType::ThermalZone,
    ObjectType::SpaceType,
    ObjectType::BuildingStory,
    ObjectType::BuildingUnit,
    ObjectType::DefaultConstructionSet,
];

/// Merges a new building graph into a current one.
///
/// A merger is single-use per call but may be reused; every call to
/// [`merge_models`](Self::merge_models) resets its log and bookkeeping.
#[derive(Debug)]
pub struct ModelMerger {
    log: LogSink,
    /// current -> new
    mapping: HandleMapping,
    /// New-graph handles already copied.
    merged: FxHashSet<Handle>,
}

impl Default for ModelMerger {
    fn default() -> Self {
        Self::new()
    }
}

struct Lookup {
    handles: FxHashSet<Handle>,
    by_cad_id: FxHashMap<String, Handle>,
    by_name: FxHashMap<String, Handle>,
    only: Option<Handle>,
}

impl Lookup {
    fn build(model: &Model, ty: ObjectType) -> Self {
        let keys = model.objects_of_type(ty);
        let mut lookup = Lookup {
            handles: FxHashSet::default(),
            by_cad_id: FxHashMap::default(),
            by_name: FxHashMap::default(),
            only: None,
        };
        for &key in &keys {
            let Some(object) = model.object(key) else {
                continue;
            };
            let handle = object.handle();
            lookup.handles.insert(handle);
            if let Ok(cad_id) = object.features.get_string(CAD_OBJECT_ID) {
                lookup.by_cad_id.entry(cad_id.to_string()).or_insert(handle);
            }
            lookup.by_name.entry(object.name().to_string()).or_insert(handle);
        }
        if keys.len() == 1 {
            lookup.only = keys.first().and_then(|&k| model.handle(k));
        }
        lookup
    }
}

impl ModelMerger {
    pub fn new() -> Self {
        Self {
            log: LogSink::new("bem_lite.model.ModelMerger"),
            mapping: HandleMapping::new(),
            merged: FxHashSet::default(),
        }
    }

    /// Pairs current objects with new objects of the same type.
    ///
    /// For each new object the first applicable rule wins: same handle,
    /// the only Site or Building, same `CADObjectId`, same name. Each
    /// current object is paired at most once. The result maps current
    /// handles to new handles.
    pub fn suggest_handle_mapping(&self, current: &Model, new: &Model) -> HandleMapping {
        let mut result = HandleMapping::new();
        for ty in MERGED_TYPES {
            let lookup = Lookup::build(current, ty);
            for key in new.objects_of_type(ty) {
                let Some(object) = new.object(key) else {
                    continue;
                };
                let handle = object.handle();

                let mut candidates = Vec::with_capacity(4);
                if lookup.handles.contains(&handle) {
                    candidates.push(handle);
                }
                if ty.is_unique() {
                    candidates.extend(lookup.only);
                }
                if let Ok(cad_id) = object.features.get_string(CAD_OBJECT_ID) {
                    candidates.extend(lookup.by_cad_id.get(cad_id).copied());
                }
                candidates.extend(lookup.by_name.get(object.name()).copied());

                if let Some(current_handle) = candidates.into_iter().find(|&c| result.insert(c, handle)) {
                    tracing::debug!(
                        object_type = %ty,
                        current = %current_handle,
                        new = %handle,
                        "paired objects"
                    );
                }
            }
        }
        result
    }

    /// Merges `new` into `current` using `mapping` (current -> new).
    ///
    /// Current objects of non-unique merged types that are not in the
    /// mapping are removed first. Then every new object of a merged type is
    /// found in, or created in, `current` and copied over.
    pub fn merge_models(&mut self, current: &mut Model, new: &Model, mapping: &HandleMapping) {
        self.log.reset();
        self.merged.clear();
        self.mapping = mapping.clone();

        for ty in MERGED_TYPES {
            if ty.is_unique() {
                continue;
            }
            for key in current.objects_of_type(ty) {
                let Some(handle) = current.handle(key) else {
                    // removed with its parent
                    continue;
                };
                if !self.mapping.contains(&handle) {
                    current.remove(key);
                }
            }
        }

        for ty in MERGED_TYPES {
            for key in new.objects_of_type(ty) {
                // space shading is merged with its space
                if new.get::<ShadingSurfaceGroup>(key).is_some_and(|g| g.space.is_some()) {
                    continue;
                }
                self.current_object(current, new, key);
            }
        }

        tracing::info!(
            objects = self.mapping.len(),
            warnings = self.log.warnings().len(),
            errors = self.log.errors().len(),
            "merged models"
        );
    }

    /// The current -> new mapping after the last merge.
    pub fn handle_mapping(&self) -> &HandleMapping {
        &self.mapping
    }

    pub fn new_model_handle(&self, current: &Handle) -> Option<Handle> {
        self.mapping.get(current)
    }

    pub fn current_model_handle(&self, new: &Handle) -> Option<Handle> {
        self.mapping.get_reverse(new)
    }

    pub fn warnings(&self) -> Vec<LogMessage> {
        self.log.warnings()
    }

    pub fn errors(&self) -> Vec<LogMessage> {
        self.log.errors()
    }

    /// Current-graph key already paired with `new_key`, if any.
    fn mapped_key(&self, current: &Model, new: &Model, new_key: ObjectKey) -> Option<ObjectKey> {
        let ty = new.object_type(new_key)?;
        let handle = self.mapping.get_reverse(&new.handle(new_key)?)?;
        current
            .key_of(&handle)
            .filter(|&k| current.object_type(k) == Some(ty))
    }

    fn record(&mut self, current: &Model, current_key: ObjectKey, new: &Model, new_key: ObjectKey) {
        if let (Some(c), Some(n)) = (current.handle(current_key), new.handle(new_key)) {
            self.mapping.replace(c, n);
            self.merged.insert(n);
        }
    }

    /// Finds or creates the current counterpart of `new_key` and merges it.
    fn current_object(&mut self, current: &mut Model, new: &Model, new_key: ObjectKey) -> Option<ObjectKey> {
        let object = new.object(new_key)?;
        let ty = object.object_type();
        let handle = object.handle();

        let current_key = match self.mapped_key(current, new, new_key) {
            Some(key) => key,
            None => {
                if let Some(stale) = self.mapping.get_reverse(&handle) {
                    self.log.error(format!(
                        "could not find object in current model for handle {stale} of type {ty}"
                    ));
                }
                let key = match ty {
                    ObjectType::Site => current.get_unique_site(),
                    ObjectType::Building => current.get_unique_building(),
                    _ => match blank(ty) {
                        Some(data) => insert_with_handle(current, handle, object.name(), data),
                        None => {
                            self.log.error(format!("no constructor registered for {ty}"));
                            return None;
                        }
                    },
                };
                if let Some(c) = current.handle(key) {
                    self.mapping.replace(c, handle);
                }
                key
            }
        };

        if self.merged.insert(handle) {
            if let Some(name) = new.name(new_key) {
                if let Err(err) = current.set_name(current_key, name) {
                    self.log.error(format!("could not rename {ty}: {err}"));
                }
            }
            match ty {
                ObjectType::Site => self.merge_site(current, current_key, new, new_key),
                ObjectType::Building => self.merge_building(current, current_key, new, new_key),
                ObjectType::Space => self.merge_space(current, current_key, new, new_key),
                ObjectType::ShadingSurfaceGroup => {
                    self.merge_shading_surface_group(current, current_key, new, new_key)
                }
                ObjectType::ThermalZone => self.merge_thermal_zone(current, current_key, new, new_key),
                ObjectType::SpaceType => self.merge_space_type(current, current_key, new, new_key),
                ObjectType::BuildingStory => self.merge_building_story(current, current_key, new, new_key),
                ObjectType::BuildingUnit => self.merge_building_unit(current, current_key, new, new_key),
                ObjectType::DefaultConstructionSet => {}
                other => self.log.error(format!("no merge function registered for {other}")),
            }
        }
        Some(current_key)
    }

    fn current_object_opt(
        &mut self,
        current: &mut Model,
        new: &Model,
        new_key: Option<ObjectKey>,
    ) -> Option<ObjectKey> {
        new_key.and_then(|k| self.current_object(current, new, k))
    }

    fn merge_site(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(dst)) = (new.get::<Site>(nk), current.get_mut::<Site>(ck)) else {
            return;
        };
        // unset fields in the new object keep the current value
        dst.latitude = src.latitude.or(dst.latitude);
        dst.longitude = src.longitude.or(dst.longitude);
        dst.elevation = src.elevation.or(dst.elevation);
        dst.time_zone = src.time_zone.or(dst.time_zone);
    }

    fn merge_building(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let Some(src) = new.get::<Building>(nk) else {
            return;
        };
        let construction_set = self.current_object_opt(current, new, src.default_construction_set);
        let space_type = self.current_object_opt(current, new, src.space_type);
        let Some(dst) = current.get_mut::<Building>(ck) else {
            return;
        };
        // unset fields keep the current value, as for the site
        dst.north_axis = src.north_axis.or(dst.north_axis);
        dst.nominal_floor_to_floor_height = src
            .nominal_floor_to_floor_height
            .or(dst.nominal_floor_to_floor_height);
        dst.nominal_floor_to_ceiling_height = src
            .nominal_floor_to_ceiling_height
            .or(dst.nominal_floor_to_ceiling_height);
        dst.default_construction_set = construction_set;
        dst.space_type = space_type;
    }

    fn merge_space(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let Some(src) = new.get::<Space>(nk) else {
            return;
        };
        if let Some(dst) = current.get_mut::<Space>(ck) {
            dst.frame.copy_fields_from(&src.frame);
        }

        for surface in current.surfaces(ck) {
            current.remove(surface);
        }
        for group in current.shading_surface_groups(ck) {
            current.remove(group);
        }

        for surface in new.surfaces(nk) {
            self.clone_surface(current, ck, new, surface);
        }

        for group in new.shading_surface_groups(nk) {
            if new.handle(group).is_some_and(|h| self.merged.contains(&h)) {
                continue;
            }
            self.clone_space_shading_group(current, ck, new, group);
        }

        let thermal_zone = self.current_object_opt(current, new, src.thermal_zone);
        let space_type = self.current_object_opt(current, new, src.space_type);
        let building_story = self.current_object_opt(current, new, src.building_story);
        let building_unit = self.current_object_opt(current, new, src.building_unit);
        let construction_set = self.current_object_opt(current, new, src.default_construction_set);
        if let Some(dst) = current.get_mut::<Space>(ck) {
            dst.thermal_zone = thermal_zone;
            dst.space_type = space_type;
            dst.building_story = building_story;
            dst.building_unit = building_unit;
            dst.default_construction_set = construction_set;
        }

        for control in current.daylighting_controls(ck) {
            current.remove(control);
        }
        for control in new.daylighting_controls(nk) {
            self.clone_daylighting_control(current, ck, new, control);
        }
    }

    fn clone_surface(&mut self, current: &mut Model, space: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(object)) = (new.get::<Surface>(nk), new.object(nk)) else {
            return;
        };
        let construction = self.current_construction(current, new, src.construction);
        let data = Surface {
            space: Some(space),
            vertices: src.vertices.clone(),
            surface_type: src.surface_type,
            construction,
            outside_boundary_condition: src.outside_boundary_condition,
            adjacent_surface: None,
            sun_exposed: src.sun_exposed,
            wind_exposed: src.wind_exposed,
        };
        let clone = insert_with_handle(current, object.handle(), object.name(), data.into());
        copy_features(current, clone, new, nk);
        self.record(current, clone, new, nk);

        if src.outside_boundary_condition == BoundaryCondition::Surface {
            if let Err(err) = current.assign_default_boundary_condition(clone) {
                self.log.warn(format!("surface '{}': {err}", object.name()));
            }
        }
        if let Some(partner) = src.adjacent_surface.and_then(|a| self.mapped_key(current, new, a)) {
            if let Err(err) = current.set_adjacent_surface(clone, partner) {
                self.log.warn(format!("surface '{}': {err}", object.name()));
            }
        }

        for sub_surface in new.sub_surfaces(nk) {
            self.clone_sub_surface(current, clone, new, sub_surface);
        }
    }

    fn clone_sub_surface(&mut self, current: &mut Model, surface: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(object)) = (new.get::<SubSurface>(nk), new.object(nk)) else {
            return;
        };
        let construction = self.current_construction(current, new, src.construction);
        let data = SubSurface {
            surface: Some(surface),
            vertices: src.vertices.clone(),
            sub_surface_type: src.sub_surface_type,
            construction,
            adjacent_sub_surface: None,
        };
        let clone = insert_with_handle(current, object.handle(), object.name(), data.into());
        copy_features(current, clone, new, nk);
        self.record(current, clone, new, nk);

        if let Some(partner) = src
            .adjacent_sub_surface
            .and_then(|a| self.mapped_key(current, new, a))
        {
            if let Err(err) = current.set_adjacent_sub_surface(clone, partner) {
                self.log.warn(format!("sub-surface '{}': {err}", object.name()));
            }
        }
    }

    fn clone_space_shading_group(&mut self, current: &mut Model, space: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(object)) = (new.get::<ShadingSurfaceGroup>(nk), new.object(nk)) else {
            return;
        };
        let data = ShadingSurfaceGroup {
            frame: src.frame.clone(),
            shading_type: src.shading_type,
            space: Some(space),
            shaded_surface: src.shaded_surface.and_then(|s| self.mapped_key(current, new, s)),
            shaded_sub_surface: src
                .shaded_sub_surface
                .and_then(|s| self.mapped_key(current, new, s)),
        };
        let clone = insert_with_handle(current, object.handle(), object.name(), data.into());
        copy_features(current, clone, new, nk);
        self.record(current, clone, new, nk);
        self.clone_shading_surfaces(current, clone, new, nk);
    }

    fn clone_shading_surfaces(&mut self, current: &mut Model, group: ObjectKey, new: &Model, new_group: ObjectKey) {
        for nk in new.shading_surfaces(new_group) {
            let (Some(src), Some(object)) = (new.get::<ShadingSurface>(nk), new.object(nk)) else {
                continue;
            };
            let construction = self.current_construction(current, new, src.construction);
            let data = ShadingSurface {
                group: Some(group),
                vertices: src.vertices.clone(),
                construction,
            };
            let clone = insert_with_handle(current, object.handle(), object.name(), data.into());
            copy_features(current, clone, new, nk);
            self.record(current, clone, new, nk);
        }
    }

    fn clone_daylighting_control(&mut self, current: &mut Model, space: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(object)) = (new.get::<DaylightingControl>(nk), new.object(nk)) else {
            return;
        };
        let data = DaylightingControl {
            space: Some(space),
            position: src.position,
            illuminance_setpoint: src.illuminance_setpoint,
        };
        let clone = insert_with_handle(current, object.handle(), object.name(), data.into());
        self.record(current, clone, new, nk);

        for zone in new.keys_of::<ThermalZone>() {
            let Some(new_zone) = new.get::<ThermalZone>(zone) else {
                continue;
            };
            let primary = new_zone.primary_daylighting_control == Some(nk);
            let secondary = new_zone.secondary_daylighting_control == Some(nk);
            if !primary && !secondary {
                continue;
            }
            let Some(current_zone) = self.current_object(current, new, zone) else {
                continue;
            };
            if let Some(dst) = current.get_mut::<ThermalZone>(current_zone) {
                if primary {
                    dst.primary_daylighting_control = Some(clone);
                    dst.fraction_controlled_by_primary = new_zone.fraction_controlled_by_primary;
                } else {
                    dst.secondary_daylighting_control = Some(clone);
                    dst.fraction_controlled_by_secondary = new_zone.fraction_controlled_by_secondary;
                }
            }
        }
    }

    fn merge_shading_surface_group(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let Some(src) = new.get::<ShadingSurfaceGroup>(nk) else {
            return;
        };
        if let Some(dst) = current.get_mut::<ShadingSurfaceGroup>(ck) {
            dst.frame.copy_fields_from(&src.frame);
            dst.shading_type = src.shading_type;
        }
        for surface in current.shading_surfaces(ck) {
            current.remove(surface);
        }
        self.clone_shading_surfaces(current, ck, new, nk);
    }

    fn merge_thermal_zone(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(dst)) = (new.get::<ThermalZone>(nk), current.get_mut::<ThermalZone>(ck)) else {
            return;
        };
        // unset fields keep the current value instead of being reset
        dst.rendering_color = src.rendering_color.or(dst.rendering_color);
        dst.multiplier = src.multiplier.or(dst.multiplier);
        dst.ceiling_height = src.ceiling_height.or(dst.ceiling_height);
        dst.volume = src.volume.or(dst.volume);
    }

    fn merge_space_type(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let Some(src) = new.get::<SpaceType>(nk) else {
            return;
        };
        let construction_set = self.current_object_opt(current, new, src.default_construction_set);
        let Some(dst) = current.get_mut::<SpaceType>(ck) else {
            return;
        };
        // unset fields keep the current value instead of being reset
        if src.default_construction_set.is_some() {
            dst.default_construction_set = construction_set;
        }
        dst.rendering_color = src.rendering_color.or(dst.rendering_color);
        if src.standards_building_type.is_some() {
            dst.standards_building_type = src.standards_building_type.clone();
        }
        if src.standards_space_type.is_some() {
            dst.standards_space_type = src.standards_space_type.clone();
        }
    }

    fn merge_building_story(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let Some(src) = new.get::<BuildingStory>(nk) else {
            return;
        };
        let construction_set = self.current_object_opt(current, new, src.default_construction_set);
        let Some(dst) = current.get_mut::<BuildingStory>(ck) else {
            return;
        };
        dst.rendering_color = src.rendering_color.or(dst.rendering_color);
        dst.nominal_z_coordinate = src.nominal_z_coordinate;
        dst.nominal_floor_to_floor_height = src.nominal_floor_to_floor_height;
        dst.nominal_floor_to_ceiling_height = src.nominal_floor_to_ceiling_height;
        if src.default_construction_set.is_some() {
            dst.default_construction_set = construction_set;
        }
    }

    fn merge_building_unit(&mut self, current: &mut Model, ck: ObjectKey, new: &Model, nk: ObjectKey) {
        let (Some(src), Some(dst)) = (new.get::<BuildingUnit>(nk), current.get_mut::<BuildingUnit>(ck)) else {
            return;
        };
        // an unset color keeps the current one
        dst.rendering_color = src.rendering_color.or(dst.rendering_color);
    }

    /// Construction in `current` standing for `new_construction`: same
    /// handle, then same name, otherwise a copy.
    fn current_construction(
        &mut self,
        current: &mut Model,
        new: &Model,
        new_construction: Option<ObjectKey>,
    ) -> Option<ObjectKey> {
        let nk = new_construction?;
        let object = new.object(nk)?;
        let src = new.get::<Construction>(nk)?;

        let existing = self.mapped_key(current, new, nk).or_else(|| {
            current
                .key_of(&object.handle())
                .filter(|&k| current.object_type(k) == Some(ObjectType::Construction))
                .or_else(|| current.find_by_name(ObjectType::Construction, object.name()))
        });
        let key = existing.unwrap_or_else(|| {
            let key = insert_with_handle(current, object.handle(), object.name(), src.clone().into());
            copy_features(current, key, new, nk);
            key
        });
        if let Some(c) = current.handle(key) {
            self.mapping.replace(c, object.handle());
        }
        Some(key)
    }
}

/// Empty data for a merged type that is created on demand.
fn blank(ty: ObjectType) -> Option<ObjectData> {
    Some(match ty {
        ObjectType::Space => Space::default().into(),
        ObjectType::ShadingSurfaceGroup => ShadingSurfaceGroup::default().into(),
        ObjectType::ThermalZone => ThermalZone::default().into(),
        ObjectType::SpaceType => SpaceType::default().into(),
        ObjectType::BuildingStory => BuildingStory::default().into(),
        ObjectType::BuildingUnit => BuildingUnit::default().into(),
        ObjectType::DefaultConstructionSet => DefaultConstructionSet::default().into(),
        _ => return None,
    })
}

/// Adds `data` under `handle` if that handle is free, otherwise under a
/// fresh one.
fn insert_with_handle(model: &mut Model, handle: Handle, name: &str, data: ObjectData) -> ObjectKey {
    if model.key_of(&handle).is_none() {
        if let Ok(key) = model.add_with_handle(handle, name, data.clone()) {
            return key;
        }
    }
    model.add_data(name, data)
}

fn copy_features(current: &mut Model, key: ObjectKey, new: &Model, nk: ObjectKey) {
    if let (Some(features), Some(target)) = (new.features(nk), current.features_mut(key)) {
        *target = features.clone();
    }
}
