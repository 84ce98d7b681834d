// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the building object graph.
//!
//! The [`Model`] owns every object in one slot map with stable,
//! generational keys, plus a handle index. Insertion order is tracked with a
//! sequence number so type queries and name lookups are deterministic.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::features::FeatureBag;
use crate::handle::Handle;
use crate::keys::{ObjectKey, ObjectType};
use crate::objects::{
    Building, DaylightingControl, InteriorPartitionSurface, InteriorPartitionSurfaceGroup,
    ObjectData, ShadingSurface, ShadingSurfaceGroup, Site, SubSurface, Surface, TypedObject,
};

/// One object in the graph: identity, name, features and typed data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelObject {
    handle: Handle,
    name: String,
    seq: u64,
    pub features: FeatureBag,
    pub data: ObjectData,
}

impl ModelObject {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> ObjectType {
        self.data.object_type()
    }

    /// Insertion sequence number; later objects have larger numbers.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// The object graph.
///
/// # Example
///
/// ```
/// use bem_lite_model::{Model, ObjectType, Space, ThermalZone};
///
/// let mut model = Model::new();
/// let zone = model.add("Zone 1", ThermalZone::default());
/// let space = model.add("Space 1", Space { thermal_zone: Some(zone), ..Default::default() });
///
/// assert_eq!(model.objects_of_type(ObjectType::Space), vec![space]);
/// assert_eq!(model.get::<Space>(space).unwrap().thermal_zone, Some(zone));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    objects: SlotMap<ObjectKey, ModelObject>,
    next_seq: u64,
    #[serde(skip)]
    by_handle: FxHashMap<Handle, ObjectKey>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    // --- Insertion ---

    /// Adds an object with a fresh handle.
    pub fn add<T: TypedObject>(&mut self, name: impl Into<String>, data: T) -> ObjectKey {
        self.insert(Handle::new(), name.into(), data.into())
    }

    /// Adds an object with a caller-chosen handle.
    pub fn add_with_handle(
        &mut self,
        handle: Handle,
        name: impl Into<String>,
        data: ObjectData,
    ) -> Result<ObjectKey> {
        if self.by_handle.contains_key(&handle) {
            return Err(Error::DuplicateHandle(handle));
        }
        Ok(self.insert(handle, name.into(), data))
    }

    /// Adds untyped data with a fresh handle.
    pub fn add_data(&mut self, name: impl Into<String>, data: ObjectData) -> ObjectKey {
        self.insert(Handle::new(), name.into(), data)
    }

    fn insert(&mut self, handle: Handle, name: String, data: ObjectData) -> ObjectKey {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = self.objects.insert(ModelObject {
            handle,
            name,
            seq,
            features: FeatureBag::new(),
            data,
        });
        self.by_handle.insert(handle, key);
        key
    }

    // --- Access ---

    pub fn object(&self, key: ObjectKey) -> Option<&ModelObject> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut ModelObject> {
        self.objects.get_mut(key)
    }

    pub fn get<T: TypedObject>(&self, key: ObjectKey) -> Option<&T> {
        self.objects.get(key).and_then(|o| T::from_data(&o.data))
    }

    pub fn get_mut<T: TypedObject>(&mut self, key: ObjectKey) -> Option<&mut T> {
        self.objects.get_mut(key).and_then(|o| T::from_data_mut(&mut o.data))
    }

    /// Like [`get`](Self::get), but says why the lookup failed.
    pub fn try_get<T: TypedObject>(&self, key: ObjectKey) -> Result<&T> {
        let object = self.objects.get(key).ok_or(Error::KeyNotFound(key))?;
        T::from_data(&object.data).ok_or(Error::WrongType {
            expected: T::TYPE.as_str(),
            found: object.object_type(),
        })
    }

    pub fn try_get_mut<T: TypedObject>(&mut self, key: ObjectKey) -> Result<&mut T> {
        let object = self.objects.get_mut(key).ok_or(Error::KeyNotFound(key))?;
        let found = object.object_type();
        T::from_data_mut(&mut object.data).ok_or(Error::WrongType {
            expected: T::TYPE.as_str(),
            found,
        })
    }

    pub fn key_of(&self, handle: &Handle) -> Option<ObjectKey> {
        self.by_handle.get(handle).copied()
    }

    /// Key for `handle`, or `NotFound`.
    pub fn lookup(&self, handle: &Handle) -> Result<ObjectKey> {
        self.key_of(handle).ok_or(Error::NotFound(*handle))
    }

    pub fn handle(&self, key: ObjectKey) -> Option<Handle> {
        self.objects.get(key).map(|o| o.handle)
    }

    pub fn name(&self, key: ObjectKey) -> Option<&str> {
        self.objects.get(key).map(|o| o.name.as_str())
    }

    pub fn set_name(&mut self, key: ObjectKey, name: impl Into<String>) -> Result<()> {
        let object = self.objects.get_mut(key).ok_or(Error::KeyNotFound(key))?;
        object.name = name.into();
        Ok(())
    }

    pub fn object_type(&self, key: ObjectKey) -> Option<ObjectType> {
        self.objects.get(key).map(ModelObject::object_type)
    }

    pub fn features(&self, key: ObjectKey) -> Option<&FeatureBag> {
        self.objects.get(key).map(|o| &o.features)
    }

    pub fn features_mut(&mut self, key: ObjectKey) -> Option<&mut FeatureBag> {
        self.objects.get_mut(key).map(|o| &mut o.features)
    }

    // --- Queries ---

    /// All objects of `ty` in insertion order.
    pub fn objects_of_type(&self, ty: ObjectType) -> Vec<ObjectKey> {
        self.sorted_keys(|o| o.object_type() == ty)
    }

    /// All objects of type `T` in insertion order.
    pub fn keys_of<T: TypedObject>(&self) -> Vec<ObjectKey> {
        self.objects_of_type(T::TYPE)
    }

    fn sorted_keys(&self, filter: impl Fn(&ModelObject) -> bool) -> Vec<ObjectKey> {
        let mut keys: Vec<(u64, ObjectKey)> = self
            .objects
            .iter()
            .filter(|(_, o)| filter(o))
            .map(|(k, o)| (o.seq, k))
            .collect();
        keys.sort_unstable_by_key(|(seq, _)| *seq);
        keys.into_iter().map(|(_, k)| k).collect()
    }

    /// First object of `ty` named `name`, in insertion order.
    pub fn find_by_name(&self, ty: ObjectType, name: &str) -> Option<ObjectKey> {
        self.objects
            .iter()
            .filter(|(_, o)| o.object_type() == ty && o.name == name)
            .min_by_key(|(_, o)| o.seq)
            .map(|(k, _)| k)
    }

    /// `base` followed by the smallest " N" suffix not yet used by an object of `ty`.
    pub fn unique_name(&self, ty: ObjectType, base: &str) -> String {
        let taken: rustc_hash::FxHashSet<&str> = self
            .objects
            .values()
            .filter(|o| o.object_type() == ty)
            .map(|o| o.name.as_str())
            .collect();
        (1..)
            .map(|i| format!("{base} {i}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| base.to_string())
    }

    /// Direct children in the containment tree, in insertion order.
    pub fn children(&self, parent: ObjectKey) -> Vec<ObjectKey> {
        self.sorted_keys(|o| o.data.parent() == Some(parent))
    }

    fn children_of<T: TypedObject>(&self, parent: ObjectKey) -> Vec<ObjectKey> {
        self.sorted_keys(|o| o.data.parent() == Some(parent) && o.object_type() == T::TYPE)
    }

    pub fn surfaces(&self, space: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<Surface>(space)
    }

    pub fn sub_surfaces(&self, surface: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<SubSurface>(surface)
    }

    pub fn shading_surface_groups(&self, space: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<ShadingSurfaceGroup>(space)
    }

    pub fn interior_partition_surface_groups(&self, space: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<InteriorPartitionSurfaceGroup>(space)
    }

    pub fn shading_surfaces(&self, group: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<ShadingSurface>(group)
    }

    pub fn interior_partition_surfaces(&self, group: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<InteriorPartitionSurface>(group)
    }

    pub fn daylighting_controls(&self, space: ObjectKey) -> Vec<ObjectKey> {
        self.children_of::<DaylightingControl>(space)
    }

    /// Spaces whose `field` points at `target`, e.g. all spaces of a story.
    pub fn spaces_where(
        &self,
        target: ObjectKey,
        field: impl Fn(&crate::objects::Space) -> Option<ObjectKey>,
    ) -> Vec<ObjectKey> {
        self.sorted_keys(|o| match &o.data {
            ObjectData::Space(space) => field(space) == Some(target),
            _ => false,
        })
    }

    /// Space owning a planar object or group, following parents upward.
    pub fn space_of(&self, key: ObjectKey) -> Option<ObjectKey> {
        let mut current = key;
        loop {
            let object = self.objects.get(current)?;
            if object.object_type() == ObjectType::Space {
                return Some(current);
            }
            current = object.data.parent()?;
        }
    }

    // --- Unique objects ---

    pub fn unique_site(&self) -> Option<ObjectKey> {
        self.objects_of_type(ObjectType::Site).first().copied()
    }

    /// The site, created if missing.
    pub fn get_unique_site(&mut self) -> ObjectKey {
        match self.unique_site() {
            Some(key) => key,
            None => self.add("Site", Site::default()),
        }
    }

    pub fn unique_building(&self) -> Option<ObjectKey> {
        self.objects_of_type(ObjectType::Building).first().copied()
    }

    /// The building, created if missing.
    pub fn get_unique_building(&mut self) -> ObjectKey {
        match self.unique_building() {
            Some(key) => key,
            None => self.add("Building", Building::default()),
        }
    }

    // --- Removal ---

    /// Removes `key` and everything it contains, clearing references to the
    /// removed objects elsewhere. Returns the removed handles, or `None` if
    /// `key` was not live.
    pub fn remove(&mut self, key: ObjectKey) -> Option<Vec<Handle>> {
        if !self.objects.contains_key(key) {
            return None;
        }

        let mut doomed = vec![key];
        let mut i = 0;
        while i < doomed.len() {
            let children = self.children(doomed[i]);
            doomed.extend(children);
            i += 1;
        }
        let doomed_set: FxHashSet<ObjectKey> = doomed.iter().copied().collect();

        // surfaces losing their adjacent surface fall back to defaults
        let orphaned: Vec<ObjectKey> = self
            .objects
            .iter()
            .filter(|(k, o)| {
                !doomed_set.contains(k)
                    && matches!(&o.data, ObjectData::Surface(s)
                        if s.adjacent_surface.is_some_and(|a| doomed_set.contains(&a)))
            })
            .map(|(k, _)| k)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for k in &doomed {
            if let Some(object) = self.objects.remove(*k) {
                self.by_handle.remove(&object.handle);
                removed.push(object.handle);
            }
        }

        for (_, object) in self.objects.iter_mut() {
            for k in &doomed {
                object.data.clear_reference(*k);
            }
        }

        for surface in orphaned {
            // the surface is live, so only a malformed chain can fail here
            if let Err(err) = self.assign_default_boundary_condition(surface) {
                tracing::debug!(error = %err, "could not reassign boundary condition");
            }
        }

        tracing::debug!(count = removed.len(), "removed objects");
        Some(removed)
    }

    // --- Serialization ---

    /// Serializes the whole graph as a JSON snapshot.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restores a graph written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self> {
        let mut model: Model = serde_json::from_str(json)?;
        model.rebuild_index()?;
        Ok(model)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        self.by_handle.clear();
        for (key, object) in &self.objects {
            if self.by_handle.insert(object.handle, key).is_some() {
                return Err(Error::DuplicateHandle(object.handle));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{BuildingStory, Space, SurfaceType, ThermalZone};
    use bem_lite_geometry::Point3;

    fn square(z: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(0.0, 1.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(1.0, 0.0, z),
        ]
    }

    #[test]
    fn add_and_query_in_insertion_order() {
        let mut model = Model::new();
        let b = model.add("B", ThermalZone::default());
        let a = model.add("A", ThermalZone::default());
        let story = model.add("L1", BuildingStory::default());

        assert_eq!(model.len(), 3);
        assert_eq!(model.objects_of_type(ObjectType::ThermalZone), vec![b, a]);
        assert_eq!(model.keys_of::<BuildingStory>(), vec![story]);
        assert_eq!(model.find_by_name(ObjectType::ThermalZone, "A"), Some(a));
        assert_eq!(model.find_by_name(ObjectType::BuildingStory, "A"), None);

        let handle = model.handle(a).unwrap();
        assert_eq!(model.key_of(&handle), Some(a));
        assert!(matches!(model.lookup(&Handle::new()), Err(Error::NotFound(_))));
    }

    #[test]
    fn duplicate_names_resolve_to_the_first() {
        let mut model = Model::new();
        let first = model.add("Zone", ThermalZone::default());
        model.add("Zone", ThermalZone::default());
        assert_eq!(model.find_by_name(ObjectType::ThermalZone, "Zone"), Some(first));
    }

    #[test]
    fn typed_access_reports_wrong_type() {
        let mut model = Model::new();
        let zone = model.add("Zone", ThermalZone::default());
        assert!(model.get::<Space>(zone).is_none());
        match model.try_get::<Space>(zone) {
            Err(Error::WrongType { expected, found }) => {
                assert_eq!(expected, "Space");
                assert_eq!(found, ObjectType::ThermalZone);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_handles_are_rejected() {
        let mut model = Model::new();
        let handle = Handle::new();
        model
            .add_with_handle(handle, "Zone", ThermalZone::default().into())
            .unwrap();
        assert!(matches!(
            model.add_with_handle(handle, "Zone 2", ThermalZone::default().into()),
            Err(Error::DuplicateHandle(_))
        ));
    }

    #[test]
    fn unique_objects_are_created_once() {
        let mut model = Model::new();
        assert!(model.unique_building().is_none());
        let building = model.get_unique_building();
        assert_eq!(model.get_unique_building(), building);
        let site = model.get_unique_site();
        assert_eq!(model.unique_site(), Some(site));
    }

    #[test]
    fn remove_cascades_and_clears_references() {
        let mut model = Model::new();
        let zone = model.add("Zone", ThermalZone::default());
        let space = model.add(
            "Space",
            Space {
                thermal_zone: Some(zone),
                ..Default::default()
            },
        );
        let floor = model.add_surface("Floor", space, square(0.0), None).unwrap();
        let window = model
            .add_sub_surface("Window", floor, square(0.0), None)
            .unwrap();
        let control = model.add(
            "Sensor",
            DaylightingControl {
                space: Some(space),
                ..Default::default()
            },
        );
        model.get_mut::<ThermalZone>(zone).unwrap().primary_daylighting_control = Some(control);

        let removed = model.remove(space).unwrap();
        assert_eq!(removed.len(), 4);
        for key in [space, floor, window, control] {
            assert!(!model.contains(key));
        }
        assert!(model.surfaces(space).is_empty());
        assert_eq!(
            model.get::<ThermalZone>(zone).unwrap().primary_daylighting_control,
            None
        );
        assert!(model.remove(space).is_none());
    }

    #[test]
    fn removing_one_side_resets_the_other() {
        let mut model = Model::new();
        let a = model.add("A", Space::default());
        let b = model.add("B", Space::default());
        let ceiling = {
            let mut v = square(3.0);
            v.reverse();
            model.add_surface("Ceiling", a, v, None).unwrap()
        };
        let floor = model.add_surface("Floor", b, square(3.0), None).unwrap();
        model.set_adjacent_surface(ceiling, floor).unwrap();

        model.remove(b);
        let ceiling = model.get::<Surface>(ceiling).unwrap();
        assert_eq!(ceiling.surface_type, SurfaceType::RoofCeiling);
        assert_eq!(ceiling.adjacent_surface, None);
        assert_eq!(
            ceiling.outside_boundary_condition,
            crate::objects::BoundaryCondition::Outdoors
        );
    }

    #[test]
    fn json_snapshot_round_trip() {
        let mut model = Model::new();
        let zone = model.add("Zone", ThermalZone::default());
        let space = model.add(
            "Space",
            Space {
                thermal_zone: Some(zone),
                ..Default::default()
            },
        );
        model
            .features_mut(space)
            .unwrap()
            .set_string(crate::features::CAD_OBJECT_ID, "abc");

        let json = model.to_json().unwrap();
        let restored = Model::from_json(&json).unwrap();
        let handle = model.handle(space).unwrap();
        let key = restored.key_of(&handle).unwrap();
        assert_eq!(restored.name(key), Some("Space"));
        assert_eq!(
            restored.get::<Space>(key).unwrap().thermal_zone,
            restored.key_of(&model.handle(zone).unwrap())
        );
        assert_eq!(
            restored.features(key).unwrap().get_string(crate::features::CAD_OBJECT_ID).unwrap(),
            "abc"
        );
    }
}
