// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local coordinate frames and the space → building → site chain.
//!
//! Spaces, shading groups and interior partition groups each own a
//! [`CoordinateFrame`]: a yaw about +Z plus an origin offset, with every
//! field optional. The derived transformation is cached and every setter
//! drops the cache before returning.

use std::cell::OnceCell;

use bem_lite_geometry::{Point3, Transformation, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::{ObjectKey, ObjectType};
use crate::model::Model;
use crate::objects::{Building, ObjectData, ShadingSurfaceType};

/// Rotations with pitch or roll above this are not representable.
const YAW_ONLY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinateFrame {
    direction_of_relative_north: Option<f64>,
    x_origin: Option<f64>,
    y_origin: Option<f64>,
    z_origin: Option<f64>,
    #[serde(skip)]
    cached: OnceCell<Transformation>,
}

impl PartialEq for CoordinateFrame {
    fn eq(&self, other: &Self) -> bool {
        self.direction_of_relative_north == other.direction_of_relative_north
            && self.x_origin == other.x_origin
            && self.y_origin == other.y_origin
            && self.z_origin == other.z_origin
    }
}

impl CoordinateFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Degrees, clockwise seen from above.
    pub fn direction_of_relative_north(&self) -> f64 {
        self.direction_of_relative_north.unwrap_or(0.0)
    }

    pub fn x_origin(&self) -> f64 {
        self.x_origin.unwrap_or(0.0)
    }

    pub fn y_origin(&self) -> f64 {
        self.y_origin.unwrap_or(0.0)
    }

    pub fn z_origin(&self) -> f64 {
        self.z_origin.unwrap_or(0.0)
    }

    pub fn is_direction_of_relative_north_defaulted(&self) -> bool {
        self.direction_of_relative_north.is_none()
    }

    pub fn is_x_origin_defaulted(&self) -> bool {
        self.x_origin.is_none()
    }

    pub fn is_y_origin_defaulted(&self) -> bool {
        self.y_origin.is_none()
    }

    pub fn is_z_origin_defaulted(&self) -> bool {
        self.z_origin.is_none()
    }

    pub fn set_direction_of_relative_north(&mut self, degrees: f64) {
        self.direction_of_relative_north = Some(degrees);
        self.invalidate();
    }

    pub fn set_x_origin(&mut self, x: f64) {
        self.x_origin = Some(x);
        self.invalidate();
    }

    pub fn set_y_origin(&mut self, y: f64) {
        self.y_origin = Some(y);
        self.invalidate();
    }

    pub fn set_z_origin(&mut self, z: f64) {
        self.z_origin = Some(z);
        self.invalidate();
    }

    pub fn reset_direction_of_relative_north(&mut self) {
        self.direction_of_relative_north = None;
        self.invalidate();
    }

    pub fn reset_x_origin(&mut self) {
        self.x_origin = None;
        self.invalidate();
    }

    pub fn reset_y_origin(&mut self) {
        self.y_origin = None;
        self.invalidate();
    }

    pub fn reset_z_origin(&mut self) {
        self.z_origin = None;
        self.invalidate();
    }

    /// Copies the four fields from `other`, keeping set/defaulted state.
    pub fn copy_fields_from(&mut self, other: &CoordinateFrame) {
        self.direction_of_relative_north = other.direction_of_relative_north;
        self.x_origin = other.x_origin;
        self.y_origin = other.y_origin;
        self.z_origin = other.z_origin;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cached.take();
    }

    /// Local → parent: `translate(origin) * rotate(-north about +Z)`.
    pub fn transformation(&self) -> Transformation {
        *self.cached.get_or_init(|| {
            let origin = Vector3::new(self.x_origin(), self.y_origin(), self.z_origin());
            let rotation = Transformation::rotation_z(-self.direction_of_relative_north().to_radians());
            &Transformation::translation(&origin) * &rotation
        })
    }

    /// Decomposes `t` into the four fields.
    ///
    /// Fails, leaving the frame untouched, if `t` has any pitch or roll.
    pub fn set_transformation(&mut self, t: &Transformation) -> Result<()> {
        let angles = t.euler_angles();
        if angles.psi.abs() > YAW_ONLY_TOLERANCE || angles.theta.abs() > YAW_ONLY_TOLERANCE {
            return Err(Error::UnsupportedTransformation(format!(
                "rotation has roll {} and pitch {} radians",
                angles.psi, angles.theta
            )));
        }
        let origin = t.translation_vector();
        self.direction_of_relative_north = Some(-angles.phi.to_degrees());
        self.x_origin = Some(origin.x);
        self.y_origin = Some(origin.y);
        self.z_origin = Some(origin.z);
        self.invalidate();
        Ok(())
    }

    #[cfg(test)]
    fn is_cached(&self) -> bool {
        self.cached.get().is_some()
    }
}

impl Building {
    /// Building → site: rotation of `-north_axis` about +Z.
    pub fn transformation(&self) -> Transformation {
        Transformation::rotation_z(-self.north_axis.unwrap_or(0.0).to_radians())
    }
}

impl Model {
    fn building_to_site(&self) -> Transformation {
        self.unique_building()
            .and_then(|key| self.get::<Building>(key))
            .map(Building::transformation)
            .unwrap_or_default()
    }

    fn site_to_building(&self) -> Transformation {
        let north = self
            .unique_building()
            .and_then(|key| self.get::<Building>(key))
            .and_then(|b| b.north_axis)
            .unwrap_or(0.0);
        Transformation::rotation_z(north.to_radians())
    }

    /// The object's own local → parent transformation; identity for objects
    /// without a frame.
    pub fn transformation(&self, key: ObjectKey) -> Result<Transformation> {
        let object = self.object(key).ok_or(Error::KeyNotFound(key))?;
        Ok(match &object.data {
            ObjectData::Building(b) => b.transformation(),
            data => data.frame().map(CoordinateFrame::transformation).unwrap_or_default(),
        })
    }

    /// Sets the frame of a space or group from `t`.
    pub fn set_transformation(&mut self, key: ObjectKey, t: &Transformation) -> Result<()> {
        let object = self.object_mut(key).ok_or(Error::KeyNotFound(key))?;
        let found = object.object_type();
        let frame = object.data.frame_mut().ok_or(Error::WrongType {
            expected: "coordinate group",
            found,
        })?;
        frame.set_transformation(t)
    }

    /// Local → building transformation of any object.
    ///
    /// Planar objects and daylighting controls use their owning group's
    /// chain. Objects outside the building tree get identity.
    pub fn building_transformation(&self, key: ObjectKey) -> Result<Transformation> {
        let object = self.object(key).ok_or(Error::KeyNotFound(key))?;
        match &object.data {
            ObjectData::Space(space) => Ok(space.frame.transformation()),
            ObjectData::ShadingSurfaceGroup(group) => {
                let local = group.frame.transformation();
                Ok(match group.shading_type {
                    ShadingSurfaceType::Site => &self.site_to_building() * &local,
                    ShadingSurfaceType::Building => local,
                    ShadingSurfaceType::Space => match group.space {
                        Some(space) => &self.building_transformation(space)? * &local,
                        None => local,
                    },
                })
            }
            ObjectData::InteriorPartitionSurfaceGroup(group) => {
                let local = group.frame.transformation();
                Ok(match group.space {
                    Some(space) => &self.building_transformation(space)? * &local,
                    None => local,
                })
            }
            data => match data.parent() {
                Some(parent) => self.building_transformation(parent),
                None => Ok(Transformation::new()),
            },
        }
    }

    /// Local → site transformation: the building chain followed by the
    /// building's north-axis rotation.
    pub fn site_transformation(&self, key: ObjectKey) -> Result<Transformation> {
        Ok(&self.building_to_site() * &self.building_transformation(key)?)
    }

    /// Vertices of a planar object in building coordinates.
    pub fn building_vertices(&self, key: ObjectKey) -> Result<Vec<Point3<f64>>> {
        let t = self.building_transformation(key)?;
        Ok(t.transform_points(self.vertices(key)?))
    }

    /// Vertices of a planar object in site coordinates.
    pub fn site_vertices(&self, key: ObjectKey) -> Result<Vec<Point3<f64>>> {
        let t = self.site_transformation(key)?;
        Ok(t.transform_points(self.vertices(key)?))
    }

    fn vertices(&self, key: ObjectKey) -> Result<&[Point3<f64>]> {
        let object = self.object(key).ok_or(Error::KeyNotFound(key))?;
        object.data.vertices().ok_or(Error::WrongType {
            expected: "planar surface",
            found: object.object_type(),
        })
    }

    /// True for object types that own a frame.
    pub fn is_coordinate_group(ty: ObjectType) -> bool {
        matches!(
            ty,
            ObjectType::Space | ObjectType::ShadingSurfaceGroup | ObjectType::InteriorPartitionSurfaceGroup
        )
    }
}
