// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object keys and type discriminants.
//!
//! Every object gets a key from the model's `slotmap::SlotMap`; keys stay
//! valid (and detectably stale) when other objects are removed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::error::Error;

new_key_type! {
    /// Key for any object in a [`Model`](crate::Model).
    pub struct ObjectKey;
}

/// Discriminant for model object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Site,
    Building,
    Space,
    ShadingSurfaceGroup,
    InteriorPartitionSurfaceGroup,
    ThermalZone,
    SpaceType,
    BuildingStory,
    BuildingUnit,
    DefaultConstructionSet,
    Construction,
    Surface,
    SubSurface,
    ShadingSurface,
    InteriorPartitionSurface,
    DaylightingControl,
}

impl ObjectType {
    pub const ALL: [ObjectType; 16] = [
        ObjectType::Site,
        ObjectType::Building,
        ObjectType::Space,
        ObjectType::ShadingSurfaceGroup,
        ObjectType::InteriorPartitionSurfaceGroup,
        ObjectType::ThermalZone,
        ObjectType::SpaceType,
        ObjectType::BuildingStory,
        ObjectType::BuildingUnit,
        ObjectType::DefaultConstructionSet,
        ObjectType::Construction,
        ObjectType::Surface,
        ObjectType::SubSurface,
        ObjectType::ShadingSurface,
        ObjectType::InteriorPartitionSurface,
        ObjectType::DaylightingControl,
    ];

    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Site => "Site",
            ObjectType::Building => "Building",
            ObjectType::Space => "Space",
            ObjectType::ShadingSurfaceGroup => "ShadingSurfaceGroup",
            ObjectType::InteriorPartitionSurfaceGroup => "InteriorPartitionSurfaceGroup",
            ObjectType::ThermalZone => "ThermalZone",
            ObjectType::SpaceType => "SpaceType",
            ObjectType::BuildingStory => "BuildingStory",
            ObjectType::BuildingUnit => "BuildingUnit",
            ObjectType::DefaultConstructionSet => "DefaultConstructionSet",
            ObjectType::Construction => "Construction",
            ObjectType::Surface => "Surface",
            ObjectType::SubSurface => "SubSurface",
            ObjectType::ShadingSurface => "ShadingSurface",
            ObjectType::InteriorPartitionSurface => "InteriorPartitionSurface",
            ObjectType::DaylightingControl => "DaylightingControl",
        }
    }

    /// Site and Building exist at most once per model.
    pub fn is_unique(&self) -> bool {
        matches!(self, ObjectType::Site | ObjectType::Building)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::UnknownValue {
                kind: "object type",
                value: s.to_string(),
            })
    }
}
