// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-type object data.
//!
//! References between objects are [`ObjectKey`]s into the owning
//! [`Model`](crate::Model). Optional scalar fields use `None` for "defaulted".

use std::fmt;
use std::str::FromStr;

use bem_lite_geometry::Point3;
use serde::{Deserialize, Serialize};

use crate::color::RenderingColor;
use crate::coordinate::CoordinateFrame;
use crate::error::Error;
use crate::keys::{ObjectKey, ObjectType};

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            /// Case-insensitive.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .copied()
                    .ok_or_else(|| Error::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

string_enum!(
    /// Role of a base surface.
    SurfaceType, "surface type" {
        Floor => "Floor",
        Wall => "Wall",
        RoofCeiling => "RoofCeiling",
    }
);

string_enum!(
    /// Role of a sub-surface.
    SubSurfaceType, "sub-surface type" {
        FixedWindow => "FixedWindow",
        OperableWindow => "OperableWindow",
        Door => "Door",
        GlassDoor => "GlassDoor",
        OverheadDoor => "OverheadDoor",
        Skylight => "Skylight",
        TubularDaylightDome => "TubularDaylightDome",
        TubularDaylightDiffuser => "TubularDaylightDiffuser",
    }
);

string_enum!(
    /// Which frame a shading group hangs off.
    ShadingSurfaceType, "shading surface type" {
        Site => "Site",
        Building => "Building",
        Space => "Space",
    }
);

string_enum!(
    /// What lies on the far side of a surface.
    BoundaryCondition, "boundary condition" {
        Adiabatic => "Adiabatic",
        Surface => "Surface",
        Outdoors => "Outdoors",
        Ground => "Ground",
        Foundation => "Foundation",
        GroundFCfactorMethod => "GroundFCfactorMethod",
        GroundSlabPreprocessorAverage => "GroundSlabPreprocessorAverage",
        GroundSlabPreprocessorCore => "GroundSlabPreprocessorCore",
        GroundSlabPreprocessorPerimeter => "GroundSlabPreprocessorPerimeter",
        GroundBasementPreprocessorAverageWall => "GroundBasementPreprocessorAverageWall",
        GroundBasementPreprocessorAverageFloor => "GroundBasementPreprocessorAverageFloor",
        GroundBasementPreprocessorUpperWall => "GroundBasementPreprocessorUpperWall",
        GroundBasementPreprocessorLowerWall => "GroundBasementPreprocessorLowerWall",
        OtherSideCoefficients => "OtherSideCoefficients",
        OtherSideConditionsModel => "OtherSideConditionsModel",
    }
);

impl SubSurfaceType {
    /// Default role for a sub-surface placed on `parent`.
    pub fn default_for(parent: SurfaceType) -> Self {
        match parent {
            SurfaceType::RoofCeiling => SubSurfaceType::Skylight,
            _ => SubSurfaceType::FixedWindow,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Site {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub time_zone: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Building {
    /// Degrees clockwise from true north to the building's +Y axis.
    pub north_axis: Option<f64>,
    pub nominal_floor_to_floor_height: Option<f64>,
    pub nominal_floor_to_ceiling_height: Option<f64>,
    pub space_type: Option<ObjectKey>,
    pub default_construction_set: Option<ObjectKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Space {
    pub frame: CoordinateFrame,
    pub thermal_zone: Option<ObjectKey>,
    pub space_type: Option<ObjectKey>,
    pub building_story: Option<ObjectKey>,
    pub building_unit: Option<ObjectKey>,
    pub default_construction_set: Option<ObjectKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadingSurfaceGroup {
    pub frame: CoordinateFrame,
    pub shading_type: ShadingSurfaceType,
    /// Owning space, only for `ShadingSurfaceType::Space`.
    pub space: Option<ObjectKey>,
    pub shaded_surface: Option<ObjectKey>,
    pub shaded_sub_surface: Option<ObjectKey>,
}

impl Default for ShadingSurfaceGroup {
    fn default() -> Self {
        Self {
            frame: CoordinateFrame::default(),
            shading_type: ShadingSurfaceType::Building,
            space: None,
            shaded_surface: None,
            shaded_sub_surface: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteriorPartitionSurfaceGroup {
    pub frame: CoordinateFrame,
    pub space: Option<ObjectKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalZone {
    pub rendering_color: Option<RenderingColor>,
    pub multiplier: Option<u32>,
    pub ceiling_height: Option<f64>,
    pub volume: Option<f64>,
    pub primary_daylighting_control: Option<ObjectKey>,
    pub fraction_controlled_by_primary: f64,
    pub secondary_daylighting_control: Option<ObjectKey>,
    pub fraction_controlled_by_secondary: f64,
}

impl Default for ThermalZone {
    fn default() -> Self {
        Self {
            rendering_color: None,
            multiplier: None,
            ceiling_height: None,
            volume: None,
            primary_daylighting_control: None,
            fraction_controlled_by_primary: 1.0,
            secondary_daylighting_control: None,
            fraction_controlled_by_secondary: 0.0,
        }
    }
}

impl ThermalZone {
    pub fn multiplier(&self) -> u32 {
        self.multiplier.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceType {
    pub rendering_color: Option<RenderingColor>,
    pub default_construction_set: Option<ObjectKey>,
    pub standards_building_type: Option<String>,
    pub standards_space_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingStory {
    pub rendering_color: Option<RenderingColor>,
    pub nominal_z_coordinate: Option<f64>,
    pub nominal_floor_to_floor_height: Option<f64>,
    pub nominal_floor_to_ceiling_height: Option<f64>,
    pub default_construction_set: Option<ObjectKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingUnit {
    pub rendering_color: Option<RenderingColor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConstructionSet {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Construction {
    pub rendering_color: Option<RenderingColor>,
    /// Zero-resistance air boundary between spaces.
    pub air_boundary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    pub space: Option<ObjectKey>,
    /// Vertices in space coordinates, counter-clockwise seen from outside.
    pub vertices: Vec<Point3<f64>>,
    pub surface_type: SurfaceType,
    pub construction: Option<ObjectKey>,
    pub outside_boundary_condition: BoundaryCondition,
    pub adjacent_surface: Option<ObjectKey>,
    pub sun_exposed: bool,
    pub wind_exposed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSurface {
    pub surface: Option<ObjectKey>,
    pub vertices: Vec<Point3<f64>>,
    pub sub_surface_type: SubSurfaceType,
    pub construction: Option<ObjectKey>,
    pub adjacent_sub_surface: Option<ObjectKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadingSurface {
    pub group: Option<ObjectKey>,
    pub vertices: Vec<Point3<f64>>,
    pub construction: Option<ObjectKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteriorPartitionSurface {
    pub group: Option<ObjectKey>,
    pub vertices: Vec<Point3<f64>>,
    pub construction: Option<ObjectKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaylightingControl {
    pub space: Option<ObjectKey>,
    /// Sensor position in space coordinates.
    pub position: Point3<f64>,
    /// Illuminance setpoint in lux.
    pub illuminance_setpoint: f64,
}

impl Default for DaylightingControl {
    fn default() -> Self {
        Self {
            space: None,
            position: Point3::origin(),
            illuminance_setpoint: 500.0,
        }
    }
}

/// Type-specific data of one model object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObjectData {
    Site(Site),
    Building(Building),
    Space(Space),
    ShadingSurfaceGroup(ShadingSurfaceGroup),
    InteriorPartitionSurfaceGroup(InteriorPartitionSurfaceGroup),
    ThermalZone(ThermalZone),
    SpaceType(SpaceType),
    BuildingStory(BuildingStory),
    BuildingUnit(BuildingUnit),
    DefaultConstructionSet(DefaultConstructionSet),
    Construction(Construction),
    Surface(Surface),
    SubSurface(SubSurface),
    ShadingSurface(ShadingSurface),
    InteriorPartitionSurface(InteriorPartitionSurface),
    DaylightingControl(DaylightingControl),
}

/// Data types that can be stored in [`ObjectData`] and borrowed back out of it.
pub trait TypedObject: Sized + Into<ObjectData> {
    const TYPE: ObjectType;

    fn from_data(data: &ObjectData) -> Option<&Self>;
    fn from_data_mut(data: &mut ObjectData) -> Option<&mut Self>;
}

macro_rules! typed_object {
    ($($name:ident),+ $(,)?) => {
        $(
            impl TypedObject for $name {
                const TYPE: ObjectType = ObjectType::$name;

                fn from_data(data: &ObjectData) -> Option<&Self> {
                    match data {
                        ObjectData::$name(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_data_mut(data: &mut ObjectData) -> Option<&mut Self> {
                    match data {
                        ObjectData::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$name> for ObjectData {
                fn from(inner: $name) -> Self {
                    ObjectData::$name(inner)
                }
            }
        )+

        impl ObjectData {
            pub fn object_type(&self) -> ObjectType {
                match self {
                    $(ObjectData::$name(_) => ObjectType::$name),+
                }
            }
        }
    };
}

typed_object!(
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
);

impl ObjectData {
    /// Coordinate frame of objects that own one.
    pub fn frame(&self) -> Option<&CoordinateFrame> {
        match self {
            ObjectData::Space(s) => Some(&s.frame),
            ObjectData::ShadingSurfaceGroup(g) => Some(&g.frame),
            ObjectData::InteriorPartitionSurfaceGroup(g) => Some(&g.frame),
            _ => None,
        }
    }

    pub fn frame_mut(&mut self) -> Option<&mut CoordinateFrame> {
        match self {
            ObjectData::Space(s) => Some(&mut s.frame),
            ObjectData::ShadingSurfaceGroup(g) => Some(&mut g.frame),
            ObjectData::InteriorPartitionSurfaceGroup(g) => Some(&mut g.frame),
            _ => None,
        }
    }

    /// Rendering color slot of objects that carry one.
    pub fn rendering_color(&self) -> Option<&Option<RenderingColor>> {
        match self {
            ObjectData::ThermalZone(o) => Some(&o.rendering_color),
            ObjectData::SpaceType(o) => Some(&o.rendering_color),
            ObjectData::BuildingStory(o) => Some(&o.rendering_color),
            ObjectData::BuildingUnit(o) => Some(&o.rendering_color),
            ObjectData::Construction(o) => Some(&o.rendering_color),
            _ => None,
        }
    }

    pub fn rendering_color_mut(&mut self) -> Option<&mut Option<RenderingColor>> {
        match self {
            ObjectData::ThermalZone(o) => Some(&mut o.rendering_color),
            ObjectData::SpaceType(o) => Some(&mut o.rendering_color),
            ObjectData::BuildingStory(o) => Some(&mut o.rendering_color),
            ObjectData::BuildingUnit(o) => Some(&mut o.rendering_color),
            ObjectData::Construction(o) => Some(&mut o.rendering_color),
            _ => None,
        }
    }

    /// Vertices of planar objects, in their parent's coordinates.
    pub fn vertices(&self) -> Option<&[Point3<f64>]> {
        match self {
            ObjectData::Surface(s) => Some(&s.vertices),
            ObjectData::SubSurface(s) => Some(&s.vertices),
            ObjectData::ShadingSurface(s) => Some(&s.vertices),
            ObjectData::InteriorPartitionSurface(s) => Some(&s.vertices),
            _ => None,
        }
    }

    /// Parent in the containment tree (the object whose removal removes this one).
    pub fn parent(&self) -> Option<ObjectKey> {
        match self {
            ObjectData::Surface(s) => s.space,
            ObjectData::SubSurface(s) => s.surface,
            ObjectData::ShadingSurface(s) => s.group,
            ObjectData::InteriorPartitionSurface(s) => s.group,
            ObjectData::DaylightingControl(d) => d.space,
            ObjectData::ShadingSurfaceGroup(g) => g.space,
            ObjectData::InteriorPartitionSurfaceGroup(g) => g.space,
            _ => None,
        }
    }

    /// Clears every reference to `key`; containment parents are left alone.
    pub(crate) fn clear_reference(&mut self, key: ObjectKey) {
        fn clear(slot: &mut Option<ObjectKey>, key: ObjectKey) {
            if *slot == Some(key) {
                *slot = None;
            }
        }

        match self {
            ObjectData::Building(b) => {
                clear(&mut b.space_type, key);
                clear(&mut b.default_construction_set, key);
            }
            ObjectData::Space(s) => {
                clear(&mut s.thermal_zone, key);
                clear(&mut s.space_type, key);
                clear(&mut s.building_story, key);
                clear(&mut s.building_unit, key);
                clear(&mut s.default_construction_set, key);
            }
            ObjectData::ShadingSurfaceGroup(g) => {
                clear(&mut g.shaded_surface, key);
                clear(&mut g.shaded_sub_surface, key);
            }
            ObjectData::ThermalZone(z) => {
                clear(&mut z.primary_daylighting_control, key);
                clear(&mut z.secondary_daylighting_control, key);
            }
            ObjectData::SpaceType(t) => clear(&mut t.default_construction_set, key),
            ObjectData::BuildingStory(s) => clear(&mut s.default_construction_set, key),
            ObjectData::Surface(s) => {
                clear(&mut s.construction, key);
                if s.adjacent_surface == Some(key) {
                    s.adjacent_surface = None;
                    if s.outside_boundary_condition == BoundaryCondition::Surface {
                        s.outside_boundary_condition = BoundaryCondition::Outdoors;
                        s.sun_exposed = true;
                        s.wind_exposed = true;
                    }
                }
            }
            ObjectData::SubSurface(s) => {
                clear(&mut s.construction, key);
                clear(&mut s.adjacent_sub_surface, key);
            }
            ObjectData::ShadingSurface(s) => clear(&mut s.construction, key),
            ObjectData::InteriorPartitionSurface(s) => clear(&mut s.construction, key),
            _ => {}
        }
    }
}
