// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! three.js JSON object format (version 4.3) with building metadata.
//!
//! The scene is Y-up: a model point (x, y, z) is stored as (x, z, -y).
//! Missing optional keys deserialize to their defaults so older or
//! hand-written files still load.

use bem_lite_geometry::Point3;
use bem_lite_model::ObjectType;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Face-format tag for one untriangulated polygon; the remaining indices of
/// the face list are its vertices in reverse order.
pub const FACE_FORMAT_POLYGON: usize = 1024;

/// Face-format tag for a plain triangle (three indices follow).
pub const FACE_FORMAT_TRIANGLE: usize = 0;

pub const SCENE_VERSION: &str = "4.3";
pub const SCENE_TYPE: &str = "Object";
pub const GENERATOR: &str = "bem-lite";

pub const IDENTITY_MATRIX: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

/// Which faces of a mesh a material draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ThreeSide {
    FrontSide,
    BackSide,
    DoubleSide,
}

impl From<ThreeSide> for u32 {
    fn from(side: ThreeSide) -> u32 {
        match side {
            ThreeSide::FrontSide => 0,
            ThreeSide::BackSide => 1,
            ThreeSide::DoubleSide => 2,
        }
    }
}

impl TryFrom<u32> for ThreeSide {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(ThreeSide::FrontSide),
            1 => Ok(ThreeSide::BackSide),
            2 => Ok(ThreeSide::DoubleSide),
            other => Err(format!("invalid material side {other}")),
        }
    }
}

/// A complete scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeScene {
    pub metadata: ThreeSceneMetadata,
    pub geometries: Vec<ThreeGeometry>,
    pub materials: Vec<ThreeMaterial>,
    pub object: ThreeSceneObject,
}

impl ThreeScene {
    /// Parses a scene, rejecting files that are not three.js object scenes.
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: ThreeScene = serde_json::from_str(json)?;
        if !scene.metadata.kind.eq_ignore_ascii_case(SCENE_TYPE) {
            return Err(Error::UnsupportedFormat(format!(
                "metadata type '{}', expected '{SCENE_TYPE}'",
                scene.metadata.kind
            )));
        }
        Ok(scene)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn geometry(&self, uuid: &str) -> Option<&ThreeGeometry> {
        self.geometries.iter().find(|g| g.uuid == uuid)
    }

    pub fn material(&self, uuid: &str) -> Option<&ThreeMaterial> {
        self.materials.iter().find(|m| m.uuid == uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeSceneMetadata {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub generator: String,
    #[serde(default)]
    pub building_story_names: Vec<String>,
    #[serde(default)]
    pub bounding_box: ThreeBoundingBox,
    /// Degrees; absent in files written before north axes were exported.
    #[serde(default)]
    pub north_axis: f64,
    #[serde(default)]
    pub model_object_metadata: Vec<ThreeModelObjectMetadata>,
}

impl Default for ThreeSceneMetadata {
    fn default() -> Self {
        Self {
            version: SCENE_VERSION.to_string(),
            kind: SCENE_TYPE.to_string(),
            generator: GENERATOR.to_string(),
            building_story_names: Vec::new(),
            bounding_box: ThreeBoundingBox::default(),
            north_axis: 0.0,
            model_object_metadata: Vec::new(),
        }
    }
}

/// Scene extents in model coordinates plus a camera target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreeBoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
    pub look_at_x: f64,
    pub look_at_y: f64,
    pub look_at_z: f64,
    pub look_at_r: f64,
}

/// Object features carried through the metadata fields of the same name.
pub const FEATURE_OPEN_TO_BELOW: &str = "open_to_below";
pub const FEATURE_BELOW_FLOOR_PLENUM_HEIGHT: &str = "below_floor_plenum_height";
pub const FEATURE_ABOVE_CEILING_PLENUM_HEIGHT: &str = "above_ceiling_plenum_height";

/// One non-geometric object (space, zone, story, ...) carried in metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeModelObjectMetadata {
    /// `OS:`-prefixed type name, e.g. `OS:ThermalZone`.
    #[serde(rename = "iddObjectType")]
    pub idd_object_type: String,
    pub handle: String,
    pub name: String,
    /// `#RRGGBB`, or empty.
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub open_to_below: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_z_coordinate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below_floor_plenum_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_to_ceiling_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above_ceiling_plenum_height: Option<f64>,
}

impl ThreeModelObjectMetadata {
    pub fn new(idd_object_type: impl Into<String>, handle: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            idd_object_type: idd_object_type.into(),
            handle: handle.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeGeometry {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: ThreeGeometryData,
}

impl ThreeGeometry {
    pub fn new(uuid: impl Into<String>, data: ThreeGeometryData) -> Self {
        Self {
            uuid: uuid.into(),
            kind: "Geometry".to_string(),
            data,
        }
    }
}

fn default_scale() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Flat vertex buffer plus format-tagged face list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeGeometryData {
    pub vertices: Vec<f64>,
    #[serde(default)]
    pub normals: Vec<u64>,
    #[serde(default)]
    pub uvs: Vec<u64>,
    pub faces: Vec<usize>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub cast_shadow: bool,
    #[serde(default = "default_true")]
    pub receive_shadow: bool,
    #[serde(default = "default_true")]
    pub double_sided: bool,
}

impl ThreeGeometryData {
    pub fn new(vertices: Vec<f64>, faces: Vec<usize>) -> Self {
        Self {
            vertices,
            normals: Vec::new(),
            uvs: Vec::new(),
            faces,
            scale: 1.0,
            visible: true,
            cast_shadow: true,
            receive_shadow: true,
            double_sided: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeMaterial {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: u32,
    #[serde(default)]
    pub ambient: u32,
    #[serde(default)]
    pub emissive: u32,
    #[serde(default)]
    pub specular: u32,
    #[serde(default)]
    pub shininess: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub wireframe: bool,
    pub side: ThreeSide,
}

fn default_opacity() -> f64 {
    1.0
}

/// The root `Scene` object and its meshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeSceneObject {
    pub uuid: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "identity_matrix")]
    pub matrix: Vec<f64>,
    pub children: Vec<ThreeSceneChild>,
}

impl ThreeSceneObject {
    pub fn new(children: Vec<ThreeSceneChild>) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            kind: "Scene".to_string(),
            matrix: identity_matrix(),
            children,
        }
    }
}

fn identity_matrix() -> Vec<f64> {
    IDENTITY_MATRIX.to_vec()
}

/// One mesh: geometry and material references plus building metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeSceneChild {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: String,
    pub material: String,
    #[serde(default = "identity_matrix")]
    pub matrix: Vec<f64>,
    #[serde(default)]
    pub user_data: ThreeUserData,
}

impl ThreeSceneChild {
    pub fn mesh(
        name: impl Into<String>,
        geometry: impl Into<String>,
        material: impl Into<String>,
        user_data: ThreeUserData,
    ) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind: "Mesh".to_string(),
            geometry: geometry.into(),
            material: material.into(),
            matrix: identity_matrix(),
            user_data,
        }
    }
}

/// Per-mesh building metadata. Every key is optional on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreeUserData {
    pub handle: String,
    pub name: String,
    pub surface_type: String,
    pub surface_type_material_name: String,
    pub construction_name: String,
    pub construction_handle: String,
    pub construction_material_name: String,
    pub surface_name: String,
    pub surface_handle: String,
    pub sub_surface_name: String,
    pub sub_surface_handle: String,
    pub space_name: String,
    pub space_handle: String,
    pub shading_name: String,
    pub shading_handle: String,
    pub thermal_zone_name: String,
    pub thermal_zone_handle: String,
    pub thermal_zone_material_name: String,
    pub space_type_name: String,
    pub space_type_handle: String,
    pub space_type_material_name: String,
    pub building_story_name: String,
    pub building_story_handle: String,
    pub building_story_material_name: String,
    pub building_unit_name: String,
    pub building_unit_handle: String,
    pub building_unit_material_name: String,
    pub construction_set_name: String,
    pub construction_set_handle: String,
    pub construction_set_material_name: String,
    pub boundary_material_name: String,
    pub outside_boundary_condition: String,
    pub outside_boundary_condition_object_name: String,
    pub outside_boundary_condition_object_handle: String,
    pub coincident_with_outside_object: bool,
    /// `SunExposed` or `NoSun`.
    pub sun_exposure: String,
    /// `WindExposed` or `NoWind`.
    pub wind_exposure: String,
    pub illuminance_setpoint: f64,
    pub air_wall: bool,
}

/// Model points to a flat Y-up buffer.
pub fn to_three_vector(points: &[Point3<f64>]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.z, -p.y]).collect()
}

/// Flat Y-up buffer back to model points; a trailing partial triple is dropped.
pub fn from_three_vector(values: &[f64]) -> Vec<Point3<f64>> {
    values
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], -c[2], c[1]))
        .collect()
}

/// Object types carried in `modelObjectMetadata`, in output order.
pub const METADATA_TYPES: [ObjectType; 6] = [
    ObjectType::Space,
    ObjectType::ThermalZone,
    ObjectType::SpaceType,
    ObjectType::BuildingStory,
    ObjectType::BuildingUnit,
    ObjectType::DefaultConstructionSet,
];

/// `OS:ThermalZone` style type name.
pub fn idd_object_type(ty: ObjectType) -> String {
    format!("OS:{}", ty.as_str())
}

/// Inverse of [`idd_object_type`]; the `OS:` prefix is optional.
pub fn parse_idd_object_type(s: &str) -> Option<ObjectType> {
    let bare = s
        .get(..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("OS:"))
        .map_or(s, |_| &s[3..]);
    bare.parse().ok()
}

/// Packed `0xRRGGBB`.
pub fn to_three_color(r: u8, g: u8, b: u8) -> u32 {
    65536 * r as u32 + 256 * g as u32 + b as u32
}
