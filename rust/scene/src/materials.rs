// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material palette: fixed role and boundary materials plus per-object
//! materials colored by rendering color.

use bem_lite_model::{BoundaryCondition, ObjectType, RenderingColor};
use rustc_hash::FxHashMap;

use crate::three::{to_three_color, ThreeMaterial, ThreeSide};

pub const UNDEFINED_MATERIAL: &str = "Undefined";
pub const AIR_WALL_MATERIAL: &str = "AirWall";
pub const DAYLIGHTING_CONTROL_MATERIAL: &str = "DaylightingControl";

const MATERIAL_TYPE: &str = "MeshPhongMaterial";
const SHININESS: u32 = 50;

/// Role materials: name, main color, interior color, opacity. Each gets a
/// double-sided main entry, an `_Ext` front-side entry in the main color and
/// an `_Int` back-side entry in the interior color.
const ROLE_MATERIALS: &[(&str, [u8; 3], [u8; 3], f64)] = &[
    ("Floor", [128, 128, 128], [191, 191, 191], 1.0),
    ("Wall", [204, 178, 102], [235, 226, 197], 1.0),
    ("RoofCeiling", [153, 76, 76], [202, 149, 149], 1.0),
    ("Window", [102, 178, 204], [192, 226, 235], 0.6),
    ("Door", [153, 133, 76], [202, 188, 149], 1.0),
    ("SiteShading", [75, 124, 149], [187, 209, 220], 1.0),
    ("BuildingShading", [113, 76, 153], [216, 203, 229], 1.0),
    ("SpaceShading", [76, 110, 178], [183, 197, 224], 1.0),
    ("InteriorPartitionSurface", [158, 188, 143], [213, 226, 207], 1.0),
];

const BOUNDARY_MATERIALS: &[(&str, [u8; 3])] = &[
    ("Boundary_Surface", [0, 153, 0]),
    ("Boundary_Adiabatic", [255, 0, 0]),
    ("Boundary_Space", [255, 0, 0]),
    ("Boundary_Outdoors", [163, 204, 204]),
    ("Boundary_Outdoors_Sun", [40, 204, 204]),
    ("Boundary_Outdoors_Wind", [9, 159, 162]),
    ("Boundary_Outdoors_SunWind", [68, 119, 161]),
    ("Boundary_Ground", [204, 183, 122]),
    ("Boundary_Groundfcfactormethod", [153, 122, 30]),
    ("Boundary_Groundslabpreprocessoraverage", [255, 191, 0]),
    ("Boundary_Groundslabpreprocessorcore", [255, 182, 50]),
    ("Boundary_Groundslabpreprocessorperimeter", [255, 178, 101]),
    ("Boundary_Groundbasementpreprocessoraveragewall", [204, 51, 0]),
    ("Boundary_Groundbasementpreprocessoraveragefloor", [204, 81, 40]),
    ("Boundary_Groundbasementpreprocessorupperwall", [204, 112, 81]),
    ("Boundary_Groundbasementpreprocessorlowerwall", [204, 173, 163]),
    ("Boundary_Othersidecoefficients", [63, 63, 63]),
    ("Boundary_Othersideconditionsmodel", [153, 0, 76]),
];

/// Rendering aids, all double-sided.
const SPECIAL_MATERIALS: &[(&str, [u8; 3], f64)] = &[
    ("SpaceType_Plenum", [192, 192, 192], 0.1),
    ("ThermalZone_Plenum", [192, 192, 192], 0.1),
    (DAYLIGHTING_CONTROL_MATERIAL, [102, 178, 204], 0.1),
    (AIR_WALL_MATERIAL, [102, 178, 204], 0.1),
    ("SolarCollector", [255, 255, 255], 1.0),
    ("Photovoltaic", [255, 255, 255], 0.1),
];

/// A Phong material with a fresh id.
pub fn make_material(name: impl Into<String>, color: u32, opacity: f64, side: ThreeSide) -> ThreeMaterial {
    ThreeMaterial {
        uuid: uuid::Uuid::new_v4().to_string(),
        name: name.into(),
        kind: MATERIAL_TYPE.to_string(),
        color,
        ambient: color,
        emissive: to_three_color(0, 0, 0),
        specular: color,
        shininess: SHININESS,
        opacity,
        transparent: opacity < 1.0,
        wireframe: false,
        side,
    }
}

fn rgb([r, g, b]: [u8; 3]) -> u32 {
    to_three_color(r, g, b)
}

/// Material name for a boundary condition, e.g. `Boundary_Outdoors_SunWind`.
pub fn boundary_material_name(condition: BoundaryCondition, sun_exposed: bool, wind_exposed: bool) -> String {
    let lower = condition.as_str().to_ascii_lowercase();
    let mut chars = lower.chars();
    let capitalized: String = chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default();

    let mut name = format!("Boundary_{capitalized}");
    if condition == BoundaryCondition::Outdoors {
        match (sun_exposed, wind_exposed) {
            (true, true) => name.push_str("_SunWind"),
            (true, false) => name.push_str("_Sun"),
            (false, true) => name.push_str("_Wind"),
            (false, false) => {}
        }
    }
    name
}

/// Material name for a surface role; window and door families share one.
pub fn surface_type_material_name(role: &str) -> &str {
    const WINDOWS: [&str; 6] = [
        "FixedWindow",
        "OperableWindow",
        "GlassDoor",
        "Skylight",
        "TubularDaylightDome",
        "TubularDaylightDiffuser",
    ];
    if WINDOWS.iter().any(|w| w.eq_ignore_ascii_case(role)) {
        "Window"
    } else if role.eq_ignore_ascii_case("Door") || role.eq_ignore_ascii_case("OverheadDoor") {
        "Door"
    } else {
        role
    }
}

/// Material name for an object colored by its rendering color, or `None`
/// for types without one.
pub fn object_material_name(ty: ObjectType, name: &str) -> Option<String> {
    let prefix = match ty {
        ObjectType::Construction => "Construction",
        ObjectType::ThermalZone => "ThermalZone",
        ObjectType::SpaceType => "SpaceType",
        ObjectType::BuildingStory => "BuildingStory",
        ObjectType::BuildingUnit => "BuildingUnit",
        _ => return None,
    };
    Some(format!("{prefix}_{name}"))
}

/// Ordered material list with a name index.
#[derive(Debug, Clone, Default)]
pub struct MaterialPalette {
    materials: Vec<ThreeMaterial>,
    ids: FxHashMap<String, String>,
}

impl MaterialPalette {
    /// The fixed table of role, boundary and special materials.
    pub fn standard() -> Self {
        let mut palette = Self::default();
        let white = to_three_color(255, 255, 255);
        palette.add(make_material(UNDEFINED_MATERIAL, white, 1.0, ThreeSide::DoubleSide));
        palette.add(make_material("NormalMaterial", white, 1.0, ThreeSide::DoubleSide));
        palette.add(make_material("NormalMaterial_Ext", white, 1.0, ThreeSide::FrontSide));
        palette.add(make_material(
            "NormalMaterial_Int",
            to_three_color(255, 0, 0),
            1.0,
            ThreeSide::BackSide,
        ));

        for &(name, main, interior, opacity) in ROLE_MATERIALS {
            palette.add(make_material(name, rgb(main), opacity, ThreeSide::DoubleSide));
            palette.add(make_material(format!("{name}_Ext"), rgb(main), opacity, ThreeSide::FrontSide));
            palette.add(make_material(format!("{name}_Int"), rgb(interior), opacity, ThreeSide::BackSide));
        }
        for &(name, color) in BOUNDARY_MATERIALS {
            palette.add(make_material(name, rgb(color), 1.0, ThreeSide::DoubleSide));
        }
        for &(name, color, opacity) in SPECIAL_MATERIALS {
            palette.add(make_material(name, rgb(color), opacity, ThreeSide::DoubleSide));
        }
        palette
    }

    /// Adds a material; a later material with the same name takes over the
    /// name's id.
    pub fn add(&mut self, material: ThreeMaterial) {
        self.ids.insert(material.name.clone(), material.uuid.clone());
        self.materials.push(material);
    }

    /// Adds a double-sided opaque material for an object's rendering color.
    pub fn add_object_material(&mut self, name: impl Into<String>, color: RenderingColor) {
        self.add(make_material(name, color.to_rgb(), 1.0, ThreeSide::DoubleSide));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// Id of `name`, falling back to the `Undefined` material.
    pub fn material_id(&self, name: &str) -> &str {
        self.ids
            .get(name)
            .or_else(|| self.ids.get(UNDEFINED_MATERIAL))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn materials(&self) -> &[ThreeMaterial] {
        &self.materials
    }

    pub fn into_materials(self) -> Vec<ThreeMaterial> {
        self.materials
    }
}
