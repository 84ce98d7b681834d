// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BEM-Lite Scene
//!
//! Translation between the building graph and three.js object scenes.
//!
//! The forward translator writes every planar object as a mesh with user
//! data describing its role and relationships, plus one material per
//! boundary condition, surface role and colored object. The reverse
//! translator rebuilds a graph from such a scene, as long as it was written
//! untriangulated.
//!
//! # Example
//!
//! ```rust,ignore
//! use bem_lite_scene::{ForwardOptions, ForwardTranslator, ReverseOptions, ReverseTranslator};
//!
//! let scene = ForwardTranslator::new().model_to_three_js(
//!     &mut model,
//!     &ForwardOptions { triangulate: false, ..Default::default() },
//! )?;
//! let rebuilt = ReverseTranslator::new().model_from_three_js(&scene, &ReverseOptions::default())?;
//! ```

pub mod error;
pub mod forward;
pub mod materials;
pub mod reverse;
pub mod three;

pub use error::{Error, Result};
pub use forward::{ForwardOptions, ForwardTranslator};
pub use materials::{boundary_material_name, MaterialPalette};
pub use reverse::{ReverseOptions, ReverseTranslator, DEFAULT_SPACE_NAME};
pub use three::{
    ThreeBoundingBox, ThreeGeometry, ThreeGeometryData, ThreeMaterial, ThreeModelObjectMetadata, ThreeScene,
    ThreeSceneChild, ThreeSceneMetadata, ThreeSceneObject, ThreeSide, ThreeUserData,
};
