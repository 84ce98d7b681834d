// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BEM-Lite Model
//!
//! Typed building object graph: sites, buildings, spaces and their surfaces,
//! zones, stories, units and construction sets, stored in one arena with
//! stable keys and process-unique handles.
//!
//! On top of the graph this crate provides the coordinate hierarchy
//! (space → building → site), default boundary conditions and adjacency,
//! surface intersection and matching between spaces, and merging of one
//! graph into another.

pub mod color;
pub mod coordinate;
pub mod error;
pub mod features;
pub mod handle;
pub mod keys;
pub mod log;
pub mod mapping;
pub mod matching;
pub mod merge;
pub mod model;
pub mod objects;
pub mod surfaces;

pub use color::RenderingColor;
pub use coordinate::CoordinateFrame;
pub use error::{Error, Result};
pub use features::{FeatureBag, FeatureValue, CAD_OBJECT_ID};
pub use handle::Handle;
pub use keys::{ObjectKey, ObjectType};
pub use log::{LogLevel, LogMessage, LogSink};
pub use mapping::HandleMapping;
pub use matching::{
    floor_area, intersect_space_pair, intersect_surface_pair, intersect_surfaces, match_space_pair,
    match_surfaces, space_bounding_box, unmatch_surfaces, MATCH_TOLERANCE,
};
pub use merge::{ModelMerger, MERGED_TYPES};
pub use model::{Model, ModelObject};
pub use objects::{
    BoundaryCondition, Building, BuildingStory, BuildingUnit, Construction, DaylightingControl,
    DefaultConstructionSet, InteriorPartitionSurface, InteriorPartitionSurfaceGroup, ObjectData,
    ShadingSurface, ShadingSurfaceGroup, ShadingSurfaceType, Site, Space, SpaceType, SubSurface,
    SubSurfaceType, Surface, SurfaceType, ThermalZone, TypedObject,
};
pub use surfaces::{default_exposure, default_surface_type, AIR_WALL_CONSTRUCTION};
