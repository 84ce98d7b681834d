// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar objects: creation with defaults, adjacency, and rendering colors.

use bem_lite_geometry::{outward_normal, Point3};

use crate::color::RenderingColor;
use crate::error::{Error, Result};
use crate::keys::{ObjectKey, ObjectType};
use crate::model::Model;
use crate::objects::{
    BoundaryCondition, Construction, InteriorPartitionSurface, InteriorPartitionSurfaceGroup,
    ShadingSurface, ShadingSurfaceGroup, Space, SubSurface, SubSurfaceType, Surface, SurfaceType,
};

/// Name of the shared zero-resistance construction used for air walls.
pub const AIR_WALL_CONSTRUCTION: &str = "AirWall";

/// Floors whose lowest building-coordinate vertex is at or below this height
/// default to a ground boundary.
const GROUND_LEVEL_TOLERANCE: f64 = 0.01;

/// Surface type implied by the tilt of `vertices`: RoofCeiling below 60°,
/// Wall below 179°, Floor otherwise. Wall when no normal exists.
pub fn default_surface_type(vertices: &[Point3<f64>]) -> SurfaceType {
    let Some(normal) = outward_normal(vertices) else {
        return SurfaceType::Wall;
    };
    let tilt = normal.z.clamp(-1.0, 1.0).acos().to_degrees();
    if tilt < 60.0 {
        SurfaceType::RoofCeiling
    } else if tilt < 179.0 {
        SurfaceType::Wall
    } else {
        SurfaceType::Floor
    }
}

/// Sun and wind exposure implied by a boundary condition.
pub fn default_exposure(condition: BoundaryCondition) -> (bool, bool) {
    let exposed = condition == BoundaryCondition::Outdoors;
    (exposed, exposed)
}

impl Model {
    /// Adds a surface to `space`; the type is derived from the tilt when
    /// `surface_type` is `None`, and boundary condition and exposures get
    /// their defaults.
    pub fn add_surface(
        &mut self,
        name: impl Into<String>,
        space: ObjectKey,
        vertices: Vec<Point3<f64>>,
        surface_type: Option<SurfaceType>,
    ) -> Result<ObjectKey> {
        self.try_get::<Space>(space)?;
        let surface_type = surface_type.unwrap_or_else(|| default_surface_type(&vertices));
        let key = self.add(
            name,
            Surface {
                space: Some(space),
                vertices,
                surface_type,
                construction: None,
                outside_boundary_condition: BoundaryCondition::Outdoors,
                adjacent_surface: None,
                sun_exposed: true,
                wind_exposed: true,
            },
        );
        self.assign_default_boundary_condition(key)?;
        Ok(key)
    }

    /// Adds a sub-surface on `surface`; the default type depends on the
    /// parent's type.
    pub fn add_sub_surface(
        &mut self,
        name: impl Into<String>,
        surface: ObjectKey,
        vertices: Vec<Point3<f64>>,
        sub_surface_type: Option<SubSurfaceType>,
    ) -> Result<ObjectKey> {
        let parent_type = self.try_get::<Surface>(surface)?.surface_type;
        let sub_surface_type =
            sub_surface_type.unwrap_or_else(|| SubSurfaceType::default_for(parent_type));
        Ok(self.add(
            name,
            SubSurface {
                surface: Some(surface),
                vertices,
                sub_surface_type,
                construction: None,
                adjacent_sub_surface: None,
            },
        ))
    }

    pub fn add_shading_surface(
        &mut self,
        name: impl Into<String>,
        group: ObjectKey,
        vertices: Vec<Point3<f64>>,
    ) -> Result<ObjectKey> {
        self.try_get::<ShadingSurfaceGroup>(group)?;
        Ok(self.add(
            name,
            ShadingSurface {
                group: Some(group),
                vertices,
                construction: None,
            },
        ))
    }

    pub fn add_interior_partition_surface(
        &mut self,
        name: impl Into<String>,
        group: ObjectKey,
        vertices: Vec<Point3<f64>>,
    ) -> Result<ObjectKey> {
        self.try_get::<InteriorPartitionSurfaceGroup>(group)?;
        Ok(self.add(
            name,
            InteriorPartitionSurface {
                group: Some(group),
                vertices,
                construction: None,
            },
        ))
    }

    /// Recomputes the boundary condition and exposures of `surface`.
    ///
    /// Adjacent surfaces get `Surface`; floors touching the ground plane get
    /// `Ground`; everything else `Outdoors`.
    pub fn assign_default_boundary_condition(&mut self, surface: ObjectKey) -> Result<()> {
        let (is_adjacent, surface_type) = {
            let s = self.try_get::<Surface>(surface)?;
            (s.adjacent_surface.is_some(), s.surface_type)
        };
        let condition = if is_adjacent {
            BoundaryCondition::Surface
        } else if surface_type == SurfaceType::Floor {
            let lowest = self
                .building_vertices(surface)?
                .iter()
                .map(|p| p.z)
                .fold(f64::INFINITY, f64::min);
            if lowest <= GROUND_LEVEL_TOLERANCE {
                BoundaryCondition::Ground
            } else {
                BoundaryCondition::Outdoors
            }
        } else {
            BoundaryCondition::Outdoors
        };
        self.set_outside_boundary_condition(surface, condition)
    }

    /// Sets the boundary condition and the matching default exposures.
    ///
    /// Leaving `Surface` detaches the adjacent surface on both sides.
    pub fn set_outside_boundary_condition(
        &mut self,
        surface: ObjectKey,
        condition: BoundaryCondition,
    ) -> Result<()> {
        let previous = self.try_get::<Surface>(surface)?.adjacent_surface;
        if condition != BoundaryCondition::Surface {
            if let Some(other) = previous {
                self.detach_surface(other, surface);
            }
        }
        let s = self.try_get_mut::<Surface>(surface)?;
        s.outside_boundary_condition = condition;
        if condition != BoundaryCondition::Surface {
            s.adjacent_surface = None;
        }
        (s.sun_exposed, s.wind_exposed) = default_exposure(condition);
        Ok(())
    }

    fn detach_surface(&mut self, surface: ObjectKey, partner: ObjectKey) {
        let detached = match self.get_mut::<Surface>(surface) {
            Some(s) if s.adjacent_surface == Some(partner) => {
                s.adjacent_surface = None;
                true
            }
            _ => false,
        };
        if detached {
            if let Err(err) = self.assign_default_boundary_condition(surface) {
                tracing::debug!(error = %err, "could not reassign boundary condition");
            }
        }
    }

    /// Makes `a` and `b` each other's adjacent surface, dropping any
    /// previous partners.
    pub fn set_adjacent_surface(&mut self, a: ObjectKey, b: ObjectKey) -> Result<()> {
        self.try_get::<Surface>(a)?;
        self.try_get::<Surface>(b)?;
        for (this, other) in [(a, b), (b, a)] {
            if let Some(previous) = self.try_get::<Surface>(this)?.adjacent_surface {
                if previous != other {
                    self.detach_surface(previous, this);
                }
            }
        }
        for (this, other) in [(a, b), (b, a)] {
            let s = self.try_get_mut::<Surface>(this)?;
            s.adjacent_surface = Some(other);
            s.outside_boundary_condition = BoundaryCondition::Surface;
            (s.sun_exposed, s.wind_exposed) = default_exposure(BoundaryCondition::Surface);
        }
        Ok(())
    }

    /// Detaches `surface` from its adjacent surface; both revert to defaults.
    pub fn reset_adjacent_surface(&mut self, surface: ObjectKey) -> Result<()> {
        let Some(other) = self.try_get::<Surface>(surface)?.adjacent_surface else {
            return Ok(());
        };
        self.try_get_mut::<Surface>(surface)?.adjacent_surface = None;
        self.assign_default_boundary_condition(surface)?;
        self.detach_surface(other, surface);
        Ok(())
    }

    pub fn set_adjacent_sub_surface(&mut self, a: ObjectKey, b: ObjectKey) -> Result<()> {
        self.try_get::<SubSurface>(a)?;
        self.try_get::<SubSurface>(b)?;
        for (this, other) in [(a, b), (b, a)] {
            if let Some(previous) = self.try_get::<SubSurface>(this)?.adjacent_sub_surface {
                if previous != other {
                    if let Some(p) = self.get_mut::<SubSurface>(previous) {
                        p.adjacent_sub_surface = None;
                    }
                }
            }
        }
        self.try_get_mut::<SubSurface>(a)?.adjacent_sub_surface = Some(b);
        self.try_get_mut::<SubSurface>(b)?.adjacent_sub_surface = Some(a);
        Ok(())
    }

    pub fn reset_adjacent_sub_surface(&mut self, sub_surface: ObjectKey) -> Result<()> {
        let s = self.try_get_mut::<SubSurface>(sub_surface)?;
        if let Some(other) = s.adjacent_sub_surface.take() {
            if let Some(o) = self.get_mut::<SubSurface>(other) {
                o.adjacent_sub_surface = None;
            }
        }
        Ok(())
    }

    /// Rendering color of `key`, assigning one derived from its handle the
    /// first time. Idempotent.
    pub fn ensure_rendering_color(&mut self, key: ObjectKey) -> Result<RenderingColor> {
        let object = self.object_mut(key).ok_or(Error::KeyNotFound(key))?;
        let handle = object.handle();
        let found = object.object_type();
        let slot = object.data.rendering_color_mut().ok_or(Error::WrongType {
            expected: "object with a rendering color",
            found,
        })?;
        Ok(*slot.get_or_insert_with(|| RenderingColor::from_handle(&handle)))
    }

    /// Sets the construction of a surface, sub-surface, or shading or
    /// interior partition surface.
    pub fn set_construction(&mut self, key: ObjectKey, construction: Option<ObjectKey>) -> Result<()> {
        if let Some(c) = construction {
            self.try_get::<Construction>(c)?;
        }
        let object = self.object_mut(key).ok_or(Error::KeyNotFound(key))?;
        let slot = match &mut object.data {
            crate::objects::ObjectData::Surface(s) => &mut s.construction,
            crate::objects::ObjectData::SubSurface(s) => &mut s.construction,
            crate::objects::ObjectData::ShadingSurface(s) => &mut s.construction,
            crate::objects::ObjectData::InteriorPartitionSurface(s) => &mut s.construction,
            other => {
                return Err(Error::WrongType {
                    expected: "planar surface",
                    found: other.object_type(),
                })
            }
        };
        *slot = construction;
        Ok(())
    }

    /// The shared air-wall construction, created on first use.
    pub fn air_wall_construction(&mut self) -> ObjectKey {
        let existing = self
            .objects_of_type(ObjectType::Construction)
            .into_iter()
            .find(|&k| {
                self.name(k) == Some(AIR_WALL_CONSTRUCTION)
                    && self.get::<Construction>(k).is_some_and(|c| c.air_boundary)
            });
        existing.unwrap_or_else(|| {
            self.add(
                AIR_WALL_CONSTRUCTION,
                Construction {
                    rendering_color: None,
                    air_boundary: true,
                },
            )
        })
    }

    /// True if the planar object's construction is an air boundary.
    pub fn is_air_wall(&self, key: ObjectKey) -> bool {
        let construction = match self.object(key).map(|o| &o.data) {
            Some(crate::objects::ObjectData::Surface(s)) => s.construction,
            Some(crate::objects::ObjectData::SubSurface(s)) => s.construction,
            _ => None,
        };
        construction
            .and_then(|c| self.get::<Construction>(c))
            .is_some_and(|c| c.air_boundary)
    }
}
