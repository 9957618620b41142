//! Portals: paired rectangular openings that teleport rays (and later,
//! photons) between two transforms in the scene. Both sides of a portal
//! simply live next to each other in [`Portal::sides`]; "the other side" is
//! just `sides[1 - i]`, so there's no need for raw cross-referencing pointers.

use cgmath::{InnerSpace, SquareMatrix};

use crate::error::RenderError;
use crate::math::{transform_direction, transform_point, Matrix4, Ray, Vec3};

/// One face of a [`Portal`]: a unit square in its own local XY plane,
/// placed in the scene by `transform`.
#[derive(Clone, Debug, PartialEq)]
pub struct PortalSide {
    transform: Matrix4,
    inverse_transform: Matrix4,
    /// `otherTransform * inverseTransform`: maps a point/direction in this
    /// side's world space directly into the other side's world space.
    through_transform: Matrix4,
    centroid: Vec3,
    normal: Vec3,
}

impl PortalSide {
    fn new(transform: Matrix4, other_transform: Matrix4) -> Result<Self, RenderError> {
        let inverse_transform = transform.invert().ok_or(RenderError::DegeneratePortalTransform)?;
        let centroid = transform_point(&transform, Vec3::new(0.0, 0.0, 0.0));
        let normal = transform_direction(&transform, Vec3::new(0.0, 0.0, -1.0)).normalize();
        let through_transform = other_transform * inverse_transform;
        Ok(Self {
            transform,
            inverse_transform,
            through_transform,
            centroid,
            normal,
        })
    }

    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// The four world-space corners of the unit square, for wireframe
    /// visualization.
    pub fn corners(&self) -> [Vec3; 4] {
        [
            transform_point(&self.transform, Vec3::new(-0.5, -0.5, 0.0)),
            transform_point(&self.transform, Vec3::new(-0.5, 0.5, 0.0)),
            transform_point(&self.transform, Vec3::new(0.5, 0.5, 0.0)),
            transform_point(&self.transform, Vec3::new(0.5, -0.5, 0.0)),
        ]
    }

    /// Carries a point through to the other side's world space.
    pub fn transfer_point(&self, point: Vec3) -> Vec3 {
        transform_point(&self.through_transform, point)
    }

    /// Carries a direction through to the other side's world space.
    pub fn transfer_direction(&self, dir: Vec3) -> Vec3 {
        transform_direction(&self.through_transform, dir)
    }

    /// Intersects `ray` against this side's unit square, returning the
    /// hit parameter `t` on success: a plane intersection followed by an
    /// inverse-transform bounds check.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let ndr = self.normal.dot(ray.direction);
        if ndr == 0.0 {
            return None;
        }
        let t = self.normal.dot(self.centroid - ray.origin) / ndr;
        if t <= 0.0 {
            return None;
        }
        let hit = ray.point_at(t);
        let local = transform_point(&self.inverse_transform, hit);
        if (-0.5..=0.5).contains(&local.x) && (-0.5..=0.5).contains(&local.y) {
            Some(t)
        } else {
            None
        }
    }
}

/// A pair of linked portal sides. Stepping through side `i` emerges from
/// side `1 - i`, facing the direction `transfer_direction` produces.
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    sides: [PortalSide; 2],
}

impl Portal {
    pub fn new(transform1: Matrix4, transform2: Matrix4) -> Result<Self, RenderError> {
        Ok(Self {
            sides: [
                PortalSide::new(transform1, transform2)?,
                PortalSide::new(transform2, transform1)?,
            ],
        })
    }

    pub fn side(&self, index: usize) -> &PortalSide {
        &self.sides[index]
    }

    pub fn other_side(&self, index: usize) -> &PortalSide {
        &self.sides[1 - index]
    }
}
