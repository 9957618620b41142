//! [`Ray`] and [`Hit`], the two structures every other module in the crate
//! passes around.

use cgmath::InnerSpace;

use crate::ids::{FaceId, MaterialId, PortalId, SphereId};

use super::Vec3;

/// A ray with its direction stored normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Constructs a ray, normalizing `direction`.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// `origin + t * direction`.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Identifies which scene primitive a [`Hit`] struck, for callers (radiosity
/// patch lookup, photon-map gather's surface classification) that need to
/// know more than "there was a hit with this material".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitPrimitive {
    Face(FaceId),
    /// A rasterized sub-face of a tessellated sphere, with the owning
    /// sphere and the rasterized face index within it.
    SphereFace(SphereId, u32),
    /// An analytically-intersected sphere (used when `use_rasterized` is
    /// false in [`crate::raycaster::cast`]).
    SphereAnalytic(SphereId),
    /// A portal side, only reported when [`crate::raycaster::cast`] is
    /// asked to test portals.
    Portal(PortalId),
}

/// Nearest-so-far intersection record. `t` is initialized to `+infinity`;
/// a hit is valid (has actually struck something) only if `t` is finite,
/// which callers test via [`Hit::is_hit`].
///
/// Invariant: any [`Hit`] with `is_hit()` true has `t >= EPSILON` and
/// `normal` is unit length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub normal: Vec3,
    pub uv: (f32, f32),
    pub material: MaterialId,
    pub primitive: HitPrimitive,
}

impl Hit {
    /// The "no hit yet" sentinel: `t = +infinity`.
    pub fn none() -> Self {
        Self {
            t: f32::INFINITY,
            normal: Vec3::new(0.0, 0.0, 0.0),
            uv: (0.0, 0.0),
            material: MaterialId(0),
            primitive: HitPrimitive::Face(FaceId(0)),
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_at_follows_parametrization() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.point_at(5.0), Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 4.0, 0.0));
        assert!((ray.direction.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn none_hit_is_not_a_hit() {
        assert!(!Hit::none().is_hit());
    }
}
