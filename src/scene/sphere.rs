//! Analytic spheres: intersectable directly by the ray caster, and
//! tessellatable into a `horiz x vert` grid of quad patches for radiosity.

use cgmath::InnerSpace;

use crate::ids::MaterialId;
use crate::math::{Ray, Vec3, EPSILON};

use super::face::triangle_area;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: MaterialId,
}

/// The result of [`Sphere::intersect`]: everything the ray caster needs to
/// fold into a [`crate::math::Hit`] without this module depending on
/// `math::Hit`'s `primitive` bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereHit {
    pub t: f32,
    pub normal: Vec3,
    pub uv: (f32, f32),
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    /// Analytic ray/sphere intersection via the quadratic formula. Returns
    /// the nearer root with `t > EPSILON`, or `None` on a miss or a
    /// behind-the-epsilon-only intersection.
    pub fn intersect(&self, ray: &Ray) -> Option<SphereHit> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_disc = discriminant.sqrt();
        let t_near = -b - sqrt_disc;
        let t_far = -b + sqrt_disc;
        let t = if t_near > EPSILON {
            t_near
        } else if t_far > EPSILON {
            t_far
        } else {
            return None;
        };
        let point = ray.point_at(t);
        let normal = (point - self.center).normalize();
        Some(SphereHit {
            t,
            normal,
            uv: spherical_uv(normal),
        })
    }

    /// Tessellates into a `horiz x vert` grid of quads (`horiz` must be
    /// even, validated by [`crate::options::RenderOptions::validate`]).
    /// Returns one [`Face`]-shaped quad plus its own private vertex storage
    /// per quad (spheres do not share the scene's main vertex arena; each
    /// tessellated quad owns its four corner positions directly).
    pub fn tessellate(&self, horiz: u32, vert: u32) -> Vec<TessellatedQuad> {
        let mut quads = Vec::with_capacity((horiz * vert) as usize);
        for j in 0..vert {
            for i in 0..horiz {
                let corner = |i: u32, j: u32| self.grid_point(i, j, horiz, vert);
                let positions = [
                    corner(i, j),
                    corner(i + 1, j),
                    corner(i + 1, j + 1),
                    corner(i, j + 1),
                ];
                quads.push(TessellatedQuad {
                    positions,
                    material: self.material,
                });
            }
        }
        quads
    }

    fn grid_point(&self, i: u32, j: u32, horiz: u32, vert: u32) -> Vec3 {
        let phi = (i as f32 / horiz as f32) * std::f32::consts::TAU;
        let theta = (j as f32 / vert as f32) * std::f32::consts::PI;
        let dir = Vec3::new(
            theta.sin() * phi.cos(),
            theta.cos(),
            theta.sin() * phi.sin(),
        );
        self.center + dir * self.radius
    }
}

/// One quad of a sphere's rasterized tessellation, with its own corner
/// positions (not shared with the scene's vertex arena).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TessellatedQuad {
    pub positions: [Vec3; 4],
    pub material: MaterialId,
}

impl TessellatedQuad {
    /// Average-of-two-triangle-normals, matching [`Face::normal`]'s
    /// convention so radiosity treats sphere patches identically to mesh
    /// patches.
    pub fn normal(&self) -> Vec3 {
        let p = self.positions;
        let n0 = (p[1] - p[0]).cross(p[2] - p[0]);
        let n1 = (p[2] - p[0]).cross(p[3] - p[0]);
        let n = n0 + n1;
        if n.magnitude2() > 0.0 {
            n.normalize()
        } else {
            n
        }
    }

    pub fn area(&self) -> f32 {
        let p = self.positions;
        triangle_area(p[0], p[1], p[2]) + triangle_area(p[0], p[2], p[3])
    }

    pub fn centroid(&self) -> Vec3 {
        let p = self.positions;
        (p[0] + p[1] + p[2] + p[3]) * 0.25
    }
}

fn spherical_uv(normal: Vec3) -> (f32, f32) {
    let s = 0.5 + normal.z.atan2(normal.x) / std::f32::consts::TAU;
    let t = 0.5 - normal.y.asin() / std::f32::consts::PI;
    (s, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_sphere_hit_from_outside() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 0.0), 1.0, MaterialId(0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = sphere.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::new(0.0, 0.0, 1.0)).magnitude() < 1e-4);
    }

    #[test]
    fn off_axis_ray_misses() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 0.0), 1.0, MaterialId(0));
        let ray = Ray::new(Vec3::new(2.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(sphere.intersect(&ray).is_none());
    }

    #[test]
    fn tessellation_produces_horiz_times_vert_quads() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 0.0), 1.0, MaterialId(0));
        let quads = sphere.tessellate(8, 4);
        assert_eq!(quads.len(), 32);
        for quad in &quads {
            assert!(quad.area() > 0.0);
        }
    }

    #[test]
    fn tessellated_surface_area_approaches_sphere_area() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 0.0), 1.0, MaterialId(0));
        let quads = sphere.tessellate(32, 32);
        let total: f32 = quads.iter().map(TessellatedQuad::area).sum();
        let analytic = 4.0 * std::f32::consts::PI * 1.0 * 1.0;
        assert!((total - analytic).abs() / analytic < 0.02);
    }
}
