//! The brute-force ray caster: tests every original quad face, every
//! primitive (rasterized or analytic, caller's choice), and every portal
//! side, keeping the nearest hit. There is no acceleration structure here
//! beyond the photon kd-tree used elsewhere; linear scan keeps the caster's
//! behavior easy to reason about and to compare against the rasterized path.

use cgmath::{InnerSpace, Vector3};

use crate::ids::{FaceId, PortalId, SphereId};
use crate::math::{cramer3, Hit, HitPrimitive, Ray, BARYCENTRIC_EPSILON, EPSILON};
use crate::options::RenderOptions;
use crate::scene::{Face, Scene};

/// Casts `ray` against every face, primitive, and (optionally) portal side
/// in `scene`, returning the nearest [`Hit`] (`Hit::none()` on a miss).
///
/// `use_rasterized` selects whether spheres are tested as their tessellated
/// quads (`scene.patches()`, matching what radiosity sees) or analytically;
/// the two must agree closely enough that switching between them does not
/// change which side of a surface a ray lands on, but they are not required
/// to report bit-identical `t`.
///
/// `test_portals` additionally tests every portal side and can report a
/// portal hit instead of a surface hit; the ray-trace evaluator wants this,
/// the radiosity form-factor visibility test does not.
pub fn cast(scene: &Scene, ray: &Ray, options: &RenderOptions, use_rasterized: bool, test_portals: bool) -> Hit {
    let mut best = Hit::none();

    for (i, face) in scene.faces().iter().enumerate() {
        if let Some(hit) = intersect_face(scene, face, ray, options.intersect_backfacing) {
            if hit.t < best.t {
                best = Hit {
                    primitive: HitPrimitive::Face(FaceId::from_index(i)),
                    ..hit
                };
            }
        }
    }

    if use_rasterized {
        for patch in scene.patches() {
            if let crate::scene::PatchOwner::Sphere(sphere_id, local) = patch.owner {
                if let Some(hit) = intersect_quad(
                    patch.positions,
                    patch.material,
                    ray,
                    options.intersect_backfacing,
                ) {
                    if hit.t < best.t {
                        best = Hit {
                            primitive: HitPrimitive::SphereFace(sphere_id, local),
                            ..hit
                        };
                    }
                }
            }
        }
    } else {
        for (i, sphere) in scene.spheres().iter().enumerate() {
            if let Some(sphere_hit) = sphere.intersect(ray) {
                if sphere_hit.t < best.t {
                    best = Hit {
                        t: sphere_hit.t,
                        normal: sphere_hit.normal,
                        uv: sphere_hit.uv,
                        material: sphere.material,
                        primitive: HitPrimitive::SphereAnalytic(SphereId::from_index(i)),
                    };
                }
            }
        }
    }

    if test_portals {
        for side in 0..scene.num_portal_sides() {
            let id = PortalId::from_index(side);
            if let Some(t) = scene.portal_side(id).intersect_ray(ray) {
                if t < best.t {
                    best = Hit {
                        t,
                        normal: scene.portal_side(id).normal(),
                        uv: (0.0, 0.0),
                        material: best.material,
                        primitive: HitPrimitive::Portal(id),
                    };
                }
            }
        }
    }

    best
}

fn intersect_face(scene: &Scene, face: &Face, ray: &Ray, intersect_backfacing: bool) -> Option<Hit> {
    let positions = [
        scene.vertex_position(face.vertices[0]),
        scene.vertex_position(face.vertices[1]),
        scene.vertex_position(face.vertices[2]),
        scene.vertex_position(face.vertices[3]),
    ];
    intersect_quad(positions, face.material, ray, intersect_backfacing)
}

fn intersect_quad(
    positions: [crate::math::Vec3; 4],
    material: crate::ids::MaterialId,
    ray: &Ray,
    intersect_backfacing: bool,
) -> Option<Hit> {
    let first = intersect_triangle(positions[0], positions[1], positions[2], ray, intersect_backfacing);
    let second = intersect_triangle(positions[0], positions[2], positions[3], ray, intersect_backfacing);
    match (first, second) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { to_hit(a, material) } else { to_hit(b, material) }),
        (Some(a), None) => Some(to_hit(a, material)),
        (None, Some(b)) => Some(to_hit(b, material)),
        (None, None) => None,
    }
}

fn to_hit((t, normal, uv): (f32, crate::math::Vec3, (f32, f32)), material: crate::ids::MaterialId) -> Hit {
    Hit {
        t,
        normal,
        uv,
        material,
        primitive: HitPrimitive::Face(FaceId::from_index(0)),
    }
}

/// Returns `(t, normal, uv)` for the nearer valid intersection, or `None`.
/// See [`crate::math::matrix::cramer3`]'s docstring for the barycentric
/// setup this solves.
fn intersect_triangle(
    p0: crate::math::Vec3,
    p1: crate::math::Vec3,
    p2: crate::math::Vec3,
    ray: &Ray,
    intersect_backfacing: bool,
) -> Option<(f32, crate::math::Vec3, (f32, f32))> {
    let columns: [Vector3<f32>; 3] = [p0 - p1, p0 - p2, ray.direction];
    let rhs = p0 - ray.origin;
    let solution = cramer3(columns, rhs)?;
    let (beta, gamma, t) = (solution.x, solution.y, solution.z);
    let alpha = 1.0 - beta - gamma;
    let lo = -BARYCENTRIC_EPSILON;
    let hi = 1.0 + BARYCENTRIC_EPSILON;
    if alpha < lo || beta < lo || gamma < lo || alpha > hi || beta > hi || gamma > hi {
        return None;
    }
    if t < EPSILON {
        return None;
    }
    let normal = (p1 - p0).cross(p2 - p0);
    if normal.magnitude2() == 0.0 {
        return None;
    }
    let normal = normal.normalize();
    if !intersect_backfacing && normal.dot(ray.direction) > 0.0 {
        return None;
    }
    let uv = (beta, gamma);
    Some((t, normal, uv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MaterialId;
    use crate::math::Vec3;
    use crate::scene::builder::SceneBuilder;
    use crate::scene::material::Material;
    use crate::math::Rgb;

    fn quad_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::ONE, Rgb::ZERO, Rgb::ZERO, 1.0));
        let v0 = builder.add_vertex(Vec3::new(-1.0, -1.0, 0.0), (0.0, 0.0));
        let v1 = builder.add_vertex(Vec3::new(1.0, -1.0, 0.0), (1.0, 0.0));
        let v2 = builder.add_vertex(Vec3::new(1.0, 1.0, 0.0), (1.0, 1.0));
        let v3 = builder.add_vertex(Vec3::new(-1.0, 1.0, 0.0), (0.0, 1.0));
        builder.add_face([v0, v1, v2, v3], white, false).unwrap();
        builder.build(8, 4)
    }

    #[test]
    fn ray_through_center_hits_the_quad() {
        let scene = quad_scene();
        let options = RenderOptions::default();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = cast(&scene, &ray, &options, true, false);
        assert!(hit.is_hit());
        assert!((hit.t - 5.0).abs() < 1e-4);
        assert_eq!(hit.material, MaterialId(0));
    }

    #[test]
    fn ray_missing_the_quad_does_not_hit() {
        let scene = quad_scene();
        let options = RenderOptions::default();
        let ray = Ray::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = cast(&scene, &ray, &options, true, false);
        assert!(!hit.is_hit());
    }

    #[test]
    fn backface_culling_rejects_rays_hitting_the_rear() {
        let scene = quad_scene();
        let mut options = RenderOptions::default();
        options.intersect_backfacing = false;
        let ray_from_behind = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = cast(&scene, &ray_from_behind, &options, true, false);
        assert!(!hit.is_hit());

        options.intersect_backfacing = true;
        let hit = cast(&scene, &ray_from_behind, &options, true, false);
        assert!(hit.is_hit());
    }
}
