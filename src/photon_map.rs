//! The photon mapper: emission from area lights, transport with
//! portal-aware casting and a contribution-weighted reflect-then-diffuse
//! bounce rule, and an adaptive-radius indirect-gather query.

use cgmath::InnerSpace;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
#[cfg(feature = "rayon")]
use rayon::iter::{IndexedParallelIterator as _, IntoParallelRefIterator as _, ParallelIterator as _};

use crate::error::DiagnosticLatch;
use crate::ids::{FaceId, PortalId};
use crate::math::{HitPrimitive, Rgb, Vec3};
use crate::options::RenderOptions;
use crate::raycaster;
use crate::sampler::cosine_weighted_hemisphere;
use crate::scene::{BoundingBox, Scene};

use crate::kdtree::{KdTree, Photon};

/// Photon survival threshold: a photon whose energy drops below this is
/// considered absorbed rather than bounced further.
pub const PHOTON_ENERGY_CUTOFF: f32 = 0.01;
/// Photon bounce cap, independent of the energy cutoff.
pub const PHOTON_ITER_MAX: u32 = 32;
/// Seeds the adaptive gather-radius doubling search.
const GUESS_CONSTANT: f32 = 1.0;
/// The indirect-gather query doubles its search box at most this many times
/// before returning the best estimate available.
const MAX_GATHER_DOUBLINGS: u32 = 32;

static EMPTY_TREE_LATCH: DiagnosticLatch = DiagnosticLatch::new();

/// One photon's emission origin: which light face it leaves from and its
/// per-photon share of that face's emitted energy.
struct EmitJob {
    face_id: FaceId,
    area_per_photon: f32,
}

/// Emits `options.num_photons_to_shoot` photons from the scene's lights,
/// tracing each one into `tree`. With the `rayon` feature, independent
/// photon paths are traced across threads (each photon gets its own
/// deterministically-seeded generator derived from `rng`, since a single
/// `rng` can't be shared across threads) and the resulting photons are
/// inserted into `tree` afterward; without it, photons are traced and
/// inserted one at a time using `rng` directly.
pub fn emit_photons(scene: &Scene, options: &RenderOptions, rng: &mut impl Rng, tree: &mut KdTree) {
    let lights = scene.lights();
    if lights.is_empty() || options.num_photons_to_shoot == 0 {
        return;
    }
    let counts = lights.photon_counts(options.num_photons_to_shoot, scene.faces(), scene.vertices());

    let mut jobs = Vec::with_capacity(options.num_photons_to_shoot as usize);
    for (&face_id, &count) in lights.faces().iter().zip(counts.iter()) {
        if count == 0 {
            continue;
        }
        let area = scene.face(face_id).area(scene.vertices());
        let area_per_photon = area / count as f32;
        jobs.extend((0..count).map(|_| EmitJob { face_id, area_per_photon }));
    }

    run_jobs(scene, options, &lights, &jobs, rng, tree);
}

#[cfg(feature = "rayon")]
fn run_jobs(
    scene: &Scene,
    options: &RenderOptions,
    lights: &crate::scene::LightList,
    jobs: &[EmitJob],
    rng: &mut impl Rng,
    tree: &mut KdTree,
) {
    let seed: u64 = rng.gen();
    let stored: Vec<Photon> = jobs
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, job)| {
            let mut job_rng = Xoshiro256StarStar::seed_from_u64(seed ^ (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            emit_one(scene, options, lights, job, &mut job_rng)
        })
        .collect();
    for photon in stored {
        tree.add(photon);
    }
}

#[cfg(not(feature = "rayon"))]
fn run_jobs(
    scene: &Scene,
    options: &RenderOptions,
    lights: &crate::scene::LightList,
    jobs: &[EmitJob],
    rng: &mut impl Rng,
    tree: &mut KdTree,
) {
    for job in jobs {
        for photon in emit_one(scene, options, lights, job, rng) {
            tree.add(photon);
        }
    }
}

/// Emits and transports one photon, returning every stored-photon record it
/// leaves behind (empty if it leaves the scene or has no energy to begin
/// with).
fn emit_one(
    scene: &Scene,
    options: &RenderOptions,
    lights: &crate::scene::LightList,
    job: &EmitJob,
    rng: &mut impl Rng,
) -> Vec<Photon> {
    let face = scene.face(job.face_id);
    let material = scene.material(face.material);
    let normal = face.normal(scene.vertices());
    let point = lights.sample_point(face, scene.vertices(), rng);
    let direction = cosine_weighted_hemisphere(normal, rng);
    let energy = material.emitted * job.area_per_photon;
    let initial_energy = energy.length();
    if initial_energy <= 0.0 {
        return Vec::new();
    }
    trace_photon(scene, options, point, direction, energy, initial_energy, rng)
}

/// Transports a single photon from `origin`/`direction` through the scene,
/// returning a record at every non-initial hit and deciding
/// reflect-vs-diffuse at each bounce.
#[allow(clippy::too_many_arguments)]
fn trace_photon(
    scene: &Scene,
    options: &RenderOptions,
    mut origin: Vec3,
    mut direction: Vec3,
    mut energy: Rgb,
    initial_energy: f32,
    rng: &mut impl Rng,
) -> Vec<Photon> {
    let mut stored = Vec::new();
    for bounce in 0..PHOTON_ITER_MAX {
        let hit = match cast_through_portals(scene, options, origin, direction) {
            Some(hit) => hit,
            None => return stored,
        };

        let hit_point = origin + direction * hit.t;
        if bounce > 0 {
            stored.push(Photon {
                position: hit_point,
                incoming_direction: direction,
                energy,
            });
        }

        let material = scene.material(hit.material);
        let reflective_energy = energy * material.reflective;
        let offset_origin = hit_point + hit.normal * crate::math::EPSILON;

        if reflective_energy.length() > initial_energy * PHOTON_ENERGY_CUTOFF {
            direction = reflect(direction, hit.normal);
            energy = reflective_energy;
        } else {
            direction = cosine_weighted_hemisphere(hit.normal, rng);
            energy = energy * material.diffuse_at(hit.uv);
        }
        origin = offset_origin;
    }
    stored
}

/// Casts `(origin, direction)`, transferring through any portal sides hit,
/// up to `portal_recursion_depth + 1` casts, returning the first non-portal
/// hit or `None` on a miss / portal-budget exhaustion.
fn cast_through_portals(
    scene: &Scene,
    options: &RenderOptions,
    mut origin: Vec3,
    mut direction: Vec3,
) -> Option<crate::math::Hit> {
    for _ in 0..=options.portal_recursion_depth {
        let ray = crate::math::Ray::new(origin, direction);
        let hit = raycaster::cast(scene, &ray, options, false, true);
        if !hit.is_hit() {
            return None;
        }
        if let HitPrimitive::Portal(id) = hit.primitive {
            let side = scene.portal_side(id);
            let hit_point = ray.point_at(hit.t);
            let transferred_point = side.transfer_point(hit_point);
            let transferred_direction = side.transfer_direction(direction);
            origin = transferred_point + transferred_direction * crate::math::EPSILON;
            direction = transferred_direction;
            continue;
        }
        return Some(hit);
    }
    None
}

fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - normal * (2.0 * direction.dot(normal))
}

/// One photon accepted by a gather pass, already reduced to the fields
/// `gather_indirect` needs. Keeping direct and portal-transferred
/// contributions as self-contained records, rather than parallel index
/// arrays into the kd-tree's photon list, rules out index-mismatch bugs
/// by construction.
struct GatheredContribution {
    energy: Rgb,
    distance_squared: f32,
}

/// Estimates indirect radiance arriving at `point` with surface `normal`.
pub fn gather_indirect(scene: &Scene, options: &RenderOptions, tree: &KdTree, point: Vec3, normal: Vec3) -> Rgb {
    if tree.num_photons() == 0 {
        EMPTY_TREE_LATCH.warn_once("gather_indirect called with an empty photon map");
        return Rgb::ZERO;
    }

    let target = options.num_photons_to_collect.max(1);
    let scene_extent = {
        let bounds = scene.bounds();
        (bounds.max - bounds.min).magnitude()
    };

    let mut guess = GUESS_CONSTANT * target as f32 / tree.num_photons() as f32;
    let mut half_extent = guess * scene_extent / 2.0;
    let box_at = |center: Vec3, half_extent: f32| BoundingBox {
        min: center - Vec3::new(half_extent, half_extent, half_extent),
        max: center + Vec3::new(half_extent, half_extent, half_extent),
    };

    let mut doublings = 0;
    while tree.count(&box_at(point, half_extent)) < target as usize && doublings < MAX_GATHER_DOUBLINGS {
        guess *= 2.0;
        half_extent = guess * scene_extent / 2.0;
        doublings += 1;
    }

    let mut contributions = Vec::new();
    let mut indices = Vec::new();
    tree.collect(&box_at(point, half_extent), &mut indices);
    for &index in &indices {
        let photon = tree.photon(index);
        if photon.incoming_direction.dot(normal) < 0.0 {
            contributions.push(GatheredContribution {
                energy: photon.energy,
                distance_squared: (photon.position - point).magnitude2(),
            });
        }
    }

    for side_index in 0..scene.num_portal_sides() {
        let id = PortalId::from_index(side_index);
        let side = scene.portal_side(id);
        let transferred_point = side.transfer_point(point);
        let transferred_normal = side.transfer_direction(normal).normalize();

        let mut portal_indices = Vec::new();
        tree.collect(&box_at(transferred_point, half_extent), &mut portal_indices);
        for &index in &portal_indices {
            let photon = tree.photon(index);
            if photon.incoming_direction.dot(transferred_normal) >= 0.0 {
                continue;
            }
            let to_point = transferred_point - photon.position;
            let ray = crate::math::Ray::new(photon.position, to_point);
            let hit = raycaster::cast(scene, &ray, options, false, true);
            let crosses_this_side = matches!(hit.primitive, HitPrimitive::Portal(hit_id) if hit_id == id)
                && hit.is_hit()
                && hit.t * hit.t <= to_point.magnitude2() + crate::math::EPSILON;
            if crosses_this_side {
                contributions.push(GatheredContribution {
                    energy: photon.energy,
                    distance_squared: (photon.position - transferred_point).magnitude2(),
                });
            }
        }
    }

    if contributions.is_empty() {
        return Rgb::ZERO;
    }

    let radius_squared = contributions
        .iter()
        .map(|c| c.distance_squared)
        .fold(0.0_f32, f32::max)
        .max(1e-6);
    let sum = contributions
        .iter()
        .fold(Rgb::ZERO, |acc, c| acc + c.energy);
    sum * (1.0 / (std::f32::consts::PI * radius_squared))
}
