//! Sampler & RNG: uniform `[0,1)`, unit-disk/unit-ball rejection sampling, a
//! cosine-weighted hemisphere direction (Malley's method, via the concentric
//! unit disk), a roughness cone perturbation for glossy reflection, and the
//! stratified 2-D sample grid built for area-light sampling.

use cgmath::InnerSpace;
use rand::Rng;

use crate::math::Vec3;

/// A uniform point in `[-1, 1]^3` rejected down to the unit ball
/// (`|v|^2 <= 1`).
pub fn uniform_in_unit_ball(rng: &mut impl Rng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.magnitude2() <= 1.0 {
            return v;
        }
    }
}

/// A uniform point in the unit disk in the XY plane (`z = 0`), used for
/// depth-of-field-style lens sampling if a host ever wants it.
pub fn uniform_in_unit_disk(rng: &mut impl Rng) -> (f32, f32) {
    loop {
        let x = rng.gen_range(-1.0..1.0);
        let y = rng.gen_range(-1.0..1.0);
        if x * x + y * y <= 1.0 {
            return (x, y);
        }
    }
}

/// Perturbs `v` by a random offset in a ball of radius `0.5 * roughness`,
/// the glossy-reflection cone used for optionally-glossy surfaces: sample a
/// vector in the unit ball, scale by `0.5 * roughness`, add.
pub fn perturb_vector(v: Vec3, roughness: f32, rng: &mut impl Rng) -> Vec3 {
    v + uniform_in_unit_ball(rng) * (0.5 * roughness)
}

/// A cosine-weighted random direction in the hemisphere about `normal`,
/// used for diffuse photon bounce directions. Malley's method: sample a
/// point on the unit disk, lift it onto the hemisphere with
/// `z = sqrt(1 - x^2 - y^2)`, then rotate `(x, y, z)` from the local frame
/// where `z` is up into world space along `normal`. The resulting direction
/// has probability density `cos(theta) / pi`, unlike a uniform-in-the-ball
/// direction.
pub fn cosine_weighted_hemisphere(normal: Vec3, rng: &mut impl Rng) -> Vec3 {
    let (x, y) = uniform_in_unit_disk(rng);
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    let (tangent, bitangent) = orthonormal_basis(normal);
    (tangent * x + bitangent * y + normal * z).normalize()
}

/// Builds an orthonormal `(tangent, bitangent)` pair perpendicular to the
/// unit vector `n`, picking whichever world axis is least parallel to `n`
/// as a seed to avoid a degenerate cross product.
fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let seed = if n.x.abs() > 0.9 {
        Vec3::new(0.0, 1.0, 0.0)
    } else {
        Vec3::new(1.0, 0.0, 0.0)
    };
    let tangent = seed.cross(n).normalize();
    let bitangent = n.cross(tangent);
    (tangent, bitangent)
}

/// A stratified `dimension x dimension` grid, where
/// `dimension = ceil(sqrt(num_shadow_samples))`, enumerated in row-major
/// `(col, row)` order. Currently consumed by nothing but its own tests —
/// shadow enumeration stays centroid-only, see `DESIGN.md` — but it is
/// implemented and tested so a future soft-shadow pass has it ready.
#[derive(Clone, Debug)]
pub struct StratifiedGrid {
    dimension: u32,
}

impl StratifiedGrid {
    pub fn new(num_shadow_samples: u32) -> Self {
        let s = (num_shadow_samples as f32).sqrt();
        let dimension = s.ceil() as u32;
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Cell `(col, row)` for sample index `i`, in `[0, dimension)^2`.
    pub fn cell(&self, i: u32) -> (u32, u32) {
        (i % self.dimension, i / self.dimension)
    }

    /// A jittered point within cell `(col, row)`, mapped into `[0, 1)^2`.
    pub fn jittered_point(&self, col: u32, row: u32, rng: &mut impl Rng) -> (f32, f32) {
        let cell_size = 1.0 / self.dimension as f32;
        let jx: f32 = rng.gen();
        let jy: f32 = rng.gen();
        (
            (col as f32 + jx) * cell_size,
            (row as f32 + jy) * cell_size,
        )
    }
}
