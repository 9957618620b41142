//! The radiosity solver: a stratified Monte-Carlo form-factor matrix and
//! Southwell shooting over the scene's rasterized patches (`scene.patches()`
//! — original quads plus tessellated sphere quads, the same list
//! `use_rasterized` ray casting sees).

use cgmath::InnerSpace;
use rand::Rng;

use crate::math::{Rgb, Vec3};
use crate::options::RenderOptions;
use crate::raycaster;
use crate::scene::Scene;

/// Minimum `omega . n_i` before a form-factor sample is rejected as
/// grazing or back-facing.
const GRAZING_EPSILON: f32 = 0.01;
/// Slack subtracted from the sampled distance when accepting a
/// visibility ray: accept only if the hit distance is >= d - 0.01.
const VISIBILITY_SLACK: f32 = 0.01;

/// Per-patch state plus the flattened `num_patches x num_patches`
/// form-factor matrix, row-major: entry `(i, j)` lives at
/// `i * num_patches + j`.
pub struct Radiosity {
    num_patches: usize,
    form_factors: Vec<f32>,
    area: Vec<f32>,
    reflectivity: Vec<Rgb>,
    undistributed: Vec<Rgb>,
    absorbed: Vec<Rgb>,
    radiance: Vec<Rgb>,
}

impl Radiosity {
    /// Allocates per-patch arrays sized to the scene's current patch count
    /// and initializes `undistributed`/`radiance` from each patch's emitted
    /// color. A subdivision re-runs this, resetting the solver from the
    /// current scene's emitted colors.
    pub fn new(scene: &Scene) -> Self {
        let patches = scene.patches();
        let num_patches = patches.len();
        let area = patches.iter().map(|p| p.area).collect();
        let reflectivity = patches
            .iter()
            .map(|p| scene.material(p.material).reflective)
            .collect();
        let emitted: Vec<Rgb> = patches
            .iter()
            .map(|p| scene.material(p.material).emitted)
            .collect();
        Self {
            num_patches,
            form_factors: vec![0.0; num_patches * num_patches],
            area,
            reflectivity,
            undistributed: emitted.clone(),
            absorbed: vec![Rgb::ZERO; num_patches],
            radiance: emitted,
        }
    }

    pub fn num_patches(&self) -> usize {
        self.num_patches
    }

    pub fn radiance(&self, patch: usize) -> Rgb {
        self.radiance[patch]
    }

    pub fn undistributed(&self, patch: usize) -> Rgb {
        self.undistributed[patch]
    }

    pub fn absorbed(&self, patch: usize) -> Rgb {
        self.absorbed[patch]
    }

    pub fn form_factor(&self, i: usize, j: usize) -> f32 {
        self.form_factors[i * self.num_patches + j]
    }

    /// The patch with the largest `|undistributed| * area`, the one
    /// `iterate()` would shoot from next. Also used as the reference patch
    /// for form-factor visualization, since a full `num_patches^2` matrix
    /// has no single natural 2-D projection.
    pub fn max_undistributed_patch(&self) -> Option<usize> {
        (0..self.num_patches).max_by(|&a, &b| {
            let key = |p: usize| self.undistributed[p].length() * self.area[p];
            key(a).partial_cmp(&key(b)).unwrap()
        })
    }

    fn set_form_factor(&mut self, i: usize, j: usize, value: f32) {
        self.form_factors[i * self.num_patches + j] = value;
    }

    /// Estimates every off-diagonal form factor via `num_form_factor_samples`
    /// stratified sample pairs.
    pub fn compute_form_factors(&mut self, scene: &Scene, options: &RenderOptions, rng: &mut impl Rng) {
        let patches = scene.patches();
        let samples = options.num_form_factor_samples.max(1);
        for i in 0..self.num_patches {
            for j in 0..self.num_patches {
                if i == j {
                    self.set_form_factor(i, j, 0.0);
                    continue;
                }
                let value = estimate_form_factor(scene, options, &patches[i], &patches[j], samples, rng);
                self.set_form_factor(i, j, value);
            }
        }
    }

    /// One Southwell shooting iteration: shoots from the patch with the
    /// largest `|undistributed| * area`,
    /// distributing to every other patch. Returns the scene-total
    /// undistributed magnitude, for the caller to judge convergence.
    pub fn iterate(&mut self) -> f32 {
        let shooter = match self.max_undistributed_patch() {
            Some(i) if self.num_patches > 0 => i,
            _ => return 0.0,
        };

        let shot = self.undistributed[shooter];
        if shot.length() <= 0.0 {
            return 0.0;
        }

        for j in 0..self.num_patches {
            if j == shooter {
                continue;
            }
            let f = self.form_factor(j, shooter);
            if f <= 0.0 {
                continue;
            }
            let rho = self.reflectivity[j];
            let delta = shot * rho * f;
            self.radiance[j] += delta;
            self.undistributed[j] += delta;
            self.absorbed[j] += shot * (Rgb::ONE - rho) * f;
        }
        self.undistributed[shooter] = Rgb::ZERO;

        self.undistributed.iter().map(|u| u.length()).sum()
    }
}

fn estimate_form_factor(
    scene: &Scene,
    options: &RenderOptions,
    patch_i: &crate::scene::Patch,
    patch_j: &crate::scene::Patch,
    samples: u32,
    rng: &mut impl Rng,
) -> f32 {
    let mut sum = 0.0_f32;
    for s in 0..samples {
        let (p_i, p_j) = if s == 0 {
            (patch_i.positions_centroid(), patch_j.positions_centroid())
        } else {
            (sample_patch_point(patch_i, rng), sample_patch_point(patch_j, rng))
        };
        let delta = p_j - p_i;
        let d = delta.magnitude();
        if d <= 0.0 {
            continue;
        }
        let omega = delta / d;
        if omega.dot(patch_i.normal) < GRAZING_EPSILON {
            continue;
        }
        let ray = crate::math::Ray::new(p_i, omega);
        let hit = raycaster::cast(scene, &ray, options, true, false);
        if !hit.is_hit() || hit.t < d - VISIBILITY_SLACK {
            continue;
        }
        let cos_i = omega.dot(patch_i.normal).max(0.0);
        let cos_j = (-omega).dot(patch_j.normal).max(0.0);
        let denom = samples as f32 * std::f32::consts::PI * d * d + patch_j.area / samples as f32;
        if denom <= 0.0 {
            continue;
        }
        sum += (cos_i * cos_j / denom).max(0.0);
    }
    (sum * patch_j.area).max(0.0)
}

fn sample_patch_point(patch: &crate::scene::Patch, rng: &mut impl Rng) -> Vec3 {
    let p = patch.positions;
    let u: f32 = rng.gen();
    let v: f32 = rng.gen();
    // Bilinear interpolation across the quad; adequate for a Monte-Carlo
    // sample point even when the quad is non-planar.
    let bottom = p[0] + (p[1] - p[0]) * u;
    let top = p[3] + (p[2] - p[3]) * u;
    bottom + (top - bottom) * v
}

impl crate::scene::Patch {
    fn positions_centroid(&self) -> Vec3 {
        let p = self.positions;
        (p[0] + p[1] + p[2] + p[3]) * 0.25
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::builder::SceneBuilder;
    use crate::scene::material::Material;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn two_facing_quads() -> Scene {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::new(0.7, 0.7, 0.7), Rgb::ZERO, Rgb::ZERO, 1.0));
        let light = builder.add_material("light", Material::new(Rgb::ZERO, Rgb::ZERO, Rgb::new(5.0, 5.0, 5.0), 1.0));

        let a0 = builder.add_vertex(Vec3::new(-0.5, 0.0, -0.5), (0.0, 0.0));
        let a1 = builder.add_vertex(Vec3::new(0.5, 0.0, -0.5), (1.0, 0.0));
        let a2 = builder.add_vertex(Vec3::new(0.5, 0.0, 0.5), (1.0, 1.0));
        let a3 = builder.add_vertex(Vec3::new(-0.5, 0.0, 0.5), (0.0, 1.0));
        builder.add_face([a0, a1, a2, a3], light, true).unwrap();

        let b0 = builder.add_vertex(Vec3::new(-0.5, -1.0, -0.5), (0.0, 0.0));
        let b1 = builder.add_vertex(Vec3::new(-0.5, -1.0, 0.5), (1.0, 0.0));
        let b2 = builder.add_vertex(Vec3::new(0.5, -1.0, 0.5), (1.0, 1.0));
        let b3 = builder.add_vertex(Vec3::new(0.5, -1.0, -0.5), (0.0, 1.0));
        builder.add_face([b0, b1, b2, b3], white, false).unwrap();

        builder.build(8, 4)
    }

    #[test]
    fn diagonal_form_factors_are_zero() {
        let scene = two_facing_quads();
        let mut options = RenderOptions::default();
        options.num_form_factor_samples = 16;
        let mut radiosity = Radiosity::new(&scene);
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        radiosity.compute_form_factors(&scene, &options, &mut rng);
        for i in 0..radiosity.num_patches() {
            assert_eq!(radiosity.form_factor(i, i), 0.0);
        }
    }

    #[test]
    fn iteration_reduces_total_undistributed_energy() {
        let scene = two_facing_quads();
        let mut options = RenderOptions::default();
        options.num_form_factor_samples = 32;
        let mut radiosity = Radiosity::new(&scene);
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        radiosity.compute_form_factors(&scene, &options, &mut rng);
        let before: f32 = (0..radiosity.num_patches()).map(|i| radiosity.undistributed(i).length()).sum();
        radiosity.iterate();
        let after: f32 = (0..radiosity.num_patches()).map(|i| radiosity.undistributed(i).length()).sum();
        assert!(after <= before);
    }
}
