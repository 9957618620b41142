//! The recursive ray-trace evaluator and the progressive coarse-to-fine
//! pixel scheduler. Both sit on top of [`crate::raycaster::cast`], the
//! photon map's [`crate::photon_map::gather_indirect`], and
//! `scene.lights()`'s shadow/light-ray enumeration.

use cgmath::InnerSpace;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};

use crate::ids::FaceId;
use crate::kdtree::KdTree;
use crate::math::{HitPrimitive, Rgb, Ray, Vec3};
use crate::options::RenderOptions;
use crate::raycaster;
use crate::sampler::perturb_vector;
use crate::scene::Scene;

/// Everything `trace_ray` needs beyond the ray itself and the bounce
/// budgets: the scene, the options, and (if photon gathering is enabled)
/// the photon map to gather from. Bundled so the recursive signature stays
/// short.
pub struct TraceContext<'a> {
    pub scene: &'a Scene,
    pub options: &'a RenderOptions,
    pub photon_map: Option<&'a KdTree>,
}

/// Evaluates the radiance arriving back along `ray` in seven steps: cast,
/// portal transfer, emissive short-circuit, ambient term, direct light,
/// reflection, and return.
pub fn trace_ray(ctx: &TraceContext, ray: &Ray, bounce_budget: u32, portal_budget: u32, rng: &mut impl Rng) -> Rgb {
    // Step 1: cast with portal awareness iff portal_budget > 0. On a miss,
    // return the scene's background color. No option names a dedicated
    // background field, so `ambient_light` doubles as the miss color — the
    // same constant that otherwise models ambient occlusion-free fill light.
    let test_portals = portal_budget > 0;
    let hit = raycaster::cast(ctx.scene, ray, ctx.options, true, test_portals);
    if !hit.is_hit() {
        return ctx.options.ambient_light;
    }

    // Step 2: a portal hit transfers the ray through and recurses, tinting
    // the result.
    if let HitPrimitive::Portal(id) = hit.primitive {
        let side = ctx.scene.portal_side(id);
        let hit_point = ray.point_at(hit.t);
        let transferred_point = side.transfer_point(hit_point);
        let transferred_direction = side.transfer_direction(ray.direction);
        let transferred_ray = Ray::new(
            transferred_point + transferred_direction * crate::math::EPSILON,
            transferred_direction,
        );
        let radiance = trace_ray(ctx, &transferred_ray, bounce_budget, portal_budget - 1, rng);
        return radiance * ctx.options.portal_tint;
    }

    let material = ctx.scene.material(hit.material);

    // Step 3: emissive surfaces return white, per the convention recorded
    // in the redesign notes (emission is visualized, not measured, along
    // the primary eye ray).
    if material.is_emissive() {
        return Rgb::ONE;
    }

    let hit_point = ray.point_at(hit.t);
    let diffuse = material.diffuse_at(hit.uv);

    // Step 4: ambient term, either the flat constant or a photon-map
    // gather.
    let mut radiance = if ctx.options.gather_indirect {
        match ctx.photon_map {
            Some(tree) => {
                let gathered = crate::photon_map::gather_indirect(ctx.scene, ctx.options, tree, hit_point, hit.normal);
                diffuse * (gathered + ctx.options.ambient_light)
            }
            None => diffuse * ctx.options.ambient_light,
        }
    } else {
        diffuse * ctx.options.ambient_light
    };

    // Step 5: direct light from every area light.
    for &light_face_id in ctx.scene.lights().faces() {
        radiance += direct_light_from(ctx, &hit_point, hit.normal, diffuse, light_face_id, portal_budget, rng);
    }

    // Step 6: specular/glossy reflection, if bounce budget and
    // reflectivity both allow it.
    if bounce_budget > 0 && material.reflective.length() > 0.0 {
        let mirror_direction = reflect(ray.direction, hit.normal);
        let reflected = if ctx.options.gloss && material.roughness > 0.0 {
            let samples = ctx.options.num_glossy_samples.max(1);
            let mut sum = Rgb::ZERO;
            for _ in 0..samples {
                let glossy_direction = perturb_vector(mirror_direction, material.roughness, rng).normalize();
                let reflect_ray = Ray::new(hit_point + hit.normal * crate::math::EPSILON, glossy_direction);
                sum += trace_ray(ctx, &reflect_ray, bounce_budget - 1, portal_budget, rng);
            }
            sum * (1.0 / samples as f32)
        } else {
            let reflect_ray = Ray::new(hit_point + hit.normal * crate::math::EPSILON, mirror_direction);
            trace_ray(ctx, &reflect_ray, bounce_budget - 1, portal_budget, rng)
        };
        radiance += reflected * material.reflective;
    }

    // Step 7.
    radiance
}

fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - normal * (2.0 * direction.dot(normal))
}

/// Accumulates `material.shade(...)`-equivalent direct light from one area
/// light face, enumerating shadow-feasible rays from the light's centroid
/// regardless of `num_shadow_samples` for now — see `DESIGN.md`. Each
/// candidate ray additionally tests portal transfer when `portal_budget >
/// 0`, so a light visible only through a portal still contributes.
#[allow(clippy::too_many_arguments)]
fn direct_light_from(
    ctx: &TraceContext,
    point: &Vec3,
    normal: Vec3,
    diffuse: Rgb,
    light_face_id: FaceId,
    portal_budget: u32,
    _rng: &mut impl Rng,
) -> Rgb {
    let light_face = ctx.scene.face(light_face_id);
    let light_material = ctx.scene.material(light_face.material);
    let light_point = light_face.centroid(ctx.scene.vertices());
    let light_normal = light_face.normal(ctx.scene.vertices());
    let light_area = light_face.area(ctx.scene.vertices());

    shade_from_light_point(
        ctx,
        point,
        normal,
        diffuse,
        light_point,
        light_normal,
        light_area,
        light_material.emitted,
        portal_budget,
    )
}

/// One shadow/light-ray sample: casts from `point` toward `light_point`,
/// optionally transferring through portal sides (`portal_budget` times) if
/// the direct line of sight is blocked by one, and accumulates a Lambertian
/// contribution if nothing opaque is in the way.
#[allow(clippy::too_many_arguments)]
fn shade_from_light_point(
    ctx: &TraceContext,
    point: &Vec3,
    normal: Vec3,
    diffuse: Rgb,
    light_point: Vec3,
    light_normal: Vec3,
    light_area: f32,
    light_emitted: Rgb,
    portal_budget: u32,
) -> Rgb {
    let to_light = light_point - *point;
    let distance = to_light.magnitude();
    if distance <= crate::math::EPSILON {
        return Rgb::ZERO;
    }
    let direction = to_light / distance;

    let cos_surface = normal.dot(direction);
    if cos_surface <= 0.0 {
        return Rgb::ZERO;
    }
    let cos_light = (-direction).dot(light_normal);
    if cos_light <= 0.0 {
        return Rgb::ZERO;
    }

    let origin = *point + normal * crate::math::EPSILON;
    let ray = Ray::new(origin, direction);
    let shadow_hit = raycaster::cast(ctx.scene, &ray, ctx.options, true, portal_budget > 0);
    if !shadow_hit.is_hit() {
        return Rgb::ZERO;
    }

    if let HitPrimitive::Portal(id) = shadow_hit.primitive {
        if portal_budget == 0 {
            return Rgb::ZERO;
        }
        let side = ctx.scene.portal_side(id);
        let through_point = ray.point_at(shadow_hit.t);
        let transferred_point = side.transfer_point(through_point);
        let transferred_light_point = side.transfer_point(light_point);
        let transferred_normal = side.transfer_direction(light_normal).normalize();
        let tint_adjusted = shade_from_light_point(
            ctx,
            &transferred_point,
            side.transfer_direction(direction).normalize(),
            diffuse,
            transferred_light_point,
            transferred_normal,
            light_area,
            light_emitted,
            portal_budget - 1,
        );
        return tint_adjusted * ctx.options.portal_tint;
    }

    // Anything else in the way, at a distance shorter than the light,
    // blocks it; an occluder effectively at the light's own distance
    // (e.g. the light face itself) does not.
    if shadow_hit.t < distance - crate::math::EPSILON {
        return Rgb::ZERO;
    }

    let solid_angle_term = (cos_surface * cos_light * light_area) / (std::f32::consts::PI * distance * distance);
    diffuse * light_emitted * solid_angle_term
}

/// A single pixel's accumulated color plus how many antialias samples have
/// been averaged into it so far; the scheduler below refines pixels in
/// place rather than recomputing from scratch.
#[derive(Clone, Copy, Debug, Default)]
struct PixelAccumulator {
    sum: Rgb,
    samples: u32,
}

impl PixelAccumulator {
    fn average(&self) -> Rgb {
        if self.samples == 0 {
            Rgb::ZERO
        } else {
            self.sum * (1.0 / self.samples as f32)
        }
    }
}

/// A finished framebuffer of sRGB bytes, `width * height * 3` long,
/// row-major from the top-left.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<PixelAccumulator>,
}

impl Framebuffer {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![PixelAccumulator::default(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at `(x, y)`, tone-mapped to sRGB bytes.
    pub fn pixel_srgb(&self, x: u32, y: u32) -> [u8; 3] {
        let linear = self.pixels[(y * self.width + x) as usize].average();
        linear.to_srgb_bytes()
    }

    pub fn pixel_linear(&self, x: u32, y: u32) -> Rgb {
        self.pixels[(y * self.width + x) as usize].average()
    }
}

/// Renders the whole frame in one pass at full resolution: every pixel
/// gets `num_antialias_samples` jittered primary rays, each independently
/// traced with `num_bounces` reflection budget and `portal_recursion_depth`
/// portal budget, and the results are averaged. This is the finest-division
/// endpoint computed directly, without the coarse-to-fine scheduling a
/// progressively-drawing host wants — see [`ProgressiveScheduler`] for
/// that.
///
/// `rng` seeds one `u64` per call; rows are then traced with their own
/// independently-seeded generator (parallelized across rows with the
/// `rayon` feature) rather than sharing `rng` across threads.
pub fn render(ctx: &TraceContext, rng: &mut impl Rng) -> Framebuffer {
    let seed: u64 = rng.gen();
    render_rows(ctx, ctx.options.width, ctx.options.height, seed)
}

fn row_seed(base: u64, y: u32) -> u64 {
    base ^ (y as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(feature = "rayon")]
fn render_rows(ctx: &TraceContext, width: u32, height: u32, seed: u64) -> Framebuffer {
    let mut framebuffer = Framebuffer::new(width, height);
    let rows: Vec<Vec<PixelAccumulator>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let mut row_rng = Xoshiro256StarStar::seed_from_u64(row_seed(seed, y));
            (0..width)
                .map(|x| trace_pixel(ctx, x, y, width, height, &mut row_rng))
                .collect()
        })
        .collect();
    for (y, row) in rows.into_iter().enumerate() {
        for (x, value) in row.into_iter().enumerate() {
            framebuffer.pixels[y * width as usize + x] = value;
        }
    }
    framebuffer
}

#[cfg(not(feature = "rayon"))]
fn render_rows(ctx: &TraceContext, width: u32, height: u32, seed: u64) -> Framebuffer {
    let mut framebuffer = Framebuffer::new(width, height);
    for y in 0..height {
        let mut row_rng = Xoshiro256StarStar::seed_from_u64(row_seed(seed, y));
        for x in 0..width {
            framebuffer.pixels[(y * width + x) as usize] = trace_pixel(ctx, x, y, width, height, &mut row_rng);
        }
    }
    framebuffer
}

fn trace_pixel(ctx: &TraceContext, x: u32, y: u32, width: u32, height: u32, rng: &mut impl Rng) -> PixelAccumulator {
    let samples = ctx.options.num_antialias_samples.max(1);
    let mut sum = Rgb::ZERO;
    for sample in 0..samples {
        let (jitter_x, jitter_y) = if sample == 0 {
            (0.5, 0.5)
        } else {
            (0.5 + rng.gen_range(-0.5..0.5), 0.5 + rng.gen_range(-0.5..0.5))
        };
        let ndc_x = ((x as f32 + jitter_x) / width as f32) * 2.0 - 1.0;
        let ndc_y = 1.0 - ((y as f32 + jitter_y) / height as f32) * 2.0;
        let camera = match ctx.scene.camera() {
            Some(camera) => camera,
            None => return PixelAccumulator { sum: Rgb::ZERO, samples: 1 },
        };
        let ray = camera.generate_ray(ndc_x, ndc_y);
        sum += trace_ray(ctx, &ray, ctx.options.num_bounces, ctx.options.portal_recursion_depth, rng);
    }
    PixelAccumulator { sum, samples }
}

/// One pass of the progressive scheduler's coarse-to-fine tiling:
/// `divs_x * divs_y` blocks covering the image, each block's representative
/// pixel traced and splatted across the whole block. A host repeatedly
/// calls this with a tripled `divs_x`/`divs_y` each time (clamped to the
/// image dimensions) until every pixel has been individually traced.
pub struct ProgressiveScheduler {
    divs_x: u32,
    divs_y: u32,
}

impl ProgressiveScheduler {
    pub fn new() -> Self {
        Self { divs_x: 1, divs_y: 1 }
    }

    /// Whether every pixel is already covered at the current division
    /// (i.e. the next pass, if run, would be the last meaningful one).
    pub fn is_finest(&self, options: &RenderOptions) -> bool {
        self.divs_x >= options.width && self.divs_y >= options.height
    }

    /// Runs one coarse-to-fine pass into `framebuffer`, then triples the
    /// division counts (clamped to the image dimensions) for the next call.
    pub fn step(&mut self, ctx: &TraceContext, framebuffer: &mut Framebuffer, rng: &mut impl Rng) {
        let width = ctx.options.width;
        let height = ctx.options.height;
        let divs_x = self.divs_x.min(width).max(1);
        let divs_y = self.divs_y.min(height).max(1);
        let block_w = (width + divs_x - 1) / divs_x;
        let block_h = (height + divs_y - 1) / divs_y;

        for by in 0..divs_y {
            for bx in 0..divs_x {
                let sample_x = (bx * block_w + block_w / 2).min(width - 1);
                let sample_y = (by * block_h + block_h / 2).min(height - 1);
                let value = trace_pixel(ctx, sample_x, sample_y, width, height, rng);
                let x0 = bx * block_w;
                let y0 = by * block_h;
                let x1 = (x0 + block_w).min(width);
                let y1 = (y0 + block_h).min(height);
                for y in y0..y1 {
                    for x in x0..x1 {
                        framebuffer.pixels[(y * width + x) as usize] = value;
                    }
                }
            }
        }

        self.divs_x = (self.divs_x * 3).min(width.max(1));
        self.divs_y = (self.divs_y * 3).min(height.max(1));
    }
}

impl Default for ProgressiveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Matrix4, Rgb};
    use crate::scene::builder::SceneBuilder;
    use crate::scene::material::Material;
    use crate::scene::Camera;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn lit_box_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::new(0.8, 0.8, 0.8), Rgb::ZERO, Rgb::ZERO, 1.0));
        let light = builder.add_material("light", Material::new(Rgb::ZERO, Rgb::ZERO, Rgb::new(8.0, 8.0, 8.0), 1.0));

        let f0 = builder.add_vertex(Vec3::new(-1.0, -1.0, -1.0), (0.0, 0.0));
        let f1 = builder.add_vertex(Vec3::new(1.0, -1.0, -1.0), (1.0, 0.0));
        let f2 = builder.add_vertex(Vec3::new(1.0, -1.0, 1.0), (1.0, 1.0));
        let f3 = builder.add_vertex(Vec3::new(-1.0, -1.0, 1.0), (0.0, 1.0));
        builder.add_face([f0, f1, f2, f3], white, false).unwrap();

        let l0 = builder.add_vertex(Vec3::new(-0.4, 0.99, -0.4), (0.0, 0.0));
        let l1 = builder.add_vertex(Vec3::new(-0.4, 0.99, 0.4), (1.0, 0.0));
        let l2 = builder.add_vertex(Vec3::new(0.4, 0.99, 0.4), (1.0, 1.0));
        let l3 = builder.add_vertex(Vec3::new(0.4, 0.99, -0.4), (0.0, 1.0));
        builder.add_face([l0, l1, l2, l3], light, true).unwrap();

        builder.set_camera(Camera::new(Vec3::new(0.0, 0.0, 4.0), Matrix4::from_scale(1.0)).unwrap());
        builder.build(8, 4)
    }

    #[test]
    fn miss_returns_ambient_light_as_background() {
        let scene = lit_box_scene();
        let mut options = RenderOptions::default();
        options.ambient_light = Rgb::new(0.2, 0.3, 0.4);
        let ctx = TraceContext { scene: &scene, options: &options, photon_map: None };
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 1.0, 0.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        assert_eq!(trace_ray(&ctx, &ray, 0, 0, &mut rng), options.ambient_light);
    }

    #[test]
    fn emissive_surface_returns_white() {
        let scene = lit_box_scene();
        let options = RenderOptions::default();
        let ctx = TraceContext { scene: &scene, options: &options, photon_map: None };
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        assert_eq!(trace_ray(&ctx, &ray, 0, 0, &mut rng), Rgb::ONE);
    }

    #[test]
    fn floor_receives_nonzero_direct_light() {
        let scene = lit_box_scene();
        let options = RenderOptions::default();
        let ctx = TraceContext { scene: &scene, options: &options, photon_map: None };
        let ray = Ray::new(Vec3::new(0.0, 5.0, 10.0), Vec3::new(0.0, -0.3, -1.0));
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let radiance = trace_ray(&ctx, &ray, 0, 0, &mut rng);
        assert!(radiance.length() > 0.0);
    }

    #[test]
    fn progressive_scheduler_reaches_finest_division() {
        let mut scheduler = ProgressiveScheduler::new();
        let mut options = RenderOptions::default();
        options.width = 4;
        options.height = 4;
        options.num_antialias_samples = 1;
        let scene = lit_box_scene();
        let ctx = TraceContext { scene: &scene, options: &options, photon_map: None };
        let mut framebuffer = Framebuffer::new(options.width, options.height);
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        for _ in 0..5 {
            if scheduler.is_finest(&options) {
                break;
            }
            scheduler.step(&ctx, &mut framebuffer, &mut rng);
        }
        assert!(scheduler.is_finest(&options));
    }

    #[test]
    fn full_render_produces_a_pixel_for_every_coordinate() {
        let scene = lit_box_scene();
        let mut options = RenderOptions::default();
        options.width = 3;
        options.height = 3;
        options.num_antialias_samples = 1;
        let ctx = TraceContext { scene: &scene, options: &options, photon_map: None };
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        let framebuffer = render(&ctx, &mut rng);
        assert_eq!(framebuffer.width(), 3);
        assert_eq!(framebuffer.height(), 3);
        let _ = framebuffer.pixel_srgb(1, 1);
    }
}
