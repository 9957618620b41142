//! The host interface: an explicit [`Renderer`] value exposing the handlers
//! a host's single-character commands map to, plus the double-buffered
//! packed-quad pixel lists and the `PackMesh` geometry callback. No global
//! state — every call takes `&mut self`.

use bytemuck::{Pod, Zeroable};
use rand::Rng;

use crate::error::DiagnosticLatch;
use crate::kdtree::KdTree;
use crate::math::Rgb;
use crate::options::RenderOptions;
use crate::radiosity::Radiosity;
use crate::raytrace::{trace_ray, Framebuffer, ProgressiveScheduler, TraceContext};
use crate::scene::Scene;

/// One world-space quad (four corners) tagged with the sRGB color the pixel
/// scheduler computed for it, before a host rasterizes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedQuad {
    pub corners: [crate::math::Vec3; 4],
    pub color: Rgb,
}

/// The two pixel-quad lists the scheduler double-buffers between: the
/// scheduler writes to the active list; on resolution-pass rollover it
/// clears the other and flips.
#[derive(Clone, Debug, Default)]
struct PixelBuffers {
    a: Vec<RenderedQuad>,
    b: Vec<RenderedQuad>,
    render_to_a: bool,
}

impl PixelBuffers {
    fn active_mut(&mut self) -> &mut Vec<RenderedQuad> {
        if self.render_to_a {
            &mut self.a
        } else {
            &mut self.b
        }
    }

    fn active(&self) -> &[RenderedQuad] {
        if self.render_to_a {
            &self.a
        } else {
            &self.b
        }
    }

    /// Clears the inactive buffer and flips which one is active, per the
    /// "on resolution-pass rollover" rule.
    fn rollover(&mut self) {
        if self.render_to_a {
            self.b.clear();
        } else {
            self.a.clear();
        }
        self.render_to_a = !self.render_to_a;
    }

    fn clear(&mut self) {
        self.a.clear();
        self.b.clear();
        self.render_to_a = true;
    }
}

static GATHER_BEFORE_PHOTONS_LATCH: DiagnosticLatch = DiagnosticLatch::new();
static FORM_FACTORS_BEFORE_COMPUTE_LATCH: DiagnosticLatch = DiagnosticLatch::new();

/// The renderer's full mutable state: the loaded scene and options, the
/// photon map, the radiosity solver, the progressive pixel scheduler, and
/// the double-buffered pixel-quad lists a host pulls from after
/// [`Renderer::draw_pixel`]. One instance per render session; nothing here
/// is global.
pub struct Renderer {
    scene: Scene,
    options: RenderOptions,
    photon_map: KdTree,
    photons_traced: bool,
    radiosity: Radiosity,
    form_factors_computed: bool,
    scheduler: ProgressiveScheduler,
    pixels: PixelBuffers,
}

impl Renderer {
    /// `Load`: takes ownership of an already-built [`Scene`] (scene-file
    /// parsing is an external loader's job) and validated [`RenderOptions`],
    /// resetting every derived structure.
    pub fn load(scene: Scene, options: RenderOptions) -> Result<Self, crate::error::RenderError> {
        options.validate()?;
        let bounds = scene.bounds();
        let radiosity = Radiosity::new(&scene);
        Ok(Self {
            photon_map: KdTree::new(bounds),
            photons_traced: false,
            radiosity,
            form_factors_computed: false,
            scheduler: ProgressiveScheduler::new(),
            pixels: PixelBuffers::default(),
            scene,
            options,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// `TracePhotons`: clears and repopulates the photon map from the
    /// scene's lights. Photons are erased and rebuilt on every call.
    pub fn trace_photons(&mut self, rng: &mut impl Rng) {
        self.photon_map = KdTree::new(self.scene.bounds());
        crate::photon_map::emit_photons(&self.scene, &self.options, rng, &mut self.photon_map);
        self.photons_traced = true;
    }

    /// `RadiosityIterate`: one Southwell shooting step (`SPC` host command).
    /// Computes the form-factor matrix first if this is the first call
    /// since load/subdivide — the host is never required to call a
    /// separate "compute form factors" step, so this auto-satisfies that
    /// precondition rather than refusing.
    pub fn radiosity_iterate(&mut self, rng: &mut impl Rng) -> f32 {
        if !self.form_factors_computed {
            self.radiosity.compute_form_factors(&self.scene, &self.options, rng);
            self.form_factors_computed = true;
        }
        self.radiosity.iterate()
    }

    /// Reads a previously-computed form factor, or logs once and returns a
    /// neutral value if `RadiosityIterate` has never run.
    pub fn form_factor(&self, i: usize, j: usize) -> f32 {
        if !self.form_factors_computed {
            FORM_FACTORS_BEFORE_COMPUTE_LATCH.warn_once("form factor accessed before RadiosityIterate computed them");
            return 0.0;
        }
        self.radiosity.form_factor(i, j)
    }

    /// `RadiositySubdivide`: re-tessellates spheres at the given
    /// resolution, replacing the mesh and resetting radiosity from the new
    /// patch list's emitted colors.
    pub fn radiosity_subdivide(&mut self, sphere_horiz: u32, sphere_vert: u32) -> Result<(), crate::error::RenderError> {
        if sphere_horiz % 2 != 0 {
            return Err(crate::error::RenderError::OddSphereHoriz(sphere_horiz));
        }
        self.scene.rebuild_patches(sphere_horiz, sphere_vert);
        self.radiosity = Radiosity::new(&self.scene);
        self.form_factors_computed = false;
        Ok(())
    }

    /// `RadiosityClear` (`c`/`C` host command, radiosity portion): resets
    /// radiosity state without touching the scene's geometry.
    pub fn radiosity_clear(&mut self) {
        self.radiosity = Radiosity::new(&self.scene);
        self.form_factors_computed = false;
    }

    /// `RaytracerClear`: resets the progressive pixel scheduler and clears
    /// both pixel-quad buffers.
    pub fn raytracer_clear(&mut self) {
        self.scheduler = ProgressiveScheduler::new();
        self.pixels.clear();
    }

    /// `PhotonMappingClear`: discards the photon map.
    pub fn photon_mapping_clear(&mut self) {
        self.photon_map = KdTree::new(self.scene.bounds());
        self.photons_traced = false;
    }

    fn trace_context(&self) -> TraceContext {
        TraceContext {
            scene: &self.scene,
            options: &self.options,
            photon_map: if self.options.gather_indirect && self.photons_traced {
                Some(&self.photon_map)
            } else {
                if self.options.gather_indirect && !self.photons_traced {
                    GATHER_BEFORE_PHOTONS_LATCH.warn_once("gather_indirect enabled before TracePhotons ran");
                }
                None
            },
        }
    }

    /// `DrawPixel`: runs one step of the progressive scheduler, appending
    /// freshly-traced quads to the active pixel buffer (`r`/`R` host
    /// command's per-tick unit of work). Returns `true` if this call
    /// advanced the image; once the finest division has been reached,
    /// further calls are no-ops and return `false`.
    pub fn draw_pixel(&mut self, rng: &mut impl Rng) -> bool {
        if self.scheduler.is_finest(&self.options) {
            return false;
        }
        let ctx = self.trace_context();
        let mut framebuffer = Framebuffer::new(self.options.width, self.options.height);
        self.scheduler.step(&ctx, &mut framebuffer, rng);
        let width = self.options.width;
        let height = self.options.height;
        let quads = self.pixels.active_mut();
        quads.clear();
        for y in 0..height {
            for x in 0..width {
                let color = framebuffer.pixel_linear(x, y);
                quads.push(pixel_quad(x, y, width, height, color));
            }
        }
        true
    }

    /// Flips which pixel-quad list is active and clears the one that was
    /// just vacated, for a host starting a fresh render while still
    /// displaying the previous one.
    pub fn rollover_pixels(&mut self) {
        self.pixels.rollover();
    }

    /// The pixel-quads the host should currently rasterize.
    pub fn active_pixels(&self) -> &[RenderedQuad] {
        self.pixels.active()
    }

    /// `VisualizeTraceRay`: traces a single primary ray through pixel
    /// `(x, y)` and returns the radiance that pixel would receive, for a
    /// host's ray-tree cursor visualization (`t`/`T` host command). Does
    /// not touch the pixel-quad buffers.
    pub fn visualize_trace_ray(&self, x: u32, y: u32, rng: &mut impl Rng) -> Option<Rgb> {
        let camera = self.scene.camera()?;
        let ndc_x = ((x as f32 + 0.5) / self.options.width as f32) * 2.0 - 1.0;
        let ndc_y = 1.0 - ((y as f32 + 0.5) / self.options.height as f32) * 2.0;
        let ray = camera.generate_ray(ndc_x, ndc_y);
        let ctx = self.trace_context();
        Some(trace_ray(&ctx, &ray, self.options.num_bounces, self.options.portal_recursion_depth, rng))
    }
}

fn pixel_quad(x: u32, y: u32, width: u32, height: u32, color: Rgb) -> RenderedQuad {
    let x0 = (x as f32 / width as f32) * 2.0 - 1.0;
    let x1 = ((x + 1) as f32 / width as f32) * 2.0 - 1.0;
    let y0 = 1.0 - (y as f32 / height as f32) * 2.0;
    let y1 = 1.0 - ((y + 1) as f32 / height as f32) * 2.0;
    RenderedQuad {
        corners: [
            crate::math::Vec3::new(x0, y1, 0.0),
            crate::math::Vec3::new(x1, y1, 0.0),
            crate::math::Vec3::new(x1, y0, 0.0),
            crate::math::Vec3::new(x0, y0, 0.0),
        ],
        color,
    }
}

/// One packed vertex record: `pos.xyz, 1, normal.xyz, 0, color.rgb, 1`,
/// twelve floats, `Pod`/`Zeroable` so it can be handed to a host's GPU
/// upload without a copy.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub fields: [f32; 12],
}

impl PackedVertex {
    fn new(position: crate::math::Vec3, normal: crate::math::Vec3, color: Rgb) -> Self {
        let c: cgmath::Vector3<f32> = color.into();
        Self {
            fields: [
                position.x, position.y, position.z, 1.0,
                normal.x, normal.y, normal.z, 0.0,
                c.x, c.y, c.z, 1.0,
            ],
        }
    }
}

/// A growable packed-triangle buffer; capacity is doubled on overflow.
/// Triangle buffer is tight (3 vertices/triangle); the point buffer used
/// for `render_photons` visualization is one record per point.
pub struct PackedMesh {
    vertices: Vec<PackedVertex>,
}

impl PackedMesh {
    pub fn new() -> Self {
        Self { vertices: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn as_slice(&self) -> &[PackedVertex] {
        &self.vertices
    }

    fn reserve_for(&mut self, additional: usize) {
        if self.vertices.len() + additional > self.vertices.capacity() {
            let doubled = (self.vertices.capacity() * 2).max(self.vertices.len() + additional);
            self.vertices.reserve(doubled - self.vertices.len());
        }
    }

    fn push_triangle(&mut self, positions: [crate::math::Vec3; 3], normal: crate::math::Vec3, color: Rgb) {
        self.reserve_for(3);
        for p in positions {
            self.vertices.push(PackedVertex::new(p, normal, color));
        }
    }
}

impl Default for PackedMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// `PackMesh`: packs every quad face (as two triangles, per
    /// `Triangle::First`/`Second`) colored according to `render_mode`, into
    /// `mesh`. `render_mode == RenderMode::Materials` uses the diffuse
    /// color; the radiosity-derived modes read per-patch radiosity arrays;
    /// `RenderMode::FormFactors` colors each patch by its form factor
    /// against the current max-undistributed ("shooter") patch, since the
    /// full patch-by-patch matrix has no single mesh-shaped projection.
    pub fn pack_mesh(&self, mesh: &mut PackedMesh) {
        use crate::options::RenderMode;
        for (i, patch) in self.scene.patches().iter().enumerate() {
            let color = match self.options.render_mode {
                RenderMode::Materials => self.scene.material(patch.material).diffuse_at((0.5, 0.5)),
                RenderMode::Radiance => self.radiosity.radiance(i),
                RenderMode::Undistributed => self.radiosity.undistributed(i),
                RenderMode::Absorbed => self.radiosity.absorbed(i),
                RenderMode::Lights => {
                    if patch.is_light {
                        Rgb::ONE
                    } else {
                        Rgb::ZERO
                    }
                }
                RenderMode::FormFactors => {
                    let ff = self
                        .radiosity
                        .max_undistributed_patch()
                        .map(|shooter| self.radiosity.form_factor(shooter, i))
                        .unwrap_or(0.0);
                    Rgb::new(ff, ff, ff)
                }
            };
            let p = patch.positions;
            mesh.push_triangle([p[0], p[1], p[2]], patch.normal, color);
            mesh.push_triangle([p[0], p[2], p[3]], patch.normal, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Matrix4, Vec3};
    use crate::scene::builder::SceneBuilder;
    use crate::scene::material::Material;
    use crate::scene::Camera;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn small_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::new(0.7, 0.7, 0.7), Rgb::ZERO, Rgb::ZERO, 1.0));
        let light = builder.add_material("light", Material::new(Rgb::ZERO, Rgb::ZERO, Rgb::new(5.0, 5.0, 5.0), 1.0));
        let f0 = builder.add_vertex(Vec3::new(-1.0, -1.0, -1.0), (0.0, 0.0));
        let f1 = builder.add_vertex(Vec3::new(1.0, -1.0, -1.0), (1.0, 0.0));
        let f2 = builder.add_vertex(Vec3::new(1.0, -1.0, 1.0), (1.0, 1.0));
        let f3 = builder.add_vertex(Vec3::new(-1.0, -1.0, 1.0), (0.0, 1.0));
        builder.add_face([f0, f1, f2, f3], white, false).unwrap();
        let l0 = builder.add_vertex(Vec3::new(-0.3, 1.0, -0.3), (0.0, 0.0));
        let l1 = builder.add_vertex(Vec3::new(-0.3, 1.0, 0.3), (1.0, 0.0));
        let l2 = builder.add_vertex(Vec3::new(0.3, 1.0, 0.3), (1.0, 1.0));
        let l3 = builder.add_vertex(Vec3::new(0.3, 1.0, -0.3), (0.0, 1.0));
        builder.add_face([l0, l1, l2, l3], light, true).unwrap();
        builder.set_camera(Camera::new(Vec3::new(0.0, 0.5, 3.0), Matrix4::from_scale(1.0)).unwrap());
        builder.build(8, 4)
    }

    fn small_options() -> RenderOptions {
        let mut options = RenderOptions::default();
        options.width = 4;
        options.height = 4;
        options.num_form_factor_samples = 16;
        options
    }

    #[test]
    fn load_validates_options() {
        let mut options = small_options();
        options.width = 0;
        assert!(Renderer::load(small_scene(), options).is_err());
    }

    #[test]
    fn radiosity_iterate_reduces_undistributed_and_computes_form_factors_once() {
        let mut renderer = Renderer::load(small_scene(), small_options()).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        let first = renderer.radiosity_iterate(&mut rng);
        let second = renderer.radiosity_iterate(&mut rng);
        assert!(second <= first + 1e-4);
    }

    #[test]
    fn trace_photons_populates_the_map() {
        let mut options = small_options();
        options.num_photons_to_shoot = 500;
        let mut renderer = Renderer::load(small_scene(), options).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        renderer.trace_photons(&mut rng);
        assert!(renderer.photon_map.num_photons() > 0);
    }

    #[test]
    fn draw_pixel_eventually_returns_false_at_the_finest_division() {
        let mut renderer = Renderer::load(small_scene(), small_options()).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        let mut calls = 0;
        while renderer.draw_pixel(&mut rng) {
            calls += 1;
            assert!(calls < 20, "scheduler never reached its finest division");
        }
        assert!(!renderer.active_pixels().is_empty());
    }

    #[test]
    fn visualize_trace_ray_returns_a_color_when_a_camera_is_present() {
        let renderer = Renderer::load(small_scene(), small_options()).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        assert!(renderer.visualize_trace_ray(2, 2, &mut rng).is_some());
    }

    #[test]
    fn pack_mesh_emits_two_triangles_per_patch() {
        let renderer = Renderer::load(small_scene(), small_options()).unwrap();
        let mut mesh = PackedMesh::new();
        renderer.pack_mesh(&mut mesh);
        assert_eq!(mesh.len(), renderer.scene().patches().len() * 6);
    }
}
