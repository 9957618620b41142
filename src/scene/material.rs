//! Materials: diffuse color (optionally texture-indexed), reflective color,
//! emitted color, and roughness. Materials are owned by the scene and are
//! immutable after it is loaded; faces and primitives hold non-owning
//! [`MaterialId`] references to them.

use crate::math::Rgb;

/// A small in-memory texture: a flat grid of colors sampled by nearest
/// neighbor on `(s, t) in [0, 1]^2`, wrapping. Loading texture *files* is a
/// loader concern out of scope for this crate; this type only needs to
/// exist so [`Material::diffuse_at`] has something to index into once a
/// loader has decoded pixels into it.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Rgb>,
}

impl Texture {
    pub fn new(width: u32, height: u32, texels: Vec<Rgb>) -> Self {
        assert_eq!(texels.len(), (width as usize) * (height as usize));
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn sample(&self, s: f32, t: f32) -> Rgb {
        let wrap = |x: f32| x.rem_euclid(1.0);
        let x = (wrap(s) * self.width as f32) as u32 % self.width;
        let y = (wrap(t) * self.height as f32) as u32 % self.height;
        self.texels[(y * self.width + x) as usize]
    }
}

/// The diffuse term of a [`Material`]: either a flat color or a texture
/// sampled by the hit's `(s, t)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Diffuse {
    Solid(Rgb),
    Textured(Texture),
}

/// A surface material. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    diffuse: Diffuse,
    pub reflective: Rgb,
    pub emitted: Rgb,
    /// In `[0, 1]`; `0` is a perfect mirror, larger values widen the glossy
    /// reflection cone.
    pub roughness: f32,
}

impl Material {
    pub fn new(diffuse: Rgb, reflective: Rgb, emitted: Rgb, roughness: f32) -> Self {
        Self {
            diffuse: Diffuse::Solid(diffuse),
            reflective,
            emitted,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    pub fn textured(
        texture: Texture,
        reflective: Rgb,
        emitted: Rgb,
        roughness: f32,
    ) -> Self {
        Self {
            diffuse: Diffuse::Textured(texture),
            reflective,
            emitted,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    /// The diffuse color at a hit's texture coordinates.
    pub fn diffuse_at(&self, uv: (f32, f32)) -> Rgb {
        match &self.diffuse {
            Diffuse::Solid(color) => *color,
            Diffuse::Textured(texture) => texture.sample(uv.0, uv.1),
        }
    }

    /// Whether this material counts as an area light: emitted color length
    /// above a small threshold.
    pub fn is_emissive(&self) -> bool {
        self.emitted.length() > 1e-3
    }
}
