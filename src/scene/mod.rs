//! The scene model: vertices, materials, quad faces, spheres, portals, the
//! light list, and the derived bounding box. Construction goes through
//! [`builder::SceneBuilder`]; an external loader (out of this crate's
//! scope) would produce the same calls a parser's tokens drive.

pub mod builder;
pub mod camera;
pub mod face;
pub mod light;
pub mod material;
pub mod portal;
pub mod sphere;
pub mod vertex;

use indexmap::IndexMap;

use crate::ids::{FaceId, MaterialId, PortalId, SphereId, VertexId};
use crate::math::Vec3;

pub use camera::Camera;
pub use face::{Face, Triangle};
pub use light::LightList;
pub use material::{Diffuse, Material, Texture};
pub use portal::{Portal, PortalSide};
pub use sphere::{Sphere, SphereHit, TessellatedQuad};
pub use vertex::Vertex;

/// One rasterized radiosity patch: either an original quad face or one
/// tessellated quad of a sphere. Radiosity and `use_rasterized` ray casting
/// both operate uniformly over this flattened list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PatchOwner {
    Face(FaceId),
    Sphere(SphereId, u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Patch {
    pub positions: [Vec3; 4],
    pub normal: Vec3,
    pub area: f32,
    pub material: MaterialId,
    pub is_light: bool,
    pub owner: PatchOwner,
}

/// An axis-aligned bounding box, expanded 1‰ on each axis for the kd-tree's
/// root box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn expanded(&self, fraction: f32) -> Self {
        let extent = self.max - self.min;
        let pad = extent * fraction;
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Splits at `coordinate` along `axis` (0=x, 1=y, 2=z), returning
    /// `(lower, upper)` halves.
    pub fn split(&self, axis: usize, coordinate: f32) -> (BoundingBox, BoundingBox) {
        let mut lower = *self;
        let mut upper = *self;
        match axis {
            0 => {
                lower.max.x = coordinate;
                upper.min.x = coordinate;
            }
            1 => {
                lower.max.y = coordinate;
                upper.min.y = coordinate;
            }
            _ => {
                lower.max.z = coordinate;
                upper.min.z = coordinate;
            }
        }
        (lower, upper)
    }

    /// Index (0=x, 1=y, 2=z) of the longest axis.
    pub fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }
}

/// The scene: every entity the ray caster, photon mapper, and radiosity
/// solver all share.
#[derive(Clone, Debug)]
pub struct Scene {
    vertices: Vec<Vertex>,
    materials: Vec<Material>,
    material_names: IndexMap<String, MaterialId>,
    faces: Vec<Face>,
    spheres: Vec<Sphere>,
    portals: Vec<Portal>,
    lights: LightList,
    camera: Option<Camera>,
    bounds: BoundingBox,
    patches: Vec<Patch>,
}

impl Scene {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_position(&self, id: VertexId) -> Vec3 {
        self.vertices[id.index()].position
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.index()]
    }

    pub fn material_named(&self, name: &str) -> Option<MaterialId> {
        self.material_names.get(name).copied()
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn sphere(&self, id: SphereId) -> &Sphere {
        &self.spheres[id.index()]
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    /// Resolves a flat `PortalId` (portal index `0..2P-1`) to the
    /// `PortalSide` it names: portal `id.index() / 2`, side
    /// `id.index() % 2`.
    pub fn portal_side(&self, id: PortalId) -> &PortalSide {
        self.portals[id.index() / 2].side(id.index() % 2)
    }

    pub fn num_portal_sides(&self) -> usize {
        self.portals.len() * 2
    }

    pub fn lights(&self) -> &LightList {
        &self.lights
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// The flattened list of rasterized radiosity patches: one per original
    /// quad face, plus `sphere_horiz * sphere_vert` per sphere. Rebuilt
    /// whenever the scene or tessellation resolution changes
    /// (`RadiositySubdivide`).
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn rebuild_patches(&mut self, sphere_horiz: u32, sphere_vert: u32) {
        self.patches = build_patches(&self.faces, &self.vertices, &self.spheres, sphere_horiz, sphere_vert);
    }
}

fn build_patches(
    faces: &[Face],
    vertices: &[Vertex],
    spheres: &[Sphere],
    sphere_horiz: u32,
    sphere_vert: u32,
) -> Vec<Patch> {
    let mut patches = Vec::with_capacity(faces.len() + spheres.len() * (sphere_horiz * sphere_vert) as usize);
    for (i, face) in faces.iter().enumerate() {
        let id = FaceId::from_index(i);
        let pos = |v: VertexId| vertices[v.index()].position;
        patches.push(Patch {
            positions: [
                pos(face.vertices[0]),
                pos(face.vertices[1]),
                pos(face.vertices[2]),
                pos(face.vertices[3]),
            ],
            normal: face.normal(vertices),
            area: face.area(vertices),
            material: face.material,
            is_light: face.is_light,
            owner: PatchOwner::Face(id),
        });
    }
    for (s, sphere) in spheres.iter().enumerate() {
        let sphere_id = SphereId::from_index(s);
        for (q, quad) in sphere.tessellate(sphere_horiz, sphere_vert).into_iter().enumerate() {
            patches.push(Patch {
                positions: quad.positions,
                normal: quad.normal(),
                area: quad.area(),
                material: quad.material,
                is_light: false,
                owner: PatchOwner::Sphere(sphere_id, q as u32),
            });
        }
    }
    patches
}

fn compute_bounds(vertices: &[Vertex], spheres: &[Sphere]) -> BoundingBox {
    let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut grow = |p: Vec3, r: f32| {
        min.x = min.x.min(p.x - r);
        min.y = min.y.min(p.y - r);
        min.z = min.z.min(p.z - r);
        max.x = max.x.max(p.x + r);
        max.y = max.y.max(p.y + r);
        max.z = max.z.max(p.z + r);
    };
    for v in vertices {
        grow(v.position, 0.0);
    }
    for s in spheres {
        grow(s.center, s.radius);
    }
    if !min.x.is_finite() {
        min = Vec3::new(0.0, 0.0, 0.0);
        max = Vec3::new(0.0, 0.0, 0.0);
    }
    BoundingBox { min, max }
}
