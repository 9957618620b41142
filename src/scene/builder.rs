//! A minimal in-memory scene construction surface, standing in for an
//! external scene-file loader. Takes already-parsed Rust values — vertex
//! positions, material descriptions, face index lists — and produces the
//! same [`Scene`] a parser driving this API would.

use crate::error::RenderError;
use crate::ids::{FaceId, MaterialId, PortalId, SphereId, VertexId};
use crate::math::{Matrix4, Vec3};

use super::material::Material;
use super::vertex::Vertex;
use super::{build_patches, compute_bounds, Camera, Face, LightList, Portal, Scene, Sphere};

#[derive(Default)]
pub struct SceneBuilder {
    vertices: Vec<Vertex>,
    materials: Vec<Material>,
    material_names: indexmap::IndexMap<String, MaterialId>,
    faces: Vec<Face>,
    spheres: Vec<Sphere>,
    portals: Vec<Portal>,
    camera: Option<Camera>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, position: Vec3, uv: (f32, f32)) -> VertexId {
        let id = VertexId::from_index(self.vertices.len());
        self.vertices.push(Vertex::new(position, uv, id.0));
        id
    }

    pub fn add_material(&mut self, name: impl Into<String>, material: Material) -> MaterialId {
        let id = MaterialId::from_index(self.materials.len());
        self.materials.push(material);
        self.material_names.insert(name.into(), id);
        id
    }

    /// Adds a quad face. `vertices` are indices previously returned by
    /// [`Self::add_vertex`], in winding order.
    pub fn add_face(
        &mut self,
        vertices: [VertexId; 4],
        material: MaterialId,
        is_light: bool,
    ) -> Result<FaceId, RenderError> {
        for v in vertices {
            if v.index() >= self.vertices.len() {
                return Err(RenderError::BadVertexIndex {
                    index: v.0,
                    count: self.vertices.len() as u32,
                });
            }
        }
        if material.index() >= self.materials.len() {
            return Err(RenderError::MissingMaterial(format!("{:?}", material)));
        }
        let id = FaceId::from_index(self.faces.len());
        self.faces.push(Face::new(vertices, material, is_light));
        Ok(id)
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: MaterialId) -> Result<SphereId, RenderError> {
        if material.index() >= self.materials.len() {
            return Err(RenderError::MissingMaterial(format!("{:?}", material)));
        }
        let id = SphereId::from_index(self.spheres.len());
        self.spheres.push(Sphere::new(center, radius, material));
        Ok(id)
    }

    /// Adds a portal pair, returning the `PortalId` of its first side;
    /// the second side is `PortalId(first.0 + 1)`. Fails if either
    /// transform is singular.
    pub fn add_portal(&mut self, transform1: Matrix4, transform2: Matrix4) -> Result<PortalId, RenderError> {
        let portal_index = self.portals.len();
        self.portals.push(Portal::new(transform1, transform2)?);
        Ok(PortalId::from_index(portal_index * 2))
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    /// Finalizes the scene, computing the bounding box, light list, and the
    /// initial rasterized-patch list from `sphere_horiz`/`sphere_vert`.
    pub fn build(self, sphere_horiz: u32, sphere_vert: u32) -> Scene {
        let lights = LightList::build(&self.faces);
        let bounds = compute_bounds(&self.vertices, &self.spheres);
        let patches = build_patches(&self.faces, &self.vertices, &self.spheres, sphere_horiz, sphere_vert);
        Scene {
            vertices: self.vertices,
            materials: self.materials,
            material_names: self.material_names,
            faces: self.faces,
            spheres: self.spheres,
            portals: self.portals,
            lights,
            camera: self.camera,
            bounds,
            patches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rgb;

    fn unit_square(builder: &mut SceneBuilder, material: MaterialId, is_light: bool) -> FaceId {
        let v0 = builder.add_vertex(Vec3::new(0.0, 0.0, 0.0), (0.0, 0.0));
        let v1 = builder.add_vertex(Vec3::new(1.0, 0.0, 0.0), (1.0, 0.0));
        let v2 = builder.add_vertex(Vec3::new(1.0, 1.0, 0.0), (1.0, 1.0));
        let v3 = builder.add_vertex(Vec3::new(0.0, 1.0, 0.0), (0.0, 1.0));
        builder.add_face([v0, v1, v2, v3], material, is_light).unwrap()
    }

    #[test]
    fn builds_a_minimal_scene_with_one_light() {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::ONE, Rgb::ZERO, Rgb::ZERO, 1.0));
        let light_mat = builder.add_material("light", Material::new(Rgb::ZERO, Rgb::ZERO, Rgb::ONE, 1.0));
        unit_square(&mut builder, white, false);
        unit_square(&mut builder, light_mat, true);
        let scene = builder.build(8, 4);
        assert_eq!(scene.faces().len(), 2);
        assert_eq!(scene.lights().faces().len(), 1);
        assert_eq!(scene.patches().len(), 2);
    }

    #[test]
    fn rejects_face_with_out_of_range_vertex() {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::ONE, Rgb::ZERO, Rgb::ZERO, 1.0));
        let bogus = VertexId(99);
        let v0 = builder.add_vertex(Vec3::new(0.0, 0.0, 0.0), (0.0, 0.0));
        let result = builder.add_face([v0, bogus, bogus, bogus], white, false);
        assert!(matches!(result, Err(RenderError::BadVertexIndex { .. })));
    }

    #[test]
    fn sphere_contributes_patches() {
        let mut builder = SceneBuilder::new();
        let white = builder.add_material("white", Material::new(Rgb::ONE, Rgb::ZERO, Rgb::ZERO, 1.0));
        builder
            .add_sphere(Vec3::new(0.0, 0.0, 0.0), 1.0, white)
            .unwrap();
        let scene = builder.build(8, 4);
        assert_eq!(scene.patches().len(), 32);
    }
}
