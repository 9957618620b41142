//! Quad faces: four vertices split into two triangles `(v0,v1,v2)` and
//! `(v0,v2,v3)`. The four vertices need not be coplanar — `normal` is the
//! *average* of the two triangle normals and `area` is the sum of the two
//! triangle areas.

use cgmath::InnerSpace;

use crate::ids::{FaceId, MaterialId, VertexId};
use crate::math::Vec3;

use super::vertex::Vertex;

/// A quad face: an ordered list of four vertex indices, a material, and
/// whether it participates as an area light (a scene file's `l`
/// directive). Its own [`FaceId`] doubles as the index into the radiosity
/// solver's per-patch arrays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
    pub vertices: [VertexId; 4],
    pub material: MaterialId,
    pub is_light: bool,
}

impl Face {
    pub fn new(vertices: [VertexId; 4], material: MaterialId, is_light: bool) -> Self {
        Self {
            vertices,
            material,
            is_light,
        }
    }

    fn positions(&self, vertices: &[Vertex]) -> [Vec3; 4] {
        [
            vertices[self.vertices[0].index()].position,
            vertices[self.vertices[1].index()].position,
            vertices[self.vertices[2].index()].position,
            vertices[self.vertices[3].index()].position,
        ]
    }

    /// The average of the two triangles' normals. Not necessarily the same
    /// as either triangle's individual normal when the quad is non-planar.
    pub fn normal(&self, vertices: &[Vertex]) -> Vec3 {
        let p = self.positions(vertices);
        let n0 = triangle_normal(p[0], p[1], p[2]);
        let n1 = triangle_normal(p[0], p[2], p[3]);
        ((n0 + n1) * 0.5).normalize()
    }

    /// Sum of the two triangles' areas.
    pub fn area(&self, vertices: &[Vertex]) -> f32 {
        let p = self.positions(vertices);
        triangle_area(p[0], p[1], p[2]) + triangle_area(p[0], p[2], p[3])
    }

    /// The centroid, used as the single sample point for shadow-ray
    /// enumeration when soft-shadow sampling is disabled.
    pub fn centroid(&self, vertices: &[Vertex]) -> Vec3 {
        let p = self.positions(vertices);
        (p[0] + p[1] + p[2] + p[3]) * 0.25
    }
}

/// `½|(b-a) x (c-a)|`.
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    0.5 * (b - a).cross(c - a).magnitude()
}

fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let cross = (b - a).cross(c - a);
    if cross.magnitude2() > 0.0 {
        cross.normalize()
    } else {
        cross
    }
}

/// Uniquely identifies one of the two triangles making up a quad, used by
/// the ray caster to report which triangle (and thus which `(v0,v1,v2)` or
/// `(v0,v2,v3)` winding) was struck.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Triangle {
    First,
    Second,
}

impl Triangle {
    pub fn vertices(self, face: &Face) -> [VertexId; 3] {
        match self {
            Triangle::First => [face.vertices[0], face.vertices[1], face.vertices[2]],
            Triangle::Second => [face.vertices[0], face.vertices[2], face.vertices[3]],
        }
    }
}

#[allow(dead_code)]
fn _assert_face_id_is_index(_id: FaceId) {}
