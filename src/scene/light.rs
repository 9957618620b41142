//! The scene's light list: the subset of faces flagged `is_light`, plus the
//! area-proportional sampling the photon mapper's emission step needs to
//! allocate a photon count proportional to each light's area share.

use rand::Rng;

use crate::ids::FaceId;
use crate::math::Vec3;

use super::face::{triangle_area, Face, Triangle};
use super::vertex::Vertex;

/// The faces that emit light, cached so emission doesn't have to scan every
/// face in the scene each time it runs.
#[derive(Clone, Debug, Default)]
pub struct LightList {
    faces: Vec<FaceId>,
}

impl LightList {
    pub fn build(faces: &[Face]) -> Self {
        let light_faces = faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_light)
            .map(|(i, _)| FaceId::from_index(i))
            .collect();
        Self { faces: light_faces }
    }

    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Total emitting area across every light face, used to apportion a
    /// photon emission budget.
    pub fn total_area(&self, scene_faces: &[Face], vertices: &[Vertex]) -> f32 {
        self.faces
            .iter()
            .map(|id| scene_faces[id.index()].area(vertices))
            .sum()
    }

    /// How many of `total_photons` this light should emit, proportional to
    /// its share of `total_area`. The last light absorbs any rounding
    /// remainder so the sum is exactly `total_photons`.
    pub fn photon_counts(&self, total_photons: u32, scene_faces: &[Face], vertices: &[Vertex]) -> Vec<u32> {
        let total_area = self.total_area(scene_faces, vertices);
        if total_area <= 0.0 || self.faces.is_empty() {
            return vec![0; self.faces.len()];
        }
        let mut counts: Vec<u32> = self
            .faces
            .iter()
            .map(|id| {
                let share = scene_faces[id.index()].area(vertices) / total_area;
                (share * total_photons as f32).round() as u32
            })
            .collect();
        let assigned: u32 = counts.iter().sum();
        if let (Some(last), true) = (counts.last_mut(), assigned != total_photons) {
            *last = last.saturating_add(total_photons).saturating_sub(assigned);
        }
        counts
    }

    /// A uniformly-distributed point on light face `id`'s quad: picks one
    /// of the two triangles weighted by area, then samples a uniform
    /// barycentric point within it.
    pub fn sample_point(
        &self,
        face: &Face,
        vertices: &[Vertex],
        rng: &mut impl Rng,
    ) -> Vec3 {
        let positions = |tri: Triangle| {
            let ids = tri.vertices(face);
            [
                vertices[ids[0].index()].position,
                vertices[ids[1].index()].position,
                vertices[ids[2].index()].position,
            ]
        };
        let first = positions(Triangle::First);
        let second = positions(Triangle::Second);
        let area_first = triangle_area(first[0], first[1], first[2]);
        let area_second = triangle_area(second[0], second[1], second[2]);
        let total = area_first + area_second;
        let tri = if total <= 0.0 || rng.gen::<f32>() * total < area_first {
            first
        } else {
            second
        };
        uniform_triangle_point(tri, rng)
    }
}

/// Uniform sample on a triangle via the standard square-root trick.
fn uniform_triangle_point(tri: [Vec3; 3], rng: &mut impl Rng) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let sqrt_r1 = r1.sqrt();
    let a = 1.0 - sqrt_r1;
    let b = sqrt_r1 * (1.0 - r2);
    let c = sqrt_r1 * r2;
    tri[0] * a + tri[1] * b + tri[2] * c
}
