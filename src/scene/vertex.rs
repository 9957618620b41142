//! Scene vertices: position, texture coordinates, and an index for
//! debugging/error messages.

use crate::math::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: (f32, f32),
    pub index: u32,
}

impl Vertex {
    pub fn new(position: Vec3, uv: (f32, f32), index: u32) -> Self {
        Self { position, uv, index }
    }
}
