//! A minimal ray-generating camera. Computing view/projection matrices is
//! the host's job; this type only turns an NDC coordinate into a
//! world-space [`Ray`].

use cgmath::SquareMatrix;

use crate::error::RenderError;
use crate::math::{Matrix4, Ray, Vec3};

/// A camera placed by a host-supplied inverse view-projection matrix.
/// `generate_ray` unprojects an NDC coordinate on the near and far planes
/// and draws a ray between them, which works for both perspective and
/// orthographic projections without the camera needing to know which one
/// it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    inverse_view_projection: Matrix4,
    position: Vec3,
}

impl Camera {
    /// Builds a camera from a world-space eye position and a host-supplied
    /// combined view-projection matrix.
    pub fn new(position: Vec3, view_projection: Matrix4) -> Result<Self, RenderError> {
        let inverse_view_projection = view_projection
            .invert()
            .ok_or(RenderError::MissingCamera)?;
        Ok(Self {
            inverse_view_projection,
            position,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// `(ndc_x, ndc_y)` each in `[-1, 1]`, with `+y` up and `+x` right,
    /// matching OpenGL-style NDC conventions.
    pub fn generate_ray(&self, ndc_x: f32, ndc_y: f32) -> Ray {
        let near = unproject(&self.inverse_view_projection, ndc_x, ndc_y, -1.0);
        let far = unproject(&self.inverse_view_projection, ndc_x, ndc_y, 1.0);
        Ray::new(near, far - near)
    }
}

fn unproject(inverse_view_projection: &Matrix4, x: f32, y: f32, z: f32) -> Vec3 {
    let clip = cgmath::Vector4::new(x, y, z, 1.0);
    let world = inverse_view_projection * clip;
    Vec3::new(world.x, world.y, world.z) / world.w
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn identity_projection_looks_down_negative_z() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 0.0), Matrix4::identity()).unwrap();
        let ray = camera.generate_ray(0.0, 0.0);
        assert!((ray.direction - Vec3::new(0.0, 0.0, -1.0)).magnitude() < 1e-4);
    }

    #[test]
    fn singular_view_projection_is_rejected() {
        let degenerate = Matrix4::from_nonuniform_scale(1.0, 1.0, 0.0);
        assert!(Camera::new(Vec3::new(0.0, 0.0, 0.0), degenerate).is_err());
    }
}
