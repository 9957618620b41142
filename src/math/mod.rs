//! Math and geometry primitives shared by every other module: vectors,
//! matrices, rays, hit records, and color. Kept in one module because the
//! ray caster, evaluator, photon mapper and radiosity solver all need to
//! agree on them bit-for-bit.

mod color;
mod matrix;
mod ray;

pub use color::{linear_to_srgb, srgb_to_linear, Rgb, Rgba};
pub use matrix::{axis_angle, cramer3, inverse, transform_direction, transform_point, translation, Matrix4};
pub use ray::{Hit, HitPrimitive, Ray};

/// A point or direction in world space. Re-exported from `cgmath` rather
/// than reimplemented — norm, dot, cross, normalize, and scalar/component
/// multiply and add are all native `cgmath::Vector3` operations.
pub type Vec3 = cgmath::Vector3<f32>;

/// Epsilon used as the minimum accepted ray parameter; enforced by
/// [`Hit`]'s `t >= EPSILON` invariant.
pub const EPSILON: f32 = 1e-4;

/// Epsilon used for barycentric/triangle-edge inclusion tests in the ray
/// caster.
pub const BARYCENTRIC_EPSILON: f32 = 1e-5;

/// Minimum accepted Cramer's-rule determinant magnitude before a
/// ray/triangle system is treated as degenerate (parallel ray and plane).
pub const DETERMINANT_EPSILON: f32 = 1e-6;

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn vec3_is_cgmath_vector3() {
        let v: Vec3 = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(v.magnitude(), 5.0);
    }
}
