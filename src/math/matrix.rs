//! 4x4 placement matrices, built on `cgmath` the way the rest of this crate
//! builds on `cgmath` for vector math.
//!
//! Axis-rotation/translation builders, plus directional (3x3) vs positional
//! (4x4 with w=1) transforms and a Cramer's-rule 3x3 determinant. The
//! builders are thin wrappers over `cgmath` constructors (translation,
//! axis-angle rotation already exist there and there is no reason to
//! reimplement them); the Cramer's-rule determinant is specifically the
//! solver the ray/triangle intersection test in [`crate::raycaster`] uses,
//! so it lives here as a free function rather than as a general-purpose
//! `Matrix4` method.

use cgmath::{Deg, InnerSpace, Matrix, SquareMatrix, Vector3};

use super::Vec3;

/// A rigid or general affine placement. Portals and any rigid-body
/// placement use this directly; it is `cgmath::Matrix4<f32>` with no
/// additional invariants.
pub type Matrix4 = cgmath::Matrix4<f32>;

/// Builds a translation matrix.
pub fn translation(t: Vec3) -> Matrix4 {
    Matrix4::from_translation(t)
}

/// Builds a rotation matrix of `degrees` about `axis` (which need not be
/// normalized).
pub fn axis_angle(axis: Vec3, degrees: f32) -> Matrix4 {
    Matrix4::from_axis_angle(axis.normalize(), Deg(degrees))
}

/// Transforms a point: the full 4x4 transform with an implicit `w = 1`.
pub fn transform_point(m: &Matrix4, p: Vec3) -> Vec3 {
    let v = m * p.extend(1.0);
    v.truncate()
}

/// Transforms a direction: only the 3x3 linear part, with no translation
/// component applied (`w = 0`).
pub fn transform_direction(m: &Matrix4, d: Vec3) -> Vec3 {
    let v = m * d.extend(0.0);
    v.truncate()
}

/// Inverts `m`. Panics if `m` is singular; callers that might hand in a
/// non-invertible portal transform should call `cgmath`'s `invert()`
/// directly first and surface `RenderError::DegeneratePortalTransform` on
/// `None` rather than going through this helper.
pub fn inverse(m: &Matrix4) -> Matrix4 {
    m.invert().expect("matrix is not invertible")
}

/// Solves the 3x3 linear system `A x = b` via Cramer's rule, returning
/// `None` if `|det A|` is below [`super::DETERMINANT_EPSILON`] (the ray is
/// parallel to the plane of the system, or the system is otherwise
/// degenerate).
///
/// This is the barycentric solve used by the ray/triangle intersection test
/// in [`crate::raycaster`]: for a triangle `(p0, p1, p2)`, the three columns
/// of `a` are `(p0 - p1)`, `(p0 - p2)`, and `ray.direction`; `b` is
/// `(p0 - ray.origin)`. The solution's components are `(beta, gamma, t)`,
/// with the hit point `p0 + beta*(p1-p0) + gamma*(p2-p0)` and barycentric
/// weight `(1 - beta - gamma)` on `p0`.
pub fn cramer3(a: [Vector3<f32>; 3], b: Vector3<f32>) -> Option<Vector3<f32>> {
    let det = determinant3(a[0], a[1], a[2]);
    if det.abs() < super::DETERMINANT_EPSILON {
        return None;
    }
    let x = determinant3(b, a[1], a[2]) / det;
    let y = determinant3(a[0], b, a[2]) / det;
    let z = determinant3(a[0], a[1], b) / det;
    Some(Vector3::new(x, y, z))
}

/// Determinant of the 3x3 matrix whose columns are `c0`, `c1`, `c2`.
fn determinant3(c0: Vector3<f32>, c1: Vector3<f32>, c2: Vector3<f32>) -> f32 {
    cgmath::Matrix3::from_cols(c0, c1, c2).determinant()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_moves_points_not_directions() {
        let m = translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            transform_point(&m, Vec3::new(0.0, 0.0, 0.0)),
            Vec3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(
            transform_direction(&m, Vec3::new(1.0, 0.0, 0.0)),
            Vec3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn axis_angle_rotates_90_degrees() {
        let m = axis_angle(Vec3::new(0.0, 0.0, 1.0), 90.0);
        let rotated = transform_direction(&m, Vec3::new(1.0, 0.0, 0.0));
        assert!((rotated - Vec3::new(0.0, 1.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn cramer3_solves_identity_system() {
        let solution = cramer3(
            [
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            Vector3::new(2.0, 3.0, 4.0),
        )
        .unwrap();
        assert_eq!(solution, Vector3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn cramer3_detects_degenerate_system() {
        let degenerate = cramer3(
            [
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            Vector3::new(1.0, 1.0, 1.0),
        );
        assert!(degenerate.is_none());
    }

    #[test]
    fn inverse_round_trips() {
        let m = translation(Vec3::new(1.0, -2.0, 0.5)) * axis_angle(Vec3::new(0.0, 1.0, 0.0), 37.0);
        let round_tripped = inverse(&inverse(&m));
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!((transform_point(&m, p) - transform_point(&round_tripped, p)).magnitude() < 1e-4);
    }
}
