//! Math utilities and types
//!
//! Provides the fundamental math types used for transforms and vertex data.

pub use nalgebra::{Matrix3, Matrix4, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Build a translation * rotation(Y) * scale matrix
///
/// Covers the placements static scenery usually needs; arbitrary matrices can
/// still be assigned directly.
pub fn trs(position: Vec3, yaw_radians: f32, scale: Vec3) -> Mat4 {
    Mat4::new_translation(&position)
        * Mat4::from_axis_angle(&Vec3::y_axis(), yaw_radians)
        * Mat4::new_nonuniform_scaling(&scale)
}

/// Whether a transform mirrors geometry (negative determinant)
///
/// Mirrored transforms flip triangle winding, so merged geometry has to
/// reverse their index order.
pub fn is_mirrored(matrix: &Mat4) -> bool {
    matrix.determinant() < 0.0
}

/// Matrix that carries normals through `matrix`
///
/// Inverse-transpose of the upper 3x3. Falls back to the plain upper 3x3 when
/// the transform is singular.
pub fn normal_matrix(matrix: &Mat4) -> Mat3 {
    let upper: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    upper
        .try_inverse()
        .map_or(upper, |inverse| inverse.transpose())
}
