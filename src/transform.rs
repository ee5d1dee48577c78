//! Rigid transform helpers
//!
//! All frames are [`Isometry3<f64>`]. CAD services usually report occurrence
//! transforms as 16 row-major values and mate connectors as three axes plus
//! an origin; these helpers convert both into isometries, rejecting anything
//! that is not a proper rigid motion.

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::error::{Error, Result};

/// Tolerance on orthonormality and on the homogeneous row
const RIGID_EPSILON: f64 = 1e-6;

/// Build an isometry from a 4x4 row-major homogeneous matrix
///
/// # Arguments
/// * `context` - Names the transform in error messages (e.g. the instance id)
/// * `m` - `[r00 r01 r02 tx r10 r11 r12 ty r20 r21 r22 tz 0 0 0 1]`
pub fn from_row_major(context: &str, m: &[f64; 16]) -> Result<Isometry3<f64>> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidAssembly(format!(
            "{}: transform contains non-finite values",
            context
        )));
    }
    let bottom = [m[12], m[13], m[14], m[15] - 1.0];
    if bottom.iter().any(|v| v.abs() > RIGID_EPSILON) {
        return Err(Error::InvalidAssembly(format!(
            "{}: transform bottom row must be [0 0 0 1], got [{} {} {} {}]",
            context, m[12], m[13], m[14], m[15]
        )));
    }

    let rotation = Matrix3::new(m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10]);
    let translation = Vector3::new(m[3], m[7], m[11]);
    from_rotation_matrix(context, rotation, translation)
}

/// Build a mate connector frame from its axes and origin
///
/// The axes become the columns of the rotation; `z` is the primary motion axis.
pub fn from_axes(
    context: &str,
    x: Vector3<f64>,
    y: Vector3<f64>,
    z: Vector3<f64>,
    origin: Point3<f64>,
) -> Result<Isometry3<f64>> {
    let rotation = Matrix3::from_columns(&[x, y, z]);
    from_rotation_matrix(context, rotation, origin.coords)
}

fn from_rotation_matrix(
    context: &str,
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
) -> Result<Isometry3<f64>> {
    let gram = rotation.transpose() * rotation;
    if (gram - Matrix3::identity()).abs().max() > RIGID_EPSILON {
        return Err(Error::InvalidAssembly(format!(
            "{}: rotation block is not orthonormal (scaled or sheared transform)",
            context
        )));
    }
    // Orthonormal matrices have determinant +1 or -1; -1 is a mirror
    let det = rotation.determinant();
    if det < 0.0 {
        return Err(Error::InvalidAssembly(format!(
            "{}: transform has negative determinant ({:.6}); mirrored occurrences are not rigid",
            context, det
        )));
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));
    Ok(Isometry3::from_parts(Translation3::from(translation), rotation))
}

/// Reject isometries that are not finite rigid motions
///
/// An [`Isometry3`] built with an unchecked quaternion can carry a scale or
/// non-finite components; both would corrupt every frame composed from it.
pub fn check_rigid(context: &str, transform: &Isometry3<f64>) -> Result<()> {
    let q = transform.rotation.coords;
    let t = transform.translation.vector;
    if q.iter().chain(t.iter()).any(|v| !v.is_finite()) {
        return Err(Error::InvalidAssembly(format!(
            "{}: transform contains non-finite values",
            context
        )));
    }
    if (q.norm() - 1.0).abs() > RIGID_EPSILON {
        return Err(Error::InvalidAssembly(format!(
            "{}: rotation is not a unit quaternion (norm {:.6}); scaled transforms are not rigid",
            context,
            q.norm()
        )));
    }
    Ok(())
}

/// Split an isometry into `xyz` translation and fixed-axis `rpy` angles
///
/// The angles follow the robot description convention `R = Rz(yaw) Ry(pitch) Rx(roll)`.
pub fn to_xyz_rpy(transform: &Isometry3<f64>) -> ([f64; 3], [f64; 3]) {
    let t = transform.translation.vector;
    let (roll, pitch, yaw) = transform.rotation.euler_angles();
    ([t.x, t.y, t.z], [roll, pitch, yaw])
}

/// Inverse of [`to_xyz_rpy`]
pub fn from_xyz_rpy(xyz: [f64; 3], rpy: [f64; 3]) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(xyz[0], xyz[1], xyz[2]),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    )
}

/// Whether two frames agree within `tolerance` in translation and rotation angle
pub fn frames_close(a: &Isometry3<f64>, b: &Isometry3<f64>, tolerance: f64) -> bool {
    let delta = a.inverse() * b;
    delta.translation.vector.norm() <= tolerance && delta.rotation.angle() <= tolerance
}
