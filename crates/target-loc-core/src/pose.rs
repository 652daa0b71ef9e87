//! Pose of a planar square marker from its four image corners.
//!
//! The marker frame has its origin at the marker center, x to the right,
//! y down and z pointing into the marker, so a marker facing the camera
//! upright has identity rotation.

use nalgebra::{
    Isometry3, Matrix2x3, Matrix3, Matrix3x6, Matrix6, Point2, Point3, Rotation3, Translation3,
    UnitQuaternion, Vector2, Vector3, Vector6,
};

use crate::{homography_from_4pt, CameraIntrinsics};

const REFINE_MAX_ITERS: usize = 20;
const REFINE_STEP_TOL: f64 = 1e-12;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("camera intrinsics are not usable")]
    InvalidIntrinsics,
    #[error("marker side length must be positive and finite (got {0})")]
    InvalidSide(f64),
    #[error("degenerate corner geometry")]
    Degenerate,
}

/// Object-space corners of a square marker with side `side` (TL, TR, BR, BL).
pub fn square_object_corners(side: f64) -> [Point3<f64>; 4] {
    let h = 0.5 * side;
    [
        Point3::new(-h, -h, 0.0),
        Point3::new(h, -h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(-h, h, 0.0),
    ]
}

/// Estimate the marker-to-camera transform from the four observed corners.
///
/// `corners` must be ordered TL, TR, BR, BL in the marker's own frame. When
/// `refine` is set, the closed-form homography solution is polished by
/// Gauss-Newton on the reprojection error.
pub fn solve_square_pose(
    corners: &[Point2<f64>; 4],
    side: f64,
    intrinsics: &CameraIntrinsics,
    refine: bool,
) -> Result<Isometry3<f64>, PoseError> {
    if !intrinsics.is_valid() {
        return Err(PoseError::InvalidIntrinsics);
    }
    if !(side.is_finite() && side > 0.0) {
        return Err(PoseError::InvalidSide(side));
    }

    let object = square_object_corners(side);
    let plane = object.map(|p| Point2::new(p.x, p.y));
    let h = homography_from_4pt(&plane, corners).ok_or(PoseError::Degenerate)?;
    let initial = pose_from_homography(&intrinsics.matrix(), &h.h)?;

    if !refine {
        return Ok(initial);
    }
    Ok(refine_pose(initial, &object, corners, intrinsics))
}

/// Decompose a plane-induced homography `H ~ K [r1 r2 t]` into a pose.
fn pose_from_homography(
    kmtx: &Matrix3<f64>,
    hmtx: &Matrix3<f64>,
) -> Result<Isometry3<f64>, PoseError> {
    let k_inv = kmtx.try_inverse().ok_or(PoseError::InvalidIntrinsics)?;

    let k_inv_h1 = k_inv * hmtx.column(0);
    let k_inv_h2 = k_inv * hmtx.column(1);
    let k_inv_h3 = k_inv * hmtx.column(2);

    let norm1 = k_inv_h1.norm();
    let norm2 = k_inv_h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return Err(PoseError::Degenerate);
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1: Vector3<f64> = lambda * k_inv_h1;
    let mut r2: Vector3<f64> = lambda * k_inv_h2;
    let mut t: Vector3<f64> = lambda * k_inv_h3;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PoseError::Degenerate);
    }

    let mut r_mat = Matrix3::<f64>::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    // Project onto SO(3).
    let svd = r_mat.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(PoseError::Degenerate);
    };
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok(Isometry3::from_parts(Translation3::from(t), rot))
}

fn reprojection_cost(
    pose: &Isometry3<f64>,
    object: &[Point3<f64>; 4],
    corners: &[Point2<f64>; 4],
    k: &CameraIntrinsics,
) -> Option<f64> {
    let mut cost = 0.0;
    for (x, u) in object.iter().zip(corners) {
        let p = k.project(&(pose * x))?;
        cost += (p - u).norm_squared();
    }
    Some(cost)
}

fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

fn refine_pose(
    initial: Isometry3<f64>,
    object: &[Point3<f64>; 4],
    corners: &[Point2<f64>; 4],
    k: &CameraIntrinsics,
) -> Isometry3<f64> {
    let Some(mut cost) = reprojection_cost(&initial, object, corners, k) else {
        return initial;
    };
    let mut pose = initial;

    for _ in 0..REFINE_MAX_ITERS {
        let mut jtj = Matrix6::<f64>::zeros();
        let mut jtr = Vector6::<f64>::zeros();

        for (x, u) in object.iter().zip(corners) {
            let rx = pose.rotation * x.coords;
            let pc = rx + pose.translation.vector;
            if pc.z <= 1e-9 {
                return pose;
            }
            let iz = 1.0 / pc.z;
            let residual = Vector2::new(
                k.fx * pc.x * iz + k.px - u.x,
                k.fy * pc.y * iz + k.py - u.y,
            );
            let d_proj = Matrix2x3::new(
                k.fx * iz, 0.0, -k.fx * pc.x * iz * iz, //
                0.0, k.fy * iz, -k.fy * pc.y * iz * iz,
            );
            // Left perturbation: t += dt, R = exp(dw) R.
            let mut d_point = Matrix3x6::<f64>::zeros();
            d_point
                .fixed_view_mut::<3, 3>(0, 0)
                .copy_from(&Matrix3::identity());
            d_point.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-skew(&rx)));

            let j = d_proj * d_point;
            jtj += j.transpose() * j;
            jtr += j.transpose() * residual;
        }

        let damping = 1e-9 * jtj.trace().max(1e-12);
        let damped = jtj + Matrix6::identity() * damping;
        let Some(chol) = damped.cholesky() else {
            break;
        };
        let delta = chol.solve(&(-jtr));

        let mut candidate = pose;
        candidate.translation.vector += Vector3::new(delta[0], delta[1], delta[2]);
        candidate.rotation =
            UnitQuaternion::from_scaled_axis(Vector3::new(delta[3], delta[4], delta[5]))
                * candidate.rotation;

        match reprojection_cost(&candidate, object, corners, k) {
            Some(c) if c <= cost => {
                pose = candidate;
                cost = c;
            }
            _ => break,
        }
        if delta.norm() < REFINE_STEP_TOL {
            break;
        }
    }

    pose
}

/// Quaternion as `[x, y, z, w]` with `w >= 0`.
pub fn quaternion_xyzw(q: &UnitQuaternion<f64>) -> [f64; 4] {
    let s = if q.w < 0.0 { -1.0 } else { 1.0 };
    [s * q.i, s * q.j, s * q.k, s * q.w]
}
