//! Local-to-world bounds for instanced objects.

use crate::util::{Bounds, Mat4, Vec3};

/// World-space AABB of `local` under an affine `transform`.
///
/// Each local axis contributes independently along its basis column, so the
/// per-axis min/max of `basis * lower[axis]` and `basis * upper[axis]`
/// summed with the translation gives the same box as transforming all
/// eight corners.
#[inline]
pub fn world_bounds(local: &Bounds, transform: &Mat4) -> Bounds {
    if local.is_empty() {
        return Bounds::EMPTY;
    }

    let right = transform.x_axis.truncate();
    let up = transform.y_axis.truncate();
    let forward = transform.z_axis.truncate();
    let translation = transform.w_axis.truncate();

    let xa = right * local.lower.x;
    let xb = right * local.upper.x;
    let ya = up * local.lower.y;
    let yb = up * local.upper.y;
    let za = forward * local.lower.z;
    let zb = forward * local.upper.z;

    Bounds {
        lower: xa.min(xb) + ya.min(yb) + za.min(zb) + translation,
        upper: xa.max(xb) + ya.max(yb) + za.max(zb) + translation,
    }
}

/// Reference implementation: transform all eight corners.
pub fn world_bounds_from_corners(local: &Bounds, transform: &Mat4) -> Bounds {
    if local.is_empty() {
        return Bounds::EMPTY;
    }
    let (lo, hi) = (local.lower, local.upper);
    let corners = [
        Vec3::new(lo.x, lo.y, lo.z),
        Vec3::new(hi.x, lo.y, lo.z),
        Vec3::new(lo.x, hi.y, lo.z),
        Vec3::new(hi.x, hi.y, lo.z),
        Vec3::new(lo.x, lo.y, hi.z),
        Vec3::new(hi.x, lo.y, hi.z),
        Vec3::new(lo.x, hi.y, hi.z),
        Vec3::new(hi.x, hi.y, hi.z),
    ];
    Bounds::from_points(corners.iter().map(|c| transform.transform_point3(*c)))
}
