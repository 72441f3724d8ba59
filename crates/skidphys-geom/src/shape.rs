use skidphys_core::types::{Isometry, Vec3, Mat3};
use crate::aabb::Aabb;

/// Half extent used for the bounds of an infinite plane.
pub const PLANE_EXTENT: f32 = 1.0e5;

/// Convex collision shapes, expressed in the body's local frame.
/// Capsules and cylinders run along local Y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Sphere { r: f32 },
    Box { hx: f32, hy: f32, hz: f32 },
    Capsule { r: f32, hh: f32 },
    Cylinder { r: f32, hh: f32 },
    /// Points with `normal . p <= d` are inside. Only meaningful on static bodies.
    Plane { normal: Vec3, d: f32 },
}

impl Shape {
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Shape::Sphere { r } => Vec3::splat(r),
            Shape::Box { hx, hy, hz } => Vec3::new(hx, hy, hz),
            Shape::Capsule { r, hh } => Vec3::new(r, hh + r, r),
            Shape::Cylinder { r, hh } => Vec3::new(r, hh, r),
            Shape::Plane { .. } => Vec3::splat(PLANE_EXTENT),
        }
    }

    /// Radius of a sphere around the local origin that contains the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Shape::Sphere { r } => r,
            Shape::Plane { .. } => PLANE_EXTENT,
            _ => self.half_extents().length(),
        }
    }

    pub fn is_plane(&self) -> bool { matches!(self, Shape::Plane { .. }) }
}

#[inline]
fn rotated_half_extents(he: Vec3, xf: &Isometry) -> Vec3 {
    let rot = xf.basis();
    let m = Mat3::from_cols(rot.x_axis.abs(), rot.y_axis.abs(), rot.z_axis.abs());
    m * he
}

#[inline]
pub fn aabb_of(shape: &Shape, xf: &Isometry) -> Aabb {
    match *shape {
        Shape::Sphere { r } => Aabb::from_center_half_extents(xf.pos, Vec3::splat(r)),
        Shape::Box { hx, hy, hz } => {
            Aabb::from_center_half_extents(xf.pos, rotated_half_extents(Vec3::new(hx, hy, hz), xf))
        }
        Shape::Capsule { r, hh } => {
            let axis_world = xf.rot * Vec3::Y * hh.abs();
            Aabb::from_center_half_extents(xf.pos, axis_world.abs() + Vec3::splat(r))
        }
        Shape::Cylinder { r, hh } => {
            // exact box for a disc stack: axis extent plus the rim's projection
            let a = xf.rot * Vec3::Y;
            let rim = Vec3::new(
                (1.0 - a.x * a.x).max(0.0).sqrt(),
                (1.0 - a.y * a.y).max(0.0).sqrt(),
                (1.0 - a.z * a.z).max(0.0).sqrt(),
            ) * r;
            Aabb::from_center_half_extents(xf.pos, (a * hh).abs() + rim)
        }
        Shape::Plane { .. } => Aabb::from_center_half_extents(xf.pos, Vec3::splat(PLANE_EXTENT)),
    }
}

/// Furthest local point along `dir` (local frame).
pub fn local_support(shape: &Shape, dir: Vec3) -> Vec3 {
    let d = if dir.length_squared() > 1e-12 { dir.normalize() } else { Vec3::X };
    match *shape {
        Shape::Sphere { r } => d * r,
        Shape::Box { hx, hy, hz } => Vec3::new(
            hx.copysign(d.x), hy.copysign(d.y), hz.copysign(d.z),
        ),
        Shape::Capsule { r, hh } => Vec3::new(0.0, hh.copysign(d.y), 0.0) + d * r,
        Shape::Cylinder { r, hh } => {
            let radial = Vec3::new(d.x, 0.0, d.z);
            let rim = if radial.length_squared() > 1e-12 { radial.normalize() * r } else { Vec3::ZERO };
            rim + Vec3::new(0.0, hh.copysign(d.y), 0.0)
        }
        Shape::Plane { normal, d: offset } => {
            // unbounded; clamp the tangential part to the plane's bounds
            let n = normal.normalize_or_zero();
            let tangential = (d - n * d.dot(n)) * PLANE_EXTENT;
            n * offset + tangential
        }
    }
}

/// Diagonal of the local inertia tensor for the given mass.
pub fn local_inertia(shape: &Shape, mass: f32) -> Vec3 {
    if mass <= 0.0 { return Vec3::ZERO; }
    match *shape {
        Shape::Sphere { r } => Vec3::splat(0.4 * mass * r * r),
        Shape::Box { hx, hy, hz } => {
            let (x2, y2, z2) = (hx * hx, hy * hy, hz * hz);
            Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
        }
        Shape::Capsule { r, hh } => {
            let h = hh * 2.0;
            let side = 0.25 * mass * r * r + (1.0 / 12.0) * mass * h * h;
            Vec3::new(side, 0.5 * mass * r * r, side)
        }
        Shape::Cylinder { r, hh } => {
            let h = hh * 2.0;
            let side = mass * (3.0 * r * r + h * h) / 12.0;
            Vec3::new(side, 0.5 * mass * r * r, side)
        }
        Shape::Plane { .. } => Vec3::ZERO,
    }
}
