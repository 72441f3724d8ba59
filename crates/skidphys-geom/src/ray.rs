use skidphys_core::types::{Isometry, Vec3};
use crate::shape::Shape;

/// Closest hit of a segment against one shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeRayHit {
    /// Position along `from -> to`, in [0, 1].
    pub fraction: f32,
    /// World-space outward surface normal.
    pub normal: Vec3,
}

/// Casts the segment `from -> to` against `shape` posed at `xf`.
/// Segments that start inside the shape report no hit.
pub fn ray_cast(shape: &Shape, xf: &Isometry, from: Vec3, to: Vec3) -> Option<ShapeRayHit> {
    let o = xf.inverse_transform_point(from);
    let d = xf.inverse_transform_point(to) - o;
    if d.length_squared() < 1e-12 { return None; }
    let local = match *shape {
        Shape::Sphere { r } => ray_sphere(o, d, Vec3::ZERO, r),
        Shape::Box { hx, hy, hz } => ray_box(o, d, Vec3::new(hx, hy, hz)),
        Shape::Plane { normal, d: offset } => ray_plane(o, d, normal, offset),
        Shape::Capsule { r, hh } => ray_capsule(o, d, r, hh),
        Shape::Cylinder { r, hh } => ray_cylinder(o, d, r, hh),
    }?;
    Some(ShapeRayHit { fraction: local.0, normal: xf.transform_vector(local.1).normalize_or_zero() })
}

fn ray_sphere(o: Vec3, d: Vec3, c: Vec3, r: f32) -> Option<(f32, Vec3)> {
    let m = o - c;
    let cc = m.length_squared() - r * r;
    if cc <= 0.0 { return None; }
    let a = d.length_squared();
    let b = m.dot(d);
    if b >= 0.0 { return None; }
    let disc = b * b - a * cc;
    if disc < 0.0 { return None; }
    let t = (-b - disc.sqrt()) / a;
    if !(0.0..=1.0).contains(&t) { return None; }
    Some((t, (m + d * t) / r))
}

fn ray_box(o: Vec3, d: Vec3, he: Vec3) -> Option<(f32, Vec3)> {
    if o.abs().cmple(he).all() { return None; }
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;
    let mut axis = 0usize;
    for i in 0..3 {
        if d[i].abs() < 1e-12 {
            if o[i].abs() > he[i] { return None; }
            continue;
        }
        let inv = 1.0 / d[i];
        let (mut a, mut b) = ((-he[i] - o[i]) * inv, (he[i] - o[i]) * inv);
        if a > b { core::mem::swap(&mut a, &mut b); }
        if a > t_enter { t_enter = a; axis = i; }
        t_exit = t_exit.min(b);
        if t_enter > t_exit { return None; }
    }
    let mut n = Vec3::ZERO;
    n[axis] = -d[axis].signum();
    Some((t_enter, n))
}

fn ray_plane(o: Vec3, d: Vec3, normal: Vec3, offset: f32) -> Option<(f32, Vec3)> {
    let n = normal.normalize_or_zero();
    let dist = n.dot(o) - offset;
    let denom = n.dot(d);
    // only the front face, approached from outside
    if dist <= 0.0 || denom >= 0.0 { return None; }
    let t = -dist / denom;
    if t > 1.0 { return None; }
    Some((t, n))
}

/// Side wall of an infinite Y-aligned cylinder.
fn ray_tube(o: Vec3, d: Vec3, r: f32) -> Option<(f32, Vec3)> {
    let a = d.x * d.x + d.z * d.z;
    if a < 1e-12 { return None; }
    let b = o.x * d.x + o.z * d.z;
    let c = o.x * o.x + o.z * o.z - r * r;
    if c <= 0.0 || b >= 0.0 { return None; }
    let disc = b * b - a * c;
    if disc < 0.0 { return None; }
    let t = (-b - disc.sqrt()) / a;
    if !(0.0..=1.0).contains(&t) { return None; }
    let p = o + d * t;
    Some((t, Vec3::new(p.x, 0.0, p.z) / r))
}

fn closest_of(a: Option<(f32, Vec3)>, b: Option<(f32, Vec3)>) -> Option<(f32, Vec3)> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y.0 < x.0 { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

fn ray_capsule(o: Vec3, d: Vec3, r: f32, hh: f32) -> Option<(f32, Vec3)> {
    let seg_y = o.y.clamp(-hh, hh);
    if (o - Vec3::new(0.0, seg_y, 0.0)).length_squared() <= r * r { return None; }
    let side = ray_tube(o, d, r).filter(|(t, _)| (o.y + d.y * t).abs() <= hh);
    let top = ray_sphere(o, d, Vec3::new(0.0, hh, 0.0), r);
    let bottom = ray_sphere(o, d, Vec3::new(0.0, -hh, 0.0), r);
    closest_of(side, closest_of(top, bottom))
}

fn ray_cylinder(o: Vec3, d: Vec3, r: f32, hh: f32) -> Option<(f32, Vec3)> {
    if o.y.abs() <= hh && o.x * o.x + o.z * o.z <= r * r { return None; }
    let side = ray_tube(o, d, r).filter(|(t, _)| (o.y + d.y * t).abs() <= hh);
    let mut cap = None;
    if d.y.abs() > 1e-12 {
        for sign in [1.0f32, -1.0] {
            let y = hh * sign;
            // only caps facing the ray origin
            if (o.y - y) * sign <= 0.0 { continue; }
            let t = (y - o.y) / d.y;
            if !(0.0..=1.0).contains(&t) { continue; }
            let p = o + d * t;
            if p.x * p.x + p.z * p.z <= r * r {
                cap = closest_of(cap, Some((t, Vec3::new(0.0, sign, 0.0))));
            }
        }
    }
    closest_of(side, cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::{iso, vec3, Quat};

    #[test]
    fn sphere_hit_fraction_and_normal() {
        let s = Shape::Sphere { r: 1.0 };
        let xf = Isometry::from_translation(vec3(0.0, 0.0, 5.0));
        let h = ray_cast(&s, &xf, Vec3::ZERO, vec3(0.0, 0.0, 10.0)).unwrap();
        assert_relative_eq!(h.fraction, 0.4, epsilon = 1e-5);
        assert_relative_eq!(h.normal.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn start_inside_reports_nothing() {
        let xf = Isometry::IDENTITY;
        for s in [
            Shape::Sphere { r: 1.0 },
            Shape::Box { hx: 1.0, hy: 1.0, hz: 1.0 },
            Shape::Capsule { r: 0.5, hh: 1.0 },
            Shape::Cylinder { r: 0.5, hh: 1.0 },
        ] {
            assert!(ray_cast(&s, &xf, vec3(0.1, 0.2, 0.0), vec3(5.0, 0.2, 0.0)).is_none(), "{s:?}");
        }
    }

    #[test]
    fn plane_front_face_only() {
        let p = Shape::Plane { normal: Vec3::Y, d: 0.0 };
        let xf = Isometry::IDENTITY;
        let h = ray_cast(&p, &xf, vec3(0.0, 2.0, 0.0), vec3(0.0, -2.0, 0.0)).unwrap();
        assert_relative_eq!(h.fraction, 0.5, epsilon = 1e-6);
        assert_relative_eq!(h.normal.y, 1.0, epsilon = 1e-6);
        assert!(ray_cast(&p, &xf, vec3(0.0, -2.0, 0.0), vec3(0.0, 2.0, 0.0)).is_none());
        assert!(ray_cast(&p, &xf, vec3(0.0, 2.0, 0.0), vec3(0.0, 1.0, 0.0)).is_none());
    }

    #[test]
    fn rotated_box_normal_is_world_space() {
        let b = Shape::Box { hx: 1.0, hy: 1.0, hz: 1.0 };
        let xf = iso(vec3(0.0, 0.0, 0.0), Quat::from_rotation_y(core::f32::consts::FRAC_PI_2));
        let h = ray_cast(&b, &xf, vec3(-4.0, 0.0, 0.0), vec3(4.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(h.fraction, 3.0 / 8.0, epsilon = 1e-5);
        assert_relative_eq!(h.normal.x, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn capsule_and_cylinder_caps() {
        let c = Shape::Capsule { r: 0.5, hh: 1.0 };
        let h = ray_cast(&c, &Isometry::IDENTITY, vec3(0.0, 5.0, 0.0), vec3(0.0, -5.0, 0.0)).unwrap();
        assert_relative_eq!(h.fraction, 0.35, epsilon = 1e-5);
        let cy = Shape::Cylinder { r: 0.5, hh: 1.0 };
        let h = ray_cast(&cy, &Isometry::IDENTITY, vec3(0.2, 5.0, 0.0), vec3(0.2, -5.0, 0.0)).unwrap();
        assert_relative_eq!(h.fraction, 0.4, epsilon = 1e-5);
        assert_relative_eq!(h.normal.y, 1.0, epsilon = 1e-6);
        let h = ray_cast(&cy, &Isometry::IDENTITY, vec3(-5.0, 0.0, 0.0), vec3(5.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(h.fraction, 0.45, epsilon = 1e-5);
    }
}
