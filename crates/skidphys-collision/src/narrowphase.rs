use skidphys_core::types::{Isometry, Vec3};
use skidphys_geom::Shape;

/// Maximum points kept per pair.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// One contact produced for the ordered pair (A, B).
/// `normal_on_b` points from B toward A; `distance` is negative when penetrating.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawContact {
    pub point_on_b: Vec3,
    pub normal_on_b: Vec3,
    pub distance: f32,
}

impl RawContact {
    #[inline] pub fn point_on_a(&self) -> Vec3 { self.point_on_b + self.normal_on_b * self.distance }

    fn flipped(self) -> RawContact {
        RawContact { point_on_b: self.point_on_a(), normal_on_b: -self.normal_on_b, distance: self.distance }
    }
}

/// Contacts between two posed shapes, closer than `margin`.
/// Cylinders are treated as boxes except against planes.
pub fn contacts_between(a: &Shape, xa: &Isometry, b: &Shape, xb: &Isometry, margin: f32) -> Vec<RawContact> {
    let sa = as_box_unless_plane(a, b);
    let sb = as_box_unless_plane(b, a);
    let mut out = match (sa, sb) {
        (Shape::Plane { .. }, Shape::Plane { .. }) => Vec::new(),
        (_, Shape::Plane { normal, d }) => convex_plane(&sa, xa, normal, d, xb, margin),
        (Shape::Plane { .. }, _) => flip_all(contacts_between(b, xb, a, xa, margin)),

        (Shape::Sphere { r: ra }, Shape::Sphere { r: rb }) => sphere_sphere(xa.pos, ra, xb.pos, rb, margin).into_iter().collect(),
        (Shape::Sphere { r }, Shape::Box { hx, hy, hz }) => sphere_box(xa.pos, r, Vec3::new(hx, hy, hz), xb, margin).into_iter().collect(),
        (Shape::Box { .. }, Shape::Sphere { .. }) => flip_all(contacts_between(b, xb, a, xa, margin)),
        (Shape::Capsule { r, hh }, Shape::Sphere { r: rs }) => {
            let (p0, p1) = segment(xa, hh);
            let q = closest_point_on_segment(p0, p1, xb.pos);
            sphere_sphere(q, r, xb.pos, rs, margin).into_iter().collect()
        }
        (Shape::Sphere { .. }, Shape::Capsule { .. }) => flip_all(contacts_between(b, xb, a, xa, margin)),
        (Shape::Capsule { r: ra, hh: ha }, Shape::Capsule { r: rb, hh: hb }) => {
            let (a0, a1) = segment(xa, ha);
            let (b0, b1) = segment(xb, hb);
            let (pa, pb) = closest_points_segments(a0, a1, b0, b1);
            sphere_sphere(pa, ra, pb, rb, margin).into_iter().collect()
        }
        (Shape::Capsule { r, hh }, Shape::Box { hx, hy, hz }) => capsule_box(xa, r, hh, Vec3::new(hx, hy, hz), xb, margin),
        (Shape::Box { .. }, Shape::Capsule { .. }) => flip_all(contacts_between(b, xb, a, xa, margin)),
        (Shape::Box { hx, hy, hz }, Shape::Box { hx: bx, hy: by, hz: bz }) => {
            box_box(Vec3::new(hx, hy, hz), xa, Vec3::new(bx, by, bz), xb, margin)
        }
        // cylinders were rewritten above
        (Shape::Cylinder { .. }, _) | (_, Shape::Cylinder { .. }) => Vec::new(),
    };
    reduce(&mut out);
    out
}

fn as_box_unless_plane(s: &Shape, other: &Shape) -> Shape {
    match (*s, other) {
        (Shape::Cylinder { .. }, Shape::Plane { .. }) => *s,
        (Shape::Cylinder { r, hh }, _) => Shape::Box { hx: r, hy: hh, hz: r },
        _ => *s,
    }
}

fn flip_all(v: Vec<RawContact>) -> Vec<RawContact> { v.into_iter().map(RawContact::flipped).collect() }

/// Keeps the deepest points when a pair produced too many.
fn reduce(v: &mut Vec<RawContact>) {
    if v.len() <= MAX_MANIFOLD_POINTS { return; }
    v.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    v.truncate(MAX_MANIFOLD_POINTS);
}

/* ---------- pair routines ---------- */

fn sphere_sphere(pa: Vec3, ra: f32, pb: Vec3, rb: f32, margin: f32) -> Option<RawContact> {
    let d = pa - pb;
    let len = d.length();
    let distance = len - ra - rb;
    if distance > margin { return None; }
    let n = if len > 1.0e-6 { d / len } else { Vec3::Y };
    Some(RawContact { point_on_b: pb + n * rb, normal_on_b: n, distance })
}

fn sphere_box(center: Vec3, r: f32, he: Vec3, xb: &Isometry, margin: f32) -> Option<RawContact> {
    let c = xb.inverse_transform_point(center);
    let q = c.clamp(-he, he);
    let diff = c - q;
    let len = diff.length();
    let (n_local, q, depth_to_surface) = if len > 1.0e-6 {
        (diff / len, q, len)
    } else {
        // center inside: push out through the nearest face
        let pen = he - c.abs();
        let axis = if pen.x <= pen.y && pen.x <= pen.z { 0 } else if pen.y <= pen.z { 1 } else { 2 };
        let mut n = Vec3::ZERO;
        let s = if c[axis] >= 0.0 { 1.0 } else { -1.0 };
        n[axis] = s;
        let mut face = c;
        face[axis] = he[axis] * s;
        (n, face, -pen[axis])
    };
    let distance = depth_to_surface - r;
    if distance > margin { return None; }
    Some(RawContact {
        point_on_b: xb.transform_point(q),
        normal_on_b: xb.transform_vector(n_local).normalize_or_zero(),
        distance,
    })
}

fn capsule_box(xa: &Isometry, r: f32, hh: f32, he: Vec3, xb: &Isometry, margin: f32) -> Vec<RawContact> {
    let (p0, p1) = segment(xa, hh);
    let mut out: Vec<RawContact> = [p0, p1]
        .into_iter()
        .filter_map(|p| sphere_box(p, r, he, xb, margin))
        .collect();
    if out.is_empty() {
        let l0 = xb.inverse_transform_point(p0);
        let l1 = xb.inverse_transform_point(p1);
        let (ps, _) = closest_points_segment_box(l0, l1, he);
        out.extend(sphere_box(xb.transform_point(ps), r, he, xb, margin));
    }
    out
}

/// Convex shape A against the plane `normal . p = d` in B's frame.
fn convex_plane(a: &Shape, xa: &Isometry, normal: Vec3, d: f32, xb: &Isometry, margin: f32) -> Vec<RawContact> {
    let n = xb.transform_vector(normal.normalize_or_zero());
    let origin = xb.transform_point(normal.normalize_or_zero() * d);
    let mut candidates: Vec<Vec3> = Vec::with_capacity(8);
    match *a {
        Shape::Sphere { r } => candidates.push(xa.pos - n * r),
        Shape::Capsule { r, hh } => {
            let (p0, p1) = segment(xa, hh);
            candidates.push(p0 - n * r);
            candidates.push(p1 - n * r);
        }
        Shape::Box { hx, hy, hz } => {
            for sx in [-1.0f32, 1.0] { for sy in [-1.0f32, 1.0] { for sz in [-1.0f32, 1.0] {
                candidates.push(xa.transform_point(Vec3::new(hx * sx, hy * sy, hz * sz)));
            }}}
        }
        Shape::Cylinder { r, hh } => {
            let down_local = xa.inverse_transform_vector(-n);
            let radial = Vec3::new(down_local.x, 0.0, down_local.z);
            for y in [-hh, hh] {
                if radial.length_squared() > 1.0e-6 {
                    candidates.push(xa.transform_point(radial.normalize() * r + Vec3::new(0.0, y, 0.0)));
                } else {
                    // cap flat on the plane: sample the rim
                    for dir in [Vec3::X, Vec3::Z, -Vec3::X, -Vec3::Z] {
                        candidates.push(xa.transform_point(dir * r + Vec3::new(0.0, y, 0.0)));
                    }
                }
            }
        }
        Shape::Plane { .. } => {}
    }
    candidates
        .into_iter()
        .filter_map(|v| {
            let s = n.dot(v - origin);
            (s <= margin).then(|| RawContact { point_on_b: v - n * s, normal_on_b: n, distance: s })
        })
        .collect()
}

/// Separating-axis test over face and edge axes, then vertex clipping.
fn box_box(ha: Vec3, xa: &Isometry, hb: Vec3, xb: &Isometry, margin: f32) -> Vec<RawContact> {
    let ra = xa.basis();
    let rb = xb.basis();
    let axes_a = [ra.x_axis, ra.y_axis, ra.z_axis];
    let axes_b = [rb.x_axis, rb.y_axis, rb.z_axis];
    let t = xa.pos - xb.pos;

    let project = |axes: &[Vec3; 3], he: Vec3, l: Vec3| -> f32 {
        he.x * axes[0].dot(l).abs() + he.y * axes[1].dot(l).abs() + he.z * axes[2].dot(l).abs()
    };

    let mut best_sep = f32::NEG_INFINITY;
    let mut best_axis = Vec3::Y;
    let mut consider = |l: Vec3, bias: f32| -> bool {
        let len2 = l.length_squared();
        if len2 < 1.0e-8 { return true; }
        let l = l / len2.sqrt();
        let sep = t.dot(l).abs() - project(&axes_a, ha, l) - project(&axes_b, hb, l);
        if sep > margin { return false; }
        // prefer face axes over nearly equal edge axes
        if sep > best_sep + bias {
            best_sep = sep;
            best_axis = if t.dot(l) >= 0.0 { l } else { -l };
        }
        true
    };
    for l in axes_a.iter().chain(axes_b.iter()) {
        if !consider(*l, 0.0) { return Vec::new(); }
    }
    for ea in &axes_a {
        for eb in &axes_b {
            if !consider(ea.cross(*eb), 1.0e-3) { return Vec::new(); }
        }
    }
    let n = best_axis; // B -> A

    let corners = |he: Vec3, xf: &Isometry| -> Vec<Vec3> {
        let mut v = Vec::with_capacity(8);
        for sx in [-1.0f32, 1.0] { for sy in [-1.0f32, 1.0] { for sz in [-1.0f32, 1.0] {
            v.push(xf.transform_point(Vec3::new(he.x * sx, he.y * sy, he.z * sz)));
        }}}
        v
    };
    let ca = corners(ha, xa);
    let cb = corners(hb, xb);
    let b_top = cb.iter().map(|v| n.dot(*v)).fold(f32::NEG_INFINITY, f32::max);
    let a_bottom = ca.iter().map(|v| n.dot(*v)).fold(f32::INFINITY, f32::min);
    let grow = Vec3::splat(margin.max(0.0) + 1.0e-4);

    let mut out = Vec::new();
    for v in &ca {
        if xb.inverse_transform_point(*v).abs().cmple(hb + grow).all() {
            let distance = n.dot(*v) - b_top;
            out.push(RawContact { point_on_b: *v - n * distance, normal_on_b: n, distance });
        }
    }
    for v in &cb {
        if xa.inverse_transform_point(*v).abs().cmple(ha + grow).all() {
            out.push(RawContact { point_on_b: *v, normal_on_b: n, distance: a_bottom - n.dot(*v) });
        }
    }
    out.retain(|c| c.distance <= margin);
    if out.is_empty() {
        // edge-edge: one point at A's deepest corner
        if let Some(v) = ca.iter().copied().min_by(|p, q| n.dot(*p).total_cmp(&n.dot(*q))) {
            out.push(RawContact { point_on_b: v - n * best_sep, normal_on_b: n, distance: best_sep });
        }
    }
    out
}

/* ---------- helpers ---------- */

#[inline]
fn segment(xf: &Isometry, hh: f32) -> (Vec3, Vec3) {
    (xf.transform_point(Vec3::new(0.0, hh, 0.0)), xf.transform_point(Vec3::new(0.0, -hh, 0.0)))
}

#[inline]
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 < 1.0e-12 { return a; }
    a + ab * ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
}

/// Closest points between segments `p0-p1` and `q0-q1`.
pub fn closest_points_segments(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> (Vec3, Vec3) {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);
    let (s, t);
    if a < 1.0e-12 && e < 1.0e-12 {
        return (p0, q0);
    }
    if a < 1.0e-12 {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e < 1.0e-12 {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let s0 = if denom > 1.0e-12 { ((b * f - c * e) / denom).clamp(0.0, 1.0) } else { 0.0 };
            let t0 = (b * s0 + f) / e;
            if t0 < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t0 > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            } else {
                t = t0;
                s = s0;
            }
        }
    }
    (p0 + d1 * s, q0 + d2 * t)
}

/// Point on segment `a-b` closest to the box `[-he, he]`, and the box point nearest it.
fn closest_points_segment_box(a: Vec3, b: Vec3, he: Vec3) -> (Vec3, Vec3) {
    let mut ps = (a + b) * 0.5;
    let mut qs = ps.clamp(-he, he);
    for _ in 0..4 {
        ps = closest_point_on_segment(a, b, qs);
        qs = ps.clamp(-he, he);
    }
    (ps, qs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::{iso, vec3, Quat};

    const GROUND: Shape = Shape::Plane { normal: Vec3::Y, d: 0.0 };

    #[test]
    fn sphere_on_plane_reports_penetration() {
        let c = contacts_between(
            &Shape::Sphere { r: 0.5 }, &Isometry::from_translation(vec3(0.0, 0.4, 0.0)),
            &GROUND, &Isometry::IDENTITY, 0.0,
        );
        assert_eq!(c.len(), 1);
        assert_relative_eq!(c[0].distance, -0.1, epsilon = 1e-6);
        assert_relative_eq!(c[0].normal_on_b.y, 1.0);
        assert_relative_eq!(c[0].point_on_b.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn box_on_plane_has_four_points() {
        let c = contacts_between(
            &Shape::Box { hx: 0.5, hy: 0.5, hz: 0.5 }, &Isometry::from_translation(vec3(0.0, 0.49, 0.0)),
            &GROUND, &Isometry::IDENTITY, 0.02,
        );
        assert_eq!(c.len(), 4);
        for p in &c { assert_relative_eq!(p.distance, -0.01, epsilon = 1e-5); }
    }

    #[test]
    fn plane_first_flips_normal() {
        let c = contacts_between(
            &GROUND, &Isometry::IDENTITY,
            &Shape::Sphere { r: 0.5 }, &Isometry::from_translation(vec3(0.0, 0.4, 0.0)), 0.0,
        );
        assert_eq!(c.len(), 1);
        assert_relative_eq!(c[0].normal_on_b.y, -1.0);
        assert_relative_eq!(c[0].point_on_a().y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn separated_beyond_margin_is_empty() {
        let c = contacts_between(
            &Shape::Sphere { r: 0.5 }, &Isometry::from_translation(vec3(0.0, 2.0, 0.0)),
            &Shape::Sphere { r: 0.5 }, &Isometry::IDENTITY, 0.1,
        );
        assert!(c.is_empty());
    }

    #[test]
    fn stacked_boxes_touch_on_a_face() {
        let half = Shape::Box { hx: 0.5, hy: 0.5, hz: 0.5 };
        let c = contacts_between(
            &half, &Isometry::from_translation(vec3(0.1, 0.98, 0.0)),
            &half, &Isometry::IDENTITY, 0.02,
        );
        assert!(!c.is_empty());
        for p in &c {
            assert_relative_eq!(p.normal_on_b.y, 1.0, epsilon = 1e-5);
            assert_relative_eq!(p.distance, -0.02, epsilon = 1e-4);
        }
    }

    #[test]
    fn sphere_inside_box_pushes_out_nearest_face() {
        let c = contacts_between(
            &Shape::Sphere { r: 0.2 }, &Isometry::from_translation(vec3(0.0, 0.9, 0.0)),
            &Shape::Box { hx: 1.0, hy: 1.0, hz: 1.0 }, &Isometry::IDENTITY, 0.0,
        );
        assert_eq!(c.len(), 1);
        assert_relative_eq!(c[0].normal_on_b.y, 1.0);
        assert_relative_eq!(c[0].distance, -0.3, epsilon = 1e-5);
    }

    #[test]
    fn lying_cylinder_rests_on_its_side() {
        let cyl = Shape::Cylinder { r: 0.5, hh: 1.0 };
        let xf = iso(vec3(0.0, 0.5, 0.0), Quat::from_rotation_z(core::f32::consts::FRAC_PI_2));
        let c = contacts_between(&cyl, &xf, &GROUND, &Isometry::IDENTITY, 0.01);
        assert_eq!(c.len(), 2);
        for p in &c { assert!(p.distance.abs() < 1e-4); }
    }

    #[test]
    fn segment_closest_points() {
        let (a, b) = closest_points_segments(
            vec3(-1.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, -1.0), vec3(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(a.length(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(b.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.z, 0.0, epsilon = 1e-6);
    }
}
