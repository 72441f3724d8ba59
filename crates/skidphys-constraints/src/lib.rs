use skidphys_core::types::{plane_space, Isometry, Vec3};
use skidphys_core::{BodyId, ConstraintId, Scalar};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConstraintKind {
    /// Ball socket: the two pivots coincide.
    PointToPoint { pivot_a: Vec3, pivot_b: Vec3 },
    /// Ball socket plus aligned hinge axes (local frames).
    Hinge { pivot_a: Vec3, pivot_b: Vec3, axis_a: Vec3, axis_b: Vec3 },
}

/// Two-body constraint referencing its bodies by id.
#[derive(Copy, Clone, Debug)]
pub struct TypedConstraint {
    pub id: ConstraintId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub kind: ConstraintKind,
    pub enabled: bool,
    pub disable_collisions_between_linked: bool,
    /// Rows whose accumulated impulse reaches this disable the constraint.
    pub breaking_impulse_threshold: Scalar,
    /// Largest row impulse of the last solve.
    pub applied_impulse: Scalar,
}

/// One scalar velocity equation `J v = target`, with impulse bounds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JacobianRow {
    pub lin_a: Vec3,
    pub ang_a: Vec3,
    pub lin_b: Vec3,
    pub ang_b: Vec3,
    pub target: Scalar,
    pub lower: Scalar,
    pub upper: Scalar,
}

impl JacobianRow {
    fn bilateral(lin_a: Vec3, ang_a: Vec3, lin_b: Vec3, ang_b: Vec3, target: Scalar) -> Self {
        Self { lin_a, ang_a, lin_b, ang_b, target, lower: Scalar::NEG_INFINITY, upper: Scalar::INFINITY }
    }
}

impl TypedConstraint {
    pub fn new(id: ConstraintId, body_a: BodyId, body_b: BodyId, kind: ConstraintKind) -> Self {
        Self {
            id, body_a, body_b, kind,
            enabled: true,
            disable_collisions_between_linked: false,
            breaking_impulse_threshold: Scalar::INFINITY,
            applied_impulse: 0.0,
        }
    }

    pub fn pivots(&self) -> (Vec3, Vec3) {
        match self.kind {
            ConstraintKind::PointToPoint { pivot_a, pivot_b } => (pivot_a, pivot_b),
            ConstraintKind::Hinge { pivot_a, pivot_b, .. } => (pivot_a, pivot_b),
        }
    }

    pub fn num_rows(&self) -> usize {
        match self.kind {
            ConstraintKind::PointToPoint { .. } => 3,
            ConstraintKind::Hinge { .. } => 5,
        }
    }

    /// Appends this constraint's rows for the given poses. `erp / dt` scales
    /// positional error into a velocity target.
    pub fn build_rows(&self, xa: &Isometry, xb: &Isometry, erp: Scalar, dt: Scalar, out: &mut Vec<JacobianRow>) {
        let k = if dt > 0.0 { erp / dt } else { 0.0 };
        let (pivot_a, pivot_b) = self.pivots();
        let pa = xa.transform_point(pivot_a);
        let pb = xb.transform_point(pivot_b);
        let ra = pa - xa.pos;
        let rb = pb - xb.pos;
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            out.push(JacobianRow::bilateral(
                axis, ra.cross(axis), -axis, -rb.cross(axis),
                k * (pb - pa).dot(axis),
            ));
        }

        if let ConstraintKind::Hinge { axis_a, axis_b, .. } = self.kind {
            let ax1 = xa.transform_vector(axis_a).normalize_or_zero();
            let ax2 = xb.transform_vector(axis_b).normalize_or_zero();
            let (p, q) = plane_space(ax1);
            let u = ax1.cross(ax2);
            for dir in [p, q] {
                out.push(JacobianRow::bilateral(Vec3::ZERO, dir, Vec3::ZERO, -dir, k * u.dot(dir)));
            }
        }
    }
}

/// Constraint registry; ids index into it and are never reused.
#[derive(Default)]
pub struct Constraints {
    list: Vec<TypedConstraint>,
}

impl Constraints {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, body_a: BodyId, body_b: BodyId, kind: ConstraintKind) -> ConstraintId {
        let id = ConstraintId(self.list.len() as u32);
        self.list.push(TypedConstraint::new(id, body_a, body_b, kind));
        id
    }

    pub fn len(&self) -> usize { self.list.len() }
    pub fn is_empty(&self) -> bool { self.list.is_empty() }
    pub fn get(&self, id: ConstraintId) -> Option<&TypedConstraint> { self.list.get(id.0 as usize) }
    pub fn get_mut(&mut self, id: ConstraintId) -> Option<&mut TypedConstraint> { self.list.get_mut(id.0 as usize) }
    pub fn iter(&self) -> impl Iterator<Item = &TypedConstraint> { self.list.iter() }
    pub fn as_slice(&self) -> &[TypedConstraint] { &self.list }
    pub fn as_mut_slice(&mut self) -> &mut [TypedConstraint] { &mut self.list }

    /// Enabled constraints.
    pub fn active(&self) -> impl Iterator<Item = &TypedConstraint> { self.list.iter().filter(|c| c.enabled) }

    /// True when an enabled constraint between the pair suppresses their contacts.
    pub fn collision_disabled(&self, a: BodyId, b: BodyId) -> bool {
        self.active().any(|c| {
            c.disable_collisions_between_linked
                && ((c.body_a == a && c.body_b == b) || (c.body_a == b && c.body_b == a))
        })
    }

    /// Disables every constraint that references `body`; returns how many.
    pub fn disable_for_body(&mut self, body: BodyId) -> usize {
        let mut n = 0;
        for c in self.list.iter_mut().filter(|c| c.enabled && (c.body_a == body || c.body_b == body)) {
            c.enabled = false;
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::{iso, vec3, Quat};

    #[test]
    fn p2p_target_closes_the_gap() {
        let c = TypedConstraint::new(
            ConstraintId(0), BodyId(0), BodyId(1),
            ConstraintKind::PointToPoint { pivot_a: vec3(1.0, 0.0, 0.0), pivot_b: Vec3::ZERO },
        );
        let mut rows = Vec::new();
        let xa = Isometry::IDENTITY;
        let xb = Isometry::from_translation(vec3(1.5, 0.0, 0.0));
        c.build_rows(&xa, &xb, 0.2, 0.1, &mut rows);
        assert_eq!(rows.len(), 3);
        // A must move toward +x at 0.2/0.1 * 0.5
        assert_relative_eq!(rows[0].target, 1.0, epsilon = 1e-6);
        assert_eq!(rows[0].lin_a, Vec3::X);
        assert_eq!(rows[0].lin_b, -Vec3::X);
        assert_relative_eq!(rows[1].target, 0.0);
    }

    #[test]
    fn hinge_adds_two_angular_rows() {
        let c = TypedConstraint::new(
            ConstraintId(0), BodyId(0), BodyId(1),
            ConstraintKind::Hinge { pivot_a: Vec3::ZERO, pivot_b: Vec3::ZERO, axis_a: Vec3::Z, axis_b: Vec3::Z },
        );
        let mut rows = Vec::new();
        let xb = iso(Vec3::ZERO, Quat::from_rotation_x(0.1));
        c.build_rows(&Isometry::IDENTITY, &xb, 0.2, 0.1, &mut rows);
        assert_eq!(rows.len(), c.num_rows());
        let angular: Scalar = rows[3..].iter().map(|r| r.target.abs()).sum();
        assert!(angular > 0.0);
        for r in &rows[3..] {
            assert_eq!(r.lin_a, Vec3::ZERO);
            assert_relative_eq!(r.ang_a.dot(Vec3::Z), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn disabling_a_body_and_collision_filter() {
        let mut cs = Constraints::new();
        let id = cs.add(BodyId(0), BodyId(1), ConstraintKind::PointToPoint { pivot_a: Vec3::ZERO, pivot_b: Vec3::ZERO });
        cs.add(BodyId(1), BodyId(2), ConstraintKind::PointToPoint { pivot_a: Vec3::ZERO, pivot_b: Vec3::ZERO });
        if let Some(c) = cs.get_mut(id) { c.disable_collisions_between_linked = true; }
        assert!(cs.collision_disabled(BodyId(1), BodyId(0)));
        assert!(!cs.collision_disabled(BodyId(1), BodyId(2)));
        assert_eq!(cs.disable_for_body(BodyId(1)), 2);
        assert!(!cs.collision_disabled(BodyId(1), BodyId(0)));
        assert_eq!(cs.active().count(), 0);
    }
}
