use skidphys_core::types::Vec3;
use crate::solver_body::SolverBody;

/// Where a row's accumulated impulse is written back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowOrigin {
    Contact { manifold: usize, point: usize },
    Friction { manifold: usize, point: usize, dir: usize },
    Joint { constraint: usize },
}

/// One scalar velocity constraint between two solver bodies.
#[derive(Copy, Clone, Debug)]
pub struct SolverRow {
    pub body_a: usize,
    pub body_b: usize,
    pub lin_a: Vec3,
    pub ang_a: Vec3,
    pub lin_b: Vec3,
    pub ang_b: Vec3,
    pub ang_comp_a: Vec3,
    pub ang_comp_b: Vec3,
    pub jac_diag_inv: f32,
    pub rhs: f32,
    pub rhs_penetration: f32,
    pub cfm: f32,
    pub lower: f32,
    pub upper: f32,
    pub applied: f32,
    pub applied_push: f32,
    /// Friction coefficient; friction rows rescale their bounds from the normal row.
    pub friction: f32,
    /// For friction rows, the index of their normal row.
    pub normal_row: usize,
    pub origin: RowOrigin,
}

impl SolverRow {
    /// Builds the Jacobian part and effective mass; `None` when neither side can move.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bodies: &[SolverBody], body_a: usize, body_b: usize,
        lin_a: Vec3, ang_a: Vec3, lin_b: Vec3, ang_b: Vec3,
        sor: f32, origin: RowOrigin,
    ) -> Option<Self> {
        let sa = &bodies[body_a];
        let sb = &bodies[body_b];
        let ang_comp_a = sa.inv_inertia_world * ang_a * sa.angular_factor;
        let ang_comp_b = sb.inv_inertia_world * ang_b * sb.angular_factor;
        let denom = sa.inv_mass * lin_a.dot(lin_a) + ang_a.dot(ang_comp_a)
            + sb.inv_mass * lin_b.dot(lin_b) + ang_b.dot(ang_comp_b);
        if denom <= f32::EPSILON || !denom.is_finite() { return None; }
        Some(SolverRow {
            body_a, body_b, lin_a, ang_a, lin_b, ang_b, ang_comp_a, ang_comp_b,
            jac_diag_inv: sor / denom,
            rhs: 0.0, rhs_penetration: 0.0, cfm: 0.0,
            lower: f32::NEG_INFINITY, upper: f32::INFINITY,
            applied: 0.0, applied_push: 0.0,
            friction: 0.0, normal_row: 0,
            origin,
        })
    }

    /// `J v` for the current velocities.
    #[inline] pub fn jv(&self, a: &SolverBody, b: &SolverBody) -> f32 {
        self.lin_a.dot(a.lin_vel) + self.ang_a.dot(a.ang_vel) + self.lin_b.dot(b.lin_vel) + self.ang_b.dot(b.ang_vel)
    }

    #[inline] fn jv_push(&self, a: &SolverBody, b: &SolverBody) -> f32 {
        self.lin_a.dot(a.push_lin) + self.ang_a.dot(a.push_ang) + self.lin_b.dot(b.push_lin) + self.ang_b.dot(b.push_ang)
    }

    pub fn apply(&self, a: &mut SolverBody, b: &mut SolverBody, delta: f32) {
        a.apply_impulse(self.lin_a, self.ang_comp_a, delta);
        b.apply_impulse(self.lin_b, self.ang_comp_b, delta);
    }

    /// One projected Gauss-Seidel update; returns the applied delta.
    pub fn resolve(&mut self, a: &mut SolverBody, b: &mut SolverBody) -> f32 {
        let mut delta = self.rhs - self.cfm * self.applied - self.jac_diag_inv * self.jv(a, b);
        let sum = self.applied + delta;
        if sum < self.lower {
            delta = self.lower - self.applied;
            self.applied = self.lower;
        } else if sum > self.upper {
            delta = self.upper - self.applied;
            self.applied = self.upper;
        } else {
            self.applied = sum;
        }
        self.apply(a, b, delta);
        delta
    }

    /// Position-only correction into the push velocities.
    pub fn resolve_split_penetration(&mut self, a: &mut SolverBody, b: &mut SolverBody) -> f32 {
        if self.rhs_penetration == 0.0 { return 0.0; }
        let mut delta = self.rhs_penetration - self.jac_diag_inv * self.jv_push(a, b);
        let sum = self.applied_push + delta;
        if sum < self.lower {
            delta = self.lower - self.applied_push;
            self.applied_push = self.lower;
        } else {
            self.applied_push = sum;
        }
        a.apply_push_impulse(self.lin_a, self.ang_comp_a, delta);
        b.apply_push_impulse(self.lin_b, self.ang_comp_b, delta);
        delta
    }
}
