use skidphys_collision::ContactManifold;
use skidphys_constraints::{JacobianRow, TypedConstraint};
use skidphys_core::types::{plane_space, Velocity, Vec3};
use skidphys_core::{BodyId, SolverInfo, XorShift64};
use skidphys_dynamics::Bodies;

use crate::row::{RowOrigin, SolverRow};
use crate::solver_body::SolverBody;
use crate::{ConstraintSolver, SolveReport};

const NO_SLOT: u32 = u32::MAX;
const FIXED_SLOT: usize = 0;
const CONTACT_UPPER_LIMIT: f32 = 1e10;

/// Bounce speed for an approach speed, zero below the threshold.
pub fn restitution_curve(rel_vel: f32, restitution: f32, threshold: f32) -> f32 {
    if rel_vel.abs() < threshold { return 0.0; }
    (-rel_vel * restitution).max(0.0)
}

fn two_mut(v: &mut [SolverBody], a: usize, b: usize) -> (&mut SolverBody, &mut SolverBody) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = v.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = v.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Projected Gauss-Seidel over contact, friction and joint rows, with warm
/// starting and optional split-impulse penetration recovery.
pub struct SequentialImpulseSolver {
    solver_bodies: Vec<SolverBody>,
    slot_of: Vec<u32>,
    contact_rows: Vec<SolverRow>,
    friction_rows: Vec<SolverRow>,
    joint_rows: Vec<SolverRow>,
    jacobians: Vec<JacobianRow>,
    contact_order: Vec<usize>,
    friction_order: Vec<usize>,
    rng: XorShift64,
    seed: u64,
}

impl SequentialImpulseSolver {
    pub fn new(seed: u64) -> Self {
        Self {
            solver_bodies: Vec::new(),
            slot_of: Vec::new(),
            contact_rows: Vec::new(),
            friction_rows: Vec::new(),
            joint_rows: Vec::new(),
            jacobians: Vec::new(),
            contact_order: Vec::new(),
            friction_order: Vec::new(),
            rng: XorShift64::new(seed),
            seed,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.contact_rows.len() + self.friction_rows.len() + self.joint_rows.len()
    }

    /// Solver slot for a body, allocating on first use. Static, removed and
    /// unknown bodies share the fixed slot.
    fn slot(&mut self, bodies: &Bodies, id: BodyId) -> usize {
        let i = id.index();
        if i >= bodies.len() || bodies.is_removed(id.0) {
            return FIXED_SLOT;
        }
        if bodies.inv_mass_of(id.0) == 0.0 && !bodies.is_kinematic(id.0) {
            return FIXED_SLOT;
        }
        if self.slot_of[i] == NO_SLOT {
            let mut sb = SolverBody::from_body(bodies, id);
            if bodies.is_kinematic(id.0) {
                sb.inv_mass = 0.0;
                sb.inv_inertia_world = skidphys_core::Mat3::ZERO;
            }
            self.slot_of[i] = self.solver_bodies.len() as u32;
            self.solver_bodies.push(sb);
        }
        self.slot_of[i] as usize
    }

    fn reset_scratch(&mut self, n_bodies: usize) {
        self.solver_bodies.clear();
        self.solver_bodies.push(SolverBody::FIXED);
        self.slot_of.clear();
        self.slot_of.resize(n_bodies, NO_SLOT);
        self.contact_rows.clear();
        self.friction_rows.clear();
        self.joint_rows.clear();
    }

    fn setup_joint_rows(&mut self, bodies: &Bodies, constraints: &mut [TypedConstraint], info: &SolverInfo) {
        for (ci, c) in constraints.iter_mut().enumerate() {
            if !c.enabled { continue; }
            c.applied_impulse = 0.0;
            let sa = self.slot(bodies, c.body_a);
            let sb = self.slot(bodies, c.body_b);
            if sa == sb { continue; }
            self.jacobians.clear();
            c.build_rows(&bodies.pose(c.body_a.0), &bodies.pose(c.body_b.0), info.erp, info.time_step, &mut self.jacobians);
            for j in &self.jacobians {
                let Some(mut row) = SolverRow::new(
                    &self.solver_bodies, sa, sb, j.lin_a, j.ang_a, j.lin_b, j.ang_b,
                    info.sor, RowOrigin::Joint { constraint: ci },
                ) else { continue };
                row.rhs = j.target * row.jac_diag_inv;
                row.lower = j.lower;
                row.upper = j.upper;
                self.joint_rows.push(row);
            }
        }
    }

    fn setup_contact_rows(&mut self, bodies: &Bodies, manifolds: &[&mut ContactManifold], info: &SolverInfo) {
        let dt = info.time_step;
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        for (mi, m) in manifolds.iter().enumerate() {
            let sa = self.slot(bodies, m.body_a);
            let sb = self.slot(bodies, m.body_b);
            if sa == sb { continue; }
            let pos_a = bodies.pose(m.body_a.0).pos;
            let pos_b = bodies.pose(m.body_b.0).pos;

            for (pi, cp) in m.points.iter().enumerate() {
                let n = cp.normal_world_on_b;
                let ra = cp.position_world_on_a - pos_a;
                let rb = cp.position_world_on_b - pos_b;
                let Some(mut row) = SolverRow::new(
                    &self.solver_bodies, sa, sb, n, ra.cross(n), -n, -rb.cross(n),
                    info.sor, RowOrigin::Contact { manifold: mi, point: pi },
                ) else { continue };

                let (body_a, body_b) = (self.solver_bodies[sa], self.solver_bodies[sb]);
                let rel_vel = row.jv(&body_a, &body_b);
                let restitution = restitution_curve(rel_vel, cp.combined_restitution, info.restitution_velocity_threshold);

                // rows see whole velocities, so the target is absolute
                let penetration = cp.distance + info.linear_slop;
                let mut velocity_error = restitution;
                let positional_error = if penetration > 0.0 {
                    // speculative: only remove the approach that would close the gap
                    velocity_error -= penetration * inv_dt;
                    0.0
                } else {
                    -penetration * info.erp * inv_dt
                };
                let penetration_impulse = positional_error * row.jac_diag_inv;
                let velocity_impulse = velocity_error * row.jac_diag_inv;
                if info.split_impulse && penetration < info.split_impulse_penetration_threshold {
                    row.rhs = velocity_impulse;
                    row.rhs_penetration = penetration_impulse;
                } else {
                    row.rhs = velocity_impulse + penetration_impulse;
                }
                row.lower = 0.0;
                row.upper = CONTACT_UPPER_LIMIT;
                row.friction = cp.combined_friction;

                if info.warm_starting {
                    row.applied = cp.applied_impulse * info.warm_starting_factor;
                    let (a, b) = two_mut(&mut self.solver_bodies, sa, sb);
                    row.apply(a, b, row.applied);
                }
                let normal_row = self.contact_rows.len();
                self.contact_rows.push(row);

                // lateral directions from the sliding velocity, or any tangent basis at rest
                let (a, b) = (&self.solver_bodies[sa], &self.solver_bodies[sb]);
                let vel = a.velocity_in_local_point(ra) - b.velocity_in_local_point(rb);
                let lateral = vel - n * n.dot(vel);
                let dirs = if lateral.length_squared() > f32::EPSILON {
                    let d1 = lateral.normalize();
                    (d1, d1.cross(n).normalize_or_zero())
                } else {
                    plane_space(n)
                };
                let carried = cp.lateral_dirs[0] * cp.applied_impulse_lateral[0]
                    + cp.lateral_dirs[1] * cp.applied_impulse_lateral[1];
                for (k, dir) in [dirs.0, dirs.1].into_iter().enumerate() {
                    self.push_friction_row(sa, sb, ra, rb, dir, carried, normal_row, RowOrigin::Friction { manifold: mi, point: pi, dir: k }, info);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_friction_row(
        &mut self, sa: usize, sb: usize, ra: Vec3, rb: Vec3, dir: Vec3, carried: Vec3,
        normal_row: usize, origin: RowOrigin, info: &SolverInfo,
    ) {
        if dir == Vec3::ZERO { return; }
        let Some(mut row) = SolverRow::new(
            &self.solver_bodies, sa, sb, dir, ra.cross(dir), -dir, -rb.cross(dir), info.sor, origin,
        ) else { return };
        row.friction = self.contact_rows[normal_row].friction;
        row.normal_row = normal_row;
        row.lower = 0.0;
        row.upper = 0.0;
        if info.warm_starting {
            // the carried impulse must fit the cone of the warm-started normal impulse
            let bound = (row.friction * self.contact_rows[normal_row].applied.max(0.0)).max(0.0);
            row.applied = (carried.dot(dir) * info.warm_starting_factor).clamp(-bound, bound);
            let (a, b) = two_mut(&mut self.solver_bodies, sa, sb);
            row.apply(a, b, row.applied);
        }
        self.friction_rows.push(row);
    }

    fn shuffle(rng: &mut XorShift64, order: &mut [usize]) {
        for i in (1..order.len()).rev() {
            let j = rng.next_below(i as u32 + 1) as usize;
            order.swap(i, j);
        }
    }

    fn split_impulse_iterations(&mut self, info: &SolverInfo) {
        if !info.split_impulse { return; }
        for _ in 0..info.num_iterations {
            for row in self.contact_rows.iter_mut() {
                let (a, b) = two_mut(&mut self.solver_bodies, row.body_a, row.body_b);
                row.resolve_split_penetration(a, b);
            }
        }
    }

    fn solve_single_iteration(&mut self, iteration: u32, info: &SolverInfo) {
        if info.randomize_order && iteration & 7 == 0 {
            Self::shuffle(&mut self.rng, &mut self.contact_order);
            Self::shuffle(&mut self.rng, &mut self.friction_order);
        }

        for row in self.joint_rows.iter_mut() {
            let (a, b) = two_mut(&mut self.solver_bodies, row.body_a, row.body_b);
            row.resolve(a, b);
        }
        for &i in &self.contact_order {
            let row = &mut self.contact_rows[i];
            let (a, b) = two_mut(&mut self.solver_bodies, row.body_a, row.body_b);
            row.resolve(a, b);
        }
        for &i in &self.friction_order {
            let total = self.contact_rows[self.friction_rows[i].normal_row].applied.max(0.0);
            let row = &mut self.friction_rows[i];
            let bound = (row.friction * total).max(0.0);
            if bound == 0.0 && row.applied == 0.0 { continue; }
            row.lower = -bound;
            row.upper = bound;
            let (a, b) = two_mut(&mut self.solver_bodies, row.body_a, row.body_b);
            row.resolve(a, b);
        }
    }

    fn finish(
        &mut self, bodies: &mut Bodies, manifolds: &mut [&mut ContactManifold],
        constraints: &mut [TypedConstraint], info: &SolverInfo,
    ) {
        for row in &self.contact_rows {
            if let RowOrigin::Contact { manifold, point } = row.origin {
                manifolds[manifold].points[point].applied_impulse = row.applied;
            }
        }
        for row in &self.friction_rows {
            if let RowOrigin::Friction { manifold, point, dir } = row.origin {
                let cp = &mut manifolds[manifold].points[point];
                cp.applied_impulse_lateral[dir] = row.applied;
                cp.lateral_dirs[dir] = row.lin_a;
            }
        }
        for row in &self.joint_rows {
            if let RowOrigin::Joint { constraint } = row.origin {
                let c = &mut constraints[constraint];
                let magnitude = row.applied.abs();
                c.applied_impulse = c.applied_impulse.max(magnitude);
                if c.enabled && magnitude >= c.breaking_impulse_threshold {
                    c.enabled = false;
                    log::debug!("constraint {} broke at impulse {magnitude}", c.id);
                }
            }
        }

        for sb in self.solver_bodies.iter().skip(1) {
            let Some(id) = sb.body else { continue };
            if !bodies.is_dynamic(id.0) { continue; }
            bodies.set_vel(id.0, Velocity { lin: sb.lin_vel * info.damping, ang: sb.ang_vel * info.damping });
            if info.split_impulse {
                bodies.set_push_velocity(id.0, sb.push_velocity());
            }
        }
    }
}

impl Default for SequentialImpulseSolver {
    fn default() -> Self { Self::new(0x5eed) }
}

impl ConstraintSolver for SequentialImpulseSolver {
    fn solve_group(
        &mut self,
        bodies: &mut Bodies,
        island_bodies: &[BodyId],
        manifolds: &mut [&mut ContactManifold],
        constraints: &mut [TypedConstraint],
        info: &SolverInfo,
    ) -> SolveReport {
        self.reset_scratch(bodies.len());
        for &id in island_bodies {
            self.slot(bodies, id);
        }
        self.setup_joint_rows(bodies, constraints, info);
        self.setup_contact_rows(bodies, manifolds, info);

        self.contact_order.clear();
        self.contact_order.extend(0..self.contact_rows.len());
        self.friction_order.clear();
        self.friction_order.extend(0..self.friction_rows.len());

        self.split_impulse_iterations(info);
        for it in 0..info.num_iterations {
            self.solve_single_iteration(it, info);
        }
        self.finish(bodies, manifolds, constraints, info);

        SolveReport { rows: self.num_rows() as u32, bodies: (self.solver_bodies.len() - 1) as u32 }
    }

    fn reset(&mut self) {
        self.rng = XorShift64::new(self.seed);
    }
}
