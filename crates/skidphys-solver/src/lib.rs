//! Constraint solving: the sequential impulse solver and the adapter that
//! feeds it one island at a time.

pub mod adapter;
pub mod row;
pub mod sequential_impulse;
pub mod solver_body;

use skidphys_collision::ContactManifold;
use skidphys_constraints::TypedConstraint;
use skidphys_core::{BodyId, SolverInfo};
use skidphys_dynamics::Bodies;

pub use adapter::{constraint_island_id, IslandSolverAdapter};
pub use row::{RowOrigin, SolverRow};
pub use sequential_impulse::{restitution_curve, SequentialImpulseSolver};
pub use solver_body::SolverBody;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SolveReport {
    pub rows: u32,
    pub bodies: u32,
}

impl std::ops::AddAssign for SolveReport {
    fn add_assign(&mut self, rhs: Self) {
        self.rows += rhs.rows;
        self.bodies += rhs.bodies;
    }
}

/// Resolves one group of bodies, contacts and joints into new velocities.
pub trait ConstraintSolver {
    /// Called once per substep before any island is solved.
    fn prepare_solve(&mut self, _num_bodies: usize, _num_manifolds: usize) {}

    fn solve_group(
        &mut self,
        bodies: &mut Bodies,
        island_bodies: &[BodyId],
        manifolds: &mut [&mut ContactManifold],
        constraints: &mut [TypedConstraint],
        info: &SolverInfo,
    ) -> SolveReport;

    /// Called once per substep after every island was solved.
    fn all_solved(&mut self, _info: &SolverInfo) {}

    /// Drops any cached state, such as the shuffle sequence.
    fn reset(&mut self) {}
}
