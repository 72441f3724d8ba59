use std::collections::BTreeMap;

use skidphys_collision::{ContactManifold, ManifoldCache};
use skidphys_constraints::TypedConstraint;
use skidphys_core::SolverInfo;
use skidphys_dynamics::{Bodies, BodyKind};
use skidphys_islands::Island;

use crate::{ConstraintSolver, SolveReport};

/// Island a constraint belongs to: body A's tag, or body B's when A is static.
pub fn constraint_island_id(c: &TypedConstraint, bodies: &Bodies) -> u32 {
    if bodies.kind(c.body_a.0) == BodyKind::Static {
        bodies.island_tag(c.body_b.0)
    } else {
        bodies.island_tag(c.body_a.0)
    }
}

/// Groups manifolds and constraints per island and hands each awake island
/// to the solver.
#[derive(Default)]
pub struct IslandSolverAdapter {
    /// (island id, index in the caller's slice, scratch copy)
    sorted: Vec<(u32, usize, TypedConstraint)>,
    ranges: BTreeMap<u32, (usize, usize)>,
}

impl IslandSolverAdapter {
    pub fn new() -> Self { Self::default() }

    /// Stable-sorts the enabled constraints by island id and records each
    /// island's contiguous range.
    pub fn sort_constraints(&mut self, constraints: &[TypedConstraint], bodies: &Bodies) {
        self.sorted.clear();
        self.ranges.clear();
        self.sorted.extend(
            constraints
                .iter()
                .enumerate()
                .filter(|(_, c)| c.enabled && bodies.is_simulated(c.body_a.0) && bodies.is_simulated(c.body_b.0))
                .map(|(i, c)| (constraint_island_id(c, bodies), i, *c)),
        );
        self.sorted.sort_by_key(|(island, _, _)| *island);
        let mut start = 0;
        while start < self.sorted.len() {
            let island = self.sorted[start].0;
            let end = start + self.sorted[start..].iter().take_while(|(i, _, _)| *i == island).count();
            self.ranges.insert(island, (start, end));
            start = end;
        }
    }

    /// Constraints of one island after `sort_constraints`.
    pub fn island_constraints(&self, island: u32) -> impl Iterator<Item = &TypedConstraint> {
        let (start, end) = self.ranges.get(&island).copied().unwrap_or((0, 0));
        self.sorted[start..end].iter().map(|(_, _, c)| c)
    }

    pub fn solve_islands(
        &mut self,
        solver: &mut dyn ConstraintSolver,
        bodies: &mut Bodies,
        islands: &[Island],
        manifolds: &mut ManifoldCache,
        constraints: &mut [TypedConstraint],
        info: &SolverInfo,
    ) -> SolveReport {
        self.sort_constraints(constraints, bodies);
        solver.prepare_solve(bodies.len(), manifolds.len());

        let slot_of: BTreeMap<u32, usize> = islands
            .iter()
            .enumerate()
            .filter(|(_, isl)| !isl.sleeping)
            .map(|(i, isl)| (isl.tag, i))
            .collect();
        let mut buckets: Vec<Vec<&mut ContactManifold>> = islands.iter().map(|_| Vec::new()).collect();
        for m in manifolds.iter_mut() {
            let (ta, tb) = (bodies.island_tag(m.body_a.0), bodies.island_tag(m.body_b.0));
            if ta != tb { continue; }
            if let Some(&i) = slot_of.get(&ta) {
                buckets[i].push(m);
            }
        }

        let mut report = SolveReport::default();
        let mut scratch: Vec<TypedConstraint> = Vec::new();
        for (i, island) in islands.iter().enumerate() {
            if island.sleeping { continue; }
            let (start, end) = self.ranges.get(&island.tag).copied().unwrap_or((0, 0));
            scratch.clear();
            scratch.extend(self.sorted[start..end].iter().map(|(_, _, c)| *c));
            report += solver.solve_group(bodies, &island.bodies, &mut buckets[i], &mut scratch, info);
            for ((_, index, _), solved) in self.sorted[start..end].iter().zip(&scratch) {
                let c = &mut constraints[*index];
                c.enabled = solved.enabled;
                c.applied_impulse = solved.applied_impulse;
            }
        }
        solver.all_solved(info);
        report
    }
}
