pub mod union_find;

use std::collections::BTreeMap;

use skidphys_collision::{ManifoldCache, PairKey};
use skidphys_core::BodyId;
use skidphys_dynamics::{ActivationState, Bodies, BodyKind};

pub use union_find::UnionFind;

/// A connected group of bodies solved as one batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Island {
    /// Root representative shared by every member's island tag.
    pub tag: u32,
    pub bodies: Vec<BodyId>,
    /// Manifolds whose two bodies both carry `tag`.
    pub manifolds: Vec<PairKey>,
    /// Every non-static member is asleep; the solver skips it.
    pub sleeping: bool,
}

/// Rebuilds islands every substep from contact and constraint adjacency.
#[derive(Default)]
pub struct SimulationIslandManager {
    uf: UnionFind,
    islands: Vec<Island>,
}

/// Dynamic or kinematic, simulated and not asleep.
fn counts_as_active(bodies: &Bodies, id: u32) -> bool {
    !bodies.is_removed(id) && bodies.kind(id) != BodyKind::Static && bodies.is_active(id)
}

impl SimulationIslandManager {
    pub fn new() -> Self { Self::default() }

    pub fn islands(&self) -> &[Island] { &self.islands }

    /// Unites every link with at least one active endpoint, then stores the
    /// root of each body as its island tag.
    pub fn find_unions(&mut self, bodies: &mut Bodies, links: impl IntoIterator<Item = (BodyId, BodyId)>) {
        let n = bodies.len();
        self.uf.reset(n);
        for (a, b) in links {
            if a == b || a.index() >= n || b.index() >= n { continue; }
            if bodies.is_removed(a.0) || bodies.is_removed(b.0) { continue; }
            if counts_as_active(bodies, a.0) || counts_as_active(bodies, b.0) {
                self.uf.union(a.0, b.0);
            }
        }
        for id in 0..n as u32 {
            let root = self.uf.find(id);
            bodies.set_island_tag(id, root);
        }
    }

    /// Full island pass: unions, grouping, island-level sleep and wake.
    pub fn calculate_simulation_islands(
        &mut self,
        bodies: &mut Bodies,
        manifolds: &ManifoldCache,
        constraint_links: &[(BodyId, BodyId)],
    ) -> &[Island] {
        let links = manifolds
            .iter()
            .map(|m| (m.body_a, m.body_b))
            .chain(constraint_links.iter().copied());
        self.find_unions(bodies, links.collect::<Vec<_>>());

        let mut by_tag: BTreeMap<u32, Island> = BTreeMap::new();
        for id in bodies.indices() {
            if !bodies.is_simulated(id) { continue; }
            let tag = bodies.island_tag(id);
            by_tag.entry(tag).or_insert_with(|| Island { tag, ..Island::default() }).bodies.push(BodyId(id));
        }
        for m in manifolds.iter() {
            let (ta, tb) = (bodies.island_tag(m.body_a.0), bodies.island_tag(m.body_b.0));
            if ta != tb { continue; }
            if let Some(island) = by_tag.get_mut(&ta) { island.manifolds.push(m.key()); }
        }

        // islands made only of static bodies have nothing to solve
        by_tag.retain(|_, isl| isl.bodies.iter().any(|b| bodies.kind(b.0) != BodyKind::Static));

        for island in by_tag.values_mut() {
            island.sleeping = island
                .bodies
                .iter()
                .filter(|b| bodies.kind(b.0) != BodyKind::Static)
                .all(|b| matches!(
                    bodies.activation_state(b.0),
                    ActivationState::WantsDeactivation | ActivationState::IslandSleeping
                ));
            for b in &island.bodies {
                if bodies.kind(b.0) == BodyKind::Static { continue; }
                if island.sleeping {
                    bodies.set_activation_state(b.0, ActivationState::IslandSleeping);
                } else if bodies.activation_state(b.0) == ActivationState::IslandSleeping {
                    bodies.set_activation_state(b.0, ActivationState::WantsDeactivation);
                    bodies.set_deactivation_time(b.0, 0.0);
                }
            }
        }

        self.islands = by_tag.into_values().collect();
        log::trace!("{} islands", self.islands.len());
        &self.islands
    }

    /// Hands each awake island to `f`.
    pub fn process_islands(&self, mut f: impl FnMut(&Island)) {
        for island in self.islands.iter().filter(|i| !i.sleeping) {
            f(island);
        }
    }
}
