use std::collections::BTreeSet;

use skidphys_core::{BodyId, Isometry};
use skidphys_geom::{Aabb, Material, Shape};

use crate::broadphase::pairs_sap;
use crate::manifold::{ContactPoint, ManifoldCache, PairKey};
use crate::narrowphase::contacts_between;

/// What the dispatcher sees of one body for a collision pass.
#[derive(Copy, Clone, Debug)]
pub struct CollisionObject {
    pub body: BodyId,
    pub shape: Shape,
    /// Committed pose at the start of the substep.
    pub pose: Isometry,
    /// Bounds swept over the current and predicted poses.
    pub aabb: Aabb,
    pub material: Material,
    pub static_or_kinematic: bool,
    pub kinematic: bool,
    /// False for sleeping bodies.
    pub active: bool,
    /// False for removed or quarantined bodies.
    pub enabled: bool,
    /// Extra reach covering the body's predicted motion this substep.
    pub speculative_margin: f32,
}

#[derive(Copy, Clone, Debug)]
pub struct DispatchSettings {
    pub contact_breaking_threshold: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub pairs_tested: u32,
    pub manifolds: u32,
    pub contacts: u32,
}

/// Produces and maintains the persistent manifolds for one world.
pub trait CollisionDispatcher {
    /// Updates the manifold set for the given objects. `objects` is indexed by
    /// body id. `may_collide` vetoes pairs such as constraint-linked bodies.
    fn perform_discrete_collision_detection(
        &mut self,
        objects: &[CollisionObject],
        may_collide: &dyn Fn(BodyId, BodyId) -> bool,
        settings: &DispatchSettings,
    ) -> DispatchReport;

    fn manifolds(&self) -> &ManifoldCache;
    fn manifolds_mut(&mut self) -> &mut ManifoldCache;

    fn remove_body(&mut self, body: BodyId) {
        self.manifolds_mut().remove_body(body);
    }
}

/// Pair needs a narrowphase pass this step.
pub fn needs_collision(a: &CollisionObject, b: &CollisionObject) -> bool {
    a.body != b.body
        && a.enabled && b.enabled
        && !(a.static_or_kinematic && b.static_or_kinematic)
        && (a.active || b.active)
}

/// SAP broadphase followed by closed-form narrowphase per shape pair.
#[derive(Default)]
pub struct DefaultDispatcher {
    cache: ManifoldCache,
}

impl DefaultDispatcher {
    pub fn new() -> Self { Self::default() }
}

impl CollisionDispatcher for DefaultDispatcher {
    fn perform_discrete_collision_detection(
        &mut self,
        objects: &[CollisionObject],
        may_collide: &dyn Fn(BodyId, BodyId) -> bool,
        settings: &DispatchSettings,
    ) -> DispatchReport {
        let aabbs: Vec<Aabb> = objects.iter().map(|o| o.aabb).collect();
        let pairs = pairs_sap(&aabbs, |i| objects[i].enabled);
        let mut report = DispatchReport::default();
        let mut alive: BTreeSet<PairKey> = BTreeSet::new();
        let threshold = settings.contact_breaking_threshold;

        for (i, j) in pairs {
            let (a, b) = (&objects[i], &objects[j]);
            let key = PairKey::new(a.body, b.body);
            if !needs_collision(a, b) {
                // sleeping pairs keep their last manifold
                if a.enabled && b.enabled && !a.active && !b.active && self.cache.contains(&key) {
                    alive.insert(key);
                }
                continue;
            }
            if !may_collide(a.body, b.body) { continue; }
            report.pairs_tested += 1;

            let margin = threshold + a.speculative_margin + b.speculative_margin;
            let raw = contacts_between(&a.shape, &a.pose, &b.shape, &b.pose, margin);
            if raw.is_empty() { continue; }

            let friction = a.material.combined_friction(&b.material);
            let restitution = a.material.combined_restitution(&b.material);
            let fresh: Vec<ContactPoint> = raw
                .iter()
                .map(|c| ContactPoint::from_raw(c, &a.pose, &b.pose, friction, restitution))
                .collect();
            self.cache.entry(a.body, b.body).refresh(fresh, threshold);
            alive.insert(key);
        }

        self.cache.retain(|k| alive.contains(k));
        report.manifolds = self.cache.len() as u32;
        report.contacts = self.cache.total_points() as u32;
        log::trace!("collision pass: {} pairs tested, {} manifolds", report.pairs_tested, report.manifolds);
        report
    }

    fn manifolds(&self) -> &ManifoldCache { &self.cache }
    fn manifolds_mut(&mut self) -> &mut ManifoldCache { &mut self.cache }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skidphys_core::{vec3, Vec3};
    use skidphys_geom::aabb_of;

    fn object(id: u32, shape: Shape, pos: Vec3, fixed: bool) -> CollisionObject {
        let pose = Isometry::from_translation(pos);
        CollisionObject {
            body: BodyId(id), shape, pose, aabb: aabb_of(&shape, &pose),
            material: Material::default(), static_or_kinematic: fixed, kinematic: false,
            active: !fixed, enabled: true, speculative_margin: 0.0,
        }
    }

    fn settings() -> DispatchSettings { DispatchSettings { contact_breaking_threshold: 0.02 } }

    #[test]
    fn sphere_resting_on_ground_gets_a_manifold() {
        let objs = [
            object(0, Shape::Plane { normal: Vec3::Y, d: 0.0 }, Vec3::ZERO, true),
            object(1, Shape::Sphere { r: 0.5 }, vec3(0.0, 0.49, 0.0), false),
        ];
        let mut d = DefaultDispatcher::new();
        let r = d.perform_discrete_collision_detection(&objs, &|_, _| true, &settings());
        assert_eq!(r.manifolds, 1);
        let m = d.manifolds().get(BodyId(1), BodyId(0)).unwrap();
        assert_eq!(m.body_a, BodyId(0));
        // normal points from B (sphere) toward A (ground)
        assert!(m.points[0].normal_world_on_b.y < -0.99);
    }

    #[test]
    fn stale_and_vetoed_pairs_are_dropped() {
        let mut objs = vec![
            object(0, Shape::Sphere { r: 0.5 }, Vec3::ZERO, false),
            object(1, Shape::Sphere { r: 0.5 }, vec3(0.9, 0.0, 0.0), false),
        ];
        let mut d = DefaultDispatcher::new();
        d.perform_discrete_collision_detection(&objs, &|_, _| true, &settings());
        assert_eq!(d.manifolds().len(), 1);
        d.perform_discrete_collision_detection(&objs, &|_, _| false, &settings());
        assert!(d.manifolds().is_empty());
        objs[1].pose = Isometry::from_translation(vec3(5.0, 0.0, 0.0));
        objs[1].aabb = aabb_of(&objs[1].shape, &objs[1].pose);
        d.perform_discrete_collision_detection(&objs, &|_, _| true, &settings());
        assert!(d.manifolds().is_empty());
    }

    #[test]
    fn static_pairs_never_collide() {
        let objs = [
            object(0, Shape::Box { hx: 1.0, hy: 1.0, hz: 1.0 }, Vec3::ZERO, true),
            object(1, Shape::Box { hx: 1.0, hy: 1.0, hz: 1.0 }, vec3(0.5, 0.0, 0.0), true),
        ];
        let mut d = DefaultDispatcher::new();
        let r = d.perform_discrete_collision_detection(&objs, &|_, _| true, &settings());
        assert_eq!(r.pairs_tested, 0);
    }

    #[test]
    fn sleeping_pair_keeps_its_manifold() {
        let mut objs = vec![
            object(0, Shape::Sphere { r: 0.5 }, Vec3::ZERO, false),
            object(1, Shape::Sphere { r: 0.5 }, vec3(0.9, 0.0, 0.0), false),
        ];
        let mut d = DefaultDispatcher::new();
        d.perform_discrete_collision_detection(&objs, &|_, _| true, &settings());
        objs[0].active = false;
        objs[1].active = false;
        let r = d.perform_discrete_collision_detection(&objs, &|_, _| true, &settings());
        assert_eq!(r.pairs_tested, 0);
        assert_eq!(d.manifolds().len(), 1);
    }
}
