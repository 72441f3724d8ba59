use std::collections::BTreeMap;

use skidphys_core::{BodyId, Isometry, Vec3};
use crate::narrowphase::{RawContact, MAX_MANIFOLD_POINTS};

/// Order-independent key for a body pair; `.0 < .1`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PairKey(pub BodyId, pub BodyId);

impl PairKey {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b { PairKey(a, b) } else { PairKey(b, a) }
    }
    pub fn contains(&self, id: BodyId) -> bool { self.0 == id || self.1 == id }
}

/// A persistent contact. Geometry is refreshed every pass; the impulse
/// accumulators survive between steps for warm starting.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactPoint {
    pub local_a: Vec3,
    pub local_b: Vec3,
    pub position_world_on_a: Vec3,
    pub position_world_on_b: Vec3,
    /// Points from B toward A.
    pub normal_world_on_b: Vec3,
    pub distance: f32,
    pub combined_friction: f32,
    pub combined_restitution: f32,
    pub applied_impulse: f32,
    pub applied_impulse_lateral: [f32; 2],
    pub lateral_dirs: [Vec3; 2],
    /// Passes this point has survived.
    pub lifetime: u32,
}

impl ContactPoint {
    pub fn from_raw(raw: &RawContact, xa: &Isometry, xb: &Isometry, friction: f32, restitution: f32) -> Self {
        let pa = raw.point_on_a();
        ContactPoint {
            local_a: xa.inverse_transform_point(pa),
            local_b: xb.inverse_transform_point(raw.point_on_b),
            position_world_on_a: pa,
            position_world_on_b: raw.point_on_b,
            normal_world_on_b: raw.normal_on_b,
            distance: raw.distance,
            combined_friction: friction,
            combined_restitution: restitution,
            applied_impulse: 0.0,
            applied_impulse_lateral: [0.0; 2],
            lateral_dirs: [Vec3::ZERO; 2],
            lifetime: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContactManifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    pub fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self { body_a, body_b, points: Vec::with_capacity(MAX_MANIFOLD_POINTS) }
    }

    pub fn key(&self) -> PairKey { PairKey::new(self.body_a, self.body_b) }

    /// Closest point distance, or `f32::INFINITY` when empty.
    pub fn min_distance(&self) -> f32 {
        self.points.iter().map(|p| p.distance).fold(f32::INFINITY, f32::min)
    }

    /// Replaces the points with `fresh`, carrying accumulated impulses over from
    /// old points whose anchor on A lies within `threshold`.
    pub fn refresh(&mut self, fresh: Vec<ContactPoint>, threshold: f32) {
        let threshold_sq = threshold * threshold;
        let mut taken = [false; MAX_MANIFOLD_POINTS];
        let mut next = Vec::with_capacity(fresh.len().min(MAX_MANIFOLD_POINTS));
        for mut p in fresh.into_iter().take(MAX_MANIFOLD_POINTS) {
            let mut best: Option<(usize, f32)> = None;
            for (i, old) in self.points.iter().enumerate() {
                if taken.get(i).copied().unwrap_or(true) { continue; }
                let d2 = (old.local_a - p.local_a).length_squared();
                if d2 < threshold_sq && best.map_or(true, |(_, b)| d2 < b) {
                    best = Some((i, d2));
                }
            }
            if let Some((i, _)) = best {
                let old = &self.points[i];
                taken[i] = true;
                p.applied_impulse = old.applied_impulse;
                p.applied_impulse_lateral = old.applied_impulse_lateral;
                p.lateral_dirs = old.lateral_dirs;
                p.lifetime = old.lifetime + 1;
            }
            next.push(p);
        }
        self.points = next;
    }
}

/// All manifolds alive after the last collision pass, keyed by body pair.
#[derive(Clone, Debug, Default)]
pub struct ManifoldCache {
    map: BTreeMap<PairKey, ContactManifold>,
}

impl ManifoldCache {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
    pub fn total_points(&self) -> usize { self.map.values().map(|m| m.points.len()).sum() }

    pub fn get(&self, a: BodyId, b: BodyId) -> Option<&ContactManifold> { self.map.get(&PairKey::new(a, b)) }
    pub fn contains(&self, key: &PairKey) -> bool { self.map.contains_key(key) }

    pub fn iter(&self) -> impl Iterator<Item = &ContactManifold> { self.map.values() }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ContactManifold> { self.map.values_mut() }

    /// Manifold for the pair, created empty if missing. `a` becomes body A of a new manifold.
    pub fn entry(&mut self, a: BodyId, b: BodyId) -> &mut ContactManifold {
        self.map.entry(PairKey::new(a, b)).or_insert_with(|| ContactManifold::new(a, b))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&PairKey) -> bool) {
        self.map.retain(|k, _| keep(k));
    }

    pub fn remove_body(&mut self, id: BodyId) -> usize {
        let before = self.map.len();
        self.map.retain(|k, _| !k.contains(id));
        before - self.map.len()
    }

    pub fn clear(&mut self) { self.map.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skidphys_core::vec3;

    fn point_at(x: f32, impulse: f32) -> ContactPoint {
        let raw = RawContact { point_on_b: vec3(x, 0.0, 0.0), normal_on_b: Vec3::Y, distance: 0.0 };
        let mut p = ContactPoint::from_raw(&raw, &Isometry::IDENTITY, &Isometry::IDENTITY, 0.25, 0.0);
        p.applied_impulse = impulse;
        p
    }

    #[test]
    fn refresh_carries_impulse_for_nearby_points() {
        let mut m = ContactManifold::new(BodyId(0), BodyId(1));
        m.points = vec![point_at(0.0, 3.0), point_at(1.0, 5.0)];
        m.refresh(vec![point_at(1.005, 0.0), point_at(2.0, 0.0)], 0.02);
        assert_eq!(m.points.len(), 2);
        assert_eq!(m.points[0].applied_impulse, 5.0);
        assert_eq!(m.points[0].lifetime, 1);
        assert_eq!(m.points[1].applied_impulse, 0.0);
        assert_eq!(m.points[1].lifetime, 0);
    }

    #[test]
    fn old_point_is_matched_once() {
        let mut m = ContactManifold::new(BodyId(0), BodyId(1));
        m.points = vec![point_at(0.0, 4.0)];
        m.refresh(vec![point_at(0.001, 0.0), point_at(0.002, 0.0)], 0.02);
        let carried: Vec<f32> = m.points.iter().map(|p| p.applied_impulse).collect();
        assert_eq!(carried, vec![4.0, 0.0]);
    }

    #[test]
    fn remove_body_drops_its_pairs() {
        let mut c = ManifoldCache::new();
        c.entry(BodyId(0), BodyId(1));
        c.entry(BodyId(2), BodyId(1));
        c.entry(BodyId(2), BodyId(3));
        assert_eq!(c.remove_body(BodyId(1)), 2);
        assert_eq!(c.len(), 1);
        assert!(c.get(BodyId(3), BodyId(2)).is_some());
    }
}
