use skidphys_core::{BodyId, Isometry, Vec3};
use skidphys_dynamics::{ActivationState, Bodies, BodyKind};
use skidphys_geom::{aabb_of, ray_cast, Aabb, Shape};
use skidphys_viz::DebugDraw;

use crate::World;

/// Closest body hit by a world ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    pub body: BodyId,
    pub point: Vec3,
    pub normal: Vec3,
    /// Position along `from -> to`, in [0, 1].
    pub fraction: f32,
}

#[derive(Copy, Clone, Debug)]
struct RayTarget {
    body: BodyId,
    shape: Shape,
    pose: Isometry,
    aabb: Aabb,
}

/// Snapshot of every simulated body, so rays can be cast while the body
/// arena is borrowed mutably.
pub(crate) struct RayScene {
    targets: Vec<RayTarget>,
}

impl RayScene {
    /// Static bodies keep their stored bounds; moving ones are re-bounded at
    /// their current pose.
    pub(crate) fn capture(bodies: &Bodies, shapes: &[Shape], aabbs: &[Aabb]) -> Self {
        let targets = bodies
            .indices()
            .filter(|&id| bodies.is_simulated(id))
            .map(|id| {
                let i = id as usize;
                let pose = bodies.pose(id);
                let aabb = if bodies.kind(id) == BodyKind::Static { aabbs[i] } else { aabb_of(&shapes[i], &pose) };
                RayTarget { body: BodyId(id), shape: shapes[i], pose, aabb }
            })
            .collect();
        Self { targets }
    }

    /// Nearest hit on the segment; ties go to the lower body id.
    pub(crate) fn closest(&self, from: Vec3, to: Vec3, exclude: Option<BodyId>) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for t in &self.targets {
            if Some(t.body) == exclude || !t.aabb.intersects_segment(from, to) { continue; }
            let Some(hit) = ray_cast(&t.shape, &t.pose, from, to) else { continue };
            if best.map_or(true, |b| hit.fraction < b.fraction) {
                best = Some(RayHit {
                    body: t.body,
                    point: from + (to - from) * hit.fraction,
                    normal: hit.normal,
                    fraction: hit.fraction,
                });
            }
        }
        best
    }
}

const COLOR_ACTIVE: [f32; 3] = [0.0, 1.0, 0.0];
const COLOR_SLEEPING: [f32; 3] = [0.0, 0.0, 1.0];
const COLOR_WANTS_SLEEP: [f32; 3] = [0.0, 1.0, 1.0];
const COLOR_PINNED: [f32; 3] = [1.0, 0.0, 0.0];
const COLOR_CONTACT: [f32; 3] = [1.0, 1.0, 0.0];
const COLOR_CONSTRAINT: [f32; 3] = [1.0, 0.5, 0.0];
const COLOR_WHEEL_CONTACT: [f32; 3] = [0.0, 0.0, 1.0];
const COLOR_WHEEL_AIR: [f32; 3] = [1.0, 0.0, 1.0];

fn activation_color(state: ActivationState) -> [f32; 3] {
    match state {
        ActivationState::Active => COLOR_ACTIVE,
        ActivationState::IslandSleeping => COLOR_SLEEPING,
        ActivationState::WantsDeactivation => COLOR_WANTS_SLEEP,
        ActivationState::DisableDeactivation | ActivationState::DisableSimulation => COLOR_PINNED,
    }
}

impl World {
    /// Closest hit on the segment `from -> to`, skipping `exclude`.
    pub fn ray_test(&self, from: Vec3, to: Vec3, exclude: Option<BodyId>) -> Option<RayHit> {
        if !(from.is_finite() && to.is_finite()) { return None; }
        RayScene::capture(&self.bodies, &self.shapes, &self.aabbs).closest(from, to, exclude)
    }

    /// Emits debug lines per `DebugSettings`; each category is capped at
    /// `max_lines` primitives.
    pub fn debug_draw(&self, out: &mut dyn DebugDraw) {
        let s = self.debug;

        if s.draw_aabbs {
            for id in self.bodies.indices().filter(|&id| self.bodies.is_simulated(id)).take(s.max_lines) {
                let aabb = &self.aabbs[id as usize];
                if self.shapes[id as usize].is_plane() { continue; }
                out.draw_box(aabb.min, aabb.max, activation_color(self.bodies.activation_state(id)));
            }
        }

        if s.draw_contacts {
            let points = self.dispatcher.manifolds().iter().flat_map(|m| m.points.iter());
            for p in points.take(s.max_lines) {
                out.draw_contact_point(p.position_world_on_b, p.normal_world_on_b, p.distance, COLOR_CONTACT);
            }
        }

        if s.draw_constraints {
            for c in self.constraints.active().take(s.max_lines) {
                let (xa, xb) = (self.bodies.pose(c.body_a.0), self.bodies.pose(c.body_b.0));
                let (pa, pb) = c.pivots();
                let (wa, wb) = (xa.transform_point(pa), xb.transform_point(pb));
                out.draw_line(xa.pos, wa, COLOR_CONSTRAINT);
                out.draw_line(xb.pos, wb, COLOR_CONSTRAINT);
                out.draw_line(wa, wb, COLOR_PINNED);
            }
        }

        if s.draw_wheels {
            let wheels = self.vehicles.iter().flatten().flat_map(|v| v.wheels().iter());
            for w in wheels.take(s.max_lines) {
                let ri = &w.raycast_info;
                let color = if ri.is_in_contact { COLOR_WHEEL_CONTACT } else { COLOR_WHEEL_AIR };
                let center = w.world_transform.pos;
                out.draw_line(center, center + ri.wheel_axle_ws, color);
                out.draw_line(ri.hard_point_ws, ri.contact_point_ws, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::vec3;
    use skidphys_dynamics::RigidBodyDesc;
    use skidphys_viz::{DebugSettings, LineCollector};

    use crate::WorldBuilder;

    fn two_balls() -> (World, BodyId, BodyId) {
        let mut w = WorldBuilder::new().build().unwrap();
        let ball = Shape::Sphere { r: 0.5 };
        let a = w.add_body(RigidBodyDesc::fixed(ball, Isometry::from_translation(vec3(2.0, 0.0, 0.0)))).unwrap();
        let b = w.add_body(RigidBodyDesc::fixed(ball, Isometry::from_translation(vec3(5.0, 0.0, 0.0)))).unwrap();
        (w, a, b)
    }

    #[test]
    fn ray_test_reports_the_nearest_body() {
        let (w, a, b) = two_balls();
        let hit = w.ray_test(Vec3::ZERO, vec3(10.0, 0.0, 0.0), None).unwrap();
        assert_eq!(hit.body, a);
        assert_relative_eq!(hit.point.x, 1.5, epsilon = 1e-4);
        assert_relative_eq!(hit.fraction, 0.15, epsilon = 1e-5);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-4);

        let hit = w.ray_test(Vec3::ZERO, vec3(10.0, 0.0, 0.0), Some(a)).unwrap();
        assert_eq!(hit.body, b);
        assert!(w.ray_test(Vec3::ZERO, vec3(0.0, 10.0, 0.0), None).is_none());
    }

    #[test]
    fn removed_bodies_are_invisible_to_rays() {
        let (mut w, a, b) = two_balls();
        w.remove_body(a).unwrap();
        assert_eq!(w.ray_test(Vec3::ZERO, vec3(10.0, 0.0, 0.0), None).map(|h| h.body), Some(b));
    }

    #[test]
    fn debug_draw_respects_settings() {
        let (mut w, _, _) = two_balls();
        w.set_debug(DebugSettings { draw_aabbs: true, ..DebugSettings::default() });
        let mut lines = LineCollector::default();
        w.debug_draw(&mut lines);
        assert_eq!(lines.lines.len(), 24);

        w.set_debug(DebugSettings { draw_aabbs: true, max_lines: 1, ..DebugSettings::default() });
        let mut lines = LineCollector::default();
        w.debug_draw(&mut lines);
        assert_eq!(lines.lines.len(), 12);
    }
}
