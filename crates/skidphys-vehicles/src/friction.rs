//! Single-row impulse helpers used by the tire model.

use skidphys_core::{BodyId, Vec3};
use skidphys_dynamics::Bodies;

const CONTACT_DAMPING: f32 = 0.2;

fn velocity_at(bodies: &Bodies, body: Option<BodyId>, pos: Vec3) -> Vec3 {
    match body {
        Some(id) => bodies.velocity_in_local_point(id.0, pos - bodies.pose(id.0).pos),
        None => Vec3::ZERO,
    }
}

fn denominator(bodies: &Bodies, body: Option<BodyId>, pos: Vec3, normal: Vec3) -> f32 {
    body.map_or(0.0, |id| bodies.impulse_denominator(id.0, pos, normal))
}

/// Damped impulse along `normal` that removes part of the relative velocity
/// of two bodies at a shared point. `None` on either side is the fixed world.
pub fn resolve_single_bilateral(
    bodies: &Bodies,
    body1: BodyId,
    pos1: Vec3,
    body2: Option<BodyId>,
    pos2: Vec3,
    normal: Vec3,
) -> f32 {
    if normal.length_squared() > 1.1 {
        return 0.0;
    }
    let vel = velocity_at(bodies, Some(body1), pos1) - velocity_at(bodies, body2, pos2);
    let jac_diag = denominator(bodies, Some(body1), pos1, normal) + denominator(bodies, body2, pos2, normal);
    if jac_diag <= f32::EPSILON {
        return 0.0;
    }
    let rel_vel = normal.dot(vel);
    -CONTACT_DAMPING * rel_vel / jac_diag
}

/// Rolling resistance or braking contact along the wheel's forward direction.
#[derive(Copy, Clone, Debug)]
pub struct WheelContactPoint {
    /// Chassis body.
    pub body0: BodyId,
    /// Ground body, `None` for the fixed world.
    pub body1: Option<BodyId>,
    /// Contact in world space.
    pub friction_position_world: Vec3,
    /// Forward direction on the ground plane.
    pub friction_direction_world: Vec3,
    /// Inverse effective mass along the direction.
    pub jac_diag_ab_inv: f32,
    /// Impulse bound, usually the brake value.
    pub max_impulse: f32,
}

impl WheelContactPoint {
    /// Builds the contact and its effective mass.
    pub fn new(
        bodies: &Bodies,
        body0: BodyId,
        body1: Option<BodyId>,
        friction_position_world: Vec3,
        friction_direction_world: Vec3,
        max_impulse: f32,
    ) -> Self {
        let denom = denominator(bodies, Some(body0), friction_position_world, friction_direction_world)
            + denominator(bodies, body1, friction_position_world, friction_direction_world);
        Self {
            body0,
            body1,
            friction_position_world,
            friction_direction_world,
            jac_diag_ab_inv: if denom > f32::EPSILON { 1.0 / denom } else { 0.0 },
            max_impulse,
        }
    }
}

/// Impulse stopping the forward slip, clamped to `max_impulse`.
pub fn calc_rolling_friction(bodies: &Bodies, contact: &WheelContactPoint) -> f32 {
    let pos = contact.friction_position_world;
    let vel = velocity_at(bodies, Some(contact.body0), pos) - velocity_at(bodies, contact.body1, pos);
    let vrel = contact.friction_direction_world.dot(vel);
    let j = -vrel * contact.jac_diag_ab_inv;
    j.clamp(-contact.max_impulse, contact.max_impulse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::{vec3, Isometry, Velocity};
    use skidphys_dynamics::RigidBodyDesc;
    use skidphys_geom::Shape;

    fn sliding_box(vel: Vec3) -> (Bodies, BodyId) {
        let mut bodies = Bodies::default();
        let desc = RigidBodyDesc::dynamic(Shape::Box { hx: 1.0, hy: 0.5, hz: 2.0 }, 2.0, Isometry::IDENTITY)
            .with_velocity(Velocity { lin: vel, ang: Vec3::ZERO });
        let id = BodyId(bodies.add(&desc, Vec3::ZERO));
        (bodies, id)
    }

    #[test]
    fn bilateral_opposes_sideways_motion() {
        let (bodies, chassis) = sliding_box(vec3(3.0, 0.0, 0.0));
        let j = resolve_single_bilateral(&bodies, chassis, Vec3::ZERO, None, Vec3::ZERO, Vec3::X);
        // 0.2 * 3 m/s * 2 kg at the centre of mass
        assert_relative_eq!(j, -1.2, epsilon = 1e-5);
    }

    #[test]
    fn bilateral_rejects_unnormalized_axis() {
        let (bodies, chassis) = sliding_box(vec3(3.0, 0.0, 0.0));
        assert_eq!(resolve_single_bilateral(&bodies, chassis, Vec3::ZERO, None, Vec3::ZERO, Vec3::X * 2.0), 0.0);
    }

    #[test]
    fn rolling_friction_is_clamped_by_brake() {
        let (bodies, chassis) = sliding_box(vec3(0.0, 0.0, 10.0));
        let free = WheelContactPoint::new(&bodies, chassis, None, Vec3::ZERO, Vec3::Z, 0.0);
        assert_eq!(calc_rolling_friction(&bodies, &free), 0.0);
        let braking = WheelContactPoint::new(&bodies, chassis, None, Vec3::ZERO, Vec3::Z, 5.0);
        assert_relative_eq!(calc_rolling_friction(&bodies, &braking), -5.0);
        let strong = WheelContactPoint::new(&bodies, chassis, None, Vec3::ZERO, Vec3::Z, 1000.0);
        assert_relative_eq!(calc_rolling_friction(&bodies, &strong), -20.0, epsilon = 1e-4);
    }
}
