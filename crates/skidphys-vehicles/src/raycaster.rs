//! Ray queries the vehicle issues against its world.

use skidphys_core::{BodyId, Vec3};

/// Closest hit of a suspension ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VehicleRaycasterResult {
    /// Hit position in world space.
    pub hit_point: Vec3,
    /// Surface normal at the hit, world space.
    pub hit_normal: Vec3,
    /// Fraction of the `from -> to` segment at the hit.
    pub dist_fraction: f32,
    /// Body that was hit.
    pub body: BodyId,
}

/// World access needed by the suspension rays.
pub trait VehicleRaycaster {
    /// Closest hit on the segment, ignoring the vehicle's own chassis.
    fn cast_ray(&self, from: Vec3, to: Vec3) -> Option<VehicleRaycasterResult>;
}

impl<F> VehicleRaycaster for F
where
    F: Fn(Vec3, Vec3) -> Option<VehicleRaycasterResult>,
{
    fn cast_ray(&self, from: Vec3, to: Vec3) -> Option<VehicleRaycasterResult> {
        self(from, to)
    }
}
