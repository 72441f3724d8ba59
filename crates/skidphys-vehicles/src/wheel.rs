//! Per-wheel state and tuning.

use serde::{Deserialize, Serialize};
use skidphys_core::{BodyId, Isometry, Vec3};

/// Suspension and tire defaults copied into each new wheel.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Spring rate, scaled by chassis mass.
    pub suspension_stiffness: f32,
    /// Damping while the spring compresses.
    pub suspension_compression: f32,
    /// Damping while the spring extends.
    pub suspension_damping: f32,
    /// Travel each side of rest length, in centimetres.
    pub max_suspension_travel_cm: f32,
    /// Friction-circle radius multiplier.
    pub friction_slip: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            suspension_stiffness: 5.88,
            suspension_compression: 0.83,
            suspension_damping: 0.88,
            max_suspension_travel_cm: 500.0,
            friction_slip: 10.5,
        }
    }
}

/// Result of the last suspension ray plus the wheel frame in world space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RaycastInfo {
    /// Ground normal; minus the wheel direction when airborne.
    pub contact_normal_ws: Vec3,
    /// Ground contact, or the ray end when airborne.
    pub contact_point_ws: Vec3,
    /// Current spring length.
    pub suspension_length: f32,
    /// Suspension attachment in world space.
    pub hard_point_ws: Vec3,
    /// Suspension direction in world space.
    pub wheel_direction_ws: Vec3,
    /// Axle in world space.
    pub wheel_axle_ws: Vec3,
    /// The ray hit something this substep.
    pub is_in_contact: bool,
    /// Body under the wheel.
    pub ground_object: Option<BodyId>,
}

/// One wheel of a `RaycastVehicle`.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelInfo {
    /// Raycast output and world frame.
    pub raycast_info: RaycastInfo,
    /// Rendering transform from `update_wheel_transform`.
    pub world_transform: Isometry,
    /// Attachment point in chassis space.
    pub chassis_connection_point_cs: Vec3,
    /// Suspension direction in chassis space.
    pub wheel_direction_cs: Vec3,
    /// Axle in chassis space.
    pub wheel_axle_cs: Vec3,
    /// Spring rest length.
    pub suspension_rest_length: f32,
    /// Travel each side of rest length, in centimetres.
    pub max_suspension_travel_cm: f32,
    /// Wheel radius.
    pub wheels_radius: f32,
    /// Spring rate.
    pub suspension_stiffness: f32,
    /// Damping while compressing.
    pub wheels_damping_compression: f32,
    /// Damping while extending.
    pub wheels_damping_relaxation: f32,
    /// Friction-circle radius multiplier.
    pub friction_slip: f32,
    /// Steering angle about the suspension axis.
    pub steering: f32,
    /// Accumulated spin about the axle.
    pub rotation: f32,
    /// Spin added last substep.
    pub delta_rotation: f32,
    /// How much side impulses roll the chassis; 0 applies them at the centre of mass height.
    pub roll_influence: f32,
    /// Drive force along the wheel's forward direction.
    pub engine_force: f32,
    /// Largest braking impulse per substep.
    pub brake: f32,
    /// Front wheel flag, informational.
    pub is_front_wheel: bool,
    /// Spring clip factor from the ray/normal angle.
    pub clipped_inv_contact_dot_suspension: f32,
    /// Spring velocity along the contact normal.
    pub suspension_relative_velocity: f32,
    /// Spring force of the last substep, already scaled by chassis mass.
    pub wheels_suspension_force: f32,
    /// 1 for full grip, below 1 while sliding.
    pub skid_info: f32,
}

impl WheelInfo {
    /// New wheel at rest with tuning defaults.
    pub fn new(
        connection_point_cs: Vec3,
        direction_cs: Vec3,
        axle_cs: Vec3,
        rest_length: f32,
        radius: f32,
        tuning: &VehicleTuning,
        is_front_wheel: bool,
    ) -> Self {
        Self {
            raycast_info: RaycastInfo { suspension_length: rest_length, ..RaycastInfo::default() },
            world_transform: Isometry::IDENTITY,
            chassis_connection_point_cs: connection_point_cs,
            wheel_direction_cs: direction_cs,
            wheel_axle_cs: axle_cs,
            suspension_rest_length: rest_length,
            max_suspension_travel_cm: tuning.max_suspension_travel_cm,
            wheels_radius: radius,
            suspension_stiffness: tuning.suspension_stiffness,
            wheels_damping_compression: tuning.suspension_compression,
            wheels_damping_relaxation: tuning.suspension_damping,
            friction_slip: tuning.friction_slip,
            steering: 0.0,
            rotation: 0.0,
            delta_rotation: 0.0,
            roll_influence: 0.1,
            engine_force: 0.0,
            brake: 0.0,
            is_front_wheel,
            clipped_inv_contact_dot_suspension: 1.0,
            suspension_relative_velocity: 0.0,
            wheels_suspension_force: 0.0,
            skid_info: 1.0,
        }
    }

    /// Allowed spring length range.
    pub fn suspension_limits(&self) -> (f32, f32) {
        let travel = self.max_suspension_travel_cm * 0.01;
        (self.suspension_rest_length - travel, self.suspension_rest_length + travel)
    }

    /// Rest length plus radius.
    pub fn ray_length(&self) -> f32 { self.suspension_rest_length + self.wheels_radius }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wheel_takes_tuning() {
        let tuning = VehicleTuning { max_suspension_travel_cm: 20.0, ..VehicleTuning::default() };
        let w = WheelInfo::new(Vec3::ZERO, -Vec3::Y, -Vec3::X, 0.6, 0.5, &tuning, true);
        assert_eq!(w.suspension_stiffness, 5.88);
        assert_eq!(w.friction_slip, 10.5);
        assert_eq!(w.roll_influence, 0.1);
        let (lo, hi) = w.suspension_limits();
        assert!((lo - 0.4).abs() < 1e-6 && (hi - 0.8).abs() < 1e-6);
        assert!((w.ray_length() - 1.1).abs() < 1e-6);
    }

    #[test]
    fn tuning_parses_partial_json() {
        let t: VehicleTuning = serde_json::from_str("{\"friction_slip\": 2.0}").unwrap();
        assert_eq!(t.friction_slip, 2.0);
        assert_eq!(t.suspension_compression, 0.83);
    }
}
