//! The vehicle itself: rays, springs, tires, wheel spin.

use glam::{Mat3 as GMat3, Quat, Vec3 as GVec3};
use skidphys_core::{BodyId, Isometry, PhysicsError, PhysicsResult, Vec3, VehicleId};
use skidphys_dynamics::Bodies;

use crate::friction::{calc_rolling_friction, resolve_single_bilateral, WheelContactPoint};
use crate::raycaster::VehicleRaycaster;
use crate::wheel::{VehicleTuning, WheelInfo};

const SIDE_FRICTION_STIFFNESS: f32 = 1.0;
const FWD_FACTOR: f32 = 0.5;
const SIDE_FACTOR: f32 = 1.0;
const ROTATION_DECAY: f32 = 0.99;

/// A chassis body plus its wheels. The vehicle borrows the chassis by id and
/// never owns body state.
#[derive(Clone, Debug)]
pub struct RaycastVehicle {
    id: VehicleId,
    chassis: BodyId,
    wheels: Vec<WheelInfo>,
    right_axis: usize,
    up_axis: usize,
    forward_axis: usize,
    current_speed_kmh: f32,
    forward_ws: Vec<Vec3>,
    axle: Vec<Vec3>,
    forward_impulse: Vec<f32>,
    side_impulse: Vec<f32>,
}

fn column(iso: &Isometry, axis: usize) -> Vec3 {
    iso.basis().col(axis.min(2))
}

impl RaycastVehicle {
    /// Vehicle without wheels; axes default to right X, up Y, forward Z.
    pub fn new(id: VehicleId, chassis: BodyId) -> Self {
        Self {
            id,
            chassis,
            wheels: Vec::new(),
            right_axis: 0,
            up_axis: 1,
            forward_axis: 2,
            current_speed_kmh: 0.0,
            forward_ws: Vec::new(),
            axle: Vec::new(),
            forward_impulse: Vec::new(),
            side_impulse: Vec::new(),
        }
    }

    /// Id assigned by the owning world.
    pub fn id(&self) -> VehicleId { self.id }
    /// Chassis body.
    pub fn chassis(&self) -> BodyId { self.chassis }
    /// Number of wheels.
    pub fn num_wheels(&self) -> usize { self.wheels.len() }
    /// All wheels in insertion order.
    pub fn wheels(&self) -> &[WheelInfo] { &self.wheels }

    /// Wheel by index.
    pub fn wheel(&self, index: usize) -> PhysicsResult<&WheelInfo> {
        let count = self.wheels.len();
        self.wheels
            .get(index)
            .ok_or(PhysicsError::WheelOutOfRange { vehicle: self.id, index, count })
    }

    /// Mutable wheel by index.
    pub fn wheel_mut(&mut self, index: usize) -> PhysicsResult<&mut WheelInfo> {
        let count = self.wheels.len();
        let vehicle = self.id;
        self.wheels.get_mut(index).ok_or(PhysicsError::WheelOutOfRange { vehicle, index, count })
    }

    /// Chassis axis indices used for right, up and forward.
    pub fn set_coordinate_system(&mut self, right: usize, up: usize, forward: usize) {
        self.right_axis = right.min(2);
        self.up_axis = up.min(2);
        self.forward_axis = forward.min(2);
    }

    /// Axis indices as (right, up, forward).
    pub fn coordinate_system(&self) -> (usize, usize, usize) {
        (self.right_axis, self.up_axis, self.forward_axis)
    }

    /// Signed speed in km/h from the last update; negative when reversing.
    pub fn current_speed_kmh(&self) -> f32 { self.current_speed_kmh }

    /// Appends a wheel and returns its index.
    #[allow(clippy::too_many_arguments)]
    pub fn add_wheel(
        &mut self,
        connection_point_cs: Vec3,
        wheel_direction_cs: Vec3,
        wheel_axle_cs: Vec3,
        suspension_rest_length: f32,
        wheel_radius: f32,
        tuning: &VehicleTuning,
        is_front_wheel: bool,
    ) -> usize {
        self.wheels.push(WheelInfo::new(
            connection_point_cs,
            wheel_direction_cs,
            wheel_axle_cs,
            suspension_rest_length,
            wheel_radius,
            tuning,
            is_front_wheel,
        ));
        self.wheels.len() - 1
    }

    /// Steering angle of one wheel, radians about the suspension axis.
    pub fn set_steering_value(&mut self, steering: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.steering = steering;
        Ok(())
    }

    /// Drive force of one wheel.
    pub fn apply_engine_force(&mut self, force: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.engine_force = force;
        Ok(())
    }

    /// Brake impulse bound of one wheel.
    pub fn set_brake(&mut self, brake: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.brake = brake;
        Ok(())
    }

    /// Friction-circle multiplier of one wheel.
    pub fn set_friction_slip(&mut self, friction: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.friction_slip = friction;
        Ok(())
    }

    /// Spring rate of one wheel.
    pub fn set_suspension_stiffness(&mut self, stiffness: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.suspension_stiffness = stiffness;
        Ok(())
    }

    /// Compression damping of one wheel.
    pub fn set_suspension_compression(&mut self, compression: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.wheels_damping_compression = compression;
        Ok(())
    }

    /// Relaxation damping of one wheel.
    pub fn set_suspension_damping(&mut self, damping: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.wheels_damping_relaxation = damping;
        Ok(())
    }

    /// Roll influence of one wheel.
    pub fn set_roll_influence(&mut self, roll_influence: f32, wheel: usize) -> PhysicsResult<()> {
        self.wheel_mut(wheel)?.roll_influence = roll_influence;
        Ok(())
    }

    /// Chassis forward axis in world space.
    pub fn forward_vector(&self, bodies: &Bodies) -> Vec3 {
        column(&bodies.pose(self.chassis.0), self.forward_axis)
    }

    /// Rendering transform of a wheel from the last `update_wheel_transform`.
    pub fn wheel_transform(&self, index: usize) -> PhysicsResult<Isometry> {
        Ok(self.wheel(index)?.world_transform)
    }

    /// Moves the wheel's hard point, direction and axle into world space for
    /// `chassis_pose`. Contact state is left to the next `ray_cast`.
    pub fn update_wheel_transforms_ws(&mut self, index: usize, chassis_pose: &Isometry) {
        let Some(wheel) = self.wheels.get_mut(index) else { return };
        let ri = &mut wheel.raycast_info;
        ri.hard_point_ws = chassis_pose.transform_point(wheel.chassis_connection_point_cs);
        ri.wheel_direction_ws = chassis_pose.transform_vector(wheel.wheel_direction_cs);
        ri.wheel_axle_ws = chassis_pose.transform_vector(wheel.wheel_axle_cs);
    }

    /// Rebuilds the rendering transform: steering about up, spin about the
    /// axle, over the {axle, forward, up} basis, at the spring end.
    pub fn update_wheel_transform(&mut self, index: usize, chassis_pose: &Isometry) {
        self.update_wheel_transforms_ws(index, chassis_pose);
        let Some(wheel) = self.wheels.get_mut(index) else { return };
        let ri = &wheel.raycast_info;
        let up = -ri.wheel_direction_ws.normalize_or_zero();
        let right = ri.wheel_axle_ws.normalize_or_zero();
        let fwd = up.cross(right).normalize_or_zero();

        let basis = GMat3::from_cols(GVec3::from(right), GVec3::from(fwd), GVec3::from(up));
        let rot = if fwd == Vec3::ZERO {
            chassis_pose.rot
        } else {
            let steering = Quat::from_axis_angle(GVec3::from(up), wheel.steering);
            let spin = Quat::from_axis_angle(GVec3::from(right), -wheel.rotation);
            (steering * spin * Quat::from_mat3(&basis)).normalize()
        };
        wheel.world_transform = Isometry {
            pos: ri.hard_point_ws + ri.wheel_direction_ws * ri.suspension_length,
            rot,
        };
    }

    /// Casts one wheel's suspension ray and fills its raycast info. Returns
    /// the hit depth along the ray, or -1 on a miss.
    pub fn ray_cast(&mut self, index: usize, bodies: &Bodies, raycaster: &dyn VehicleRaycaster) -> f32 {
        let chassis_pose = bodies.pose(self.chassis.0);
        self.update_wheel_transforms_ws(index, &chassis_pose);
        let Some(wheel) = self.wheels.get_mut(index) else { return -1.0 };

        let ray_len = wheel.ray_length();
        let (min_len, max_len) = wheel.suspension_limits();
        let ri = &mut wheel.raycast_info;
        let source = ri.hard_point_ws;
        let target = source + ri.wheel_direction_ws * ray_len;
        ri.contact_point_ws = target;
        ri.is_in_contact = false;
        ri.ground_object = None;

        let Some(hit) = raycaster.cast_ray(source, target) else {
            ri.suspension_length = wheel.suspension_rest_length;
            ri.contact_normal_ws = -ri.wheel_direction_ws;
            wheel.suspension_relative_velocity = 0.0;
            wheel.clipped_inv_contact_dot_suspension = 1.0;
            return -1.0;
        };

        let depth = ray_len * hit.dist_fraction;
        ri.contact_normal_ws = hit.hit_normal;
        ri.is_in_contact = true;
        ri.ground_object = bodies.is_dynamic(hit.body.0).then_some(hit.body);
        ri.suspension_length = (depth - wheel.wheels_radius).clamp(min_len, max_len);
        ri.contact_point_ws = hit.hit_point;

        let denominator = ri.contact_normal_ws.dot(ri.wheel_direction_ws);
        let chassis_vel = bodies.velocity_in_local_point(self.chassis.0, hit.hit_point - chassis_pose.pos);
        let proj_vel = ri.contact_normal_ws.dot(chassis_vel);
        if denominator >= -0.1 {
            wheel.suspension_relative_velocity = 0.0;
            wheel.clipped_inv_contact_dot_suspension = 1.0 / 0.1;
        } else {
            let inv = -1.0 / denominator;
            wheel.suspension_relative_velocity = proj_vel * inv;
            wheel.clipped_inv_contact_dot_suspension = inv;
        }
        depth
    }

    /// Spring and damper force per wheel, scaled by chassis mass, never pulling.
    pub fn update_suspension(&mut self, chassis_mass: f32) {
        for wheel in &mut self.wheels {
            if !wheel.raycast_info.is_in_contact {
                wheel.wheels_suspension_force = 0.0;
                continue;
            }
            let length_diff = wheel.suspension_rest_length - wheel.raycast_info.suspension_length;
            let mut force = wheel.suspension_stiffness * length_diff * wheel.clipped_inv_contact_dot_suspension;
            let rel_vel = wheel.suspension_relative_velocity;
            let damping = if rel_vel < 0.0 { wheel.wheels_damping_compression } else { wheel.wheels_damping_relaxation };
            force -= damping * rel_vel;
            wheel.wheels_suspension_force = (force * chassis_mass).max(0.0);
        }
    }

    /// Side and forward tire impulses, limited per wheel by the friction circle.
    pub fn update_friction(&mut self, dt: f32, bodies: &mut Bodies) {
        let n = self.wheels.len();
        if n == 0 { return; }
        self.forward_ws.resize(n, Vec3::ZERO);
        self.axle.resize(n, Vec3::ZERO);
        self.forward_impulse.clear();
        self.forward_impulse.resize(n, 0.0);
        self.side_impulse.clear();
        self.side_impulse.resize(n, 0.0);
        let chassis = self.chassis;

        for i in 0..n {
            let ri = self.wheels[i].raycast_info;
            if !ri.is_in_contact { continue; }
            let wheel_basis = self.wheels[i].world_transform;
            let surf = ri.contact_normal_ws;
            let mut axle = column(&wheel_basis, self.right_axis);
            axle -= surf * axle.dot(surf);
            let axle = axle.normalize_or_zero();
            self.axle[i] = axle;
            self.forward_ws[i] = surf.cross(axle).normalize_or_zero();
            self.side_impulse[i] = SIDE_FRICTION_STIFFNESS * resolve_single_bilateral(
                bodies, chassis, ri.contact_point_ws, ri.ground_object, ri.contact_point_ws, axle,
            );
        }

        for i in 0..n {
            let wheel = &mut self.wheels[i];
            wheel.skid_info = 1.0;
            let ri = wheel.raycast_info;
            if !ri.is_in_contact { continue; }

            let rolling = if wheel.engine_force != 0.0 {
                wheel.engine_force * dt
            } else {
                let contact = WheelContactPoint::new(
                    bodies, chassis, ri.ground_object, ri.contact_point_ws, self.forward_ws[i], wheel.brake,
                );
                calc_rolling_friction(bodies, &contact)
            };
            self.forward_impulse[i] = rolling;

            let max_imp = wheel.wheels_suspension_force * dt * wheel.friction_slip;
            let x = self.forward_impulse[i] * FWD_FACTOR;
            let y = self.side_impulse[i] * SIDE_FACTOR;
            let magnitude = (x * x + y * y).sqrt();
            if magnitude > max_imp {
                let factor = if magnitude > 0.0 { max_imp / magnitude } else { 0.0 };
                wheel.skid_info = factor;
                self.forward_impulse[i] *= factor;
                self.side_impulse[i] *= factor;
            }
        }

        let chassis_pose = bodies.pose(chassis.0);
        let up = column(&chassis_pose, self.up_axis);
        for i in 0..n {
            let ri = self.wheels[i].raycast_info;
            let mut rel_pos = ri.contact_point_ws - chassis_pose.pos;
            if self.forward_impulse[i] != 0.0 {
                bodies.apply_impulse(chassis.0, self.forward_ws[i] * self.forward_impulse[i], rel_pos);
            }
            if self.side_impulse[i] != 0.0 {
                let side = self.axle[i] * self.side_impulse[i];
                // lower the lever arm along up so side forces roll the chassis less
                rel_pos -= up * up.dot(rel_pos) * (1.0 - self.wheels[i].roll_influence);
                bodies.apply_impulse(chassis.0, side, rel_pos);
                if let Some(ground) = ri.ground_object {
                    let rel_pos2 = ri.contact_point_ws - bodies.pose(ground.0).pos;
                    bodies.apply_impulse(ground.0, -side, rel_pos2);
                }
            }
        }
    }

    /// One vehicle substep: rays, springs, tires, wheel spin.
    pub fn update_vehicle(
        &mut self,
        dt: f32,
        bodies: &mut Bodies,
        raycaster: &dyn VehicleRaycaster,
        max_suspension_force: f32,
    ) {
        let chassis = self.chassis.0;
        let chassis_pose = bodies.pose(chassis);
        for i in 0..self.wheels.len() {
            self.update_wheel_transform(i, &chassis_pose);
        }

        let lin = bodies.vel(chassis).lin;
        self.current_speed_kmh = 3.6 * lin.length();
        if self.forward_vector(bodies).dot(lin) < 0.0 {
            self.current_speed_kmh = -self.current_speed_kmh;
        }

        for i in 0..self.wheels.len() {
            self.ray_cast(i, bodies, raycaster);
        }
        self.update_suspension(bodies.mass_of(chassis));

        for wheel in &self.wheels {
            let force = wheel.wheels_suspension_force.min(max_suspension_force);
            if force <= 0.0 { continue; }
            let ri = &wheel.raycast_info;
            let impulse = ri.contact_normal_ws * (force * dt);
            bodies.apply_impulse(chassis, impulse, ri.contact_point_ws - chassis_pose.pos);
        }

        self.update_friction(dt, bodies);

        let chassis_pose = bodies.pose(chassis);
        let fwd_axis = column(&chassis_pose, self.forward_axis);
        for wheel in &mut self.wheels {
            let ri = &wheel.raycast_info;
            if ri.is_in_contact {
                let vel = bodies.velocity_in_local_point(chassis, ri.hard_point_ws - chassis_pose.pos);
                let fwd = fwd_axis - ri.contact_normal_ws * fwd_axis.dot(ri.contact_normal_ws);
                wheel.delta_rotation = fwd.dot(vel) * dt / wheel.wheels_radius;
            }
            wheel.rotation += wheel.delta_rotation;
            wheel.delta_rotation *= ROTATION_DECAY;
        }
        log::trace!("vehicle {} speed {:.2} km/h", self.id, self.current_speed_kmh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::{vec3, Velocity};
    use skidphys_dynamics::RigidBodyDesc;
    use skidphys_geom::Shape;

    use crate::raycaster::VehicleRaycasterResult;

    const GROUND: BodyId = BodyId(0);

    /// Flat ground at y = 0 seen by every ray.
    fn flat_ground(from: Vec3, to: Vec3) -> Option<VehicleRaycasterResult> {
        if from.y <= 0.0 || to.y > 0.0 { return None; }
        let t = from.y / (from.y - to.y);
        Some(VehicleRaycasterResult {
            hit_point: from + (to - from) * t,
            hit_normal: Vec3::Y,
            dist_fraction: t,
            body: GROUND,
        })
    }

    fn no_ground(_: Vec3, _: Vec3) -> Option<VehicleRaycasterResult> { None }

    fn car(height: f32, vel: Vec3) -> (Bodies, RaycastVehicle) {
        let mut bodies = Bodies::default();
        bodies.add(&RigidBodyDesc::fixed(Shape::Plane { normal: Vec3::Y, d: 0.0 }, Isometry::IDENTITY), Vec3::ZERO);
        let desc = RigidBodyDesc::dynamic(Shape::Box { hx: 1.0, hy: 0.5, hz: 2.0 }, 800.0, Isometry::from_translation(vec3(0.0, height, 0.0)))
            .with_velocity(Velocity { lin: vel, ang: Vec3::ZERO });
        let chassis = BodyId(bodies.add(&desc, Vec3::ZERO));
        let mut v = RaycastVehicle::new(VehicleId(0), chassis);
        let tuning = VehicleTuning { suspension_stiffness: 20.0, max_suspension_travel_cm: 50.0, ..VehicleTuning::default() };
        for (x, z) in [(-1.0, 1.5), (1.0, 1.5), (-1.0, -1.5), (1.0, -1.5)] {
            v.add_wheel(vec3(x, 0.0, z), -Vec3::Y, -Vec3::X, 0.6, 0.4, &tuning, z > 0.0);
        }
        (bodies, v)
    }

    #[test]
    fn ray_hit_clamps_suspension_to_travel() {
        // chassis so low the raw spring length would be negative
        let (bodies, mut v) = car(0.3, Vec3::ZERO);
        let depth = v.ray_cast(0, &bodies, &flat_ground);
        assert_relative_eq!(depth, 0.3, epsilon = 1e-5);
        let w = v.wheel(0).unwrap();
        assert!(w.raycast_info.is_in_contact);
        assert_relative_eq!(w.raycast_info.suspension_length, 0.1, epsilon = 1e-5);
        assert_relative_eq!(w.clipped_inv_contact_dot_suspension, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn suspension_length_stays_inside_travel() {
        let tight = |v: &mut RaycastVehicle| {
            let w = v.wheel_mut(0).unwrap();
            w.suspension_rest_length = 0.5;
            w.max_suspension_travel_cm = 0.1;
        };
        let length = |v: &RaycastVehicle| v.wheel(0).unwrap().raycast_info.suspension_length;

        // bottomed out: raw length 0.6 - 0.4 = 0.2
        let (bodies, mut v) = car(0.6, Vec3::ZERO);
        tight(&mut v);
        v.ray_cast(0, &bodies, &flat_ground);
        assert_relative_eq!(length(&v), 0.499, epsilon = 1e-6);

        // a raycaster reporting a hit past the segment end would over-extend the spring
        let past_end = |from: Vec3, _to: Vec3| Some(VehicleRaycasterResult {
            hit_point: from - Vec3::Y * 1.08,
            hit_normal: Vec3::Y,
            dist_fraction: 1.2,
            body: GROUND,
        });
        v.ray_cast(0, &bodies, &past_end);
        assert_relative_eq!(length(&v), 0.501, epsilon = 1e-6);

        for i in 0..40 {
            let (bodies, mut v) = car(0.05 * i as f32, Vec3::ZERO);
            tight(&mut v);
            v.ray_cast(0, &bodies, &flat_ground);
            let len = length(&v);
            assert!((0.499 - 1e-6..=0.501 + 1e-6).contains(&len), "height {} gave {len}", 0.05 * i as f32);
        }
    }

    #[test]
    fn miss_rests_the_spring() {
        let (bodies, mut v) = car(5.0, Vec3::ZERO);
        assert_eq!(v.ray_cast(2, &bodies, &flat_ground), -1.0);
        let w = v.wheel(2).unwrap();
        assert!(!w.raycast_info.is_in_contact);
        assert_eq!(w.raycast_info.suspension_length, 0.6);
        assert_relative_eq!(w.raycast_info.contact_normal_ws.y, 1.0);
        assert_eq!(w.clipped_inv_contact_dot_suspension, 1.0);
    }

    #[test]
    fn grazing_normal_pins_clip_factor() {
        let (bodies, mut v) = car(0.8, vec3(0.0, -2.0, 0.0));
        let wall = |from: Vec3, _to: Vec3| Some(VehicleRaycasterResult {
            hit_point: from - Vec3::Y * 0.5,
            hit_normal: Vec3::X,
            dist_fraction: 0.5,
            body: GROUND,
        });
        v.ray_cast(0, &bodies, &wall);
        let w = v.wheel(0).unwrap();
        assert_eq!(w.clipped_inv_contact_dot_suspension, 10.0);
        assert_eq!(w.suspension_relative_velocity, 0.0);
    }

    #[test]
    fn compressed_spring_pushes_up() {
        let (mut bodies, mut v) = car(0.8, Vec3::ZERO);
        v.update_vehicle(1.0 / 60.0, &mut bodies, &flat_ground, 6000.0);
        for w in v.wheels() {
            assert!(w.raycast_info.is_in_contact);
            assert!(w.wheels_suspension_force > 0.0);
        }
        assert!(bodies.vel(v.chassis().0).lin.y > 0.0);
    }

    #[test]
    fn suspension_never_pulls() {
        let (_, mut v) = car(0.8, Vec3::ZERO);
        let w = v.wheel_mut(0).unwrap();
        w.raycast_info.is_in_contact = true;
        w.raycast_info.suspension_length = 0.9;
        w.suspension_relative_velocity = 3.0;
        v.update_suspension(800.0);
        assert_eq!(v.wheel(0).unwrap().wheels_suspension_force, 0.0);
    }

    #[test]
    fn friction_circle_limits_side_impulse() {
        let (mut bodies, mut v) = car(0.8, vec3(30.0, 0.0, 0.0));
        for i in 0..4 { v.set_friction_slip(0.01, i).unwrap(); }
        v.update_vehicle(1.0 / 60.0, &mut bodies, &flat_ground, 6000.0);
        for (i, w) in v.wheels().iter().enumerate() {
            assert!(w.skid_info < 1.0, "skid {}", w.skid_info);
            let x = v.forward_impulse[i] * FWD_FACTOR;
            let y = v.side_impulse[i] * SIDE_FACTOR;
            let max_imp = w.wheels_suspension_force / 60.0 * w.friction_slip;
            assert_relative_eq!((x * x + y * y).sqrt(), max_imp, epsilon = 1e-4);
        }
    }

    #[test]
    fn airborne_wheels_coast_and_decay() {
        let (mut bodies, mut v) = car(5.0, Vec3::ZERO);
        v.wheel_mut(0).unwrap().delta_rotation = 1.0;
        v.update_vehicle(1.0 / 60.0, &mut bodies, &no_ground, 6000.0);
        let w = v.wheel(0).unwrap();
        assert_relative_eq!(w.rotation, 1.0);
        assert_relative_eq!(w.delta_rotation, 0.99);
        assert_eq!(w.wheels_suspension_force, 0.0);
    }

    #[test]
    fn reversing_reports_negative_speed() {
        let (mut bodies, mut v) = car(5.0, vec3(0.0, 0.0, -10.0));
        v.update_vehicle(1.0 / 60.0, &mut bodies, &no_ground, 6000.0);
        assert_relative_eq!(v.current_speed_kmh(), -36.0, epsilon = 1e-3);
    }

    #[test]
    fn setters_reject_bad_wheel_index() {
        let (_, mut v) = car(1.0, Vec3::ZERO);
        assert!(matches!(
            v.apply_engine_force(100.0, 9),
            Err(PhysicsError::WheelOutOfRange { index: 9, count: 4, .. })
        ));
        v.set_steering_value(0.3, 1).unwrap();
        assert_eq!(v.wheel(1).unwrap().steering, 0.3);
    }

    #[test]
    fn wheel_transform_sits_at_spring_end() {
        let (mut bodies, mut v) = car(0.8, Vec3::ZERO);
        v.update_vehicle(1.0 / 60.0, &mut bodies, &flat_ground, 6000.0);
        let pose = bodies.pose(v.chassis().0);
        v.update_wheel_transform(0, &pose);
        let xf = v.wheel_transform(0).unwrap();
        let w = v.wheel(0).unwrap();
        assert_relative_eq!(xf.pos.y, pose.pos.y - w.raycast_info.suspension_length, epsilon = 1e-4);
    }
}
