pub mod activation;
pub mod motion_state;
pub mod transform_util;

use skidphys_core::types::{Isometry, Mat3, Velocity, Vec3};
use skidphys_core::{DeactivationConfig, Quat, Scalar};
use skidphys_geom::{MassProps, Material, Shape};

pub use activation::{Activation, ActivationState};
pub use motion_state::{DefaultMotionState, MotionState};
pub use transform_util::{calculate_velocity, integrate_transform, ANGULAR_MOTION_THRESHOLD};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Dynamic,
    /// Never moves.
    Static,
    /// Moved by its motion state; infinite mass toward everything else.
    Kinematic,
}

/// Input descriptor when creating a body.
#[derive(Copy, Clone, Debug)]
pub struct RigidBodyDesc {
    pub pose: Isometry,
    pub vel: Velocity,
    pub shape: Shape,
    pub mass: MassProps,
    pub kind: BodyKind,
    pub material: Material,
    pub linear_damping: Scalar,
    pub angular_damping: Scalar,
    pub angular_factor: Scalar,
}

impl RigidBodyDesc {
    /// Dynamic body with inertia computed from the shape.
    pub fn dynamic(shape: Shape, mass: Scalar, pose: Isometry) -> Self {
        Self {
            pose,
            vel: Velocity::default(),
            shape,
            mass: MassProps::from_shape(&shape, mass),
            kind: BodyKind::Dynamic,
            material: Material::default(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            angular_factor: 1.0,
        }
    }

    pub fn fixed(shape: Shape, pose: Isometry) -> Self {
        Self { mass: MassProps::infinite(), kind: BodyKind::Static, ..Self::dynamic(shape, 0.0, pose) }
    }

    pub fn kinematic(shape: Shape, pose: Isometry) -> Self {
        Self { kind: BodyKind::Kinematic, ..Self::fixed(shape, pose) }
    }

    pub fn with_velocity(mut self, vel: Velocity) -> Self { self.vel = vel; self }
    pub fn with_material(mut self, m: Material) -> Self { self.material = m; self }
    pub fn with_damping(mut self, lin: Scalar, ang: Scalar) -> Self {
        self.linear_damping = lin;
        self.angular_damping = ang;
        self
    }
    pub fn with_angular_factor(mut self, f: Scalar) -> Self { self.angular_factor = f; self }
}

/// SoA body storage with deterministic ID = index semantics.
pub struct Bodies {
    pos: Vec<Vec3>,
    rot: Vec<Quat>,
    prev: Vec<Isometry>,
    linvel: Vec<Vec3>,
    angvel: Vec<Vec3>,
    push_lin: Vec<Vec3>,
    push_ang: Vec<Vec3>,
    kind: Vec<BodyKind>,
    inv_mass: Vec<Scalar>,
    inv_inertia_local: Vec<Vec3>,
    inv_inertia_world: Vec<Mat3>,
    total_force: Vec<Vec3>,
    total_torque: Vec<Vec3>,
    gravity: Vec<Vec3>,
    lin_damping: Vec<Scalar>,
    ang_damping: Vec<Scalar>,
    angular_factor: Vec<Scalar>,
    activation: Vec<Activation>,
    island_tag: Vec<u32>,
    removed: Vec<bool>,
}

impl Bodies {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            pos: Vec::with_capacity(cap),
            rot: Vec::with_capacity(cap),
            prev: Vec::with_capacity(cap),
            linvel: Vec::with_capacity(cap),
            angvel: Vec::with_capacity(cap),
            push_lin: Vec::with_capacity(cap),
            push_ang: Vec::with_capacity(cap),
            kind: Vec::with_capacity(cap),
            inv_mass: Vec::with_capacity(cap),
            inv_inertia_local: Vec::with_capacity(cap),
            inv_inertia_world: Vec::with_capacity(cap),
            total_force: Vec::with_capacity(cap),
            total_torque: Vec::with_capacity(cap),
            gravity: Vec::with_capacity(cap),
            lin_damping: Vec::with_capacity(cap),
            ang_damping: Vec::with_capacity(cap),
            angular_factor: Vec::with_capacity(cap),
            activation: Vec::with_capacity(cap),
            island_tag: Vec::with_capacity(cap),
            removed: Vec::with_capacity(cap),
        }
    }

    /// Appends a body; static and kinematic bodies get zero inverse mass regardless of `desc.mass`.
    pub fn add(&mut self, desc: &RigidBodyDesc, gravity: Vec3) -> u32 {
        let id = self.pos.len() as u32;
        let dynamic = desc.kind == BodyKind::Dynamic && desc.mass.inv_mass > 0.0;
        let kind = if desc.kind == BodyKind::Dynamic && !dynamic { BodyKind::Static } else { desc.kind };
        let (inv_mass, inv_i) = if dynamic {
            (desc.mass.inv_mass, desc.mass.inv_inertia_local)
        } else {
            (0.0, Vec3::ZERO)
        };
        self.pos.push(desc.pose.pos);
        self.rot.push(desc.pose.rot.normalize());
        self.prev.push(desc.pose);
        let vel = if kind == BodyKind::Static { Velocity::default() } else { desc.vel };
        self.linvel.push(vel.lin);
        self.angvel.push(vel.ang);
        self.push_lin.push(Vec3::ZERO);
        self.push_ang.push(Vec3::ZERO);
        self.kind.push(kind);
        self.inv_mass.push(inv_mass);
        self.inv_inertia_local.push(inv_i);
        self.inv_inertia_world.push(Mat3::ZERO);
        self.total_force.push(Vec3::ZERO);
        self.total_torque.push(Vec3::ZERO);
        self.gravity.push(if dynamic { gravity } else { Vec3::ZERO });
        self.lin_damping.push(desc.linear_damping.clamp(0.0, 1.0));
        self.ang_damping.push(desc.angular_damping.clamp(0.0, 1.0));
        self.angular_factor.push(desc.angular_factor);
        self.activation.push(Activation::default());
        self.island_tag.push(id);
        self.removed.push(false);
        self.update_inertia_tensor(id);
        id
    }

    #[inline] pub fn len(&self) -> usize { self.pos.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.pos.is_empty() }

    pub fn indices(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        0..(self.len() as u32)
    }

    /* ---------- Kind / mass ---------- */
    #[inline] pub fn kind(&self, id: u32) -> BodyKind { self.kind[id as usize] }
    #[inline] pub fn is_static_or_kinematic(&self, id: u32) -> bool { self.kind[id as usize] != BodyKind::Dynamic }
    #[inline] pub fn is_kinematic(&self, id: u32) -> bool { self.kind[id as usize] == BodyKind::Kinematic }
    #[inline] pub fn is_dynamic(&self, id: u32) -> bool { self.kind[id as usize] == BodyKind::Dynamic }
    #[inline] pub fn inv_mass_of(&self, id: u32) -> Scalar { self.inv_mass[id as usize] }
    #[inline] pub fn mass_of(&self, id: u32) -> Scalar {
        let im = self.inv_mass[id as usize];
        if im > 0.0 { 1.0 / im } else { 0.0 }
    }
    #[inline] pub fn inv_inertia_world(&self, id: u32) -> Mat3 { self.inv_inertia_world[id as usize] }
    #[inline] pub fn inv_inertia_local(&self, id: u32) -> Vec3 { self.inv_inertia_local[id as usize] }

    /// World-space inverse inertia: R * I^-1_local * R^T.
    pub fn update_inertia_tensor(&mut self, id: u32) {
        let i = id as usize;
        if self.inv_mass[i] == 0.0 {
            self.inv_inertia_world[i] = Mat3::ZERO;
            return;
        }
        let r = Mat3::from_quat(self.rot[i]);
        self.inv_inertia_world[i] = r * Mat3::from_diagonal(self.inv_inertia_local[i].into()) * r.transpose();
    }

    /* ---------- Pose / velocity ---------- */
    #[inline] pub fn pose(&self, id: u32) -> Isometry {
        let i = id as usize;
        Isometry { pos: self.pos[i], rot: self.rot[i] }
    }
    pub fn set_pose(&mut self, id: u32, iso: Isometry) {
        let i = id as usize;
        self.pos[i] = iso.pos;
        self.rot[i] = iso.rot.normalize();
        self.update_inertia_tensor(id);
    }
    /// Pose at the start of the last committed substep.
    #[inline] pub fn prev_pose(&self, id: u32) -> Isometry { self.prev[id as usize] }
    #[inline] pub fn store_prev_pose(&mut self, id: u32) { self.prev[id as usize] = self.pose(id); }

    #[inline] pub fn vel(&self, id: u32) -> Velocity {
        let i = id as usize;
        Velocity { lin: self.linvel[i], ang: self.angvel[i] }
    }
    #[inline] pub fn set_vel(&mut self, id: u32, v: Velocity) {
        let i = id as usize;
        if self.kind[i] == BodyKind::Static { return; }
        self.linvel[i] = v.lin;
        self.angvel[i] = v.ang;
    }

    /// Velocity of a point at `rel_pos` from the body origin.
    #[inline] pub fn velocity_in_local_point(&self, id: u32, rel_pos: Vec3) -> Vec3 {
        let i = id as usize;
        self.linvel[i] + self.angvel[i].cross(rel_pos)
    }

    /// Effective inverse mass along `normal` at world point `pos`.
    pub fn impulse_denominator(&self, id: u32, pos: Vec3, normal: Vec3) -> Scalar {
        let i = id as usize;
        if self.inv_mass[i] == 0.0 { return 0.0; }
        let r = pos - self.pos[i];
        let c0 = r.cross(normal);
        let vec = (self.inv_inertia_world[i] * c0).cross(r);
        self.inv_mass[i] + normal.dot(vec)
    }

    /* ---------- Forces ---------- */
    #[inline] pub fn gravity(&self, id: u32) -> Vec3 { self.gravity[id as usize] }
    /// Only dynamic bodies store gravity.
    pub fn set_gravity(&mut self, id: u32, g: Vec3) {
        let i = id as usize;
        if self.inv_mass[i] > 0.0 { self.gravity[i] = g; }
    }

    /// Accumulates gravity into the total force of a dynamic body.
    pub fn apply_forces(&mut self, id: u32) {
        let i = id as usize;
        if self.inv_mass[i] == 0.0 { return; }
        self.total_force[i] += self.gravity[i] / self.inv_mass[i];
    }
    pub fn apply_central_force(&mut self, id: u32, f: Vec3) {
        self.total_force[id as usize] += f;
    }
    pub fn apply_torque(&mut self, id: u32, t: Vec3) {
        let i = id as usize;
        self.total_torque[i] += t * self.angular_factor[i];
    }
    pub fn apply_force(&mut self, id: u32, f: Vec3, rel_pos: Vec3) {
        self.apply_central_force(id, f);
        self.apply_torque(id, rel_pos.cross(f));
    }
    #[inline] pub fn total_force(&self, id: u32) -> Vec3 { self.total_force[id as usize] }
    pub fn clear_forces(&mut self, id: u32) {
        let i = id as usize;
        self.total_force[i] = Vec3::ZERO;
        self.total_torque[i] = Vec3::ZERO;
    }

    /* ---------- Integration ---------- */
    /// `v += dt * m^-1 * F`, `w += dt * I^-1 * T`, angular speed capped at a quarter turn per step.
    pub fn integrate_velocities(&mut self, id: u32, dt: Scalar) {
        let i = id as usize;
        if self.inv_mass[i] == 0.0 { return; }
        self.linvel[i] += self.total_force[i] * (self.inv_mass[i] * dt);
        self.angvel[i] += self.inv_inertia_world[i] * self.total_torque[i] * dt;
        let max_ang = core::f32::consts::FRAC_PI_2;
        let ang = self.angvel[i].length();
        if ang * dt > max_ang {
            self.angvel[i] *= (max_ang / dt) / ang;
        }
    }

    pub fn apply_damping(&mut self, id: u32, dt: Scalar) {
        let i = id as usize;
        if self.lin_damping[i] > 0.0 { self.linvel[i] *= (1.0 - self.lin_damping[i]).powf(dt); }
        if self.ang_damping[i] > 0.0 { self.angvel[i] *= (1.0 - self.ang_damping[i]).powf(dt); }
    }

    pub fn set_damping(&mut self, id: u32, lin: Scalar, ang: Scalar) {
        let i = id as usize;
        self.lin_damping[i] = lin.clamp(0.0, 1.0);
        self.ang_damping[i] = ang.clamp(0.0, 1.0);
    }
    #[inline] pub fn damping(&self, id: u32) -> (Scalar, Scalar) {
        (self.lin_damping[id as usize], self.ang_damping[id as usize])
    }

    /// Pose after `dt` at the current velocities; the body is not moved.
    pub fn predict_integrated_transform(&self, id: u32, dt: Scalar) -> Isometry {
        let i = id as usize;
        integrate_transform(&self.pose(id), self.linvel[i], self.angvel[i], dt)
    }

    /// Commits a predicted pose.
    pub fn proceed_to_transform(&mut self, id: u32, xf: Isometry) {
        self.set_pose(id, xf);
    }

    /* ---------- Impulses ---------- */
    pub fn apply_central_impulse(&mut self, id: u32, j: Vec3) {
        let i = id as usize;
        let im = self.inv_mass[i];
        if im != 0.0 { self.linvel[i] += j * im; }
    }
    pub fn apply_torque_impulse(&mut self, id: u32, t: Vec3) {
        let i = id as usize;
        if self.inv_mass[i] == 0.0 { return; }
        self.angvel[i] += self.inv_inertia_world[i] * t * self.angular_factor[i];
    }
    /// No-op for bodies with zero inverse mass.
    pub fn apply_impulse(&mut self, id: u32, j: Vec3, rel_pos: Vec3) {
        if self.inv_mass[id as usize] == 0.0 { return; }
        self.apply_central_impulse(id, j);
        self.apply_torque_impulse(id, rel_pos.cross(j));
    }

    #[inline] pub fn angular_factor(&self, id: u32) -> Scalar { self.angular_factor[id as usize] }
    pub fn set_angular_factor(&mut self, id: u32, f: Scalar) { self.angular_factor[id as usize] = f; }

    /* ---------- Split impulse ---------- */
    #[inline] pub fn push_velocity(&self, id: u32) -> Velocity {
        let i = id as usize;
        Velocity { lin: self.push_lin[i], ang: self.push_ang[i] }
    }
    pub fn set_push_velocity(&mut self, id: u32, v: Velocity) {
        let i = id as usize;
        self.push_lin[i] = v.lin;
        self.push_ang[i] = v.ang;
    }
    /// Moves the committed pose by the pending push velocity and clears it.
    pub fn apply_push_velocity(&mut self, id: u32, dt: Scalar) {
        let i = id as usize;
        let (pl, pa) = (self.push_lin[i], self.push_ang[i]);
        if pl == Vec3::ZERO && pa == Vec3::ZERO { return; }
        let moved = integrate_transform(&self.pose(id), pl, pa, dt);
        self.set_pose(id, moved);
        self.push_lin[i] = Vec3::ZERO;
        self.push_ang[i] = Vec3::ZERO;
    }

    /* ---------- Activation ---------- */
    #[inline] pub fn activation(&self, id: u32) -> Activation { self.activation[id as usize] }
    #[inline] pub fn activation_state(&self, id: u32) -> ActivationState { self.activation[id as usize].state }
    #[inline] pub fn is_active(&self, id: u32) -> bool { self.activation[id as usize].state.is_active() }
    pub fn set_activation_state(&mut self, id: u32, s: ActivationState) { self.activation[id as usize].set(s); }
    pub fn force_activation_state(&mut self, id: u32, s: ActivationState) { self.activation[id as usize].force(s); }
    pub fn set_deactivation_time(&mut self, id: u32, t: Scalar) { self.activation[id as usize].deactivation_time = t; }

    /// Wakes a body. Static and kinematic bodies need `force`.
    pub fn activate(&mut self, id: u32, force: bool) {
        if force || self.is_dynamic(id) {
            self.activation[id as usize].wake();
        }
    }

    pub fn update_deactivation(&mut self, id: u32, dt: Scalar, cfg: &DeactivationConfig) {
        let i = id as usize;
        let (l2, a2) = (self.linvel[i].length_squared(), self.angvel[i].length_squared());
        self.activation[i].update_deactivation(l2, a2, cfg, dt);
    }

    pub fn wants_sleeping(&self, id: u32, cfg: &DeactivationConfig) -> bool {
        self.activation[id as usize].wants_sleeping(cfg)
    }

    /* ---------- Bookkeeping ---------- */
    #[inline] pub fn island_tag(&self, id: u32) -> u32 { self.island_tag[id as usize] }
    #[inline] pub fn set_island_tag(&mut self, id: u32, tag: u32) { self.island_tag[id as usize] = tag; }

    #[inline] pub fn is_removed(&self, id: u32) -> bool { self.removed[id as usize] }
    /// Tombstones a body; its slot is never reused.
    pub fn remove(&mut self, id: u32) {
        let i = id as usize;
        self.removed[i] = true;
        self.activation[i].force(ActivationState::DisableSimulation);
        self.linvel[i] = Vec3::ZERO;
        self.angvel[i] = Vec3::ZERO;
        self.total_force[i] = Vec3::ZERO;
        self.total_torque[i] = Vec3::ZERO;
    }

    /// Bodies the pipeline moves this substep.
    #[inline] pub fn is_simulated(&self, id: u32) -> bool {
        !self.removed[id as usize] && self.activation[id as usize].state != ActivationState::DisableSimulation
    }
}

impl Default for Bodies {
    fn default() -> Self { Self::with_capacity(0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skidphys_core::vec3;

    fn unit_box() -> Shape { Shape::Box { hx: 0.5, hy: 0.5, hz: 0.5 } }

    fn one_dynamic(b: &mut Bodies) -> u32 {
        b.add(&RigidBodyDesc::dynamic(unit_box(), 2.0, Isometry::IDENTITY), vec3(0.0, -10.0, 0.0))
    }

    #[test]
    fn static_body_ignores_impulses() {
        let mut b = Bodies::default();
        let s = b.add(&RigidBodyDesc::fixed(unit_box(), Isometry::IDENTITY), vec3(0.0, -10.0, 0.0));
        for j in [vec3(1.0, 0.0, 0.0), vec3(-5.0, 3.0, 2.0), vec3(0.0, 1e6, 0.0)] {
            b.apply_impulse(s, j, vec3(0.3, 0.1, 0.0));
            b.apply_central_impulse(s, j);
        }
        assert_eq!(b.vel(s), Velocity::default());
        assert_eq!(b.impulse_denominator(s, Vec3::ZERO, Vec3::Y), 0.0);
        assert_eq!(b.gravity(s), Vec3::ZERO);
    }

    #[test]
    fn zero_mass_dynamic_becomes_static() {
        let mut b = Bodies::default();
        let id = b.add(&RigidBodyDesc::dynamic(unit_box(), 0.0, Isometry::IDENTITY), Vec3::ZERO);
        assert_eq!(b.kind(id), BodyKind::Static);
    }

    #[test]
    fn gravity_integrates_into_velocity() {
        let mut b = Bodies::default();
        let id = one_dynamic(&mut b);
        b.apply_forces(id);
        b.integrate_velocities(id, 0.1);
        assert_relative_eq!(b.vel(id).lin.y, -1.0, epsilon = 1e-6);
        let next = b.predict_integrated_transform(id, 0.1);
        assert_relative_eq!(next.pos.y, -0.1, epsilon = 1e-6);
        // prediction leaves the body in place
        assert_eq!(b.pose(id).pos.y, 0.0);
        b.proceed_to_transform(id, next);
        assert_relative_eq!(b.pose(id).pos.y, -0.1, epsilon = 1e-6);
    }

    #[test]
    fn off_center_impulse_spins() {
        let mut b = Bodies::default();
        let id = one_dynamic(&mut b);
        b.apply_impulse(id, vec3(0.0, 1.0, 0.0), vec3(0.5, 0.0, 0.0));
        let v = b.vel(id);
        assert_relative_eq!(v.lin.y, 0.5, epsilon = 1e-6);
        assert!(v.ang.z > 0.0);
        b.set_angular_factor(id, 0.0);
        b.apply_impulse(id, vec3(0.0, 1.0, 0.0), vec3(0.5, 0.0, 0.0));
        assert_relative_eq!(b.vel(id).ang.z, v.ang.z, epsilon = 1e-6);
    }

    #[test]
    fn impulse_denominator_matches_mass_at_center() {
        let mut b = Bodies::default();
        let id = one_dynamic(&mut b);
        assert_relative_eq!(b.impulse_denominator(id, Vec3::ZERO, Vec3::Y), 0.5, epsilon = 1e-6);
        assert!(b.impulse_denominator(id, vec3(0.5, 0.0, 0.0), Vec3::Y) > 0.5);
    }

    #[test]
    fn damping_decays_velocity() {
        let mut b = Bodies::default();
        let id = one_dynamic(&mut b);
        b.set_vel(id, Velocity { lin: vec3(4.0, 0.0, 0.0), ang: Vec3::ZERO });
        b.set_damping(id, 0.5, 0.0);
        b.apply_damping(id, 1.0);
        assert_relative_eq!(b.vel(id).lin.x, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn removal_quarantines() {
        let mut b = Bodies::default();
        let id = one_dynamic(&mut b);
        b.remove(id);
        assert!(!b.is_simulated(id));
        assert_eq!(b.activation_state(id), ActivationState::DisableSimulation);
        b.activate(id, true);
        assert_eq!(b.activation_state(id), ActivationState::DisableSimulation);
    }
}
