//! Discrete dynamics world: owns the body arena, constraints and vehicles and
//! advances them with a fixed-rate substep pipeline.

mod builder;
mod pipeline;
mod query;

use std::collections::BTreeSet;
use std::path::PathBuf;

use skidphys_collision::{CollisionDispatcher, ContactManifold, ManifoldCache};
use skidphys_core::{hash_isometry, hash_vec3, StepClock, StepHasher};
use skidphys_geom::aabb_of;
use skidphys_islands::{Island, SimulationIslandManager};
use skidphys_solver::{ConstraintSolver, IslandSolverAdapter};
use skidphys_viz::ScheduleRecorder;

pub use builder::WorldBuilder;
pub use query::RayHit;

pub use skidphys_constraints::{ConstraintKind, Constraints, TypedConstraint};
pub use skidphys_core::{
    BodyId, ConstraintId, DeactivationConfig, Isometry, PhysicsError, PhysicsResult, SolverInfo,
    StepStats, VehicleId, Vec3, Velocity, WorldConfig,
};
pub use skidphys_dynamics::{ActivationState, Bodies, BodyKind, DefaultMotionState, MotionState, RigidBodyDesc};
pub use skidphys_collision::{ContactPoint, PairKey};
pub use skidphys_geom::{Aabb, Material, Shape};
pub use skidphys_vehicles::{RaycastVehicle, VehicleTuning, WheelInfo};
pub use skidphys_viz::{DebugDraw, DebugSettings, Ledger, LedgerEvent, LineCollector};

/* ---------------- World ---------------- */
pub struct World {
    config: WorldConfig,
    tick: u64,
    schedule: ScheduleRecorder,

    bodies: Bodies, // SoA
    shapes: Vec<Shape>,
    materials: Vec<Material>,
    aabbs: Vec<Aabb>,
    // pose each body reaches this substep before constraints
    predicted: Vec<Isometry>,
    motion_states: Vec<Option<Box<dyn MotionState>>>,

    // Systems
    constraints: Constraints,
    vehicles: Vec<Option<RaycastVehicle>>,
    dispatcher: Box<dyn CollisionDispatcher>,
    solver: Box<dyn ConstraintSolver>,
    islands: SimulationIslandManager,
    adapter: IslandSolverAdapter,
    clock: StepClock,
    alpha: f32,
    stats: StepStats,

    debug: DebugSettings,
    ledger: Ledger,
    ledger_dir: PathBuf,
    sleeping_tags: BTreeSet<u32>,
    aabb_overflow_reported: bool,
    broken: Vec<ConstraintId>,
}

impl World {
    /// World with default dispatcher and solver.
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        WorldBuilder::new().with_config(config).build()
    }

    pub(crate) fn from_parts(
        config: WorldConfig,
        bodies: usize,
        dispatcher: Box<dyn CollisionDispatcher>,
        solver: Box<dyn ConstraintSolver>,
        debug: DebugSettings,
        ledger: Ledger,
        ledger_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            tick: 0,
            schedule: ScheduleRecorder::new(),
            bodies: Bodies::with_capacity(bodies),
            shapes: Vec::with_capacity(bodies),
            materials: Vec::with_capacity(bodies),
            aabbs: Vec::with_capacity(bodies),
            predicted: Vec::with_capacity(bodies),
            motion_states: Vec::with_capacity(bodies),
            constraints: Constraints::new(),
            vehicles: Vec::new(),
            dispatcher,
            solver,
            islands: SimulationIslandManager::new(),
            adapter: IslandSolverAdapter::new(),
            clock: StepClock::new(),
            alpha: 1.0,
            stats: StepStats::default(),
            debug,
            ledger,
            ledger_dir,
            sleeping_tags: BTreeSet::new(),
            aabb_overflow_reported: false,
            broken: Vec::new(),
        }
    }

    // Read-only helpers for harnesses and debuggers.
    pub fn config(&self) -> &WorldConfig { &self.config }
    pub fn num_bodies(&self) -> u32 { self.bodies.len() as u32 }
    pub fn bodies(&self) -> &Bodies { &self.bodies }
    #[inline] pub fn tick_index(&self) -> u64 { self.tick }
    /// Counters of the last substep run.
    pub fn stats(&self) -> StepStats { self.stats }
    pub fn islands(&self) -> &[Island] { self.islands.islands() }
    pub fn manifolds(&self) -> &ManifoldCache { self.dispatcher.manifolds() }
    pub fn ledger(&self) -> &Ledger { &self.ledger }
    pub fn ledger_mut(&mut self) -> &mut Ledger { &mut self.ledger }
    pub fn debug_settings(&self) -> &DebugSettings { &self.debug }
    pub fn set_debug(&mut self, cfg: DebugSettings) { self.debug = cfg; }
    /// Fraction of a fixed step left over after the last `step_simulation`.
    pub fn interpolation_alpha(&self) -> f32 { self.alpha }

    fn body_index(&self, id: BodyId) -> PhysicsResult<u32> {
        if id.index() >= self.bodies.len() {
            return Err(PhysicsError::UnknownBody(id));
        }
        if self.bodies.is_removed(id.0) {
            return Err(PhysicsError::BodyRemoved(id));
        }
        Ok(id.0)
    }

    /* ---------- Bodies ---------- */
    /// Adds a body; it inherits the world gravity. Static and kinematic bodies
    /// start asleep.
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> PhysicsResult<BodyId> {
        if !desc.pose.is_finite() {
            return Err(PhysicsError::InvalidBody("pose must be finite"));
        }
        if !(desc.vel.lin.is_finite() && desc.vel.ang.is_finite()) {
            return Err(PhysicsError::InvalidBody("velocity must be finite"));
        }
        if desc.kind == BodyKind::Dynamic && !(desc.mass.mass.is_finite() && desc.mass.mass >= 0.0) {
            return Err(PhysicsError::InvalidBody("mass must be finite and non-negative"));
        }
        if !desc.shape.half_extents().is_finite() {
            return Err(PhysicsError::InvalidBody("shape extents must be finite"));
        }

        let id = self.bodies.add(&desc, self.config.gravity_vec());
        if self.bodies.is_static_or_kinematic(id) {
            self.bodies.set_activation_state(id, ActivationState::IslandSleeping);
        }
        self.shapes.push(desc.shape);
        self.materials.push(desc.material);
        self.aabbs.push(aabb_of(&desc.shape, &desc.pose));
        self.predicted.push(desc.pose);
        self.motion_states.push(None);
        log::trace!("added body {} ({:?})", id, self.bodies.kind(id));
        Ok(BodyId(id))
    }

    /// Tombstones a body. Its manifolds are dropped and its constraints
    /// disabled; a vehicle chassis must lose its vehicle first.
    pub fn remove_body(&mut self, id: BodyId) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        if let Some(v) = self.vehicles.iter().flatten().find(|v| v.chassis() == id) {
            return Err(PhysicsError::BodyInUse { body: id, vehicle: v.id() });
        }
        self.bodies.remove(i);
        self.dispatcher.remove_body(id);
        let disabled = self.constraints.disable_for_body(id);
        self.motion_states[i as usize] = None;
        log::debug!("removed {id}; {disabled} constraints disabled");
        Ok(())
    }

    pub fn body_kind(&self, id: BodyId) -> PhysicsResult<BodyKind> {
        Ok(self.bodies.kind(self.body_index(id)?))
    }
    pub fn shape(&self, id: BodyId) -> PhysicsResult<Shape> {
        Ok(self.shapes[self.body_index(id)? as usize])
    }
    pub fn material(&self, id: BodyId) -> PhysicsResult<Material> {
        Ok(self.materials[self.body_index(id)? as usize])
    }
    /// Bounds from the last AABB pass.
    pub fn aabb(&self, id: BodyId) -> PhysicsResult<Aabb> {
        Ok(self.aabbs[self.body_index(id)? as usize])
    }

    pub fn body_pose(&self, id: BodyId) -> PhysicsResult<Isometry> {
        Ok(self.bodies.pose(self.body_index(id)?))
    }

    /// Teleports a body and wakes it. The interpolation history is reset so
    /// the motion state does not blend across the jump.
    pub fn set_body_pose(&mut self, id: BodyId, pose: Isometry) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        if !pose.is_finite() {
            return Err(PhysicsError::InvalidBody("pose must be finite"));
        }
        self.bodies.set_pose(i, pose);
        self.bodies.store_prev_pose(i);
        self.aabbs[i as usize] = aabb_of(&self.shapes[i as usize], &pose);
        self.predicted[i as usize] = pose;
        self.bodies.activate(i, false);
        Ok(())
    }

    pub fn body_velocity(&self, id: BodyId) -> PhysicsResult<Velocity> {
        Ok(self.bodies.vel(self.body_index(id)?))
    }

    pub fn set_body_velocity(&mut self, id: BodyId, vel: Velocity) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        if !(vel.lin.is_finite() && vel.ang.is_finite()) {
            return Err(PhysicsError::InvalidBody("velocity must be finite"));
        }
        self.bodies.set_vel(i, vel);
        self.bodies.activate(i, false);
        Ok(())
    }

    /// Pose published to the motion state: previous and current committed
    /// poses blended by the leftover step fraction.
    pub fn interpolated_pose(&self, id: BodyId) -> PhysicsResult<Isometry> {
        let i = self.body_index(id)?;
        if !self.bodies.is_dynamic(i) {
            return Ok(self.bodies.pose(i));
        }
        Ok(self.bodies.prev_pose(i).interpolate(&self.bodies.pose(i), self.alpha))
    }

    /* ---------- Forces & impulses ---------- */
    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec3, rel_pos: Vec3) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.activate(i, false);
        self.bodies.apply_impulse(i, impulse, rel_pos);
        Ok(())
    }

    pub fn apply_central_impulse(&mut self, id: BodyId, impulse: Vec3) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.activate(i, false);
        self.bodies.apply_central_impulse(i, impulse);
        Ok(())
    }

    /// Forces accumulate until the end of the next `step_simulation` call.
    pub fn apply_force(&mut self, id: BodyId, force: Vec3, rel_pos: Vec3) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.activate(i, false);
        self.bodies.apply_force(i, force, rel_pos);
        Ok(())
    }

    pub fn apply_central_force(&mut self, id: BodyId, force: Vec3) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.activate(i, false);
        self.bodies.apply_central_force(i, force);
        Ok(())
    }

    pub fn apply_torque(&mut self, id: BodyId, torque: Vec3) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.activate(i, false);
        self.bodies.apply_torque(i, torque);
        Ok(())
    }

    pub fn set_body_damping(&mut self, id: BodyId, linear: f32, angular: f32) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.set_damping(i, linear, angular);
        Ok(())
    }

    pub fn set_angular_factor(&mut self, id: BodyId, factor: f32) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.set_angular_factor(i, factor);
        Ok(())
    }

    /* ---------- Activation ---------- */
    /// Wakes a body. Static and kinematic bodies need `force`.
    pub fn activate(&mut self, id: BodyId, force: bool) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.activate(i, force);
        Ok(())
    }

    pub fn activation_state(&self, id: BodyId) -> PhysicsResult<ActivationState> {
        Ok(self.bodies.activation_state(self.body_index(id)?))
    }

    /// Ignored while the body is pinned awake or quarantined.
    pub fn set_activation_state(&mut self, id: BodyId, state: ActivationState) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.set_activation_state(i, state);
        Ok(())
    }

    pub fn force_activation_state(&mut self, id: BodyId, state: ActivationState) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        self.bodies.force_activation_state(i, state);
        Ok(())
    }

    /* ---------- Motion states ---------- */
    /// Attaches a motion state. Dynamic bodies publish their interpolated pose
    /// into it; kinematic bodies are driven from it.
    pub fn set_motion_state(&mut self, id: BodyId, mut state: Box<dyn MotionState>) -> PhysicsResult<()> {
        let i = self.body_index(id)?;
        if self.bodies.is_dynamic(i) {
            state.set_world_transform(&self.bodies.pose(i));
        }
        self.motion_states[i as usize] = Some(state);
        Ok(())
    }

    pub fn take_motion_state(&mut self, id: BodyId) -> PhysicsResult<Option<Box<dyn MotionState>>> {
        let i = self.body_index(id)?;
        Ok(self.motion_states[i as usize].take())
    }

    pub fn motion_state(&self, id: BodyId) -> PhysicsResult<Option<&(dyn MotionState + 'static)>> {
        let i = self.body_index(id)?;
        Ok(self.motion_states[i as usize].as_deref())
    }

    pub fn motion_state_mut(&mut self, id: BodyId) -> PhysicsResult<Option<&mut (dyn MotionState + 'static)>> {
        let i = self.body_index(id)?;
        Ok(self.motion_states[i as usize].as_deref_mut())
    }

    /* ---------- Gravity & tuning ---------- */
    pub fn gravity(&self) -> Vec3 { self.config.gravity_vec() }

    /// New gravity for every dynamic body and for bodies added later.
    pub fn set_gravity(&mut self, g: Vec3) {
        self.config.gravity = [g.x, g.y, g.z];
        for id in 0..self.bodies.len() as u32 {
            self.bodies.set_gravity(id, g);
        }
    }

    pub fn set_num_iterations(&mut self, n: u32) { self.config.solver.num_iterations = n.max(1); }
    pub fn set_deactivation_time(&mut self, seconds: f32) { self.config.deactivation.deactivation_time = seconds.max(0.0); }
    pub fn set_deactivation_thresholds(&mut self, linear: f32, angular: f32) {
        self.config.deactivation.linear_threshold = linear.max(0.0);
        self.config.deactivation.angular_threshold = angular.max(0.0);
    }
    pub fn set_contact_breaking_threshold(&mut self, threshold: f32) {
        self.config.contact_breaking_threshold = threshold.max(0.0);
    }
    /// Keeps every body awake while set.
    pub fn set_disable_deactivation(&mut self, disable: bool) { self.config.deactivation.disable_deactivation = disable; }
    pub fn set_split_impulse(&mut self, enabled: bool) { self.config.solver.split_impulse = enabled; }
    pub fn solver_info(&self) -> &SolverInfo { &self.config.solver }

    pub fn set_solver_info(&mut self, info: SolverInfo) -> PhysicsResult<()> {
        let mut cfg = self.config.clone();
        cfg.solver = info;
        cfg.validate()?;
        self.config = cfg;
        Ok(())
    }

    /// Replaces the solver, e.g. with one seeded differently.
    pub fn set_constraint_solver(&mut self, solver: Box<dyn ConstraintSolver>) { self.solver = solver; }

    /* ---------- Constraints ---------- */
    pub fn add_constraint(
        &mut self,
        a: BodyId,
        b: BodyId,
        kind: ConstraintKind,
        disable_collisions_between_linked: bool,
    ) -> PhysicsResult<ConstraintId> {
        let ia = self.body_index(a)?;
        let ib = self.body_index(b)?;
        if a == b {
            return Err(PhysicsError::SelfConstraint(a));
        }
        let id = self.constraints.add(a, b, kind);
        if let Some(c) = self.constraints.get_mut(id) {
            c.disable_collisions_between_linked = disable_collisions_between_linked;
        }
        self.bodies.activate(ia, false);
        self.bodies.activate(ib, false);
        Ok(id)
    }

    pub fn constraint(&self, id: ConstraintId) -> PhysicsResult<&TypedConstraint> {
        self.constraints.get(id).ok_or(PhysicsError::UnknownConstraint(id))
    }

    pub fn constraints(&self) -> impl Iterator<Item = &TypedConstraint> { self.constraints.iter() }

    pub fn set_constraint_enabled(&mut self, id: ConstraintId, enabled: bool) -> PhysicsResult<()> {
        let c = self.constraints.get_mut(id).ok_or(PhysicsError::UnknownConstraint(id))?;
        c.enabled = enabled;
        let (a, b) = (c.body_a, c.body_b);
        for body in [a, b] {
            if !self.bodies.is_removed(body.0) { self.bodies.activate(body.0, false); }
        }
        Ok(())
    }

    /// The constraint disables itself once a row impulse reaches `threshold`.
    pub fn set_breaking_impulse_threshold(&mut self, id: ConstraintId, threshold: f32) -> PhysicsResult<()> {
        let c = self.constraints.get_mut(id).ok_or(PhysicsError::UnknownConstraint(id))?;
        c.breaking_impulse_threshold = threshold;
        Ok(())
    }

    /// Disables the constraint for good; ids are never reused.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> PhysicsResult<()> {
        self.set_constraint_enabled(id, false)
    }

    /* ---------- Vehicles ---------- */
    /// Wraps a dynamic chassis body in a raycast vehicle. The chassis is
    /// pinned awake.
    pub fn add_vehicle(&mut self, chassis: BodyId) -> PhysicsResult<VehicleId> {
        let i = self.body_index(chassis)?;
        if !self.bodies.is_dynamic(i) {
            return Err(PhysicsError::InvalidBody("vehicle chassis must be dynamic"));
        }
        if !self.bodies.is_simulated(i) {
            return Err(PhysicsError::InvalidBody("vehicle chassis is excluded from simulation"));
        }
        let id = VehicleId(self.vehicles.len() as u32);
        self.bodies.force_activation_state(i, ActivationState::DisableDeactivation);
        self.vehicles.push(Some(RaycastVehicle::new(id, chassis)));
        log::debug!("added {id} on chassis {chassis}");
        Ok(id)
    }

    /// Detaches the vehicle; the chassis stays as a plain body.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> PhysicsResult<RaycastVehicle> {
        let v = self
            .vehicles
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(PhysicsError::UnknownVehicle(id))?;
        let chassis = v.chassis().0;
        if self.bodies.is_simulated(chassis) {
            self.bodies.force_activation_state(chassis, ActivationState::Active);
        }
        Ok(v)
    }

    pub fn vehicle(&self, id: VehicleId) -> PhysicsResult<&RaycastVehicle> {
        self.vehicles
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(PhysicsError::UnknownVehicle(id))
    }

    /// Mutable vehicle access; wakes the chassis.
    pub fn vehicle_mut(&mut self, id: VehicleId) -> PhysicsResult<&mut RaycastVehicle> {
        let v = self
            .vehicles
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownVehicle(id))?;
        self.bodies.activate(v.chassis().0, false);
        Ok(v)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &RaycastVehicle> { self.vehicles.iter().flatten() }

    /// Adds a wheel in chassis space and places it for rendering right away.
    /// The radius must be positive and the rest length non-negative.
    #[allow(clippy::too_many_arguments)]
    pub fn add_wheel(
        &mut self,
        vehicle: VehicleId,
        connection_point_cs: Vec3,
        wheel_direction_cs: Vec3,
        wheel_axle_cs: Vec3,
        suspension_rest_length: f32,
        wheel_radius: f32,
        tuning: &VehicleTuning,
        is_front_wheel: bool,
    ) -> PhysicsResult<usize> {
        if !(wheel_radius.is_finite() && wheel_radius > 0.0) {
            return Err(PhysicsError::InvalidParameter("wheel radius must be finite and positive"));
        }
        if !(suspension_rest_length.is_finite() && suspension_rest_length >= 0.0) {
            return Err(PhysicsError::InvalidParameter("suspension rest length must be finite and non-negative"));
        }
        if !(connection_point_cs.is_finite() && wheel_direction_cs.is_finite() && wheel_axle_cs.is_finite()) {
            return Err(PhysicsError::InvalidParameter("wheel frame must be finite"));
        }
        let v = self
            .vehicles
            .get_mut(vehicle.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PhysicsError::UnknownVehicle(vehicle))?;
        let index = v.add_wheel(
            connection_point_cs,
            wheel_direction_cs,
            wheel_axle_cs,
            suspension_rest_length,
            wheel_radius,
            tuning,
            is_front_wheel,
        );
        let chassis_pose = self.bodies.pose(v.chassis().0);
        v.update_wheel_transform(index, &chassis_pose);
        Ok(index)
    }

    pub fn set_steering_value(&mut self, vehicle: VehicleId, steering: f32, wheel: usize) -> PhysicsResult<()> {
        self.vehicle_mut(vehicle)?.set_steering_value(steering, wheel)
    }

    pub fn apply_engine_force(&mut self, vehicle: VehicleId, force: f32, wheel: usize) -> PhysicsResult<()> {
        self.vehicle_mut(vehicle)?.apply_engine_force(force, wheel)
    }

    pub fn set_brake(&mut self, vehicle: VehicleId, brake: f32, wheel: usize) -> PhysicsResult<()> {
        self.vehicle_mut(vehicle)?.set_brake(brake, wheel)
    }

    pub fn wheel_transform(&self, vehicle: VehicleId, wheel: usize) -> PhysicsResult<Isometry> {
        self.vehicle(vehicle)?.wheel_transform(wheel)
    }

    /* ---------- Contacts ---------- */
    pub fn manifold(&self, a: BodyId, b: BodyId) -> Option<&ContactManifold> {
        self.dispatcher.manifolds().get(a, b)
    }

    /// The pair has a contact point within the breaking threshold.
    pub fn touching(&self, a: BodyId, b: BodyId) -> bool {
        self.manifold(a, b)
            .is_some_and(|m| m.min_distance() < self.config.contact_breaking_threshold)
    }

    /* ---------- Hash ---------- */
    pub fn step_hash(&self) -> [u8; 32] {
        let mut h = StepHasher::new();
        h.update_u64(self.tick);
        h.update_bytes(&self.schedule.digest());
        for i in self.bodies.indices() {
            let vel = self.bodies.vel(i);
            h.update_u32(i);
            hash_isometry(&mut h, &self.bodies.pose(i));
            hash_vec3(&mut h, &vel.lin);
            hash_vec3(&mut h, &vel.ang);
            h.update_bytes(&[self.bodies.activation_state(i) as u8]);
        }
        h.finalize()
    }
}
