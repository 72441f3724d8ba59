use std::collections::BTreeSet;

use skidphys_collision::{CollisionObject, DispatchSettings};
use skidphys_core::{BodyId, ConstraintId, StepStage, StepStats, Vec3, Velocity};
use skidphys_dynamics::{calculate_velocity, ActivationState, BodyKind};
use skidphys_geom::aabb_of;
use skidphys_vehicles::VehicleRaycasterResult;
use skidphys_viz::LedgerEvent;

use crate::query::RayScene;
use crate::World;

impl World {
    /// Advances the world with the configured fixed step and substep cap and
    /// returns the counters of the last substep.
    pub fn step(&mut self, dt: f32) -> StepStats {
        let (max_substeps, fixed) = (self.config.max_substeps, self.config.fixed_time_step);
        self.step_simulation(dt, max_substeps, fixed);
        self.stats
    }

    /// Accumulates `dt` and runs as many fixed substeps as fit, at most
    /// `max_substeps`. A zero `max_substeps` runs one variable step of `dt`.
    /// Returns the number of substeps performed.
    pub fn step_simulation(&mut self, dt: f32, max_substeps: u32, fixed_dt: f32) -> u32 {
        self.schedule.clear();
        self.tick = self.tick.wrapping_add(1);

        let plan = self.clock.plan(dt, max_substeps, fixed_dt);
        self.alpha = plan.alpha;
        if plan.substeps > 0 {
            if plan.requested > plan.substeps {
                log::debug!(
                    "tick {}: dropping {} of {} substeps",
                    self.tick, plan.requested - plan.substeps, plan.requested
                );
            }
            self.ledger.push(LedgerEvent::Substeps {
                requested: plan.requested,
                taken: plan.substeps,
                step_dt: plan.step_dt,
            });

            self.save_kinematic_state(plan.step_dt * plan.substeps as f32);
            self.apply_gravity();
            for _ in 0..plan.substeps {
                self.internal_single_step_simulation(plan.step_dt);
            }
        }

        self.synchronize_motion_states();
        self.clear_forces();

        if self.debug.json_every != 0 && self.tick % u64::from(self.debug.json_every) == 0 {
            if let Err(e) = self.ledger.write_jsonl(&self.ledger_dir, self.tick) {
                log::warn!("ledger dump to {} failed: {e}", self.ledger_dir.display());
            }
        }
        plan.substeps
    }

    fn internal_single_step_simulation(&mut self, dt: f32) {
        self.stats = StepStats::default();
        self.update_aabbs();
        self.predict_unconstraint_motion(dt);
        self.perform_discrete_collision_detection();
        self.calculate_simulation_islands();
        self.solve_constraints(dt);
        self.integrate_transforms(dt);
        self.update_vehicles(dt);
        self.update_activation_state(dt);
    }

    /* ---------- Kinematic drive ---------- */
    /// Moves kinematic bodies to their motion-state pose and derives the
    /// velocity that contacts see for the coming substeps.
    fn save_kinematic_state(&mut self, time: f32) {
        self.schedule.push(StepStage::SaveKinematicState);
        if time <= 0.0 { return; }
        for id in 0..self.bodies.len() as u32 {
            if !self.bodies.is_kinematic(id) || !self.bodies.is_simulated(id) { continue; }
            let Some(ms) = self.motion_states[id as usize].as_ref() else { continue };
            let target = ms.get_world_transform();
            if !target.is_finite() { continue; }

            let (lin, ang) = calculate_velocity(&self.bodies.pose(id), &target, time);
            self.bodies.set_vel(id, Velocity { lin, ang });
            self.bodies.store_prev_pose(id);
            self.bodies.set_pose(id, target);
            self.aabbs[id as usize] = aabb_of(&self.shapes[id as usize], &target);
            if lin != Vec3::ZERO || ang != Vec3::ZERO {
                self.bodies.activate(id, true);
            }
        }
    }

    fn apply_gravity(&mut self) {
        for id in 0..self.bodies.len() as u32 {
            if self.bodies.is_dynamic(id) && self.bodies.is_simulated(id) {
                self.bodies.apply_forces(id);
            }
        }
    }

    fn clear_forces(&mut self) {
        for id in 0..self.bodies.len() as u32 {
            self.bodies.clear_forces(id);
        }
    }

    /* ---------- Stages ---------- */
    fn update_aabbs(&mut self) {
        self.schedule.push(StepStage::UpdateAabbs);
        let limit = self.config.aabb_sanity_limit_sq;
        for id in 0..self.bodies.len() as u32 {
            let i = id as usize;
            if self.bodies.kind(id) == BodyKind::Static || !self.bodies.is_simulated(id) { continue; }
            let aabb = aabb_of(&self.shapes[i], &self.bodies.pose(id));
            let extent_sq = aabb.extent().length_squared();
            if self.bodies.is_kinematic(id) || (aabb.is_finite() && extent_sq < limit) {
                self.aabbs[i] = aabb;
                continue;
            }

            self.bodies.force_activation_state(id, ActivationState::DisableSimulation);
            self.ledger.push(LedgerEvent::Quarantined { body: id, extent_sq });
            if !self.aabb_overflow_reported {
                self.aabb_overflow_reported = true;
                log::warn!(
                    "body {id} left the world bounds (aabb extent^2 {extent_sq}); \
                     it is excluded from simulation. Further overflows are logged at debug level"
                );
            } else {
                log::debug!("body {id} quarantined (aabb extent^2 {extent_sq})");
            }
        }
    }

    fn predict_unconstraint_motion(&mut self, dt: f32) {
        self.schedule.push(StepStage::PredictMotion);
        for id in 0..self.bodies.len() as u32 {
            let i = id as usize;
            if self.bodies.is_dynamic(id) && self.bodies.is_simulated(id) && self.bodies.is_active(id) {
                self.bodies.integrate_velocities(id, dt);
                self.bodies.apply_damping(id, dt);
                self.predicted[i] = self.bodies.predict_integrated_transform(id, dt);
            } else {
                self.predicted[i] = self.bodies.pose(id);
            }
        }
    }

    fn perform_discrete_collision_detection(&mut self) {
        self.schedule.push(StepStage::CollisionDetection);
        let objects: Vec<CollisionObject> = (0..self.bodies.len() as u32)
            .map(|id| {
                let i = id as usize;
                let pose = self.bodies.pose(id);
                let kind = self.bodies.kind(id);
                let predicted = self.predicted[i];
                let moving = kind != BodyKind::Static && predicted != pose;
                let aabb = if moving {
                    self.aabbs[i].merged(&aabb_of(&self.shapes[i], &predicted))
                } else {
                    self.aabbs[i]
                };
                CollisionObject {
                    body: BodyId(id),
                    shape: self.shapes[i],
                    pose,
                    aabb,
                    material: self.materials[i],
                    static_or_kinematic: kind != BodyKind::Dynamic,
                    kinematic: kind == BodyKind::Kinematic,
                    active: kind != BodyKind::Static && self.bodies.is_active(id),
                    enabled: self.bodies.is_simulated(id),
                    speculative_margin: if moving { (predicted.pos - pose.pos).length() } else { 0.0 },
                }
            })
            .collect();

        let settings = DispatchSettings { contact_breaking_threshold: self.config.contact_breaking_threshold };
        let constraints = &self.constraints;
        let report = self.dispatcher.perform_discrete_collision_detection(
            &objects,
            &|a, b| !constraints.collision_disabled(a, b),
            &settings,
        );
        self.stats.pairs_tested = report.pairs_tested;
        self.stats.manifolds = report.manifolds;
        self.stats.contacts = report.contacts;
    }

    fn calculate_simulation_islands(&mut self) {
        self.schedule.push(StepStage::CalculateIslands);
        let links: Vec<(BodyId, BodyId)> = self.constraints.active().map(|c| (c.body_a, c.body_b)).collect();
        let islands = self
            .islands
            .calculate_simulation_islands(&mut self.bodies, self.dispatcher.manifolds(), &links);

        let mut asleep = BTreeSet::new();
        for island in islands.iter().filter(|i| i.sleeping) {
            asleep.insert(island.tag);
            if !self.sleeping_tags.contains(&island.tag) {
                self.ledger.push(LedgerEvent::IslandSleep { tag: island.tag, bodies: island.bodies.len() as u32 });
                log::trace!("island {} ({} bodies) fell asleep", island.tag, island.bodies.len());
            }
        }
        self.stats.islands = islands.len() as u32;
        self.stats.sleeping_islands = asleep.len() as u32;
        self.sleeping_tags = asleep;
    }

    fn solve_constraints(&mut self, dt: f32) {
        self.schedule.push(StepStage::SolveConstraints);
        let mut info = self.config.solver;
        info.time_step = dt;

        let was_enabled: Vec<bool> = self.constraints.iter().map(|c| c.enabled).collect();
        let report = self.adapter.solve_islands(
            self.solver.as_mut(),
            &mut self.bodies,
            self.islands.islands(),
            self.dispatcher.manifolds_mut(),
            self.constraints.as_mut_slice(),
            &info,
        );

        for (c, was) in self.constraints.iter().zip(was_enabled) {
            if was && !c.enabled {
                self.broken.push(c.id);
                self.ledger.push(LedgerEvent::ConstraintBroken { constraint: c.id.0, impulse: c.applied_impulse });
                log::debug!("{} broke at impulse {:.3}", c.id, c.applied_impulse);
            }
        }
        let awake = self.islands.islands().iter().filter(|i| !i.sleeping).count() as u32;
        self.ledger.push(LedgerEvent::Solve { islands: awake, rows: report.rows });
        self.stats.constraint_rows = report.rows;
    }

    fn integrate_transforms(&mut self, dt: f32) {
        self.schedule.push(StepStage::IntegrateTransforms);
        for id in 0..self.bodies.len() as u32 {
            if !self.bodies.is_dynamic(id) || !self.bodies.is_simulated(id) { continue; }
            self.bodies.store_prev_pose(id);
            if !self.bodies.is_active(id) { continue; }
            self.bodies.apply_push_velocity(id, dt);
            let next = self.bodies.predict_integrated_transform(id, dt);
            self.bodies.proceed_to_transform(id, next);
        }
    }

    fn update_vehicles(&mut self, dt: f32) {
        self.schedule.push(StepStage::UpdateVehicles);
        if self.vehicles.iter().all(Option::is_none) { return; }

        let scene = RayScene::capture(&self.bodies, &self.shapes, &self.aabbs);
        let max_force = self.config.max_suspension_force;
        for vehicle in self.vehicles.iter_mut().flatten() {
            let chassis = vehicle.chassis();
            if !self.bodies.is_simulated(chassis.0) || !self.bodies.is_active(chassis.0) { continue; }

            let ray = |from: Vec3, to: Vec3| {
                scene.closest(from, to, Some(chassis)).map(|hit| VehicleRaycasterResult {
                    hit_point: hit.point,
                    hit_normal: hit.normal,
                    dist_fraction: hit.fraction,
                    body: hit.body,
                })
            };
            vehicle.update_vehicle(dt, &mut self.bodies, &ray, max_force);

            for (i, w) in vehicle.wheels().iter().enumerate() {
                self.ledger.push(LedgerEvent::VehicleWheel {
                    vehicle: vehicle.id().0,
                    wheel: i as u32,
                    in_contact: w.raycast_info.is_in_contact,
                    suspension_force: w.wheels_suspension_force,
                    skid: w.skid_info,
                });
            }
        }
    }

    fn update_activation_state(&mut self, dt: f32) {
        self.schedule.push(StepStage::UpdateActivation);
        let cfg = self.config.deactivation;
        for id in 0..self.bodies.len() as u32 {
            if self.bodies.kind(id) == BodyKind::Static || !self.bodies.is_simulated(id) { continue; }
            self.bodies.update_deactivation(id, dt, &cfg);

            if self.bodies.wants_sleeping(id, &cfg) {
                if self.bodies.is_kinematic(id) {
                    self.bodies.set_activation_state(id, ActivationState::IslandSleeping);
                } else {
                    match self.bodies.activation_state(id) {
                        ActivationState::Active => {
                            self.bodies.set_activation_state(id, ActivationState::WantsDeactivation);
                        }
                        ActivationState::IslandSleeping => {
                            self.bodies.set_vel(id, Velocity::default());
                        }
                        _ => {}
                    }
                }
            } else if self.bodies.activation_state(id) != ActivationState::DisableDeactivation {
                self.bodies.set_activation_state(id, ActivationState::Active);
            }
        }
    }

    /* ---------- Output ---------- */
    /// Publishes interpolated poses to every motion state on a dynamic body
    /// and re-places wheels on the interpolated chassis.
    fn synchronize_motion_states(&mut self) {
        self.schedule.push(StepStage::SyncMotionStates);
        for id in 0..self.bodies.len() as u32 {
            if !self.bodies.is_dynamic(id) || !self.bodies.is_simulated(id) { continue; }
            let Some(ms) = self.motion_states[id as usize].as_mut() else { continue };
            let xf = self.bodies.prev_pose(id).interpolate(&self.bodies.pose(id), self.alpha);
            ms.set_world_transform(&xf);
        }

        for vehicle in self.vehicles.iter_mut().flatten() {
            let c = vehicle.chassis().0;
            let pose = if self.bodies.is_dynamic(c) {
                self.bodies.prev_pose(c).interpolate(&self.bodies.pose(c), self.alpha)
            } else {
                self.bodies.pose(c)
            };
            for i in 0..vehicle.num_wheels() {
                vehicle.update_wheel_transform(i, &pose);
            }
        }
    }

    /// Constraints the solver disabled for exceeding their breaking
    /// threshold, in the order they broke, since the world was built.
    pub fn broken_constraints(&self) -> &[ConstraintId] { &self.broken }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RigidBodyDesc, Shape, WorldBuilder};
    use skidphys_core::{vec3, Isometry};

    #[test]
    fn schedule_records_every_stage_once_per_substep() {
        let mut w = WorldBuilder::new().build().unwrap();
        w.add_body(RigidBodyDesc::dynamic(Shape::Sphere { r: 0.5 }, 1.0, Isometry::from_translation(vec3(0.0, 3.0, 0.0))))
            .unwrap();
        assert_eq!(w.step_simulation(2.0 / 60.0, 4, 1.0 / 60.0), 2);
        let stages = w.schedule.stages();
        assert_eq!(stages.first(), Some(&StepStage::SaveKinematicState));
        assert_eq!(stages.last(), Some(&StepStage::SyncMotionStates));
        assert_eq!(stages.iter().filter(|s| **s == StepStage::SolveConstraints).count(), 2);
        assert_eq!(stages.len(), 1 + 2 * 8 + 1);
    }

    #[test]
    fn zero_dt_only_syncs() {
        let mut w = WorldBuilder::new().build().unwrap();
        let b = w
            .add_body(RigidBodyDesc::dynamic(Shape::Sphere { r: 0.5 }, 1.0, Isometry::from_translation(Vec3::Y)))
            .unwrap();
        assert_eq!(w.step_simulation(0.0, 1, 1.0 / 60.0), 0);
        assert_eq!(w.schedule.stages(), &[StepStage::SyncMotionStates]);
        assert_eq!(w.body_pose(b).unwrap().pos, Vec3::Y);
    }

    #[test]
    fn forces_are_cleared_after_the_call() {
        let mut w = WorldBuilder::new().build().unwrap();
        let b = w
            .add_body(RigidBodyDesc::dynamic(Shape::Sphere { r: 0.5 }, 1.0, Isometry::IDENTITY))
            .unwrap();
        w.apply_central_force(b, vec3(60.0, 0.0, 0.0)).unwrap();
        w.step(1.0 / 60.0);
        assert!(w.body_velocity(b).unwrap().lin.x > 0.99);
        assert_eq!(w.bodies().total_force(b.0), Vec3::ZERO);
        let vx = w.body_velocity(b).unwrap().lin.x;
        w.step(1.0 / 60.0);
        assert!((w.body_velocity(b).unwrap().lin.x - vx).abs() < 1e-6);
    }
}
