use std::path::PathBuf;

use skidphys_collision::{CollisionDispatcher, DefaultDispatcher};
use skidphys_core::{PhysicsResult, WorldConfig};
use skidphys_solver::{ConstraintSolver, SequentialImpulseSolver};
use skidphys_viz::{DebugSettings, Ledger};

use crate::World;

/* ---------------- Builder ---------------- */
pub struct WorldBuilder {
    bodies: usize,
    config: WorldConfig,
    dispatcher: Option<Box<dyn CollisionDispatcher>>,
    solver: Option<Box<dyn ConstraintSolver>>,
    debug: DebugSettings,
    ledger_capacity: usize,
    ledger_dir: PathBuf,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            bodies: 128,
            config: WorldConfig::default(),
            dispatcher: None,
            solver: None,
            debug: DebugSettings::default(),
            ledger_capacity: 4096,
            ledger_dir: PathBuf::from("out"),
        }
    }

    pub fn with_capacity(mut self, bodies: usize) -> Self {
        self.bodies = bodies;
        self
    }

    pub fn with_config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default SAP + closed-form narrowphase dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: Box<dyn CollisionDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Replaces the sequential impulse solver seeded from the config.
    pub fn with_solver(mut self, solver: Box<dyn ConstraintSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn with_debug(mut self, debug: DebugSettings) -> Self {
        self.debug = debug;
        self
    }

    /// Ledger window size and the directory periodic JSONL dumps go to.
    pub fn with_ledger(mut self, capacity: usize, dir: impl Into<PathBuf>) -> Self {
        self.ledger_capacity = capacity;
        self.ledger_dir = dir.into();
        self
    }

    pub fn build(self) -> PhysicsResult<World> {
        self.config.validate()?;
        let solver: Box<dyn ConstraintSolver> = match self.solver {
            Some(s) => s,
            None => Box::new(SequentialImpulseSolver::new(self.config.seed)),
        };
        let dispatcher: Box<dyn CollisionDispatcher> = match self.dispatcher {
            Some(d) => d,
            None => Box::new(DefaultDispatcher::new()),
        };
        Ok(World::from_parts(
            self.config,
            self.bodies,
            dispatcher,
            solver,
            self.debug,
            Ledger::new(self.ledger_capacity),
            self.ledger_dir,
        ))
    }
}

impl Default for WorldBuilder {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skidphys_core::PhysicsError;

    #[test]
    fn build_validates_the_config() {
        let mut cfg = WorldConfig::default();
        cfg.fixed_time_step = 0.0;
        let err = WorldBuilder::new().with_config(cfg).build().err();
        assert!(matches!(err, Some(PhysicsError::InvalidConfig(_))));
    }

    #[test]
    fn default_world_is_empty() {
        let w = WorldBuilder::default().with_capacity(8).build().unwrap();
        assert_eq!(w.num_bodies(), 0);
        assert_eq!(w.tick_index(), 0);
        assert_eq!(w.gravity().y, -10.0);
    }
}
