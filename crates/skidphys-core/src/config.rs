use serde::{Deserialize, Serialize};
use crate::{PhysicsError, Vec3};

/// Solver tuning shared by every island solve in a step.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverInfo {
    /// Overwritten with the substep length before each solve.
    pub time_step: f32,
    pub num_iterations: u32,
    /// Fraction of positional error corrected per step.
    pub erp: f32,
    /// Successive over-relaxation factor folded into each row's effective mass.
    pub sor: f32,
    /// Multiplier on every velocity after solving.
    pub damping: f32,
    pub split_impulse: bool,
    pub split_impulse_penetration_threshold: f32,
    pub warm_starting: bool,
    pub warm_starting_factor: f32,
    pub restitution_velocity_threshold: f32,
    /// Penetration tolerated before positional correction starts.
    pub linear_slop: f32,
    pub randomize_order: bool,
}

impl Default for SolverInfo {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            num_iterations: 10,
            erp: 0.2,
            sor: 1.0,
            damping: 1.0,
            split_impulse: false,
            split_impulse_penetration_threshold: -0.02,
            warm_starting: true,
            warm_starting_factor: 0.85,
            restitution_velocity_threshold: 0.2,
            linear_slop: 0.0,
            randomize_order: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeactivationConfig {
    pub linear_threshold: f32,
    pub angular_threshold: f32,
    /// Seconds below both thresholds before a body asks to sleep. Zero keeps bodies awake.
    pub deactivation_time: f32,
    pub disable_deactivation: bool,
}

impl Default for DeactivationConfig {
    fn default() -> Self {
        Self { linear_threshold: 0.8, angular_threshold: 1.0, deactivation_time: 2.0, disable_deactivation: false }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: [f32; 3],
    pub fixed_time_step: f32,
    pub max_substeps: u32,
    pub solver: SolverInfo,
    pub deactivation: DeactivationConfig,
    /// Contacts farther apart than this are dropped from manifolds.
    pub contact_breaking_threshold: f32,
    /// Squared AABB extent beyond which a body is quarantined.
    pub aabb_sanity_limit_sq: f32,
    pub max_suspension_force: f32,
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            fixed_time_step: 1.0 / 60.0,
            max_substeps: 1,
            solver: SolverInfo::default(),
            deactivation: DeactivationConfig::default(),
            contact_breaking_threshold: 0.02,
            aabb_sanity_limit_sq: 1e12,
            max_suspension_force: 6000.0,
            seed: 0x5eed,
        }
    }
}

impl WorldConfig {
    pub fn gravity_vec(&self) -> Vec3 { Vec3::from_array(self.gravity) }

    /// Parses a possibly partial JSON document; missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, PhysicsError> {
        let cfg: WorldConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PhysicsError> {
        let bad = |m: &str| Err(PhysicsError::InvalidConfig(m.to_string()));
        if !(self.fixed_time_step.is_finite() && self.fixed_time_step > 0.0) {
            return bad("fixed_time_step must be positive");
        }
        if self.solver.num_iterations == 0 {
            return bad("solver.num_iterations must be at least 1");
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return bad("gravity must be finite");
        }
        let d = &self.deactivation;
        if d.linear_threshold < 0.0 || d.angular_threshold < 0.0 || d.deactivation_time < 0.0 {
            return bad("deactivation thresholds must be non-negative");
        }
        if self.contact_breaking_threshold < 0.0 {
            return bad("contact_breaking_threshold must be non-negative");
        }
        if !(self.aabb_sanity_limit_sq > 0.0) {
            return bad("aabb_sanity_limit_sq must be positive");
        }
        if self.max_suspension_force < 0.0 {
            return bad("max_suspension_force must be non-negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = WorldConfig::from_json_str(r#"{ "max_substeps": 4, "solver": { "num_iterations": 20 } }"#).unwrap();
        assert_eq!(cfg.max_substeps, 4);
        assert_eq!(cfg.solver.num_iterations, 20);
        assert_eq!(cfg.solver.erp, 0.2);
        assert_eq!(cfg.deactivation.deactivation_time, 2.0);
        assert_eq!(cfg.gravity, [0.0, -10.0, 0.0]);
    }

    #[test]
    fn rejects_zero_iterations() {
        let err = WorldConfig::from_json_str(r#"{ "solver": { "num_iterations": 0 } }"#).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_bad_step_and_garbage() {
        assert!(WorldConfig::from_json_str(r#"{ "fixed_time_step": 0.0 }"#).is_err());
        assert!(matches!(WorldConfig::from_json_str("not json"), Err(PhysicsError::Json(_))));
    }
}
