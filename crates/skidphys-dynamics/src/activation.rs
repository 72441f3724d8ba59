use serde::{Deserialize, Serialize};
use skidphys_core::DeactivationConfig;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationState {
    Active = 1,
    IslandSleeping = 2,
    WantsDeactivation = 3,
    /// Pinned awake.
    DisableDeactivation = 4,
    /// Excluded from simulation, e.g. after a numerical blow-up.
    DisableSimulation = 5,
}

impl ActivationState {
    /// Bodies the pipeline integrates and solves.
    #[inline] pub fn is_active(self) -> bool {
        !matches!(self, ActivationState::IslandSleeping | ActivationState::DisableSimulation)
    }
    /// States plain `set` calls cannot leave.
    #[inline] pub fn is_locked(self) -> bool {
        matches!(self, ActivationState::DisableDeactivation | ActivationState::DisableSimulation)
    }
}

/// Per-body sleep bookkeeping.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Activation {
    pub state: ActivationState,
    /// Seconds spent below both sleep thresholds.
    pub deactivation_time: f32,
}

impl Default for Activation {
    fn default() -> Self { Self { state: ActivationState::Active, deactivation_time: 0.0 } }
}

impl Activation {
    /// Changes state unless pinned or quarantined.
    pub fn set(&mut self, s: ActivationState) {
        if !self.state.is_locked() { self.state = s; }
    }

    pub fn force(&mut self, s: ActivationState) { self.state = s; }

    pub fn wake(&mut self) {
        self.set(ActivationState::Active);
        self.deactivation_time = 0.0;
    }

    /// Advances the low-speed timer from squared speeds.
    pub fn update_deactivation(&mut self, lin_sq: f32, ang_sq: f32, cfg: &DeactivationConfig, dt: f32) {
        if matches!(self.state, ActivationState::IslandSleeping | ActivationState::DisableDeactivation) {
            return;
        }
        let lt = cfg.linear_threshold;
        let at = cfg.angular_threshold;
        if lin_sq < lt * lt && ang_sq < at * at {
            self.deactivation_time += dt;
        } else {
            self.deactivation_time = 0.0;
            self.set(ActivationState::Active);
        }
    }

    pub fn wants_sleeping(&self, cfg: &DeactivationConfig) -> bool {
        if self.state == ActivationState::DisableDeactivation { return false; }
        if cfg.disable_deactivation || cfg.deactivation_time == 0.0 { return false; }
        if matches!(self.state, ActivationState::IslandSleeping | ActivationState::WantsDeactivation) {
            return true;
        }
        self.deactivation_time > cfg.deactivation_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DeactivationConfig { DeactivationConfig::default() }

    #[test]
    fn slow_body_eventually_wants_sleep() {
        let mut a = Activation::default();
        for _ in 0..119 { a.update_deactivation(0.01, 0.0, &cfg(), 1.0 / 60.0); }
        assert!(!a.wants_sleeping(&cfg()));
        for _ in 0..3 { a.update_deactivation(0.01, 0.0, &cfg(), 1.0 / 60.0); }
        assert!(a.wants_sleeping(&cfg()));
    }

    #[test]
    fn speed_spike_resets_timer() {
        let mut a = Activation { state: ActivationState::WantsDeactivation, deactivation_time: 5.0 };
        a.update_deactivation(4.0, 0.0, &cfg(), 1.0 / 60.0);
        assert_eq!(a.state, ActivationState::Active);
        assert_eq!(a.deactivation_time, 0.0);
    }

    #[test]
    fn pinned_and_quarantined_states_hold() {
        let mut a = Activation { state: ActivationState::DisableDeactivation, deactivation_time: 0.0 };
        a.update_deactivation(0.0, 0.0, &cfg(), 10.0);
        assert!(!a.wants_sleeping(&cfg()));
        a.set(ActivationState::IslandSleeping);
        assert_eq!(a.state, ActivationState::DisableDeactivation);

        let mut q = Activation { state: ActivationState::DisableSimulation, deactivation_time: 0.0 };
        q.update_deactivation(100.0, 0.0, &cfg(), 1.0);
        assert_eq!(q.state, ActivationState::DisableSimulation);
        q.force(ActivationState::Active);
        assert_eq!(q.state, ActivationState::Active);
    }

    #[test]
    fn global_toggle_and_zero_time_keep_awake() {
        let a = Activation { state: ActivationState::WantsDeactivation, deactivation_time: 9.0 };
        let mut c = cfg();
        c.disable_deactivation = true;
        assert!(!a.wants_sleeping(&c));
        let mut c = cfg();
        c.deactivation_time = 0.0;
        assert!(!a.wants_sleeping(&c));
    }
}
