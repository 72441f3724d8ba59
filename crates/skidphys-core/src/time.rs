/// Counters gathered during one substep.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    pub pairs_tested: u32,
    pub manifolds: u32,
    pub contacts: u32,
    pub islands: u32,
    pub sleeping_islands: u32,
    pub constraint_rows: u32,
}

/// How many fixed substeps one `step_simulation` call performs and where the
/// leftover time puts motion-state interpolation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SubstepPlan {
    /// Substeps to run, already clamped to the caller's maximum.
    pub substeps: u32,
    /// Substeps the accumulated time asked for before clamping.
    pub requested: u32,
    pub step_dt: f32,
    /// Fraction of a fixed step left in the accumulator, in [0, 1].
    pub alpha: f32,
}

/// Leftover-time accumulator for fixed-rate stepping.
#[derive(Copy, Clone, Debug, Default)]
pub struct StepClock {
    local_time: f32,
}

// Absorbs rounding when dt is an exact multiple of the fixed step.
const STEP_ROUNDING: f32 = 1e-4;

impl StepClock {
    pub fn new() -> Self { Self::default() }

    pub fn local_time(&self) -> f32 { self.local_time }

    pub fn reset(&mut self) { self.local_time = 0.0; }

    pub fn plan(&mut self, dt: f32, max_substeps: u32, fixed_dt: f32) -> SubstepPlan {
        if !dt.is_finite() || dt <= f32::EPSILON {
            let alpha = if max_substeps > 0 && fixed_dt > 0.0 { (self.local_time / fixed_dt).clamp(0.0, 1.0) } else { 1.0 };
            return SubstepPlan { substeps: 0, requested: 0, step_dt: fixed_dt, alpha };
        }

        if max_substeps == 0 || fixed_dt <= 0.0 {
            // variable step: one step of exactly dt
            self.local_time = 0.0;
            return SubstepPlan { substeps: 1, requested: 1, step_dt: dt, alpha: 1.0 };
        }

        self.local_time += dt;
        let mut requested = 0u32;
        if self.local_time >= fixed_dt * (1.0 - STEP_ROUNDING) {
            requested = (self.local_time / fixed_dt + STEP_ROUNDING).floor() as u32;
            self.local_time = (self.local_time - requested as f32 * fixed_dt).max(0.0);
        }
        let substeps = requested.min(max_substeps);
        SubstepPlan {
            substeps,
            requested,
            step_dt: fixed_dt,
            alpha: (self.local_time / fixed_dt).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clamps_to_max_substeps() {
        let mut c = StepClock::new();
        let fixed = 1.0 / 60.0;
        let p = c.plan(10.0 * fixed, 3, fixed);
        assert_eq!(p.substeps, 3);
        assert_eq!(p.requested, 10);
    }

    #[test]
    fn accumulates_partial_steps() {
        let mut c = StepClock::new();
        let fixed = 1.0 / 60.0;
        let p = c.plan(0.5 * fixed, 4, fixed);
        assert_eq!(p.substeps, 0);
        assert_relative_eq!(p.alpha, 0.5, epsilon = 1e-4);
        let p = c.plan(0.75 * fixed, 4, fixed);
        assert_eq!(p.substeps, 1);
        assert_relative_eq!(p.alpha, 0.25, epsilon = 1e-3);
    }

    #[test]
    fn exact_multiples_do_not_drift() {
        let mut c = StepClock::new();
        let fixed = 1.0 / 60.0;
        for _ in 0..600 {
            assert_eq!(c.plan(fixed, 1, fixed).substeps, 1);
        }
    }

    #[test]
    fn variable_mode_runs_one_step() {
        let mut c = StepClock::new();
        let p = c.plan(0.033, 0, 1.0 / 60.0);
        assert_eq!(p.substeps, 1);
        assert_relative_eq!(p.step_dt, 0.033);
    }

    #[test]
    fn non_positive_dt_is_a_no_op() {
        let mut c = StepClock::new();
        assert_eq!(c.plan(0.0, 3, 1.0 / 60.0).substeps, 0);
        assert_eq!(c.plan(-1.0, 3, 1.0 / 60.0).substeps, 0);
        assert_eq!(c.plan(0.0, 0, 1.0 / 60.0).substeps, 0);
        assert_eq!(c.local_time(), 0.0);
    }
}
