use crate::StepHasher;

/// Pipeline stages of one substep, in execution order.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepStage {
    SaveKinematicState = 1,
    UpdateAabbs = 2,
    PredictMotion = 3,
    CollisionDetection = 4,
    CalculateIslands = 5,
    SolveConstraints = 6,
    IntegrateTransforms = 7,
    UpdateVehicles = 8,
    UpdateActivation = 9,
    SyncMotionStates = 10,
}

pub fn schedule_digest(stages: &[StepStage]) -> [u8; 32] {
    let mut h = StepHasher::new();
    for s in stages { h.update_bytes(&[*s as u8]); }
    h.finalize()
}
