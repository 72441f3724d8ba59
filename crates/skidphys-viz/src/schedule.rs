use skidphys_core::{schedule_digest, StepStage};

/// Stages run during the current `step_simulation` call, in order.
#[derive(Default)]
pub struct ScheduleRecorder { stages: Vec<StepStage> }

impl ScheduleRecorder {
    pub fn new() -> Self { Self { stages: Vec::new() } }
    pub fn push(&mut self, s: StepStage) { self.stages.push(s); }
    pub fn clear(&mut self) { self.stages.clear(); }
    pub fn stages(&self) -> &[StepStage] { &self.stages }
    pub fn digest(&self) -> [u8; 32] { schedule_digest(&self.stages) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_tracks_order() {
        let mut a = ScheduleRecorder::new();
        a.push(StepStage::UpdateAabbs);
        a.push(StepStage::PredictMotion);
        let mut b = ScheduleRecorder::new();
        b.push(StepStage::PredictMotion);
        b.push(StepStage::UpdateAabbs);
        assert_ne!(a.digest(), b.digest());
        b.clear();
        b.push(StepStage::UpdateAabbs);
        b.push(StepStage::PredictMotion);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.stages().len(), 2);
    }
}
