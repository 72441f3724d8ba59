use skidphys_core::Isometry;

/// Sink through which the world publishes interpolated body poses, and the
/// source a kinematic body is driven from.
pub trait MotionState {
    fn get_world_transform(&self) -> Isometry;
    fn set_world_transform(&mut self, xf: &Isometry);
}

/// Stores the last published pose.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DefaultMotionState {
    pub graphics: Isometry,
}

impl DefaultMotionState {
    pub fn new(start: Isometry) -> Self { Self { graphics: start } }
}

impl MotionState for DefaultMotionState {
    fn get_world_transform(&self) -> Isometry { self.graphics }
    fn set_world_transform(&mut self, xf: &Isometry) { self.graphics = *xf; }
}
