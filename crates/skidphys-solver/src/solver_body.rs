use skidphys_core::types::{Mat3, Velocity, Vec3};
use skidphys_core::BodyId;
use skidphys_dynamics::Bodies;

/// Island-local copy of the state a row touches. Slot 0 of every solve is the
/// shared fixed body standing in for all static bodies.
#[derive(Copy, Clone, Debug)]
pub struct SolverBody {
    pub body: Option<BodyId>,
    pub lin_vel: Vec3,
    pub ang_vel: Vec3,
    pub push_lin: Vec3,
    pub push_ang: Vec3,
    pub inv_mass: f32,
    pub inv_inertia_world: Mat3,
    pub angular_factor: f32,
    pub pos: Vec3,
}

impl SolverBody {
    pub const FIXED: SolverBody = SolverBody {
        body: None,
        lin_vel: Vec3::ZERO,
        ang_vel: Vec3::ZERO,
        push_lin: Vec3::ZERO,
        push_ang: Vec3::ZERO,
        inv_mass: 0.0,
        inv_inertia_world: Mat3::ZERO,
        angular_factor: 0.0,
        pos: Vec3::ZERO,
    };

    pub fn from_body(bodies: &Bodies, id: BodyId) -> Self {
        let v = bodies.vel(id.0);
        SolverBody {
            body: Some(id),
            lin_vel: v.lin,
            ang_vel: v.ang,
            push_lin: Vec3::ZERO,
            push_ang: Vec3::ZERO,
            inv_mass: bodies.inv_mass_of(id.0),
            inv_inertia_world: bodies.inv_inertia_world(id.0),
            angular_factor: bodies.angular_factor(id.0),
            pos: bodies.pose(id.0).pos,
        }
    }

    #[inline] pub fn velocity_in_local_point(&self, rel_pos: Vec3) -> Vec3 {
        self.lin_vel + self.ang_vel.cross(rel_pos)
    }

    /// `lin_dir` is the row's linear Jacobian; `ang_comp` is `I^-1 * J_ang`.
    #[inline] pub fn apply_impulse(&mut self, lin_dir: Vec3, ang_comp: Vec3, magnitude: f32) {
        if self.inv_mass == 0.0 { return; }
        self.lin_vel += lin_dir * (self.inv_mass * magnitude);
        self.ang_vel += ang_comp * magnitude;
    }

    #[inline] pub fn apply_push_impulse(&mut self, lin_dir: Vec3, ang_comp: Vec3, magnitude: f32) {
        if self.inv_mass == 0.0 { return; }
        self.push_lin += lin_dir * (self.inv_mass * magnitude);
        self.push_ang += ang_comp * magnitude;
    }

    pub fn velocity(&self) -> Velocity { Velocity { lin: self.lin_vel, ang: self.ang_vel } }
    pub fn push_velocity(&self) -> Velocity { Velocity { lin: self.push_lin, ang: self.push_ang } }
}
