pub mod ids;
pub mod types;
pub mod hash;
pub mod time;
pub mod config;
pub mod schedule;
pub mod rng;
pub mod error;

pub use ids::{BodyId, ConstraintId, VehicleId};
pub use types::{Vec3, Mat3, Isometry, Velocity, vec3, iso, quat_identity, plane_space};
pub use hash::{StepHasher, hash_vec3, hash_quat, hash_isometry};
pub use time::{StepClock, SubstepPlan, StepStats};
pub use config::{WorldConfig, SolverInfo, DeactivationConfig};
pub use schedule::{StepStage, schedule_digest};
pub use rng::XorShift64;
pub use error::{PhysicsError, PhysicsResult};
pub use glam::Quat;

pub type Scalar = f32;
