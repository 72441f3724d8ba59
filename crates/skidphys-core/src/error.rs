use thiserror::Error;
use crate::{BodyId, ConstraintId, VehicleId};

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("unknown body {0}")]
    UnknownBody(BodyId),
    #[error("body {0} has been removed")]
    BodyRemoved(BodyId),
    #[error("unknown constraint {0}")]
    UnknownConstraint(ConstraintId),
    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),
    #[error("wheel index {index} out of range for {vehicle} ({count} wheels)")]
    WheelOutOfRange { vehicle: VehicleId, index: usize, count: usize },
    #[error("body {body} is the chassis of {vehicle}")]
    BodyInUse { body: BodyId, vehicle: VehicleId },
    #[error("a constraint needs two distinct bodies, got {0} twice")]
    SelfConstraint(BodyId),
    #[error("invalid body description: {0}")]
    InvalidBody(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
