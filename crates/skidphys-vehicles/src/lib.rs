#![deny(missing_docs)]
//! Raycast vehicle: a chassis body carried by suspension rays.
//!
//! Usage:
//! - build a `RaycastVehicle` for a chassis body and `add_wheel` per wheel.
//! - every substep after integration, call `update_vehicle` with a
//!   `VehicleRaycaster` that sees the world's bodies.
//! - read `wheel_transform(i)` for rendering.

pub mod friction;
pub mod raycaster;
pub mod vehicle;
pub mod wheel;

pub use friction::{calc_rolling_friction, resolve_single_bilateral, WheelContactPoint};
pub use raycaster::{VehicleRaycaster, VehicleRaycasterResult};
pub use vehicle::RaycastVehicle;
pub use wheel::{RaycastInfo, VehicleTuning, WheelInfo};
