pub mod aabb;
pub mod shape;
pub mod mass;
pub mod ray;

pub use aabb::Aabb;
pub use shape::{Shape, aabb_of, local_support, local_inertia, PLANE_EXTENT};
pub use mass::{MassProps, Material};
pub use ray::{ray_cast, ShapeRayHit};
