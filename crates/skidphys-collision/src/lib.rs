pub mod broadphase;
pub mod narrowphase;
pub mod manifold;
pub mod dispatcher;

pub use broadphase::pairs_sap;
pub use narrowphase::{contacts_between, RawContact, MAX_MANIFOLD_POINTS};
pub use manifold::{ContactPoint, ContactManifold, ManifoldCache, PairKey};
pub use dispatcher::{CollisionDispatcher, CollisionObject, DefaultDispatcher, DispatchReport, DispatchSettings, needs_collision};
