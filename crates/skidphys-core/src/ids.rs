use core::fmt;

/// Index of a rigid body in the world arena. Ids are never reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BodyId(pub u32);
impl BodyId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}
impl fmt::Display for BodyId { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "BodyId({})", self.0) } }

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConstraintId(pub u32);
impl fmt::Display for ConstraintId { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ConstraintId({})", self.0) } }

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VehicleId(pub u32);
impl fmt::Display for VehicleId { fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "VehicleId({})", self.0) } }
