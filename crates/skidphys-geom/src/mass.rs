use serde::{Deserialize, Serialize};
use skidphys_core::types::Vec3;
use crate::shape::{Shape, local_inertia};

/// Surface response. Pairs combine both coefficients by product.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material { pub friction: f32, pub restitution: f32 }

impl Default for Material {
    fn default() -> Self { Self { friction: 0.5, restitution: 0.0 } }
}

impl Material {
    pub fn new(friction: f32, restitution: f32) -> Self { Self { friction, restitution } }

    #[inline] pub fn combined_friction(&self, other: &Material) -> f32 { self.friction * other.friction }
    #[inline] pub fn combined_restitution(&self, other: &Material) -> f32 { self.restitution * other.restitution }
}

/// Mass and diagonal local inertia. A zero mass means immovable.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MassProps {
    pub mass: f32,
    pub inv_mass: f32,
    pub local_inertia: Vec3,
    pub inv_inertia_local: Vec3,
}

#[inline]
fn recip_or_zero(v: f32) -> f32 { if v > 0.0 { 1.0 / v } else { 0.0 } }

impl MassProps {
    pub fn infinite() -> Self {
        Self { mass: 0.0, inv_mass: 0.0, local_inertia: Vec3::ZERO, inv_inertia_local: Vec3::ZERO }
    }

    pub fn new(mass: f32, local_inertia: Vec3) -> Self {
        if !(mass > 0.0) || !mass.is_finite() { return Self::infinite(); }
        Self {
            mass,
            inv_mass: 1.0 / mass,
            local_inertia,
            inv_inertia_local: Vec3::new(
                recip_or_zero(local_inertia.x),
                recip_or_zero(local_inertia.y),
                recip_or_zero(local_inertia.z),
            ),
        }
    }

    pub fn from_shape(shape: &Shape, mass: f32) -> Self {
        Self::new(mass, local_inertia(shape, mass))
    }

    pub fn from_sphere(radius: f32, density: f32) -> Self {
        let vol = (4.0 / 3.0) * core::f32::consts::PI * radius * radius * radius;
        Self::from_shape(&Shape::Sphere { r: radius }, density * vol)
    }

    pub fn from_box(half: Vec3, density: f32) -> Self {
        let dims = half * 2.0;
        Self::from_shape(&Shape::Box { hx: half.x, hy: half.y, hz: half.z }, density * dims.x * dims.y * dims.z)
    }

    #[inline] pub fn is_static(&self) -> bool { self.inv_mass == 0.0 }
}
