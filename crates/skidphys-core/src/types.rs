use glam::{Vec3A, Mat3A, Quat};
use crate::Scalar;

pub type Vec3 = Vec3A;
pub type Mat3 = Mat3A;

#[inline] pub fn vec3(x: Scalar, y: Scalar, z: Scalar) -> Vec3 { Vec3::new(x, y, z) }
#[inline] pub fn iso(pos: Vec3, rot: Quat) -> Isometry { Isometry { pos, rot } }
#[inline] pub fn quat_identity() -> Quat { Quat::IDENTITY }

/// Rigid transform: rotation followed by translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Isometry { pub pos: Vec3, pub rot: Quat }

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Velocity { pub lin: Vec3, pub ang: Vec3 }

impl Default for Isometry {
    fn default() -> Self { Self { pos: Vec3::ZERO, rot: Quat::IDENTITY } }
}

impl Isometry {
    pub const IDENTITY: Self = Self { pos: Vec3::ZERO, rot: Quat::IDENTITY };

    #[inline] pub fn from_translation(pos: Vec3) -> Self { Self { pos, rot: Quat::IDENTITY } }

    #[inline] pub fn transform_point(&self, p: Vec3) -> Vec3 { self.pos + self.rot * p }
    #[inline] pub fn transform_vector(&self, v: Vec3) -> Vec3 { self.rot * v }
    #[inline] pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 { self.rot.inverse() * (p - self.pos) }
    #[inline] pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 { self.rot.inverse() * v }

    /// Rotation matrix whose columns are the local axes in world space.
    #[inline] pub fn basis(&self) -> Mat3 { Mat3::from_quat(self.rot) }

    /// Linear position blend + spherical rotation blend, `t` in [0, 1].
    pub fn interpolate(&self, other: &Isometry, t: Scalar) -> Isometry {
        let t = t.clamp(0.0, 1.0);
        Isometry { pos: self.pos.lerp(other.pos, t), rot: self.rot.slerp(other.rot, t).normalize() }
    }

    #[inline] pub fn is_finite(&self) -> bool { self.pos.is_finite() && self.rot.is_finite() }
}

/// Two unit vectors orthogonal to `n` and to each other.
pub fn plane_space(n: Vec3) -> (Vec3, Vec3) {
    let ax = n.x.abs(); let ay = n.y.abs(); let az = n.z.abs();
    let base = if ax <= ay && ax <= az { Vec3::X }
    else if ay <= az { Vec3::Y }
    else { Vec3::Z };
    let t1 = base.cross(n).normalize_or_zero();
    let t2 = n.cross(t1);
    (t1, t2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_point_round_trips() {
        let x = iso(vec3(1.0, 2.0, 3.0), Quat::from_rotation_y(0.7));
        let p = vec3(-0.3, 4.0, 0.25);
        let back = x.inverse_transform_point(x.transform_point(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-5);
    }

    #[test]
    fn interpolate_halfway() {
        let a = Isometry::IDENTITY;
        let b = iso(vec3(2.0, 0.0, 0.0), Quat::from_rotation_z(1.0));
        let m = a.interpolate(&b, 0.5);
        assert_relative_eq!(m.pos.x, 1.0, epsilon = 1e-6);
        let (_, angle) = m.rot.to_axis_angle();
        assert_relative_eq!(angle, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn plane_space_is_orthonormal() {
        let n = vec3(0.3, -0.8, 0.52).normalize();
        let (t1, t2) = plane_space(n);
        assert_relative_eq!(t1.dot(n), 0.0, epsilon = 1e-6);
        assert_relative_eq!(t2.dot(n), 0.0, epsilon = 1e-6);
        assert_relative_eq!(t1.dot(t2), 0.0, epsilon = 1e-6);
        assert_relative_eq!(t2.length(), 1.0, epsilon = 1e-5);
    }
}
