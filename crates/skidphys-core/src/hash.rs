use blake3::Hasher;
use crate::types::{Isometry, Vec3};
use glam::Quat;

/// Incremental blake3 digest over little-endian step state.
pub struct StepHasher(Hasher);

impl Default for StepHasher {
    fn default() -> Self { Self::new() }
}

impl StepHasher {
    pub fn new() -> Self { StepHasher(Hasher::new()) }
    pub fn update_bytes(&mut self, bytes: &[u8]) { self.0.update(bytes); }
    pub fn update_u32(&mut self, v: u32) { self.0.update(&v.to_le_bytes()); }
    pub fn update_u64(&mut self, v: u64) { self.0.update(&v.to_le_bytes()); }
    pub fn update_f32(&mut self, v: f32) { self.0.update(&v.to_le_bytes()); }
    pub fn finalize(self) -> [u8; 32] { *self.0.finalize().as_bytes() }
}

#[inline]
pub fn hash_vec3(h: &mut StepHasher, v: &Vec3) {
    for c in [v.x, v.y, v.z] { h.update_f32(c); }
}

#[inline]
pub fn hash_quat(h: &mut StepHasher, q: &Quat) {
    for c in [q.x, q.y, q.z, q.w] { h.update_f32(c); }
}

#[inline]
pub fn hash_isometry(h: &mut StepHasher, x: &Isometry) {
    hash_vec3(h, &x.pos);
    hash_quat(h, &x.rot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::vec3;

    #[test]
    fn digest_is_order_sensitive() {
        let mut a = StepHasher::new();
        hash_vec3(&mut a, &vec3(1.0, 2.0, 3.0));
        hash_vec3(&mut a, &vec3(4.0, 5.0, 6.0));
        let mut b = StepHasher::new();
        hash_vec3(&mut b, &vec3(4.0, 5.0, 6.0));
        hash_vec3(&mut b, &vec3(1.0, 2.0, 3.0));
        assert_ne!(a.finalize(), b.finalize());
    }
}
