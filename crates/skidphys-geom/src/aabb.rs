use skidphys_core::types::Vec3;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Aabb { pub min: Vec3, pub max: Vec3 }

impl Aabb {
    #[inline] pub fn new(min: Vec3, max: Vec3) -> Self { Self { min, max } }
    #[inline] pub fn from_center_half_extents(c: Vec3, he: Vec3) -> Self {
        Self { min: c - he, max: c + he }
    }
    #[inline] pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x || self.min.x > other.max.x ||
            self.max.y < other.min.y || self.min.y > other.max.y ||
            self.max.z < other.min.z || self.min.z > other.max.z)
    }
    #[inline] pub fn expand_by(&mut self, r: f32) {
        let e = Vec3::splat(r);
        self.min -= e; self.max += e;
    }
    #[inline] pub fn merged(&self, other: &Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }
    #[inline] pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }
    #[inline] pub fn extent(&self) -> Vec3 { self.max - self.min }
    #[inline] pub fn is_finite(&self) -> bool { self.min.is_finite() && self.max.is_finite() }

    /// Slab test for the segment `from -> to`.
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let d = to - from;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        for i in 0..3 {
            let (o, di, lo, hi) = (from[i], d[i], self.min[i], self.max[i]);
            if di.abs() < 1e-12 {
                if o < lo || o > hi { return false; }
                continue;
            }
            let inv = 1.0 / di;
            let (mut a, mut b) = ((lo - o) * inv, (hi - o) * inv);
            if a > b { core::mem::swap(&mut a, &mut b); }
            t0 = t0.max(a);
            t1 = t1.min(b);
            if t0 > t1 { return false; }
        }
        true
    }
}
