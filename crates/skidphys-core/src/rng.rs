/// Small deterministic generator used for solver row shuffling.
#[derive(Copy, Clone, Debug)]
pub struct XorShift64 { state: u64 }

impl XorShift64 {
    pub fn new(seed: u64) -> Self { Self { state: seed | 1 } }
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x >> 12; x ^= x << 25; x ^= x >> 27;
        self.state = x;
        ((x.wrapping_mul(2685821657736338717)) >> 32) as u32
    }
    /// Uniform-ish value in `0..n`; `n == 0` yields 0.
    pub fn next_below(&mut self, n: u32) -> u32 {
        if n == 0 { return 0; }
        self.next_u32() % n
    }
    pub fn state(&self) -> u64 { self.state }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = XorShift64::new(7);
        let mut b = XorShift64::new(7);
        for _ in 0..32 { assert_eq!(a.next_u32(), b.next_u32()); }
        for _ in 0..32 { assert!(a.next_below(5) < 5); }
    }
}
