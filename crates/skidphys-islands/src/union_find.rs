/// Disjoint sets over `0..n` with path halving and union by size.
/// Ties keep the lower index as root so tags are deterministic.
#[derive(Clone, Debug, Default)]
pub struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        let mut uf = Self::default();
        uf.reset(n);
        uf
    }

    pub fn reset(&mut self, n: usize) {
        self.parent.clear();
        self.parent.extend(0..n as u32);
        self.size.clear();
        self.size.resize(n, 1);
    }

    pub fn len(&self) -> usize { self.parent.len() }
    pub fn is_empty(&self) -> bool { self.parent.is_empty() }

    pub fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let p = self.parent[x as usize];
            self.parent[x as usize] = self.parent[p as usize];
            x = self.parent[x as usize];
        }
        x
    }

    pub fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb { return; }
        let (sa, sb) = (self.size[ra as usize], self.size[rb as usize]);
        let (root, child) = if sa > sb || (sa == sb && ra < rb) { (ra, rb) } else { (rb, ra) };
        self.parent[child as usize] = root;
        self.size[root as usize] = sa + sb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unions_collapse_to_one_root() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.union(1, 3);
        let r = uf.find(0);
        for i in 1..4 { assert_eq!(uf.find(i), r); }
        assert_ne!(uf.find(4), r);
        assert_eq!(uf.find(5), 5);
    }

    #[test]
    fn equal_sizes_keep_lower_root() {
        let mut uf = UnionFind::new(4);
        uf.union(3, 2);
        assert_eq!(uf.find(3), 2);
    }
}
