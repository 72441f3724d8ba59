use skidphys_geom::Aabb;

/// Deterministic 1D SAP along X with full AABB overlap, NaN-safe and stable.
/// Boxes rejected by `keep` never pair. Output pairs are `(lo, hi)` sorted.
pub fn pairs_sap(aabbs: &[Aabb], mut keep: impl FnMut(usize) -> bool) -> Vec<(usize, usize)> {
    #[derive(Copy, Clone)]
    struct Elem { min: f32, idx: usize }

    let mut elems: Vec<Elem> = Vec::with_capacity(aabbs.len());
    for (i, a) in aabbs.iter().enumerate() {
        if !keep(i) || !a.is_finite() { continue; }
        elems.push(Elem { min: a.min.x.min(a.max.x), idx: i });
    }

    elems.sort_by(|a, b| a.min.total_cmp(&b.min).then(a.idx.cmp(&b.idx)));

    let mut active: Vec<usize> = Vec::new();
    let mut out: Vec<(usize, usize)> = Vec::new();

    for e in elems {
        active.retain(|&j| aabbs[j].max.x.max(aabbs[j].min.x) >= e.min);
        for &j in &active {
            let (i, k) = if j < e.idx { (j, e.idx) } else { (e.idx, j) };
            if aabbs[i].overlaps(&aabbs[k]) { out.push((i, k)); }
        }
        active.push(e.idx);
    }

    out.sort_unstable();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use skidphys_core::vec3;

    fn unit_at(x: f32, y: f32) -> Aabb {
        Aabb::from_center_half_extents(vec3(x, y, 0.0), vec3(0.5, 0.5, 0.5))
    }

    #[test]
    fn finds_overlaps_only() {
        let boxes = [unit_at(0.0, 0.0), unit_at(0.8, 0.0), unit_at(0.4, 3.0), unit_at(5.0, 0.0)];
        assert_eq!(pairs_sap(&boxes, |_| true), vec![(0, 1)]);
    }

    #[test]
    fn skips_filtered_and_non_finite() {
        let mut boxes = vec![unit_at(0.0, 0.0), unit_at(0.5, 0.0), unit_at(0.2, 0.0)];
        boxes[2].max.x = f32::NAN;
        assert!(pairs_sap(&boxes, |i| i != 1).is_empty());
    }
}
