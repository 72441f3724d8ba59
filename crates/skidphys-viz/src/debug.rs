use serde::{Deserialize, Serialize};
use skidphys_core::Vec3;

/// What `World::debug_draw` emits, plus the periodic ledger dump cadence.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub draw_aabbs: bool,
    pub draw_contacts: bool,
    pub draw_constraints: bool,
    pub draw_wheels: bool,
    /// Dump the ledger as JSONL every N ticks; 0 disables.
    pub json_every: u32,
    /// Cap on lines emitted per category.
    pub max_lines: usize,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            draw_aabbs: false,
            draw_contacts: true,
            draw_constraints: true,
            draw_wheels: true,
            json_every: 0,
            max_lines: 1024,
        }
    }
}

/// Line sink for debug visualization. Drawing never touches simulation state.
pub trait DebugDraw {
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: [f32; 3]);

    fn draw_contact_point(&mut self, point: Vec3, normal: Vec3, distance: f32, color: [f32; 3]) {
        self.draw_line(point, point + normal * distance.abs().max(0.05), color);
    }

    fn draw_box(&mut self, min: Vec3, max: Vec3, color: [f32; 3]) {
        let c = |x: bool, y: bool, z: bool| {
            Vec3::new(if x { max.x } else { min.x }, if y { max.y } else { min.y }, if z { max.z } else { min.z })
        };
        for (a, b) in [
            (c(false, false, false), c(true, false, false)),
            (c(false, true, false), c(true, true, false)),
            (c(false, false, true), c(true, false, true)),
            (c(false, true, true), c(true, true, true)),
            (c(false, false, false), c(false, true, false)),
            (c(true, false, false), c(true, true, false)),
            (c(false, false, true), c(false, true, true)),
            (c(true, false, true), c(true, true, true)),
            (c(false, false, false), c(false, false, true)),
            (c(true, false, false), c(true, false, true)),
            (c(false, true, false), c(false, true, true)),
            (c(true, true, false), c(true, true, true)),
        ] {
            self.draw_line(a, b, color);
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DebugLine {
    pub from: Vec3,
    pub to: Vec3,
    pub color: [f32; 3],
}

/// Collects lines in memory.
#[derive(Default)]
pub struct LineCollector {
    pub lines: Vec<DebugLine>,
}

impl DebugDraw for LineCollector {
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: [f32; 3]) {
        self.lines.push(DebugLine { from, to, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_twelve_edges() {
        let mut c = LineCollector::default();
        c.draw_box(Vec3::ZERO, Vec3::ONE, [1.0, 1.0, 1.0]);
        assert_eq!(c.lines.len(), 12);
        c.draw_contact_point(Vec3::ZERO, Vec3::Y, 0.0, [1.0, 0.0, 0.0]);
        assert_eq!(c.lines[12].to, Vec3::Y * 0.05);
    }
}
