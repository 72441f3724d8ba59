use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Telemetry recorded while stepping. Ids are raw indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Substep accounting for one `step_simulation` call.
    Substeps { requested: u32, taken: u32, step_dt: f32 },
    /// Body moved to DisableSimulation by the AABB sanity check.
    Quarantined { body: u32, extent_sq: f32 },
    /// An island went to sleep this substep.
    IslandSleep { tag: u32, bodies: u32 },
    /// Islands and rows handed to the solver this substep.
    Solve { islands: u32, rows: u32 },
    ConstraintBroken { constraint: u32, impulse: f32 },
    VehicleWheel { vehicle: u32, wheel: u32, in_contact: bool, suspension_force: f32, skid: f32 },
}

/// Bounded event log; the oldest events fall off once full.
#[derive(Clone, Debug)]
pub struct Ledger {
    cap: usize,
    events: VecDeque<LedgerEvent>,
    dropped: u64,
}

impl Ledger {
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1), events: VecDeque::with_capacity(cap.min(4096)), dropped: 0 }
    }

    pub fn push(&mut self, e: LedgerEvent) {
        if self.events.len() == self.cap {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(e);
    }

    pub fn clear(&mut self) { self.events.clear(); }
    pub fn len(&self) -> usize { self.events.len() }
    pub fn is_empty(&self) -> bool { self.events.is_empty() }
    /// Events discarded because the ledger was full.
    pub fn dropped(&self) -> u64 { self.dropped }
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEvent> { self.events.iter() }

    /// One JSON object per line.
    pub fn to_jsonl<W: Write>(&self, mut w: W) -> io::Result<()> {
        for e in &self.events {
            serde_json::to_writer(&mut w, e)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Writes `<dir>/ledger_<tick>.jsonl`, creating `dir` if needed.
    pub fn write_jsonl(&self, dir: impl AsRef<Path>, tick: u64) -> io::Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("ledger_{tick:06}.jsonl"));
        let file = fs::File::create(&path)?;
        self.to_jsonl(io::BufWriter::new(file))?;
        log::debug!("wrote {} ledger events to {}", self.events.len(), path.display());
        Ok(path)
    }
}

impl Default for Ledger {
    fn default() -> Self { Self::new(4096) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_ledger_drops_oldest() {
        let mut l = Ledger::new(2);
        for tag in 0..3 {
            l.push(LedgerEvent::IslandSleep { tag, bodies: 1 });
        }
        assert_eq!(l.len(), 2);
        assert_eq!(l.dropped(), 1);
        assert_eq!(l.iter().next(), Some(&LedgerEvent::IslandSleep { tag: 1, bodies: 1 }));
    }

    #[test]
    fn jsonl_is_one_tagged_object_per_line() {
        let mut l = Ledger::new(8);
        l.push(LedgerEvent::Quarantined { body: 3, extent_sq: 1e13 });
        l.push(LedgerEvent::Solve { islands: 2, rows: 40 });
        let mut out = Vec::new();
        l.to_jsonl(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: LedgerEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, LedgerEvent::Solve { islands: 2, rows: 40 });
        assert!(lines[0].contains("\"kind\":\"quarantined\""));
    }
}
