pub mod debug;
pub mod ledger;
pub mod schedule;

pub use debug::{DebugDraw, DebugSettings, LineCollector, DebugLine};
pub use ledger::{Ledger, LedgerEvent};
pub use schedule::ScheduleRecorder;
