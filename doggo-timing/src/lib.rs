pub mod clock;
pub mod slot;

pub use clock::{CalibrationStats, Clock, HighPrecisionClock, ManualClock};
pub use slot::{Deadline, TimerSlot, TimerToken};
