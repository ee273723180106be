pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::{LevelPhase, PHASE_COUNT};
pub use stimulus::{Congruency, ResponseKey, Side, Stimulus};
pub use trial::{Outcome, TrialRecord, TrialType};
