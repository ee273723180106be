use serde::{Deserialize, Serialize};

/// Number of scoring phases in a level.
pub const PHASE_COUNT: usize = 3;

/// One of the three scoring segments of a level. Phases only ever move forward.
#[derive(Copy, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "usize", try_from = "usize")]
pub enum LevelPhase {
    First,
    Second,
    Third,
}

impl Default for LevelPhase {
    fn default() -> Self {
        LevelPhase::First
    }
}

impl LevelPhase {
    pub const ALL: [LevelPhase; PHASE_COUNT] =
        [LevelPhase::First, LevelPhase::Second, LevelPhase::Third];

    pub fn index(&self) -> usize {
        match self {
            LevelPhase::First => 0,
            LevelPhase::Second => 1,
            LevelPhase::Third => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn next(&self) -> Option<Self> {
        use LevelPhase::*;
        Some(match self {
            First => Second,
            Second => Third,
            Third => return None,
        })
    }

    /// Phases left including this one.
    pub fn remaining(&self) -> usize {
        PHASE_COUNT - self.index()
    }

    pub fn is_final(&self) -> bool {
        self.next().is_none()
    }
}

impl From<LevelPhase> for usize {
    fn from(phase: LevelPhase) -> usize {
        phase.index()
    }
}

impl TryFrom<usize> for LevelPhase {
    type Error = String;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        LevelPhase::from_index(index).ok_or_else(|| format!("phase index {index} out of range"))
    }
}
