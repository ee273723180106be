pub mod classifier;
pub mod config;
pub mod error;
pub mod log;
pub mod scheduler;
pub mod simulate;
pub mod score;
pub mod state;
pub mod summary;
pub mod threshold;
pub mod trial;

pub use classifier::{Scoring, classify};
pub use config::{GameConfig, PhaseTargetStrategy, SlowReward, TaskVariant};
pub use error::ConfigError;
pub use log::TrialLog;
pub use scheduler::{ArmedTrial, TimerKind, TrialScheduler};
pub use simulate::{SimulatedParticipant, run_level};
pub use score::{Progress, ScoreController};
pub use state::{GameEvent, GameSession, LevelReport, LevelResults, SessionStatus};
pub use summary::{PerformanceSummary, normal_cdf, summarize};
pub use threshold::{ThresholdTracker, median};
pub use trial::{LiveTrial, ResponseWindow, StimulusState};
