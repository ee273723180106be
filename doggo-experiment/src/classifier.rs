use crate::config::GameConfig;
use crate::threshold::guarded_divisor;
use crate::trial::LiveTrial;
use doggo_core::{Outcome, ResponseKey};

/// Point rules for one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scoring {
    pub min_score: f64,
    pub max_score: f64,
    pub slow_points: f64,
}

impl Scoring {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            min_score: config.min_score,
            max_score: config.max_score,
            slow_points: config.slow_reward.points(config.min_score),
        }
    }

    pub fn early_points(&self) -> f64 {
        -self.min_score
    }

    pub fn error_points(&self) -> f64 {
        -self.min_score / 2.0
    }

    /// Returns `(normalized_rt, points)` for a fast response.
    pub fn fast_points(&self, rt_ms: f64, max_rt_ms: f64) -> (f64, f64) {
        let max_rt = guarded_divisor(max_rt_ms);
        let normalized = 1.0 - rt_ms.min(max_rt) / max_rt;
        let points = self.min_score + normalized * (self.max_score - self.min_score);
        (normalized, points)
    }
}

/// Classifies a press arriving at `at_ms`. `live` is the visible trial, if any.
///
/// Order matters: no live stimulus is an early press, a wrong direction is
/// an error, and only then is the RT compared against the threshold
/// snapshotted at onset.
pub fn classify(key: ResponseKey, at_ms: f64, live: Option<&LiveTrial>, scoring: &Scoring) -> Outcome {
    let Some(trial) = live else {
        return Outcome::Early {
            points: scoring.early_points(),
        };
    };

    let rt_ms = (at_ms - trial.window.onset_ms).max(0.0);

    if trial.stimulus.is_directional() && key != trial.stimulus.required_key() {
        return Outcome::Error {
            rt_ms,
            points: scoring.error_points(),
        };
    }

    if rt_ms > trial.window.threshold_ms {
        Outcome::Slow {
            rt_ms,
            points: scoring.slow_points,
            admitted: rt_ms <= trial.window.max_rt_ms,
        }
    } else {
        let (normalized_rt, points) = scoring.fast_points(rt_ms, trial.window.max_rt_ms);
        Outcome::Fast {
            rt_ms,
            normalized_rt,
            points,
        }
    }
}
