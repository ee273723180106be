use crate::error::ConfigError;
use doggo_core::ResponseKey;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How each phase's score target is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseTargetStrategy {
    /// Estimated from the trials still expected when the phase begins.
    #[default]
    Adaptive,
    /// `ceil(trials_number / 3) * min_score` for every phase, fixed at start.
    Fixed,
}

/// Points for a correct response slower than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlowReward {
    #[default]
    Zero,
    HalfMinScore,
}

impl SlowReward {
    pub fn points(&self, min_score: f64) -> f64 {
        match self {
            SlowReward::Zero => 0.0,
            SlowReward::HalfMinScore => min_score / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskVariant {
    /// One go stimulus, answered with the down key.
    #[default]
    Simple,
    /// Left/right stimuli; `conflict_proportion` of them appear on the side
    /// opposite to the direction they ask for.
    Directional { conflict_proportion: f64 },
}

impl TaskVariant {
    /// Keys outside the task's key set are ignored entirely.
    pub fn responds_to(&self, key: ResponseKey) -> bool {
        match self {
            TaskVariant::Simple => key == ResponseKey::Down,
            TaskVariant::Directional { .. } => key.side().is_some(),
        }
    }
}

/// Level parameters, loaded once and never mutated during play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Expected number of trials, only used to estimate phase targets.
    pub trials_number: usize,
    pub min_trials_per_phase: usize,
    pub min_isi_ms: f64,
    pub max_isi_ms: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub game_difficulty: f64,
    pub initial_median_rt_ms: f64,
    pub population_mean: f64,
    pub population_sd: f64,
    pub phase_target_strategy: PhaseTargetStrategy,
    pub slow_reward: SlowReward,
    pub task: TaskVariant,
    pub stimulus_exit_ms: f64,
    pub break_min_ms: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            trials_number: 40,
            min_trials_per_phase: 6,
            min_isi_ms: 1000.0,
            max_isi_ms: 3000.0,
            min_score: 100.0,
            max_score: 200.0,
            game_difficulty: 0.75,
            initial_median_rt_ms: 1000.0,
            population_mean: 500.0,
            population_sd: 100.0,
            phase_target_strategy: PhaseTargetStrategy::Adaptive,
            slow_reward: SlowReward::Zero,
            task: TaskVariant::Simple,
            stimulus_exit_ms: 250.0,
            break_min_ms: 0.0,
        }
    }
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let numbers = [
            ("min_isi_ms", self.min_isi_ms),
            ("max_isi_ms", self.max_isi_ms),
            ("min_score", self.min_score),
            ("max_score", self.max_score),
            ("game_difficulty", self.game_difficulty),
            ("initial_median_rt_ms", self.initial_median_rt_ms),
            ("population_mean", self.population_mean),
            ("population_sd", self.population_sd),
            ("stimulus_exit_ms", self.stimulus_exit_ms),
            ("break_min_ms", self.break_min_ms),
        ];
        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "must be a finite number"));
            }
        }
        if self.min_isi_ms < 0.0 {
            return Err(ConfigError::invalid("min_isi_ms", "must not be negative"));
        }
        if self.min_isi_ms > self.max_isi_ms {
            return Err(ConfigError::invalid(
                "max_isi_ms",
                format!("{} is below min_isi_ms {}", self.max_isi_ms, self.min_isi_ms),
            ));
        }
        if self.min_score > self.max_score {
            return Err(ConfigError::invalid(
                "max_score",
                format!("{} is below min_score {}", self.max_score, self.min_score),
            ));
        }
        if self.game_difficulty <= 0.0 {
            return Err(ConfigError::invalid("game_difficulty", "must be positive"));
        }
        if self.initial_median_rt_ms <= 0.0 {
            return Err(ConfigError::invalid("initial_median_rt_ms", "must be positive"));
        }
        if self.population_sd <= 0.0 {
            return Err(ConfigError::invalid("population_sd", "must be positive"));
        }
        if let TaskVariant::Directional { conflict_proportion } = self.task {
            if !(0.0..=1.0).contains(&conflict_proportion) {
                return Err(ConfigError::invalid(
                    "conflict_proportion",
                    format!("{conflict_proportion} is outside [0, 1]"),
                ));
            }
        }
        Ok(())
    }
}
