use crate::config::{GameConfig, PhaseTargetStrategy};
use doggo_core::{LevelPhase, PHASE_COUNT};

/// What the level should do after a trial has been scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Break { from: LevelPhase, to: LevelPhase },
    LevelComplete,
}

/// Score accumulation, per-phase targets and phase transitions.
///
/// The score never drops below `floor`, the cumulative score at which the
/// current phase began. A phase target is computed the first time it is
/// needed and frozen from then on.
#[derive(Debug, Clone)]
pub struct ScoreController {
    score: f64,
    phase: LevelPhase,
    floor: f64,
    targets: [Option<f64>; PHASE_COUNT],
    strategy: PhaseTargetStrategy,
    trials_number: usize,
    min_trials_per_phase: usize,
    min_score: f64,
}

impl ScoreController {
    pub fn new(config: &GameConfig) -> Self {
        let mut controller = Self {
            score: 0.0,
            phase: LevelPhase::First,
            floor: 0.0,
            targets: [None; PHASE_COUNT],
            strategy: config.phase_target_strategy,
            trials_number: config.trials_number,
            min_trials_per_phase: config.min_trials_per_phase,
            min_score: config.min_score,
        };
        if controller.strategy == PhaseTargetStrategy::Fixed {
            let per_phase = controller.trials_number.div_ceil(PHASE_COUNT) as f64;
            controller.targets = [Some(per_phase * controller.min_score); PHASE_COUNT];
        }
        controller
    }

    /// Adaptive estimate for `phase` given how many stimuli were already shown.
    ///
    /// Remaining trials are split evenly over the remaining phases, half of
    /// them are expected to be fast, and the result is floored by one
    /// minimum score and by half the per-phase trial minimum.
    pub fn compute_phase_target(&self, phase: LevelPhase, trials_count: usize) -> f64 {
        let remaining = self.trials_number.saturating_sub(trials_count);
        let per_phase = remaining.div_ceil(phase.remaining());
        let expected_fast = (per_phase as f64 * 0.5).ceil();
        let min_trials_floor = self.min_trials_per_phase as f64 / 2.0 * self.min_score;
        self.min_score
            .max(min_trials_floor)
            .max(expected_fast * self.min_score)
    }

    /// Frozen target for `phase`, computing it now if it was never needed before.
    pub fn target(&mut self, phase: LevelPhase, trials_count: usize) -> f64 {
        if let Some(target) = self.targets[phase.index()] {
            return target;
        }
        let target = self.compute_phase_target(phase, trials_count);
        tracing::debug!(phase = phase.index(), target_score = target, "phase target set");
        self.targets[phase.index()] = Some(target);
        target
    }

    /// Adds a trial's points, clamps to the phase floor and checks the target.
    pub fn apply(&mut self, points: f64, trials_count: usize) -> Progress {
        self.score = (self.score + points).max(self.floor);
        let target = self.target(self.phase, trials_count);
        if self.score < self.floor + target {
            return Progress::Continue;
        }
        match self.phase.next() {
            Some(next) => {
                let from = self.phase;
                self.floor += target;
                self.phase = next;
                self.target(next, trials_count);
                self.score = self.score.max(self.floor);
                Progress::Break { from, to: next }
            }
            None => Progress::LevelComplete,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn phase(&self) -> LevelPhase {
        self.phase
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn targets(&self) -> [Option<f64>; PHASE_COUNT] {
        self.targets
    }

    pub fn current_target(&self) -> Option<f64> {
        self.targets[self.phase.index()]
    }

    /// Fraction of the current phase target already earned, in `[0, 1]`.
    pub fn phase_progress(&self) -> f64 {
        match self.current_target() {
            Some(target) if target > 0.0 => ((self.score - self.floor) / target).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}
