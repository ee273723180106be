use crate::config::{GameConfig, TaskVariant};
use doggo_core::{Side, Stimulus};
use doggo_timing::{Deadline, TimerSlot, TimerToken};
use rand::Rng;

/// What a pending deadline will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Inter-stimulus delay elapsed: show the stimulus.
    Onset,
    /// Response window closed without a press.
    Timeout,
    /// Minimum break display time elapsed.
    BreakReady,
}

/// A trial waiting out its inter-stimulus delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmedTrial {
    pub stimulus: Stimulus,
    pub delay_ms: f64,
    pub due_ms: f64,
    pub token: TimerToken,
}

/// Draws delays and stimuli and owns the single timer slot, so at most one
/// delay or timeout is ever outstanding.
#[derive(Debug)]
pub struct TrialScheduler<R: Rng> {
    rng: R,
    isi_range_ms: (f64, f64),
    task: TaskVariant,
    slot: TimerSlot<TimerKind>,
}

impl<R: Rng> TrialScheduler<R> {
    pub fn new(config: &GameConfig, rng: R) -> Self {
        Self {
            rng,
            isi_range_ms: (config.min_isi_ms, config.max_isi_ms),
            task: config.task,
            slot: TimerSlot::new(),
        }
    }

    /// Arms the next stimulus after `delay ~ U(min_isi, max_isi)`.
    pub fn schedule_next(&mut self, now_ms: f64) -> ArmedTrial {
        if let Some(stale) = self.slot.cancel() {
            tracing::warn!(kind = ?stale.kind, "outstanding timer dropped by new trial");
        }
        let delay_ms = self.draw_delay();
        let stimulus = self.draw_stimulus();
        let due_ms = now_ms + delay_ms;
        let token = self.slot.arm(TimerKind::Onset, due_ms);
        tracing::debug!(delay_ms, ?stimulus, "trial armed");
        ArmedTrial {
            stimulus,
            delay_ms,
            due_ms,
            token,
        }
    }

    pub fn arm_timeout(&mut self, closes_at_ms: f64) -> TimerToken {
        self.slot.arm(TimerKind::Timeout, closes_at_ms)
    }

    pub fn arm_break_ready(&mut self, ready_at_ms: f64) -> TimerToken {
        self.slot.arm(TimerKind::BreakReady, ready_at_ms)
    }

    pub fn cancel(&mut self) -> Option<Deadline<TimerKind>> {
        self.slot.cancel()
    }

    pub fn claim(&mut self, token: TimerToken) -> Option<Deadline<TimerKind>> {
        self.slot.claim(token)
    }

    pub fn take_due(&mut self, now_ms: f64) -> Option<Deadline<TimerKind>> {
        self.slot.take_due(now_ms)
    }

    pub fn next_deadline(&self) -> Option<&Deadline<TimerKind>> {
        self.slot.armed()
    }

    fn draw_delay(&mut self) -> f64 {
        let (min, max) = self.isi_range_ms;
        if max > min {
            self.rng.random_range(min..=max)
        } else {
            min.max(0.0)
        }
    }

    fn draw_stimulus(&mut self) -> Stimulus {
        match self.task {
            TaskVariant::Simple => Stimulus::Go,
            TaskVariant::Directional {
                conflict_proportion,
            } => {
                let direction = if self.rng.random_bool(0.5) {
                    Side::Left
                } else {
                    Side::Right
                };
                let conflict = self.rng.random_bool(conflict_proportion.clamp(0.0, 1.0));
                let region = if conflict {
                    direction.opposite()
                } else {
                    direction
                };
                Stimulus::Directional { region, direction }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doggo_core::Congruency;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scheduler(config: &GameConfig) -> TrialScheduler<StdRng> {
        TrialScheduler::new(config, StdRng::seed_from_u64(7))
    }

    #[test]
    fn delays_stay_within_isi_bounds() {
        let config = GameConfig::default();
        let mut s = scheduler(&config);
        for _ in 0..200 {
            let armed = s.schedule_next(0.0);
            assert!((1000.0..=3000.0).contains(&armed.delay_ms));
            assert_eq!(armed.due_ms, armed.delay_ms);
            assert_eq!(armed.stimulus, Stimulus::Go);
        }
    }

    #[test]
    fn equal_bounds_give_a_constant_delay() {
        let config = GameConfig {
            min_isi_ms: 800.0,
            max_isi_ms: 800.0,
            ..GameConfig::default()
        };
        let armed = scheduler(&config).schedule_next(100.0);
        assert_eq!(armed.due_ms, 900.0);
    }

    #[test]
    fn rescheduling_invalidates_the_previous_onset() {
        let config = GameConfig::default();
        let mut s = scheduler(&config);
        let first = s.schedule_next(0.0);
        let second = s.schedule_next(0.0);
        assert_eq!(s.claim(first.token), None);
        assert_eq!(s.claim(second.token).map(|d| d.kind), Some(TimerKind::Onset));
    }

    #[test]
    fn timeout_replaces_onset_in_the_slot() {
        let config = GameConfig::default();
        let mut s = scheduler(&config);
        let armed = s.schedule_next(0.0);
        let onset = s.take_due(armed.due_ms).unwrap();
        assert_eq!(onset.kind, TimerKind::Onset);
        let timeout = s.arm_timeout(armed.due_ms + 2000.0);
        assert_eq!(s.next_deadline().map(|d| d.token), Some(timeout));
        s.cancel();
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn conflict_proportion_controls_congruency() {
        let all_conflict = GameConfig {
            task: TaskVariant::Directional {
                conflict_proportion: 1.0,
            },
            ..GameConfig::default()
        };
        let mut s = scheduler(&all_conflict);
        for _ in 0..50 {
            let stimulus = s.schedule_next(0.0).stimulus;
            assert_eq!(stimulus.congruency(), Some(Congruency::Incongruent));
        }

        let no_conflict = GameConfig {
            task: TaskVariant::Directional {
                conflict_proportion: 0.0,
            },
            ..GameConfig::default()
        };
        let mut s = scheduler(&no_conflict);
        for _ in 0..50 {
            let stimulus = s.schedule_next(0.0).stimulus;
            assert_eq!(stimulus.congruency(), Some(Congruency::Congruent));
        }
    }
}
