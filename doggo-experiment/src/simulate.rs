//! Headless driver that plays a level with a synthetic participant on a
//! [`ManualClock`], for calibrating configs and benchmarking.

use crate::config::GameConfig;
use crate::state::{GameEvent, GameSession, LevelReport, SessionStatus};
use crate::trial::StimulusState;
use doggo_core::{ResponseKey, Side};
use doggo_timing::{Clock, ManualClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const MAX_STEPS: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedParticipant {
    pub rt_range_ms: (f64, f64),
    pub early_press_rate: f64,
    pub wrong_key_rate: f64,
    pub miss_rate: f64,
    pub break_pause_ms: f64,
}

impl Default for SimulatedParticipant {
    fn default() -> Self {
        Self {
            rt_range_ms: (250.0, 700.0),
            early_press_rate: 0.05,
            wrong_key_rate: 0.05,
            miss_rate: 0.02,
            break_pause_ms: 5_000.0,
        }
    }
}

impl SimulatedParticipant {
    fn sample_rt<R: Rng>(&self, rng: &mut R) -> f64 {
        let (lo, hi) = self.rt_range_ms;
        if hi > lo { rng.random_range(lo..=hi) } else { lo.max(0.0) }
    }

    fn chance<R: Rng>(rng: &mut R, p: f64) -> bool {
        rng.random_bool(p.clamp(0.0, 1.0))
    }
}

/// Plays one level to completion and returns its report.
pub fn run_level(config: GameConfig, participant: &SimulatedParticipant, seed: u64) -> LevelReport {
    let clock = ManualClock::new();
    let directional = config.task.responds_to(ResponseKey::Left);
    let mut session = GameSession::new(config, clock.clone(), StdRng::seed_from_u64(seed));
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut events = session.start();

    for _ in 0..MAX_STEPS {
        if let Some(report) = level_end(&events) {
            return report;
        }
        events = match session.status() {
            SessionStatus::Idle => session.start(),
            SessionStatus::Done => return session.snapshot(),
            SessionStatus::Break { ready: true, .. } => {
                clock.advance_ms(participant.break_pause_ms);
                session.resume()
            }
            SessionStatus::Break { ready: false, .. } => {
                if let Some(due) = session.next_deadline().map(|d| d.due_ms) {
                    clock.set_ms(due);
                }
                session.poll()
            }
            SessionStatus::Running => match session.stimulus().to_owned() {
                StimulusState::Armed { due_ms, .. }
                    if SimulatedParticipant::chance(&mut rng, participant.early_press_rate) =>
                {
                    let now = clock.now_ms();
                    let at = if due_ms > now { rng.random_range(now..due_ms) } else { now };
                    clock.set_ms(at);
                    let key = if directional { random_side_key(&mut rng) } else { ResponseKey::Down };
                    session.press_at(key, at)
                }
                StimulusState::Armed { due_ms, .. } => {
                    clock.set_ms(due_ms.max(clock.now_ms()));
                    session.poll()
                }
                StimulusState::Visible(trial) => {
                    if SimulatedParticipant::chance(&mut rng, participant.miss_rate) {
                        clock.set_ms(trial.window.closes_at_ms());
                        session.poll()
                    } else {
                        let at = trial.window.onset_ms + participant.sample_rt(&mut rng);
                        let wrong = trial.stimulus.is_directional()
                            && SimulatedParticipant::chance(&mut rng, participant.wrong_key_rate);
                        let key = match trial.stimulus.direction() {
                            Some(direction) if wrong => direction.opposite().into(),
                            _ => trial.stimulus.required_key(),
                        };
                        clock.set_ms(at.max(clock.now_ms()));
                        session.press_at(key, at)
                    }
                }
                StimulusState::Hidden => {
                    clock.advance_ms(1.0);
                    session.poll()
                }
            },
        };
    }

    tracing::warn!(steps = MAX_STEPS, "simulation did not finish, aborting level");
    session.abort();
    session.snapshot()
}

fn level_end(events: &[GameEvent]) -> Option<LevelReport> {
    events.iter().find_map(|e| match e {
        GameEvent::LevelComplete(report) => Some(report.clone()),
        _ => None,
    })
}

fn random_side_key<R: Rng>(rng: &mut R) -> ResponseKey {
    if rng.random_bool(0.5) {
        Side::Left.into()
    } else {
        Side::Right.into()
    }
}
