use crate::classifier::{Scoring, classify};
use crate::config::GameConfig;
use crate::log::TrialLog;
use crate::scheduler::{TimerKind, TrialScheduler};
use crate::score::{Progress, ScoreController};
use crate::summary::{PerformanceSummary, summarize};
use crate::threshold::ThresholdTracker;
use crate::trial::{LiveTrial, ResponseWindow, StimulusState};
use chrono::Utc;
use doggo_core::{LevelPhase, Outcome, ResponseKey, Stimulus, TrialRecord};
use doggo_timing::{Clock, Deadline, TimerToken};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Notifications for the renderer, audio and export collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    TrialArmed {
        stimulus: Stimulus,
        due_ms: f64,
        token: TimerToken,
    },
    StimulusOnset {
        trial: LiveTrial,
        timeout_token: TimerToken,
    },
    TrialResolved {
        outcome: Outcome,
        record: TrialRecord,
    },
    StimulusExit {
        until_ms: f64,
    },
    BreakStarted {
        from: LevelPhase,
        to: LevelPhase,
    },
    BreakReady,
    BreakResumed {
        phase: LevelPhase,
    },
    LevelComplete(LevelReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Break {
        from: LevelPhase,
        to: LevelPhase,
        ready: bool,
    },
    Done,
}

/// Everything handed off when a level ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub reaction_times: Vec<f64>,
    pub log: Vec<TrialRecord>,
    pub score: f64,
    pub trials_count: usize,
    pub phase: LevelPhase,
    pub median_rt_ms: f64,
    pub aborted: bool,
}

impl LevelReport {
    pub fn summary(&self, config: &GameConfig) -> PerformanceSummary {
        summarize(&self.log, config.population_mean, config.population_sd)
    }

    pub fn into_results(self, config: &GameConfig) -> LevelResults {
        let summary = self.summary(config);
        LevelResults { report: self, summary }
    }
}

/// Export bundle written at level end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelResults {
    pub report: LevelReport,
    pub summary: PerformanceSummary,
}

impl LevelResults {
    pub fn write_json<W: std::io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

/// One level of play.
///
/// All mutation goes through [`start`](Self::start), [`poll`](Self::poll),
/// [`fire`](Self::fire), [`press_at`](Self::press_at),
/// [`resume`](Self::resume) and [`abort`](Self::abort); each runs to
/// completion and returns the events it produced. Timers live in a single
/// token-checked slot, so a delay or timeout invalidated by a response, a
/// break or the level end can never fire afterwards.
pub struct GameSession<C, R>
where
    C: Clock,
    R: Rng,
{
    config: GameConfig,
    clock: C,
    scoring: Scoring,
    scheduler: TrialScheduler<R>,
    tracker: ThresholdTracker,
    controller: ScoreController,
    log: TrialLog,
    trials_count: usize,
    stimulus: StimulusState,
    exiting_until_ms: Option<f64>,
    status: SessionStatus,
}

impl<C, R> GameSession<C, R>
where
    C: Clock,
    R: Rng,
{
    pub fn new(config: GameConfig, clock: C, rng: R) -> Self {
        Self {
            scoring: Scoring::from_config(&config),
            scheduler: TrialScheduler::new(&config, rng),
            tracker: ThresholdTracker::new(config.initial_median_rt_ms),
            controller: ScoreController::new(&config),
            log: TrialLog::new(),
            trials_count: 0,
            stimulus: StimulusState::Hidden,
            exiting_until_ms: None,
            status: SessionStatus::Idle,
            config,
            clock,
        }
    }

    /// Arms the first trial. Calling it again has no effect.
    pub fn start(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.status != SessionStatus::Idle {
            return events;
        }
        let now = self.clock.now_ms();
        self.status = SessionStatus::Running;
        let target = self.controller.target(LevelPhase::First, self.trials_count);
        tracing::info!(target_score = target, "level started");
        self.schedule_next(now, &mut events);
        events
    }

    /// Fires whatever deadline is due at the clock's current time.
    pub fn poll(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let now = self.clock.now_ms();
        self.advance_to(now, &mut events);
        events
    }

    /// Callback entry point for an externally scheduled timer.
    /// Tokens that were cancelled or replaced are ignored. The deadline takes
    /// effect at its scheduled time, however late the callback runs.
    pub fn fire(&mut self, token: TimerToken) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if let Some(deadline) = self.scheduler.claim(token) {
            self.on_deadline(deadline, &mut events);
        }
        events
    }

    pub fn press(&mut self, key: ResponseKey) -> Vec<GameEvent> {
        let now = self.clock.now_ms();
        self.press_at(key, now)
    }

    /// Handles a press that arrived at `at_ms`. Deadlines due before then
    /// fire first, each at its own due time, so RT is measured from the
    /// scheduled onset and a press can never beat its own timeout. A press
    /// landing exactly on the timeout still counts as a response.
    pub fn press_at(&mut self, key: ResponseKey, at_ms: f64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.status != SessionStatus::Running || !self.config.task.responds_to(key) {
            return events;
        }
        self.advance_for_press(at_ms, &mut events);
        if self.status != SessionStatus::Running || self.is_exiting_at(at_ms) {
            return events;
        }
        let outcome = classify(key, at_ms, self.stimulus.live(), &self.scoring);
        self.resolve(outcome, at_ms, &mut events);
        events
    }

    /// Leaves a break once it is ready. Ignored at any other time.
    pub fn resume(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let SessionStatus::Break { to, ready: true, .. } = self.status else {
            return events;
        };
        let now = self.clock.now_ms();
        self.status = SessionStatus::Running;
        tracing::info!(phase = to.index(), "break over");
        events.push(GameEvent::BreakResumed { phase: to });
        self.schedule_next(now, &mut events);
        events
    }

    /// Ends the level early, discarding any pending timer.
    pub fn abort(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.status != SessionStatus::Done {
            self.finish(true, &mut events);
        }
        events
    }

    fn advance_to(&mut self, now_ms: f64, events: &mut Vec<GameEvent>) {
        while let Some(deadline) = self.scheduler.take_due(now_ms) {
            self.on_deadline(deadline, events);
        }
    }

    fn advance_for_press(&mut self, at_ms: f64, events: &mut Vec<GameEvent>) {
        loop {
            let window_closes_now = self
                .scheduler
                .next_deadline()
                .is_some_and(|d| d.kind == TimerKind::Timeout && d.due_ms == at_ms);
            if window_closes_now {
                return;
            }
            let Some(deadline) = self.scheduler.take_due(at_ms) else {
                return;
            };
            self.on_deadline(deadline, events);
        }
    }

    fn on_deadline(&mut self, deadline: Deadline<TimerKind>, events: &mut Vec<GameEvent>) {
        let now_ms = deadline.due_ms;
        match deadline.kind {
            TimerKind::Onset => self.show_stimulus(now_ms, events),
            TimerKind::Timeout => self.resolve(Outcome::Timeout, now_ms, events),
            TimerKind::BreakReady => {
                if let SessionStatus::Break { ref mut ready, .. } = self.status {
                    *ready = true;
                    events.push(GameEvent::BreakReady);
                }
            }
        }
    }

    fn schedule_next(&mut self, now_ms: f64, events: &mut Vec<GameEvent>) {
        let armed = self.scheduler.schedule_next(now_ms);
        self.stimulus = StimulusState::Armed {
            stimulus: armed.stimulus,
            armed_at_ms: now_ms,
            due_ms: armed.due_ms,
            token: armed.token,
        };
        events.push(GameEvent::TrialArmed {
            stimulus: armed.stimulus,
            due_ms: armed.due_ms,
            token: armed.token,
        });
    }

    fn show_stimulus(&mut self, now_ms: f64, events: &mut Vec<GameEvent>) {
        let StimulusState::Armed { stimulus, .. } = self.stimulus else {
            tracing::warn!(state = ?self.stimulus, "onset fired without an armed stimulus");
            return;
        };
        self.trials_count += 1;
        self.exiting_until_ms = None;
        let window = ResponseWindow {
            onset_ms: now_ms,
            threshold_ms: self.tracker.effective_threshold(self.config.game_difficulty),
            max_rt_ms: self.tracker.max_rt_ms(),
        };
        let trial = LiveTrial {
            number: self.trials_count,
            stimulus,
            window,
        };
        let timeout_token = self.scheduler.arm_timeout(window.closes_at_ms());
        self.stimulus = StimulusState::Visible(trial);
        tracing::debug!(
            trial = trial.number,
            threshold_ms = window.threshold_ms,
            max_rt_ms = window.max_rt_ms,
            "stimulus onset"
        );
        events.push(GameEvent::StimulusOnset {
            trial,
            timeout_token,
        });
    }

    /// Scores one outcome, logs it, and decides what happens next.
    fn resolve(&mut self, outcome: Outcome, at_ms: f64, events: &mut Vec<GameEvent>) {
        self.scheduler.cancel();
        let live = std::mem::take(&mut self.stimulus).live().copied();

        if outcome.include_in_median() {
            if let Some(rt) = outcome.rt_ms() {
                let median = self.tracker.admit(rt);
                tracing::debug!(rt, median, "median updated");
            }
        }

        let phase = self.controller.phase();
        let progress = self.controller.apply(outcome.points(), self.trials_count);

        let stamped = !matches!(outcome, Outcome::Timeout);
        let threshold_ms = match (&outcome, live) {
            (Outcome::Timeout, _) => None,
            (_, Some(trial)) => Some(trial.window.threshold_ms),
            (_, None) => Some(self.tracker.effective_threshold(self.config.game_difficulty)),
        };
        let record = TrialRecord {
            phase,
            trial_type: outcome.trial_type(),
            timestamp: stamped.then(Utc::now),
            trial_number: self.trials_count,
            rt_ms: outcome.rt_ms(),
            threshold_ms,
            score_after: self.controller.score(),
            score_delta: outcome.points(),
            region: None,
            direction: None,
            congruency: None,
        }
        .with_stimulus(live.as_ref().map(|t| &t.stimulus));
        tracing::info!(
            trial = record.trial_number,
            kind = ?record.trial_type,
            rt_ms = ?record.rt_ms,
            score = record.score_after,
            "trial resolved"
        );
        self.log.push(record.clone());
        events.push(GameEvent::TrialResolved { outcome, record });

        if live.is_some() {
            let until_ms = at_ms + self.config.stimulus_exit_ms.max(0.0);
            self.exiting_until_ms = Some(until_ms);
            events.push(GameEvent::StimulusExit { until_ms });
        }

        match progress {
            Progress::Continue => self.schedule_next(at_ms, events),
            Progress::Break { from, to } => self.begin_break(from, to, at_ms, events),
            Progress::LevelComplete => self.finish(false, events),
        }
    }

    fn begin_break(&mut self, from: LevelPhase, to: LevelPhase, now_ms: f64, events: &mut Vec<GameEvent>) {
        self.scheduler.cancel();
        self.stimulus = StimulusState::Hidden;
        tracing::info!(
            from = from.index(),
            to = to.index(),
            floor = self.controller.floor(),
            "phase break"
        );
        self.status = SessionStatus::Break {
            from,
            to,
            ready: false,
        };
        events.push(GameEvent::BreakStarted { from, to });
        if self.config.break_min_ms > 0.0 {
            self.scheduler.arm_break_ready(now_ms + self.config.break_min_ms);
        } else {
            self.status = SessionStatus::Break {
                from,
                to,
                ready: true,
            };
            events.push(GameEvent::BreakReady);
        }
    }

    fn finish(&mut self, aborted: bool, events: &mut Vec<GameEvent>) {
        self.scheduler.cancel();
        self.stimulus = StimulusState::Hidden;
        self.status = SessionStatus::Done;
        let report = self.report(aborted);
        tracing::info!(
            score = report.score,
            trials = report.trials_count,
            aborted,
            "level complete"
        );
        events.push(GameEvent::LevelComplete(report));
    }

    fn report(&self, aborted: bool) -> LevelReport {
        LevelReport {
            reaction_times: self.tracker.reaction_times().to_vec(),
            log: self.log.records().to_vec(),
            score: self.controller.score(),
            trials_count: self.trials_count,
            phase: self.controller.phase(),
            median_rt_ms: self.tracker.median_rt_ms(),
            aborted,
        }
    }

    fn is_exiting_at(&self, at_ms: f64) -> bool {
        self.exiting_until_ms.is_some_and(|until| at_ms < until)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == SessionStatus::Done
    }

    pub fn stimulus(&self) -> &StimulusState {
        &self.stimulus
    }

    /// Whether the last resolved stimulus is still animating out.
    pub fn is_exiting(&self) -> bool {
        self.is_exiting_at(self.clock.now_ms())
    }

    pub fn score(&self) -> f64 {
        self.controller.score()
    }

    pub fn phase(&self) -> LevelPhase {
        self.controller.phase()
    }

    pub fn phase_floor(&self) -> f64 {
        self.controller.floor()
    }

    pub fn phase_target(&self) -> Option<f64> {
        self.controller.current_target()
    }

    pub fn phase_progress(&self) -> f64 {
        self.controller.phase_progress()
    }

    pub fn trials_count(&self) -> usize {
        self.trials_count
    }

    pub fn median_rt_ms(&self) -> f64 {
        self.tracker.median_rt_ms()
    }

    pub fn effective_threshold_ms(&self) -> f64 {
        self.tracker.effective_threshold(self.config.game_difficulty)
    }

    pub fn reaction_times(&self) -> &[f64] {
        self.tracker.reaction_times()
    }

    pub fn log(&self) -> &TrialLog {
        &self.log
    }

    pub fn next_deadline(&self) -> Option<&Deadline<TimerKind>> {
        self.scheduler.next_deadline()
    }

    /// Report of the level so far; final once [`is_done`](Self::is_done).
    pub fn snapshot(&self) -> LevelReport {
        self.report(false)
    }

    pub fn summary(&self) -> PerformanceSummary {
        summarize(
            self.log.records(),
            self.config.population_mean,
            self.config.population_sd,
        )
    }
}
