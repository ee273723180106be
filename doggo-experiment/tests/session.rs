use doggo_core::{Congruency, LevelPhase, Outcome, ResponseKey, TrialType};
use doggo_experiment::{
    GameConfig, GameEvent, GameSession, PhaseTargetStrategy, SessionStatus, StimulusState,
    TaskVariant,
};
use doggo_timing::{Clock, ManualClock};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn base_config() -> GameConfig {
    GameConfig {
        min_isi_ms: 1000.0,
        max_isi_ms: 1000.0,
        min_score: 100.0,
        max_score: 200.0,
        game_difficulty: 0.75,
        initial_median_rt_ms: 1000.0,
        stimulus_exit_ms: 250.0,
        ..GameConfig::default()
    }
}

fn session(config: GameConfig) -> (GameSession<ManualClock, StdRng>, ManualClock) {
    let clock = ManualClock::new();
    let session = GameSession::new(config, clock.clone(), StdRng::seed_from_u64(42));
    (session, clock)
}

fn outcomes(events: &[GameEvent]) -> Vec<Outcome> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::TrialResolved { outcome, .. } => Some(*outcome),
            _ => None,
        })
        .collect()
}

/// Advances to the pending onset and returns its events.
fn show_next(session: &mut GameSession<ManualClock, StdRng>, clock: &ManualClock) -> Vec<GameEvent> {
    let due = session.next_deadline().expect("a trial should be armed").due_ms;
    clock.set_ms(due);
    let events = session.poll();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::StimulusOnset { .. })),
        "expected onset, got {events:?}"
    );
    events
}

#[test]
fn fast_response_scores_from_the_initial_median() {
    let (mut s, clock) = session(base_config());
    let events = s.start();
    assert!(matches!(&events[..], [GameEvent::TrialArmed { due_ms, .. }] if *due_ms == 1000.0));

    let onset = show_next(&mut s, &clock);
    let GameEvent::StimulusOnset { trial, .. } = onset[0] else {
        panic!("unexpected {onset:?}");
    };
    assert!((trial.window.threshold_ms - 1333.333).abs() < 0.001);
    assert_eq!(trial.window.max_rt_ms, 2000.0);
    assert_eq!(s.trials_count(), 1);

    let events = s.press_at(ResponseKey::Down, 1200.0);
    let resolved = outcomes(&events);
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].trial_type(), TrialType::Fast);
    assert!((resolved[0].points() - 190.0).abs() < 1e-9);
    assert!((s.score() - 190.0).abs() < 1e-9);
    assert_eq!(s.reaction_times(), &[200.0]);
    assert_eq!(s.median_rt_ms(), 200.0);
    assert!(matches!(events.last(), Some(GameEvent::TrialArmed { due_ms, .. }) if *due_ms == 2200.0));
}

#[test]
fn slow_response_is_admitted_and_earns_nothing() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);

    let events = s.press_at(ResponseKey::Down, 2500.0);
    let resolved = outcomes(&events);
    assert_eq!(
        resolved,
        vec![Outcome::Slow {
            rt_ms: 1500.0,
            points: 0.0,
            admitted: true
        }]
    );
    assert_eq!(s.score(), 0.0);
    assert_eq!(s.reaction_times(), &[1500.0]);
    assert_eq!(s.median_rt_ms(), 1500.0);
}

#[test]
fn early_press_costs_min_score_and_restarts_the_delay() {
    let (mut s, _clock) = session(base_config());
    s.start();

    let events = s.press_at(ResponseKey::Down, 500.0);
    assert_eq!(outcomes(&events), vec![Outcome::Early { points: -100.0 }]);
    assert_eq!(s.score(), 0.0, "score is clamped to the phase floor");
    assert!(s.reaction_times().is_empty());
    assert_eq!(s.median_rt_ms(), 1000.0);
    assert_eq!(s.trials_count(), 0);
    assert_eq!(s.next_deadline().map(|d| d.due_ms), Some(1500.0));

    let record = s.log().last().unwrap();
    assert_eq!(record.trial_type, TrialType::Early);
    assert!(record.timestamp.is_some());
    assert!((record.threshold_ms.unwrap() - 1333.333).abs() < 0.001);
    assert_eq!(record.score_delta, -100.0);
}

#[test]
fn timeout_scores_zero_and_skips_the_median() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);

    clock.set_ms(3000.0);
    let events = s.poll();
    assert_eq!(outcomes(&events), vec![Outcome::Timeout]);
    assert!(s.reaction_times().is_empty());
    assert_eq!(s.score(), 0.0);

    let record = s.log().last().unwrap();
    assert_eq!(record.rt_ms, None);
    assert_eq!(record.timestamp, None);
    assert_eq!(record.trial_number, 1);
}

#[test]
fn late_press_cannot_beat_its_own_timeout() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);

    let events = s.press_at(ResponseKey::Down, 3100.0);
    assert_eq!(outcomes(&events), vec![Outcome::Timeout]);
    assert_eq!(s.log().len(), 1);
}

#[test]
fn press_before_any_poll_measures_from_the_scheduled_onset() {
    let (mut s, _clock) = session(base_config());
    s.start();
    assert_eq!(s.next_deadline().unwrap().due_ms, 1000.0);

    let events = s.press_at(ResponseKey::Down, 1200.0);
    let resolved = outcomes(&events);
    let [Outcome::Fast { rt_ms, points, .. }] = resolved[..] else {
        panic!("unexpected {events:?}");
    };
    assert_eq!(rt_ms, 200.0);
    assert!((points - 190.0).abs() < 1e-9);
    assert_eq!(s.reaction_times(), &[200.0]);
    assert_eq!(s.median_rt_ms(), 200.0);

    // The tightened window still admits a quick response.
    let onset = s.next_deadline().unwrap().due_ms;
    let events = s.press_at(ResponseKey::Down, onset + 150.0);
    assert_eq!(outcomes(&events)[0].trial_type(), TrialType::Fast);
    assert_eq!(s.reaction_times(), &[200.0, 150.0]);
}

#[test]
fn late_callback_keeps_the_scheduled_onset() {
    let (mut s, clock) = session(base_config());
    s.start();
    let onset = *s.next_deadline().unwrap();
    clock.set_ms(1800.0);

    let events = s.fire(onset.token);
    let GameEvent::StimulusOnset { trial, .. } = events[0] else {
        panic!("unexpected {events:?}");
    };
    assert_eq!(trial.window.onset_ms, 1000.0);
    assert_eq!(trial.window.closes_at_ms(), 3000.0);
}

#[test]
fn press_on_the_closing_instant_is_a_slow_response() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);

    let events = s.press_at(ResponseKey::Down, 3000.0);
    assert_eq!(
        outcomes(&events),
        vec![Outcome::Slow {
            rt_ms: 2000.0,
            points: 0.0,
            admitted: true
        }]
    );
    assert_eq!(s.reaction_times(), &[2000.0]);
}

#[test]
fn cancelled_timers_never_fire() {
    let (mut s, clock) = session(base_config());
    let armed = s.start();
    let GameEvent::TrialArmed { token: stale, .. } = armed[0] else {
        panic!("unexpected {armed:?}");
    };

    s.press_at(ResponseKey::Down, 200.0);
    clock.set_ms(5000.0);
    assert!(s.fire(stale).is_empty());
    assert_eq!(s.trials_count(), 0);

    let fresh = *s.next_deadline().unwrap();
    let events = s.fire(fresh.token);
    let GameEvent::StimulusOnset { timeout_token, .. } = events[0] else {
        panic!("unexpected {events:?}");
    };

    s.press_at(ResponseKey::Down, fresh.due_ms + 300.0);
    assert!(s.fire(timeout_token).is_empty(), "timeout was cancelled by the response");
    assert_eq!(s.log().len(), 2);
}

#[test]
fn presses_during_the_exit_animation_are_ignored() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);
    s.press_at(ResponseKey::Down, 1200.0);

    clock.set_ms(1300.0);
    assert!(s.is_exiting());
    assert!(s.press_at(ResponseKey::Down, 1300.0).is_empty());

    let events = s.press_at(ResponseKey::Down, 1500.0);
    assert_eq!(outcomes(&events)[0].trial_type(), TrialType::Early);
}

#[test]
fn keys_outside_the_task_are_ignored() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);
    assert!(s.press_at(ResponseKey::Left, 1100.0).is_empty());
    assert!(s.stimulus().is_visible());
    assert!(s.log().is_empty());
}

#[test]
fn directional_wrong_key_is_an_error() {
    let config = GameConfig {
        task: TaskVariant::Directional {
            conflict_proportion: 1.0,
        },
        ..base_config()
    };
    let (mut s, clock) = session(config);
    s.start();
    let onset = show_next(&mut s, &clock);
    let GameEvent::StimulusOnset { trial, .. } = onset[0] else {
        panic!("unexpected {onset:?}");
    };
    let region = trial.stimulus.region().unwrap();

    // The stimulus sits opposite to the side it asks for.
    let events = s.press_at(region.into(), 1300.0);
    let resolved = outcomes(&events);
    assert_eq!(
        resolved,
        vec![Outcome::Error {
            rt_ms: 300.0,
            points: -50.0
        }]
    );
    assert!(s.reaction_times().is_empty());
    let record = s.log().last().unwrap();
    assert_eq!(record.congruency, Some(Congruency::Incongruent));
    assert_eq!(record.region, Some(region));
    assert_eq!(record.direction, Some(region.opposite()));
}

#[test]
fn three_phases_with_breaks_then_done() {
    let config = GameConfig {
        trials_number: 3,
        min_trials_per_phase: 0,
        phase_target_strategy: PhaseTargetStrategy::Fixed,
        ..base_config()
    };
    let (mut s, clock) = session(config);
    s.start();

    for (from, to) in [
        (LevelPhase::First, LevelPhase::Second),
        (LevelPhase::Second, LevelPhase::Third),
    ] {
        show_next(&mut s, &clock);
        let at = clock.now_ms() + 100.0;
        let events = s.press_at(ResponseKey::Down, at);
        assert!(events.contains(&GameEvent::BreakStarted { from, to }));
        assert!(events.contains(&GameEvent::BreakReady));
        assert_eq!(s.phase(), to);
        assert!(s.next_deadline().is_none(), "timers are frozen during a break");
        assert!(s.press(ResponseKey::Down).is_empty());

        clock.advance_ms(60_000.0);
        assert!(s.poll().is_empty());
        let resumed = s.resume();
        assert_eq!(resumed[0], GameEvent::BreakResumed { phase: to });
        assert_eq!(s.status(), SessionStatus::Running);
    }

    show_next(&mut s, &clock);
    let at = clock.now_ms() + 100.0;
    let events = s.press_at(ResponseKey::Down, at);
    let Some(GameEvent::LevelComplete(report)) = events.last() else {
        panic!("expected level end, got {events:?}");
    };
    assert!(!report.aborted);
    assert_eq!(report.phase, LevelPhase::Third);
    assert_eq!(report.trials_count, 3);
    assert_eq!(report.log.len(), 3);
    assert_eq!(report.reaction_times, vec![100.0; 3]);
    assert!(s.is_done());

    clock.advance_ms(10_000.0);
    assert!(s.poll().is_empty());
    assert!(s.press(ResponseKey::Down).is_empty());
    assert!(s.resume().is_empty());
    assert!(s.start().is_empty());
}

#[test]
fn break_waits_for_its_minimum_duration() {
    let config = GameConfig {
        trials_number: 3,
        min_trials_per_phase: 0,
        phase_target_strategy: PhaseTargetStrategy::Fixed,
        break_min_ms: 2000.0,
        ..base_config()
    };
    let (mut s, clock) = session(config);
    s.start();
    show_next(&mut s, &clock);
    let events = s.press_at(ResponseKey::Down, 1100.0);
    assert!(!events.contains(&GameEvent::BreakReady));
    assert!(s.resume().is_empty());

    clock.set_ms(3100.0);
    assert_eq!(s.poll(), vec![GameEvent::BreakReady]);
    assert!(!s.resume().is_empty());
}

#[test]
fn abort_hands_off_the_partial_report() {
    let (mut s, clock) = session(base_config());
    s.start();
    let onset = show_next(&mut s, &clock);
    let GameEvent::StimulusOnset { timeout_token, .. } = onset[0] else {
        panic!("unexpected {onset:?}");
    };

    let events = s.abort();
    let [GameEvent::LevelComplete(report)] = &events[..] else {
        panic!("unexpected {events:?}");
    };
    assert!(report.aborted);
    assert_eq!(report.trials_count, 1);
    assert!(report.log.is_empty());
    assert_eq!(*s.stimulus(), StimulusState::Hidden);

    clock.set_ms(10_000.0);
    assert!(s.fire(timeout_token).is_empty());
    assert!(s.abort().is_empty());
}

#[test]
fn record_keeps_the_threshold_snapshotted_at_onset() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);
    s.press_at(ResponseKey::Down, 1200.0);
    let first = s.log().last().unwrap().clone();
    assert!((first.threshold_ms.unwrap() - 1333.333).abs() < 0.001);
    assert!((s.effective_threshold_ms() - 266.666).abs() < 0.001);

    show_next(&mut s, &clock);
    let at = clock.now_ms() + 100.0;
    s.press_at(ResponseKey::Down, at);
    let second = s.log().last().unwrap();
    assert!((second.threshold_ms.unwrap() - 266.666).abs() < 0.001);
    assert_eq!(second.trial_number, 2);
}

#[test]
fn summary_reflects_the_log() {
    let (mut s, clock) = session(base_config());
    s.start();
    show_next(&mut s, &clock);
    s.press_at(ResponseKey::Down, 1400.0);
    show_next(&mut s, &clock);
    let closes = clock.now_ms() + s.median_rt_ms() * 2.0;
    clock.set_ms(closes);
    s.poll();

    let summary = s.summary();
    assert_eq!(summary.presented, 2);
    assert_eq!(summary.correct, 1);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.mean_rt_ms, Some(400.0));
    assert_eq!(summary.ies, Some(800.0));
    assert_eq!(summary.z_score, Some(3.0));

    let json = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(json["log"][1]["rt_ms"], "NA");
}

#[test]
fn results_bundle_carries_report_and_summary() {
    let config = base_config();
    let (mut s, clock) = session(config.clone());
    s.start();
    show_next(&mut s, &clock);
    s.press_at(ResponseKey::Down, clock.now_ms() + 300.0);
    let report = s
        .abort()
        .into_iter()
        .find_map(|e| match e {
            GameEvent::LevelComplete(report) => Some(report),
            _ => None,
        })
        .expect("abort should complete the level");

    let results = report.into_results(&config);
    assert!(results.report.aborted);
    assert_eq!(results.summary.correct, 1);

    let mut buf = Vec::new();
    results.write_json(&mut buf).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(json["report"]["trials_count"], 1);
    assert_eq!(json["summary"]["mean_rt_ms"], 300.0);
}
