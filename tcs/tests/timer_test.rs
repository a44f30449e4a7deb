mod common;

use embassy_time::{Duration, Instant};
use tcs::base::BaseStation;
use tcs::config::{TcsConfig, TimerConfig};
use tcs::event::{InputEvent, StartError, TimerNotification};
use tcs::input::NoInput;
use tcs::output::IndicatorState;
use tcs::pairing::PairingRecord;
use tcs::storage::PersistedConfig;
use tcs::target::{TargetChannel, TargetConfig, TargetSet};
use tcs::timer::{TimerController, TimerPhase, TimerSelection};
use tcs::types::packet::ButtonCode;

use crate::common::*;

fn targets_1_and_3() -> TargetConfig {
    TargetConfig {
        enabled: TargetSet::from_flags([true, false, true]),
        custom_timer: Duration::from_millis(7500),
    }
}

#[test]
fn custom_run_with_two_targets() {
    let air = Air::default();
    let loaded = PersistedConfig {
        targets: targets_1_and_3(),
        pairing: PairingRecord::UNPAIRED,
    };
    let mut base = BaseStation::new(
        TcsConfig::default(),
        air.radio(),
        RecordingOutputs::default(),
        (),
        Some(loaded),
        Instant::from_millis(0),
    );

    let custom = ButtonCode::new(16).unwrap();
    let mut input = events([InputEvent::Button(custom), InputEvent::Start]);
    base.poll(Instant::from_millis(0), &mut input);
    assert_eq!(base.timer().selection(), TimerSelection::Custom);
    assert_eq!(base.timer().phase(), TimerPhase::StartDelay);

    let mut transitions = Vec::new();
    let mut no_input = NoInput::new();
    for tick in 1..=2000u64 {
        let notification = base.poll(Instant::from_millis(tick * 10), &mut no_input);
        if let Some(n @ (TimerNotification::PhaseChanged(_) | TimerNotification::Completed)) = notification {
            transitions.push((tick, n, base.outputs().active));
        }
    }

    assert_eq!(
        transitions,
        vec![
            (500, TimerNotification::PhaseChanged(TimerPhase::Shooting), [true, false, true]),
            (1250, TimerNotification::PhaseChanged(TimerPhase::EndDelay), [false, false, false]),
            (1750, TimerNotification::Completed, [false, false, false]),
        ]
    );
    assert_eq!(
        base.outputs().activations,
        vec![TargetChannel::Target1, TargetChannel::Target3]
    );
    assert_eq!(base.outputs().indicator, IndicatorState::Idle);
}

#[test]
fn cancel_from_every_phase_deactivates_all_outputs() {
    for (ticks, phase) in [
        (0, TimerPhase::StartDelay),
        (500, TimerPhase::Shooting),
        (800, TimerPhase::EndDelay),
    ] {
        let mut timer = TimerController::new(TimerConfig::default());
        let mut outputs = RecordingOutputs::default();
        timer.start(&TargetConfig::default(), &mut outputs).unwrap();
        for _ in 0..ticks {
            timer.tick(&mut outputs);
        }
        assert_eq!(timer.phase(), phase);

        assert!(timer.cancel(&mut outputs));
        assert_eq!(timer.phase(), TimerPhase::Inactive);
        assert_eq!(outputs.active_count(), 0);
        assert_eq!(timer.tick(&mut outputs), None);

        // Cancel is idempotent
        assert!(!timer.cancel(&mut outputs));
        assert_eq!(timer.phase(), TimerPhase::Inactive);
    }
}

#[test]
fn start_is_rejected_while_running_or_without_targets() {
    let mut timer = TimerController::new(TimerConfig::default());
    let mut outputs = RecordingOutputs::default();
    let no_targets = TargetConfig {
        enabled: TargetSet::NONE,
        ..Default::default()
    };
    assert_eq!(timer.start(&no_targets, &mut outputs), Err(StartError::NoTargetsEnabled));
    assert_eq!(timer.phase(), TimerPhase::Inactive);

    timer.start(&TargetConfig::default(), &mut outputs).unwrap();
    for _ in 0..600 {
        timer.tick(&mut outputs);
    }
    assert_eq!(
        timer.start(&TargetConfig::default(), &mut outputs),
        Err(StartError::AlreadyRunning)
    );
    assert_eq!(timer.phase(), TimerPhase::Shooting);
    assert_eq!(outputs.active_count(), 3);
}

#[test]
fn targets_are_captured_at_start() {
    let mut timer = TimerController::new(TimerConfig::default());
    let mut outputs = RecordingOutputs::default();
    let mut targets = targets_1_and_3();
    timer.select(TimerSelection::Custom);
    timer.start(&targets, &mut outputs).unwrap();

    // Editing the config mid-run doesn't change the run
    targets.enabled = TargetSet::ALL;
    targets.custom_timer = Duration::from_secs(1);
    for _ in 0..500 {
        timer.tick(&mut outputs);
    }
    assert_eq!(outputs.active, [true, false, true]);
    assert_eq!(timer.time_left(), 750);
}

#[test]
fn short_tick_configs_truncate_fractional_durations() {
    let config = TimerConfig {
        tick: Duration::from_millis(20),
        ..Default::default()
    };
    let mut timer = TimerController::new(config);
    let mut outputs = RecordingOutputs::default();
    let targets = TargetConfig {
        custom_timer: Duration::from_millis(7510),
        ..Default::default()
    };
    timer.select(TimerSelection::Custom);
    timer.start(&targets, &mut outputs).unwrap();
    assert_eq!(timer.time_left(), 250);
    for _ in 0..250 {
        timer.tick(&mut outputs);
    }
    assert_eq!(timer.phase(), TimerPhase::Shooting);
    // 7510ms / 20ms = 375.5 ticks
    assert_eq!(timer.time_left(), 375);
}
