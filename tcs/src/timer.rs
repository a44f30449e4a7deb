//! The shoot timer.
//!
//! A run goes through `Inactive -> StartDelay -> Shooting -> EndDelay -> Inactive`.
//! Targets are activated when shooting begins and deactivated when it ends,
//! cancel returns to `Inactive` from any phase with every output deactivated.
//!
//! All countdowns are in control loop ticks, [`TimerController::tick`] must be
//! called exactly once per tick.

use embassy_time::Duration;

use crate::config::TimerConfig;
use crate::event::{StartError, TimerNotification};
use crate::output::{IndicatorState, OutputDriver};
use crate::target::{TargetConfig, TargetSet};
use crate::types::packet::ButtonCode;

/// Shoot durations selectable by the timer buttons, in milliseconds
pub const PRESET_TIMERS_MS: [u32; 15] = [
    3_000, 4_000, 6_000, 8_000, 10_000, 12_000, 15_000, 20_000, 25_000, 35_000, 90_000, 150_000, 165_000, 210_000,
    300_000,
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerPhase {
    #[default]
    Inactive,
    StartDelay,
    Shooting,
    EndDelay,
}

impl TimerPhase {
    pub fn is_active(&self) -> bool {
        *self != TimerPhase::Inactive
    }
}

/// Which shoot duration the next run uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerSelection {
    /// Index into [`PRESET_TIMERS_MS`]
    Preset(u8),
    /// The operator adjustable custom duration
    Custom,
}

impl Default for TimerSelection {
    fn default() -> Self {
        TimerSelection::Preset(0)
    }
}

impl From<ButtonCode> for TimerSelection {
    /// Buttons 1~15 select the presets in order, the last button selects the custom timer
    fn from(code: ButtonCode) -> Self {
        if code.index() < PRESET_TIMERS_MS.len() {
            TimerSelection::Preset(code.index() as u8)
        } else {
            TimerSelection::Custom
        }
    }
}

impl TimerSelection {
    /// Shoot duration of this selection. An out of range preset resolves to the first preset.
    pub fn duration(&self, custom: Duration) -> Duration {
        match self {
            TimerSelection::Preset(index) => {
                let ms = PRESET_TIMERS_MS.get(*index as usize).unwrap_or(&PRESET_TIMERS_MS[0]);
                Duration::from_millis(*ms as u64)
            }
            TimerSelection::Custom => custom,
        }
    }
}

pub struct TimerController {
    phase: TimerPhase,
    /// Ticks left in the current phase
    time_left: u32,
    selection: TimerSelection,
    /// Shoot phase length of the current run, resolved at start
    shoot_ticks: u32,
    /// Targets of the current run, snapshotted at start
    active_targets: TargetSet,
    start_delay_ticks: u32,
    end_delay_ticks: u32,
    ticks_per_second: u32,
    ticks_per_half_second: u32,
    config: TimerConfig,
}

impl TimerController {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            phase: TimerPhase::Inactive,
            time_left: 0,
            selection: TimerSelection::default(),
            shoot_ticks: 0,
            active_targets: TargetSet::NONE,
            start_delay_ticks: config.ticks(config.start_delay),
            end_delay_ticks: config.ticks(config.end_delay),
            ticks_per_second: config.ticks(Duration::from_secs(1)),
            ticks_per_half_second: config.ticks(Duration::from_millis(500)),
            config,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// Ticks left in the current phase, 0 while inactive
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn time_left_duration(&self) -> Duration {
        self.config.tick * self.time_left
    }

    pub fn selection(&self) -> TimerSelection {
        self.selection
    }

    /// Targets of the current run, empty while inactive
    pub fn active_targets(&self) -> TargetSet {
        self.active_targets
    }

    /// Select the shoot duration for the next run. Ignored unless inactive.
    pub fn select(&mut self, selection: TimerSelection) -> bool {
        if self.phase.is_active() {
            debug!("Ignoring timer selection while {:?}", self.phase);
            return false;
        }
        self.selection = selection;
        true
    }

    /// Start a run with the current selection.
    ///
    /// The enabled targets and the shoot duration are captured here, editing the
    /// configuration during a run doesn't affect it.
    pub fn start<O: OutputDriver>(&mut self, targets: &TargetConfig, outputs: &mut O) -> Result<(), StartError> {
        if self.phase.is_active() {
            return Err(StartError::AlreadyRunning);
        }
        if targets.enabled.is_empty() {
            return Err(StartError::NoTargetsEnabled);
        }
        self.active_targets = targets.enabled;
        self.shoot_ticks = self.config.ticks(self.selection.duration(targets.custom_timer));
        self.enter(TimerPhase::StartDelay, outputs);
        info!(
            "Timer started: {:?}, {} shoot ticks, targets {:?}",
            self.selection, self.shoot_ticks, self.active_targets
        );
        Ok(())
    }

    /// Cancel the run from any phase, all outputs end up deactivated.
    ///
    /// Returns false if there was nothing to cancel.
    pub fn cancel<O: OutputDriver>(&mut self, outputs: &mut O) -> bool {
        if !self.phase.is_active() {
            return false;
        }
        info!("Timer cancelled during {:?}", self.phase);
        outputs.deactivate_all();
        self.phase = TimerPhase::Inactive;
        self.time_left = 0;
        self.active_targets = TargetSet::NONE;
        outputs.set_indicator(IndicatorState::Idle);
        true
    }

    /// Advance the countdown by one tick.
    pub fn tick<O: OutputDriver>(&mut self, outputs: &mut O) -> Option<TimerNotification> {
        if !self.phase.is_active() {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            return Some(match self.phase {
                TimerPhase::StartDelay => {
                    self.enter(TimerPhase::Shooting, outputs);
                    TimerNotification::PhaseChanged(TimerPhase::Shooting)
                }
                TimerPhase::Shooting => {
                    self.enter(TimerPhase::EndDelay, outputs);
                    TimerNotification::PhaseChanged(TimerPhase::EndDelay)
                }
                _ => {
                    self.enter(TimerPhase::Inactive, outputs);
                    TimerNotification::Completed
                }
            });
        }

        if is_mark(self.time_left, self.ticks_per_second) {
            Some(TimerNotification::Second)
        } else if self.phase == TimerPhase::Shooting && is_mark(self.time_left, self.ticks_per_half_second) {
            Some(TimerNotification::HalfSecond)
        } else {
            None
        }
    }

    fn enter<O: OutputDriver>(&mut self, phase: TimerPhase, outputs: &mut O) {
        debug!("Timer phase {:?} -> {:?}", self.phase, phase);
        match phase {
            TimerPhase::StartDelay => {
                self.time_left = self.start_delay_ticks;
                outputs.set_indicator(IndicatorState::GetReady);
            }
            TimerPhase::Shooting => {
                self.time_left = self.shoot_ticks;
                for channel in self.active_targets.iter() {
                    outputs.activate(channel);
                }
                outputs.set_indicator(IndicatorState::Shooting);
            }
            TimerPhase::EndDelay => {
                self.time_left = self.end_delay_ticks;
                for channel in self.active_targets.iter() {
                    outputs.deactivate(channel);
                }
                outputs.set_indicator(IndicatorState::Ending);
            }
            TimerPhase::Inactive => {
                self.time_left = 0;
                self.active_targets = TargetSet::NONE;
                outputs.set_indicator(IndicatorState::Idle);
            }
        }
        self.phase = phase;
    }
}

fn is_mark(time_left: u32, period: u32) -> bool {
    period != 0 && time_left % period == 0
}
