//! Events flowing into the control loops, and notifications flowing out of the timer.

use crate::target::TargetChannel;
use crate::timer::{TimerPhase, TimerSelection};
use crate::types::packet::ButtonCode;

/// Event from the base station's own console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    /// Start the selected timer
    Start,
    Cancel,
    /// A timer select button, only selects and never starts
    Button(ButtonCode),
    /// Start listening for a remote to pair with
    PairRemote,
    /// Forget the paired remote
    ClearPairing,
    ToggleTarget(TargetChannel),
    /// Lengthen (positive) or shorten (negative) the custom timer by whole steps
    AdjustCustomTimer(i8),
    /// Erase persisted configuration and fall back to defaults
    ResetStorage,
}

/// Event from the remote's keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteInput {
    /// A timer button, selects and starts on the base station
    Button(ButtonCode),
    Cancel,
    /// Start pairing with a base station
    Pair,
}

/// Control event handled by the [`TimerController`](crate::timer::TimerController).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlEvent {
    Start,
    Cancel,
    Select(TimerSelection),
}

/// Emitted by [`TimerController::tick`](crate::timer::TimerController::tick).
///
/// At most one notification is emitted per tick, a phase change wins over the
/// second and half second marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerNotification {
    PhaseChanged(TimerPhase),
    /// A whole second of the countdown elapsed
    Second,
    /// Half second mark, only emitted while shooting
    HalfSecond,
    /// The end delay expired and the timer is inactive again
    Completed,
}

/// Why a start request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    /// Start is only accepted while inactive
    AlreadyRunning,
    NoTargetsEnabled,
}
