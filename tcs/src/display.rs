//! Status shown to the operator.

use embassy_time::Duration;

use crate::pairing::PairingStatus;
use crate::target::TargetSet;
use crate::timer::{TimerPhase, TimerSelection};
use crate::types::battery::BatteryLevel;

/// Everything the base station's display shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    pub phase: TimerPhase,
    /// Time left in the current phase
    pub time_left: Duration,
    pub selection: TimerSelection,
    /// Shoot duration of the selection
    pub shoot_duration: Duration,
    /// Enabled targets
    pub targets: TargetSet,
    pub pairing: PairingStatus,
    pub remote_connected: bool,
    /// Last battery level reported by the remote
    pub remote_battery: Option<BatteryLevel>,
    /// False if the persisted config was invalid and defaults are in use
    pub config_valid: bool,
}

/// A display, which only renders when the status changed.
pub trait DisplaySink {
    fn render(&mut self, status: &StatusSnapshot);
}

/// Base station without a display
impl DisplaySink for () {
    fn render(&mut self, _status: &StatusSnapshot) {}
}
