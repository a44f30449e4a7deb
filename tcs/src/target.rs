//! Target output channels and their persisted configuration.

use embassy_time::Duration;
use strum::{EnumCount, EnumIter, FromRepr, IntoEnumIterator};

/// Longest custom shoot duration accepted
pub const MAX_CUSTOM_TIMER: Duration = Duration::from_secs(999);
/// Step of a single custom timer adjustment
pub const CUSTOM_TIMER_STEP: Duration = Duration::from_millis(500);
/// Custom shoot duration used when nothing valid is stored
pub const DEFAULT_CUSTOM_TIMER: Duration = Duration::from_millis(7500);

/// A target output channel, each one drives one target mechanism.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumCount, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TargetChannel {
    Target1 = 0,
    Target2 = 1,
    Target3 = 2,
}

impl TargetChannel {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Set of target channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetSet([bool; TargetChannel::COUNT]);

impl TargetSet {
    pub const ALL: TargetSet = TargetSet([true; TargetChannel::COUNT]);
    pub const NONE: TargetSet = TargetSet([false; TargetChannel::COUNT]);

    pub const fn from_flags(flags: [bool; TargetChannel::COUNT]) -> Self {
        Self(flags)
    }

    pub const fn flags(&self) -> [bool; TargetChannel::COUNT] {
        self.0
    }

    pub fn contains(&self, channel: TargetChannel) -> bool {
        self.0[channel.index()]
    }

    pub fn set(&mut self, channel: TargetChannel, enabled: bool) {
        self.0[channel.index()] = enabled;
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&enabled| enabled)
    }

    /// Iterate over channels in the set
    pub fn iter(&self) -> impl Iterator<Item = TargetChannel> + '_ {
        TargetChannel::iter().filter(|c| self.contains(*c))
    }
}

/// Operator configuration of the targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetConfig {
    pub enabled: TargetSet,
    pub custom_timer: Duration,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            enabled: TargetSet::ALL,
            custom_timer: DEFAULT_CUSTOM_TIMER,
        }
    }
}

/// Whether `duration` is acceptable as custom shoot duration.
///
/// It must be a whole number of [`CUSTOM_TIMER_STEP`]s in `(0, MAX_CUSTOM_TIMER]`,
/// anything else can't be persisted without loss.
pub fn is_valid_custom_timer(duration: Duration) -> bool {
    duration > Duration::from_ticks(0)
        && duration <= MAX_CUSTOM_TIMER
        && duration.as_ticks() % CUSTOM_TIMER_STEP.as_ticks() == 0
}
