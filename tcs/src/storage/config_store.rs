//! In-memory copy of the persisted configuration.
//!
//! The [`ConfigStore`] is the only writer of persisted state. Operator edits are
//! written back after a quiet period, so that a burst of edits results in one
//! flash write. Pairing changes are written right away.

use embassy_time::{Duration, Instant};

use crate::config::StorageConfig;
use crate::pairing::PairingRecord;
use crate::target::{CUSTOM_TIMER_STEP, TargetChannel, TargetConfig, is_valid_custom_timer};

/// Everything which survives a power cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistedConfig {
    pub targets: TargetConfig,
    pub pairing: PairingRecord,
}

impl PersistedConfig {
    /// Whether the values are in range, a stored config failing this is treated as corrupted
    pub fn is_valid(&self) -> bool {
        !self.targets.enabled.is_empty()
            && is_valid_custom_timer(self.targets.custom_timer)
            && (!self.pairing.is_paired || self.pairing.remote_address.is_valid_remote())
    }
}

/// Rejected configuration edit, the previous value is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// At least one target must stay enabled
    NoTargetsEnabled,
    CustomTimerOutOfRange,
}

/// Trailing debounce of flash writes.
///
/// Every edit moves the deadline to `write_delay` after the edit.
#[derive(Clone, Copy, Debug)]
struct WriteDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl WriteDebouncer {
    fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    fn schedule_now(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub struct ConfigStore {
    config: PersistedConfig,
    /// Whether a valid config was loaded at boot
    valid: bool,
    debouncer: WriteDebouncer,
}

impl ConfigStore {
    /// Create the store from what was loaded from flash.
    ///
    /// A missing or invalid config is replaced by defaults, which are written back after the usual delay.
    pub fn new(loaded: Option<PersistedConfig>, config: &StorageConfig, now: Instant) -> Self {
        let mut debouncer = WriteDebouncer::new(config.write_delay);
        match loaded {
            Some(persisted) if persisted.is_valid() => {
                info!("Loaded config: {:?}", persisted);
                Self {
                    config: persisted,
                    valid: true,
                    debouncer,
                }
            }
            _ => {
                warn!("No valid config in storage, using defaults");
                debouncer.schedule(now);
                Self {
                    config: PersistedConfig::default(),
                    valid: false,
                    debouncer,
                }
            }
        }
    }

    /// Whether the config was loaded from storage, false if defaults are in use
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn config(&self) -> &PersistedConfig {
        &self.config
    }

    pub fn targets(&self) -> &TargetConfig {
        &self.config.targets
    }

    pub fn pairing(&self) -> &PairingRecord {
        &self.config.pairing
    }

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn set_target_enabled(&mut self, channel: TargetChannel, enabled: bool, now: Instant) -> Result<(), ConfigError> {
        let mut targets = self.config.targets.enabled;
        targets.set(channel, enabled);
        if targets.is_empty() {
            return Err(ConfigError::NoTargetsEnabled);
        }
        if targets != self.config.targets.enabled {
            self.config.targets.enabled = targets;
            self.debouncer.schedule(now);
        }
        Ok(())
    }

    /// Toggle a target, returns whether it's enabled now
    pub fn toggle_target(&mut self, channel: TargetChannel, now: Instant) -> Result<bool, ConfigError> {
        let enabled = !self.config.targets.enabled.contains(channel);
        self.set_target_enabled(channel, enabled, now)?;
        Ok(enabled)
    }

    pub fn set_custom_timer(&mut self, duration: Duration, now: Instant) -> Result<(), ConfigError> {
        if !is_valid_custom_timer(duration) {
            return Err(ConfigError::CustomTimerOutOfRange);
        }
        if duration != self.config.targets.custom_timer {
            self.config.targets.custom_timer = duration;
            self.debouncer.schedule(now);
        }
        Ok(())
    }

    /// Adjust the custom timer by `steps` times [`CUSTOM_TIMER_STEP`], returns the new duration
    pub fn adjust_custom_timer(&mut self, steps: i8, now: Instant) -> Result<Duration, ConfigError> {
        let current = self.config.targets.custom_timer.as_micros() as i64;
        let adjusted = current + steps as i64 * CUSTOM_TIMER_STEP.as_micros() as i64;
        if adjusted <= 0 {
            return Err(ConfigError::CustomTimerOutOfRange);
        }
        let duration = Duration::from_micros(adjusted as u64);
        self.set_custom_timer(duration, now)?;
        Ok(duration)
    }

    /// Replace the pairing record, it's written to storage right away.
    pub(crate) fn commit_pairing(&mut self, record: PairingRecord, now: Instant) {
        self.config.pairing = record;
        self.debouncer.schedule_now(now);
    }

    /// Go back to the defaults after the storage was erased.
    pub(crate) fn reset(&mut self) {
        self.config = PersistedConfig::default();
        self.valid = false;
        self.debouncer.deadline = None;
    }

    /// Retry a write which couldn't be handed to the flash task.
    pub(crate) fn defer_write(&mut self, now: Instant) {
        self.debouncer.schedule(now);
    }

    /// Take the config to write, if a write is due.
    pub fn take_due_write(&mut self, now: Instant) -> Option<PersistedConfig> {
        self.debouncer.take_due(now).then_some(self.config)
    }
}
