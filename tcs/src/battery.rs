//! Battery level of the remote.

use embassy_time::Instant;

use crate::config::BatteryConfig;
use crate::types::battery::BatteryLevel;

/// Reads the battery voltage.
pub trait BatterySensor {
    /// Voltage at the ADC pin in millivolts, i.e. the battery voltage divided by the divider ratio.
    ///
    /// `None` if the conversion failed.
    fn read_millivolts(&mut self) -> Option<u16>;
}

pub struct BatteryMonitor {
    config: BatteryConfig,
    level: BatteryLevel,
    next_sample: Option<Instant>,
}

impl BatteryMonitor {
    pub fn new(config: BatteryConfig) -> Self {
        Self {
            config,
            level: BatteryLevel::FULL,
            next_sample: None,
        }
    }

    /// Level of the last sample, full before the first one
    pub fn level(&self) -> BatteryLevel {
        self.level
    }

    /// Convert a pin voltage to a battery level.
    ///
    /// The level is interpolated linearly between the empty and full voltages and clamped to 0~5.
    pub fn level_for(&self, pin_mv: u16) -> BatteryLevel {
        let battery_mv = pin_mv as u32 * self.config.divider as u32;
        let empty = self.config.empty_mv as u32;
        let full = self.config.full_mv as u32;
        if battery_mv >= full {
            BatteryLevel::FULL
        } else if battery_mv <= empty {
            BatteryLevel::EMPTY
        } else {
            // full > battery_mv > empty here, so the span isn't zero
            let level = (battery_mv - empty) * BatteryLevel::FULL.get() as u32 / (full - empty);
            BatteryLevel::new(level as u8).unwrap_or(BatteryLevel::FULL)
        }
    }

    /// Take a sample, a failed read keeps the previous level.
    pub fn sample<S: BatterySensor>(&mut self, sensor: &mut S) -> BatteryLevel {
        let Some(pin_mv) = sensor.read_millivolts() else {
            warn!("Battery read failed");
            return self.level;
        };
        let level = self.level_for(pin_mv);
        trace!("Battery pin {}mV, level {}", pin_mv, level.get());
        if level != self.level {
            if level.is_critical() {
                warn!("Battery is critically low");
            } else {
                debug!("Battery level {}", level.get());
            }
            self.level = level;
        }
        level
    }

    /// Sample if the sample interval elapsed, the first call always samples.
    pub fn poll<S: BatterySensor>(&mut self, now: Instant, sensor: &mut S) -> Option<BatteryLevel> {
        match self.next_sample {
            Some(next) if now < next => None,
            _ => {
                self.next_sample = Some(now + self.config.sample_interval);
                Some(self.sample(sensor))
            }
        }
    }
}
