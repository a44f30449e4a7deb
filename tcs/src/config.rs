use embassy_time::Duration;

/// The config struct for the target control system.
///
/// Both nodes are built from the same config, each uses the parts it needs:
/// 1. `TimerConfig`: tick interval and the fixed delays around the shoot phase, base only.
/// 2. `PairingConfig`: retry bound and interval of the pairing handshake, both nodes.
/// 3. `StorageConfig`: flash region and write debouncing, base only.
/// 4. `BatteryConfig`: battery sampling and level thresholds, remote only.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcsConfig {
    pub timer: TimerConfig,
    pub pairing: PairingConfig,
    pub storage: StorageConfig,
    pub battery: BatteryConfig,
}

/// Config for the shoot timer
#[derive(Clone, Copy, Debug)]
pub struct TimerConfig {
    /// Interval of the control loop tick, all countdowns are expressed in these ticks
    pub tick: Duration,
    /// "Get ready" delay between start and the shoot phase
    pub start_delay: Duration,
    /// Delay after the shoot phase, before the timer becomes inactive again
    pub end_delay: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            start_delay: Duration::from_secs(5),
            end_delay: Duration::from_secs(5),
        }
    }
}

impl TimerConfig {
    /// Convert a duration to whole ticks, truncating any fraction of a tick.
    pub fn ticks(&self, duration: Duration) -> u32 {
        let tick = self.tick.as_ticks().max(1);
        (duration.as_ticks() / tick) as u32
    }
}

/// Config for the pairing handshake
#[derive(Clone, Copy, Debug)]
pub struct PairingConfig {
    /// Number of attempts after which pairing gives up
    pub max_attempts: u8,
    /// Interval between two attempts
    pub retry_interval: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            retry_interval: Duration::from_millis(250),
        }
    }
}

/// Config for storage
#[derive(Clone, Copy, Debug)]
pub struct StorageConfig {
    /// Start address of local storage, MUST BE start of a sector.
    /// If start_addr is set to 0(this is the default value), the last `num_sectors` sectors will be used.
    pub start_addr: usize,
    // Number of sectors used for storage, >= 2.
    pub num_sectors: u8,
    pub clear_storage: bool,
    /// Quiet period after the last configuration edit before it's written to flash
    pub write_delay: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            start_addr: 0,
            num_sectors: 2,
            clear_storage: false,
            write_delay: Duration::from_secs(2),
        }
    }
}

/// Config for the remote's battery monitor
#[derive(Clone, Copy, Debug)]
pub struct BatteryConfig {
    /// Battery voltage reported as level 0
    pub empty_mv: u16,
    /// Battery voltage reported as level 5
    pub full_mv: u16,
    /// Ratio of the voltage divider between battery and ADC pin
    pub divider: u16,
    pub sample_interval: Duration,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            // 2 AA cells, the system runs down to about 2.6v
            empty_mv: 2700,
            full_mv: 3100,
            divider: 4,
            sample_interval: Duration::from_secs(10),
        }
    }
}
