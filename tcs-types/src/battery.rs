/// Battery level of the remote on a 0~5 scale.
///
/// 0 means the battery is critically low, 5 means full.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryLevel(u8);

impl BatteryLevel {
    pub const EMPTY: BatteryLevel = BatteryLevel(0);
    pub const FULL: BatteryLevel = BatteryLevel(5);

    /// Returns `None` if `level` is above [`BatteryLevel::FULL`].
    pub const fn new(level: u8) -> Option<Self> {
        if level <= Self::FULL.0 { Some(Self(level)) } else { None }
    }

    pub const fn get(&self) -> u8 {
        self.0
    }

    pub const fn is_critical(&self) -> bool {
        self.0 == Self::EMPTY.0
    }
}

impl Default for BatteryLevel {
    fn default() -> Self {
        Self::FULL
    }
}
