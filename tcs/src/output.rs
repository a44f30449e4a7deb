//! Target outputs and operator indicators.

use embedded_hal::digital::OutputPin;
use strum::{EnumCount, IntoEnumIterator};

use crate::driver::gpio::OutputController;
use crate::target::TargetChannel;

/// What the operator indicator (LED, buzzer) should currently show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorState {
    #[default]
    Idle,
    /// Start delay, the shooter gets ready
    GetReady,
    Shooting,
    /// End delay after the shoot phase
    Ending,
    /// Pairing handshake in progress
    Pairing,
    Paired,
    PairingFailed,
    /// A packet was delivered to the base station
    Transmitted,
    /// A packet was not acknowledged by the base station
    TransmitFailed,
    BatteryLow,
}

pub trait Indicator {
    fn set_indicator(&mut self, state: IndicatorState);
}

/// Drives the target mechanisms.
///
/// Activating a channel raises its target, deactivating turns it away. Both are idempotent.
pub trait OutputDriver: Indicator {
    fn activate(&mut self, channel: TargetChannel);

    fn deactivate(&mut self, channel: TargetChannel);

    fn deactivate_all(&mut self) {
        for channel in TargetChannel::iter() {
            self.deactivate(channel);
        }
    }
}

/// An indicator which only remembers the last state, for nodes that show it elsewhere or not at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateIndicator {
    state: IndicatorState,
}

impl StateIndicator {
    pub fn state(&self) -> IndicatorState {
        self.state
    }
}

impl Indicator for StateIndicator {
    fn set_indicator(&mut self, state: IndicatorState) {
        if self.state != state {
            debug!("Indicator: {:?}", state);
            self.state = state;
        }
    }
}

/// [`OutputDriver`] with one GPIO per target channel.
///
/// Driver stages of some boards invert the logic level, which `low_active` accounts for.
pub struct PinOutputDriver<P: OutputPin> {
    outputs: [OutputController<P>; TargetChannel::COUNT],
    indicator: StateIndicator,
}

impl<P: OutputPin> PinOutputDriver<P> {
    /// Create the driver, all targets start deactivated.
    pub fn new(pins: [P; TargetChannel::COUNT], low_active: bool) -> Self {
        let mut driver = Self {
            outputs: pins.map(|pin| OutputController::new(pin, low_active)),
            indicator: StateIndicator::default(),
        };
        driver.deactivate_all();
        driver
    }

    pub fn is_active(&self, channel: TargetChannel) -> bool {
        self.outputs[channel.index()].is_active()
    }

    pub fn indicator(&self) -> IndicatorState {
        self.indicator.state()
    }

    /// Give back the pins
    pub fn release(self) -> [P; TargetChannel::COUNT] {
        self.outputs.map(|output| output.release())
    }
}

impl<P: OutputPin> Indicator for PinOutputDriver<P> {
    fn set_indicator(&mut self, state: IndicatorState) {
        self.indicator.set_indicator(state);
    }
}

impl<P: OutputPin> OutputDriver for PinOutputDriver<P> {
    fn activate(&mut self, channel: TargetChannel) {
        self.outputs[channel.index()].activate();
    }

    fn deactivate(&mut self, channel: TargetChannel) {
        self.outputs[channel.index()].deactivate();
    }
}
