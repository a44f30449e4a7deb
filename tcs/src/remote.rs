//! The handheld remote.
//!
//! It forwards key presses to the base station and reports its battery level
//! with a status packet once per battery sample, which also lets the base
//! station tell whether the remote is around.

use embassy_time::{Instant, Ticker};

use crate::battery::{BatteryMonitor, BatterySensor};
use crate::config::TcsConfig;
use crate::event::RemoteInput;
use crate::input::InputSource;
use crate::output::{Indicator, IndicatorState};
use crate::pairing::{PairingOutcome, RemotePairing};
use crate::radio::filter::SequenceCounter;
use crate::radio::{LinkRole, RadioError, RadioLink, Transceiver};
use crate::types::address::RadioAddress;
use crate::types::packet::{Payload, RadioPacket};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RemoteError {
    /// The remote's own address is empty or the discovery address
    InvalidAddress,
}

pub struct RemoteNode<T: Transceiver, I: Indicator> {
    config: TcsConfig,
    address: RadioAddress,
    link: RadioLink<T>,
    pairing: RemotePairing,
    battery: BatteryMonitor,
    sequence: SequenceCounter,
    indicator: I,
    next_pair_attempt: Option<Instant>,
}

impl<T: Transceiver, I: Indicator> RemoteNode<T, I> {
    /// Create the remote with its own operational address.
    pub fn new(config: TcsConfig, address: RadioAddress, transceiver: T, indicator: I) -> Result<Self, RemoteError> {
        if !address.is_valid_remote() {
            error!("Invalid remote address {:?}", address);
            return Err(RemoteError::InvalidAddress);
        }
        Ok(Self {
            config,
            address,
            link: RadioLink::new(transceiver, LinkRole::Remote(address)),
            pairing: RemotePairing::new(config.pairing, address),
            battery: BatteryMonitor::new(config.battery),
            sequence: SequenceCounter::default(),
            indicator,
            next_pair_attempt: None,
        })
    }

    pub fn address(&self) -> RadioAddress {
        self.address
    }

    pub fn is_pairing(&self) -> bool {
        self.pairing.is_pairing()
    }

    pub fn battery(&self) -> &BatteryMonitor {
        &self.battery
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn link(&self) -> &RadioLink<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut RadioLink<T> {
        &mut self.link
    }

    /// One control loop iteration, returns the pairing outcome if an attempt was made.
    pub fn poll<S, B>(&mut self, now: Instant, input: &mut S, sensor: &mut B) -> Option<PairingOutcome>
    where
        S: InputSource<Event = RemoteInput>,
        B: BatterySensor,
    {
        if let Some(level) = self.battery.poll(now, sensor) {
            if level.is_critical() {
                self.indicator.set_indicator(IndicatorState::BatteryLow);
            }
            if !self.pairing.is_pairing() {
                self.send(Payload::Status).ok();
            }
        }

        while let Some(event) = input.poll_event() {
            debug!("Remote input: {:?}", event);
            match event {
                RemoteInput::Pair => {
                    if !self.pairing.is_pairing() {
                        self.pairing.begin(&mut self.link, &mut self.indicator);
                        self.next_pair_attempt = Some(now);
                    }
                }
                RemoteInput::Cancel if self.pairing.is_pairing() => {
                    self.pairing.abort(&mut self.link, &mut self.indicator);
                    self.next_pair_attempt = None;
                }
                RemoteInput::Cancel => {
                    self.send(Payload::Cancel).ok();
                }
                RemoteInput::Button(code) => {
                    if self.pairing.is_pairing() {
                        debug!("Ignoring button while pairing");
                    } else {
                        self.send(Payload::Button(code)).ok();
                    }
                }
            }
        }

        let due = self.next_pair_attempt?;
        if now < due {
            return None;
        }
        let outcome = self.pairing.attempt(
            &mut self.link,
            &mut self.sequence,
            self.battery.level(),
            &mut self.indicator,
        );
        self.next_pair_attempt = match outcome {
            PairingOutcome::Pending => Some(due + self.config.pairing.retry_interval),
            _ => None,
        };
        Some(outcome)
    }

    /// Send an operational packet to the base station.
    ///
    /// Delivery is best effort, a lost packet is never retransmitted.
    fn send(&mut self, payload: Payload) -> Result<(), RadioError> {
        let packet = RadioPacket::new(self.sequence.next(), payload, self.battery.level(), self.address);
        match self.link.send(&packet) {
            Ok(()) => {
                trace!("Sent {:?}", payload);
                if payload != Payload::Status {
                    self.indicator.set_indicator(IndicatorState::Transmitted);
                }
                Ok(())
            }
            Err(e) => {
                debug!("Packet {:?} not delivered: {:?}", payload, e);
                if payload != Payload::Status {
                    self.indicator.set_indicator(IndicatorState::TransmitFailed);
                }
                Err(e)
            }
        }
    }
}

/// Run the remote's control loop.
pub async fn run_remote<T, I, S, B>(
    config: TcsConfig,
    address: RadioAddress,
    transceiver: T,
    indicator: I,
    mut input: S,
    mut sensor: B,
) -> Result<(), RemoteError>
where
    T: Transceiver,
    I: Indicator,
    S: InputSource<Event = RemoteInput>,
    B: BatterySensor,
{
    let mut remote = RemoteNode::new(config, address, transceiver, indicator)?;
    let mut ticker = Ticker::every(config.timer.tick);
    loop {
        ticker.next().await;
        if let Some(outcome) = remote.poll(Instant::now(), &mut input, &mut sensor) {
            trace!("Pairing attempt: {:?}", outcome);
        }
    }
}
