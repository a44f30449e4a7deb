use super::PairingOutcome;
use crate::config::PairingConfig;
use crate::output::{Indicator, IndicatorState};
use crate::radio::filter::SequenceCounter;
use crate::radio::{LinkMode, RadioLink, Transceiver};
use crate::types::address::RadioAddress;
use crate::types::battery::BatteryLevel;
use crate::types::packet::{Payload, ProtocolPhase, RadioPacket};

/// Remote side of the pairing handshake.
pub struct RemotePairing {
    config: PairingConfig,
    own_address: RadioAddress,
    /// Requests sent so far, `None` if not pairing
    attempts: Option<u8>,
}

impl RemotePairing {
    pub fn new(config: PairingConfig, own_address: RadioAddress) -> Self {
        Self {
            config,
            own_address,
            attempts: None,
        }
    }

    pub fn is_pairing(&self) -> bool {
        self.attempts.is_some()
    }

    pub fn begin<T: Transceiver, I: Indicator>(&mut self, link: &mut RadioLink<T>, indicator: &mut I) {
        info!("Pairing with a base station");
        self.attempts = Some(0);
        indicator.set_indicator(IndicatorState::Pairing);
        self.switch(link, LinkMode::Discovery);
    }

    pub fn abort<T: Transceiver, I: Indicator>(&mut self, link: &mut RadioLink<T>, indicator: &mut I) {
        if self.attempts.take().is_some() {
            info!("Pairing aborted");
            indicator.set_indicator(IndicatorState::Idle);
            self.switch(link, LinkMode::Operational(self.own_address));
        }
    }

    /// One pairing attempt, to be called once per retry interval while pairing.
    ///
    /// Checks for the base station's acknowledgment of an earlier request, then sends the next request.
    pub fn attempt<T: Transceiver, I: Indicator>(
        &mut self,
        link: &mut RadioLink<T>,
        sequence: &mut SequenceCounter,
        battery: BatteryLevel,
        indicator: &mut I,
    ) -> PairingOutcome {
        let Some(attempts) = self.attempts else {
            return PairingOutcome::Idle;
        };

        while let Some(packet) = link.receive() {
            if packet.payload(ProtocolPhase::Pairing) == Some(Payload::Pair) {
                info!("Paired with base station {:?}", packet.sender);
                self.attempts = None;
                indicator.set_indicator(IndicatorState::Paired);
                self.switch(link, LinkMode::Operational(self.own_address));
                return PairingOutcome::Paired(packet.sender);
            }
        }

        if attempts >= self.config.max_attempts {
            warn!("No base station acknowledged pairing after {} attempts", attempts);
            self.attempts = None;
            indicator.set_indicator(IndicatorState::PairingFailed);
            self.switch(link, LinkMode::Operational(self.own_address));
            return PairingOutcome::Failed;
        }

        self.attempts = Some(attempts + 1);
        let request = RadioPacket::new(sequence.next(), Payload::Pair, battery, self.own_address);
        if link.send(&request).is_err() {
            debug!("Pairing request {} not acknowledged", attempts + 1);
        }
        PairingOutcome::Pending
    }

    fn switch<T: Transceiver>(&self, link: &mut RadioLink<T>, mode: LinkMode) {
        if let Err(e) = link.switch_mode(mode) {
            error!("Failed to switch radio link: {:?}", e);
        }
    }
}
