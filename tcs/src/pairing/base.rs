use embassy_time::Instant;

use super::{PairingOutcome, PairingRecord, PairingStatus};
use crate::config::PairingConfig;
use crate::output::{Indicator, IndicatorState};
use crate::radio::{LinkMode, RadioError, RadioLink, Transceiver};
use crate::storage::ConfigStore;
use crate::types::address::DISCOVERY_ADDRESS;
use crate::types::battery::BatteryLevel;
use crate::types::packet::{Payload, ProtocolPhase, RadioPacket};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle { last_failed: bool },
    Listening { attempts: u8 },
}

/// Base station side of the pairing handshake.
///
/// It owns the in-memory pairing record and is the only one switching the link mode.
pub struct PairingManager {
    config: PairingConfig,
    record: PairingRecord,
    state: State,
}

impl PairingManager {
    pub fn new(config: PairingConfig, record: PairingRecord) -> Self {
        Self {
            config,
            record,
            state: State::Idle { last_failed: false },
        }
    }

    pub fn record(&self) -> &PairingRecord {
        &self.record
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, State::Listening { .. })
    }

    pub fn status(&self) -> PairingStatus {
        match self.state {
            State::Listening { attempts } => PairingStatus::Pairing { attempt: attempts },
            State::Idle { last_failed: true } => PairingStatus::Failed,
            State::Idle { .. } if self.record.is_paired => PairingStatus::Paired,
            State::Idle { .. } => PairingStatus::Unpaired,
        }
    }

    /// Link mode matching the record, operational if paired
    fn idle_mode(&self) -> LinkMode {
        match self.record.address() {
            Some(address) => LinkMode::Operational(address),
            None => LinkMode::Discovery,
        }
    }

    /// Put the link into the mode matching the current record.
    pub fn restore_link<T: Transceiver>(&self, link: &mut RadioLink<T>) -> Result<(), RadioError> {
        link.switch_mode(self.idle_mode())
    }

    /// Start listening for a remote on the discovery address.
    pub fn start_listening<T: Transceiver, I: Indicator>(
        &mut self,
        link: &mut RadioLink<T>,
        indicator: &mut I,
    ) -> Result<(), RadioError> {
        info!("Listening for a remote to pair");
        self.state = State::Listening { attempts: 0 };
        indicator.set_indicator(IndicatorState::Pairing);
        link.switch_mode(LinkMode::Discovery)
    }

    /// Stop listening, the previous pairing stays in place.
    pub fn abort<T: Transceiver, I: Indicator>(&mut self, link: &mut RadioLink<T>, indicator: &mut I) {
        if !self.is_listening() {
            return;
        }
        info!("Pairing aborted");
        self.state = State::Idle { last_failed: false };
        indicator.set_indicator(IndicatorState::Idle);
        if let Err(e) = self.restore_link(link) {
            error!("Failed to restore radio link: {:?}", e);
        }
    }

    /// Forget the paired remote, persisted right away.
    pub fn clear<T: Transceiver>(&mut self, link: &mut RadioLink<T>, store: &mut ConfigStore, now: Instant) {
        info!("Clearing pairing with {:?}", self.record.remote_address);
        self.record = PairingRecord::UNPAIRED;
        self.state = State::Idle { last_failed: false };
        store.commit_pairing(self.record, now);
        if let Err(e) = self.restore_link(link) {
            error!("Failed to restore radio link: {:?}", e);
        }
    }

    /// One listen attempt, to be called once per retry interval while listening.
    ///
    /// Drains the received frames looking for a pairing request. On success the
    /// remote is acknowledged, the record is committed and persisted, and the
    /// link switches to the remote's address. After the last unsuccessful
    /// attempt the previous record and link mode are kept.
    pub fn listen_attempt<T: Transceiver, I: Indicator>(
        &mut self,
        link: &mut RadioLink<T>,
        store: &mut ConfigStore,
        indicator: &mut I,
        now: Instant,
    ) -> PairingOutcome {
        let State::Listening { attempts } = self.state else {
            return PairingOutcome::Idle;
        };

        while let Some(packet) = link.receive() {
            if packet.payload(ProtocolPhase::Pairing) != Some(Payload::Pair) {
                trace!("Ignoring non-pairing frame while pairing");
                continue;
            }
            if !packet.sender.is_valid_remote() {
                warn!("Pairing request with invalid address {:?}", packet.sender);
                continue;
            }
            let candidate = packet.sender;
            let ack = RadioPacket::new(packet.sequence, Payload::Pair, BatteryLevel::FULL, DISCOVERY_ADDRESS);
            if link.send_to(candidate, &ack).is_err() {
                // The remote keeps requesting until it sees an acknowledgment
                debug!("Pairing acknowledgment to {:?} not delivered", candidate);
                continue;
            }

            info!("Paired with remote {:?}", candidate);
            self.record = PairingRecord::paired(candidate);
            self.state = State::Idle { last_failed: false };
            store.commit_pairing(self.record, now);
            // Drop further requests which arrived on the discovery address
            while link.receive().is_some() {}
            if let Err(e) = link.switch_mode(LinkMode::Operational(candidate)) {
                error!("Failed to switch radio link: {:?}", e);
            }
            indicator.set_indicator(IndicatorState::Paired);
            return PairingOutcome::Paired(candidate);
        }

        let attempts = attempts.saturating_add(1);
        if attempts >= self.config.max_attempts {
            warn!("Pairing failed after {} attempts", attempts);
            self.state = State::Idle { last_failed: true };
            if let Err(e) = self.restore_link(link) {
                error!("Failed to restore radio link: {:?}", e);
            }
            indicator.set_indicator(IndicatorState::PairingFailed);
            return PairingOutcome::Failed;
        }
        self.state = State::Listening { attempts };
        PairingOutcome::Pending
    }
}
