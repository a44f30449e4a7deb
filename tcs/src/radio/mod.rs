//! The abstracted radio link between remote and base station.
//!
//! A [`Transceiver`] is the hardware driver: pipe addressing, hardware
//! acknowledgment and raw frames. [`RadioLink`] adds the two link modes on top
//! of it and turns frames into [`RadioPacket`]s.

pub mod filter;

use crate::RADIO_BUFFER_SIZE;
use crate::types::address::{DISCOVERY_ADDRESS, RadioAddress};
use crate::types::packet::{FRAME_SIZE, PacketError, ProtocolPhase, RadioPacket};

/// Radio hardware driver.
///
/// All operations are non-blocking, apart from waiting for the hardware acknowledgment of a write.
pub trait Transceiver {
    type Error: core::fmt::Debug;

    /// Listen on `address`, replacing the address listened on before.
    fn open_reading_pipe(&mut self, address: RadioAddress) -> Result<(), Self::Error>;

    /// Transmit one frame to `address`.
    ///
    /// Returns an error if the frame was not acknowledged by the receiver.
    fn write(&mut self, address: RadioAddress, frame: &[u8]) -> Result<(), Self::Error>;

    /// Read one received frame into `buf`, `Ok(None)` if nothing was received.
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// The transceiver failed, or the frame was not acknowledged
    Transceiver,
    Packet(PacketError),
}

impl From<PacketError> for RadioError {
    fn from(e: PacketError) -> Self {
        RadioError::Packet(e)
    }
}

/// Link mode, decides which address the traffic uses and how payloads are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkMode {
    /// Pairing traffic on the well-known discovery address
    Discovery,
    /// Operational traffic on the paired remote's address
    Operational(RadioAddress),
}

impl LinkMode {
    pub fn address(&self) -> RadioAddress {
        match self {
            LinkMode::Discovery => DISCOVERY_ADDRESS,
            LinkMode::Operational(address) => *address,
        }
    }

    pub fn phase(&self) -> ProtocolPhase {
        match self {
            LinkMode::Discovery => ProtocolPhase::Pairing,
            LinkMode::Operational(_) => ProtocolPhase::Operational,
        }
    }
}

/// Which node a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkRole {
    /// The base station listens on the address of its current mode
    Base,
    /// A remote always listens on its own address, acknowledgments of the base arrive there
    Remote(RadioAddress),
}

/// Frames inspected by a single [`RadioLink::receive`] before it gives up on a noisy channel
const MAX_FRAMES_PER_RECEIVE: usize = 16;

pub struct RadioLink<T: Transceiver> {
    transceiver: T,
    role: LinkRole,
    mode: LinkMode,
    buf: [u8; RADIO_BUFFER_SIZE],
}

impl<T: Transceiver> RadioLink<T> {
    /// Create the link and start listening.
    ///
    /// A base starts in discovery mode, a remote in operational mode on its own address.
    pub fn new(transceiver: T, role: LinkRole) -> Self {
        let (mode, listen) = match role {
            LinkRole::Base => (LinkMode::Discovery, DISCOVERY_ADDRESS),
            LinkRole::Remote(own) => (LinkMode::Operational(own), own),
        };
        let mut link = Self {
            transceiver,
            role,
            mode,
            buf: [0; RADIO_BUFFER_SIZE],
        };
        if link.transceiver.open_reading_pipe(listen).is_err() {
            error!("Failed to open reading pipe {:?}", listen);
        }
        link
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    pub fn transceiver_mut(&mut self) -> &mut T {
        &mut self.transceiver
    }

    /// Switch the link mode, only the pairing logic does this.
    pub(crate) fn switch_mode(&mut self, mode: LinkMode) -> Result<(), RadioError> {
        debug!("Radio link mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        if self.role == LinkRole::Base {
            self.transceiver
                .open_reading_pipe(mode.address())
                .map_err(|_| RadioError::Transceiver)?;
        }
        Ok(())
    }

    /// Send a packet to the address of the current mode.
    pub fn send(&mut self, packet: &RadioPacket) -> Result<(), RadioError> {
        self.send_to(self.mode.address(), packet)
    }

    /// Send a packet to `address`, independent of the current mode.
    pub fn send_to(&mut self, address: RadioAddress, packet: &RadioPacket) -> Result<(), RadioError> {
        let mut buf = [0u8; FRAME_SIZE];
        let frame = packet.encode(&mut buf)?;
        self.transceiver.write(address, frame).map_err(|_| {
            trace!("Radio write to {:?} not acknowledged", address);
            RadioError::Transceiver
        })
    }

    /// Receive the next well-formed packet.
    ///
    /// Malformed frames are noise and silently dropped. Returns `None` once nothing is pending.
    pub fn receive(&mut self) -> Option<RadioPacket> {
        for _ in 0..MAX_FRAMES_PER_RECEIVE {
            let len = match self.transceiver.read(&mut self.buf) {
                Ok(Some(len)) => len.min(self.buf.len()),
                Ok(None) => return None,
                Err(_) => {
                    warn!("Radio read error");
                    return None;
                }
            };
            match RadioPacket::decode(&self.buf[..len]) {
                Ok(packet) => return Some(packet),
                Err(e) => trace!("Dropping malformed frame: {:?}", e),
            }
        }
        None
    }
}
