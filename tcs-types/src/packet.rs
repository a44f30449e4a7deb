use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter};

use crate::address::RadioAddress;
use crate::battery::BatteryLevel;

/// Payload byte reserved for the pairing handshake.
///
/// It is only recognized while pairing, and never collides with an operational code.
pub const PAIR_SENTINEL: u8 = 0xF0;
/// Payload byte of a cancel request
pub const CANCEL_CODE: u8 = 17;
/// Payload byte of a status-only packet, which carries the battery level and nothing else
pub const STATUS_CODE: u8 = 0;
/// Number of timer buttons, button codes are `1..=BUTTON_COUNT`
pub const BUTTON_COUNT: u8 = 16;

/// Size of an encoded [`RadioPacket`]
pub const FRAME_SIZE: usize = RadioPacket::POSTCARD_MAX_SIZE;

/// Code of a timer button, in range `1..=16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonCode(u8);

impl ButtonCode {
    pub const fn new(code: u8) -> Option<Self> {
        if code >= 1 && code <= BUTTON_COUNT {
            Some(Self(code))
        } else {
            None
        }
    }

    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based index of the button
    pub const fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

/// Which part of the protocol a packet is interpreted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumCount)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolPhase {
    Pairing,
    Operational,
}

/// Meaning of a packet's payload byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    /// Battery report only
    Status,
    /// A timer button was pressed on the remote
    Button(ButtonCode),
    /// The cancel button was pressed on the remote
    Cancel,
    /// Pairing request (remote to base) or acknowledgment (base to remote)
    Pair,
}

impl Payload {
    pub const fn to_byte(self) -> u8 {
        match self {
            Payload::Status => STATUS_CODE,
            Payload::Button(code) => code.get(),
            Payload::Cancel => CANCEL_CODE,
            Payload::Pair => PAIR_SENTINEL,
        }
    }

    /// Decode a payload byte.
    ///
    /// Every byte has at most one meaning per phase: the sentinel is only valid
    /// while pairing, button/cancel/status codes only in operational traffic.
    pub fn decode(byte: u8, phase: ProtocolPhase) -> Option<Self> {
        match phase {
            ProtocolPhase::Pairing => (byte == PAIR_SENTINEL).then_some(Payload::Pair),
            ProtocolPhase::Operational => match byte {
                STATUS_CODE => Some(Payload::Status),
                CANCEL_CODE => Some(Payload::Cancel),
                code => ButtonCode::new(code).map(Payload::Button),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    SerializeError,
    DeserializeError,
    /// Received frame doesn't have the fixed frame size
    BadLength(usize),
    /// Battery slot is out of the 0~5 range
    BadBatteryLevel(u8),
}

/// The radio frame exchanged between remote and base station.
///
/// Every field is a byte or a byte array, so the postcard encoding has a fixed size of [`FRAME_SIZE`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioPacket {
    /// Incremented by the remote for every packet it sends, wrapping at 256
    pub sequence: u8,
    payload: u8,
    battery: u8,
    /// Address of the sending node
    pub sender: RadioAddress,
}

impl RadioPacket {
    pub fn new(sequence: u8, payload: Payload, battery: BatteryLevel, sender: RadioAddress) -> Self {
        Self {
            sequence,
            payload: payload.to_byte(),
            battery: battery.get(),
            sender,
        }
    }

    pub fn payload_byte(&self) -> u8 {
        self.payload
    }

    pub fn payload(&self, phase: ProtocolPhase) -> Option<Payload> {
        Payload::decode(self.payload, phase)
    }

    pub fn battery(&self) -> BatteryLevel {
        BatteryLevel::new(self.battery).unwrap_or(BatteryLevel::EMPTY)
    }

    /// Encode the packet into `buf`, returns the encoded frame.
    pub fn encode<'a>(&self, buf: &'a mut [u8; FRAME_SIZE]) -> Result<&'a [u8], PacketError> {
        postcard::to_slice(self, buf)
            .map(|frame| &*frame)
            .map_err(|_| PacketError::SerializeError)
    }

    /// Decode a received frame.
    ///
    /// Anything that isn't exactly one well-formed frame is rejected, which is how noise is told apart from traffic.
    pub fn decode(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() != FRAME_SIZE {
            return Err(PacketError::BadLength(frame.len()));
        }
        let packet: RadioPacket = postcard::from_bytes(frame).map_err(|_| PacketError::DeserializeError)?;
        if BatteryLevel::new(packet.battery).is_none() {
            return Err(PacketError::BadBatteryLevel(packet.battery));
        }
        Ok(packet)
    }
}
