use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

/// Length of a radio address in bytes
pub const ADDRESS_LEN: usize = 6;

/// Address the base station listens on while pairing.
///
/// It is known by construction to every remote of the system and is not a secret.
pub const DISCOVERY_ADDRESS: RadioAddress = RadioAddress::new(*b"TCS00\0");

/// A radio pipe address.
///
/// Remotes burn their own address in at build time and transmit operational
/// traffic on it; the base learns it during pairing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioAddress([u8; ADDRESS_LEN]);

impl RadioAddress {
    /// The all-zero address, used as "no address" in persisted records
    pub const EMPTY: RadioAddress = RadioAddress([0; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; ADDRESS_LEN]
    }

    /// Whether this address may be used as a remote's own operational address.
    pub fn is_valid_remote(&self) -> bool {
        !self.is_empty() && *self != DISCOVERY_ADDRESS
    }
}

impl Default for RadioAddress {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<[u8; ADDRESS_LEN]> for RadioAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}
