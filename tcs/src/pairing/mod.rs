//! Pairing of a remote with the base station.
//!
//! The base listens on the discovery address, the remote transmits its own
//! address together with the pair sentinel to it. The base acknowledges to the
//! remote's address, records and persists the pairing, and switches to
//! operational traffic on that address. Both sides give up after a bounded
//! number of attempts.

pub mod base;
pub mod remote;

pub use self::base::PairingManager;
pub use self::remote::RemotePairing;
use crate::types::address::RadioAddress;

/// The persisted pairing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PairingRecord {
    pub remote_address: RadioAddress,
    pub is_paired: bool,
}

impl PairingRecord {
    pub const UNPAIRED: PairingRecord = PairingRecord {
        remote_address: RadioAddress::EMPTY,
        is_paired: false,
    };

    pub fn paired(remote_address: RadioAddress) -> Self {
        Self {
            remote_address,
            is_paired: true,
        }
    }

    /// Address of the paired remote
    pub fn address(&self) -> Option<RadioAddress> {
        self.is_paired.then_some(self.remote_address)
    }
}

/// Pairing state as shown to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingStatus {
    Unpaired,
    Paired,
    /// Handshake in progress, `attempt` attempts done so far
    Pairing { attempt: u8 },
    /// The last handshake gave up, a previous pairing is still in place if there was one
    Failed,
}

/// Result of a single pairing attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingOutcome {
    /// Not pairing
    Idle,
    /// Nothing yet, try again after the retry interval
    Pending,
    /// Paired with the peer at the given address
    Paired(RadioAddress),
    /// All attempts are used up
    Failed,
}
