//! Sequence numbers of operational traffic.
//!
//! The transceiver retransmits a frame whose acknowledgment got lost, so the
//! base may receive the same packet twice in quick succession. A repeated
//! sequence number within [`DUPLICATE_WINDOW`] means a duplicate. A repeat
//! after a longer gap is a new packet, e.g. from a remote whose counter
//! restarted after a reboot.

use embassy_time::{Duration, Instant};

/// Time in which a repeated sequence number is treated as retransmission
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(1);

/// Sequence counter of the sending side, wraps at 256.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceCounter {
    next: u8,
}

impl SequenceCounter {
    /// Returns the next sequence number
    pub fn next(&mut self) -> u8 {
        let sequence = self.next;
        self.next = self.next.wrapping_add(1);
        sequence
    }
}

/// Drops packets repeating the sequence number of the last accepted packet.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceFilter {
    last: Option<(u8, Instant)>,
}

impl SequenceFilter {
    /// Whether a packet with `sequence` is new, accepting it if so.
    ///
    /// Gaps are fine, missed packets are never requested again.
    pub fn accept(&mut self, sequence: u8, now: Instant) -> bool {
        if let Some((last, at)) = self.last {
            if last == sequence && now < at + DUPLICATE_WINDOW {
                return false;
            }
        }
        self.last = Some((sequence, now));
        true
    }

    /// Forget the last sequence number, e.g. after pairing with another remote
    pub fn reset(&mut self) {
        self.last = None;
    }
}
