//! Input sources polled by the control loops.
//!
//! Button scanning and debouncing happen outside of this crate, by whatever
//! drives the physical keys. The control loop only consumes the resulting
//! events, once per tick.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver};
use heapless::Deque;

/// A non-blocking source of input events.
pub trait InputSource {
    type Event;

    /// Take the next pending event, `None` if there's nothing pending.
    fn poll_event(&mut self) -> Option<Self::Event>;
}

/// Events pushed from another task or an interrupt handler through a channel.
impl<M: RawMutex, E, const N: usize> InputSource for Receiver<'_, M, E, N> {
    type Event = E;

    fn poll_event(&mut self) -> Option<E> {
        self.try_receive().ok()
    }
}

impl<M: RawMutex, E, const N: usize> InputSource for &Channel<M, E, N> {
    type Event = E;

    fn poll_event(&mut self) -> Option<E> {
        self.try_receive().ok()
    }
}

impl<E, const N: usize> InputSource for Deque<E, N> {
    type Event = E;

    fn poll_event(&mut self) -> Option<E> {
        self.pop_front()
    }
}

/// No input at all, used by nodes without a local console.
pub struct NoInput<E>(core::marker::PhantomData<E>);

impl<E> NoInput<E> {
    pub const fn new() -> Self {
        Self(core::marker::PhantomData)
    }
}

impl<E> Default for NoInput<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InputSource for NoInput<E> {
    type Event = E;

    fn poll_event(&mut self) -> Option<E> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawMutex as CsMutex;
    use crate::event::InputEvent;

    #[test]
    fn channel_events_are_polled_in_order() {
        let channel: Channel<CsMutex, InputEvent, 4> = Channel::new();
        channel.try_send(InputEvent::Start).unwrap();
        channel.try_send(InputEvent::Cancel).unwrap();
        let mut receiver = channel.receiver();
        assert_eq!(receiver.poll_event(), Some(InputEvent::Start));
        assert_eq!(receiver.poll_event(), Some(InputEvent::Cancel));
        assert_eq!(receiver.poll_event(), None);
    }
}
