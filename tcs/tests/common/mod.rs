#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash};
use heapless::Deque;
use tcs::display::{DisplaySink, StatusSnapshot};
use tcs::output::{Indicator, IndicatorState, OutputDriver};
use tcs::radio::Transceiver;
use tcs::target::TargetChannel;
use tcs::types::address::RadioAddress;
use tcs::types::packet::{FRAME_SIZE, RadioPacket};

pub const REMOTE_ADDRESS: RadioAddress = RadioAddress::new(*b"10323\0");
pub const OTHER_REMOTE_ADDRESS: RadioAddress = RadioAddress::new(*b"20417\0");

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub type Events<E> = Deque<E, 16>;

pub fn events<E>(items: impl IntoIterator<Item = E>) -> Events<E> {
    let mut queue = Deque::new();
    for item in items {
        queue.push_back(item).ok().expect("too many test events");
    }
    queue
}

#[derive(Default)]
struct Node {
    listening: Option<RadioAddress>,
    rx: VecDeque<Vec<u8>>,
    sent: Vec<(RadioAddress, Vec<u8>)>,
    fail_writes: bool,
}

/// The shared radio medium, frames written to an address are received by every other radio listening on it.
#[derive(Clone, Default)]
pub struct Air(Rc<RefCell<Vec<Node>>>);

impl Air {
    pub fn radio(&self) -> MockRadio {
        let mut nodes = self.0.borrow_mut();
        nodes.push(Node::default());
        MockRadio {
            air: self.clone(),
            id: nodes.len() - 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRadioError {
    NoAck,
    Failed,
}

/// A transceiver on the shared [`Air`], clones are handles to the same radio.
#[derive(Clone)]
pub struct MockRadio {
    air: Air,
    id: usize,
}

impl MockRadio {
    fn with_node<R>(&self, f: impl FnOnce(&mut Node) -> R) -> R {
        f(&mut self.air.0.borrow_mut()[self.id])
    }

    pub fn listening(&self) -> Option<RadioAddress> {
        self.with_node(|node| node.listening)
    }

    /// Receive a raw frame, as if it came from the air
    pub fn inject(&self, frame: &[u8]) {
        self.with_node(|node| node.rx.push_back(frame.to_vec()));
    }

    pub fn inject_packet(&self, packet: &RadioPacket) {
        let mut buf = [0u8; FRAME_SIZE];
        let frame = packet.encode(&mut buf).unwrap();
        self.inject(frame);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.with_node(|node| node.fail_writes = fail);
    }

    /// Every packet written so far, with its destination
    pub fn sent(&self) -> Vec<(RadioAddress, RadioPacket)> {
        self.with_node(|node| {
            node.sent
                .iter()
                .map(|(address, frame)| (*address, RadioPacket::decode(frame).unwrap()))
                .collect()
        })
    }
}

impl Transceiver for MockRadio {
    type Error = MockRadioError;

    fn open_reading_pipe(&mut self, address: RadioAddress) -> Result<(), Self::Error> {
        self.with_node(|node| node.listening = Some(address));
        Ok(())
    }

    fn write(&mut self, address: RadioAddress, frame: &[u8]) -> Result<(), Self::Error> {
        let mut nodes = self.air.0.borrow_mut();
        nodes[self.id].sent.push((address, frame.to_vec()));
        if nodes[self.id].fail_writes {
            return Err(MockRadioError::Failed);
        }
        let mut delivered = false;
        for (id, node) in nodes.iter_mut().enumerate() {
            if id != self.id && node.listening == Some(address) {
                node.rx.push_back(frame.to_vec());
                delivered = true;
            }
        }
        if delivered { Ok(()) } else { Err(MockRadioError::NoAck) }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        self.with_node(|node| {
            Ok(node.rx.pop_front().map(|frame| {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                len
            }))
        })
    }
}

/// Outputs recording every change
#[derive(Default)]
pub struct RecordingOutputs {
    pub active: [bool; 3],
    pub indicator: IndicatorState,
    /// Channels in the order they were activated
    pub activations: Vec<TargetChannel>,
}

impl RecordingOutputs {
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }
}

impl Indicator for RecordingOutputs {
    fn set_indicator(&mut self, state: IndicatorState) {
        self.indicator = state;
    }
}

impl OutputDriver for RecordingOutputs {
    fn activate(&mut self, channel: TargetChannel) {
        self.active[channel.index()] = true;
        self.activations.push(channel);
    }

    fn deactivate(&mut self, channel: TargetChannel) {
        self.active[channel.index()] = false;
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<StatusSnapshot>,
}

impl DisplaySink for RecordingDisplay {
    fn render(&mut self, status: &StatusSnapshot) {
        self.frames.push(*status);
    }
}

/// Indicator which only remembers the last state
#[derive(Default)]
pub struct LastIndicator(pub IndicatorState);

impl Indicator for LastIndicator {
    fn set_indicator(&mut self, state: IndicatorState) {
        self.0 = state;
    }
}

pub struct FixedBattery(pub Option<u16>);

impl tcs::battery::BatterySensor for FixedBattery {
    fn read_millivolts(&mut self) -> Option<u16> {
        self.0
    }
}

/// NOR flash in RAM, clones share the same memory so it survives a "power cycle".
#[derive(Clone)]
pub struct RamFlash(Rc<RefCell<Vec<u8>>>);

impl RamFlash {
    pub fn new(sectors: usize) -> Self {
        Self(Rc::new(RefCell::new(vec![0xFF; sectors * Self::ERASE_SIZE])))
    }

    /// Overwrite the whole memory
    pub fn fill(&self, byte: u8) {
        self.0.borrow_mut().fill(byte);
    }
}

impl ErrorType for RamFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for RamFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let data = self.0.borrow();
        let start = offset as usize;
        let end = start + bytes.len();
        if end > data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        bytes.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.0.borrow().len()
    }
}

impl NorFlash for RamFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let mut data = self.0.borrow_mut();
        let (from, to) = (from as usize, to as usize);
        if from % Self::ERASE_SIZE != 0 || to % Self::ERASE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        if to > data.len() || from > to {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        data[from..to].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut data = self.0.borrow_mut();
        let start = offset as usize;
        if start % Self::WRITE_SIZE != 0 || bytes.len() % Self::WRITE_SIZE != 0 {
            return Err(NorFlashErrorKind::NotAligned);
        }
        let end = start + bytes.len();
        if end > data.len() {
            return Err(NorFlashErrorKind::OutOfBounds);
        }
        // NOR flash can only clear bits
        for (cell, byte) in data[start..end].iter_mut().zip(bytes) {
            *cell &= *byte;
        }
        Ok(())
    }
}
