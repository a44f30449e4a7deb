mod common;

use std::sync::Mutex;

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_time::Instant;
use tcs::base::BaseStation;
use tcs::config::TcsConfig;
use tcs::event::{InputEvent, RemoteInput};
use tcs::input::NoInput;
use tcs::pairing::{PairingOutcome, PairingRecord, PairingStatus};
use tcs::radio::LinkMode;
use tcs::remote::RemoteNode;
use tcs::storage::{PersistedConfig, Storage, async_flash_wrapper};
use tcs::target::{TargetChannel, TargetSet};

use crate::common::*;

const SECTORS: usize = 4;

// The flash channel is global, tests using it must not overlap
static FLASH_TASK: Mutex<()> = Mutex::new(());

type TestStorage = Storage<BlockingAsync<RamFlash>>;
type TestBase = BaseStation<MockRadio, RecordingOutputs, RecordingDisplay>;

fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn open(flash: &RamFlash) -> TestStorage {
    block_on(Storage::new(async_flash_wrapper(flash.clone()), &TcsConfig::default().storage))
}

/// Let the flash task execute everything queued, it returns once the channel is empty.
fn run_flash_task(storage: &mut TestStorage) {
    block_on(select(storage.run(), core::future::ready(())));
}

/// Boot a base station from what's in `flash`.
fn boot(flash: &RamFlash, radio: MockRadio, now: Instant) -> (TestBase, TestStorage) {
    let mut storage = open(flash);
    let loaded = block_on(storage.load());
    let base = BaseStation::new(
        TcsConfig::default(),
        radio,
        RecordingOutputs::default(),
        RecordingDisplay::default(),
        loaded,
        now,
    );
    (base, storage)
}

/// Drop messages left behind by an earlier test.
fn drain_flash_channel() {
    run_flash_task(&mut open(&RamFlash::new(SECTORS)));
}

#[test]
fn pairing_survives_power_cycle_and_reset_clears_it() {
    let _guard = FLASH_TASK.lock().unwrap_or_else(|e| e.into_inner());
    drain_flash_channel();

    let flash = RamFlash::new(SECTORS);
    let air = Air::default();
    let (mut base, mut storage) = boot(&flash, air.radio(), at(0));
    assert!(!base.store().is_valid());

    let mut remote = RemoteNode::new(TcsConfig::default(), REMOTE_ADDRESS, air.radio(), LastIndicator::default()).unwrap();
    let mut battery = FixedBattery(Some(800));
    let mut pair = events([RemoteInput::Pair]);
    base.poll(at(0), &mut events([InputEvent::PairRemote]));
    let mut paired = false;
    for tick in 0..=500u64 {
        let now = at(tick * 10);
        if let Some(PairingOutcome::Paired(_)) = remote.poll(now, &mut pair, &mut battery) {
            paired = true;
            break;
        }
        base.poll(now, &mut NoInput::new());
    }
    assert!(paired);
    assert_eq!(*base.pairing().record(), PairingRecord::paired(REMOTE_ADDRESS));
    run_flash_task(&mut storage);
    drop(base);
    drop(storage);

    // Power cycle
    let radio = air.radio();
    let (mut base, mut storage) = boot(&flash, radio.clone(), at(0));
    assert!(base.store().is_valid());
    assert_eq!(*base.pairing().record(), PairingRecord::paired(REMOTE_ADDRESS));
    assert_eq!(base.pairing().status(), PairingStatus::Paired);
    assert_eq!(base.link().mode(), LinkMode::Operational(REMOTE_ADDRESS));
    assert_eq!(radio.listening(), Some(REMOTE_ADDRESS));

    base.poll(at(10), &mut events([InputEvent::ResetStorage]));
    assert_eq!(base.pairing().status(), PairingStatus::Unpaired);
    run_flash_task(&mut storage);
    drop(base);
    drop(storage);

    let (base, mut storage) = boot(&flash, air.radio(), at(0));
    assert_eq!(block_on(storage.load()), Some(PersistedConfig::default()));
    assert!(base.store().is_valid());
    assert_eq!(base.pairing().status(), PairingStatus::Unpaired);
    assert_eq!(base.link().mode(), LinkMode::Discovery);
}

#[test]
fn write_is_deferred_while_flash_channel_is_full() {
    let _guard = FLASH_TASK.lock().unwrap_or_else(|e| e.into_inner());
    drain_flash_channel();

    let flash = RamFlash::new(SECTORS);
    {
        let mut storage = open(&flash);
        block_on(storage.save(&PersistedConfig::default())).unwrap();
    }
    let air = Air::default();
    let (mut base, mut storage) = boot(&flash, air.radio(), at(0));
    assert!(!base.store().has_pending_write());

    // Every pairing change is written right away, the flash task isn't running
    for tick in 0..4u64 {
        base.poll(at(tick * 10), &mut events([InputEvent::ClearPairing]));
        assert!(!base.store().has_pending_write());
    }
    base.poll(
        at(40),
        &mut events([InputEvent::ToggleTarget(TargetChannel::Target2), InputEvent::ClearPairing]),
    );
    assert!(base.store().has_pending_write());

    run_flash_task(&mut storage);
    base.poll(at(2030), &mut NoInput::new());
    assert!(base.store().has_pending_write());
    base.poll(at(2040), &mut NoInput::new());
    assert!(!base.store().has_pending_write());
    run_flash_task(&mut storage);

    let mut storage = open(&flash);
    let saved = block_on(storage.load()).unwrap();
    assert_eq!(saved.targets.enabled, TargetSet::from_flags([true, false, true]));
    assert_eq!(saved.pairing, PairingRecord::UNPAIRED);
}
