//! The base station.
//!
//! One control loop iteration per tick: gather the local and remote events,
//! apply cancel first, advance the timer, apply the queued events in
//! arrival order, run the pairing handshake, hand due config writes to the
//! flash task and refresh the display.
//!
//! A cancel is applied before the tick, so it always beats an expiring
//! countdown, and queued in arrival order, so a start which arrived before it
//! in the same iteration doesn't survive it.

use embassy_futures::join::join;
use embassy_sync::channel::TrySendError;
use embassy_time::{Instant, Ticker};
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use heapless::Vec;

use crate::EVENT_QUEUE_SIZE;
use crate::channel::FLASH_CHANNEL;
use crate::config::TcsConfig;
use crate::display::{DisplaySink, StatusSnapshot};
use crate::event::{ControlEvent, InputEvent, TimerNotification};
use crate::input::InputSource;
use crate::output::OutputDriver;
use crate::pairing::{PairingManager, PairingOutcome};
use crate::radio::filter::SequenceFilter;
use crate::radio::{LinkRole, RadioLink, Transceiver};
use crate::storage::{ConfigStore, FlashOperationMessage, PersistedConfig, Storage};
use crate::timer::{TimerController, TimerPhase, TimerSelection};
use crate::types::battery::BatteryLevel;
use crate::types::packet::{Payload, ProtocolPhase, RadioPacket};

pub struct BaseStation<T: Transceiver, O: OutputDriver, D: DisplaySink> {
    config: TcsConfig,
    link: RadioLink<T>,
    pairing: PairingManager,
    timer: TimerController,
    store: ConfigStore,
    filter: SequenceFilter,
    outputs: O,
    display: D,
    remote_battery: Option<BatteryLevel>,
    remote_connected: bool,
    next_pair_attempt: Option<Instant>,
    last_status: Option<StatusSnapshot>,
}

impl<T: Transceiver, O: OutputDriver, D: DisplaySink> BaseStation<T, O, D> {
    /// Create the base station from the config loaded from storage.
    pub fn new(
        config: TcsConfig,
        transceiver: T,
        mut outputs: O,
        display: D,
        loaded: Option<PersistedConfig>,
        now: Instant,
    ) -> Self {
        outputs.deactivate_all();
        let store = ConfigStore::new(loaded, &config.storage, now);
        let pairing = PairingManager::new(config.pairing, *store.pairing());
        let mut link = RadioLink::new(transceiver, LinkRole::Base);
        if let Err(e) = pairing.restore_link(&mut link) {
            error!("Failed to set up radio link: {:?}", e);
        }
        Self {
            config,
            link,
            pairing,
            timer: TimerController::new(config.timer),
            store,
            filter: SequenceFilter::default(),
            outputs,
            display,
            remote_battery: None,
            remote_connected: false,
            next_pair_attempt: None,
            last_status: None,
        }
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn pairing(&self) -> &PairingManager {
        &self.pairing
    }

    pub fn link(&self) -> &RadioLink<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut RadioLink<T> {
        &mut self.link
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn remote_connected(&self) -> bool {
        self.remote_connected
    }

    pub fn remote_battery(&self) -> Option<BatteryLevel> {
        self.remote_battery
    }

    pub fn status(&self) -> StatusSnapshot {
        let targets = self.store.targets();
        StatusSnapshot {
            phase: self.timer.phase(),
            time_left: self.timer.time_left_duration(),
            selection: self.timer.selection(),
            shoot_duration: self.timer.selection().duration(targets.custom_timer),
            targets: targets.enabled,
            pairing: self.pairing.status(),
            remote_connected: self.remote_connected,
            remote_battery: self.remote_battery,
            config_valid: self.store.is_valid(),
        }
    }

    /// One control loop iteration.
    pub fn poll<I: InputSource<Event = InputEvent>>(&mut self, now: Instant, input: &mut I) -> Option<TimerNotification> {
        let mut events: Vec<ControlEvent, EVENT_QUEUE_SIZE> = Vec::new();
        let mut cancel = false;

        for _ in 0..EVENT_QUEUE_SIZE {
            let Some(event) = input.poll_event() else {
                break;
            };
            self.process_input(event, now, &mut events, &mut cancel);
        }
        if !self.pairing.is_listening() {
            while let Some(packet) = self.link.receive() {
                self.process_packet(packet, now, &mut events, &mut cancel);
            }
        }

        if cancel {
            self.timer.cancel(&mut self.outputs);
        }
        let notification = self.timer.tick(&mut self.outputs);
        for event in events {
            match event {
                ControlEvent::Select(selection) => {
                    self.timer.select(selection);
                }
                ControlEvent::Start => {
                    if let Err(e) = self.timer.start(self.store.targets(), &mut self.outputs) {
                        warn!("Timer start rejected: {:?}", e);
                    }
                }
                ControlEvent::Cancel => {
                    self.timer.cancel(&mut self.outputs);
                }
            }
        }

        self.poll_pairing(now);
        self.flush_config(now);

        let status = self.status();
        if self.last_status != Some(status) {
            self.display.render(&status);
            self.last_status = Some(status);
        }
        notification
    }

    fn process_input(
        &mut self,
        event: InputEvent,
        now: Instant,
        events: &mut Vec<ControlEvent, EVENT_QUEUE_SIZE>,
        cancel: &mut bool,
    ) {
        debug!("Input event: {:?}", event);
        match event {
            InputEvent::Start => push_event(events, ControlEvent::Start),
            InputEvent::Cancel => {
                queue_cancel(events, cancel);
                self.pairing.abort(&mut self.link, &mut self.outputs);
                self.next_pair_attempt = None;
            }
            InputEvent::Button(code) => push_event(events, ControlEvent::Select(TimerSelection::from(code))),
            InputEvent::PairRemote => {
                if self.timer.phase() != TimerPhase::Inactive {
                    warn!("Pairing is not possible while the timer runs");
                } else if !self.pairing.is_listening() {
                    if let Err(e) = self.pairing.start_listening(&mut self.link, &mut self.outputs) {
                        error!("Failed to switch radio link: {:?}", e);
                    }
                    self.next_pair_attempt = Some(now + self.config.pairing.retry_interval);
                }
            }
            InputEvent::ClearPairing => self.forget_remote(now),
            InputEvent::ToggleTarget(channel) => {
                if let Err(e) = self.store.toggle_target(channel, now) {
                    warn!("Target {:?} not toggled: {:?}", channel, e);
                }
            }
            InputEvent::AdjustCustomTimer(steps) => {
                if let Err(e) = self.store.adjust_custom_timer(steps, now) {
                    warn!("Custom timer not adjusted: {:?}", e);
                }
            }
            InputEvent::ResetStorage => {
                info!("Resetting storage");
                if FLASH_CHANNEL.try_send(FlashOperationMessage::Reset).is_err() {
                    error!("Flash channel is full, storage not reset");
                    return;
                }
                self.store.reset();
                // Erased storage holds no pairing either, the defaults are written back right away
                self.forget_remote(now);
            }
        }
    }

    /// Drop the pairing and everything known about the remote.
    fn forget_remote(&mut self, now: Instant) {
        self.pairing.clear(&mut self.link, &mut self.store, now);
        self.filter.reset();
        self.next_pair_attempt = None;
        self.remote_connected = false;
        self.remote_battery = None;
    }

    fn process_packet(
        &mut self,
        packet: RadioPacket,
        now: Instant,
        events: &mut Vec<ControlEvent, EVENT_QUEUE_SIZE>,
        cancel: &mut bool,
    ) {
        let Some(remote) = self.pairing.record().address() else {
            trace!("Not paired, ignoring packet");
            return;
        };
        if packet.sender != remote {
            trace!("Ignoring packet from {:?}", packet.sender);
            return;
        }
        if !self.filter.accept(packet.sequence, now) {
            debug!("Dropping duplicated packet {}", packet.sequence);
            return;
        }
        if !self.remote_connected {
            info!("Remote connected");
            self.remote_connected = true;
        }
        self.remote_battery = Some(packet.battery());

        match packet.payload(ProtocolPhase::Operational) {
            Some(Payload::Status) => {}
            Some(Payload::Cancel) => queue_cancel(events, cancel),
            Some(Payload::Button(code)) => {
                // A remote button selects and starts in one press
                push_event(events, ControlEvent::Select(TimerSelection::from(code)));
                push_event(events, ControlEvent::Start);
            }
            Some(Payload::Pair) | None => warn!("Unknown payload {} from remote", packet.payload_byte()),
        }
    }

    fn poll_pairing(&mut self, now: Instant) {
        let Some(due) = self.next_pair_attempt else {
            return;
        };
        if now < due {
            return;
        }
        match self
            .pairing
            .listen_attempt(&mut self.link, &mut self.store, &mut self.outputs, now)
        {
            PairingOutcome::Pending => self.next_pair_attempt = Some(due + self.config.pairing.retry_interval),
            PairingOutcome::Paired(_) => {
                self.filter.reset();
                self.remote_connected = false;
                self.remote_battery = None;
                self.next_pair_attempt = None;
            }
            PairingOutcome::Failed | PairingOutcome::Idle => self.next_pair_attempt = None,
        }
    }

    /// Hand a due config write to the flash task.
    fn flush_config(&mut self, now: Instant) {
        if let Some(config) = self.store.take_due_write(now) {
            if let Err(TrySendError::Full(_)) = FLASH_CHANNEL.try_send(FlashOperationMessage::Save(config)) {
                warn!("Flash channel is full, config write deferred");
                self.store.defer_write(now);
            }
        }
    }
}

/// Queue a cancel, it overrides every start queued before it.
fn queue_cancel(events: &mut Vec<ControlEvent, EVENT_QUEUE_SIZE>, cancel: &mut bool) {
    *cancel = true;
    events.retain(|event| !matches!(event, ControlEvent::Start));
    push_event(events, ControlEvent::Cancel);
}

fn push_event(events: &mut Vec<ControlEvent, EVENT_QUEUE_SIZE>, event: ControlEvent) {
    if events.push(event).is_err() {
        warn!("Control event queue is full, dropping {:?}", event);
    }
}

/// Run the base station: the flash task and the control loop.
pub async fn run_base_station<T, O, D, I, F>(
    config: TcsConfig,
    transceiver: T,
    outputs: O,
    display: D,
    mut input: I,
    flash: F,
) where
    T: Transceiver,
    O: OutputDriver,
    D: DisplaySink,
    I: InputSource<Event = InputEvent>,
    F: AsyncNorFlash,
{
    let mut storage = Storage::new(flash, &config.storage).await;
    let loaded = storage.load().await;
    let mut base = BaseStation::new(config, transceiver, outputs, display, loaded, Instant::now());

    let control_loop = async {
        let mut ticker = Ticker::every(config.timer.tick);
        loop {
            ticker.next().await;
            if let Some(notification) = base.poll(Instant::now(), &mut input) {
                debug!("Timer: {:?}", notification);
            }
        }
    };
    join(storage.run(), control_loop).await;
}
