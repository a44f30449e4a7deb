pub mod config_store;

use core::ops::Range;

use byteorder::{BigEndian, ByteOrder};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use embedded_storage::nor_flash::NorFlash;
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use sequential_storage::Error as SSError;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{SerializationError, Value, fetch_item, store_item};

pub use self::config_store::{ConfigError, ConfigStore, PersistedConfig};
use crate::channel::FLASH_CHANNEL;
use crate::config::StorageConfig;
use crate::pairing::PairingRecord;
use crate::target::{TargetConfig, TargetSet};
use crate::types::address::{ADDRESS_LEN, RadioAddress};

/// Signal to synchronize the flash operation status, usually used outside of the flash task.
/// True if the flash operation is finished correctly, false if the flash operation is finished with error.
pub(crate) static FLASH_OPERATION_FINISHED: Signal<crate::RawMutex, bool> = Signal::new();

/// Marks a config item as completely written, it's stored in the same item as the config itself.
const CONFIG_VALID_MARKER: u8 = 0xA5;
/// Size of a serialized config item
const CONFIG_ITEM_SIZE: usize = 11 + ADDRESS_LEN;

// Message send from the control loop to flash task, which will do saving or clearing operation
#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum FlashOperationMessage {
    // Save the whole config
    Save(PersistedConfig),
    // Clear the storage
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    Flash,
    Full,
    Corrupted,
    Serialization,
    Other,
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum StorageKeys {
    RangeConfig = 1,
}

impl StorageKeys {
    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(StorageKeys::RangeConfig),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum StorageData {
    RangeConfig(PersistedConfig),
}

impl StorageData {
    fn key(&self) -> u32 {
        match self {
            StorageData::RangeConfig(_) => StorageKeys::RangeConfig as u32,
        }
    }
}

impl Value<'_> for StorageData {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.len() < CONFIG_ITEM_SIZE {
            return Err(SerializationError::BufferTooSmall);
        }
        match self {
            StorageData::RangeConfig(config) => {
                buffer[0] = StorageKeys::RangeConfig as u8;
                buffer[1] = CONFIG_VALID_MARKER;
                BigEndian::write_u32(&mut buffer[2..6], config.targets.custom_timer.as_millis() as u32);
                for (i, enabled) in config.targets.enabled.flags().iter().enumerate() {
                    buffer[6 + i] = *enabled as u8;
                }
                buffer[9] = config.pairing.is_paired as u8;
                buffer[10..10 + ADDRESS_LEN].copy_from_slice(config.pairing.remote_address.as_bytes());
                // Reserved
                buffer[CONFIG_ITEM_SIZE - 1] = 0;
                Ok(CONFIG_ITEM_SIZE)
            }
        }
    }

    fn deserialize_from(buffer: &[u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        if buffer.is_empty() {
            return Err(SerializationError::InvalidFormat);
        }
        match StorageKeys::from_u8(buffer[0]) {
            Some(StorageKeys::RangeConfig) => {
                if buffer.len() < CONFIG_ITEM_SIZE {
                    return Err(SerializationError::BufferTooSmall);
                }
                // An interrupted write never carries the marker
                if buffer[1] != CONFIG_VALID_MARKER {
                    return Err(SerializationError::InvalidData);
                }
                let custom_timer = Duration::from_millis(BigEndian::read_u32(&buffer[2..6]) as u64);
                let mut flags = [false; 3];
                for (i, flag) in flags.iter_mut().enumerate() {
                    *flag = read_bool(buffer[6 + i])?;
                }
                let mut address = [0; ADDRESS_LEN];
                address.copy_from_slice(&buffer[10..10 + ADDRESS_LEN]);
                Ok(StorageData::RangeConfig(PersistedConfig {
                    targets: TargetConfig {
                        enabled: TargetSet::from_flags(flags),
                        custom_timer,
                    },
                    pairing: PairingRecord {
                        remote_address: RadioAddress::new(address),
                        is_paired: read_bool(buffer[9])?,
                    },
                }))
            }
            None => Err(SerializationError::InvalidFormat),
        }
    }
}

fn read_bool(byte: u8) -> Result<bool, SerializationError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(SerializationError::InvalidData),
    }
}

pub fn async_flash_wrapper<F: NorFlash>(flash: F) -> BlockingAsync<F> {
    embassy_embedded_hal::adapter::BlockingAsync::new(flash)
}

pub struct Storage<F: AsyncNorFlash> {
    pub(crate) flash: F,
    pub(crate) storage_range: Range<u32>,
    pub(crate) buffer: [u8; get_buffer_size()],
}

impl<F: AsyncNorFlash> Storage<F> {
    pub async fn new(flash: F, config: &StorageConfig) -> Self {
        // Check storage setting
        assert!(
            config.num_sectors >= 2,
            "Number of used sector for storage must larger than 1"
        );

        info!(
            "Flash capacity {} KB, TCS uses {} KB({} sectors) starting from 0x{:X} as storage",
            flash.capacity() / 1024,
            (F::ERASE_SIZE * config.num_sectors as usize) / 1024,
            config.num_sectors,
            config.start_addr,
        );

        // If config.start_addr == 0, use last `num_sectors` sectors
        let storage_range = if config.start_addr == 0 {
            (flash.capacity() - config.num_sectors as usize * F::ERASE_SIZE) as u32..flash.capacity() as u32
        } else {
            assert!(
                config.start_addr % F::ERASE_SIZE == 0,
                "Storage's start addr MUST BE a multiplier of sector size"
            );
            config.start_addr as u32..(config.start_addr + config.num_sectors as usize * F::ERASE_SIZE) as u32
        };

        let mut storage = Self {
            flash,
            storage_range,
            buffer: [0; get_buffer_size()],
        };

        if config.clear_storage {
            debug!("Clearing storage!");
            if let Err(e) = storage.erase().await {
                error!("Failed to clear storage: {:?}", e);
            }
        }

        storage
    }

    /// Load the persisted config.
    ///
    /// Returns `None` if nothing was stored yet, or if the stored item can't be trusted.
    pub async fn load(&mut self) -> Option<PersistedConfig> {
        match fetch_item::<u32, StorageData, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(StorageKeys::RangeConfig as u32),
        )
        .await
        {
            Ok(Some(StorageData::RangeConfig(config))) => Some(config),
            Ok(None) => {
                info!("No config in storage");
                None
            }
            Err(e) => {
                print_storage_error::<F>(e);
                None
            }
        }
    }

    /// Write the whole config as one item.
    pub async fn save(&mut self, config: &PersistedConfig) -> Result<(), StorageError> {
        let data = StorageData::RangeConfig(*config);
        store_item(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &data.key(),
            &data,
        )
        .await
        .map_err(print_storage_error::<F>)
    }

    /// Erase everything stored.
    pub async fn erase(&mut self) -> Result<(), StorageError> {
        sequential_storage::erase_all(&mut self.flash, self.storage_range.clone())
            .await
            .map_err(print_storage_error::<F>)
    }

    /// Run the flash task, it executes the flash operations sent by the control loop.
    pub async fn run(&mut self) {
        loop {
            let info: FlashOperationMessage = FLASH_CHANNEL.receive().await;
            debug!("Flash operation: {:?}", info);
            let result = match info {
                FlashOperationMessage::Save(config) => self.save(&config).await,
                FlashOperationMessage::Reset => self.erase().await,
            };
            FLASH_OPERATION_FINISHED.signal(result.is_ok());
        }
    }
}

fn print_storage_error<F: AsyncNorFlash>(e: SSError<F::Error>) -> StorageError {
    match e {
        #[cfg(feature = "defmt")]
        SSError::Storage { value: e } => {
            error!("Flash error: {:?}", defmt::Debug2Format(&e));
            StorageError::Flash
        }
        #[cfg(not(feature = "defmt"))]
        SSError::Storage { value: _e } => {
            error!("Flash error");
            StorageError::Flash
        }
        SSError::FullStorage => {
            error!("Storage is full");
            StorageError::Full
        }
        SSError::Corrupted {} => {
            error!("Storage is corrupted");
            StorageError::Corrupted
        }
        SSError::BufferTooBig => {
            error!("Buffer too big");
            StorageError::Other
        }
        SSError::BufferTooSmall(x) => {
            error!("Buffer too small, needs {} bytes", x);
            StorageError::Other
        }
        SSError::SerializationError(e) => {
            error!("Map value error: {}", e);
            StorageError::Serialization
        }
        _ => {
            error!("Unknown storage error");
            StorageError::Other
        }
    }
}

const fn get_buffer_size() -> usize {
    // The buffer size needed = size_of(u32 key) + CONFIG_ITEM_SIZE
    // According to doc of `sequential-storage`, for some flashes it should be aligned in 32 bytes
    // To make sure the buffer works, do this alignment always
    let buffer_size = core::mem::size_of::<u32>() + CONFIG_ITEM_SIZE;
    if buffer_size < 56 { 64 } else { buffer_size.div_ceil(32) * 32 }
}
