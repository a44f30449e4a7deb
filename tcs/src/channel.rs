//! Exposed channels which can be used to share data between the control loop and other tasks

use embassy_sync::channel::Channel;
pub use embassy_sync::{blocking_mutex, channel};

use crate::storage::FlashOperationMessage;
use crate::{FLASH_CHANNEL_SIZE, RawMutex};

// Sync messages from the control loop to the flash task
pub(crate) static FLASH_CHANNEL: Channel<RawMutex, FlashOperationMessage, FLASH_CHANNEL_SIZE> = Channel::new();
