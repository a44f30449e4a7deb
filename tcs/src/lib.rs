//! # TCS
//!
//! Core of a shooting range target control system: a handheld remote pairs with
//! a base station over a low-power radio link, the base station runs the
//! shoot timer and drives the target mechanisms, and operator configuration is
//! persisted to flash.
//!
//! Both nodes run a single cooperative control loop driven by a fixed tick,
//! see [`base::run_base_station`] and [`remote::run_remote`].
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod base;
pub mod battery;
pub mod channel;
pub mod config;
pub mod display;
pub(crate) mod driver;
pub mod event;
pub mod input;
pub mod output;
pub mod pairing;
pub mod radio;
pub mod remote;
pub mod storage;
pub mod target;
pub mod timer;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
pub use tcs_types as types;

pub type RawMutex = CriticalSectionRawMutex;

/// Capacity of the channel between the control loop and the flash task
pub(crate) const FLASH_CHANNEL_SIZE: usize = 4;
/// Maximum number of control events handled in one loop iteration
pub(crate) const EVENT_QUEUE_SIZE: usize = 8;
/// Size of the transceiver receive buffer, the largest payload of the supported radios
pub(crate) const RADIO_BUFFER_SIZE: usize = 32;
