//! # TCS Types
//!
//! Wire-level types shared by the two nodes of the target control system: the
//! handheld remote and the base station.
//!
//! ## Modules
//!
//! - [`address`] - 6-byte radio addresses, including the well-known discovery address
//! - [`packet`] - The fixed-size radio frame and the payload codes it carries
//! - [`battery`] - The discretized battery level reported by the remote
//!
//! Both nodes must be built against the same version of this crate, postcard
//! is not self-describing so field order and sizes must match exactly.

#![no_std]

pub mod address;
pub mod battery;
pub mod packet;
