//! Thin wrappers over embedded-hal peripherals.

pub(crate) mod gpio;
