//! PumpGuard controller library.
//!
//! Exposes the pure-logic modules for integration testing and the
//! firmware binary.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; on the host those
//! paths fall back to simulation.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod dryrun;
pub mod error;
pub mod modes;
pub mod persist;
pub mod pins;
pub mod safety;
pub mod sensors;

pub mod adapters;
pub mod drivers;
