//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the controller's business rules: mode arbitration,
//! the command protocol and outbound events.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
