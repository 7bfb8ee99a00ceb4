//! Relay and indicator drivers, ADC bring-up and the task watchdog.

pub mod hw_init;
pub mod indicator;
pub mod relay;
pub mod watchdog;
