//! Mutable context threaded through every dry-run state handler.
//!
//! Holds this tick's inputs, the detector's timestamps, and the motor
//! request handlers leave for the controller.

use crate::config::ControllerConfig;

/// The shared context passed to every dry-run state handler.
#[derive(Debug, Clone)]
pub struct DryRunContext {
    // -- Inputs (refreshed each tick) --
    /// Tick timestamp, monotonic milliseconds.
    pub now_ms: u64,
    /// Raw dry-run probe: `true` = water at the inlet.
    pub water_present: bool,
    /// Whether motor requests are honoured this tick.
    pub drives_motor: bool,

    // -- Timestamps --
    /// Idle: next probe due.  Probe: probe window ends.
    pub deadline_ms: u64,
    /// Start of the current absence while in `Normal`.
    pub confirm_start_ms: u64,
    /// An absence is being timed.
    pub confirming: bool,

    // -- Timing --
    pub probe_on_ms: u64,
    pub probe_off_ms: u64,
    pub confirm_ms: u64,

    // -- Output --
    /// Motor command requested by a handler this tick.
    pub motor_request: Option<bool>,
}

impl DryRunContext {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            now_ms: 0,
            water_present: false,
            drives_motor: false,
            deadline_ms: 0,
            confirm_start_ms: 0,
            confirming: false,
            probe_on_ms: u64::from(config.dry_probe_on_ms),
            probe_off_ms: u64::from(config.dry_probe_off_ms),
            confirm_ms: u64::from(config.dry_confirm_ms),
            motor_request: None,
        }
    }

    pub(super) fn begin_tick(&mut self, now_ms: u64, water_present: bool) {
        self.now_ms = now_ms;
        self.water_present = water_present;
        self.motor_request = None;
    }

    /// Record a motor command, if this tick's supervision allows it.
    pub fn request_motor(&mut self, on: bool) {
        if self.drives_motor {
            self.motor_request = Some(on);
        }
    }

    /// True once the current deadline has passed.
    pub fn deadline_elapsed(&self) -> bool {
        self.now_ms >= self.deadline_ms
    }
}
