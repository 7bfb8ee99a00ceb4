//! Safety supervisor.
//!
//! The supervisor runs **every tick after the mode engines** and has the
//! final word on the motor.  It keeps a fault bitmask of [`SafetyFault`]s:
//!
//! - `OverLoad` and `OverUnderVolt` mirror the live sensor lines.  While
//!   either is set the controller is in continuous lockout: every mode
//!   except Manual is stopped and the motor is forced off on every tick,
//!   not just on the rising edge.
//! - `MaxRunReached` is set by the supervisor's own continuous-run timer
//!   and is sticky.  Only an explicit [`clear_max_run`] removes it.
//!
//! ## Continuous-run timer
//!
//! The controller reports every motor transition through
//! [`motor_changed`].  Off→on arms the timer, on→off disarms it.  When an
//! armed run reaches the configured limit the flag latches and the
//! controller stops Auto and the motor.
//!
//! [`clear_max_run`]: SafetySupervisor::clear_max_run
//! [`motor_changed`]: SafetySupervisor::motor_changed

use log::{error, info, warn};

use crate::config::ControllerConfig;
use crate::error::SafetyFault;
use crate::sensors::SensorSnapshot;

/// What the controller must enforce after one supervisor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyVerdict {
    /// Overload or voltage fault live: stop modes and motor.
    pub lockout: bool,
    /// Continuous-run limit hit on this tick.
    pub max_run_tripped: bool,
}

/// Safety supervisor.
pub struct SafetySupervisor {
    max_run_ms: u64,
    /// Latched fault bitmask.
    faults: u8,
    /// Start of the current continuous run, if the motor is on.
    run_started_ms: Option<u64>,
}

impl SafetySupervisor {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            max_run_ms: u64::from(config.max_continuous_run_ms),
            faults: 0,
            run_started_ms: None,
        }
    }

    /// Arm or disarm the continuous-run timer on a motor transition.
    pub fn motor_changed(&mut self, on: bool, now_ms: u64) {
        match (on, self.run_started_ms) {
            (true, None) => self.run_started_ms = Some(now_ms),
            (false, Some(_)) => self.run_started_ms = None,
            _ => {}
        }
    }

    /// Evaluate the fault lines and the run timer for this tick.
    pub fn evaluate(&mut self, snap: &SensorSnapshot, now_ms: u64) -> SafetyVerdict {
        self.eval_fault(SafetyFault::OverLoad, snap.overload);
        self.eval_fault(SafetyFault::OverUnderVolt, snap.over_under_volt);

        let mut max_run_tripped = false;
        if let Some(started) = self.run_started_ms {
            if now_ms.saturating_sub(started) >= self.max_run_ms {
                if !self.has_fault(SafetyFault::MaxRunReached) {
                    error!(
                        "SAFETY FAULT SET: {} after {} s continuous run",
                        SafetyFault::MaxRunReached,
                        now_ms.saturating_sub(started) / 1000
                    );
                }
                self.faults |= SafetyFault::MaxRunReached.mask();
                max_run_tripped = true;
            }
        }

        SafetyVerdict {
            lockout: self.lockout(),
            max_run_tripped,
        }
    }

    /// Operator acknowledgement of a max-run trip.
    pub fn clear_max_run(&mut self) {
        if self.has_fault(SafetyFault::MaxRunReached) {
            info!("SAFETY FAULT CLEARED: {}", SafetyFault::MaxRunReached);
        } else {
            warn!("max-run clear requested but flag not set");
        }
        self.faults &= !SafetyFault::MaxRunReached.mask();
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Overload or over/under-voltage currently present.
    pub fn lockout(&self) -> bool {
        self.has_fault(SafetyFault::OverLoad) || self.has_fault(SafetyFault::OverUnderVolt)
    }

    pub fn max_run_reached(&self) -> bool {
        self.has_fault(SafetyFault::MaxRunReached)
    }

    /// Whether the continuous-run timer is armed.
    pub fn run_timer_armed(&self) -> bool {
        self.run_started_ms.is_some()
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
