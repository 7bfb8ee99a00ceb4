//! Outbound controller events.
//!
//! The [`PumpController`](super::service::PumpController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them: log to serial, send a status
//! frame over the radio link, update the display.

use core::fmt::Write as _;

use serde::Serialize;

use crate::modes::ModeKind;
use crate::modes::auto::AutoStop;
use crate::modes::countdown::CountdownEnd;

/// Capacity of the compact status line.
pub const STATUS_LINE_LEN: usize = 32;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// The controller has started (carries the initial mode).
    Started(ModeKind),

    /// Status changed since the last emission.
    Status(StatusSnapshot),

    /// The active mode changed.
    ModeChanged { from: ModeKind, to: ModeKind },

    /// The relay was switched.
    MotorChanged { on: bool, reason: &'static str },

    /// One or more safety faults were raised.
    FaultDetected(u8),

    /// All safety faults have been cleared.
    FaultCleared,

    /// Continuous-run limit hit; motor stopped until acknowledged.
    MaxRunReached,

    /// Auto mode ended itself.
    AutoStopped(AutoStop),

    /// A countdown run ended.
    CountdownFinished(CountdownEnd),

    /// State was restored from a persisted record at boot.
    Restored(ModeKind),
}

/// Change-notified status for the low-bandwidth link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "motorOn")]
    pub motor_on: bool,
    #[serde(rename = "activeModeName")]
    pub mode: ModeKind,
    /// 0, 20, 40, 60, 80 or 100.
    #[serde(rename = "tankLevelPercent")]
    pub tank_level_percent: u8,
}

impl StatusSnapshot {
    /// JSON form, e.g. `{"motorOn":true,"activeModeName":"AUTO","tankLevelPercent":60}`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Compact radio form, e.g. `S:1,AUTO,60`.
    pub fn to_line(&self) -> heapless::String<STATUS_LINE_LEN> {
        let mut line = heapless::String::new();
        // Longest possible line is well under capacity.
        let _ = write!(
            line,
            "S:{},{},{}",
            u8::from(self.motor_on),
            self.mode.as_str(),
            self.tank_level_percent
        );
        line
    }
}

/// Front-panel state derived at the end of every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indicators {
    /// Motor relay energised.
    pub motor: bool,
    /// Any safety fault latched.
    pub fault: bool,
    /// Dry-run detector reports no water.
    pub dry: bool,
    pub mode: ModeKind,
    /// Seconds left in a countdown run, 0 when none is running.
    pub countdown_remaining_secs: u32,
    /// Twist is inside its run window.
    pub twist_active: bool,
}
