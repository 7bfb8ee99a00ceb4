//! Twist mode: on/off cycling inside a daily window.
//!
//! Two nested timing layers:
//!
//! ```text
//!  wall clock  ──────[ window_on ............................ window_off )──────
//!  phase cycle         ON(on_secs) OFF(off_secs) ON(on_secs) OFF ...
//! ```
//!
//! The outer window arms the cycle once per day on the exact on-minute and
//! disarms it on the exact off-minute.  The inner cycle runs only while the
//! window is active.  At the end of an ON phase the cycle only rests if the
//! inlet is dry; with water present it simply stays on for another phase.

use log::info;
use serde::{Deserialize, Serialize};

use crate::clock::{HourMinute, Now, in_daily_window};

/// Twist configuration.  Persists across mode changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwistSettings {
    pub on_secs: u16,
    pub off_secs: u16,
    pub window_on: HourMinute,
    pub window_off: HourMinute,
}

impl Default for TwistSettings {
    fn default() -> Self {
        Self::new(60, 120, HourMinute::new(6, 0), HourMinute::new(18, 0))
    }
}

impl TwistSettings {
    /// Zero durations are raised to one second so a phase deadline can
    /// never equal the tick that set it.
    pub fn new(on_secs: u16, off_secs: u16, window_on: HourMinute, window_off: HourMinute) -> Self {
        Self {
            on_secs: on_secs.max(1),
            off_secs: off_secs.max(1),
            window_on,
            window_off,
        }
    }

    /// A window whose on and off minutes coincide never opens.
    pub fn window_is_empty(&self) -> bool {
        self.window_on == self.window_off
    }

    pub fn in_window(&self, at: HourMinute) -> bool {
        !self.window_is_empty()
            && in_daily_window(
                u32::from(at.minute_of_day()),
                u32::from(self.window_on.minute_of_day()),
                u32::from(self.window_off.minute_of_day()),
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwistPhase {
    On,
    Off,
}

/// Run state while Twist mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwistRun {
    pub settings: TwistSettings,
    /// Window logic enabled.
    pub armed: bool,
    /// Currently inside a run window.
    pub active: bool,
    pub phase: TwistPhase,
    pub phase_deadline_ms: u64,
}

impl TwistRun {
    /// Arm the window.  If the clock already sits inside it the cycle
    /// starts at once; the returned request is the initial motor command.
    pub fn start(settings: TwistSettings, now: Now) -> (Self, Option<bool>) {
        let mut run = Self {
            settings,
            armed: true,
            active: false,
            phase: TwistPhase::Off,
            phase_deadline_ms: now.ms,
        };
        let inside = now.tod.is_some_and(|t| settings.in_window(t.hm()));
        let request = if inside {
            run.activate(now.ms);
            Some(true)
        } else {
            info!(
                "twist: armed, waiting for {:02}:{:02}",
                settings.window_on.hour, settings.window_on.minute
            );
            None
        };
        (run, request)
    }

    /// Wall-clock arming.  Compares against the exact on/off minute.
    pub fn window_check(&mut self, now: Now) -> Option<bool> {
        if !self.armed || self.settings.window_is_empty() {
            return None;
        }
        let hm = now.tod?.hm();

        if !self.active && hm == self.settings.window_on {
            self.activate(now.ms);
            return Some(true);
        }
        if self.active && hm == self.settings.window_off {
            self.active = false;
            self.phase = TwistPhase::Off;
            info!("twist: window closed");
            return Some(false);
        }
        None
    }

    /// Inner phase cycling.  Only runs while the window is active.
    pub fn tick(&mut self, now_ms: u64, water_ok: bool) -> Option<bool> {
        if !self.active {
            return None;
        }

        if now_ms >= self.phase_deadline_ms {
            return match self.phase {
                TwistPhase::On if !water_ok => {
                    self.phase = TwistPhase::Off;
                    self.phase_deadline_ms = now_ms + u64::from(self.settings.off_secs) * 1000;
                    info!("twist: dry at end of ON phase, resting {} s", self.settings.off_secs);
                    Some(false)
                }
                TwistPhase::On | TwistPhase::Off => {
                    self.enter_on(now_ms);
                    Some(true)
                }
            };
        }

        // Keep the motor on through the whole ON phase.
        match self.phase {
            TwistPhase::On => Some(true),
            TwistPhase::Off => None,
        }
    }

    /// Whether the cycle currently wants the motor on.
    pub fn demand(&self) -> bool {
        self.active && self.phase == TwistPhase::On
    }

    fn activate(&mut self, now_ms: u64) {
        self.active = true;
        self.enter_on(now_ms);
        info!(
            "twist: window open, cycling {} s on / {} s off",
            self.settings.on_secs, self.settings.off_secs
        );
    }

    fn enter_on(&mut self, now_ms: u64) {
        self.phase = TwistPhase::On;
        self.phase_deadline_ms = now_ms + u64::from(self.settings.on_secs) * 1000;
    }
}
