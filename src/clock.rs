//! Time values threaded through one controller tick.
//!
//! The controller reads the clock **once** at the start of every tick and
//! passes the resulting [`Now`] to every engine, so all comparisons in a
//! single pass agree on what "now" is.

use serde::{Deserialize, Serialize};

/// Seconds in one day.
pub const SECS_PER_DAY: u32 = 24 * 60 * 60;

/// Wall-clock time of day from the RTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Sunday … 6 = Saturday.
    pub weekday: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8, second: u8, weekday: u8) -> Self {
        Self {
            hour: hour.min(23),
            minute: minute.min(59),
            second: second.min(59),
            weekday: weekday % 7,
        }
    }

    /// Seconds since midnight.
    pub fn secs_of_day(&self) -> u32 {
        u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second)
    }

    /// Hour and minute only.
    pub fn hm(&self) -> HourMinute {
        HourMinute::new(self.hour, self.minute)
    }
}

/// An hour:minute pair, clamped to 00:00–23:59 on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HourMinute {
    pub hour: u8,
    pub minute: u8,
}

impl HourMinute {
    /// Out-of-range inputs are clamped rather than trusted.
    pub fn new(hour: u8, minute: u8) -> Self {
        Self {
            hour: hour.min(23),
            minute: minute.min(59),
        }
    }

    pub fn minute_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    pub fn secs_of_day(&self) -> u32 {
        u32::from(self.minute_of_day()) * 60
    }
}

/// True if `now` lies in `[on, off)`, where `off <= on` means the window
/// crosses midnight.  Units are whatever the caller uses consistently.
pub fn in_daily_window(now: u32, on: u32, off: u32) -> bool {
    if on < off {
        now >= on && now < off
    } else {
        // e.g. 23:00..01:00 wraps around midnight
        now >= on || now < off
    }
}

/// Snapshot of both clocks, captured once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Now {
    /// Monotonic milliseconds since boot.
    pub ms: u64,
    /// Wall-clock time, `None` until the RTC has been set.
    pub tod: Option<TimeOfDay>,
}

impl Now {
    pub fn new(ms: u64, tod: Option<TimeOfDay>) -> Self {
        Self { ms, tod }
    }

    /// Milliseconds elapsed since `earlier` (saturating).
    pub fn since(&self, earlier: u64) -> u64 {
        self.ms.saturating_sub(earlier)
    }
}
