//! Time-of-day timer engine.
//!
//! Five independent slots, each a daily `[on, off)` window with an
//! optional weekday mask.  The motor runs iff **any** enabled slot says it
//! should; slots have no priority because the effect is identical.
//!
//! The engine is edge-triggered: it only requests a motor change when the
//! combined verdict flips.  Between edges the dry-run detector is free to
//! stop and re-probe the motor.

use log::info;
use serde::{Deserialize, Serialize};

use crate::clock::{HourMinute, TimeOfDay, in_daily_window};

/// Number of timer slots.
pub const TIMER_SLOTS: usize = 5;

/// Day mask with every weekday set.
pub const ALL_DAYS: u8 = 0b0111_1111;

/// Size of a slot in the persisted record.
pub const SLOT_BYTES: usize = 6;

/// One daily run window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerSlot {
    pub enabled: bool,
    pub on: HourMinute,
    pub off: HourMinute,
    /// Bit *d* enables weekday *d* (0 = Sunday).  0 means every day.
    pub day_mask: u8,
}

impl TimerSlot {
    /// An enabled every-day slot.
    pub fn new(on: HourMinute, off: HourMinute) -> Self {
        Self {
            enabled: true,
            on,
            off,
            day_mask: ALL_DAYS,
        }
    }

    pub fn runs_on(&self, weekday: u8) -> bool {
        self.day_mask == 0 || self.day_mask & (1 << (weekday % 7)) != 0
    }

    /// Whether this slot wants the motor on at `tod`.  `off <= on` means
    /// the window crosses midnight.
    pub fn should_run(&self, tod: &TimeOfDay) -> bool {
        self.enabled
            && self.runs_on(tod.weekday)
            && in_daily_window(
                tod.secs_of_day(),
                self.on.secs_of_day(),
                self.off.secs_of_day(),
            )
    }

    /// Raw layout: enabled, on hour, on minute, off hour, off minute, day mask.
    pub fn to_bytes(&self) -> [u8; SLOT_BYTES] {
        [
            u8::from(self.enabled),
            self.on.hour,
            self.on.minute,
            self.off.hour,
            self.off.minute,
            self.day_mask,
        ]
    }

    /// Inverse of [`to_bytes`](Self::to_bytes).  Times are clamped.
    pub fn from_bytes(raw: [u8; SLOT_BYTES]) -> Self {
        Self {
            enabled: raw[0] != 0,
            on: HourMinute::new(raw[1], raw[2]),
            off: HourMinute::new(raw[3], raw[4]),
            day_mask: raw[5] & ALL_DAYS,
        }
    }
}

/// The five configured slots.  Persists across mode changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerSchedule {
    slots: [TimerSlot; TIMER_SLOTS],
}

impl TimerSchedule {
    pub fn slot(&self, index: usize) -> Option<&TimerSlot> {
        self.slots.get(index)
    }

    /// Replace a slot.  Returns `false` for an out-of-range index.
    pub fn set_slot(&mut self, index: usize, slot: TimerSlot) -> bool {
        match self.slots.get_mut(index) {
            Some(s) => {
                *s = slot;
                info!(
                    "timer: slot {} = {:02}:{:02}-{:02}:{:02} mask=0b{:07b} enabled={}",
                    index,
                    slot.on.hour,
                    slot.on.minute,
                    slot.off.hour,
                    slot.off.minute,
                    slot.day_mask,
                    slot.enabled
                );
                true
            }
            None => false,
        }
    }

    pub fn any_should_run(&self, tod: &TimeOfDay) -> bool {
        self.slots.iter().any(|s| s.should_run(tod))
    }

    /// Number of enabled slots.
    pub fn enabled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.enabled).count()
    }
}

/// Run state while Timer mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerRun {
    /// Verdict from the last evaluation; `None` forces the next one to act.
    last: Option<bool>,
}

impl TimerRun {
    /// Evaluate every slot.  Returns a motor request only when the verdict
    /// changes.  Without a wall clock nothing changes.
    pub fn tick(&mut self, schedule: &TimerSchedule, tod: Option<TimeOfDay>) -> Option<bool> {
        let tod = tod?;
        let should = schedule.any_should_run(&tod);
        if self.last == Some(should) {
            return None;
        }
        self.last = Some(should);
        info!(
            "timer: {:02}:{:02} -> motor {}",
            tod.hour,
            tod.minute,
            if should { "ON" } else { "OFF" }
        );
        Some(should)
    }

    /// Immediate, idempotent re-evaluation after a slot edit.
    pub fn recalculate(&mut self, schedule: &TimerSchedule, tod: Option<TimeOfDay>) -> Option<bool> {
        self.last = None;
        self.tick(schedule, tod)
    }

    /// Whether a slot currently wants the motor on.
    pub fn demand(&self) -> bool {
        self.last == Some(true)
    }
}
