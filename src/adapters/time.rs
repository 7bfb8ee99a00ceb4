//! System clock adapter.
//!
//! Implements [`ClockPort`]:
//!
//! - **`target_os = "espidf"`**: monotonic time from `esp_timer_get_time()`;
//!   wall-clock time of day from `gettimeofday()` + `localtime_r()`, once
//!   the RTC has been set.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for the monotonic
//!   side and an optional fixed time of day for simulation.

use crate::app::ports::ClockPort;
use crate::clock::TimeOfDay;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    sim_tod: Option<TimeOfDay>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            sim_tod: None,
        }
    }

    /// Pin the simulated wall clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_time_of_day(&mut self, tod: Option<TimeOfDay>) {
        self.sim_tod = tod;
    }
}

/// Anything before 2020-01-01 means the RTC was never set.
#[cfg(target_os = "espidf")]
const EPOCH_2020: i64 = 1_577_836_800;

#[cfg(target_os = "espidf")]
impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        // SAFETY: reads the free-running high-resolution timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid out-pointer; timezone is unused.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        // SAFETY: `tm` is plain C data; zeroed is a valid value.
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        // SAFETY: both pointers are valid for the call.
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if !(0..=23).contains(&tm.tm_hour) || !(0..=6).contains(&tm.tm_wday) {
            return None;
        }
        Some(TimeOfDay::new(
            tm.tm_hour as u8,
            tm.tm_min.clamp(0, 59) as u8,
            tm.tm_sec.clamp(0, 59) as u8,
            tm.tm_wday as u8,
        ))
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        self.sim_tod
    }
}
