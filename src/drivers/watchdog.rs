//! Task watchdog.
//!
//! Subscribes the control-loop task to the ESP-IDF TWDT with panic on
//! trigger.  A stalled loop therefore reboots the board, and the relay
//! driver releases the motor during boot.  The loop calls [`Watchdog::feed`]
//! once per tick.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

/// Shortest timeout accepted, so a fast tick cannot make the watchdog
/// fire during a slow EEPROM write.
pub const MIN_TIMEOUT_MS: u32 = 1_000;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        let timeout_ms = timeout_ms.max(MIN_TIMEOUT_MS);

        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // SAFETY: called once from the main task before the control loop.
            let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
            if ret != ESP_OK {
                warn!("watchdog: reconfigure returned {} (may already be configured)", ret);
            }

            // SAFETY: a null handle subscribes the calling task.
            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!("watchdog: subscribed ({} ms, panic on trigger)", timeout_ms);
            } else {
                warn!("watchdog: failed to subscribe ({})", ret);
            }
            Self {
                timeout_ms,
                subscribed,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("watchdog(sim): {} ms, no-op", timeout_ms);
            Self { timeout_ms }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the subscribed calling task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
