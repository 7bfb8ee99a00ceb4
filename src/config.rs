//! Controller configuration parameters
//!
//! All tunable parameters for the PumpGuard controller.
//! Values can be overridden via the config store (see [`ConfigPort`]).
//!
//! [`ConfigPort`]: crate::app::ports::ConfigPort

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::modes::auto::AutoSettings;
use crate::modes::twist::TwistSettings;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Process tick interval (milliseconds)
    pub tick_interval_ms: u32,

    // --- Dry-run detector ---
    /// Motor-on window used to test for water when dry (milliseconds)
    pub dry_probe_on_ms: u32,
    /// Rest between probes while dry (milliseconds)
    pub dry_probe_off_ms: u32,
    /// Water must stay absent this long before a running motor is stopped
    pub dry_confirm_ms: u32,

    // --- Sensors ---
    /// A probe reading below this voltage is submerged
    pub submerged_threshold_volts: f32,

    // --- Safety ---
    /// Hard limit on continuous motor run time (milliseconds)
    pub max_continuous_run_ms: u32,

    // --- Persistence ---
    /// Minimum spacing between record writes (milliseconds)
    pub persist_interval_ms: u32,

    // --- Mode defaults ---
    /// Auto parameters used when a start command carries none
    pub auto_defaults: AutoSettings,
    /// Twist settings used before any are configured
    pub twist_defaults: TwistSettings,
    /// Countdown duration used by a bare `COUNTDOWN_START`
    pub countdown_default_minutes: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_interval_ms: 50, // 20 Hz

            // Dry-run detector
            dry_probe_on_ms: 5_000,
            dry_probe_off_ms: 10_000,
            dry_confirm_ms: 1_500,

            // Sensors
            submerged_threshold_volts: 0.1,

            // Safety
            max_continuous_run_ms: 2 * 60 * 60 * 1000, // 2 h

            // Persistence
            persist_interval_ms: 15_000,

            // Modes
            auto_defaults: AutoSettings {
                gap_secs: 30,
                max_run_minutes: 60,
                retry_limit: 3,
            },
            twist_defaults: TwistSettings::default(),
            countdown_default_minutes: 10,
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped,
    /// so a bad config blob can never disable a safety limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=1000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be 10–1000",
            ));
        }
        if self.dry_probe_on_ms < self.tick_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "dry_probe_on_ms must be at least one tick",
            ));
        }
        if self.dry_probe_off_ms < self.tick_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "dry_probe_off_ms must be at least one tick",
            ));
        }
        if self.dry_confirm_ms > self.dry_probe_on_ms {
            return Err(ConfigError::ValidationFailed(
                "dry_confirm_ms must not exceed dry_probe_on_ms",
            ));
        }
        if !(0.01..=3.3).contains(&self.submerged_threshold_volts) {
            return Err(ConfigError::ValidationFailed(
                "submerged_threshold_volts must be 0.01–3.3",
            ));
        }
        if !(60_000..=24 * 60 * 60 * 1000).contains(&self.max_continuous_run_ms) {
            return Err(ConfigError::ValidationFailed(
                "max_continuous_run_ms must be 1 min–24 h",
            ));
        }
        if self.persist_interval_ms < 1_000 {
            return Err(ConfigError::ValidationFailed(
                "persist_interval_ms must be at least 1 s",
            ));
        }
        if self.auto_defaults.gap_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "auto_defaults.gap_secs must be non-zero",
            ));
        }
        Ok(())
    }
}
