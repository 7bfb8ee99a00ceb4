//! Conductive level probes and the dry-run probe.
//!
//! Each probe sits at a fixed height in the tank (or at the pump inlet for
//! the dry-run probe).  A submerged probe is shorted to the common
//! electrode, so its divider voltage collapses below the submerged
//! threshold (0.1 V on the reference board).  An exposed probe floats high.
//!
//! The five tank probes are spaced at 20 % steps, so the level is simply
//! the number of submerged probes × 20.

use super::{LEVEL_PROBES, SensorSnapshot};

/// Probes that must be submerged before the tank counts as full.
pub const TANK_FULL_PROBES: u8 = 4;

/// Level percent contributed by each submerged probe.
const PERCENT_PER_PROBE: u8 = 100 / LEVEL_PROBES as u8;

/// Water state derived from one [`SensorSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaterState {
    /// Tank probes currently submerged (0–5).
    pub submerged: u8,
    /// At least [`TANK_FULL_PROBES`] probes are submerged.
    pub tank_full: bool,
    /// 0, 20, 40, 60, 80 or 100.
    pub level_percent: u8,
    /// Raw dry-run probe reading: `true` = water at the pump inlet.
    pub water_present: bool,
}

impl WaterState {
    pub fn evaluate(snap: &SensorSnapshot, threshold_volts: f32) -> Self {
        let submerged = snap
            .level_volts
            .iter()
            .filter(|v| is_submerged(**v, threshold_volts))
            .count() as u8;

        Self {
            submerged,
            tank_full: submerged >= TANK_FULL_PROBES,
            level_percent: submerged * PERCENT_PER_PROBE,
            water_present: is_submerged(snap.dry_run_volts, threshold_volts),
        }
    }
}

fn is_submerged(volts: f32, threshold_volts: f32) -> bool {
    volts < threshold_volts
}
