//! Sensor subsystem: probe evaluation and the aggregating [`SensorHub`].
//!
//! The hub owns the ADC channels and the two fault lines and produces a
//! [`SensorSnapshot`] each tick that the controller consumes.

pub mod level;

use embedded_hal::digital::InputPin;
use log::warn;

use crate::error::SensorError;

/// Number of tank level probes.
pub const LEVEL_PROBES: usize = 5;

/// Voltage an exposed (dry) probe floats to.
const DRY_PROBE_VOLTS: f32 = 3.3;

/// A point-in-time snapshot of every input the controller looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Tank level probe voltages, bottom probe first.
    pub level_volts: [f32; LEVEL_PROBES],
    /// Dry-run probe voltage at the pump inlet.
    pub dry_run_volts: f32,
    /// Overload comparator tripped (motor current too high).
    pub overload: bool,
    /// Supply voltage supervisor tripped (over or under).
    pub over_under_volt: bool,
}

impl Default for SensorSnapshot {
    /// Every probe dry, no faults.
    fn default() -> Self {
        Self {
            level_volts: [DRY_PROBE_VOLTS; LEVEL_PROBES],
            dry_run_volts: DRY_PROBE_VOLTS,
            overload: false,
            over_under_volt: false,
        }
    }
}

/// An analog input the hub samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Tank level probe, 0 = bottom.
    Level(u8),
    /// Pump-inlet dry-run probe.
    DryRun,
}

/// Millivolt-level access to the probe ADC.  Filtering and calibration
/// live behind this trait.
pub trait AnalogChannels {
    fn read_millivolts(&mut self, channel: Channel) -> Result<u16, SensorError>;
}

/// Aggregates the probe ADC and the fault lines into a unified snapshot.
///
/// Fault inputs are active-high: the overload comparator and the voltage
/// supervisor both pull their line high while tripped.
pub struct SensorHub<A, F> {
    adc: A,
    overload_line: F,
    voltage_line: F,
    last: SensorSnapshot,
}

impl<A: AnalogChannels, F: InputPin> SensorHub<A, F> {
    pub fn new(adc: A, overload_line: F, voltage_line: F) -> Self {
        Self {
            adc,
            overload_line,
            voltage_line,
            last: SensorSnapshot::default(),
        }
    }

    /// Read every input and return a unified snapshot.
    ///
    /// Individual read failures are logged and the previous good value is
    /// retained; a single flaky channel must not crash the control loop.
    pub fn read_all(&mut self) -> SensorSnapshot {
        let mut snap = self.last;

        for (i, slot) in snap.level_volts.iter_mut().enumerate() {
            match self.adc.read_millivolts(Channel::Level(i as u8)) {
                Ok(mv) => *slot = millivolts_to_volts(mv),
                Err(e) => warn!("level probe {i}: {e}, keeping last value"),
            }
        }
        match self.adc.read_millivolts(Channel::DryRun) {
            Ok(mv) => snap.dry_run_volts = millivolts_to_volts(mv),
            Err(e) => warn!("dry-run probe: {e}, keeping last value"),
        }

        // A fault line that cannot be read is treated as tripped.
        snap.overload = self.overload_line.is_high().unwrap_or(true);
        snap.over_under_volt = self.voltage_line.is_high().unwrap_or(true);

        self.last = snap;
        snap
    }

    /// The most recent snapshot.
    pub fn last(&self) -> SensorSnapshot {
        self.last
    }
}

fn millivolts_to_volts(mv: u16) -> f32 {
    f32::from(mv) / 1000.0
}
