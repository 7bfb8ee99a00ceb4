//! Mock adapters for integration tests.
//!
//! `MockHardware` serves a settable sensor snapshot and records every
//! relay write, `FakeClock` is advanced by hand, and `RecordingSink`
//! keeps every emitted event so tests can assert on the full history
//! without touching real GPIO or ADC registers.

use std::cell::Cell;

use pumpguard::app::events::{ControllerEvent, Indicators};
use pumpguard::app::ports::{ClockPort, EventSink, MotorPort, RecordStore, SensorPort, StorageError};
use pumpguard::clock::TimeOfDay;
use pumpguard::sensors::{LEVEL_PROBES, SensorSnapshot};

/// Probe voltage of a submerged probe.
pub const WET_VOLTS: f32 = 0.02;
/// Probe voltage of an exposed probe.
pub const DRY_VOLTS: f32 = 3.3;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub snapshot: SensorSnapshot,
    /// Every `set_motor` call, in order.
    pub relay_writes: Vec<bool>,
    pub indicators: Option<Indicators>,
}

#[allow(dead_code)]
impl MockHardware {
    /// Tank empty, no water at the pump, no faults.
    pub fn new() -> Self {
        Self {
            snapshot: SensorSnapshot::default(),
            relay_writes: Vec::new(),
            indicators: None,
        }
    }

    /// Relay state as last commanded (off before any write).
    pub fn relay_on(&self) -> bool {
        self.relay_writes.last().copied().unwrap_or(false)
    }

    pub fn set_water_at_pump(&mut self, present: bool) {
        self.snapshot.dry_run_volts = if present { WET_VOLTS } else { DRY_VOLTS };
    }

    /// Submerge the bottom `probes` tank probes.
    pub fn set_tank_probes(&mut self, probes: usize) {
        for (i, v) in self.snapshot.level_volts.iter_mut().enumerate() {
            *v = if i < probes.min(LEVEL_PROBES) { WET_VOLTS } else { DRY_VOLTS };
        }
    }

    pub fn set_overload(&mut self, tripped: bool) {
        self.snapshot.overload = tripped;
    }

    pub fn set_over_under_volt(&mut self, tripped: bool) {
        self.snapshot.over_under_volt = tripped;
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self) -> SensorSnapshot {
        self.snapshot
    }
}

impl MotorPort for MockHardware {
    fn set_motor(&mut self, on: bool) {
        self.relay_writes.push(on);
    }

    fn set_indicators(&mut self, indicators: &Indicators) {
        self.indicators = Some(*indicators);
    }
}

// ── FakeClock ─────────────────────────────────────────────────

pub struct FakeClock {
    ms: Cell<u64>,
    tod: Cell<Option<TimeOfDay>>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            ms: Cell::new(0),
            tod: Cell::new(None),
        }
    }

    pub fn set_ms(&self, ms: u64) {
        self.ms.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.ms.set(self.ms.get() + ms);
    }

    /// Set the wall clock (Wednesday).
    pub fn set_time(&self, hour: u8, minute: u8) {
        self.tod.set(Some(TimeOfDay::new(hour, minute, 0, 3)));
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for FakeClock {
    fn now_ms(&self) -> u64 {
        self.ms.get()
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        self.tod.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControllerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&ControllerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &ControllerEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.events.push(event.clone());
    }
}

// ── MemoryRecordStore ─────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRecordStore {
    pub data: Option<Vec<u8>>,
    pub writes: usize,
    pub fail_writes: bool,
}

impl RecordStore for MemoryRecordStore {
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.data.as_ref().ok_or(StorageError::NotFound)?;
        if data.len() > buf.len() {
            return Err(StorageError::BadLength);
        }
        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn write_record(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.data = Some(data.to_vec());
        self.writes += 1;
        Ok(())
    }
}
