//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PumpController (domain)
//! ```
//!
//! Driven adapters (sensors, relay, clock, event sinks, storage) implement
//! these traits.  The [`PumpController`](super::service::PumpController)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use crate::clock::TimeOfDay;
use crate::config::ControllerConfig;
use crate::sensors::SensorSnapshot;

use super::events::{ControllerEvent, Indicators};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the controller calls this once per tick.
pub trait SensorPort {
    /// Read every probe and fault line and return a unified snapshot.
    fn read_all(&mut self) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Motor port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the controller calls this to drive the relay and the
/// front-panel indicators.
pub trait MotorPort {
    /// Energise or release the motor relay.
    fn set_motor(&mut self, on: bool);

    /// Refresh the indicators from the end-of-tick state.
    fn set_indicators(&mut self, indicators: &Indicators);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic and wall-clock time.  Read exactly once per tick.
pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Wall-clock time of day, `None` until the RTC is set.
    fn time_of_day(&self) -> Option<TimeOfDay>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`ControllerEvent`]s through this
/// port.  Adapters decide where they go (serial log, LoRa status frame,
/// display).
pub trait EventSink {
    fn emit(&mut self, event: &ControllerEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST call [`ControllerConfig::validate`] before
/// persisting.  Invalid ranges are rejected with
/// [`ConfigError::ValidationFailed`], not silently clamped, so a bad blob
/// can never disable a safety limit.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Record store port (driven adapter: domain ↔ EEPROM)
// ───────────────────────────────────────────────────────────────

/// Raw storage for the fixed-layout controller record.
///
/// The store moves bytes only; framing and checksum live in
/// [`crate::persist`].
pub trait RecordStore {
    /// Read the stored record into `buf`.  Returns the number of bytes read.
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Overwrite the stored record.
    fn write_record(&mut self, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`RecordStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing has been stored yet.
    NotFound,
    /// Record larger than the reserved area.
    Full,
    /// Bus or flash I/O failed.
    IoError,
    /// Stored checksum does not match the contents.
    ChecksumMismatch,
    /// Stored record has the wrong size.
    BadLength,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::BadLength => write!(f, "bad record length"),
        }
    }
}
