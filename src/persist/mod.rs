//! Persisted controller record.
//!
//! A fixed 16-byte little-endian layout, small enough for a single EEPROM
//! page write:
//!
//! ```text
//!  off  size  field
//!   0    1    mode            (ModeKind as u8)
//!   1    1    motor_on        (0 / 1)
//!   2    2    twist_on_secs
//!   4    2    twist_off_secs
//!   6    2    countdown_minutes
//!   8    6    timer slot 0    (TimerSlot::to_bytes)
//!  14    2    CRC-16/X25 over bytes 0..14
//! ```
//!
//! A record that fails the length, checksum or mode check is rejected as
//! a whole and the caller keeps its defaults.

use core::fmt;

use crc::{CRC_16_IBM_SDLC, Crc};
use log::warn;

use crate::app::ports::StorageError;
use crate::modes::ModeKind;
use crate::modes::timer::{SLOT_BYTES, TimerSlot};

/// Encoded record size including the checksum.
pub const RECORD_LEN: usize = 16;

/// Bytes covered by the checksum.
const PAYLOAD_LEN: usize = RECORD_LEN - 2;

/// CRC-16/X25 (reflected 0x1021, init and xorout 0xFFFF).
const X25: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Compute the record checksum.
pub fn checksum(data: &[u8]) -> u16 {
    X25.checksum(data)
}

/// Why a stored record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Record is not [`RECORD_LEN`] bytes.
    BadLength(usize),
    /// Stored and computed checksums differ.
    ChecksumMismatch { stored: u16, computed: u16 },
    /// Mode byte does not name a mode.
    UnknownMode(u8),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength(n) => write!(f, "record is {n} bytes, expected {RECORD_LEN}"),
            Self::ChecksumMismatch { stored, computed } => {
                write!(f, "checksum 0x{stored:04X} != 0x{computed:04X}")
            }
            Self::UnknownMode(m) => write!(f, "unknown mode byte {m}"),
        }
    }
}

impl From<RecordError> for StorageError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::BadLength(_) => Self::BadLength,
            RecordError::ChecksumMismatch { .. } | RecordError::UnknownMode(_) => {
                Self::ChecksumMismatch
            }
        }
    }
}

/// The state that survives a power cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedRecord {
    pub mode: ModeKind,
    pub motor_on: bool,
    pub twist_on_secs: u16,
    pub twist_off_secs: u16,
    pub countdown_minutes: u16,
    pub slot0: TimerSlot,
}

impl Default for PersistedRecord {
    /// The all-clear state used when nothing valid is stored.
    fn default() -> Self {
        Self {
            mode: ModeKind::Idle,
            motor_on: false,
            twist_on_secs: 0,
            twist_off_secs: 0,
            countdown_minutes: 0,
            slot0: TimerSlot::default(),
        }
    }
}

impl PersistedRecord {
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0] = self.mode as u8;
        out[1] = u8::from(self.motor_on);
        out[2..4].copy_from_slice(&self.twist_on_secs.to_le_bytes());
        out[4..6].copy_from_slice(&self.twist_off_secs.to_le_bytes());
        out[6..8].copy_from_slice(&self.countdown_minutes.to_le_bytes());
        out[8..8 + SLOT_BYTES].copy_from_slice(&self.slot0.to_bytes());
        let crc = checksum(&out[..PAYLOAD_LEN]);
        out[PAYLOAD_LEN..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    pub fn decode(raw: &[u8]) -> Result<Self, RecordError> {
        if raw.len() != RECORD_LEN {
            return Err(RecordError::BadLength(raw.len()));
        }

        let stored = u16::from_le_bytes([raw[PAYLOAD_LEN], raw[PAYLOAD_LEN + 1]]);
        let computed = checksum(&raw[..PAYLOAD_LEN]);
        if stored != computed {
            return Err(RecordError::ChecksumMismatch { stored, computed });
        }

        let mode = ModeKind::from_u8(raw[0]).ok_or(RecordError::UnknownMode(raw[0]))?;
        let mut slot = [0u8; SLOT_BYTES];
        slot.copy_from_slice(&raw[8..8 + SLOT_BYTES]);

        Ok(Self {
            mode,
            motor_on: raw[1] != 0,
            twist_on_secs: u16::from_le_bytes([raw[2], raw[3]]),
            twist_off_secs: u16::from_le_bytes([raw[4], raw[5]]),
            countdown_minutes: u16::from_le_bytes([raw[6], raw[7]]),
            slot0: TimerSlot::from_bytes(slot),
        })
    }

    /// Decode into `target`.  On failure `target` is left exactly as it was.
    pub fn load_into(raw: &[u8], target: &mut Self) -> Result<(), RecordError> {
        match Self::decode(raw) {
            Ok(rec) => {
                *target = rec;
                Ok(())
            }
            Err(e) => {
                warn!("persist: record rejected: {e}");
                Err(e)
            }
        }
    }
}
