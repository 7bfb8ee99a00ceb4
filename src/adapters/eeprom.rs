//! 24xx-series I²C EEPROM record store.
//!
//! Implements [`RecordStore`] over any `embedded_hal::i2c::I2c` bus using
//! two-byte word addressing (24LC32 and up).  The record occupies part of
//! a single page, so each save is one page write followed by
//! acknowledge polling until the internal write cycle completes.

use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::app::ports::{RecordStore, StorageError};

/// Page size of the supported parts.  A write must not cross a page.
pub const PAGE_SIZE: usize = 32;

/// Attempts to poll for the end of the internal write cycle (≈5 ms).
const ACK_POLL_ATTEMPTS: u32 = 200;

pub struct Eeprom24x<I2C> {
    bus: I2C,
    address: u8,
    offset: u16,
}

impl<I2C: I2c> Eeprom24x<I2C> {
    /// `address` is the 7-bit bus address; `offset` the record's byte offset.
    pub fn new(bus: I2C, address: u8, offset: u16) -> Self {
        Self {
            bus,
            address,
            offset,
        }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.bus
    }

    fn wait_write_cycle(&mut self) -> Result<(), StorageError> {
        for attempt in 0..ACK_POLL_ATTEMPTS {
            if self.bus.write(self.address, &[]).is_ok() {
                debug!("eeprom: write cycle done after {} polls", attempt);
                return Ok(());
            }
        }
        warn!("eeprom: no ACK after write cycle");
        Err(StorageError::IoError)
    }
}

impl<I2C: I2c> RecordStore for Eeprom24x<I2C> {
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let addr = self.offset.to_be_bytes();
        self.bus
            .write_read(self.address, &addr, buf)
            .map_err(|_| StorageError::IoError)?;
        // An erased part reads back all ones.
        if buf.iter().all(|&b| b == 0xFF) {
            return Err(StorageError::NotFound);
        }
        Ok(buf.len())
    }

    fn write_record(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let page_room = PAGE_SIZE - usize::from(self.offset) % PAGE_SIZE;
        if data.len() > page_room {
            return Err(StorageError::Full);
        }

        let mut frame = [0u8; 2 + PAGE_SIZE];
        frame[..2].copy_from_slice(&self.offset.to_be_bytes());
        frame[2..2 + data.len()].copy_from_slice(data);
        self.bus
            .write(self.address, &frame[..2 + data.len()])
            .map_err(|_| StorageError::IoError)?;
        self.wait_write_cycle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{PersistedRecord, RECORD_LEN};
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    const ADDR: u8 = 0x50;

    /// In-memory 24LC32 with a word-address pointer.
    struct FakeEeprom {
        mem: [u8; 4096],
        ptr: usize,
        busy_polls: u32,
        fail: bool,
    }

    impl FakeEeprom {
        fn blank() -> Self {
            Self {
                mem: [0xFF; 4096],
                ptr: 0,
                busy_polls: 0,
                fail: false,
            }
        }
    }

    impl ErrorType for FakeEeprom {
        type Error = ErrorKind;
    }

    impl I2c for FakeEeprom {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), ErrorKind> {
            if address != ADDR || self.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) if bytes.is_empty() => {
                        if self.busy_polls > 0 {
                            self.busy_polls -= 1;
                            return Err(ErrorKind::Other);
                        }
                    }
                    Operation::Write(bytes) => {
                        self.ptr = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
                        for (i, b) in bytes[2..].iter().enumerate() {
                            self.mem[self.ptr + i] = *b;
                        }
                        if bytes.len() > 2 {
                            self.busy_polls = 3;
                        }
                    }
                    Operation::Read(buf) => {
                        let n = buf.len();
                        buf.copy_from_slice(&self.mem[self.ptr..self.ptr + n]);
                        self.ptr += n;
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn blank_part_reports_not_found() {
        let mut ee = Eeprom24x::new(FakeEeprom::blank(), ADDR, 0x40);
        let mut buf = [0u8; RECORD_LEN];
        assert_eq!(ee.read_record(&mut buf), Err(StorageError::NotFound));
    }

    #[test]
    fn write_then_read_at_offset() {
        let mut ee = Eeprom24x::new(FakeEeprom::blank(), ADDR, 0x40);
        let raw = PersistedRecord::default().encode();
        ee.write_record(&raw).unwrap();

        let mut buf = [0u8; RECORD_LEN];
        assert_eq!(ee.read_record(&mut buf), Ok(RECORD_LEN));
        assert_eq!(buf, raw);

        let bus = ee.release();
        assert_eq!(&bus.mem[0x40..0x40 + RECORD_LEN], &raw);
        assert_eq!(bus.mem[0x3F], 0xFF);
    }

    #[test]
    fn write_crossing_page_is_refused() {
        let mut ee = Eeprom24x::new(FakeEeprom::blank(), ADDR, 0x38);
        assert_eq!(ee.write_record(&[0u8; RECORD_LEN]), Err(StorageError::Full));
    }

    #[test]
    fn bus_error_is_io_error() {
        let mut bus = FakeEeprom::blank();
        bus.fail = true;
        let mut ee = Eeprom24x::new(bus, ADDR, 0);
        let mut buf = [0u8; RECORD_LEN];
        assert_eq!(ee.read_record(&mut buf), Err(StorageError::IoError));
        assert_eq!(ee.write_record(&[1, 2, 3]), Err(StorageError::IoError));
    }
}
