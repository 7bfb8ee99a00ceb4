//! Motor contactor relay driver.
//!
//! A single digital output drives the relay coil through a transistor.
//! Some boards wire the driver inverted, so polarity is configurable.
//! The pin is forced to "released" on construction: the motor can never
//! start just because the MCU came out of reset.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::error::ActuatorError;

pub struct MotorRelay<P> {
    pin: P,
    active_low: bool,
    energised: bool,
}

impl<P: OutputPin> MotorRelay<P> {
    /// Take ownership of the coil pin and release the relay.
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut relay = Self {
            pin,
            active_low,
            energised: true,
        };
        if let Err(e) = relay.set(false) {
            warn!("relay: initial release failed: {e}");
        }
        relay
    }

    /// Energise (`true`) or release the relay.
    ///
    /// The cached state only changes when the pin write succeeds.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let high = on != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| ActuatorError::RelayWriteFailed)?;
        self.energised = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.energised
    }
}
