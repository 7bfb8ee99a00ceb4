//! Hardware adapter that bridges real peripherals to the domain port traits.
//!
//! Owns the [`SensorHub`], the [`MotorRelay`] and the [`IndicatorLeds`]
//! and exposes them through [`SensorPort`] and [`MotorPort`].  Every type
//! is generic over `embedded-hal` pins, so the same adapter runs on the
//! board (esp-idf-hal `PinDriver`s) and in host tests (fake pins).

use embedded_hal::digital::{InputPin, OutputPin};
use log::{error, warn};

use crate::app::events::Indicators;
use crate::app::ports::{MotorPort, SensorPort};
use crate::drivers::indicator::IndicatorLeds;
use crate::drivers::relay::MotorRelay;
use crate::sensors::{AnalogChannels, SensorHub, SensorSnapshot};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<A, F, R, L> {
    sensor_hub: SensorHub<A, F>,
    relay: MotorRelay<R>,
    leds: IndicatorLeds<L>,
}

impl<A, F, R, L> HardwareAdapter<A, F, R, L>
where
    A: AnalogChannels,
    F: InputPin,
    R: OutputPin,
    L: OutputPin,
{
    pub fn new(sensor_hub: SensorHub<A, F>, relay: MotorRelay<R>, leds: IndicatorLeds<L>) -> Self {
        Self {
            sensor_hub,
            relay,
            leds,
        }
    }

    pub fn relay_on(&self) -> bool {
        self.relay.is_on()
    }

    pub fn leds(&self) -> &IndicatorLeds<L> {
        &self.leds
    }

    pub fn last_snapshot(&self) -> SensorSnapshot {
        self.sensor_hub.last()
    }

    fn drive_relay(&mut self, on: bool) -> crate::error::Result<()> {
        self.relay.set(on)?;
        Ok(())
    }

    fn drive_leds(&mut self, indicators: &Indicators) -> crate::error::Result<()> {
        self.leds.show(indicators)?;
        Ok(())
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<A, F, R, L> SensorPort for HardwareAdapter<A, F, R, L>
where
    A: AnalogChannels,
    F: InputPin,
    R: OutputPin,
    L: OutputPin,
{
    fn read_all(&mut self) -> SensorSnapshot {
        self.sensor_hub.read_all()
    }
}

// ── MotorPort implementation ──────────────────────────────────

impl<A, F, R, L> MotorPort for HardwareAdapter<A, F, R, L>
where
    A: AnalogChannels,
    F: InputPin,
    R: OutputPin,
    L: OutputPin,
{
    fn set_motor(&mut self, on: bool) {
        if let Err(e) = self.drive_relay(on) {
            error!("hardware: relay {}: {e}", if on { "on" } else { "off" });
        }
    }

    fn set_indicators(&mut self, indicators: &Indicators) {
        if let Err(e) = self.drive_leds(indicators) {
            warn!("hardware: {e}");
        }
    }
}
