//! Front-panel indicator LEDs.
//!
//! Four discrete active-high LEDs:
//!
//! | LED   | Lit when                                  |
//! |-------|-------------------------------------------|
//! | motor | relay energised                           |
//! | fault | any safety fault latched                  |
//! | dry   | dry-run detector reports no water         |
//! | mode  | a mode other than Idle is active; blinks  |
//! |       | at 1 Hz while a countdown is running      |
//!
//! Writes are skipped when the lit state has not changed, so calling
//! [`IndicatorLeds::show`] every tick costs nothing on a quiet panel.

use embedded_hal::digital::OutputPin;

use crate::app::events::Indicators;
use crate::error::ActuatorError;
use crate::modes::ModeKind;

/// Panel LED pins.
pub struct IndicatorLeds<P> {
    motor: P,
    fault: P,
    dry: P,
    mode: P,
    lit: [bool; 4],
}

impl<P: OutputPin> IndicatorLeds<P> {
    /// Take the pins and switch every LED off.
    pub fn new(motor: P, fault: P, dry: P, mode: P) -> Self {
        let mut leds = Self {
            motor,
            fault,
            dry,
            mode,
            lit: [true; 4],
        };
        // Force a write of every pin.
        let _ = leds.apply([false; 4]);
        leds
    }

    /// Reflect the end-of-tick indicator state on the panel.
    pub fn show(&mut self, ind: &Indicators) -> Result<(), ActuatorError> {
        let mode_lit = match ind.mode {
            ModeKind::Idle => false,
            ModeKind::Countdown if ind.countdown_remaining_secs > 0 => {
                ind.countdown_remaining_secs % 2 == 0
            }
            _ => true,
        };
        self.apply([ind.motor, ind.fault, ind.dry, mode_lit])
    }

    /// Current lit state as `[motor, fault, dry, mode]`.
    pub fn lit(&self) -> [bool; 4] {
        self.lit
    }

    fn apply(&mut self, want: [bool; 4]) -> Result<(), ActuatorError> {
        let pins = [
            &mut self.motor,
            &mut self.fault,
            &mut self.dry,
            &mut self.mode,
        ];
        let mut result = Ok(());
        for (i, pin) in pins.into_iter().enumerate() {
            if self.lit[i] == want[i] {
                continue;
            }
            let res = if want[i] { pin.set_high() } else { pin.set_low() };
            match res {
                Ok(()) => self.lit[i] = want[i],
                Err(_) => result = Err(ActuatorError::LedWriteFailed),
            }
        }
        result
    }
}
