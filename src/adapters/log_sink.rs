//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events to the logger
//! (UART / USB-CDC on the board).  Status changes are printed in the
//! compact radio line format so the console and the radio modem agree.

use log::{info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControllerEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events rendered since boot.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            ControllerEvent::Started(mode) => {
                info!("START | mode={}", mode);
            }
            ControllerEvent::Status(s) => {
                info!("STATUS | {}", s.to_line());
            }
            ControllerEvent::ModeChanged { from, to } => {
                info!("MODE | {} -> {}", from, to);
            }
            ControllerEvent::MotorChanged { on, reason } => {
                info!("MOTOR | {} ({})", if *on { "ON" } else { "OFF" }, reason);
            }
            ControllerEvent::FaultDetected(flags) => {
                warn!("FAULT | detected, flags=0b{:08b}", flags);
            }
            ControllerEvent::FaultCleared => {
                info!("FAULT | all cleared");
            }
            ControllerEvent::MaxRunReached => {
                warn!("SAFETY | max continuous run reached, CLEAR_MAX_RUN to acknowledge");
            }
            ControllerEvent::AutoStopped(reason) => {
                info!("AUTO | stopped: {:?}", reason);
            }
            ControllerEvent::CountdownFinished(end) => {
                info!("COUNTDOWN | finished: {:?}", end);
            }
            ControllerEvent::Restored(mode) => {
                info!("RESTORE | resumed {}", mode);
            }
        }
    }
}
