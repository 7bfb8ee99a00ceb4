//! Fuzz target: console command parser and controller
//!
//! Splits arbitrary input into lines, parses each one and feeds every
//! accepted command into a controller, ticking between commands.
//! Verifies:
//! - No panics on any byte sequence
//! - `manual_override` is set exactly while Manual is active
//! - The relay never runs while the controller is idle
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpguard::app::commands::Command;
use pumpguard::app::events::{ControllerEvent, Indicators};
use pumpguard::app::ports::{EventSink, MotorPort};
use pumpguard::app::service::PumpController;
use pumpguard::clock::{Now, TimeOfDay};
use pumpguard::config::ControllerConfig;
use pumpguard::modes::ModeKind;
use pumpguard::sensors::SensorSnapshot;

struct Relay(bool);

impl MotorPort for Relay {
    fn set_motor(&mut self, on: bool) {
        self.0 = on;
    }

    fn set_indicators(&mut self, _: &Indicators) {}
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _: &ControllerEvent) {}
}

struct Clock(u64, Option<TimeOfDay>);

impl pumpguard::app::ports::ClockPort for Clock {
    fn now_ms(&self) -> u64 {
        self.0
    }

    fn time_of_day(&self) -> Option<TimeOfDay> {
        self.1
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let mut ctl = PumpController::new(ControllerConfig::default());
    let mut relay = Relay(false);
    let mut clock = Clock(0, Some(TimeOfDay::new(6, 0, 0, 1)));
    let mut snap = SensorSnapshot::default();
    ctl.start(&mut relay, &mut Discard);

    for (i, line) in text.lines().enumerate() {
        let Ok(cmd) = line.parse::<Command>() else {
            continue;
        };
        ctl.handle_command(cmd, &clock, &mut relay, &mut Discard);

        // Vary water and clock with the line index.
        snap.dry_run_volts = if i % 3 == 0 { 3.3 } else { 0.0 };
        clock.0 += 50 * (i as u64 + 1);
        clock.1 = Some(TimeOfDay::new((i % 24) as u8, 0, 0, (i % 7) as u8));
        ctl.tick(Now::new(clock.0, clock.1), &snap, &mut relay, &mut Discard);

        assert_eq!(ctl.manual_override(), ctl.mode_kind() == ModeKind::Manual);
        if ctl.mode_kind() == ModeKind::Idle {
            assert!(!relay.0, "relay on while idle");
        }
    }
});
