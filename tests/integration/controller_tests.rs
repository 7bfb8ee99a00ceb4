//! Integration tests for the command → controller → relay pipeline.
//!
//! Every test drives [`PumpController`] through the public port traits
//! with a hand-advanced clock, exactly as the firmware loop does.

use crate::mock_hw::{FakeClock, MockHardware, RecordingSink};

use pumpguard::app::commands::Command;
use pumpguard::app::events::ControllerEvent;
use pumpguard::app::ports::ClockPort;
use pumpguard::app::service::PumpController;
use pumpguard::clock::{HourMinute, Now};
use pumpguard::config::ControllerConfig;
use pumpguard::dryrun::DryRunState;
use pumpguard::modes::ModeKind;
use pumpguard::modes::auto::{AutoSettings, AutoStop};
use pumpguard::modes::countdown::CountdownEnd;

const TICK_MS: u64 = 50;

struct Rig {
    ctl: PumpController,
    hw: MockHardware,
    clock: FakeClock,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        let mut rig = Self {
            ctl: PumpController::new(ControllerConfig::default()),
            hw: MockHardware::new(),
            clock: FakeClock::new(),
            sink: RecordingSink::new(),
        };
        rig.ctl.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    fn command(&mut self, line: &str) {
        let cmd = line.parse::<Command>().expect("valid command");
        self.ctl
            .handle_command(cmd, &self.clock, &mut self.hw, &mut self.sink);
    }

    /// Process one tick at the current clock time.
    fn tick(&mut self) {
        self.ctl.process(&self.clock, &mut self.hw, &mut self.sink);
    }

    /// Tick every [`TICK_MS`] up to and including `until_ms`.
    fn run_until(&mut self, until_ms: u64) {
        while self.clock.now_ms() < until_ms {
            self.clock.advance(TICK_MS);
            self.tick();
        }
    }

    fn motor(&self) -> bool {
        self.ctl.motor_on()
    }
}

// ── No unsupervised operation ─────────────────────────────────

#[test]
fn idle_without_water_never_runs_motor() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(false);
    for _ in 0..2_000 {
        rig.clock.advance(TICK_MS);
        rig.tick();
        assert!(!rig.motor());
        assert!(!rig.hw.relay_on());
        assert_eq!(rig.ctl.dry_run_state(), DryRunState::Idle);
    }
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
}

#[test]
fn idle_with_water_still_keeps_motor_off() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.run_until(30_000);
    assert!(!rig.motor());
}

// ── Manual and mode exclusivity ───────────────────────────────

#[test]
fn manual_on_overrides_dry_run_and_off_clears_everything() {
    let mut rig = Rig::new();
    rig.command("MOTOR_ON");
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Manual);
    assert!(rig.ctl.manual_override());
    assert!(rig.hw.relay_on());

    // Dry for a minute: manual keeps running.
    rig.run_until(60_000);
    assert!(rig.motor());
    assert!(rig.ctl.water_ok());

    rig.command("MOTOR_OFF");
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
    assert!(!rig.ctl.manual_override());
    assert!(!rig.hw.relay_on());
}

#[test]
fn each_start_replaces_the_previous_mode() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    let steps = [
        ("MOTOR_ON", ModeKind::Manual),
        ("SEMI_AUTO_START", ModeKind::SemiAuto),
        ("TIMER_START", ModeKind::Timer),
        ("COUNTDOWN_START:1", ModeKind::Countdown),
        ("TWIST_START", ModeKind::Twist),
        ("AUTO_START:5,10,2", ModeKind::Auto),
        ("MOTOR_ON", ModeKind::Manual),
        ("STOP_ALL", ModeKind::Idle),
    ];
    for (line, expected) in steps {
        rig.command(line);
        rig.clock.advance(TICK_MS);
        rig.tick();
        assert_eq!(rig.ctl.mode_kind(), expected, "after {line}");
        assert_eq!(rig.ctl.manual_override(), expected == ModeKind::Manual);
    }
    assert!(!rig.hw.relay_on());
}

#[test]
fn stopping_an_inactive_mode_is_a_no_op() {
    let mut rig = Rig::new();
    rig.command("MOTOR_ON");
    rig.command("AUTO_STOP");
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Manual);
    assert!(rig.hw.relay_on());
}

#[test]
fn semi_auto_respects_full_tank() {
    let mut rig = Rig::new();
    rig.hw.set_tank_probes(4);
    rig.tick();
    rig.command("SEMI_AUTO_START");
    assert_eq!(rig.ctl.mode_kind(), ModeKind::SemiAuto);
    assert!(!rig.motor());

    rig.hw.set_tank_probes(1);
    rig.tick();
    rig.command("SEMI_AUTO_START");
    assert!(rig.motor());
    assert_eq!(rig.ctl.status().tank_level_percent, 20);
}

// ── Safety lockout ────────────────────────────────────────────

#[test]
fn overload_stops_motor_within_one_tick_and_holds_it_off() {
    let mut rig = Rig::new();
    rig.command("MOTOR_ON");
    rig.tick();
    assert!(rig.motor());

    rig.hw.set_overload(true);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert!(!rig.motor());
    assert!(!rig.hw.relay_on());
    assert_ne!(rig.ctl.fault_flags(), 0);

    // Manual cannot restart it while the fault holds.
    rig.command("MOTOR_ON");
    assert!(!rig.hw.relay_on());
    for _ in 0..100 {
        rig.clock.advance(TICK_MS);
        rig.tick();
        assert!(!rig.hw.relay_on());
    }

    rig.hw.set_overload(false);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert_eq!(rig.ctl.fault_flags(), 0);
    assert!(rig.sink.contains(&ControllerEvent::FaultCleared));
}

#[test]
fn voltage_fault_stops_auto() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.command("AUTO_START:30,60,3");
    rig.run_until(1_000);
    assert!(rig.motor());

    rig.hw.set_over_under_volt(true);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
    assert!(!rig.motor());
    assert!(rig.sink.contains(&ControllerEvent::AutoStopped(AutoStop::Fault)));
    assert!(
        rig.sink
            .count(|e| matches!(e, ControllerEvent::FaultDetected(_)))
            >= 1
    );
}

#[test]
fn max_continuous_run_latches_until_acknowledged() {
    let mut rig = Rig::new();
    rig.command("MOTOR_ON");

    let limit = u64::from(ControllerConfig::default().max_continuous_run_ms);
    while rig.clock.now_ms() < limit - 1_000 {
        rig.clock.advance(1_000);
        rig.tick();
    }
    assert!(rig.motor());
    assert!(!rig.ctl.max_run_reached());

    rig.clock.advance(1_000);
    rig.tick();
    assert!(rig.ctl.max_run_reached());
    assert!(!rig.motor());
    assert_eq!(rig.sink.count(|e| *e == ControllerEvent::MaxRunReached), 1);

    // Sticky: auto refuses to run until the operator clears it.
    rig.hw.set_water_at_pump(true);
    rig.command("AUTO_START");
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
    assert!(rig.sink.contains(&ControllerEvent::AutoStopped(AutoStop::MaxRunReached)));

    rig.command("CLEAR_MAX_RUN");
    assert!(!rig.ctl.max_run_reached());
    rig.command("AUTO_START");
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Auto);
    assert!(rig.motor());
}

// ── Dry-run detector through a driven mode ────────────────────

#[test]
fn dry_blip_is_ignored_but_sustained_dry_stops_motor() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.command("COUNTDOWN_START:10");
    rig.clock.set_ms(50);
    rig.tick();
    assert_eq!(rig.ctl.dry_run_state(), DryRunState::Normal);
    assert!(rig.motor());

    // One tick without water.
    rig.hw.set_water_at_pump(false);
    rig.clock.set_ms(100);
    rig.tick();
    rig.hw.set_water_at_pump(true);
    rig.clock.set_ms(150);
    rig.tick();
    assert!(rig.motor());
    assert_eq!(rig.ctl.dry_run_state(), DryRunState::Normal);

    // Sustained: first missed at 1000 ms, stopped 1500 ms later.
    rig.run_until(950);
    rig.hw.set_water_at_pump(false);
    rig.run_until(2_450);
    assert!(rig.motor());
    rig.run_until(2_500);
    assert!(!rig.motor());
    assert_eq!(rig.ctl.dry_run_state(), DryRunState::Idle);
    assert!(!rig.ctl.water_ok());
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Countdown);
}

// ── Timer ─────────────────────────────────────────────────────

#[test]
fn timer_slot_across_midnight() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.clock.set_time(0, 0);
    rig.command("TIMER_SET:0,23,0,1,0");
    rig.command("TIMER_START");
    assert!(rig.motor());
    rig.run_until(5_000);
    assert!(rig.motor());

    rig.clock.set_time(11, 40);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert!(!rig.motor());
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Timer);

    rig.clock.set_time(23, 0);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert!(rig.motor());
}

#[test]
fn editing_a_slot_reevaluates_immediately() {
    let mut rig = Rig::new();
    rig.clock.set_time(12, 0);
    rig.command("TIMER_START");
    assert!(!rig.motor());

    rig.command("TIMER_SET:2,11,30,13,0");
    assert!(rig.motor());
    rig.command("TIMER_DISABLE:2");
    assert!(!rig.motor());
    assert!(!rig.ctl.schedule().slot(2).is_some_and(|s| s.enabled));
}

// ── Countdown ─────────────────────────────────────────────────

#[test]
fn countdown_ceiling_display_and_elapse() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.ctl
        .start_countdown(10, Now::new(0, None), &mut rig.hw, &mut rig.sink);
    assert!(rig.motor());

    rig.run_until(9_500);
    let ind = rig.ctl.indicators();
    assert_eq!(ind.countdown_remaining_secs, 1);
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Countdown);

    rig.run_until(9_950);
    assert_eq!(rig.ctl.indicators().countdown_remaining_secs, 1);
    assert!(rig.motor());

    rig.run_until(10_000);
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
    assert!(!rig.motor());
    assert!(rig.sink.contains(&ControllerEvent::CountdownFinished(CountdownEnd::Elapsed)));
}

#[test]
fn countdown_stops_early_on_full_tank() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.command("COUNTDOWN_START:5");
    rig.run_until(2_000);
    rig.hw.set_tank_probes(5);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
    assert!(rig.sink.contains(&ControllerEvent::CountdownFinished(CountdownEnd::TankFull)));
    assert_eq!(rig.ctl.countdown_minutes(), 5);
}

// ── Twist ─────────────────────────────────────────────────────

#[test]
fn twist_waits_for_window_then_cycles() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.clock.set_time(5, 59);
    rig.command("TWIST_START:2,3,6,0,18,0");
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Twist);
    assert!(!rig.motor());
    assert_eq!(rig.ctl.twist_settings().window_on, HourMinute::new(6, 0));

    rig.run_until(1_000);
    assert!(!rig.motor());

    rig.clock.set_time(6, 0);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert!(rig.motor());
    assert!(rig.ctl.indicators().twist_active);

    // With water the cycle keeps running through phase boundaries.
    rig.run_until(10_000);
    assert!(rig.motor());

    rig.clock.set_time(18, 0);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert!(!rig.motor());
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Twist);
}

// ── Auto ──────────────────────────────────────────────────────

#[test]
fn auto_gives_up_after_exactly_retry_limit() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(false);
    rig.ctl.start_auto(
        AutoSettings::new(5, 1000, 2),
        Now::new(0, None),
        &mut rig.hw,
        &mut rig.sink,
    );
    rig.tick();

    // First retry at 0, second at 5 s, give up at 10 s.
    rig.run_until(9_950);
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Auto);
    rig.run_until(10_000);
    assert_eq!(rig.ctl.mode_kind(), ModeKind::Idle);
    assert!(!rig.motor());
    assert_eq!(
        rig.sink
            .count(|e| *e == ControllerEvent::AutoStopped(AutoStop::RetriesExhausted)),
        1
    );
}

#[test]
fn auto_stops_when_tank_fills() {
    let mut rig = Rig::new();
    rig.hw.set_water_at_pump(true);
    rig.command("AUTO_START");
    rig.run_until(3_000);
    assert!(rig.motor());

    rig.hw.set_tank_probes(4);
    rig.clock.advance(TICK_MS);
    rig.tick();
    assert!(!rig.motor());
    assert!(rig.sink.contains(&ControllerEvent::AutoStopped(AutoStop::TankFull)));
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_is_emitted_only_on_change() {
    let mut rig = Rig::new();
    rig.run_until(5_000);
    let quiet = rig
        .sink
        .count(|e| matches!(e, ControllerEvent::Status(_)));
    assert_eq!(quiet, 1);

    rig.command("MOTOR_ON");
    rig.run_until(6_000);
    let after = rig
        .sink
        .count(|e| matches!(e, ControllerEvent::Status(_)));
    assert_eq!(after, 2);

    let status = rig.ctl.status();
    assert!(status.motor_on);
    assert_eq!(status.to_line().as_str(), "S:1,MANUAL,0");
}
