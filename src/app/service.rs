//! Pump controller: the hexagonal core and sole owner of the motor.
//!
//! [`PumpController`] owns the active mode, the dry-run detector, the
//! safety supervisor and the persisted settings.  Every motor command
//! funnels through one primitive, `motor_apply`, and every mode change
//! through `enter_mode`.  All I/O flows through port traits passed in at
//! call sites, making the whole controller testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!   ClockPort ──▶ │        PumpController        │
//!   MotorPort ◀── │ dry-run · modes · safety     │
//!                 └──────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! [`process`](PumpController::process) reads the clock once and then runs
//! strictly in this order; a later stage overrides an earlier stage's
//! motor request:
//!
//! 1. dry-run detector
//! 2. twist window check, then twist phase tick
//! 3. auto tick
//! 4. countdown tick
//! 5. timer tick
//! 6. safety supervisor (final authority)
//! 7. indicators
//! 8. status notification (only when changed)

use log::{debug, info, warn};

use crate::clock::Now;
use crate::config::ControllerConfig;
use crate::dryrun::{DryRunDetector, DryRunState, Supervision};
use crate::modes::auto::{AutoInputs, AutoRun, AutoSettings, AutoStep};
use crate::modes::countdown::{CountdownRun, CountdownStep};
use crate::modes::timer::{TimerRun, TimerSchedule, TimerSlot};
use crate::modes::twist::{TwistRun, TwistSettings};
use crate::modes::{ActiveMode, ModeKind};
use crate::persist::{PersistedRecord, RECORD_LEN};
use crate::safety::SafetySupervisor;
use crate::sensors::SensorSnapshot;
use crate::sensors::level::WaterState;

use super::commands::Command;
use super::events::{ControllerEvent, Indicators, StatusSnapshot};
use super::ports::{ClockPort, EventSink, MotorPort, RecordStore, SensorPort};

/// A motor command and why it was issued.
type MotorRequest = Option<(bool, &'static str)>;

/// Capture the single per-tick time snapshot.
fn read_now(clock: &impl ClockPort) -> Now {
    Now::new(clock.now_ms(), clock.time_of_day())
}

// ───────────────────────────────────────────────────────────────
// PumpController
// ───────────────────────────────────────────────────────────────

/// The arbitrator: exactly one mode, one motor, one writer.
pub struct PumpController {
    config: ControllerConfig,
    mode: ActiveMode,
    /// Set only while Manual is active; suppresses dry-run protection.
    manual_override: bool,
    motor_on: bool,
    detector: DryRunDetector,
    safety: SafetySupervisor,

    // -- Settings that outlive a mode run --
    schedule: TimerSchedule,
    twist_settings: TwistSettings,
    countdown_minutes: u16,

    // -- Derived each tick --
    water: WaterState,
    /// Debounced "water present" (`senseDryRun`).
    water_ok: bool,
    indicators: Indicators,
    last_status: Option<StatusSnapshot>,
    last_faults: u8,

    // -- Persistence bookkeeping --
    last_persisted: Option<[u8; RECORD_LEN]>,
    last_persist_ms: Option<u64>,

    tick_count: u64,
}

impl PumpController {
    /// Construct the controller from configuration.  Starts idle with the
    /// motor off and all settings at their configured defaults.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            detector: DryRunDetector::new(&config),
            safety: SafetySupervisor::new(&config),
            schedule: TimerSchedule::default(),
            twist_settings: config.twist_defaults,
            countdown_minutes: config.countdown_default_minutes,
            mode: ActiveMode::Idle,
            manual_override: false,
            motor_on: false,
            water: WaterState::default(),
            water_ok: false,
            indicators: Indicators::default(),
            last_status: None,
            last_faults: 0,
            last_persisted: None,
            last_persist_ms: None,
            tick_count: 0,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Force the relay to match the idle state and announce the start.
    pub fn start(&mut self, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        hw.set_motor(self.motor_on);
        sink.emit(&ControllerEvent::Started(self.mode.kind()));
        info!("PumpController started in {}", self.mode.kind());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full tick: clock → sensors → engines → safety → outputs.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`MotorPort`]; this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn process(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + MotorPort),
        sink: &mut impl EventSink,
    ) {
        let now = read_now(clock);
        let snapshot = hw.read_all();
        self.tick(now, &snapshot, hw, sink);
    }

    /// One tick against an already captured time and sensor snapshot.
    pub fn tick(
        &mut self,
        now: Now,
        snap: &SensorSnapshot,
        hw: &mut impl MotorPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.water = WaterState::evaluate(snap, self.config.submerged_threshold_volts);
        let mut request: MotorRequest = None;

        // 1. Dry-run detector
        let supervision = self.supervision();
        let out = self
            .detector
            .update(now.ms, self.water.water_present, supervision);
        if let Some(on) = out.motor_request {
            request = Some((on, "dry-run"));
        }
        self.water_ok = self.manual_override || out.water_ok;

        // 2. Twist: wall-clock window, then phase cycling
        if let ActiveMode::Twist(run) = &mut self.mode {
            if let Some(on) = run.window_check(now) {
                request = Some((on, "twist window"));
            }
            if let Some(on) = run.tick(now.ms, self.water_ok) {
                request = Some((on, "twist phase"));
            }
        }

        // 3. Auto
        let inputs = AutoInputs {
            tank_full: self.water.tank_full,
            overload: snap.overload,
            over_under_volt: snap.over_under_volt,
            max_run_reached: self.safety.max_run_reached(),
            water_ok: self.water_ok,
        };
        let auto_step = match &mut self.mode {
            ActiveMode::Auto(run) => Some(run.tick(now.ms, inputs)),
            _ => None,
        };
        match auto_step {
            Some(AutoStep::Continue(Some(on))) => request = Some((on, "auto")),
            Some(AutoStep::Stop(why)) => {
                warn!("auto: stopped ({:?})", why);
                self.enter_mode(ActiveMode::Idle, sink);
                sink.emit(&ControllerEvent::AutoStopped(why));
                request = Some((false, "auto stopped"));
            }
            Some(AutoStep::Continue(None)) | None => {}
        }

        // 4. Countdown
        let tank_full = self.water.tank_full;
        let countdown_step = match &mut self.mode {
            ActiveMode::Countdown(run) => Some(run.tick(now.ms, tank_full)),
            _ => None,
        };
        if let Some(CountdownStep::Finished(end)) = countdown_step {
            info!("countdown: finished ({:?})", end);
            self.enter_mode(ActiveMode::Idle, sink);
            sink.emit(&ControllerEvent::CountdownFinished(end));
            request = Some((false, "countdown finished"));
        }

        // 5. Timer
        if let ActiveMode::Timer(run) = &mut self.mode {
            if let Some(on) = run.tick(&self.schedule, now.tod) {
                request = Some((on, "timer"));
            }
        }

        // 6. Safety supervisor: final authority
        let verdict = self.safety.evaluate(snap, now.ms);
        if verdict.lockout {
            if !matches!(self.mode, ActiveMode::Idle | ActiveMode::Manual) {
                warn!("fault lockout: stopping {}", self.mode.kind());
                self.enter_mode(ActiveMode::Idle, sink);
            }
            request = Some((false, "fault lockout"));
        }
        if verdict.max_run_tripped {
            if matches!(self.mode, ActiveMode::Auto(_)) {
                self.enter_mode(ActiveMode::Idle, sink);
            }
            sink.emit(&ControllerEvent::MaxRunReached);
            request = Some((false, "max continuous run"));
        }

        if let Some((on, reason)) = request {
            self.motor_apply(on, reason, now.ms, hw, sink);
        }

        let faults = self.safety.faults();
        if faults != self.last_faults {
            if faults & !self.last_faults != 0 {
                sink.emit(&ControllerEvent::FaultDetected(faults));
            } else if faults == 0 {
                sink.emit(&ControllerEvent::FaultCleared);
            }
            self.last_faults = faults;
        }

        // 7 + 8. Indicators and status
        self.publish(hw, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one inbound command.  Reads the clock once.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        clock: &impl ClockPort,
        hw: &mut impl MotorPort,
        sink: &mut impl EventSink,
    ) {
        let now = read_now(clock);
        debug!("command: {:?}", cmd);
        match cmd {
            Command::MotorOn => self.set_motor(true, now, hw, sink),
            Command::MotorOff => self.set_motor(false, now, hw, sink),
            Command::SemiAutoStart => self.start_semi_auto(now, hw, sink),
            Command::SemiAutoStop => self.stop_mode(ModeKind::SemiAuto, now, hw, sink),
            Command::TwistStart(settings) => {
                if let Some(s) = settings {
                    self.twist_settings = s;
                }
                self.start_twist(now, hw, sink);
            }
            Command::TwistStop => self.stop_mode(ModeKind::Twist, now, hw, sink),
            Command::TwistSet(s) => {
                self.twist_settings = s;
                info!("twist: settings {} s on / {} s off", s.on_secs, s.off_secs);
                if self.mode.kind() == ModeKind::Twist {
                    self.start_twist(now, hw, sink);
                }
            }
            Command::TimerStart => self.start_timer(now, hw, sink),
            Command::TimerStop => self.stop_mode(ModeKind::Timer, now, hw, sink),
            Command::TimerSet {
                index,
                on,
                off,
                day_mask,
            } => {
                let slot = TimerSlot {
                    enabled: true,
                    on,
                    off,
                    day_mask,
                };
                self.set_timer_slot(index, slot, now, hw, sink);
            }
            Command::TimerDisable(index) => {
                if let Some(mut slot) = self.schedule.slot(index).copied() {
                    slot.enabled = false;
                    self.set_timer_slot(index, slot, now, hw, sink);
                }
            }
            Command::AutoStart(settings) => {
                let settings = settings.unwrap_or(self.config.auto_defaults);
                self.start_auto(settings, now, hw, sink);
            }
            Command::AutoStop => self.stop_mode(ModeKind::Auto, now, hw, sink),
            Command::CountdownStart(minutes) => {
                if let Some(m) = minutes {
                    self.countdown_minutes = m;
                }
                let secs = u32::from(self.countdown_minutes) * 60;
                self.start_countdown(secs, now, hw, sink);
            }
            Command::CountdownStop => self.stop_mode(ModeKind::Countdown, now, hw, sink),
            Command::ClearMaxRun => self.safety.clear_max_run(),
            Command::StopAll => self.stop_all_modes_and_motor(now, hw, sink),
        }
        self.publish(hw, sink);
    }

    // ── Mode operations ───────────────────────────────────────

    /// Manual direct control.  On takes the motor under manual override,
    /// bypassing dry-run protection; off clears every mode.
    pub fn set_motor(&mut self, on: bool, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        if on {
            self.enter_mode(ActiveMode::Manual, sink);
            self.detector.reset(now.ms);
            self.water_ok = true;
            self.motor_apply(true, "manual", now.ms, hw, sink);
        } else {
            self.enter_mode(ActiveMode::Idle, sink);
            self.motor_apply(false, "manual", now.ms, hw, sink);
        }
    }

    /// Run once unless the tank is already full.
    pub fn start_semi_auto(&mut self, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        self.enter_mode(ActiveMode::SemiAuto, sink);
        self.detector.reset(now.ms);
        if self.water.tank_full {
            info!("semi-auto: tank already full, motor stays off");
            self.motor_apply(false, "semi-auto tank full", now.ms, hw, sink);
        } else {
            self.motor_apply(true, "semi-auto", now.ms, hw, sink);
        }
    }

    /// Activate the timer and evaluate the slots immediately.
    pub fn start_timer(&mut self, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        self.enter_mode(ActiveMode::Timer(TimerRun::default()), sink);
        self.detector.reset(now.ms);
        info!("timer: {} slot(s) enabled", self.schedule.enabled_count());
        let verdict = match &mut self.mode {
            ActiveMode::Timer(run) => run.recalculate(&self.schedule, now.tod),
            _ => None,
        };
        // No wall clock yet: the motor waits for the first slot verdict.
        self.motor_apply(verdict.unwrap_or(false), "timer", now.ms, hw, sink);
    }

    /// Idempotent immediate timer re-evaluation (no-op outside Timer mode).
    pub fn recalculate_now(&mut self, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        let request = match &mut self.mode {
            ActiveMode::Timer(run) => run.recalculate(&self.schedule, now.tod),
            _ => None,
        };
        if let Some(on) = request {
            self.motor_apply(on, "timer", now.ms, hw, sink);
        }
    }

    /// Replace a timer slot and re-evaluate straight away.
    pub fn set_timer_slot(
        &mut self,
        index: usize,
        slot: TimerSlot,
        now: Now,
        hw: &mut impl MotorPort,
        sink: &mut impl EventSink,
    ) {
        if !self.schedule.set_slot(index, slot) {
            warn!("timer: slot {} out of range", index);
            return;
        }
        self.recalculate_now(now, hw, sink);
    }

    /// Single-shot run.  Zero seconds is the same as stopping.
    pub fn start_countdown(&mut self, secs: u32, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        let Some(run) = CountdownRun::start(now.ms, secs) else {
            self.stop_mode(ModeKind::Countdown, now, hw, sink);
            return;
        };
        self.enter_mode(ActiveMode::Countdown(run), sink);
        self.detector.reset(now.ms);
        self.motor_apply(true, "countdown", now.ms, hw, sink);
    }

    /// Arm twist with the stored settings.
    pub fn start_twist(&mut self, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        let (run, request) = TwistRun::start(self.twist_settings, now);
        self.enter_mode(ActiveMode::Twist(run), sink);
        self.detector.reset(now.ms);
        // Leaving another mode's motor running would be a run with no owner.
        let on = request.unwrap_or(false);
        self.motor_apply(on, "twist", now.ms, hw, sink);
    }

    /// Optimistic start: motor on immediately, retries cleared.
    pub fn start_auto(
        &mut self,
        settings: AutoSettings,
        now: Now,
        hw: &mut impl MotorPort,
        sink: &mut impl EventSink,
    ) {
        if self.safety.max_run_reached() {
            warn!("auto: max-run flag still set, auto will stop on the next tick");
        }
        self.enter_mode(ActiveMode::Auto(AutoRun::start(settings, now.ms)), sink);
        self.detector.reset(now.ms);
        self.motor_apply(true, "auto", now.ms, hw, sink);
    }

    /// Stop `kind` if it is the active mode.
    pub fn stop_mode(&mut self, kind: ModeKind, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        if self.mode.kind() != kind {
            debug!("stop {}: not active ({})", kind, self.mode.kind());
            return;
        }
        self.enter_mode(ActiveMode::Idle, sink);
        self.motor_apply(false, "mode stopped", now.ms, hw, sink);
    }

    /// Universal safe state: no mode, motor off.
    pub fn stop_all_modes_and_motor(&mut self, now: Now, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        self.enter_mode(ActiveMode::Idle, sink);
        self.motor_apply(false, "stop all", now.ms, hw, sink);
    }

    /// Operator acknowledgement of a max-run trip.
    pub fn clear_max_run(&mut self) {
        self.safety.clear_max_run();
    }

    // ── Persistence ───────────────────────────────────────────

    /// The state that survives a power cycle.
    pub fn record(&self) -> PersistedRecord {
        PersistedRecord {
            mode: self.mode.kind(),
            motor_on: self.motor_on,
            twist_on_secs: self.twist_settings.on_secs,
            twist_off_secs: self.twist_settings.off_secs,
            countdown_minutes: self.countdown_minutes,
            slot0: self.schedule.slot(0).copied().unwrap_or_default(),
        }
    }

    /// Write the record if it changed and the rate limit allows.
    /// Returns `true` if a write happened.
    pub fn persist_if_needed(&mut self, now_ms: u64, store: &mut impl RecordStore) -> bool {
        let encoded = self.record().encode();
        if self.last_persisted == Some(encoded) {
            return false;
        }
        if let Some(last) = self.last_persist_ms {
            if now_ms.saturating_sub(last) < u64::from(self.config.persist_interval_ms) {
                return false;
            }
        }
        match store.write_record(&encoded) {
            Ok(()) => {
                self.last_persisted = Some(encoded);
                self.last_persist_ms = Some(now_ms);
                info!("persist: record saved ({})", self.mode.kind());
                true
            }
            Err(e) => {
                warn!("persist: write failed: {}", e);
                // Back off for a full interval before retrying.
                self.last_persist_ms = Some(now_ms);
                false
            }
        }
    }

    /// Reapply a loaded record at boot and resume Timer, Twist or
    /// Semi-Auto.  Other modes come back idle.
    ///
    /// The probes are read first so a resumed Semi-Auto sees the real
    /// tank level rather than the power-on default.
    pub fn restore(
        &mut self,
        record: &PersistedRecord,
        clock: &impl ClockPort,
        hw: &mut (impl SensorPort + MotorPort),
        sink: &mut impl EventSink,
    ) {
        let now = read_now(clock);
        self.refresh_water(hw);
        if record.twist_on_secs != 0 && record.twist_off_secs != 0 {
            self.twist_settings = TwistSettings::new(
                record.twist_on_secs,
                record.twist_off_secs,
                self.twist_settings.window_on,
                self.twist_settings.window_off,
            );
        }
        if record.countdown_minutes != 0 {
            self.countdown_minutes = record.countdown_minutes;
        }
        self.schedule.set_slot(0, record.slot0);

        match record.mode {
            ModeKind::Timer => self.start_timer(now, hw, sink),
            ModeKind::Twist => self.start_twist(now, hw, sink),
            ModeKind::SemiAuto => self.start_semi_auto(now, hw, sink),
            other => debug!("restore: {} is not resumed", other),
        }
        self.last_persisted = Some(record.encode());
        self.last_persist_ms = Some(now.ms);
        info!("restored: mode {} (saved as {})", self.mode.kind(), record.mode);
        sink.emit(&ControllerEvent::Restored(self.mode.kind()));
        self.publish(hw, sink);
    }

    /// Re-evaluate the level probes outside a tick.
    fn refresh_water(&mut self, hw: &mut impl SensorPort) {
        let snap = hw.read_all();
        self.water = WaterState::evaluate(&snap, self.config.submerged_threshold_volts);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> &ActiveMode {
        &self.mode
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn motor_on(&self) -> bool {
        self.motor_on
    }

    pub fn manual_override(&self) -> bool {
        self.manual_override
    }

    /// Debounced water signal as the mode engines see it.
    pub fn water_ok(&self) -> bool {
        self.water_ok
    }

    pub fn dry_run_state(&self) -> DryRunState {
        self.detector.state()
    }

    /// Current safety fault bitmask (0 = no faults).
    pub fn fault_flags(&self) -> u8 {
        self.safety.faults()
    }

    pub fn max_run_reached(&self) -> bool {
        self.safety.max_run_reached()
    }

    pub fn schedule(&self) -> &TimerSchedule {
        &self.schedule
    }

    pub fn twist_settings(&self) -> TwistSettings {
        self.twist_settings
    }

    pub fn countdown_minutes(&self) -> u16 {
        self.countdown_minutes
    }

    pub fn indicators(&self) -> Indicators {
        self.indicators
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            motor_on: self.motor_on,
            mode: self.mode.kind(),
            tank_level_percent: self.water.level_percent,
        }
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// How the detector should treat the active mode this tick.
    fn supervision(&self) -> Supervision {
        match &self.mode {
            ActiveMode::Idle => Supervision::Unsupervised,
            m if m.holds_motor() => Supervision::Hold,
            ActiveMode::Timer(run) => Supervision::Driven {
                demand: run.demand(),
            },
            ActiveMode::Twist(run) => Supervision::Driven {
                demand: run.demand(),
            },
            _ => Supervision::Driven { demand: true },
        }
    }

    /// The single mode-transition point.  Replacing the variant drops the
    /// previous mode's run state; `manual_override` follows Manual.
    fn enter_mode(&mut self, next: ActiveMode, sink: &mut impl EventSink) {
        let from = self.mode.kind();
        self.mode = next;
        self.manual_override = matches!(self.mode, ActiveMode::Manual);
        let to = self.mode.kind();
        if from != to {
            info!("mode: {} -> {}", from, to);
            sink.emit(&ControllerEvent::ModeChanged { from, to });
        }
    }

    /// The single motor primitive: writes the relay, tracks state, arms
    /// the max-run timer on transitions.  A start during fault lockout is
    /// turned into a stop.
    fn motor_apply(
        &mut self,
        on: bool,
        reason: &'static str,
        now_ms: u64,
        hw: &mut impl MotorPort,
        sink: &mut impl EventSink,
    ) {
        let on = if on && self.safety.lockout() {
            warn!("motor start refused ({}): fault lockout", reason);
            false
        } else {
            on
        };

        hw.set_motor(on);
        if self.motor_on != on {
            self.motor_on = on;
            self.safety.motor_changed(on, now_ms);
            info!("motor {} ({})", if on { "ON" } else { "OFF" }, reason);
            sink.emit(&ControllerEvent::MotorChanged { on, reason });
        }
    }

    /// Refresh indicators and emit status if it changed.
    fn publish(&mut self, hw: &mut impl MotorPort, sink: &mut impl EventSink) {
        self.indicators = Indicators {
            motor: self.motor_on,
            fault: self.safety.has_faults(),
            dry: !self.mode.is_idle() && !self.water_ok,
            mode: self.mode.kind(),
            countdown_remaining_secs: match &self.mode {
                ActiveMode::Countdown(run) => run.remaining_secs,
                _ => 0,
            },
            twist_active: matches!(&self.mode, ActiveMode::Twist(run) if run.active),
        };
        hw.set_indicators(&self.indicators);

        let status = self.status();
        if self.last_status != Some(status) {
            self.last_status = Some(status);
            sink.emit(&ControllerEvent::Status(status));
        }
    }
}
