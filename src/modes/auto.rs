//! Auto mode: optimistic start with a retry-driven dry search.
//!
//! ```text
//!           start (motor on)
//!                │
//!                ▼
//!   ┌──────▶ RUNNING ──[dry]──▶ retry: motor on, gap armed ──┐
//!   │            ▲                                           │
//!   │         [water]                                   [dry, gap]
//!   │            │                                           ▼
//!   └──[gap over]┴─────────────────────────────────── WAITING_RETRY
//!
//!  any state ──[tank full | fault | max-run | retries spent]──▶ STOPPED
//! ```
//!
//! The tick is evaluated in strict priority order; see [`AutoRun::tick`].

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Auto parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSettings {
    /// Wait between retries (seconds).
    pub gap_secs: u16,
    /// Run budget per attempt (minutes).
    pub max_run_minutes: u16,
    /// Retries before giving up.  0 = unlimited.
    pub retry_limit: u8,
}

impl AutoSettings {
    /// Gap and max-run are raised to at least 1.
    pub fn new(gap_secs: u16, max_run_minutes: u16, retry_limit: u8) -> Self {
        Self {
            gap_secs: gap_secs.max(1),
            max_run_minutes: max_run_minutes.max(1),
            retry_limit,
        }
    }

    fn max_run_ms(&self) -> u64 {
        u64::from(self.max_run_minutes) * 60_000
    }

    fn gap_ms(&self) -> u64 {
        u64::from(self.gap_secs) * 1000
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoState {
    /// Motor on: water present, or probing after a retry.
    Running,
    /// Motor off, counting down the gap before the next retry.
    WaitingRetry,
}

/// Why Auto stopped itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoStop {
    TankFull,
    Fault,
    MaxRunReached,
    MaxRunLimit,
    RetriesExhausted,
}

/// Inputs Auto reads each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoInputs {
    pub tank_full: bool,
    pub overload: bool,
    pub over_under_volt: bool,
    pub max_run_reached: bool,
    /// Debounced water signal from the dry-run detector.
    pub water_ok: bool,
}

/// Outcome of one Auto tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoStep {
    /// Stay in Auto; apply the motor request if any.
    Continue(Option<bool>),
    /// Leave Auto (terminal).
    Stop(AutoStop),
}

/// Run state while Auto mode is active.  Rebuilt on every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoRun {
    pub settings: AutoSettings,
    pub state: AutoState,
    pub retry_counter: u8,
    /// Start of the current run budget.
    pub run_started_ms: u64,
    pub next_retry_deadline_ms: u64,
}

impl AutoRun {
    /// Fresh run: counters cleared, motor expected on immediately.
    pub fn start(settings: AutoSettings, now_ms: u64) -> Self {
        info!(
            "auto: start gap={}s max_run={}min retries={}",
            settings.gap_secs, settings.max_run_minutes, settings.retry_limit
        );
        Self {
            settings,
            state: AutoState::Running,
            retry_counter: 0,
            run_started_ms: now_ms,
            next_retry_deadline_ms: 0,
        }
    }

    /// One tick, in strict priority order:
    ///
    /// 1. hard stop on tank full, a live fault, or the sticky max-run flag;
    /// 2. per-attempt max-run budget (not while waiting);
    /// 3. water present: clear retries and keep running;
    /// 4. dry: motor off, then wait out the gap, give up, or retry.
    pub fn tick(&mut self, now_ms: u64, inputs: AutoInputs) -> AutoStep {
        if inputs.tank_full {
            return AutoStep::Stop(AutoStop::TankFull);
        }
        if inputs.overload || inputs.over_under_volt {
            return AutoStep::Stop(AutoStop::Fault);
        }
        if inputs.max_run_reached {
            return AutoStep::Stop(AutoStop::MaxRunReached);
        }

        if self.state != AutoState::WaitingRetry
            && now_ms.saturating_sub(self.run_started_ms) >= self.settings.max_run_ms()
        {
            return AutoStep::Stop(AutoStop::MaxRunLimit);
        }

        if inputs.water_ok {
            self.retry_counter = 0;
            self.state = AutoState::Running;
            return AutoStep::Continue(Some(true));
        }

        if now_ms < self.next_retry_deadline_ms {
            self.state = AutoState::WaitingRetry;
            return AutoStep::Continue(Some(false));
        }

        let limit = self.settings.retry_limit;
        if limit != 0 && self.retry_counter >= limit {
            warn!("auto: {} retries without water, giving up", self.retry_counter);
            return AutoStep::Stop(AutoStop::RetriesExhausted);
        }

        self.retry_counter = self.retry_counter.saturating_add(1);
        self.next_retry_deadline_ms = now_ms + self.settings.gap_ms();
        self.run_started_ms = now_ms;
        self.state = AutoState::Running;
        info!(
            "auto: dry, retry {}/{} (next in {} s)",
            self.retry_counter,
            if limit == 0 { "inf".into() } else { limit.to_string() },
            self.settings.gap_secs
        );
        AutoStep::Continue(Some(true))
    }
}
